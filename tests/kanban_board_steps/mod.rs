//! Step definitions for Kanban board scenarios.

mod given;
mod then;
mod when;
pub mod world;
