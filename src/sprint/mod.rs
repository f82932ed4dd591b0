//! Sprint planning.
//!
//! Sprints group tasks into time boxes. At most one sprint is active at a
//! time; the repository enforces this when a sprint is stored, so
//! concurrent starts cannot both win. Tasks are bound to sprints by
//! reference and shown on Kanban boards whose column order is kept by a
//! listener on task status changes.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
