//! Fractal task hierarchy.
//!
//! Projects, epics, tasks and milestones nest under each other according to
//! a configurable rule table. Progress rolls up from leaves to roots,
//! recurring tasks reschedule themselves on completion, and every structural
//! change is committed atomically together with the derived values it
//! affects. The module follows hexagonal architecture:
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
pub(crate) mod tests;
