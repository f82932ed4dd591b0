//! Fractal planner: hierarchical task lifecycle and sprint planning engine.
//!
//! Work is organised as a self-similar tree of tasks, projects, epics and
//! milestones. The crate validates nesting and lifecycle rules, rolls
//! progress up through ancestors, reschedules recurring work, and binds
//! tasks to sprints for Kanban planning.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business rules with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for persistence and notifications
//! - **Adapters**: Concrete implementations of ports (in-memory storage)
//! - **Services**: Orchestration that commits multi-record changes atomically
//!
//! # Modules
//!
//! - [`task`]: Task hierarchy, lifecycle, progress roll-up and recurrence
//! - [`sprint`]: Sprint lifecycle, task assignment and board views
//! - [`config`]: Engine configuration shared by the services
//! - [`identity`]: Current-user context for audit fields
//! - [`error`]: Error classification shared across contexts

pub mod config;
pub mod error;
pub mod identity;
pub mod sprint;
pub mod task;

mod deadline;
