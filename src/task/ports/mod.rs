//! Port contracts for the task hierarchy.
//!
//! Ports define infrastructure-agnostic interfaces used by task services.

pub mod listener;
pub mod repository;

pub use listener::TaskStatusListener;
pub use repository::{TaskChangeSet, TaskRepository, TaskRepositoryError, TaskRepositoryResult};
