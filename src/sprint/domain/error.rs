//! Error types for sprint validation and lifecycle transitions.

use super::{SprintId, SprintStatus};
use chrono::NaiveDate;
use thiserror::Error;

/// Errors returned by sprint domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SprintDomainError {
    /// The sprint name is empty after trimming.
    #[error("sprint name must not be empty")]
    EmptyName,

    /// The sprint would end on or before its start date.
    #[error("sprint must start before it ends: {start} is not before {end}")]
    InvalidDateRange {
        /// Requested start date.
        start: NaiveDate,
        /// Requested end date.
        end: NaiveDate,
    },

    /// The sprint cannot move from its current status to the target.
    #[error("sprint {sprint_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Sprint identifier.
        sprint_id: SprintId,
        /// Current status.
        from: SprintStatus,
        /// Requested status.
        to: SprintStatus,
    },
}

/// Error returned while parsing a sprint status from storage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown sprint status: {0}")]
pub struct ParseSprintStatusError(pub String);
