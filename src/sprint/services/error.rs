//! Service-level errors for sprint planning.

use crate::error::ErrorKind;
use crate::sprint::{
    domain::{SprintDomainError, SprintId},
    ports::SprintRepositoryError,
};
use crate::task::services::TaskServiceError;
use thiserror::Error;

/// Service-level errors for sprint operations.
#[derive(Debug, Error)]
pub enum SprintServiceError {
    /// Sprint validation or lifecycle rules failed.
    #[error(transparent)]
    Domain(#[from] SprintDomainError),
    /// Sprint repository operation failed.
    #[error(transparent)]
    Repository(#[from] SprintRepositoryError),
    /// A task operation failed.
    #[error(transparent)]
    Task(#[from] TaskServiceError),
    /// No sprint exists with the given identifier.
    #[error("sprint {0} not found")]
    NotFound(SprintId),
    /// The sprint is completed and no longer accepts tasks.
    #[error("sprint {0} is completed and accepts no tasks")]
    SprintClosed(SprintId),
    /// Removing the sprint would orphan assigned tasks.
    #[error("sprint {sprint_id} still has {assigned} assigned tasks")]
    SprintHasTasks {
        /// Sprint being removed.
        sprint_id: SprintId,
        /// Number of tasks still assigned.
        assigned: usize,
    },
    /// Tasks cannot be reassigned to the sprint being removed.
    #[error("sprint {0} cannot receive its own tasks")]
    SelfReassignment(SprintId),
}

impl SprintServiceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => domain_kind(err),
            Self::Repository(err) => repository_kind(err),
            Self::Task(err) => err.kind(),
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::SprintClosed(_) | Self::SelfReassignment(_) => ErrorKind::Validation,
            Self::SprintHasTasks { .. } => ErrorKind::Conflict,
        }
    }

    /// Returns whether the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

const fn domain_kind(err: &SprintDomainError) -> ErrorKind {
    match err {
        SprintDomainError::EmptyName | SprintDomainError::InvalidDateRange { .. } => {
            ErrorKind::Validation
        }
        SprintDomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
    }
}

const fn repository_kind(err: &SprintRepositoryError) -> ErrorKind {
    match err {
        SprintRepositoryError::DuplicateSprint(_) => ErrorKind::Conflict,
        SprintRepositoryError::NotFound(_) => ErrorKind::NotFound,
        SprintRepositoryError::ActiveSprintConflict { .. } => ErrorKind::ActiveSprintConflict,
        SprintRepositoryError::Timeout(_) | SprintRepositoryError::Persistence(_) => {
            ErrorKind::Unavailable
        }
    }
}

/// Result type for sprint service operations.
pub type SprintServiceResult<T> = Result<T, SprintServiceError>;
