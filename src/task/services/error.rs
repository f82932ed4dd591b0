//! Service-level errors for task hierarchy and lifecycle operations.

use crate::error::ErrorKind;
use crate::task::{
    domain::{TaskDomainError, TaskId},
    ports::TaskRepositoryError,
};
use thiserror::Error;

/// Service-level errors for task operations.
#[derive(Debug, Error)]
pub enum TaskServiceError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// No live task exists with the given identifier.
    #[error("task {0} not found")]
    NotFound(TaskId),
}

impl TaskServiceError {
    /// Classifies the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => domain_kind(err),
            Self::Repository(err) => repository_kind(err),
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Returns whether the caller may retry the operation unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

const fn domain_kind(err: &TaskDomainError) -> ErrorKind {
    match err {
        TaskDomainError::EmptyTitle => ErrorKind::Validation,
        TaskDomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        TaskDomainError::InvalidConversion { .. } => ErrorKind::InvalidConversion,
        TaskDomainError::InvalidRecurrence | TaskDomainError::OccurrenceOutOfRange(_) => {
            ErrorKind::InvalidRecurrence
        }
        TaskDomainError::InvalidHierarchy { .. } | TaskDomainError::DerivedProgress(_) => {
            ErrorKind::InvalidHierarchy
        }
        TaskDomainError::CyclicParent { .. } => ErrorKind::CyclicParent,
    }
}

const fn repository_kind(err: &TaskRepositoryError) -> ErrorKind {
    match err {
        TaskRepositoryError::DuplicateTask(_) => ErrorKind::Conflict,
        TaskRepositoryError::NotFound(_) => ErrorKind::NotFound,
        TaskRepositoryError::StaleTask(_)
        | TaskRepositoryError::Timeout(_)
        | TaskRepositoryError::Persistence(_) => ErrorKind::Unavailable,
    }
}

/// Result type for task service operations.
pub type TaskServiceResult<T> = Result<T, TaskServiceError>;
