//! Repository port for sprint persistence and lookup.

use crate::sprint::domain::{Sprint, SprintId};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for sprint repository operations.
pub type SprintRepositoryResult<T> = Result<T, SprintRepositoryError>;

/// Sprint persistence contract.
///
/// Implementations own the single-active-sprint invariant: a write that
/// would leave two active sprints is rejected atomically, so two
/// concurrent starts cannot both succeed.
#[async_trait]
pub trait SprintRepository: Send + Sync {
    /// Stores a new sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::DuplicateSprint`] when the
    /// identifier exists or [`SprintRepositoryError::ActiveSprintConflict`]
    /// when the sprint is active and another one already is.
    async fn store(&self, sprint: &Sprint) -> SprintRepositoryResult<()>;

    /// Replaces an existing sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::NotFound`] when the sprint does not
    /// exist or [`SprintRepositoryError::ActiveSprintConflict`] when the
    /// sprint is active and another one already is.
    async fn update(&self, sprint: &Sprint) -> SprintRepositoryResult<()>;

    /// Finds a sprint by identifier.
    async fn find_by_id(&self, id: SprintId) -> SprintRepositoryResult<Option<Sprint>>;

    /// Returns the active sprint, if any.
    async fn find_active(&self) -> SprintRepositoryResult<Option<Sprint>>;

    /// Returns every sprint.
    async fn list_all(&self) -> SprintRepositoryResult<Vec<Sprint>>;

    /// Deletes a sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintRepositoryError::NotFound`] when the sprint does not
    /// exist.
    async fn delete(&self, id: SprintId) -> SprintRepositoryResult<()>;
}

/// Errors returned by sprint repository implementations.
#[derive(Debug, Clone, Error)]
pub enum SprintRepositoryError {
    /// A sprint with the same identifier already exists.
    #[error("duplicate sprint identifier: {0}")]
    DuplicateSprint(SprintId),

    /// The sprint was not found.
    #[error("sprint not found: {0}")]
    NotFound(SprintId),

    /// Another sprint is already active.
    #[error("sprint {active} is already active")]
    ActiveSprintConflict {
        /// The sprint currently holding the active slot.
        active: SprintId,
    },

    /// The repository did not answer within the deadline.
    #[error("sprint repository timed out after {0:?}")]
    Timeout(Duration),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SprintRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
