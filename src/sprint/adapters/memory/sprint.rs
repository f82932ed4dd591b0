//! In-memory repository for sprints.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::sprint::{
    domain::{Sprint, SprintId, SprintStatus},
    ports::{SprintRepository, SprintRepositoryError, SprintRepositoryResult},
};

/// Thread-safe in-memory sprint repository.
#[derive(Debug, Clone, Default)]
pub struct InMemorySprintRepository {
    state: Arc<RwLock<HashMap<SprintId, Sprint>>>,
}

impl InMemorySprintRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rejects `sprint` when it is active and a different stored sprint is too.
fn check_active_slot(
    sprints: &HashMap<SprintId, Sprint>,
    sprint: &Sprint,
) -> SprintRepositoryResult<()> {
    if sprint.status() != SprintStatus::Active {
        return Ok(());
    }
    match sprints
        .values()
        .find(|stored| stored.status() == SprintStatus::Active && stored.id() != sprint.id())
    {
        Some(active) => Err(SprintRepositoryError::ActiveSprintConflict { active: active.id() }),
        None => Ok(()),
    }
}

#[async_trait]
impl SprintRepository for InMemorySprintRepository {
    async fn store(&self, sprint: &Sprint) -> SprintRepositoryResult<()> {
        let mut sprints = self.state.write().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if sprints.contains_key(&sprint.id()) {
            return Err(SprintRepositoryError::DuplicateSprint(sprint.id()));
        }
        check_active_slot(&sprints, sprint)?;
        sprints.insert(sprint.id(), sprint.clone());
        Ok(())
    }

    async fn update(&self, sprint: &Sprint) -> SprintRepositoryResult<()> {
        let mut sprints = self.state.write().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        if !sprints.contains_key(&sprint.id()) {
            return Err(SprintRepositoryError::NotFound(sprint.id()));
        }
        check_active_slot(&sprints, sprint)?;
        sprints.insert(sprint.id(), sprint.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: SprintId) -> SprintRepositoryResult<Option<Sprint>> {
        let sprints = self.state.read().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(sprints.get(&id).cloned())
    }

    async fn find_active(&self) -> SprintRepositoryResult<Option<Sprint>> {
        let sprints = self.state.read().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(sprints
            .values()
            .find(|sprint| sprint.status() == SprintStatus::Active)
            .cloned())
    }

    async fn list_all(&self) -> SprintRepositoryResult<Vec<Sprint>> {
        let sprints = self.state.read().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        Ok(sprints.values().cloned().collect())
    }

    async fn delete(&self, id: SprintId) -> SprintRepositoryResult<()> {
        let mut sprints = self.state.write().map_err(|err| {
            SprintRepositoryError::persistence(std::io::Error::other(err.to_string()))
        })?;
        sprints
            .remove(&id)
            .map(|_| ())
            .ok_or(SprintRepositoryError::NotFound(id))
    }
}
