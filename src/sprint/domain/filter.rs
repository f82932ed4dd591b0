//! Sprint listing filter.

use super::{Sprint, SprintStatus};
use serde::{Deserialize, Serialize};

/// Criteria for listing sprints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SprintFilter {
    /// Only sprints in this status.
    pub status: Option<SprintStatus>,
    /// Case-insensitive substring of the name or goal.
    pub search: Option<String>,
}

impl SprintFilter {
    /// Returns whether `sprint` satisfies every criterion.
    #[must_use]
    pub fn matches(&self, sprint: &Sprint) -> bool {
        if self.status.is_some_and(|status| status != sprint.status()) {
            return false;
        }
        let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
            .map(str::to_lowercase)
        else {
            return true;
        };
        sprint.name().to_lowercase().contains(&needle)
            || sprint
                .goal()
                .is_some_and(|goal| goal.to_lowercase().contains(&needle))
    }
}
