//! Engine configuration shared by the task and sprint services.

use crate::task::domain::{NestingRules, ProgressWeighting};
use std::time::Duration;

/// What `remove` does with a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// Soft-delete subtrees to preserve history; hard-delete leaves.
    #[default]
    SoftDeleteWithDescendants,
    /// Always soft-delete.
    SoftDeleteAlways,
    /// Always hard-delete, cascading to descendants.
    HardDelete,
}

impl RetentionPolicy {
    /// Returns whether removing a subtree of `subtree_size` tasks (root
    /// included) keeps the records.
    #[must_use]
    pub const fn retains(self, subtree_size: usize) -> bool {
        match self {
            Self::SoftDeleteWithDescendants => subtree_size > 1,
            Self::SoftDeleteAlways => true,
            Self::HardDelete => false,
        }
    }
}

/// Configuration for the planner services.
///
/// # Examples
///
/// ```
/// use fractal_planner::config::{PlannerConfig, RetentionPolicy};
///
/// let config = PlannerConfig::default();
/// assert_eq!(config.retention, RetentionPolicy::SoftDeleteWithDescendants);
///
/// let ephemeral = PlannerConfig::ephemeral();
/// assert_eq!(ephemeral.retention, RetentionPolicy::HardDelete);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Which task types may nest under which.
    pub nesting: NestingRules,
    /// Soft or hard deletion behaviour.
    pub retention: RetentionPolicy,
    /// How children contribute to parent progress.
    pub weighting: ProgressWeighting,
    /// Page size when a listing does not ask for one.
    pub default_page_size: usize,
    /// Largest page size a listing may request.
    pub max_page_size: usize,
    /// Deadline for every repository call.
    pub repository_timeout: Duration,
    /// How many times a task write is attempted when concurrent writes keep
    /// invalidating what it read.
    pub commit_attempts: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            nesting: NestingRules::default(),
            retention: RetentionPolicy::default(),
            weighting: ProgressWeighting::default(),
            default_page_size: 20,
            max_page_size: 100,
            repository_timeout: Duration::from_secs(5),
            commit_attempts: 5,
        }
    }
}

impl PlannerConfig {
    /// Creates a configuration that never keeps deleted records.
    ///
    /// Useful for tests and scratch workspaces.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            retention: RetentionPolicy::HardDelete,
            ..Default::default()
        }
    }

    /// Creates a configuration that soft-deletes everything and weighs
    /// children equally.
    ///
    /// Useful when history matters more than estimate accuracy.
    #[must_use]
    pub fn archival() -> Self {
        Self {
            retention: RetentionPolicy::SoftDeleteAlways,
            weighting: ProgressWeighting::Uniform,
            ..Default::default()
        }
    }

    /// Sets the repository call deadline.
    #[must_use]
    pub const fn with_repository_timeout(mut self, timeout: Duration) -> Self {
        self.repository_timeout = timeout;
        self
    }

    /// Sets how many times a conflicting task write is attempted. Values
    /// below one are treated as one.
    #[must_use]
    pub const fn with_commit_attempts(mut self, attempts: u32) -> Self {
        self.commit_attempts = attempts;
        self
    }

    /// Replaces the nesting rule table.
    #[must_use]
    pub fn with_nesting(mut self, nesting: NestingRules) -> Self {
        self.nesting = nesting;
        self
    }
}
