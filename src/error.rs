//! Error classification shared by task and sprint services.
//!
//! Each service error maps onto an [`ErrorKind`] so that callers (for
//! example a transport layer) can branch on the failure class without
//! matching every nested variant.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure class for service errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// An unknown task or sprint identifier was referenced.
    NotFound,
    /// A nesting rule, child limit or derived-progress rule was violated.
    InvalidHierarchy,
    /// A reparent would make a task its own ancestor.
    CyclicParent,
    /// The requested lifecycle change is not allowed from the current state.
    InvalidTransition,
    /// Project conversion preconditions are unmet.
    InvalidConversion,
    /// A recurrence computation was requested for a non-recurring rule.
    InvalidRecurrence,
    /// Another sprint already holds the active slot.
    ActiveSprintConflict,
    /// Persistence failed or timed out; the operation may be retried.
    Unavailable,
    /// Input failed validation (empty title, inverted date range, ...).
    Validation,
    /// The operation conflicts with stored state (duplicates, assigned tasks).
    Conflict,
}

impl ErrorKind {
    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidHierarchy => "invalid_hierarchy",
            Self::CyclicParent => "cyclic_parent",
            Self::InvalidTransition => "invalid_transition",
            Self::InvalidConversion => "invalid_conversion",
            Self::InvalidRecurrence => "invalid_recurrence",
            Self::ActiveSprintConflict => "active_sprint_conflict",
            Self::Unavailable => "unavailable",
            Self::Validation => "validation",
            Self::Conflict => "conflict",
        }
    }

    /// Returns whether a caller may retry the failed operation unchanged.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
