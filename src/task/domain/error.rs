//! Error types for task domain validation and parsing.

use super::{TaskId, TaskStatus, TaskType};
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Lifecycle operation attempted on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionAction {
    /// Toggle between open and completed.
    Toggle,
    /// Mark complete.
    Complete,
    /// Reopen a completed task.
    Reopen,
    /// Start work on a drafted or recurring task.
    Activate,
    /// Return an active task to draft.
    Demote,
    /// Block with a reason.
    Block,
    /// Lift a block.
    Unblock,
    /// Archive.
    Archive,
    /// Restore from the archive.
    Unarchive,
    /// Move directly into the given status.
    MoveTo(TaskStatus),
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Toggle => f.write_str("toggle"),
            Self::Complete => f.write_str("complete"),
            Self::Reopen => f.write_str("reopen"),
            Self::Activate => f.write_str("activate"),
            Self::Demote => f.write_str("demote"),
            Self::Block => f.write_str("block"),
            Self::Unblock => f.write_str("unblock"),
            Self::Archive => f.write_str("archive"),
            Self::Unarchive => f.write_str("unarchive"),
            Self::MoveTo(status) => write!(f, "move to {status}"),
        }
    }
}

/// Why a parent cannot accept a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyViolation {
    /// The parent type does not accept children of this type.
    ChildTypeNotAllowed {
        /// Parent type.
        parent: TaskType,
        /// Rejected child type.
        child: TaskType,
    },
    /// The parent already holds its maximum number of children.
    ChildLimitReached {
        /// Parent type.
        parent: TaskType,
        /// Maximum number of direct children.
        max: usize,
    },
}

impl fmt::Display for HierarchyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChildTypeNotAllowed { parent, child } => {
                write!(f, "a {parent} cannot contain a {child}")
            }
            Self::ChildLimitReached { parent, max } => {
                write!(f, "a {parent} may hold at most {max} direct children")
            }
        }
    }
}

/// Why a task cannot be converted into a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionBlocker {
    /// Only root tasks can become projects.
    HasParent,
    /// The task already is a project or is a milestone.
    UnsupportedType(TaskType),
    /// An ancestor is blocked.
    BlockedAncestor(TaskId),
}

impl fmt::Display for ConversionBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HasParent => f.write_str("task has a parent"),
            Self::UnsupportedType(task_type) => write!(f, "a {task_type} cannot be converted"),
            Self::BlockedAncestor(id) => write!(f, "ancestor {id} is blocked"),
        }
    }
}

/// Errors returned by task domain rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// The title is empty after trimming.
    #[error("task title must not be empty")]
    EmptyTitle,

    /// The lifecycle action is not permitted from the current status.
    #[error("cannot {action} task {task_id} while it is {from}")]
    InvalidTransition {
        /// Task identifier.
        task_id: TaskId,
        /// Status at the time of the attempt.
        from: TaskStatus,
        /// Rejected action.
        action: TransitionAction,
    },

    /// Project conversion preconditions are unmet.
    #[error("cannot convert task {task_id} to a project: {reason}")]
    InvalidConversion {
        /// Task identifier.
        task_id: TaskId,
        /// Unmet precondition.
        reason: ConversionBlocker,
    },

    /// A recurrence computation was requested for a non-recurring rule.
    #[error("recurrence rule 'none' has no next occurrence")]
    InvalidRecurrence,

    /// The next occurrence falls outside the supported calendar.
    #[error("next occurrence after {0} is out of range")]
    OccurrenceOutOfRange(NaiveDate),

    /// A nesting rule rejects the requested placement.
    #[error("invalid hierarchy under {parent_id}: {violation}")]
    InvalidHierarchy {
        /// Prospective parent.
        parent_id: TaskId,
        /// Violated rule.
        violation: HierarchyViolation,
    },

    /// Progress of a task with children is derived and cannot be written.
    #[error("progress of task {0} is derived from its children")]
    DerivedProgress(TaskId),

    /// The reparent would make the task its own ancestor.
    #[error("moving task {task_id} under {parent_id} would create a cycle")]
    CyclicParent {
        /// Task being moved.
        task_id: TaskId,
        /// Requested parent.
        parent_id: TaskId,
    },
}

/// Error returned while parsing task enums from storage or requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseTaskValueError {
    /// Which value was being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

impl ParseTaskValueError {
    pub(super) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
