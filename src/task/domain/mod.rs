//! Domain model for the fractal task hierarchy.
//!
//! Tasks, projects, epics and milestones share one aggregate. The domain
//! owns the lifecycle state machine, the nesting rule table, progress
//! arithmetic and recurrence scheduling, while the services decide which
//! records a change touches and commit them together.

mod error;
mod filter;
mod ids;
mod lifecycle;
mod nesting;
mod progress;
mod recurrence;
mod stats;
mod task;
mod tree;

pub use error::{
    ConversionBlocker, HierarchyViolation, ParseTaskValueError, TaskDomainError, TransitionAction,
};
pub use filter::{SortBy, SortOrder, TaskFilter, TaskPage};
pub use ids::{Hours, TaskId};
pub use lifecycle::StatusChange;
pub use nesting::{NestingRule, NestingRules};
pub use progress::{ProgressWeighting, aggregate_children, aggregate_progress};
pub use recurrence::compute_next;
pub use stats::TaskStats;
pub use task::{Placement, Priority, Recurrence, Task, TaskDraft, TaskStatus, TaskType};
pub use tree::{TaskTree, TaskTreeIter, TreeNode};
