//! Notification port for committed status changes.

use crate::task::domain::{StatusChange, Task};

/// Observer of committed task status changes.
///
/// Listeners run after the change is persisted and cannot veto it. They are
/// used to keep derived views, such as sprint boards, in step with the
/// task collection.
pub trait TaskStatusListener: Send + Sync {
    /// Called once per committed status change.
    fn task_status_changed(&self, task: &Task, change: StatusChange);
}
