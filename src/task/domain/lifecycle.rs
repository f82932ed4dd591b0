//! Status transitions for a single task.
//!
//! Every transition is a pure function of the persisted task: the status to
//! restore after `unblock` or `unarchive` lives in `previous_status` rather
//! than in the caller. Progress side effects are applied by the services,
//! which know whether the task has children.

use super::{
    ConversionBlocker, Task, TaskDomainError, TaskId, TaskStatus, TaskType, TransitionAction,
    recurrence::compute_next,
};
use mockable::Clock;

/// Status before and after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    /// Status before the transition.
    pub from: TaskStatus,
    /// Status after the transition.
    pub to: TaskStatus,
}

impl StatusChange {
    /// Returns whether the status actually changed.
    #[must_use]
    pub fn is_change(self) -> bool {
        self.from != self.to
    }
}

impl Task {
    /// Completes an open task or reopens a completed one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] for blocked or archived
    /// tasks.
    pub fn toggle(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        match self.status {
            TaskStatus::Completed => self.reopen(clock),
            status if status.is_completable() => self.complete(clock),
            _ => Err(self.rejected(TransitionAction::Toggle)),
        }
    }

    /// Marks the task complete.
    ///
    /// Recurring tasks are rescheduled instead: the current due date (or the
    /// completion date) becomes `last_occurrence`, the due date advances to
    /// the next occurrence and the status becomes [`TaskStatus::Recurring`].
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// draft, active or recurring, or a recurrence error when the next
    /// occurrence cannot be computed. The task is unchanged on error.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if !self.status.is_completable() {
            return Err(self.rejected(TransitionAction::Complete));
        }

        let now = clock.utc();
        if self.recurrence.is_recurring() {
            let occurrence = self.due_date.unwrap_or_else(|| now.date_naive());
            let next = compute_next(occurrence, self.recurrence)?;
            self.last_occurrence = Some(occurrence);
            self.next_occurrence = Some(next);
            self.due_date = Some(next);
            self.completed_at = Some(now);
            Ok(self.move_to(TaskStatus::Recurring, clock))
        } else {
            self.completed_at = Some(now);
            Ok(self.move_to(TaskStatus::Completed, clock))
        }
    }

    /// Reopens a completed task as active.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// completed.
    pub fn reopen(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if self.status != TaskStatus::Completed {
            return Err(self.rejected(TransitionAction::Reopen));
        }
        self.completed_at = None;
        Ok(self.move_to(TaskStatus::Active, clock))
    }

    /// Starts work on a drafted task or on the next cycle of a recurring one.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// draft or recurring.
    pub fn activate(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if !matches!(self.status, TaskStatus::Draft | TaskStatus::Recurring) {
            return Err(self.rejected(TransitionAction::Activate));
        }
        Ok(self.move_to(TaskStatus::Active, clock))
    }

    /// Returns an active task to draft.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// active.
    pub fn demote(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if self.status != TaskStatus::Active {
            return Err(self.rejected(TransitionAction::Demote));
        }
        Ok(self.move_to(TaskStatus::Draft, clock))
    }

    /// Blocks the task, remembering its current status for `unblock`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when the task is
    /// already blocked, archived or completed.
    pub fn block(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<StatusChange, TaskDomainError> {
        if matches!(
            self.status,
            TaskStatus::Blocked | TaskStatus::Archived | TaskStatus::Completed
        ) {
            return Err(self.rejected(TransitionAction::Block));
        }
        self.previous_status = Some(self.status);
        self.block_reason = Some(reason.into());
        Ok(self.move_to(TaskStatus::Blocked, clock))
    }

    /// Lifts a block, restoring the status held before blocking.
    ///
    /// Falls back to [`TaskStatus::Active`] when no prior status was
    /// recorded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// blocked.
    pub fn unblock(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if self.status != TaskStatus::Blocked {
            return Err(self.rejected(TransitionAction::Unblock));
        }
        let restored = self.previous_status.take().unwrap_or(TaskStatus::Active);
        self.block_reason = None;
        Ok(self.move_to(restored, clock))
    }

    /// Archives the task, remembering the status to restore.
    ///
    /// Archiving a blocked task folds the block away: the pre-block status
    /// is what `unarchive` restores.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when the task is
    /// already archived.
    pub fn archive(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        let restore_to = match self.status {
            TaskStatus::Archived => return Err(self.rejected(TransitionAction::Archive)),
            TaskStatus::Blocked => self.previous_status.unwrap_or(TaskStatus::Active),
            status => status,
        };
        self.previous_status = Some(restore_to);
        self.block_reason = None;
        Ok(self.move_to(TaskStatus::Archived, clock))
    }

    /// Restores an archived task to its recorded status.
    ///
    /// Falls back to [`TaskStatus::Draft`] when no prior status was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// archived.
    pub fn unarchive(&mut self, clock: &impl Clock) -> Result<StatusChange, TaskDomainError> {
        if self.status != TaskStatus::Archived {
            return Err(self.rejected(TransitionAction::Unarchive));
        }
        let restored = self.previous_status.take().unwrap_or(TaskStatus::Draft);
        Ok(self.move_to(restored, clock))
    }

    /// Converts a root task or epic into a project, keeping its status.
    ///
    /// `blocked_ancestor` is the first blocked ancestor found by the caller,
    /// if any.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidConversion`] when the task has a
    /// parent, a blocked ancestor, or is already a project or milestone.
    pub fn convert_to_project(
        &mut self,
        blocked_ancestor: Option<TaskId>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        let blocker = if matches!(self.task_type, TaskType::Project | TaskType::Milestone) {
            Some(ConversionBlocker::UnsupportedType(self.task_type))
        } else if self.parent_id.is_some() {
            Some(ConversionBlocker::HasParent)
        } else {
            blocked_ancestor.map(ConversionBlocker::BlockedAncestor)
        };

        if let Some(reason) = blocker {
            return Err(TaskDomainError::InvalidConversion {
                task_id: self.id,
                reason,
            });
        }

        self.task_type = TaskType::Project;
        self.touch(clock);
        Ok(())
    }

    /// Moves the task into a Kanban column by applying the matching
    /// lifecycle operation.
    ///
    /// Moving into the current status is a no-op. Recurring is only reached
    /// by completing a recurring task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] when no lifecycle
    /// operation leads from the current status to `target`.
    pub fn move_status(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<StatusChange, TaskDomainError> {
        let from = self.status;
        match (from, target) {
            (current, wanted) if current == wanted => Ok(StatusChange { from, to: from }),
            (_, TaskStatus::Completed) => self.complete(clock),
            (_, TaskStatus::Blocked) => self.block(String::new(), clock),
            (_, TaskStatus::Archived) => self.archive(clock),
            (TaskStatus::Completed, TaskStatus::Active) => self.reopen(clock),
            (TaskStatus::Draft | TaskStatus::Recurring, TaskStatus::Active) => {
                self.activate(clock)
            }
            (TaskStatus::Active, TaskStatus::Draft) => self.demote(clock),
            (TaskStatus::Blocked, TaskStatus::Active | TaskStatus::Draft) => {
                self.unblock_into(target, clock)
            }
            _ => Err(self.rejected(TransitionAction::MoveTo(target))),
        }
    }

    fn unblock_into(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<StatusChange, TaskDomainError> {
        let from = self.status;
        if target == TaskStatus::Draft && self.previous_status != Some(TaskStatus::Draft) {
            return Err(self.rejected(TransitionAction::MoveTo(target)));
        }
        let restored = self.unblock(clock)?;
        if restored.to != target {
            self.activate(clock)?;
        }
        Ok(StatusChange {
            from,
            to: self.status,
        })
    }

    fn move_to(&mut self, target: TaskStatus, clock: &impl Clock) -> StatusChange {
        let change = StatusChange {
            from: self.status,
            to: target,
        };
        self.status = target;
        self.touch(clock);
        change
    }

    const fn rejected(&self, action: TransitionAction) -> TaskDomainError {
        TaskDomainError::InvalidTransition {
            task_id: self.id,
            from: self.status,
            action,
        }
    }
}
