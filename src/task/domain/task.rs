//! Task aggregate root and its value types.

use super::{Hours, ParseTaskValueError, TaskDomainError, TaskId, recurrence::compute_next};
use crate::identity::UserId;
use crate::sprint::domain::SprintId;
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Structural kind of a hierarchy node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Unit of work; may hold a handful of sub-tasks.
    Task,
    /// Top-level container with unlimited children of any type.
    Project,
    /// Large body of work grouping tasks and milestones.
    Epic,
    /// Checkpoint; never has children.
    Milestone,
}

impl TaskType {
    /// All task types in canonical order.
    pub const ALL: [Self; 4] = [Self::Task, Self::Project, Self::Epic, Self::Milestone];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Project => "project",
            Self::Epic => "epic",
            Self::Milestone => "milestone",
        }
    }

    /// Returns whether progress for this type is always derived from children.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, Self::Project | Self::Epic)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "project" => Ok(Self::Project),
            "epic" => Ok(Self::Epic),
            "milestone" => Ok(Self::Milestone),
            _ => Err(ParseTaskValueError::new("task type", value)),
        }
    }
}

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet started.
    Draft,
    /// Being worked on.
    Active,
    /// Finished.
    Completed,
    /// Waiting on an external impediment.
    Blocked,
    /// Finished for this cycle and rescheduled for the next occurrence.
    Recurring,
    /// Shelved; only `unarchive` leaves this state.
    Archived,
}

impl TaskStatus {
    /// All statuses in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Active,
        Self::Completed,
        Self::Blocked,
        Self::Recurring,
        Self::Archived,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Blocked => "blocked",
            Self::Recurring => "recurring",
            Self::Archived => "archived",
        }
    }

    /// Returns whether a task in this status can be marked complete.
    #[must_use]
    pub const fn is_completable(self) -> bool {
        matches!(self, Self::Draft | Self::Active | Self::Recurring)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "blocked" => Ok(Self::Blocked),
            "recurring" => Ok(Self::Recurring),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseTaskValueError::new("task status", value)),
        }
    }
}

/// Task priority, ordered from least to most pressing.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Normal scheduling.
    #[default]
    Medium,
    /// Should be picked up soon.
    High,
    /// Needs attention now.
    Urgent,
}

impl Priority {
    /// All priorities from lowest to highest.
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Priority {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(ParseTaskValueError::new("priority", value)),
        }
    }
}

/// Recurrence rule applied when a task is completed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    /// Completion is final.
    #[default]
    None,
    /// Repeats every day.
    Daily,
    /// Repeats every seven days.
    Weekly,
    /// Repeats on the same day of the next calendar month.
    Monthly,
    /// Repeats on the same date of the next calendar year.
    Yearly,
}

impl Recurrence {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Returns whether completion reschedules the task.
    #[must_use]
    pub const fn is_recurring(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for Recurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Recurrence {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(ParseTaskValueError::new("recurrence", value)),
        }
    }
}

/// Parameter object describing a task to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    /// Task title; must not be blank.
    pub title: String,
    /// Optional long-form description.
    pub description: Option<String>,
    /// Structural kind.
    pub task_type: TaskType,
    /// Priority.
    pub priority: Priority,
    /// Recurrence rule.
    pub recurrence: Recurrence,
    /// Optional due date.
    pub due_date: Option<NaiveDate>,
    /// Optional start date.
    pub start_date: Option<NaiveDate>,
    /// Optional effort estimate.
    pub estimated_hours: Option<Hours>,
    /// Free-form tags.
    pub tags: BTreeSet<String>,
}

impl TaskDraft {
    /// Creates a draft with defaults for everything but the title.
    #[must_use]
    pub fn new(title: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            title: title.into(),
            description: None,
            task_type,
            priority: Priority::default(),
            recurrence: Recurrence::default(),
            due_date: None,
            start_date: None,
            estimated_hours: None,
            tags: BTreeSet::new(),
        }
    }
}

/// Position of a new task in the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Parent identifier, or `None` for roots.
    pub parent_id: Option<TaskId>,
    /// Depth below the root.
    pub level: u32,
}

impl Placement {
    /// Placement of a root task.
    pub const ROOT: Self = Self {
        parent_id: None,
        level: 0,
    };

    /// Placement directly below `parent`.
    #[must_use]
    pub const fn under(parent: &Task) -> Self {
        Self {
            parent_id: Some(parent.id),
            level: parent.level.saturating_add(1),
        }
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub(super) id: TaskId,
    pub(super) title: String,
    pub(super) description: Option<String>,
    pub(super) task_type: TaskType,
    pub(super) status: TaskStatus,
    pub(super) previous_status: Option<TaskStatus>,
    pub(super) progress: u8,
    pub(super) priority: Priority,
    pub(super) parent_id: Option<TaskId>,
    pub(super) level: u32,
    pub(super) recurrence: Recurrence,
    pub(super) next_occurrence: Option<NaiveDate>,
    pub(super) last_occurrence: Option<NaiveDate>,
    pub(super) due_date: Option<NaiveDate>,
    pub(super) start_date: Option<NaiveDate>,
    pub(super) completed_at: Option<DateTime<Utc>>,
    pub(super) sprint_id: Option<SprintId>,
    pub(super) estimated_hours: Option<Hours>,
    pub(super) actual_hours: Option<Hours>,
    pub(super) tags: BTreeSet<String>,
    pub(super) block_reason: Option<String>,
    pub(super) created_by: Option<UserId>,
    pub(super) updated_by: Option<UserId>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) updated_at: DateTime<Utc>,
    pub(super) deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub(super) revision: u64,
}

impl Task {
    /// Creates a new draft task at the given placement.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank, or a
    /// recurrence error when the initial next occurrence cannot be computed.
    pub fn new(
        draft: TaskDraft,
        placement: Placement,
        actor: Option<UserId>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let title = normalize_title(draft.title)?;
        let next_occurrence = match draft.due_date {
            Some(due) if draft.recurrence.is_recurring() => {
                Some(compute_next(due, draft.recurrence)?)
            }
            _ => None,
        };
        let timestamp = clock.utc();

        Ok(Self {
            id: TaskId::new(),
            title,
            description: draft.description,
            task_type: draft.task_type,
            status: TaskStatus::Draft,
            previous_status: None,
            progress: 0,
            priority: draft.priority,
            parent_id: placement.parent_id,
            level: placement.level,
            recurrence: draft.recurrence,
            next_occurrence,
            last_occurrence: None,
            due_date: draft.due_date,
            start_date: draft.start_date,
            completed_at: None,
            sprint_id: None,
            estimated_hours: draft.estimated_hours,
            actual_hours: None,
            tags: normalize_tags(draft.tags),
            block_reason: None,
            created_by: actor,
            updated_by: actor,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
            revision: 0,
        })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the structural kind.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the status restored by `unblock` or `unarchive`.
    #[must_use]
    pub const fn previous_status(&self) -> Option<TaskStatus> {
        self.previous_status
    }

    /// Returns progress as a percentage.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns the owning parent, if any.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskId> {
        self.parent_id
    }

    /// Returns the depth below the root (roots are level 0).
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Returns whether the task has no parent.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Returns the recurrence rule.
    #[must_use]
    pub const fn recurrence(&self) -> Recurrence {
        self.recurrence
    }

    /// Returns the next scheduled occurrence for recurring tasks.
    #[must_use]
    pub const fn next_occurrence(&self) -> Option<NaiveDate> {
        self.next_occurrence
    }

    /// Returns the occurrence completed most recently.
    #[must_use]
    pub const fn last_occurrence(&self) -> Option<NaiveDate> {
        self.last_occurrence
    }

    /// Returns the due date.
    #[must_use]
    pub const fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    /// Returns the start date.
    #[must_use]
    pub const fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    /// Returns the last completion timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the sprint this task is planned into, if any.
    #[must_use]
    pub const fn sprint_id(&self) -> Option<SprintId> {
        self.sprint_id
    }

    /// Returns the effort estimate.
    #[must_use]
    pub const fn estimated_hours(&self) -> Option<Hours> {
        self.estimated_hours
    }

    /// Returns the effort spent so far.
    #[must_use]
    pub const fn actual_hours(&self) -> Option<Hours> {
        self.actual_hours
    }

    /// Returns the normalized tag set.
    #[must_use]
    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Returns the block reason while the task is blocked.
    #[must_use]
    pub fn block_reason(&self) -> Option<&str> {
        self.block_reason.as_deref()
    }

    /// Returns the creating user.
    #[must_use]
    pub const fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    /// Returns the user behind the latest change.
    #[must_use]
    pub const fn updated_by(&self) -> Option<UserId> {
        self.updated_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest change timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-deletion timestamp.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the task has not been soft-deleted.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Returns whether the task is past due on `today`.
    ///
    /// Completed tasks are never overdue.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Completed && self.due_date.is_some_and(|due| due < today)
    }

    /// Replaces the title.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTitle`] when the title is blank.
    pub fn rename(
        &mut self,
        title: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.title = normalize_title(title.into())?;
        self.touch(clock);
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>, clock: &impl Clock) {
        self.description = description;
        self.touch(clock);
    }

    /// Replaces the priority.
    pub fn set_priority(&mut self, priority: Priority, clock: &impl Clock) {
        self.priority = priority;
        self.touch(clock);
    }

    /// Replaces the start date.
    pub fn set_start_date(&mut self, start_date: Option<NaiveDate>, clock: &impl Clock) {
        self.start_date = start_date;
        self.touch(clock);
    }

    /// Replaces the effort estimate.
    pub fn set_estimated_hours(&mut self, hours: Option<Hours>, clock: &impl Clock) {
        self.estimated_hours = hours;
        self.touch(clock);
    }

    /// Replaces the effort spent.
    pub fn set_actual_hours(&mut self, hours: Option<Hours>, clock: &impl Clock) {
        self.actual_hours = hours;
        self.touch(clock);
    }

    /// Adds logged effort to the effort spent.
    pub fn log_hours(&mut self, hours: Hours, clock: &impl Clock) {
        self.actual_hours = Some(self.actual_hours.unwrap_or_default() + hours);
        self.touch(clock);
    }

    /// Replaces the tag set; tags are trimmed, lowercased and de-duplicated.
    pub fn set_tags(&mut self, tags: impl IntoIterator<Item = String>, clock: &impl Clock) {
        self.tags = normalize_tags(tags);
        self.touch(clock);
    }

    /// Replaces the due date, rescheduling the next occurrence.
    ///
    /// # Errors
    ///
    /// Returns a recurrence error when the next occurrence overflows the
    /// supported calendar range.
    pub fn set_due_date(
        &mut self,
        due_date: Option<NaiveDate>,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.next_occurrence = scheduled_occurrence(due_date, self.recurrence)?;
        self.due_date = due_date;
        self.touch(clock);
        Ok(())
    }

    /// Replaces the recurrence rule.
    ///
    /// Clearing the rule clears `next_occurrence`; setting one with a due
    /// date schedules it.
    ///
    /// # Errors
    ///
    /// Returns a recurrence error when the next occurrence overflows the
    /// supported calendar range.
    pub fn set_recurrence(
        &mut self,
        recurrence: Recurrence,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.next_occurrence = scheduled_occurrence(self.due_date, recurrence)?;
        self.recurrence = recurrence;
        self.touch(clock);
        Ok(())
    }

    /// Returns the number of writes committed since the task was stored.
    ///
    /// Repositories reject a write staged from an older revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Moves the task to the revision following the current one.
    ///
    /// Called by repositories when they store a write.
    pub const fn advance_revision(&mut self) {
        self.revision = self.revision.saturating_add(1);
    }

    /// Records the acting user for the latest change.
    pub const fn stamp(&mut self, actor: Option<UserId>) {
        self.updated_by = actor;
    }

    pub(crate) const fn set_progress(&mut self, progress: u8) {
        self.progress = clamp_progress(progress);
    }

    pub(crate) fn report_progress(&mut self, progress: u8, clock: &impl Clock) {
        self.set_progress(progress);
        self.touch(clock);
    }

    pub(crate) fn place(&mut self, placement: Placement, clock: &impl Clock) {
        self.parent_id = placement.parent_id;
        self.level = placement.level;
        self.touch(clock);
    }

    pub(crate) const fn set_level(&mut self, level: u32) {
        self.level = level;
    }

    pub(crate) fn assign_sprint(&mut self, sprint_id: Option<SprintId>, clock: &impl Clock) {
        self.sprint_id = sprint_id;
        self.touch(clock);
    }

    pub(crate) fn mark_deleted(&mut self, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.deleted_at = Some(timestamp);
        self.updated_at = timestamp;
    }

    /// Updates the `updated_at` timestamp to the current clock time.
    pub(super) fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

const fn clamp_progress(progress: u8) -> u8 {
    if progress > 100 { 100 } else { progress }
}

fn scheduled_occurrence(
    due_date: Option<NaiveDate>,
    recurrence: Recurrence,
) -> Result<Option<NaiveDate>, TaskDomainError> {
    match due_date {
        Some(due) if recurrence.is_recurring() => compute_next(due, recurrence).map(Some),
        _ => Ok(None),
    }
}

fn normalize_title(raw: String) -> Result<String, TaskDomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TaskDomainError::EmptyTitle);
    }
    Ok(trimmed.to_owned())
}

fn normalize_tags(tags: impl IntoIterator<Item = String>) -> BTreeSet<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
