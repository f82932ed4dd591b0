//! Sprint aggregate root.

use super::{ParseSprintStatusError, SprintDomainError, SprintId};
use crate::identity::UserId;
use chrono::{DateTime, NaiveDate, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    /// Scheduled but not yet running.
    Planned,
    /// The sprint currently in progress; at most one at a time.
    Active,
    /// Finished; no further assignments are accepted.
    Completed,
}

impl SprintStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Planned, Self::Active) | (Self::Active, Self::Completed)
        )
    }

    /// Returns whether tasks may still be assigned to a sprint in this
    /// status.
    #[must_use]
    pub const fn accepts_tasks(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl fmt::Display for SprintStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SprintStatus {
    type Error = ParseSprintStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Ok(Self::Planned),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseSprintStatusError(value.to_owned())),
        }
    }
}

/// Parameter object describing a sprint to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintDraft {
    /// Sprint name; must not be blank.
    pub name: String,
    /// Optional sprint goal.
    pub goal: Option<String>,
    /// First day of the sprint.
    pub start_date: NaiveDate,
    /// Last day of the sprint; must be after `start_date`.
    pub end_date: NaiveDate,
}

impl SprintDraft {
    /// Creates a draft without a goal.
    #[must_use]
    pub fn new(name: impl Into<String>, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            goal: None,
            start_date,
            end_date,
        }
    }

    /// Sets the goal.
    #[must_use]
    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }
}

/// Sprint aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    id: SprintId,
    name: String,
    goal: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: SprintStatus,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    created_by: Option<UserId>,
    updated_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Sprint {
    /// Creates a planned sprint.
    ///
    /// # Errors
    ///
    /// Returns [`SprintDomainError::EmptyName`] for blank names and
    /// [`SprintDomainError::InvalidDateRange`] unless the start date is
    /// before the end date.
    pub fn new(
        draft: SprintDraft,
        actor: Option<UserId>,
        clock: &impl Clock,
    ) -> Result<Self, SprintDomainError> {
        let name = normalize_name(draft.name)?;
        check_range(draft.start_date, draft.end_date)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: SprintId::new(),
            name,
            goal: draft.goal,
            start_date: draft.start_date,
            end_date: draft.end_date,
            status: SprintStatus::Planned,
            started_at: None,
            completed_at: None,
            created_by: actor,
            updated_by: actor,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Returns the sprint identifier.
    #[must_use]
    pub const fn id(&self) -> SprintId {
        self.id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the goal, if any.
    #[must_use]
    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Returns the first day of the sprint.
    #[must_use]
    pub const fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Returns the last day of the sprint.
    #[must_use]
    pub const fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SprintStatus {
        self.status
    }

    /// Returns when the sprint was started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the sprint was completed.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
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

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns whether `date` falls within the sprint, both ends inclusive.
    #[must_use]
    pub fn covers(&self, date: NaiveDate) -> bool {
        (self.start_date..=self.end_date).contains(&date)
    }

    /// Replaces the name.
    ///
    /// # Errors
    ///
    /// Returns [`SprintDomainError::EmptyName`] for blank names.
    pub fn rename(
        &mut self,
        name: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), SprintDomainError> {
        self.name = normalize_name(name.into())?;
        self.touch(clock);
        Ok(())
    }

    /// Replaces or clears the goal.
    pub fn set_goal(&mut self, goal: Option<String>, clock: &impl Clock) {
        self.goal = goal;
        self.touch(clock);
    }

    /// Moves the sprint to a new date range.
    ///
    /// # Errors
    ///
    /// Returns [`SprintDomainError::InvalidDateRange`] unless `start_date`
    /// is before `end_date`.
    pub fn reschedule(
        &mut self,
        start_date: NaiveDate,
        end_date: NaiveDate,
        clock: &impl Clock,
    ) -> Result<(), SprintDomainError> {
        check_range(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;
        self.touch(clock);
        Ok(())
    }

    /// Marks a planned sprint active.
    ///
    /// Whether another sprint is already active is checked by the
    /// repository when the change is stored.
    ///
    /// # Errors
    ///
    /// Returns [`SprintDomainError::InvalidTransition`] unless the sprint is
    /// planned.
    pub fn start(&mut self, clock: &impl Clock) -> Result<(), SprintDomainError> {
        self.transition_to(SprintStatus::Active)?;
        self.started_at = Some(clock.utc());
        self.touch(clock);
        Ok(())
    }

    /// Marks an active sprint completed.
    ///
    /// # Errors
    ///
    /// Returns [`SprintDomainError::InvalidTransition`] unless the sprint is
    /// active.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), SprintDomainError> {
        self.transition_to(SprintStatus::Completed)?;
        self.completed_at = Some(clock.utc());
        self.touch(clock);
        Ok(())
    }

    /// Records the acting user for the latest change.
    pub const fn stamp(&mut self, actor: Option<UserId>) {
        self.updated_by = actor;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }

    fn transition_to(&mut self, target: SprintStatus) -> Result<(), SprintDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(SprintDomainError::InvalidTransition {
                sprint_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}

fn normalize_name(raw: String) -> Result<String, SprintDomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SprintDomainError::EmptyName);
    }
    Ok(trimmed.to_owned())
}

fn check_range(start: NaiveDate, end: NaiveDate) -> Result<(), SprintDomainError> {
    if start >= end {
        return Err(SprintDomainError::InvalidDateRange { start, end });
    }
    Ok(())
}
