//! Calendar-aware scheduling of recurring tasks.

use super::{Recurrence, TaskDomainError};
use chrono::{Days, Months, NaiveDate};

/// Computes the occurrence following `base` under `recurrence`.
///
/// Month arithmetic clamps to the last day of the target month, so
/// January 31 advances to the end of February and February 29 advances to
/// February 28 in non-leap years.
///
/// # Errors
///
/// Returns [`TaskDomainError::InvalidRecurrence`] for [`Recurrence::None`]
/// and [`TaskDomainError::OccurrenceOutOfRange`] when the result leaves the
/// representable calendar.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use fractal_planner::task::domain::{Recurrence, compute_next};
///
/// let base = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap_or_default();
/// let next = compute_next(base, Recurrence::Monthly);
/// assert_eq!(next.ok(), NaiveDate::from_ymd_opt(2024, 2, 29));
/// ```
pub fn compute_next(base: NaiveDate, recurrence: Recurrence) -> Result<NaiveDate, TaskDomainError> {
    let next = match recurrence {
        Recurrence::None => return Err(TaskDomainError::InvalidRecurrence),
        Recurrence::Daily => base.checked_add_days(Days::new(1)),
        Recurrence::Weekly => base.checked_add_days(Days::new(7)),
        Recurrence::Monthly => base.checked_add_months(Months::new(1)),
        Recurrence::Yearly => base.checked_add_months(Months::new(12)),
    };
    next.ok_or(TaskDomainError::OccurrenceOutOfRange(base))
}
