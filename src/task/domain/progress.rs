//! Progress roll-up arithmetic.

use super::{Hours, Task};
use serde::{Deserialize, Serialize};

/// How children contribute to their parent's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressWeighting {
    /// Children weigh their estimated hours; unestimated children weigh one
    /// hour.
    #[default]
    EstimatedHours,
    /// Every child weighs the same.
    Uniform,
}

impl ProgressWeighting {
    fn weight_of(self, estimate: Option<Hours>) -> u64 {
        const UNIT: u64 = 100;
        match (self, estimate) {
            (Self::EstimatedHours, Some(hours)) if !hours.is_zero() => u64::from(hours.hundredths()),
            _ => UNIT,
        }
    }
}

/// Computes the rounded (half-up) weighted mean of the children's progress.
///
/// Returns `0` for an empty set.
///
/// # Examples
///
/// ```
/// use fractal_planner::task::domain::{Hours, ProgressWeighting, aggregate_progress};
///
/// let children = [(100, Some(Hours::whole(3))), (0, Some(Hours::whole(1)))];
/// assert_eq!(aggregate_progress(children, ProgressWeighting::EstimatedHours), 75);
/// assert_eq!(aggregate_progress(children, ProgressWeighting::Uniform), 50);
/// ```
#[must_use]
pub fn aggregate_progress(
    children: impl IntoIterator<Item = (u8, Option<Hours>)>,
    weighting: ProgressWeighting,
) -> u8 {
    let (weighted_sum, total_weight) = children.into_iter().fold(
        (0_u64, 0_u64),
        |(sum, total), (progress, estimate)| {
            let weight = weighting.weight_of(estimate);
            let clamped = u64::from(progress.min(100));
            (
                sum.saturating_add(clamped.saturating_mul(weight)),
                total.saturating_add(weight),
            )
        },
    );

    if total_weight == 0 {
        return 0;
    }
    let rounded = weighted_sum
        .saturating_add(total_weight.div_euclid(2))
        .div_euclid(total_weight);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Aggregates the progress of `children` under `weighting`.
#[must_use]
pub fn aggregate_children<'a>(
    children: impl IntoIterator<Item = &'a Task>,
    weighting: ProgressWeighting,
) -> u8 {
    aggregate_progress(
        children
            .into_iter()
            .map(|child| (child.progress(), child.estimated_hours())),
        weighting,
    )
}
