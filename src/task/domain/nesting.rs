//! Lookup table of which task types may nest under which.

use super::{HierarchyViolation, TaskType};
use std::collections::{BTreeMap, BTreeSet};

/// Children accepted by one parent type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestingRule {
    allowed_children: BTreeSet<TaskType>,
    max_children: Option<usize>,
}

impl NestingRule {
    /// Accepts any number of children of the given types.
    #[must_use]
    pub fn unlimited(allowed: impl IntoIterator<Item = TaskType>) -> Self {
        Self {
            allowed_children: allowed.into_iter().collect(),
            max_children: None,
        }
    }

    /// Accepts at most `max` children of the given types.
    #[must_use]
    pub fn bounded(allowed: impl IntoIterator<Item = TaskType>, max: usize) -> Self {
        Self {
            allowed_children: allowed.into_iter().collect(),
            max_children: Some(max),
        }
    }

    /// Accepts no children.
    #[must_use]
    pub const fn leaf() -> Self {
        Self {
            allowed_children: BTreeSet::new(),
            max_children: Some(0),
        }
    }

    /// Returns whether `child` may be placed under this parent type.
    #[must_use]
    pub fn allows(&self, child: TaskType) -> bool {
        self.allowed_children.contains(&child)
    }

    /// Returns the maximum number of direct children, if bounded.
    #[must_use]
    pub const fn max_children(&self) -> Option<usize> {
        self.max_children
    }
}

/// Nesting rules keyed by parent type.
///
/// Parent types without an entry accept no children.
///
/// # Examples
///
/// ```
/// use fractal_planner::task::domain::{NestingRules, TaskType};
///
/// let rules = NestingRules::default();
/// assert!(rules.check(TaskType::Project, TaskType::Epic, 40).is_ok());
/// assert!(rules.check(TaskType::Task, TaskType::Task, 3).is_err());
/// assert!(rules.check(TaskType::Milestone, TaskType::Task, 0).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestingRules {
    rules: BTreeMap<TaskType, NestingRule>,
}

impl Default for NestingRules {
    fn default() -> Self {
        Self::empty()
            .with_rule(TaskType::Project, NestingRule::unlimited(TaskType::ALL))
            .with_rule(
                TaskType::Epic,
                NestingRule::unlimited([TaskType::Task, TaskType::Milestone]),
            )
            .with_rule(TaskType::Task, NestingRule::bounded([TaskType::Task], 3))
            .with_rule(TaskType::Milestone, NestingRule::leaf())
    }
}

impl NestingRules {
    /// Creates a table in which no type accepts children.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            rules: BTreeMap::new(),
        }
    }

    /// Replaces the rule for `parent`.
    #[must_use]
    pub fn with_rule(mut self, parent: TaskType, rule: NestingRule) -> Self {
        self.rules.insert(parent, rule);
        self
    }

    /// Returns the rule for `parent`, if any.
    #[must_use]
    pub fn rule_for(&self, parent: TaskType) -> Option<&NestingRule> {
        self.rules.get(&parent)
    }

    /// Checks whether a parent holding `existing_children` direct children
    /// can accept one more child of type `child`.
    ///
    /// # Errors
    ///
    /// Returns the violated rule.
    pub fn check(
        &self,
        parent: TaskType,
        child: TaskType,
        existing_children: usize,
    ) -> Result<(), HierarchyViolation> {
        let Some(rule) = self.rule_for(parent).filter(|rule| rule.allows(child)) else {
            return Err(HierarchyViolation::ChildTypeNotAllowed { parent, child });
        };
        match rule.max_children() {
            Some(max) if existing_children >= max => {
                Err(HierarchyViolation::ChildLimitReached { parent, max })
            }
            _ => Ok(()),
        }
    }
}
