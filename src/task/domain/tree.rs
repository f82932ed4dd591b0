//! Snapshot of a subtree with lazy depth-first traversal.

use super::{Task, TaskId};
use std::collections::{HashMap, HashSet};

/// Node yielded while walking a [`TaskTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeNode<'a> {
    /// The task at this node.
    pub task: &'a Task,
    /// Depth relative to the tree root (the root is depth 0).
    pub depth: u32,
}

/// Subtree snapshot rooted at one task.
///
/// The snapshot is taken once; [`TaskTree::iter`] can be called any number
/// of times and each call restarts the walk from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTree {
    root: Task,
    children: HashMap<TaskId, Vec<Task>>,
}

impl TaskTree {
    /// Creates a tree from a root and a parent-to-children map.
    ///
    /// Child lists are ordered by creation time, then identifier.
    #[must_use]
    pub fn new(root: Task, mut children: HashMap<TaskId, Vec<Task>>) -> Self {
        for siblings in children.values_mut() {
            siblings.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(&b.id()))
            });
        }
        Self { root, children }
    }

    /// Returns the root task.
    #[must_use]
    pub const fn root(&self) -> &Task {
        &self.root
    }

    /// Returns the direct children of `id` within the snapshot.
    #[must_use]
    pub fn children_of(&self, id: TaskId) -> &[Task] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the number of tasks in the snapshot, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Returns whether the snapshot holds only its root.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children_of(self.root.id()).is_empty()
    }

    /// Returns whether the snapshot is empty; a tree always holds its root.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Walks the tree depth-first, parents before children.
    #[must_use]
    pub fn iter(&self) -> TaskTreeIter<'_> {
        TaskTreeIter {
            tree: self,
            stack: vec![TreeNode {
                task: &self.root,
                depth: 0,
            }],
            visited: HashSet::new(),
        }
    }
}

impl<'a> IntoIterator for &'a TaskTree {
    type Item = TreeNode<'a>;
    type IntoIter = TaskTreeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy pre-order iterator over a [`TaskTree`].
#[derive(Debug, Clone)]
pub struct TaskTreeIter<'a> {
    tree: &'a TaskTree,
    stack: Vec<TreeNode<'a>>,
    visited: HashSet<TaskId>,
}

impl<'a> Iterator for TaskTreeIter<'a> {
    type Item = TreeNode<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let node = self.stack.pop()?;
            if !self.visited.insert(node.task.id()) {
                continue;
            }
            let depth = node.depth.saturating_add(1);
            self.stack.extend(
                self.tree
                    .children_of(node.task.id())
                    .iter()
                    .rev()
                    .map(|task| TreeNode { task, depth }),
            );
            return Some(node);
        }
    }
}
