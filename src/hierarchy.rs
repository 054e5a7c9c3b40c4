//! Work breakdown tree over task ids.
//!
//! Every task hangs under exactly one parent: another task or the synthetic
//! root. Sibling order is the position in the parent's child list.

use crate::error::{ScheduleError, ScheduleResult};
use crate::task::TaskId;
use crate::task_store::TaskReferences;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TreeNode {
    SyntheticRoot,
    Task(TaskId),
}

impl From<TaskId> for TreeNode {
    fn from(id: TaskId) -> Self {
        TreeNode::Task(id)
    }
}

impl From<Option<TaskId>> for TreeNode {
    fn from(id: Option<TaskId>) -> Self {
        id.map_or(TreeNode::SyntheticRoot, TreeNode::Task)
    }
}

impl TreeNode {
    pub fn task(self) -> Option<TaskId> {
        match self {
            TreeNode::SyntheticRoot => None,
            TreeNode::Task(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    children: HashMap<TreeNode, Vec<TaskId>>,
    parents: HashMap<TaskId, TreeNode>,
    collapsed: HashSet<TaskId>,
    // Pre-order position of every task; dropped on any structural change.
    order_index: OnceCell<HashMap<TaskId, usize>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn contains(&self, task: TaskId) -> bool {
        self.parents.contains_key(&task)
    }

    fn ensure_node(&self, node: TreeNode) -> ScheduleResult<()> {
        match node {
            TreeNode::SyntheticRoot => Ok(()),
            TreeNode::Task(id) if self.contains(id) => Ok(()),
            TreeNode::Task(id) => Err(ScheduleError::TaskNotFound(id)),
        }
    }

    fn invalidate(&mut self) {
        self.order_index.take();
    }

    /// Attach a new task under `parent` at `index` (appended when `None`,
    /// clamped when past the end).
    pub fn insert(
        &mut self,
        task: TaskId,
        parent: impl Into<TreeNode>,
        index: Option<usize>,
    ) -> ScheduleResult<()> {
        let parent = parent.into();
        if self.contains(task) {
            return Err(ScheduleError::AlreadyInHierarchy(task));
        }
        self.ensure_node(parent)?;
        if parent == TreeNode::Task(task) {
            return Err(ScheduleError::CycleDetected(format!(
                "task {task} cannot be its own parent"
            )));
        }
        self.attach(task, parent, index);
        Ok(())
    }

    fn attach(&mut self, task: TaskId, parent: TreeNode, index: Option<usize>) {
        let siblings = self.children.entry(parent).or_default();
        let at = index.unwrap_or(siblings.len()).min(siblings.len());
        siblings.insert(at, task);
        self.parents.insert(task, parent);
        self.invalidate();
    }

    /// Returns the former parent and sibling position.
    fn detach(&mut self, task: TaskId) -> Option<(TreeNode, usize)> {
        let parent = self.parents.remove(&task)?;
        let siblings = self.children.get_mut(&parent)?;
        let position = siblings.iter().position(|&c| c == task)?;
        siblings.remove(position);
        if siblings.is_empty() {
            self.children.remove(&parent);
        }
        self.invalidate();
        Some((parent, position))
    }

    /// Remove a leaf from the tree.
    pub fn remove(&mut self, task: TaskId) -> ScheduleResult<()> {
        if !self.contains(task) {
            return Err(ScheduleError::TaskNotFound(task));
        }
        let references = self.children(task).len();
        if references > 0 {
            return Err(ScheduleError::HasDependents { task, references });
        }
        self.detach(task);
        self.collapsed.remove(&task);
        Ok(())
    }

    /// Reparent `task` under `new_parent` at `index`.
    ///
    /// Returns the tasks whose bounds may change: `task` itself plus the old
    /// and new ancestor chains.
    pub fn move_to(
        &mut self,
        task: TaskId,
        new_parent: impl Into<TreeNode>,
        index: usize,
    ) -> ScheduleResult<Vec<TaskId>> {
        let new_parent = new_parent.into();
        if !self.contains(task) {
            return Err(ScheduleError::TaskNotFound(task));
        }
        self.ensure_node(new_parent)?;
        if let TreeNode::Task(target) = new_parent {
            if target == task || self.is_ancestor(task, target) {
                return Err(ScheduleError::CycleDetected(format!(
                    "task {target} is task {task} or one of its descendants"
                )));
            }
        }

        let mut affected = vec![task];
        affected.extend(self.ancestors(task));
        self.detach(task);
        self.attach(task, new_parent, Some(index));
        for ancestor in self.ancestors(task) {
            if !affected.contains(&ancestor) {
                affected.push(ancestor);
            }
        }
        Ok(affected)
    }

    /// Put `task` back where [`Hierarchy::position`] reported it.
    pub(crate) fn restore_position(&mut self, task: TaskId, parent: TreeNode, index: usize) {
        self.detach(task);
        self.attach(task, parent, Some(index));
    }

    pub(crate) fn position(&self, task: TaskId) -> Option<(TreeNode, usize)> {
        let parent = *self.parents.get(&task)?;
        let index = self.children(parent).iter().position(|&c| c == task)?;
        Some((parent, index))
    }

    /// Parent task, `None` for top-level tasks and unknown ids.
    pub fn parent(&self, task: TaskId) -> Option<TaskId> {
        self.parents.get(&task).and_then(|node| node.task())
    }

    pub fn container(&self, task: TaskId) -> Option<TreeNode> {
        self.parents.get(&task).copied()
    }

    pub fn children(&self, node: impl Into<TreeNode>) -> &[TaskId] {
        self.children
            .get(&node.into())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_children(&self, task: TaskId) -> bool {
        !self.children(task).is_empty()
    }

    /// All descendants in pre-order, not including `node` itself.
    pub fn descendants(&self, node: impl Into<TreeNode>) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack: Vec<TaskId> = self.children(node).iter().rev().copied().collect();
        while let Some(task) = stack.pop() {
            out.push(task);
            stack.extend(self.children(task).iter().rev().copied());
        }
        out
    }

    /// Every task in document (pre-order) order.
    pub fn pre_order(&self) -> Vec<TaskId> {
        self.descendants(TreeNode::SyntheticRoot)
    }

    /// Ancestor tasks from the parent upwards, excluding the synthetic root.
    pub fn ancestors(&self, task: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut current = self.parent(task);
        while let Some(parent) = current {
            out.push(parent);
            current = self.parent(parent);
        }
        out
    }

    /// Whether `ancestor` lies on the path from `task` up to the root.
    pub fn is_ancestor(&self, ancestor: TaskId, task: TaskId) -> bool {
        let mut current = self.parent(task);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.parent(parent);
        }
        false
    }

    /// True when neither task contains the other.
    pub fn are_unrelated(&self, a: TaskId, b: TaskId) -> bool {
        a != b && !self.is_ancestor(a, b) && !self.is_ancestor(b, a)
    }

    /// 1-based sibling positions from the top level down to `task`
    /// (`[2, 1]` renders as WBS "2.1"). Empty for unknown tasks.
    pub fn outline_path(&self, task: TaskId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = task;
        while let Some((parent, index)) = self.position(current) {
            path.push(index + 1);
            match parent {
                TreeNode::Task(id) => current = id,
                TreeNode::SyntheticRoot => break,
            }
        }
        path.reverse();
        path
    }

    /// Root is 0, top-level tasks are 1.
    pub fn depth(&self, node: impl Into<TreeNode>) -> usize {
        match node.into() {
            TreeNode::SyntheticRoot => 0,
            TreeNode::Task(id) => self.ancestors(id).len() + 1,
        }
    }

    fn order_index(&self) -> &HashMap<TaskId, usize> {
        self.order_index.get_or_init(|| {
            self.pre_order()
                .into_iter()
                .enumerate()
                .map(|(pos, task)| (task, pos))
                .collect()
        })
    }

    /// Compare two tasks by their position in the outline. Unknown ids sort last.
    pub fn document_order(&self, a: TaskId, b: TaskId) -> Ordering {
        let index = self.order_index();
        let pos = |t: TaskId| index.get(&t).copied().unwrap_or(usize::MAX);
        pos(a).cmp(&pos(b))
    }

    /// Visit the subtree under `root` level by level. Returning `false` from
    /// `visit` skips the children of that task.
    pub fn breadth_first_search<F>(&self, root: impl Into<TreeNode>, mut visit: F)
    where
        F: FnMut(TreeNode, TaskId) -> bool,
    {
        let mut queue: VecDeque<TreeNode> = VecDeque::from([root.into()]);
        while let Some(parent) = queue.pop_front() {
            for &child in self.children(parent) {
                if visit(parent, child) {
                    queue.push_back(TreeNode::Task(child));
                }
            }
        }
    }

    /// Level-order listing of the subtree under `root`.
    pub fn breadth_first(&self, root: impl Into<TreeNode>) -> Vec<TaskId> {
        let mut out = Vec::new();
        self.breadth_first_search(root, |_, task| {
            out.push(task);
            true
        });
        out
    }

    /// Reorder every sibling list with `compare`. Expand state is keyed by
    /// id and survives unchanged.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(TaskId, TaskId) -> Ordering,
    {
        for siblings in self.children.values_mut() {
            siblings.sort_by(|a, b| compare(*a, *b));
        }
        self.invalidate();
    }

    pub fn set_expanded(&mut self, task: TaskId, expanded: bool) -> ScheduleResult<()> {
        if !self.contains(task) {
            return Err(ScheduleError::TaskNotFound(task));
        }
        if expanded {
            self.collapsed.remove(&task);
        } else {
            self.collapsed.insert(task);
        }
        Ok(())
    }

    pub fn is_expanded(&self, task: TaskId) -> bool {
        !self.collapsed.contains(&task)
    }
}

impl TaskReferences for Hierarchy {
    fn references(&self, task: TaskId) -> usize {
        self.children(task).len()
    }
}
