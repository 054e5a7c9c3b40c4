use crate::calculations::{BackwardPass, CriticalPathReport, ForwardPass};
use crate::calendar::WorkCalendar;
use crate::error::{ConstraintViolation, ScheduleError, ScheduleResult};
use crate::graph::{
    ConstraintType, Dependency, DependencyGraph, EdgeId, Hardness, ScheduleDag, TruncationPolicy,
};
use crate::hierarchy::{Hierarchy, TreeNode};
use crate::metadata::ScheduleMetadata;
use crate::resource::ResourceAssignment;
use crate::task::{Color, CustomValue, Priority, SchedulingMode, Task, TaskId};
use crate::task_store::{TaskReferences, TaskStore};
use crate::task_validation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

/// Outcome of one `recalculate()` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalcSummary {
    pub scheduled: usize,
    pub changed: Vec<TaskId>,
    pub violations: Vec<ConstraintViolation>,
}

impl RecalcSummary {
    pub fn has_warnings(&self) -> bool {
        !self.violations.is_empty()
    }
}

impl fmt::Display for RecalcSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scheduled {} task(s): {} changed, {} warning(s)",
            self.scheduled,
            self.changed.len(),
            self.violations.len()
        )
    }
}

/// Placement of one task in the outline; `parent: None` is the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub task: TaskId,
    pub parent: Option<TaskId>,
}

/// Complete model state, for undo and for persistence layers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    pub metadata: ScheduleMetadata,
    pub calendar: WorkCalendar,
    pub tasks: Vec<Task>,
    /// Pre-order, so every parent precedes its children.
    pub tree: Vec<TreeEntry>,
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub collapsed: Vec<TaskId>,
}

/// The scheduling model: task store, outline, dependencies and calendar,
/// plus the set of tasks awaiting `recalculate()`.
///
/// Edits validate and apply immediately but only mark tasks dirty; dates
/// are brought back in line by an explicit [`Schedule::recalculate`].
#[derive(Debug, Clone)]
pub struct Schedule {
    metadata: ScheduleMetadata,
    calendar: WorkCalendar,
    store: TaskStore,
    hierarchy: Hierarchy,
    dependencies: DependencyGraph,
    dirty: BTreeSet<TaskId>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self {
            metadata: ScheduleMetadata::default(),
            calendar: WorkCalendar::default(),
            store: TaskStore::new(),
            hierarchy: Hierarchy::new(),
            dependencies: DependencyGraph::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub fn new_with_metadata(metadata: ScheduleMetadata) -> ScheduleResult<Self> {
        Self::new_with_metadata_and_calendar(metadata, WorkCalendar::default())
    }

    pub fn new_with_metadata_and_calendar(
        metadata: ScheduleMetadata,
        calendar: WorkCalendar,
    ) -> ScheduleResult<Self> {
        metadata.validate()?;
        Ok(Self {
            metadata,
            calendar,
            ..Self::new()
        })
    }

    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.store
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn dependencies(&self) -> &DependencyGraph {
        &self.dependencies
    }

    pub fn task(&self, id: TaskId) -> ScheduleResult<&Task> {
        self.store.get(id)
    }

    pub fn set_metadata(&mut self, metadata: ScheduleMetadata) -> ScheduleResult<()> {
        metadata.validate()?;
        let reschedule = metadata.project_start_date != self.metadata.project_start_date
            || metadata.clamp_target != self.metadata.clamp_target;
        self.metadata = metadata;
        if reschedule {
            self.mark_all_dirty();
        }
        Ok(())
    }

    pub fn set_project_start(&mut self, start: NaiveDate) -> ScheduleResult<()> {
        let mut metadata = self.metadata.clone();
        metadata.project_start_date = start;
        self.set_metadata(metadata)
    }

    /// Replace the calendar. Every task becomes dirty.
    pub fn set_calendar(&mut self, calendar: WorkCalendar) {
        self.calendar = calendar;
        self.mark_all_dirty();
    }

    /// Edit the calendar in place, e.g. to add a holiday. The edit runs on a
    /// copy and is only kept when it succeeds.
    pub fn update_calendar<T, F>(&mut self, edit: F) -> ScheduleResult<T>
    where
        F: FnOnce(&mut WorkCalendar) -> ScheduleResult<T>,
    {
        let mut calendar = self.calendar.clone();
        let out = edit(&mut calendar)?;
        self.set_calendar(calendar);
        Ok(out)
    }

    // ---- dirty tracking ----

    pub fn is_dirty(&self, task: TaskId) -> bool {
        self.dirty.contains(&task)
    }

    pub fn dirty_tasks(&self) -> &BTreeSet<TaskId> {
        &self.dirty
    }

    fn full_dag(&self) -> ScheduleDag {
        ScheduleDag::build(self.store.ids(), &self.hierarchy, &self.dependencies)
    }

    /// Mark `seeds`, everything after them in the ordering graph and their
    /// containers.
    fn mark_dirty<I>(&mut self, seeds: I)
    where
        I: IntoIterator<Item = TaskId>,
    {
        let seeds: Vec<TaskId> = seeds
            .into_iter()
            .filter(|id| self.store.contains(*id))
            .collect();
        if seeds.is_empty() {
            return;
        }
        let reached = self.full_dag().closure(seeds);
        self.dirty.extend(reached);
    }

    fn mark_all_dirty(&mut self) {
        self.dirty.extend(self.store.ids());
    }

    /// `task` and, for containers, everything inside it.
    fn with_descendants(&self, task: TaskId) -> Vec<TaskId> {
        let mut out = vec![task];
        out.extend(self.hierarchy.descendants(task));
        out
    }

    // ---- tasks ----

    /// Create a task under `parent` (top level when `None`) at sibling
    /// position `index` (appended when `None`).
    pub fn add_task(&mut self, parent: Option<TaskId>, index: Option<usize>) -> ScheduleResult<TaskId> {
        let start = match parent {
            Some(p) => self.store.get(p)?.start,
            None => self.metadata.project_start_date,
        };
        let id = self.store.create(start, &self.calendar)?;
        self.hierarchy.insert(id, TreeNode::from(parent), index)?;
        if let Some(p) = parent {
            self.make_container(p)?;
        }
        debug!(task = id, ?parent, "task added");
        self.mark_dirty([id]);
        Ok(id)
    }

    /// Containers are always automatic and never milestones.
    fn make_container(&mut self, task: TaskId) -> ScheduleResult<()> {
        let record = self.store.get(task)?;
        let (manual, milestone) = (record.is_manual(), record.milestone);
        if manual {
            debug!(task, "container switched to automatic scheduling");
            self.store.set_mode(task, SchedulingMode::Automatic)?;
        }
        if milestone {
            self.store.set_milestone(task, false, &self.calendar)?;
        }
        Ok(())
    }

    fn reject_container(&self, task: TaskId, field: &'static str) -> ScheduleResult<()> {
        self.store.get(task)?;
        if self.hierarchy.has_children(task) {
            return Err(ScheduleError::invalid(
                task,
                field,
                "containers derive this from their children",
            ));
        }
        Ok(())
    }

    pub fn set_task_name(&mut self, task: TaskId, name: impl Into<String>) -> ScheduleResult<()> {
        self.store.set_name(task, name)
    }

    pub fn set_task_start(&mut self, task: TaskId, start: NaiveDate) -> ScheduleResult<()> {
        self.reject_container(task, "start")?;
        self.store.set_start(task, start, &self.calendar)?;
        self.mark_dirty([task]);
        Ok(())
    }

    pub fn set_task_end(&mut self, task: TaskId, end: NaiveDate) -> ScheduleResult<()> {
        self.reject_container(task, "end")?;
        self.store.set_end(task, end, &self.calendar)?;
        self.mark_dirty([task]);
        Ok(())
    }

    pub fn set_task_duration(&mut self, task: TaskId, duration: i64) -> ScheduleResult<()> {
        self.reject_container(task, "duration")?;
        self.store.set_duration(task, duration, &self.calendar)?;
        self.mark_dirty([task]);
        Ok(())
    }

    pub fn set_task_milestone(&mut self, task: TaskId, milestone: bool) -> ScheduleResult<()> {
        self.reject_container(task, "milestone")?;
        self.store.set_milestone(task, milestone, &self.calendar)?;
        self.mark_dirty([task]);
        Ok(())
    }

    pub fn set_task_mode(&mut self, task: TaskId, mode: SchedulingMode) -> ScheduleResult<()> {
        if mode == SchedulingMode::Manual {
            self.reject_container(task, "mode")?;
        }
        self.store.set_mode(task, mode)?;
        self.mark_dirty([task]);
        Ok(())
    }

    pub fn set_task_earliest_start(
        &mut self,
        task: TaskId,
        earliest_start: Option<NaiveDate>,
    ) -> ScheduleResult<()> {
        self.store.set_earliest_start(task, earliest_start)?;
        self.mark_dirty([task]);
        Ok(())
    }

    /// Containers derive their completion from their children on the next
    /// `recalculate()`, so only leaves accept a value.
    pub fn set_task_completion(&mut self, task: TaskId, completion: u8) -> ScheduleResult<()> {
        self.reject_container(task, "completion")?;
        self.store.set_completion(task, completion)?;
        let containers = self.hierarchy.ancestors(task);
        self.dirty.extend(containers);
        Ok(())
    }

    pub fn set_task_color(&mut self, task: TaskId, color: Color) -> ScheduleResult<()> {
        self.store.set_color(task, color)
    }

    pub fn set_task_priority(&mut self, task: TaskId, priority: Priority) -> ScheduleResult<()> {
        self.store.set_priority(task, priority)
    }

    pub fn set_task_custom_field(
        &mut self,
        task: TaskId,
        index: usize,
        value: Option<CustomValue>,
    ) -> ScheduleResult<()> {
        self.store.set_custom_field(task, index, value)
    }

    pub fn set_task_notes(&mut self, task: TaskId, notes: Option<String>) -> ScheduleResult<()> {
        self.store.set_notes(task, notes)
    }

    pub fn set_task_assignments(
        &mut self,
        task: TaskId,
        assignments: Vec<ResourceAssignment>,
    ) -> ScheduleResult<()> {
        self.store.set_assignments(task, assignments)
    }

    pub fn set_task_expanded(&mut self, task: TaskId, expanded: bool) -> ScheduleResult<()> {
        self.hierarchy.set_expanded(task, expanded)
    }

    /// Reparent `task` under `new_parent` (top level when `None`).
    ///
    /// Rejected, with the outline left as it was, when the move would put a
    /// dependency between a task and its own container or close an ordering
    /// cycle through inherited dependencies.
    pub fn move_task(
        &mut self,
        task: TaskId,
        new_parent: Option<TaskId>,
        index: usize,
    ) -> ScheduleResult<()> {
        self.store.get(task)?;
        let (old_parent, old_index) = self
            .hierarchy
            .position(task)
            .ok_or(ScheduleError::TaskNotFound(task))?;

        let affected = self.hierarchy.move_to(task, TreeNode::from(new_parent), index)?;
        if let Err(err) = self.check_moved_subtree(task) {
            self.hierarchy.restore_position(task, old_parent, old_index);
            warn!(task, ?new_parent, error = %err, "move rejected");
            return Err(err);
        }

        let incident = self.dependencies.move_task(task, new_parent);
        debug!(task, ?new_parent, ?affected, edges = incident.len(), "task moved");
        if let Some(p) = new_parent {
            self.make_container(p)?;
        }
        let mut seeds = affected;
        seeds.extend(self.hierarchy.descendants(task));
        self.mark_dirty(seeds);
        Ok(())
    }

    fn check_moved_subtree(&self, task: TaskId) -> ScheduleResult<()> {
        for member in self.with_descendants(task) {
            let incident = self
                .dependencies
                .predecessors_of(member)
                .into_iter()
                .chain(self.dependencies.successors_of(member));
            for dep in incident {
                if !self.hierarchy.are_unrelated(dep.predecessor, dep.successor) {
                    return Err(ScheduleError::HierarchyDependency {
                        predecessor: dep.predecessor,
                        successor: dep.successor,
                    });
                }
            }
        }
        if self.full_dag().is_cyclic() {
            return Err(ScheduleError::CycleDetected(format!(
                "moving task {task} closes a dependency cycle"
            )));
        }
        Ok(())
    }

    /// Delete `task`, its whole subtree and every edge touching them.
    /// Returns the removed ids, children before parents.
    pub fn delete_task(&mut self, task: TaskId) -> ScheduleResult<Vec<TaskId>> {
        self.store.get(task)?;
        let parent = self.hierarchy.parent(task);

        let mut doomed = self.with_descendants(task);
        doomed.reverse();
        let doomed_set: HashSet<TaskId> = doomed.iter().copied().collect();

        let mut seeds: Vec<TaskId> = parent.into_iter().collect();
        for &id in &doomed {
            for dep in self.dependencies.remove_task_edges(id) {
                if !doomed_set.contains(&dep.successor) {
                    seeds.push(dep.successor);
                    seeds.extend(self.hierarchy.descendants(dep.successor));
                }
            }
            self.hierarchy.remove(id)?;
            let holders: [&dyn TaskReferences; 2] = [&self.hierarchy, &self.dependencies];
            self.store.delete(id, &holders)?;
            self.dirty.remove(&id);
        }

        debug!(task, removed = doomed.len(), "task deleted");
        self.mark_dirty(seeds);
        Ok(doomed)
    }

    /// Reorder siblings at every level. Dates are unaffected.
    pub fn sort_tasks<F>(&mut self, mut compare: F)
    where
        F: FnMut(&Task, &Task) -> Ordering,
    {
        let store = &self.store;
        self.hierarchy.sort_by(|a, b| match (store.get(a), store.get(b)) {
            (Ok(a), Ok(b)) => compare(a, b),
            _ => a.cmp(&b),
        });
    }

    // ---- dependencies ----

    pub fn add_dependency(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        constraint: ConstraintType,
        lag: i64,
    ) -> ScheduleResult<EdgeId> {
        self.add_dependency_with_hardness(predecessor, successor, constraint, lag, Hardness::Strong)
    }

    pub fn add_dependency_with_hardness(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        constraint: ConstraintType,
        lag: i64,
        hardness: Hardness,
    ) -> ScheduleResult<EdgeId> {
        self.check_dependency(predecessor, successor)
            .inspect_err(|err| warn!(predecessor, successor, error = %err, "dependency rejected"))?;
        let id = self
            .dependencies
            .add_edge_with(predecessor, successor, constraint, lag, hardness)?;
        let seeds = self.with_descendants(successor);
        self.mark_dirty(seeds);
        Ok(id)
    }

    fn check_dependency(&self, predecessor: TaskId, successor: TaskId) -> ScheduleResult<()> {
        self.store.get(predecessor)?;
        self.store.get(successor)?;
        self.dependencies.check_new_edge(predecessor, successor)?;
        if !self.hierarchy.are_unrelated(predecessor, successor) {
            return Err(ScheduleError::HierarchyDependency {
                predecessor,
                successor,
            });
        }
        let sources = self.with_descendants(successor);
        if self.full_dag().reaches_any(&sources, predecessor) {
            return Err(ScheduleError::CycleDetected(format!(
                "task {successor} already leads to task {predecessor} through its container"
            )));
        }
        Ok(())
    }

    pub fn remove_dependency(&mut self, id: EdgeId) -> ScheduleResult<Dependency> {
        let removed = self.dependencies.remove_edge(id)?;
        let seeds = self.with_descendants(removed.successor);
        self.mark_dirty(seeds);
        Ok(removed)
    }

    pub fn set_dependency_lag(&mut self, id: EdgeId, lag: i64) -> ScheduleResult<()> {
        self.dependencies.set_lag(id, lag)?;
        self.mark_edge_dirty(id)
    }

    pub fn set_dependency_constraint(
        &mut self,
        id: EdgeId,
        constraint: ConstraintType,
    ) -> ScheduleResult<()> {
        self.dependencies.set_constraint(id, constraint)?;
        self.mark_edge_dirty(id)
    }

    pub fn set_dependency_hardness(&mut self, id: EdgeId, hardness: Hardness) -> ScheduleResult<()> {
        self.dependencies.set_hardness(id, hardness)?;
        self.mark_edge_dirty(id)
    }

    fn mark_edge_dirty(&mut self, id: EdgeId) -> ScheduleResult<()> {
        let successor = self.dependencies.edge(id)?.successor;
        let seeds = self.with_descendants(successor);
        self.mark_dirty(seeds);
        Ok(())
    }

    /// Drop edges around the subtree rooted at `root` as `policy` says.
    pub fn truncate_dependencies(
        &mut self,
        root: TaskId,
        policy: TruncationPolicy,
    ) -> ScheduleResult<Vec<Dependency>> {
        self.store.get(root)?;
        let subtree: HashSet<TaskId> = self.with_descendants(root).into_iter().collect();
        let removed = self.dependencies.truncate(&subtree, policy);
        let seeds: Vec<TaskId> = removed
            .iter()
            .flat_map(|dep| self.with_descendants(dep.successor))
            .collect();
        self.mark_dirty(seeds);
        Ok(removed)
    }

    // ---- scheduling ----

    /// Bring every dirty task back in line with its constraints.
    ///
    /// Unsatisfiable bounds are clamped and reported in the summary. An
    /// `Err` means the ordering graph was cyclic; dirty marks are kept.
    pub fn recalculate(&mut self) -> ScheduleResult<RecalcSummary> {
        if self.dirty.is_empty() {
            return Ok(RecalcSummary::default());
        }
        let pass = ForwardPass::new(
            &self.calendar,
            &self.hierarchy,
            &self.dependencies,
            &self.metadata,
        );
        let outcome = pass.execute(&mut self.store, &self.dirty)?;
        self.dirty.clear();

        let summary = RecalcSummary {
            scheduled: outcome.order.len(),
            changed: outcome.changed,
            violations: outcome.violations,
        };
        info!(%summary, "recalculated");
        Ok(summary)
    }

    /// Mark every task dirty and recalculate, as after loading a project.
    pub fn recalculate_all(&mut self) -> ScheduleResult<RecalcSummary> {
        self.mark_all_dirty();
        self.recalculate()
    }

    /// Explicit deadline, else the latest task end.
    pub fn project_end(&self) -> Option<NaiveDate> {
        self.metadata
            .project_end_date
            .or_else(|| self.store.iter().map(|t| t.end).max())
    }

    /// Zero-float tasks against `project_end`. Run after `recalculate()`.
    pub fn critical_path(&self, project_end: NaiveDate) -> ScheduleResult<Vec<TaskId>> {
        Ok(self.critical_path_report(project_end)?.critical)
    }

    pub fn critical_path_report(&self, project_end: NaiveDate) -> ScheduleResult<CriticalPathReport> {
        let report = BackwardPass::new(&self.store, &self.calendar, &self.hierarchy, &self.dependencies)
            .execute(project_end)?;
        info!(
            %project_end,
            critical = report.critical.len(),
            "critical path computed"
        );
        Ok(report)
    }

    // ---- snapshots ----

    pub fn snapshot(&self) -> ScheduleSnapshot {
        let tree = self
            .hierarchy
            .pre_order()
            .into_iter()
            .map(|task| TreeEntry {
                task,
                parent: self.hierarchy.parent(task),
            })
            .collect();
        let collapsed = self
            .hierarchy
            .pre_order()
            .into_iter()
            .filter(|t| !self.hierarchy.is_expanded(*t))
            .collect();
        ScheduleSnapshot {
            metadata: self.metadata.clone(),
            calendar: self.calendar.clone(),
            tasks: self.store.iter().cloned().collect(),
            tree,
            dependencies: self.dependencies.edges().cloned().collect(),
            collapsed,
        }
    }

    /// Rebuild a schedule from a snapshot. All tasks start out clean.
    pub fn from_snapshot(snapshot: ScheduleSnapshot) -> ScheduleResult<Self> {
        let ScheduleSnapshot {
            metadata,
            calendar,
            tasks,
            tree,
            dependencies,
            collapsed,
        } = snapshot;

        let mut schedule = Self::new_with_metadata_and_calendar(metadata, calendar)?;
        task_validation::validate_task_collection(&tasks)?;
        for task in tasks {
            schedule.store.insert(task)?;
        }

        for entry in &tree {
            schedule.store.get(entry.task)?;
            schedule
                .hierarchy
                .insert(entry.task, TreeNode::from(entry.parent), None)?;
        }
        if let Some(orphan) = schedule.store.ids().find(|id| !schedule.hierarchy.contains(*id)) {
            return Err(ScheduleError::invalid(
                orphan,
                "parent",
                "task is missing from the outline",
            ));
        }
        for entry in &tree {
            if let Some(parent) = entry.parent {
                schedule.make_container(parent)?;
            }
        }

        for dep in dependencies {
            schedule.store.get(dep.predecessor)?;
            schedule.store.get(dep.successor)?;
            if !schedule.hierarchy.are_unrelated(dep.predecessor, dep.successor) {
                return Err(ScheduleError::HierarchyDependency {
                    predecessor: dep.predecessor,
                    successor: dep.successor,
                });
            }
            schedule.dependencies.insert(dep)?;
        }
        if schedule.full_dag().is_cyclic() {
            return Err(ScheduleError::CycleDetected(
                "snapshot dependencies form a cycle through the outline".into(),
            ));
        }

        for task in collapsed {
            schedule.hierarchy.set_expanded(task, false)?;
        }
        Ok(schedule)
    }

    /// Replace the whole state with `snapshot`; nothing changes on error.
    pub fn restore(&mut self, snapshot: ScheduleSnapshot) -> ScheduleResult<()> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }
}
