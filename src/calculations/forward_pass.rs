use crate::calendar::WorkCalendar;
use crate::error::{ConstraintViolation, ScheduleResult, ViolationKind};
use crate::graph::{DependencyGraph, Hardness, ScheduleDag};
use crate::hierarchy::Hierarchy;
use crate::metadata::{ClampTarget, ScheduleMetadata};
use crate::task::TaskId;
use crate::task_store::TaskStore;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Result of scheduling one dirty set.
#[derive(Debug, Clone, Default)]
pub struct ForwardPassOutcome {
    /// Every task visited, in the order it was scheduled.
    pub order: Vec<TaskId>,
    /// Tasks whose start, end, duration or rolled-up completion moved.
    pub changed: Vec<TaskId>,
    pub violations: Vec<ConstraintViolation>,
}

/// Lower bounds collected from the dependency edges of one task.
#[derive(Debug, Default)]
struct Bounds {
    strong: Option<NaiveDate>,
    rubber: Option<NaiveDate>,
}

impl Bounds {
    fn required(&self) -> Option<NaiveDate> {
        self.strong.max(self.rubber)
    }
}

pub struct ForwardPass<'a> {
    calendar: &'a WorkCalendar,
    hierarchy: &'a Hierarchy,
    dependencies: &'a DependencyGraph,
    metadata: &'a ScheduleMetadata,
}

impl<'a> ForwardPass<'a> {
    pub fn new(
        calendar: &'a WorkCalendar,
        hierarchy: &'a Hierarchy,
        dependencies: &'a DependencyGraph,
        metadata: &'a ScheduleMetadata,
    ) -> Self {
        Self {
            calendar,
            hierarchy,
            dependencies,
            metadata,
        }
    }

    /// Reschedule `dirty` in ordering-graph order and write the dates back.
    ///
    /// Tasks outside `dirty` are read as they are.
    pub fn execute(
        &self,
        store: &mut TaskStore,
        dirty: &BTreeSet<TaskId>,
    ) -> ScheduleResult<ForwardPassOutcome> {
        let live = dirty.iter().copied().filter(|id| store.contains(*id));
        let dag = ScheduleDag::build(live, self.hierarchy, self.dependencies);
        let order = dag.topological_order()?;

        let floor = self.floor();
        let mut outcome = ForwardPassOutcome::default();

        for &task_id in &order {
            let mut completed = false;
            let (start, end, duration) = if self.hierarchy.has_children(task_id) {
                let completion = self.rolled_up_completion(store, task_id)?;
                completed = store.apply_completion(task_id, completion)?;
                self.schedule_container(store, task_id)?
            } else {
                self.schedule_leaf(store, task_id, floor, &mut outcome.violations)?
            };
            let moved = store.apply_dates(task_id, start, end, duration)?;
            if moved {
                debug!(task = task_id, %start, %end, duration, "rescheduled");
            }
            if moved || completed {
                outcome.changed.push(task_id);
            }
        }

        outcome.order = order;
        Ok(outcome)
    }

    /// Earliest date an automatic task may take.
    fn floor(&self) -> NaiveDate {
        let project_start = self.metadata.project_start_date;
        match self.metadata.clamp_target {
            ClampTarget::ProjectStart => project_start,
            ClampTarget::FirstWorkingDay => self.calendar.first_working_day_from(project_start),
        }
    }

    fn schedule_container(
        &self,
        store: &TaskStore,
        task_id: TaskId,
    ) -> ScheduleResult<(NaiveDate, NaiveDate, i64)> {
        let mut span: Option<(NaiveDate, NaiveDate)> = None;
        for &child in self.hierarchy.children(task_id) {
            let child = store.get(child)?;
            span = Some(match span {
                None => (child.start, child.end),
                Some((start, end)) => (start.min(child.start), end.max(child.end)),
            });
        }
        let task = store.get(task_id)?;
        let (start, end) = span.unwrap_or((task.start, task.end));
        Ok((start, end, self.calendar.working_duration(start, end)))
    }

    /// Completion of a container: leaf completions inside it weighted by
    /// duration, truncated. Milestone-only subtrees fall back to the plain
    /// average.
    fn rolled_up_completion(&self, store: &TaskStore, task_id: TaskId) -> ScheduleResult<u8> {
        let (mut done, mut planned, mut sum, mut leaves) = (0i64, 0i64, 0i64, 0i64);
        for id in self.hierarchy.descendants(task_id) {
            if self.hierarchy.has_children(id) {
                continue;
            }
            let leaf = store.get(id)?;
            let completion = i64::from(leaf.completion);
            let weight = leaf.duration.max(0);
            done = done.saturating_add(completion.saturating_mul(weight));
            planned = planned.saturating_add(weight);
            sum += completion;
            leaves += 1;
        }
        let percent = match (planned, leaves) {
            (0, 0) => 0,
            (0, n) => sum / n,
            (p, _) => done / p,
        };
        Ok(u8::try_from(percent.clamp(0, 100)).unwrap_or(100))
    }

    fn schedule_leaf(
        &self,
        store: &TaskStore,
        task_id: TaskId,
        floor: NaiveDate,
        violations: &mut Vec<ConstraintViolation>,
    ) -> ScheduleResult<(NaiveDate, NaiveDate, i64)> {
        let task = store.get(task_id)?;
        let duration = if task.milestone { 0 } else { task.duration };
        let bounds = self.bounds(store, task_id, duration)?;

        if task.is_manual() {
            if let Some(required) = bounds.required().filter(|r| *r > task.start) {
                let violation = ConstraintViolation {
                    task: task_id,
                    kind: ViolationKind::ManualTaskConflict,
                    required,
                    applied: task.start,
                };
                warn!(%violation, "constraint violation");
                violations.push(violation);
            }
            return Ok((task.start, self.calendar.shift(task.start, duration), duration));
        }

        let mut start = floor;
        if let Some(earliest) = task.earliest_start {
            start = start.max(earliest);
        }
        if let Some(strong) = bounds.strong {
            start = start.max(strong);
        }
        if let Some(rubber) = bounds.rubber {
            start = start.max(rubber).max(task.start);
        }

        if let Some(required) = bounds
            .required()
            .filter(|s| *s < self.metadata.project_start_date)
        {
            let violation = ConstraintViolation {
                task: task_id,
                kind: ViolationKind::BeforeProjectStart,
                required,
                applied: start,
            };
            warn!(%violation, "constraint violation");
            violations.push(violation);
        }

        Ok((start, self.calendar.shift(start, duration), duration))
    }

    /// Bounds from the task's own incoming edges and those inherited from
    /// its containers.
    fn bounds(&self, store: &TaskStore, task_id: TaskId, duration: i64) -> ScheduleResult<Bounds> {
        let mut bounds = Bounds::default();
        let holders = std::iter::once(task_id).chain(self.hierarchy.ancestors(task_id));
        for holder in holders {
            for dep in self.dependencies.predecessors_of(holder) {
                let predecessor = store.get(dep.predecessor)?;
                let candidate = dep.earliest_start(predecessor, duration, self.calendar);
                let slot = match dep.hardness {
                    Hardness::Strong => &mut bounds.strong,
                    Hardness::Rubber => &mut bounds.rubber,
                };
                *slot = (*slot).max(Some(candidate));
            }
        }
        Ok(bounds)
    }
}
