use crate::calendar::WorkCalendar;
use crate::error::ScheduleResult;
use crate::graph::{DependencyGraph, ScheduleDag};
use crate::hierarchy::Hierarchy;
use crate::task::TaskId;
use crate::task_store::TaskStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFloat {
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    /// Working days between the task's end and its late finish.
    pub total_float: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriticalPathReport {
    pub project_end: NaiveDate,
    /// Tasks with no float, by start date then id.
    pub critical: Vec<TaskId>,
    pub floats: BTreeMap<TaskId, TaskFloat>,
}

impl CriticalPathReport {
    pub fn is_critical(&self, task: TaskId) -> bool {
        self.floats.get(&task).is_some_and(|f| f.total_float <= 0)
    }

    pub fn float(&self, task: TaskId) -> Option<&TaskFloat> {
        self.floats.get(&task)
    }
}

/// Late dates from `project_end` back through the ordering graph.
///
/// Reads the dates left by the last forward pass; results go stale as soon
/// as the schedule is edited.
pub struct BackwardPass<'a> {
    store: &'a TaskStore,
    calendar: &'a WorkCalendar,
    hierarchy: &'a Hierarchy,
    dependencies: &'a DependencyGraph,
}

impl<'a> BackwardPass<'a> {
    pub fn new(
        store: &'a TaskStore,
        calendar: &'a WorkCalendar,
        hierarchy: &'a Hierarchy,
        dependencies: &'a DependencyGraph,
    ) -> Self {
        Self {
            store,
            calendar,
            hierarchy,
            dependencies,
        }
    }

    pub fn execute(&self, project_end: NaiveDate) -> ScheduleResult<CriticalPathReport> {
        let dag = ScheduleDag::build(self.store.ids(), self.hierarchy, self.dependencies);

        // Reverse topological order: containers and successors come first
        let mut order = dag.topological_order()?;
        order.reverse();

        let mut late: HashMap<TaskId, (NaiveDate, NaiveDate)> = HashMap::with_capacity(order.len());
        let mut floats = BTreeMap::new();

        for task_id in order {
            let task = self.store.get(task_id)?;
            let duration = task.duration;

            let mut lf = project_end;
            if let Some(&(_, parent_lf)) = self.hierarchy.parent(task_id).and_then(|p| late.get(&p)) {
                lf = lf.min(parent_lf);
            }
            for dep in self.dependencies.successors_of(task_id) {
                let targets =
                    std::iter::once(dep.successor).chain(self.hierarchy.descendants(dep.successor));
                for target in targets {
                    if let Some(&(ls_s, lf_s)) = late.get(&target) {
                        lf = lf.min(dep.latest_finish(ls_s, lf_s, duration, self.calendar));
                    }
                }
            }

            let ls = self.calendar.shift(lf, -duration);
            late.insert(task_id, (ls, lf));
            floats.insert(
                task_id,
                TaskFloat {
                    late_start: ls,
                    late_finish: lf,
                    total_float: self.calendar.working_duration(task.end, lf),
                },
            );
        }

        let mut critical: Vec<(NaiveDate, TaskId)> = floats
            .iter()
            .filter(|(_, f)| f.total_float <= 0)
            .filter_map(|(&id, _)| self.store.get(id).ok().map(|t| (t.start, id)))
            .collect();
        critical.sort_unstable();

        Ok(CriticalPathReport {
            project_end,
            critical: critical.into_iter().map(|(_, id)| id).collect(),
            floats,
        })
    }
}
