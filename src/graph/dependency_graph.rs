use super::dependency::{ConstraintType, Dependency, EdgeId, Hardness};
use crate::error::{ScheduleError, ScheduleResult};
use crate::task::TaskId;
use crate::task_store::TaskReferences;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::debug;

/// Which edges `truncate` drops around a set of tasks being copied or cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    #[default]
    KeepAll,
    /// Edges with exactly one endpoint inside the set.
    DropExternal,
    /// Edges with both endpoints inside the set.
    DropInternal,
}

/// Predecessor -> successor edges keyed by task id.
///
/// Only plain dependency reachability is checked here; constraints that
/// involve the hierarchy are enforced by [`crate::Schedule`].
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    edges: BTreeMap<EdgeId, Dependency>,
    outgoing: HashMap<TaskId, Vec<EdgeId>>,
    incoming: HashMap<TaskId, Vec<EdgeId>>,
    next_id: EdgeId,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn add_edge(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        constraint: ConstraintType,
        lag: i64,
    ) -> ScheduleResult<EdgeId> {
        self.add_edge_with(predecessor, successor, constraint, lag, Hardness::Strong)
    }

    pub fn add_edge_with(
        &mut self,
        predecessor: TaskId,
        successor: TaskId,
        constraint: ConstraintType,
        lag: i64,
        hardness: Hardness,
    ) -> ScheduleResult<EdgeId> {
        self.check_new_edge(predecessor, successor)?;
        let id = self.next_id;
        self.next_id = following_id(id)?;
        self.link(Dependency {
            id,
            predecessor,
            successor,
            constraint,
            lag,
            hardness,
        });
        Ok(id)
    }

    pub(crate) fn check_new_edge(&self, predecessor: TaskId, successor: TaskId) -> ScheduleResult<()> {
        if predecessor == successor {
            return Err(ScheduleError::SelfDependency(predecessor));
        }
        if self.find(predecessor, successor).is_some() {
            return Err(ScheduleError::DuplicateDependency {
                predecessor,
                successor,
            });
        }
        if self.reaches(successor, predecessor) {
            return Err(ScheduleError::CycleDetected(format!(
                "task {successor} already leads to task {predecessor}"
            )));
        }
        Ok(())
    }

    /// Re-insert an edge keeping its id, e.g. from a snapshot.
    pub(crate) fn insert(&mut self, dependency: Dependency) -> ScheduleResult<()> {
        if self.edges.contains_key(&dependency.id) {
            return Err(ScheduleError::DuplicateDependency {
                predecessor: dependency.predecessor,
                successor: dependency.successor,
            });
        }
        self.check_new_edge(dependency.predecessor, dependency.successor)?;
        self.next_id = self.next_id.max(following_id(dependency.id)?);
        self.link(dependency);
        Ok(())
    }

    fn link(&mut self, dependency: Dependency) {
        self.outgoing
            .entry(dependency.predecessor)
            .or_default()
            .push(dependency.id);
        self.incoming
            .entry(dependency.successor)
            .or_default()
            .push(dependency.id);
        self.edges.insert(dependency.id, dependency);
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> ScheduleResult<Dependency> {
        let dependency = self.edges.remove(&id).ok_or(ScheduleError::EdgeNotFound(id))?;
        unlink(&mut self.outgoing, dependency.predecessor, id);
        unlink(&mut self.incoming, dependency.successor, id);
        Ok(dependency)
    }

    pub fn edge(&self, id: EdgeId) -> ScheduleResult<&Dependency> {
        self.edges.get(&id).ok_or(ScheduleError::EdgeNotFound(id))
    }

    fn edge_mut(&mut self, id: EdgeId) -> ScheduleResult<&mut Dependency> {
        self.edges.get_mut(&id).ok_or(ScheduleError::EdgeNotFound(id))
    }

    /// The edge from `predecessor` to `successor`, if any.
    pub fn find(&self, predecessor: TaskId, successor: TaskId) -> Option<&Dependency> {
        self.successors_of(predecessor)
            .into_iter()
            .find(|dep| dep.successor == successor)
    }

    pub fn set_lag(&mut self, id: EdgeId, lag: i64) -> ScheduleResult<()> {
        self.edge_mut(id)?.lag = lag;
        Ok(())
    }

    pub fn set_constraint(&mut self, id: EdgeId, constraint: ConstraintType) -> ScheduleResult<()> {
        self.edge_mut(id)?.constraint = constraint;
        Ok(())
    }

    pub fn set_hardness(&mut self, id: EdgeId, hardness: Hardness) -> ScheduleResult<()> {
        self.edge_mut(id)?.hardness = hardness;
        Ok(())
    }

    /// Edges ending at `task`, in insertion order.
    pub fn predecessors_of(&self, task: TaskId) -> Vec<&Dependency> {
        self.collect(self.incoming.get(&task))
    }

    /// Edges starting at `task`, in insertion order.
    pub fn successors_of(&self, task: TaskId) -> Vec<&Dependency> {
        self.collect(self.outgoing.get(&task))
    }

    fn collect(&self, ids: Option<&Vec<EdgeId>>) -> Vec<&Dependency> {
        ids.map(|ids| ids.iter().filter_map(|id| self.edges.get(id)).collect())
            .unwrap_or_default()
    }

    /// Whether a chain of edges leads from `from` to `to` (or they are equal).
    pub fn reaches(&self, from: TaskId, to: TaskId) -> bool {
        let mut seen = HashSet::from([from]);
        let mut queue = VecDeque::from([from]);
        while let Some(task) = queue.pop_front() {
            if task == to {
                return true;
            }
            for dep in self.successors_of(task) {
                if seen.insert(dep.successor) {
                    queue.push_back(dep.successor);
                }
            }
        }
        false
    }

    /// Drop every edge touching `task`. Returns the removed edges.
    pub fn remove_task_edges(&mut self, task: TaskId) -> Vec<Dependency> {
        let mut ids: Vec<EdgeId> = self.incoming.get(&task).cloned().unwrap_or_default();
        ids.extend(self.outgoing.get(&task).cloned().unwrap_or_default());
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter()
            .filter_map(|id| self.remove_edge(id).ok())
            .collect()
    }

    /// Hierarchy move notification. Edges survive moves; the incident edge
    /// ids are returned so the caller can re-validate them.
    pub fn move_task(&self, task: TaskId, new_parent: Option<TaskId>) -> Vec<EdgeId> {
        let mut incident: Vec<EdgeId> = self
            .predecessors_of(task)
            .into_iter()
            .chain(self.successors_of(task))
            .map(|dep| dep.id)
            .collect();
        incident.sort_unstable();
        debug!(task, ?new_parent, edges = incident.len(), "task moved");
        incident
    }

    /// Remove the edges `policy` selects relative to `tasks`.
    pub fn truncate(&mut self, tasks: &HashSet<TaskId>, policy: TruncationPolicy) -> Vec<Dependency> {
        let doomed: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|dep| {
                let inside = (
                    tasks.contains(&dep.predecessor),
                    tasks.contains(&dep.successor),
                );
                match policy {
                    TruncationPolicy::KeepAll => false,
                    TruncationPolicy::DropExternal => inside.0 != inside.1,
                    TruncationPolicy::DropInternal => inside.0 && inside.1,
                }
            })
            .map(|dep| dep.id)
            .collect();
        doomed
            .into_iter()
            .filter_map(|id| self.remove_edge(id).ok())
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = &Dependency> {
        self.edges.values()
    }
}

fn following_id(id: EdgeId) -> ScheduleResult<EdgeId> {
    id.checked_add(1).ok_or(ScheduleError::EdgeIdsExhausted(id))
}

fn unlink(index: &mut HashMap<TaskId, Vec<EdgeId>>, task: TaskId, id: EdgeId) {
    if let Some(ids) = index.get_mut(&task) {
        ids.retain(|&e| e != id);
        if ids.is_empty() {
            index.remove(&task);
        }
    }
}

impl TaskReferences for DependencyGraph {
    fn references(&self, task: TaskId) -> usize {
        self.incoming.get(&task).map_or(0, Vec::len) + self.outgoing.get(&task).map_or(0, Vec::len)
    }
}
