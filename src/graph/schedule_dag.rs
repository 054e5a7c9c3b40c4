use super::dependency::EdgeId;
use super::dependency_graph::DependencyGraph;
use crate::error::{ScheduleError, ScheduleResult};
use crate::hierarchy::Hierarchy;
use crate::task::TaskId;
use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Why one task must be scheduled before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingEdge {
    /// Child before its container.
    Containment,
    /// Predecessor before successor.
    Dependency(EdgeId),
    /// Predecessor before a descendant of the edge's container successor.
    Inherited(EdgeId),
}

/// Effective ordering over a set of tasks: containment, explicit dependency
/// and inherited dependency edges in one petgraph `DiGraph`.
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, OrderingEdge>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    /// Build over `tasks`; edges with an endpoint outside the set are skipped.
    pub fn build<I>(tasks: I, hierarchy: &Hierarchy, dependencies: &DependencyGraph) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        let mut ids: Vec<TaskId> = tasks.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let mut graph: DiGraph<TaskId, OrderingEdge> = DiGraph::with_capacity(ids.len(), ids.len());
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::with_capacity(ids.len());

        // Add nodes first, ascending id keeps the traversal order stable
        for &task_id in &ids {
            id_to_index.insert(task_id, graph.add_node(task_id));
        }

        for &task_id in &ids {
            let u = id_to_index[&task_id];
            if let Some(&p) = hierarchy.parent(task_id).and_then(|p| id_to_index.get(&p)) {
                graph.add_edge(u, p, OrderingEdge::Containment);
            }
            for dep in dependencies.successors_of(task_id) {
                if let Some(&v) = id_to_index.get(&dep.successor) {
                    graph.add_edge(u, v, OrderingEdge::Dependency(dep.id));
                }
                for inherited in hierarchy.descendants(dep.successor) {
                    if let Some(&v) = id_to_index.get(&inherited) {
                        graph.add_edge(u, v, OrderingEdge::Inherited(dep.id));
                    }
                }
            }
        }

        Self { graph, id_to_index }
    }

    /// Tasks in an order where every task follows everything it waits on.
    pub fn topological_order(&self) -> ScheduleResult<Vec<TaskId>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            ScheduleError::CyclicSchedule(format!(
                "ordering cycle through task {}",
                self.graph[cycle.node_id()]
            ))
        })?;
        Ok(order.into_iter().map(|ix| self.graph[ix]).collect())
    }

    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    pub fn ordering_successors(&self, task: TaskId) -> Vec<TaskId> {
        self.neighbors(task, Direction::Outgoing)
    }

    fn neighbors(&self, task: TaskId, direction: Direction) -> Vec<TaskId> {
        let Some(&ix) = self.id_to_index.get(&task) else {
            return Vec::new();
        };
        let mut out: Vec<TaskId> = self
            .graph
            .neighbors_directed(ix, direction)
            .map(|n| self.graph[n])
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// `seeds` plus everything reachable from them.
    pub fn closure<I>(&self, seeds: I) -> BTreeSet<TaskId>
    where
        I: IntoIterator<Item = TaskId>,
    {
        let mut reached = BTreeSet::new();
        let mut queue: VecDeque<TaskId> = VecDeque::new();
        for seed in seeds {
            if reached.insert(seed) {
                queue.push_back(seed);
            }
        }
        while let Some(task) = queue.pop_front() {
            for next in self.ordering_successors(task) {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        reached
    }

    /// Whether any of `sources` leads to `target`.
    pub fn reaches_any(&self, sources: &[TaskId], target: TaskId) -> bool {
        let Some(&goal) = self.id_to_index.get(&target) else {
            return false;
        };
        let mut seen: HashSet<NodeIndex> = HashSet::new();
        let mut queue: VecDeque<NodeIndex> = sources
            .iter()
            .filter_map(|s| self.id_to_index.get(s).copied())
            .collect();
        while let Some(ix) = queue.pop_front() {
            if ix == goal {
                return true;
            }
            if !seen.insert(ix) {
                continue;
            }
            queue.extend(self.graph.neighbors_directed(ix, Direction::Outgoing));
        }
        false
    }
}
