use chrono::NaiveDate;
use schedule_engine::calculations::{ForwardPass, ForwardPassOutcome};
use schedule_engine::{
    ConstraintType, DependencyGraph, Hardness, Hierarchy, ScheduleMetadata, SchedulingMode,
    TaskId, TaskStore, TreeNode, ViolationKind, WorkCalendar,
};
use std::collections::BTreeSet;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

struct Model {
    store: TaskStore,
    tree: Hierarchy,
    graph: DependencyGraph,
    calendar: WorkCalendar,
    metadata: ScheduleMetadata,
}

impl Model {
    // Project starts Monday 2025-01-06
    fn new() -> Self {
        Self {
            store: TaskStore::new(),
            tree: Hierarchy::new(),
            graph: DependencyGraph::new(),
            calendar: WorkCalendar::default(),
            metadata: ScheduleMetadata::starting(d(2025, 1, 6)),
        }
    }

    fn task(&mut self, parent: Option<TaskId>, duration: i64) -> TaskId {
        let id = self.store.create(d(2025, 1, 6), &self.calendar).unwrap();
        self.store.set_duration(id, duration, &self.calendar).unwrap();
        self.tree.insert(id, TreeNode::from(parent), None).unwrap();
        id
    }

    fn run(&mut self) -> ForwardPassOutcome {
        let dirty: BTreeSet<TaskId> = self.store.ids().collect();
        ForwardPass::new(&self.calendar, &self.tree, &self.graph, &self.metadata)
            .execute(&mut self.store, &dirty)
            .unwrap()
    }

    fn dates(&self, id: TaskId) -> (NaiveDate, NaiveDate) {
        let task = self.store.get(id).unwrap();
        (task.start, task.end)
    }
}

#[test]
fn finish_to_start_chains() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 3);
    m.graph.add_edge(a, b, ConstraintType::FinishToStart, 0).unwrap();
    let outcome = m.run();

    assert_eq!(m.dates(a), (d(2025, 1, 6), d(2025, 1, 11)));
    assert_eq!(m.dates(b), (d(2025, 1, 11), d(2025, 1, 16)));
    let pos = |t| outcome.order.iter().position(|x| *x == t).unwrap();
    assert!(pos(a) < pos(b));
    assert!(outcome.violations.is_empty());
}

#[test]
fn positive_lag_delays_successor() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 1);
    m.graph.add_edge(a, b, ConstraintType::FinishToStart, 2).unwrap();
    m.run();
    // Saturday + 2 working days
    assert_eq!(m.dates(b).0, d(2025, 1, 15));
}

#[test]
fn start_to_start_with_lag() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 2);
    m.graph.add_edge(a, b, ConstraintType::StartToStart, 2).unwrap();
    m.run();
    assert_eq!(m.dates(b), (d(2025, 1, 8), d(2025, 1, 10)));
}

#[test]
fn finish_to_finish_aligns_ends() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 2);
    m.graph.add_edge(a, b, ConstraintType::FinishToFinish, 0).unwrap();
    m.run();
    assert_eq!(m.dates(b), (d(2025, 1, 9), d(2025, 1, 11)));
    assert_eq!(m.dates(b).1, m.dates(a).1);
}

#[test]
fn start_to_finish_bounds_the_end() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 2);
    m.graph.add_edge(a, b, ConstraintType::StartToFinish, 5).unwrap();
    m.run();
    assert_eq!(m.dates(b), (d(2025, 1, 9), d(2025, 1, 11)));
}

#[test]
fn latest_predecessor_wins() {
    let mut m = Model::new();
    let short = m.task(None, 1);
    let long = m.task(None, 4);
    let join = m.task(None, 1);
    m.graph.add_edge(short, join, ConstraintType::FinishToStart, 0).unwrap();
    m.graph.add_edge(long, join, ConstraintType::FinishToStart, 0).unwrap();
    m.run();
    assert_eq!(m.dates(join).0, d(2025, 1, 10));
}

#[test]
fn container_spans_children() {
    let mut m = Model::new();
    let c = m.task(None, 1);
    let x = m.task(Some(c), 3);
    let y = m.task(Some(c), 7);
    m.store.set_earliest_start(y, Some(d(2025, 1, 8))).unwrap();
    m.run();

    assert_eq!(m.dates(x), (d(2025, 1, 6), d(2025, 1, 9)));
    assert_eq!(m.dates(y), (d(2025, 1, 8), d(2025, 1, 17)));
    assert_eq!(m.dates(c), (d(2025, 1, 6), d(2025, 1, 17)));
    assert_eq!(m.store.get(c).unwrap().duration, 9);
}

#[test]
fn dependency_on_container_constrains_its_children() {
    let mut m = Model::new();
    let p = m.task(None, 3);
    let c = m.task(None, 1);
    let x = m.task(Some(c), 2);
    m.graph.add_edge(p, c, ConstraintType::FinishToStart, 0).unwrap();
    m.run();

    assert_eq!(m.dates(p).1, d(2025, 1, 9));
    assert_eq!(m.dates(x).0, d(2025, 1, 9));
    assert_eq!(m.dates(c).0, d(2025, 1, 9));
}

#[test]
fn lead_before_project_start_is_clamped() {
    let mut m = Model::new();
    let a = m.task(None, 2);
    let b = m.task(None, 1);
    m.graph.add_edge(a, b, ConstraintType::FinishToStart, -5).unwrap();
    let outcome = m.run();

    assert_eq!(m.dates(b).0, d(2025, 1, 6));
    assert_eq!(outcome.violations.len(), 1);
    let violation = &outcome.violations[0];
    assert_eq!(violation.task, b);
    assert_eq!(violation.kind, ViolationKind::BeforeProjectStart);
    assert_eq!(violation.required, d(2025, 1, 1));
    assert_eq!(violation.applied, d(2025, 1, 6));
}

#[test]
fn rubber_lead_before_project_start_is_reported() {
    let mut m = Model::new();
    let a = m.task(None, 2);
    let b = m.task(None, 1);
    m.graph
        .add_edge_with(a, b, ConstraintType::FinishToStart, -5, Hardness::Rubber)
        .unwrap();
    let outcome = m.run();

    assert_eq!(m.dates(b).0, d(2025, 1, 6));
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].task, b);
    assert_eq!(outcome.violations[0].kind, ViolationKind::BeforeProjectStart);
    assert_eq!(outcome.violations[0].required, d(2025, 1, 1));
}

#[test]
fn container_completion_weighs_children_by_duration() {
    let mut m = Model::new();
    let c = m.task(None, 1);
    let x = m.task(Some(c), 1);
    let y = m.task(Some(c), 3);
    m.store.set_completion(x, 100).unwrap();
    m.store.set_completion(y, 0).unwrap();
    let outcome = m.run();

    assert_eq!(m.store.get(c).unwrap().completion, 25);
    assert!(outcome.changed.contains(&c));
}

#[test]
fn manual_task_is_not_moved() {
    let mut m = Model::new();
    let a = m.task(None, 5);
    let b = m.task(None, 2);
    m.store.set_mode(b, SchedulingMode::Manual).unwrap();
    m.graph.add_edge(a, b, ConstraintType::FinishToStart, 0).unwrap();
    let outcome = m.run();

    assert_eq!(m.dates(b), (d(2025, 1, 6), d(2025, 1, 8)));
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].kind, ViolationKind::ManualTaskConflict);
    assert_eq!(outcome.violations[0].required, d(2025, 1, 11));
}

#[test]
fn rubber_edge_keeps_a_later_start() {
    let mut m = Model::new();
    let a = m.task(None, 2);
    let b = m.task(None, 1);
    m.store.set_start(b, d(2025, 1, 20), &m.calendar).unwrap();
    let edge = m
        .graph
        .add_edge_with(a, b, ConstraintType::FinishToStart, 0, Hardness::Rubber)
        .unwrap();
    m.run();
    assert_eq!(m.dates(b).0, d(2025, 1, 20));

    m.graph.set_hardness(edge, Hardness::Strong).unwrap();
    m.run();
    assert_eq!(m.dates(b).0, d(2025, 1, 8));
}

#[test]
fn earliest_start_holds_back_a_task() {
    let mut m = Model::new();
    let a = m.task(None, 1);
    m.store.set_earliest_start(a, Some(d(2025, 2, 3))).unwrap();
    m.run();
    assert_eq!(m.dates(a), (d(2025, 2, 3), d(2025, 2, 4)));
}

#[test]
fn unchanged_tasks_are_not_reported() {
    let mut m = Model::new();
    let a = m.task(None, 1);
    m.run();
    let again = m.run();
    assert_eq!(again.order, vec![a]);
    assert!(again.changed.is_empty());
}
