pub mod dependency;
pub mod dependency_graph;
pub mod schedule_dag;

pub use dependency::{ConstraintType, Dependency, EdgeId, Hardness};
pub use dependency_graph::{DependencyGraph, TruncationPolicy};
pub use schedule_dag::{OrderingEdge, ScheduleDag};
