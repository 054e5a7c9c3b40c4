pub mod calculations;
pub mod calendar;
pub mod error;
pub mod graph;
pub mod hierarchy;
pub mod logging;
pub mod metadata;
pub mod resource;
pub mod schedule;
pub mod task;
pub mod task_store;
mod task_validation;

pub use calculations::{CriticalPathReport, TaskFloat};
pub use calendar::{CalendarException, ExceptionKind, WorkCalendar, WorkCalendarConfig};
pub use error::{ConstraintViolation, ScheduleError, ScheduleResult, ViolationKind};
pub use graph::{ConstraintType, Dependency, DependencyGraph, EdgeId, Hardness, TruncationPolicy};
pub use hierarchy::{Hierarchy, TreeNode};
pub use metadata::{ClampTarget, ScheduleMetadata};
pub use resource::ResourceAssignment;
pub use schedule::{RecalcSummary, Schedule, ScheduleSnapshot, TreeEntry};
pub use task::{Color, CustomValue, Priority, SchedulingMode, Task, TaskId};
pub use task_store::{TaskReferences, TaskStore};
