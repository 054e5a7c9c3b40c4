use crate::graph::EdgeId;
use crate::task::TaskId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors rejected at the point of the offending call.
///
/// Every variant except [`ScheduleError::CyclicSchedule`] leaves the schedule
/// untouched. `CyclicSchedule` signals an internal invariant that was already
/// broken before `recalculate()` ran; it is a defect, not a user error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("dependency {0} not found")]
    EdgeNotFound(EdgeId),

    #[error("no dependency ids left after {0}")]
    EdgeIdsExhausted(EdgeId),

    #[error("invalid {field} for task {task}: {reason}")]
    InvalidFieldValue {
        task: TaskId,
        field: &'static str,
        reason: String,
    },

    #[error("cycle detected: {0}")]
    CycleDetected(String),

    #[error("task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("task {successor} already depends on task {predecessor}")]
    DuplicateDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("tasks {predecessor} and {successor} are in the same hierarchy line and cannot depend on each other")]
    HierarchyDependency {
        predecessor: TaskId,
        successor: TaskId,
    },

    #[error("task {task} still has {references} child task(s) or dependency edge(s)")]
    HasDependents { task: TaskId, references: usize },

    #[error("task {0} is already placed in the hierarchy")]
    AlreadyInHierarchy(TaskId),

    #[error("schedule ordering is cyclic: {0}")]
    CyclicSchedule(String),

    #[error("invalid calendar: {0}")]
    InvalidCalendar(String),

    #[error("project start date {start} must be on or before project end date {end}")]
    ProjectStartAfterEnd { start: NaiveDate, end: NaiveDate },
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;

impl ScheduleError {
    pub(crate) fn invalid(task: TaskId, field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidFieldValue {
            task,
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Dependency bounds fall before the project start; the task was clamped.
    BeforeProjectStart,
    /// A manual task starts earlier than its dependencies allow; it was left in place.
    ManualTaskConflict,
}

/// Non-fatal warning collected by `recalculate()`.
///
/// The schedule stays consistent when one is reported: `applied` is the date
/// the task actually received, `required` the date its constraints asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub task: TaskId,
    pub kind: ViolationKind,
    pub required: NaiveDate,
    pub applied: NaiveDate,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::BeforeProjectStart => write!(
                f,
                "task {} requires start {} before the project start; clamped to {}",
                self.task, self.required, self.applied
            ),
            ViolationKind::ManualTaskConflict => write!(
                f,
                "manual task {} should start no earlier than {} but is fixed at {}",
                self.task, self.required, self.applied
            ),
        }
    }
}
