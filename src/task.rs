use crate::resource::ResourceAssignment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable task identifier, never reused within a session.
pub type TaskId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulingMode {
    /// Dates derived by the scheduler.
    #[default]
    Automatic,
    /// Dates fixed by the user; only `end` is recomputed from `start + duration`.
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgb(140, 182, 206)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Value of one user-defined column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CustomValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Boolean(bool),
    Date(NaiveDate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub start: NaiveDate,
    /// Exclusive end: the day after the last working day of the task.
    pub end: NaiveDate,
    /// Working days.
    pub duration: i64,
    /// Percent complete, 0..=100.
    pub completion: u8,
    pub milestone: bool,
    pub color: Color,
    pub priority: Priority,
    /// Positional custom column values; `None` marks an unset column.
    #[serde(default)]
    pub custom_fields: Vec<Option<CustomValue>>,
    pub mode: SchedulingMode,
    /// The task may not start before this date when scheduled automatically.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub assignments: Vec<ResourceAssignment>,
}

impl Task {
    pub const DEFAULT_DURATION: i64 = 1;

    /// A fresh task: duration 1, automatic mode. `end` is filled in by the store.
    pub(crate) fn new(id: TaskId, start: NaiveDate) -> Self {
        Self {
            id,
            name: format!("Task {id}"),
            start,
            end: start,
            duration: Self::DEFAULT_DURATION,
            completion: 0,
            milestone: false,
            color: Color::default(),
            priority: Priority::default(),
            custom_fields: Vec::new(),
            mode: SchedulingMode::default(),
            earliest_start: None,
            notes: None,
            assignments: Vec::new(),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.mode == SchedulingMode::Manual
    }

    pub fn custom_field(&self, index: usize) -> Option<&CustomValue> {
        self.custom_fields.get(index).and_then(Option::as_ref)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
