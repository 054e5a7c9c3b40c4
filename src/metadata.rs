use crate::error::{ScheduleError, ScheduleResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a task lands when its dependencies would put it before the project start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampTarget {
    /// The project start date itself.
    #[default]
    ProjectStart,
    /// The first working day on or after the project start.
    FirstWorkingDay,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    pub project_name: String,
    pub project_description: String,
    pub project_start_date: NaiveDate,
    /// Deadline used by the critical path when no explicit end is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub clamp_target: ClampTarget,
}

impl Default for ScheduleMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
            project_end_date: None,
            clamp_target: ClampTarget::default(),
        }
    }
}

impl ScheduleMetadata {
    pub fn starting(project_start_date: NaiveDate) -> Self {
        Self {
            project_start_date,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> ScheduleResult<()> {
        match self.project_end_date {
            Some(end) if end < self.project_start_date => Err(ScheduleError::ProjectStartAfterEnd {
                start: self.project_start_date,
                end,
            }),
            _ => Ok(()),
        }
    }
}
