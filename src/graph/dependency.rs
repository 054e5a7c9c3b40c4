use crate::calendar::WorkCalendar;
use crate::task::{Task, TaskId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type EdgeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

/// How firmly an edge holds its successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hardness {
    /// Successor is pulled to the earliest date the edge permits.
    #[default]
    Strong,
    /// Edge is only a lower bound; a successor already later stays put.
    Rubber,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: EdgeId,
    pub predecessor: TaskId,
    pub successor: TaskId,
    pub constraint: ConstraintType,
    /// Working days; negative values are leads.
    pub lag: i64,
    #[serde(default)]
    pub hardness: Hardness,
}

impl Dependency {
    /// Earliest start this edge allows a successor of `successor_duration`
    /// working days, given the predecessor's current dates.
    pub fn earliest_start(
        &self,
        predecessor: &Task,
        successor_duration: i64,
        calendar: &WorkCalendar,
    ) -> NaiveDate {
        match self.constraint {
            ConstraintType::FinishToStart => calendar.shift(predecessor.end, self.lag),
            ConstraintType::StartToStart => calendar.shift(predecessor.start, self.lag),
            ConstraintType::FinishToFinish => {
                let finish = calendar.shift(predecessor.end, self.lag);
                calendar.shift(finish, -successor_duration)
            }
            ConstraintType::StartToFinish => {
                let finish = calendar.shift(predecessor.start, self.lag);
                calendar.shift(finish, -successor_duration)
            }
        }
    }

    /// Latest finish this edge allows a predecessor of `predecessor_duration`
    /// working days, given the successor's late dates.
    pub fn latest_finish(
        &self,
        successor_late_start: NaiveDate,
        successor_late_finish: NaiveDate,
        predecessor_duration: i64,
        calendar: &WorkCalendar,
    ) -> NaiveDate {
        match self.constraint {
            ConstraintType::FinishToStart => calendar.shift(successor_late_start, -self.lag),
            ConstraintType::StartToStart => {
                let start = calendar.shift(successor_late_start, -self.lag);
                calendar.shift(start, predecessor_duration)
            }
            ConstraintType::FinishToFinish => calendar.shift(successor_late_finish, -self.lag),
            ConstraintType::StartToFinish => {
                let start = calendar.shift(successor_late_finish, -self.lag);
                calendar.shift(start, predecessor_duration)
            }
        }
    }
}
