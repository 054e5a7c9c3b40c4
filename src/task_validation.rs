use crate::error::{ScheduleError, ScheduleResult};
use crate::task::{Task, TaskId};
use std::collections::HashSet;

pub(crate) fn validate_completion(task: TaskId, completion: u8) -> ScheduleResult<()> {
    if completion > 100 {
        return Err(ScheduleError::invalid(
            task,
            "completion",
            format!("{completion} is outside 0..=100"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_duration(task: &Task, duration: i64) -> ScheduleResult<()> {
    if duration < 0 {
        return Err(ScheduleError::invalid(
            task.id,
            "duration",
            format!("negative duration {duration}"),
        ));
    }
    if task.milestone && duration != 0 {
        return Err(ScheduleError::invalid(
            task.id,
            "duration",
            format!("milestone requires duration 0 (got {duration})"),
        ));
    }
    Ok(())
}

pub(crate) fn validate_task(task: &Task) -> ScheduleResult<()> {
    validate_completion(task.id, task.completion)?;
    validate_duration(task, task.duration)?;

    if task.end < task.start {
        return Err(ScheduleError::invalid(
            task.id,
            "end",
            format!("end {} precedes start {}", task.end, task.start),
        ));
    }
    if task.milestone && task.start != task.end {
        return Err(ScheduleError::invalid(
            task.id,
            "end",
            "milestone must start and end on the same date",
        ));
    }

    for (idx, assignment) in task.assignments.iter().enumerate() {
        if assignment.resource_id.trim().is_empty() {
            return Err(ScheduleError::invalid(
                task.id,
                "assignments",
                format!("assignment #{idx} requires a non-empty resource_id"),
            ));
        }
        if !assignment.load.is_finite() || assignment.load < 0.0 {
            return Err(ScheduleError::invalid(
                task.id,
                "assignments",
                format!(
                    "assignment of '{}' has invalid load {}",
                    assignment.resource_id, assignment.load
                ),
            ));
        }
    }

    Ok(())
}

pub(crate) fn validate_task_collection<'a, I>(tasks: I) -> ScheduleResult<()>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut seen_ids = HashSet::new();
    for task in tasks {
        if !seen_ids.insert(task.id) {
            return Err(ScheduleError::invalid(
                task.id,
                "id",
                format!("duplicate task id {}", task.id),
            ));
        }
        validate_task(task)?;
    }
    Ok(())
}
