//! Arena owning every [`Task`] record by id.
//!
//! The hierarchy and the dependency graph refer to tasks only by [`TaskId`];
//! nothing outside the store holds a task by reference across calls. Setters
//! validate first and mutate second, so a rejected call leaves the record as
//! it was.

use crate::calendar::WorkCalendar;
use crate::error::{ScheduleError, ScheduleResult};
use crate::resource::ResourceAssignment;
use crate::task::{Color, CustomValue, Priority, SchedulingMode, Task, TaskId};
use crate::task_validation;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Something that may still point at a task (child lists, dependency edges).
pub trait TaskReferences {
    fn references(&self, task: TaskId) -> usize;
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    next_id: TaskId,
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Create a task with default fields starting at `start`.
    pub fn create(&mut self, start: NaiveDate, calendar: &WorkCalendar) -> ScheduleResult<TaskId> {
        let id = self.next_id;
        self.next_id = following_id(id)?;
        let mut task = Task::new(id, start);
        task.end = calendar.shift(start, task.duration);
        self.tasks.insert(id, task);
        Ok(id)
    }

    /// Insert a fully formed record, e.g. one restored from a snapshot.
    pub(crate) fn insert(&mut self, task: Task) -> ScheduleResult<()> {
        task_validation::validate_task(&task)?;
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::invalid(
                task.id,
                "id",
                format!("duplicate task id {}", task.id),
            ));
        }
        self.next_id = self.next_id.max(following_id(task.id)?);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    pub fn get(&self, id: TaskId) -> ScheduleResult<&Task> {
        self.tasks.get(&id).ok_or(ScheduleError::TaskNotFound(id))
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.keys().copied()
    }

    fn task_mut(&mut self, id: TaskId) -> ScheduleResult<&mut Task> {
        self.tasks.get_mut(&id).ok_or(ScheduleError::TaskNotFound(id))
    }

    pub fn set_name(&mut self, id: TaskId, name: impl Into<String>) -> ScheduleResult<()> {
        self.task_mut(id)?.name = name.into();
        Ok(())
    }

    /// Move the start, keeping the duration.
    pub fn set_start(
        &mut self,
        id: TaskId,
        start: NaiveDate,
        calendar: &WorkCalendar,
    ) -> ScheduleResult<()> {
        let task = self.task_mut(id)?;
        task.start = start;
        task.end = calendar.shift(start, task.duration);
        Ok(())
    }

    /// Move the end, deriving the duration from the working days in between.
    pub fn set_end(
        &mut self,
        id: TaskId,
        end: NaiveDate,
        calendar: &WorkCalendar,
    ) -> ScheduleResult<()> {
        let task = self.get(id)?;
        if end < task.start {
            return Err(ScheduleError::invalid(
                id,
                "end",
                format!("end {end} precedes start {}", task.start),
            ));
        }
        let duration = calendar.working_duration(task.start, end);
        task_validation::validate_duration(task, duration)?;

        let task = self.task_mut(id)?;
        task.duration = duration;
        task.end = calendar.shift(task.start, duration);
        Ok(())
    }

    pub fn set_duration(
        &mut self,
        id: TaskId,
        duration: i64,
        calendar: &WorkCalendar,
    ) -> ScheduleResult<()> {
        task_validation::validate_duration(self.get(id)?, duration)?;
        let task = self.task_mut(id)?;
        task.duration = duration;
        task.end = calendar.shift(task.start, duration);
        Ok(())
    }

    pub fn set_completion(&mut self, id: TaskId, completion: u8) -> ScheduleResult<()> {
        task_validation::validate_completion(id, completion)?;
        self.task_mut(id)?.completion = completion;
        Ok(())
    }

    /// Turning a task into a milestone forces duration 0; turning it back
    /// restores the default duration.
    pub fn set_milestone(
        &mut self,
        id: TaskId,
        milestone: bool,
        calendar: &WorkCalendar,
    ) -> ScheduleResult<()> {
        let task = self.task_mut(id)?;
        task.milestone = milestone;
        if milestone {
            task.duration = 0;
        } else if task.duration == 0 {
            task.duration = Task::DEFAULT_DURATION;
        }
        task.end = calendar.shift(task.start, task.duration);
        Ok(())
    }

    pub fn set_color(&mut self, id: TaskId, color: Color) -> ScheduleResult<()> {
        self.task_mut(id)?.color = color;
        Ok(())
    }

    pub fn set_priority(&mut self, id: TaskId, priority: Priority) -> ScheduleResult<()> {
        self.task_mut(id)?.priority = priority;
        Ok(())
    }

    pub fn set_custom_field(
        &mut self,
        id: TaskId,
        index: usize,
        value: Option<CustomValue>,
    ) -> ScheduleResult<()> {
        let task = self.task_mut(id)?;
        if task.custom_fields.len() <= index {
            task.custom_fields.resize(index + 1, None);
        }
        task.custom_fields[index] = value;
        Ok(())
    }

    pub fn set_mode(&mut self, id: TaskId, mode: SchedulingMode) -> ScheduleResult<()> {
        self.task_mut(id)?.mode = mode;
        Ok(())
    }

    pub fn set_earliest_start(
        &mut self,
        id: TaskId,
        earliest_start: Option<NaiveDate>,
    ) -> ScheduleResult<()> {
        self.task_mut(id)?.earliest_start = earliest_start;
        Ok(())
    }

    pub fn set_notes(&mut self, id: TaskId, notes: Option<String>) -> ScheduleResult<()> {
        self.task_mut(id)?.notes = notes;
        Ok(())
    }

    pub fn set_assignments(
        &mut self,
        id: TaskId,
        assignments: Vec<ResourceAssignment>,
    ) -> ScheduleResult<()> {
        let mut candidate = self.get(id)?.clone();
        candidate.assignments = assignments;
        task_validation::validate_task(&candidate)?;
        self.task_mut(id)?.assignments = candidate.assignments;
        Ok(())
    }

    /// Write scheduler output. Returns whether anything changed.
    pub(crate) fn apply_dates(
        &mut self,
        id: TaskId,
        start: NaiveDate,
        end: NaiveDate,
        duration: i64,
    ) -> ScheduleResult<bool> {
        let task = self.task_mut(id)?;
        if task.start == start && task.end == end && task.duration == duration {
            return Ok(false);
        }
        task.start = start;
        task.end = end;
        task.duration = duration;
        Ok(true)
    }

    /// Write a rolled-up container completion. Returns whether it changed.
    pub(crate) fn apply_completion(&mut self, id: TaskId, completion: u8) -> ScheduleResult<bool> {
        let task = self.task_mut(id)?;
        if task.completion == completion {
            return Ok(false);
        }
        task.completion = completion;
        Ok(true)
    }

    /// Remove a task nothing refers to any more.
    ///
    /// The caller cascades children and dependency edges first; this only
    /// checks that it did.
    pub fn delete(&mut self, id: TaskId, holders: &[&dyn TaskReferences]) -> ScheduleResult<Task> {
        if !self.contains(id) {
            return Err(ScheduleError::TaskNotFound(id));
        }
        let references: usize = holders.iter().map(|h| h.references(id)).sum();
        if references > 0 {
            return Err(ScheduleError::HasDependents {
                task: id,
                references,
            });
        }
        self.tasks.remove(&id).ok_or(ScheduleError::TaskNotFound(id))
    }
}

/// The id after `id`, or an error once the id space is used up.
fn following_id(id: TaskId) -> ScheduleResult<TaskId> {
    id.checked_add(1)
        .ok_or_else(|| ScheduleError::invalid(id, "id", "no task ids left after this one"))
}
