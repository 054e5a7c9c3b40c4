use crate::error::{ScheduleError, ScheduleResult};
use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Longest run of consecutive non-working days a date walk will cross before
/// giving up. Only reachable with calendars whose exceptions cover whole years.
const MAX_NON_WORKING_RUN: u32 = 3660;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionKind {
    Holiday,
    WorkingDayOverride,
}

/// A date range (inclusive on both ends) that overrides the weekly pattern.
///
/// Recurring exceptions repeat every year on the same month/day span; the
/// year of `first`/`last` is ignored for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarException {
    pub first: NaiveDate,
    pub last: NaiveDate,
    pub kind: ExceptionKind,
    #[serde(default)]
    pub recurring: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CalendarException {
    pub fn holiday(date: NaiveDate) -> Self {
        Self::range(date, date, ExceptionKind::Holiday)
    }

    pub fn working_day(date: NaiveDate) -> Self {
        Self::range(date, date, ExceptionKind::WorkingDayOverride)
    }

    pub fn range(first: NaiveDate, last: NaiveDate, kind: ExceptionKind) -> Self {
        Self {
            first,
            last,
            kind,
            recurring: false,
            title: None,
        }
    }

    pub fn yearly(mut self) -> Self {
        self.recurring = true;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn covers(&self, date: NaiveDate) -> bool {
        if !self.recurring {
            return self.first <= date && date <= self.last;
        }
        self.days().any(|d| d.month() == date.month() && d.day() == date.day())
    }

    fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.first
            .iter_days()
            .take_while(move |d| *d <= self.last)
    }
}

/// Working/non-working day calculator.
///
/// A day is working unless its weekday is non-working; a recurring exception
/// overrides the weekday rule and a one-off exception overrides both. Later
/// exceptions win over earlier ones of the same sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WorkCalendarConfig", into = "WorkCalendarConfig")]
pub struct WorkCalendar {
    non_working_days: HashSet<Weekday>,
    exceptions: Vec<CalendarException>,
    one_off: HashMap<NaiveDate, ExceptionKind>,
    recurring: HashMap<(u32, u32), ExceptionKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    working_days: Vec<Weekday>,
    #[serde(default)]
    exceptions: Vec<CalendarException>,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self {
            non_working_days: HashSet::from([Weekday::Sat, Weekday::Sun]),
            exceptions: Vec::new(),
            one_off: HashMap::new(),
            recurring: HashMap::new(),
        }
    }
}

impl WorkCalendar {
    const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Mon-Fri week with US federal holidays for every year in the range.
    pub fn with_us_holidays(start_year: i32, end_year: i32) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };

        let mut calendar = Self::default();
        for year in start..=end {
            for (title, date) in us_federal_holidays(year) {
                calendar.push_exception(CalendarException::holiday(date).with_title(title));
            }
        }
        calendar
    }

    pub fn custom<I, J>(working_days: I, exceptions: J) -> ScheduleResult<Self>
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = CalendarException>,
    {
        let config = WorkCalendarConfig::new(working_days, exceptions);
        Self::from_config(&config)
    }

    pub fn from_config(config: &WorkCalendarConfig) -> ScheduleResult<Self> {
        let mut calendar = Self::default();
        calendar.set_working_days(config.working_days.iter().copied())?;
        for exception in &config.exceptions {
            calendar.add_exception(exception.clone())?;
        }
        Ok(calendar)
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    /// Set custom working days (e.g. Mon-Sat for 6-day weeks).
    pub fn set_working_days<I>(&mut self, days: I) -> ScheduleResult<()>
    where
        I: IntoIterator<Item = Weekday>,
    {
        let working: HashSet<Weekday> = days.into_iter().collect();
        if working.is_empty() {
            return Err(ScheduleError::InvalidCalendar(
                "at least one weekday must be a working day".into(),
            ));
        }
        self.non_working_days = Self::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working.contains(day))
            .collect();
        Ok(())
    }

    pub fn add_exception(&mut self, exception: CalendarException) -> ScheduleResult<()> {
        if exception.first > exception.last {
            return Err(ScheduleError::InvalidCalendar(format!(
                "exception range {}..{} is reversed",
                exception.first, exception.last
            )));
        }
        self.push_exception(exception);
        Ok(())
    }

    pub fn add_holiday(&mut self, date: NaiveDate) {
        self.push_exception(CalendarException::holiday(date));
    }

    /// Add a holiday that repeats every year, e.g. Dec 24.
    pub fn add_recurring_holiday(&mut self, month: u32, day: u32) -> ScheduleResult<()> {
        // 2000 is a leap year, so Feb 29 is accepted.
        let date = NaiveDate::from_ymd_opt(2000, month, day).ok_or_else(|| {
            ScheduleError::InvalidCalendar(format!("no such day of year: {month}/{day}"))
        })?;
        self.push_exception(CalendarException::holiday(date).yearly());
        Ok(())
    }

    /// Remove every exception covering `date`. Returns how many were removed.
    pub fn remove_exceptions_on(&mut self, date: NaiveDate) -> usize {
        let before = self.exceptions.len();
        self.exceptions.retain(|ex| !ex.covers(date));
        let removed = before - self.exceptions.len();
        if removed > 0 {
            self.rebuild_index();
        }
        removed
    }

    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }

    fn push_exception(&mut self, exception: CalendarException) {
        self.index_exception(&exception);
        self.exceptions.push(exception);
    }

    fn index_exception(&mut self, exception: &CalendarException) {
        for day in exception.days() {
            if exception.recurring {
                self.recurring.insert((day.month(), day.day()), exception.kind);
            } else {
                self.one_off.insert(day, exception.kind);
            }
        }
    }

    fn rebuild_index(&mut self) {
        self.one_off.clear();
        self.recurring.clear();
        let exceptions = std::mem::take(&mut self.exceptions);
        for exception in &exceptions {
            self.index_exception(exception);
        }
        self.exceptions = exceptions;
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        let mut working = !self.non_working_days.contains(&date.weekday());
        if let Some(kind) = self.recurring.get(&(date.month(), date.day())) {
            working = *kind == ExceptionKind::WorkingDayOverride;
        }
        if let Some(kind) = self.one_off.get(&date) {
            working = *kind == ExceptionKind::WorkingDayOverride;
        }
        working
    }

    /// Move `date` by a signed number of working days.
    ///
    /// Forward: the day after the n-th working day counted from `date`
    /// (Monday + 5 is Saturday). Backward: the n-th working day before `date`.
    /// Zero returns `date` unchanged. Walks stop at the ends of the
    /// representable date range.
    pub fn shift(&self, date: NaiveDate, duration: i64) -> NaiveDate {
        let mut current = date;
        let mut remaining = duration.unsigned_abs();
        let mut idle_run = 0u32;
        if duration > 0 {
            while remaining > 0 {
                if self.is_working_day(current) {
                    remaining -= 1;
                    idle_run = 0;
                } else if !self.tolerate_idle(&mut idle_run, current) {
                    break;
                }
                match current.succ_opt() {
                    Some(next) => current = next,
                    None => break,
                }
            }
        } else {
            while remaining > 0 {
                match current.pred_opt() {
                    Some(previous) => current = previous,
                    None => break,
                }
                if self.is_working_day(current) {
                    remaining -= 1;
                    idle_run = 0;
                } else if !self.tolerate_idle(&mut idle_run, current) {
                    break;
                }
            }
        }
        current
    }

    /// Working days in `[start, end)`; negative when `end` precedes `start`.
    pub fn working_duration(&self, start: NaiveDate, end: NaiveDate) -> i64 {
        if end < start {
            return -self.working_duration(end, start);
        }
        start
            .iter_days()
            .take_while(|d| *d < end)
            .filter(|d| self.is_working_day(*d))
            .count() as i64
    }

    /// First working day on or after `date`.
    pub fn first_working_day_from(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        let mut idle_run = 0u32;
        while !self.is_working_day(current) {
            if !self.tolerate_idle(&mut idle_run, current) {
                break;
            }
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    /// First working day strictly after `from`; `from` itself on the last
    /// representable date.
    pub fn next_working_day(&self, from: NaiveDate) -> NaiveDate {
        from.succ_opt()
            .map_or(from, |next| self.first_working_day_from(next))
    }

    fn tolerate_idle(&self, idle_run: &mut u32, at: NaiveDate) -> bool {
        *idle_run += 1;
        if *idle_run > MAX_NON_WORKING_RUN {
            warn!(%at, "calendar has no working day in {MAX_NON_WORKING_RUN} consecutive days; stopping walk");
            return false;
        }
        true
    }
}

/// Standard US federal holidays for one year.
fn us_federal_holidays(year: i32) -> Vec<(&'static str, NaiveDate)> {
    let fixed = [
        ("New Year's Day", NaiveDate::from_ymd_opt(year, 1, 1)),
        ("Martin Luther King Jr. Day", nth_weekday(year, 1, Weekday::Mon, 3)),
        ("Presidents' Day", nth_weekday(year, 2, Weekday::Mon, 3)),
        ("Memorial Day", last_weekday(year, 5, Weekday::Mon)),
        ("Independence Day", NaiveDate::from_ymd_opt(year, 7, 4)),
        ("Labor Day", nth_weekday(year, 9, Weekday::Mon, 1)),
        ("Columbus Day", nth_weekday(year, 10, Weekday::Mon, 2)),
        ("Veterans Day", NaiveDate::from_ymd_opt(year, 11, 11)),
        ("Thanksgiving", nth_weekday(year, 11, Weekday::Thu, 4)),
        ("Christmas", NaiveDate::from_ymd_opt(year, 12, 25)),
    ];
    fixed
        .into_iter()
        .filter_map(|(title, date)| date.map(|d| (title, d)))
        .collect()
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut date = first_of_next.pred_opt()?;
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, exceptions: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = CalendarException>,
    {
        let mut working: Vec<Weekday> = working_days.into_iter().collect();
        working.sort_by_key(|wd| wd.num_days_from_monday());
        working.dedup();

        Self {
            working_days: working,
            exceptions: exceptions.into_iter().collect(),
        }
    }

    pub fn working_days(&self) -> &[Weekday] {
        &self.working_days
    }

    pub fn exceptions(&self) -> &[CalendarException] {
        &self.exceptions
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendarConfig::from(&WorkCalendar::default())
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let working = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !calendar.non_working_days.contains(day));
        WorkCalendarConfig::new(working, calendar.exceptions.iter().cloned())
    }
}

impl From<WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: WorkCalendar) -> Self {
        calendar.to_config()
    }
}

impl TryFrom<WorkCalendarConfig> for WorkCalendar {
    type Error = ScheduleError;

    fn try_from(config: WorkCalendarConfig) -> Result<Self, Self::Error> {
        WorkCalendar::from_config(&config)
    }
}
