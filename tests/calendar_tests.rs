use chrono::{Datelike, NaiveDate, Weekday};
use schedule_engine::calendar::{CalendarException, ExceptionKind, WorkCalendar, WorkCalendarConfig};
use schedule_engine::ScheduleError;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn default_calendar_weekends_not_working() {
    let cal = WorkCalendar::default();
    // 2025-01-04 is a Saturday, 2025-01-05 is a Sunday
    assert!(!cal.is_working_day(d(2025, 1, 4)));
    assert!(!cal.is_working_day(d(2025, 1, 5)));
    assert!(cal.is_working_day(d(2025, 1, 6)));
}

#[test]
fn shift_forward_excludes_trailing_weekend() {
    let cal = WorkCalendar::default();
    let mon = d(2025, 1, 6);
    assert_eq!(cal.shift(mon, 4), d(2025, 1, 10));
    // Five working days from Monday end on the following Saturday
    let end = cal.shift(mon, 5);
    assert_eq!(end, d(2025, 1, 11));
    assert_eq!(end.weekday(), Weekday::Sat);
}

#[test]
fn shift_backward_lands_on_working_day() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.shift(d(2025, 1, 11), -5), d(2025, 1, 6));
    assert_eq!(cal.shift(d(2025, 1, 13), -1), d(2025, 1, 10));
}

#[test]
fn shift_by_zero_returns_input_even_on_weekend() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.shift(d(2025, 1, 11), 0), d(2025, 1, 11));
}

#[test]
fn working_duration_counts_half_open_range() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.working_duration(d(2025, 1, 6), d(2025, 1, 11)), 5);
    assert_eq!(cal.working_duration(d(2025, 1, 6), d(2025, 1, 13)), 5);
    assert_eq!(cal.working_duration(d(2025, 1, 11), d(2025, 1, 6)), -5);
    assert_eq!(cal.working_duration(d(2025, 1, 6), d(2025, 1, 6)), 0);
}

#[test]
fn working_duration_inverts_shift() {
    let cal = WorkCalendar::default();
    let start = d(2025, 1, 8);
    for n in -12..=12 {
        assert_eq!(cal.working_duration(start, cal.shift(start, n)), n, "n = {n}");
    }
}

#[test]
fn holiday_is_skipped_by_shift() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2025, 1, 8));
    assert!(!cal.is_working_day(d(2025, 1, 8)));
    assert_eq!(cal.shift(d(2025, 1, 6), 3), d(2025, 1, 10));
}

#[test]
fn working_day_override_turns_saturday_on() {
    let mut cal = WorkCalendar::default();
    cal.add_exception(CalendarException::working_day(d(2025, 1, 11)))
        .unwrap();
    assert!(cal.is_working_day(d(2025, 1, 11)));
    assert_eq!(cal.shift(d(2025, 1, 10), 2), d(2025, 1, 12));
}

#[test]
fn holiday_range_covers_every_day() {
    let mut cal = WorkCalendar::default();
    cal.add_exception(CalendarException::range(
        d(2025, 12, 22),
        d(2025, 12, 26),
        ExceptionKind::Holiday,
    ))
    .unwrap();
    for day in 22..=26 {
        assert!(!cal.is_working_day(d(2025, 12, day)));
    }
    assert!(cal.is_working_day(d(2025, 12, 29)));
}

#[test]
fn recurring_holiday_applies_every_year() {
    let mut cal = WorkCalendar::default();
    cal.add_recurring_holiday(12, 25).unwrap();
    // Both are weekdays
    assert!(!cal.is_working_day(d(2025, 12, 25)));
    assert!(!cal.is_working_day(d(2026, 12, 25)));
}

#[test]
fn one_off_exception_beats_recurring_one() {
    let mut cal = WorkCalendar::default();
    cal.add_recurring_holiday(12, 24).unwrap();
    cal.add_exception(CalendarException::working_day(d(2025, 12, 24)))
        .unwrap();
    assert!(cal.is_working_day(d(2025, 12, 24)));
    assert!(!cal.is_working_day(d(2026, 12, 24)));
}

#[test]
fn invalid_day_of_year_is_rejected() {
    let mut cal = WorkCalendar::default();
    assert!(matches!(
        cal.add_recurring_holiday(2, 30),
        Err(ScheduleError::InvalidCalendar(_))
    ));
    assert!(cal.add_recurring_holiday(2, 29).is_ok());
}

#[test]
fn reversed_exception_range_is_rejected() {
    let mut cal = WorkCalendar::default();
    let err = cal
        .add_exception(CalendarException::range(
            d(2025, 3, 10),
            d(2025, 3, 1),
            ExceptionKind::Holiday,
        ))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidCalendar(_)));
    assert!(cal.exceptions().is_empty());
}

#[test]
fn remove_exceptions_on_restores_working_day() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2025, 2, 3));
    cal.add_holiday(d(2025, 2, 4));
    assert_eq!(cal.remove_exceptions_on(d(2025, 2, 3)), 1);
    assert!(cal.is_working_day(d(2025, 2, 3)));
    assert!(!cal.is_working_day(d(2025, 2, 4)));
    assert_eq!(cal.remove_exceptions_on(d(2025, 2, 3)), 0);
}

#[test]
fn six_day_week() {
    let mut cal = WorkCalendar::default();
    cal.set_working_days([
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ])
    .unwrap();
    assert!(cal.is_working_day(d(2025, 1, 11)));
    assert!(!cal.is_working_day(d(2025, 1, 12)));
    assert_eq!(cal.shift(d(2025, 1, 6), 6), d(2025, 1, 12));
}

#[test]
fn empty_working_week_is_rejected() {
    let mut cal = WorkCalendar::default();
    let err = cal.set_working_days(Vec::new()).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidCalendar(_)));
    // Left unchanged
    assert!(cal.is_working_day(d(2025, 1, 6)));
}

#[test]
fn us_holiday_preset() {
    let cal = WorkCalendar::with_us_holidays(2025, 2025);
    assert!(!cal.is_working_day(d(2025, 7, 4)));
    assert!(!cal.is_working_day(d(2025, 5, 26)));
    assert!(!cal.is_working_day(d(2025, 11, 27)));
    assert!(cal.is_working_day(d(2025, 11, 26)));
    assert!(cal
        .exceptions()
        .iter()
        .any(|ex| ex.title.as_deref() == Some("Thanksgiving")));
}

#[test]
fn first_and_next_working_day() {
    let cal = WorkCalendar::default();
    assert_eq!(cal.first_working_day_from(d(2025, 1, 4)), d(2025, 1, 6));
    assert_eq!(cal.first_working_day_from(d(2025, 1, 6)), d(2025, 1, 6));
    assert_eq!(cal.next_working_day(d(2025, 1, 3)), d(2025, 1, 6));
}

#[test]
fn calendar_serializes_through_config() {
    let mut cal = WorkCalendar::default();
    cal.add_holiday(d(2025, 4, 18));
    cal.add_recurring_holiday(12, 31).unwrap();

    let json = serde_json::to_string(&cal).unwrap();
    let back: WorkCalendar = serde_json::from_str(&json).unwrap();
    assert_eq!(back, cal);
    assert!(!back.is_working_day(d(2026, 12, 31)));
}

#[test]
fn edited_calendar_exports_its_config() {
    let mut cal = WorkCalendar::default();
    cal.set_working_days([
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ])
    .unwrap();
    cal.add_holiday(d(2025, 1, 8));

    let config = cal.to_config();
    assert_eq!(config.working_days().len(), 6);
    assert!(config.working_days().contains(&Weekday::Sat));
    assert_eq!(config.exceptions().len(), 1);
    assert_eq!(WorkCalendar::from_config(&config).unwrap(), cal);
}

#[test]
fn config_without_working_days_fails_to_load() {
    let config = WorkCalendarConfig::new(Vec::new(), Vec::new());
    assert!(WorkCalendar::from_config(&config).is_err());

    let json = serde_json::to_string(&config).unwrap();
    assert!(serde_json::from_str::<WorkCalendar>(&json).is_err());
}

#[test]
fn config_lists_working_days_in_week_order() {
    let config = WorkCalendarConfig::new(
        [Weekday::Fri, Weekday::Mon, Weekday::Mon],
        Vec::new(),
    );
    assert_eq!(config.working_days(), &[Weekday::Mon, Weekday::Fri]);
    assert_eq!(
        WorkCalendarConfig::default().working_days().len(),
        5
    );
}
