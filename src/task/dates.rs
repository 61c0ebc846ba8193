//! Calendar-day and calendar-week helpers for due dates.
//!
//! Every helper takes the reference instant `now` in the viewer's time zone,
//! so day and week boundaries follow the viewer's wall clock.

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc, Weekday};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Returns `true` if `instant` falls on the same local day as `now`.
#[must_use]
pub fn is_today<Tz: TimeZone>(instant: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    instant.with_timezone(&now.timezone()).date_naive() == now.date_naive()
}

/// First and last day of the week containing `date`.
#[must_use]
pub fn week_bounds(date: NaiveDate, week_start: Weekday) -> (NaiveDate, NaiveDate) {
    let offset = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    let first = date - Days::new(u64::from(offset));
    (first, first + Days::new(6))
}

/// Returns `true` if `instant` falls in the same local week as `now`.
#[must_use]
pub fn is_this_week<Tz: TimeZone>(
    instant: DateTime<Utc>,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> bool {
    let day = instant.with_timezone(&now.timezone()).date_naive();
    let (first, last) = week_bounds(now.date_naive(), week_start);
    first <= day && day <= last
}

/// Past due and not due today.
#[must_use]
pub fn is_overdue<Tz: TimeZone>(instant: DateTime<Utc>, now: &DateTime<Tz>) -> bool {
    instant < now.with_timezone(&Utc) && !is_today(instant, now)
}

/// `"Jun 5, 2024 at 09:30"` in the time zone of `tz`.
#[must_use]
pub fn format_date<Tz: TimeZone>(instant: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    instant.with_timezone(tz).format("%b %-d, %Y at %H:%M").to_string()
}

/// Human-readable distance from `now` to `instant`.
#[must_use]
pub fn relative_time<Tz: TimeZone>(instant: DateTime<Utc>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let local = instant.with_timezone(&now.timezone());
    let time = local.format("%H:%M");
    if is_today(instant, now) {
        return format!("Today at {time}");
    }
    let diff_ms = (instant - now.with_timezone(&Utc)).num_milliseconds();
    let diff_days = (diff_ms + DAY_MS - 1).div_euclid(DAY_MS);
    match diff_days {
        1 => format!("Tomorrow at {time}"),
        2..=6 => format!("In {diff_days} days at {time}"),
        d if d < 0 => format!("{} days ago at {time}", d.abs()),
        _ => format!("{} at {time}", local.format("%b %-d")),
    }
}
