//! Day and month calendar derivations.

use std::ops::RangeInclusive;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, TimeZone, Timelike, Utc};

use crate::task::Task;

/// Hours shown by the day view.
pub const WORKING_HOURS: RangeInclusive<u32> = 6..=21;

/// Calendar granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarMode {
    /// One day with hourly slots.
    #[default]
    Day,
    /// One month grid.
    Month,
}

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Back one step.
    Previous,
    /// Forward one step.
    Next,
}

fn local_due<Tz: TimeZone>(task: &Task, tz: &Tz) -> Option<DateTime<Tz>> {
    task.due_date.map(|due: DateTime<Utc>| due.with_timezone(tz))
}

/// Tasks due on `date` in `tz`, open first, then by due time.
#[must_use]
pub fn tasks_for_day<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, tz: &Tz) -> Vec<Task> {
    let mut day: Vec<Task> = tasks
        .iter()
        .filter(|task| local_due(task, tz).is_some_and(|due| due.date_naive() == date))
        .cloned()
        .collect();
    day.sort_by(|a, b| a.completed.cmp(&b.completed).then_with(|| a.due_date.cmp(&b.due_date)));
    day
}

/// Tasks due on `date` during `hour` in `tz`.
#[must_use]
pub fn tasks_for_hour<Tz: TimeZone>(tasks: &[Task], date: NaiveDate, hour: u32, tz: &Tz) -> Vec<Task> {
    tasks_for_day(tasks, date, tz)
        .into_iter()
        .filter(|task| local_due(task, tz).is_some_and(|due| due.hour() == hour))
        .collect()
}

/// Every date of the month containing `date`.
#[must_use]
pub fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
    let Some(first) = date.with_day(1) else {
        return Vec::new();
    };
    first.iter_days().take_while(|day| day.month() == first.month()).collect()
}

/// Moves one day or one month. Month steps clamp to the last valid day.
#[must_use]
pub fn navigate(date: NaiveDate, mode: CalendarMode, direction: Direction) -> NaiveDate {
    let moved = match (mode, direction) {
        (CalendarMode::Day, Direction::Next) => date.checked_add_days(Days::new(1)),
        (CalendarMode::Day, Direction::Previous) => date.checked_sub_days(Days::new(1)),
        (CalendarMode::Month, Direction::Next) => date.checked_add_months(Months::new(1)),
        (CalendarMode::Month, Direction::Previous) => date.checked_sub_months(Months::new(1)),
    };
    moved.unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Quadrant, TaskId};
    use chrono::FixedOffset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task(id: &str, due: &str, completed: bool) -> Task {
        Task {
            id: TaskId::new(id),
            title: id.into(),
            description: String::new(),
            due_date: Some(DateTime::parse_from_rfc3339(due).unwrap().with_timezone(&Utc)),
            quadrant: Quadrant::NotUrgentImportant,
            completed,
            created_at: Utc::now(),
            completed_at: completed.then(Utc::now),
            owner_id: "alice".into(),
        }
    }

    #[test]
    fn day_lists_open_tasks_first_then_by_time() {
        let tasks = vec![
            task("done-early", "2024-06-05T07:00:00Z", true),
            task("late", "2024-06-05T18:00:00Z", false),
            task("early", "2024-06-05T09:00:00Z", false),
            task("other-day", "2024-06-06T09:00:00Z", false),
        ];
        let day = tasks_for_day(&tasks, date(2024, 6, 5), &Utc);
        let ids: Vec<&str> = day.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late", "done-early"]);
    }

    #[test]
    fn day_boundaries_follow_the_viewer_zone() {
        let tasks = vec![task("late-utc", "2024-06-05T23:30:00Z", false)];
        let east = FixedOffset::east_opt(2 * 3600).unwrap();
        assert!(tasks_for_day(&tasks, date(2024, 6, 5), &east).is_empty());
        assert_eq!(tasks_for_hour(&tasks, date(2024, 6, 6), 1, &east).len(), 1);
    }

    #[test]
    fn month_days_cover_the_whole_month() {
        let days = month_days(date(2024, 2, 17));
        assert_eq!(days.len(), 29);
        assert_eq!(days[0], date(2024, 2, 1));
        assert_eq!(days[28], date(2024, 2, 29));
    }

    #[test]
    fn navigation_steps_by_mode() {
        assert_eq!(navigate(date(2024, 12, 31), CalendarMode::Day, Direction::Next), date(2025, 1, 1));
        assert_eq!(navigate(date(2024, 3, 31), CalendarMode::Month, Direction::Previous), date(2024, 2, 29));
        assert_eq!(navigate(date(2024, 1, 15), CalendarMode::Month, Direction::Next), date(2024, 2, 15));
    }

    #[test]
    fn working_day_has_sixteen_slots() {
        assert_eq!(WORKING_HOURS.count(), 16);
    }
}
