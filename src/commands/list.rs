//! `quadrant list` command.

use std::collections::HashSet;
use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::cli::ListArgs;
use crate::filter::calendar::WORKING_HOURS;
use crate::store::{TaskStore, ViewMode};
use crate::task::dates::{is_overdue, relative_time};
use crate::task::Task;

/// Applies the view options to `store` and renders its tasks.
#[must_use]
pub fn run(store: &TaskStore, args: &ListArgs) -> String {
    store.set_view_mode(args.view);
    store.set_search(args.search.clone());
    store.set_show_completed(!args.hide_completed);
    store.set_date_filter(args.date);

    let now = store.now();
    match args.view {
        ViewMode::Grid => render_grid(store, &now),
        ViewMode::List => render_list(store, &now),
        ViewMode::All => render_all(store, &now),
        ViewMode::Calendar => {
            render_calendar(store, args.day.unwrap_or_else(|| now.date_naive()), &now)
        }
    }
}

/// `[ ] Title  (due Tomorrow at 09:00)  #id`
pub(crate) fn task_line(task: &Task, now: &DateTime<FixedOffset>) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!("{mark} {}", task.title);
    if let Some(due) = task.due_date {
        let when = relative_time(due, now);
        if !task.completed && is_overdue(due, now) {
            let _ = write!(line, "  (overdue: {when})");
        } else {
            let _ = write!(line, "  (due {when})");
        }
    }
    let _ = write!(line, "  #{}", task.id);
    line
}

fn render_grid(store: &TaskStore, now: &DateTime<FixedOffset>) -> String {
    let mut out = String::new();
    for bucket in store.quadrant_buckets().iter() {
        let _ = writeln!(out, "{} ({})", bucket.quadrant.title(), bucket.len());
        if bucket.is_empty() {
            out.push_str("  No tasks\n");
        }
        for task in &bucket.tasks {
            let _ = writeln!(out, "  {}", task_line(task, now));
        }
    }
    out.trim_end().to_string()
}

fn render_list(store: &TaskStore, now: &DateTime<FixedOffset>) -> String {
    let mut out = String::new();
    for bucket in store.quadrant_buckets().iter() {
        let _ = writeln!(out, "{} ({})", bucket.quadrant.title(), bucket.len());
        for task in bucket.active() {
            let _ = writeln!(out, "  {}", task_line(task, now));
        }
        let completed: Vec<&Task> = bucket.completed().collect();
        if !completed.is_empty() {
            let _ = writeln!(out, "  Completed ({})", completed.len());
            for task in completed {
                let _ = writeln!(out, "    {}", task_line(task, now));
            }
        }
    }
    out.trim_end().to_string()
}

fn render_all(store: &TaskStore, now: &DateTime<FixedOffset>) -> String {
    let tasks = store.all_tasks();
    if tasks.is_empty() {
        return "No tasks".to_string();
    }
    let mut out = String::new();
    for task in &tasks {
        let _ = writeln!(out, "Q{}  {}", task.quadrant.rank(), task_line(task, now));
    }
    out.trim_end().to_string()
}

fn render_calendar(store: &TaskStore, day: NaiveDate, now: &DateTime<FixedOffset>) -> String {
    let mut out = format!("{}\n", day.format("%A, %B %-d, %Y"));
    let mut shown = HashSet::new();
    for hour in WORKING_HOURS {
        let tasks = store.hour_tasks(day, hour);
        if tasks.is_empty() {
            let _ = writeln!(out, "{hour:02}:00");
            continue;
        }
        for (i, task) in tasks.iter().enumerate() {
            let label = if i == 0 { format!("{hour:02}:00") } else { String::new() };
            let _ = writeln!(out, "{label:<5}  {}", task_line(task, now));
            shown.insert(task.id.clone());
        }
    }
    let outside: Vec<Task> =
        store.day_tasks(day).into_iter().filter(|task| !shown.contains(&task.id)).collect();
    if !outside.is_empty() {
        out.push_str("Outside working hours\n");
        for task in &outside {
            let _ = writeln!(out, "  {}", task_line(task, now));
        }
    }
    out.trim_end().to_string()
}
