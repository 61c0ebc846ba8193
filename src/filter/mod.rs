//! Pure derivations from the cached task list and the view configuration.
//!
//! Nothing here mutates its input. Each filter is a predicate, so applying
//! them in any order yields the same set.

pub mod calendar;

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Weekday};

use crate::store::view::{DateFilter, ViewConfig};
use crate::task::dates::{is_this_week, is_today};
use crate::task::{Quadrant, Task};

/// Keeps a task when `search` is empty or a case-insensitive substring of
/// its title or description.
#[must_use]
pub fn matches_search(task: &Task, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    task.title.to_lowercase().contains(&needle) || task.description.to_lowercase().contains(&needle)
}

/// Keeps a task when completed tasks are shown or it is still open.
#[must_use]
pub fn matches_completion(task: &Task, show_completed: bool) -> bool {
    show_completed || !task.completed
}

/// Keeps a task whose due date falls in the window. Undated tasks only pass
/// [`DateFilter::All`].
#[must_use]
pub fn matches_date<Tz: TimeZone>(
    task: &Task,
    filter: DateFilter,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> bool {
    match (filter, task.due_date) {
        (DateFilter::All, _) => true,
        (_, None) => false,
        (DateFilter::Today, Some(due)) => is_today(due, now),
        (DateFilter::ThisWeek, Some(due)) => is_this_week(due, now, week_start),
    }
}

/// Applies the search, completion and date filters, preserving input order.
#[must_use]
pub fn filter_tasks<Tz: TimeZone>(
    tasks: &[Task],
    view: &ViewConfig,
    now: &DateTime<Tz>,
    week_start: Weekday,
) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| matches_search(task, &view.search))
        .filter(|task| matches_completion(task, view.show_completed))
        .filter(|task| matches_date(task, view.date_filter, now, week_start))
        .cloned()
        .collect()
}

/// Filtered tasks of one quadrant, in cache order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantBucket {
    /// The quadrant.
    pub quadrant: Quadrant,
    /// Its tasks.
    pub tasks: Vec<Task>,
}

impl QuadrantBucket {
    /// Open tasks.
    pub fn active(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.completed)
    }

    /// Completed tasks.
    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.completed)
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the bucket holds no task.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

/// One bucket per quadrant, ordered by priority rank.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadrantBuckets {
    buckets: [QuadrantBucket; 4],
}

impl QuadrantBuckets {
    /// Partitions `tasks` by quadrant, keeping their relative order.
    #[must_use]
    pub fn partition(tasks: Vec<Task>) -> Self {
        let mut buckets =
            Quadrant::ALL.map(|quadrant| QuadrantBucket { quadrant, tasks: Vec::new() });
        for task in tasks {
            buckets[task.quadrant.index()].tasks.push(task);
        }
        Self { buckets }
    }

    /// The bucket for `quadrant`.
    #[must_use]
    pub fn get(&self, quadrant: Quadrant) -> &QuadrantBucket {
        &self.buckets[quadrant.index()]
    }

    /// Buckets in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &QuadrantBucket> {
        self.buckets.iter()
    }
}

/// All-tasks comparison: open first, then quadrant rank, then due date when
/// both have one, then newest created first.
#[must_use]
pub fn all_tasks_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| a.quadrant.rank().cmp(&b.quadrant.rank()))
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sorts `tasks` into all-tasks order.
///
/// [`all_tasks_order`] is not transitive when dated and undated tasks mix
/// within a quadrant, so this uses a stable insertion sort that only ever
/// compares neighbours instead of `slice::sort_by`.
pub fn sort_all_tasks(tasks: &mut [Task]) {
    for i in 1..tasks.len() {
        let mut j = i;
        while j > 0 && all_tasks_order(&tasks[j - 1], &tasks[j]) == Ordering::Greater {
            tasks.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::{Days, TimeDelta, TimeZone, Utc};

    fn now() -> DateTime<Utc> {
        // A Wednesday.
        Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()
    }

    fn task(id: &str, quadrant: Quadrant) -> Task {
        Task {
            id: TaskId::new(id),
            title: id.to_string(),
            description: String::new(),
            due_date: None,
            quadrant,
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            completed_at: None,
            owner_id: "alice".into(),
        }
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_description() {
        let mut t = task("Pay Bills", Quadrant::UrgentImportant);
        t.description = "Electricity and WATER".into();
        assert!(matches_search(&t, "bills"));
        assert!(matches_search(&t, "water"));
        assert!(matches_search(&t, ""));
        assert!(!matches_search(&t, "rent"));
    }

    #[test]
    fn undated_tasks_only_pass_the_all_window() {
        let t = task("t", Quadrant::UrgentImportant);
        assert!(matches_date(&t, DateFilter::All, &now(), Weekday::Sun));
        assert!(!matches_date(&t, DateFilter::Today, &now(), Weekday::Sun));
        assert!(!matches_date(&t, DateFilter::ThisWeek, &now(), Weekday::Sun));
    }

    #[test]
    fn week_window_follows_week_start() {
        let mut t = task("t", Quadrant::UrgentImportant);
        // Sunday June 9th: next week when weeks start on Sunday.
        t.due_date = Some(now() + Days::new(4));
        assert!(!matches_date(&t, DateFilter::ThisWeek, &now(), Weekday::Sun));
        assert!(matches_date(&t, DateFilter::ThisWeek, &now(), Weekday::Mon));
        assert!(!matches_date(&t, DateFilter::Today, &now(), Weekday::Sun));
    }

    #[test]
    fn filters_commute() {
        let mut tasks = Vec::new();
        for (i, quadrant) in Quadrant::ALL.into_iter().cycle().take(16).enumerate() {
            let mut t = task(&format!("task {i}"), quadrant);
            t.completed = i % 3 == 0;
            t.due_date = (i % 2 == 0).then(|| now() + Days::new(u64::try_from(i % 4).unwrap()));
            if i % 5 == 0 {
                t.description = "errand".into();
            }
            tasks.push(t);
        }
        let search = |t: &Task| matches_search(t, "errand");
        let completion = |t: &Task| matches_completion(t, false);
        let date = |t: &Task| matches_date(t, DateFilter::ThisWeek, &now(), Weekday::Sun);

        let forward: Vec<Task> =
            tasks.iter().filter(|t| search(t)).filter(|t| completion(t)).filter(|t| date(t)).cloned().collect();
        let backward: Vec<Task> =
            tasks.iter().filter(|t| date(t)).filter(|t| completion(t)).filter(|t| search(t)).cloned().collect();
        assert_eq!(forward, backward);

        let view = ViewConfig {
            search: "errand".into(),
            show_completed: false,
            date_filter: DateFilter::ThisWeek,
            ..ViewConfig::default()
        };
        assert_eq!(filter_tasks(&tasks, &view, &now(), Weekday::Sun), forward);
    }

    #[test]
    fn partition_keeps_order_within_buckets() {
        let tasks = vec![
            task("a", Quadrant::UrgentNotImportant),
            task("b", Quadrant::UrgentImportant),
            task("c", Quadrant::UrgentNotImportant),
        ];
        let buckets = QuadrantBuckets::partition(tasks);
        assert_eq!(ids(&buckets.get(Quadrant::UrgentNotImportant).tasks), vec!["a", "c"]);
        assert_eq!(ids(&buckets.get(Quadrant::UrgentImportant).tasks), vec!["b"]);
        assert!(buckets.get(Quadrant::NotUrgentImportant).is_empty());
        let order: Vec<Quadrant> = buckets.iter().map(|b| b.quadrant).collect();
        assert_eq!(order, Quadrant::ALL.to_vec());
    }

    #[test]
    fn bucket_splits_active_and_completed() {
        let mut done = task("done", Quadrant::UrgentImportant);
        done.completed = true;
        let bucket = QuadrantBucket {
            quadrant: Quadrant::UrgentImportant,
            tasks: vec![done, task("open", Quadrant::UrgentImportant)],
        };
        assert_eq!(bucket.active().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["open"]);
        assert_eq!(bucket.completed().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["done"]);
    }

    #[test]
    fn all_tasks_puts_open_first_then_rank_then_due() {
        let mut done = task("done-q1", Quadrant::UrgentImportant);
        done.completed = true;
        let mut soon = task("q2-soon", Quadrant::NotUrgentImportant);
        soon.due_date = Some(now());
        let mut later = task("q2-later", Quadrant::NotUrgentImportant);
        later.due_date = Some(now() + Days::new(2));
        let mut tasks =
            vec![done, later, task("q4", Quadrant::NotUrgentNotImportant), soon, task("q1", Quadrant::UrgentImportant)];
        sort_all_tasks(&mut tasks);
        assert_eq!(ids(&tasks), vec!["q1", "q2-soon", "q2-later", "q4", "done-q1"]);
    }

    #[test]
    fn all_tasks_sort_survives_mixed_due_dates() {
        let mut a = task("a", Quadrant::UrgentImportant);
        a.due_date = Some(now());
        let mut b = task("b", Quadrant::UrgentImportant);
        b.created_at += TimeDelta::days(1);
        let mut c = task("c", Quadrant::UrgentImportant);
        c.due_date = Some(now() + Days::new(1));
        c.created_at += TimeDelta::days(2);
        let mut tasks = vec![a, b, c];
        sort_all_tasks(&mut tasks);
        assert_eq!(tasks.len(), 3);
        for pair in tasks.windows(2) {
            assert_ne!(all_tasks_order(&pair[0], &pair[1]), Ordering::Greater);
        }
    }
}
