//! Local mirror of the signed-in user's tasks.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::task::{Task, TaskId};

/// Canonical cache order: due date ascending with undated tasks last, then
/// newest created first.
#[must_use]
pub fn cache_order(a: &Task, b: &Task) -> Ordering {
    let by_due = match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due.then_with(|| b.created_at.cmp(&a.created_at))
}

/// Sorted task set replaced wholesale by each feed snapshot.
#[derive(Debug, Clone, Default)]
pub struct TaskCache {
    tasks: Vec<Task>,
}

impl TaskCache {
    /// Replaces the contents with `snapshot`, keeping only records owned by
    /// `owner` whose completion fields agree, and the first record for each
    /// id. Returns how many records were dropped.
    pub fn replace(&mut self, owner: &str, snapshot: Vec<Task>) -> usize {
        let received = snapshot.len();
        let mut seen = HashSet::new();
        let mut tasks: Vec<Task> = snapshot
            .into_iter()
            .filter(|task| {
                if task.owner_id != owner {
                    tracing::warn!(id = %task.id, owner = %task.owner_id, "dropping record owned by another identity");
                    return false;
                }
                if !task.completion_is_consistent() {
                    tracing::warn!(id = %task.id, "dropping record with inconsistent completion");
                    return false;
                }
                if !seen.insert(task.id.clone()) {
                    tracing::warn!(id = %task.id, "dropping duplicate record");
                    return false;
                }
                true
            })
            .collect();
        tasks.sort_by(cache_order);
        self.tasks = tasks;
        received - self.tasks.len()
    }

    /// Empties the cache.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Tasks in cache order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The cached task with `id`.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.id == id)
    }

    /// Number of cached tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Quadrant;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn task(id: &str, due: Option<u32>, created: u32) -> Task {
        Task {
            id: TaskId::new(id),
            title: id.to_string(),
            description: String::new(),
            due_date: due.map(at),
            quadrant: Quadrant::UrgentImportant,
            completed: false,
            created_at: at(created),
            completed_at: None,
            owner_id: "alice".into(),
        }
    }

    fn ids(cache: &TaskCache) -> Vec<&str> {
        cache.tasks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn dated_tasks_precede_undated_and_ties_break_newest_first() {
        let mut cache = TaskCache::default();
        cache.replace(
            "alice",
            vec![
                task("undated-old", None, 1),
                task("late", Some(20), 2),
                task("undated-new", None, 5),
                task("early", Some(10), 3),
                task("early-newer", Some(10), 4),
            ],
        );
        assert_eq!(ids(&cache), vec!["early-newer", "early", "late", "undated-new", "undated-old"]);
    }

    #[test]
    fn every_adjacent_pair_respects_the_order() {
        let mut cache = TaskCache::default();
        let snapshot: Vec<Task> = (0..12)
            .map(|i| task(&format!("t{i}"), (i % 3 != 0).then_some(i % 5), i % 4))
            .collect();
        cache.replace("alice", snapshot);
        for pair in cache.tasks().windows(2) {
            assert_ne!(cache_order(&pair[0], &pair[1]), Ordering::Greater);
            if pair[0].due_date.is_none() {
                assert!(pair[1].due_date.is_none());
            }
        }
    }

    #[test]
    fn foreign_and_duplicate_records_are_dropped() {
        let mut cache = TaskCache::default();
        let mut foreign = task("foreign", None, 1);
        foreign.owner_id = "mallory".into();
        let dropped = cache.replace("alice", vec![task("a", None, 1), task("a", None, 2), foreign]);
        assert_eq!(dropped, 2);
        assert_eq!(ids(&cache), vec!["a"]);
    }

    #[test]
    fn records_with_inconsistent_completion_are_dropped() {
        let mut cache = TaskCache::default();
        let mut flagged = task("flagged", None, 1);
        flagged.completed = true;
        let mut stamped = task("stamped", None, 2);
        stamped.completed_at = Some(at(3));
        let mut done = task("done", None, 3);
        done.completed = true;
        done.completed_at = Some(at(4));
        let dropped = cache.replace("alice", vec![flagged, stamped, done]);
        assert_eq!(dropped, 2);
        assert_eq!(ids(&cache), vec!["done"]);
    }

    #[test]
    fn replace_discards_previous_contents() {
        let mut cache = TaskCache::default();
        cache.replace("alice", vec![task("a", None, 1), task("b", None, 2)]);
        cache.replace("alice", vec![task("c", None, 3)]);
        assert_eq!(ids(&cache), vec!["c"]);
        assert!(cache.get(&TaskId::new("a")).is_none());
    }
}
