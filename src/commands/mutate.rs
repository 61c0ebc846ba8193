//! `quadrant toggle`, `move` and `delete` commands.

use crate::store::TaskStore;
use crate::task::{Quadrant, TaskId};

use super::{accepted, cached};

/// Flips the completion state of a cached task.
///
/// # Errors
///
/// Returns an error string when the task is not cached or the feed rejects
/// the write.
pub async fn toggle(store: &TaskStore, id: &TaskId) -> Result<String, String> {
    let task = cached(store, id)?;
    let before = store.failed_writes();
    store.toggle_completion(id).await;
    accepted(store, before, "toggle", id)?;
    Ok(if task.completed {
        format!("Reopened {id}")
    } else {
        format!("Completed {id}")
    })
}

/// Moves a cached task to `quadrant`.
///
/// # Errors
///
/// Returns an error string when the task is not cached or the feed rejects
/// the write.
pub async fn move_to(store: &TaskStore, id: &TaskId, quadrant: Quadrant) -> Result<String, String> {
    let task = cached(store, id)?;
    if task.quadrant == quadrant {
        return Ok(format!("{id} is already in {}", quadrant.title()));
    }
    let before = store.failed_writes();
    store.move_task(id, quadrant).await;
    accepted(store, before, "move", id)?;
    Ok(format!("Moved {id} to {}", quadrant.title()))
}

/// Deletes a cached task.
///
/// # Errors
///
/// Returns an error string when the task is not cached or the feed rejects
/// the write.
pub async fn delete(store: &TaskStore, id: &TaskId) -> Result<String, String> {
    cached(store, id)?;
    let before = store.failed_writes();
    store.delete(id).await;
    accepted(store, before, "delete", id)?;
    Ok(format!("Deleted {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::{store, task};
    use crate::error::FeedError;

    #[tokio::test]
    async fn toggle_twice_restores_the_task() {
        let f = store();
        f.feed.insert(task("t-1", "Call the bank", Quadrant::UrgentImportant));
        let id = TaskId::new("t-1");

        assert_eq!(toggle(&f.store, &id).await.unwrap(), "Completed t-1");
        let done = f.store.task(&id).unwrap();
        assert!(done.completed && done.completed_at.is_some());

        assert_eq!(toggle(&f.store, &id).await.unwrap(), "Reopened t-1");
        let open = f.store.task(&id).unwrap();
        assert!(!open.completed && open.completed_at.is_none());
    }

    #[tokio::test]
    async fn move_to_same_quadrant_writes_nothing() {
        let f = store();
        f.feed.insert(task("t-1", "Call the bank", Quadrant::UrgentImportant));
        let id = TaskId::new("t-1");

        move_to(&f.store, &id, Quadrant::UrgentImportant).await.unwrap();
        assert!(f.feed.writes().is_empty());

        move_to(&f.store, &id, Quadrant::NotUrgentNotImportant).await.unwrap();
        assert_eq!(f.store.task(&id).unwrap().quadrant, Quadrant::NotUrgentNotImportant);
    }

    #[tokio::test]
    async fn delete_removes_the_task_from_the_cache() {
        let f = store();
        f.feed.insert(task("t-1", "Call the bank", Quadrant::UrgentImportant));
        let id = TaskId::new("t-1");
        assert_eq!(delete(&f.store, &id).await.unwrap(), "Deleted t-1");
        assert!(f.store.task(&id).is_none());
        assert!(delete(&f.store, &id).await.is_err());
    }

    #[tokio::test]
    async fn rejected_writes_fail_the_command() {
        let f = store();
        f.feed.insert(task("t-1", "Call the bank", Quadrant::UrgentImportant));
        let id = TaskId::new("t-1");

        f.feed.fail_next_write(FeedError::PermissionDenied("rules".into()));
        assert_eq!(toggle(&f.store, &id).await.unwrap_err(), "task feed rejected toggle of t-1");
        assert!(!f.store.task(&id).unwrap().completed);

        f.feed.fail_next_write(FeedError::Transient("offline".into()));
        assert!(move_to(&f.store, &id, Quadrant::NotUrgentImportant).await.is_err());
        f.feed.fail_next_write(FeedError::Transient("offline".into()));
        assert!(delete(&f.store, &id).await.is_err());
        assert!(f.store.task(&id).is_some());

        assert_eq!(delete(&f.store, &id).await.unwrap(), "Deleted t-1");
    }
}
