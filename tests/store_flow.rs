//! End-to-end task store flows over the in-memory feed.

use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc, Weekday};

use quadrant::adapters::memory::{
    InMemoryTaskFeed, LocalIdentitySession, ManualClock, SequentialIdGenerator, WriteCall,
};
use quadrant::context::ServiceContext;
use quadrant::drag::{DragState, DropTarget};
use quadrant::error::FeedError;
use quadrant::ports::{FeedFuture, FeedSubscription, Identity, SnapshotSink, TaskFeed};
use quadrant::store::{StoreOptions, SyncStatus, TaskStore};
use quadrant::task::{NewTaskRecord, Quadrant, RecordPatch, Task, TaskDraft, TaskId};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()
}

fn options() -> StoreOptions {
    StoreOptions { week_start: Weekday::Sun, utc_offset: FixedOffset::east_opt(0).unwrap() }
}

struct Harness {
    feed: Arc<InMemoryTaskFeed>,
    identity: Arc<LocalIdentitySession>,
    store: TaskStore,
}

fn harness(uid: Option<&str>) -> Harness {
    let feed = Arc::new(InMemoryTaskFeed::with_id_generator(Box::new(
        SequentialIdGenerator::new("doc"),
    )));
    let identity = Arc::new(match uid {
        Some(uid) => LocalIdentitySession::signed_in(Identity::new(uid)),
        None => LocalIdentitySession::new(),
    });
    let ctx = ServiceContext::new(Arc::new(ManualClock::new(now())), feed.clone(), identity.clone());
    let store = TaskStore::connect(&ctx, options());
    Harness { feed, identity, store }
}

fn stored(id: &str, owner: &str, quadrant: Quadrant, created: DateTime<Utc>) -> Task {
    TaskDraft::new(id, quadrant).unwrap().into_record(owner, created).into_task(TaskId::new(id))
}

fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|task| task.id.as_str()).collect()
}

#[test]
fn cache_puts_dated_tasks_first_and_newest_undated_next() {
    let h = harness(Some("alice"));
    let mut dated = stored("dated", "alice", Quadrant::NotUrgentImportant, now());
    dated.due_date = Some(now() + chrono::TimeDelta::days(3));
    h.feed.insert(stored("old", "alice", Quadrant::UrgentImportant, now() - chrono::TimeDelta::days(2)));
    h.feed.insert(stored("new", "alice", Quadrant::UrgentImportant, now() - chrono::TimeDelta::days(1)));
    h.feed.insert(dated);
    assert_eq!(ids(&h.store.tasks()), vec!["dated", "new", "old"]);
}

#[test]
fn hidden_completed_tasks_leave_the_quadrant_bucket() {
    let h = harness(Some("alice"));
    let mut t1 = stored("T1", "alice", Quadrant::UrgentImportant, now());
    t1.due_date = Some(now() + chrono::TimeDelta::days(1));
    let t2 = stored("T2", "alice", Quadrant::UrgentImportant, now() - chrono::TimeDelta::days(3));
    let mut t3 = stored("T3", "alice", Quadrant::UrgentImportant, now());
    t3.due_date = Some(now() + chrono::TimeDelta::hours(2));
    t3.completed = true;
    t3.completed_at = Some(now());
    for task in [t2, t3, t1] {
        h.feed.insert(task);
    }

    h.store.set_show_completed(false);
    let buckets = h.store.quadrant_buckets();
    assert_eq!(ids(&buckets.get(Quadrant::UrgentImportant).tasks), vec!["T1", "T2"]);
}

#[tokio::test]
async fn created_task_arrives_through_the_next_snapshot() {
    let h = harness(Some("alice"));
    h.feed.hold_snapshots(true);
    let draft = TaskDraft::new("Pay bills", Quadrant::UrgentNotImportant).unwrap();
    let id = h.store.create(draft).await.unwrap();
    assert!(h.store.tasks().is_empty());

    h.feed.flush();
    let tasks = h.store.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, id);
    assert!(!tasks[0].completed);
    assert_eq!(tasks[0].completed_at, None);
    assert_eq!(tasks[0].quadrant, Quadrant::UrgentNotImportant);
}

#[tokio::test]
async fn toggling_twice_restores_completion() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::UrgentImportant, now()));
    let id = TaskId::new("t");
    let before = h.store.task(&id).unwrap();

    h.store.toggle_completion(&id).await;
    let done = h.store.task(&id).unwrap();
    assert!(done.completed);
    assert_eq!(done.completed_at, Some(now()));

    h.store.toggle_completion(&id).await;
    let after = h.store.task(&id).unwrap();
    assert_eq!(after.completed, before.completed);
    assert_eq!(after.completed_at, before.completed_at);
}

#[tokio::test]
async fn move_to_the_current_quadrant_writes_nothing() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::NotUrgentImportant, now()));
    h.store.move_task(&TaskId::new("t"), Quadrant::NotUrgentImportant).await;
    assert!(h.feed.writes().is_empty());
}

#[tokio::test]
async fn hover_move_survives_a_release_outside_any_target() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::UrgentImportant, now()));
    let id = TaskId::new("t");

    h.store.drag_start(id.clone());
    h.store.drag_over(DropTarget::Quadrant(Quadrant::UrgentNotImportant)).await;
    h.store.drag_end(None).await;

    assert_eq!(h.store.drag_state(), DragState::Idle);
    assert_eq!(h.store.task(&id).unwrap().quadrant, Quadrant::UrgentNotImportant);
    let writes = h.feed.writes();
    assert_eq!(writes.len(), 1);
    assert!(matches!(&writes[0], WriteCall::Update(target, _) if *target == id));
}

#[tokio::test]
async fn failed_hover_move_is_retried_on_the_next_hover() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::UrgentImportant, now()));
    let id = TaskId::new("t");
    h.feed.fail_next_write(FeedError::Transient("offline".into()));

    h.store.drag_start(id.clone());
    h.store.drag_over(DropTarget::Quadrant(Quadrant::NotUrgentImportant)).await;
    assert_eq!(h.store.task(&id).unwrap().quadrant, Quadrant::UrgentImportant);
    h.store.drag_over(DropTarget::Quadrant(Quadrant::NotUrgentImportant)).await;
    h.store.drag_over(DropTarget::Quadrant(Quadrant::NotUrgentImportant)).await;
    h.store.drag_end(None).await;

    assert_eq!(h.feed.writes().len(), 2);
    assert_eq!(h.store.task(&id).unwrap().quadrant, Quadrant::NotUrgentImportant);
}

#[tokio::test]
async fn sign_out_clears_the_cache_and_closes_the_subscription() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::UrgentImportant, now()));
    assert_eq!(h.store.tasks().len(), 1);

    h.store.sign_out().await.unwrap();
    assert!(h.store.tasks().is_empty());
    assert_eq!(h.feed.subscriber_count(), 0);
    assert_eq!(h.store.wait_for_sync(Duration::from_millis(10)).await, SyncStatus::SignedOut);
}

/// Feed wrapper that notes the store's cache size and the open subscription
/// count whenever a new subscription is requested.
struct ProbeFeed {
    inner: Arc<InMemoryTaskFeed>,
    store: OnceLock<Arc<TaskStore>>,
    seen: Mutex<Vec<(usize, usize)>>,
}

impl TaskFeed for ProbeFeed {
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        self.inner.query(owner_id)
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        if let Some(store) = self.store.get() {
            self.seen.lock().unwrap().push((store.tasks().len(), self.inner.subscriber_count()));
        }
        self.inner.subscribe(owner_id, sink)
    }

    fn create(&self, record: NewTaskRecord) -> FeedFuture<'_, TaskId> {
        self.inner.create(record)
    }

    fn update<'a>(&'a self, id: &'a TaskId, patch: RecordPatch) -> FeedFuture<'a, ()> {
        self.inner.update(id, patch)
    }

    fn delete<'a>(&'a self, id: &'a TaskId) -> FeedFuture<'a, ()> {
        self.inner.delete(id)
    }
}

#[test]
fn switching_accounts_never_leaks_the_previous_cache() {
    let memory = Arc::new(InMemoryTaskFeed::new());
    memory.insert(stored("a", "alice", Quadrant::UrgentImportant, now()));
    memory.insert(stored("b", "bob", Quadrant::UrgentImportant, now()));
    let probe = Arc::new(ProbeFeed {
        inner: Arc::clone(&memory),
        store: OnceLock::new(),
        seen: Mutex::new(Vec::new()),
    });
    let identity = Arc::new(LocalIdentitySession::signed_in(Identity::new("alice")));
    let ctx = ServiceContext::new(Arc::new(ManualClock::new(now())), probe.clone(), identity.clone());
    let store = Arc::new(TaskStore::connect(&ctx, options()));
    assert_eq!(ids(&store.tasks()), vec!["a"]);
    assert!(probe.store.set(Arc::clone(&store)).is_ok());

    identity.replace_identity(Some(Identity::new("bob")));
    assert_eq!(*probe.seen.lock().unwrap(), vec![(0, 0)]);
    assert_eq!(ids(&store.tasks()), vec!["b"]);
    assert_eq!(memory.subscriber_count(), 1);
}

#[tokio::test]
async fn permission_denial_clears_the_cache() {
    let h = harness(Some("alice"));
    h.feed.insert(stored("t", "alice", Quadrant::UrgentImportant, now()));
    h.feed.push_error("alice", &FeedError::PermissionDenied("rules".into()));
    assert!(h.store.tasks().is_empty());

    // A later identity change starts over.
    h.identity.replace_identity(Some(Identity::new("alice")));
    assert_eq!(h.store.tasks().len(), 1);
    assert_eq!(h.store.wait_for_sync(Duration::from_millis(10)).await, SyncStatus::Synced);
}

#[tokio::test]
async fn signed_out_store_ignores_mutations() {
    let h = harness(None);
    let draft = TaskDraft::new("Pay bills", Quadrant::UrgentNotImportant).unwrap();
    assert_eq!(h.store.create(draft).await, None);
    h.store.delete(&TaskId::new("t")).await;
    assert!(h.feed.writes().is_empty());
}
