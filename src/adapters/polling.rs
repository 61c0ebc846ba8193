//! Subscription emulation over one-shot queries.

use std::sync::Arc;
use std::time::Duration;

use crate::error::FeedError;
use crate::ports::{FeedFuture, FeedSubscription, SnapshotSink, TaskFeed};
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

/// Interval used when a zero interval is requested.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Wraps a feed and turns `subscribe` into periodic `query` calls.
///
/// A snapshot is delivered on the first poll and afterwards only when the
/// queried record set differs from the last one delivered. Polling stops
/// after a permission denial. Writes pass straight through.
pub struct PollingTaskFeed {
    inner: Arc<dyn TaskFeed>,
    interval: Duration,
}

impl PollingTaskFeed {
    /// Polls `inner` every `interval`. A zero interval falls back to
    /// [`DEFAULT_POLL_INTERVAL`].
    pub fn new(inner: Arc<dyn TaskFeed>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            tracing::warn!(default_ms = DEFAULT_POLL_INTERVAL.as_millis(), "zero poll interval; using default");
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        Self { inner, interval }
    }
}

async fn poll(
    inner: Arc<dyn TaskFeed>,
    owner: String,
    interval: Duration,
    sink: Arc<dyn SnapshotSink>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut last: Option<Vec<Task>> = None;
    loop {
        ticker.tick().await;
        match inner.query(&owner).await {
            Ok(tasks) => {
                if last.as_ref() != Some(&tasks) {
                    last = Some(tasks.clone());
                    sink.on_snapshot(tasks);
                }
            }
            Err(error) => {
                let fatal = error.is_permission_denied();
                sink.on_error(error);
                if fatal {
                    tracing::debug!(%owner, "polling stopped after permission denial");
                    return;
                }
            }
        }
    }
}

impl TaskFeed for PollingTaskFeed {
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        self.inner.query(owner_id)
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| FeedError::Transient("polling subscription needs a tokio runtime".into()))?;
        let task = runtime.spawn(poll(
            Arc::clone(&self.inner),
            owner_id.to_string(),
            self.interval,
            sink,
        ));
        Ok(FeedSubscription::new(move || task.abort()))
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryTaskFeed, SequentialIdGenerator};
    use crate::task::{Quadrant, TaskDraft};
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CollectingSink {
        snapshots: Mutex<Vec<Vec<Task>>>,
        errors: Mutex<Vec<FeedError>>,
    }

    impl SnapshotSink for CollectingSink {
        fn on_snapshot(&self, tasks: Vec<Task>) {
            self.snapshots.lock().unwrap().push(tasks);
        }

        fn on_error(&self, error: FeedError) {
            self.errors.lock().unwrap().push(error);
        }
    }

    fn polling(memory: &Arc<InMemoryTaskFeed>) -> PollingTaskFeed {
        let inner: Arc<dyn TaskFeed> = memory.clone();
        PollingTaskFeed::new(inner, Duration::from_millis(100))
    }

    fn record(title: &str) -> NewTaskRecord {
        TaskDraft::new(title, Quadrant::UrgentImportant).unwrap().into_record("alice", Utc::now())
    }

    fn memory() -> Arc<InMemoryTaskFeed> {
        Arc::new(InMemoryTaskFeed::with_id_generator(Box::new(SequentialIdGenerator::new("t"))))
    }

    #[tokio::test(start_paused = true)]
    async fn delivers_only_changed_snapshots() {
        let memory = memory();
        let feed = polling(&memory);
        let sink = Arc::new(CollectingSink::default());
        let _sub = feed.subscribe("alice", sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(sink.snapshots.lock().unwrap().len(), 1);

        feed.create(record("Call the bank")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        let snapshots = sink.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1][0].title, "Call the bank");
    }

    #[tokio::test(start_paused = true)]
    async fn permission_denial_stops_polling() {
        let memory = memory();
        memory.deny_owner("alice");
        let feed = polling(&memory);
        let sink = Arc::new(CollectingSink::default());
        let _sub = feed.subscribe("alice", sink.clone()).unwrap();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let errors = sink.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_permission_denied());
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_stops_polling() {
        let memory = memory();
        let feed = polling(&memory);
        let sink = Arc::new(CollectingSink::default());
        let sub = feed.subscribe("alice", sink.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        sub.unsubscribe();

        feed.create(record("Unseen")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(sink.snapshots.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_polls_at_the_default_rate() {
        let memory = memory();
        let inner: Arc<dyn TaskFeed> = memory.clone();
        let feed = PollingTaskFeed::new(inner, Duration::ZERO);
        assert_eq!(feed.interval, DEFAULT_POLL_INTERVAL);

        let sink = Arc::new(CollectingSink::default());
        let _sub = feed.subscribe("alice", sink.clone()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.snapshots.lock().unwrap().len(), 1);
    }

    #[test]
    fn subscribe_outside_runtime_fails() {
        let feed = polling(&memory());
        let sink = Arc::new(CollectingSink::default());
        assert!(matches!(feed.subscribe("alice", sink), Err(FeedError::Transient(_))));
    }
}
