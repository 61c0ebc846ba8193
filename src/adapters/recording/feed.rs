//! Recording adapter for the `TaskFeed` port.

use std::sync::{Arc, Mutex};

use serde_json::json;

use super::{begin_call, complete_call, record_result};
use crate::cassette::recorder::CassetteRecorder;
use crate::error::FeedError;
use crate::ports::{FeedFuture, FeedSubscription, SnapshotSink, TaskFeed};
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

/// Records feed calls and pushes while delegating to an inner feed.
pub struct RecordingTaskFeed {
    inner: Arc<dyn TaskFeed>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingTaskFeed {
    /// Creates a recording feed wrapping `inner`.
    pub fn new(inner: Arc<dyn TaskFeed>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

/// Records each push as a `snapshot` interaction before forwarding it.
struct RecordingSink {
    owner: String,
    inner: Arc<dyn SnapshotSink>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl SnapshotSink for RecordingSink {
    fn on_snapshot(&self, tasks: Vec<Task>) {
        let recorded: Result<&Vec<Task>, FeedError> = Ok(&tasks);
        record_result(&self.recorder, "snapshot", &json!({"ownerId": self.owner}), &recorded);
        self.inner.on_snapshot(tasks);
    }

    fn on_error(&self, error: FeedError) {
        let recorded: Result<(), FeedError> = Err(error.clone());
        record_result(&self.recorder, "snapshot", &json!({"ownerId": self.owner}), &recorded);
        self.inner.on_error(error);
    }
}

impl TaskFeed for RecordingTaskFeed {
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        let seq = begin_call(&self.recorder, "query", &json!({"ownerId": owner_id}));
        let pending = self.inner.query(owner_id);
        Box::pin(async move {
            let result = pending.await;
            complete_call(&self.recorder, seq, &result);
            result
        })
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        let sink = Arc::new(RecordingSink {
            owner: owner_id.to_string(),
            inner: sink,
            recorder: Arc::clone(&self.recorder),
        });
        let seq = begin_call(&self.recorder, "subscribe", &json!({"ownerId": owner_id}));
        let result = self.inner.subscribe(owner_id, sink);
        let opened = result.as_ref().map(|_| ()).map_err(Clone::clone);
        complete_call(&self.recorder, seq, &opened);
        result
    }

    fn create(&self, record: NewTaskRecord) -> FeedFuture<'_, TaskId> {
        Box::pin(async move {
            let seq = begin_call(&self.recorder, "create", &record);
            let result = self.inner.create(record).await;
            complete_call(&self.recorder, seq, &result);
            result
        })
    }

    fn update<'a>(&'a self, id: &'a TaskId, patch: RecordPatch) -> FeedFuture<'a, ()> {
        Box::pin(async move {
            let seq =
                begin_call(&self.recorder, "update", &json!({"id": id, "patch": patch.fields()}));
            let result = self.inner.update(id, patch).await;
            complete_call(&self.recorder, seq, &result);
            result
        })
    }

    fn delete<'a>(&'a self, id: &'a TaskId) -> FeedFuture<'a, ()> {
        Box::pin(async move {
            let seq = begin_call(&self.recorder, "delete", &json!({"id": id}));
            let result = self.inner.delete(id).await;
            complete_call(&self.recorder, seq, &result);
            result
        })
    }
}
