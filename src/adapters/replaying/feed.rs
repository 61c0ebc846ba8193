//! Replaying adapter for the `TaskFeed` port.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::replay_result;
use crate::cassette::format::FEED_PORT;
use crate::cassette::replayer::CassetteReplayer;
use crate::cassette::CassetteError;
use crate::error::FeedError;
use crate::ports::{FeedFuture, FeedSubscription, SnapshotSink, TaskFeed};
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

const SNAPSHOT: &str = "snapshot";

struct ReplayState {
    replayer: CassetteReplayer,
    sinks: HashMap<u64, (String, Arc<dyn SnapshotSink>)>,
    next_key: u64,
}

impl ReplayState {
    fn next_output(&mut self, method: &str) -> Option<Value> {
        self.replayer.next_interaction(FEED_PORT, method).map(|i| i.output.clone())
    }

    /// Pops recorded pushes that were captured before the next pending call
    /// and pairs them with the open sinks for their owner.
    fn due_pushes(&mut self) -> Vec<(Arc<dyn SnapshotSink>, Value)> {
        let mut due = Vec::new();
        while let Some(push) = self.replayer.peek(FEED_PORT, SNAPSHOT) {
            let limit = self.replayer.next_seq_excluding(FEED_PORT, SNAPSHOT);
            if limit.is_some_and(|limit| push.seq > limit) {
                break;
            }
            let owner = push.input.get("ownerId").and_then(Value::as_str).unwrap_or_default();
            let sinks: Vec<_> = self
                .sinks
                .values()
                .filter(|(sink_owner, _)| sink_owner == owner)
                .map(|(_, sink)| Arc::clone(sink))
                .collect();
            if sinks.is_empty() {
                break;
            }
            let output = push.output.clone();
            self.replayer.next_interaction(FEED_PORT, SNAPSHOT);
            due.extend(sinks.into_iter().map(|sink| (sink, output.clone())));
        }
        due
    }
}

fn deliver(pushes: Vec<(Arc<dyn SnapshotSink>, Value)>) {
    for (sink, output) in pushes {
        match replay_result::<Vec<Task>>(Some(output), SNAPSHOT) {
            Ok(tasks) => sink.on_snapshot(tasks),
            Err(error) => sink.on_error(error),
        }
    }
}

/// Serves recorded feed results and pushes from a cassette.
///
/// Calls are answered in recorded order per method. Recorded pushes are
/// delivered to matching subscribers as soon as every call recorded before
/// them has been replayed. An exhausted cassette answers with
/// [`FeedError::Transient`].
pub struct ReplayingTaskFeed {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplayingTaskFeed {
    /// Creates a replaying feed backed by the given replayer.
    #[must_use]
    pub fn new(replayer: CassetteReplayer) -> Self {
        let state = ReplayState { replayer, sinks: HashMap::new(), next_key: 0 };
        Self { state: Arc::new(Mutex::new(state)) }
    }

    /// Loads the cassette at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, CassetteError> {
        CassetteReplayer::load(path).map(Self::new)
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replay<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, FeedError> {
        let (output, pushes) = {
            let mut state = self.lock();
            let output = state.next_output(method);
            (output, state.due_pushes())
        };
        deliver(pushes);
        replay_result(output, method)
    }
}

impl TaskFeed for ReplayingTaskFeed {
    fn query(&self, _owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        let result = self.replay("query");
        Box::pin(async move { result })
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        let (key, pushes) = {
            let mut state = self.lock();
            let output = state.next_output("subscribe");
            replay_result::<()>(output, "subscribe")?;
            let key = state.next_key;
            state.next_key += 1;
            state.sinks.insert(key, (owner_id.to_string(), sink));
            (key, state.due_pushes())
        };
        deliver(pushes);

        let state = Arc::downgrade(&self.state);
        Ok(FeedSubscription::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().unwrap_or_else(PoisonError::into_inner).sinks.remove(&key);
            }
        }))
    }

    fn create(&self, _record: NewTaskRecord) -> FeedFuture<'_, TaskId> {
        let result = self.replay("create");
        Box::pin(async move { result })
    }

    fn update<'a>(&'a self, _id: &'a TaskId, _patch: RecordPatch) -> FeedFuture<'a, ()> {
        let result = self.replay("update");
        Box::pin(async move { result })
    }

    fn delete<'a>(&'a self, _id: &'a TaskId) -> FeedFuture<'a, ()> {
        let result = self.replay("delete");
        Box::pin(async move { result })
    }
}
