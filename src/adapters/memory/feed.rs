//! In-memory task feed.
//!
//! Behaves like a real-time document store: every subscriber gets a full
//! snapshot on subscribe and after each write touching its owner. Snapshots
//! are delivered synchronously unless held with [`InMemoryTaskFeed::hold_snapshots`].
//! Every submitted write is kept in a log for assertions.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde_json::Value;

use crate::adapters::live::id_gen::LiveIdGenerator;
use crate::error::FeedError;
use crate::ports::{FeedFuture, FeedSubscription, IdGenerator, SnapshotSink, TaskFeed};
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

/// A write submitted to the feed, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    /// `create(record)`.
    Create(NewTaskRecord),
    /// `update(id, patch)`.
    Update(TaskId, RecordPatch),
    /// `delete(id)`.
    Delete(TaskId),
}

impl WriteCall {
    /// The target id, if the write addressed an existing record.
    #[must_use]
    pub fn id(&self) -> Option<&TaskId> {
        match self {
            Self::Create(_) => None,
            Self::Update(id, _) | Self::Delete(id) => Some(id),
        }
    }
}

struct Subscriber {
    owner: String,
    sink: Arc<dyn SnapshotSink>,
}

enum Delivery {
    Snapshot(Arc<dyn SnapshotSink>, Vec<Task>),
    Error(Arc<dyn SnapshotSink>, FeedError),
}

impl Delivery {
    fn sink(&self) -> &Arc<dyn SnapshotSink> {
        match self {
            Self::Snapshot(sink, _) | Self::Error(sink, _) => sink,
        }
    }

    fn deliver(self) {
        match self {
            Self::Snapshot(sink, tasks) => sink.on_snapshot(tasks),
            Self::Error(sink, error) => sink.on_error(error),
        }
    }
}

#[derive(Default)]
struct FeedState {
    records: Vec<Task>,
    subscribers: HashMap<u64, Subscriber>,
    next_subscriber: u64,
    writes: Vec<WriteCall>,
    failures: VecDeque<FeedError>,
    denied: HashSet<String>,
    hold: bool,
    held: Vec<Delivery>,
}

impl FeedState {
    fn snapshot_for(&self, owner: &str) -> Vec<Task> {
        self.records.iter().filter(|task| task.owner_id == owner).cloned().collect()
    }

    /// Queues a snapshot for every subscriber of `owner`, or holds them.
    fn fan_out(&mut self, owner: &str) -> Vec<Delivery> {
        let snapshot = self.snapshot_for(owner);
        let deliveries: Vec<Delivery> = self
            .subscribers
            .values()
            .filter(|sub| sub.owner == owner)
            .map(|sub| Delivery::Snapshot(Arc::clone(&sub.sink), snapshot.clone()))
            .collect();
        self.route(deliveries)
    }

    fn route(&mut self, deliveries: Vec<Delivery>) -> Vec<Delivery> {
        if self.hold {
            self.held.extend(deliveries);
            Vec::new()
        } else {
            deliveries
        }
    }
}

/// Process-local feed with failure injection and a write log.
pub struct InMemoryTaskFeed {
    state: Arc<Mutex<FeedState>>,
    id_gen: Box<dyn IdGenerator>,
}

impl InMemoryTaskFeed {
    /// Creates an empty feed that assigns uuid ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_generator(Box::new(LiveIdGenerator::new()))
    }

    /// Creates an empty feed that draws ids from `id_gen`.
    #[must_use]
    pub fn with_id_generator(id_gen: Box<dyn IdGenerator>) -> Self {
        Self { state: Arc::new(Mutex::new(FeedState::default())), id_gen }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `task` as if another client had written it, notifying subscribers.
    pub fn insert(&self, task: Task) {
        let deliveries = {
            let mut state = self.lock();
            let owner = task.owner_id.clone();
            state.records.retain(|existing| existing.id != task.id);
            state.records.push(task);
            state.fan_out(&owner)
        };
        deliveries.into_iter().for_each(Delivery::deliver);
    }

    /// Sends `error` to every subscriber of `owner`.
    pub fn push_error(&self, owner: &str, error: &FeedError) {
        let deliveries = {
            let mut state = self.lock();
            let deliveries = state
                .subscribers
                .values()
                .filter(|sub| sub.owner == owner)
                .map(|sub| Delivery::Error(Arc::clone(&sub.sink), error.clone()))
                .collect();
            state.route(deliveries)
        };
        deliveries.into_iter().for_each(Delivery::deliver);
    }

    /// Makes future subscriptions for `owner` fail with a permission denial.
    pub fn deny_owner(&self, owner: &str) {
        self.lock().denied.insert(owner.to_string());
    }

    /// Makes the next write fail with `error`. Calls queue up.
    pub fn fail_next_write(&self, error: FeedError) {
        self.lock().failures.push_back(error);
    }

    /// While held, snapshots and errors queue up until [`flush`](Self::flush).
    pub fn hold_snapshots(&self, hold: bool) {
        self.lock().hold = hold;
    }

    /// Delivers queued snapshots in order. Returns how many were delivered.
    pub fn flush(&self) -> usize {
        let held = std::mem::take(&mut self.lock().held);
        let count = held.len();
        held.into_iter().for_each(Delivery::deliver);
        count
    }

    /// Every write submitted so far.
    #[must_use]
    pub fn writes(&self) -> Vec<WriteCall> {
        self.lock().writes.clone()
    }

    /// All stored records, in insertion order.
    #[must_use]
    pub fn records(&self) -> Vec<Task> {
        self.lock().records.clone()
    }

    /// Number of open subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    fn begin_write(&self, call: WriteCall) -> Result<MutexGuard<'_, FeedState>, FeedError> {
        let mut state = self.lock();
        state.writes.push(call);
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        Ok(state)
    }
}

impl Default for InMemoryTaskFeed {
    fn default() -> Self {
        Self::new()
    }
}

fn apply_patch(task: &Task, patch: &RecordPatch) -> Result<Task, FeedError> {
    let mut value = serde_json::to_value(task).map_err(|e| FeedError::Decode(e.to_string()))?;
    if let Value::Object(map) = &mut value {
        patch.apply_to(map);
    }
    Task::from_record(value).map_err(FeedError::Decode)
}

impl TaskFeed for InMemoryTaskFeed {
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        let result = {
            let state = self.lock();
            if state.denied.contains(owner_id) {
                Err(FeedError::PermissionDenied(format!("no read access for {owner_id}")))
            } else {
                Ok(state.snapshot_for(owner_id))
            }
        };
        Box::pin(async move { result })
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        let (key, deliveries) = {
            let mut state = self.lock();
            if state.denied.contains(owner_id) {
                let error = FeedError::PermissionDenied(format!("no read access for {owner_id}"));
                let deliveries = state.route(vec![Delivery::Error(sink, error)]);
                drop(state);
                deliveries.into_iter().for_each(Delivery::deliver);
                return Ok(FeedSubscription::detached());
            }
            let key = state.next_subscriber;
            state.next_subscriber += 1;
            state
                .subscribers
                .insert(key, Subscriber { owner: owner_id.to_string(), sink: Arc::clone(&sink) });
            let snapshot = state.snapshot_for(owner_id);
            (key, state.route(vec![Delivery::Snapshot(sink, snapshot)]))
        };
        deliveries.into_iter().for_each(Delivery::deliver);

        let state: Weak<Mutex<FeedState>> = Arc::downgrade(&self.state);
        Ok(FeedSubscription::new(move || {
            if let Some(state) = state.upgrade() {
                let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                let FeedState { subscribers, held, .. } = &mut *guard;
                subscribers.remove(&key);
                // Held deliveries belong to live subscribers only.
                held.retain(|delivery| has_sink(subscribers, delivery.sink()));
            }
        }))
    }

    fn create(&self, record: NewTaskRecord) -> FeedFuture<'_, TaskId> {
        Box::pin(async move {
            let (id, deliveries) = {
                let mut state = self.begin_write(WriteCall::Create(record.clone()))?;
                let id = TaskId::new(self.id_gen.generate_id());
                let owner = record.owner_id.clone();
                state.records.push(record.into_task(id.clone()));
                (id, state.fan_out(&owner))
            };
            deliveries.into_iter().for_each(Delivery::deliver);
            Ok(id)
        })
    }

    fn update<'a>(&'a self, id: &'a TaskId, patch: RecordPatch) -> FeedFuture<'a, ()> {
        Box::pin(async move {
            let deliveries = {
                let mut state = self.begin_write(WriteCall::Update(id.clone(), patch.clone()))?;
                let slot = state
                    .records
                    .iter_mut()
                    .find(|task| &task.id == id)
                    .ok_or_else(|| FeedError::NotFound(id.to_string()))?;
                *slot = apply_patch(slot, &patch)?;
                let owner = slot.owner_id.clone();
                state.fan_out(&owner)
            };
            deliveries.into_iter().for_each(Delivery::deliver);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a TaskId) -> FeedFuture<'a, ()> {
        Box::pin(async move {
            let deliveries = {
                let mut state = self.begin_write(WriteCall::Delete(id.clone()))?;
                let position = state
                    .records
                    .iter()
                    .position(|task| &task.id == id)
                    .ok_or_else(|| FeedError::NotFound(id.to_string()))?;
                let removed = state.records.remove(position);
                state.fan_out(&removed.owner_id)
            };
            deliveries.into_iter().for_each(Delivery::deliver);
            Ok(())
        })
    }
}

fn has_sink(subscribers: &HashMap<u64, Subscriber>, sink: &Arc<dyn SnapshotSink>) -> bool {
    subscribers.values().any(|sub| Arc::ptr_eq(&sub.sink, sink))
}
