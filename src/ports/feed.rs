//! Remote task feed port: a queryable, subscribable collection of task
//! records scoped by owner.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::error::FeedError;
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

/// Boxed future type alias used by [`TaskFeed`] to keep the trait dyn-compatible.
pub type FeedFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FeedError>> + Send + 'a>>;

/// Receives pushes from an open subscription.
///
/// Each snapshot is the complete current record set for the queried owner.
pub trait SnapshotSink: Send + Sync {
    /// Delivers a full snapshot.
    fn on_snapshot(&self, tasks: Vec<Task>);

    /// Reports a subscription failure.
    fn on_error(&self, error: FeedError);
}

/// Handle for an open subscription. Delivery stops on [`unsubscribe`] or drop.
///
/// [`unsubscribe`]: FeedSubscription::unsubscribe
pub struct FeedSubscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl FeedSubscription {
    /// Wraps the closure that tears the subscription down.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// A subscription with nothing to tear down.
    #[must_use]
    pub fn detached() -> Self {
        Self { cancel: None }
    }

    /// Stops delivery. Returns once no further callbacks will be made.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for FeedSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedSubscription").field("active", &self.cancel.is_some()).finish()
    }
}

/// Persists task records and pushes change notifications.
///
/// Abstracting the feed lets the store's reconciliation logic run against a
/// live service, a polling adapter, an in-memory fake or a cassette.
pub trait TaskFeed: Send + Sync {
    /// Fetches the current records owned by `owner_id` once.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>>;

    /// Opens a subscription scoped to `owner_id`.
    ///
    /// The feed performs no ordering. Snapshots may be delivered
    /// synchronously from inside this call.
    ///
    /// # Errors
    ///
    /// Returns an error if the subscription cannot be opened.
    fn subscribe(
        &self,
        owner_id: &str,
        sink: std::sync::Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError>;

    /// Submits a new record and returns its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or fails.
    fn create(&self, record: NewTaskRecord) -> FeedFuture<'_, TaskId>;

    /// Applies a partial-field patch; absent fields are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or fails.
    fn update<'a>(&'a self, id: &'a TaskId, patch: RecordPatch) -> FeedFuture<'a, ()>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected or fails.
    fn delete<'a>(&'a self, id: &'a TaskId) -> FeedFuture<'a, ()>;
}
