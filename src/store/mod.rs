//! Task store: the synchronized task cache, its mutation gateway, derived
//! views and the drag gesture engine.
//!
//! The store follows the identity session. Every identity change clears the
//! cache, closes the previous feed subscription and, when someone is signed
//! in, opens a subscription scoped to the new owner. Each subscription is
//! tagged with a generation so that pushes from a closed subscription are
//! ignored.
//!
//! Only the snapshot handler writes the cache. Mutations go to the feed and
//! show up in the cache once the feed pushes the next snapshot.

pub mod cache;
mod gateway;
pub mod view;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Weekday};
use tokio::sync::watch;

pub use cache::{cache_order, TaskCache};
pub use view::{DateFilter, ViewConfig, ViewMode};

use crate::context::ServiceContext;
use crate::drag::{DragEngine, DragIntent, DragState, DropTarget};
use crate::error::{AuthError, FeedError};
use crate::filter::calendar::{tasks_for_day, tasks_for_hour};
use crate::filter::{filter_tasks, sort_all_tasks, QuadrantBuckets};
use crate::ports::{
    Clock, FeedSubscription, Identity, IdentitySession, IdentitySubscription, SnapshotSink,
    TaskFeed,
};
use crate::task::{Task, TaskId};

/// Calendar settings used by the derived views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// First day of the week for the this-week filter.
    pub week_start: Weekday,
    /// Viewer's offset from UTC; sets day boundaries.
    pub utc_offset: FixedOffset,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { week_start: Weekday::Sun, utc_offset: *Local::now().offset() }
    }
}

/// Outcome of [`TaskStore::wait_for_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// A snapshot for the current identity has been applied.
    Synced,
    /// Nobody is signed in.
    SignedOut,
    /// The subscription reported an error before any snapshot arrived.
    Failed(FeedError),
    /// No snapshot arrived in time.
    TimedOut,
}

struct StoreState {
    owner: Option<String>,
    generation: u64,
    cache: TaskCache,
    subscription: Option<FeedSubscription>,
    synced: bool,
    last_error: Option<FeedError>,
    view: ViewConfig,
    drag: DragEngine,
}

struct StoreInner {
    feed: Arc<dyn TaskFeed>,
    identity: Arc<dyn IdentitySession>,
    clock: Arc<dyn Clock>,
    options: StoreOptions,
    state: Mutex<StoreState>,
    revision: watch::Sender<u64>,
    failed_writes: AtomicU64,
}

struct StoreSink {
    store: Weak<StoreInner>,
    generation: u64,
    owner: String,
}

impl SnapshotSink for StoreSink {
    fn on_snapshot(&self, tasks: Vec<Task>) {
        if let Some(store) = self.store.upgrade() {
            store.apply_snapshot(self.generation, &self.owner, tasks);
        }
    }

    fn on_error(&self, error: FeedError) {
        if let Some(store) = self.store.upgrade() {
            store.apply_error(self.generation, error);
        }
    }
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn on_identity_changed(self: &Arc<Self>, identity: Option<Identity>) {
        let owner = identity.map(|identity| identity.uid);
        let (generation, previous) = {
            let mut state = self.lock();
            state.generation += 1;
            state.owner.clone_from(&owner);
            state.cache.clear();
            state.synced = false;
            state.last_error = None;
            state.drag.cancel();
            (state.generation, state.subscription.take())
        };
        self.bump();
        if let Some(previous) = previous {
            previous.unsubscribe();
            tracing::info!(generation, "closed previous task subscription");
        }

        let Some(owner) = owner else {
            tracing::info!("signed out; task cache cleared");
            return;
        };
        let sink = Arc::new(StoreSink {
            store: Arc::downgrade(self),
            generation,
            owner: owner.clone(),
        });
        match self.feed.subscribe(&owner, sink) {
            Ok(subscription) => {
                let stale = {
                    let mut state = self.lock();
                    if state.generation == generation {
                        state.subscription = Some(subscription);
                        None
                    } else {
                        Some(subscription)
                    }
                };
                match stale {
                    Some(stale) => stale.unsubscribe(),
                    None => tracing::info!(%owner, generation, "subscribed to tasks"),
                }
            }
            Err(error) => self.apply_error(generation, error),
        }
    }

    fn apply_snapshot(&self, generation: u64, owner: &str, tasks: Vec<Task>) {
        let received = tasks.len();
        let dropped = {
            let mut state = self.lock();
            if state.generation != generation {
                tracing::debug!(generation, "ignoring snapshot from a closed subscription");
                return;
            }
            let dropped = state.cache.replace(owner, tasks);
            state.synced = true;
            state.last_error = None;
            dropped
        };
        tracing::debug!(received, dropped, "applied task snapshot");
        self.bump();
    }

    fn apply_error(&self, generation: u64, error: FeedError) {
        {
            let mut state = self.lock();
            if state.generation != generation {
                return;
            }
            if error.is_permission_denied() {
                state.cache.clear();
            }
            state.last_error = Some(error.clone());
        }
        if error.is_permission_denied() {
            tracing::warn!(%error, "task feed denied access; cache cleared");
        } else {
            tracing::warn!(%error, "task feed error; keeping last snapshot");
        }
        self.bump();
    }

    fn sync_status(&self) -> Option<SyncStatus> {
        let state = self.lock();
        if state.owner.is_none() {
            Some(SyncStatus::SignedOut)
        } else if state.synced {
            Some(SyncStatus::Synced)
        } else {
            state.last_error.clone().map(SyncStatus::Failed)
        }
    }
}

/// Explicitly constructed task store bound to one service context.
pub struct TaskStore {
    inner: Arc<StoreInner>,
    _identity_subscription: IdentitySubscription,
}

impl TaskStore {
    /// Builds a store over the context's ports and starts following the
    /// identity session. The current identity, if any, is subscribed
    /// immediately.
    #[must_use]
    pub fn connect(ctx: &ServiceContext, options: StoreOptions) -> Self {
        let state = StoreState {
            owner: None,
            generation: 0,
            cache: TaskCache::default(),
            subscription: None,
            synced: false,
            last_error: None,
            view: ViewConfig::default(),
            drag: DragEngine::default(),
        };
        let (revision, _) = watch::channel(0);
        let inner = Arc::new(StoreInner {
            feed: Arc::clone(&ctx.feed),
            identity: Arc::clone(&ctx.identity),
            clock: Arc::clone(&ctx.clock),
            options,
            state: Mutex::new(state),
            revision,
            failed_writes: AtomicU64::new(0),
        });

        let listener = Arc::downgrade(&inner);
        let identity_subscription = ctx.identity.on_change(Box::new(move |identity| {
            if let Some(inner) = listener.upgrade() {
                inner.on_identity_changed(identity);
            }
        }));
        inner.on_identity_changed(ctx.identity.current_identity());
        Self { inner, _identity_subscription: identity_subscription }
    }

    // --- observation ---

    /// Receiver for the revision counter, bumped on every cache or view
    /// change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Current revision.
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.inner.revision.borrow()
    }

    /// Number of writes the feed has rejected since the store connected.
    #[must_use]
    pub fn failed_writes(&self) -> u64 {
        self.inner.failed_writes.load(Ordering::Relaxed)
    }

    pub(crate) fn note_failed_write(&self) {
        self.inner.failed_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Waits until the current identity's first snapshot is applied, the
    /// subscription fails, or `timeout` elapses.
    pub async fn wait_for_sync(&self, timeout: Duration) -> SyncStatus {
        let mut revisions = self.watch();
        let wait = async {
            loop {
                if let Some(status) = self.inner.sync_status() {
                    return status;
                }
                if revisions.changed().await.is_err() {
                    return SyncStatus::TimedOut;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.unwrap_or(SyncStatus::TimedOut)
    }

    /// The signed-in identity, as reported by the session.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.identity.current_identity()
    }

    /// Uid the cache is currently scoped to.
    #[must_use]
    pub fn owner(&self) -> Option<String> {
        self.inner.lock().owner.clone()
    }

    /// Cached tasks in cache order.
    #[must_use]
    pub fn tasks(&self) -> Vec<Task> {
        self.inner.lock().cache.tasks().to_vec()
    }

    /// The cached task with `id`.
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<Task> {
        self.inner.lock().cache.get(id).cloned()
    }

    // --- view configuration ---

    /// Current view configuration.
    #[must_use]
    pub fn view(&self) -> ViewConfig {
        self.inner.lock().view.clone()
    }

    fn update_view(&self, change: impl FnOnce(&mut ViewConfig)) {
        change(&mut self.inner.lock().view);
        self.inner.bump();
    }

    /// Sets the search text.
    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.update_view(|view| view.search = search);
    }

    /// Shows or hides completed tasks.
    pub fn set_show_completed(&self, show: bool) {
        self.update_view(|view| view.show_completed = show);
    }

    /// Sets the due-date window.
    pub fn set_date_filter(&self, filter: DateFilter) {
        self.update_view(|view| view.date_filter = filter);
    }

    /// Sets the presentation mode.
    pub fn set_view_mode(&self, mode: ViewMode) {
        self.update_view(|view| view.mode = mode);
    }

    // --- derived views ---

    /// Current instant in the viewer's offset.
    #[must_use]
    pub fn now(&self) -> DateTime<FixedOffset> {
        self.inner.clock.now().with_timezone(&self.inner.options.utc_offset)
    }

    /// Viewer's offset from UTC.
    #[must_use]
    pub fn utc_offset(&self) -> FixedOffset {
        self.inner.options.utc_offset
    }

    /// Cached tasks passing the current filters, in cache order.
    #[must_use]
    pub fn filtered_tasks(&self) -> Vec<Task> {
        let (tasks, view) = {
            let state = self.inner.lock();
            (state.cache.tasks().to_vec(), state.view.clone())
        };
        filter_tasks(&tasks, &view, &self.now(), self.inner.options.week_start)
    }

    /// Filtered tasks grouped by quadrant.
    #[must_use]
    pub fn quadrant_buckets(&self) -> QuadrantBuckets {
        QuadrantBuckets::partition(self.filtered_tasks())
    }

    /// Filtered tasks in all-tasks order.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<Task> {
        let mut tasks = self.filtered_tasks();
        sort_all_tasks(&mut tasks);
        tasks
    }

    /// Filtered tasks due on `date`.
    #[must_use]
    pub fn day_tasks(&self, date: NaiveDate) -> Vec<Task> {
        tasks_for_day(&self.filtered_tasks(), date, &self.inner.options.utc_offset)
    }

    /// Filtered tasks due on `date` during `hour`.
    #[must_use]
    pub fn hour_tasks(&self, date: NaiveDate, hour: u32) -> Vec<Task> {
        tasks_for_hour(&self.filtered_tasks(), date, hour, &self.inner.options.utc_offset)
    }

    // --- drag gesture ---

    /// Current drag state.
    #[must_use]
    pub fn drag_state(&self) -> DragState {
        self.inner.lock().drag.state().clone()
    }

    /// Starts dragging `task`.
    pub fn drag_start(&self, task: TaskId) {
        self.inner.lock().drag.start(task);
    }

    /// The dragged task moved over `target`; submits a move when the
    /// target lies in another quadrant.
    pub async fn drag_over(&self, target: DropTarget) {
        let intent = {
            let mut state = self.inner.lock();
            let StoreState { drag, cache, .. } = &mut *state;
            drag.over(target, |id| cache.get(id).map(|task| task.quadrant))
        };
        self.run_intent(intent).await;
    }

    /// The gesture ended over `target`, or outside any target.
    pub async fn drag_end(&self, target: Option<DropTarget>) {
        let intent = self.inner.lock().drag.end(target);
        self.run_intent(intent).await;
    }

    async fn run_intent(&self, intent: Option<DragIntent>) {
        match intent {
            Some(DragIntent::Move { task, to }) => self.move_task(&task, to).await,
            Some(DragIntent::Reorder { task, reference }) => self.reorder(&task, &reference),
            None => {}
        }
    }

    // --- account operations ---

    /// Creates an account and signs in.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<Identity, AuthError> {
        self.inner.identity.sign_up(email, password, display_name).await
    }

    /// Signs in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.inner.identity.sign_in(email, password).await
    }

    /// Signs out.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.identity.sign_out().await
    }

    /// Changes the display name.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn update_display_name(&self, display_name: &str) -> Result<Identity, AuthError> {
        self.inner.identity.update_display_name(display_name).await
    }

    /// Changes the password after re-authenticating with `current`.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn update_password(&self, current: &str, new: &str) -> Result<(), AuthError> {
        self.inner.identity.update_password(current, new).await
    }

    /// Sends a verification email.
    ///
    /// # Errors
    ///
    /// Returns the identity provider's error.
    pub async fn send_verification_email(&self) -> Result<(), AuthError> {
        self.inner.identity.send_verification_email().await
    }
}
