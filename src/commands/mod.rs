//! Command dispatch and handlers.
//!
//! Every command connects a [`TaskStore`] to the configured feed, waits for
//! the first snapshot and then reads or writes through the store. Handlers
//! return the text to print on stdout.

pub mod add;
pub mod edit;
pub mod list;
pub mod mutate;

use crate::cli::Command;
use crate::config::AppConfig;
use crate::context::ServiceContext;
use crate::store::{StoreOptions, SyncStatus, TaskStore};
use crate::task::{Task, TaskId};

/// Dispatch a parsed command to its handler.
///
/// When `QUADRANT_RECORD` is set, all feed traffic is recorded to that
/// cassette once the command finishes (even on error).
///
/// # Errors
///
/// Returns an error string if the context cannot be built, the store does
/// not sync, or the selected command handler fails.
pub fn dispatch(command: &Command, config: &AppConfig) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start runtime: {e}"))?;
    let ctx = ServiceContext::from_config(config).map_err(|e| e.to_string())?;
    let options = StoreOptions { week_start: config.week_start, ..StoreOptions::default() };

    let output = runtime.block_on(async {
        let store = TaskStore::connect(&ctx, options);
        ensure_synced(store.wait_for_sync(config.snapshot_timeout).await, config)?;
        dispatch_with_store(command, &store).await
    });
    drop(ctx);

    let output = output?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

/// Run a command against an already-connected store.
///
/// # Errors
///
/// Returns an error string if the handler fails.
pub async fn dispatch_with_store(command: &Command, store: &TaskStore) -> Result<String, String> {
    match command {
        Command::List(args) => Ok(list::run(store, args)),
        Command::Add(args) => add::run(store, args).await,
        Command::Edit(args) => edit::run(store, args).await,
        Command::Toggle { id } => mutate::toggle(store, id).await,
        Command::Move { id, quadrant } => mutate::move_to(store, id, *quadrant).await,
        Command::Delete { id } => mutate::delete(store, id).await,
    }
}

fn ensure_synced(status: SyncStatus, config: &AppConfig) -> Result<(), String> {
    match status {
        SyncStatus::Synced => Ok(()),
        SyncStatus::SignedOut => Err("not signed in; set QUADRANT_OWNER".to_string()),
        SyncStatus::Failed(error) => Err(format!("task feed error: {error}")),
        SyncStatus::TimedOut => Err(format!(
            "no task snapshot within {} ms",
            config.snapshot_timeout.as_millis()
        )),
    }
}

/// Fails when the feed rejected a write since `before` was read from
/// [`TaskStore::failed_writes`].
fn accepted(store: &TaskStore, before: u64, action: &str, id: &TaskId) -> Result<(), String> {
    if store.failed_writes() > before {
        return Err(format!("task feed rejected {action} of {id}"));
    }
    Ok(())
}

/// Looks up a cached task, failing with a message naming the id.
fn cached(store: &TaskStore, id: &TaskId) -> Result<Task, String> {
    store.task(id).ok_or_else(|| format!("no task with id {id}"))
}

#[cfg(test)]
pub(crate) mod fixture {
    use std::sync::Arc;

    use chrono::{FixedOffset, TimeZone, Utc, Weekday};

    use crate::adapters::memory::{
        InMemoryTaskFeed, LocalIdentitySession, ManualClock, SequentialIdGenerator,
    };
    use crate::context::ServiceContext;
    use crate::ports::Identity;
    use crate::store::{StoreOptions, TaskStore};
    use crate::task::{Quadrant, Task, TaskDraft, TaskId};

    pub(crate) struct Fixture {
        pub(crate) feed: Arc<InMemoryTaskFeed>,
        pub(crate) store: TaskStore,
    }

    /// Store signed in as alice on 2024-06-05 12:00 UTC.
    pub(crate) fn store() -> Fixture {
        let feed = Arc::new(InMemoryTaskFeed::with_id_generator(Box::new(
            SequentialIdGenerator::new("t"),
        )));
        let identity = Arc::new(LocalIdentitySession::signed_in(Identity::new("alice")));
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap()));
        let ctx = ServiceContext::new(clock, feed.clone(), identity);
        let options =
            StoreOptions { week_start: Weekday::Sun, utc_offset: FixedOffset::east_opt(0).unwrap() };
        Fixture { store: TaskStore::connect(&ctx, options), feed }
    }

    pub(crate) fn task(id: &str, title: &str, quadrant: Quadrant) -> Task {
        TaskDraft::new(title, quadrant)
            .unwrap()
            .into_record("alice", Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap())
            .into_task(TaskId::new(id))
    }
}
