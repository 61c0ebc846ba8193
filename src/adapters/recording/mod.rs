//! Recording adapters that capture feed traffic to cassettes.

pub mod feed;

pub use feed::RecordingTaskFeed;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Value};

use crate::cassette::format::FEED_PORT;
use crate::cassette::recorder::CassetteRecorder;
use crate::error::FeedError;

/// Serializes a feed result using the Ok/Err JSON convention.
///
/// - `Ok(v)` is serialized as `{"Ok": v}`
/// - `Err(e)` is serialized as `{"Err": {"code": e.code(), "message": e.message()}}`
pub(crate) fn encode_result<T: Serialize>(result: &Result<T, FeedError>) -> Value {
    match result {
        Ok(v) => json!({ "Ok": serde_json::to_value(v).unwrap_or_default() }),
        Err(e) => json!({ "Err": { "code": e.code(), "message": e.message() } }),
    }
}

fn lock(recorder: &Mutex<CassetteRecorder>) -> MutexGuard<'_, CassetteRecorder> {
    recorder.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reserves a slot for a feed call before it runs, so that pushes the call
/// triggers are recorded after it.
pub(crate) fn begin_call<I: Serialize>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    method: &str,
    input: &I,
) -> u64 {
    let input = serde_json::to_value(input).unwrap_or_default();
    lock(recorder).begin(FEED_PORT, method, input)
}

/// Stores the result of a call started with [`begin_call`].
pub(crate) fn complete_call<T: Serialize>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    seq: u64,
    result: &Result<T, FeedError>,
) {
    lock(recorder).complete(seq, encode_result(result));
}

/// Appends a feed interaction to the shared recorder.
pub(crate) fn record_result<T, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    method: &str,
    input: &I,
    result: &Result<T, FeedError>,
) where
    T: Serialize,
    I: Serialize,
{
    let input = serde_json::to_value(input).unwrap_or_default();
    let output = encode_result(result);
    lock(recorder).record(FEED_PORT, method, input, output);
}
