//! Replaying adapters that serve recorded feed traffic.

pub mod feed;

pub use feed::ReplayingTaskFeed;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FeedError;

/// Decodes a recorded `{"Ok": v}` / `{"Err": {code, message}}` output.
///
/// A missing interaction decodes to a transient failure naming `method`.
pub(crate) fn replay_result<T: DeserializeOwned>(
    output: Option<Value>,
    method: &str,
) -> Result<T, FeedError> {
    let Some(output) = output else {
        return Err(FeedError::Transient(format!("cassette exhausted for feed::{method}")));
    };
    if let Some(ok) = output.get("Ok") {
        return serde_json::from_value(ok.clone())
            .map_err(|e| FeedError::Decode(format!("feed::{method} recording: {e}")));
    }
    match output.get("Err") {
        Some(err) => {
            let code = err.get("code").and_then(Value::as_str).unwrap_or_default();
            let message = err.get("message").and_then(Value::as_str).unwrap_or_default();
            Err(FeedError::from_code(code, message))
        }
        None => Err(FeedError::Decode(format!("feed::{method} recording is neither Ok nor Err"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::recording::encode_result;

    #[test]
    fn errors_survive_encoding() {
        let recorded: Result<(), FeedError> = Err(FeedError::PermissionDenied("no".into()));
        let replayed: Result<(), FeedError> = replay_result(Some(encode_result(&recorded)), "x");
        assert_eq!(replayed, recorded);
    }

    #[test]
    fn missing_output_is_transient() {
        let replayed: Result<String, FeedError> = replay_result(None, "create");
        assert_eq!(replayed, Err(FeedError::Transient("cassette exhausted for feed::create".into())));
    }
}
