//! Live adapter for the `TaskFeed` port over a REST document service.
//!
//! Endpoints, relative to the configured base URL:
//!
//! ```text
//! GET    /tasks?ownerId=<uid>          -> [record, ...]
//! GET    /tasks:listen?ownerId=<uid>   -> NDJSON stream of frames
//! POST   /tasks                        -> {"id": "..."}
//! PATCH  /tasks/<id>
//! DELETE /tasks/<id>
//! ```
//!
//! Stream frames are `{"type":"snapshot","documents":[...]}` or
//! `{"type":"error","code":"...","message":"..."}`. The stream ends after an
//! error frame.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::line_buffer::LineBuffer;
use crate::error::FeedError;
use crate::ports::{FeedFuture, FeedSubscription, SnapshotSink, TaskFeed};
use crate::task::{NewTaskRecord, RecordPatch, Task, TaskId};

/// Longest unterminated stream line kept in memory.
const MAX_FRAME_BYTES: usize = 8 * 1024 * 1024;

/// Live feed client.
pub struct LiveTaskFeed {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl LiveTaskFeed {
    /// Creates a client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client: Client::new(), base_url, token }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(builder: RequestBuilder) -> Result<Response, FeedError> {
        let response = builder
            .send()
            .await
            .map_err(|e| FeedError::Transient(format!("task feed request failed: {e}")))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, body))
    }
}

#[derive(Deserialize)]
struct Created {
    id: String,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamFrame {
    Snapshot {
        documents: Vec<Value>,
    },
    Error {
        code: String,
        #[serde(default)]
        message: String,
    },
}

fn status_error(status: StatusCode, body: String) -> FeedError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FeedError::PermissionDenied(body),
        StatusCode::NOT_FOUND => FeedError::NotFound(body),
        _ => FeedError::Transient(format!("task feed returned {}: {body}", status.as_u16())),
    }
}

/// Decodes raw documents, skipping ones that do not form a valid task.
pub(crate) fn decode_documents(documents: Vec<Value>) -> Vec<Task> {
    documents
        .into_iter()
        .filter_map(|document| match Task::from_record(document) {
            Ok(task) => Some(task),
            Err(error) => {
                tracing::warn!(%error, "skipping undecodable task record");
                None
            }
        })
        .collect()
}

/// Whether the stream should keep being read after a frame.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum FrameOutcome {
    Continue,
    Stop,
}

/// Parses one stream line and forwards it to `sink`.
pub(crate) fn dispatch_frame(line: &str, sink: &dyn SnapshotSink) -> FrameOutcome {
    match serde_json::from_str::<StreamFrame>(line) {
        Ok(StreamFrame::Snapshot { documents }) => {
            sink.on_snapshot(decode_documents(documents));
            FrameOutcome::Continue
        }
        Ok(StreamFrame::Error { code, message }) => {
            sink.on_error(FeedError::from_code(&code, message));
            FrameOutcome::Stop
        }
        Err(error) => {
            tracing::warn!(%error, "ignoring malformed listen frame");
            FrameOutcome::Continue
        }
    }
}

async fn listen(builder: RequestBuilder, sink: &dyn SnapshotSink) -> Result<(), FeedError> {
    let mut response = LiveTaskFeed::send(builder).await?;
    let mut lines = LineBuffer::new(Some(MAX_FRAME_BYTES));
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| FeedError::Transient(format!("listen stream interrupted: {e}")))?
    {
        for line in lines.push(&chunk) {
            if dispatch_frame(&line, sink) == FrameOutcome::Stop {
                return Ok(());
            }
        }
        let dropped = lines.consume_overflowed_bytes();
        if dropped > 0 {
            tracing::warn!(dropped, "listen frame exceeded buffer limit");
        }
    }
    Err(FeedError::Transient("listen stream closed by server".into()))
}

impl TaskFeed for LiveTaskFeed {
    fn query(&self, owner_id: &str) -> FeedFuture<'_, Vec<Task>> {
        let builder = self.request(Method::GET, "/tasks").query(&[("ownerId", owner_id)]);
        Box::pin(async move {
            let response = Self::send(builder).await?;
            let documents: Vec<Value> = response
                .json()
                .await
                .map_err(|e| FeedError::Decode(format!("task query response: {e}")))?;
            Ok(decode_documents(documents))
        })
    }

    fn subscribe(
        &self,
        owner_id: &str,
        sink: Arc<dyn SnapshotSink>,
    ) -> Result<FeedSubscription, FeedError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| FeedError::Transient("live subscription needs a tokio runtime".into()))?;
        let builder = self.request(Method::GET, "/tasks:listen").query(&[("ownerId", owner_id)]);
        let owner = owner_id.to_string();
        let task = runtime.spawn(async move {
            if let Err(error) = listen(builder, sink.as_ref()).await {
                sink.on_error(error);
            }
            tracing::debug!(%owner, "listen stream finished");
        });
        Ok(FeedSubscription::new(move || task.abort()))
    }

    fn create(&self, record: NewTaskRecord) -> FeedFuture<'_, TaskId> {
        let builder = self.request(Method::POST, "/tasks").json(&record);
        Box::pin(async move {
            let created: Created = Self::send(builder)
                .await?
                .json()
                .await
                .map_err(|e| FeedError::Decode(format!("create response: {e}")))?;
            Ok(TaskId::new(created.id))
        })
    }

    fn update<'a>(&'a self, id: &'a TaskId, patch: RecordPatch) -> FeedFuture<'a, ()> {
        let builder = self.request(Method::PATCH, &format!("/tasks/{id}")).json(patch.fields());
        Box::pin(async move {
            Self::send(builder).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, id: &'a TaskId) -> FeedFuture<'a, ()> {
        let builder = self.request(Method::DELETE, &format!("/tasks/{id}"));
        Box::pin(async move {
            Self::send(builder).await?;
            Ok(())
        })
    }
}
