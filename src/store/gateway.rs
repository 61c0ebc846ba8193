//! Mutation gateway: validated writes forwarded to the feed.
//!
//! Every operation is a no-op without a signed-in identity. Failures are
//! logged and swallowed; nothing is retried and the cache is never touched
//! here.

use crate::error::ValidationError;
use crate::task::{Quadrant, RecordPatch, TaskDraft, TaskForm, TaskId, TaskPatch};

use super::TaskStore;

impl TaskStore {
    fn signed_in_owner(&self, operation: &'static str) -> Option<String> {
        let owner = self.owner();
        if owner.is_none() {
            tracing::debug!(operation, "ignored while signed out");
        }
        owner
    }

    async fn submit_patch(&self, operation: &'static str, id: &TaskId, patch: RecordPatch) {
        match self.inner.feed.update(id, patch).await {
            Ok(()) => tracing::debug!(operation, %id, "update accepted"),
            Err(error) => {
                tracing::error!(operation, %id, %error, "update failed");
                self.note_failed_write();
            }
        }
    }

    /// Submits a new task owned by the signed-in identity.
    ///
    /// Returns the feed-assigned id once the feed accepts the record, or
    /// `None` when signed out or the write failed. The cache picks the task
    /// up from the next snapshot.
    pub async fn create(&self, draft: TaskDraft) -> Option<TaskId> {
        let owner = self.signed_in_owner("create")?;
        let record = draft.into_record(&owner, self.inner.clock.now());
        match self.inner.feed.create(record).await {
            Ok(id) => {
                tracing::info!(%id, "task created");
                Some(id)
            }
            Err(error) => {
                tracing::error!(%error, "create failed");
                self.note_failed_write();
                None
            }
        }
    }

    /// Validates `form` in the viewer's offset and submits it as a new task.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] before anything is submitted.
    pub async fn create_from_form(&self, form: TaskForm) -> Result<Option<TaskId>, ValidationError> {
        let draft = form.into_draft_in(&self.inner.options.utc_offset)?;
        Ok(self.create(draft).await)
    }

    /// Submits the fields present in `patch`. An empty patch writes nothing.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) {
        if self.signed_in_owner("update").is_none() {
            return;
        }
        if patch.is_empty() {
            tracing::debug!(%id, "empty patch; nothing to write");
            return;
        }
        self.submit_patch("update", id, patch.to_record_patch()).await;
    }

    /// Validates an edit form and submits every field it carries.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] before anything is submitted.
    pub async fn update_from_form(&self, id: &TaskId, form: TaskForm) -> Result<(), ValidationError> {
        let patch = form.into_patch_in(&self.inner.options.utc_offset)?;
        self.update(id, patch).await;
        Ok(())
    }

    /// Removes a task.
    pub async fn delete(&self, id: &TaskId) {
        if self.signed_in_owner("delete").is_none() {
            return;
        }
        match self.inner.feed.delete(id).await {
            Ok(()) => tracing::info!(%id, "task deleted"),
            Err(error) => {
                tracing::error!(%id, %error, "delete failed");
                self.note_failed_write();
            }
        }
    }

    /// Flips `completed` based on the cached value and writes the paired
    /// `completedAt`.
    pub async fn toggle_completion(&self, id: &TaskId) {
        if self.signed_in_owner("toggle").is_none() {
            return;
        }
        let Some(task) = self.task(id) else {
            tracing::debug!(%id, "toggle ignored: task not cached");
            return;
        };
        let completed = !task.completed;
        let completed_at = completed.then(|| self.inner.clock.now());
        self.submit_patch("toggle", id, RecordPatch::completion(completed, completed_at)).await;
    }

    /// Moves a task to `quadrant`, unless the cache already has it there.
    pub async fn move_task(&self, id: &TaskId, quadrant: Quadrant) {
        if self.signed_in_owner("move").is_none() {
            return;
        }
        if self.task(id).is_some_and(|task| task.quadrant == quadrant) {
            tracing::debug!(%id, %quadrant, "move skipped: already in quadrant");
            return;
        }
        self.submit_patch("move", id, RecordPatch::quadrant(quadrant)).await;
    }

    /// Within-quadrant reordering. Records carry no order field, so this
    /// only logs.
    pub fn reorder(&self, id: &TaskId, reference: &TaskId) {
        tracing::debug!(%id, %reference, "reorder requested; manual order is not persisted");
    }
}
