//! `quadrant edit` command.

use crate::cli::EditArgs;
use crate::store::TaskStore;
use crate::task::TaskForm;

use super::{accepted, cached};

fn has_changes(args: &EditArgs) -> bool {
    args.title.is_some()
        || args.description.is_some()
        || args.due.is_some()
        || args.time.is_some()
        || args.clear_due
        || args.quadrant.is_some()
}

/// Pre-fills a form from the cached task, overlays the given flags and
/// submits the result as a full edit.
///
/// # Errors
///
/// Returns an error string when the task is not cached or the edited form
/// does not validate, or the feed rejects the write.
pub async fn run(store: &TaskStore, args: &EditArgs) -> Result<String, String> {
    let task = cached(store, &args.id)?;
    if !has_changes(args) {
        return Ok(format!("Nothing to change for {}", args.id));
    }

    let mut form = TaskForm::from_task_in(&task, &store.utc_offset());
    if let Some(title) = &args.title {
        form.title.clone_from(title);
    }
    if let Some(description) = &args.description {
        form.description.clone_from(description);
    }
    if args.clear_due {
        form.due_date.clear();
        form.due_time.clear();
    }
    if let Some(due) = &args.due {
        form.due_date.clone_from(due);
    }
    if let Some(time) = &args.time {
        form.due_time.clone_from(time);
    }
    if let Some(quadrant) = args.quadrant {
        form.quadrant = quadrant;
    }

    let before = store.failed_writes();
    store.update_from_form(&args.id, form).await.map_err(|e| e.to_string())?;
    accepted(store, before, "edit", &args.id)?;
    Ok(format!("Updated {}", args.id))
}
