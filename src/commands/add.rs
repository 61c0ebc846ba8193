//! `quadrant add` command.

use crate::cli::AddArgs;
use crate::store::TaskStore;
use crate::task::TaskForm;

/// Validates the arguments as a task form and submits it.
///
/// # Errors
///
/// Returns an error string when validation fails or the feed rejects the
/// write.
pub async fn run(store: &TaskStore, args: &AddArgs) -> Result<String, String> {
    let form = TaskForm {
        title: args.title.clone(),
        description: args.description.clone(),
        due_date: args.due.clone().unwrap_or_default(),
        due_time: args.time.clone().unwrap_or_default(),
        quadrant: args.quadrant,
    };
    match store.create_from_form(form).await.map_err(|e| e.to_string())? {
        Some(id) => Ok(format!("Created {id} in {}", args.quadrant.title())),
        None => Err("task was not created".to_string()),
    }
}
