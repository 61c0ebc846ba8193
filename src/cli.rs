//! CLI argument definitions.

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::store::{DateFilter, ViewMode};
use crate::task::{Quadrant, TaskId};

/// Top-level CLI parser for `quadrant`.
#[derive(Debug, Parser)]
#[command(name = "quadrant", version, about = "Urgent/important task matrix")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show the signed-in user's tasks.
    List(ListArgs),
    /// Create a task.
    Add(AddArgs),
    /// Edit a task's fields.
    Edit(EditArgs),
    /// Flip a task between open and completed.
    Toggle {
        /// Task id.
        id: TaskId,
    },
    /// Move a task to another quadrant (1-4).
    Move {
        /// Task id.
        id: TaskId,
        /// Target quadrant.
        quadrant: Quadrant,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: TaskId,
    },
}

/// Options for `list`.
#[derive(Debug, Args, Default)]
pub struct ListArgs {
    /// Layout: grid, list, all or calendar.
    #[arg(long, default_value_t = ViewMode::Grid)]
    pub view: ViewMode,
    /// Case-insensitive text filter on title and description.
    #[arg(long, default_value = "")]
    pub search: String,
    /// Hide completed tasks.
    #[arg(long)]
    pub hide_completed: bool,
    /// Due-date filter: all, today or this-week.
    #[arg(long, default_value_t = DateFilter::All)]
    pub date: DateFilter,
    /// Day shown by the calendar view, defaults to today.
    #[arg(long)]
    pub day: Option<NaiveDate>,
}

/// Options for `add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Title.
    pub title: String,
    /// Description.
    #[arg(long, default_value = "")]
    pub description: String,
    /// Due date, `YYYY-MM-DD`.
    #[arg(long)]
    pub due: Option<String>,
    /// Due time, `HH:MM`; needs `--due`.
    #[arg(long, requires = "due")]
    pub time: Option<String>,
    /// Quadrant (1-4).
    #[arg(long, default_value_t = Quadrant::UrgentImportant)]
    pub quadrant: Quadrant,
}

/// Options for `edit`. Omitted flags keep the current value.
#[derive(Debug, Args)]
pub struct EditArgs {
    /// Task id.
    pub id: TaskId,
    /// New title.
    #[arg(long)]
    pub title: Option<String>,
    /// New description.
    #[arg(long)]
    pub description: Option<String>,
    /// New due date, `YYYY-MM-DD`.
    #[arg(long, conflicts_with = "clear_due")]
    pub due: Option<String>,
    /// New due time, `HH:MM`.
    #[arg(long, conflicts_with = "clear_due")]
    pub time: Option<String>,
    /// Remove the deadline.
    #[arg(long)]
    pub clear_due: bool,
    /// New quadrant (1-4).
    #[arg(long)]
    pub quadrant: Option<Quadrant>,
}
