//! Core library for the `quadrant` task matrix.
//!
//! Tasks live in a remote document feed, scoped to the signed-in user. A
//! [`store::TaskStore`] keeps a synchronized cache of that user's tasks,
//! forwards validated mutations to the feed, derives the filtered quadrant,
//! all-tasks and calendar views, and turns drag gestures into moves.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod drag;
pub mod error;
pub mod filter;
pub mod logging;
pub mod ports;
pub mod store;
pub mod task;

use clap::Parser;
use clap::error::ErrorKind;

/// Run the CLI with the provided arguments.
///
/// Configuration comes from the environment (and `.env`); see
/// [`config::AppConfig`].
///
/// # Errors
///
/// Returns an error string when argument parsing, configuration or command
/// execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            return err.print().map_err(|e| e.to_string());
        }
        Err(err) => return Err(err.to_string()),
    };
    let config = config::AppConfig::from_env().map_err(|err| err.to_string())?;
    // A subscriber may already be installed by an embedding program.
    logging::init(config.log_filter.as_deref(), config.log_format).ok();
    commands::dispatch(&cli.command, &config)
}
