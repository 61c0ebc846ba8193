//! Cassette format for recording and replaying feed traffic.
//!
//! A cassette is a YAML file holding every call made against the task feed
//! port during one session, plus every push the feed delivered. Replaying a
//! cassette reproduces a session without a network.

pub mod format;
pub mod recorder;
pub mod replayer;

use std::path::PathBuf;

use thiserror::Error;

/// Failure to load or write a cassette file.
#[derive(Debug, Error)]
pub enum CassetteError {
    /// The file could not be read or written.
    #[error("cassette file {path}: {source}")]
    Io {
        /// Cassette path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The file is not a valid cassette.
    #[error("cassette file {path} is malformed: {source}")]
    Parse {
        /// Cassette path.
        path: PathBuf,
        /// Underlying YAML error.
        source: serde_yaml::Error,
    },
}
