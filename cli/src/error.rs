//! Error types for the semsearch CLI.

use std::path::PathBuf;

use semsearch_core::SemsearchError;
use thiserror::Error;

/// Errors that can occur while running the pipeline from the command line.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] SemsearchError),

    #[error("Failed to read corpus {path}: {source}")]
    Corpus {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corpus {0} has no phrases")]
    EmptyCorpus(PathBuf),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
