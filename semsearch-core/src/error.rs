//! Error types for semsearch-core

use thiserror::Error;

/// Errors that can occur while loading models, embedding text, or searching
#[derive(Debug, Error)]
pub enum SemsearchError {
    /// Model could not be fetched or initialized
    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Model name is not in the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// Model execution failed for a batch
    #[error("Inference error: {0}")]
    Inference(String),

    /// Vector length disagrees with the established dimensionality
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// Operation aborted through its cancellation token
    #[error("Operation cancelled")]
    Cancelled,

    /// Two items in one index share an id
    #[error("Duplicate item id: {0}")]
    DuplicateId(String),

    /// Caller broke a precondition (empty batch, k == 0, NaN component)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SemsearchError {
    /// Create a model load error
    pub fn model_load(msg: impl Into<String>) -> Self {
        Self::ModelLoad(msg.into())
    }

    /// Create an inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when the operation was cancelled by its token
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result type for semsearch operations
pub type Result<T> = std::result::Result<T, SemsearchError>;

/// What a recovery handler decided to do with an error
#[derive(Debug)]
pub enum Recovery<T> {
    /// Use this value in place of the failed outcome
    Substitute(T),
    /// Give up and surface the error to the caller
    Fatal(SemsearchError),
}

/// "Unwrap or recover" for semsearch outcomes.
///
/// The handler sees the error and either substitutes a value or re-raises it:
///
/// ```
/// use semsearch_core::{Recover, Recovery, SemsearchError};
///
/// let outcome: semsearch_core::Result<usize> = Err(SemsearchError::Cancelled);
/// let n = outcome.unwrap_or_recover(|err| match err {
///     SemsearchError::Cancelled => Recovery::Substitute(0),
///     other => Recovery::Fatal(other),
/// });
/// assert_eq!(n.unwrap(), 0);
/// ```
pub trait Recover<T> {
    fn unwrap_or_recover<F>(self, handler: F) -> Result<T>
    where
        F: FnOnce(SemsearchError) -> Recovery<T>;
}

impl<T> Recover<T> for Result<T> {
    fn unwrap_or_recover<F>(self, handler: F) -> Result<T>
    where
        F: FnOnce(SemsearchError) -> Recovery<T>,
    {
        match self {
            Ok(value) => Ok(value),
            Err(err) => match handler(err) {
                Recovery::Substitute(value) => Ok(value),
                Recovery::Fatal(err) => {
                    log::error!("unrecoverable error: {}", err);
                    Err(err)
                }
            },
        }
    }
}
