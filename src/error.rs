//! Error types for the scheduler core and its store.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input rejected before anything was stored.
    #[error("{0}")]
    Validation(String),

    /// A schedule entry or track that does not exist.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u32 },

    /// State that valid input can never produce.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot read tags from '{path}': {message}")]
    Metadata { path: String, message: String },
}

impl Error {
    /// Collaborator failures: surfaced to the user, core state untouched, no retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Serialize(_) | Error::Metadata { .. }
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
