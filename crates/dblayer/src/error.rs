//! Error types for the runtime layer.

use dblayer_core::BuildError;

/// Errors returned by terminal operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request was rejected before any SQL was sent.
    #[error("validation error: {0}")]
    Validation(BuildError),

    /// The request could not be compiled for the target dialect.
    #[error("compilation error: {0}")]
    Compilation(BuildError),

    /// Database error from sqlx.
    #[error("database error: {0}")]
    Execution(#[from] sqlx::Error),

    /// Error reported by an executor that is not backed by sqlx.
    #[error("driver error: {0}")]
    Driver(String),

    /// An event hook returned an error.
    #[error("{event} hook failed: {message}")]
    Hook {
        /// The lifecycle event the hook was registered for.
        event: crate::events::EventKind,
        /// The message returned by the hook.
        message: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction already closed")]
    TransactionClosed,

    /// Rows or payloads could not be converted to or from JSON.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<BuildError> for Error {
    fn from(err: BuildError) -> Self {
        if err.is_validation() {
            Self::Validation(err)
        } else {
            Self::Compilation(err)
        }
    }
}

impl Error {
    /// Shorthand for a validation failure with a message.
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(BuildError::InvalidArgument(message.into()))
    }

    /// Returns `true` if the error was raised before reaching the database.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
