//! Errors raised while building or compiling SQL.

use thiserror::Error;

use crate::dialect::Dialect;

/// Errors that can occur while compiling queries or schema definitions.
///
/// Every variant except [`BuildError::Compilation`] describes invalid input
/// and is reported before anything is sent to a database.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// `IN` / `NOT IN` was given an empty value set.
    #[error("IN list for column '{0}' is empty")]
    EmptyInList(String),

    /// An identifier does not match `[A-Za-z_][A-Za-z0-9_$]*` segments.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// A builder argument is out of range or inconsistent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The dialect cannot express the requested feature.
    #[error("{feature} is not supported by {dialect}")]
    Unsupported {
        dialect: Dialect,
        feature: &'static str,
    },

    /// A driver name that maps to no known dialect.
    #[error("unknown database driver: {0}")]
    UnknownDialect(String),

    /// Internal inconsistency while assembling SQL.
    #[error("compilation error: {0}")]
    Compilation(String),
}

impl BuildError {
    /// Creates an invalid argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns `true` for errors caused by invalid caller input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Compilation(_))
    }
}

/// Result type for SQL generation.
pub type Result<T> = std::result::Result<T, BuildError>;
