//! Error types for permres

use thiserror::Error;

/// The main error type for permission resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermError {
    /// Caller supplied a missing or malformed subject, operation name or id.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Resource type has no registered key extractor.
    #[error("no key extractor registered for entity type {0}")]
    UnsupportedEntityType(&'static str),

    /// A store, closure resolver or membership lookup failed.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl PermError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        PermError::InvalidArgument(msg.into())
    }
}

/// Result type alias for permres operations
pub type Result<T> = std::result::Result<T, PermError>;

/// Convert a backend error into a collaborator failure
pub fn err<E: std::error::Error>(e: E) -> PermError {
    PermError::CollaboratorUnavailable(e.to_string())
}
