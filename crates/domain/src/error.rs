//! Domain error types

use thiserror::Error;

/// Errors raised by the domain model itself.
///
/// These cover structural problems only; execution-time failures live in
/// the application layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No request with the given name exists in the tree.
    #[error("request not found: {0}")]
    RequestNotFound(String),

    /// No folder with the given name exists in the tree.
    #[error("folder not found: {0}")]
    FolderNotFound(String),

    /// The HTTP method string is not recognised.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// The schema version string is not one we can execute against.
    #[error("unsupported collection schema: {0}")]
    UnsupportedSchema(String),

    /// The auth type string is not recognised.
    #[error("unknown auth type: {0}")]
    UnknownAuthType(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
