//! Error types for optimist

use thiserror::Error;

/// Core optimist errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OptimistError {
    // Store errors
    #[error("Uninitialized state: no authoritative snapshot has been set")]
    Uninitialized,

    // Collaborator errors
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Authoritative source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Session closed")]
    SessionClosed,
}

/// Result type for optimist operations
pub type OptimistResult<T> = Result<T, OptimistError>;
