use thiserror::Error;

/// Errors surfaced by the enrollment owner to its callers.
///
/// Gateway failures never appear here directly: the session folds them into
/// a state transition and at most one [`ErrorCode`](crate::ErrorCode) is
/// delivered to the client's result sink.
#[derive(Error, Debug)]
pub enum Error {
    // Request validation
    #[error("Invalid enrollment token: {0}")]
    InvalidToken(String),

    #[error("Invalid session identity: {0}")]
    InvalidIdentity(String),

    // Admission
    #[error("Enrollment already in progress for session {active}")]
    Busy { active: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    // Lifecycle
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Hardware unavailable (driver code {code})")]
    HardwareUnavailable { code: i32 },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
