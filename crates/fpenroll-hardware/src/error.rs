//! Error types for gateway operations.
//!
//! Every call that crosses a process boundary (driver, indicator, client
//! sink, template store) reports failure through [`GatewayError`]. The
//! session never propagates these: it logs them and folds them into a
//! state transition.

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur while talking to an out-of-process peer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Peer process is gone or its channel was closed.
    #[error("Peer disconnected: {peer}")]
    Disconnected { peer: String },

    /// The request could not be dispatched.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// Generic error with custom message.
    #[error("{0}")]
    Other(String),
}

impl GatewayError {
    /// Create a new disconnected error.
    pub fn disconnected(peer: impl Into<String>) -> Self {
        Self::Disconnected { peer: peer.into() }
    }

    /// Create a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a generic error with custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns `true` if the peer is unreachable rather than misbehaving.
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnected_error() {
        let error = GatewayError::disconnected("fingerprintd");
        assert!(error.is_disconnected());
        assert_eq!(error.to_string(), "Peer disconnected: fingerprintd");
    }

    #[test]
    fn test_transport_error() {
        let error = GatewayError::transport("binder transaction failed");
        assert!(matches!(error, GatewayError::Transport { .. }));
        assert!(!error.is_disconnected());
        assert_eq!(
            error.to_string(),
            "Transport error: binder transaction failed"
        );
    }

    #[test]
    fn test_other_error() {
        let error = GatewayError::other("template store is read-only");
        assert!(!error.is_disconnected());
        assert_eq!(error.to_string(), "template store is read-only");
    }
}
