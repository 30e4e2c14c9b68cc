//! Peer liveness and revocable session handles.
//!
//! A [`PeerLiveness`] is a cancellation token tied to the lifetime of a
//! remote process. When the process dies (or the client simply walks away)
//! the token is cancelled, and anyone subscribed through
//! [`PeerLiveness::died`] is woken. The owner treats that exactly like a
//! non-client `stop()` on the session.

use fpenroll_core::SessionId;
use tokio_util::sync::CancellationToken;

/// Liveness signal for one remote peer.
///
/// Clones share the same underlying token.
#[derive(Debug, Clone, Default)]
pub struct PeerLiveness {
    token: CancellationToken,
}

impl PeerLiveness {
    /// Create a liveness signal for a peer that is currently alive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the peer has died. Idempotent.
    pub fn mark_dead(&self) {
        self.token.cancel();
    }

    /// Returns `true` until [`mark_dead`](Self::mark_dead) is called.
    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Resolves once the peer has died.
    pub async fn died(&self) {
        self.token.cancelled().await;
    }
}

/// Opaque, revocable capability for one client's claim on the sensor.
///
/// Becomes invalid when the owning client's liveness signal fires.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    liveness: PeerLiveness,
}

impl SessionHandle {
    pub fn new(session_id: SessionId, liveness: PeerLiveness) -> Self {
        Self {
            session_id,
            liveness,
        }
    }

    /// Session this handle refers to.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Returns `true` while the owning client is alive.
    pub fn is_valid(&self) -> bool {
        self.liveness.is_alive()
    }

    /// Revoke the handle, as if the owning client had died.
    pub fn revoke(&self) {
        self.liveness.mark_dead();
    }

    /// Liveness signal of the owning client.
    pub fn liveness(&self) -> &PeerLiveness {
        &self.liveness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_liveness_starts_alive() {
        let liveness = PeerLiveness::new();
        assert!(liveness.is_alive());
        liveness.mark_dead();
        assert!(!liveness.is_alive());
        liveness.mark_dead();
        assert!(!liveness.is_alive());
    }

    #[test]
    fn test_clones_share_state() {
        let liveness = PeerLiveness::new();
        let observer = liveness.clone();
        liveness.mark_dead();
        assert!(!observer.is_alive());
    }

    #[tokio::test]
    async fn test_died_resolves_after_mark_dead() {
        let liveness = PeerLiveness::new();
        let observer = liveness.clone();

        let waiter = tokio::spawn(async move {
            observer.died().await;
        });

        liveness.mark_dead();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_handle_revoke() {
        let handle = SessionHandle::new(SessionId::new(), PeerLiveness::new());
        assert!(handle.is_valid());
        handle.revoke();
        assert!(!handle.is_valid());
        assert!(!handle.liveness().is_alive());
    }
}
