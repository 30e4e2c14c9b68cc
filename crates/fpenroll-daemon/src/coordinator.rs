//! Enrollment coordinator.
//!
//! The coordinator is the owner of every [`EnrollmentSession`]. It admits at
//! most one session at a time, arms the session timeout and the client
//! liveness watcher, routes driver callbacks to the active session and
//! releases the slot once the session reports its outcome.
//!
//! # Architecture
//!
//! ```text
//!  client ──enroll/cancel──► ┌───────────────────┐ ──enroll/cancel──► driver
//!                            │ Coordinator       │
//!  driver ──callbacks──────► │  active slot      │ ◄─outcome (mpsc)── session
//!                            └───────────────────┘
//!                                     │ outcome loop
//!                                     ▼
//!                            CoordinatorHandle::recv()
//! ```
//!
//! Background work per session (timeout timer, liveness watcher) is
//! spawned on the context's runtime and aborted when the slot is released.

use crate::config::CoordinatorConfig;
use crate::context::GatewayContext;
use fpenroll_core::constants::DRIVER_RESULT_OK;
use fpenroll_core::{
    AcquiredInfo, EnrollmentToken, Error, ErrorCode, FingerprintId, GroupId, Result, SessionId,
    SessionIdentity,
};
use fpenroll_hardware::{DaemonCallback, PeerLiveness, ResultSink, SessionHandle};
use fpenroll_session::{EnrollmentSession, SessionConfig, SessionOutcome};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// A client's request to enroll a new fingerprint.
#[derive(Clone)]
pub struct EnrollRequest {
    pub identity: SessionIdentity,

    /// Authorization token bytes; copied into the session.
    pub token: Vec<u8>,

    /// Liveness of the requesting client.
    pub liveness: PeerLiveness,
}

impl EnrollRequest {
    pub fn new(identity: SessionIdentity, token: impl Into<Vec<u8>>) -> Self {
        Self {
            identity,
            token: token.into(),
            liveness: PeerLiveness::new(),
        }
    }

    /// Tie the session to an existing liveness signal.
    pub fn with_liveness(mut self, liveness: PeerLiveness) -> Self {
        self.liveness = liveness;
        self
    }
}

impl std::fmt::Debug for EnrollRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollRequest")
            .field("identity", &self.identity)
            .field("token_len", &self.token.len())
            .field("liveness", &self.liveness)
            .finish()
    }
}

/// The session occupying the single-flight slot.
struct ActiveSession {
    session: Arc<EnrollmentSession>,
    timeout_task: JoinHandle<()>,
    liveness_task: JoinHandle<()>,
}

/// Owner of enrollment sessions.
///
/// Create with [`EnrollmentCoordinator::start`]; register it with the
/// driver through [`callback`](Self::callback).
pub struct EnrollmentCoordinator {
    config: CoordinatorConfig,
    context: GatewayContext,
    active: Mutex<Option<ActiveSession>>,
    outcome_tx: mpsc::UnboundedSender<SessionOutcome>,
}

impl EnrollmentCoordinator {
    /// Validate `config`, spawn the outcome loop and return the handle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the configuration is invalid.
    pub fn start(config: CoordinatorConfig, context: GatewayContext) -> Result<CoordinatorHandle> {
        config.validate()?;

        let (outcome_tx, session_outcomes) = mpsc::unbounded_channel();
        let (forward_tx, outcome_rx) = mpsc::unbounded_channel();

        let coordinator = Arc::new(Self {
            config,
            context,
            active: Mutex::new(None),
            outcome_tx,
        });

        let mut tasks = JoinSet::new();
        tasks.spawn_on(
            route_outcomes(Arc::downgrade(&coordinator), session_outcomes, forward_tx),
            coordinator.context.runtime(),
        );

        info!(
            sensor = %coordinator.context.sensor().name,
            device = %coordinator.context.sensor().device_id,
            under_display = coordinator.context.sensor().has_under_display_sensor,
            "enrollment coordinator started"
        );

        Ok(CoordinatorHandle {
            coordinator,
            outcome_rx,
            tasks,
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn context(&self) -> &GatewayContext {
        &self.context
    }

    /// Weak reference for registering with the driver's callback channel.
    pub fn callback(self: &Arc<Self>) -> Weak<dyn DaemonCallback> {
        let callback: Arc<dyn DaemonCallback> = self.clone();
        Arc::downgrade(&callback)
    }

    /// Session currently occupying the slot, if any.
    pub fn active_session(&self) -> Option<Arc<EnrollmentSession>> {
        self.lock_active()
            .as_ref()
            .map(|active| Arc::clone(&active.session))
    }

    /// Returns `true` while a non-terminal session occupies the slot.
    pub fn is_busy(&self) -> bool {
        self.lock_active()
            .as_ref()
            .is_some_and(|active| !active.session.is_terminal())
    }

    /// Admit and start a new enrollment session.
    ///
    /// The returned handle is the client's capability to cancel; revoking
    /// it stops the session as if the client had died.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidToken` if the token is empty
    /// - `Error::Busy` if another session is still running
    /// - `Error::HardwareUnavailable` if the driver did not accept the request
    pub fn enroll(
        self: &Arc<Self>,
        request: EnrollRequest,
        sink: &Arc<dyn ResultSink>,
    ) -> Result<SessionHandle> {
        let token = EnrollmentToken::new(&request.token)?;

        let (session, handle) = {
            let mut active = self.lock_active();
            if let Some(current) = active.as_ref() {
                if !current.session.is_terminal() {
                    warn!(active = %current.session.id(), "enroll rejected; sensor busy");
                    return Err(Error::Busy {
                        active: current.session.id().to_string(),
                    });
                }
                debug!(session = %current.session.id(), "replacing finished session");
                current.abort_tasks();
            }

            let session = EnrollmentSession::builder(request.identity, token, sink)
                .with_config(self.session_config())
                .with_outcome_sender(self.outcome_tx.clone())
                .build(self.context.gateways().clone());
            let handle = SessionHandle::new(session.id(), request.liveness.clone());

            *active = Some(ActiveSession {
                session: Arc::clone(&session),
                timeout_task: self.spawn_timeout(&session),
                liveness_task: session.bind_liveness(request.liveness, self.context.runtime()),
            });
            (session, handle)
        };

        info!(
            session = %session.id(),
            user = %session.identity().user_id,
            owner = %session.identity().owner,
            "enrollment admitted"
        );

        let code = session.start();
        if code != DRIVER_RESULT_OK {
            self.release(session.id());
            return Err(Error::HardwareUnavailable { code });
        }

        Ok(handle)
    }

    /// Client-initiated cancel.
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if `handle` does not refer to the
    /// active session.
    pub fn cancel(&self, handle: &SessionHandle) -> Result<()> {
        let session = self
            .active_session()
            .filter(|session| session.id() == handle.session_id())
            .ok_or_else(|| Error::SessionNotFound(handle.session_id().to_string()))?;

        session.stop(true);
        self.release(session.id());
        Ok(())
    }

    /// The driver process died.
    ///
    /// Stops the active session and reports the hardware as unavailable,
    /// both to the client and in the session's outcome.
    pub fn on_daemon_died(&self) {
        let Some(session) = self.active_session() else {
            debug!("driver died with no active session");
            return;
        };

        warn!(session = %session.id(), "driver died during enrollment");
        session.stop_with_error(ErrorCode::HwUnavailable);
        self.release(session.id());
    }

    /// Stop whatever is active and abort its background tasks.
    fn stop_active(&self) -> Option<ActiveSession> {
        let active = self.lock_active().take()?;
        active.session.stop(false);
        Some(active)
    }

    /// Free the slot if it still holds `session_id`. Idempotent.
    fn release(&self, session_id: SessionId) -> bool {
        let released = {
            let mut active = self.lock_active();
            if active
                .as_ref()
                .is_some_and(|current| current.session.id() == session_id)
            {
                active.take()
            } else {
                None
            }
        };

        match released {
            Some(active) => {
                active.abort_tasks();
                debug!(session = %session_id, "slot released");
                true
            }
            None => false,
        }
    }

    fn session_config(&self) -> SessionConfig {
        SessionConfig {
            enroll_timeout_secs: self.config.enroll_timeout_secs,
            has_under_display_sensor: self.context.sensor().has_under_display_sensor,
            history_capacity: self.config.history_capacity,
        }
    }

    fn spawn_timeout(&self, session: &Arc<EnrollmentSession>) -> JoinHandle<()> {
        let session = Arc::clone(session);
        let timeout = self.config.session_timeout();

        self.context.runtime().spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(timeout) => {
                    if session.stop_with_error(ErrorCode::Timeout) {
                        warn!(
                            session = %session.id(),
                            timeout_ms = timeout.as_millis() as u64,
                            "enrollment timed out"
                        );
                    }
                }
                () = session.wait_terminal() => {}
            }
        })
    }

    /// Route a driver callback to the active session.
    ///
    /// Releases the slot when the session reports itself terminal. With no
    /// active session the callback is dropped and reported as terminal.
    fn route(&self, what: &'static str, deliver: impl FnOnce(&EnrollmentSession) -> bool) -> bool {
        let Some(session) = self.active_session() else {
            debug!(what, "driver callback with no active session dropped");
            return true;
        };

        let terminal = deliver(&session);
        if terminal {
            self.release(session.id());
        }
        terminal
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DaemonCallback for EnrollmentCoordinator {
    fn on_enroll_result(
        &self,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> bool {
        self.route("enroll_result", |session| {
            session.on_enroll_result(fingerprint_id, group_id, remaining)
        })
    }

    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32) -> bool {
        self.route("acquired", |session| session.on_acquired(info, vendor_code))
    }

    fn on_error(&self, code: ErrorCode, vendor_code: i32) -> bool {
        self.route("error", |session| session.on_error(code, vendor_code))
    }
}

impl std::fmt::Debug for EnrollmentCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentCoordinator")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("active", &self.active_session().map(|s| s.id()))
            .finish_non_exhaustive()
    }
}

impl ActiveSession {
    fn abort_tasks(&self) {
        self.timeout_task.abort();
        self.liveness_task.abort();
    }
}

/// Release the slot for every finished session and forward its outcome.
async fn route_outcomes(
    coordinator: Weak<EnrollmentCoordinator>,
    mut session_outcomes: mpsc::UnboundedReceiver<SessionOutcome>,
    forward: mpsc::UnboundedSender<SessionOutcome>,
) -> Result<()> {
    while let Some(outcome) = session_outcomes.recv().await {
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        coordinator.release(outcome.session_id);

        info!(
            session = %outcome.session_id,
            state = %outcome.state,
            error = ?outcome.error,
            "enrollment finished"
        );
        if forward.send(outcome).is_err() {
            debug!("outcome receiver dropped");
        }
    }
    Ok(())
}

/// Handle for the running coordinator.
///
/// Receives every [`SessionOutcome`] and shuts the coordinator down.
pub struct CoordinatorHandle {
    coordinator: Arc<EnrollmentCoordinator>,
    outcome_rx: mpsc::UnboundedReceiver<SessionOutcome>,
    tasks: JoinSet<Result<()>>,
}

impl CoordinatorHandle {
    pub fn coordinator(&self) -> &Arc<EnrollmentCoordinator> {
        &self.coordinator
    }

    /// Receive the next session outcome.
    ///
    /// Returns `None` once the outcome loop has stopped.
    pub async fn recv(&mut self) -> Option<SessionOutcome> {
        self.outcome_rx.recv().await
    }

    /// Outcome already delivered, without waiting.
    pub fn try_recv(&mut self) -> Option<SessionOutcome> {
        self.outcome_rx.try_recv().ok()
    }

    /// Stop the active session and join every background task.
    ///
    /// Task failures are counted and logged but never fail the shutdown.
    pub async fn shutdown(mut self) -> Result<ShutdownReport> {
        let mut report = ShutdownReport::default();

        if let Some(active) = self.coordinator.stop_active() {
            info!(session = %active.session.id(), "active session stopped for shutdown");
            active.abort_tasks();
            report.record(classify_task_result(active.timeout_task.await.map(Ok)));
            report.record(classify_task_result(active.liveness_task.await.map(Ok)));
        }

        self.tasks.abort_all();
        while let Some(result) = self.tasks.join_next().await {
            report.record(classify_task_result(result));
        }

        if report.failed + report.panicked > 0 {
            warn!(
                failed = report.failed,
                panicked = report.panicked,
                "coordinator tasks ended abnormally"
            );
        }
        info!(
            succeeded = report.succeeded,
            cancelled = report.cancelled,
            "enrollment coordinator stopped"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for CoordinatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoordinatorHandle")
            .field("coordinator", &self.coordinator)
            .field("tasks", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

/// Task counts observed during [`CoordinatorHandle::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub panicked: usize,
}

impl ShutdownReport {
    fn record(&mut self, termination: TaskTermination) {
        match termination {
            TaskTermination::Success => self.succeeded += 1,
            TaskTermination::Error => self.failed += 1,
            TaskTermination::Cancelled => self.cancelled += 1,
            TaskTermination::Panic => self.panicked += 1,
        }
    }
}

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    /// Task completed successfully.
    Success,
    /// Task returned an error.
    Error,
    /// Task was cancelled (expected during shutdown).
    Cancelled,
    /// Task panicked.
    Panic,
}

fn classify_task_result(result: std::result::Result<Result<()>, JoinError>) -> TaskTermination {
    match result {
        Ok(Ok(())) => TaskTermination::Success,
        Ok(Err(_)) => TaskTermination::Error,
        Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
        Err(_) => TaskTermination::Panic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_task_result() {
        assert_eq!(classify_task_result(Ok(Ok(()))), TaskTermination::Success);
        assert_eq!(
            classify_task_result(Ok(Err(Error::Config("x".to_string())))),
            TaskTermination::Error
        );
    }

    #[tokio::test]
    async fn test_classify_cancelled_and_panicked_tasks() {
        let pending = tokio::spawn(std::future::pending::<Result<()>>());
        pending.abort();
        assert_eq!(
            classify_task_result(pending.await),
            TaskTermination::Cancelled
        );

        let panicked = tokio::spawn(async {
            let fail = true;
            assert!(!fail, "boom");
            Ok::<(), Error>(())
        });
        assert_eq!(classify_task_result(panicked.await), TaskTermination::Panic);
    }

    #[test]
    fn test_shutdown_report_counts() {
        let mut report = ShutdownReport::default();
        report.record(TaskTermination::Success);
        report.record(TaskTermination::Cancelled);
        report.record(TaskTermination::Cancelled);
        report.record(TaskTermination::Panic);

        assert_eq!(
            report,
            ShutdownReport {
                succeeded: 1,
                failed: 0,
                cancelled: 2,
                panicked: 1,
            }
        );
    }

    #[test]
    fn test_enroll_request_debug_hides_token() {
        let identity = SessionIdentity::new(
            fpenroll_core::UserId::new(1),
            GroupId::new(0),
            "settings",
        )
        .unwrap();
        let request = EnrollRequest::new(identity, vec![0xde, 0xad, 0xbe, 0xef]);
        let debug = format!("{:?}", request);

        assert!(debug.contains("token_len: 4"));
        assert!(!debug.contains("222"));
    }

    #[test]
    fn test_enroll_request_defaults_to_live_client() {
        let identity = SessionIdentity::new(
            fpenroll_core::UserId::new(1),
            GroupId::new(0),
            "settings",
        )
        .unwrap();
        let request = EnrollRequest::new(identity, vec![1, 2, 3]);
        assert!(request.liveness.is_alive());
        assert_eq!(request.token.len(), 3);
    }
}
