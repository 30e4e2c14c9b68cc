//! The enrollment session.
//!
//! An [`EnrollmentSession`] drives one enrollment attempt. It is mutated by
//! two actors: the owner thread (`start`, `stop`) and the driver's callback
//! thread (`on_enroll_result`, `on_acquired`, `on_error`). Every mutation
//! follows the same shape:
//!
//! 1. Take the session lock, read the state, decide the transition and the
//!    list of gateway calls it requires ([`Effects`]).
//! 2. Release the lock.
//! 3. Issue the gateway calls in a fixed order.
//!
//! Because the decision is made under the lock, and a terminal transition
//! can only happen once, at most one path ever issues the hide, the cancel,
//! the persistence write or the owner notification.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use fpenroll_core::constants::{
    DEFAULT_ENROLL_TIMEOUT_SECS, DEFAULT_HISTORY_CAPACITY, DRIVER_RESULT_OK,
};
use fpenroll_core::{
    AcquiredInfo, DeviceId, EnrollmentToken, ErrorCode, FingerprintId, GroupId, ProgressEvent,
    SessionId, SessionIdentity,
};
use fpenroll_hardware::{
    DaemonGateway, GatewayError, PeerLiveness, ResultSink, TemplateStore,
};
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::indicator::IndicatorController;
use crate::state::{SessionState, StateMachine, StateTransition};

/// Returned by [`EnrollmentSession::start`] when the session was not in
/// `Created`. No side effects are performed.
pub const START_INVALID_STATE: i32 = -1;

/// Per-session settings fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Timeout handed to the driver with the enroll request.
    pub enroll_timeout_secs: u32,

    /// Drive the on-screen indicator for this session.
    pub has_under_display_sensor: bool,

    /// Number of state transitions kept for diagnostics.
    pub history_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enroll_timeout_secs: DEFAULT_ENROLL_TIMEOUT_SECS,
            has_under_display_sensor: false,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Process-wide collaborators a session dispatches to.
#[derive(Clone)]
pub struct SessionGateways {
    pub daemon: Arc<dyn DaemonGateway>,
    pub indicator: Arc<IndicatorController>,
    pub store: Arc<dyn TemplateStore>,
}

/// Final report a session sends to its owner, exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: SessionId,

    /// `Completed`, `Cancelled` or `Failed`.
    pub state: SessionState,

    /// Error delivered to the client, if any.
    pub error: Option<ErrorCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HideMode {
    Immediate,
    Debounced,
}

/// Gateway calls decided under the lock, issued after it is released.
#[derive(Debug, Default)]
struct Effects {
    hide: Option<HideMode>,
    cancel: bool,
    persist: Option<FingerprintId>,
    progress: Option<ProgressEvent>,
    acquired: Option<(AcquiredInfo, i32)>,
    error: Option<(ErrorCode, i32)>,
    outcome: Option<SessionOutcome>,
}

#[derive(Debug, Clone, Copy)]
struct DeferredStop {
    hide: bool,
}

#[derive(Debug)]
struct SessionInner {
    machine: StateMachine,
    /// The indicator was shown for this session and no hide has been issued.
    indicator_claimed: bool,
    /// `start()` is between entering `Enrolling` and the driver's answer.
    enroll_in_flight: bool,
    /// A stop landed while the enroll request was in flight; `start()` owes
    /// the driver a cancel and the indicator a hide.
    deferred_stop: Option<DeferredStop>,
    /// Error reported on the terminal transition, if any.
    error: Option<ErrorCode>,
}

/// One enrollment attempt.
///
/// Created by the owner through [`EnrollmentSession::builder`] and shared as
/// `Arc<EnrollmentSession>` between the owner and the callback router.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use fpenroll_core::{EnrollmentToken, GroupId, SessionIdentity, UserId};
/// use fpenroll_hardware::mock::*;
/// use fpenroll_hardware::ResultSink;
/// use fpenroll_session::{EnrollmentSession, IndicatorController, SessionGateways, SessionState};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let log = CallLog::new();
/// let (daemon, _driver) = MockDaemon::new(log.clone());
/// let gateways = SessionGateways {
///     daemon,
///     indicator: Arc::new(IndicatorController::new(
///         Arc::new(MockIndicator::new(log.clone())),
///         Duration::from_millis(500),
///         tokio::runtime::Handle::current(),
///     )),
///     store: Arc::new(MemoryTemplateStore::new(log.clone())),
/// };
/// let sink: Arc<dyn ResultSink> = Arc::new(RecordingSink::new(log.clone()));
///
/// let identity = SessionIdentity::new(UserId::new(0), GroupId::new(0), "settings").unwrap();
/// let token = EnrollmentToken::new(&[1, 2, 3]).unwrap();
/// let session = EnrollmentSession::builder(identity, token, &sink).build(gateways);
///
/// assert_eq!(session.start(), 0);
/// assert_eq!(session.state(), SessionState::Enrolling);
/// # }
/// ```
pub struct EnrollmentSession {
    id: SessionId,
    identity: SessionIdentity,
    token: EnrollmentToken,
    config: SessionConfig,
    device_id: DeviceId,
    gateways: SessionGateways,
    sink: Weak<dyn ResultSink>,
    outcome_tx: Option<mpsc::UnboundedSender<SessionOutcome>>,
    terminal: CancellationToken,
    inner: Mutex<SessionInner>,
}

impl EnrollmentSession {
    /// Start building a session for `identity`.
    ///
    /// The sink is held weakly: if the client drops it, notifications are
    /// skipped but the session still completes.
    pub fn builder(
        identity: SessionIdentity,
        token: EnrollmentToken,
        sink: &Arc<dyn ResultSink>,
    ) -> EnrollmentSessionBuilder {
        EnrollmentSessionBuilder {
            id: SessionId::new(),
            identity,
            token,
            sink: Arc::downgrade(sink),
            config: SessionConfig::default(),
            outcome_tx: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.lock_inner().machine.current_state()
    }

    pub fn is_terminal(&self) -> bool {
        self.lock_inner().machine.is_terminal()
    }

    /// Snapshot of the recorded transitions, oldest first.
    pub fn history(&self) -> Vec<StateTransition> {
        self.lock_inner().machine.history().iter().cloned().collect()
    }

    /// Resolves once the session has reached a terminal state.
    pub async fn wait_terminal(&self) {
        self.terminal.cancelled().await;
    }

    /// Show the indicator (if applicable) and arm the driver.
    ///
    /// Returns `0` when the driver accepted the request. Any other value
    /// means the session is already terminal and will deliver nothing more:
    /// the driver's own rejection code, [`ErrorCode::HwUnavailable`] for a
    /// dispatch failure, or the stop's error code ([`ErrorCode::Canceled`]
    /// when it carried none) if a `stop()` won the race. A stop that lands
    /// while the enroll request is in flight is finished here: once the
    /// driver answers, the indicator is hidden and, if the driver had
    /// accepted, it is cancelled. [`START_INVALID_STATE`] is returned when
    /// called twice.
    pub fn start(&self) -> i32 {
        {
            let mut inner = self.lock_inner();
            if let Err(e) = inner.machine.transition_to(SessionState::Started) {
                warn!(session = %self.id, error = %e, "start() ignored");
                return START_INVALID_STATE;
            }
        }

        if self.config.has_under_display_sensor {
            self.gateways.indicator.show_if(|| self.claim_indicator());
        }

        {
            let mut inner = self.lock_inner();
            if inner.machine.is_terminal() {
                debug!(session = %self.id, "session ended before the driver was armed");
                return Self::stopped_code(&inner);
            }
            if let Err(e) = inner.machine.transition_to(SessionState::Enrolling) {
                warn!(session = %self.id, error = %e, "unexpected state while arming");
                return START_INVALID_STATE;
            }
            inner.enroll_in_flight = true;
        }

        let dispatch = self.gateways.daemon.enroll(
            &self.token,
            self.identity.group_id,
            self.config.enroll_timeout_secs,
        );

        let (deferred, stopped_code) = {
            let mut inner = self.lock_inner();
            inner.enroll_in_flight = false;
            (inner.deferred_stop.take(), Self::stopped_code(&inner))
        };

        if let Some(deferred) = deferred {
            debug!(session = %self.id, "session stopped while the enroll request was in flight");
            if deferred.hide {
                self.gateways.indicator.hide_now();
            }
            return match dispatch {
                Ok(DRIVER_RESULT_OK) => {
                    self.cancel_driver();
                    stopped_code
                }
                Ok(code) => {
                    debug!(session = %self.id, code, "driver rejected enroll request");
                    code
                }
                Err(e) => {
                    debug!(session = %self.id, error = %e, "enroll dispatch failed");
                    ErrorCode::HwUnavailable.as_i32()
                }
            };
        }

        match dispatch {
            Ok(DRIVER_RESULT_OK) => {
                info!(
                    session = %self.id,
                    user = %self.identity.user_id,
                    group = %self.identity.group_id,
                    "enrollment armed"
                );
                DRIVER_RESULT_OK
            }
            Ok(code) => {
                warn!(session = %self.id, code, "driver rejected enroll request");
                self.fail(ErrorCode::HwUnavailable, 0);
                code
            }
            Err(e) => {
                error!(session = %self.id, error = %e, "enroll dispatch failed");
                self.fail(ErrorCode::HwUnavailable, 0);
                ErrorCode::HwUnavailable.as_i32()
            }
        }
    }

    /// Cancel the session.
    ///
    /// Idempotent and safe from any thread. Hides the indicator first, then
    /// asks the driver to cancel without waiting for its acknowledgement.
    /// [`ErrorCode::Canceled`] is reported to the client only when
    /// `initiated_by_client` is set.
    ///
    /// Returns `true` if this call performed the cancellation, `false` if
    /// the session was already terminal.
    pub fn stop(&self, initiated_by_client: bool) -> bool {
        self.cancel_with(initiated_by_client.then_some(ErrorCode::Canceled))
    }

    /// Cancel the session on the owner's behalf, reporting `code` to the
    /// client and recording it in the [`SessionOutcome`].
    ///
    /// Used for owner-side aborts such as the session timeout. Otherwise
    /// behaves like [`stop`](Self::stop).
    pub fn stop_with_error(&self, code: ErrorCode) -> bool {
        self.cancel_with(Some(code))
    }

    fn cancel_with(&self, error: Option<ErrorCode>) -> bool {
        let effects = {
            let mut inner = self.lock_inner();
            if inner.machine.is_terminal() {
                debug!(
                    session = %self.id,
                    state = %inner.machine.current_state(),
                    "stop() on terminal session ignored"
                );
                return false;
            }

            let enrolling = inner.machine.current_state() == SessionState::Enrolling;
            let in_flight = inner.enroll_in_flight;
            let mut effects = Effects {
                cancel: enrolling && !in_flight,
                ..Effects::default()
            };
            self.finish(
                &mut inner,
                SessionState::Cancelled,
                HideMode::Immediate,
                error.map(|code| (code, 0)),
                &mut effects,
            );
            if in_flight {
                // The driver has not answered yet. start() issues the hide
                // and then, if the driver accepted, the cancel.
                inner.deferred_stop = Some(DeferredStop {
                    hide: effects.hide.take().is_some(),
                });
            }
            effects
        };

        info!(session = %self.id, error = ?error, "enrollment cancelled");
        self.apply(effects);
        true
    }

    /// Driver callback: one enrollment step finished.
    ///
    /// Returns `true` if the session is terminal after this call. The value
    /// is computed under the same lock as the transition, so the owner may
    /// release its single-flight slot on it.
    pub fn on_enroll_result(
        &self,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> bool {
        let (effects, terminal) = {
            let mut inner = self.lock_inner();
            match inner.machine.current_state() {
                SessionState::Enrolling => {}
                state if state.is_terminal() => {
                    warn!(
                        session = %self.id,
                        %state,
                        remaining,
                        "enroll result for terminal session discarded"
                    );
                    return true;
                }
                state => {
                    warn!(session = %self.id, %state, "enroll result before driver was armed");
                    return false;
                }
            }

            let event = ProgressEvent::new(fingerprint_id, group_id, remaining);
            let mut effects = Effects::default();
            if event.is_final() {
                effects.persist = Some(fingerprint_id);
                self.finish(
                    &mut inner,
                    SessionState::Completed,
                    HideMode::Debounced,
                    None,
                    &mut effects,
                );
            }
            effects.progress = Some(event);

            (effects, inner.machine.is_terminal())
        };

        if terminal {
            info!(session = %self.id, fingerprint = %fingerprint_id, "enrollment completed");
        } else {
            debug!(session = %self.id, remaining, "enrollment progress");
        }
        self.apply(effects);
        terminal
    }

    /// Driver callback: capture-quality hint. Never changes state.
    pub fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32) -> bool {
        {
            let inner = self.lock_inner();
            match inner.machine.current_state() {
                SessionState::Enrolling => {}
                state if state.is_terminal() => {
                    debug!(session = %self.id, ?info, "acquired info for terminal session discarded");
                    return true;
                }
                _ => return false,
            }
        }

        self.apply(Effects {
            acquired: Some((info, vendor_code)),
            ..Effects::default()
        });
        false
    }

    /// Driver callback: the driver aborted the operation.
    pub fn on_error(&self, code: ErrorCode, vendor_code: i32) -> bool {
        warn!(session = %self.id, %code, vendor_code, "driver reported error");
        self.fail(code, vendor_code);
        true
    }

    /// Stop the session as a non-client cancel when `liveness` reports death.
    ///
    /// The watcher exits on its own once the session is terminal.
    pub fn bind_liveness(self: &Arc<Self>, liveness: PeerLiveness, runtime: &Handle) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        let terminal = self.terminal.clone();

        runtime.spawn(async move {
            tokio::select! {
                () = liveness.died() => {
                    if let Some(session) = session.upgrade() {
                        info!(session = %session.id, "peer died; stopping session");
                        session.stop(false);
                    }
                }
                () = terminal.cancelled() => {}
            }
        })
    }

    /// Take the indicator for this session unless it already ended.
    ///
    /// Runs under the indicator controller's lock, so the claim and the
    /// show are one step with respect to a concurrent stop.
    fn claim_indicator(&self) -> bool {
        let mut inner = self.lock_inner();
        if inner.machine.is_terminal() {
            return false;
        }
        inner.indicator_claimed = true;
        true
    }

    fn stopped_code(inner: &SessionInner) -> i32 {
        inner.error.unwrap_or(ErrorCode::Canceled).as_i32()
    }

    fn cancel_driver(&self) {
        match self.gateways.daemon.cancel() {
            Ok(DRIVER_RESULT_OK) => debug!(session = %self.id, "cancel accepted by driver"),
            Ok(code) => warn!(session = %self.id, code, "driver rejected cancel"),
            Err(e) => warn!(session = %self.id, error = %e, "cancel dispatch failed"),
        }
    }

    /// Move any non-terminal state to `Failed`, reporting `code` to the client.
    fn fail(&self, code: ErrorCode, vendor_code: i32) {
        let effects = {
            let mut inner = self.lock_inner();
            if inner.machine.is_terminal() {
                debug!(session = %self.id, %code, "failure after terminal state ignored");
                return;
            }
            let mut effects = Effects::default();
            self.finish(
                &mut inner,
                SessionState::Failed,
                HideMode::Immediate,
                Some((code, vendor_code)),
                &mut effects,
            );
            effects
        };
        self.apply(effects);
    }

    /// Terminal transition. Must be called with the lock held, at most once.
    fn finish(
        &self,
        inner: &mut SessionInner,
        to: SessionState,
        hide: HideMode,
        error: Option<(ErrorCode, i32)>,
        effects: &mut Effects,
    ) {
        if let Err(e) = inner.machine.transition_to(to) {
            error!(session = %self.id, error = %e, "terminal transition rejected");
            return;
        }

        if std::mem::take(&mut inner.indicator_claimed) {
            effects.hide = Some(hide);
        }
        inner.error = error.map(|(code, _)| code);
        effects.error = error;
        effects.outcome = Some(SessionOutcome {
            session_id: self.id,
            state: to,
            error: inner.error,
        });
        self.terminal.cancel();
    }

    /// Issue the gateway calls decided under the lock, in a fixed order.
    fn apply(&self, effects: Effects) {
        if effects.hide == Some(HideMode::Immediate) {
            self.gateways.indicator.hide_now();
        }

        if effects.cancel {
            self.cancel_driver();
        }

        if let Some(fingerprint_id) = effects.persist
            && let Err(e) = self
                .gateways
                .store
                .add_fingerprint_for_user(fingerprint_id, self.identity.user_id)
        {
            error!(
                session = %self.id,
                fingerprint = %fingerprint_id,
                error = %e,
                "failed to record enrolled fingerprint"
            );
        }

        if let Some(event) = effects.progress {
            self.notify("progress", |sink| {
                sink.on_enroll_result(
                    self.device_id,
                    event.fingerprint_id,
                    event.group_id,
                    event.remaining,
                )
            });
        }

        if let Some((info, vendor_code)) = effects.acquired {
            self.notify("acquired", |sink| {
                sink.on_acquired(self.device_id, info, vendor_code)
            });
        }

        if effects.hide == Some(HideMode::Debounced) {
            self.gateways.indicator.schedule_hide();
        }

        if let Some((code, vendor_code)) = effects.error {
            self.notify("error", |sink| sink.on_error(self.device_id, code, vendor_code));
        }

        if let Some(outcome) = effects.outcome
            && let Some(tx) = &self.outcome_tx
            && tx.send(outcome).is_err()
        {
            debug!(session = %self.id, "owner no longer listening for outcomes");
        }
    }

    /// Best-effort delivery to the client.
    fn notify(
        &self,
        what: &'static str,
        deliver: impl FnOnce(&dyn ResultSink) -> Result<(), GatewayError>,
    ) {
        let Some(sink) = self.sink.upgrade() else {
            debug!(session = %self.id, what, "client sink dropped; notification skipped");
            return;
        };

        match deliver(sink.as_ref()) {
            Ok(()) => {}
            Err(e) if e.is_disconnected() => {
                debug!(session = %self.id, what, "client unreachable; notification skipped");
            }
            Err(e) => warn!(session = %self.id, what, error = %e, "client notification failed"),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EnrollmentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrollmentSession")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("token", &self.token)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EnrollmentSession`].
#[derive(Debug)]
pub struct EnrollmentSessionBuilder {
    id: SessionId,
    identity: SessionIdentity,
    token: EnrollmentToken,
    sink: Weak<dyn ResultSink>,
    config: SessionConfig,
    outcome_tx: Option<mpsc::UnboundedSender<SessionOutcome>>,
}

impl EnrollmentSessionBuilder {
    /// Use a specific session id instead of a random one.
    pub fn with_id(mut self, id: SessionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Channel that receives the session's single [`SessionOutcome`].
    pub fn with_outcome_sender(mut self, tx: mpsc::UnboundedSender<SessionOutcome>) -> Self {
        self.outcome_tx = Some(tx);
        self
    }

    pub fn build(self, gateways: SessionGateways) -> Arc<EnrollmentSession> {
        Arc::new(EnrollmentSession {
            id: self.id,
            identity: self.identity,
            token: self.token,
            device_id: gateways.daemon.device_id(),
            inner: Mutex::new(SessionInner {
                machine: StateMachine::new(self.config.history_capacity),
                indicator_claimed: false,
                enroll_in_flight: false,
                deferred_stop: None,
                error: None,
            }),
            config: self.config,
            gateways,
            sink: self.sink,
            outcome_tx: self.outcome_tx,
            terminal: CancellationToken::new(),
        })
    }
}
