//! Debounced control of the shared on-screen sensor indicator.
//!
//! One [`IndicatorController`] exists per process and is shared by every
//! session. It serializes all `show()`/`hide()` calls to the gateway and owns
//! the single pending debounced hide:
//!
//! - [`schedule_hide`](IndicatorController::schedule_hide) replaces any
//!   pending hide with a new one that fires after the debounce delay.
//! - [`show_if`](IndicatorController::show_if) cancels the pending hide
//!   before showing, so a session starting right after another one finished
//!   never produces a show → hide → show flicker.
//! - [`hide_now`](IndicatorController::hide_now) cancels the pending hide and
//!   hides immediately.
//!
//! Gateway failures are logged and ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fpenroll_hardware::IndicatorGateway;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

#[derive(Debug, Default)]
struct PendingHide {
    /// Bumped whenever the pending hide is cancelled or replaced.
    generation: u64,
    task: Option<JoinHandle<()>>,
}

impl PendingHide {
    fn cancel(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Process-wide owner of the indicator gateway.
pub struct IndicatorController {
    gateway: Arc<dyn IndicatorGateway>,
    debounce: Duration,
    runtime: Handle,
    pending: Arc<Mutex<PendingHide>>,
}

impl IndicatorController {
    /// Create a controller.
    ///
    /// A zero `debounce` makes [`schedule_hide`](Self::schedule_hide) hide
    /// synchronously. Debounced hides are spawned on `runtime`.
    pub fn new(gateway: Arc<dyn IndicatorGateway>, debounce: Duration, runtime: Handle) -> Self {
        Self {
            gateway,
            debounce,
            runtime,
            pending: Arc::new(Mutex::new(PendingHide::default())),
        }
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Cancel any pending hide, then show if `still_wanted()` holds.
    ///
    /// `still_wanted` is evaluated while the controller lock is held, so a
    /// concurrent hide is ordered strictly before or after this show.
    /// Returns `true` if `show()` was dispatched.
    pub fn show_if(&self, still_wanted: impl FnOnce() -> bool) -> bool {
        let mut pending = lock(&self.pending);
        pending.cancel();

        if !still_wanted() {
            debug!("indicator show skipped; requester no longer active");
            return false;
        }

        if let Err(e) = self.gateway.show() {
            warn!(error = %e, "indicator show failed");
        }
        true
    }

    /// Cancel any pending hide and hide right away.
    pub fn hide_now(&self) {
        let mut pending = lock(&self.pending);
        pending.cancel();
        hide_via(self.gateway.as_ref());
    }

    /// Replace any pending hide with one that fires after the debounce delay.
    pub fn schedule_hide(&self) {
        let mut pending = lock(&self.pending);
        pending.cancel();

        if self.debounce.is_zero() {
            hide_via(self.gateway.as_ref());
            return;
        }

        let generation = pending.generation;
        let state = Arc::clone(&self.pending);
        let gateway = Arc::clone(&self.gateway);
        let delay = self.debounce;

        trace!(delay_ms = delay.as_millis() as u64, "indicator hide scheduled");
        pending.task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let mut pending = lock(&state);
            if pending.generation != generation {
                return;
            }
            pending.task = None;
            hide_via(gateway.as_ref());
        }));
    }

    /// Returns `true` while a debounced hide is waiting to fire.
    pub fn has_pending_hide(&self) -> bool {
        lock(&self.pending)
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl std::fmt::Debug for IndicatorController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorController")
            .field("debounce", &self.debounce)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

fn hide_via(gateway: &dyn IndicatorGateway) {
    if let Err(e) = gateway.hide() {
        warn!(error = %e, "indicator hide failed");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
