//! Shared, ordered record of gateway calls.

use fpenroll_core::{AcquiredInfo, ErrorCode, FingerprintId, GroupId, UserId};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One call observed by a mock gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    /// `DaemonGateway::enroll`.
    Enroll { group_id: GroupId, timeout_secs: u32 },

    /// `DaemonGateway::cancel`.
    Cancel,

    /// `IndicatorGateway::show`.
    Show,

    /// `IndicatorGateway::hide`.
    Hide,

    /// `TemplateStore::add_fingerprint_for_user`.
    Persist {
        fingerprint_id: FingerprintId,
        user_id: UserId,
    },

    /// `ResultSink::on_enroll_result`.
    Progress {
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    },

    /// `ResultSink::on_acquired`.
    Acquired { info: AcquiredInfo },

    /// `ResultSink::on_error`.
    ClientError { code: ErrorCode },
}

/// Thread-safe, append-only call log shared between mocks.
///
/// # Examples
///
/// ```
/// use fpenroll_hardware::mock::{CallLog, GatewayCall};
///
/// let log = CallLog::new();
/// log.record(GatewayCall::Show);
/// log.record(GatewayCall::Hide);
///
/// assert_eq!(log.count(&GatewayCall::Show), 1);
/// assert!(log.position(&GatewayCall::Show) < log.position(&GatewayCall::Hide));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<GatewayCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call.
    pub fn record(&self, call: GatewayCall) {
        lock(&self.calls).push(call);
    }

    /// Copy of every call recorded so far, oldest first.
    pub fn snapshot(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls equal to `call`.
    pub fn count(&self, call: &GatewayCall) -> usize {
        lock(&self.calls).iter().filter(|c| *c == call).count()
    }

    /// Number of recorded calls matching a predicate.
    pub fn count_where(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| predicate(c)).count()
    }

    /// Index of the first call equal to `call`.
    pub fn position(&self, call: &GatewayCall) -> Option<usize> {
        lock(&self.calls).iter().position(|c| c == call)
    }

    /// Index of the first call matching a predicate.
    pub fn position_where(&self, predicate: impl Fn(&GatewayCall) -> bool) -> Option<usize> {
        lock(&self.calls).iter().position(|c| predicate(c))
    }

    pub fn len(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.calls).is_empty()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }
}

/// Lock a mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
