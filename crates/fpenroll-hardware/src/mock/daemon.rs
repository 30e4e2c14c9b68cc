//! Mock sensor driver for testing and development.
//!
//! The driver half ([`MockDaemon`]) implements [`DaemonGateway`] and records
//! every request. The control half ([`MockDaemonHandle`]) plays the driver's
//! callback thread: it delivers progress, acquisition and error callbacks to
//! whatever [`DaemonCallback`] is attached, and injects failures.

use super::call_log::{CallLog, GatewayCall, lock};
use crate::{
    Result,
    error::GatewayError,
    traits::{DaemonCallback, DaemonGateway},
};
use fpenroll_core::{
    AcquiredInfo, DeviceId, EnrollmentToken, ErrorCode, FingerprintId, GroupId,
    constants::DRIVER_RESULT_OK,
};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// State shared between the driver and its control handle.
#[derive(Debug)]
struct DaemonState {
    device_id: DeviceId,
    log: CallLog,
    enroll_result: AtomicI32,
    cancel_result: AtomicI32,
    fail_enroll_dispatch: AtomicBool,
    fail_cancel_dispatch: AtomicBool,
    last_token_len: Mutex<Option<usize>>,
    callback: Mutex<Option<Weak<dyn DaemonCallback>>>,
}

/// Mock sensor driver.
///
/// # Examples
///
/// ```
/// use fpenroll_core::{EnrollmentToken, GroupId};
/// use fpenroll_hardware::mock::{CallLog, GatewayCall, MockDaemon};
/// use fpenroll_hardware::traits::DaemonGateway;
///
/// let log = CallLog::new();
/// let (daemon, handle) = MockDaemon::new(log.clone());
///
/// handle.set_enroll_result(7);
/// let token = EnrollmentToken::new(&[1, 2, 3]).unwrap();
/// assert_eq!(daemon.enroll(&token, GroupId::new(0), 60).unwrap(), 7);
/// assert_eq!(log.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockDaemon {
    state: Arc<DaemonState>,
}

impl MockDaemon {
    /// Create a mock driver with device id `1`.
    pub fn new(log: CallLog) -> (Arc<Self>, MockDaemonHandle) {
        Self::with_device_id(DeviceId::new(1), log)
    }

    /// Create a mock driver with a custom device id.
    pub fn with_device_id(device_id: DeviceId, log: CallLog) -> (Arc<Self>, MockDaemonHandle) {
        let state = Arc::new(DaemonState {
            device_id,
            log,
            enroll_result: AtomicI32::new(DRIVER_RESULT_OK),
            cancel_result: AtomicI32::new(DRIVER_RESULT_OK),
            fail_enroll_dispatch: AtomicBool::new(false),
            fail_cancel_dispatch: AtomicBool::new(false),
            last_token_len: Mutex::new(None),
            callback: Mutex::new(None),
        });

        let daemon = Arc::new(Self {
            state: Arc::clone(&state),
        });
        (daemon, MockDaemonHandle { state })
    }
}

impl DaemonGateway for MockDaemon {
    fn device_id(&self) -> DeviceId {
        self.state.device_id
    }

    fn enroll(
        &self,
        token: &EnrollmentToken,
        group_id: GroupId,
        timeout_secs: u32,
    ) -> Result<i32> {
        if self.state.fail_enroll_dispatch.load(Ordering::SeqCst) {
            return Err(GatewayError::transport("enroll dispatch failed"));
        }

        *lock(&self.state.last_token_len) = Some(token.len());
        self.state.log.record(GatewayCall::Enroll {
            group_id,
            timeout_secs,
        });
        Ok(self.state.enroll_result.load(Ordering::SeqCst))
    }

    fn cancel(&self) -> Result<i32> {
        if self.state.fail_cancel_dispatch.load(Ordering::SeqCst) {
            return Err(GatewayError::transport("cancel dispatch failed"));
        }

        self.state.log.record(GatewayCall::Cancel);
        Ok(self.state.cancel_result.load(Ordering::SeqCst))
    }
}

/// Control handle for a [`MockDaemon`].
///
/// Cloneable; every clone drives the same driver.
#[derive(Debug, Clone)]
pub struct MockDaemonHandle {
    state: Arc<DaemonState>,
}

impl MockDaemonHandle {
    /// Attach the receiver of driver callbacks.
    ///
    /// Held weakly, as a real driver only holds a remote reference.
    pub fn attach(&self, callback: Weak<dyn DaemonCallback>) {
        *lock(&self.state.callback) = Some(callback);
    }

    /// Result code returned by subsequent `enroll()` calls.
    pub fn set_enroll_result(&self, code: i32) {
        self.state.enroll_result.store(code, Ordering::SeqCst);
    }

    /// Result code returned by subsequent `cancel()` calls.
    pub fn set_cancel_result(&self, code: i32) {
        self.state.cancel_result.store(code, Ordering::SeqCst);
    }

    /// Make `enroll()` fail at the transport level.
    pub fn fail_enroll_dispatch(&self, fail: bool) {
        self.state.fail_enroll_dispatch.store(fail, Ordering::SeqCst);
    }

    /// Make `cancel()` fail at the transport level.
    pub fn fail_cancel_dispatch(&self, fail: bool) {
        self.state.fail_cancel_dispatch.store(fail, Ordering::SeqCst);
    }

    /// Length of the token passed to the last successful `enroll()`.
    pub fn last_token_len(&self) -> Option<usize> {
        *lock(&self.state.last_token_len)
    }

    /// Deliver `onEnrollResult` to the attached callback.
    ///
    /// Returns the callback's "terminal" answer, or `None` if nothing is
    /// attached any more.
    pub fn emit_progress(
        &self,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> Option<bool> {
        self.callback()
            .map(|cb| cb.on_enroll_result(fingerprint_id, group_id, remaining))
    }

    /// Deliver `onAcquired` to the attached callback.
    pub fn emit_acquired(&self, info: AcquiredInfo, vendor_code: i32) -> Option<bool> {
        self.callback().map(|cb| cb.on_acquired(info, vendor_code))
    }

    /// Deliver `onError` to the attached callback.
    pub fn emit_error(&self, code: ErrorCode, vendor_code: i32) -> Option<bool> {
        self.callback().map(|cb| cb.on_error(code, vendor_code))
    }

    fn callback(&self) -> Option<Arc<dyn DaemonCallback>> {
        lock(&self.state.callback).as_ref().and_then(Weak::upgrade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCallback {
        progress: AtomicUsize,
        acquired: AtomicUsize,
        errors: AtomicUsize,
    }

    impl DaemonCallback for CountingCallback {
        fn on_enroll_result(&self, _: FingerprintId, _: GroupId, remaining: i32) -> bool {
            self.progress.fetch_add(1, Ordering::SeqCst);
            remaining == 0
        }

        fn on_acquired(&self, _: AcquiredInfo, _: i32) -> bool {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            false
        }

        fn on_error(&self, _: ErrorCode, _: i32) -> bool {
            self.errors.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn token() -> EnrollmentToken {
        EnrollmentToken::new(&[0xaa; 69]).unwrap()
    }

    #[test]
    fn test_enroll_records_call() {
        let log = CallLog::new();
        let (daemon, handle) = MockDaemon::new(log.clone());

        let code = daemon.enroll(&token(), GroupId::new(3), 60).unwrap();

        assert_eq!(code, DRIVER_RESULT_OK);
        assert_eq!(handle.last_token_len(), Some(69));
        assert_eq!(
            log.snapshot(),
            vec![GatewayCall::Enroll {
                group_id: GroupId::new(3),
                timeout_secs: 60
            }]
        );
    }

    #[test]
    fn test_enroll_rejection_code() {
        let (daemon, handle) = MockDaemon::new(CallLog::new());
        handle.set_enroll_result(7);
        assert_eq!(daemon.enroll(&token(), GroupId::new(0), 60).unwrap(), 7);
    }

    #[test]
    fn test_dispatch_failures() {
        let log = CallLog::new();
        let (daemon, handle) = MockDaemon::new(log.clone());
        handle.fail_enroll_dispatch(true);
        handle.fail_cancel_dispatch(true);

        assert!(daemon.enroll(&token(), GroupId::new(0), 60).is_err());
        assert!(daemon.cancel().is_err());
        assert!(log.is_empty());
    }

    #[test]
    fn test_cancel_result_code() {
        let log = CallLog::new();
        let (daemon, handle) = MockDaemon::new(log.clone());
        handle.set_cancel_result(-1);

        assert_eq!(daemon.cancel().unwrap(), -1);
        assert_eq!(log.count(&GatewayCall::Cancel), 1);
    }

    #[test]
    fn test_emit_without_callback() {
        let (_daemon, handle) = MockDaemon::new(CallLog::new());
        assert_eq!(
            handle.emit_progress(FingerprintId::new(1), GroupId::new(0), 0),
            None
        );
    }

    #[test]
    fn test_emit_reaches_callback() {
        let (_daemon, handle) = MockDaemon::new(CallLog::new());
        let callback = Arc::new(CountingCallback::default());
        let as_dyn: Arc<dyn DaemonCallback> = callback.clone();
        handle.attach(Arc::downgrade(&as_dyn));

        assert_eq!(
            handle.emit_progress(FingerprintId::new(1), GroupId::new(0), 2),
            Some(false)
        );
        assert_eq!(
            handle.emit_progress(FingerprintId::new(1), GroupId::new(0), 0),
            Some(true)
        );
        assert_eq!(handle.emit_acquired(AcquiredInfo::Partial, 0), Some(false));
        assert_eq!(handle.emit_error(ErrorCode::Vendor, 12), Some(true));

        assert_eq!(callback.progress.load(Ordering::SeqCst), 2);
        assert_eq!(callback.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(callback.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_callback_is_not_reached() {
        let (_daemon, handle) = MockDaemon::new(CallLog::new());
        let callback: Arc<dyn DaemonCallback> = Arc::new(CountingCallback::default());
        handle.attach(Arc::downgrade(&callback));
        drop(callback);

        assert_eq!(handle.emit_error(ErrorCode::HwUnavailable, 0), None);
    }

    #[test]
    fn test_device_id() {
        let (daemon, _handle) = MockDaemon::with_device_id(DeviceId::new(42), CallLog::new());
        assert_eq!(daemon.device_id(), DeviceId::new(42));
    }
}
