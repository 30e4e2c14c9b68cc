//! Recording client result sink.

use super::call_log::{CallLog, GatewayCall, lock};
use crate::{Result, error::GatewayError, traits::ResultSink};
use fpenroll_core::{AcquiredInfo, DeviceId, ErrorCode, FingerprintId, GroupId};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Client sink that records every notification it receives.
///
/// Notifications go both to the shared [`CallLog`] (for cross-gateway
/// ordering) and to a private list of error codes for quick assertions.
#[derive(Debug)]
pub struct RecordingSink {
    log: CallLog,
    errors: Mutex<Vec<ErrorCode>>,
    disconnected: AtomicBool,
}

impl RecordingSink {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            errors: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    /// Simulate the client process going away.
    ///
    /// Subsequent notifications fail with `GatewayError::Disconnected`.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Error codes received so far, oldest first.
    pub fn errors(&self) -> Vec<ErrorCode> {
        lock(&self.errors).clone()
    }

    fn check_connected(&self) -> Result<()> {
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(GatewayError::disconnected("client"));
        }
        Ok(())
    }
}

impl ResultSink for RecordingSink {
    fn on_enroll_result(
        &self,
        _device_id: DeviceId,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> Result<()> {
        self.check_connected()?;
        self.log.record(GatewayCall::Progress {
            fingerprint_id,
            group_id,
            remaining,
        });
        Ok(())
    }

    fn on_acquired(&self, _device_id: DeviceId, info: AcquiredInfo, _vendor_code: i32) -> Result<()> {
        self.check_connected()?;
        self.log.record(GatewayCall::Acquired { info });
        Ok(())
    }

    fn on_error(&self, _device_id: DeviceId, code: ErrorCode, _vendor_code: i32) -> Result<()> {
        self.check_connected()?;
        lock(&self.errors).push(code);
        self.log.record(GatewayCall::ClientError { code });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_records_notifications() {
        let log = CallLog::new();
        let sink = RecordingSink::new(log.clone());
        let device = DeviceId::new(1);

        sink.on_enroll_result(device, FingerprintId::new(7), GroupId::new(3), 5)
            .unwrap();
        sink.on_acquired(device, AcquiredInfo::TooFast, 0).unwrap();
        sink.on_error(device, ErrorCode::Canceled, 0).unwrap();

        assert_eq!(log.len(), 3);
        assert_eq!(sink.errors(), vec![ErrorCode::Canceled]);
    }

    #[test]
    fn test_disconnected_sink_rejects() {
        let log = CallLog::new();
        let sink = RecordingSink::new(log.clone());
        sink.disconnect();

        let result = sink.on_error(DeviceId::new(1), ErrorCode::Canceled, 0);
        assert!(result.unwrap_err().is_disconnected());
        assert!(sink.errors().is_empty());
        assert!(log.is_empty());
    }
}
