//! Result sink that prints every notification to stdout.

use fpenroll_core::{AcquiredInfo, DeviceId, ErrorCode, FingerprintId, GroupId};
use fpenroll_hardware::{ResultSink, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct ConsoleSink {
    progress: AtomicUsize,
}

impl ConsoleSink {
    /// Progress notifications printed so far.
    pub fn progress_count(&self) -> usize {
        self.progress.load(Ordering::SeqCst)
    }
}

impl ResultSink for ConsoleSink {
    fn on_enroll_result(
        &self,
        device_id: DeviceId,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> Result<()> {
        self.progress.fetch_add(1, Ordering::SeqCst);
        println!(
            "[{device_id}] progress: fingerprint={fingerprint_id} group={group_id} remaining={remaining}"
        );
        Ok(())
    }

    fn on_acquired(&self, device_id: DeviceId, info: AcquiredInfo, vendor_code: i32) -> Result<()> {
        println!("[{device_id}] acquired: {info:?} (vendor {vendor_code})");
        Ok(())
    }

    fn on_error(&self, device_id: DeviceId, code: ErrorCode, vendor_code: i32) -> Result<()> {
        println!("[{device_id}] error: {code} (vendor {vendor_code})");
        Ok(())
    }
}
