//! Mock on-screen sensor indicator.

use super::call_log::{CallLog, GatewayCall};
use crate::{Result, error::GatewayError, traits::IndicatorGateway};
use std::sync::atomic::{AtomicBool, Ordering};

/// Mock indicator that tracks visibility and records show/hide calls.
///
/// # Examples
///
/// ```
/// use fpenroll_hardware::mock::{CallLog, MockIndicator};
/// use fpenroll_hardware::traits::IndicatorGateway;
///
/// let indicator = MockIndicator::new(CallLog::new());
/// indicator.show().unwrap();
/// assert!(indicator.is_visible());
/// indicator.hide().unwrap();
/// assert!(!indicator.is_visible());
/// ```
#[derive(Debug)]
pub struct MockIndicator {
    log: CallLog,
    visible: AtomicBool,
    unreachable: AtomicBool,
}

impl MockIndicator {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            visible: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
        }
    }

    /// Whether the indicator is currently drawn.
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Simulate the UI process being unreachable.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> Result<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(GatewayError::disconnected("indicator"));
        }
        Ok(())
    }
}

impl IndicatorGateway for MockIndicator {
    fn show(&self) -> Result<()> {
        self.check_reachable()?;
        self.visible.store(true, Ordering::SeqCst);
        self.log.record(GatewayCall::Show);
        Ok(())
    }

    fn hide(&self) -> Result<()> {
        self.check_reachable()?;
        self.visible.store(false, Ordering::SeqCst);
        self.log.record(GatewayCall::Hide);
        Ok(())
    }
}
