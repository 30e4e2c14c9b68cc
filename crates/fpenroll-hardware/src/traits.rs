//! Gateway trait definitions.
//!
//! These traits describe the peers an enrollment session talks to. Each one
//! stands for an out-of-process component reached through a request channel:
//!
//! - [`DaemonGateway`]: the sensor driver process (`enroll`, `cancel`).
//! - [`DaemonCallback`]: the driver's asynchronous replies, delivered on an
//!   arbitrary thread.
//! - [`IndicatorGateway`]: the on-screen affordance drawn over an
//!   under-display sensor.
//! - [`ResultSink`]: the client that asked for the enrollment.
//! - [`TemplateStore`]: the record of which user owns which template.
//!
//! # Object Safety
//!
//! Unlike async device traits, every method here is a synchronous dispatch:
//! the request is handed to the peer and the call returns without waiting
//! for hardware. That keeps the traits object-safe, so gateways are shared
//! as `Arc<dyn DaemonGateway>` across sessions and callback threads.
//!
//! ```
//! use std::sync::Arc;
//! use fpenroll_hardware::mock::{CallLog, MockDaemon};
//! use fpenroll_hardware::traits::DaemonGateway;
//!
//! let (daemon, _handle) = MockDaemon::new(CallLog::new());
//! let gateway: Arc<dyn DaemonGateway> = daemon;
//! assert_eq!(gateway.cancel().unwrap(), 0);
//! ```

use crate::error::Result;
use fpenroll_core::{
    AcquiredInfo, DeviceId, EnrollmentToken, ErrorCode, FingerprintId, GroupId, UserId,
};

/// Request side of the sensor driver.
///
/// Both calls return the driver's result code. `0` means the request was
/// accepted; for `cancel()` it does not mean the enrollment has stopped.
pub trait DaemonGateway: Send + Sync {
    /// Identifier of the sensor this driver controls.
    fn device_id(&self) -> DeviceId;

    /// Arm the sensor for enrollment.
    ///
    /// Completion is reported later through [`DaemonCallback`].
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be dispatched to the driver.
    fn enroll(&self, token: &EnrollmentToken, group_id: GroupId, timeout_secs: u32)
    -> Result<i32>;

    /// Ask the driver to abandon the current operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be dispatched to the driver.
    fn cancel(&self) -> Result<i32>;
}

/// Asynchronous replies from the sensor driver.
///
/// Each method returns `true` when the receiving session is terminal after
/// handling the call.
pub trait DaemonCallback: Send + Sync {
    /// One enrollment step finished; `remaining == 0` means done.
    fn on_enroll_result(
        &self,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> bool;

    /// Capture-quality hint between steps.
    fn on_acquired(&self, info: AcquiredInfo, vendor_code: i32) -> bool;

    /// The driver aborted the operation.
    fn on_error(&self, code: ErrorCode, vendor_code: i32) -> bool;
}

/// On-screen sensor indicator.
///
/// Fire-and-forget: failures are logged by the caller and otherwise ignored.
pub trait IndicatorGateway: Send + Sync {
    /// Draw the indicator.
    ///
    /// # Errors
    ///
    /// Returns an error if the UI process could not be reached.
    fn show(&self) -> Result<()>;

    /// Remove the indicator.
    ///
    /// # Errors
    ///
    /// Returns an error if the UI process could not be reached.
    fn hide(&self) -> Result<()>;
}

/// Client callback interface.
///
/// Delivery is best-effort. A sink that returns
/// [`GatewayError::Disconnected`](crate::GatewayError::Disconnected), or that
/// has been dropped, simply stops receiving notifications.
pub trait ResultSink: Send + Sync {
    /// Progress step, forwarded verbatim from the driver.
    ///
    /// # Errors
    ///
    /// Returns an error if the client could not be reached.
    fn on_enroll_result(
        &self,
        device_id: DeviceId,
        fingerprint_id: FingerprintId,
        group_id: GroupId,
        remaining: i32,
    ) -> Result<()>;

    /// Capture-quality hint.
    ///
    /// # Errors
    ///
    /// Returns an error if the client could not be reached.
    fn on_acquired(&self, device_id: DeviceId, info: AcquiredInfo, vendor_code: i32)
    -> Result<()>;

    /// Terminal error for the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the client could not be reached.
    fn on_error(&self, device_id: DeviceId, code: ErrorCode, vendor_code: i32) -> Result<()>;
}

/// Association between enrolled templates and their owning users.
pub trait TemplateStore: Send + Sync {
    /// Record that `fingerprint_id` belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write could not be performed.
    fn add_fingerprint_for_user(&self, fingerprint_id: FingerprintId, user_id: UserId)
    -> Result<()>;
}
