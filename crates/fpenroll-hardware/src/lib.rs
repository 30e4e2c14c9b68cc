//! Gateway abstraction layer for the fingerprint enrollment coordinator.
//!
//! An enrollment session never touches hardware directly. It talks to
//! out-of-process peers through the traits defined here:
//!
//! - [`DaemonGateway`] / [`DaemonCallback`]: request and callback halves of
//!   the sensor driver.
//! - [`IndicatorGateway`]: the on-screen indicator for under-display sensors.
//! - [`ResultSink`]: the client receiving progress and errors.
//! - [`TemplateStore`]: fingerprint ownership records.
//!
//! # Design Philosophy
//!
//! - **Synchronous dispatch**: every call hands a request to the peer and
//!   returns without waiting for hardware. Results that take time arrive
//!   through [`DaemonCallback`].
//! - **Object-safe**: gateways are shared as `Arc<dyn Trait>`.
//! - **Thread-safe**: all traits require `Send + Sync`; callbacks arrive on
//!   arbitrary threads.
//! - **Error-aware**: every call returns [`Result<T>`][error::Result] with a
//!   [`GatewayError`] describing the failure.
//!
//! # Liveness
//!
//! [`PeerLiveness`] ties a cancellation token to a peer's lifetime and
//! [`SessionHandle`] is the revocable capability a client holds on its
//! session. Peer death is observed, never polled.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides recording gateways for development and
//! testing without a driver process.
//!
//! ```
//! use fpenroll_hardware::mock::{CallLog, GatewayCall, MockIndicator};
//! use fpenroll_hardware::IndicatorGateway;
//!
//! let log = CallLog::new();
//! let indicator = MockIndicator::new(log.clone());
//! indicator.show().unwrap();
//! assert_eq!(log.snapshot(), vec![GatewayCall::Show]);
//! ```
//!
//! [`DaemonGateway`]: traits::DaemonGateway
//! [`DaemonCallback`]: traits::DaemonCallback
//! [`IndicatorGateway`]: traits::IndicatorGateway
//! [`ResultSink`]: traits::ResultSink
//! [`TemplateStore`]: traits::TemplateStore

pub mod error;
pub mod liveness;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{GatewayError, Result};
pub use liveness::{PeerLiveness, SessionHandle};
pub use traits::{DaemonCallback, DaemonGateway, IndicatorGateway, ResultSink, TemplateStore};
pub use types::SensorProperties;
