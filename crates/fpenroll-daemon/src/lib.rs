//! Enrollment owner for the fingerprint sensor.
//!
//! This crate wires the gateways into an [`EnrollmentCoordinator`], the single
//! owner that admits enrollment requests one at a time and drives each
//! [`EnrollmentSession`](fpenroll_session::EnrollmentSession) to completion.
//!
//! # Lifecycle
//!
//! 1. Load a [`CoordinatorConfig`]
//! 2. Build a [`GatewayContext`] from the driver, indicator and store gateways
//! 3. Call [`EnrollmentCoordinator::start`] and register
//!    [`callback`](EnrollmentCoordinator::callback) with the driver
//! 4. Admit requests with [`enroll`](EnrollmentCoordinator::enroll), read
//!    outcomes from the [`CoordinatorHandle`]
//! 5. [`shutdown`](CoordinatorHandle::shutdown) when done
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use fpenroll_core::{GroupId, SessionIdentity, UserId};
//! use fpenroll_daemon::{CoordinatorConfig, EnrollRequest, EnrollmentCoordinator, GatewayContext};
//! use fpenroll_hardware::mock::*;
//! use fpenroll_hardware::ResultSink;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> fpenroll_core::Result<()> {
//! let log = CallLog::new();
//! let (daemon, driver) = MockDaemon::new(log.clone());
//! let config = CoordinatorConfig::default();
//! let context = GatewayContext::new(
//!     &config,
//!     daemon,
//!     Arc::new(MockIndicator::new(log.clone())),
//!     Arc::new(MemoryTemplateStore::new(log.clone())),
//! )?;
//!
//! let mut handle = EnrollmentCoordinator::start(config, context)?;
//! driver.attach(handle.coordinator().callback());
//!
//! let sink: Arc<dyn ResultSink> = Arc::new(RecordingSink::new(log.clone()));
//! let identity = SessionIdentity::new(UserId::new(0), GroupId::new(0), "settings")?;
//! handle
//!     .coordinator()
//!     .enroll(EnrollRequest::new(identity, vec![1, 2, 3]), &sink)?;
//!
//! driver.emit_progress(fpenroll_core::FingerprintId::new(1), GroupId::new(0), 0);
//! let outcome = handle.recv().await.unwrap();
//! assert_eq!(outcome.state, fpenroll_session::SessionState::Completed);
//!
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod coordinator;

pub use config::CoordinatorConfig;
pub use context::GatewayContext;
pub use coordinator::{CoordinatorHandle, EnrollRequest, EnrollmentCoordinator, ShutdownReport};
