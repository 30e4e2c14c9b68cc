//! Core types for the fingerprint enrollment coordinator.
//!
//! This crate holds the vocabulary shared by every other crate in the
//! workspace: identity newtypes, the enrollment token, driver progress
//! events, client-facing error codes and the core error type.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
