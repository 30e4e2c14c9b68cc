//! Enrollment session coordination.
//!
//! This crate contains the state machine that drives one fingerprint
//! enrollment from admission to a terminal state, and the shared controller
//! for the on-screen indicator of under-display sensors.
//!
//! # Lifecycle
//!
//! ```text
//! Created ──start()──► Started ──► Enrolling ──remaining == 0──► Completed
//!    │                    │            │
//!    └────────────────────┴────────────┴──stop() / error──► Cancelled | Failed
//! ```
//!
//! Every operation decides its transition under a single per-session lock
//! and issues gateway calls after releasing it. A terminal transition
//! happens exactly once, so hide, cancel, persistence and the owner
//! notification are each issued at most once per session.

pub mod indicator;
pub mod session;
pub mod state;

pub use indicator::IndicatorController;
pub use session::{
    EnrollmentSession, EnrollmentSessionBuilder, START_INVALID_STATE, SessionConfig,
    SessionGateways, SessionOutcome,
};
pub use state::{SessionState, StateMachine, StateTransition};
