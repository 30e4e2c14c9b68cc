//! Core constants for the enrollment flow.
//!
//! Timeouts, debounce intervals and driver result codes used across the
//! workspace. Values follow the fingerprint framework defaults so that a
//! driver written against that framework behaves the same here.
//!
//! # Usage
//!
//! ```
//! use fpenroll_core::constants::*;
//! use std::time::Duration;
//!
//! assert_eq!(DRIVER_RESULT_OK, 0);
//! let debounce = Duration::from_millis(INDICATOR_HIDE_DEBOUNCE_MS);
//! assert_eq!(debounce.as_millis(), 500);
//! ```

// ============================================================================
// Driver Result Codes
// ============================================================================

/// Result code returned by the driver when a request was accepted.
///
/// Any other value from `enroll()` or `cancel()` is a rejection.
pub const DRIVER_RESULT_OK: i32 = 0;

// ============================================================================
// Timeouts
// ============================================================================

/// Enrollment timeout passed to the driver, in seconds.
pub const DEFAULT_ENROLL_TIMEOUT_SECS: u32 = 60;

/// Owner-side session timeout, in milliseconds.
///
/// When it elapses the owner stops the session as a non-client cancel.
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// Indicator
// ============================================================================

/// Delay before a terminal-state indicator hide is issued.
///
/// Measured from the last hide request. A `show()` arriving within this
/// window cancels the pending hide, so back-to-back sessions do not flicker.
pub const INDICATOR_HIDE_DEBOUNCE_MS: u64 = 500;

// ============================================================================
// Diagnostics
// ============================================================================

/// Default number of state transitions retained per session.
///
/// A complete session produces at most three transitions
/// (Created → Started → Enrolling → terminal), so 32 leaves room for
/// diagnostics without unbounded growth.
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debounce_shorter_than_session_timeout() {
        assert!(INDICATOR_HIDE_DEBOUNCE_MS < DEFAULT_SESSION_TIMEOUT_MS);
    }

    #[test]
    fn test_driver_timeout_matches_session_timeout() {
        assert_eq!(
            u64::from(DEFAULT_ENROLL_TIMEOUT_SECS) * 1000,
            DEFAULT_SESSION_TIMEOUT_MS
        );
    }
}
