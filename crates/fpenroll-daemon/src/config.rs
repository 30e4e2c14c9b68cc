use fpenroll_core::constants::{
    DEFAULT_ENROLL_TIMEOUT_SECS, DEFAULT_HISTORY_CAPACITY, DEFAULT_SESSION_TIMEOUT_MS,
    INDICATOR_HIDE_DEBOUNCE_MS,
};
use fpenroll_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Coordinator configuration
///
/// Every field has a default, so a JSON document only needs to list the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Timeout handed to the driver with each enroll request, in seconds
    pub enroll_timeout_secs: u32,

    /// Owner-side timer after which a session is stopped, in milliseconds
    pub session_timeout_ms: u64,

    /// Delay before the indicator is hidden after a completed session.
    /// Zero hides synchronously.
    pub indicator_hide_debounce_ms: u64,

    /// The sensor sits under the display and needs the on-screen indicator
    pub has_under_display_sensor: bool,

    /// Human-readable sensor name, for logs
    pub sensor_name: String,

    /// Number of state transitions kept per session
    pub history_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            enroll_timeout_secs: DEFAULT_ENROLL_TIMEOUT_SECS,
            session_timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            indicator_hide_debounce_ms: INDICATOR_HIDE_DEBOUNCE_MS,
            has_under_display_sensor: false,
            sensor_name: "fingerprint".to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl CoordinatorConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid coordinator config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    /// Reject values that would make every session fail or time out at once
    pub fn validate(&self) -> Result<()> {
        if self.enroll_timeout_secs == 0 {
            return Err(Error::Config(
                "enroll_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.session_timeout_ms == 0 {
            return Err(Error::Config(
                "session_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(Error::Config(
                "history_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the driver-side enroll timeout
    pub fn enroll_timeout_secs(mut self, secs: u32) -> Self {
        self.enroll_timeout_secs = secs;
        self
    }

    /// Set the owner-side session timeout
    pub fn session_timeout_ms(mut self, ms: u64) -> Self {
        self.session_timeout_ms = ms;
        self
    }

    /// Set the indicator hide debounce
    pub fn indicator_hide_debounce_ms(mut self, ms: u64) -> Self {
        self.indicator_hide_debounce_ms = ms;
        self
    }

    /// Set whether the sensor is under the display
    pub fn under_display_sensor(mut self, enabled: bool) -> Self {
        self.has_under_display_sensor = enabled;
        self
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }

    pub fn indicator_debounce(&self) -> Duration {
        Duration::from_millis(self.indicator_hide_debounce_ms)
    }
}
