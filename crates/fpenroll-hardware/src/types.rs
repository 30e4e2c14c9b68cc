//! Sensor metadata shared by the owner and its sessions.

use fpenroll_core::DeviceId;
use serde::{Deserialize, Serialize};

/// Static properties of the fingerprint sensor.
///
/// Determines, among other things, whether a session drives the on-screen
/// indicator at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorProperties {
    /// Sensor identifier as reported by the driver.
    pub device_id: DeviceId,

    /// Human-readable sensor name.
    pub name: String,

    /// The sensor sits under the display and needs an on-screen indicator.
    pub has_under_display_sensor: bool,
}

impl SensorProperties {
    /// Create properties for a conventional (non under-display) sensor.
    pub fn new(device_id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            device_id,
            name: name.into(),
            has_under_display_sensor: false,
        }
    }

    /// Mark the sensor as under-display.
    pub fn with_under_display_sensor(mut self, enabled: bool) -> Self {
        self.has_under_display_sensor = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_properties_builder() {
        let props = SensorProperties::new(DeviceId::new(1), "goodix").with_under_display_sensor(true);

        assert_eq!(props.device_id, DeviceId::new(1));
        assert_eq!(props.name, "goodix");
        assert!(props.has_under_display_sensor);
    }

    #[test]
    fn test_sensor_properties_default_is_conventional() {
        let props = SensorProperties::new(DeviceId::new(2), "fpc");
        assert!(!props.has_under_display_sensor);
    }

    #[test]
    fn test_sensor_properties_serialization() {
        let props = SensorProperties::new(DeviceId::new(3), "fpc");
        let json = serde_json::to_string(&props).unwrap();
        let back: SensorProperties = serde_json::from_str(&json).unwrap();
        assert_eq!(props, back);
    }
}
