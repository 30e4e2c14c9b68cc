//! Gateway context.
//!
//! Built once at process start and handed to the coordinator. It owns the
//! process-wide [`IndicatorController`] and the runtime handle every
//! background task is spawned on, so nothing in the workspace reaches for a
//! global.

use crate::config::CoordinatorConfig;
use fpenroll_core::{Error, Result};
use fpenroll_hardware::{DaemonGateway, IndicatorGateway, SensorProperties, TemplateStore};
use fpenroll_session::{IndicatorController, SessionGateways};
use std::sync::Arc;
use tokio::runtime::Handle;

/// Shared gateways and runtime for all sessions.
#[derive(Clone)]
pub struct GatewayContext {
    gateways: SessionGateways,
    sensor: SensorProperties,
    runtime: Handle,
}

impl GatewayContext {
    /// Wire the gateways together.
    ///
    /// Must be called from inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when no runtime is available.
    pub fn new(
        config: &CoordinatorConfig,
        daemon: Arc<dyn DaemonGateway>,
        indicator: Arc<dyn IndicatorGateway>,
        store: Arc<dyn TemplateStore>,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Config(format!("No Tokio runtime available: {}", e)))?;

        let sensor = SensorProperties::new(daemon.device_id(), config.sensor_name.clone())
            .with_under_display_sensor(config.has_under_display_sensor);
        let indicator = Arc::new(IndicatorController::new(
            indicator,
            config.indicator_debounce(),
            runtime.clone(),
        ));

        Ok(Self {
            gateways: SessionGateways {
                daemon,
                indicator,
                store,
            },
            sensor,
            runtime,
        })
    }

    pub fn sensor(&self) -> &SensorProperties {
        &self.sensor
    }

    pub fn gateways(&self) -> &SessionGateways {
        &self.gateways
    }

    pub fn indicator(&self) -> &Arc<IndicatorController> {
        &self.gateways.indicator
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }
}

impl std::fmt::Debug for GatewayContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayContext")
            .field("sensor", &self.sensor)
            .field("indicator", &self.gateways.indicator)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fpenroll_core::DeviceId;
    use fpenroll_hardware::mock::{CallLog, MemoryTemplateStore, MockDaemon, MockIndicator};
    use std::time::Duration;

    fn context(config: &CoordinatorConfig) -> Result<GatewayContext> {
        let log = CallLog::new();
        let (daemon, _driver) = MockDaemon::with_device_id(DeviceId::new(0x42), log.clone());
        GatewayContext::new(
            config,
            daemon,
            Arc::new(MockIndicator::new(log.clone())),
            Arc::new(MemoryTemplateStore::new(log)),
        )
    }

    #[tokio::test]
    async fn test_context_reflects_config() {
        let config = CoordinatorConfig::default()
            .under_display_sensor(true)
            .indicator_hide_debounce_ms(250);
        let ctx = context(&config).unwrap();

        assert_eq!(ctx.sensor().device_id, DeviceId::new(0x42));
        assert_eq!(ctx.sensor().name, "fingerprint");
        assert!(ctx.sensor().has_under_display_sensor);
        assert_eq!(ctx.indicator().debounce(), Duration::from_millis(250));
    }

    #[test]
    fn test_context_requires_runtime() {
        let result = context(&CoordinatorConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
