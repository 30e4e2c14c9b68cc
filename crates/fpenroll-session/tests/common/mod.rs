//! Shared fixtures for session integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use fpenroll_core::{EnrollmentToken, GroupId, SessionIdentity, UserId};
use fpenroll_hardware::ResultSink;
use fpenroll_hardware::mock::{
    CallLog, GatewayCall, MemoryTemplateStore, MockDaemon, MockDaemonHandle, MockIndicator,
    RecordingSink,
};
use fpenroll_session::{
    EnrollmentSession, IndicatorController, SessionConfig, SessionGateways, SessionOutcome,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

pub const TEST_USER: i32 = 10;
pub const TEST_GROUP: i32 = 3;
pub const TEST_OWNER: &str = "com.example.settings";
pub const TEST_TOKEN: [u8; 8] = [0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef];

/// Mock gateways wired to one call log.
///
/// Must be created inside a Tokio runtime.
pub struct Harness {
    pub log: CallLog,
    pub driver: MockDaemonHandle,
    pub indicator: Arc<MockIndicator>,
    pub store: Arc<MemoryTemplateStore>,
    pub sink: Arc<RecordingSink>,
    pub controller: Arc<IndicatorController>,
    pub gateways: SessionGateways,
    pub outcomes: mpsc::UnboundedReceiver<SessionOutcome>,
    outcome_tx: mpsc::UnboundedSender<SessionOutcome>,
}

impl Harness {
    pub fn new(debounce_ms: u64) -> Self {
        let log = CallLog::new();
        let (daemon, driver) = MockDaemon::new(log.clone());
        let indicator = Arc::new(MockIndicator::new(log.clone()));
        let store = Arc::new(MemoryTemplateStore::new(log.clone()));
        let sink = Arc::new(RecordingSink::new(log.clone()));
        let controller = Arc::new(IndicatorController::new(
            indicator.clone(),
            Duration::from_millis(debounce_ms),
            Handle::current(),
        ));
        let gateways = SessionGateways {
            daemon,
            indicator: controller.clone(),
            store: store.clone(),
        };
        let (outcome_tx, outcomes) = mpsc::unbounded_channel();

        Self {
            log,
            driver,
            indicator,
            store,
            sink,
            controller,
            gateways,
            outcomes,
            outcome_tx,
        }
    }

    /// Session reporting to the harness sink.
    pub fn session(&self, under_display: bool) -> Arc<EnrollmentSession> {
        let sink: Arc<dyn ResultSink> = self.sink.clone();
        self.session_with_sink(under_display, &sink)
    }

    /// Session reporting to a caller-provided sink.
    pub fn session_with_sink(
        &self,
        under_display: bool,
        sink: &Arc<dyn ResultSink>,
    ) -> Arc<EnrollmentSession> {
        self.build_session(under_display, sink, self.gateways.clone())
    }

    /// Session dispatching to `gateways` instead of the harness defaults.
    pub fn session_with_gateways(
        &self,
        under_display: bool,
        gateways: SessionGateways,
    ) -> Arc<EnrollmentSession> {
        let sink: Arc<dyn ResultSink> = self.sink.clone();
        self.build_session(under_display, &sink, gateways)
    }

    fn build_session(
        &self,
        under_display: bool,
        sink: &Arc<dyn ResultSink>,
        gateways: SessionGateways,
    ) -> Arc<EnrollmentSession> {
        let identity =
            SessionIdentity::new(UserId::new(TEST_USER), GroupId::new(TEST_GROUP), TEST_OWNER)
                .unwrap();
        let token = EnrollmentToken::new(&TEST_TOKEN).unwrap();
        let config = SessionConfig {
            has_under_display_sensor: under_display,
            ..SessionConfig::default()
        };

        EnrollmentSession::builder(identity, token, sink)
            .with_config(config)
            .with_outcome_sender(self.outcome_tx.clone())
            .build(gateways)
    }

    /// Index of the first enroll request in the call log.
    pub fn enroll_position(&self) -> Option<usize> {
        self.log
            .position_where(|call| matches!(call, GatewayCall::Enroll { .. }))
    }

    /// Every outcome delivered so far.
    pub fn drain_outcomes(&mut self) -> Vec<SessionOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(outcome) = self.outcomes.try_recv() {
            outcomes.push(outcome);
        }
        outcomes
    }

    pub fn progress_remaining(&self) -> Vec<i32> {
        self.log
            .snapshot()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Progress { remaining, .. } => Some(remaining),
                _ => None,
            })
            .collect()
    }

    pub fn persist_count(&self) -> usize {
        self.log
            .count_where(|call| matches!(call, GatewayCall::Persist { .. }))
    }
}
