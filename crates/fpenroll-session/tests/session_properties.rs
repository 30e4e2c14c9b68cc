//! Property-based tests for session callback sequences.

mod common;

use common::{Harness, TEST_GROUP};
use fpenroll_core::{ErrorCode, FingerprintId, GroupId};
use fpenroll_hardware::mock::GatewayCall;
use proptest::prelude::*;
use tokio::runtime::{Builder, Runtime};

fn runtime() -> Runtime {
    Builder::new_current_thread().enable_all().build().unwrap()
}

#[derive(Debug, Clone)]
enum Event {
    Progress(i32),
    Stop { by_client: bool },
    DriverError,
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => (-1..6i32).prop_map(Event::Progress),
        1 => any::<bool>().prop_map(|by_client| Event::Stop { by_client }),
        1 => Just(Event::DriverError),
    ]
}

proptest! {
    #[test]
    fn prop_persist_happens_once_at_first_zero(remaining in prop::collection::vec(0..4i32, 0..12)) {
        let rt = runtime();
        let _guard = rt.enter();
        let h = Harness::new(0);
        let session = h.session(false);
        prop_assert_eq!(session.start(), 0);

        let first_zero = remaining.iter().position(|&r| r == 0);
        for (i, &r) in remaining.iter().enumerate() {
            let terminal = session.on_enroll_result(FingerprintId::new(1), GroupId::new(TEST_GROUP), r);
            prop_assert_eq!(terminal, first_zero.is_some_and(|z| i >= z));
        }

        let expected_progress: Vec<i32> = match first_zero {
            Some(z) => remaining[..=z].to_vec(),
            None => remaining.clone(),
        };
        prop_assert_eq!(h.persist_count(), usize::from(first_zero.is_some()));
        prop_assert_eq!(h.progress_remaining(), expected_progress);
    }

    #[test]
    fn prop_repeated_stop_cancels_once(stops in prop::collection::vec(any::<bool>(), 1..10)) {
        let rt = runtime();
        let _guard = rt.enter();
        let mut h = Harness::new(0);
        let session = h.session(true);
        session.start();

        let performed = stops.iter().filter(|&&by_client| session.stop(by_client)).count();

        prop_assert_eq!(performed, 1);
        prop_assert_eq!(h.log.count(&GatewayCall::Cancel), 1);
        prop_assert_eq!(h.log.count(&GatewayCall::Hide), 1);
        prop_assert_eq!(h.drain_outcomes().len(), 1);

        let expected_errors = if stops[0] { vec![ErrorCode::Canceled] } else { vec![] };
        prop_assert_eq!(h.sink.errors(), expected_errors);
    }

    #[test]
    fn prop_side_effects_happen_at_most_once(events in prop::collection::vec(event_strategy(), 0..16)) {
        let rt = runtime();
        let _guard = rt.enter();
        let mut h = Harness::new(0);
        let session = h.session(true);
        session.start();

        for event in &events {
            match *event {
                Event::Progress(r) => {
                    session.on_enroll_result(FingerprintId::new(2), GroupId::new(TEST_GROUP), r);
                }
                Event::Stop { by_client } => {
                    session.stop(by_client);
                }
                Event::DriverError => {
                    session.on_error(ErrorCode::Timeout, 0);
                }
            }
        }

        let terminal = session.is_terminal();
        let expected = usize::from(terminal);
        prop_assert!(h.persist_count() <= 1);
        prop_assert!(h.log.count(&GatewayCall::Cancel) <= 1);
        prop_assert!(h.sink.errors().len() <= 1);
        prop_assert_eq!(h.log.count(&GatewayCall::Show), 1);
        prop_assert_eq!(h.log.count(&GatewayCall::Hide), expected);
        prop_assert_eq!(h.drain_outcomes().len(), expected);
        prop_assert_eq!(h.indicator.is_visible(), !terminal);
    }
}
