//! Integration tests for dispatch ordering, failure paths and metrics.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use action_store_core::{Action, ActionMap, action_types};
use action_store_runtime::metrics::MetricsRecorder;
use action_store_runtime::{DispatchError, DispatchMode, Store, StoreConfig};
use action_store_testing::handlers::{self, Gate};
use action_store_testing::{StateRecorder, init_test_tracing};
use proptest::prelude::*;
use std::time::Duration;

action_types! {
    enum Op {
        Add => "ADD",
        Sub => "SUB",
        SlowAdd => "SLOW_ADD",
        Mul => "MUL",
    }
}

fn arithmetic(gate: &Gate) -> ActionMap<Op, i64, i64> {
    ActionMap::<Op, i64, i64>::builder()
        .on(Op::Add, |state, n| state + n)
        .on(Op::Sub, |state, n| state - n)
        .insert(Op::SlowAdd, handlers::gated(gate, |state, n| state + n))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_slow_handler_overwrites_newer_state() {
    init_test_tracing();
    let gate = Gate::new();
    let store = Store::new(0, arithmetic(&gate));
    let recorder = StateRecorder::attach(&store);

    // Snapshot 0 is taken here, before the fast dispatch runs
    let slow = store.dispatch(Action::new(Op::SlowAdd, 1));
    store.dispatch(Action::new(Op::Add, 1)).await.unwrap();
    assert_eq!(store.get(), 1);

    gate.open();
    slow.await.unwrap();

    // Two increments, one survives
    assert_eq!(store.get(), 1);
    assert_eq!(recorder.values(), vec![0, 1, 1]);
}

#[tokio::test]
async fn test_slow_handler_result_wins_over_fast_one() {
    let gate = Gate::new();
    let store = Store::new(0, arithmetic(&gate));
    let recorder = StateRecorder::attach(&store);

    let slow = store.dispatch(Action::new(Op::SlowAdd, 10));
    let fast = store.dispatch(Action::new(Op::Add, 1));

    let (slow, fast, ()) = tokio::join!(slow, fast, async { gate.open() });
    slow.unwrap();
    fast.unwrap();

    assert_eq!(store.get(), 10);
    assert_eq!(recorder.publications(), vec![1, 10]);
}

#[tokio::test]
async fn test_serialized_mode_applies_every_update() {
    init_test_tracing();
    let gate = Gate::new();
    let config = StoreConfig::default()
        .with_name("serialized")
        .with_dispatch_mode(DispatchMode::Serialized);
    let store = Store::with_config(0, arithmetic(&gate), config);
    let recorder = StateRecorder::attach(&store);

    let slow = store.dispatch(Action::new(Op::SlowAdd, 1));
    let fast = store.dispatch(Action::new(Op::Add, 1));

    let (slow, fast, ()) = tokio::join!(slow, fast, async {
        // The fast dispatch is queued behind the gated one
        assert_eq!(store.get(), 0);
        gate.open();
    });
    slow.unwrap();
    fast.unwrap();

    assert_eq!(store.get(), 2);
    assert_eq!(recorder.values(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_serialized_mode_orders_by_first_poll() {
    let gate = Gate::new();
    let config = StoreConfig::default().with_dispatch_mode(DispatchMode::Serialized);
    let store = Store::with_config(1, arithmetic(&gate), config);
    gate.open();

    let add = store.dispatch(Action::new(Op::Add, 4));
    let sub = store.dispatch(Action::new(Op::Sub, 2));

    // Polled sub first, so it applies to 1 and add applies to -1
    let (sub, add) = tokio::join!(sub, add);
    sub.unwrap();
    add.unwrap();

    assert_eq!(store.get(), 3);
}

#[tokio::test]
async fn test_serialized_queue_survives_a_failing_handler() {
    let gate = Gate::new();
    let map = ActionMap::<Op, i64, i64>::builder()
        .on(Op::Add, |state, n| state + n)
        .insert(Op::Sub, handlers::failing("refused"))
        .insert(Op::SlowAdd, handlers::gated(&gate, |state, n| state + n))
        .build()
        .unwrap();
    let config = StoreConfig::default().with_dispatch_mode(DispatchMode::Serialized);
    let store = Store::with_config(0, map, config);
    let recorder = StateRecorder::attach(&store);

    let slow = store.dispatch(Action::new(Op::SlowAdd, 1));
    let failed = store.dispatch(Action::new(Op::Sub, 1));
    let add = store.dispatch(Action::new(Op::Add, 1));

    let (slow, failed, add, ()) = tokio::join!(slow, failed, add, async {
        // Both later dispatches wait behind the gated one
        assert_eq!(store.get(), 0);
        gate.open();
    });
    slow.unwrap();
    assert_eq!(failed.unwrap_err().to_string(), "refused");
    add.unwrap();

    assert_eq!(store.get(), 2);
    assert_eq!(recorder.values(), vec![0, 1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_delayed_handlers_race_under_paused_time() {
    let map = ActionMap::<Op, i64, i64>::builder()
        .on(Op::Add, |state, n| state + n)
        .insert(
            Op::SlowAdd,
            handlers::delayed(Duration::from_millis(50), |state, n| state + n),
        )
        .build()
        .unwrap();
    let store = Store::new(0, map);

    let slow = tokio::spawn(store.dispatch(Action::new(Op::SlowAdd, 1)));
    let fast = tokio::spawn(store.dispatch(Action::new(Op::Add, 1)));

    fast.await.unwrap().unwrap();
    assert_eq!(store.get(), 1);

    slow.await.unwrap().unwrap();
    assert_eq!(store.get(), 1);
}

#[tokio::test]
async fn test_unknown_action_type_fails_without_notifying() {
    let gate = Gate::new();
    let store = Store::new(7, arithmetic(&gate));
    let recorder = StateRecorder::attach(&store);

    let err = store.dispatch(Action::new(Op::Mul, 2)).await.unwrap_err();

    assert!(err.is_unknown_action_type());
    assert_eq!(
        err.to_string(),
        "Action type \"MUL\" is not defined in the action map"
    );
    assert_eq!(store.get(), 7);
    assert_eq!(recorder.values(), vec![7]);
}

#[tokio::test]
async fn test_handler_error_surfaces_unchanged() {
    #[derive(Debug, thiserror::Error, PartialEq, Eq)]
    #[error("insufficient funds: {0}")]
    struct InsufficientFunds(i64);

    let map = ActionMap::<Op, i64, i64>::builder()
        .try_on(Op::Sub, |balance, amount| {
            if amount > balance {
                Err(InsufficientFunds(balance).into())
            } else {
                Ok(balance - amount)
            }
        })
        .build()
        .unwrap();
    let store = Store::new(10, map);
    let recorder = StateRecorder::attach(&store);

    let err = store.dispatch(Action::new(Op::Sub, 25)).await.unwrap_err();

    let source = match err {
        DispatchError::Handler(source) => source,
        other => panic!("expected a handler error, got {other:?}"),
    };
    assert_eq!(
        source.downcast_ref::<InsufficientFunds>(),
        Some(&InsufficientFunds(10))
    );
    assert_eq!(store.get(), 10);
    assert!(recorder.publications().is_empty());

    store.dispatch(Action::new(Op::Sub, 4)).await.unwrap();
    assert_eq!(store.get(), 6);
}

#[tokio::test]
async fn test_dispatch_from_json() {
    let gate = Gate::new();
    let store = Store::new(0, arithmetic(&gate));

    let action = Action::<Op, i64>::from_json(r#"{"type": "ADD", "payload": 5}"#).unwrap();
    store.dispatch(action).await.unwrap();
    assert_eq!(store.get(), 5);

    let rejected = Action::<Op, i64>::from_json(r#"{"type": "DIV", "payload": 5}"#);
    assert!(rejected.is_err());
}

#[tokio::test]
async fn test_dispatch_metrics_are_rendered() {
    let mut recorder = MetricsRecorder::new();
    recorder.install().unwrap();

    let gate = Gate::new();
    let config = StoreConfig::default().with_name("metered");
    let store = Store::with_config(0, arithmetic(&gate), config);

    store.dispatch(Action::new(Op::Add, 1)).await.unwrap();
    store.dispatch(Action::new(Op::Mul, 1)).await.unwrap_err();

    // Only this test installs a recorder in this binary
    let rendered = recorder.render().expect("recorder installed");
    assert!(rendered.contains("store_dispatch_total"));
    assert!(rendered.contains("store_dispatch_unknown_type_total"));
    assert!(rendered.contains("store=\"metered\""));
}

proptest! {
    #[test]
    fn prop_sequential_dispatch_folds_payloads(
        steps in prop::collection::vec((any::<bool>(), -1_000i64..1_000), 0..32)
    ) {
        let gate = Gate::new();
        let store = Store::new(0, arithmetic(&gate));
        let recorder = StateRecorder::attach(&store);

        let expected = tokio_test::block_on(async {
            let mut expected = 0;
            for &(add, n) in &steps {
                let op = if add { Op::Add } else { Op::Sub };
                store.dispatch(Action::new(op, n)).await.unwrap();
                expected = if add { expected + n } else { expected - n };
            }
            expected
        });

        prop_assert_eq!(store.get(), expected);
        prop_assert_eq!(recorder.len(), steps.len() + 1);
    }
}
