//! Counter demo binary
//!
//! Drives a counter store through a few dispatches, then overlaps a slow
//! dispatch with a fast one in each dispatch mode.

use action_store_core::Action;
use action_store_runtime::{DispatchMode, Store, StoreConfig};
use action_store_testing::StateRecorder;
use counter::{CounterOp, counter_actions};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SLOW_DELAY: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "counter=debug,action_store_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("=== Counter Demo: action-store ===\n");

    let store = Store::with_config(
        0,
        counter_actions(SLOW_DELAY)?,
        StoreConfig::default().with_name("counter"),
    );
    let _printer = store.subscribe(|count| println!("  subscriber saw {count}"));
    let doubled = store.select(|count| count * 2);

    for (op, n) in [(CounterOp::Add, 5), (CounterOp::Sub, 2), (CounterOp::Div, 0)] {
        println!("\n>>> Dispatching: {op} {n}");
        match store.dispatch(Action::new(op, n)).await {
            Ok(()) => println!("Count: {}, doubled: {}", store.get(), doubled.get()),
            Err(error) => println!("Dispatch failed: {error}"),
        }
    }

    println!("\n>>> Dispatching: {} 3", CounterOp::Mul);
    if let Err(error) = store.dispatch(Action::new(CounterOp::Mul, 3)).await {
        println!("Dispatch failed: {error}");
    }

    let wire = r#"{"type": "RESET", "payload": 0}"#;
    println!("\n>>> Dispatching from JSON: {wire}");
    store.dispatch(Action::from_json(wire)?).await?;

    println!("\n=== Overlapping dispatches ===");
    for mode in [DispatchMode::Concurrent, DispatchMode::Serialized] {
        let final_count = overlap(mode).await?;
        println!("{mode:?}: SLOW_ADD 1 and ADD 1 from 0 end at {final_count}");
    }

    Ok(())
}

/// Start a slow increment, then a fast one, and report the final count
async fn overlap(mode: DispatchMode) -> anyhow::Result<i64> {
    let config = StoreConfig::default()
        .with_name(format!("{mode:?}").to_lowercase())
        .with_dispatch_mode(mode);
    let store = Store::with_config(0, counter_actions(SLOW_DELAY)?, config);
    let history = StateRecorder::attach(&store);

    let slow = store.dispatch(Action::new(CounterOp::SlowAdd, 1));
    let fast = store.dispatch(Action::new(CounterOp::Add, 1));
    let (slow, fast) = tokio::join!(slow, fast);
    slow?;
    fast?;

    tracing::debug!(history = ?history.values(), "Overlap finished");
    Ok(store.get())
}
