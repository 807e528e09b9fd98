//! # Action Store Testing
//!
//! Testing utilities and helpers for the action-store dispatch layer.
//!
//! This crate provides:
//! - [`StateRecorder`]: captures every value a store or selector publishes
//! - [`DispatchTest`]: Given-When-Then harness for a single dispatch
//! - Handler fixtures for slow, gated and failing handlers
//! - Tracing setup for tests
//!
//! ## Example
//!
//! ```ignore
//! use action_store_testing::{handlers, StateRecorder};
//!
//! #[tokio::test]
//! async fn test_counter_flow() {
//!     let store = Store::new(0, counter_actions());
//!     let recorder = StateRecorder::attach(&store);
//!
//!     store.dispatch(Action::new(CounterOp::Add, 5)).await?;
//!
//!     assert_eq!(recorder.values(), vec![0, 5]);
//! }
//! ```

use action_store_runtime::{Readable, Subscription};
use parking_lot::Mutex;
use std::sync::Arc;


pub use dispatch_test::DispatchTest;

/// Records every value published by a store or selector
///
/// Attaching subscribes immediately, so the first recorded value is the
/// source's state at attach time. Dropping the recorder unsubscribes.
pub struct StateRecorder<T> {
    values: Arc<Mutex<Vec<T>>>,
    _subscription: Subscription,
}

impl<T> StateRecorder<T>
where
    T: Clone + Send + 'static,
{
    /// Start recording `source`
    pub fn attach<R: Readable<T>>(source: &R) -> Self {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        let subscription = source.subscribe(move |value: &T| sink.lock().push(value.clone()));

        Self {
            values,
            _subscription: subscription,
        }
    }

    /// Every recorded value, oldest first
    #[must_use]
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    /// Recorded values after the initial one
    #[must_use]
    pub fn publications(&self) -> Vec<T> {
        self.values.lock().iter().skip(1).cloned().collect()
    }

    /// The most recently recorded value
    #[must_use]
    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    /// Number of recorded values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}

/// Handler fixtures
///
/// Ready-made handlers for exercising dispatch timing and failure paths.
pub mod handlers {
    use action_store_core::handler::{self, SharedHandler};
    use std::time::Duration;
    use tokio::sync::watch;

    /// A handler that computes its result immediately, then sleeps before
    /// completing
    ///
    /// The result is derived from the snapshot taken at dispatch time, which
    /// makes the stale-snapshot race reproducible.
    pub fn delayed<S, P, F>(delay: Duration, f: F) -> SharedHandler<S, P>
    where
        F: Fn(S, P) -> S + Send + Sync + 'static,
        S: Send + 'static,
        P: 'static,
    {
        handler::from_async(move |state, payload| {
            let next = f(state, payload);
            async move {
                tokio::time::sleep(delay).await;
                Ok(next)
            }
        })
    }

    /// A handler that computes its result immediately, then waits for
    /// `gate` to open before completing
    pub fn gated<S, P, F>(gate: &Gate, f: F) -> SharedHandler<S, P>
    where
        F: Fn(S, P) -> S + Send + Sync + 'static,
        S: Send + 'static,
        P: 'static,
    {
        let opened = gate.sender.subscribe();
        handler::from_async(move |state, payload| {
            let next = f(state, payload);
            let mut opened = opened.clone();
            async move {
                let released = opened.wait_for(|open| *open).await.is_ok();
                if released {
                    Ok(next)
                } else {
                    Err(anyhow::anyhow!("gate dropped before opening"))
                }
            }
        })
    }

    /// A handler that always fails with `message`
    pub fn failing<S, P>(message: &'static str) -> SharedHandler<S, P>
    where
        S: Send + 'static,
        P: 'static,
    {
        handler::try_from_fn(move |_state, _payload| Err(anyhow::anyhow!(message)))
    }

    /// A latch that holds [`gated`] handlers until opened
    #[derive(Debug)]
    pub struct Gate {
        sender: watch::Sender<bool>,
    }

    impl Gate {
        /// Create a closed gate
        #[must_use]
        pub fn new() -> Self {
            let (sender, _) = watch::channel(false);
            Self { sender }
        }

        /// Release every handler waiting on this gate, now and later
        pub fn open(&self) {
            self.sender.send_replace(true);
        }

        /// Whether the gate has been opened
        #[must_use]
        pub fn is_open(&self) -> bool {
            *self.sender.borrow()
        }
    }

    impl Default for Gate {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Install a tracing subscriber that writes through the test harness
///
/// Honors `RUST_LOG`; defaults to debug output for the action-store crates.
/// Safe to call from every test.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "action_store_runtime=debug,action_store_testing=debug".into()
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use action_store_runtime::Observable;

    #[test]
    fn recorder_captures_initial_and_published_values() {
        let source = Observable::new(1);
        let recorder = StateRecorder::attach(&source);

        source.set(2);
        source.set(3);

        assert_eq!(recorder.values(), vec![1, 2, 3]);
        assert_eq!(recorder.publications(), vec![2, 3]);
        assert_eq!(recorder.last(), Some(3));
        assert_eq!(recorder.len(), 3);
        assert!(!recorder.is_empty());
    }

    #[test]
    fn dropped_recorder_unsubscribes() {
        let source = Observable::new(0);
        let recorder = StateRecorder::attach(&source);
        assert_eq!(source.subscriber_count(), 1);

        drop(recorder);
        assert_eq!(source.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn gated_handler_waits_for_the_gate() {
        let gate = handlers::Gate::new();
        let handler = handlers::gated(&gate, |state: i32, n: i32| state + n);

        let pending = tokio::spawn(handler.call(1, 1));
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        gate.open();
        assert!(gate.is_open());
        assert_eq!(pending.await.unwrap().unwrap(), 2);
    }

    #[tokio::test]
    async fn failing_handler_fails() {
        let handler = handlers::failing::<i32, ()>("nope");
        let err = handler.call(0, ()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_handler_completes_after_delay() {
        let handler =
            handlers::delayed(std::time::Duration::from_secs(5), |state: i32, n: i32| state * n);
        assert_eq!(handler.call(3, 4).await.unwrap(), 12);
    }
}
