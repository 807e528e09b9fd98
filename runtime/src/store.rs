//! The Store - a state cell driven by an action map.
//!
//! `dispatch` looks the action's handler up, runs it against a snapshot of
//! the current state and, once the handler completes, publishes its result as
//! the new state. Subscribers are notified synchronously inside that publish
//! step.
//!
//! # Overlapping dispatches
//!
//! In [`DispatchMode::Concurrent`] (the default) nothing orders two
//! dispatches against each other. Each one snapshots state when `dispatch` is
//! called, so a slow handler can publish a result computed from a stale
//! snapshot and overwrite a newer one:
//!
//! ```text
//! dispatch A ── snapshot 0 ── handler suspends ─────────────── publish f(0)
//! dispatch B ──── snapshot 0 ── publish g(0)
//! ```
//!
//! The final state above is `f(0)`, and `g(0)` is lost. Stores that need
//! every update applied use [`DispatchMode::Serialized`].

use crate::error::DispatchError;
use crate::metrics::StoreMetrics;
use crate::observable::{Observable, Readable, Subscription};
use crate::selector::Selector;
use crate::{DispatchMode, StoreConfig};
use action_store_core::action::{Action, ActionType};
use action_store_core::action_map::ActionMap;
use action_store_core::handler::HandlerFuture;
use futures::future::{self, BoxFuture};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Future returned by [`Store::dispatch`]
///
/// Resolves once the handler's result has been published, or fails with the
/// reason nothing was published. It cannot be cancelled from outside; dropping
/// it before completion means its result is never published.
pub type Dispatch = BoxFuture<'static, Result<(), DispatchError>>;

/// The Store - runtime coordinator for an action map
///
/// The Store manages:
/// 1. State (an [`Observable`] cell, written only by `dispatch`)
/// 2. The action map (one handler per action type)
/// 3. Subscribers and derived selectors
///
/// Cloning a Store is cheap and yields a handle to the same state.
///
/// # Type Parameters
///
/// - `T`: Action type tag set
/// - `S`: State type
/// - `P`: Payload type
///
/// # Example
///
/// ```ignore
/// let store = Store::new(CartState::default(), cart_actions()?);
///
/// let _subscription = store.subscribe(|cart| render(cart));
/// store.dispatch(Action::new(CartOp::AddItem, item)).await?;
/// ```
pub struct Store<T, S, P> {
    inner: Arc<StoreInner<T, S, P>>,
}

struct StoreInner<T, S, P> {
    state: Observable<S>,
    action_map: ActionMap<T, S, P>,
    config: StoreConfig,
    /// Turn-taking lock for `DispatchMode::Serialized` (tokio's mutex is FIFO)
    queue: tokio::sync::Mutex<()>,
}

impl<T, S, P> Store<T, S, P>
where
    T: ActionType,
    S: Clone + Send + Sync + 'static,
    P: Send + 'static,
{
    /// Create a new store with an initial state and an action map
    ///
    /// Uses [`StoreConfig::default`]: unnamed, concurrent dispatch.
    #[must_use]
    pub fn new(initial_state: S, action_map: ActionMap<T, S, P>) -> Self {
        Self::with_config(initial_state, action_map, StoreConfig::default())
    }

    /// Create a new store with custom configuration
    ///
    /// # Example
    ///
    /// ```ignore
    /// let config = StoreConfig::default()
    ///     .with_name("cart")
    ///     .with_dispatch_mode(DispatchMode::Serialized);
    ///
    /// let store = Store::with_config(CartState::default(), actions, config);
    /// ```
    #[must_use]
    pub fn with_config(
        initial_state: S,
        action_map: ActionMap<T, S, P>,
        config: StoreConfig,
    ) -> Self {
        tracing::debug!(
            store = config.label(),
            mode = ?config.dispatch_mode,
            handlers = action_map.len(),
            "Creating store"
        );

        Self {
            inner: Arc::new(StoreInner {
                state: Observable::new(initial_state),
                action_map,
                config,
                queue: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Clone of the current state
    #[must_use]
    pub fn get(&self) -> S {
        self.inner.state.get()
    }

    /// Read current state via a closure
    ///
    /// ```ignore
    /// let item_count = store.state(|cart| cart.items.len());
    /// ```
    pub fn state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        self.inner.state.state(f)
    }

    /// Register a callback, calling it now with the current state and again
    /// after every successful dispatch
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.inner.state.subscribe(callback)
    }

    /// Number of registered callbacks, selectors included
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.state.subscriber_count()
    }

    /// The store's action map
    #[must_use]
    pub fn action_map(&self) -> &ActionMap<T, S, P> {
        &self.inner.action_map
    }

    /// The store's configuration
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Derive a read-only view of this store
    ///
    /// Shorthand for [`Selector::new`].
    pub fn select<R, F>(&self, projection: F) -> Selector<R>
    where
        R: Clone + Send + Sync + 'static,
        F: Fn(&S) -> R + Send + Sync + 'static,
    {
        Selector::new(self, projection)
    }

    /// Dispatch an action to the store
    ///
    /// 1. Looks up the handler for the action's type
    /// 2. Calls it with a snapshot of the current state and the payload
    /// 3. Awaits the handler
    /// 4. Publishes the result as the new state (full replacement, no
    ///    equality check) and notifies every subscriber
    ///
    /// In [`DispatchMode::Concurrent`], steps 1 and 2 happen before this
    /// method returns; a synchronous handler has already run by then. In
    /// [`DispatchMode::Serialized`] they happen once the returned future gets
    /// its turn in the store's queue.
    ///
    /// # Errors
    ///
    /// The returned future fails with:
    /// - [`DispatchError::UnknownActionType`] if no handler is registered for
    ///   the action's type
    /// - [`DispatchError::Handler`] carrying the handler's own error
    ///
    /// Either way state is left as it was and no subscriber is notified.
    ///
    /// # Example
    ///
    /// ```ignore
    /// store.dispatch(Action::new(CounterOp::Add, 5)).await?;
    /// assert_eq!(store.get(), 5);
    /// ```
    pub fn dispatch(&self, action: Action<T, P>) -> Dispatch {
        let (action_type, payload) = action.into_parts();
        let label = self.inner.config.label();
        let span = tracing::debug_span!(
            "store_dispatch",
            store = label,
            action_type = action_type.name()
        );
        let _enter = span.enter();

        StoreMetrics::record_dispatch(label);

        let Some(handler) = self.inner.action_map.get(action_type).cloned() else {
            tracing::debug!("Action type not defined in the action map");
            StoreMetrics::record_unknown_action_type(label);
            return Box::pin(future::ready(Err(DispatchError::UnknownActionType(
                action_type.name(),
            ))));
        };

        let inner = Arc::clone(&self.inner);
        match self.inner.config.dispatch_mode {
            DispatchMode::Concurrent => {
                let started = Instant::now();
                let pending = handler.call(self.get(), payload);
                tracing::trace!("Handler invoked");
                Box::pin(
                    async move { inner.complete(pending, started).await }.instrument(span.clone()),
                )
            }
            DispatchMode::Serialized => Box::pin(
                async move {
                    let _turn = inner.queue.lock().await;
                    tracing::trace!("Acquired dispatch queue");
                    let started = Instant::now();
                    let pending = handler.call(inner.state.get(), payload);
                    inner.complete(pending, started).await
                }
                .instrument(span.clone()),
            ),
        }
    }
}

impl<T, S, P> StoreInner<T, S, P>
where
    S: Clone + Send + Sync + 'static,
{
    /// Await the handler, then publish its result or surface its failure
    async fn complete(
        &self,
        pending: HandlerFuture<S>,
        started: Instant,
    ) -> Result<(), DispatchError> {
        let label = self.config.label();
        let outcome = pending.await;
        StoreMetrics::record_handler(label, started.elapsed(), outcome.is_ok());

        match outcome {
            Ok(next) => {
                self.state.set(next);
                let subscribers = self.state.subscriber_count();
                StoreMetrics::record_publish(label, subscribers);
                tracing::debug!(subscribers, "Published new state");
                Ok(())
            }
            Err(error) => {
                tracing::debug!("Handler failed, state left unchanged");
                Err(DispatchError::Handler(error))
            }
        }
    }
}

impl<T, S, P> Clone for Store<T, S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, S, P> Readable<S> for Store<T, S, P>
where
    T: ActionType,
    S: Clone + Send + Sync + 'static,
    P: Send + 'static,
{
    fn get(&self) -> S {
        Self::get(self)
    }

    fn state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&S) -> R,
    {
        Self::state(self, f)
    }

    fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.inner.state.observe(callback)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        Self::subscribe(self, callback)
    }

    fn observe_with<X, F, G>(&self, init: G) -> (X, Subscription)
    where
        G: FnOnce(&S) -> (X, F),
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.inner.state.observe_with(init)
    }
}

impl<T, S, P> fmt::Debug for Store<T, S, P>
where
    T: ActionType,
    S: fmt::Debug + 'static,
    P: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.inner.config.label())
            .field("state", &self.inner.state)
            .field("action_map", &self.inner.action_map)
            .field("dispatch_mode", &self.inner.config.dispatch_mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;
    use parking_lot::Mutex;

    action_store_core::action_types! {
        enum Op {
            Add => "ADD",
            Sub => "SUB",
            Fail => "FAIL",
            Mul => "MUL",
        }
    }

    fn arithmetic() -> ActionMap<Op, i64, i64> {
        ActionMap::<Op, i64, i64>::builder()
            .on(Op::Add, |state, n| state + n)
            .on(Op::Sub, |state, n| state - n)
            .try_on(Op::Fail, |_, _| Err(anyhow::anyhow!("handler refused")))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn dispatch_publishes_handler_result() {
        let store = Store::new(0, arithmetic());

        store.dispatch(Action::new(Op::Add, 5)).await.unwrap();
        assert_eq!(store.get(), 5);

        store.dispatch(Action::new(Op::Sub, 2)).await.unwrap();
        assert_eq!(store.get(), 3);
    }

    #[tokio::test]
    async fn subscribers_see_initial_state_then_each_publication() {
        let store = Store::new(0, arithmetic());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _subscription = store.subscribe(move |state| sink.lock().push(*state));

        store.dispatch(Action::new(Op::Add, 5)).await.unwrap();
        store.dispatch(Action::new(Op::Add, 0)).await.unwrap();

        assert_eq!(*seen.lock(), vec![0, 5, 5]);
    }

    #[tokio::test]
    async fn unknown_action_type_leaves_state_untouched() {
        let store = Store::new(4, arithmetic());
        let notifications = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&notifications);
        let _subscription = store.observe(move |_| *counter.lock() += 1);

        let err = store.dispatch(Action::new(Op::Mul, 3)).await.unwrap_err();

        assert!(matches!(err, DispatchError::UnknownActionType("MUL")));
        assert_eq!(store.get(), 4);
        assert_eq!(*notifications.lock(), 0);
    }

    #[tokio::test]
    async fn handler_failure_propagates_without_publishing() {
        let store = Store::new(4, arithmetic());
        let notifications = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&notifications);
        let _subscription = store.observe(move |_| *counter.lock() += 1);

        let err = store.dispatch(Action::new(Op::Fail, 0)).await.unwrap_err();

        match err {
            DispatchError::Handler(error) => assert_eq!(error.to_string(), "handler refused"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get(), 4);
        assert_eq!(*notifications.lock(), 0);
    }

    #[tokio::test]
    async fn synchronous_handler_runs_when_dispatch_is_called() {
        let store = Store::new(0, arithmetic());

        let pending = store.dispatch(Action::new(Op::Add, 1));
        // Handler already ran, but nothing is published until the future is polled
        assert_eq!(store.get(), 0);

        pending.await.unwrap();
        assert_eq!(store.get(), 1);
    }

    #[tokio::test]
    async fn dropped_dispatch_publishes_nothing() {
        let store = Store::new(0, arithmetic());
        drop(store.dispatch(Action::new(Op::Add, 1)));
        assert_eq!(store.get(), 0);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let store = Store::new(0, arithmetic());
        let other = store.clone();

        other.dispatch(Action::new(Op::Add, 9)).await.unwrap();
        assert_eq!(store.get(), 9);
        assert_eq!(store.state(|state| state * 2), 18);
    }

    #[test]
    fn debug_lists_registered_action_types() {
        let store = Store::with_config(1, arithmetic(), StoreConfig::default().with_name("calc"));
        let rendered = format!("{store:?}");
        assert!(rendered.contains("calc"));
        assert!(rendered.contains("\"ADD\""));
        assert!(!rendered.contains("\"MUL\""));
    }
}
