//! Handlers compute the next state for one action type.
//!
//! A handler receives an owned snapshot of the current state together with
//! the action's payload and returns the replacement state. Handlers may finish
//! immediately or suspend; either way the store sees a [`HandlerFuture`].
//!
//! Closures are adapted with [`from_fn`] (synchronous, infallible),
//! [`try_from_fn`] (synchronous, fallible) and [`from_async`] (asynchronous,
//! fallible). The [`ActionMapBuilder`](crate::ActionMapBuilder) methods call
//! these for you.

use futures::future::{self, BoxFuture};
use std::future::Future;
use std::sync::Arc;

/// Error produced by a failing handler
///
/// Handlers fail with arbitrary errors. The store never inspects them and
/// hands them back to the dispatch caller as they are.
pub type HandlerError = anyhow::Error;

/// Future returned by every handler invocation
pub type HandlerFuture<S> = BoxFuture<'static, Result<S, HandlerError>>;

/// Shared, type-erased handler as stored in an action map
pub type SharedHandler<S, P> = Arc<dyn Handler<S, P>>;

/// The Handler trait - computes the next state from a snapshot and a payload
///
/// # Example
///
/// ```
/// use action_store_core::handler::{Handler, HandlerFuture};
///
/// struct Double;
///
/// impl Handler<i64, ()> for Double {
///     fn call(&self, state: i64, _payload: ()) -> HandlerFuture<i64> {
///         Box::pin(async move { Ok(state * 2) })
///     }
/// }
/// ```
pub trait Handler<S, P>: Send + Sync {
    /// Run the handler
    ///
    /// Synchronous work happens before this returns; anything after the first
    /// suspension point runs when the returned future is polled.
    fn call(&self, state: S, payload: P) -> HandlerFuture<S>;
}

/// Adapter for synchronous handlers that cannot fail
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F>(F);

impl<S, P, F> Handler<S, P> for FnHandler<F>
where
    F: Fn(S, P) -> S + Send + Sync,
    S: Send + 'static,
{
    fn call(&self, state: S, payload: P) -> HandlerFuture<S> {
        let next = (self.0)(state, payload);
        Box::pin(future::ready(Ok(next)))
    }
}

/// Adapter for synchronous handlers that may fail
#[derive(Debug, Clone, Copy)]
pub struct TryFnHandler<F>(F);

impl<S, P, F> Handler<S, P> for TryFnHandler<F>
where
    F: Fn(S, P) -> Result<S, HandlerError> + Send + Sync,
    S: Send + 'static,
{
    fn call(&self, state: S, payload: P) -> HandlerFuture<S> {
        Box::pin(future::ready((self.0)(state, payload)))
    }
}

/// Adapter for asynchronous handlers
#[derive(Debug, Clone, Copy)]
pub struct AsyncFnHandler<F>(F);

impl<S, P, F, Fut> Handler<S, P> for AsyncFnHandler<F>
where
    F: Fn(S, P) -> Fut + Send + Sync,
    Fut: Future<Output = Result<S, HandlerError>> + Send + 'static,
{
    fn call(&self, state: S, payload: P) -> HandlerFuture<S> {
        Box::pin((self.0)(state, payload))
    }
}

/// Wrap a synchronous, infallible closure as a shared handler
pub fn from_fn<S, P, F>(f: F) -> SharedHandler<S, P>
where
    F: Fn(S, P) -> S + Send + Sync + 'static,
    S: Send + 'static,
    P: 'static,
{
    Arc::new(FnHandler(f))
}

/// Wrap a synchronous, fallible closure as a shared handler
pub fn try_from_fn<S, P, F>(f: F) -> SharedHandler<S, P>
where
    F: Fn(S, P) -> Result<S, HandlerError> + Send + Sync + 'static,
    S: Send + 'static,
    P: 'static,
{
    Arc::new(TryFnHandler(f))
}

/// Wrap an asynchronous closure as a shared handler
pub fn from_async<S, P, F, Fut>(f: F) -> SharedHandler<S, P>
where
    F: Fn(S, P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<S, HandlerError>> + Send + 'static,
    S: 'static,
    P: 'static,
{
    Arc::new(AsyncFnHandler(f))
}
