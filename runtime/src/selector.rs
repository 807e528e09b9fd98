//! Selectors - derived read-only views.
//!
//! A [`Selector`] runs a pure projection over its source's state and caches
//! the result in its own [`Observable`]. Every time the source publishes,
//! the projection runs again inside the source's notification step and the
//! selector notifies its own subscribers. There is no memoization and no
//! distinct-value check: one source publication means one recomputation and
//! one notification.

use crate::observable::{Observable, Readable, Subscription};
use std::fmt;
use std::sync::Arc;

/// A read-only projection of a store or of another selector
///
/// Cloning a selector shares its cache. When the last clone is dropped the
/// selector detaches from its source.
///
/// # Example
///
/// ```ignore
/// let store = Store::new(CartState::default(), actions);
/// let item_count = store.select(|cart| cart.items.len());
/// let is_empty = Selector::new(&item_count, |count| *count == 0);
/// ```
pub struct Selector<R> {
    inner: Arc<SelectorInner<R>>,
}

struct SelectorInner<R> {
    cache: Arc<Observable<R>>,
    /// Keeps the projection attached to the source
    _source: Subscription,
}

impl<R> Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    /// Derive a selector from `source`
    ///
    /// The projection runs once now and once per source publication after
    /// that.
    pub fn new<S, Src, F>(source: &Src, projection: F) -> Self
    where
        Src: Readable<S>,
        S: 'static,
        F: Fn(&S) -> R + Send + Sync + 'static,
    {
        // The cache exists before the source can publish to it
        let (cache, link) = source.observe_with(|state: &S| {
            let cache = Arc::new(Observable::new(projection(state)));
            let target = Arc::downgrade(&cache);
            let recompute = move |state: &S| {
                if let Some(cache) = target.upgrade() {
                    cache.set(projection(state));
                }
            };
            (cache, recompute)
        });

        Self {
            inner: Arc::new(SelectorInner {
                cache,
                _source: link,
            }),
        }
    }

    /// Clone of the last computed value
    #[must_use]
    pub fn get(&self) -> R {
        self.inner.cache.get()
    }

    /// Read the last computed value through a closure
    pub fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R) -> T,
    {
        self.inner.cache.state(f)
    }

    /// Register a callback, calling it now with the current value and again
    /// after every recomputation
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.inner.cache.subscribe(callback)
    }

    /// Derive a further selector from this one
    pub fn select<U, F>(&self, projection: F) -> Selector<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&R) -> U + Send + Sync + 'static,
    {
        Selector::new(self, projection)
    }
}

impl<R> Clone for Selector<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R> Readable<R> for Selector<R>
where
    R: Clone + Send + Sync + 'static,
{
    fn get(&self) -> R {
        Self::get(self)
    }

    fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R) -> T,
    {
        Self::state(self, f)
    }

    fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.inner.cache.observe(callback)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        Self::subscribe(self, callback)
    }

    fn observe_with<X, F, G>(&self, init: G) -> (X, Subscription)
    where
        G: FnOnce(&R) -> (X, F),
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.inner.cache.observe_with(init)
    }
}

impl<R: fmt::Debug> fmt::Debug for Selector<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}
