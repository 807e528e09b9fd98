//! A value plus the callbacks interested in it.
//!
//! [`Observable`] is the state cell underneath both [`Store`](crate::Store)
//! and [`Selector`](crate::Selector). Publishing replaces the value and then
//! calls every subscriber synchronously, in subscription order, with the new
//! value.
//!
//! Callbacks run outside the subscriber-list lock, so a callback may
//! subscribe or drop subscriptions. Publication is serialized by a re-entrant
//! lock: publishers on other threads wait, while a callback that publishes to
//! the same observable proceeds immediately. In that nested case the
//! remaining outer callbacks still receive the older value.

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use smallvec::SmallVec;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Read-only access to an observable value
///
/// Implemented by [`Observable`], [`Store`](crate::Store) and
/// [`Selector`](crate::Selector), so a selector can be derived from any of
/// them.
pub trait Readable<T> {
    /// Clone of the current value
    fn get(&self) -> T;

    /// Read the current value through a closure
    fn state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R;

    /// Register a callback for future publications only
    fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;

    /// Register a callback, calling it immediately with the current value
    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static;

    /// Read the current value and register a callback for future
    /// publications, with no publication landing in between
    ///
    /// `init` sees the current value and returns a result along with the
    /// callback to register.
    fn observe_with<X, F, G>(&self, init: G) -> (X, Subscription)
    where
        G: FnOnce(&T) -> (X, F),
        F: Fn(&T) + Send + Sync + 'static;
}

/// Handle to a registered callback
///
/// Dropping the handle (or calling [`Subscription::unsubscribe`]) removes the
/// callback. The handle holds only a weak reference to the subscriber list,
/// so it never keeps a store alive.
#[must_use = "dropping a Subscription immediately unsubscribes its callback"]
pub struct Subscription {
    id: u64,
    subscribers: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// A handle attached to nothing
    pub const fn detached() -> Self {
        Self {
            id: 0,
            subscribers: None,
        }
    }

    /// Remove the callback now
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Whether the callback is still registered with a live observable
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscribers
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|subscribers| subscribers.contains(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.take().as_ref().and_then(Weak::upgrade) {
            subscribers.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Type-erased view of a subscriber list, so [`Subscription`] is not generic
trait Detach: Send + Sync {
    fn detach(&self, id: u64);
    fn contains(&self, id: u64) -> bool;
}

struct Subscribers<T> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback<T>)>>,
}

impl<T> Subscribers<T> {
    fn new() -> Self {
        Self {
            // 0 is reserved for detached handles
            next_id: AtomicU64::new(1),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    fn register(&self, callback: Callback<T>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.callbacks.lock().push((id, callback));
        id
    }

    fn snapshot(&self) -> SmallVec<[Callback<T>; 8]> {
        self.callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect()
    }

    fn len(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl<T: 'static> Detach for Subscribers<T> {
    fn detach(&self, id: u64) {
        self.callbacks.lock().retain(|(registered, _)| *registered != id);
    }

    fn contains(&self, id: u64) -> bool {
        self.callbacks
            .lock()
            .iter()
            .any(|(registered, _)| *registered == id)
    }
}

/// A value plus the callbacks interested in it
///
/// # Example
///
/// ```
/// use action_store_runtime::Observable;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicI64, Ordering};
///
/// let count = Observable::new(1);
/// let seen = Arc::new(AtomicI64::new(0));
///
/// let sink = Arc::clone(&seen);
/// let subscription = count.subscribe(move |value| sink.store(*value, Ordering::SeqCst));
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
///
/// count.update(|value| value + 1);
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
///
/// drop(subscription);
/// count.set(10);
/// assert_eq!(seen.load(Ordering::SeqCst), 2);
/// ```
pub struct Observable<T> {
    value: RwLock<T>,
    publishing: ReentrantMutex<()>,
    subscribers: Arc<Subscribers<T>>,
}

impl<T> Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an observable holding `initial`
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            publishing: ReentrantMutex::new(()),
            subscribers: Arc::new(Subscribers::new()),
        }
    }

    /// Clone of the current value
    #[must_use]
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Read the current value through a closure
    pub fn state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }

    /// Replace the value and notify every subscriber
    ///
    /// There is no equality check: subscribers are notified even when the new
    /// value equals the old one.
    pub fn set(&self, value: T) {
        let _publishing = self.publishing.lock();
        *self.value.write() = value.clone();
        self.notify(&value);
    }

    /// Replace the value with `f(current)` and notify every subscriber
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let _publishing = self.publishing.lock();
        let next = f(&self.value.read());
        self.set(next);
    }

    /// Register a callback for future publications only
    pub fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.subscribers.register(Arc::new(callback));
        self.handle(id)
    }

    /// Register a callback, calling it immediately with the current value
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        // Held so no publication lands between registration and first delivery
        let _publishing = self.publishing.lock();
        let callback: Callback<T> = Arc::new(callback);
        let id = self.subscribers.register(Arc::clone(&callback));
        let current = self.get();
        callback(&current);
        self.handle(id)
    }

    /// Read the current value and register a callback, atomically with
    /// respect to publication
    pub fn observe_with<X, F, G>(&self, init: G) -> (X, Subscription)
    where
        G: FnOnce(&T) -> (X, F),
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _publishing = self.publishing.lock();
        let (result, callback) = init(&self.value.read());
        let id = self.subscribers.register(Arc::new(callback));
        (result, self.handle(id))
    }

    /// Number of registered callbacks
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    fn notify(&self, value: &T) {
        for callback in self.subscribers.snapshot() {
            callback(value);
        }
    }

    fn handle(&self, id: u64) -> Subscription {
        let subscribers: Weak<dyn Detach> = Arc::downgrade(&self.subscribers) as Weak<dyn Detach>;
        Subscription {
            id,
            subscribers: Some(subscribers),
        }
    }
}

impl<T> Readable<T> for Observable<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Self::get(self)
    }

    fn state<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        Self::state(self, f)
    }

    fn observe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::observe(self, callback)
    }

    fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::subscribe(self, callback)
    }

    fn observe_with<X, F, G>(&self, init: G) -> (X, Subscription)
    where
        G: FnOnce(&T) -> (X, F),
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::observe_with(self, init)
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.value.read())
            .field("subscribers", &self.subscribers.callbacks.lock().len())
            .finish()
    }
}
