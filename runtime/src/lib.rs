//! # Action Store Runtime
//!
//! Runtime implementation for the action-store dispatch layer.
//!
//! This crate wires an [`ActionMap`](action_store_core::ActionMap) to a
//! subscribable state cell and derives read-only views from it.
//!
//! ## Core Components
//!
//! - **Observable**: A value plus the callbacks interested in it
//! - **Store**: Owns the state cell and the action map, dispatches actions
//! - **Selector**: A read-only projection of a store (or of another selector)
//!
//! ## Example
//!
//! ```
//! use action_store_core::{action_types, Action, ActionMap};
//! use action_store_runtime::Store;
//!
//! action_types! {
//!     pub enum Op { Add => "ADD", Sub => "SUB" }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let map = ActionMap::<Op, i64, i64>::builder()
//!     .on(Op::Add, |state, n| state + n)
//!     .on(Op::Sub, |state, n| state - n)
//!     .build()?;
//!
//! let store = Store::new(0, map);
//! let doubled = store.select(|state| state * 2);
//!
//! store.dispatch(Action::new(Op::Add, 5)).await?;
//! store.dispatch(Action::new(Op::Sub, 2)).await?;
//!
//! assert_eq!(store.get(), 3);
//! assert_eq!(doubled.get(), 6);
//! # Ok(())
//! # }
//! ```

/// Observable values, the `Readable` trait and subscriptions
pub mod observable;

/// Selectors - derived read-only views
pub mod selector;

/// Store - state cell plus action dispatch
pub mod store;

/// Prometheus metrics for observability
pub mod metrics;

pub use error::DispatchError;
pub use observable::{Observable, Readable, Subscription};
pub use selector::Selector;
pub use store::{Dispatch, Store};

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while dispatching an action
    ///
    /// A failed dispatch never changes state and never notifies subscribers.
    #[derive(Error, Debug)]
    pub enum DispatchError {
        /// The action's type has no handler in the store's action map
        #[error("Action type \"{0}\" is not defined in the action map")]
        UnknownActionType(&'static str),

        /// The handler failed
        ///
        /// The handler's error is carried unchanged; `Display` and `source()`
        /// are those of the original error.
        #[error(transparent)]
        Handler(anyhow::Error),
    }

    impl DispatchError {
        /// Whether this is an unknown action type
        #[must_use]
        pub const fn is_unknown_action_type(&self) -> bool {
            matches!(self, Self::UnknownActionType(_))
        }

        /// The handler's error, if the handler failed
        #[must_use]
        pub const fn handler_error(&self) -> Option<&anyhow::Error> {
            match self {
                Self::Handler(error) => Some(error),
                Self::UnknownActionType(_) => None,
            }
        }
    }
}

/// How a store orders overlapping dispatches
///
/// # Modes
///
/// - **Concurrent**: No ordering (default). Each dispatch snapshots state when
///   it is called; a slow handler publishes a result computed from a stale
///   snapshot and overwrites whatever was published in the meantime.
/// - **Serialized**: Dispatches queue on a per-store FIFO lock and each one
///   snapshots state only once the previous dispatch has published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// Overlapping dispatches may lose updates
    #[default]
    Concurrent,

    /// Dispatches apply one at a time, in the order they are first polled
    Serialized,
}

/// Configuration for Store behavior
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name used in tracing spans and metric labels
    pub name: Option<String>,
    /// Ordering of overlapping dispatches
    pub dispatch_mode: DispatchMode,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(name: Option<String>, dispatch_mode: DispatchMode) -> Self {
        Self {
            name,
            dispatch_mode,
        }
    }

    /// Set the store name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the dispatch mode
    #[must_use]
    pub const fn with_dispatch_mode(mut self, dispatch_mode: DispatchMode) -> Self {
        self.dispatch_mode = dispatch_mode;
        self
    }

    /// Name to report in spans and metrics (`"store"` when unnamed)
    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_concurrent_and_unnamed() {
        let config = StoreConfig::default();
        assert_eq!(config.dispatch_mode, DispatchMode::Concurrent);
        assert_eq!(config.label(), "store");
    }

    #[test]
    fn builder_sets_fields() {
        let config = StoreConfig::default()
            .with_name("cart")
            .with_dispatch_mode(DispatchMode::Serialized);
        assert_eq!(
            config,
            StoreConfig::new(Some("cart".to_string()), DispatchMode::Serialized)
        );
        assert_eq!(config.label(), "cart");
    }

    #[test]
    fn dispatch_error_messages() {
        let unknown = DispatchError::UnknownActionType("MUL");
        assert_eq!(
            unknown.to_string(),
            "Action type \"MUL\" is not defined in the action map"
        );
        assert!(unknown.is_unknown_action_type());
        assert!(unknown.handler_error().is_none());

        let failed = DispatchError::Handler(anyhow::anyhow!("boom"));
        assert_eq!(failed.to_string(), "boom");
        assert!(!failed.is_unknown_action_type());
    }
}
