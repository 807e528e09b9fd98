//! The action map: one optional handler per declared action type.
//!
//! The table is a `Vec` indexed by [`ActionType::index`], sized to
//! `ActionType::ALL`. Tags without a handler are allowed; dispatching one is
//! a runtime error reported by the store. Registering the same tag twice keeps
//! the last handler.

use crate::action::ActionType;
use crate::error::MapConstructionError;
use crate::handler::{self, HandlerError, SharedHandler};
use smallvec::SmallVec;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

/// Immutable table from action type to handler
///
/// Every handler in a map accepts the same payload type `P`. When action
/// types need payloads of different shapes, make `P` an enum with one variant
/// per shape and have each handler match on the variant it expects:
///
/// ```
/// use action_store_core::{action_types, ActionMap};
///
/// action_types! {
///     pub enum CartOp { AddItem => "ADD_ITEM", Clear => "CLEAR" }
/// }
///
/// pub enum CartPayload {
///     Item { name: String, price: u32 },
///     Nothing,
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let map = ActionMap::<CartOp, Vec<String>, CartPayload>::builder()
///     .try_on(CartOp::AddItem, |mut items, payload| match payload {
///         CartPayload::Item { name, .. } => {
///             items.push(name);
///             Ok(items)
///         }
///         CartPayload::Nothing => Err(anyhow::anyhow!("ADD_ITEM needs an item")),
///     })
///     .on(CartOp::Clear, |_, _| Vec::new())
///     .build()?;
///
/// assert_eq!(map.len(), 2);
/// # Ok(())
/// # }
/// ```
///
/// # Type Parameters
///
/// - `T`: The closed set of action types
/// - `S`: The state type handlers produce
/// - `P`: The payload type handlers accept
pub struct ActionMap<T, S, P> {
    handlers: Vec<Option<SharedHandler<S, P>>>,
    _action_types: PhantomData<fn() -> T>,
}

impl<T, S, P> ActionMap<T, S, P>
where
    T: ActionType,
    S: 'static,
    P: 'static,
{
    /// Start building an action map
    #[must_use]
    pub const fn builder() -> ActionMapBuilder<T, S, P> {
        ActionMapBuilder {
            entries: Vec::new(),
        }
    }

    /// Build an action map from `(tag, handler)` pairs
    ///
    /// Later pairs overwrite earlier ones with the same tag.
    ///
    /// # Errors
    ///
    /// Returns [`MapConstructionError`] naming the first tag whose index does
    /// not fit the table.
    pub fn from_handlers<I>(handlers: I) -> Result<Self, MapConstructionError>
    where
        I: IntoIterator<Item = (T, SharedHandler<S, P>)>,
    {
        let capacity = T::ALL.len();
        let mut table: Vec<Option<SharedHandler<S, P>>> =
            std::iter::repeat_with(|| None).take(capacity).collect();

        for (action_type, handler) in handlers {
            let index = action_type.index();
            let slot = table.get_mut(index).ok_or(MapConstructionError {
                action_type: action_type.name(),
                index,
                capacity,
            })?;
            *slot = Some(handler);
        }

        Ok(Self {
            handlers: table,
            _action_types: PhantomData,
        })
    }

    /// Look up the handler registered for `action_type`
    #[must_use]
    pub fn get(&self, action_type: T) -> Option<&SharedHandler<S, P>> {
        self.handlers
            .get(action_type.index())
            .and_then(Option::as_ref)
    }

    /// Whether a handler is registered for `action_type`
    #[must_use]
    pub fn contains(&self, action_type: T) -> bool {
        self.get(action_type).is_some()
    }

    /// Number of registered handlers
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether no handler is registered at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered action types, in declaration order
    #[must_use]
    pub fn action_types(&self) -> SmallVec<[T; 8]> {
        T::ALL
            .iter()
            .copied()
            .filter(|action_type| self.contains(*action_type))
            .collect()
    }
}

impl<T, S, P> Clone for ActionMap<T, S, P> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
            _action_types: PhantomData,
        }
    }
}

impl<T, S, P> fmt::Debug for ActionMap<T, S, P>
where
    T: ActionType,
    S: 'static,
    P: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.action_types().iter().map(|action_type| action_type.name()))
            .finish()
    }
}

/// Builder for [`ActionMap`]
///
/// # Example
///
/// ```
/// use action_store_core::{action_types, ActionMap};
///
/// action_types! {
///     pub enum Op { Add => "ADD", Div => "DIV", Load => "LOAD" }
/// }
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let map = ActionMap::<Op, i64, i64>::builder()
///     .on(Op::Add, |state, n| state + n)
///     .try_on(Op::Div, |state, n| {
///         state.checked_div(n).ok_or_else(|| anyhow::anyhow!("division by zero"))
///     })
///     .on_async(Op::Load, |_state, n| async move { Ok(n) })
///     .build()?;
///
/// assert_eq!(map.len(), 3);
/// # Ok(())
/// # }
/// ```
pub struct ActionMapBuilder<T, S, P> {
    entries: Vec<(T, SharedHandler<S, P>)>,
}

impl<T, S, P> ActionMapBuilder<T, S, P>
where
    T: ActionType,
    S: Send + 'static,
    P: 'static,
{
    /// Register a synchronous handler that cannot fail
    #[must_use]
    pub fn on<F>(self, action_type: T, f: F) -> Self
    where
        F: Fn(S, P) -> S + Send + Sync + 'static,
    {
        self.insert(action_type, handler::from_fn(f))
    }

    /// Register a synchronous handler that may fail
    #[must_use]
    pub fn try_on<F>(self, action_type: T, f: F) -> Self
    where
        F: Fn(S, P) -> Result<S, HandlerError> + Send + Sync + 'static,
    {
        self.insert(action_type, handler::try_from_fn(f))
    }

    /// Register an asynchronous handler
    #[must_use]
    pub fn on_async<F, Fut>(self, action_type: T, f: F) -> Self
    where
        F: Fn(S, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<S, HandlerError>> + Send + 'static,
    {
        self.insert(action_type, handler::from_async(f))
    }

    /// Register an already shared handler, keeping its identity
    #[must_use]
    pub fn insert(mut self, action_type: T, handler: SharedHandler<S, P>) -> Self {
        self.entries.push((action_type, handler));
        self
    }

    /// Finish building
    ///
    /// # Errors
    ///
    /// Returns [`MapConstructionError`] if a tag's index does not fit the table.
    pub fn build(self) -> Result<ActionMap<T, S, P>, MapConstructionError> {
        ActionMap::from_handlers(self.entries)
    }
}
