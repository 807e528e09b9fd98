//! # Counter Demo
//!
//! A counter driven through an action map.
//!
//! This demo showcases:
//! - Declaring a closed set of action types
//! - Synchronous, fallible and asynchronous handlers
//! - Store dispatch and subscriptions
//! - Selectors derived from the store
//!
//! ## Example
//!
//! ```no_run
//! use action_store_core::Action;
//! use action_store_runtime::Store;
//! use counter::{counter_actions, CounterOp};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::new(0, counter_actions(Duration::from_millis(10))?);
//! let doubled = store.select(|count| count * 2);
//!
//! store.dispatch(Action::new(CounterOp::Add, 5)).await?;
//! assert_eq!(doubled.get(), 10);
//! # Ok(())
//! # }
//! ```

use action_store_core::{ActionMap, MapConstructionError, action_types};
use std::time::Duration;
use thiserror::Error;

action_types! {
    /// Counter operations
    ///
    /// `Mul` is declared but has no handler, so dispatching it fails.
    pub enum CounterOp {
        /// Add the payload
        Add => "ADD",
        /// Subtract the payload
        Sub => "SUB",
        /// Divide by the payload, failing on zero or overflow
        Div => "DIV",
        /// Add the payload after a delay
        SlowAdd => "SLOW_ADD",
        /// Reset to zero, ignoring the payload
        Reset => "RESET",
        /// Multiply by the payload (no handler)
        Mul => "MUL",
    }
}

/// Errors raised by counter handlers
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterError {
    /// Division by zero was requested
    #[error("cannot divide the counter by zero")]
    DivideByZero,
    /// The quotient does not fit in the counter (`i64::MIN / -1`)
    #[error("dividing {count} by {divisor} overflows the counter")]
    Overflow {
        /// Counter value before the division
        count: i64,
        /// Requested divisor
        divisor: i64,
    },
}

/// Build the counter's action map
///
/// `SLOW_ADD` reads its snapshot when dispatched and publishes after
/// `slow_delay`, so overlapping it with other dispatches shows lost updates.
///
/// # Errors
///
/// Returns [`MapConstructionError`] if the action map cannot be built.
pub fn counter_actions(
    slow_delay: Duration,
) -> Result<ActionMap<CounterOp, i64, i64>, MapConstructionError> {
    ActionMap::<CounterOp, i64, i64>::builder()
        .on(CounterOp::Add, |count, n| count + n)
        .on(CounterOp::Sub, |count, n| count - n)
        .try_on(CounterOp::Div, |count, n| {
            if n == 0 {
                return Err(CounterError::DivideByZero.into());
            }
            count.checked_div(n).ok_or_else(|| {
                CounterError::Overflow {
                    count,
                    divisor: n,
                }
                .into()
            })
        })
        .on_async(CounterOp::SlowAdd, move |count, n| async move {
            tokio::time::sleep(slow_delay).await;
            tracing::trace!(count, n, "Slow add finished");
            Ok(count + n)
        })
        .on(CounterOp::Reset, |_, _| 0)
        .build()
}
