//! # Action Store Core
//!
//! Core types for the action-store dispatch layer.
//!
//! This crate provides the pieces a store is built from. It does not hold any
//! state itself; the runtime crate wires these tables to a subscribable state
//! cell.
//!
//! ## Core Concepts
//!
//! - **Action Type**: A closed set of tags, declared once as an enum
//! - **Action**: A tag plus the payload that goes with it
//! - **Handler**: `(State, Payload) → State`, synchronous or asynchronous, possibly failing
//! - **Action Map**: A table from every tag to the handler responsible for it
//!
//! ## Example
//!
//! ```
//! use action_store_core::{action_types, Action, ActionMap};
//!
//! action_types! {
//!     /// Counter operations
//!     pub enum CounterOp {
//!         Add => "ADD",
//!         Sub => "SUB",
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let map = ActionMap::<CounterOp, i64, i64>::builder()
//!     .on(CounterOp::Add, |state, payload| state + payload)
//!     .on(CounterOp::Sub, |state, payload| state - payload)
//!     .build()?;
//!
//! let action = Action::new(CounterOp::Add, 5);
//! assert!(map.contains(action.action_type()));
//! # Ok(())
//! # }
//! ```

// Re-export commonly used types
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Declarative macros for declaring action type enums
pub mod action_macros;

/// Action module - tagged values submitted to a store
pub mod action;

/// Action map module - the table from action type to handler
pub mod action_map;

/// Error types for action construction and map building
pub mod error;

/// Handler module - the functions that compute the next state
pub mod handler;

pub use action::{Action, ActionType};
pub use action_map::{ActionMap, ActionMapBuilder};
pub use error::{ActionError, MapConstructionError};
pub use handler::{Handler, HandlerError, HandlerFuture};
