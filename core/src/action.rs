//! Actions are tagged values describing an intended state transition.
//!
//! The tag set is closed and declared up front (see
//! [`action_types!`](crate::action_types)); the payload type is whatever the
//! store's handlers accept. An action built in code is always well formed.
//! Actions arriving as strings or JSON are validated here, before they ever
//! reach a store.

use crate::error::ActionError;
use serde::de::DeserializeOwned;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::hash::Hash;

/// A closed set of action type tags
///
/// Implemented by enums declared with [`action_types!`](crate::action_types).
/// `index()` must be unique per tag and smaller than `ALL.len()`; the action
/// map relies on it to lay out its table.
pub trait ActionType:
    Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Every tag, in declaration order
    const ALL: &'static [Self];

    /// Stable string name of the tag (e.g. `"ADD"`)
    fn name(self) -> &'static str;

    /// Dense index of the tag within `ALL`
    fn index(self) -> usize;

    /// Look a tag up by its string name
    #[must_use]
    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tag| tag.name() == name)
    }
}

/// A tagged value submitted to a store
///
/// The payload is moved in as-is: no cloning and no validation of its shape.
///
/// # Example
///
/// ```
/// use action_store_core::{action_types, Action};
///
/// action_types! {
///     pub enum Op { Add => "ADD" }
/// }
///
/// let action = Action::new(Op::Add, 5);
/// assert_eq!(action.action_type(), Op::Add);
/// assert_eq!(*action.payload(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action<T, P> {
    action_type: T,
    payload: P,
}

impl<T: ActionType, P> Action<T, P> {
    /// Create an action from a tag and its payload
    #[must_use]
    pub const fn new(action_type: T, payload: P) -> Self {
        Self {
            action_type,
            payload,
        }
    }

    /// Create an action from a string-typed tag
    ///
    /// # Errors
    ///
    /// - [`ActionError::InvalidType`] if `name` is `None`
    /// - [`ActionError::UnrecognisedType`] if `name` is not a declared tag
    pub fn from_name(name: Option<&str>, payload: P) -> Result<Self, ActionError> {
        let name = name.ok_or(ActionError::InvalidType)?;
        let action_type =
            T::from_name(name).ok_or_else(|| ActionError::UnrecognisedType(name.to_string()))?;
        Ok(Self::new(action_type, payload))
    }

    /// The action's tag
    #[must_use]
    pub const fn action_type(&self) -> T {
        self.action_type
    }

    /// Borrow the payload
    #[must_use]
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Take the payload, dropping the tag
    #[must_use]
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Split the action into its tag and payload
    #[must_use]
    pub fn into_parts(self) -> (T, P) {
        (self.action_type, self.payload)
    }
}

impl<T: ActionType, P: DeserializeOwned> Action<T, P> {
    /// Decode an action from its wire form `{"type": "...", "payload": ...}`
    ///
    /// A missing `payload` field decodes as `null`.
    ///
    /// # Errors
    ///
    /// - [`ActionError::InvalidType`] if `type` is missing, null or not a string
    ///   (or the value is not an object at all)
    /// - [`ActionError::UnrecognisedType`] if `type` names no declared tag
    /// - [`ActionError::InvalidPayload`] if the payload does not decode into `P`
    pub fn from_value(value: Value) -> Result<Self, ActionError> {
        let Value::Object(mut fields) = value else {
            return Err(ActionError::InvalidType);
        };

        let action_type = match fields.remove("type") {
            Some(Value::String(name)) => match T::from_name(&name) {
                Some(action_type) => action_type,
                None => return Err(ActionError::UnrecognisedType(name)),
            },
            _ => return Err(ActionError::InvalidType),
        };

        let payload = fields.remove("payload").unwrap_or(Value::Null);
        let payload =
            serde_json::from_value(payload).map_err(|source| ActionError::InvalidPayload {
                action_type: action_type.name(),
                source,
            })?;

        Ok(Self::new(action_type, payload))
    }

    /// Decode an action from a JSON string
    ///
    /// # Errors
    ///
    /// [`ActionError::MalformedJson`] if `json` does not parse, otherwise the
    /// same errors as [`Action::from_value`].
    pub fn from_json(json: &str) -> Result<Self, ActionError> {
        let value = serde_json::from_str(json).map_err(ActionError::MalformedJson)?;
        Self::from_value(value)
    }
}

impl<T: ActionType, P: Serialize> Serialize for Action<T, P> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut action = serializer.serialize_struct("Action", 2)?;
        action.serialize_field("type", self.action_type.name())?;
        action.serialize_field("payload", &self.payload)?;
        action.end()
    }
}
