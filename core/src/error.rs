use thiserror::Error;

/// Errors raised while constructing an [`Action`](crate::Action)
#[derive(Error, Debug)]
pub enum ActionError {
    /// The action's `type` was missing, null, or not a string
    #[error("The \"type\" parameter must be a non-null string")]
    InvalidType,

    /// The action's `type` is a string that names no declared action type
    #[error("Action type \"{0}\" is not a declared action type")]
    UnrecognisedType(String),

    /// The payload could not be decoded into the store's payload type
    #[error("Invalid payload for action type \"{action_type}\": {source}")]
    InvalidPayload {
        /// Name of the action type the payload was meant for
        action_type: &'static str,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// The input was not valid JSON
    #[error("Malformed action JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
}

/// Failure to insert a handler while building an [`ActionMap`](crate::ActionMap)
///
/// Only reachable through an `ActionType` implementation whose `index()`
/// does not fit inside `ALL`. Enums declared with
/// [`action_types!`](crate::action_types) never produce it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Failed to create action map for action type {action_type}: \
     index {index} is outside a table of {capacity}"
)]
pub struct MapConstructionError {
    /// Name of the offending action type
    pub action_type: &'static str,
    /// Index the action type reported
    pub index: usize,
    /// Number of slots in the table (`ActionType::ALL.len()`)
    pub capacity: usize,
}
