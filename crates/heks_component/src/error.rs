//! Component-layer error types.

use crate::entity::EntityId;

/// Errors raised by the entity registry, the component store and filters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComponentError {
    /// The entity id is not registered (never created, or already removed).
    #[error("no entity with id {0} found")]
    UnknownEntity(EntityId),

    /// An explicit id was supplied that is already in use.
    #[error("entity with id {0} already exists")]
    EntityAlreadyExists(EntityId),

    /// A filter was built from something other than a JSON object.
    #[error("entity filter must be an object, received {0}")]
    InvalidFilterInput(&'static str),

    /// A component set was built from something other than a JSON object.
    #[error("cannot create components from {0}, expected an object")]
    InvalidComponents(&'static str),
}

/// Short JSON type name used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
