//! Dynamic actions backed by `serde_json::Value`
//!
//! Useful for replaying recorded sessions or accepting actions from outside
//! the program, where the action shape is only known at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::{Action, ActionSummary};
use crate::error::StoreError;

/// An action whose payload is an arbitrary JSON value.
///
/// A well-formed action is a JSON object with a non-null `"type"` field.
/// Anything else is accepted at construction and rejected at dispatch by
/// [`Action::validate`], so malformed input surfaces as a [`StoreError`]
/// from the store rather than a parse failure.
///
/// # Example
/// ```
/// use reduct_core::{Action, JsonAction};
/// use serde_json::json;
///
/// let action = JsonAction::new(json!({ "type": "todos/add", "text": "milk" }));
/// assert_eq!(action.name(), "todos/add");
/// assert_eq!(action.get("text"), Some(&json!("milk")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct JsonAction {
    value: Value,
    name: String,
}

impl JsonAction {
    pub fn new(value: Value) -> Self {
        let name = match value.get("type") {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Self { value, name }
    }

    /// Shorthand for an object with just a `"type"` field
    pub fn of_type(action_type: impl Into<String>) -> Self {
        Self::new(serde_json::json!({ "type": action_type.into() }))
    }

    /// A field of the action object
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for JsonAction {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl From<JsonAction> for Value {
    fn from(action: JsonAction) -> Self {
        action.value
    }
}

impl Action for JsonAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&self) -> Result<(), StoreError> {
        let Value::Object(fields) = &self.value else {
            return Err(StoreError::InvalidAction(format!(
                "expected a JSON object, got {}",
                kind_of(&self.value)
            )));
        };
        match fields.get("type") {
            None | Some(Value::Null) => Err(StoreError::MissingActionType),
            Some(_) => Ok(()),
        }
    }
}

impl ActionSummary for JsonAction {
    fn summary(&self) -> String {
        self.value.to_string()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
