//! condition settings parser - converts stored JSON settings to a condition set
//!
//! accepts the shape the form builder persists:
//!
//! ```json
//! {
//!   "conditionRule": "all",
//!   "conditions": [
//!     { "field": "{email}", "condition": "contains", "value": "@example.com" }
//!   ]
//! }
//! ```
//!
//! `conditions` may also be a JSON-encoded string of that array.

use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use super::types::{Combinator, Condition, ConditionSet};

/// error type for parsing condition settings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", display_with_path(.path, .message))]
pub struct ParseError {
    pub message: String,
    pub path: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: path.into(),
        }
    }
}

fn display_with_path(path: &str, message: &str) -> String {
    if path.is_empty() {
        message.to_string()
    } else {
        format!("{}: {}", path, message)
    }
}

/// parse condition settings from a JSON string
pub fn parse_condition_settings(json: &str) -> Result<ConditionSet, ParseError> {
    let value: JsonValue =
        serde_json::from_str(json).map_err(|e| ParseError::new(format!("invalid JSON: {}", e), ""))?;
    parse_condition_value(&value)
}

/// parse condition settings from an already parsed JSON value
pub fn parse_condition_value(json: &JsonValue) -> Result<ConditionSet, ParseError> {
    let obj = json
        .as_object()
        .ok_or_else(|| ParseError::new(format!("expected object, got {}", kind(json)), ""))?;

    let combinator = parse_combinator(obj)?;
    let conditions = match obj.get("conditions") {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(value) => parse_conditions(value, "conditions")?,
    };

    Ok(ConditionSet::new(combinator, conditions))
}

fn parse_combinator(obj: &Map<String, JsonValue>) -> Result<Combinator, ParseError> {
    // "combinator" is accepted as a synonym for the stored "conditionRule"
    let rule = obj.get("conditionRule").or_else(|| obj.get("combinator"));

    match rule {
        None | Some(JsonValue::Null) => Ok(Combinator::All),
        Some(JsonValue::String(s)) => Ok(Combinator::from_rule(s)),
        Some(other) => Err(ParseError::new(
            format!("expected string, got {}", kind(other)),
            "conditionRule",
        )),
    }
}

fn parse_conditions(value: &JsonValue, path: &str) -> Result<Vec<Condition>, ParseError> {
    match value {
        JsonValue::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| parse_condition(v, &format!("{}[{}]", path, i)))
            .collect(),
        // stored settings keep the list JSON-encoded
        JsonValue::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        JsonValue::String(s) => {
            let inner: JsonValue = serde_json::from_str(s)
                .map_err(|e| ParseError::new(format!("invalid encoded conditions: {}", e), path))?;
            match inner {
                JsonValue::Array(_) => parse_conditions(&inner, path),
                other => Err(ParseError::new(
                    format!("expected array, got {}", kind(&other)),
                    path,
                )),
            }
        }
        other => Err(ParseError::new(
            format!("expected array, got {}", kind(other)),
            path,
        )),
    }
}

fn parse_condition(value: &JsonValue, path: &str) -> Result<Condition, ParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ParseError::new(format!("expected object, got {}", kind(value)), path))?;

    // "operator" is accepted as a synonym for the stored "condition"
    let operator = obj.get("condition").or_else(|| obj.get("operator"));

    Ok(Condition {
        field: operand(obj.get("field"), &format!("{}.field", path))?,
        operator: operand(operator, &format!("{}.condition", path))?,
        value: operand(obj.get("value"), &format!("{}.value", path))?,
    })
}

/// scalar JSON value as the string it is compared as
fn operand(value: Option<&JsonValue>, path: &str) -> Result<String, ParseError> {
    match value {
        None | Some(JsonValue::Null) => Ok(String::new()),
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Number(n)) => Ok(n.to_string()),
        Some(JsonValue::Bool(true)) => Ok("1".to_string()),
        Some(JsonValue::Bool(false)) => Ok(String::new()),
        Some(other) => Err(ParseError::new(
            format!("expected scalar, got {}", kind(other)),
            path,
        )),
    }
}

fn kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
