//! core types for the condition system

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::parser::{parse_condition_value, ParseError};

/// how the results of a condition set are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    /// every evaluated condition must pass (AND)
    #[default]
    All,
    /// at least one evaluated condition must pass (OR)
    Any,
}

impl Combinator {
    /// parse a combinator the way the host stores it
    ///
    /// only the exact string "all" selects `All`; anything else is `Any`
    pub fn from_rule(s: &str) -> Self {
        if s.trim() == "all" {
            Combinator::All
        } else {
            Combinator::Any
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::All => write!(f, "all"),
            Combinator::Any => write!(f, "any"),
        }
    }
}

/// a value handed back by a lookup context
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// absent or explicitly empty value
    Null,
    /// boolean value
    Bool(bool),
    /// integer value
    Number(i64),
    /// integer above `i64::MAX`
    Unsigned(u64),
    /// floating point value
    Float(f64),
    /// string value
    String(String),
    /// multi-value field (checkboxes, multi-select, repeaters)
    List(Vec<Value>),
    /// grouped field data
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// try to get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// check if value is composite (list or map)
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// look up a direct child by key (map key or list index)
    pub fn child(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(map) => map.get(key),
            Value::List(list) => key.parse::<usize>().ok().and_then(|i| list.get(i)),
            _ => None,
        }
    }

    /// string form of a scalar; composites are flattened with `glue`
    pub fn flatten(&self, glue: &str) -> String {
        let mut parts = Vec::new();
        self.collect_leaves(&mut parts);
        parts.join(glue)
    }

    fn collect_leaves(&self, out: &mut Vec<String>) {
        match self {
            Value::List(items) => items.iter().for_each(|v| v.collect_leaves(out)),
            Value::Map(map) => map.values().for_each(|v| v.collect_leaves(out)),
            scalar => out.push(scalar.scalar_string()),
        }
    }

    fn scalar_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Number(n) => n.to_string(),
            Value::Unsigned(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => self.flatten(" "),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Unsigned(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Unsigned(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// a single field/operator/value comparison
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Condition {
    /// field reference (e.g. "email", "{address.country}", "submission:status")
    pub field: String,
    /// operator name or alias (e.g. "equals", "=", "startsWith")
    #[serde(alias = "condition")]
    pub operator: String,
    /// literal operand
    pub value: String,
}

impl Condition {
    /// create a new condition
    pub fn new(
        field: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            value: value.into(),
        }
    }

    /// create an equality condition
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, "equals", value)
    }

    /// the rule text used in diagnostics
    pub fn rule_text(&self) -> String {
        format!("{} {} {}", self.field, self.operator, self.value)
            .trim()
            .to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} \"{}\"", self.field, self.operator, self.value)
    }
}

/// an ordered group of conditions and the way their results combine
///
/// deserializes through the settings parser, so config files accept the
/// same shapes as stored settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct ConditionSet {
    pub combinator: Combinator,
    pub conditions: Vec<Condition>,
}

impl TryFrom<serde_json::Value> for ConditionSet {
    type Error = ParseError;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Null => Ok(Self::default()),
            json => parse_condition_value(&json),
        }
    }
}

impl ConditionSet {
    /// create a new condition set
    pub fn new(combinator: Combinator, conditions: Vec<Condition>) -> Self {
        Self {
            combinator,
            conditions,
        }
    }

    /// create an AND set
    pub fn all(conditions: Vec<Condition>) -> Self {
        Self::new(Combinator::All, conditions)
    }

    /// create an OR set
    pub fn any(conditions: Vec<Condition>) -> Self {
        Self::new(Combinator::Any, conditions)
    }

    /// number of conditions, skipped ones included
    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// true when there is nothing to evaluate; such a set never passes
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Display for ConditionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.combinator)?;
        for (i, c) in self.conditions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}
