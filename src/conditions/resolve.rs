//! field reference resolution
//!
//! turns a condition's field reference into the string it is compared as

use std::collections::BTreeMap;

use serde::Deserialize;

use super::types::Value;

/// prefix marking a reference to a submission attribute instead of a field
pub const DEFAULT_ATTRIBUTE_MARKER: &str = "submission:";

/// glue used when flattening multi-value fields
const FLATTEN_GLUE: &str = " ";

/// caller-supplied view of a submission
pub trait LookupContext {
    /// submission-level attribute (status, title, dateCreated, ...)
    fn attribute(&self, name: &str) -> Option<Value>;

    /// serialized field value by handle or dotted path
    fn field(&self, path: &str) -> Option<Value>;
}

/// where a field reference points
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// submission attribute (marker stripped)
    Attribute(&'a str),
    /// form field handle or dotted path
    Field(&'a str),
}

impl<'a> FieldRef<'a> {
    /// parse an already undecorated reference
    pub fn parse(reference: &'a str, marker: &str) -> Self {
        match reference.strip_prefix(marker) {
            Some(rest) if !marker.is_empty() => FieldRef::Attribute(rest.trim()),
            _ => FieldRef::Field(reference),
        }
    }

    /// the key looked up in the context
    pub fn key(&self) -> &'a str {
        match self {
            FieldRef::Attribute(k) | FieldRef::Field(k) => k,
        }
    }
}

/// strip brace decoration and surrounding whitespace from a reference
pub fn undecorate(reference: &str) -> String {
    reference.replace(['{', '}'], "").trim().to_string()
}

/// resolve a field reference to its comparable string form
///
/// missing values resolve to an empty string
pub fn resolve_field<C: LookupContext + ?Sized>(reference: &str, marker: &str, ctx: &C) -> String {
    let reference = undecorate(reference);
    let value = match FieldRef::parse(&reference, marker) {
        FieldRef::Attribute(name) => ctx.attribute(name),
        FieldRef::Field(path) => ctx.field(path),
    };

    value.map(|v| v.flatten(FLATTEN_GLUE)).unwrap_or_default()
}

/// `LookupContext` backed by two plain maps
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmissionContext {
    #[serde(default, deserialize_with = "deserialize_values")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, deserialize_with = "deserialize_values")]
    pub fields: BTreeMap<String, Value>,
}

impl SubmissionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// set a submission attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// set a field value
    pub fn with_field(mut self, handle: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(handle.into(), value.into());
        self
    }

    /// load from a `{"attributes": {...}, "fields": {...}}` document
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl LookupContext for SubmissionContext {
    fn attribute(&self, name: &str) -> Option<Value> {
        lookup_path(&self.attributes, name).cloned()
    }

    fn field(&self, path: &str) -> Option<Value> {
        lookup_path(&self.fields, path).cloned()
    }
}

/// exact key first, then dotted traversal through maps and list indices
fn lookup_path<'a>(map: &'a BTreeMap<String, Value>, path: &str) -> Option<&'a Value> {
    if let Some(v) = map.get(path) {
        return Some(v);
    }

    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = current.child(segment)?;
    }
    Some(current)
}

fn deserialize_values<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}
