use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::conditions::{
    Evaluator, FailurePolicy, Gate, OperatorError, OperatorRegistry, DEFAULT_ATTRIBUTE_MARKER,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// extra operator aliases (alias -> existing operator or alias)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub operator_aliases: BTreeMap<String, String>,
    /// named gates evaluated by `formgate gates`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gates: Vec<Gate>,
}

impl Config {
    /// built-in operators extended with the configured aliases
    pub fn registry(&self) -> Result<OperatorRegistry, OperatorError> {
        let mut registry = OperatorRegistry::with_builtins();
        for (alias, target) in &self.operator_aliases {
            registry.alias(alias.as_str(), target)?;
        }
        Ok(registry)
    }

    /// evaluator using `registry` and the configured attribute marker
    pub fn evaluator<'r>(&self, registry: &'r OperatorRegistry) -> Evaluator<'r> {
        Evaluator::new(registry).with_attribute_marker(self.settings.attribute_marker.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// prefix marking submission-attribute references
    #[serde(default = "default_attribute_marker")]
    pub attribute_marker: String,
    /// decision used when stored conditional settings can't be parsed
    #[serde(default)]
    pub on_error: FailurePolicy,
}

fn default_attribute_marker() -> String {
    DEFAULT_ATTRIBUTE_MARKER.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            attribute_marker: default_attribute_marker(),
            on_error: FailurePolicy::default(),
        }
    }
}
