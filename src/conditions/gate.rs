//! gates - the decision points that consume condition sets
//!
//! a gate wraps a condition set with the enable flag and the show/hide or
//! send/don't-send rule stored alongside it by the form builder.

use std::fmt;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::eval::{Evaluator, LOG_TARGET};
use super::parser::{parse_condition_value, ParseError};
use super::resolve::LookupContext;
use super::types::ConditionSet;

/// what kind of caller a gate belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    Field,
    Page,
    Notification,
    Integration,
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateKind::Field => write!(f, "field"),
            GateKind::Page => write!(f, "page"),
            GateKind::Notification => write!(f, "notification"),
            GateKind::Integration => write!(f, "integration"),
        }
    }
}

/// what a passing condition set means for the gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GateRule {
    /// show when conditions pass
    #[default]
    Show,
    /// hide when conditions pass
    Hide,
    /// send when conditions pass
    Send,
    /// don't send when conditions pass
    DontSend,
}

impl GateRule {
    /// true when a passing set lets the action proceed
    pub fn is_positive(&self) -> bool {
        matches!(self, GateRule::Show | GateRule::Send)
    }
}

/// what to do when a gate's settings cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// let the action proceed
    #[default]
    Open,
    /// block the action
    Closed,
}

impl FailurePolicy {
    pub fn decision(&self) -> bool {
        matches!(self, FailurePolicy::Open)
    }
}

/// conditional settings attached to a field, page, notification or integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub rule: GateRule,
    #[serde(default)]
    pub conditions: ConditionSet,
}

fn default_enabled() -> bool {
    true
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            rule: GateRule::default(),
            conditions: ConditionSet::default(),
        }
    }
}

impl GateSettings {
    pub fn new(rule: GateRule, conditions: ConditionSet) -> Self {
        Self {
            enabled: true,
            rule,
            conditions,
        }
    }

    /// build settings from the stored form-builder shape
    ///
    /// reads `enableConditions`, `showRule` / `sendRule` and the condition
    /// settings (`conditionRule`, `conditions`) from one object
    pub fn from_stored(json: &serde_json::Value) -> Result<Self, ParseError> {
        let obj = json
            .as_object()
            .ok_or_else(|| ParseError::new("expected object", ""))?;

        let enabled = match obj.get("enableConditions") {
            None | Some(serde_json::Value::Null) => true,
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => matches!(s.as_str(), "1" | "true"),
            Some(serde_json::Value::Number(n)) => n.as_i64() != Some(0),
            Some(_) => return Err(ParseError::new("expected boolean", "enableConditions")),
        };

        let rule = match (obj.get("showRule"), obj.get("sendRule")) {
            (Some(v), _) => parse_rule(v, "showRule")?,
            (None, Some(v)) => parse_rule(v, "sendRule")?,
            (None, None) => GateRule::default(),
        };

        Ok(Self {
            enabled,
            rule,
            conditions: parse_condition_value(json)?,
        })
    }

    /// decide whether the gated action proceeds
    pub fn decide<C: LookupContext + ?Sized>(&self, evaluator: &Evaluator<'_>, ctx: &C) -> bool {
        if !self.enabled {
            return true;
        }

        self.proceeds_when(evaluator.evaluate(&self.conditions, ctx))
    }

    /// the decision for an already computed set result
    pub fn proceeds_when(&self, passed: bool) -> bool {
        !self.enabled || self.rule.is_positive() == passed
    }
}

fn parse_rule(value: &serde_json::Value, path: &str) -> Result<GateRule, ParseError> {
    match value.as_str() {
        Some("show") => Ok(GateRule::Show),
        Some("hide") => Ok(GateRule::Hide),
        Some("send") => Ok(GateRule::Send),
        Some("dontSend") | Some("dont_send") => Ok(GateRule::DontSend),
        Some(other) => Err(ParseError::new(format!("unknown rule '{}'", other), path)),
        None => Err(ParseError::new("expected string", path)),
    }
}

/// a named decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub name: String,
    pub kind: GateKind,
    #[serde(flatten)]
    pub settings: GateSettings,
}

impl Gate {
    pub fn decide<C: LookupContext + ?Sized>(&self, evaluator: &Evaluator<'_>, ctx: &C) -> bool {
        let decision = self.settings.decide(evaluator, ctx);
        debug!(
            target: LOG_TARGET,
            "{} '{}' -> {}",
            self.kind,
            self.name,
            if decision { "proceed" } else { "blocked" }
        );
        decision
    }
}

/// decide from stored settings, falling back to `policy` when they don't parse
pub fn decide_stored<C: LookupContext + ?Sized>(
    stored: &serde_json::Value,
    evaluator: &Evaluator<'_>,
    ctx: &C,
    policy: FailurePolicy,
) -> bool {
    match GateSettings::from_stored(stored) {
        Ok(settings) => settings.decide(evaluator, ctx),
        Err(e) => {
            warn!(
                target: LOG_TARGET,
                "invalid conditional settings ({}), failing {:?}",
                e,
                policy
            );
            policy.decision()
        }
    }
}
