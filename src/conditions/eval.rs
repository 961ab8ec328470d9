//! condition evaluator
//!
//! evaluates condition sets against a submission's lookup context.
//! a failing condition never aborts the set: it is logged and counts as false.

use log::{debug, warn};
use serde::Serialize;

use super::operators::{OperatorError, OperatorRegistry};
use super::resolve::{resolve_field, undecorate, LookupContext, DEFAULT_ATTRIBUTE_MARKER};
use super::types::{Combinator, Condition, ConditionSet};

pub(super) const LOG_TARGET: &str = "formgate::conditions";

/// result of evaluating one condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    /// blank condition, excluded from the result
    Skipped,
    /// the comparison could not be made; counts as false
    Errored(String),
}

impl Outcome {
    /// the boolean this outcome contributes, if any
    pub fn contribution(&self) -> Option<bool> {
        match self {
            Outcome::Passed => Some(true),
            Outcome::Failed | Outcome::Errored(_) => Some(false),
            Outcome::Skipped => None,
        }
    }
}

/// one evaluated condition with the value it was compared against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionTrace {
    pub rule: String,
    pub resolved: String,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// full record of a set evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    pub combinator: Combinator,
    pub conditions: Vec<ConditionTrace>,
    pub passed: bool,
}

impl Evaluation {
    /// number of conditions that contributed to the result
    pub fn counted(&self) -> usize {
        self.conditions
            .iter()
            .filter(|c| c.outcome.contribution().is_some())
            .count()
    }

    pub fn errors(&self) -> impl Iterator<Item = &ConditionTrace> {
        self.conditions
            .iter()
            .filter(|c| matches!(c.outcome, Outcome::Errored(_)))
    }
}

/// evaluates condition sets with a given operator registry
#[derive(Debug, Clone)]
pub struct Evaluator<'r> {
    registry: &'r OperatorRegistry,
    attribute_marker: String,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self::new(OperatorRegistry::builtin())
    }
}

impl<'r> Evaluator<'r> {
    /// evaluator over `registry` with the default `submission:` marker
    pub fn new(registry: &'r OperatorRegistry) -> Self {
        Self {
            registry,
            attribute_marker: DEFAULT_ATTRIBUTE_MARKER.to_string(),
        }
    }

    /// set the prefix that marks submission-attribute references
    pub fn with_attribute_marker(mut self, marker: impl Into<String>) -> Self {
        self.attribute_marker = marker.into();
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        self.registry
    }

    /// evaluate a set to a single pass/fail
    pub fn evaluate<C: LookupContext + ?Sized>(&self, set: &ConditionSet, ctx: &C) -> bool {
        self.trace(set, ctx).passed
    }

    /// evaluate a set, keeping every condition's outcome
    pub fn trace<C: LookupContext + ?Sized>(&self, set: &ConditionSet, ctx: &C) -> Evaluation {
        let conditions: Vec<ConditionTrace> = set
            .conditions
            .iter()
            .map(|c| self.trace_condition(c, ctx))
            .collect();

        let results: Vec<bool> = conditions
            .iter()
            .filter_map(|c| c.outcome.contribution())
            .collect();
        let passed = reduce(set.combinator, &results);

        debug!(
            target: LOG_TARGET,
            "{} -> {} ({} of {} conditions counted)",
            set.combinator,
            passed,
            results.len(),
            set.conditions.len()
        );

        Evaluation {
            combinator: set.combinator,
            conditions,
            passed,
        }
    }

    /// evaluate a single condition
    pub fn evaluate_condition<C: LookupContext + ?Sized>(
        &self,
        condition: &Condition,
        ctx: &C,
    ) -> Outcome {
        self.trace_condition(condition, ctx).outcome
    }

    fn trace_condition<C: LookupContext + ?Sized>(
        &self,
        condition: &Condition,
        ctx: &C,
    ) -> ConditionTrace {
        let rule = condition.rule_text();

        if undecorate(&condition.field).is_empty() {
            debug!(target: LOG_TARGET, "skipping condition without field: '{}'", rule);
            return ConditionTrace {
                rule,
                resolved: String::new(),
                outcome: Outcome::Skipped,
            };
        }

        let resolved = resolve_field(&condition.field, &self.attribute_marker, ctx);

        // resolved value + operator + operand all blank
        if is_blank(&[
            resolved.as_str(),
            condition.operator.as_str(),
            condition.value.as_str(),
        ]) {
            debug!(target: LOG_TARGET, "skipping blank condition: '{}'", rule);
            return ConditionTrace {
                rule,
                resolved,
                outcome: Outcome::Skipped,
            };
        }

        let outcome = match self.compare(condition, &resolved) {
            Ok(true) => Outcome::Passed,
            Ok(false) => Outcome::Failed,
            Err(e) => {
                warn!(target: LOG_TARGET, "failed to evaluate condition '{}': {}", rule, e);
                Outcome::Errored(e.to_string())
            }
        };

        ConditionTrace {
            rule,
            resolved,
            outcome,
        }
    }

    /// static problems in a set that would make conditions error or skip
    ///
    /// each entry is prefixed with `conditions[i]`
    pub fn lint(&self, set: &ConditionSet) -> Vec<String> {
        let mut problems = Vec::new();

        for (i, condition) in set.conditions.iter().enumerate() {
            let path = format!("conditions[{}]", i);
            let has_field = !undecorate(&condition.field).is_empty();

            if !has_field {
                if !is_blank(&[condition.operator.as_str(), condition.value.as_str()]) {
                    problems.push(format!("{}: empty field reference, condition is skipped", path));
                }
                continue;
            }
            if condition.operator.trim().is_empty() {
                continue;
            }

            // probe with a numeric stand-in so only operator and operand problems surface
            match self.registry.apply(&condition.operator, "0", &condition.value) {
                Ok(_) => {}
                Err(e) => problems.push(format!("{}: {}", path, e)),
            }
        }

        problems
    }

    fn compare(&self, condition: &Condition, resolved: &str) -> Result<bool, OperatorError> {
        self.registry
            .apply(&condition.operator, resolved, &condition.value)
    }
}

/// evaluate a set with the built-in operators
pub fn evaluate<C: LookupContext + ?Sized>(set: &ConditionSet, ctx: &C) -> bool {
    Evaluator::default().evaluate(set, ctx)
}

fn is_blank(parts: &[&str]) -> bool {
    parts.iter().all(|p| p.trim().is_empty())
}

/// combine collected results; an empty result list is false for both modes
fn reduce(combinator: Combinator, results: &[bool]) -> bool {
    match combinator {
        Combinator::All => !results.is_empty() && results.iter().all(|r| *r),
        Combinator::Any => results.iter().any(|r| *r),
    }
}
