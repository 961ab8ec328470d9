//! operator registry
//!
//! maps operator names (and their aliases) to pure comparison functions.
//! new operators can be registered without touching the evaluator.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::RegexBuilder;
use thiserror::Error;

/// max edit distance for "did you mean" suggestions
const SUGGESTION_THRESHOLD: usize = 3;

/// why a single comparison could not produce a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperatorError {
    #[error("unknown operator '{name}'{}", suggestion_suffix(.suggestion))]
    UnknownOperator {
        name: String,
        suggestion: Option<String>,
    },

    #[error("'{operand}' is not numeric")]
    NotNumeric { operand: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(", did you mean '{}'?", s),
        None => String::new(),
    }
}

/// comparison function: (resolved value, literal operand) -> passed
pub type OperatorFn = Arc<dyn Fn(&str, &str) -> Result<bool, OperatorError> + Send + Sync>;

/// operator name -> comparison function, plus alias table
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    operators: BTreeMap<String, OperatorFn>,
    aliases: BTreeMap<String, String>,
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("operators", &self.operators.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

lazy_static! {
    static ref BUILTIN: OperatorRegistry = OperatorRegistry::with_builtins();
}

impl OperatorRegistry {
    /// an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// shared registry holding the built-in operators
    pub fn builtin() -> &'static OperatorRegistry {
        &BUILTIN
    }

    /// a fresh registry holding the built-in operators and aliases
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register("equals", |a, b| Ok(a == b));
        registry.register("not-equals", |a, b| Ok(a != b));
        registry.register("contains", |a, b| Ok(a.contains(b)));
        registry.register("not-contains", |a, b| Ok(!a.contains(b)));
        registry.register("starts-with", |a, b| Ok(a.starts_with(b)));
        registry.register("ends-with", |a, b| Ok(a.ends_with(b)));
        registry.register("greater-than", |a, b| compare_numbers(a, b, |x, y| x > y));
        registry.register("less-than", |a, b| compare_numbers(a, b, |x, y| x < y));
        registry.register("greater-or-equal", |a, b| {
            compare_numbers(a, b, |x, y| x >= y)
        });
        registry.register("less-or-equal", |a, b| compare_numbers(a, b, |x, y| x <= y));
        registry.register("matches", matches_pattern);

        // forms stored by the form builder
        for (alias, target) in [
            ("=", "equals"),
            ("==", "equals"),
            ("is", "equals"),
            ("!=", "not-equals"),
            ("is not", "not-equals"),
            (">", "greater-than"),
            ("<", "less-than"),
            (">=", "greater-or-equal"),
            ("<=", "less-or-equal"),
            ("startsWith", "starts-with"),
            ("startswith", "starts-with"),
            ("endsWith", "ends-with"),
            ("endswith", "ends-with"),
            ("notContains", "not-contains"),
            ("doesNotContain", "not-contains"),
        ] {
            registry.aliases.insert(alias.to_string(), target.to_string());
        }

        registry
    }

    /// register (or replace) an operator
    pub fn register<F>(&mut self, name: impl Into<String>, op: F)
    where
        F: Fn(&str, &str) -> Result<bool, OperatorError> + Send + Sync + 'static,
    {
        self.operators.insert(name.into(), Arc::new(op));
    }

    /// register an alias for an existing operator
    pub fn alias(
        &mut self,
        alias: impl Into<String>,
        target: &str,
    ) -> Result<(), OperatorError> {
        let canonical = self.canonical_name(target)?.to_string();
        self.aliases.insert(alias.into(), canonical);
        Ok(())
    }

    /// resolve an operator name or alias to its canonical name
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> Result<&'a str, OperatorError> {
        let name = name.trim();
        if let Some((key, _)) = self.operators.get_key_value(name) {
            return Ok(key.as_str());
        }
        match self.aliases.get(name) {
            Some(target) if self.operators.contains_key(target) => Ok(target.as_str()),
            _ => Err(OperatorError::UnknownOperator {
                name: name.to_string(),
                suggestion: self.suggest(name),
            }),
        }
    }

    /// look up the comparison function for a name or alias
    pub fn get(&self, name: &str) -> Result<&OperatorFn, OperatorError> {
        let canonical = self.canonical_name(name)?;
        self.operators
            .get(canonical)
            .ok_or_else(|| OperatorError::UnknownOperator {
                name: name.to_string(),
                suggestion: None,
            })
    }

    /// apply an operator to (resolved value, operand)
    pub fn apply(&self, name: &str, actual: &str, expected: &str) -> Result<bool, OperatorError> {
        let op = self.get(name)?;
        op(actual, expected)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.canonical_name(name).is_ok()
    }

    /// canonical operator names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.operators.keys().map(String::as_str)
    }

    /// (alias, canonical name) pairs in sorted order
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    fn suggest(&self, name: &str) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        self.operators
            .keys()
            .chain(self.aliases.keys())
            .map(|candidate| (strsim::levenshtein(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= SUGGESTION_THRESHOLD)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate.clone())
    }
}

fn parse_number(operand: &str) -> Result<f64, OperatorError> {
    operand
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| OperatorError::NotNumeric {
            operand: operand.to_string(),
        })
}

fn compare_numbers(
    actual: &str,
    expected: &str,
    cmp: impl Fn(f64, f64) -> bool,
) -> Result<bool, OperatorError> {
    let a = parse_number(actual)?;
    let b = parse_number(expected)?;
    Ok(cmp(a, b))
}

/// regex match; accepts `/pattern/flags` or a bare pattern
fn matches_pattern(actual: &str, pattern: &str) -> Result<bool, OperatorError> {
    let (body, case_insensitive) = split_delimited(pattern);

    let re = RegexBuilder::new(body)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| OperatorError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

    Ok(re.is_match(actual))
}

fn split_delimited(pattern: &str) -> (&str, bool) {
    if pattern.starts_with('/') && pattern.len() > 2 {
        if let Some(end) = pattern[1..].rfind('/') {
            let body = &pattern[1..=end];
            let flags = &pattern[end + 2..];
            return (body, flags.contains('i'));
        }
    }
    (pattern, false)
}
