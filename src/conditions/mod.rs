//! conditional logic for form fields, pages, notifications and integrations
//!
//! provides:
//! - value resolution: field handles, dotted paths, `submission:` attributes,
//!   multi-value flattening
//! - an operator registry: equals, not-equals, contains, not-contains,
//!   starts-with, ends-with, numeric comparisons, regex (plus aliases)
//! - set evaluation: all (AND) / any (OR) with per-condition failure containment
//! - gates: show/hide and send/don't-send decisions on top of a set

mod eval;
mod gate;
mod operators;
mod parser;
mod resolve;
mod types;

pub use eval::{evaluate, ConditionTrace, Evaluation, Evaluator, Outcome};
pub use gate::{decide_stored, FailurePolicy, Gate, GateKind, GateRule, GateSettings};
pub use operators::{OperatorError, OperatorFn, OperatorRegistry};
pub use parser::{parse_condition_settings, parse_condition_value, ParseError};
pub use resolve::{
    resolve_field, undecorate, FieldRef, LookupContext, SubmissionContext,
    DEFAULT_ATTRIBUTE_MARKER,
};
pub use types::{Combinator, Condition, ConditionSet, Value};
