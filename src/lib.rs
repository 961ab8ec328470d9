//! formgate - conditional logic for form builders
//!
//! exposes the condition evaluator to hosts and to the CLI binary

pub mod cli;
pub mod conditions;
pub mod config;
