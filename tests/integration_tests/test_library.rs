// integration tests for the library API as a host would use it

use formgate::conditions::{
    evaluate, Combinator, Condition, ConditionSet, Evaluator, LookupContext, OperatorError,
    OperatorRegistry, Value,
};
use std::collections::HashMap;

/// a host-side context backed by its own storage
struct EntryContext {
    meta: HashMap<&'static str, Value>,
    answers: HashMap<&'static str, Value>,
}

impl LookupContext for EntryContext {
    fn attribute(&self, name: &str) -> Option<Value> {
        self.meta.get(name).cloned()
    }

    fn field(&self, path: &str) -> Option<Value> {
        self.answers.get(path).cloned()
    }
}

fn entry() -> EntryContext {
    let mut meta = HashMap::new();
    meta.insert("title", Value::from("Quote request"));

    let mut answers = HashMap::new();
    answers.insert("budget", Value::from("2500"));
    answers.insert(
        "services",
        Value::List(vec![Value::from("design"), Value::from("hosting")]),
    );

    EntryContext { meta, answers }
}

#[test]
fn test_custom_context() {
    let set = ConditionSet::all(vec![
        Condition::new("{submission:title}", "starts-with", "Quote"),
        Condition::new("{budget}", "greater-than", "1000"),
        Condition::new("{services}", "contains", "hosting"),
    ]);

    assert!(evaluate(&set, &entry()));
}

#[test]
fn test_custom_operator() {
    let mut registry = OperatorRegistry::with_builtins();
    registry.register("length-at-least", |actual: &str, expected: &str| {
        let min: usize = expected.trim().parse().map_err(|_| OperatorError::NotNumeric {
            operand: expected.to_string(),
        })?;
        Ok(actual.chars().count() >= min)
    });
    registry.alias("minlen", "length-at-least").unwrap();

    let evaluator = Evaluator::new(&registry);
    let set = ConditionSet::new(
        Combinator::Any,
        vec![
            Condition::new("{budget}", "minlen", "5"),
            Condition::new("{submission:title}", "length-at-least", "5"),
        ],
    );

    let evaluation = evaluator.trace(&set, &entry());
    assert!(evaluation.passed);
    assert_eq!(evaluation.counted(), 2);
    assert_eq!(evaluation.errors().count(), 0);
}

#[test]
fn test_evaluator_is_shareable_across_threads() {
    let evaluator = Evaluator::default();
    let set = ConditionSet::all(vec![Condition::new("{budget}", "<", "3000")]);

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert!(evaluator.evaluate(&set, &entry())));
        }
    });
}
