// integration tests for the eval command

use crate::common::*;
use serde_json::json;

fn eval_fixture(
    prefix: &str,
    conditions: serde_json::Value,
    extra_args: &[&str],
) -> std::process::Output {
    let dir = create_test_dir(prefix);
    let config_path = create_test_config(&dir);
    let conditions_path = write_json(&dir, "conditions.json", &conditions);
    let submission_path = write_json(&dir, "submission.json", &sample_submission());

    let mut args = vec![
        "eval",
        conditions_path.to_str().unwrap(),
        submission_path.to_str().unwrap(),
    ];
    args.extend(extra_args);

    let output = run_formgate(&config_path, &args);
    cleanup_test_dir(&dir);
    output
}

// ============================================================================
// pass / fail exit codes
// ============================================================================

#[test]
fn test_eval_all_passes() {
    let output = eval_fixture(
        "eval_all_pass",
        json!({
            "conditionRule": "all",
            "conditions": [
                { "field": "{email}", "condition": "contains", "value": "@example.com" },
                { "field": "{age}", "condition": ">=", "value": "18" },
                { "field": "{submission:status}", "condition": "equals", "value": "pending" }
            ]
        }),
        &["--no-json"],
    );

    assert!(output.status.success(), "eval should exit 0 when conditions pass");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Conditions passed"), "stdout: {}", stdout);
}

#[test]
fn test_eval_all_fails_with_exit_code_2() {
    let output = eval_fixture(
        "eval_all_fail",
        json!({
            "conditionRule": "all",
            "conditions": [
                { "field": "{country}", "condition": "=", "value": "AU" },
                { "field": "{country}", "condition": "=", "value": "NZ" }
            ]
        }),
        &["--no-json"],
    );

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("did not pass"), "stdout: {}", stdout);
}

#[test]
fn test_eval_any_passes_on_one_match() {
    let output = eval_fixture(
        "eval_any",
        json!({
            "conditionRule": "any",
            "conditions": [
                { "field": "{country}", "condition": "=", "value": "NZ" },
                { "field": "{interests}", "condition": "contains", "value": "chess" }
            ]
        }),
        &["--quiet"],
    );

    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "quiet mode should print nothing");
}

#[test]
fn test_eval_empty_set_does_not_pass() {
    let output = eval_fixture(
        "eval_empty",
        json!({ "conditionRule": "any", "conditions": "" }),
        &["--quiet"],
    );

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_eval_hide_rule_inverts_decision() {
    // conditions pass, so a hide rule blocks
    let output = eval_fixture(
        "eval_hide",
        json!({
            "showRule": "hide",
            "conditions": [{ "field": "{address.city}", "condition": "=", "value": "Hobart" }]
        }),
        &["--json"],
    );

    assert_eq!(output.status.code(), Some(2));
    let json = parse_json_output(&output);
    assert_eq!(json["result"]["passed"], true);
    assert_eq!(json["result"]["proceed"], false);
}

#[test]
fn test_eval_disabled_conditions_proceed() {
    let output = eval_fixture(
        "eval_disabled",
        json!({
            "enableConditions": false,
            "conditions": [{ "field": "{country}", "condition": "=", "value": "NZ" }]
        }),
        &["--json"],
    );

    assert!(output.status.success());
    let json = parse_json_output(&output);
    assert_eq!(json["result"]["passed"], false);
    assert_eq!(json["result"]["proceed"], true);
}

// ============================================================================
// explain output
// ============================================================================

#[test]
fn test_eval_explain_json_trace() {
    let output = eval_fixture(
        "eval_explain_json",
        json!({
            "conditionRule": "any",
            "conditions": [
                { "field": "{age}", "condition": ">", "value": "adult" },
                { "field": "", "condition": "", "value": "" },
                { "field": "{address}", "condition": "equals", "value": "Hobart 7000" }
            ]
        }),
        &["--json", "--explain"],
    );

    assert!(output.status.success());
    let json = parse_json_output(&output);
    let traces = json["result"]["evaluation"]["conditions"]
        .as_array()
        .expect("explain should include per-condition traces");

    assert_eq!(traces.len(), 3);
    assert_eq!(traces[0]["outcome"], "errored");
    assert_eq!(traces[0]["reason"], "'adult' is not numeric");
    assert_eq!(traces[1]["outcome"], "skipped");
    assert_eq!(traces[2]["outcome"], "passed");
    assert_eq!(traces[2]["resolved"], "Hobart 7000");
}

#[test]
fn test_eval_explain_text() {
    let output = eval_fixture(
        "eval_explain_text",
        json!({
            "conditions": [{ "field": "{newsletter}", "condition": "=", "value": "1" }]
        }),
        &["--no-json", "--explain"],
    );

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 of 1 conditions counted"), "stdout: {}", stdout);
    assert!(stdout.contains("✓ {newsletter} = 1"), "stdout: {}", stdout);
}

#[test]
fn test_eval_unknown_operator_is_logged_not_fatal() {
    let output = eval_fixture(
        "eval_unknown_op",
        json!({
            "conditionRule": "any",
            "conditions": [
                { "field": "{country}", "condition": "equalz", "value": "AU" },
                { "field": "{country}", "condition": "equals", "value": "AU" }
            ]
        }),
        &["--no-json"],
    );

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown operator 'equalz'"), "stderr: {}", stderr);
}

// ============================================================================
// input errors
// ============================================================================

#[test]
fn test_eval_invalid_conditions_exit_code_3() {
    let output = eval_fixture(
        "eval_invalid",
        json!({ "conditions": 12 }),
        &["--json"],
    );

    assert_eq!(output.status.code(), Some(3));
    let json = parse_json_output(&output);
    assert_eq!(json["error"]["code"], -32003);
    assert!(json["error"]["message"]
        .as_str()
        .unwrap()
        .contains("expected array"));
}

#[test]
fn test_eval_missing_file() {
    let dir = create_test_dir("eval_missing");
    let config_path = create_test_config(&dir);
    let output = run_formgate(
        &config_path,
        &["--no-json", "eval", "/nonexistent/c.json", "/nonexistent/s.json"],
    );

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"), "stderr: {}", stderr);

    cleanup_test_dir(&dir);
}

#[test]
fn test_eval_uses_configured_attribute_marker() {
    let dir = create_test_dir("eval_marker");
    let config_path = write_json(
        &dir,
        "config.json",
        &json!({ "settings": { "attribute_marker": "meta:" } }),
    );
    let conditions_path = write_json(
        &dir,
        "conditions.json",
        &json!({
            "conditions": [{ "field": "{meta:status}", "condition": "=", "value": "pending" }]
        }),
    );
    let submission_path = write_json(&dir, "submission.json", &sample_submission());

    let output = run_formgate(
        &config_path,
        &[
            "--quiet",
            "eval",
            conditions_path.to_str().unwrap(),
            submission_path.to_str().unwrap(),
        ],
    );

    assert!(output.status.success());
    cleanup_test_dir(&dir);
}

// ============================================================================
// failure policy
// ============================================================================

fn eval_with_policy(prefix: &str, on_error: &str) -> std::process::Output {
    let dir = create_test_dir(prefix);
    let config_path = write_json(
        &dir,
        "config.json",
        &json!({ "settings": { "on_error": on_error } }),
    );
    let conditions_path = write_json(
        &dir,
        "conditions.json",
        &json!({ "sendRule": "send", "conditions": "[{not json" }),
    );
    let submission_path = write_json(&dir, "submission.json", &sample_submission());

    let output = run_formgate(
        &config_path,
        &[
            "--json",
            "eval",
            "--fallback",
            conditions_path.to_str().unwrap(),
            submission_path.to_str().unwrap(),
        ],
    );
    cleanup_test_dir(&dir);
    output
}

#[test]
fn test_eval_fallback_fails_open() {
    let output = eval_with_policy("eval_fallback_open", "open");
    assert!(output.status.success());

    let json = parse_json_output(&output);
    assert_eq!(json["result"]["proceed"], true);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid encoded conditions"), "stderr: {}", stderr);
}

#[test]
fn test_eval_fallback_fails_closed() {
    let output = eval_with_policy("eval_fallback_closed", "closed");
    assert_eq!(output.status.code(), Some(2));

    let json = parse_json_output(&output);
    assert_eq!(json["result"]["proceed"], false);
}
