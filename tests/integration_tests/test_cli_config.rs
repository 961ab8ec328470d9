// integration tests for the config command

use crate::common::*;
use serde_json::json;
use std::fs;

// ============================================================================
// config show / path / default
// ============================================================================

#[test]
fn test_config_show_json_output() {
    let dir = create_test_dir("config_show_json");
    let config_path = write_json(
        &dir,
        "config.json",
        &json!({ "operator_aliases": { "eq": "equals" } }),
    );

    let output = run_formgate(&config_path, &["--json", "config", "show"]);
    assert!(output.status.success());

    let json = parse_json_output(&output);
    assert_eq!(json["result"]["settings"]["attribute_marker"], "submission:");
    assert_eq!(json["result"]["settings"]["on_error"], "open");
    assert_eq!(json["result"]["operator_aliases"]["eq"], "equals");

    cleanup_test_dir(&dir);
}

#[test]
fn test_config_show_missing_file_uses_defaults() {
    let dir = create_test_dir("config_show_missing");
    let config_path = dir.join("missing.json");

    let output = run_formgate(&config_path, &["--json", "config", "show"]);
    assert!(output.status.success());

    let json = parse_json_output(&output);
    assert!(json["result"].get("gates").is_none());

    cleanup_test_dir(&dir);
}

#[test]
fn test_config_show_accepts_json5() {
    let dir = create_test_dir("config_json5");
    let config_path = dir.join("config.json");
    fs::write(
        &config_path,
        "{\n  // closed: unparseable settings block the action\n  settings: { on_error: 'closed', },\n}\n",
    )
    .unwrap();

    let output = run_formgate(&config_path, &["--json", "config", "show"]);
    assert!(output.status.success());
    let json = parse_json_output(&output);
    assert_eq!(json["result"]["settings"]["on_error"], "closed");

    cleanup_test_dir(&dir);
}

#[test]
fn test_config_path_respects_override() {
    let dir = create_test_dir("config_path");
    let config_path = create_test_config(&dir);

    let output = run_formgate(&config_path, &["--no-json", "config", "path"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), config_path.display().to_string());

    cleanup_test_dir(&dir);
}

#[test]
fn test_config_default_has_example_gates() {
    let dir = create_test_dir("config_default");
    let config_path = create_test_config(&dir);

    let output = run_formgate(&config_path, &["--json", "config", "default"]);
    assert!(output.status.success());

    let json = parse_json_output(&output);
    let gates = json["result"]["gates"].as_array().unwrap();
    assert_eq!(gates.len(), 3);
    assert_eq!(gates[1]["rule"], "dontSend");

    cleanup_test_dir(&dir);
}

// ============================================================================
// config verify
// ============================================================================

#[test]
fn test_config_verify_valid() {
    let dir = create_test_dir("config_verify_valid");
    let config_path = create_test_config(&dir);

    let output = run_formgate(&config_path, &["--no-json", "config", "verify"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Configuration is valid"));

    cleanup_test_dir(&dir);
}

#[test]
fn test_config_verify_reports_errors() {
    let dir = create_test_dir("config_verify_errors");
    let config_path = write_json(
        &dir,
        "config.json",
        &json!({
            "gates": [
                {
                    "name": "a",
                    "kind": "page",
                    "conditions": {
                        "conditions": [{ "field": "{age}", "operator": "greater-then", "value": "3" }]
                    }
                },
                { "name": "a", "kind": "page" }
            ]
        }),
    );

    let output = run_formgate(&config_path, &["--json", "config", "verify"]);
    assert_eq!(output.status.code(), Some(4));

    let json = parse_json_output(&output);
    let details = json["error"]["data"]["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert!(details[0]
        .as_str()
        .unwrap()
        .starts_with("gates[0].conditions[0]: unknown operator 'greater-then'"));
    assert_eq!(details[1], "gates[1]: duplicate gate name 'a'");

    cleanup_test_dir(&dir);
}

#[test]
fn test_invalid_config_exit_code_4() {
    let dir = create_test_dir("config_invalid");
    let config_path = dir.join("config.json");
    fs::write(&config_path, "{ settings: ").unwrap();
    let submission_path = write_json(&dir, "submission.json", &sample_submission());

    let output = run_formgate(
        &config_path,
        &["--no-json", "gates", submission_path.to_str().unwrap()],
    );

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse config file"), "stderr: {}", stderr);

    cleanup_test_dir(&dir);
}
