mod schema;

pub use schema::{Config, Settings};

use anyhow::{anyhow, Context, Result};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::conditions::{
    Combinator, Condition, ConditionSet, FailurePolicy, Gate, GateKind, GateRule, GateSettings,
};

const CONFIG_ENV_VAR: &str = "FORMGATE_CONFIG";

/// config path: explicit override, then `FORMGATE_CONFIG`, then ~/.formgate/config.json
pub fn get_config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }

    let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
    Ok(home.join(".formgate").join("config.json"))
}

/// load config; a missing file yields the defaults
pub fn load(override_path: Option<&Path>) -> Result<Config> {
    let path = get_config_path(override_path)?;

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// parse config text (JSON5: comments and trailing commas allowed)
pub fn parse(content: &str) -> Result<Config> {
    json5::from_str(content).map_err(|e| anyhow!("{}", e))
}

/// Verify configuration file and return a list of errors
pub fn verify(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(anyhow!("config file not found: {}", path.display()));
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config = parse(&content).map_err(|e| anyhow!("invalid config: {}", e))?;

    Ok(verify_config(&config))
}

/// check a parsed config for problems that would silently fail at evaluation time
pub fn verify_config(config: &Config) -> Vec<String> {
    let mut errors = Vec::new();

    if config.settings.attribute_marker.trim().is_empty() {
        errors.push("settings.attribute_marker: must not be empty".to_string());
    }

    let registry = match config.registry() {
        Ok(r) => r,
        Err(e) => {
            errors.push(format!("operator_aliases: {}", e));
            return errors;
        }
    };

    let evaluator = config.evaluator(&registry);

    let mut seen = HashSet::new();
    for (i, gate) in config.gates.iter().enumerate() {
        let prefix = format!("gates[{}]", i);

        if gate.name.trim().is_empty() {
            errors.push(format!("{}: name must not be empty", prefix));
        } else if !seen.insert(gate.name.as_str()) {
            errors.push(format!("{}: duplicate gate name '{}'", prefix, gate.name));
        }

        for problem in evaluator.lint(&gate.settings.conditions) {
            errors.push(format!("{}.{}", prefix, problem));
        }
    }

    errors
}

/// generates a config with example gates and aliases
pub fn default_with_examples() -> Config {
    let mut config = Config::default();
    config.settings.on_error = FailurePolicy::Open;
    config
        .operator_aliases
        .insert("is".to_string(), "equals".to_string());

    config.gates = vec![
        Gate {
            name: "company-name".to_string(),
            kind: GateKind::Field,
            settings: GateSettings::new(
                GateRule::Show,
                ConditionSet::new(
                    Combinator::All,
                    vec![Condition::equals("{enquiryType}", "business")],
                ),
            ),
        },
        Gate {
            name: "admin-notification".to_string(),
            kind: GateKind::Notification,
            settings: GateSettings::new(
                GateRule::DontSend,
                ConditionSet::new(
                    Combinator::Any,
                    vec![
                        Condition::equals("{submission:status}", "spam"),
                        Condition::new("{email}", "ends-with", "@example.com"),
                    ],
                ),
            ),
        },
        Gate {
            name: "crm-sync".to_string(),
            kind: GateKind::Integration,
            settings: GateSettings::new(
                GateRule::Send,
                ConditionSet::new(
                    Combinator::All,
                    vec![
                        Condition::new("{newsletter}", "contains", "yes"),
                        Condition::new("{age}", ">=", "18"),
                    ],
                ),
            ),
        },
    ];

    config
}
