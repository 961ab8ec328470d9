use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::conditions::{GateKind, GateSettings, OperatorRegistry, SubmissionContext};
use crate::config::{self, Config};

use super::exit_codes;
use super::output::{self, CheckData, EvalData, GateData, OperatorData, OutputMode};

#[derive(Parser)]
#[command(name = "formgate")]
#[command(about = "Evaluate form conditional logic against submissions")]
#[command(version)]
pub struct Cli {
    /// Path to config file (overrides FORMGATE_CONFIG env var and default location)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Evaluate condition settings against a submission
    Eval {
        /// Condition settings file ("-" for stdin)
        conditions: PathBuf,

        /// Submission file with "attributes" and "fields" ("-" for stdin)
        submission: PathBuf,

        /// Show how each condition was evaluated
        #[arg(short, long)]
        explain: bool,

        /// Apply the configured on_error policy when the settings are invalid
        #[arg(long)]
        fallback: bool,
    },

    /// Check condition settings for unknown operators and bad operands
    Check {
        /// Condition settings file ("-" for stdin)
        conditions: PathBuf,
    },

    /// Evaluate the gates defined in the config against a submission
    Gates {
        /// Submission file with "attributes" and "fields" ("-" for stdin)
        submission: PathBuf,

        /// Only evaluate gates of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Only evaluate the gate with this name
        #[arg(short, long)]
        name: Option<String>,
    },

    /// List available operators and their aliases
    Operators,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Show configuration file path
    Path,
    /// Show an example configuration with gates and aliases
    Default,
    /// Verify configuration file for errors
    Verify,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum KindArg {
    Field,
    Page,
    Notification,
    Integration,
}

impl From<KindArg> for GateKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Field => GateKind::Field,
            KindArg::Page => GateKind::Page,
            KindArg::Notification => GateKind::Notification,
            KindArg::Integration => GateKind::Integration,
        }
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet);

    match cli.command {
        Commands::Eval {
            conditions,
            submission,
            explain,
            fallback,
        } => {
            let config = load_config(config_path, output_mode);
            let registry = build_registry(&config, output_mode);
            let evaluator = config.evaluator(&registry);
            let ctx = read_submission(&submission, output_mode);

            let settings = match parse_settings(&conditions) {
                Ok(settings) => settings,
                Err(e) if fallback => {
                    let policy = config.settings.on_error;
                    let proceed = policy.decision();
                    log::warn!("{:#}, failing {:?}", e, policy);

                    if output_mode.is_json() {
                        output::print_json(&EvalData {
                            passed: false,
                            proceed,
                            evaluation: None,
                        });
                    } else if !output_mode.is_quiet() {
                        let verb = if proceed { "proceeds" } else { "blocked" };
                        println!("! Invalid condition settings: action {} ({:?})", verb, policy);
                    }

                    if !proceed {
                        std::process::exit(exit_codes::NOT_PASSED);
                    }
                    return Ok(());
                }
                Err(e) => fail(output_mode, exit_codes::INVALID_INPUT, &format!("{:#}", e), vec![]),
            };

            let evaluation = evaluator.trace(&settings.conditions, &ctx);
            let proceed = settings.proceeds_when(evaluation.passed);

            if output_mode.is_json() {
                output::print_json(&EvalData {
                    passed: evaluation.passed,
                    proceed,
                    evaluation: explain.then_some(&evaluation),
                });
            } else if !output_mode.is_quiet() {
                if explain {
                    println!(
                        "{} ({} of {} conditions counted)",
                        evaluation.combinator,
                        evaluation.counted(),
                        evaluation.conditions.len()
                    );
                    for trace in &evaluation.conditions {
                        println!("{}", output::format_trace(trace));
                    }
                }

                if evaluation.passed {
                    println!("✓ Conditions passed");
                } else {
                    println!("✗ Conditions did not pass");
                }
                if !settings.enabled {
                    println!("  conditions disabled, action proceeds");
                } else if !settings.rule.is_positive() {
                    let verb = if proceed { "proceeds" } else { "blocked" };
                    println!("  rule {:?}: action {}", settings.rule, verb);
                }
            }

            if !proceed {
                std::process::exit(exit_codes::NOT_PASSED);
            }
            Ok(())
        }

        Commands::Check { conditions } => {
            let config = load_config(config_path, output_mode);
            let registry = build_registry(&config, output_mode);
            let evaluator = config.evaluator(&registry);

            let settings = read_settings(&conditions, output_mode);
            let problems = evaluator.lint(&settings.conditions);
            let valid = problems.is_empty();

            if output_mode.is_json() {
                output::print_json(&CheckData {
                    valid,
                    conditions: settings.conditions.len(),
                    problems: problems.clone(),
                });
            } else if !output_mode.is_quiet() || !valid {
                if valid {
                    println!(
                        "✓ {} condition(s) OK: {}",
                        settings.conditions.len(),
                        conditions.display()
                    );
                } else {
                    println!(
                        "✗ {} problem(s) in {}",
                        problems.len(),
                        conditions.display()
                    );
                    println!();
                    for problem in &problems {
                        println!("  - {}", problem);
                    }
                }
            }

            if !valid {
                std::process::exit(exit_codes::INVALID_INPUT);
            }
            Ok(())
        }

        Commands::Gates {
            submission,
            kind,
            name,
        } => {
            let config = load_config(config_path, output_mode);
            let registry = build_registry(&config, output_mode);
            let evaluator = config.evaluator(&registry);
            let ctx = read_submission(&submission, output_mode);

            let kind = kind.map(GateKind::from);
            let gates: Vec<_> = config
                .gates
                .iter()
                .filter(|g| kind.map_or(true, |k| g.kind == k))
                .filter(|g| name.as_deref().map_or(true, |n| g.name == n))
                .collect();

            if let Some(name) = &name {
                if gates.is_empty() {
                    fail(
                        output_mode,
                        exit_codes::ERROR,
                        &format!("no gate named '{}'", name),
                        vec![],
                    );
                }
            }

            let results: Vec<GateData> = gates
                .iter()
                .map(|gate| GateData {
                    name: gate.name.clone(),
                    kind: gate.kind,
                    enabled: gate.settings.enabled,
                    proceed: gate.decide(&evaluator, &ctx),
                })
                .collect();

            if output_mode.is_json() {
                output::print_json(&results);
            } else if !output_mode.is_quiet() {
                if results.is_empty() {
                    println!("No gates configured");
                }
                for result in &results {
                    let marker = if result.proceed { "✓" } else { "✗" };
                    let state = if !result.enabled {
                        "proceed (disabled)"
                    } else if result.proceed {
                        "proceed"
                    } else {
                        "blocked"
                    };
                    println!("{} {:<13} {:<24} {}", marker, result.kind, result.name, state);
                }
            }

            Ok(())
        }

        Commands::Operators => {
            let config = load_config(config_path, output_mode);
            let registry = build_registry(&config, output_mode);
            let operators = list_operators(&registry);

            if output_mode.is_json() {
                output::print_json(&operators);
            } else if !output_mode.is_quiet() {
                for op in &operators {
                    if op.aliases.is_empty() {
                        println!("{}", op.name);
                    } else {
                        println!("{:<18} {}", op.name, op.aliases.join(", "));
                    }
                }
            }

            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = load_config(config_path, output_mode);
                print_config(&config, output_mode)
            }
            ConfigCommands::Path => {
                let path = config::get_config_path(config_path)?;
                if output_mode.is_json() {
                    output::print_json(&serde_json::json!({
                        "path": path.display().to_string(),
                        "exists": path.exists(),
                    }));
                } else if !output_mode.is_quiet() {
                    println!("{}", path.display());
                }
                Ok(())
            }
            ConfigCommands::Default => print_config(&config::default_with_examples(), output_mode),
            ConfigCommands::Verify => {
                let path = config::get_config_path(config_path)?;
                let errors = match config::verify(&path) {
                    Ok(errors) => errors,
                    Err(e) => fail(output_mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), vec![]),
                };

                if errors.is_empty() {
                    if output_mode.is_json() {
                        output::print_json(&serde_json::json!({
                            "valid": true,
                            "path": path.display().to_string(),
                        }));
                    } else if !output_mode.is_quiet() {
                        println!("✓ Configuration is valid: {}", path.display());
                    }
                    return Ok(());
                }

                if output_mode.is_json() {
                    output::print_json_error(
                        exit_codes::CONFIG_ERROR,
                        "configuration validation failed",
                        errors,
                    );
                } else {
                    println!(
                        "✗ Configuration has {} error(s): {}",
                        errors.len(),
                        path.display()
                    );
                    println!();
                    for error in &errors {
                        println!("  - {}", error);
                    }
                }
                std::process::exit(exit_codes::CONFIG_ERROR);
            }
        },

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "formgate", &mut io::stdout());
            Ok(())
        }
    }
}

/// print an error in the active output mode and exit with `code`
fn fail(output_mode: OutputMode, code: i32, message: &str, details: Vec<String>) -> ! {
    if output_mode.is_json() {
        output::print_json_error(code, message, details);
    } else {
        eprintln!("Error: {}", message);
        for detail in &details {
            eprintln!("  - {}", detail);
        }
    }
    std::process::exit(code);
}

fn load_config(config_path: Option<&Path>, output_mode: OutputMode) -> Config {
    match config::load(config_path) {
        Ok(config) => config,
        Err(e) => fail(output_mode, exit_codes::CONFIG_ERROR, &format!("{:#}", e), vec![]),
    }
}

fn build_registry(config: &Config, output_mode: OutputMode) -> OperatorRegistry {
    match config.registry() {
        Ok(registry) => registry,
        Err(e) => fail(
            output_mode,
            exit_codes::CONFIG_ERROR,
            &format!("operator_aliases: {}", e),
            vec![],
        ),
    }
}

fn read_settings(path: &Path, output_mode: OutputMode) -> GateSettings {
    match parse_settings(path) {
        Ok(settings) => settings,
        Err(e) => fail(output_mode, exit_codes::INVALID_INPUT, &format!("{:#}", e), vec![]),
    }
}

/// read stored conditional settings (enable flag, rule and conditions)
fn parse_settings(path: &Path) -> Result<GateSettings> {
    let content = read_input(path)?;
    let json: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;
    GateSettings::from_stored(&json)
        .map_err(|e| anyhow!("invalid condition settings in {}: {}", path.display(), e))
}

fn read_submission(path: &Path, output_mode: OutputMode) -> SubmissionContext {
    let parsed = read_input(path).and_then(|content| {
        SubmissionContext::from_json(&content)
            .with_context(|| format!("invalid submission in {}", path.display()))
    });

    match parsed {
        Ok(ctx) => ctx,
        Err(e) => fail(output_mode, exit_codes::INVALID_INPUT, &format!("{:#}", e), vec![]),
    }
}

fn print_config(config: &Config, output_mode: OutputMode) -> Result<()> {
    if output_mode.is_json() {
        output::print_json(config);
    } else if !output_mode.is_quiet() {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        println!("{}", json);
    }
    Ok(())
}

/// read a file, or stdin when the path is "-"
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut content = String::new();
        io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(content);
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn list_operators(registry: &OperatorRegistry) -> Vec<OperatorData> {
    registry
        .names()
        .map(|name| OperatorData {
            name: name.to_string(),
            aliases: registry
                .aliases()
                .filter(|(_, target)| *target == name)
                .map(|(alias, _)| alias.to_string())
                .collect(),
        })
        .collect()
}
