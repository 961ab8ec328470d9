mod commands;
pub mod exit_codes;
pub mod output;

pub use commands::{Cli, Commands, ConfigCommands};

use anyhow::Result;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.quiet);
    commands::execute(cli)
}

/// initialize env_logger; `RUST_LOG` overrides the level picked from `-v`
fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(verbose >= 2)
        .try_init()
        .ok();
}
