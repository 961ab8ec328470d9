use anyhow::Result;
use clap::Parser;
use formgate::cli::{self, Cli};

fn main() -> Result<()> {
    // handle broken pipe gracefully (e.g., when piping to `head` or `jq` that exits early)
    reset_sigpipe();

    let cli = Cli::parse();
    cli::run(cli)
}

/// reset SIGPIPE to default behavior (terminate process) instead of panicking
fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}
