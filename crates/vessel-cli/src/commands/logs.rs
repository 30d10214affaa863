//! `vsl logs` — View container logs.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `logs` command.
#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Target container (name, ID, or ID prefix).
    pub container: String,

    /// Show only the last N lines.
    #[arg(long)]
    pub tail: Option<usize>,
}

/// Executes the `logs` command.
///
/// # Errors
///
/// Returns an error if the container does not resolve or its log file
/// cannot be read.
pub fn execute(args: LogsArgs, engine: &Engine) -> anyhow::Result<()> {
    let content = match args.tail {
        Some(lines) => engine.logs_tail(&args.container, lines),
        None => engine.logs(&args.container),
    }
    .map_err(|e| anyhow::anyhow!("{e}"))?;

    if !content.is_empty() {
        println!("{content}");
    }
    Ok(())
}
