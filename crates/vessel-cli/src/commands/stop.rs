//! `vsl stop` — Stop running containers.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Containers to stop (name, ID, or ID prefix).
    #[arg(required_unless_present = "all")]
    pub containers: Vec<String>,

    /// Stop every running container.
    #[arg(long, conflicts_with = "containers")]
    pub all: bool,

    /// Seconds to wait for graceful exit before SIGKILL.
    #[arg(short = 't', long)]
    pub time: Option<u64>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if any container cannot be stopped.
pub fn execute(args: StopArgs, engine: &Engine) -> anyhow::Result<()> {
    if args.all {
        engine.stop_all().map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("All containers stopped.");
        return Ok(());
    }

    for reference in &args.containers {
        engine
            .stop(reference, args.time)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{reference}");
    }
    Ok(())
}
