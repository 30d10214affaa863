//! `vsl start` — Start stopped containers.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `start` command.
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Containers to start (name, ID, or ID prefix).
    #[arg(required = true)]
    pub containers: Vec<String>,
}

/// Executes the `start` command.
///
/// # Errors
///
/// Returns an error if any container cannot be started.
pub fn execute(args: StartArgs, engine: &Engine) -> anyhow::Result<()> {
    for reference in &args.containers {
        let entry = engine.start(reference).map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{}", entry.name);
    }
    Ok(())
}
