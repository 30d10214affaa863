//! `vsl rm` — Remove containers.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Containers to remove (name, ID, or ID prefix).
    #[arg(required = true)]
    pub containers: Vec<String>,

    /// Stop a running container before removing it.
    #[arg(short, long)]
    pub force: bool,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if any container cannot be removed.
pub fn execute(args: RmArgs, engine: &Engine) -> anyhow::Result<()> {
    for reference in &args.containers {
        engine
            .remove(reference, args.force)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        println!("{reference}");
    }
    Ok(())
}
