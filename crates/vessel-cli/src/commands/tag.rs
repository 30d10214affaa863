//! `vsl tag` — Add a tag to an existing image.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `tag` command.
#[derive(Args, Debug)]
pub struct TagArgs {
    /// Source image (tag, name, or ID prefix).
    pub source: String,

    /// New tag (`name` or `name:tag`).
    pub target: String,
}

/// Executes the `tag` command.
///
/// # Errors
///
/// Returns an error if the source image does not resolve.
pub fn execute(args: TagArgs, engine: &Engine) -> anyhow::Result<()> {
    engine
        .store()
        .tag(&args.source, &args.target)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    Ok(())
}
