//! `vsl import` — Import a tar archive as an image layer.

use std::path::PathBuf;

use clap::Args;
use vessel_image::store::ImageConfig;
use vessel_runtime::engine::Engine;

/// Arguments for the `import` command.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to a tar or tar.gz archive of the layer contents.
    pub archive: PathBuf,

    /// Tag for the new image (`name` or `name:tag`).
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Stack the layer on an existing image (reference).
    #[arg(long)]
    pub parent: Option<String>,

    /// Default command for containers (repeatable).
    #[arg(long = "cmd")]
    pub cmd: Vec<String>,

    /// Entrypoint prefix (repeatable).
    #[arg(long)]
    pub entrypoint: Vec<String>,

    /// Default environment variables (KEY=VALUE, repeatable).
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,

    /// Default working directory.
    #[arg(long)]
    pub workdir: Option<String>,
}

/// Executes the `import` command.
///
/// When `--parent` references an existing image, the new layer stacks on
/// that image's top layer and the parent's config fills any options not
/// given here.
///
/// # Errors
///
/// Returns an error if the archive or parent cannot be resolved or the
/// import fails.
pub fn execute(args: ImportArgs, engine: &Engine) -> anyhow::Result<()> {
    let parent = match &args.parent {
        Some(reference) => Some(
            engine
                .store()
                .resolve(reference)
                .map_err(|e| anyhow::anyhow!("{e}"))?,
        ),
        None => None,
    };

    let mut config = parent
        .as_ref()
        .map(|p| p.config.clone())
        .unwrap_or_default();
    if !args.cmd.is_empty() {
        config.cmd = args.cmd.clone();
    }
    if !args.entrypoint.is_empty() {
        config.entrypoint = args.entrypoint.clone();
    }
    if let Some(workdir) = &args.workdir {
        config.working_dir = Some(workdir.clone());
    }
    for pair in &args.env {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("invalid environment variable (expected KEY=VALUE): {pair}"))?;
        config.env.push((key.to_string(), value.to_string()));
    }

    let record = engine
        .store()
        .import_archive(
            &args.archive,
            args.tag.as_deref(),
            parent.as_ref().map(|p| &p.top_layer),
            config,
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    println!("{}", record.id);
    Ok(())
}
