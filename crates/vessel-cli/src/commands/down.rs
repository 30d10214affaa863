//! `vsl down` — Stop and remove a compose project.

use clap::Args;
use vessel_compose::project::Project;
use vessel_runtime::engine::Engine;

/// Arguments for the `down` command.
#[derive(Args, Debug)]
pub struct DownArgs {
    /// Path to the compose file.
    #[arg(short, long, default_value = vessel_common::constants::DEFAULT_COMPOSE_FILE)]
    pub file: String,
}

/// Executes the `down` command.
///
/// Containers are stopped and removed in reverse dependency order; named
/// volumes are kept.
///
/// # Errors
///
/// Returns an error if the compose file is invalid or teardown fails.
pub fn execute(args: DownArgs, engine: &Engine) -> anyhow::Result<()> {
    let path = std::path::Path::new(&args.file);
    let project = Project::load(path).map_err(|e| anyhow::anyhow!("{e}"))?;
    project.down(engine).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Project {} stopped.", project.name);
    Ok(())
}
