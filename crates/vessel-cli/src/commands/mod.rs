//! CLI command definitions and dispatch.

pub mod down;
pub mod exec;
pub mod images;
pub mod import;
pub mod logs;
pub mod ps;
pub mod rm;
pub mod run;
pub mod start;
pub mod stop;
pub mod tag;
pub mod up;
pub mod volume;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use vessel_common::config::VesselConfig;
use vessel_runtime::engine::Engine;

/// Vessel — daemon-less container lifecycle manager.
#[derive(Parser, Debug)]
#[command(name = "vsl", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Base directory for Vessel state and data.
    #[arg(long, global = true, env = "VESSEL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create and start a container from an image.
    Run(run::RunArgs),
    /// List containers.
    Ps(ps::PsArgs),
    /// Stop running containers.
    Stop(stop::StopArgs),
    /// Start stopped containers.
    Start(start::StartArgs),
    /// Remove containers.
    Rm(rm::RmArgs),
    /// Execute a command inside a running container.
    Exec(exec::ExecArgs),
    /// View container logs.
    Logs(logs::LogsArgs),
    /// List or remove images.
    Images(images::ImagesArgs),
    /// Import a tar archive as an image layer.
    Import(import::ImportArgs),
    /// Add a tag to an existing image.
    Tag(tag::TagArgs),
    /// Manage named volumes.
    Volume(volume::VolumeArgs),
    /// Start a compose project.
    Up(up::UpArgs),
    /// Stop and remove a compose project.
    Down(down::DownArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.data_dir.map_or_else(VesselConfig::default, VesselConfig::with_data_dir);
    let engine = Engine::with_config(config).map_err(|e| anyhow::anyhow!("{e}"))?;

    match cli.command {
        Command::Run(args) => run::execute(args, &engine),
        Command::Ps(args) => ps::execute(args, &engine),
        Command::Stop(args) => stop::execute(args, &engine),
        Command::Start(args) => start::execute(args, &engine),
        Command::Rm(args) => rm::execute(args, &engine),
        Command::Exec(args) => exec::execute(args, &engine),
        Command::Logs(args) => logs::execute(args, &engine),
        Command::Images(args) => images::execute(args, &engine),
        Command::Import(args) => import::execute(args, &engine),
        Command::Tag(args) => tag::execute(args, &engine),
        Command::Volume(args) => volume::execute(args, &engine),
        Command::Up(args) => up::execute(args, &engine),
        Command::Down(args) => down::execute(args, &engine),
    }
}
