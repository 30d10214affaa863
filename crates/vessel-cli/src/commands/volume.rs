//! `vsl volume` — Manage named volumes.

use clap::{Args, Subcommand};
use vessel_runtime::engine::Engine;

use crate::output::format_age;

/// Arguments for the `volume` command.
#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Volume operation to perform.
    #[command(subcommand)]
    pub action: VolumeAction,
}

/// Volume subcommands.
#[derive(Subcommand, Debug)]
pub enum VolumeAction {
    /// Create a named volume.
    Create {
        /// Volume name.
        name: String,
    },
    /// List volumes.
    Ls,
    /// Remove a volume and its data.
    Rm {
        /// Volume name.
        name: String,
    },
}

/// Executes the `volume` command.
///
/// # Errors
///
/// Returns an error if the operation fails or the volume is still
/// mounted by a container.
pub fn execute(args: VolumeArgs, engine: &Engine) -> anyhow::Result<()> {
    match args.action {
        VolumeAction::Create { name } => {
            let volume = engine
                .volumes()
                .create(&name)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{}", volume.name);
        }
        VolumeAction::Ls => {
            let volumes = engine.volumes().list().map_err(|e| anyhow::anyhow!("{e}"))?;
            if volumes.is_empty() {
                println!("No volumes found.");
                return Ok(());
            }
            println!("{:<20} {:<16} MOUNTPOINT", "NAME", "CREATED");
            for volume in &volumes {
                println!(
                    "{:<20} {:<16} {}",
                    volume.name,
                    format_age(&volume.created_at),
                    volume.mountpoint.display()
                );
            }
        }
        VolumeAction::Rm { name } => {
            if let Some(user) = engine
                .volume_in_use(&name)
                .map_err(|e| anyhow::anyhow!("{e}"))?
            {
                return Err(anyhow::anyhow!(
                    "volume {name} is in use by container {user}"
                ));
            }
            engine
                .volumes()
                .remove(&name)
                .map_err(|e| anyhow::anyhow!("{e}"))?;
            println!("{name}");
        }
    }
    Ok(())
}
