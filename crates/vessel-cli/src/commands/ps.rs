//! `vsl ps` — List containers.

use clap::Args;
use vessel_common::types::ContainerState;
use vessel_runtime::engine::Engine;

use crate::output::{format_age, format_bytes};

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including stopped).
    #[arg(short, long)]
    pub all: bool,
}

/// Executes the `ps` command.
///
/// Shows live memory usage for running containers, read from their
/// cgroups.
///
/// # Errors
///
/// Returns an error if state loading fails.
pub fn execute(args: PsArgs, engine: &Engine) -> anyhow::Result<()> {
    let containers = engine.list().map_err(|e| anyhow::anyhow!("{e}"))?;

    let filtered: Vec<_> = if args.all {
        containers
    } else {
        containers
            .into_iter()
            .filter(|c| c.state == ContainerState::Running)
            .collect()
    };

    if filtered.is_empty() {
        println!("No containers found.");
        return Ok(());
    }

    println!(
        "{:<14} {:<20} {:<24} {:<10} {:<8} {:<10} {:<16}",
        "CONTAINER ID", "NAME", "IMAGE", "STATE", "PID", "MEMORY", "CREATED"
    );
    for c in &filtered {
        let memory = engine
            .metrics(c.id.as_str())
            .map_or_else(|_| "-".to_string(), |m| format_bytes(m.memory_bytes));
        println!(
            "{:<14} {:<20} {:<24} {:<10} {:<8} {:<10} {:<16}",
            c.id.short(),
            c.name,
            c.image_ref,
            c.state.to_string(),
            c.pid.map_or_else(|| "-".to_string(), |p| p.to_string()),
            memory,
            format_age(&c.created_at)
        );
    }

    Ok(())
}
