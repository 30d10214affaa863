//! `vsl up` — Start a compose project.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;
use vessel_compose::project::Project;
use vessel_runtime::engine::Engine;
use vessel_runtime::supervisor::Supervisor;

/// Arguments for the `up` command.
#[derive(Args, Debug)]
pub struct UpArgs {
    /// Path to the compose file.
    #[arg(short, long, default_value = vessel_common::constants::DEFAULT_COMPOSE_FILE)]
    pub file: String,

    /// Start the project and return instead of supervising.
    #[arg(short, long)]
    pub detach: bool,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const RESET: &str = "\x1b[0m";

/// Executes the `up` command.
///
/// # Errors
///
/// Returns an error if the compose file is invalid or any service fails
/// to start.
pub fn execute(args: UpArgs, engine: &Engine) -> anyhow::Result<()> {
    let start = Instant::now();
    let path = std::path::Path::new(&args.file);
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "Compose file not found: {}\n\
             Create a {} file or specify a path: vsl up -f <file>",
            args.file,
            vessel_common::constants::DEFAULT_COMPOSE_FILE
        ));
    }

    let project = Project::load(path).map_err(|e| anyhow::anyhow!("{e}"))?;
    let started = project.up(engine).map_err(|e| anyhow::anyhow!("{e}"))?;

    eprintln!();
    eprintln!(
        "  {GREEN}{BOLD}Started {}{RESET} container(s) in {:.1}s:",
        started.len(),
        start.elapsed().as_secs_f64()
    );
    eprintln!();
    for entry in &started {
        let ports = entry
            .ports
            .iter()
            .map(|p| format!(" {CYAN}->{RESET} localhost:{}", p.host))
            .collect::<String>();
        eprintln!(
            "    {GREEN}●{RESET} {BOLD}{}{RESET} {DIM}[{}]{RESET}{ports}",
            entry.name,
            entry.id.short()
        );
    }

    if args.detach {
        eprintln!();
        eprintln!("  Running detached. Use {BOLD}vsl down{RESET} to stop the project.");
        return Ok(());
    }

    eprintln!();
    eprintln!("  Press {BOLD}Ctrl+C{RESET} to stop all containers...");

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let supervisor = Supervisor::new(engine);
    let _ = supervisor
        .run_until_shutdown(&shutdown)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    eprintln!("  {GREEN}All containers stopped.{RESET}");
    Ok(())
}
