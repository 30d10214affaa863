//! `vsl run` — Create and start a container from an image.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;
use vessel_runtime::container::ContainerSpec;
use vessel_runtime::engine::Engine;
use vessel_runtime::supervisor::Supervisor;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference (`name`, `name:tag`, or ID prefix).
    pub image: String,

    /// Command to run instead of the image default.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,

    /// Run in the background and print the container ID.
    #[arg(short, long)]
    pub detach: bool,

    /// Assign a name to the container.
    #[arg(long)]
    pub name: Option<String>,

    /// Set environment variables (KEY=VALUE, repeatable).
    #[arg(short = 'e', long = "env")]
    pub env: Vec<String>,

    /// Publish a container port (HOST:CONTAINER, repeatable).
    #[arg(short = 'p', long = "publish")]
    pub publish: Vec<String>,

    /// Mount a volume (SOURCE:/TARGET[:ro], repeatable).
    #[arg(short = 'v', long = "volume")]
    pub volume: Vec<String>,

    /// Memory limit (e.g. 128m, 1g).
    #[arg(long)]
    pub memory: Option<String>,

    /// CPU weight (relative share, 1-10000).
    #[arg(long)]
    pub cpu_shares: Option<u64>,

    /// Restart policy: no, always, on-failure[:N].
    #[arg(long, default_value = "no")]
    pub restart: String,

    /// Container hostname.
    #[arg(long)]
    pub hostname: Option<String>,

    /// Mount the root filesystem read-only.
    #[arg(long)]
    pub read_only: bool,

    /// Remove the container after it exits (foreground only).
    #[arg(long)]
    pub rm: bool,
}

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Executes the `run` command.
///
/// # Errors
///
/// Returns an error if the spec is invalid or create/start fails.
pub fn execute(args: RunArgs, engine: &Engine) -> anyhow::Result<()> {
    let spec = build_spec(&args).map_err(|e| anyhow::anyhow!("{e}"))?;

    let created = engine.create(&spec).map_err(|e| anyhow::anyhow!("{e}"))?;
    let entry = engine
        .start(created.id.as_str())
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    if args.detach {
        println!("{}", entry.id);
        return Ok(());
    }

    eprintln!(
        "  {GREEN}●{RESET} {BOLD}{}{RESET} {DIM}[{}]{RESET} started",
        entry.name,
        entry.id.short()
    );
    wait_foreground(&args, engine, &entry)
}

/// Supervises the container until it exits or Ctrl+C stops it, then
/// propagates the container's exit code.
fn wait_foreground(
    args: &RunArgs,
    engine: &Engine,
    entry: &vessel_runtime::state::StateEntry,
) -> anyhow::Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let supervisor = Supervisor::new(engine);
    let exit_code = supervisor
        .wait_container(&entry.id, &shutdown)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let logs = engine
        .logs(entry.id.as_str())
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    if !logs.is_empty() {
        print!("{logs}");
    }

    if args.rm {
        engine
            .remove(entry.id.as_str(), true)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
    }

    match exit_code {
        Some(0) | None => Ok(()),
        Some(code) => {
            eprintln!("  container exited with code {code}");
            std::process::exit(code);
        }
    }
}

/// Builds the container spec from CLI flags.
fn build_spec(args: &RunArgs) -> vessel_common::error::Result<ContainerSpec> {
    let mut spec = ContainerSpec {
        name: args.name.clone(),
        image: args.image.clone(),
        command: args.command.clone(),
        hostname: args.hostname.clone(),
        readonly_rootfs: args.read_only,
        restart_policy: args.restart.parse()?,
        ..ContainerSpec::default()
    };

    for pair in &args.env {
        let (key, value) =
            pair.split_once('=')
                .ok_or_else(|| vessel_common::error::VesselError::Config {
                    message: format!("invalid environment variable (expected KEY=VALUE): {pair}"),
                })?;
        spec.env.push((key.to_string(), value.to_string()));
    }
    for port in &args.publish {
        spec.ports.push(port.parse()?);
    }
    for volume in &args.volume {
        spec.volumes.push(volume.parse()?);
    }
    if let Some(memory) = &args.memory {
        spec.limits.memory_bytes = Some(vessel_compose::spec::parse_memory(memory)?);
    }
    spec.limits.cpu_shares = args.cpu_shares;
    Ok(spec)
}
