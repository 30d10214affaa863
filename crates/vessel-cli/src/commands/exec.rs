//! `vsl exec` — Execute a command inside a running container.

use clap::Args;
use vessel_runtime::engine::Engine;

/// Arguments for the `exec` command.
#[derive(Args, Debug)]
pub struct ExecArgs {
    /// Target container (name, ID, or ID prefix).
    pub container: String,

    /// Command and arguments to execute.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Executes the `exec` command, propagating the command's exit code.
///
/// # Errors
///
/// Returns an error if the container is not running or the command
/// cannot be spawned.
pub fn execute(args: ExecArgs, engine: &Engine) -> anyhow::Result<()> {
    let output = engine
        .exec(&args.container, &args.command)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    if output.exit_code != 0 {
        std::process::exit(output.exit_code);
    }
    Ok(())
}
