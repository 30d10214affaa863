//! Executing commands inside a running container.
//!
//! Joins the target container's namespaces with `setns(2)` from a
//! `pre_exec` hook, so the spawned command sees the container's mount
//! tree, hostname, and PID space while its output is captured normally.

use vessel_common::error::{Result, VesselError};
use vessel_common::types::ContainerId;
use vessel_core::namespace::NamespaceConfig;

/// Output from an exec command.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Standard output from the command.
    pub stdout: String,
    /// Standard error from the command.
    pub stderr: String,
    /// Exit code returned by the command.
    pub exit_code: i32,
}

/// Joins the namespaces of a running container and executes a command.
///
/// # Errors
///
/// Returns an error if the command is empty or the process cannot be
/// spawned; namespace join failures surface as the child failing to start.
#[cfg(target_os = "linux")]
pub fn exec_in_container(
    container_id: &ContainerId,
    pid: u32,
    command: &[String],
    namespaces: &NamespaceConfig,
) -> Result<ExecOutput> {
    use std::os::unix::process::CommandExt;

    tracing::info!(id = %container_id, pid, cmd = ?command, "exec into container");

    let Some((program, args)) = command.split_first() else {
        return Err(VesselError::Config {
            message: "exec command is empty".into(),
        });
    };

    let mut cmd = std::process::Command::new(program);
    let _ = cmd.args(args);
    let config = *namespaces;
    // SAFETY: the pre_exec hook only calls setns and chdir, both
    // async-signal-safe, before exec in the forked child.
    unsafe {
        let _ = cmd.pre_exec(move || {
            vessel_core::namespace::join_namespaces(pid, &config)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            // Joining the mount namespace lands us in the container's
            // mount tree but keeps the old working directory.
            std::env::set_current_dir("/")
        });
    }

    let output = cmd.output().map_err(|e| VesselError::Io {
        path: std::path::PathBuf::from(program),
        source: e,
    })?;

    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    })
}

/// Joins the namespaces of a running container and executes a command.
///
/// On non-Linux platforms, returns an error because namespace operations
/// require the Linux kernel.
///
/// # Errors
///
/// Always returns an error on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn exec_in_container(
    _container_id: &ContainerId,
    _pid: u32,
    _command: &[String],
    _namespaces: &NamespaceConfig,
) -> Result<ExecOutput> {
    Err(VesselError::Config {
        message: "exec requires Linux".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_empty_command_is_rejected() {
        let id = ContainerId::new("c1");
        let result = exec_in_container(&id, 1, &[], &NamespaceConfig::default());
        assert!(result.is_err());
    }
}
