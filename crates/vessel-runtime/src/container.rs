//! Container specification and process signaling.
//!
//! The [`ContainerSpec`] is what callers hand to the engine's `create`;
//! the signal helpers implement the SIGTERM, grace period, SIGKILL stop
//! sequence shared by `stop`, `rm --force`, and the supervisor.

use serde::{Deserialize, Serialize};
use vessel_common::error::Result;
use vessel_common::types::{PortMapping, ResourceLimits, RestartPolicy};

use crate::volume::VolumeMount;

/// User-facing configuration for creating a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// Human-readable name; generated from the ID when empty.
    pub name: Option<String>,
    /// Image reference (`name`, `name:tag`, or ID prefix).
    pub image: String,
    /// Command override; the image's default command when empty.
    pub command: Vec<String>,
    /// Additional environment variables, appended after image defaults.
    pub env: Vec<(String, String)>,
    /// Published port mappings.
    pub ports: Vec<PortMapping>,
    /// Volume mounts.
    pub volumes: Vec<VolumeMount>,
    /// Resource limits.
    pub limits: ResourceLimits,
    /// Restart policy.
    pub restart_policy: RestartPolicy,
    /// Hostname override; the short container ID when `None`.
    pub hostname: Option<String>,
    /// Remount the rootfs read-only after volumes are bound.
    pub readonly_rootfs: bool,
}

/// Returns whether the process with the given PID is still alive.
#[cfg(target_os = "linux")]
#[must_use]
pub fn is_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Returns whether the process with the given PID is still alive.
///
/// Always `false` on non-Linux platforms, where Vessel never spawns
/// container processes.
#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn is_alive(_pid: u32) -> bool {
    false
}

/// Sends a signal to a container's init process.
///
/// # Errors
///
/// Returns an error if the process cannot be signaled.
#[cfg(target_os = "linux")]
pub fn signal_process(pid: u32, signal: nix::sys::signal::Signal) -> Result<()> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), signal).map_err(|e| {
        vessel_common::error::VesselError::PermissionDenied {
            message: format!("signaling pid {pid} failed: {e}"),
        }
    })?;
    tracing::debug!(pid, ?signal, "signal delivered");
    Ok(())
}

/// Stops a container process: SIGTERM, wait up to `grace_secs`, SIGKILL.
///
/// Returns immediately if the process is already gone.
///
/// # Errors
///
/// Returns an error if signaling fails for a live process.
#[cfg(target_os = "linux")]
pub fn stop_process(pid: u32, grace_secs: u64) -> Result<()> {
    use nix::sys::signal::Signal;

    if !is_alive(pid) {
        return Ok(());
    }

    signal_process(pid, Signal::SIGTERM)?;
    tracing::info!(pid, "sent SIGTERM");

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(grace_secs);
    while std::time::Instant::now() < deadline {
        if !is_alive(pid) {
            return Ok(());
        }
        std::thread::sleep(std::time::Duration::from_millis(100));
    }

    if is_alive(pid) {
        signal_process(pid, Signal::SIGKILL)?;
        tracing::info!(pid, "sent SIGKILL");
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — process control requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn stop_process(_pid: u32, _grace_secs: u64) -> Result<()> {
    Err(vessel_common::error::VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}
