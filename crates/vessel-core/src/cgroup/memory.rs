//! Memory resource control via cgroups v2.
//!
//! Manages `memory.max`, `memory.high`, and the `memory.current` counter.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Sets the hard memory limit for a cgroup.
///
/// # Errors
///
/// Returns an error if writing to `memory.max` fails.
pub fn set_memory_max(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let control = cgroup_path.join("memory.max");
    std::fs::write(&control, bytes.to_string()).map_err(|e| VesselError::io(control, e))?;
    tracing::debug!(bytes, "memory.max set");
    Ok(())
}

/// Sets the memory high watermark (throttling threshold).
///
/// # Errors
///
/// Returns an error if writing to `memory.high` fails.
pub fn set_memory_high(cgroup_path: &Path, bytes: u64) -> Result<()> {
    let control = cgroup_path.join("memory.high");
    std::fs::write(&control, bytes.to_string()).map_err(|e| VesselError::io(control, e))?;
    tracing::debug!(bytes, "memory.high set");
    Ok(())
}

/// Reads the current memory usage of a cgroup in bytes.
///
/// # Errors
///
/// Returns an error if `memory.current` cannot be read or parsed.
pub fn current_usage(cgroup_path: &Path) -> Result<u64> {
    let counter = cgroup_path.join("memory.current");
    let raw = std::fs::read_to_string(&counter).map_err(|e| VesselError::io(counter, e))?;
    raw.trim().parse().map_err(|_| VesselError::Config {
        message: format!("unparseable memory.current value: {}", raw.trim()),
    })
}
