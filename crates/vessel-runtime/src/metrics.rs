//! Resource usage snapshots for running containers.
//!
//! Reads the container's cgroup stat files to provide live memory and
//! CPU figures for `vsl ps`.

use vessel_common::error::Result;
use vessel_common::types::ContainerId;
use vessel_core::cgroup::CgroupManager;

/// Snapshot of a container's resource usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Current memory usage in bytes.
    pub memory_bytes: u64,
    /// Cumulative CPU time in microseconds.
    pub cpu_usec: u64,
}

/// Collects a metrics snapshot for the given container.
///
/// # Errors
///
/// Returns an error if the container's cgroup does not exist or its stat
/// files cannot be read.
pub fn collect_metrics(container_id: &ContainerId) -> Result<MetricsSnapshot> {
    let cgroup = CgroupManager::open(container_id.as_str())?;
    let usage = cgroup.usage()?;
    tracing::debug!(
        id = %container_id,
        memory = usage.memory_bytes,
        cpu_usec = usage.cpu_usec,
        "metrics collected"
    );
    Ok(MetricsSnapshot {
        memory_bytes: usage.memory_bytes,
        cpu_usec: usage.cpu_usec,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_for_unknown_container_fail() {
        let id = ContainerId::new("no-such-container-cgroup");
        assert!(collect_metrics(&id).is_err());
    }
}
