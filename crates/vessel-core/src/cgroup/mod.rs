//! Cgroups v2 resource management.
//!
//! Creates per-container cgroups under the unified hierarchy at
//! `/sys/fs/cgroup/vessel/` and delegates limit writes and usage reads to
//! the per-controller submodules.

pub mod cpu;
pub mod io;
pub mod memory;

use std::path::{Path, PathBuf};

use vessel_common::error::{Result, VesselError};
use vessel_common::types::ResourceLimits;

/// Handle to a cgroup for a specific container.
#[derive(Debug)]
pub struct CgroupManager {
    /// Path to this container's cgroup directory.
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    path: PathBuf,
}

/// Point-in-time resource usage read from a cgroup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CgroupUsage {
    /// Current memory usage in bytes.
    pub memory_bytes: u64,
    /// Cumulative CPU time in microseconds.
    pub cpu_usec: u64,
}

#[cfg(target_os = "linux")]
impl CgroupManager {
    /// Creates a new cgroup for the given container ID.
    ///
    /// The cgroup is placed under `/sys/fs/cgroup/vessel/<container_id>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be created.
    pub fn create(container_id: &str) -> Result<Self> {
        let path = PathBuf::from(vessel_common::constants::CGROUP_V2_PATH)
            .join(vessel_common::constants::CGROUP_SUBTREE)
            .join(container_id);
        std::fs::create_dir_all(&path).map_err(|e| VesselError::io(path.clone(), e))?;
        tracing::info!(path = %path.display(), "cgroup created");
        Ok(Self { path })
    }

    /// Opens the cgroup of an existing container without creating it.
    ///
    /// # Errors
    ///
    /// Returns `VesselError::NotFound` if the cgroup directory does not exist.
    pub fn open(container_id: &str) -> Result<Self> {
        let path = PathBuf::from(vessel_common::constants::CGROUP_V2_PATH)
            .join(vessel_common::constants::CGROUP_SUBTREE)
            .join(container_id);
        if !path.exists() {
            return Err(VesselError::NotFound {
                kind: "cgroup",
                id: container_id.to_string(),
            });
        }
        Ok(Self { path })
    }

    /// Applies resource limits to this cgroup.
    ///
    /// Delegates to subsystem-specific writers for CPU, memory, and I/O.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to cgroup control files fails.
    pub fn apply_limits(&self, limits: &ResourceLimits) -> Result<()> {
        if let Some(mem) = limits.memory_bytes {
            memory::set_memory_max(&self.path, mem)?;
        }
        if let Some(cpu_weight) = limits.cpu_shares {
            cpu::set_cpu_weight(&self.path, cpu_weight)?;
        }
        if let Some(io_weight) = limits.io_weight {
            io::set_io_weight(&self.path, io_weight)?;
        }
        Ok(())
    }

    /// Adds a process to this cgroup by writing its PID.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `cgroup.procs` fails.
    pub fn add_process(&self, pid: u32) -> Result<()> {
        let procs_path = self.path.join("cgroup.procs");
        std::fs::write(&procs_path, pid.to_string())
            .map_err(|e| VesselError::io(procs_path, e))?;
        tracing::debug!(pid, "added process to cgroup");
        Ok(())
    }

    /// Reads a usage snapshot from this cgroup's stat files.
    ///
    /// # Errors
    ///
    /// Returns an error if the stat files cannot be read or parsed.
    pub fn usage(&self) -> Result<CgroupUsage> {
        Ok(CgroupUsage {
            memory_bytes: memory::current_usage(&self.path)?,
            cpu_usec: cpu::usage_usec(&self.path)?,
        })
    }

    /// Removes the cgroup and releases resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the cgroup directory cannot be removed.
    pub fn destroy(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_dir(&self.path).map_err(|e| VesselError::io(self.path.clone(), e))?;
        }
        tracing::info!(path = %self.path.display(), "cgroup destroyed");
        Ok(())
    }

    /// Returns the path of this cgroup directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(not(target_os = "linux"))]
impl CgroupManager {
    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn create(_container_id: &str) -> Result<Self> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn open(_container_id: &str) -> Result<Self> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn apply_limits(&self, _limits: &ResourceLimits) -> Result<()> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn add_process(&self, _pid: u32) -> Result<()> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn usage(&self) -> Result<CgroupUsage> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }

    /// Stub for non-Linux platforms.
    ///
    /// # Errors
    ///
    /// Always returns an error — cgroup management requires Linux.
    pub fn destroy(&self) -> Result<()> {
        Err(VesselError::Config {
            message: "Linux required for native container operations".into(),
        })
    }
}
