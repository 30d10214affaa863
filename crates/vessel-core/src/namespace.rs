//! Linux namespace management for container isolation.
//!
//! Namespaces are created at spawn time by passing [`NamespaceConfig`]
//! flags to `clone(2)`, which makes the container process PID 1 of its own
//! PID namespace. `setns(2)` is used to join the namespaces of an
//! already-running container for `exec`.

use vessel_common::error::Result;

/// Configuration for which namespaces to create or join.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceConfig {
    /// Isolate PID namespace.
    pub pid: bool,
    /// Isolate mount namespace.
    pub mount: bool,
    /// Isolate network namespace.
    pub network: bool,
    /// Isolate IPC namespace.
    pub ipc: bool,
    /// Isolate UTS (hostname) namespace.
    pub uts: bool,
}

impl Default for NamespaceConfig {
    fn default() -> Self {
        Self {
            pid: true,
            mount: true,
            network: false,
            ipc: true,
            uts: true,
        }
    }
}

impl NamespaceConfig {
    /// Returns the `/proc/<pid>/ns/*` entry names selected by this config,
    /// in join order (mount last, following `nsenter` convention).
    #[must_use]
    pub fn proc_ns_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.uts {
            names.push("uts");
        }
        if self.ipc {
            names.push("ipc");
        }
        if self.network {
            names.push("net");
        }
        if self.pid {
            names.push("pid");
        }
        if self.mount {
            names.push("mnt");
        }
        names
    }
}

#[cfg(target_os = "linux")]
impl NamespaceConfig {
    /// Returns the `clone(2)` flag set for the configured namespaces.
    #[must_use]
    pub fn clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.network {
            flags |= CloneFlags::CLONE_NEWNET;
        }
        if self.ipc {
            flags |= CloneFlags::CLONE_NEWIPC;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        flags
    }
}

/// Joins the configured namespaces of the process with the given PID.
///
/// Every `/proc/<pid>/ns/*` entry is opened before the first `setns(2)`
/// call: once the mount namespace is joined, the host's `/proc` paths are
/// no longer resolvable.
///
/// # Errors
///
/// Returns an error if a namespace file cannot be opened or `setns(2)` fails.
#[cfg(target_os = "linux")]
pub fn join_namespaces(pid: u32, config: &NamespaceConfig) -> Result<()> {
    use nix::sched::{CloneFlags, setns};
    use vessel_common::error::VesselError;

    let mut handles = Vec::new();
    for name in config.proc_ns_names() {
        let path = format!("/proc/{pid}/ns/{name}");
        let file = std::fs::File::open(&path)
            .map_err(|e| VesselError::io(std::path::PathBuf::from(&path), e))?;
        handles.push((name, file));
    }

    for (name, file) in &handles {
        setns(file, CloneFlags::empty()).map_err(|e| VesselError::PermissionDenied {
            message: format!("setns {name} for pid {pid} failed: {e}"),
        })?;
        tracing::debug!(pid, ns = name, "joined namespace");
    }
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — namespace joining requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn join_namespaces(_pid: u32, _config: &NamespaceConfig) -> Result<()> {
    Err(vessel_common::error::VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Sets the hostname inside the container's UTS namespace.
///
/// Must run inside a fresh UTS namespace, otherwise the host's hostname
/// would be modified.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| {
        vessel_common::error::VesselError::PermissionDenied {
            message: format!("sethostname failed: {e}"),
        }
    })?;
    tracing::debug!(hostname, "hostname set");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — UTS operations require Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_hostname(_hostname: &str) -> Result<()> {
    Err(vessel_common::error::VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_isolates_everything_but_network() {
        let config = NamespaceConfig::default();
        assert!(config.pid && config.mount && config.ipc && config.uts);
        assert!(!config.network);
    }

    #[test]
    fn proc_ns_names_reflect_selection() {
        let config = NamespaceConfig {
            pid: true,
            mount: false,
            network: true,
            ipc: false,
            uts: false,
        };
        assert_eq!(config.proc_ns_names(), vec!["net", "pid"]);
    }

    #[test]
    fn proc_ns_names_join_mount_last() {
        let config = NamespaceConfig::default();
        assert_eq!(config.proc_ns_names().last(), Some(&"mnt"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn clone_flags_match_selected_namespaces() {
        use nix::sched::CloneFlags;

        let config = NamespaceConfig {
            pid: true,
            mount: true,
            network: false,
            ipc: false,
            uts: false,
        };
        assert_eq!(
            config.clone_flags(),
            CloneFlags::CLONE_NEWPID | CloneFlags::CLONE_NEWNS
        );
    }

    #[test]
    fn proc_ns_names_empty_when_nothing_selected() {
        let config = NamespaceConfig {
            pid: false,
            mount: false,
            network: false,
            ipc: false,
            uts: false,
        };
        assert!(config.proc_ns_names().is_empty());
    }
}
