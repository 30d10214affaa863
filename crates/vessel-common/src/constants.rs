//! System-wide constants and default paths.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Default base directory for Vessel data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/vessel";

/// Returns the data directory, preferring `$HOME/.vessel` for non-root
/// or non-Linux environments, falling back to `/var/lib/vessel`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".vessel");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the state index file path under the given data directory.
#[must_use]
pub fn state_file(data_dir: &Path) -> PathBuf {
    data_dir.join("state.json")
}

/// Returns the image store root under the given data directory.
#[must_use]
pub fn image_store_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("images")
}

/// Returns the per-container runtime directory (rw layers, overlay mounts)
/// under the given data directory.
#[must_use]
pub fn containers_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("containers")
}

/// Returns the named-volume root under the given data directory.
#[must_use]
pub fn volumes_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("volumes")
}

/// Cgroups v2 unified hierarchy mount point.
pub const CGROUP_V2_PATH: &str = "/sys/fs/cgroup";

/// Name of the Vessel sub-hierarchy under the cgroup root.
pub const CGROUP_SUBTREE: &str = "vessel";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Maximum number of layers in a resolved image chain.
pub const MAX_IMAGE_LAYERS: usize = 128;

/// Grace period in seconds between SIGTERM and SIGKILL when stopping.
pub const DEFAULT_STOP_GRACE_SECS: u64 = 10;

/// Delay in milliseconds between supervisor restarts of the same container.
pub const RESTART_BACKOFF_MS: u64 = 500;

/// Default compose file name looked up by `vsl up` / `vsl down`.
pub const DEFAULT_COMPOSE_FILE: &str = "vessel.yaml";

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "vessel";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "vsl";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_is_stable_across_calls() {
        assert_eq!(data_dir(), data_dir());
    }

    #[test]
    fn derived_paths_nest_under_data_dir() {
        let root = Path::new("/tmp/vessel-test");
        assert_eq!(state_file(root), root.join("state.json"));
        assert_eq!(image_store_dir(root), root.join("images"));
        assert_eq!(containers_dir(root), root.join("containers"));
        assert_eq!(volumes_dir(root), root.join("volumes"));
    }
}
