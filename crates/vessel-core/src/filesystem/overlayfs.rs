//! `OverlayFS` management for layered container filesystems.
//!
//! Stacks the read-only layer chain resolved from the layer graph beneath a
//! single writable upper layer, giving each container copy-on-write
//! semantics over shared image content.

use std::path::{Path, PathBuf};

use vessel_common::error::{Result, VesselError};

/// Configuration for an `OverlayFS` mount.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Read-only lower layers, ordered top to bottom as `OverlayFS` expects.
    pub lower_dirs: Vec<PathBuf>,
    /// Writable upper layer directory (the container's rw layer).
    pub upper_dir: PathBuf,
    /// Work directory required by `OverlayFS`.
    pub work_dir: PathBuf,
    /// Final merged mount point.
    pub merged_dir: PathBuf,
}

impl OverlayConfig {
    /// Renders the `mount(2)` option string for this configuration.
    #[must_use]
    pub fn options(&self) -> String {
        let lowers = self
            .lower_dirs
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(":");
        format!(
            "lowerdir={lowers},upperdir={},workdir={}",
            self.upper_dir.display(),
            self.work_dir.display()
        )
    }
}

/// Mounts an `OverlayFS` with the given configuration.
///
/// Creates the upper, work, and merged directories if they do not exist,
/// then issues the `mount(2)` syscall with overlay-specific options.
///
/// # Errors
///
/// Returns an error if directory creation fails or if the mount syscall fails.
#[cfg(target_os = "linux")]
pub fn mount_overlay(config: &OverlayConfig) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    if config.lower_dirs.is_empty() {
        return Err(VesselError::Config {
            message: "overlay mount requires at least one lower layer".into(),
        });
    }

    for dir in [&config.upper_dir, &config.work_dir, &config.merged_dir] {
        std::fs::create_dir_all(dir).map_err(|e| VesselError::io(dir.clone(), e))?;
    }

    let opts = config.options();
    mount(
        Some("overlay"),
        &config.merged_dir,
        Some("overlay"),
        MsFlags::empty(),
        Some(opts.as_str()),
    )
    .map_err(|e| VesselError::PermissionDenied {
        message: format!("overlay mount failed: {e}"),
    })?;

    tracing::info!(merged = %config.merged_dir.display(), "overlayfs mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `OverlayFS` mounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_overlay(_config: &OverlayConfig) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Unmounts an `OverlayFS` at the given path.
///
/// Uses `MNT_DETACH` to lazily detach the filesystem.
///
/// # Errors
///
/// Returns an error if the unmount syscall fails.
#[cfg(target_os = "linux")]
pub fn unmount_overlay(merged_dir: &Path) -> Result<()> {
    nix::mount::umount2(merged_dir, nix::mount::MntFlags::MNT_DETACH).map_err(|e| {
        VesselError::PermissionDenied {
            message: format!("unmount overlay failed: {e}"),
        }
    })?;
    tracing::info!(path = %merged_dir.display(), "overlayfs unmounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `OverlayFS` unmounting requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn unmount_overlay(_merged_dir: &Path) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}
