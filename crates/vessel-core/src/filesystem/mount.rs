//! Mount utilities for container filesystem setup.
//!
//! Handles mounting `/proc` inside the container and bind-mounting host
//! directories and named volumes into the rootfs.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Mounts a fresh `proc` instance at `<rootfs>/proc`.
///
/// Required for `ps`, `/proc/self`, and anything else that inspects the
/// container's own PID namespace.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the mount fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(rootfs: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    let target = rootfs.join("proc");
    std::fs::create_dir_all(&target).map_err(|e| VesselError::io(target.clone(), e))?;

    mount(
        Some("proc"),
        &target,
        Some("proc"),
        MsFlags::MS_NOSUID | MsFlags::MS_NODEV | MsFlags::MS_NOEXEC,
        None::<&str>,
    )
    .map_err(|e| VesselError::PermissionDenied {
        message: format!("proc mount failed: {e}"),
    })?;
    tracing::debug!(target = %target.display(), "proc mounted");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — mount operations require Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_rootfs: &Path) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Marks the entire mount tree private to this mount namespace.
///
/// Without this, bind mounts and the pivot performed during container
/// setup would propagate back to the host's mount table on systems with
/// shared root propagation.
///
/// # Errors
///
/// Returns an error if the remount fails.
#[cfg(target_os = "linux")]
pub fn make_mounts_private() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| VesselError::PermissionDenied {
        message: format!("private mount propagation failed: {e}"),
    })
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — mount operations require Linux.
#[cfg(not(target_os = "linux"))]
pub fn make_mounts_private() -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Creates a bind mount from `source` to `target`, optionally read-only.
///
/// The target directory is created if missing. Read-only binds need a
/// second remount pass because `MS_RDONLY` is ignored on the initial
/// `MS_BIND` call.
///
/// # Errors
///
/// Returns an error if directory creation or either mount call fails.
#[cfg(target_os = "linux")]
pub fn bind_mount(source: &Path, target: &Path, readonly: bool) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    if !source.exists() {
        return Err(VesselError::NotFound {
            kind: "bind mount source",
            id: source.display().to_string(),
        });
    }
    std::fs::create_dir_all(target).map_err(|e| VesselError::io(target.to_path_buf(), e))?;

    let bind_err = |e: nix::errno::Errno| VesselError::PermissionDenied {
        message: format!("bind mount {} failed: {e}", source.display()),
    };
    mount(
        Some(source),
        target,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(bind_err)?;

    if readonly {
        mount(
            None::<&str>,
            target,
            None::<&str>,
            MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
            None::<&str>,
        )
        .map_err(bind_err)?;
    }

    tracing::debug!(
        source = %source.display(),
        target = %target.display(),
        readonly,
        "bind mount created"
    );
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — mount operations require Linux.
#[cfg(not(target_os = "linux"))]
pub fn bind_mount(_source: &Path, _target: &Path, _readonly: bool) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Remounts the container root read-only.
///
/// Used for `--read-only` containers after volumes are bound.
///
/// # Errors
///
/// Returns an error if the remount fails.
#[cfg(target_os = "linux")]
pub fn remount_readonly(target: &Path) -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        None::<&str>,
        target,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REMOUNT | MsFlags::MS_RDONLY,
        None::<&str>,
    )
    .map_err(|e| VesselError::PermissionDenied {
        message: format!("read-only remount failed: {e}"),
    })?;
    tracing::debug!(target = %target.display(), "remounted read-only");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — mount operations require Linux.
#[cfg(not(target_os = "linux"))]
pub fn remount_readonly(_target: &Path) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

#[cfg(test)]
mod tests {
    #[cfg(target_os = "linux")]
    #[test]
    fn bind_mount_missing_source_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = super::bind_mount(
            &dir.path().join("missing"),
            &dir.path().join("target"),
            false,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }
}
