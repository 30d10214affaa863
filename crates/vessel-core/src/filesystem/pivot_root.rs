//! Secure root filesystem switching via `pivot_root(2)`.
//!
//! Unlike `chroot`, `pivot_root` actually replaces the root mount of the
//! mount namespace, so the old root can be detached and the container
//! cannot escape back into the host filesystem.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Name of the temporary directory the old root is pivoted into.
const PUT_OLD: &str = ".oldroot";

/// Switches the root filesystem of the current mount namespace to `new_root`.
///
/// The sequence is: bind-mount `new_root` onto itself so it becomes a mount
/// point, `pivot_root(2)` with the old root parked in `.oldroot`, then
/// lazily detach and delete the old root. Must run inside a fresh mount
/// namespace.
///
/// # Errors
///
/// Returns an error if any mount, pivot, or cleanup step fails.
#[cfg(target_os = "linux")]
pub fn enter_rootfs(new_root: &Path) -> Result<()> {
    use nix::mount::{MntFlags, MsFlags, mount, umount2};

    let syscall_err = |op: &'static str| {
        move |e: nix::errno::Errno| VesselError::PermissionDenied {
            message: format!("{op} failed: {e}"),
        }
    };

    // pivot_root requires the new root to be a mount point.
    mount(
        Some(new_root),
        new_root,
        None::<&str>,
        MsFlags::MS_BIND | MsFlags::MS_REC,
        None::<&str>,
    )
    .map_err(syscall_err("bind mount of new root"))?;

    let put_old = new_root.join(PUT_OLD);
    std::fs::create_dir_all(&put_old).map_err(|e| VesselError::io(put_old.clone(), e))?;

    nix::unistd::pivot_root(new_root, &put_old).map_err(syscall_err("pivot_root"))?;
    nix::unistd::chdir("/").map_err(syscall_err("chdir to new root"))?;

    let old_inside = Path::new("/").join(PUT_OLD);
    umount2(&old_inside, MntFlags::MNT_DETACH).map_err(syscall_err("detach of old root"))?;
    std::fs::remove_dir(&old_inside).map_err(|e| VesselError::io(old_inside.clone(), e))?;

    tracing::info!(new_root = %new_root.display(), "root filesystem switched");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — `pivot_root` requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_rootfs(_new_root: &Path) -> Result<()> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}
