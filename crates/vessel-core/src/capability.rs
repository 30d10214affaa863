//! Linux capability management for least-privilege execution.
//!
//! Shrinks the capability bounding set before `exec`, so the container
//! process cannot regain privileges even if it execs a setuid binary.

use vessel_common::error::Result;

/// Capabilities that a container may be allowed to retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Allow binding to privileged ports (< 1024).
    NetBindService,
    /// Allow changing file ownership.
    Chown,
    /// Allow sending signals to arbitrary processes.
    Kill,
    /// Allow setting user IDs.
    Setuid,
    /// Allow setting group IDs.
    Setgid,
}

impl Capability {
    /// Returns the kernel capability number.
    #[must_use]
    pub const fn number(self) -> u64 {
        match self {
            Self::Chown => 0,
            Self::Kill => 5,
            Self::Setgid => 6,
            Self::Setuid => 7,
            Self::NetBindService => 10,
        }
    }
}

/// Drops every capability from the bounding set except those in `keep`.
///
/// Iterates the bounding set with `prctl(PR_CAPBSET_DROP)`; capabilities
/// beyond the kernel's last supported one terminate the loop.
///
/// # Errors
///
/// Returns an error if a drop operation fails for a supported capability.
#[cfg(target_os = "linux")]
pub fn drop_capabilities(keep: &[Capability]) -> Result<()> {
    use vessel_common::error::VesselError;

    let retained: Vec<u64> = keep.iter().map(|c| c.number()).collect();

    for cap in 0..=63u64 {
        if retained.contains(&cap) {
            continue;
        }
        // SAFETY: prctl with PR_CAPBSET_DROP takes a plain integer argument
        // and modifies only the calling thread's bounding set.
        let ret = unsafe { libc::prctl(libc::PR_CAPBSET_DROP, cap, 0, 0, 0) };
        if ret != 0 {
            let errno = std::io::Error::last_os_error();
            // EINVAL marks the end of the kernel's supported capability range.
            if errno.raw_os_error() == Some(libc::EINVAL) {
                break;
            }
            return Err(VesselError::PermissionDenied {
                message: format!("dropping capability {cap} failed: {errno}"),
            });
        }
    }

    tracing::debug!(retained = keep.len(), "capability bounding set reduced");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — capability manipulation requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn drop_capabilities(_keep: &[Capability]) -> Result<()> {
    Err(vessel_common::error::VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capability_numbers_match_kernel_constants() {
        assert_eq!(Capability::Chown.number(), 0);
        assert_eq!(Capability::Kill.number(), 5);
        assert_eq!(Capability::NetBindService.number(), 10);
    }
}
