//! I/O resource control via cgroups v2.
//!
//! Manages the proportional `io.weight` control file.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Sets the I/O weight (1-10000) for a cgroup.
///
/// # Errors
///
/// Returns an error if the weight is out of range or writing to
/// `io.weight` fails.
pub fn set_io_weight(cgroup_path: &Path, weight: u16) -> Result<()> {
    if !(1..=10_000).contains(&weight) {
        return Err(VesselError::Config {
            message: format!("io weight must be in 1..=10000, got {weight}"),
        });
    }
    let control = cgroup_path.join("io.weight");
    std::fs::write(&control, format!("default {weight}"))
        .map_err(|e| VesselError::io(control, e))?;
    tracing::debug!(weight, "io.weight set");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_io_weight_writes_default_rule() {
        let dir = tempfile::tempdir().expect("tempdir");
        set_io_weight(dir.path(), 100).expect("write");
        let written = std::fs::read_to_string(dir.path().join("io.weight")).expect("read");
        assert_eq!(written, "default 100");
    }

    #[test]
    fn set_io_weight_rejects_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_io_weight(dir.path(), 0).is_err());
    }
}
