//! CPU resource control via cgroups v2.
//!
//! Manages `cpu.weight` and reads accumulated time from `cpu.stat`.

use std::path::Path;

use vessel_common::error::{Result, VesselError};

/// Sets the CPU weight (relative share, 1-10000) for a cgroup.
///
/// # Errors
///
/// Returns an error if the weight is out of range or writing to
/// `cpu.weight` fails.
pub fn set_cpu_weight(cgroup_path: &Path, weight: u64) -> Result<()> {
    if !(1..=10_000).contains(&weight) {
        return Err(VesselError::Config {
            message: format!("cpu weight must be in 1..=10000, got {weight}"),
        });
    }
    let control = cgroup_path.join("cpu.weight");
    std::fs::write(&control, weight.to_string()).map_err(|e| VesselError::io(control, e))?;
    tracing::debug!(weight, "cpu.weight set");
    Ok(())
}

/// Reads cumulative CPU time in microseconds from `cpu.stat`.
///
/// # Errors
///
/// Returns an error if `cpu.stat` cannot be read or lacks a `usage_usec` line.
pub fn usage_usec(cgroup_path: &Path) -> Result<u64> {
    let stat = cgroup_path.join("cpu.stat");
    let raw = std::fs::read_to_string(&stat).map_err(|e| VesselError::io(stat, e))?;
    raw.lines()
        .find_map(|line| {
            let (key, value) = line.split_once(' ')?;
            (key == "usage_usec").then(|| value.trim().parse().ok())?
        })
        .ok_or_else(|| VesselError::Config {
            message: "cpu.stat has no usage_usec entry".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cpu_weight_rejects_out_of_range() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(set_cpu_weight(dir.path(), 0).is_err());
        assert!(set_cpu_weight(dir.path(), 10_001).is_err());
    }

    #[test]
    fn set_cpu_weight_writes_value() {
        let dir = tempfile::tempdir().expect("tempdir");
        set_cpu_weight(dir.path(), 512).expect("write");
        let written = std::fs::read_to_string(dir.path().join("cpu.weight")).expect("read");
        assert_eq!(written, "512");
    }

    #[test]
    fn usage_usec_extracts_field_from_stat() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("cpu.stat"),
            "usage_usec 123456\nuser_usec 100000\nsystem_usec 23456\n",
        )
        .expect("write");
        assert_eq!(usage_usec(dir.path()).expect("usage"), 123_456);
    }

    #[test]
    fn usage_usec_missing_field_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cpu.stat"), "user_usec 1\n").expect("write");
        assert!(usage_usec(dir.path()).is_err());
    }
}
