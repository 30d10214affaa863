//! Global configuration model for the Vessel runtime.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::ResourceLimits;

/// Root configuration for the Vessel runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselConfig {
    /// Base directory for Vessel state and data.
    pub data_dir: PathBuf,
    /// Default resource limits applied to containers without explicit limits.
    pub default_limits: ResourceLimits,
    /// Grace period in seconds between SIGTERM and SIGKILL when stopping.
    pub stop_grace_secs: u64,
}

impl VesselConfig {
    /// Builds a configuration rooted at the given data directory.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Returns the state index file path for this configuration.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        crate::constants::state_file(&self.data_dir)
    }
}

impl Default for VesselConfig {
    fn default() -> Self {
        Self {
            data_dir: crate::constants::data_dir().clone(),
            default_limits: ResourceLimits::default(),
            stop_grace_secs: crate::constants::DEFAULT_STOP_GRACE_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_data_dir_overrides_root_only() {
        let config = VesselConfig::with_data_dir("/tmp/vessel-alt");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/vessel-alt"));
        assert_eq!(
            config.stop_grace_secs,
            crate::constants::DEFAULT_STOP_GRACE_SECS
        );
        assert_eq!(config.state_file(), PathBuf::from("/tmp/vessel-alt/state.json"));
    }
}
