//! Persistent state management.
//!
//! Maintains a local JSON index of all containers and their current
//! states, enabling daemon-less lifecycle management: every `vsl`
//! invocation reloads the index, and saves are atomic (temp file plus
//! rename) so a crash mid-write never corrupts it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{
    ContainerId, ContainerState, ImageId, PortMapping, ResourceLimits, RestartPolicy,
};

use crate::volume::VolumeMount;

/// Persistent record of a container.
///
/// Carries everything needed to respawn the process, so the supervisor
/// can apply restart policies without re-deriving the container's
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEntry {
    /// Container identifier.
    pub id: ContainerId,
    /// Unique human-readable name.
    pub name: String,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// PID of the container process (while running).
    pub pid: Option<u32>,
    /// Image the container was created from.
    pub image_id: ImageId,
    /// Image reference as given by the user.
    pub image_ref: String,
    /// Resolved command executed inside the container.
    pub command: Vec<String>,
    /// Environment variables (image defaults plus overrides).
    pub env: Vec<(String, String)>,
    /// Hostname inside the UTS namespace.
    pub hostname: String,
    /// Working directory inside the container, from the image config.
    pub working_dir: Option<String>,
    /// Merged `OverlayFS` mount point used as the rootfs.
    pub rootfs: PathBuf,
    /// Whether the rootfs is remounted read-only.
    pub readonly_rootfs: bool,
    /// Volume mounts attached to the container.
    pub volumes: Vec<VolumeMount>,
    /// Published port mappings.
    pub ports: Vec<PortMapping>,
    /// Resource limits applied to the cgroup.
    pub limits: ResourceLimits,
    /// Restart policy applied by the supervisor.
    pub restart_policy: RestartPolicy,
    /// Consecutive supervisor restarts since the last manual start.
    pub restarts: u32,
    /// Exit code captured from the last exit, if known.
    pub exit_code: Option<i32>,
    /// Path to the container's log file.
    pub log_path: PathBuf,
    /// ISO-8601 timestamp of creation.
    pub created_at: String,
}

/// The full state index persisted to `state.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateIndex {
    /// All known containers.
    pub containers: Vec<StateEntry>,
}

impl StateIndex {
    /// Finds a container by exact ID.
    #[must_use]
    pub fn find(&self, id: &ContainerId) -> Option<&StateEntry> {
        self.containers.iter().find(|e| e.id == *id)
    }

    /// Finds a container by exact ID, mutably.
    #[must_use]
    pub fn find_mut(&mut self, id: &ContainerId) -> Option<&mut StateEntry> {
        self.containers.iter_mut().find(|e| e.id == *id)
    }

    /// Resolves a container by name, exact ID, or unique ID prefix.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches, or a configuration error if
    /// an ID prefix is ambiguous.
    pub fn resolve(&self, reference: &str) -> Result<&StateEntry> {
        if let Some(entry) = self
            .containers
            .iter()
            .find(|e| e.name == reference || e.id.as_str() == reference)
        {
            return Ok(entry);
        }

        let matches: Vec<&StateEntry> = self
            .containers
            .iter()
            .filter(|e| e.id.as_str().starts_with(reference))
            .collect();
        match matches.as_slice() {
            [entry] => Ok(entry),
            [] => Err(VesselError::NotFound {
                kind: "container",
                id: reference.to_string(),
            }),
            _ => Err(VesselError::Config {
                message: format!("ambiguous container reference: {reference}"),
            }),
        }
    }

    /// Returns whether any container uses the given name.
    #[must_use]
    pub fn name_taken(&self, name: &str) -> bool {
        self.containers.iter().any(|e| e.name == name)
    }
}

/// Loads the state index from disk.
///
/// A missing file yields an empty index, so first use needs no setup step.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StateIndex> {
    if !path.exists() {
        return Ok(StateIndex::default());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    let index = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), "state index loaded");
    Ok(index)
}

/// Persists the state index to disk atomically.
///
/// Writes to a sibling temp file and renames it over the target, so
/// readers never observe a partially written index.
///
/// # Errors
///
/// Returns an error if the file cannot be written or renamed.
pub fn save_state(path: &Path, index: &StateIndex) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VesselError::io(parent.to_path_buf(), e))?;
    }
    let json = serde_json::to_string_pretty(index)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| VesselError::io(tmp.clone(), e))?;
    std::fs::rename(&tmp, path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    tracing::debug!(path = %path.display(), "state index saved");
    Ok(())
}

/// Builds a minimal state entry for tests across the runtime crate.
#[cfg(test)]
pub(crate) fn test_entry(id: &str, name: &str) -> StateEntry {
    StateEntry {
        id: ContainerId::new(id),
        name: name.into(),
        state: ContainerState::Created,
        pid: None,
        image_id: ImageId::new("f".repeat(64)),
        image_ref: "alpine:latest".into(),
        command: vec!["/bin/sh".into()],
        env: Vec::new(),
        hostname: name.into(),
        working_dir: None,
        rootfs: PathBuf::from(format!("/tmp/vessel/{id}/merged")),
        readonly_rootfs: false,
        volumes: Vec::new(),
        ports: Vec::new(),
        limits: ResourceLimits::default(),
        restart_policy: RestartPolicy::No,
        restarts: 0,
        exit_code: None,
        log_path: PathBuf::from(format!("/tmp/vessel/logs/{id}.log")),
        created_at: "2026-01-01T00:00:00Z".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry(id: &str, name: &str) -> StateEntry {
        test_entry(id, name)
    }

    #[test]
    fn load_missing_file_yields_empty_index() {
        let dir = tempfile::tempdir().expect("tempdir");
        let index = load_state(&dir.path().join("state.json")).expect("load");
        assert!(index.containers.is_empty());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let mut index = StateIndex::default();
        index.containers.push(make_entry("aaaa1111", "web"));
        index.containers.push(make_entry("bbbb2222", "db"));
        save_state(&path, &index).expect("save");

        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded.containers.len(), 2);
        assert_eq!(loaded.containers[0].name, "web");
        assert_eq!(loaded.containers[1].state, ContainerState::Created);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        save_state(&path, &StateIndex::default()).expect("save");
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn all_lifecycle_states_survive_serialization() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");

        let mut index = StateIndex::default();
        for (i, state) in [
            ContainerState::Created,
            ContainerState::Running,
            ContainerState::Stopped,
            ContainerState::Failed,
        ]
        .into_iter()
        .enumerate()
        {
            let mut entry = make_entry(&format!("id-{i}"), &format!("c{i}"));
            entry.state = state;
            index.containers.push(entry);
        }
        save_state(&path, &index).expect("save");

        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded.containers[1].state, ContainerState::Running);
        assert_eq!(loaded.containers[3].state, ContainerState::Failed);
    }

    #[test]
    fn resolve_matches_name_then_id_prefix() {
        let mut index = StateIndex::default();
        index.containers.push(make_entry("abcd1234", "web"));
        index.containers.push(make_entry("abff5678", "db"));

        assert_eq!(index.resolve("web").expect("by name").id.as_str(), "abcd1234");
        assert_eq!(index.resolve("abcd").expect("by prefix").name, "web");
        assert!(index.resolve("ab").is_err(), "prefix matches both");
        assert!(index.resolve("ghost").is_err());
    }

    #[test]
    fn name_taken_detects_collisions() {
        let mut index = StateIndex::default();
        index.containers.push(make_entry("aaaa", "web"));
        assert!(index.name_taken("web"));
        assert!(!index.name_taken("db"));
    }
}
