//! Named volume management and `-v` mount-spec parsing.
//!
//! Volumes have a lifecycle independent of containers: they are created
//! once, attachable to any number of containers, and survive container
//! removal. Named volume data lives under
//! `<data_dir>/volumes/<name>/_data`; the index sits beside it.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vessel_common::error::{Result, VesselError};

/// A named volume known to the volume index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Host directory holding the volume data.
    pub mountpoint: PathBuf,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
}

/// Source side of a container mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeSource {
    /// A named volume managed by the [`VolumeManager`].
    Named(String),
    /// An absolute host path bind-mounted directly.
    HostPath(PathBuf),
}

/// One parsed `-v` specification attached to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMount {
    /// Where the data comes from.
    pub source: VolumeSource,
    /// Absolute path inside the container.
    pub target: PathBuf,
    /// Mount read-only.
    pub readonly: bool,
}

impl FromStr for VolumeMount {
    type Err = VesselError;

    /// Parses `name:/target`, `/host/path:/target`, and the `:ro` suffix.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || VesselError::Config {
            message: format!("invalid volume spec (expected SOURCE:/TARGET[:ro]): {s}"),
        };

        let parts: Vec<&str> = s.split(':').collect();
        let (source_raw, target_raw, readonly) = match parts.as_slice() {
            [source, target] => (*source, *target, false),
            [source, target, "ro"] => (*source, *target, true),
            [source, target, "rw"] => (*source, *target, false),
            _ => return Err(invalid()),
        };
        if source_raw.is_empty() || !target_raw.starts_with('/') {
            return Err(invalid());
        }

        let source = if source_raw.starts_with('/') {
            VolumeSource::HostPath(PathBuf::from(source_raw))
        } else {
            VolumeSource::Named(source_raw.to_string())
        };

        Ok(Self {
            source,
            target: PathBuf::from(target_raw),
            readonly,
        })
    }
}

/// A mount with its source resolved to a concrete host path, ready for
/// the spawn path to bind into the rootfs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMount {
    /// Host directory to bind.
    pub source: PathBuf,
    /// Absolute path inside the container.
    pub target: PathBuf,
    /// Mount read-only.
    pub readonly: bool,
}

/// Manages the named volume index under the data directory.
#[derive(Debug)]
pub struct VolumeManager {
    root: PathBuf,
}

impl VolumeManager {
    /// Opens or initializes the volume root.
    ///
    /// # Errors
    ///
    /// Returns an error if the volume root cannot be created.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let root = vessel_common::constants::volumes_dir(data_dir);
        std::fs::create_dir_all(&root).map_err(|e| VesselError::io(root.clone(), e))?;
        Ok(Self { root })
    }

    /// Creates a named volume, or returns the existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or directories cannot be
    /// created.
    pub fn create(&self, name: &str) -> Result<Volume> {
        validate_name(name)?;
        if let Some(existing) = self.get(name)? {
            return Ok(existing);
        }

        let mountpoint = self.root.join(name).join("_data");
        std::fs::create_dir_all(&mountpoint).map_err(|e| VesselError::io(mountpoint.clone(), e))?;

        let volume = Volume {
            name: name.to_string(),
            mountpoint,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let mut volumes = self.load()?;
        volumes.push(volume.clone());
        self.save(&volumes)?;
        tracing::info!(name, "volume created");
        Ok(volume)
    }

    /// Looks up a volume by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read.
    pub fn get(&self, name: &str) -> Result<Option<Volume>> {
        Ok(self.load()?.into_iter().find(|v| v.name == name))
    }

    /// Lists all volumes.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read.
    pub fn list(&self) -> Result<Vec<Volume>> {
        self.load()
    }

    /// Removes a volume and deletes its data.
    ///
    /// Callers are responsible for checking that no container still
    /// mounts it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown name, or an I/O error if the
    /// data directory cannot be deleted.
    pub fn remove(&self, name: &str) -> Result<()> {
        let mut volumes = self.load()?;
        let before = volumes.len();
        volumes.retain(|v| v.name != name);
        if volumes.len() == before {
            return Err(VesselError::NotFound {
                kind: "volume",
                id: name.to_string(),
            });
        }
        self.save(&volumes)?;

        let dir = self.root.join(name);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| VesselError::io(dir.clone(), e))?;
        }
        tracing::info!(name, "volume removed");
        Ok(())
    }

    /// Resolves a mount spec to a concrete host path, creating named
    /// volumes on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if a named volume cannot be created.
    pub fn resolve(&self, mount: &VolumeMount) -> Result<ResolvedMount> {
        let source = match &mount.source {
            VolumeSource::Named(name) => self.create(name)?.mountpoint,
            VolumeSource::HostPath(path) => path.clone(),
        };
        Ok(ResolvedMount {
            source,
            target: mount.target.clone(),
            readonly: mount.readonly,
        })
    }

    fn index_path(&self) -> PathBuf {
        self.root.join("volumes.json")
    }

    fn load(&self) -> Result<Vec<Volume>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| VesselError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, volumes: &[Volume]) -> Result<()> {
        let path = self.index_path();
        let json = serde_json::to_string_pretty(volumes)?;
        std::fs::write(&path, json).map_err(|e| VesselError::io(path, e))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(VesselError::Config {
            message: format!("invalid volume name: {name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_spec_named_volume() {
        let mount: VolumeMount = "data:/var/lib/data".parse().expect("parse");
        assert_eq!(mount.source, VolumeSource::Named("data".into()));
        assert_eq!(mount.target, PathBuf::from("/var/lib/data"));
        assert!(!mount.readonly);
    }

    #[test]
    fn mount_spec_host_path_readonly() {
        let mount: VolumeMount = "/srv/config:/etc/app:ro".parse().expect("parse");
        assert_eq!(mount.source, VolumeSource::HostPath("/srv/config".into()));
        assert!(mount.readonly);
    }

    #[test]
    fn mount_spec_explicit_rw() {
        let mount: VolumeMount = "cache:/cache:rw".parse().expect("parse");
        assert!(!mount.readonly);
    }

    #[test]
    fn mount_spec_rejects_malformed_input() {
        assert!("just-a-name".parse::<VolumeMount>().is_err());
        assert!("data:relative/target".parse::<VolumeMount>().is_err());
        assert!(":/target".parse::<VolumeMount>().is_err());
        assert!("a:/b:bogus".parse::<VolumeMount>().is_err());
    }

    #[test]
    fn create_and_list_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");

        let volume = manager.create("appdata").expect("create");
        assert!(volume.mountpoint.ends_with("appdata/_data"));
        assert!(volume.mountpoint.exists());
        assert_eq!(manager.list().expect("list").len(), 1);
    }

    #[test]
    fn create_existing_volume_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");

        let first = manager.create("db").expect("first");
        let second = manager.create("db").expect("second");
        assert_eq!(first.mountpoint, second.mountpoint);
        assert_eq!(manager.list().expect("list").len(), 1);
    }

    #[test]
    fn create_rejects_invalid_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");
        assert!(manager.create("").is_err());
        assert!(manager.create("bad/name").is_err());
    }

    #[test]
    fn remove_deletes_data_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");

        let volume = manager.create("scratch").expect("create");
        std::fs::write(volume.mountpoint.join("file"), b"x").expect("write");
        manager.remove("scratch").expect("remove");

        assert!(!volume.mountpoint.exists());
        assert!(manager.get("scratch").expect("get").is_none());
    }

    #[test]
    fn remove_unknown_volume_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");
        assert!(manager.remove("ghost").is_err());
    }

    #[test]
    fn resolve_creates_named_volume_on_first_use() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");

        let mount: VolumeMount = "lazy:/data".parse().expect("parse");
        let resolved = manager.resolve(&mount).expect("resolve");
        assert!(resolved.source.exists());
        assert_eq!(resolved.target, PathBuf::from("/data"));
    }

    #[test]
    fn resolve_passes_host_paths_through() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = VolumeManager::open(dir.path()).expect("open");

        let mount: VolumeMount = "/host/dir:/data:ro".parse().expect("parse");
        let resolved = manager.resolve(&mount).expect("resolve");
        assert_eq!(resolved.source, PathBuf::from("/host/dir"));
        assert!(resolved.readonly);
    }
}
