//! Runtime engine that orchestrates container lifecycle.
//!
//! The engine ties the image store, the volume manager, and the isolation
//! primitives together behind a high-level API. Every operation reloads
//! the state index from disk and saves it back, so concurrent `vsl`
//! invocations see each other's containers without a daemon.

use std::path::PathBuf;

use vessel_common::config::VesselConfig;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ContainerId, ContainerState, ResourceLimits};
use vessel_core::namespace::NamespaceConfig;
use vessel_image::store::{ImageRecord, ImageStore};

use crate::container::ContainerSpec;
use crate::exec::ExecOutput;
use crate::metrics::MetricsSnapshot;
use crate::state::{self, StateEntry, StateIndex};
use crate::volume::VolumeManager;

/// Fallback `PATH` injected when neither image nor user set one.
const DEFAULT_PATH: &str = "PATH=/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// The runtime engine coordinating all container operations.
pub struct Engine {
    config: VesselConfig,
    store: ImageStore,
    volumes: VolumeManager,
}

impl Engine {
    /// Creates an engine with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be initialized.
    pub fn new() -> Result<Self> {
        Self::with_config(VesselConfig::default())
    }

    /// Creates an engine rooted at the configuration's data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directories cannot be initialized.
    pub fn with_config(config: VesselConfig) -> Result<Self> {
        let store = ImageStore::open(vessel_common::constants::image_store_dir(&config.data_dir))?;
        let volumes = VolumeManager::open(&config.data_dir)?;
        Ok(Self {
            config,
            store,
            volumes,
        })
    }

    /// Returns the engine's configuration.
    #[must_use]
    pub fn config(&self) -> &VesselConfig {
        &self.config
    }

    /// Returns the image store.
    #[must_use]
    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Returns the volume manager.
    #[must_use]
    pub fn volumes(&self) -> &VolumeManager {
        &self.volumes
    }

    /// Creates a container from the given spec without starting it.
    ///
    /// Resolves the image, merges its config with the spec's overrides,
    /// and records the container in the state index.
    ///
    /// # Errors
    ///
    /// Returns an error if the image does not resolve, the name is taken,
    /// or no command can be derived from spec and image config.
    pub fn create(&self, spec: &ContainerSpec) -> Result<StateEntry> {
        let image = self.store.resolve(&spec.image)?;
        let mut index = self.load_state()?;

        let id = ContainerId::generate();
        let name = spec
            .name
            .clone()
            .unwrap_or_else(|| format!("vessel-{}", id.short()));
        if index.name_taken(&name) {
            return Err(VesselError::Config {
                message: format!("container name already in use: {name}"),
            });
        }

        let command = resolve_command(spec, &image)?;
        let env = resolve_env(spec, &image);
        let hostname = spec
            .hostname
            .clone()
            .unwrap_or_else(|| id.short().to_string());
        let limits = merge_limits(&spec.limits, &self.config.default_limits);

        let entry = StateEntry {
            id: id.clone(),
            name,
            state: ContainerState::Created,
            pid: None,
            image_id: image.id.clone(),
            image_ref: spec.image.clone(),
            command,
            env,
            hostname,
            working_dir: image.config.working_dir.clone(),
            rootfs: self.container_dir(&id).join("merged"),
            readonly_rootfs: spec.readonly_rootfs,
            volumes: spec.volumes.clone(),
            ports: spec.ports.clone(),
            limits,
            restart_policy: spec.restart_policy,
            restarts: 0,
            exit_code: None,
            log_path: crate::logs::log_path(&self.config.data_dir, id.as_str()),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        index.containers.push(entry.clone());
        self.save_state(&index)?;
        tracing::info!(id = %id, name = %entry.name, image = %image.id, "container created");
        Ok(entry)
    }

    /// Starts a created or previously stopped container.
    ///
    /// Mounts the overlay rootfs from the image's layer chain, creates the
    /// cgroup, and spawns the container process.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is already running, or if any
    /// mount, cgroup, or spawn step fails.
    pub fn start(&self, reference: &str) -> Result<StateEntry> {
        self.start_inner(reference, true)
    }

    /// Restarts a container on behalf of the supervisor, preserving the
    /// consecutive-restart counter.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::start`].
    pub fn restart(&self, reference: &str) -> Result<StateEntry> {
        self.start_inner(reference, false)
    }

    fn start_inner(&self, reference: &str, manual: bool) -> Result<StateEntry> {
        let mut index = self.load_state()?;
        let entry = index.resolve(reference)?.clone();

        let next = entry.state.transition(ContainerState::Running)?;

        // A crashed or unreaped container may have left its overlay mount
        // and cgroup behind.
        if entry.state != ContainerState::Created {
            self.release_runtime_resources(&entry);
        }

        let image = self.store.resolve(entry.image_id.as_str())?;
        let chain = self.store.rootfs_chain(&image)?;
        let container_dir = self.container_dir(&entry.id);

        // OverlayFS wants the top-most lower layer first.
        let mut lower_dirs = chain;
        lower_dirs.reverse();
        let overlay = vessel_core::filesystem::overlayfs::OverlayConfig {
            lower_dirs,
            upper_dir: container_dir.join("upper"),
            work_dir: container_dir.join("work"),
            merged_dir: entry.rootfs.clone(),
        };
        vessel_core::filesystem::overlayfs::mount_overlay(&overlay)?;

        let cgroup = vessel_core::cgroup::CgroupManager::create(entry.id.as_str())?;
        cgroup.apply_limits(&entry.limits)?;

        let mounts = entry
            .volumes
            .iter()
            .map(|m| self.volumes.resolve(m))
            .collect::<Result<Vec<_>>>()?;

        let spawn = crate::process::SpawnSpec {
            command: &entry.command,
            env: &entry.env,
            rootfs: &entry.rootfs,
            hostname: &entry.hostname,
            mounts: &mounts,
            readonly_rootfs: entry.readonly_rootfs,
            working_dir: entry.working_dir.as_deref(),
            namespaces: NamespaceConfig::default(),
            log_path: &entry.log_path,
        };
        let pid = crate::process::spawn_container_process(&spawn)?;
        cgroup.add_process(pid)?;

        let updated = {
            let stored = index
                .find_mut(&entry.id)
                .ok_or_else(|| VesselError::NotFound {
                    kind: "container",
                    id: entry.id.to_string(),
                })?;
            stored.state = next;
            stored.pid = Some(pid);
            stored.exit_code = None;
            if manual {
                stored.restarts = 0;
            }
            stored.clone()
        };
        self.save_state(&index)?;
        tracing::info!(id = %entry.id, pid, "container started");
        Ok(updated)
    }

    /// Stops a running container with the configured grace period.
    ///
    /// Stopping a container that is not running is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if signaling fails or state cannot be saved.
    pub fn stop(&self, reference: &str, grace_secs: Option<u64>) -> Result<()> {
        let mut index = self.load_state()?;
        let entry = index.resolve(reference)?.clone();
        if entry.state != ContainerState::Running {
            return Ok(());
        }

        let grace = grace_secs.unwrap_or(self.config.stop_grace_secs);
        let mut exit_code = None;
        if let Some(pid) = entry.pid {
            crate::container::stop_process(pid, grace)?;
            exit_code = crate::process::try_reap(pid)?;
        }

        self.release_runtime_resources(&entry);

        if let Some(stored) = index.find_mut(&entry.id) {
            stored.state = stored.state.transition(ContainerState::Stopped)?;
            stored.pid = None;
            if exit_code.is_some() {
                stored.exit_code = exit_code;
            }
        }
        self.save_state(&index)?;
        tracing::info!(id = %entry.id, "container stopped");
        Ok(())
    }

    /// Stops all running containers.
    ///
    /// # Errors
    ///
    /// Returns an error if any container cannot be stopped.
    pub fn stop_all(&self) -> Result<()> {
        let index = self.load_state()?;
        for entry in &index.containers {
            if entry.state == ContainerState::Running {
                self.stop(entry.id.as_str(), None)?;
            }
        }
        Ok(())
    }

    /// Removes a container, its rw layer, and its logs.
    ///
    /// Volumes survive removal. A running container is only removed with
    /// `force`, which stops it first.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is running without `force`, or
    /// if filesystem cleanup fails.
    pub fn remove(&self, reference: &str, force: bool) -> Result<()> {
        let entry = self.load_state()?.resolve(reference)?.clone();
        if entry.state == ContainerState::Running {
            if !force {
                return Err(VesselError::Config {
                    message: format!("container {} is running; stop it or use force", entry.name),
                });
            }
            self.stop(entry.id.as_str(), None)?;
        }

        self.release_runtime_resources(&entry);

        let dir = self.container_dir(&entry.id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| VesselError::io(dir.clone(), e))?;
        }
        crate::logs::remove_logs(&self.config.data_dir, entry.id.as_str())?;

        let mut index = self.load_state()?;
        index.containers.retain(|e| e.id != entry.id);
        self.save_state(&index)?;
        tracing::info!(id = %entry.id, name = %entry.name, "container removed");
        Ok(())
    }

    /// Lists all containers in the state index.
    ///
    /// # Errors
    ///
    /// Returns an error if the state index cannot be read.
    pub fn list(&self) -> Result<Vec<StateEntry>> {
        Ok(self.load_state()?.containers)
    }

    /// Resolves a container reference to its state entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference does not resolve.
    pub fn resolve(&self, reference: &str) -> Result<StateEntry> {
        Ok(self.load_state()?.resolve(reference)?.clone())
    }

    /// Executes a command inside a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is not running or the command
    /// cannot be spawned.
    pub fn exec(&self, reference: &str, command: &[String]) -> Result<ExecOutput> {
        let entry = self.resolve(reference)?;
        let pid = self.running_pid(&entry)?;
        crate::exec::exec_in_container(&entry.id, pid, command, &NamespaceConfig::default())
    }

    /// Returns the full logs for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference does not resolve or the log file
    /// cannot be read.
    pub fn logs(&self, reference: &str) -> Result<String> {
        let entry = self.resolve(reference)?;
        crate::logs::read_logs(&self.config.data_dir, entry.id.as_str())
    }

    /// Returns the last `lines` log lines for a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference does not resolve or the log file
    /// cannot be read.
    pub fn logs_tail(&self, reference: &str, lines: usize) -> Result<String> {
        let entry = self.resolve(reference)?;
        crate::logs::tail_logs(&self.config.data_dir, entry.id.as_str(), lines)
    }

    /// Collects live resource metrics for a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is not running or its cgroup
    /// cannot be read.
    pub fn metrics(&self, reference: &str) -> Result<MetricsSnapshot> {
        let entry = self.resolve(reference)?;
        let _ = self.running_pid(&entry)?;
        crate::metrics::collect_metrics(&entry.id)
    }

    /// Removes an image after checking no container references it.
    ///
    /// # Errors
    ///
    /// Returns an error if a container (in any state) still references
    /// the image, or if the store removal fails.
    pub fn remove_image(&self, reference: &str) -> Result<ImageRecord> {
        let image = self.store.resolve(reference)?;
        let index = self.load_state()?;
        if let Some(user) = index.containers.iter().find(|e| e.image_id == image.id) {
            return Err(VesselError::Config {
                message: format!(
                    "image {} is in use by container {}",
                    image.id.short(),
                    user.name
                ),
            });
        }
        self.store.remove(reference)
    }

    /// Returns whether any container mounts the named volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the state index cannot be read.
    pub fn volume_in_use(&self, name: &str) -> Result<Option<String>> {
        let index = self.load_state()?;
        Ok(index
            .containers
            .iter()
            .find(|e| {
                e.volumes
                    .iter()
                    .any(|m| m.source == crate::volume::VolumeSource::Named(name.to_string()))
            })
            .map(|e| e.name.clone()))
    }

    /// Loads the state index from the configured state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read or parsed.
    pub fn load_state(&self) -> Result<StateIndex> {
        state::load_state(&self.config.state_file())
    }

    /// Saves the state index to the configured state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be written.
    pub fn save_state(&self, index: &StateIndex) -> Result<()> {
        state::save_state(&self.config.state_file(), index)
    }

    fn container_dir(&self, id: &ContainerId) -> PathBuf {
        vessel_common::constants::containers_dir(&self.config.data_dir).join(id.as_str())
    }

    fn running_pid(&self, entry: &StateEntry) -> Result<u32> {
        if entry.state != ContainerState::Running {
            return Err(VesselError::Config {
                message: format!("container {} is not running", entry.name),
            });
        }
        entry.pid.ok_or_else(|| VesselError::Config {
            message: format!("container {} has no recorded pid", entry.name),
        })
    }

    /// Best-effort teardown of the overlay mount and cgroup. Failures are
    /// logged, not propagated: the mount may belong to an earlier session
    /// or already be gone.
    fn release_runtime_resources(&self, entry: &StateEntry) {
        if let Err(e) = vessel_core::filesystem::overlayfs::unmount_overlay(&entry.rootfs) {
            tracing::debug!(id = %entry.id, error = %e, "overlay unmount skipped");
        }
        match vessel_core::cgroup::CgroupManager::open(entry.id.as_str()) {
            Ok(cgroup) => {
                if let Err(e) = cgroup.destroy() {
                    tracing::warn!(id = %entry.id, error = %e, "cgroup removal failed");
                }
            }
            Err(_) => tracing::debug!(id = %entry.id, "no cgroup to remove"),
        }
    }
}

/// Derives the command: image entrypoint, then the spec's override or the
/// image's default command.
fn resolve_command(spec: &ContainerSpec, image: &ImageRecord) -> Result<Vec<String>> {
    let tail = if spec.command.is_empty() {
        &image.config.cmd
    } else {
        &spec.command
    };
    let command: Vec<String> = image
        .config
        .entrypoint
        .iter()
        .chain(tail.iter())
        .cloned()
        .collect();
    if command.is_empty() {
        return Err(VesselError::Config {
            message: format!("no command: image {} has no default", image.id.short()),
        });
    }
    Ok(command)
}

/// Merges image environment with spec overrides, guaranteeing a `PATH`.
fn resolve_env(spec: &ContainerSpec, image: &ImageRecord) -> Vec<(String, String)> {
    let mut env: Vec<(String, String)> = image.config.env.clone();
    for (key, value) in &spec.env {
        env.retain(|(k, _)| k != key);
        env.push((key.clone(), value.clone()));
    }
    if !env.iter().any(|(k, _)| k == "PATH") {
        let (key, value) = DEFAULT_PATH.split_once('=').unwrap_or(("PATH", ""));
        env.push((key.to_string(), value.to_string()));
    }
    env
}

/// Fills unset spec limits from the configured defaults.
fn merge_limits(spec: &ResourceLimits, defaults: &ResourceLimits) -> ResourceLimits {
    ResourceLimits {
        cpu_shares: spec.cpu_shares.or(defaults.cpu_shares),
        memory_bytes: spec.memory_bytes.or(defaults.memory_bytes),
        io_weight: spec.io_weight.or(defaults.io_weight),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vessel_image::store::ImageConfig;

    /// Engine rooted in a tempdir with one importable archive on the side.
    fn engine_with_image(name: &str) -> (tempfile::TempDir, Engine) {
        let dir = tempfile::tempdir().expect("tempdir");
        let archive = dir.path().join("rootfs.tar");
        let file = std::fs::File::create(&archive).expect("create archive");
        let mut builder = tar::Builder::new(file);
        let data = format!("rootfs for {name}").into_bytes();
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "etc/marker", data.as_slice())
            .expect("append");
        builder.finish().expect("finish");

        let engine =
            Engine::with_config(VesselConfig::with_data_dir(dir.path().join("data")))
                .expect("engine");
        let config = ImageConfig {
            cmd: vec!["/bin/sh".into()],
            env: vec![("IMAGE_VAR".into(), "from-image".into())],
            ..ImageConfig::default()
        };
        let _ = engine
            .store()
            .import_archive(&archive, Some(name), None, config)
            .expect("import");
        (dir, engine)
    }

    fn spec(image: &str, name: &str) -> ContainerSpec {
        ContainerSpec {
            name: Some(name.into()),
            image: image.into(),
            ..ContainerSpec::default()
        }
    }

    #[test]
    fn create_records_container_with_image_defaults() {
        let (_dir, engine) = engine_with_image("alpine");
        let entry = engine.create(&spec("alpine", "web")).expect("create");

        assert_eq!(entry.state, ContainerState::Created);
        assert_eq!(entry.command, vec!["/bin/sh"]);
        assert!(entry.env.iter().any(|(k, v)| k == "IMAGE_VAR" && v == "from-image"));
        assert!(entry.env.iter().any(|(k, _)| k == "PATH"));
        assert_eq!(engine.list().expect("list").len(), 1);
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let (_dir, engine) = engine_with_image("alpine");
        let _ = engine.create(&spec("alpine", "web")).expect("first");
        assert!(engine.create(&spec("alpine", "web")).is_err());
    }

    #[test]
    fn create_unknown_image_is_not_found() {
        let (_dir, engine) = engine_with_image("alpine");
        assert!(engine.create(&spec("ghost", "web")).is_err());
    }

    #[test]
    fn spec_env_overrides_image_env() {
        let (_dir, engine) = engine_with_image("alpine");
        let mut s = spec("alpine", "web");
        s.env.push(("IMAGE_VAR".into(), "overridden".into()));
        let entry = engine.create(&s).expect("create");

        let values: Vec<&str> = entry
            .env
            .iter()
            .filter(|(k, _)| k == "IMAGE_VAR")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(values, vec!["overridden"]);
    }

    #[test]
    fn spec_command_overrides_image_cmd() {
        let (_dir, engine) = engine_with_image("alpine");
        let mut s = spec("alpine", "web");
        s.command = vec!["/bin/echo".into(), "hi".into()];
        let entry = engine.create(&s).expect("create");
        assert_eq!(entry.command, vec!["/bin/echo", "hi"]);
    }

    #[test]
    fn resolve_finds_by_name_and_prefix() {
        let (_dir, engine) = engine_with_image("alpine");
        let entry = engine.create(&spec("alpine", "db")).expect("create");

        assert_eq!(engine.resolve("db").expect("by name").id, entry.id);
        assert_eq!(
            engine.resolve(&entry.id.as_str()[..8]).expect("by prefix").id,
            entry.id
        );
        assert!(engine.resolve("nope").is_err());
    }

    #[test]
    fn remove_created_container_cleans_state() {
        let (_dir, engine) = engine_with_image("alpine");
        let _ = engine.create(&spec("alpine", "web")).expect("create");
        engine.remove("web", false).expect("remove");
        assert!(engine.list().expect("list").is_empty());
    }

    #[test]
    fn remove_image_refused_while_container_references_it() {
        let (_dir, engine) = engine_with_image("alpine");
        let _ = engine.create(&spec("alpine", "web")).expect("create");

        let err = engine.remove_image("alpine").unwrap_err();
        assert!(err.to_string().contains("in use"), "{err}");

        engine.remove("web", false).expect("remove container");
        let _ = engine.remove_image("alpine").expect("image removable now");
    }

    #[test]
    fn volume_in_use_reports_mounting_container() {
        let (_dir, engine) = engine_with_image("alpine");
        let mut s = spec("alpine", "web");
        s.volumes.push("data:/var/lib/data".parse().expect("mount"));
        let _ = engine.create(&s).expect("create");

        assert_eq!(
            engine.volume_in_use("data").expect("check"),
            Some("web".to_string())
        );
        assert_eq!(engine.volume_in_use("other").expect("check"), None);
    }

    #[test]
    fn stop_on_created_container_is_noop() {
        let (_dir, engine) = engine_with_image("alpine");
        let _ = engine.create(&spec("alpine", "web")).expect("create");
        engine.stop("web", None).expect("stop");
        assert_eq!(
            engine.resolve("web").expect("resolve").state,
            ContainerState::Created
        );
    }

    #[test]
    fn exec_on_stopped_container_is_rejected() {
        let (_dir, engine) = engine_with_image("alpine");
        let _ = engine.create(&spec("alpine", "web")).expect("create");
        assert!(engine.exec("web", &["ls".into()]).is_err());
    }

    #[test]
    fn merge_limits_prefers_spec_values() {
        let spec_limits = ResourceLimits {
            memory_bytes: Some(64),
            ..ResourceLimits::default()
        };
        let defaults = ResourceLimits {
            memory_bytes: Some(128),
            cpu_shares: Some(100),
            io_weight: None,
        };
        let merged = merge_limits(&spec_limits, &defaults);
        assert_eq!(merged.memory_bytes, Some(64));
        assert_eq!(merged.cpu_shares, Some(100));
        assert_eq!(merged.io_weight, None);
    }
}
