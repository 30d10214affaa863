//! Bringing a composition up and down through the engine.
//!
//! A project wraps a loaded compose file with a name (the directory the
//! file lives in) and converts each service into a container spec. `up`
//! creates declared volumes and starts services in dependency order;
//! `down` stops and removes them in reverse.

use std::path::Path;

use vessel_common::error::{Result, VesselError};
use vessel_runtime::container::ContainerSpec;
use vessel_runtime::engine::Engine;
use vessel_runtime::state::StateEntry;

use crate::graph::DependencyGraph;
use crate::spec::{self, ComposeFile, ServiceSpec};

/// A named composition ready to run.
#[derive(Debug)]
pub struct Project {
    /// Project name, prefixed onto container names.
    pub name: String,
    /// The parsed and validated compose file.
    pub file: ComposeFile,
}

impl Project {
    /// Loads a project from a compose file path.
    ///
    /// The project name is the containing directory's name, falling back
    /// to the file stem for paths without a usable parent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let file = spec::load_compose(path)?;
        let name = project_name(path);
        Ok(Self { name, file })
    }

    /// Returns the container name for a service.
    #[must_use]
    pub fn container_name(&self, service_name: &str, service: &ServiceSpec) -> String {
        service
            .container_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.name, service_name))
    }

    /// Creates declared volumes, then creates and starts every service in
    /// dependency order.
    ///
    /// # Errors
    ///
    /// Returns an error if ordering, volume creation, container creation,
    /// or start fails. Already-started services are left running.
    pub fn up(&self, engine: &Engine) -> Result<Vec<StateEntry>> {
        let order = DependencyGraph::from_compose(&self.file)?.startup_order()?;
        tracing::info!(project = %self.name, ?order, "startup order resolved");

        for volume_name in self.file.volumes.keys() {
            let _ = engine.volumes().create(volume_name)?;
        }

        let mut started = Vec::new();
        for service_name in &order {
            let Some(service) = self.file.services.get(service_name) else {
                continue;
            };
            let container_spec = self.to_container_spec(service_name, service)?;
            let created = engine.create(&container_spec)?;
            let entry = engine.start(created.id.as_str())?;
            tracing::info!(
                project = %self.name,
                service = %service_name,
                id = %entry.id,
                "service started"
            );
            started.push(entry);
        }
        Ok(started)
    }

    /// Stops and removes every service container in reverse dependency
    /// order.
    ///
    /// Services whose containers no longer exist are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a stop or removal fails.
    pub fn down(&self, engine: &Engine) -> Result<()> {
        let order = DependencyGraph::from_compose(&self.file)?.teardown_order()?;
        for service_name in &order {
            let Some(service) = self.file.services.get(service_name) else {
                continue;
            };
            let container = self.container_name(service_name, service);
            match engine.resolve(&container) {
                Ok(entry) => {
                    engine.stop(entry.id.as_str(), None)?;
                    engine.remove(entry.id.as_str(), false)?;
                    tracing::info!(project = %self.name, service = %service_name, "service removed");
                }
                Err(VesselError::NotFound { .. }) => {
                    tracing::debug!(service = %service_name, "no container to remove");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Converts a service definition into a container spec.
    ///
    /// # Errors
    ///
    /// Returns an error if ports, volumes, restart policy, environment,
    /// or memory limits fail to parse.
    pub fn to_container_spec(&self, service_name: &str, service: &ServiceSpec) -> Result<ContainerSpec> {
        let mut spec = ContainerSpec {
            name: Some(self.container_name(service_name, service)),
            image: service.image.clone(),
            ..ContainerSpec::default()
        };

        if let Some(command) = &service.command {
            spec.command = command.to_argv();
        }
        if let Some(env) = &service.environment {
            spec.env = env.to_pairs()?;
        }
        for port in &service.ports {
            spec.ports.push(port.parse()?);
        }
        for volume in &service.volumes {
            spec.volumes.push(volume.parse()?);
        }
        if let Some(restart) = &service.restart {
            spec.restart_policy = restart.parse()?;
        }
        if let Some(mem) = &service.mem_limit {
            spec.limits.memory_bytes = Some(spec::parse_memory(mem)?);
        }
        spec.limits.cpu_shares = service.cpu_shares;
        spec.hostname = service.hostname.clone();
        spec.readonly_rootfs = service.read_only.unwrap_or(false);
        Ok(spec)
    }
}

/// Derives the project name from the compose file location.
fn project_name(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .as_deref()
        .unwrap_or(path)
        .parent()
        .and_then(Path::file_name)
        .or_else(|| path.file_stem())
        .map_or_else(|| "vessel".to_string(), |s| s.to_string_lossy().into_owned())
}
