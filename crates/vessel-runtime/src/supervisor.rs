//! Supervision of running containers.
//!
//! The supervisor tracks the running set in the state index, reaps exited
//! processes to capture their exit codes, and applies restart policies.
//! Vessel is daemon-less, so supervision happens while a foreground
//! `run` or `up` session is alive; containers from earlier sessions are
//! liveness-checked and marked failed when their process is gone.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use vessel_common::error::Result;
use vessel_common::types::{ContainerId, ContainerState};

use crate::engine::Engine;

/// Poll interval between reap passes.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// One observed container exit.
#[derive(Debug, Clone)]
pub struct ExitEvent {
    /// Container that exited.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Exit code, if the process could be reaped.
    pub exit_code: Option<i32>,
    /// Whether the restart policy started the container again.
    pub restarted: bool,
}

/// Supervises containers through an [`Engine`].
pub struct Supervisor<'a> {
    engine: &'a Engine,
}

impl<'a> Supervisor<'a> {
    /// Creates a supervisor over the given engine.
    #[must_use]
    pub const fn new(engine: &'a Engine) -> Self {
        Self { engine }
    }

    /// Performs one reap pass over all running containers.
    ///
    /// Each exited container has its exit code recorded (exit 0 becomes
    /// `Stopped`, anything else `Failed`) and its restart policy applied.
    /// A process that disappeared without being reapable — a detached
    /// container from an earlier session — is marked failed with an
    /// unknown exit code.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be loaded or saved.
    pub fn reap_once(&self) -> Result<Vec<ExitEvent>> {
        let index = self.engine.load_state()?;
        let running: Vec<(ContainerId, u32)> = index
            .containers
            .iter()
            .filter(|e| e.state == ContainerState::Running)
            .filter_map(|e| e.pid.map(|pid| (e.id.clone(), pid)))
            .collect();

        let mut events = Vec::new();
        for (id, pid) in running {
            let exit_code = match crate::process::try_reap(pid)? {
                Some(code) => Some(code),
                None if crate::container::is_alive(pid) => continue,
                // Gone but not our child; the exit code is lost.
                None => None,
            };
            events.push(self.handle_exit(&id, exit_code)?);
        }
        Ok(events)
    }

    /// Records an exit and applies the restart policy.
    fn handle_exit(&self, id: &ContainerId, exit_code: Option<i32>) -> Result<ExitEvent> {
        let mut index = self.engine.load_state()?;
        let (name, policy, restarts) = {
            let entry = index
                .find_mut(id)
                .ok_or_else(|| vessel_common::error::VesselError::NotFound {
                    kind: "container",
                    id: id.to_string(),
                })?;
            let next = if exit_code == Some(0) {
                ContainerState::Stopped
            } else {
                ContainerState::Failed
            };
            entry.state = entry.state.transition(next)?;
            entry.pid = None;
            entry.exit_code = exit_code;
            (entry.name.clone(), entry.restart_policy, entry.restarts)
        };
        self.engine.save_state(&index)?;
        tracing::info!(id = %id, ?exit_code, "container exited");

        // An unreapable death counts as a failure for policy purposes.
        let effective_code = exit_code.unwrap_or(1);
        let mut restarted = false;
        if policy.should_restart(effective_code, restarts) {
            std::thread::sleep(Duration::from_millis(
                vessel_common::constants::RESTART_BACKOFF_MS,
            ));
            match self.engine.restart(id.as_str()) {
                Ok(_) => {
                    self.bump_restart_count(id)?;
                    restarted = true;
                    tracing::info!(id = %id, restarts = restarts + 1, "container restarted");
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "restart failed");
                }
            }
        }

        Ok(ExitEvent {
            id: id.clone(),
            name,
            exit_code,
            restarted,
        })
    }

    fn bump_restart_count(&self, id: &ContainerId) -> Result<()> {
        let mut index = self.engine.load_state()?;
        if let Some(entry) = index.find_mut(id) {
            entry.restarts += 1;
        }
        self.engine.save_state(&index)?;
        Ok(())
    }

    /// Blocks until the given container exits for good (no restart), and
    /// returns its exit code.
    ///
    /// When `shutdown` is raised — Ctrl+C in the CLI — the container is
    /// stopped with the default grace period and `None` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if a reap pass or the shutdown stop fails.
    pub fn wait_container(
        &self,
        id: &ContainerId,
        shutdown: &AtomicBool,
    ) -> Result<Option<i32>> {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                self.engine.stop(id.as_str(), None)?;
                return Ok(None);
            }
            let events = self.reap_once()?;
            if let Some(event) = events.iter().find(|e| e.id == *id) {
                if !event.restarted {
                    return Ok(event.exit_code);
                }
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Supervises all running containers until `shutdown` is raised, then
    /// stops them.
    ///
    /// # Errors
    ///
    /// Returns an error if a reap pass or the final stop fails.
    pub fn run_until_shutdown(&self, shutdown: &AtomicBool) -> Result<Vec<ExitEvent>> {
        let mut events = Vec::new();
        while !shutdown.load(Ordering::SeqCst) {
            events.extend(self.reap_once()?);
            std::thread::sleep(POLL_INTERVAL);
        }
        tracing::info!("shutdown requested, stopping supervised containers");
        self.engine.stop_all()?;
        Ok(events)
    }
}
