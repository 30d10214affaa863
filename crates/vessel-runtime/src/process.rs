//! Process spawning inside isolated namespaces.
//!
//! The container process is created with `clone(2)` carrying the
//! namespace flags, so it starts life as PID 1 of its own PID namespace.
//! The child then wires its stdio into the container log, prepares the
//! rootfs, reduces privileges, and execs the target command; the parent
//! only learns the host PID for tracking.

use std::path::Path;

use vessel_common::error::{Result, VesselError};
use vessel_core::namespace::NamespaceConfig;

use crate::volume::ResolvedMount;

/// Stack size for the cloned child before it execs.
#[cfg(target_os = "linux")]
const CHILD_STACK_BYTES: usize = 1024 * 1024;

/// Exit code the child reports when container setup fails before exec.
#[cfg(target_os = "linux")]
const SETUP_FAILURE_CODE: isize = 126;

/// Exit code the child reports when the command cannot be executed.
#[cfg(target_os = "linux")]
const EXEC_FAILURE_CODE: isize = 127;

/// Everything the spawn path needs to bring up a container process.
#[derive(Debug)]
pub struct SpawnSpec<'a> {
    /// Command and arguments to execute.
    pub command: &'a [String],
    /// Complete environment for the process.
    pub env: &'a [(String, String)],
    /// Mounted rootfs (the merged `OverlayFS` directory).
    pub rootfs: &'a Path,
    /// Hostname inside the UTS namespace.
    pub hostname: &'a str,
    /// Resolved volume mounts to bind into the rootfs.
    pub mounts: &'a [ResolvedMount],
    /// Remount the rootfs read-only after volumes are bound.
    pub readonly_rootfs: bool,
    /// Working directory inside the container.
    pub working_dir: Option<&'a str>,
    /// Namespaces to isolate.
    pub namespaces: NamespaceConfig,
    /// Log file receiving the process's stdout and stderr.
    pub log_path: &'a Path,
}

/// Spawns the container process, returning its host PID.
///
/// # Errors
///
/// Returns an error if the command is empty or `clone(2)` fails. Setup
/// failures inside the child surface as the container exiting with code
/// 126 (setup) or 127 (exec), with details in the container log.
#[cfg(target_os = "linux")]
pub fn spawn_container_process(spec: &SpawnSpec<'_>) -> Result<u32> {
    if spec.command.is_empty() {
        return Err(VesselError::Config {
            message: "container command is empty".into(),
        });
    }

    let mut stack = vec![0u8; CHILD_STACK_BYTES];
    let flags = spec.namespaces.clone_flags();

    let cb = Box::new(|| child_main(spec));
    // SAFETY: the callback only runs in the child, which either execs or
    // exits with a status code; it never unwinds back into parent state.
    let pid = unsafe { nix::sched::clone(cb, &mut stack, flags, Some(libc::SIGCHLD)) }.map_err(
        |e| VesselError::PermissionDenied {
            message: format!("clone failed (namespaces may require root): {e}"),
        },
    )?;

    let pid = pid.as_raw().unsigned_abs();
    tracing::info!(pid, cmd = ?spec.command, "container process spawned");
    Ok(pid)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — process spawning requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn spawn_container_process(_spec: &SpawnSpec<'_>) -> Result<u32> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Non-blocking reap of an exited container process.
///
/// Returns `Ok(Some(code))` when the process has exited and was reaped
/// (a death by signal maps to `128 + signo`, following shell convention).
/// Returns `Ok(None)` while the process is still running, and also when
/// it is not a child of the calling process — a detached container from
/// an earlier session can only be liveness-checked, not reaped.
///
/// # Errors
///
/// Returns an error for unexpected `waitpid(2)` failures.
#[cfg(target_os = "linux")]
pub fn try_reap(pid: u32) -> Result<Option<i32>> {
    use nix::errno::Errno;
    use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
    use nix::unistd::Pid;

    match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
        Ok(WaitStatus::Exited(_, code)) => Ok(Some(code)),
        Ok(WaitStatus::Signaled(_, signal, _)) => Ok(Some(128 + signal as i32)),
        Ok(_) => Ok(None),
        Err(Errno::ECHILD) => Ok(None),
        Err(e) => Err(VesselError::Config {
            message: format!("waitpid for {pid} failed: {e}"),
        }),
    }
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — process control requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn try_reap(_pid: u32) -> Result<Option<i32>> {
    Err(VesselError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Entry point of the cloned child: set up, then exec.
#[cfg(target_os = "linux")]
fn child_main(spec: &SpawnSpec<'_>) -> isize {
    if let Err(e) = redirect_stdio(spec.log_path) {
        // Stdio redirection failed, so the message goes to the inherited
        // stderr as a last resort.
        eprintln!("vessel: stdio setup failed: {e}");
        return SETUP_FAILURE_CODE;
    }
    match container_init(spec) {
        Ok(()) => {
            // execvpe only returns on failure.
            eprintln!("vessel: exec {:?} failed", spec.command[0]);
            EXEC_FAILURE_CODE
        }
        Err(e) => {
            eprintln!("vessel: container setup failed: {e}");
            SETUP_FAILURE_CODE
        }
    }
}

/// Prepares isolation and execs the command. Runs as PID 1 of the new
/// PID namespace.
#[cfg(target_os = "linux")]
fn container_init(spec: &SpawnSpec<'_>) -> Result<()> {
    use std::ffi::CString;

    use vessel_core::capability::{self, Capability};
    use vessel_core::filesystem::{mount, pivot_root};
    use vessel_core::namespace;

    if spec.namespaces.uts {
        namespace::set_hostname(spec.hostname)?;
    }

    if spec.namespaces.mount {
        mount::make_mounts_private()?;
    }

    for m in spec.mounts {
        let relative = m.target.strip_prefix("/").unwrap_or(&m.target);
        mount::bind_mount(&m.source, &spec.rootfs.join(relative), m.readonly)?;
    }

    if spec.readonly_rootfs {
        mount::remount_readonly(spec.rootfs)?;
    }

    pivot_root::enter_rootfs(spec.rootfs)?;
    mount::mount_proc(Path::new("/"))?;

    if let Some(dir) = spec.working_dir {
        nix::unistd::chdir(dir).map_err(|e| VesselError::Config {
            message: format!("chdir to working dir {dir} failed: {e}"),
        })?;
    }

    capability::drop_capabilities(&[
        Capability::Chown,
        Capability::Kill,
        Capability::Setgid,
        Capability::Setuid,
        Capability::NetBindService,
    ])?;

    let to_cstring = |s: &str| {
        CString::new(s).map_err(|_| VesselError::Config {
            message: format!("embedded NUL in argument: {s:?}"),
        })
    };
    let argv: Vec<CString> = spec
        .command
        .iter()
        .map(|s| to_cstring(s))
        .collect::<Result<_>>()?;
    let envp: Vec<CString> = spec
        .env
        .iter()
        .map(|(k, v)| to_cstring(&format!("{k}={v}")))
        .collect::<Result<_>>()?;

    let _ = nix::unistd::execvpe(&argv[0], &argv, &envp).map_err(|e| VesselError::Config {
        message: format!("exec failed: {e}"),
    })?;
    unreachable!("execvpe returned without error")
}

/// Redirects stdin to `/dev/null` and stdout/stderr into the log file.
#[cfg(target_os = "linux")]
fn redirect_stdio(log_path: &Path) -> Result<()> {
    use std::os::fd::AsFd;

    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VesselError::io(parent.to_path_buf(), e))?;
    }
    let log = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| VesselError::io(log_path.to_path_buf(), e))?;
    let devnull = std::fs::File::open("/dev/null")
        .map_err(|e| VesselError::io(std::path::PathBuf::from("/dev/null"), e))?;

    let dup_err = |e: nix::errno::Errno| VesselError::Config {
        message: format!("stdio redirection failed: {e}"),
    };
    nix::unistd::dup2_stdin(devnull.as_fd()).map_err(dup_err)?;
    nix::unistd::dup2_stdout(log.as_fd()).map_err(dup_err)?;
    nix::unistd::dup2_stderr(log.as_fd()).map_err(dup_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_rejects_empty_command() {
        let spec = SpawnSpec {
            command: &[],
            env: &[],
            rootfs: Path::new("/tmp/rootfs"),
            hostname: "c1",
            mounts: &[],
            readonly_rootfs: false,
            working_dir: None,
            namespaces: NamespaceConfig::default(),
            log_path: Path::new("/tmp/c1.log"),
        };
        assert!(spawn_container_process(&spec).is_err());
    }
}
