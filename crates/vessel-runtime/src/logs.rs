//! Container log management.
//!
//! Each container's stdout and stderr are redirected into a single log
//! file under `<data_dir>/logs/`, written by the container process itself
//! so no daemon needs to stay alive to collect output.

use std::io::Write;
use std::path::{Path, PathBuf};

use vessel_common::error::{Result, VesselError};

/// Returns the log file path for a container.
#[must_use]
pub fn log_path(data_dir: &Path, container_id: &str) -> PathBuf {
    data_dir.join("logs").join(format!("{container_id}.log"))
}

/// Reads container logs from disk.
///
/// Returns an empty string if the log file does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_logs(data_dir: &Path, container_id: &str) -> Result<String> {
    let path = log_path(data_dir, container_id);
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(&path).map_err(|e| VesselError::io(path, e))
}

/// Returns the last `lines` lines of a container's logs.
///
/// # Errors
///
/// Returns an error if the log file cannot be read.
pub fn tail_logs(data_dir: &Path, container_id: &str, lines: usize) -> Result<String> {
    let content = read_logs(data_dir, container_id)?;
    let all: Vec<&str> = content.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].join("\n"))
}

/// Appends a log line for a container.
///
/// Creates the log directory and file if they do not exist. Used by the
/// runtime itself for lifecycle annotations; container output is written
/// directly by the redirected process.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be created or written.
pub fn append_log(data_dir: &Path, container_id: &str, line: &str) -> Result<()> {
    let path = log_path(data_dir, container_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| VesselError::io(parent.to_path_buf(), e))?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| VesselError::io(path.clone(), e))?;
    writeln!(file, "{line}").map_err(|e| VesselError::io(path, e))?;
    Ok(())
}

/// Deletes a container's log file if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn remove_logs(data_dir: &Path, container_id: &str) -> Result<()> {
    let path = log_path(data_dir, container_id);
    if path.exists() {
        std::fs::remove_file(&path).map_err(|e| VesselError::io(path, e))?;
    }
    Ok(())
}
