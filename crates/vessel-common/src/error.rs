//! Unified error types for the Vessel workspace.
//!
//! Higher-level crates return these variants directly rather than defining
//! their own enums; the CLI boundary converts them into `anyhow` errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ContainerState;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum VesselError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or request is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// A content digest validation failed.
    #[error("digest mismatch for {resource}: expected {expected}, got {actual}")]
    DigestMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected digest value.
        expected: String,
        /// Actual computed digest value.
        actual: String,
    },

    /// A permission or capability error.
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Description of the denied operation.
        message: String,
    },

    /// A container lifecycle transition is not allowed.
    #[error("invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition {
        /// State the container is currently in.
        from: ContainerState,
        /// State the operation tried to move it to.
        to: ContainerState,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl VesselError {
    /// Wraps an I/O error with the path it occurred at.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a `Config` error from a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, VesselError>;
