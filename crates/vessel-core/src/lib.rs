//! # vessel-core
//!
//! Low-level Linux isolation primitives for the Vessel runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: PID, mount, network, IPC, UTS isolation.
//! - **Cgroups v2**: CPU, memory, and I/O resource limiting and accounting.
//! - **Filesystem**: `OverlayFS` layer stacking, `pivot_root`, and mounts.
//! - **Capabilities**: bounding-set reduction for least-privilege execution.
//!
//! All unsafe system calls are encapsulated in safe wrappers with
//! `// SAFETY:` documentation. On non-Linux platforms every entry point
//! compiles but returns a configuration error.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod capability;
pub mod cgroup;
pub mod filesystem;
pub mod namespace;
