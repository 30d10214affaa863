//! Container lifecycle management for the Vessel runtime.
//!
//! The [`engine::Engine`] is the high-level entry point used by the CLI
//! and the compose layer; the [`supervisor::Supervisor`] wraps it for
//! foreground sessions that need exit-code capture and restart policy.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod container;
pub mod engine;
pub mod exec;
pub mod logs;
pub mod metrics;
pub mod process;
pub mod state;
pub mod supervisor;
pub mod volume;
