//! # vessel-compose
//!
//! Declarative multi-container configuration for Vessel.
//!
//! Handles:
//! - **Spec**: the serde model of the YAML compose file.
//! - **Graph**: service dependency graph and start/stop ordering.
//! - **Project**: bringing a composition up and down through the engine.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod graph;
pub mod project;
pub mod spec;
