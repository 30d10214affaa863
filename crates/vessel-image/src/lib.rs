//! # vessel-image
//!
//! Container image and layer management for the Vessel runtime.
//!
//! Handles:
//! - **Digests**: SHA-256 content addressing and verification.
//! - **Layers**: packing and unpacking of `.tar(.gz)` layer blobs.
//! - **Graph**: the parent-linked layer DAG and chain resolution.
//! - **Store**: on-disk layout, layer index, and the tagged image catalog.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod digest;
pub mod graph;
pub mod layer;
pub mod store;
