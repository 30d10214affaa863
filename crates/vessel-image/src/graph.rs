//! The layer graph: a parent-linked DAG of filesystem diffs.
//!
//! Built with `petgraph` from the store's layer index. Resolving an image
//! walks from its top layer down the parent links to produce the read-only
//! chain that `OverlayFS` stacks beneath the container's rw layer.

use std::collections::HashMap;

use petgraph::graph::NodeIndex;
use vessel_common::error::{Result, VesselError};
use vessel_common::types::Sha256Digest;

use crate::layer::LayerRecord;

/// A directed acyclic graph of layers, edges pointing parent to child.
#[derive(Debug, Default)]
pub struct LayerGraph {
    graph: petgraph::Graph<Sha256Digest, ()>,
    index: HashMap<Sha256Digest, NodeIndex>,
}

impl LayerGraph {
    /// Creates an empty layer graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from the store's layer index.
    ///
    /// # Errors
    ///
    /// Returns an error if a record references an unknown parent, if two
    /// records disagree about a layer's parent, or if the parent links
    /// contain a cycle.
    pub fn from_records(records: &[LayerRecord]) -> Result<Self> {
        let mut graph = Self::new();
        for record in records {
            graph.insert_node(&record.digest);
        }
        for record in records {
            if let Some(parent) = &record.parent {
                graph.link_parent(&record.digest, parent)?;
            }
        }
        graph.validate_acyclic()?;
        Ok(graph)
    }

    /// Adds a layer node if it is not already present.
    pub fn insert_node(&mut self, digest: &Sha256Digest) {
        if !self.index.contains_key(digest) {
            let idx = self.graph.add_node(digest.clone());
            let _ = self.index.insert(digest.clone(), idx);
        }
    }

    /// Records that `child` is stacked on `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent is not in the graph or the child
    /// already has a different parent. Layers are immutable, so a layer's
    /// parent link can never change.
    pub fn link_parent(&mut self, child: &Sha256Digest, parent: &Sha256Digest) -> Result<()> {
        let &child_idx = self.index.get(child).ok_or_else(|| VesselError::NotFound {
            kind: "layer",
            id: child.to_string(),
        })?;
        let &parent_idx = self
            .index
            .get(parent)
            .ok_or_else(|| VesselError::NotFound {
                kind: "parent layer",
                id: parent.to_string(),
            })?;

        if let Some(existing) = self.parent_of_idx(child_idx) {
            if existing == parent_idx {
                return Ok(());
            }
            return Err(VesselError::Config {
                message: format!("layer {child} already has a different parent"),
            });
        }

        let _ = self.graph.add_edge(parent_idx, child_idx, ());
        Ok(())
    }

    /// Resolves the read-only chain for an image, bottom layer first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown top digest, or a configuration
    /// error if the chain exceeds the layer depth bound (which also guards
    /// against walking a cycle).
    pub fn resolve_chain(&self, top: &Sha256Digest) -> Result<Vec<Sha256Digest>> {
        let mut idx = *self.index.get(top).ok_or_else(|| VesselError::NotFound {
            kind: "layer",
            id: top.to_string(),
        })?;

        let mut chain = vec![self.graph[idx].clone()];
        while let Some(parent_idx) = self.parent_of_idx(idx) {
            if chain.len() >= vessel_common::constants::MAX_IMAGE_LAYERS {
                return Err(VesselError::Config {
                    message: format!(
                        "layer chain for {top} exceeds {} layers",
                        vessel_common::constants::MAX_IMAGE_LAYERS
                    ),
                });
            }
            chain.push(self.graph[parent_idx].clone());
            idx = parent_idx;
        }

        chain.reverse();
        tracing::debug!(top = %top, depth = chain.len(), "layer chain resolved");
        Ok(chain)
    }

    /// Returns whether the graph contains the given layer.
    #[must_use]
    pub fn contains(&self, digest: &Sha256Digest) -> bool {
        self.index.contains_key(digest)
    }

    fn parent_of_idx(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    fn validate_acyclic(&self) -> Result<()> {
        petgraph::algo::toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|_| VesselError::Config {
                message: "cycle detected in layer parent links".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(byte: char) -> Sha256Digest {
        Sha256Digest::from_hex(byte.to_string().repeat(64)).expect("digest")
    }

    fn record(d: char, parent: Option<char>) -> LayerRecord {
        LayerRecord {
            digest: digest(d),
            parent: parent.map(digest),
            size_bytes: 1,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[test]
    fn single_layer_resolves_to_itself() {
        let graph = LayerGraph::from_records(&[record('a', None)]).expect("graph");
        let chain = graph.resolve_chain(&digest('a')).expect("chain");
        assert_eq!(chain, vec![digest('a')]);
    }

    #[test]
    fn chain_is_ordered_bottom_to_top() {
        let records = [record('a', None), record('b', Some('a')), record('c', Some('b'))];
        let graph = LayerGraph::from_records(&records).expect("graph");
        let chain = graph.resolve_chain(&digest('c')).expect("chain");
        assert_eq!(chain, vec![digest('a'), digest('b'), digest('c')]);
    }

    #[test]
    fn sibling_layers_share_a_parent() {
        let records = [record('a', None), record('b', Some('a')), record('c', Some('a'))];
        let graph = LayerGraph::from_records(&records).expect("graph");
        assert_eq!(
            graph.resolve_chain(&digest('b')).expect("chain b"),
            vec![digest('a'), digest('b')]
        );
        assert_eq!(
            graph.resolve_chain(&digest('c')).expect("chain c"),
            vec![digest('a'), digest('c')]
        );
    }

    #[test]
    fn unknown_top_layer_is_not_found() {
        let graph = LayerGraph::from_records(&[record('a', None)]).expect("graph");
        assert!(graph.resolve_chain(&digest('f')).is_err());
    }

    #[test]
    fn dangling_parent_is_rejected() {
        let result = LayerGraph::from_records(&[record('b', Some('a'))]);
        assert!(result.is_err());
    }

    #[test]
    fn conflicting_parent_links_are_rejected() {
        let mut graph = LayerGraph::new();
        graph.insert_node(&digest('a'));
        graph.insert_node(&digest('b'));
        graph.insert_node(&digest('c'));
        graph.link_parent(&digest('c'), &digest('a')).expect("first link");
        assert!(graph.link_parent(&digest('c'), &digest('b')).is_err());
    }

    #[test]
    fn repeated_identical_link_is_idempotent() {
        let mut graph = LayerGraph::new();
        graph.insert_node(&digest('a'));
        graph.insert_node(&digest('b'));
        graph.link_parent(&digest('b'), &digest('a')).expect("link");
        graph.link_parent(&digest('b'), &digest('a')).expect("relink");
        assert_eq!(
            graph.resolve_chain(&digest('b')).expect("chain"),
            vec![digest('a'), digest('b')]
        );
    }

    #[test]
    fn cycle_in_parent_links_is_rejected() {
        // Hand-assemble a cycle; from_records would reject the dangling
        // parents before the cycle check could run.
        let mut graph = LayerGraph::new();
        graph.insert_node(&digest('a'));
        graph.insert_node(&digest('b'));
        graph.link_parent(&digest('b'), &digest('a')).expect("link");
        graph.link_parent(&digest('a'), &digest('b')).expect("link");
        assert!(graph.validate_acyclic().is_err());
    }
}
