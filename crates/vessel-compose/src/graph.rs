//! Service dependency graph using `petgraph`.
//!
//! Builds a directed acyclic graph from `depends_on` declarations and
//! resolves the startup ordering; teardown uses the reverse.

use std::collections::HashMap;

use vessel_common::error::{Result, VesselError};

use crate::spec::ComposeFile;

/// A dependency graph of services.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: petgraph::Graph<String, ()>,
}

impl DependencyGraph {
    /// Creates an empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph from a validated compose file.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependencies contain a cycle.
    pub fn from_compose(file: &ComposeFile) -> Result<Self> {
        let mut graph = Self::new();
        let mut nodes = HashMap::new();
        for name in file.services.keys() {
            let _ = nodes.insert(name.clone(), graph.add_service(name));
        }
        for (name, service) in &file.services {
            for dep in &service.depends_on {
                if let (Some(&dependent), Some(&dependency)) = (nodes.get(name), nodes.get(dep)) {
                    graph.add_dependency(dependent, dependency);
                }
            }
        }
        // Surface cycles at build time rather than on first use.
        let _ = graph.startup_order()?;
        Ok(graph)
    }

    /// Adds a service node to the graph.
    pub fn add_service(&mut self, name: impl Into<String>) -> petgraph::graph::NodeIndex {
        self.graph.add_node(name.into())
    }

    /// Adds a dependency edge: `dependent` depends on `dependency`.
    ///
    /// The edge points from `dependency` to `dependent` so that a
    /// topological sort yields dependencies first.
    pub fn add_dependency(
        &mut self,
        dependent: petgraph::graph::NodeIndex,
        dependency: petgraph::graph::NodeIndex,
    ) {
        let _ = self.graph.add_edge(dependency, dependent, ());
    }

    /// Returns the service ordering for startup: dependencies first.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn startup_order(&self) -> Result<Vec<String>> {
        match petgraph::algo::toposort(&self.graph, None) {
            Ok(indices) => Ok(indices
                .iter()
                .filter_map(|&idx| self.graph.node_weight(idx).cloned())
                .collect()),
            Err(_cycle) => Err(VesselError::Config {
                message: "cyclic dependency detected between services".into(),
            }),
        }
    }

    /// Returns the service ordering for teardown: dependents first.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains cycles.
    pub fn teardown_order(&self) -> Result<Vec<String>> {
        let mut order = self.startup_order()?;
        order.reverse();
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::parse_compose;

    #[test]
    fn empty_graph_resolves_to_empty() {
        let graph = DependencyGraph::new();
        assert!(graph.startup_order().expect("order").is_empty());
    }

    #[test]
    fn linear_dependency_chain() {
        let mut graph = DependencyGraph::new();
        let api = graph.add_service("api");
        let db = graph.add_service("db");
        graph.add_dependency(api, db);

        let order = graph.startup_order().expect("order");
        let api_pos = order.iter().position(|n| n == "api").expect("api");
        let db_pos = order.iter().position(|n| n == "db").expect("db");
        assert!(db_pos < api_pos, "db should come before api: {order:?}");
    }

    #[test]
    fn diamond_dependency() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        let c = graph.add_service("c");
        let d = graph.add_service("d");
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);

        let order = graph.startup_order().expect("order");
        assert_eq!(order.len(), 4);
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("d") < pos("b"));
        assert!(pos("d") < pos("c"));
        assert!(pos("b") < pos("a"));
        assert!(pos("c") < pos("a"));
    }

    #[test]
    fn cycle_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_service("a");
        let b = graph.add_service("b");
        graph.add_dependency(a, b);
        graph.add_dependency(b, a);

        let result = graph.startup_order();
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("cyclic"), "got: {msg}");
    }

    #[test]
    fn teardown_is_reverse_of_startup() {
        let mut graph = DependencyGraph::new();
        let api = graph.add_service("api");
        let db = graph.add_service("db");
        graph.add_dependency(api, db);

        let mut up = graph.startup_order().expect("up");
        let down = graph.teardown_order().expect("down");
        up.reverse();
        assert_eq!(up, down);
    }

    #[test]
    fn from_compose_respects_depends_on() {
        let file = parse_compose(
            r"
services:
  api:
    image: img
    depends_on: [db, cache]
  db:
    image: img
  cache:
    image: img
",
        )
        .expect("parse");

        let graph = DependencyGraph::from_compose(&file).expect("graph");
        let order = graph.startup_order().expect("order");
        let pos = |name: &str| order.iter().position(|n| n == name).expect(name);
        assert!(pos("db") < pos("api"));
        assert!(pos("cache") < pos("api"));
    }

    #[test]
    fn from_compose_rejects_cycles() {
        let file = parse_compose(
            r"
services:
  a:
    image: img
    depends_on: [b]
  b:
    image: img
    depends_on: [a]
",
        )
        .expect("parse");
        assert!(DependencyGraph::from_compose(&file).is_err());
    }
}
