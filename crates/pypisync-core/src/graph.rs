//! Dependency graph over `(project, version)` node keys (§4.6), with a
//! Graphviz `.dot` export for the CLI's `-g` flag. Grounded on the `petgraph`
//! + `Dot` pairing used for the equivalent `-g`/`--graphviz` dump in the
//! `astral-sh-uv` example pack (`resolve_cli.rs`).

use std::collections::HashMap;

use petgraph::dot::{Config as DotConfig, Dot};
use petgraph::graph::{DiGraph, NodeIndex};

use crate::types::MirrorPackage;

#[derive(Default)]
pub struct DependencyGraph {
    inner: DiGraph<MirrorPackage, ()>,
    nodes: HashMap<MirrorPackage, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `package` has a node, keyed on its `(project, version,
    /// basename)` identity, and returns its index.
    pub fn ensure_node(&mut self, package: MirrorPackage) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&package) {
            return idx;
        }
        let idx = self.inner.add_node(package.clone());
        self.nodes.insert(package, idx);
        idx
    }

    pub fn add_dependency(&mut self, from: MirrorPackage, to: MirrorPackage) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.inner.contains_edge(from_idx, to_idx) {
            self.inner.add_edge(from_idx, to_idx, ());
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn to_dot(&self) -> String {
        format!(
            "{:?}",
            Dot::with_config(&self.inner, &[DotConfig::EdgeNoLabel])
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::package_name::PackageName;

    fn pkg(name: &str, version: &str) -> MirrorPackage {
        MirrorPackage::node_key(PackageName::from(name), version.to_owned())
    }

    #[test]
    fn dedups_nodes_by_identity() {
        let mut graph = DependencyGraph::new();
        graph.ensure_node(pkg("demo", "1.0"));
        graph.ensure_node(pkg("demo", "1.0"));
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn records_edges_between_distinct_nodes() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(pkg("top", "1.0"), pkg("dep", "2.0"));
        assert_eq!(graph.node_count(), 2);
        let dot = graph.to_dot();
        assert!(dot.contains("digraph"));
    }
}
