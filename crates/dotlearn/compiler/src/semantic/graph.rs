// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Directed graphs over declaration names
//!
//! The dependor graph is authoritative for revision propagation and training order.
//! The invoked graph is best-effort: it only tells code emission which helper
//! instances a generated artifact has to construct. Neither is a subset of the other.

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

/// Directed graph keyed by name, without parallel edges
#[derive(Debug, Clone, Default)]
pub struct NameGraph {
    /// The underlying directed graph
    graph: DiGraph<String, ()>,

    /// Mapping from names to node indices
    node_indices: HashMap<String, NodeIndex>,
}

impl NameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name to the graph if not present
    pub fn add_name(&mut self, name: &str) -> NodeIndex {
        if let Some(&node_index) = self.node_indices.get(name) {
            return node_index;
        }

        let node_index = self.graph.add_node(name.to_string());
        self.node_indices.insert(name.to_string(), node_index);
        node_index
    }

    /// Adds the edge `from -> to`; adding it twice is a no-op
    pub fn add_edge(&mut self, from: &str, to: &str) {
        let from_index = self.add_name(from);
        let to_index = self.add_name(to);
        self.graph.update_edge(from_index, to_index, ());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.node_indices.contains_key(name)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => self.graph.contains_edge(a, b),
            _ => false,
        }
    }

    /// Targets of the outgoing edges of `name`, sorted
    pub fn successors(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Sources of the incoming edges of `name`, sorted
    pub fn predecessors(&self, name: &str) -> BTreeSet<String> {
        self.neighbors(name, Direction::Incoming)
    }

    fn neighbors(&self, name: &str, direction: Direction) -> BTreeSet<String> {
        match self.node_indices.get(name) {
            Some(&node_index) => self.graph.neighbors_directed(node_index, direction).map(|idx| self.graph[idx].clone()).collect(),
            None => BTreeSet::new(),
        }
    }

    /// Whether `to` can be reached from `from` along one or more edges
    pub fn reaches(&self, from: &str, to: &str) -> bool {
        if from == to {
            return false;
        }
        match (self.node_indices.get(from), self.node_indices.get(to)) {
            (Some(&a), Some(&b)) => has_path_connecting(&self.graph, a, b, None),
            _ => false,
        }
    }

    /// Every name in the graph, sorted
    pub fn names(&self) -> BTreeSet<String> {
        self.node_indices.keys().cloned().collect()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Edges run from a dependency to each declaration whose definition references it
#[derive(Debug, Clone, Default)]
pub struct DependorGraph {
    inner: NameGraph,
}

impl DependorGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code-generating declaration, even if nothing depends on it
    pub fn add_declaration(&mut self, name: &str) {
        self.inner.add_name(name);
    }

    pub fn add_dependency(&mut self, dependency: &str, dependor: &str) {
        self.inner.add_edge(dependency, dependor);
    }

    /// Declarations that reference `name` directly
    pub fn dependors(&self, name: &str) -> BTreeSet<String> {
        self.inner.successors(name)
    }

    /// Names `name` references directly
    pub fn dependencies(&self, name: &str) -> BTreeSet<String> {
        self.inner.predecessors(name)
    }

    /// Whether `dependor` depends on `dependency`, directly or transitively
    pub fn depends_on(&self, dependor: &str, dependency: &str) -> bool {
        self.inner.reaches(dependency, dependor)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains(name)
    }

    pub fn names(&self) -> BTreeSet<String> {
        self.inner.names()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}

/// Edges run from an invoker to each name its generated code calls at runtime
#[derive(Debug, Clone, Default)]
pub struct InvokedGraph {
    inner: NameGraph,
}

impl InvokedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_invocation(&mut self, invoker: &str, invokee: &str) {
        self.inner.add_edge(invoker, invokee);
    }

    pub fn invokees(&self, invoker: &str) -> BTreeSet<String> {
        self.inner.successors(invoker)
    }

    pub fn invokes(&self, invoker: &str, invokee: &str) -> bool {
        self.inner.has_edge(invoker, invokee)
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_edges_collapse() {
        let mut graph = NameGraph::new();
        graph.add_edge("A", "B");
        graph.add_edge("A", "B");
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_transitive_dependency() {
        let mut graph = DependorGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("B", "C");
        graph.add_declaration("D");

        assert!(graph.depends_on("C", "A"));
        assert!(!graph.depends_on("A", "C"));
        assert!(!graph.depends_on("D", "A"));
        assert!(graph.contains("D"));
        assert!(graph.dependors("D").is_empty());
        assert_eq!(graph.dependencies("C"), BTreeSet::from(["B".to_string()]));
    }

    #[test]
    fn test_cycle_reaches_both_ways() {
        let mut graph = DependorGraph::new();
        graph.add_dependency("A", "B");
        graph.add_dependency("B", "A");
        assert!(graph.depends_on("A", "B"));
        assert!(graph.depends_on("B", "A"));
        assert!(!graph.depends_on("A", "A"));
    }

    #[test]
    fn test_invoked_graph_may_omit_names() {
        let mut invoked = InvokedGraph::new();
        invoked.add_invocation("Tagger", "Word");
        assert!(invoked.invokes("Tagger", "Word"));
        assert!(!invoked.invokes("Word", "Tagger"));
        assert!(invoked.invokees("Unknown").is_empty());
    }
}
