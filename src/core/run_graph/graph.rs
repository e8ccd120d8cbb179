#![allow(clippy::result_large_err)] // Graph queries return AppError to keep the structured error code.

use crate::core::error::AppError;
use crate::core::run_graph::presentation::{IconDescriptor, NodePhase};
use crate::core::types::ErrorCategory;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Directed dependency between two node identities.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub parent: String,
    pub child: String,
}

impl Edge {
    pub fn new(parent: impl Into<String>, child: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
        }
    }
}

/// Node weight carrying everything a renderer needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub task_name: String,
    pub label: String,
    pub status: String,
    pub phase: NodePhase,
    pub color: String,
    pub icon: IconDescriptor,
    pub width: u32,
    pub height: u32,
    pub exit_handler: bool,
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if self.label != self.id {
            write!(f, "\n{}", self.label)?;
        }
        write!(f, "\n{}", self.status)
    }
}

/// Unlabelled edge weight.
#[derive(Debug, Clone, Copy, Default)]
struct Link;

impl fmt::Display for Link {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Ok(())
    }
}

/// Serializable snapshot of a runtime graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
}

/// Reconstructed runtime graph keyed by node identity.
#[derive(Debug, Clone, Default)]
pub struct RuntimeGraph {
    graph: DiGraph<GraphNode, Link>,
    node_map: HashMap<String, NodeIndex>,
}

impl RuntimeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns `false` when the identity is already taken.
    pub fn add_node(&mut self, node: GraphNode) -> bool {
        if self.node_map.contains_key(&node.id) {
            return false;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.node_map.insert(id, idx);
        true
    }

    /// Insert an edge between two known nodes; repeated edges collapse into one.
    ///
    /// Returns `false` when either endpoint is not part of the graph.
    pub fn add_edge(&mut self, edge: &Edge) -> bool {
        match (self.node_map.get(&edge.parent), self.node_map.get(&edge.child)) {
            (Some(&parent), Some(&child)) => {
                self.graph.update_edge(parent, child, Link);
                true
            }
            _ => false,
        }
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_map.get(id).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_map.contains_key(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node_ids(&self) -> BTreeSet<String> {
        self.node_map.keys().cloned().collect()
    }

    pub fn edge_set(&self) -> BTreeSet<Edge> {
        self.graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(parent, child)| Edge::new(&self.graph[parent].id, &self.graph[child].id))
            .collect()
    }

    pub fn has_edge(&self, parent: &str, child: &str) -> bool {
        match (self.node_map.get(parent), self.node_map.get(child)) {
            (Some(&p), Some(&c)) => self.graph.contains_edge(p, c),
            _ => false,
        }
    }

    pub fn children(&self, id: &str) -> BTreeSet<String> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn parents(&self, id: &str) -> BTreeSet<String> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: &str, direction: Direction) -> BTreeSet<String> {
        match self.node_map.get(id) {
            Some(&idx) => self
                .graph
                .neighbors_directed(idx, direction)
                .map(|n| self.graph[n].id.clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    pub fn view(&self) -> GraphView {
        GraphView {
            nodes: self.nodes().cloned().collect(),
            edges: self.edge_set().into_iter().collect(),
        }
    }

    /// Render the graph as a Graphviz DOT string using petgraph.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::with_config(&self.graph, &[Config::EdgeNoLabel]))
    }

    /// Leaf nodes reachable from `id`, or `id` itself when it has no children.
    ///
    /// Fails with `RG-GRAPH-001` when a cycle is reachable from `id`.
    pub fn outbound_nodes(&self, id: &str) -> Result<Vec<String>, AppError> {
        let start = *self.node_map.get(id).ok_or_else(|| {
            AppError::new(ErrorCategory::GraphError, format!("unknown node '{}'", id))
                .with_code("RG-GRAPH-002")
        })?;

        let mut on_path = HashSet::new();
        let mut done = HashSet::new();
        let mut leaves = BTreeSet::new();
        self.collect_leaves(start, &mut on_path, &mut done, &mut leaves)?;
        Ok(leaves.into_iter().collect())
    }

    fn collect_leaves(
        &self,
        idx: NodeIndex,
        on_path: &mut HashSet<NodeIndex>,
        done: &mut HashSet<NodeIndex>,
        leaves: &mut BTreeSet<String>,
    ) -> Result<(), AppError> {
        if done.contains(&idx) {
            return Ok(());
        }
        if !on_path.insert(idx) {
            let mut error = AppError::new(
                ErrorCategory::GraphError,
                "cycle detected while resolving outbound nodes",
            )
            .with_code("RG-GRAPH-001");
            error.add_context("node", &self.graph[idx].id);
            return Err(error);
        }

        let mut has_children = false;
        for child in self.graph.neighbors_directed(idx, Direction::Outgoing) {
            has_children = true;
            self.collect_leaves(child, on_path, done, leaves)?;
        }
        if !has_children {
            leaves.insert(self.graph[idx].id.clone());
        }

        on_path.remove(&idx);
        done.insert(idx);
        Ok(())
    }
}
