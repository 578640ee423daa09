//! Compiled Graph
//!
//! A [`Graph`] is the output of [`GraphBuilder::build`](super::GraphBuilder::build):
//! node metadata sorted by ascending depth, ready to be evaluated any number
//! of times.

use std::fmt;
use std::hash::Hash;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{trace, warn};

use super::node::{Depth, NodeMeta};
use crate::error::Result;

/// Depth-ordered dependency graph.
pub struct Graph<N: fmt::Debug> {
    /// Node metadata, sorted by depth. Cyclic nodes come last.
    nodes: Vec<NodeMeta<N>>,

    /// Position of each node in `nodes`.
    positions: IndexMap<N, usize>,
}

/// Serializable snapshot of one node, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub node: String,
    /// `None` for cyclic nodes.
    pub depth: Option<usize>,
    pub dependencies: Vec<String>,
    pub dependants: Vec<String>,
    pub ops: String,
}

impl<N> Graph<N>
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    pub(crate) fn new(nodes: Vec<NodeMeta<N>>) -> Self {
        let positions = nodes
            .iter()
            .enumerate()
            .map(|(position, meta)| (meta.node.clone(), position))
            .collect();
        Self { nodes, positions }
    }

    /// Run every node's ops in depth order.
    ///
    /// Nodes with a finite depth get [`Ops::evaluate`](super::Ops::evaluate),
    /// cyclic nodes get [`Ops::cyclic`](super::Ops::cyclic). The first error
    /// stops the pass; effects of nodes already evaluated are kept.
    pub fn evaluate(&self) -> Result<()> {
        for meta in &self.nodes {
            match meta.depth {
                Depth::Finite(depth) => {
                    trace!(node = ?meta.node, depth, ops = meta.ops.name(), "evaluating node");
                    meta.ops.evaluate(&meta.node, &meta.dependencies, &meta.dependants)?;
                }
                Depth::Cyclic => {
                    warn!(node = ?meta.node, ops = meta.ops.name(), "node is part of a dependency cycle");
                    meta.ops.cyclic(&meta.node, &meta.dependencies, &meta.dependants)?;
                }
            }
        }
        Ok(())
    }

    /// Get the metadata of a node.
    pub fn get(&self, node: &N) -> Option<&NodeMeta<N>> {
        self.positions.get(node).map(|&position| &self.nodes[position])
    }

    pub fn depth_of(&self, node: &N) -> Option<Depth> {
        self.get(node).map(NodeMeta::depth)
    }

    /// Iterate node metadata in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeMeta<N>> {
        self.nodes.iter()
    }

    /// Nodes whose depth could not be resolved.
    pub fn cyclic_nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes
            .iter()
            .filter(|meta| meta.is_cyclic())
            .map(NodeMeta::node)
    }

    /// Get the total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Describe every node in evaluation order.
    pub fn summary(&self) -> Vec<NodeSummary> {
        self.nodes
            .iter()
            .map(|meta| NodeSummary {
                node: format!("{:?}", meta.node),
                depth: meta.depth.finite(),
                dependencies: meta.dependencies.iter().map(|node| format!("{node:?}")).collect(),
                dependants: meta.dependants.iter().map(|node| format!("{node:?}")).collect(),
                ops: meta.ops.name().to_owned(),
            })
            .collect()
    }
}

impl<'a, N: fmt::Debug> IntoIterator for &'a Graph<N> {
    type Item = &'a NodeMeta<N>;
    type IntoIter = std::slice::Iter<'a, NodeMeta<N>>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl<N: fmt::Debug> fmt::Debug for Graph<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.nodes.iter()).finish()
    }
}
