//! Graph Builder
//!
//! The builder accumulates topology and compiles it into a [`Graph`].
//!
//! Nodes can be wired by hand with [`GraphBuilder::add`], or discovered from
//! a [`NodeBuilder`] that lets each node describe its own neighbours.
//!
//! # Algorithm
//!
//! `build()` runs in four steps:
//!
//! 1. Materialize a [`NodeMeta`] for every registered node, copying its
//!    dependants and ops.
//! 2. Invert the dependant edges to derive each node's dependencies.
//! 3. Compute every node's depth with a memoized depth-first search. A node is
//!    marked [`Depth::Cyclic`] *before* its dependencies are visited, so a
//!    walk that comes back to it reads the sentinel instead of recursing.
//! 4. Stable-sort the metas by depth.
//!
//! The walk guard used by [`GraphBuilder::add_with_dependants`] is unrelated
//! to step 3: it only keeps discovery from looping over a cyclic topology.

use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::iter;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::compiled::Graph;
use super::node::{Depth, NodeMeta, ProtoNodeMeta};
use super::ops::{NoOps, Ops};

/// Neighbours produced by a [`NodeBuilder`]: each one comes with the builder
/// that knows how to describe it.
pub type Neighbours<'a, N> = Box<dyn Iterator<Item = (N, Arc<dyn NodeBuilder<N>>)> + 'a>;

/// Lets nodes describe their own topology on demand.
///
/// Each neighbour may carry a different builder, so one walk can cross node
/// kinds. The defaults describe an isolated node with no computation.
pub trait NodeBuilder<N: fmt::Debug + 'static> {
    /// Direct dependants of `node`. Repeats are allowed.
    fn dependants(&self, node: &N) -> Neighbours<'_, N> {
        let _ = node;
        Box::new(iter::empty())
    }

    /// Direct dependencies of `node`. Only consulted by
    /// [`GraphBuilder::add_with_dependencies`].
    fn dependencies(&self, node: &N) -> Neighbours<'_, N> {
        let _ = node;
        Box::new(iter::empty())
    }

    /// Ops to bind to `node`.
    fn ops(&self, node: &N) -> Arc<dyn Ops<N>> {
        let _ = node;
        Arc::new(NoOps)
    }
}

/// Accumulates nodes and edges, then compiles them into a [`Graph`].
pub struct GraphBuilder<N: fmt::Debug> {
    /// Registered nodes, in first-reference order.
    nodes: IndexMap<N, ProtoNodeMeta<N>>,
}

impl<N> GraphBuilder<N>
where
    N: Clone + Eq + Hash + fmt::Debug + 'static,
{
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Get the metadata for `node`, registering it if needed.
    pub fn add(&mut self, node: N) -> &mut ProtoNodeMeta<N> {
        self.nodes.entry(node).or_default()
    }

    /// Get the metadata for a registered node.
    pub fn get(&self, node: &N) -> Option<&ProtoNodeMeta<N>> {
        self.nodes.get(node)
    }

    pub fn contains(&self, node: &N) -> bool {
        self.nodes.contains_key(node)
    }

    /// Get the number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Register `node` and everything transitively reachable through its
    /// dependants.
    ///
    /// A node whose dependants were already walked is skipped; use
    /// [`GraphBuilder::force_add_with_dependants`] after its topology changed.
    pub fn add_with_dependants(&mut self, node: N, node_builder: &dyn NodeBuilder<N>) {
        self.walk_dependants(node, node_builder, false, &mut HashSet::new());
    }

    /// Like [`GraphBuilder::add_with_dependants`], but re-walks nodes that
    /// were already added, replacing their recorded dependants.
    ///
    /// Each reachable node is re-walked once per call, however many paths
    /// lead to it.
    pub fn force_add_with_dependants(&mut self, node: N, node_builder: &dyn NodeBuilder<N>) {
        self.walk_dependants(node, node_builder, true, &mut HashSet::new());
    }

    fn walk_dependants(
        &mut self,
        node: N,
        node_builder: &dyn NodeBuilder<N>,
        force: bool,
        visited: &mut HashSet<N>,
    ) {
        let meta = self.add(node.clone());
        if meta.dependants_added && !force {
            return;
        }
        // Plain walks only guard the current call stack. Forced walks keep
        // every node they reach, so a shared dependant is cleared once.
        if !visited.insert(node.clone()) {
            return;
        }

        meta.dependants_added = true;
        meta.ops = node_builder.ops(&node);
        if force {
            meta.dependants.clear();
        }

        for (dependant, dependant_builder) in node_builder.dependants(&node) {
            self.add(node.clone()).with_dependant(dependant.clone());
            self.walk_dependants(dependant, dependant_builder.as_ref(), force, visited);
        }

        if !force {
            visited.remove(&node);
        }
    }

    /// Register the whole connected component of `node`: everything
    /// downstream through dependants, and everything upstream through
    /// dependencies.
    pub fn add_with_dependencies(&mut self, node: N, node_builder: &dyn NodeBuilder<N>) {
        self.add_with_dependants(node.clone(), node_builder);

        let meta = self.add(node.clone());
        if meta.dependencies_added {
            return;
        }
        meta.dependencies_added = true;

        for (dependency, dependency_builder) in node_builder.dependencies(&node) {
            self.add(dependency.clone()).with_dependant(node.clone());
            self.add_with_dependencies(dependency, dependency_builder.as_ref());
        }
    }

    /// Compile the accumulated topology into a depth-ordered [`Graph`].
    ///
    /// Cyclic nodes are not an error here; they are given
    /// [`Depth::Cyclic`] and left to their ops at evaluation time.
    pub fn build(&self) -> Graph<N> {
        // Materialize, including dependants that were never added explicitly.
        let mut index: IndexMap<N, usize> = IndexMap::with_capacity(self.nodes.len());
        let mut metas: Vec<NodeMeta<N>> = Vec::with_capacity(self.nodes.len());
        for (node, proto) in &self.nodes {
            intern(&mut index, &mut metas, node);
            let meta = &mut metas[index[node]];
            meta.dependants = proto.dependants.clone();
            meta.ops = Arc::clone(&proto.ops);

            for dependant in &proto.dependants {
                intern(&mut index, &mut metas, dependant);
            }
        }

        // Invert dependant edges.
        let mut dependencies: Vec<Vec<usize>> = vec![Vec::new(); metas.len()];
        for i in 0..metas.len() {
            let dependants: Vec<usize> = metas[i]
                .dependants
                .iter()
                .map(|dependant| index[dependant])
                .collect();
            for j in dependants {
                let node = metas[i].node.clone();
                if metas[j].dependencies.insert(node) {
                    dependencies[j].push(i);
                }
            }
        }

        let mut depths: Vec<Option<Depth>> = vec![None; metas.len()];
        for i in 0..metas.len() {
            compute_depth(i, &dependencies, &mut depths);
        }
        for (meta, depth) in metas.iter_mut().zip(depths) {
            meta.depth = depth.unwrap_or(Depth::Cyclic);
        }

        metas.sort_by_key(|meta| meta.depth);

        let cyclic = metas.iter().filter(|meta| meta.is_cyclic()).count();
        debug!(nodes = metas.len(), cyclic, "built dependency graph");

        Graph::new(metas)
    }
}

impl<N> Default for GraphBuilder<N>
where
    N: Clone + Eq + Hash + fmt::Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N: fmt::Debug> fmt::Debug for GraphBuilder<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.nodes.iter()).finish()
    }
}

/// Ensure `node` has a resolved meta slot.
fn intern<N>(index: &mut IndexMap<N, usize>, metas: &mut Vec<NodeMeta<N>>, node: &N)
where
    N: Clone + Eq + Hash + fmt::Debug,
{
    if index.contains_key(node) {
        return;
    }
    index.insert(node.clone(), metas.len());
    metas.push(NodeMeta {
        node: node.clone(),
        dependants: IndexSet::new(),
        dependencies: IndexSet::new(),
        ops: Arc::new(NoOps),
        depth: Depth::Finite(0),
    });
}

/// Memoized depth of node `i`.
///
/// The memo is seeded with [`Depth::Cyclic`] before recursing, so any node
/// that reaches itself again resolves to cyclic, as does everything
/// downstream of it.
fn compute_depth(i: usize, dependencies: &[Vec<usize>], depths: &mut [Option<Depth>]) -> Depth {
    if let Some(depth) = depths[i] {
        return depth;
    }
    depths[i] = Some(Depth::Cyclic);

    let mut depth = Depth::Finite(0);
    for &j in &dependencies[i] {
        depth = depth.max(compute_depth(j, dependencies, depths).successor());
    }

    depths[i] = Some(depth);
    depth
}
