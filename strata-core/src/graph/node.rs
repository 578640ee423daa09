//! Graph Nodes
//!
//! This module defines the per-node bookkeeping that lives in the dependency
//! graph. Metadata exists in two phases:
//!
//! - [`ProtoNodeMeta`] is mutable and accumulates edges while a
//!   [`GraphBuilder`](super::GraphBuilder) is being filled.
//! - [`NodeMeta`] is produced once by `build()` and carries the derived
//!   dependency set and resolved depth used during evaluation.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use indexmap::IndexSet;

use super::ops::{NoOps, Ops};

/// Identity handle for host objects used as graph nodes.
///
/// Two handles are equal only when they point at the same allocation, so
/// structurally equal objects stay distinct vertices.
pub struct NodeRef<T>(Arc<T>);

impl<T> NodeRef<T> {
    /// Wrap a value in a new identity.
    pub fn new(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the shared allocation.
    pub fn as_arc(&self) -> &Arc<T> {
        &self.0
    }
}

impl<T> From<Arc<T>> for NodeRef<T> {
    fn from(value: Arc<T>) -> Self {
        Self(value)
    }
}

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for NodeRef<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> PartialEq for NodeRef<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for NodeRef<T> {}

impl<T> Hash for NodeRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl<T: fmt::Debug> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Length of the longest dependency chain leading into a node.
///
/// Cyclic nodes have no finite depth and order after every finite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    Finite(usize),
    Cyclic,
}

impl Depth {
    /// Depth of a node sitting directly on top of this one.
    pub fn successor(self) -> Self {
        match self {
            Self::Finite(depth) => Self::Finite(depth + 1),
            Self::Cyclic => Self::Cyclic,
        }
    }

    pub fn is_cyclic(self) -> bool {
        self == Self::Cyclic
    }

    /// The finite depth, if any.
    pub fn finite(self) -> Option<usize> {
        match self {
            Self::Finite(depth) => Some(depth),
            Self::Cyclic => None,
        }
    }
}

impl Ord for Depth {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Finite(a), Self::Finite(b)) => a.cmp(b),
            (Self::Finite(_), Self::Cyclic) => Ordering::Less,
            (Self::Cyclic, Self::Finite(_)) => Ordering::Greater,
            (Self::Cyclic, Self::Cyclic) => Ordering::Equal,
        }
    }
}

impl PartialOrd for Depth {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(depth) => write!(f, "{depth}"),
            Self::Cyclic => f.write_str("inf"),
        }
    }
}

/// Construction-time metadata for a node.
pub struct ProtoNodeMeta<N: fmt::Debug> {
    /// Nodes that consume this node's result.
    pub(crate) dependants: IndexSet<N>,

    /// Set once the node's dependants were walked through a node builder.
    pub(crate) dependants_added: bool,

    /// Set once the node's dependencies were walked through a node builder.
    pub(crate) dependencies_added: bool,

    pub(crate) ops: Arc<dyn Ops<N>>,
}

impl<N> ProtoNodeMeta<N>
where
    N: Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            dependants: IndexSet::new(),
            dependants_added: false,
            dependencies_added: false,
            ops: Arc::new(NoOps),
        }
    }

    /// Record `node` as a dependant. Adding the same node twice is a no-op.
    pub fn with_dependant(&mut self, node: N) -> &mut Self {
        self.dependants.insert(node);
        self
    }

    /// Bind or replace the node's ops.
    pub fn with_ops(&mut self, ops: Arc<dyn Ops<N>>) -> &mut Self {
        self.ops = ops;
        self
    }

    pub fn dependants(&self) -> &IndexSet<N> {
        &self.dependants
    }

    pub fn dependants_added(&self) -> bool {
        self.dependants_added
    }

    pub fn dependencies_added(&self) -> bool {
        self.dependencies_added
    }

    pub fn ops(&self) -> &Arc<dyn Ops<N>> {
        &self.ops
    }
}

impl<N> Default for ProtoNodeMeta<N>
where
    N: Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<N: fmt::Debug> fmt::Debug for ProtoNodeMeta<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtoNodeMeta")
            .field("dependants", &self.dependants)
            .field("dependants_added", &self.dependants_added)
            .field("dependencies_added", &self.dependencies_added)
            .field("ops", &self.ops.name())
            .finish()
    }
}

/// Resolved metadata for a node in a compiled [`Graph`](super::Graph).
pub struct NodeMeta<N: fmt::Debug> {
    pub(crate) node: N,

    /// Nodes that consume this node's result (evaluated after it).
    pub(crate) dependants: IndexSet<N>,

    /// Nodes this node consumes (evaluated before it). Derived by inverting
    /// the dependant edges during the build.
    pub(crate) dependencies: IndexSet<N>,

    pub(crate) ops: Arc<dyn Ops<N>>,

    pub(crate) depth: Depth,
}

impl<N: fmt::Debug> NodeMeta<N> {
    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn dependants(&self) -> &IndexSet<N> {
        &self.dependants
    }

    pub fn dependencies(&self) -> &IndexSet<N> {
        &self.dependencies
    }

    pub fn ops(&self) -> &Arc<dyn Ops<N>> {
        &self.ops
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn is_cyclic(&self) -> bool {
        self.depth.is_cyclic()
    }
}

impl<N: fmt::Debug> fmt::Debug for NodeMeta<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeMeta")
            .field("node", &self.node)
            .field("depth", &self.depth)
            .field("dependencies", &self.dependencies)
            .field("dependants", &self.dependants)
            .field("ops", &self.ops.name())
            .finish()
    }
}
