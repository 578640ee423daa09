//! Aggregate Hierarchy
//!
//! An [`Aggregate`] is one node of a statistics hierarchy. Leaves carry raw
//! stats supplied by the host; interior nodes derive theirs from their
//! children when the hierarchy is recalculated.
//!
//! Children are dependencies of their parent, so a recalculation pass always
//! refreshes a subtree bottom-up.

use std::fmt;
use std::iter;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexSet;
use parking_lot::RwLock;
use tracing::trace;

use crate::error::Result;
use crate::graph::{Neighbours, NoOps, NodeBuilder, NodeRef, Ops};

/// Graph handle for an aggregate. Compared by identity.
pub type AggregateRef = NodeRef<Aggregate>;

/// Count and score total of a subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    pub count: u64,
    pub total: f64,
}

impl Stats {
    pub fn new(count: u64, total: f64) -> Self {
        Self { count, total }
    }

    /// Mean score, or `None` for an empty subtree.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.total / self.count as f64)
        }
    }
}

impl Add for Stats {
    type Output = Stats;

    fn add(self, other: Stats) -> Stats {
        Stats {
            count: self.count + other.count,
            total: self.total + other.total,
        }
    }
}

impl iter::Sum for Stats {
    fn sum<I: Iterator<Item = Stats>>(iter: I) -> Stats {
        iter.fold(Stats::default(), Add::add)
    }
}

/// A node of a statistics hierarchy.
pub struct Aggregate {
    name: String,

    parent: RwLock<Weak<Aggregate>>,

    children: RwLock<Vec<AggregateRef>>,

    stats: RwLock<Stats>,

    /// Stamp of the last recalculation that touched this node. Zero if never.
    recalculated: AtomicU64,
}

impl Aggregate {
    /// Create a detached leaf with the given raw stats.
    pub fn leaf(name: impl Into<String>, stats: Stats) -> AggregateRef {
        NodeRef::new(Self {
            name: name.into(),
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
            stats: RwLock::new(stats),
            recalculated: AtomicU64::new(0),
        })
    }

    /// Create a detached node with no stats yet.
    pub fn group(name: impl Into<String>) -> AggregateRef {
        Self::leaf(name, Stats::default())
    }

    /// Wire `child` under `parent`, detaching it from any previous parent.
    ///
    /// Ancestors are not rejected. Children are held strongly, so a cyclic
    /// hierarchy is never freed until one of its links is detached.
    pub fn attach(parent: &AggregateRef, child: &AggregateRef) {
        if let Some(previous) = child.parent() {
            Self::detach(&previous, child);
        }
        *child.parent.write() = Arc::downgrade(parent.as_arc());
        parent.children.write().push(child.clone());
    }

    /// Remove `child` from `parent`.
    pub fn detach(parent: &AggregateRef, child: &AggregateRef) {
        parent.children.write().retain(|existing| existing != child);
        let mut link = child.parent.write();
        if Weak::ptr_eq(&link, &Arc::downgrade(parent.as_arc())) {
            *link = Weak::new();
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<AggregateRef> {
        self.parent.read().upgrade().map(NodeRef::from)
    }

    pub fn children(&self) -> Vec<AggregateRef> {
        self.children.read().clone()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.read().is_empty()
    }

    pub fn stats(&self) -> Stats {
        *self.stats.read()
    }

    /// Overwrite the node's stats. Used by hosts to feed raw leaf data.
    pub fn set_stats(&self, stats: Stats) {
        *self.stats.write() = stats;
    }

    pub fn recalculated(&self) -> u64 {
        self.recalculated.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Aggregate").field(&self.name).finish()
    }
}

/// Sets an interior node's stats to the sum of its children's.
#[derive(Debug, Clone, Copy)]
pub struct RollupOps {
    stamp: u64,
}

impl RollupOps {
    pub fn new(stamp: u64) -> Self {
        Self { stamp }
    }
}

impl Ops<AggregateRef> for RollupOps {
    fn evaluate(
        &self,
        node: &AggregateRef,
        dependencies: &IndexSet<AggregateRef>,
        _dependants: &IndexSet<AggregateRef>,
    ) -> Result<()> {
        let stats: Stats = dependencies.iter().map(|child| child.stats()).sum();
        trace!(node = node.name(), count = stats.count, total = stats.total, "rolled up");

        node.set_stats(stats);
        node.recalculated.store(self.stamp, Ordering::Release);
        Ok(())
    }

    fn name(&self) -> &str {
        "RollupOps"
    }
}

/// Describes aggregate topology to a [`GraphBuilder`](crate::graph::GraphBuilder).
///
/// A node's dependant is its parent and its dependencies are its children.
#[derive(Debug, Clone, Copy)]
pub struct AggregateBuilder {
    stamp: u64,
}

impl AggregateBuilder {
    /// Create a builder whose interior nodes are stamped with `stamp`.
    pub fn new(stamp: u64) -> Self {
        Self { stamp }
    }

    fn share(&self) -> Arc<dyn NodeBuilder<AggregateRef>> {
        Arc::new(*self)
    }
}

impl NodeBuilder<AggregateRef> for AggregateBuilder {
    fn dependants(&self, node: &AggregateRef) -> Neighbours<'_, AggregateRef> {
        Box::new(node.parent().into_iter().map(move |parent| (parent, self.share())))
    }

    fn dependencies(&self, node: &AggregateRef) -> Neighbours<'_, AggregateRef> {
        Box::new(node.children().into_iter().map(move |child| (child, self.share())))
    }

    fn ops(&self, node: &AggregateRef) -> Arc<dyn Ops<AggregateRef>> {
        if node.is_leaf() {
            Arc::new(NoOps)
        } else {
            Arc::new(RollupOps::new(self.stamp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn tree() -> (AggregateRef, AggregateRef, AggregateRef) {
        let root = Aggregate::group("root");
        let left = Aggregate::leaf("left", Stats::new(2, 7.0));
        let right = Aggregate::leaf("right", Stats::new(1, 5.0));
        Aggregate::attach(&root, &left);
        Aggregate::attach(&root, &right);
        (root, left, right)
    }

    #[test]
    fn stats_sum_and_mean() {
        let total: Stats = vec![Stats::new(2, 6.0), Stats::new(1, 3.0)].into_iter().sum();
        assert_eq!(total, Stats::new(3, 9.0));
        assert_eq!(total.mean(), Some(3.0));
        assert_eq!(Stats::default().mean(), None);
    }

    #[test]
    fn attach_links_both_directions() {
        let (root, left, _) = tree();

        assert_eq!(left.parent(), Some(root.clone()));
        assert_eq!(root.children().len(), 2);
        assert!(!root.is_leaf());
        assert!(left.is_leaf());
    }

    #[test]
    fn attach_moves_child_between_parents() {
        let (root, left, _) = tree();
        let other = Aggregate::group("other");

        Aggregate::attach(&other, &left);

        assert_eq!(left.parent(), Some(other.clone()));
        assert_eq!(root.children().len(), 1);
        assert_eq!(other.children(), vec![left]);
    }

    #[test]
    fn builder_rolls_up_subtree() {
        let (root, left, _) = tree();

        let mut builder = GraphBuilder::new();
        builder.add_with_dependencies(root.clone(), &AggregateBuilder::new(7));
        assert_eq!(builder.len(), 3);

        builder.build().evaluate().unwrap();

        assert_eq!(root.stats(), Stats::new(3, 12.0));
        assert_eq!(root.recalculated(), 7);
        assert_eq!(left.recalculated(), 0);
    }

    #[test]
    fn walking_from_a_leaf_reaches_the_root() {
        let (root, left, _) = tree();

        let mut builder = GraphBuilder::new();
        builder.add_with_dependants(left, &AggregateBuilder::new(1));

        assert!(builder.contains(&root));
        assert_eq!(builder.get(&root).unwrap().ops().name(), "RollupOps");
    }
}
