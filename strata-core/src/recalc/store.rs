//! Hierarchy Store
//!
//! The store is where a host keeps track of which hierarchies need a
//! recalculation. A root is stale while its `modified` stamp is ahead of the
//! stamp of its last completed recalculation.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use super::aggregate::AggregateRef;

/// Source of stale hierarchy roots.
pub trait HierarchyStore: Send + Sync {
    /// Up to `limit` roots that need a recalculation, oldest modification first.
    fn stale_roots(&self, limit: usize) -> Vec<AggregateRef>;

    /// Record that `root` was recalculated as of `stamp`.
    fn mark_fresh(&self, root: &AggregateRef, stamp: u64);

    /// Current stamp. Must not go backwards.
    fn now(&self) -> u64;
}

#[derive(Debug)]
struct Entry {
    root: AggregateRef,
    modified: u64,
    recalculated: u64,
}

/// In-memory [`HierarchyStore`] with a logical clock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<Entry>>,
    clock: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Register a root. It starts out stale.
    pub fn insert(&self, root: AggregateRef) {
        let modified = self.tick();
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|entry| entry.root == root) {
            Some(entry) => entry.modified = modified,
            None => entries.push(Entry {
                root,
                modified,
                recalculated: 0,
            }),
        }
    }

    /// Mark a registered root as modified. Returns `false` if it is unknown.
    pub fn touch(&self, root: &AggregateRef) -> bool {
        let modified = self.tick();
        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|entry| entry.root == *root) {
            Some(entry) => {
                entry.modified = modified;
                true
            }
            None => false,
        }
    }

    pub fn is_stale(&self, root: &AggregateRef) -> bool {
        self.entries
            .lock()
            .iter()
            .any(|entry| entry.root == *root && entry.modified > entry.recalculated)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl HierarchyStore for MemoryStore {
    fn stale_roots(&self, limit: usize) -> Vec<AggregateRef> {
        let entries = self.entries.lock();
        let mut stale: Vec<&Entry> = entries
            .iter()
            .filter(|entry| entry.modified > entry.recalculated)
            .collect();
        stale.sort_by_key(|entry| entry.modified);
        stale
            .into_iter()
            .take(limit)
            .map(|entry| entry.root.clone())
            .collect()
    }

    fn mark_fresh(&self, root: &AggregateRef, stamp: u64) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.iter_mut().find(|entry| entry.root == *root) {
            entry.recalculated = entry.recalculated.max(stamp);
        }
    }

    fn now(&self) -> u64 {
        self.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recalc::Aggregate;

    #[test]
    fn inserted_roots_start_stale() {
        let store = MemoryStore::new();
        let a = Aggregate::group("a");
        let b = Aggregate::group("b");
        store.insert(a.clone());
        store.insert(b.clone());

        assert_eq!(store.stale_roots(10), vec![a.clone(), b]);
        assert_eq!(store.stale_roots(1), vec![a]);
    }

    #[test]
    fn fresh_until_touched() {
        let store = MemoryStore::new();
        let a = Aggregate::group("a");
        store.insert(a.clone());

        let stamp = store.now();
        store.mark_fresh(&a, stamp);
        assert!(!store.is_stale(&a));
        assert!(store.stale_roots(10).is_empty());

        assert!(store.touch(&a));
        assert!(store.is_stale(&a));
        assert!(!store.touch(&Aggregate::group("unknown")));
    }

    #[test]
    fn modification_during_recalculation_stays_stale() {
        let store = MemoryStore::new();
        let a = Aggregate::group("a");
        store.insert(a.clone());

        let stamp = store.now();
        store.touch(&a);
        store.mark_fresh(&a, stamp);

        assert!(store.is_stale(&a));
    }
}
