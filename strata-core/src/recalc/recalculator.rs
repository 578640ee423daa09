//! Recalculation Loop
//!
//! Polls a [`HierarchyStore`] for stale roots and refreshes each one with a
//! dedicated dependency graph. Roots are processed one at a time; a failure
//! part-way through a root leaves the nodes already rolled up in place.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::aggregate::{AggregateBuilder, AggregateRef};
use super::config::RecalcConfig;
use super::store::HierarchyStore;
use crate::error::{DagError, RecalcError};
use crate::graph::GraphBuilder;

/// Outcome of a single pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Roots recalculated successfully.
    pub processed: usize,
    /// Roots skipped after a failure.
    pub failed: usize,
    /// Graph nodes evaluated across all processed roots.
    pub nodes: usize,
}

/// Drives recalculation of stale hierarchies.
pub struct Recalculator<S> {
    store: Arc<S>,
    config: RecalcConfig,
}

impl<S: HierarchyStore> Recalculator<S> {
    pub fn new(store: Arc<S>, config: RecalcConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &RecalcConfig {
        &self.config
    }

    /// Rebuild and evaluate the graph of one hierarchy.
    ///
    /// Returns the number of nodes in the graph.
    pub fn recalculate(&self, root: &AggregateRef, stamp: u64) -> Result<usize, DagError> {
        let mut builder = GraphBuilder::new();
        builder.add_with_dependencies(root.clone(), &AggregateBuilder::new(stamp));

        let graph = builder.build();
        graph.evaluate()?;
        Ok(graph.len())
    }

    /// Process up to `max_roots_per_pass` stale roots.
    pub fn run_pass(&self) -> Result<PassReport, RecalcError> {
        let mut report = PassReport::default();

        for root in self.store.stale_roots(self.config.max_roots_per_pass) {
            let stamp = self.store.now();
            match self.recalculate(&root, stamp) {
                Ok(nodes) => {
                    self.store.mark_fresh(&root, stamp);
                    info!(root = root.name(), nodes, stamp, "recalculated hierarchy");
                    report.processed += 1;
                    report.nodes += nodes;
                }
                Err(err) if self.config.stop_on_error => {
                    error!(root = root.name(), %err, "recalculation failed, stopping pass");
                    return Err(err.into());
                }
                Err(err) => {
                    warn!(root = root.name(), %err, "recalculation failed, skipping root");
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run passes until `shutdown` turns `true` or its sender is dropped,
    /// sleeping `poll_interval_ms` between passes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), RecalcError> {
        let interval = self.config.poll_interval();
        info!(?interval, batch = self.config.max_roots_per_pass, "recalculation loop started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let report = self.run_pass()?;
            if report.processed == 0 && report.failed == 0 {
                debug!("no stale hierarchies");
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("recalculation loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recalc::{Aggregate, MemoryStore, Stats};

    fn survey() -> (AggregateRef, AggregateRef) {
        let root = Aggregate::group("survey");
        let section = Aggregate::group("section");
        let q1 = Aggregate::leaf("q1", Stats::new(4, 10.0));
        let q2 = Aggregate::leaf("q2", Stats::new(1, 2.0));
        Aggregate::attach(&root, &section);
        Aggregate::attach(&section, &q1);
        Aggregate::attach(&section, &q2);
        (root, section)
    }

    #[test]
    fn recalculate_rolls_up_bottom_up() {
        let (root, section) = survey();
        let recalculator = Recalculator::new(Arc::new(MemoryStore::new()), RecalcConfig::default());

        let nodes = recalculator.recalculate(&root, 3).unwrap();

        assert_eq!(nodes, 4);
        assert_eq!(section.stats(), Stats::new(5, 12.0));
        assert_eq!(root.stats(), Stats::new(5, 12.0));
        assert_eq!(root.recalculated(), 3);
    }

    #[test]
    fn pass_marks_roots_fresh() {
        let (root, _) = survey();
        let store = Arc::new(MemoryStore::new());
        store.insert(root.clone());

        let recalculator = Recalculator::new(store.clone(), RecalcConfig::default());
        let report = recalculator.run_pass().unwrap();

        assert_eq!(report, PassReport { processed: 1, failed: 0, nodes: 4 });
        assert!(!store.is_stale(&root));
        assert_eq!(recalculator.run_pass().unwrap(), PassReport::default());
    }

    #[test]
    fn pass_respects_batch_size() {
        let store = Arc::new(MemoryStore::new());
        for name in ["a", "b", "c"] {
            store.insert(Aggregate::group(name));
        }

        let config = RecalcConfig {
            max_roots_per_pass: 2,
            ..RecalcConfig::default()
        };
        let recalculator = Recalculator::new(store.clone(), config);

        assert_eq!(recalculator.run_pass().unwrap().processed, 2);
        assert_eq!(recalculator.run_pass().unwrap().processed, 1);
        assert_eq!(recalculator.run_pass().unwrap().processed, 0);
    }

    #[test]
    fn cyclic_hierarchy_is_skipped_or_fatal() {
        let a = Aggregate::group("a");
        let b = Aggregate::group("b");
        Aggregate::attach(&a, &b);
        Aggregate::attach(&b, &a);

        let store = Arc::new(MemoryStore::new());
        store.insert(a.clone());

        let lenient = Recalculator::new(store.clone(), RecalcConfig::default());
        let report = lenient.run_pass().unwrap();
        assert_eq!(report.failed, 1);
        assert!(store.is_stale(&a));

        let strict = Recalculator::new(
            store.clone(),
            RecalcConfig {
                stop_on_error: true,
                ..RecalcConfig::default()
            },
        );
        let err = strict.run_pass().unwrap_err();
        assert!(matches!(err, RecalcError::Dag(ref dag) if dag.is_cyclic()));

        Aggregate::detach(&b, &a);
        assert!(a.parent().is_none());
        assert!(b.children().is_empty());
    }

    #[tokio::test]
    async fn run_loop_processes_until_shutdown() {
        let (root, _) = survey();
        let store = Arc::new(MemoryStore::new());
        store.insert(root.clone());

        let config = RecalcConfig {
            poll_interval_ms: 5,
            ..RecalcConfig::default()
        };
        let recalculator = Arc::new(Recalculator::new(store.clone(), config));
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn({
            let recalculator = recalculator.clone();
            async move { recalculator.run(rx).await }
        });

        for _ in 0..200 {
            if !store.is_stale(&root) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert!(!store.is_stale(&root));

        // Later modifications are picked up by the next pass.
        root.set_stats(Stats::default());
        store.touch(&root);
        for _ in 0..200 {
            if !store.is_stale(&root) {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(root.stats(), Stats::new(5, 12.0));

        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();
    }
}
