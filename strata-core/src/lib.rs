//! Strata Core
//!
//! This crate provides a dependency graph evaluator: a small topological
//! engine that recomputes values in dependency order. It implements:
//!
//! - Graph construction, by hand or from self-describing nodes
//! - Depth computation with cycle detection
//! - Depth-ordered evaluation through pluggable, late-bindable ops
//! - Bottom-up recalculation of aggregate hierarchies
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the engine (builder, compiled graph, ops)
//! - `recalc`: hierarchy recalculation built on top of the engine
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use indexmap::IndexSet;
//! use parking_lot::Mutex;
//! use strata_core::graph::{FnOps, GraphBuilder, Ops};
//!
//! let values = Arc::new(Mutex::new(HashMap::from([("x", 1), ("y", 2), ("sum", 0)])));
//!
//! let store = values.clone();
//! let sum: Arc<dyn Ops<&'static str>> = Arc::new(FnOps::new(
//!     "sum",
//!     move |node: &&'static str, deps: &IndexSet<&'static str>, _: &IndexSet<&'static str>| {
//!         let mut values = store.lock();
//!         let total = deps.iter().map(|dep| values[dep]).sum::<i32>();
//!         values.insert(*node, total);
//!         Ok(())
//!     },
//! ));
//!
//! let mut builder = GraphBuilder::new();
//! builder.add("x").with_dependant("sum");
//! builder.add("y").with_dependant("sum");
//! builder.add("sum").with_ops(sum);
//!
//! builder.build().evaluate()?;
//! assert_eq!(values.lock()["sum"], 3);
//! # Ok::<(), strata_core::DagError>(())
//! ```

pub mod error;
pub mod graph;
pub mod recalc;

pub use error::{DagError, RecalcError, Result};
pub use graph::{Graph, GraphBuilder, NodeBuilder, Ops, OpsProxy};
