//! Hierarchy Recalculation
//!
//! Keeps aggregate statistics of a hierarchy in sync with its leaves. Every
//! stale root gets its own dependency graph, built from the hierarchy itself
//! through [`AggregateBuilder`], so children are always rolled up before
//! their parents.
//!
//! # Components
//!
//! - [`Aggregate`]: a hierarchy node holding [`Stats`].
//! - [`HierarchyStore`]: where stale roots come from ([`MemoryStore`] keeps
//!   them in memory).
//! - [`Recalculator`]: runs single passes, or an async polling loop.
//! - [`RecalcConfig`]: loop settings, loadable from JSON.

mod aggregate;
mod config;
mod recalculator;
mod store;

pub use aggregate::{Aggregate, AggregateBuilder, AggregateRef, RollupOps, Stats};
pub use config::RecalcConfig;
pub use recalculator::{PassReport, Recalculator};
pub use store::{HierarchyStore, MemoryStore};
