//! Dependency Graph
//!
//! This module implements the dependency graph evaluator: a topological
//! engine that recomputes values in dependency order.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes are host values (anything hashable and printable). The engine
//!   never owns the objects they stand for, only the relationships.
//! - Edges point downstream: if B consumes A's result, B is a *dependant* of
//!   A and A is a *dependency* of B.
//!
//! Topology is accumulated in a [`GraphBuilder`], either wired by hand or
//! discovered through [`NodeBuilder`]s. `build()` compiles it into a
//! [`Graph`] sorted by [`Depth`], and [`Graph::evaluate`] runs each node's
//! [`Ops`] so that no node runs before its dependencies.
//!
//! # Design Decisions
//!
//! 1. Adjacency lives in side tables keyed by node rather than in owned
//!    recursive structures, so cyclic topologies need no special ownership.
//!
//! 2. Builder-phase and evaluation-phase metadata are distinct types. Depth
//!    and dependency sets only exist on the compiled side.
//!
//! 3. Cycles are not rejected at build time. Cyclic nodes sort last and are
//!    handed to [`Ops::cyclic`], whose default fails with
//!    [`DagError::Cyclic`](crate::DagError::Cyclic).

mod builder;
mod compiled;
mod node;
mod ops;

pub use builder::{GraphBuilder, Neighbours, NodeBuilder};
pub use compiled::{Graph, NodeSummary};
pub use node::{Depth, NodeMeta, NodeRef, ProtoNodeMeta};
pub use ops::{FnOps, NoOps, Ops, OpsProxy};
