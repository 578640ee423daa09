//! Node Operations
//!
//! An [`Ops`] is the computation strategy bound to a node. The graph decides
//! *when* a node runs; the ops decide *what* running it means.
//!
//! Evaluation never looks at an ops' concrete type, so strategies can be mixed
//! freely inside one graph:
//!
//! - [`NoOps`] does nothing and is bound to every node by default.
//! - [`FnOps`] wraps closures.
//! - [`OpsProxy`] forwards to an inner ops that can be replaced after the
//!   graph is built.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::RwLock;

use crate::error::{DagError, Result};

/// Per-node computation strategy.
///
/// Both hooks receive the node together with its direct dependencies
/// (evaluated before it) and direct dependants (evaluated after it). All
/// effects are caller-defined; the graph only sequences the calls.
pub trait Ops<N: fmt::Debug>: Send + Sync {
    /// Compute the node. Called once per evaluation pass for every node with a
    /// finite depth.
    fn evaluate(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>)
        -> Result<()>;

    /// Called instead of [`Ops::evaluate`] when the node is on, or downstream
    /// of, a dependency cycle. Fails with [`DagError::Cyclic`] unless
    /// overridden.
    fn cyclic(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>) -> Result<()> {
        let _ = (dependencies, dependants);
        Err(DagError::Cyclic {
            ops: self.name().to_owned(),
            node: format!("{node:?}"),
        })
    }

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Ops that does nothing. Used for literal sources and pure wiring nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOps;

impl<N: fmt::Debug> Ops<N> for NoOps {
    fn evaluate(&self, _node: &N, _dependencies: &IndexSet<N>, _dependants: &IndexSet<N>) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "NoOps"
    }
}

type EvaluateFn<N> = dyn Fn(&N, &IndexSet<N>, &IndexSet<N>) -> Result<()> + Send + Sync;

/// Ops backed by closures.
///
/// Without a cycle handler the default cycle policy applies.
pub struct FnOps<N> {
    name: String,
    evaluate: Box<EvaluateFn<N>>,
    cyclic: Option<Box<EvaluateFn<N>>>,
}

impl<N> FnOps<N> {
    /// Create ops that run `evaluate` for each acyclic node.
    pub fn new<F>(name: impl Into<String>, evaluate: F) -> Self
    where
        F: Fn(&N, &IndexSet<N>, &IndexSet<N>) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            evaluate: Box::new(evaluate),
            cyclic: None,
        }
    }

    /// Replace the default cycle policy.
    pub fn on_cycle<F>(mut self, cyclic: F) -> Self
    where
        F: Fn(&N, &IndexSet<N>, &IndexSet<N>) -> Result<()> + Send + Sync + 'static,
    {
        self.cyclic = Some(Box::new(cyclic));
        self
    }
}

impl<N: fmt::Debug> Ops<N> for FnOps<N> {
    fn evaluate(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>) -> Result<()> {
        (self.evaluate)(node, dependencies, dependants)
    }

    fn cyclic(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>) -> Result<()> {
        match &self.cyclic {
            Some(cyclic) => cyclic(node, dependencies, dependants),
            None => Err(DagError::Cyclic {
                ops: self.name.clone(),
                node: format!("{node:?}"),
            }),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<N> fmt::Debug for FnOps<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnOps")
            .field("name", &self.name)
            .field("handles_cycles", &self.cyclic.is_some())
            .finish()
    }
}

/// Ops whose behaviour is late-bound.
///
/// A proxy forwards both hooks to whatever it wraps *at call time*, so a
/// compiled graph can be evaluated again under different logic without a
/// rebuild. Clones share the same slot.
pub struct OpsProxy<N: fmt::Debug> {
    inner: Arc<RwLock<Arc<dyn Ops<N>>>>,
}

impl<N: fmt::Debug + 'static> OpsProxy<N> {
    /// Create a proxy wrapping [`NoOps`].
    pub fn new() -> Self {
        Self::wrapping(Arc::new(NoOps))
    }

    /// Create a proxy wrapping `ops`.
    pub fn wrapping(ops: Arc<dyn Ops<N>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ops)),
        }
    }

    /// Replace the wrapped ops. Returns the previous one.
    pub fn replace(&self, ops: Arc<dyn Ops<N>>) -> Arc<dyn Ops<N>> {
        std::mem::replace(&mut *self.inner.write(), ops)
    }

    /// The currently wrapped ops.
    pub fn current(&self) -> Arc<dyn Ops<N>> {
        Arc::clone(&self.inner.read())
    }
}

impl<N: fmt::Debug + 'static> Default for OpsProxy<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: fmt::Debug> Clone for OpsProxy<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N: fmt::Debug + 'static> Ops<N> for OpsProxy<N> {
    fn evaluate(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>) -> Result<()> {
        // Release the lock before calling out so the wrapped ops may swap the proxy.
        let ops = self.current();
        ops.evaluate(node, dependencies, dependants)
    }

    fn cyclic(&self, node: &N, dependencies: &IndexSet<N>, dependants: &IndexSet<N>) -> Result<()> {
        let ops = self.current();
        ops.cyclic(node, dependencies, dependants)
    }

    fn name(&self) -> &str {
        "OpsProxy"
    }
}

impl<N: fmt::Debug> fmt::Debug for OpsProxy<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpsProxy")
            .field("inner", &self.inner.read().name())
            .finish()
    }
}
