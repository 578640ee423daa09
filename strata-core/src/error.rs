//! Error Types
//!
//! The engine defines a single structured failure, [`DagError`], raised by the
//! default cycle policy. Failures raised by caller-supplied ops travel through
//! the same type without being rewritten.

use thiserror::Error;

/// Boxed error raised by a caller-defined [`Ops`](crate::graph::Ops) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while evaluating a dependency graph.
#[derive(Error, Debug)]
pub enum DagError {
    /// A node's depth could not be resolved because it sits on, or downstream
    /// of, a dependency cycle, and its ops did not override `cyclic`.
    ///
    /// The ops and node are recorded as text so the error stays non-generic
    /// and `'static`. Callers that need the node itself should override
    /// [`Ops::cyclic`](crate::graph::Ops::cyclic) and raise their own error.
    #[error("Cyclic dependency at {node} (ops: {ops})")]
    Cyclic {
        /// Name of the ops implementation bound to the node.
        ops: String,
        /// Debug rendering of the offending node.
        node: String,
    },

    /// A failure raised by caller-defined ops. Passed through untouched.
    #[error(transparent)]
    Ops(BoxError),
}

impl DagError {
    /// Wrap a caller-defined failure.
    pub fn ops<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Ops(err.into())
    }

    /// Name of the ops responsible for a cycle error.
    pub fn ops_name(&self) -> Option<&str> {
        match self {
            Self::Cyclic { ops, .. } => Some(ops),
            Self::Ops(_) => None,
        }
    }

    /// The node a cycle error was raised for.
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::Cyclic { node, .. } => Some(node),
            Self::Ops(_) => None,
        }
    }

    /// Whether this is the default cycle error.
    pub fn is_cyclic(&self) -> bool {
        matches!(self, Self::Cyclic { .. })
    }
}

/// Errors produced by the hierarchy recalculation layer.
#[derive(Error, Debug)]
pub enum RecalcError {
    #[error(transparent)]
    Dag(#[from] DagError),

    #[error("Config parse error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, DagError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[derive(Debug, Error)]
    #[error("store unavailable")]
    struct StoreDown;

    #[test]
    fn cyclic_error_carries_diagnostics() {
        let err = DagError::Cyclic {
            ops: "SumOps".into(),
            node: "\"a\"".into(),
        };

        assert!(err.is_cyclic());
        assert_eq!(err.ops_name(), Some("SumOps"));
        assert_eq!(err.node(), Some("\"a\""));
        assert_eq!(err.to_string(), "Cyclic dependency at \"a\" (ops: SumOps)");
    }

    #[test]
    fn caller_error_passes_through() {
        let err = DagError::ops(StoreDown);

        assert!(!err.is_cyclic());
        assert!(err.node().is_none());
        assert_eq!(err.to_string(), "store unavailable");

        match err {
            DagError::Ops(inner) => assert!(inner.downcast_ref::<StoreDown>().is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn recalc_error_wraps_dag_error() {
        let err: RecalcError = DagError::ops("boom").into();
        assert_eq!(err.to_string(), "boom");
        assert!(err.source().is_none());
    }
}
