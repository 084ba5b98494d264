//! Error types for the signal/collect engine
//!
//! Structural errors are reported at graph-mutation time and leave the graph
//! untouched. User-function errors abort the round in flight; the graph keeps
//! the states of the last completed round.

use std::fmt;

use super::vertex::VertexId;
use thiserror::Error;

/// Error type returned by user-supplied collect and signal functions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Where a failing user function lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionOrigin {
    /// The collect function of a vertex
    Vertex(VertexId),
    /// The signal function of an edge
    Edge { from: VertexId, to: VertexId },
}

impl fmt::Display for FunctionOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionOrigin::Vertex(id) => write!(f, "vertex {}", id),
            FunctionOrigin::Edge { from, to } => write!(f, "edge {} -> {}", from, to),
        }
    }
}

/// Errors that can occur while building or running a graph computation
#[derive(Debug, Error)]
pub enum EngineError {
    /// A vertex with this id is already part of the graph
    #[error("Duplicate vertex id: {0}")]
    DuplicateId(VertexId),

    /// An edge names an endpoint that is not in the graph
    #[error("Dangling reference in edge {from} -> {to}: {missing} does not exist")]
    DanglingReference {
        from: VertexId,
        to: VertexId,
        missing: VertexId,
    },

    /// Lookup of a vertex that is not in the graph
    #[error("Unknown vertex: {0}")]
    UnknownVertex(VertexId),

    /// No edge exists between the two vertices
    #[error("Unknown edge: {from} -> {to}")]
    UnknownEdge { from: VertexId, to: VertexId },

    /// Edge rejected at construction time
    #[error("Invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: VertexId,
        to: VertexId,
        reason: String,
    },

    /// A collect or signal function failed
    #[error("User function error in {origin}: {message}")]
    UserFunction {
        origin: FunctionOrigin,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    /// A partition worker panicked or was cancelled by the runtime
    #[error("Worker task failed: {0}")]
    TaskJoin(String),
}

impl EngineError {
    /// Create a dangling reference error
    pub fn dangling(
        from: impl Into<VertexId>,
        to: impl Into<VertexId>,
        missing: impl Into<VertexId>,
    ) -> Self {
        Self::DanglingReference {
            from: from.into(),
            to: to.into(),
            missing: missing.into(),
        }
    }

    /// Create an invalid edge error
    pub fn invalid_edge(
        from: impl Into<VertexId>,
        to: impl Into<VertexId>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEdge {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a failure raised by a vertex's collect function
    pub fn collect_failed(vertex_id: impl Into<VertexId>, source: BoxError) -> Self {
        Self::UserFunction {
            origin: FunctionOrigin::Vertex(vertex_id.into()),
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Wrap a failure raised by an edge's signal function
    pub fn signal_failed(
        from: impl Into<VertexId>,
        to: impl Into<VertexId>,
        source: BoxError,
    ) -> Self {
        Self::UserFunction {
            origin: FunctionOrigin::Edge {
                from: from.into(),
                to: to.into(),
            },
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if the error was raised by a graph mutation
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            EngineError::DuplicateId(_)
                | EngineError::DanglingReference { .. }
                | EngineError::UnknownVertex(_)
                | EngineError::UnknownEdge { .. }
                | EngineError::InvalidEdge { .. }
        )
    }

    /// Check if the error came out of a collect or signal function
    pub fn is_user_function(&self) -> bool {
        matches!(self, EngineError::UserFunction { .. })
    }

    /// Origin of a user-function failure, if this is one
    pub fn origin(&self) -> Option<&FunctionOrigin> {
        match self {
            EngineError::UserFunction { origin, .. } => Some(origin),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    static_assertions::assert_impl_all!(super::EngineError: Send, Sync);
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::DuplicateId(VertexId::from("a"));
        assert_eq!(format!("{}", err), "Duplicate vertex id: a");

        let err = EngineError::dangling("a", "b", "b");
        assert_eq!(
            format!("{}", err),
            "Dangling reference in edge a -> b: b does not exist"
        );
    }

    #[test]
    fn test_collect_failed_keeps_identity() {
        let err = EngineError::collect_failed("node1", "rank overflow".into());
        match &err {
            EngineError::UserFunction {
                origin,
                message,
                source,
            } => {
                assert_eq!(origin, &FunctionOrigin::Vertex(VertexId::from("node1")));
                assert_eq!(message, "rank overflow");
                assert!(source.is_some());
            }
            _ => panic!("Wrong error type"),
        }
        assert!(format!("{}", err).contains("vertex node1"));
    }

    #[test]
    fn test_signal_failed_keeps_identity() {
        let err = EngineError::signal_failed("a", "b", "bad weight".into());
        assert_eq!(
            err.origin(),
            Some(&FunctionOrigin::Edge {
                from: VertexId::from("a"),
                to: VertexId::from("b"),
            })
        );
        assert!(format!("{}", err).contains("edge a -> b"));
    }

    #[test]
    fn test_classification() {
        assert!(EngineError::DuplicateId("x".into()).is_structural());
        assert!(EngineError::dangling("x", "y", "y").is_structural());
        assert!(EngineError::invalid_edge("x", "y", "nan").is_structural());
        assert!(!EngineError::config_error("bad").is_structural());

        assert!(EngineError::collect_failed("x", "boom".into()).is_user_function());
        assert!(!EngineError::TaskJoin("panic".into()).is_user_function());
        assert!(EngineError::config_error("bad").origin().is_none());
    }
}
