//! Edges and the signal capability
//!
//! An edge is an immutable directed link that turns the current state of its
//! source vertex into a signal for its target vertex.

use std::fmt;
use std::sync::Arc;

use super::error::{BoxError, EngineError};
use super::vertex::VertexId;

/// Trait bound for values sent along edges
///
/// `PartialEq` lets an inbox recognise a re-delivery of the value it already
/// holds, which must not reactivate the target.
pub trait Signal: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Signal for T where T: Clone + PartialEq + Send + Sync + 'static {}

type SignalFn<S, M> = dyn Fn(&S) -> Result<M, BoxError> + Send + Sync;

/// A directed edge carrying a signal function
pub struct Edge<S, M> {
    source: VertexId,
    target: VertexId,
    signal: Arc<SignalFn<S, M>>,
}

impl<S: 'static, M: 'static> Edge<S, M> {
    /// Create an edge from an infallible signal closure
    pub fn new<F>(source: impl Into<VertexId>, target: impl Into<VertexId>, signal: F) -> Self
    where
        F: Fn(&S) -> M + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            target: target.into(),
            signal: Arc::new(move |state: &S| Ok(signal(state))),
        }
    }

    /// Create an edge from a signal closure that may fail
    pub fn try_new<F>(source: impl Into<VertexId>, target: impl Into<VertexId>, signal: F) -> Self
    where
        F: Fn(&S) -> Result<M, BoxError> + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            target: target.into(),
            signal: Arc::new(signal),
        }
    }
}

impl Edge<f64, f64> {
    /// Edge that forwards the source state multiplied by `factor`
    ///
    /// Non-finite factors are rejected here. The product saturates at
    /// `±f64::MAX` so the signal stays finite for every finite state.
    pub fn scaled(
        source: impl Into<VertexId>,
        target: impl Into<VertexId>,
        factor: f64,
    ) -> Result<Self, EngineError> {
        let source = source.into();
        let target = target.into();
        if !factor.is_finite() {
            return Err(EngineError::invalid_edge(
                source,
                target,
                format!("scale factor must be finite, got {}", factor),
            ));
        }
        Ok(Self::new(source, target, move |state: &f64| {
            (state * factor).clamp(-f64::MAX, f64::MAX)
        }))
    }
}

impl<S, M> Edge<S, M> {
    /// Source vertex id
    pub fn source(&self) -> &VertexId {
        &self.source
    }

    /// Target vertex id
    pub fn target(&self) -> &VertexId {
        &self.target
    }

    /// Compute the signal this edge sends for the given source state
    pub fn compute_signal(&self, source_state: &S) -> Result<M, BoxError> {
        (self.signal)(source_state)
    }

    pub(crate) fn signal_fn(&self) -> Arc<SignalFn<S, M>> {
        Arc::clone(&self.signal)
    }
}

impl<S, M> Clone for Edge<S, M> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            target: self.target.clone(),
            signal: Arc::clone(&self.signal),
        }
    }
}

impl<S, M> fmt::Debug for Edge<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Edge")
            .field("source", &self.source)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_forwards_state() {
        let edge: Edge<f64, f64> = Edge::new("a", "b", |state| *state);
        assert_eq!(edge.source().as_str(), "a");
        assert_eq!(edge.target().as_str(), "b");
        assert_eq!(edge.compute_signal(&0.75).unwrap(), 0.75);
    }

    #[test]
    fn test_edge_can_change_type() {
        let edge: Edge<u64, String> = Edge::new("a", "b", |state| format!("label-{}", state));
        assert_eq!(edge.compute_signal(&7).unwrap(), "label-7");
    }

    #[test]
    fn test_fallible_edge() {
        let edge: Edge<f64, f64> = Edge::try_new("a", "b", |state: &f64| {
            if *state < 0.0 {
                Err("negative rank".into())
            } else {
                Ok(state.sqrt())
            }
        });
        assert_eq!(edge.compute_signal(&4.0).unwrap(), 2.0);
        assert!(edge.compute_signal(&-1.0).is_err());
    }

    #[test]
    fn test_scaled_edge_saturates() {
        let edge = Edge::scaled("a", "b", 0.5).unwrap();
        assert_eq!(edge.compute_signal(&3.0).unwrap(), 1.5);

        let edge = Edge::scaled("a", "b", 1e300).unwrap();
        assert_eq!(edge.compute_signal(&1e300).unwrap(), f64::MAX);
        assert_eq!(edge.compute_signal(&-1e300).unwrap(), -f64::MAX);
    }

    #[test]
    fn test_scaled_edge_rejects_non_finite_factor() {
        let err = Edge::scaled("a", "b", f64::NAN).unwrap_err();
        assert!(matches!(err, EngineError::InvalidEdge { .. }));
        assert!(Edge::scaled("a", "b", f64::INFINITY).is_err());
    }

    #[test]
    fn test_cloned_edge_shares_function() {
        let edge: Edge<f64, f64> = Edge::new("a", "b", |state| state * 2.0);
        let copy = edge.clone();
        assert_eq!(copy.compute_signal(&1.0).unwrap(), 2.0);
        assert!(format!("{:?}", copy).contains("Edge"));
    }
}
