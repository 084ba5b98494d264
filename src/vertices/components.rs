//! Connected components by minimum-label propagation

use std::sync::Arc;

use crate::engine::edge::Edge;
use crate::engine::error::BoxError;
use crate::engine::vertex::{BoxedVertex, Vertex, VertexId};

/// A vertex adopting the smallest label it has seen
#[derive(Debug, Clone)]
pub struct ComponentVertex {
    id: VertexId,
    label: u64,
}

impl ComponentVertex {
    /// Create a vertex starting with its own label
    pub fn new(id: impl Into<VertexId>, label: u64) -> Self {
        Self {
            id: id.into(),
            label,
        }
    }

    /// Wrap in an `Arc` for insertion into a graph
    pub fn boxed(self) -> BoxedVertex<u64, u64> {
        Arc::new(self)
    }
}

impl Vertex<u64, u64> for ComponentVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn initial_state(&self) -> u64 {
        self.label
    }

    fn collect(&self, old_state: &u64, signals: &[u64]) -> Result<u64, BoxError> {
        Ok(signals.iter().copied().fold(*old_state, u64::min))
    }
}

/// Edges in both directions between `a` and `b`, each forwarding the label
pub fn connect(a: impl Into<VertexId>, b: impl Into<VertexId>) -> [Edge<u64, u64>; 2] {
    let a = a.into();
    let b = b.into();
    [
        Edge::new(a.clone(), b.clone(), |label: &u64| *label),
        Edge::new(b, a, |label: &u64| *label),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_keeps_minimum() {
        let vertex = ComponentVertex::new("v", 7);
        assert_eq!(vertex.collect(&7, &[]).unwrap(), 7);
        assert_eq!(vertex.collect(&7, &[9, 3, 5]).unwrap(), 3);
        assert_eq!(vertex.collect(&2, &[9, 3]).unwrap(), 2);
    }

    #[test]
    fn test_connect_links_both_ways() {
        let [forward, backward] = connect("a", "b");
        assert_eq!(forward.source().as_str(), "a");
        assert_eq!(forward.target().as_str(), "b");
        assert_eq!(backward.source().as_str(), "b");
        assert_eq!(backward.target().as_str(), "a");
        assert_eq!(forward.compute_signal(&4).unwrap(), 4);
    }
}
