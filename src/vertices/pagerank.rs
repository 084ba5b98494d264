//! PageRankVertex: damped rank propagation
//!
//! Each vertex starts at its base rank and recomputes
//! `base_rank + damping * sum(signals)` with `damping = 1 - base_rank`.
//! Edges built with [`link`] split the source rank evenly across its
//! out-edges.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut graph: Graph<f64, f64> = Graph::new();
//! graph.add_vertex(PageRankVertex::new("a", 0.15).boxed())?;
//! graph.add_vertex(PageRankVertex::new("b", 0.15).boxed())?;
//! graph.add_edge(pagerank::link("a", "b", 1)?)?;
//! ```

use std::sync::Arc;

use crate::engine::edge::Edge;
use crate::engine::error::{BoxError, EngineError};
use crate::engine::vertex::{BoxedVertex, Vertex, VertexId};

/// A vertex computing a damped PageRank score
#[derive(Debug, Clone)]
pub struct PageRankVertex {
    /// Vertex identifier
    id: VertexId,

    /// Rank a vertex holds with no incoming signals
    base_rank: f64,
}

impl PageRankVertex {
    /// Create a vertex with the given base rank
    pub fn new(id: impl Into<VertexId>, base_rank: f64) -> Self {
        Self {
            id: id.into(),
            base_rank,
        }
    }

    /// Rank with no incoming signals
    pub fn base_rank(&self) -> f64 {
        self.base_rank
    }

    /// Weight applied to the sum of incoming signals
    pub fn damping(&self) -> f64 {
        1.0 - self.base_rank
    }

    /// Wrap in an `Arc` for insertion into a graph
    pub fn boxed(self) -> BoxedVertex<f64, f64> {
        Arc::new(self)
    }
}

impl Vertex<f64, f64> for PageRankVertex {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn initial_state(&self) -> f64 {
        self.base_rank
    }

    fn collect(&self, _old_state: &f64, signals: &[f64]) -> Result<f64, BoxError> {
        let rank_sum: f64 = signals.iter().sum();
        Ok(self.base_rank + self.damping() * rank_sum)
    }
}

/// Edge carrying `state / out_degree` from `source` to `target`
///
/// `out_degree` is the number of links leaving `source`; zero is rejected.
pub fn link(
    source: impl Into<VertexId>,
    target: impl Into<VertexId>,
    out_degree: usize,
) -> Result<Edge<f64, f64>, EngineError> {
    let source = source.into();
    let target = target.into();
    if out_degree == 0 {
        return Err(EngineError::invalid_edge(
            source,
            target,
            "out_degree must be at least 1",
        ));
    }
    Edge::scaled(source, target, 1.0 / out_degree as f64)
}
