//! signal-collect: vertex-centric iterative graph computation
//!
//! Vertices recompute their state from the latest signals of their
//! in-neighbours; edges derive those signals from the source state. A
//! round-based scheduler runs both steps in parallel until the graph stops
//! changing.
//!
//! - [`engine`]: graph storage, inboxes, scheduler and convergence tracking
//! - [`vertices`]: ready-made vertex programs (PageRank, connected components)
//!
//! # Example
//!
//! ```rust,ignore
//! use signal_collect::{EngineConfig, Graph, Scheduler};
//! use signal_collect::vertices::{pagerank, PageRankVertex};
//!
//! let mut graph: Graph<f64, f64> = Graph::new();
//! graph.add_vertex(PageRankVertex::new("a", 0.5).boxed())?;
//! graph.add_vertex(PageRankVertex::new("b", 0.5).boxed())?;
//! graph.add_edge(pagerank::link("a", "b", 1)?)?;
//! graph.add_edge(pagerank::link("b", "a", 1)?)?;
//!
//! let report = Scheduler::new(EngineConfig::default()).run(&mut graph).await?;
//! assert!(report.is_converged());
//! ```

pub mod engine;
pub mod vertices;

// Re-exports for convenience
pub use engine::{
    BoxError, BoxedVertex, ConvergenceTracker, DeltaAggregation, Edge, EngineConfig, EngineError,
    ExecutionReport, ExecutionStats, FnVertex, FunctionOrigin, Graph, RoundOutcome, Scheduler,
    SchedulerHandle, SchedulerPhase, Signal, SignalMap, TerminationReason, Vertex, VertexId,
    VertexValue,
};
pub use vertices::{ComponentVertex, PageRankVertex};
