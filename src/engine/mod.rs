//! Signal/Collect engine for iterative graph computations
//!
//! Vertices hold a state that is recomputed from the signals their
//! in-neighbours sent; edges turn a source state into a signal for the
//! target. The scheduler alternates the two until nothing changes.
//!
//! - **Vertex**: owns a state and a `collect` function
//! - **Edge**: carries a `signal` function from source to target
//! - **SignalMap**: per-vertex inbox, latest signal per sender
//! - **Round**: one synchronized collect/signal pass over the active set
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Scheduler                            │
//! │  ┌─────────┐  ┌─────────┐  ┌─────────┐                      │
//! │  │  Round  │→ │  Round  │→ │  Round  │→ ... until converged │
//! │  │    0    │  │    1    │  │    2    │                      │
//! │  └─────────┘  └─────────┘  └─────────┘                      │
//! │       │            │            │                            │
//! │       ▼            ▼            ▼                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ Per-Round: Collect → Signal → Commit → Deliver       │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Activation
//!
//! A vertex collects in a round if it was just added, if a new edge made it
//! signal again, or if its inbox changed since it last collected. It signals
//! the first time it collects and afterwards only when its state moved more
//! than `signal_threshold` away from what it last sent.

pub mod config;
pub mod convergence;
pub mod edge;
pub mod error;
pub mod graph;
pub mod scheduler;
pub mod signal_map;
pub mod vertex;

// Re-exports
pub use config::{DeltaAggregation, EngineConfig};
pub use convergence::{ConvergenceTracker, RoundOutcome, TerminationReason};
pub use edge::{Edge, Signal};
pub use error::{BoxError, EngineError, FunctionOrigin};
pub use graph::Graph;
pub use scheduler::{ExecutionReport, ExecutionStats, Scheduler, SchedulerHandle, SchedulerPhase};
pub use signal_map::SignalMap;
pub use vertex::{BoxedVertex, FnVertex, Vertex, VertexId, VertexValue};
