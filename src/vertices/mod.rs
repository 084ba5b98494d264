//! Ready-made vertex programs
//!
//! # Available Vertices
//!
//! - [`pagerank::PageRankVertex`]: damped rank propagation over `f64`
//! - [`components::ComponentVertex`]: minimum-label connected components over `u64`

pub mod components;
pub mod pagerank;

pub use components::ComponentVertex;
pub use pagerank::PageRankVertex;
