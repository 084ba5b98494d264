//! Vertex abstractions for the signal/collect engine
//!
//! A vertex owns a state value and a collect function. Each round the
//! scheduler hands the vertex its previous state together with the most
//! recent signal from every in-neighbour; the returned value becomes the
//! vertex's new state. All communication flows through that returned state
//! and the outgoing edges.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::BoxError;

/// Unique identifier for a vertex in the graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub String);

impl VertexId {
    /// Create a new VertexId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VertexId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for VertexId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&VertexId> for VertexId {
    fn from(id: &VertexId) -> Self {
        id.clone()
    }
}

impl From<u64> for VertexId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl std::fmt::Display for VertexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trait bound for vertex state values
///
/// `delta` measures how far a state moved between two rounds. The
/// convergence tracker aggregates these magnitudes, and the scheduler uses
/// them to decide whether a vertex needs to signal again.
pub trait VertexValue: Clone + Send + Sync + 'static {
    /// Non-negative magnitude of the change from `previous` to `self`
    fn delta(&self, previous: &Self) -> f64;
}

impl VertexValue for f64 {
    fn delta(&self, previous: &Self) -> f64 {
        (self - previous).abs()
    }
}

impl VertexValue for f32 {
    fn delta(&self, previous: &Self) -> f64 {
        (f64::from(*self) - f64::from(*previous)).abs()
    }
}

macro_rules! integer_vertex_value {
    ($($ty:ty),*) => {
        $(
            impl VertexValue for $ty {
                fn delta(&self, previous: &Self) -> f64 {
                    self.abs_diff(*previous) as f64
                }
            }
        )*
    };
}

integer_vertex_value!(i32, i64, u32, u64, usize);

/// The vertex capability: an initial state and a collect function
///
/// `collect` must be deterministic and free of side effects. It is called
/// with an empty slice when no signal has been delivered yet and must still
/// produce a valid state in that case.
///
/// # Example
///
/// ```ignore
/// struct MaxVertex {
///     id: VertexId,
/// }
///
/// impl Vertex<u64, u64> for MaxVertex {
///     fn id(&self) -> &VertexId {
///         &self.id
///     }
///
///     fn initial_state(&self) -> u64 {
///         0
///     }
///
///     fn collect(&self, old_state: &u64, signals: &[u64]) -> Result<u64, BoxError> {
///         Ok(signals.iter().copied().fold(*old_state, u64::max))
///     }
/// }
/// ```
pub trait Vertex<S, M>: Send + Sync
where
    S: VertexValue,
{
    /// Get the vertex's unique identifier
    fn id(&self) -> &VertexId;

    /// State the vertex holds before its first collect
    fn initial_state(&self) -> S;

    /// Fold the most recent signals into a new state
    fn collect(&self, old_state: &S, signals: &[M]) -> Result<S, BoxError>;
}

/// Boxed vertex for dynamic dispatch
pub type BoxedVertex<S, M> = Arc<dyn Vertex<S, M>>;

type CollectFn<S, M> = dyn Fn(&S, &[M]) -> Result<S, BoxError> + Send + Sync;

/// A vertex whose collect function is supplied as a closure
pub struct FnVertex<S, M> {
    id: VertexId,
    initial: S,
    collect: Arc<CollectFn<S, M>>,
}

impl<S: VertexValue, M: 'static> FnVertex<S, M> {
    /// Create a vertex from an infallible collect closure
    pub fn new<F>(id: impl Into<VertexId>, initial: S, collect: F) -> Self
    where
        F: Fn(&S, &[M]) -> S + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            initial,
            collect: Arc::new(move |old: &S, signals: &[M]| Ok(collect(old, signals))),
        }
    }

    /// Create a vertex from a collect closure that may fail
    pub fn try_new<F>(id: impl Into<VertexId>, initial: S, collect: F) -> Self
    where
        F: Fn(&S, &[M]) -> Result<S, BoxError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            initial,
            collect: Arc::new(collect),
        }
    }

    /// Wrap in an `Arc` for insertion into a graph
    pub fn boxed(self) -> BoxedVertex<S, M> {
        Arc::new(self)
    }
}

impl<S: VertexValue, M> Vertex<S, M> for FnVertex<S, M> {
    fn id(&self) -> &VertexId {
        &self.id
    }

    fn initial_state(&self) -> S {
        self.initial.clone()
    }

    fn collect(&self, old_state: &S, signals: &[M]) -> Result<S, BoxError> {
        (self.collect)(old_state, signals)
    }
}
