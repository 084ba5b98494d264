//! Graph storage
//!
//! Vertices live in an arena of insertion-ordered slots. A vertex keeps its
//! slot for as long as it is in the graph; removal leaves a tombstone so the
//! slots of the remaining vertices never move. Slot order is the iteration
//! order and the order in which signals are presented to `collect`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::edge::{Edge, Signal};
use super::error::EngineError;
use super::signal_map::SignalMap;
use super::vertex::{BoxedVertex, VertexId, VertexValue};

/// An edge together with the arena slot of its target
pub(crate) struct OutgoingEdge<S, M> {
    pub(crate) edge: Edge<S, M>,
    pub(crate) target_slot: usize,
}

/// Everything the graph keeps for one vertex
pub(crate) struct VertexSlot<S, M> {
    pub(crate) id: VertexId,
    pub(crate) vertex: BoxedVertex<S, M>,
    pub(crate) state: S,
    pub(crate) outgoing: Vec<OutgoingEdge<S, M>>,
    pub(crate) inbox: Arc<SignalMap<M>>,
    /// State carried by the last signals this vertex sent, `None` before the first
    pub(crate) last_signaled: Option<S>,
    /// Collect on the next round even without inbox changes
    pub(crate) scheduled: bool,
}

/// Directed graph of vertices and signal edges
pub struct Graph<S, M> {
    slots: Vec<Option<VertexSlot<S, M>>>,
    index: HashMap<VertexId, usize>,
    edge_count: usize,
}

impl<S: VertexValue, M: Signal> Graph<S, M> {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            edge_count: 0,
        }
    }

    /// Add a vertex; its state starts at `initial_state()`
    pub fn add_vertex(&mut self, vertex: BoxedVertex<S, M>) -> Result<&mut Self, EngineError> {
        let id = vertex.id().clone();
        if self.index.contains_key(&id) {
            return Err(EngineError::DuplicateId(id));
        }

        let slot = self.slots.len();
        self.slots.push(Some(VertexSlot {
            id: id.clone(),
            state: vertex.initial_state(),
            vertex,
            outgoing: Vec::new(),
            inbox: Arc::new(SignalMap::new()),
            last_signaled: None,
            scheduled: true,
        }));
        self.index.insert(id.clone(), slot);
        tracing::trace!(vertex = %id, slot, "Vertex added");
        Ok(self)
    }

    /// Add an edge; both endpoints must already be in the graph
    ///
    /// On failure the graph is left unmodified. If the source has signalled
    /// before, it is rescheduled so the new edge fires on the next run.
    pub fn add_edge(&mut self, edge: Edge<S, M>) -> Result<&mut Self, EngineError> {
        let source_slot = self.slot_of(edge.source()).ok_or_else(|| {
            EngineError::dangling(edge.source(), edge.target(), edge.source())
        })?;
        let target_slot = self.slot_of(edge.target()).ok_or_else(|| {
            EngineError::dangling(edge.source(), edge.target(), edge.target())
        })?;
        let source = self
            .slot_mut(source_slot)
            .ok_or_else(|| EngineError::UnknownVertex(edge.source().clone()))?;

        if source.last_signaled.is_some() {
            source.last_signaled = None;
            source.scheduled = true;
        }
        source.outgoing.push(OutgoingEdge { edge, target_slot });
        self.edge_count += 1;
        Ok(self)
    }

    /// Remove a vertex and every edge that touches it
    ///
    /// Signals the vertex had sent are withdrawn from its targets' inboxes,
    /// which schedules those targets to collect again. Returns the removed
    /// vertex's last state.
    pub fn remove_vertex(&mut self, id: &VertexId) -> Result<S, EngineError> {
        let slot = self
            .index
            .remove(id)
            .ok_or_else(|| EngineError::UnknownVertex(id.clone()))?;
        let removed = self.slots[slot]
            .take()
            .ok_or_else(|| EngineError::UnknownVertex(id.clone()))?;

        for out in &removed.outgoing {
            if let Some(target) = self.slots[out.target_slot].as_ref() {
                target.inbox.remove_source(slot);
            }
        }
        self.edge_count -= removed.outgoing.len();

        for other in self.slots.iter_mut().flatten() {
            let before = other.outgoing.len();
            other.outgoing.retain(|out| out.target_slot != slot);
            self.edge_count -= before - other.outgoing.len();
        }

        tracing::trace!(vertex = %id, slot, "Vertex removed");
        Ok(removed.state)
    }

    /// Remove every edge from `source` to `target`, returning how many went
    pub fn remove_edge(&mut self, source: &VertexId, target: &VertexId) -> Result<usize, EngineError> {
        let unknown = || EngineError::UnknownEdge {
            from: source.clone(),
            to: target.clone(),
        };
        let source_slot = self.slot_of(source).ok_or_else(unknown)?;
        let target_slot = self.slot_of(target).ok_or_else(unknown)?;

        let source_entry = self.slot_mut(source_slot).ok_or_else(unknown)?;
        let before = source_entry.outgoing.len();
        source_entry.outgoing.retain(|out| out.target_slot != target_slot);
        let removed = before - source_entry.outgoing.len();
        if removed == 0 {
            return Err(unknown());
        }

        self.edge_count -= removed;
        if let Some(target_entry) = self.slot(target_slot) {
            target_entry.inbox.remove_source(source_slot);
        }
        Ok(removed)
    }

    /// Check if a vertex with this id exists
    pub fn contains(&self, id: &VertexId) -> bool {
        self.index.contains_key(id)
    }

    /// Current state of a vertex
    pub fn state(&self, id: &VertexId) -> Option<&S> {
        self.entry(id).map(|entry| &entry.state)
    }

    /// All `(id, state)` pairs in insertion order
    pub fn states(&self) -> impl Iterator<Item = (&VertexId, &S)> {
        self.slots.iter().flatten().map(|entry| (&entry.id, &entry.state))
    }

    /// Vertex ids in insertion order
    pub fn vertex_ids(&self) -> impl Iterator<Item = &VertexId> {
        self.slots.iter().flatten().map(|entry| &entry.id)
    }

    /// Outgoing edges of a vertex, in the order they were added
    pub fn edges_from(&self, id: &VertexId) -> Option<impl Iterator<Item = &Edge<S, M>>> {
        self.entry(id)
            .map(|entry| entry.outgoing.iter().map(|out| &out.edge))
    }

    /// Number of outgoing edges of a vertex
    pub fn out_degree(&self, id: &VertexId) -> Option<usize> {
        self.entry(id).map(|entry| entry.outgoing.len())
    }

    /// Inbox of a vertex
    pub fn inbox(&self, id: &VertexId) -> Option<&SignalMap<M>> {
        self.entry(id).map(|entry| entry.inbox.as_ref())
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.index.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Check if the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn slot_of(&self, id: &VertexId) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn entry(&self, id: &VertexId) -> Option<&VertexSlot<S, M>> {
        self.slot_of(id).and_then(|slot| self.slot(slot))
    }

    /// Live slots with their arena index, in insertion order
    pub(crate) fn live_slots(&self) -> impl Iterator<Item = (usize, &VertexSlot<S, M>)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| entry.as_ref().map(|entry| (slot, entry)))
    }

    pub(crate) fn slot(&self, slot: usize) -> Option<&VertexSlot<S, M>> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub(crate) fn slot_mut(&mut self, slot: usize) -> Option<&mut VertexSlot<S, M>> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }
}

impl<S: VertexValue, M: Signal> Default for Graph<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, M> fmt::Debug for Graph<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("vertices", &self.index.len())
            .field("edges", &self.edge_count)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::vertex::FnVertex;

    fn sum_vertex(id: &str, initial: f64) -> BoxedVertex<f64, f64> {
        FnVertex::new(id, initial, |old: &f64, signals: &[f64]| old + signals.iter().sum::<f64>())
            .boxed()
    }

    fn forward(source: &str, target: &str) -> Edge<f64, f64> {
        Edge::new(source, target, |state: &f64| *state)
    }

    fn two_vertex_graph() -> Graph<f64, f64> {
        let mut graph = Graph::new();
        graph.add_vertex(sum_vertex("a", 1.0)).unwrap();
        graph.add_vertex(sum_vertex("b", 2.0)).unwrap();
        graph
    }

    #[test]
    fn test_add_vertex_sets_initial_state() {
        let graph = two_vertex_graph();
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.state(&VertexId::from("a")), Some(&1.0));
        assert_eq!(graph.state(&VertexId::from("b")), Some(&2.0));
        assert!(graph.state(&VertexId::from("c")).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut graph = two_vertex_graph();
        let err = graph.add_vertex(sum_vertex("a", 5.0)).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateId(id) if id.as_str() == "a"));
        // The first vertex is untouched
        assert_eq!(graph.state(&VertexId::from("a")), Some(&1.0));
        assert_eq!(graph.vertex_count(), 2);
    }

    #[test]
    fn test_add_edge_with_missing_target_leaves_graph_unmodified() {
        let mut graph = two_vertex_graph();
        graph.add_edge(forward("a", "b")).unwrap();

        let err = graph.add_edge(forward("a", "ghost")).unwrap_err();
        match err {
            EngineError::DanglingReference { from, to, missing } => {
                assert_eq!(from.as_str(), "a");
                assert_eq!(to.as_str(), "ghost");
                assert_eq!(missing.as_str(), "ghost");
            }
            other => panic!("Wrong error type: {:?}", other),
        }
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.out_degree(&VertexId::from("a")), Some(1));
    }

    #[test]
    fn test_add_edge_with_missing_source() {
        let mut graph = two_vertex_graph();
        let err = graph.add_edge(forward("ghost", "a")).unwrap_err();
        assert!(matches!(err, EngineError::DanglingReference { missing, .. } if missing.as_str() == "ghost"));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_iteration_is_insertion_ordered() {
        let mut graph: Graph<f64, f64> = Graph::new();
        for id in ["z", "m", "a", "q"] {
            graph.add_vertex(sum_vertex(id, 0.0)).unwrap();
        }
        let ids: Vec<_> = graph.vertex_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["z", "m", "a", "q"]);

        graph.remove_vertex(&VertexId::from("m")).unwrap();
        let ids: Vec<_> = graph.states().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "q"]);
    }

    #[test]
    fn test_remove_vertex_cascades_edges() {
        let mut graph = two_vertex_graph();
        graph.add_vertex(sum_vertex("c", 3.0)).unwrap();
        graph.add_edge(forward("a", "b")).unwrap();
        graph.add_edge(forward("b", "a")).unwrap();
        graph.add_edge(forward("c", "b")).unwrap();
        graph.add_edge(forward("b", "c")).unwrap();

        let state = graph.remove_vertex(&VertexId::from("b")).unwrap();
        assert_eq!(state, 2.0);
        assert!(!graph.contains(&VertexId::from("b")));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.out_degree(&VertexId::from("a")), Some(0));
        assert_eq!(graph.out_degree(&VertexId::from("c")), Some(0));

        let err = graph.remove_vertex(&VertexId::from("b")).unwrap_err();
        assert!(matches!(err, EngineError::UnknownVertex(_)));
    }

    #[test]
    fn test_remove_vertex_withdraws_signals() {
        let mut graph = two_vertex_graph();
        graph.add_edge(forward("a", "b")).unwrap();
        let inbox = Arc::clone(&graph.slot(1).unwrap().inbox);
        inbox.deposit(0, 1.0);
        inbox.take_changes();

        graph.remove_vertex(&VertexId::from("a")).unwrap();
        assert!(inbox.is_empty());
        assert!(inbox.has_changes());
    }

    #[test]
    fn test_readded_vertex_gets_fresh_slot() {
        let mut graph = two_vertex_graph();
        graph.remove_vertex(&VertexId::from("a")).unwrap();
        graph.add_vertex(sum_vertex("a", 7.0)).unwrap();

        let ids: Vec<_> = graph.vertex_ids().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(graph.state(&VertexId::from("a")), Some(&7.0));
    }

    #[test]
    fn test_remove_edge() {
        let mut graph = two_vertex_graph();
        graph.add_edge(forward("a", "b")).unwrap();
        graph.add_edge(forward("a", "b")).unwrap();
        graph.add_edge(forward("b", "a")).unwrap();

        let inbox = Arc::clone(&graph.slot(1).unwrap().inbox);
        inbox.deposit(0, 1.0);
        inbox.take_changes();

        let removed = graph
            .remove_edge(&VertexId::from("a"), &VertexId::from("b"))
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(graph.edge_count(), 1);
        // The signal from "a" is withdrawn and "b" must collect again
        assert!(inbox.is_empty());
        assert!(inbox.has_changes());

        let err = graph
            .remove_edge(&VertexId::from("a"), &VertexId::from("b"))
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownEdge { .. }));
    }

    #[test]
    fn test_edges_from() {
        let mut graph = two_vertex_graph();
        graph.add_edge(forward("a", "b")).unwrap();
        let targets: Vec<_> = graph
            .edges_from(&VertexId::from("a"))
            .unwrap()
            .map(|edge| edge.target().as_str())
            .collect();
        assert_eq!(targets, vec!["b"]);
        assert!(graph.edges_from(&VertexId::from("nope")).is_none());
    }

    #[test]
    fn test_new_edge_reschedules_signalled_source() {
        let mut graph = two_vertex_graph();
        {
            let source = graph.slot_mut(0).unwrap();
            source.last_signaled = Some(1.0);
            source.scheduled = false;
        }
        graph.add_edge(forward("a", "b")).unwrap();
        let source = graph.slot(0).unwrap();
        assert!(source.scheduled);
        assert!(source.last_signaled.is_none());
    }
}
