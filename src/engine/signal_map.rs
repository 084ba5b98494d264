//! Per-vertex signal inbox
//!
//! Each target vertex owns one `SignalMap`. It keeps exactly one entry per
//! sending vertex, always the value delivered last. Entries are keyed by the
//! sender's arena slot in the graph, so `signals()` yields them in the
//! senders' insertion order regardless of which worker delivered first.
//!
//! Writers from different partitions may deliver to the same target at the
//! same time; the entry map sits behind a per-target lock and a separate
//! flag records whether anything changed since the scheduler last looked.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use super::edge::Signal;

/// Inbox mapping sender slot to the most recent signal from that sender
pub struct SignalMap<M> {
    entries: Mutex<BTreeMap<usize, M>>,
    changed: AtomicBool,
}

impl<M: Signal> SignalMap<M> {
    /// Create an empty inbox
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            changed: AtomicBool::new(false),
        }
    }

    /// Store `signal` as the latest value from `source`
    ///
    /// Overwrites any earlier value from the same sender. Returns `true` if
    /// the inbox changed, `false` if the sender re-delivered the value it
    /// had already deposited.
    pub fn deposit(&self, source: usize, signal: M) -> bool {
        let mut entries = self.entries.lock();
        if entries.get(&source) == Some(&signal) {
            return false;
        }
        entries.insert(source, signal);
        self.changed.store(true, Ordering::Release);
        true
    }

    /// Drop the entry from `source`, returning it if there was one
    pub fn remove_source(&self, source: usize) -> Option<M> {
        let removed = self.entries.lock().remove(&source);
        if removed.is_some() {
            self.changed.store(true, Ordering::Release);
        }
        removed
    }

    /// Latest signal from `source`
    pub fn get(&self, source: usize) -> Option<M> {
        self.entries.lock().get(&source).cloned()
    }

    /// Snapshot of all signals, ordered by sender slot
    pub fn signals(&self) -> Vec<M> {
        self.entries.lock().values().cloned().collect()
    }

    /// Number of senders with an entry
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Check if no signal has been delivered
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Check if the inbox changed since the last `take_changes`
    pub fn has_changes(&self) -> bool {
        self.changed.load(Ordering::Acquire)
    }

    /// Read and reset the change flag
    pub fn take_changes(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

impl<M: Signal> Default for SignalMap<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Signal + fmt::Debug> fmt::Debug for SignalMap<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalMap")
            .field("entries", &*self.entries.lock())
            .field("changed", &self.has_changes())
            .finish()
    }
}
