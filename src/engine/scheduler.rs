//! Round scheduler - core execution loop of the engine
//!
//! Each round follows the sequence: Collect → Signal → Commit → Deliver.
//!
//! - **Collect**: every active vertex folds its inbox into a new state. Reads
//!   only committed state; results go to a separate next-state buffer.
//! - **Signal**: vertices whose state moved far enough compute one signal per
//!   outgoing edge from their next state.
//! - **Commit**: the next-state buffer replaces the committed states.
//! - **Deliver**: signals overwrite their sender's entry in the target inboxes.
//!
//! Collect and Signal only produce values, so a failing user function aborts
//! the round before Commit and the graph keeps the last complete round.
//! Every phase runs on tokio's blocking pool, one task per partition.

use serde::Serialize;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::config::EngineConfig;
use super::convergence::{ConvergenceTracker, RoundOutcome, TerminationReason};
use super::edge::Signal;
use super::error::{BoxError, EngineError};
use super::graph::Graph;
use super::signal_map::SignalMap;
use super::vertex::{BoxedVertex, VertexId, VertexValue};

/// Counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionStats {
    /// Collect calls made
    pub collect_operations: usize,
    /// Signals computed
    pub signal_operations: usize,
    /// Deliveries that changed an inbox
    pub signals_delivered: usize,
}

/// Result of a scheduler run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport<S> {
    /// Why the run stopped
    pub reason: TerminationReason,
    /// Number of rounds executed
    pub rounds: usize,
    /// Aggregate delta of the last round
    pub final_delta: f64,
    /// Operation counters
    pub stats: ExecutionStats,
    /// Final state of every vertex
    pub states: HashMap<VertexId, S>,
    /// Wall-clock time of the run
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
}

impl<S> ExecutionReport<S> {
    /// Final state of one vertex
    pub fn state(&self, id: &VertexId) -> Option<&S> {
        self.states.get(id)
    }

    /// Check if the run converged
    pub fn is_converged(&self) -> bool {
        self.reason.is_converged()
    }
}

/// Externally visible scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// No run in progress
    Idle,
    /// A run is executing rounds
    Running,
}

#[derive(Debug, Default)]
struct HandleState {
    stop: AtomicBool,
    running: AtomicBool,
}

/// Cloneable handle for observing and stopping a scheduler
///
/// A stop request is checked between rounds. The round in flight always
/// finishes first, and the request is consumed by the run that honours it.
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    inner: Arc<HandleState>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop before its next round
    pub fn request_stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
    }

    /// Check if a stop request is pending
    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop.load(Ordering::Acquire)
    }

    /// Current scheduler phase
    pub fn phase(&self) -> SchedulerPhase {
        if self.inner.running.load(Ordering::Acquire) {
            SchedulerPhase::Running
        } else {
            SchedulerPhase::Idle
        }
    }

    fn take_stop(&self) -> bool {
        self.inner.stop.swap(false, Ordering::AcqRel)
    }

    fn enter(&self) -> RunningGuard<'_> {
        self.inner.running.store(true, Ordering::Release);
        RunningGuard(self)
    }
}

/// Returns the handle to `Idle` however the run ends
struct RunningGuard<'a>(&'a SchedulerHandle);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.inner.running.store(false, Ordering::Release);
    }
}

type SignalFn<S, M> = dyn Fn(&S) -> Result<M, BoxError> + Send + Sync;

struct CollectJob<S, M> {
    slot: usize,
    vertex: BoxedVertex<S, M>,
    old_state: S,
    signals: Vec<M>,
}

struct OutgoingSignal<S, M> {
    signal: Arc<SignalFn<S, M>>,
    target_id: VertexId,
    inbox: Arc<SignalMap<M>>,
}

struct SignalJob<S, M> {
    slot: usize,
    source_id: VertexId,
    state: S,
    edges: Vec<OutgoingSignal<S, M>>,
}

struct Delivery<M> {
    inbox: Arc<SignalMap<M>>,
    signal: M,
}

/// All deliveries of one sender, in edge order
struct SenderDeliveries<M> {
    source_slot: usize,
    deliveries: Vec<Delivery<M>>,
}

/// Drives rounds of collect and signal until the graph converges or a
/// budget runs out
///
/// # Example
///
/// ```ignore
/// let scheduler = Scheduler::new(EngineConfig::default().with_parallelism(4));
/// let report = scheduler.run(&mut graph).await?;
/// if !report.is_converged() {
///     tracing::warn!(reason = ?report.reason, "Ranks did not converge");
/// }
/// ```
pub struct Scheduler {
    config: EngineConfig,
    handle: SchedulerHandle,
}

impl Scheduler {
    /// Create a scheduler with the given configuration
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            handle: SchedulerHandle::default(),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Handle for stopping the scheduler from another task
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Run rounds on `graph` until a termination condition holds
    ///
    /// Always executes at least one round unless a stop was requested
    /// beforehand. On a user-function error the graph keeps the states of the
    /// last completed round and the vertices of the failed round stay
    /// scheduled.
    pub async fn run<S, M>(&self, graph: &mut Graph<S, M>) -> Result<ExecutionReport<S>, EngineError>
    where
        S: VertexValue,
        M: Signal,
    {
        self.config.validate()?;
        let _running = self.handle.enter();
        let started = Instant::now();
        let mut tracker = ConvergenceTracker::new(&self.config);
        let mut stats = ExecutionStats::default();

        tracing::info!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            parallelism = self.config.parallelism,
            max_rounds = self.config.max_rounds,
            "Run started"
        );

        let reason = loop {
            if self.handle.take_stop() {
                break TerminationReason::Cancelled;
            }

            let round = tracker.rounds();
            let active = active_set(graph);
            tracker.begin_round();

            if let Err(e) = self.execute_round(graph, &active, &mut tracker, &mut stats).await {
                tracing::error!(round, error = %e, "Round aborted");
                return Err(e);
            }

            let remaining = active_set(graph).len();
            tracing::debug!(
                round,
                collected = active.len(),
                next_active = remaining,
                delta = tracker.aggregate(),
                "Round complete"
            );

            if let RoundOutcome::Terminate(reason) = tracker.finish_round(remaining) {
                break reason;
            }
        };

        let report = ExecutionReport {
            reason,
            rounds: tracker.rounds(),
            final_delta: tracker.last_aggregate(),
            stats,
            states: graph
                .states()
                .map(|(id, state)| (id.clone(), state.clone()))
                .collect(),
            duration: started.elapsed(),
        };

        match reason {
            TerminationReason::Converged | TerminationReason::Cancelled => tracing::info!(
                reason = ?reason,
                rounds = report.rounds,
                delta = report.final_delta,
                "Run finished"
            ),
            TerminationReason::BudgetExhausted | TerminationReason::TimeLimitReached => {
                tracing::warn!(
                    reason = ?reason,
                    rounds = report.rounds,
                    delta = report.final_delta,
                    "Run stopped before convergence"
                )
            }
        }

        Ok(report)
    }

    /// Execute one round over the given active slots
    async fn execute_round<S, M>(
        &self,
        graph: &mut Graph<S, M>,
        active: &[usize],
        tracker: &mut ConvergenceTracker,
        stats: &mut ExecutionStats,
    ) -> Result<(), EngineError>
    where
        S: VertexValue,
        M: Signal,
    {
        let parallelism = self.config.parallelism;

        // 1. Collect - read committed state, write the next-state buffer
        let jobs: Vec<CollectJob<S, M>> = active
            .iter()
            .filter_map(|&slot| {
                graph.slot(slot).map(|entry| CollectJob {
                    slot,
                    vertex: Arc::clone(&entry.vertex),
                    old_state: entry.state.clone(),
                    signals: entry.inbox.signals(),
                })
            })
            .collect();

        let next: Vec<(usize, S, S)> = run_partitions(partition(jobs, parallelism), |job| {
            let new_state = guarded(|| job.vertex.collect(&job.old_state, &job.signals))
                .map_err(|e| EngineError::collect_failed(job.vertex.id().clone(), e))?;
            Ok((job.slot, job.old_state, new_state))
        })
        .await?;
        stats.collect_operations += next.len();

        // 2. Signal - compute from the next-state buffer
        let threshold = self.config.signal_threshold;
        let mut signalling = Vec::new();
        let mut signal_jobs = Vec::new();
        for (slot, old_state, new_state) in &next {
            tracker.record(new_state.delta(old_state));

            let Some(entry) = graph.slot(*slot) else { continue };
            let should_signal = match &entry.last_signaled {
                None => true,
                Some(previous) => new_state.delta(previous) > threshold,
            };
            if !should_signal {
                continue;
            }
            signalling.push(*slot);
            if entry.outgoing.is_empty() {
                continue;
            }
            if entry.last_signaled.is_none() {
                tracker.note_first_signal();
            }

            let edges = entry
                .outgoing
                .iter()
                .filter_map(|out| {
                    graph.slot(out.target_slot).map(|target| OutgoingSignal {
                        signal: out.edge.signal_fn(),
                        target_id: target.id.clone(),
                        inbox: Arc::clone(&target.inbox),
                    })
                })
                .collect();
            signal_jobs.push(SignalJob {
                slot: *slot,
                source_id: entry.id.clone(),
                state: new_state.clone(),
                edges,
            });
        }

        let outboxes: Vec<SenderDeliveries<M>> =
            run_partitions(partition(signal_jobs, parallelism), |job| {
                let deliveries = job
                    .edges
                    .into_iter()
                    .map(|edge| -> Result<Delivery<M>, EngineError> {
                        let signal = guarded(|| (edge.signal)(&job.state)).map_err(|e| {
                            EngineError::signal_failed(job.source_id.clone(), edge.target_id.clone(), e)
                        })?;
                        Ok(Delivery {
                            inbox: edge.inbox,
                            signal,
                        })
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?;
                Ok(SenderDeliveries {
                    source_slot: job.slot,
                    deliveries,
                })
            })
            .await?;
        stats.signal_operations += outboxes.iter().map(|o| o.deliveries.len()).sum::<usize>();

        // 3. Commit - swap in the next states, consume the inputs of this round
        for &slot in active {
            if let Some(entry) = graph.slot_mut(slot) {
                entry.inbox.take_changes();
                entry.scheduled = false;
            }
        }
        for (slot, _, new_state) in next {
            if let Some(entry) = graph.slot_mut(slot) {
                entry.state = new_state;
            }
        }
        for slot in signalling {
            if let Some(entry) = graph.slot_mut(slot) {
                entry.last_signaled = Some(entry.state.clone());
            }
        }

        // 4. Deliver - a sender's deliveries stay together and in edge order
        let changed: Vec<usize> = run_partitions(partition(outboxes, parallelism), |outbox| {
            let source = outbox.source_slot;
            Ok(outbox
                .deliveries
                .into_iter()
                .filter(|delivery| delivery.inbox.deposit(source, delivery.signal.clone()))
                .count())
        })
        .await?;
        stats.signals_delivered += changed.into_iter().sum::<usize>();

        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Slots that must collect in the next round, in insertion order
fn active_set<S, M>(graph: &Graph<S, M>) -> Vec<usize>
where
    S: VertexValue,
    M: Signal,
{
    graph
        .live_slots()
        .filter(|(_, entry)| entry.scheduled || entry.inbox.has_changes())
        .map(|(slot, _)| slot)
        .collect()
}

/// Call a user function, turning a panic into an ordinary failure
fn guarded<R>(call: impl FnOnce() -> Result<R, BoxError>) -> Result<R, BoxError> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(format!("panicked: {}", panic_message(payload)).into()))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
    }
}

/// Split `items` into at most `parts` contiguous partitions
fn partition<T>(items: Vec<T>, parts: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let chunk = items.len().div_ceil(parts.max(1));
    let mut iter = items.into_iter().peekable();
    let mut partitions = Vec::new();
    while iter.peek().is_some() {
        partitions.push(iter.by_ref().take(chunk).collect());
    }
    partitions
}

/// Run `work` over every item, one blocking task per partition
///
/// Waits for every task before returning so no work outlives the phase.
/// Results come back in partition order; the first failure wins.
async fn run_partitions<T, R, F>(partitions: Vec<Vec<T>>, work: F) -> Result<Vec<R>, EngineError>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Result<R, EngineError> + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let handles: Vec<_> = partitions
        .into_iter()
        .map(|items| {
            let work = Arc::clone(&work);
            tokio::task::spawn_blocking(move || {
                items.into_iter().map(|item| work(item)).collect::<Result<Vec<R>, EngineError>>()
            })
        })
        .collect();

    let mut results = Vec::new();
    let mut failure = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(part)) => results.extend(part),
            Ok(Err(e)) => {
                failure.get_or_insert(e);
            }
            Err(e) => {
                failure.get_or_insert(EngineError::TaskJoin(e.to_string()));
            }
        }
    }

    match failure {
        Some(e) => Err(e),
        None => Ok(results),
    }
}
