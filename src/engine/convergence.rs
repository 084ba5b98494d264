//! Convergence tracking
//!
//! The tracker folds the per-vertex deltas of one round into a single
//! aggregate and decides, once the round's signals have been delivered,
//! whether the run goes on.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::config::{DeltaAggregation, EngineConfig};

/// Why a run stopped
///
/// None of these is an error. Callers usually warn on anything other than
/// `Converged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Active set empty, or aggregate delta below epsilon
    Converged,
    /// Round budget used up before convergence
    BudgetExhausted,
    /// Wall-clock budget used up before convergence
    TimeLimitReached,
    /// Stop requested through the scheduler handle
    Cancelled,
}

impl TerminationReason {
    /// Check if the run reached a fixed point
    pub fn is_converged(&self) -> bool {
        matches!(self, TerminationReason::Converged)
    }
}

/// Outcome of a finished round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Schedule another round
    Continue,
    /// Stop the run
    Terminate(TerminationReason),
}

/// Aggregates per-round state deltas and applies the termination rules
#[derive(Debug, Clone)]
pub struct ConvergenceTracker {
    aggregation: DeltaAggregation,
    epsilon: f64,
    max_rounds: usize,
    time_limit: Option<Duration>,
    started: Instant,
    rounds: usize,
    current: f64,
    first_signals: bool,
    last_aggregate: f64,
}

impl ConvergenceTracker {
    /// Create a tracker for one run
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            aggregation: config.aggregation,
            epsilon: config.convergence_epsilon,
            max_rounds: config.max_rounds,
            time_limit: config.time_limit,
            started: Instant::now(),
            rounds: 0,
            current: 0.0,
            first_signals: false,
            last_aggregate: 0.0,
        }
    }

    /// Reset the per-round aggregate
    pub fn begin_round(&mut self) {
        self.current = 0.0;
        self.first_signals = false;
    }

    /// Record one vertex's state delta
    ///
    /// NaN counts as an infinitely large change.
    pub fn record(&mut self, delta: f64) {
        let delta = if delta.is_nan() { f64::INFINITY } else { delta.abs() };
        self.current = match self.aggregation {
            DeltaAggregation::Sum => self.current + delta,
            DeltaAggregation::Max => self.current.max(delta),
        };
    }

    /// Note that a vertex sent its first signal this round
    ///
    /// Such a round carries information no delta reflects, so it never
    /// converges through the epsilon rule.
    pub fn note_first_signal(&mut self) {
        self.first_signals = true;
    }

    /// Aggregate delta of the round in progress
    pub fn aggregate(&self) -> f64 {
        self.current
    }

    /// Aggregate delta of the last finished round
    pub fn last_aggregate(&self) -> f64 {
        self.last_aggregate
    }

    /// Rounds finished so far
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Close the round and decide whether to continue
    ///
    /// `active_remaining` is the size of the next round's active set.
    pub fn finish_round(&mut self, active_remaining: usize) -> RoundOutcome {
        self.rounds += 1;
        self.last_aggregate = self.current;

        if active_remaining == 0 {
            return RoundOutcome::Terminate(TerminationReason::Converged);
        }
        if !self.first_signals && self.current < self.epsilon {
            return RoundOutcome::Terminate(TerminationReason::Converged);
        }
        if self.rounds >= self.max_rounds {
            return RoundOutcome::Terminate(TerminationReason::BudgetExhausted);
        }
        if let Some(limit) = self.time_limit {
            if self.started.elapsed() >= limit {
                return RoundOutcome::Terminate(TerminationReason::TimeLimitReached);
            }
        }
        RoundOutcome::Continue
    }
}
