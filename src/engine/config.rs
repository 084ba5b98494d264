//! Engine configuration
//!
//! Round budget, convergence threshold, worker count and the optional
//! tuning knobs of the scheduler.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::error::EngineError;

/// How per-vertex deltas are combined into one number per round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaAggregation {
    /// Total change across all collected vertices
    #[default]
    Sum,
    /// Largest single change
    Max,
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum rounds before the run stops with `BudgetExhausted`
    pub max_rounds: usize,

    /// A round whose aggregate delta falls below this value converges
    pub convergence_epsilon: f64,

    /// Number of worker partitions per phase
    pub parallelism: usize,

    /// Delta aggregation used by the convergence tracker
    pub aggregation: DeltaAggregation,

    /// A vertex re-signals only once its state moved further than this from
    /// the state it last signalled
    pub signal_threshold: f64,

    /// Wall-clock budget checked between rounds
    #[serde(with = "humantime_serde")]
    pub time_limit: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_rounds: 100,
            convergence_epsilon: 1e-6,
            parallelism: num_cpus::get(),
            aggregation: DeltaAggregation::default(),
            signal_threshold: 0.0,
            time_limit: None,
        }
    }
}

impl EngineConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum rounds
    pub fn with_max_rounds(mut self, max: usize) -> Self {
        self.max_rounds = max;
        self
    }

    /// Set the convergence threshold
    pub fn with_convergence_epsilon(mut self, epsilon: f64) -> Self {
        self.convergence_epsilon = epsilon;
        self
    }

    /// Set parallelism level
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    /// Set delta aggregation
    pub fn with_aggregation(mut self, aggregation: DeltaAggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    /// Set signal threshold
    pub fn with_signal_threshold(mut self, threshold: f64) -> Self {
        self.signal_threshold = threshold;
        self
    }

    /// Set wall-clock limit
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Reject configurations the scheduler cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_rounds == 0 {
            return Err(EngineError::config_error("max_rounds must be greater than 0"));
        }
        if !self.convergence_epsilon.is_finite() || self.convergence_epsilon <= 0.0 {
            return Err(EngineError::config_error(format!(
                "convergence_epsilon must be a positive finite number, got {}",
                self.convergence_epsilon
            )));
        }
        if self.parallelism == 0 {
            return Err(EngineError::config_error("parallelism must be at least 1"));
        }
        if !self.signal_threshold.is_finite() || self.signal_threshold < 0.0 {
            return Err(EngineError::config_error(format!(
                "signal_threshold must be a non-negative finite number, got {}",
                self.signal_threshold
            )));
        }
        Ok(())
    }

    /// Parse a JSON config; missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        serde_json::from_str(json).map_err(|e| EngineError::ConfigLoad(e.to_string()))
    }

    /// Read and parse a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigLoad(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }
}
