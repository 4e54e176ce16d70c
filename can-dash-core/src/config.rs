//! Telemetry configuration types
//!
//! This module defines the knobs of the telemetry core: which signals drive
//! the derived metrics, how dense the graph histories are, and how long the
//! ingestion loop waits for a frame before re-checking its run flag.

use crate::types::{Result, TelemetryError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default designated speed signal (km/h)
pub const DEFAULT_SPEED_SIGNAL: &str = "speed_average_non_driven";

/// Default designated lateral acceleration signal (m/s²)
pub const DEFAULT_LATERAL_SIGNAL: &str = "vehicle_stability_lateral_acceleration";

/// Configuration for the telemetry core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Signal that drives the performance timer and longitudinal acceleration
    #[serde(default = "default_speed_signal")]
    pub speed_signal: String,

    /// Signal taken as lateral acceleration
    #[serde(default = "default_lateral_signal")]
    pub lateral_signal: String,

    /// Samples kept per signal for graphing (default: 1200, 2 minutes at 100ms)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Minimum spacing between stored history samples in milliseconds
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,

    /// How long one receive call may block, bounding shutdown latency
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    /// Completed performance runs kept (most recent last)
    #[serde(default = "default_results_capacity")]
    pub results_capacity: usize,

    /// Length of the (longitudinal, lateral) acceleration trace
    #[serde(default = "default_trace_capacity")]
    pub trace_capacity: usize,
}

fn default_speed_signal() -> String {
    DEFAULT_SPEED_SIGNAL.to_string()
}

fn default_lateral_signal() -> String {
    DEFAULT_LATERAL_SIGNAL.to_string()
}

fn default_history_capacity() -> usize {
    1200
}

fn default_sample_interval_ms() -> u64 {
    100
}

fn default_recv_timeout_ms() -> u64 {
    500
}

fn default_results_capacity() -> usize {
    10
}

fn default_trace_capacity() -> usize {
    30
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            speed_signal: default_speed_signal(),
            lateral_signal: default_lateral_signal(),
            history_capacity: default_history_capacity(),
            sample_interval_ms: default_sample_interval_ms(),
            recv_timeout_ms: default_recv_timeout_ms(),
            results_capacity: default_results_capacity(),
            trace_capacity: default_trace_capacity(),
        }
    }
}

impl TelemetryConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the designated speed signal
    pub fn with_speed_signal(mut self, name: impl Into<String>) -> Self {
        self.speed_signal = name.into();
        self
    }

    /// Builder method: set the designated lateral acceleration signal
    pub fn with_lateral_signal(mut self, name: impl Into<String>) -> Self {
        self.lateral_signal = name.into();
        self
    }

    /// Builder method: set the per-signal history capacity
    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity;
        self
    }

    /// Builder method: set the history down-sampling interval
    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Builder method: set the frame receive timeout
    pub fn with_recv_timeout(mut self, timeout: Duration) -> Self {
        self.recv_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Builder method: set how many completed runs are kept
    pub fn with_results_capacity(mut self, capacity: usize) -> Self {
        self.results_capacity = capacity;
        self
    }

    /// Builder method: set the acceleration trace length
    pub fn with_trace_capacity(mut self, capacity: usize) -> Self {
        self.trace_capacity = capacity;
        self
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    /// Reject settings the core cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.speed_signal.is_empty() || self.lateral_signal.is_empty() {
            return Err(TelemetryError::Config(
                "designated signal names must not be empty".to_string(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(TelemetryError::Config(
                "history_capacity must be at least 1".to_string(),
            ));
        }
        if self.recv_timeout_ms == 0 {
            return Err(TelemetryError::Config(
                "recv_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
