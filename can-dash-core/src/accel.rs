//! Longitudinal and lateral acceleration for the g-force display
//!
//! Longitudinal acceleration is derived from consecutive speed samples;
//! lateral acceleration is read straight from the vehicle's own sensor
//! signal. The two axes update independently, so each trace entry pairs a
//! fresh value on one axis with the most recent (possibly older) value on
//! the other.

use crate::types::{seconds_between, Sample};
use serde::Serialize;
use std::collections::VecDeque;

/// km/h → m/s
pub const KPH_TO_MPS: f64 = 0.277778;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Running (min, max) of one axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MinMax {
    pub min: f64,
    pub max: f64,
}

impl MinMax {
    fn update(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// One trace point: (longitudinal, lateral) in m/s²
pub type TracePoint = (f64, f64);

#[derive(Debug, Clone, Serialize)]
pub struct AccelerationTracker {
    longitudinal: f64,
    lateral: f64,
    longitudinal_extrema: MinMax,
    lateral_extrema: MinMax,
    trace: VecDeque<TracePoint>,
    trace_capacity: usize,
}

impl AccelerationTracker {
    pub fn new(trace_capacity: usize) -> Self {
        Self {
            longitudinal: 0.0,
            lateral: 0.0,
            longitudinal_extrema: MinMax::default(),
            lateral_extrema: MinMax::default(),
            trace: VecDeque::with_capacity(trace_capacity),
            trace_capacity,
        }
    }

    /// Derive longitudinal acceleration from the last two speed samples (km/h)
    ///
    /// No-op with fewer than two samples or when they are not strictly
    /// increasing in time.
    pub fn update_longitudinal(&mut self, window: &[Sample]) {
        let [.., previous, latest] = window else {
            return;
        };

        let dt = seconds_between(previous.timestamp, latest.timestamp);
        if dt <= 0.0 {
            log::debug!("Skipping acceleration update: non-positive dt {:.6}s", dt);
            return;
        }

        self.longitudinal = (latest.value - previous.value) * KPH_TO_MPS / dt;
        self.update_extrema();
        self.push_trace();
    }

    /// Take the latest lateral acceleration sample (m/s²) as-is
    pub fn update_lateral(&mut self, sample: Sample) {
        self.lateral = sample.value;
        self.update_extrema();
        self.push_trace();
    }

    /// Forget the running extrema (e.g. at the start of a session)
    pub fn reset_extrema(&mut self) {
        self.longitudinal_extrema = MinMax::default();
        self.lateral_extrema = MinMax::default();
    }

    fn update_extrema(&mut self) {
        self.longitudinal_extrema.update(self.longitudinal);
        self.lateral_extrema.update(self.lateral);
    }

    fn push_trace(&mut self) {
        if self.trace_capacity == 0 {
            return;
        }
        if self.trace.len() == self.trace_capacity {
            self.trace.pop_front();
        }
        self.trace.push_back((self.longitudinal, self.lateral));
    }

    /// Current longitudinal acceleration (m/s²)
    pub fn longitudinal(&self) -> f64 {
        self.longitudinal
    }

    /// Current lateral acceleration (m/s²)
    pub fn lateral(&self) -> f64 {
        self.lateral
    }

    pub fn longitudinal_g(&self) -> f64 {
        self.longitudinal / STANDARD_GRAVITY
    }

    pub fn lateral_g(&self) -> f64 {
        self.lateral / STANDARD_GRAVITY
    }

    pub fn longitudinal_min_max(&self) -> MinMax {
        self.longitudinal_extrema
    }

    pub fn lateral_min_max(&self) -> MinMax {
        self.lateral_extrema
    }

    /// Recent (longitudinal, lateral) pairs, oldest first
    pub fn trace(&self) -> Vec<TracePoint> {
        self.trace.iter().copied().collect()
    }
}

impl Default for AccelerationTracker {
    fn default() -> Self {
        Self::new(30)
    }
}
