//! Drag-racing performance timer
//!
//! Watches the designated speed signal (km/h) and times standing-start runs:
//! 0-60 mph, 0-100 mph, 1/8 mile and 1/4 mile (time and trap speed).
//!
//! ## States
//!
//! | from                              | latest speed | to      |
//! |-----------------------------------|--------------|---------|
//! | Unknown, Ready, Running, Complete | `== 0.0`     | Ready   |
//! | Ready                             | `> 0.0`      | Running |
//!
//! A run therefore arms when the car is stopped and starts on the first
//! moving sample. Nothing moves a run from `Running` to `Complete`: the state
//! exists for consumers, but no completion rule is defined, so a run stays
//! `Running` until the next standstill re-arms the timer.

use crate::types::{seconds_between, Sample, Timestamp};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// km/h → mph and km → miles
pub const MILES_PER_KM: f64 = 0.621371;

/// 60 mph, in km/h
pub const SIXTY_MPH_KPH: f64 = 96.5;

/// 100 mph, in km/h
pub const HUNDRED_MPH_KPH: f64 = 160.934;

pub const EIGHTH_MILE: f64 = 0.125;
pub const QUARTER_MILE: f64 = 0.25;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Performance timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum PerfState {
    /// No standstill seen yet
    #[default]
    Unknown,
    /// Stopped and armed; the next moving sample starts a run
    Ready,
    /// A run is being timed
    Running,
    /// A run has finished (not reachable by any transition)
    Complete,
}

impl PerfState {
    /// Text shown on the performance screen
    pub fn label(&self) -> &'static str {
        match self {
            PerfState::Unknown => "Stop to Reset",
            PerfState::Ready => "Ready",
            PerfState::Running => "Running",
            PerfState::Complete => "Complete",
        }
    }

    /// The state `speed` moves this state to, if any
    pub fn transition(self, speed: f64) -> Option<PerfState> {
        match self {
            _ if speed == 0.0 => Some(PerfState::Ready),
            PerfState::Ready if speed > 0.0 => Some(PerfState::Running),
            // TODO: Running -> Complete needs a completion rule (quarter mile reached? lift-off?)
            _ => None,
        }
    }
}

impl fmt::Display for PerfState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Milestones of one run; zero means "not reached yet"
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PerfResult {
    /// Seconds to 60 mph
    pub zero_to_sixty: f64,
    /// Seconds to 100 mph
    pub zero_to_hundred: f64,
    /// Seconds to 1/8 mile
    pub eighth_mile: f64,
    /// Trap speed at 1/8 mile (mph)
    pub eighth_mile_mph: f64,
    /// Seconds to 1/4 mile
    pub quarter_mile: f64,
    /// Trap speed at 1/4 mile (mph)
    pub quarter_mile_mph: f64,
}

impl PerfResult {
    /// (label, value) pairs in display order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("0-60", self.zero_to_sixty),
            ("0-100", self.zero_to_hundred),
            ("1/8 Mile", self.eighth_mile),
            ("1/8 Mile MPH", self.eighth_mile_mph),
            ("1/4 Mile", self.quarter_mile),
            ("1/4 Mile MPH", self.quarter_mile_mph),
        ]
    }
}

/// Run-by-run performance timer
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceTracker {
    state: PerfState,
    start_time: Option<Timestamp>,
    /// Distance covered in the current run (miles)
    distance: f64,
    /// Seconds since the current run started
    elapsed: f64,
    current: PerfResult,
    results: VecDeque<PerfResult>,
    results_capacity: usize,
}

impl PerformanceTracker {
    pub fn new(results_capacity: usize) -> Self {
        Self {
            state: PerfState::Unknown,
            start_time: None,
            distance: 0.0,
            elapsed: 0.0,
            current: PerfResult::default(),
            results: VecDeque::with_capacity(results_capacity),
            results_capacity,
        }
    }

    /// Advance the timer with the speed signal's current window
    ///
    /// `window` holds the most recent speed samples, oldest first; only the
    /// last two are used. State transitions need one sample, distance and
    /// milestones need two. An empty window is ignored.
    pub fn tick(&mut self, window: &[Sample]) {
        let Some(latest) = window.last().copied() else {
            return;
        };

        let mut started = false;
        if let Some(next) = self.state.transition(latest.value) {
            if next != self.state {
                log::debug!("Performance timer {} -> {}", self.state, next);
            }
            if next == PerfState::Running {
                self.start_run(latest.timestamp);
                started = true;
            }
            self.state = next;
        }

        if self.state != PerfState::Running || started || window.len() < 2 {
            return;
        }

        let previous = window[window.len() - 2];
        self.advance(previous, latest);
    }

    fn start_run(&mut self, start: Timestamp) {
        self.start_time = Some(start);
        self.distance = 0.0;
        self.elapsed = 0.0;

        if self.results_capacity > 0 {
            if self.results.len() == self.results_capacity {
                self.results.pop_front();
            }
            self.results.push_back(self.current);
        }
        self.current = PerfResult::default();
    }

    fn advance(&mut self, previous: Sample, latest: Sample) {
        let Some(start) = self.start_time else {
            return;
        };

        self.elapsed = seconds_between(start, latest.timestamp);

        let dt_hours = seconds_between(previous.timestamp, latest.timestamp) / SECONDS_PER_HOUR;
        let average_kph = (previous.value + latest.value) / 2.0;
        self.distance += average_kph * dt_hours * MILES_PER_KM;

        let speed = latest.value;
        let elapsed = self.elapsed;
        let result = &mut self.current;

        if speed > SIXTY_MPH_KPH && result.zero_to_sixty == 0.0 {
            result.zero_to_sixty = elapsed;
            log::info!("0-60: {:.2}s", elapsed);
        }

        if speed > HUNDRED_MPH_KPH && result.zero_to_hundred == 0.0 {
            result.zero_to_hundred = elapsed;
            log::info!("0-100: {:.2}s", elapsed);
        }

        if self.distance > EIGHTH_MILE && result.eighth_mile == 0.0 {
            result.eighth_mile = elapsed;
            result.eighth_mile_mph = speed * MILES_PER_KM;
            log::info!("1/8 mile: {:.2}s @ {:.1} mph", elapsed, result.eighth_mile_mph);
        }

        if self.distance > QUARTER_MILE && result.quarter_mile == 0.0 {
            result.quarter_mile = elapsed;
            result.quarter_mile_mph = speed * MILES_PER_KM;
            log::info!("1/4 mile: {:.2}s @ {:.1} mph", elapsed, result.quarter_mile_mph);
        }
    }

    pub fn state(&self) -> PerfState {
        self.state
    }

    /// Milestones of the run in progress (or the last one, once re-armed)
    pub fn current_result(&self) -> PerfResult {
        self.current
    }

    /// Archived runs, most recent last
    pub fn results(&self) -> Vec<PerfResult> {
        self.results.iter().copied().collect()
    }

    /// Seconds since the current run started
    pub fn current_elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Miles covered in the current run
    pub fn current_distance(&self) -> f64 {
        self.distance
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(10)
    }
}
