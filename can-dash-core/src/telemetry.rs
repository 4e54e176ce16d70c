//! Shared read surface for dashboard consumers
//!
//! `Telemetry` bundles everything the ingestion loop writes: the signal
//! store, both trackers and the ingestion counters. It is handed out behind
//! an `Arc`; consumers poll it at their own cadence and always receive
//! copies, so a slow reader never holds up the writer for longer than one
//! snapshot copy.

use crate::accel::AccelerationTracker;
use crate::catalog::SignalCatalog;
use crate::config::TelemetryConfig;
use crate::perf::PerformanceTracker;
use crate::store::{SignalStore, StoreConfig};
use crate::types::Sample;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

/// Counters maintained by the ingestion loop
#[derive(Debug, Default)]
pub(crate) struct IngestCounters {
    pub(crate) frames_received: AtomicU64,
    pub(crate) frames_decoded: AtomicU64,
    pub(crate) unknown_frames: AtomicU64,
    pub(crate) decode_failures: AtomicU64,
    pub(crate) samples_recorded: AtomicU64,
}

/// Point-in-time copy of the ingestion counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub unknown_frames: u64,
    pub decode_failures: u64,
    pub samples_recorded: u64,
}

/// Signal store, trackers and counters shared between writer and readers
#[derive(Debug)]
pub struct Telemetry {
    catalog: SignalCatalog,
    store: SignalStore,
    performance: RwLock<PerformanceTracker>,
    acceleration: RwLock<AccelerationTracker>,
    pub(crate) counters: IngestCounters,
}

impl Telemetry {
    pub fn new(catalog: SignalCatalog, config: &TelemetryConfig) -> Self {
        let store = SignalStore::from_catalog(&catalog, StoreConfig::from(config));
        Self {
            catalog,
            store,
            performance: RwLock::new(PerformanceTracker::new(config.results_capacity)),
            acceleration: RwLock::new(AccelerationTracker::new(config.trace_capacity)),
            counters: IngestCounters::default(),
        }
    }

    pub fn catalog(&self) -> &SignalCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &SignalStore {
        &self.store
    }

    /// Most recent sample of `signal`, `None` when no data has arrived
    pub fn latest(&self, signal: &str) -> Option<Sample> {
        self.store.latest(signal)
    }

    /// Down-sampled history of `signal`, oldest first
    pub fn history(&self, signal: &str) -> Vec<Sample> {
        self.store.history(signal)
    }

    /// Copy of the performance timer
    pub fn performance(&self) -> PerformanceTracker {
        self.performance
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy of the acceleration tracker
    pub fn acceleration(&self) -> AccelerationTracker {
        self.acceleration
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> IngestStats {
        let c = &self.counters;
        IngestStats {
            frames_received: c.frames_received.load(Ordering::Relaxed),
            frames_decoded: c.frames_decoded.load(Ordering::Relaxed),
            unknown_frames: c.unknown_frames.load(Ordering::Relaxed),
            decode_failures: c.decode_failures.load(Ordering::Relaxed),
            samples_recorded: c.samples_recorded.load(Ordering::Relaxed),
        }
    }

    /// Feed a speed update to both trackers
    pub(crate) fn update_speed(&self, window: &[Sample]) {
        self.performance
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .tick(window);
        self.acceleration
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update_longitudinal(window);
    }

    pub(crate) fn update_lateral(&self, sample: Sample) {
        self.acceleration
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .update_lateral(sample);
    }

    /// Clear the acceleration extrema shown on the g-force screen
    pub fn reset_acceleration_extrema(&self) {
        self.acceleration
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .reset_extrema();
    }
}
