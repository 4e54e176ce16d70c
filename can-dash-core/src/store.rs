//! Bounded per-signal sample storage
//!
//! Every signal known at construction gets one slot holding two views:
//!
//! - a **history** ring for trending/graphing, down-sampled so that stored
//!   samples are at least `sample_interval` apart and capped at
//!   `history_capacity` (oldest evicted first)
//! - a **current window** of the two most recent samples, updated on every
//!   record regardless of down-sampling
//!
//! The ingestion loop is the only writer. Each slot sits behind its own
//! `RwLock` and a record is a single short write-locked update, so readers on
//! other threads see either the previous or the new sample, never a mix.

use crate::catalog::SignalCatalog;
use crate::config::TelemetryConfig;
use crate::types::{seconds_between, Sample};
use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Samples kept in the current window
pub const CURRENT_WINDOW_LEN: usize = 2;

/// Sizing of the signal store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreConfig {
    pub history_capacity: usize,
    pub sample_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1200,
            sample_interval: Duration::from_millis(100),
        }
    }
}

impl From<&TelemetryConfig> for StoreConfig {
    fn from(config: &TelemetryConfig) -> Self {
        Self {
            history_capacity: config.history_capacity,
            sample_interval: config.sample_interval(),
        }
    }
}

#[derive(Debug, Default)]
struct SlotData {
    history: VecDeque<Sample>,
    current: VecDeque<Sample>,
}

#[derive(Debug, Default)]
struct SignalSlot {
    data: RwLock<SlotData>,
}

impl SignalSlot {
    fn read(&self) -> RwLockReadGuard<'_, SlotData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SlotData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Per-signal history and current-value storage
#[derive(Debug)]
pub struct SignalStore {
    slots: HashMap<String, SignalSlot>,
    config: StoreConfig,
}

impl SignalStore {
    /// Create a store with one slot per name
    pub fn new<I, S>(signal_names: I, config: StoreConfig) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = signal_names
            .into_iter()
            .map(|name| (name.into(), SignalSlot::default()))
            .collect();

        Self {
            slots,
            config: StoreConfig {
                history_capacity: config.history_capacity.max(1),
                ..config
            },
        }
    }

    /// Create a store covering every signal in the catalog
    pub fn from_catalog(catalog: &SignalCatalog, config: StoreConfig) -> Self {
        Self::new(catalog.names(), config)
    }

    /// Record a new sample for `signal`
    ///
    /// The current window is always updated. The sample is appended to the
    /// history only when the history is empty or strictly more than
    /// `sample_interval` has passed since the last stored history sample.
    /// Returns `false` if the store has no slot for `signal`.
    pub fn record(&self, signal: &str, sample: Sample) -> bool {
        let Some(slot) = self.slots.get(signal) else {
            log::trace!("Dropping sample for untracked signal '{}'", signal);
            return false;
        };

        let interval = self.config.sample_interval.as_secs_f64();
        let mut data = slot.write();

        if data.current.len() == CURRENT_WINDOW_LEN {
            data.current.pop_front();
        }
        data.current.push_back(sample);

        let due = match data.history.back() {
            Some(last) => seconds_between(last.timestamp, sample.timestamp) > interval,
            None => true,
        };
        if due {
            if data.history.len() == self.config.history_capacity {
                data.history.pop_front();
            }
            data.history.push_back(sample);
        }

        true
    }

    /// Most recent sample, or `None` when the signal has no data yet
    pub fn latest(&self, signal: &str) -> Option<Sample> {
        self.slots.get(signal)?.read().current.back().copied()
    }

    /// Up to the two most recent samples, oldest first
    pub fn current_window(&self, signal: &str) -> Vec<Sample> {
        self.slots
            .get(signal)
            .map(|slot| slot.read().current.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Copy of the down-sampled history in insertion order
    pub fn history(&self, signal: &str) -> Vec<Sample> {
        self.slots
            .get(signal)
            .map(|slot| slot.read().history.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, signal: &str) -> bool {
        self.slots.contains_key(signal)
    }

    /// Names of all tracked signals in sorted order
    pub fn signal_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn history_capacity(&self) -> usize {
        self.config.history_capacity
    }

    pub fn sample_interval(&self) -> Duration {
        self.config.sample_interval
    }
}
