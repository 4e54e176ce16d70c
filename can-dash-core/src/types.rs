//! Core types for the dashboard telemetry core
//!
//! This module defines the frames the ingestion loop consumes, the samples it
//! publishes, and the error types that cross module boundaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the telemetry core
pub type Timestamp = DateTime<Utc>;

/// Result type for startup operations (database loading, configuration)
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Maximum payload length of a classic CAN frame
pub const MAX_PAYLOAD_LEN: usize = 8;

/// Raw CAN frame as delivered by a frame source
#[derive(Debug, Clone, PartialEq)]
pub struct CanFrame {
    /// Receive (or logged) timestamp
    pub timestamp: Timestamp,
    /// Arbitration identifier (11-bit or 29-bit)
    pub can_id: u32,
    /// True if this is an extended (29-bit) identifier
    pub is_extended: bool,
    /// Payload bytes (0-8 for classic CAN)
    pub data: Vec<u8>,
}

impl CanFrame {
    /// Create a frame; identifiers above 0x7FF are flagged extended
    pub fn new(timestamp: Timestamp, can_id: u32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp,
            can_id,
            is_extended: can_id > 0x7FF,
            data: data.into(),
        }
    }

    /// Get the data length code (DLC) - number of data bytes
    pub fn dlc(&self) -> usize {
        self.data.len()
    }
}

/// One timestamped physical value of a signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} @ {}", self.value, self.timestamp.format("%H:%M:%S%.3f"))
    }
}

/// Seconds elapsed from `from` to `to` (negative if `to` is earlier)
pub fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

/// Errors that abort construction of the telemetry core
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Failed to load signal database: {0}")]
    Database(String),

    #[error("Invalid signal definition: {0}")]
    InvalidSignalDefinition(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a frame with a known identifier could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("payload of {len} bytes exceeds the {max}-byte frame limit (CAN ID 0x{can_id:X})")]
    PayloadTooLong { can_id: u32, len: usize, max: usize },

    #[error("signal '{signal}' needs {required} bytes but frame 0x{can_id:X} has {actual}")]
    PayloadTooShort {
        can_id: u32,
        signal: String,
        required: usize,
        actual: usize,
    },

    #[error("signal '{signal}' in frame 0x{can_id:X} decoded to a non-finite value")]
    NonFinite { can_id: u32, signal: String },
}

/// Errors reported by a frame source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source has no more frames and never will (EOF, sender dropped)
    #[error("frame source closed")]
    Closed,

    #[error("frame source IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed frame record: {0}")]
    Parse(String),
}
