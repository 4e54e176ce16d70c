//! CAN Dashboard Telemetry Core
//!
//! Decodes vehicle CAN frames into named physical signals, keeps bounded
//! per-signal histories for graphing, and derives drag-racing performance
//! times and longitudinal/lateral acceleration for a digital dashboard.
//!
//! # Architecture
//!
//! - [`FrameDecoder`] turns one raw frame into (signal, value) pairs using
//!   DBC definitions
//! - [`SignalStore`] keeps a down-sampled history and the two latest samples
//!   of every signal
//! - [`PerformanceTracker`] and [`AccelerationTracker`] derive metrics from
//!   the designated speed and lateral acceleration signals
//! - [`IngestionLoop`] is the single writer: it owns the [`FrameSource`] and
//!   drives everything else until its [`RunFlag`] is cleared
//!
//! Consumers (gauges, graphs, the g-force screen) only read the shared
//! [`Telemetry`] at their own cadence.
//!
//! # Example Usage
//!
//! ```no_run
//! use can_dash_core::{CandumpReplay, FrameDecoder, IngestionLoop, TelemetryConfig};
//! use std::path::Path;
//!
//! let decoder = FrameDecoder::from_dbc_files(&["gm_global_a_hs.dbc"]).unwrap();
//! let source = CandumpReplay::open(Path::new("drive.log")).unwrap();
//! let config = TelemetryConfig::new();
//!
//! let ingest = IngestionLoop::new(source, decoder, &config).unwrap();
//! let telemetry = ingest.telemetry();
//! let run_flag = ingest.run_flag();
//! let handle = ingest.spawn().unwrap();
//!
//! if let Some(sample) = telemetry.latest("engine_speed") {
//!     println!("RPM: {:.0}", sample.value);
//! }
//! println!("Perf: {}", telemetry.performance().state());
//!
//! run_flag.stop();
//! handle.join().unwrap();
//! ```

// Public modules
pub mod accel;
pub mod catalog;
pub mod config;
pub mod decoder;
pub mod ingest;
pub mod perf;
pub mod sources;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types for convenience
pub use accel::{AccelerationTracker, MinMax, TracePoint};
pub use catalog::{SignalCatalog, SignalDescriptor};
pub use config::TelemetryConfig;
pub use decoder::{DecodeOutcome, FrameDecoder};
pub use ingest::{IngestionLoop, RunFlag, StopReason};
pub use message_decoder::DecodedSignal;
pub use perf::{PerfResult, PerfState, PerformanceTracker};
pub use signals::DatabaseStats;
pub use sources::{CandumpReplay, ChannelSource, FrameSource};
#[cfg(all(feature = "socketcan", target_os = "linux"))]
pub use sources::SocketCanSource;
pub use store::{SignalStore, StoreConfig};
pub use telemetry::{IngestStats, Telemetry};
pub use types::{
    CanFrame, DecodeError, Result, Sample, SourceError, TelemetryError, Timestamp,
};

// Internal modules (not exposed in public API)
mod message_decoder;
mod signals;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
