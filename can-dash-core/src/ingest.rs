//! Ingestion loop
//!
//! Pulls frames from a [`FrameSource`], decodes them and publishes the
//! values into the shared [`Telemetry`]. The loop is the single writer of
//! all telemetry state and runs until its [`RunFlag`] is cleared or the
//! source closes. A frame that cannot be decoded is logged and dropped; it
//! never stops the loop.

use crate::config::TelemetryConfig;
use crate::decoder::{DecodeOutcome, FrameDecoder};
use crate::sources::FrameSource;
use crate::telemetry::Telemetry;
use crate::types::{CanFrame, Result, Sample, SourceError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Cooperative run flag shared between the loop and whoever stops it
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    /// A flag in the running state
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Ask the loop to stop after its current receive returns
    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The run flag was cleared
    Stopped,
    /// The source reported it has no more frames
    SourceClosed,
    /// The source failed; there is no reconnection
    SourceFailed,
}

/// Owns the frame source and drives decode → store → trackers
pub struct IngestionLoop<S> {
    source: S,
    decoder: FrameDecoder,
    telemetry: Arc<Telemetry>,
    running: RunFlag,
    speed_signal: String,
    lateral_signal: String,
    recv_timeout: Duration,
}

impl<S: FrameSource> IngestionLoop<S> {
    /// Build the loop and the telemetry it will publish into
    pub fn new(source: S, decoder: FrameDecoder, config: &TelemetryConfig) -> Result<Self> {
        config.validate()?;

        let catalog = decoder.catalog();
        for name in [&config.speed_signal, &config.lateral_signal] {
            if !catalog.contains(name) {
                log::warn!("Designated signal '{}' is not defined in any loaded DBC", name);
            }
        }

        log::info!(
            "Tracking {} signals (history {} samples, {}ms spacing)",
            catalog.len(),
            config.history_capacity,
            config.sample_interval_ms
        );

        let telemetry = Arc::new(Telemetry::new(catalog, config));

        Ok(Self {
            source,
            decoder,
            telemetry,
            running: RunFlag::new(),
            speed_signal: config.speed_signal.clone(),
            lateral_signal: config.lateral_signal.clone(),
            recv_timeout: config.recv_timeout(),
        })
    }

    /// Handle consumers read from
    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Flag that stops the loop when cleared
    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    /// Run until stopped or the source is exhausted
    pub fn run(&mut self) -> StopReason {
        log::info!("Ingestion loop started");

        let reason = loop {
            if !self.running.is_running() {
                break StopReason::Stopped;
            }

            match self.source.recv(self.recv_timeout) {
                Ok(Some(frame)) => self.process_frame(&frame),
                Ok(None) => {}
                Err(SourceError::Closed) => {
                    log::info!("Frame source closed");
                    break StopReason::SourceClosed;
                }
                Err(e) => {
                    log::error!("Frame source failed: {}", e);
                    break StopReason::SourceFailed;
                }
            }
        };

        log::info!("Ingestion loop finished: {:?}", reason);
        reason
    }

    /// Decode one frame and publish its values
    pub fn process_frame(&self, frame: &CanFrame) {
        let counters = &self.telemetry.counters;
        counters.frames_received.fetch_add(1, Ordering::Relaxed);

        let signals = match self.decoder.decode(frame) {
            Ok(DecodeOutcome::Signals(signals)) => signals,
            Ok(DecodeOutcome::Unknown(_)) => {
                counters.unknown_frames.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) => {
                counters.decode_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("Packet decode failed for arbid {}: {}", frame.can_id, e);
                return;
            }
        };
        counters.frames_decoded.fetch_add(1, Ordering::Relaxed);

        let store = self.telemetry.store();
        for signal in signals {
            let sample = Sample::new(frame.timestamp, signal.value);
            if !store.record(&signal.name, sample) {
                continue;
            }
            counters.samples_recorded.fetch_add(1, Ordering::Relaxed);

            if signal.name == self.speed_signal {
                self.telemetry.update_speed(&store.current_window(&signal.name));
            }
            if signal.name == self.lateral_signal {
                self.telemetry.update_lateral(sample);
            }
        }
    }
}

impl<S: FrameSource + Send + 'static> IngestionLoop<S> {
    /// Run the loop on a dedicated thread
    pub fn spawn(mut self) -> std::io::Result<JoinHandle<StopReason>> {
        std::thread::Builder::new()
            .name("can-ingest".to_string())
            .spawn(move || self.run())
    }
}
