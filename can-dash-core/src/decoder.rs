//! Frame decoder
//!
//! This module provides the entry point for turning raw frames into named
//! physical values. The `FrameDecoder` owns the signal database loaded from
//! DBC files and classifies every frame as unknown, decoded, or malformed.

use crate::catalog::SignalCatalog;
use crate::message_decoder::{DecodedSignal, MessageDecoder};
use crate::signals::{DatabaseStats, SignalDatabase};
use crate::types::{CanFrame, DecodeError, Result, MAX_PAYLOAD_LEN};
use std::path::Path;

/// What a single frame decoded to
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The identifier is not in the database; expected on a shared bus
    Unknown(u32),
    /// The frame's active signals with their physical values
    Signals(Vec<DecodedSignal>),
}

/// The decoder - entry point for all frame decoding operations
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    /// Internal signal database (loaded from DBC files)
    signal_db: SignalDatabase,
}

impl FrameDecoder {
    /// Create a decoder with an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder from a list of DBC files, failing on the first bad one
    ///
    /// # Example
    /// ```no_run
    /// use can_dash_core::FrameDecoder;
    ///
    /// let decoder = FrameDecoder::from_dbc_files(&[
    ///     "canbus_dbc/gm_global_a_hs.dbc",
    ///     "canbus_dbc/m22_obd.dbc",
    /// ]).unwrap();
    /// ```
    pub fn from_dbc_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut decoder = Self::new();
        for path in paths {
            decoder.add_dbc(path.as_ref())?;
        }
        Ok(decoder)
    }

    /// Load a DBC file and add its definitions to the signal database
    pub fn add_dbc(&mut self, path: &Path) -> Result<()> {
        log::info!("Loading DBC file: {:?}", path);

        let messages = crate::signals::dbc::parse_dbc_file(path)?;
        for message in messages {
            self.signal_db.add_message(message);
        }

        Ok(())
    }

    /// Add DBC definitions held in memory (e.g. embedded with `include_str!`)
    pub fn add_dbc_str(&mut self, content: &str, source: &str) -> Result<()> {
        let messages = crate::signals::dbc::parse_dbc_bytes(content.as_bytes(), source)?;
        for message in messages {
            self.signal_db.add_message(message);
        }
        Ok(())
    }

    /// Build the signal catalog from the current database
    pub fn catalog(&self) -> SignalCatalog {
        SignalCatalog::from_database(&self.signal_db)
    }

    /// Decode one frame
    ///
    /// Unknown identifiers are an `Ok` outcome; only a known identifier with a
    /// payload that cannot be decoded is an error.
    pub fn decode(&self, frame: &CanFrame) -> std::result::Result<DecodeOutcome, DecodeError> {
        let Some(message_def) = self.signal_db.get_message(frame.can_id, frame.is_extended)
        else {
            log::trace!(
                "Unknown CAN ID: 0x{:X} ({})",
                frame.can_id,
                if frame.is_extended { "extended" } else { "standard" }
            );
            return Ok(DecodeOutcome::Unknown(frame.can_id));
        };

        if frame.dlc() > MAX_PAYLOAD_LEN {
            return Err(DecodeError::PayloadTooLong {
                can_id: frame.can_id,
                len: frame.dlc(),
                max: MAX_PAYLOAD_LEN,
            });
        }
        if frame.dlc() != message_def.size {
            log::trace!(
                "{} (ID 0x{:X}): DLC {} differs from defined size {}",
                message_def.name,
                frame.can_id,
                frame.dlc(),
                message_def.size
            );
        }

        let signals = MessageDecoder::decode_message(frame.can_id, &frame.data, message_def)?;
        for signal in &signals {
            log::trace!(
                "{}.{} = {} (raw {})",
                message_def.name,
                signal.name,
                signal.value,
                signal.raw_value
            );
        }
        Ok(DecodeOutcome::Signals(signals))
    }

    /// Get statistics about the loaded signal database
    pub fn database_stats(&self) -> DatabaseStats {
        self.signal_db.stats()
    }
}
