//! DBC file parser
//!
//! Parses Vector DBC files and converts them into our internal signal database format.

use crate::signals::database::{
    ByteOrder, MessageDefinition, MultiplexerInfo, SignalDefinition, ValueType,
};
use crate::types::{Result, TelemetryError};
use std::path::Path;

/// DBC files flag extended (29-bit) identifiers with bit 31
const DBC_EXTENDED_FLAG: u32 = 0x8000_0000;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// Parse a DBC file and return message definitions
pub fn parse_dbc_file(path: &Path) -> Result<Vec<MessageDefinition>> {
    log::info!("Parsing DBC file: {:?}", path);

    let bytes = std::fs::read(path)?;

    let source_filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.dbc")
        .to_string();

    let messages = parse_dbc_bytes(&bytes, &source_filename)?;

    log::info!("Parsed {} messages from {:?}", messages.len(), path);
    Ok(messages)
}

/// Parse DBC content already held in memory
pub fn parse_dbc_bytes(bytes: &[u8], source: &str) -> Result<Vec<MessageDefinition>> {
    // Try UTF-8 first, then fall back to Latin-1 (compatible with Windows-1252)
    let dbc_content = match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            log::warn!("DBC file {} is not UTF-8, trying Latin-1 encoding", source);
            bytes.iter().map(|&b| b as char).collect()
        }
    };

    let dbc = can_dbc::DBC::from_slice(dbc_content.as_bytes()).map_err(|e| {
        TelemetryError::Database(format!("Failed to parse DBC file {}: {:?}", source, e))
    })?;

    dbc.messages()
        .iter()
        .map(|dbc_msg| convert_message(&dbc, dbc_msg, source))
        .collect()
}

/// Convert a can-dbc message to our MessageDefinition
fn convert_message(
    dbc: &can_dbc::DBC,
    dbc_msg: &can_dbc::Message,
    source: &str,
) -> Result<MessageDefinition> {
    let message_id = *dbc_msg.message_id();

    let multiplexer_signal = dbc_msg
        .signals()
        .iter()
        .find(|s| {
            matches!(
                s.multiplexer_indicator(),
                can_dbc::MultiplexIndicator::Multiplexor
                    | can_dbc::MultiplexIndicator::MultiplexorAndMultiplexedSignal(_)
            )
        })
        .map(|s| s.name().to_string());

    let signals = dbc_msg
        .signals()
        .iter()
        .map(|dbc_sig| {
            let comment = dbc
                .signal_comment(message_id, dbc_sig.name())
                .map(str::to_string);
            convert_signal(dbc_sig, multiplexer_signal.as_deref(), comment)
        })
        .collect::<Result<Vec<_>>>()?;

    let raw_id = message_id.0;
    let is_extended = raw_id & DBC_EXTENDED_FLAG != 0;
    let id = if is_extended { raw_id & EXTENDED_ID_MASK } else { raw_id };

    Ok(MessageDefinition {
        id,
        is_extended,
        name: dbc_msg.message_name().to_string(),
        size: *dbc_msg.message_size() as usize,
        signals,
        multiplexer_signal,
        source: source.to_string(),
    })
}

/// Convert a can-dbc signal to our SignalDefinition
fn convert_signal(
    dbc_sig: &can_dbc::Signal,
    multiplexer_signal_name: Option<&str>,
    comment: Option<String>,
) -> Result<SignalDefinition> {
    let byte_order = match *dbc_sig.byte_order() {
        can_dbc::ByteOrder::LittleEndian => ByteOrder::LittleEndian,
        can_dbc::ByteOrder::BigEndian => ByteOrder::BigEndian,
    };

    let value_type = match *dbc_sig.value_type() {
        can_dbc::ValueType::Signed => ValueType::Signed,
        can_dbc::ValueType::Unsigned => ValueType::Unsigned,
    };

    let switch_value = match *dbc_sig.multiplexer_indicator() {
        can_dbc::MultiplexIndicator::MultiplexedSignal(v) => Some(v),
        can_dbc::MultiplexIndicator::MultiplexorAndMultiplexedSignal(v) => Some(v),
        _ => None,
    };

    let multiplexer_info = match switch_value {
        Some(value) => Some(MultiplexerInfo {
            multiplexer_signal: multiplexer_signal_name
                .ok_or_else(|| {
                    TelemetryError::InvalidSignalDefinition(format!(
                        "Multiplexed signal '{}' but no multiplexer found",
                        dbc_sig.name()
                    ))
                })?
                .to_string(),
            multiplexer_values: vec![value],
        }),
        None => None,
    };

    Ok(SignalDefinition {
        name: dbc_sig.name().to_string(),
        start_bit: *dbc_sig.start_bit() as u16,
        length: *dbc_sig.signal_size() as u16,
        byte_order,
        value_type,
        factor: *dbc_sig.factor(),
        offset: *dbc_sig.offset(),
        min: *dbc_sig.min(),
        max: *dbc_sig.max(),
        unit: if dbc_sig.unit().is_empty() {
            None
        } else {
            Some(dbc_sig.unit().to_string())
        },
        comment,
        multiplexer_info,
    })
}
