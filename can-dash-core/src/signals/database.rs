//! Unified signal database
//!
//! Combines message definitions from multiple DBC files into a single
//! database keyed by arbitration identifier.

use std::collections::HashMap;

/// A complete CAN message definition
#[derive(Debug, Clone)]
pub struct MessageDefinition {
    /// CAN message ID (extended IDs stored without the DBC flag bit)
    pub id: u32,
    /// True if the DBC declared this as an extended (29-bit) frame
    pub is_extended: bool,
    /// Message name
    pub name: String,
    /// Message size in bytes
    pub size: usize,
    /// All signals in this message
    pub signals: Vec<SignalDefinition>,
    /// Multiplexer signal name (if multiplexed)
    pub multiplexer_signal: Option<String>,
    /// Source file (DBC filename)
    pub source: String,
}

impl MessageDefinition {
    fn key(&self) -> MessageKey {
        MessageKey {
            id: self.id,
            is_extended: self.is_extended,
        }
    }
}

/// Standard and extended frames live in separate identifier spaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct MessageKey {
    id: u32,
    is_extended: bool,
}

/// A CAN signal definition
#[derive(Debug, Clone)]
pub struct SignalDefinition {
    /// Signal name
    pub name: String,
    /// Start bit in the CAN frame
    pub start_bit: u16,
    /// Length in bits
    pub length: u16,
    pub byte_order: ByteOrder,
    pub value_type: ValueType,
    /// Scale factor to convert raw value to physical value
    pub factor: f64,
    /// Offset to add after scaling
    pub offset: f64,
    /// Minimum physical value
    pub min: f64,
    /// Maximum physical value
    pub max: f64,
    /// Engineering unit (e.g., "km/h", "m/s^2")
    pub unit: Option<String>,
    /// Free-text comment from `CM_ SG_`
    pub comment: Option<String>,
    /// Multiplexer info (None if not multiplexed)
    pub multiplexer_info: Option<MultiplexerInfo>,
}

/// Byte order for signal extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian (Intel format)
    LittleEndian,
    /// Big-endian (Motorola format)
    BigEndian,
}

/// Value type for signal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Signed,
    Unsigned,
}

/// Multiplexer information for multiplexed signals
#[derive(Debug, Clone)]
pub struct MultiplexerInfo {
    /// Name of the multiplexer signal that controls this signal
    pub multiplexer_signal: String,
    /// Multiplexer value(s) for which this signal is active
    pub multiplexer_values: Vec<u64>,
}

/// The unified signal database
#[derive(Debug, Clone, Default)]
pub struct SignalDatabase {
    /// Message definitions by identifier, tagged with their load sequence;
    /// a later file redefining an identifier wins
    messages: HashMap<MessageKey, (u64, MessageDefinition)>,
    next_seq: u64,
}

impl SignalDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message definition to the database
    pub fn add_message(&mut self, message: MessageDefinition) {
        let key = message.key();
        if let Some((_, previous)) = self.messages.get(&key) {
            log::warn!(
                "CAN ID 0x{:X}: '{}' from {} replaces '{}' from {}",
                message.id,
                message.name,
                message.source,
                previous.name,
                previous.source
            );
        }
        self.messages.insert(key, (self.next_seq, message));
        self.next_seq += 1;
    }

    /// Get the message definition for an identifier in the given frame format
    pub fn get_message(&self, can_id: u32, is_extended: bool) -> Option<&MessageDefinition> {
        self.messages
            .get(&MessageKey { id: can_id, is_extended })
            .map(|(_, message)| message)
    }

    /// Iterate over all message definitions in load order
    pub fn messages(&self) -> impl Iterator<Item = &MessageDefinition> {
        let mut entries: Vec<&(u64, MessageDefinition)> = self.messages.values().collect();
        entries.sort_unstable_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, message)| message)
    }

    /// Get database statistics
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_messages: self.messages.len(),
            num_signals: self.messages.values().map(|(_, msg)| msg.signals.len()).sum(),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseStats {
    /// Total number of message definitions
    pub num_messages: usize,
    /// Total number of signal definitions
    pub num_signals: usize,
}
