//! Message Decoding Engine
//!
//! Extracts signal values from raw CAN payloads based on signal definitions
//! from the signal database. Handles bit extraction, endianness, multiplexing,
//! and physical value conversion.

use crate::signals::database::{ByteOrder, MessageDefinition, SignalDefinition, ValueType};
use crate::types::DecodeError;

/// One decoded signal value
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSignal {
    /// Signal name from the DBC
    pub name: String,
    /// Physical value (offset + factor × raw)
    pub value: f64,
    /// Raw value before scaling (useful for debugging)
    pub raw_value: i64,
}

/// Message decoder - extracts signals from CAN payloads
pub struct MessageDecoder;

impl MessageDecoder {
    /// Decode every active signal of `message_def` from `data`
    ///
    /// Fails as a whole if any active signal does not fit in the payload, so a
    /// truncated frame never publishes a partial set of values.
    pub fn decode_message(
        can_id: u32,
        data: &[u8],
        message_def: &MessageDefinition,
    ) -> Result<Vec<DecodedSignal>, DecodeError> {
        // For multiplexed messages, first extract the multiplexer signal value
        let multiplexer_value = match &message_def.multiplexer_signal {
            Some(mux_name) => match message_def.signals.iter().find(|s| s.name == *mux_name) {
                Some(mux_signal) => Some(Self::extract_signal_value(can_id, data, mux_signal)? as u64),
                None => None,
            },
            None => None,
        };

        let mut decoded_signals = Vec::with_capacity(message_def.signals.len());

        for signal in &message_def.signals {
            if let Some(ref mux_info) = signal.multiplexer_info {
                match multiplexer_value {
                    Some(current) if mux_info.multiplexer_values.contains(&current) => {}
                    _ => continue,
                }
            }

            decoded_signals.push(Self::decode_signal(can_id, data, signal)?);
        }

        Ok(decoded_signals)
    }

    /// Decode a single signal from CAN frame data
    fn decode_signal(
        can_id: u32,
        data: &[u8],
        signal: &SignalDefinition,
    ) -> Result<DecodedSignal, DecodeError> {
        let raw_value = Self::extract_signal_value(can_id, data, signal)?;
        let value = signal.offset + signal.factor * (raw_value as f64);

        if !value.is_finite() {
            return Err(DecodeError::NonFinite {
                can_id,
                signal: signal.name.clone(),
            });
        }

        Ok(DecodedSignal {
            name: signal.name.clone(),
            value,
            raw_value,
        })
    }

    /// Extract raw signal value from CAN frame data
    fn extract_signal_value(
        can_id: u32,
        data: &[u8],
        signal: &SignalDefinition,
    ) -> Result<i64, DecodeError> {
        let start_bit = signal.start_bit as usize;
        let length = signal.length as usize;

        let required_bytes = match signal.byte_order {
            ByteOrder::LittleEndian => (start_bit + length + 7) / 8,
            ByteOrder::BigEndian => (Self::motorola_msb_position(start_bit) + length + 7) / 8,
        };
        if required_bytes > data.len() {
            return Err(DecodeError::PayloadTooShort {
                can_id,
                signal: signal.name.clone(),
                required: required_bytes,
                actual: data.len(),
            });
        }

        let raw_value = match signal.byte_order {
            ByteOrder::LittleEndian => Self::extract_little_endian(data, start_bit, length),
            ByteOrder::BigEndian => Self::extract_big_endian(data, start_bit, length),
        };

        Ok(match signal.value_type {
            ValueType::Unsigned => raw_value as i64,
            ValueType::Signed => Self::sign_extend(raw_value, length),
        })
    }

    /// Extract signal with little-endian (Intel) byte order
    ///
    /// Start bit points to the LSB; bits are numbered LSB to MSB within each
    /// byte, byte 0 first.
    fn extract_little_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = start_bit + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = bit_pos % 8;

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result |= (bit_value as u64) << i;
            }
        }

        result
    }

    /// Extract signal with big-endian (Motorola) byte order
    ///
    /// The DBC start bit names the MSB in the usual "sawtooth" numbering
    /// (bit 7 of byte 0 is start bit 7). It is converted to a position counted
    /// MSB-first across the payload, from which the signal runs forward.
    fn extract_big_endian(data: &[u8], start_bit: usize, length: usize) -> u64 {
        let msb_pos = Self::motorola_msb_position(start_bit);
        let mut result: u64 = 0;

        for i in 0..length {
            let bit_pos = msb_pos + i;
            let byte_idx = bit_pos / 8;
            let bit_in_byte = 7 - (bit_pos % 8);

            if byte_idx < data.len() {
                let bit_value = (data[byte_idx] >> bit_in_byte) & 0x01;
                result = (result << 1) | bit_value as u64;
            }
        }

        result
    }

    fn motorola_msb_position(start_bit: usize) -> usize {
        (start_bit / 8) * 8 + (7 - start_bit % 8)
    }

    /// Sign-extend a value from N bits to 64 bits
    fn sign_extend(value: u64, bit_length: usize) -> i64 {
        if bit_length == 0 || bit_length >= 64 {
            return value as i64;
        }

        let sign_bit = 1u64 << (bit_length - 1);
        if (value & sign_bit) != 0 {
            let mask = !0u64 << bit_length;
            (value | mask) as i64
        } else {
            value as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::database::tests::{message, signal};
    use crate::signals::database::MultiplexerInfo;

    #[test]
    fn test_extract_little_endian_simple() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 8), 0xAB);
    }

    #[test]
    fn test_extract_little_endian_cross_byte() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_little_endian(&data, 0, 16), 0xCDAB);
        assert_eq!(MessageDecoder::extract_little_endian(&data, 4, 8), 0xDA);
    }

    #[test]
    fn test_extract_big_endian_simple() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        assert_eq!(MessageDecoder::extract_big_endian(&data, 7, 8), 0xAB);
    }

    #[test]
    fn test_extract_big_endian_cross_byte() {
        let data = vec![0xAB, 0xCD, 0xEF, 0x12];
        // 16-bit Motorola signal whose MSB is bit 7 of byte 0
        assert_eq!(MessageDecoder::extract_big_endian(&data, 7, 16), 0xABCD);
        // 12-bit signal starting at bit 3 of byte 0: low nibble of byte 0 + byte 1
        assert_eq!(MessageDecoder::extract_big_endian(&data, 3, 12), 0xBCD);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(MessageDecoder::sign_extend(0x7F, 8), 127);
        assert_eq!(MessageDecoder::sign_extend(0xFF, 8), -1);
        assert_eq!(MessageDecoder::sign_extend(0x8000, 16), -32768);
    }

    #[test]
    fn test_decode_scaled_signal() {
        let msg = message(0x3E9, "Wheel_Speeds", vec![signal("speed", 0, 16, 0.015625)]);
        // 0x1900 = 6400 raw * 0.015625 = 100.0 km/h
        let decoded = MessageDecoder::decode_message(0x3E9, &[0x00, 0x19, 0, 0, 0, 0, 0, 0], &msg).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].name, "speed");
        assert_eq!(decoded[0].raw_value, 6400);
        assert!((decoded[0].value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_decode_signed_with_offset() {
        let mut lat = signal("lat", 0, 16, 0.01);
        lat.value_type = ValueType::Signed;
        lat.offset = 0.5;
        let msg = message(0x1E5, "Chassis", vec![lat]);
        // 0xFF38 = -200 raw → -2.0 + 0.5
        let decoded = MessageDecoder::decode_message(0x1E5, &[0x38, 0xFF], &msg).unwrap();
        assert!((decoded[0].value + 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_payload_is_error() {
        let msg = message(0x3E9, "Wheel_Speeds", vec![signal("speed", 8, 16, 1.0)]);
        let err = MessageDecoder::decode_message(0x3E9, &[0x00, 0x19], &msg).unwrap_err();
        assert_eq!(
            err,
            DecodeError::PayloadTooShort {
                can_id: 0x3E9,
                signal: "speed".to_string(),
                required: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn test_multiplexed_selection() {
        let mode = signal("Mode", 0, 8, 1.0);
        let mut sig_a = signal("SignalA", 8, 16, 1.0);
        sig_a.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![0],
        });
        let mut sig_b = signal("SignalB", 8, 16, 0.1);
        sig_b.multiplexer_info = Some(MultiplexerInfo {
            multiplexer_signal: "Mode".to_string(),
            multiplexer_values: vec![1],
        });
        let mut msg = message(0x200, "Mux", vec![mode, sig_a, sig_b]);
        msg.multiplexer_signal = Some("Mode".to_string());

        let decoded = MessageDecoder::decode_message(0x200, &[0x01, 0x64, 0x00], &msg).unwrap();
        let names: Vec<&str> = decoded.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Mode", "SignalB"]);
        assert!((decoded[1].value - 10.0).abs() < 1e-9);
    }
}
