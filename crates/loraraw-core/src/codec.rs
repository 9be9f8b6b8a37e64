//! Positional frame codec
//!
//! Builds and parses the fixed LoRaRAW binary frame bit-by-bit. The frame
//! layout is a hard contract with the device firmware, which has no type
//! system of its own: the bit offsets and widths below are the only thing
//! both sides agree on.
//!
//! ## Frame Structure (pre-encryption)
//!
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────┬──────────────┐
//! │ Outer (4B)   │ Inner (3B)   │ Payload fields       │ CMAC (4B)    │
//! │              │              │ (bit-packed)         │              │
//! └──────────────┴──────────────┴──────────────────────┴──────────────┘
//!
//! Outer header:
//! ┌────────────┬─────────────────┬────────────┐
//! │ Flags (1B) │ Message ID (2B) │ Reserved   │
//! │ bit0: pos  │ big-endian      │ (1B)       │
//! │ bit1: req  │                 │            │
//! └────────────┴─────────────────┴────────────┘
//!
//! Payload field (repeated):
//! ┌────────────┬─────────────────┬──────────────────┐
//! │ Tag (4b)   │ Address ID (8b) │ Value (8-64b)    │
//! └────────────┴─────────────────┴──────────────────┘
//! ```
//!
//! A tag of zero terminates field decoding, so the zero padding in the
//! last partially-used byte never produces phantom fields.
//!
//! All multi-bit quantities are packed MSB-first. The 4-byte CMAC trailer
//! is reserved as zeros by the codec and filled by the payload cipher.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use thiserror::Error;

/// Outer header length in bytes
pub const OUTER_HEADER_LEN: usize = 4;
/// Inner (firmware-owned) header length in bytes
pub const INNER_HEADER_LEN: usize = 3;
/// CMAC trailer length in bytes
pub const CMAC_LEN: usize = 4;
/// Trailing RSSI length in bytes (uplink only)
pub const RSSI_LEN: usize = 1;
/// Trailing SNR length in bytes (uplink only)
pub const SNR_LEN: usize = 1;
/// Maximum outbound frame size in bytes, CMAC trailer included
pub const MAX_FRAME_LEN: usize = 64;

const HEADER_BITS: usize = (OUTER_HEADER_LEN + INNER_HEADER_LEN) * 8;
const FIELD_TAG_BITS: usize = 4;
const FIELD_ADDRESS_BITS: usize = 8;

/// Flag bit positions in the first outer-header byte
const POSITIONAL_BIT: u8 = 0;
const REQUEST_BIT: u8 = 1;

/// Codec errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Encoding would overrun the frame buffer. A programmer/config error
    /// (oversized write batch), not a recoverable I/O failure.
    #[error("encode exceeds frame capacity ({needed} bits needed, {available} available)")]
    BufferFull { needed: usize, available: usize },

    /// `seal_header` called twice
    #[error("frame header is already sealed")]
    HeaderSealed,

    /// `encode` called before `seal_header`
    #[error("frame header must be sealed before encoding payload fields")]
    HeaderOpen,

    /// Point data type string did not parse to a wire scalar kind
    #[error("unknown data type `{0}`")]
    UnknownDataType(String),

    /// Field type tag outside the defined range
    #[error("invalid field type tag {0:#x}")]
    InvalidTag(u8),

    /// Frame ended in the middle of a field
    #[error("frame truncated mid-field")]
    Truncated,

    /// Frame shorter than the fixed header + trailer
    #[error("frame too short ({0} bytes)")]
    TooShort(usize),
}

/// Wire-level scalar type tag.
///
/// The tag value travels in every field sub-header and determines both the
/// encoded bit-width and the decoding rule applied by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScalarKind {
    UInt8 = 1,
    UInt16 = 2,
    UInt32 = 3,
    UInt64 = 4,
    Int8 = 5,
    Int16 = 6,
    Int32 = 7,
    Int64 = 8,
    /// 32-bit IEEE-754 (firmware `float`)
    Float = 9,
}

impl ScalarKind {
    /// Encoded value width in bits
    pub fn bits(&self) -> usize {
        match self {
            ScalarKind::UInt8 | ScalarKind::Int8 => 8,
            ScalarKind::UInt16 | ScalarKind::Int16 => 16,
            ScalarKind::UInt32 | ScalarKind::Int32 | ScalarKind::Float => 32,
            ScalarKind::UInt64 | ScalarKind::Int64 => 64,
        }
    }

    /// Wire tag value
    pub fn tag(&self) -> u8 {
        *self as u8
    }

    /// Recover a kind from a wire tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ScalarKind::UInt8),
            2 => Some(ScalarKind::UInt16),
            3 => Some(ScalarKind::UInt32),
            4 => Some(ScalarKind::UInt64),
            5 => Some(ScalarKind::Int8),
            6 => Some(ScalarKind::Int16),
            7 => Some(ScalarKind::Int32),
            8 => Some(ScalarKind::Int64),
            9 => Some(ScalarKind::Float),
            _ => None,
        }
    }
}

impl FromStr for ScalarKind {
    type Err = CodecError;

    /// Parse the point's declared data type. The host stores either a
    /// symbolic name (`"uint16"`) or the numeric tag (`"2"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uint8" | "uint_8" | "1" => Ok(ScalarKind::UInt8),
            "uint16" | "uint_16" | "2" => Ok(ScalarKind::UInt16),
            "uint32" | "uint_32" | "3" => Ok(ScalarKind::UInt32),
            "uint64" | "uint_64" | "4" => Ok(ScalarKind::UInt64),
            "int8" | "int_8" | "5" => Ok(ScalarKind::Int8),
            "int16" | "int_16" | "6" => Ok(ScalarKind::Int16),
            "int32" | "int_32" | "7" => Ok(ScalarKind::Int32),
            "int64" | "int_64" | "8" => Ok(ScalarKind::Int64),
            "float" | "float32" | "9" => Ok(ScalarKind::Float),
            other => Err(CodecError::UnknownDataType(other.to_string())),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::UInt8 => "uint8",
            ScalarKind::UInt16 => "uint16",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Int8 => "int8",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float => "float",
        };
        write!(f, "{}", name)
    }
}

/// A typed scalar value carried in a payload field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float(f32),
}

impl ScalarValue {
    /// The wire kind of this value
    pub fn kind(&self) -> ScalarKind {
        match self {
            ScalarValue::UInt8(_) => ScalarKind::UInt8,
            ScalarValue::UInt16(_) => ScalarKind::UInt16,
            ScalarValue::UInt32(_) => ScalarKind::UInt32,
            ScalarValue::UInt64(_) => ScalarKind::UInt64,
            ScalarValue::Int8(_) => ScalarKind::Int8,
            ScalarValue::Int16(_) => ScalarKind::Int16,
            ScalarValue::Int32(_) => ScalarKind::Int32,
            ScalarValue::Int64(_) => ScalarKind::Int64,
            ScalarValue::Float(_) => ScalarKind::Float,
        }
    }

    /// Narrow a host-side value (always an f64) to the point's declared
    /// kind. Out-of-range values saturate.
    pub fn from_f64(kind: ScalarKind, value: f64) -> Self {
        match kind {
            ScalarKind::UInt8 => ScalarValue::UInt8(value as u8),
            ScalarKind::UInt16 => ScalarValue::UInt16(value as u16),
            ScalarKind::UInt32 => ScalarValue::UInt32(value as u32),
            ScalarKind::UInt64 => ScalarValue::UInt64(value as u64),
            ScalarKind::Int8 => ScalarValue::Int8(value as i8),
            ScalarKind::Int16 => ScalarValue::Int16(value as i16),
            ScalarKind::Int32 => ScalarValue::Int32(value as i32),
            ScalarKind::Int64 => ScalarValue::Int64(value as i64),
            ScalarKind::Float => ScalarValue::Float(value as f32),
        }
    }

    /// Widen back to an f64 for the host
    pub fn as_f64(&self) -> f64 {
        match *self {
            ScalarValue::UInt8(v) => v as f64,
            ScalarValue::UInt16(v) => v as f64,
            ScalarValue::UInt32(v) => v as f64,
            ScalarValue::UInt64(v) => v as f64,
            ScalarValue::Int8(v) => v as f64,
            ScalarValue::Int16(v) => v as f64,
            ScalarValue::Int32(v) => v as f64,
            ScalarValue::Int64(v) => v as f64,
            ScalarValue::Float(v) => v as f64,
        }
    }

    /// Raw wire bits, right-aligned, plus their width
    fn to_bits(self) -> (u64, usize) {
        match self {
            ScalarValue::UInt8(v) => (v as u64, 8),
            ScalarValue::UInt16(v) => (v as u64, 16),
            ScalarValue::UInt32(v) => (v as u64, 32),
            ScalarValue::UInt64(v) => (v, 64),
            ScalarValue::Int8(v) => (v as u8 as u64, 8),
            ScalarValue::Int16(v) => (v as u16 as u64, 16),
            ScalarValue::Int32(v) => (v as u32 as u64, 32),
            ScalarValue::Int64(v) => (v as u64, 64),
            ScalarValue::Float(v) => (v.to_bits() as u64, 32),
        }
    }

    /// Rebuild a value from raw wire bits
    fn from_bits(kind: ScalarKind, raw: u64) -> Self {
        match kind {
            ScalarKind::UInt8 => ScalarValue::UInt8(raw as u8),
            ScalarKind::UInt16 => ScalarValue::UInt16(raw as u16),
            ScalarKind::UInt32 => ScalarValue::UInt32(raw as u32),
            ScalarKind::UInt64 => ScalarValue::UInt64(raw),
            ScalarKind::Int8 => ScalarValue::Int8(raw as u8 as i8),
            ScalarKind::Int16 => ScalarValue::Int16(raw as u16 as i16),
            ScalarKind::Int32 => ScalarValue::Int32(raw as u32 as i32),
            ScalarKind::Int64 => ScalarValue::Int64(raw as i64),
            ScalarKind::Float => ScalarValue::Float(f32::from_bits(raw as u32)),
        }
    }
}

/// Generate a message ID for a new outbound frame.
///
/// The only correctness requirement is a low collision probability among
/// concurrently in-flight writes; collisions are handled at enqueue time.
/// Zero is reserved for "no correlation".
pub fn generate_message_id() -> u16 {
    let mut rng = rand::thread_rng();
    loop {
        let id: u16 = rng.gen();
        if id != 0 {
            return id;
        }
    }
}

/// Outbound frame builder.
///
/// Owns the byte buffer and the bit cursor for one message; created fresh
/// per outbound write, handed off to the cipher, never shared. Keeping the
/// cursor inside one owned value is what prevents frame corruption when
/// mixed-width fields are packed back-to-back.
#[derive(Debug, Clone)]
pub struct SerialData {
    buffer: Vec<u8>,
    bit_pos: usize,
    header_sealed: bool,
}

impl SerialData {
    /// Allocate an empty maximum-size frame, cursor at zero
    pub fn new() -> Self {
        Self {
            buffer: vec![0u8; MAX_FRAME_LEN],
            bit_pos: 0,
            header_sealed: false,
        }
    }

    /// Set or clear the positional flag bit. Idempotent; does not disturb
    /// the other header bits.
    pub fn set_positional(&mut self, enabled: bool) {
        self.set_flag(POSITIONAL_BIT, enabled);
    }

    /// Set or clear the request flag bit
    pub fn set_request(&mut self, enabled: bool) {
        self.set_flag(REQUEST_BIT, enabled);
    }

    pub fn is_positional(&self) -> bool {
        self.buffer[0] & (1 << POSITIONAL_BIT) != 0
    }

    pub fn is_request(&self) -> bool {
        self.buffer[0] & (1 << REQUEST_BIT) != 0
    }

    fn set_flag(&mut self, bit: u8, enabled: bool) {
        if enabled {
            self.buffer[0] |= 1 << bit;
        } else {
            self.buffer[0] &= !(1 << bit);
        }
    }

    /// Write the message ID into its reserved header field
    pub fn set_message_id(&mut self, id: u16) {
        self.buffer[1..3].copy_from_slice(&id.to_be_bytes());
    }

    pub fn message_id(&self) -> u16 {
        u16::from_be_bytes([self.buffer[1], self.buffer[2]])
    }

    /// Advance the bit cursor past the outer and inner headers so that
    /// subsequent [`encode`](Self::encode) calls append payload bits.
    ///
    /// Must be called exactly once, after the header-flag mutations and
    /// before the first encode. Sealing twice is an error rather than a
    /// silent layout corruption.
    pub fn seal_header(&mut self) -> Result<(), CodecError> {
        if self.header_sealed {
            return Err(CodecError::HeaderSealed);
        }
        self.bit_pos = HEADER_BITS;
        self.header_sealed = true;
        Ok(())
    }

    /// Append one field (`[tag][address id][value]`) at the current bit
    /// cursor and advance it. Callable once per point value in a batch
    /// write; the cursor is never reset between calls.
    ///
    /// `address_id` identifies the point/register slot within the device.
    pub fn encode(&mut self, value: ScalarValue, address_id: u8) -> Result<(), CodecError> {
        if !self.header_sealed {
            return Err(CodecError::HeaderOpen);
        }
        let kind = value.kind();
        let needed = FIELD_TAG_BITS + FIELD_ADDRESS_BITS + kind.bits();
        let available = self.capacity_bits() - self.bit_pos;
        // Checked up-front so a rejected field never lands partially
        if needed > available {
            return Err(CodecError::BufferFull { needed, available });
        }
        self.write_bits(kind.tag() as u64, FIELD_TAG_BITS);
        self.write_bits(address_id as u64, FIELD_ADDRESS_BITS);
        let (raw, width) = value.to_bits();
        self.write_bits(raw, width);
        Ok(())
    }

    /// Consume the builder, returning the frame bytes: used payload bytes
    /// followed by the zeroed 4-byte CMAC trailer.
    pub fn into_frame(self) -> Vec<u8> {
        let used = ((self.bit_pos + 7) / 8).max(OUTER_HEADER_LEN + INNER_HEADER_LEN);
        let mut frame = self.buffer;
        frame.truncate(used);
        frame.extend_from_slice(&[0u8; CMAC_LEN]);
        frame
    }

    /// Payload capacity in bits, CMAC trailer excluded
    fn capacity_bits(&self) -> usize {
        (self.buffer.len() - CMAC_LEN) * 8
    }

    fn write_bits(&mut self, value: u64, bits: usize) {
        for i in (0..bits).rev() {
            let byte = self.bit_pos / 8;
            let offset = 7 - (self.bit_pos % 8);
            if (value >> i) & 1 != 0 {
                self.buffer[byte] |= 1 << offset;
            } else {
                self.buffer[byte] &= !(1 << offset);
            }
            self.bit_pos += 1;
        }
    }
}

impl Default for SerialData {
    fn default() -> Self {
        Self::new()
    }
}

/// One decoded payload field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionalField {
    pub address_id: u8,
    pub value: ScalarValue,
}

/// Decoded positional frame: the mirror of [`SerialData`]
#[derive(Debug, Clone, PartialEq)]
pub struct PositionalFrame {
    pub positional: bool,
    pub request: bool,
    pub message_id: u16,
    pub fields: Vec<PositionalField>,
}

impl PositionalFrame {
    /// Parse a positional frame from its raw bytes (headers + fields +
    /// CMAC trailer; the uplink address/RSSI/SNR wrapper is already
    /// stripped by the caller).
    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        let min = OUTER_HEADER_LEN + INNER_HEADER_LEN + CMAC_LEN;
        if bytes.len() < min {
            return Err(CodecError::TooShort(bytes.len()));
        }

        let positional = bytes[0] & (1 << POSITIONAL_BIT) != 0;
        let request = bytes[0] & (1 << REQUEST_BIT) != 0;
        let message_id = u16::from_be_bytes([bytes[1], bytes[2]]);

        let field_region = &bytes[OUTER_HEADER_LEN + INNER_HEADER_LEN..bytes.len() - CMAC_LEN];
        let mut reader = BitReader::new(field_region);
        let mut fields = Vec::new();

        while reader.remaining() >= FIELD_TAG_BITS + FIELD_ADDRESS_BITS {
            let tag = reader.read(FIELD_TAG_BITS) as u8;
            if tag == 0 {
                break;
            }
            let kind = ScalarKind::from_tag(tag).ok_or(CodecError::InvalidTag(tag))?;
            let address_id = reader.read(FIELD_ADDRESS_BITS) as u8;
            if reader.remaining() < kind.bits() {
                return Err(CodecError::Truncated);
            }
            let raw = reader.read(kind.bits());
            fields.push(PositionalField {
                address_id,
                value: ScalarValue::from_bits(kind, raw),
            });
        }

        Ok(Self {
            positional,
            request,
            message_id,
            fields,
        })
    }
}

/// MSB-first bit cursor over a byte slice
struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bit_pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() * 8 - self.bit_pos
    }

    /// Read up to 64 bits. Callers check `remaining()` first.
    fn read(&mut self, bits: usize) -> u64 {
        let mut value = 0u64;
        for _ in 0..bits {
            let byte = self.bit_pos / 8;
            let offset = 7 - (self.bit_pos % 8);
            value = (value << 1) | ((self.bytes[byte] >> offset) & 1) as u64;
            self.bit_pos += 1;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed() -> SerialData {
        let mut data = SerialData::new();
        data.seal_header().unwrap();
        data
    }

    #[test]
    fn test_flags_are_independent_and_idempotent() {
        let mut data = SerialData::new();
        data.set_positional(true);
        data.set_request(true);
        data.set_positional(true);
        assert!(data.is_positional());
        assert!(data.is_request());

        data.set_request(false);
        assert!(data.is_positional());
        assert!(!data.is_request());
    }

    #[test]
    fn test_message_id_field() {
        let mut data = SerialData::new();
        data.set_message_id(0xBEEF);
        assert_eq!(data.message_id(), 0xBEEF);
        // Flags live in a different byte
        assert!(!data.is_positional());
    }

    #[test]
    fn test_seal_header_exactly_once() {
        let mut data = SerialData::new();
        assert_eq!(
            data.encode(ScalarValue::UInt8(1), 0),
            Err(CodecError::HeaderOpen)
        );
        data.seal_header().unwrap();
        assert_eq!(data.seal_header(), Err(CodecError::HeaderSealed));
    }

    #[test]
    fn test_empty_frame_length() {
        let frame = sealed().into_frame();
        assert_eq!(frame.len(), OUTER_HEADER_LEN + INNER_HEADER_LEN + CMAC_LEN);
        assert_eq!(&frame[frame.len() - CMAC_LEN..], &[0u8; CMAC_LEN]);
    }

    #[test]
    fn test_round_trip_boundary_values() {
        let cases: Vec<ScalarValue> = vec![
            ScalarValue::UInt8(0),
            ScalarValue::UInt8(u8::MAX),
            ScalarValue::UInt16(0),
            ScalarValue::UInt16(u16::MAX),
            ScalarValue::UInt32(0),
            ScalarValue::UInt32(u32::MAX),
            ScalarValue::UInt64(0),
            ScalarValue::UInt64(u64::MAX),
            ScalarValue::Int8(i8::MIN),
            ScalarValue::Int8(i8::MAX),
            ScalarValue::Int16(i16::MIN),
            ScalarValue::Int16(i16::MAX),
            ScalarValue::Int32(i32::MIN),
            ScalarValue::Int32(i32::MAX),
            ScalarValue::Int64(i64::MIN),
            ScalarValue::Int64(i64::MAX),
            ScalarValue::Float(0.0),
            ScalarValue::Float(-273.15),
            ScalarValue::Float(f32::MAX),
        ];

        for value in cases {
            let mut data = sealed();
            data.encode(value, 7).unwrap();
            let frame = data.into_frame();
            let parsed = PositionalFrame::parse(&frame).unwrap();
            assert_eq!(parsed.fields.len(), 1, "{:?}", value);
            assert_eq!(parsed.fields[0].address_id, 7);
            assert_eq!(parsed.fields[0].value, value, "{:?}", value);
        }
    }

    #[test]
    fn test_batch_encode_mixed_widths() {
        let mut data = SerialData::new();
        data.set_positional(true);
        data.set_request(true);
        data.set_message_id(0x0102);
        data.seal_header().unwrap();

        data.encode(ScalarValue::UInt8(0xAB), 1).unwrap();
        data.encode(ScalarValue::Int16(-1234), 2).unwrap();
        data.encode(ScalarValue::Float(21.5), 3).unwrap();

        let parsed = PositionalFrame::parse(&data.into_frame()).unwrap();
        assert!(parsed.positional);
        assert!(parsed.request);
        assert_eq!(parsed.message_id, 0x0102);
        assert_eq!(parsed.fields.len(), 3);
        assert_eq!(parsed.fields[0].value, ScalarValue::UInt8(0xAB));
        assert_eq!(parsed.fields[1].address_id, 2);
        assert_eq!(parsed.fields[1].value, ScalarValue::Int16(-1234));
        assert_eq!(parsed.fields[2].value, ScalarValue::Float(21.5));
    }

    #[test]
    fn test_buffer_full_leaves_no_partial_field() {
        let mut data = sealed();
        // 64-bit fields are 76 bits each; the payload region holds
        // (64 - 4 - 7) * 8 = 424 bits, so the sixth field must fail.
        for i in 0..5 {
            data.encode(ScalarValue::UInt64(u64::MAX), i).unwrap();
        }
        let err = data.encode(ScalarValue::UInt64(1), 5).unwrap_err();
        assert!(matches!(err, CodecError::BufferFull { .. }));

        // The rejected field left nothing behind
        let parsed = PositionalFrame::parse(&data.into_frame()).unwrap();
        assert_eq!(parsed.fields.len(), 5);
    }

    #[test]
    fn test_parse_rejects_short_frames() {
        assert_eq!(
            PositionalFrame::parse(&[0u8; 10]),
            Err(CodecError::TooShort(10))
        );
    }

    #[test]
    fn test_parse_rejects_invalid_tag() {
        let mut data = sealed();
        data.encode(ScalarValue::UInt8(1), 0).unwrap();
        let mut frame = data.into_frame();
        // Overwrite the field's tag nibble with an undefined tag (0xF)
        frame[OUTER_HEADER_LEN + INNER_HEADER_LEN] = 0xF0;
        assert_eq!(
            PositionalFrame::parse(&frame),
            Err(CodecError::InvalidTag(0xF))
        );
    }

    #[test]
    fn test_parse_rejects_truncated_field() {
        let mut data = sealed();
        data.encode(ScalarValue::UInt64(42), 0).unwrap();
        let mut frame = data.into_frame();
        // Drop two payload bytes but keep the trailer length intact
        frame.truncate(frame.len() - CMAC_LEN - 2);
        frame.extend_from_slice(&[0u8; CMAC_LEN]);
        assert_eq!(PositionalFrame::parse(&frame), Err(CodecError::Truncated));
    }

    #[test]
    fn test_scalar_kind_parsing() {
        assert_eq!("uint16".parse::<ScalarKind>().unwrap(), ScalarKind::UInt16);
        assert_eq!("FLOAT".parse::<ScalarKind>().unwrap(), ScalarKind::Float);
        // Hosts that store the numeric tag
        assert_eq!("6".parse::<ScalarKind>().unwrap(), ScalarKind::Int16);
        assert!(matches!(
            "bool".parse::<ScalarKind>(),
            Err(CodecError::UnknownDataType(_))
        ));
    }

    #[test]
    fn test_generated_ids_are_nonzero() {
        for _ in 0..100 {
            assert_ne!(generate_message_id(), 0);
        }
    }
}
