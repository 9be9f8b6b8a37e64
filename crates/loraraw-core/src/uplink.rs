//! Uplink frame validation and signal metrics
//!
//! Every frame received from the radio bridge is an ASCII-hex string with
//! the layout `[4-byte address][payload...][1-byte RSSI][1-byte SNR]`.
//! This module validates the envelope, extracts the device address and
//! decodes the trailing signal metrics that get attached to every point
//! reading derived from the frame.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hex characters that make up the address prefix
const ADDRESS_HEX_LEN: usize = 8;
/// Hex characters for the RSSI + SNR trailer
const TRAILER_HEX_LEN: usize = 4;

/// Names under which the common signal metrics are pushed as readings
pub const COMMON_VALUE_NAMES: [&str; 2] = ["rssi", "snr"];

/// Uplink envelope errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UplinkError {
    /// Frame shorter than address + one payload hex char
    #[error("uplink frame too short ({0} hex chars)")]
    TooShort(usize),

    /// Frame contains non-hex characters
    #[error("uplink frame is not valid hex")]
    InvalidHex,
}

/// A frame is considered valid when it is longer than the 8 hex chars of
/// the address prefix.
pub fn valid_payload(data: &str) -> bool {
    data.len() > ADDRESS_HEX_LEN
}

/// The device address: the first 8 hex characters (4 bytes).
///
/// Callers validate with [`valid_payload`] first.
pub fn decode_address(data: &str) -> &str {
    &data[..ADDRESS_HEX_LEN]
}

/// RSSI from the two hex chars before the trailing SNR byte, negated:
/// the radio reports a magnitude and RSSI is always <= 0 dBm in this
/// radio's convention.
pub fn decode_rssi(data: &str) -> Result<i32, UplinkError> {
    if data.len() < TRAILER_HEX_LEN {
        return Err(UplinkError::TooShort(data.len()));
    }
    let raw = &data[data.len() - 4..data.len() - 2];
    let v = i64::from_str_radix(raw, 16).map_err(|_| UplinkError::InvalidHex)?;
    Ok(-(v as i32))
}

/// SNR from the final two hex chars.
///
/// Values above 127 are a two's-complement signed byte (a whole number of
/// dB); values up to 127 are in quarter-dB resolution. The asymmetry is a
/// firmware quirk and the 127/128 boundary is exact.
pub fn decode_snr(data: &str) -> Result<f32, UplinkError> {
    if data.len() < 2 {
        return Err(UplinkError::TooShort(data.len()));
    }
    let raw = &data[data.len() - 2..];
    let v = i64::from_str_radix(raw, 16).map_err(|_| UplinkError::InvalidHex)?;
    Ok(if v > 127 {
        (v - 256) as f32
    } else {
        v as f32 / 4.0
    })
}

/// Signal metrics and identity decoded once per valid uplink frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonValues {
    /// Device model/sensor name
    pub sensor: String,
    /// Device address prefix
    pub id: String,
    /// Received signal strength, dBm
    pub rssi: i32,
    /// Signal-to-noise ratio, dB
    pub snr: f32,
}

impl CommonValues {
    /// Validate the envelope and decode the common values
    pub fn decode(data: &str, sensor: &str) -> Result<Self, UplinkError> {
        if !valid_payload(data) {
            return Err(UplinkError::TooShort(data.len()));
        }
        if !data.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(UplinkError::InvalidHex);
        }
        Ok(Self {
            sensor: sensor.to_string(),
            id: decode_address(data).to_string(),
            rssi: decode_rssi(data)?,
            snr: decode_snr(data)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_payload_boundary() {
        assert!(!valid_payload(""));
        assert!(!valid_payload("aabbccdd")); // exactly 8: address only
        assert!(valid_payload("aabbccdd0")); // 9: minimum valid
    }

    #[test]
    fn test_decode_address_is_prefix() {
        assert_eq!(decode_address("aabbccdd0102030405"), "aabbccdd");
    }

    #[test]
    fn test_decode_rssi_negates_magnitude() {
        // "0A" before the trailing SNR byte => -10 dBm
        assert_eq!(decode_rssi("aabbccdd000a00").unwrap(), -10);
        assert_eq!(decode_rssi("aabbccdd006400").unwrap(), -100);
        assert_eq!(decode_rssi("aabbccdd000000").unwrap(), 0);
    }

    #[test]
    fn test_decode_snr_boundaries() {
        // v = 128 => -128.0 (signed interpretation begins)
        assert_eq!(decode_snr("aabbccdd0080").unwrap(), -128.0);
        // v = 127 => 127 / 4 = 31.75 (last quarter-dB value)
        assert_eq!(decode_snr("aabbccdd007f").unwrap(), 31.75);
        // v = 255 => -1.0
        assert_eq!(decode_snr("aabbccdd00ff").unwrap(), -1.0);
        // v = 0 => 0.0
        assert_eq!(decode_snr("aabbccdd0000").unwrap(), 0.0);
        // v = 40 => 10.0 dB
        assert_eq!(decode_snr("aabbccdd0028").unwrap(), 10.0);
    }

    #[test]
    fn test_common_values_decode() {
        let common = CommonValues::decode("aabbccdd12340a28", "droplet").unwrap();
        assert_eq!(common.sensor, "droplet");
        assert_eq!(common.id, "aabbccdd");
        assert_eq!(common.rssi, -10);
        assert_eq!(common.snr, 10.0);
    }

    #[test]
    fn test_common_values_rejects_bad_frames() {
        assert_eq!(
            CommonValues::decode("aabbccdd", "x"),
            Err(UplinkError::TooShort(8))
        );
        assert_eq!(
            CommonValues::decode("aabbccddzz340a28", "x"),
            Err(UplinkError::InvalidHex)
        );
    }
}
