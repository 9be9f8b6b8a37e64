//! Device decoder table
//!
//! Maps a device's declared frame format to the decode routine that turns
//! a validated uplink frame into point readings plus the common signal
//! metrics. The set of formats is closed and dispatched by an explicit
//! tag; adding a device family means adding a variant here.

use std::str::FromStr;

use thiserror::Error;

use crate::codec::{CodecError, PositionalFrame};
use crate::uplink::{CommonValues, UplinkError};

/// Decode errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error(transparent)]
    Uplink(#[from] UplinkError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Device declared a frame format this bridge does not know
    #[error("unknown device frame format `{0}`")]
    UnknownFormat(String),

    /// Frame body shorter than the format's fixed layout
    #[error("frame body too short for {format} layout ({len} bytes)")]
    LayoutTooShort { format: &'static str, len: usize },

    /// Frame body hex did not decode to whole bytes
    #[error("frame body is not whole hex bytes")]
    OddLength,
}

/// One decoded point value
#[derive(Debug, Clone, PartialEq)]
pub struct PointReading {
    /// Point name within the device
    pub name: String,
    /// Register slot for positional frames
    pub address_id: Option<u8>,
    pub value: f64,
}

impl PointReading {
    fn named(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            address_id: None,
            value,
        }
    }
}

/// A fully decoded uplink frame
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedUplink {
    pub common: CommonValues,
    pub readings: Vec<PointReading>,
    /// Message ID carried by a positional frame, correlating an earlier
    /// write with this uplink
    pub acked_message_id: Option<u16>,
}

/// Per-device decode strategy, keyed by the device's declared frame format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    /// Bit-packed positional frames, the mirror of the outbound codec
    Positional,
    /// Droplet environment sensor, fixed layout
    Droplet,
    /// MicroEdge pulse/analog sensor, fixed layout
    MicroEdge,
}

impl FromStr for FrameFormat {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" | "loraraw" => Ok(FrameFormat::Positional),
            "droplet" | "thlm" => Ok(FrameFormat::Droplet),
            "microedge" | "micro-edge" | "me" => Ok(FrameFormat::MicroEdge),
            other => Err(DecodeError::UnknownFormat(other.to_string())),
        }
    }
}

impl FrameFormat {
    /// Decode a validated uplink frame into readings plus common values.
    ///
    /// `sensor` is the device model name attached to the common values.
    pub fn decode(&self, data: &str, sensor: &str) -> Result<DecodedUplink, DecodeError> {
        let common = CommonValues::decode(data, sensor)?;
        let body = body_bytes(data)?;
        match self {
            FrameFormat::Positional => decode_positional(common, &body),
            FrameFormat::Droplet => decode_droplet(common, &body),
            FrameFormat::MicroEdge => decode_micro_edge(common, &body),
        }
    }
}

/// The frame body: everything between the address prefix and the
/// RSSI/SNR trailer, as raw bytes. Frames short enough for the trailer
/// to overlap the address have no body at all.
fn body_bytes(data: &str) -> Result<Vec<u8>, DecodeError> {
    if data.len() < 12 {
        return Ok(Vec::new());
    }
    let body_hex = &data[8..data.len() - 4];
    if body_hex.len() % 2 != 0 {
        return Err(DecodeError::OddLength);
    }
    // Hex validity was checked by CommonValues::decode
    hex::decode(body_hex).map_err(|_| DecodeError::OddLength)
}

fn decode_positional(common: CommonValues, body: &[u8]) -> Result<DecodedUplink, DecodeError> {
    let frame = PositionalFrame::parse(body)?;
    let readings = frame
        .fields
        .iter()
        .map(|f| PointReading {
            name: format!("addr_{}", f.address_id),
            address_id: Some(f.address_id),
            value: f.value.as_f64(),
        })
        .collect();
    let acked_message_id = (frame.message_id != 0).then_some(frame.message_id);
    Ok(DecodedUplink {
        common,
        readings,
        acked_message_id,
    })
}

/// Droplet layout after the address: temperature i16/100 degC, pressure
/// u16/10, humidity u8 & 0x7F %, battery u8/50 V, light u16 lux, motion
/// flag byte.
fn decode_droplet(common: CommonValues, body: &[u8]) -> Result<DecodedUplink, DecodeError> {
    if body.len() < 9 {
        return Err(DecodeError::LayoutTooShort {
            format: "droplet",
            len: body.len(),
        });
    }
    let temperature = i16::from_be_bytes([body[0], body[1]]) as f64 / 100.0;
    let pressure = u16::from_be_bytes([body[2], body[3]]) as f64 / 10.0;
    let humidity = (body[4] & 0x7F) as f64;
    let voltage = body[5] as f64 / 50.0;
    let light = u16::from_be_bytes([body[6], body[7]]) as f64;
    let motion = if body[8] != 0 { 1.0 } else { 0.0 };

    Ok(DecodedUplink {
        common,
        readings: vec![
            PointReading::named("temp", temperature),
            PointReading::named("pressure", pressure),
            PointReading::named("humidity", humidity),
            PointReading::named("voltage", voltage),
            PointReading::named("light", light),
            PointReading::named("motion", motion),
        ],
        acked_message_id: None,
    })
}

/// MicroEdge layout after the address: pulse count u32, battery u8/50 V,
/// three analog inputs u16.
fn decode_micro_edge(common: CommonValues, body: &[u8]) -> Result<DecodedUplink, DecodeError> {
    if body.len() < 11 {
        return Err(DecodeError::LayoutTooShort {
            format: "microedge",
            len: body.len(),
        });
    }
    let pulses = u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as f64;
    let voltage = body[4] as f64 / 50.0;
    let ai1 = u16::from_be_bytes([body[5], body[6]]) as f64;
    let ai2 = u16::from_be_bytes([body[7], body[8]]) as f64;
    let ai3 = u16::from_be_bytes([body[9], body[10]]) as f64;

    Ok(DecodedUplink {
        common,
        readings: vec![
            PointReading::named("pulses", pulses),
            PointReading::named("voltage", voltage),
            PointReading::named("ai1", ai1),
            PointReading::named("ai2", ai2),
            PointReading::named("ai3", ai3),
        ],
        acked_message_id: None,
    })
}
