//! # LoRaRAW Bridge Core
//!
//! This crate implements the host side of a LoRaRAW serial/radio bridge:
//! decoding uplink frames received from battery powered LoRa sensors, and
//! reliably delivering outbound point writes to actuator devices over an
//! unreliable, half-duplex, single-channel radio link.
//!
//! ## Architecture
//!
//! ```text
//! Uplink (device -> host):
//!
//!   raw hex frame ──► uplink validation ──► device lookup ──► format decode
//!                     (address / RSSI / SNR)                  (decoder table)
//!                                                                  │
//!                                    readings + ack message ID ◄───┘
//!                                                  │
//!                          host store ◄── push ────┤
//!                          write queue ◄── ack ────┘
//!
//! Downlink (host -> device):
//!
//!   point write ──► positional codec ──► write queue ──► worker
//!                   (SerialData)                           │
//!                                         encrypt + transmit, retry
//!                                         until acked or budget spent
//! ```
//!
//! The queue worker is the only long-lived activity; uplink decode and
//! write requests run on caller threads and share the queue behind a
//! single coarse lock.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use loraraw_core::{Config, InMemoryHost, LoraRawModule, PointWriter, Transport, TransportError};
//!
//! struct SerialPort;
//! impl Transport for SerialPort {
//!     fn transmit(&self, _frame: &[u8]) -> Result<(), TransportError> {
//!         Ok(())
//!     }
//! }
//!
//! let host = Arc::new(InMemoryHost::new());
//! let mut module = LoraRawModule::new("lora-raw", Config::default(), host, Arc::new(SerialPort));
//! module.enable()?;
//! module.write_point("pnt-1", &PointWriter::single(21.5))?;
//! module.handle_uplink("aabbccdd0100640e000000000000000000001428")?;
//! module.disable()?;
//! # Ok::<(), loraraw_core::ModuleError>(())
//! ```

pub mod codec;
pub mod config;
pub mod crypto;
pub mod decoder;
pub mod host;
pub mod module;
pub mod queue;
pub mod uplink;
pub mod worker;

// Re-export main types
pub use codec::{generate_message_id, CodecError, PositionalFrame, ScalarKind, ScalarValue, SerialData};
pub use config::Config;
pub use crypto::{encrypt, resolve_key, CryptoError, DeviceKey};
pub use decoder::{DecodeError, DecodedUplink, FrameFormat, PointReading};
pub use host::{Device, HostError, HostStore, InMemoryHost, Network, Point, PointWriter};
pub use module::{LoraRawModule, ModuleError};
pub use queue::{PendingPointWrite, PointWriteQueue, QueueError, WriteQueueConfig};
pub use uplink::{decode_address, decode_rssi, decode_snr, valid_payload, CommonValues, UplinkError};
pub use worker::{Transport, TransportError, WriteQueueWorker};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{ScalarKind, ScalarValue, SerialData};
    pub use crate::config::Config;
    pub use crate::decoder::FrameFormat;
    pub use crate::host::{HostStore, PointWriter};
    pub use crate::module::LoraRawModule;
    pub use crate::worker::Transport;
}
