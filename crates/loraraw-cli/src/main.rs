//! LoRaRAW Frame Tool
//!
//! Command-line companion for the bridge core:
//! - Decoding captured uplink frames (address, signal metrics, readings)
//! - Encoding point writes into positional frames
//! - Producing the exact encrypted bytes a device would receive

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loraraw_core::{
    encrypt, generate_message_id, DeviceKey, FrameFormat, ScalarKind, ScalarValue, SerialData,
};
use tracing::debug;

#[derive(Parser)]
#[command(name = "loraraw")]
#[command(version, about = "LoRaRAW frame tool", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an uplink frame captured from the bridge
    Decode {
        /// Raw uplink frame as ASCII hex
        frame: String,

        /// Device frame format (positional, droplet, microedge)
        #[arg(long, default_value = "positional")]
        format: String,
    },

    /// Encode a point write into a positional frame
    Encode {
        /// Value(s) to write; repeat for a batch sharing one frame
        #[arg(short = 'V', long = "value", required = true)]
        values: Vec<f64>,

        /// Wire data type (uint8..uint64, int8..int64, float)
        #[arg(long, default_value = "float")]
        data_type: String,

        /// Register slot within the device
        #[arg(long, default_value = "0")]
        address_id: u8,

        /// Message ID; random when omitted
        #[arg(long)]
        message_id: Option<u16>,

        /// Encrypt with this hex key material
        #[arg(long)]
        key: Option<String>,

        /// Device address feeding nonce derivation
        #[arg(long, default_value = "00000000")]
        address: String,
    },
}

fn cmd_decode(frame: String, format: String) -> Result<()> {
    let format: FrameFormat = format
        .parse()
        .with_context(|| format!("unsupported format `{format}`"))?;
    let decoded = format
        .decode(frame.trim(), "cli")
        .context("frame did not decode")?;

    println!("address:  {}", decoded.common.id);
    println!("rssi:     {} dBm", decoded.common.rssi);
    println!("snr:      {} dB", decoded.common.snr);
    if let Some(id) = decoded.acked_message_id {
        println!("msg id:   {id:#06x}");
    }
    if decoded.readings.is_empty() {
        println!("readings: (none)");
    }
    for reading in &decoded.readings {
        println!("  {:<12} {}", reading.name, reading.value);
    }
    Ok(())
}

fn cmd_encode(
    values: Vec<f64>,
    data_type: String,
    address_id: u8,
    message_id: Option<u16>,
    key: Option<String>,
    address: String,
) -> Result<()> {
    let kind: ScalarKind = data_type
        .parse()
        .with_context(|| format!("unsupported data type `{data_type}`"))?;

    let mut data = SerialData::new();
    data.set_positional(true);
    data.set_request(true);
    let id = message_id.unwrap_or_else(generate_message_id);
    data.set_message_id(id);
    data.seal_header().context("header")?;
    for value in &values {
        data.encode(ScalarValue::from_f64(kind, *value), address_id)
            .context("frame capacity exceeded")?;
    }
    let frame = data.into_frame();
    debug!(fields = values.len(), bytes = frame.len(), "frame built");

    println!("message id: {id:#06x}");
    println!("plaintext:  {}", hex::encode(&frame));

    if let Some(key_hex) = key {
        let key = DeviceKey::from_hex(&key_hex).context("key material")?;
        let payload = encrypt(&address, &frame, &key, 0).context("encryption")?;
        println!("encrypted:  {}", hex::encode(payload));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Decode { frame, format } => cmd_decode(frame, format),

        Commands::Encode {
            values,
            data_type,
            address_id,
            message_id,
            key,
            address,
        } => cmd_encode(values, data_type, address_id, message_id, key, address),
    }
}
