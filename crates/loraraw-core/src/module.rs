//! Module handle and lifecycle
//!
//! [`LoraRawModule`] is the explicit handle tying the subsystems
//! together; every entry point takes it, there is no process-wide
//! singleton. The host constructs it, enables it once networks are
//! routable, and routes uplinks and write requests at it from its own
//! execution contexts.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{generate_message_id, CodecError, ScalarKind, ScalarValue, SerialData};
use crate::config::Config;
use crate::crypto::CryptoError;
use crate::decoder::{DecodeError, DecodedUplink, FrameFormat};
use crate::host::{HostError, HostStore, Point, PointWriter};
use crate::queue::{lock, PendingPointWrite, PointWriteQueue, QueueError};
use crate::uplink::{decode_address, valid_payload, UplinkError, COMMON_VALUE_NAMES};
use crate::worker::{Transport, WorkerContext, WriteQueueWorker};

/// Attempts to find a message ID free among in-flight writes
const MESSAGE_ID_ATTEMPTS: u32 = 8;

/// Module-level errors
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("module is already enabled")]
    AlreadyEnabled,

    #[error("module is not enabled")]
    NotEnabled,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Uplink(#[from] UplinkError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("failed to spawn write queue worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("no device registered for address {0}")]
    UnknownDevice(String),

    #[error("write carries no values")]
    EmptyWrite,

    #[error("could not allocate a unique message id after {0} attempts")]
    MessageIdExhausted(u32),
}

/// The LoRaRAW bridge module
pub struct LoraRawModule {
    /// Plugin name the host registered this module under
    name: String,
    config: Config,
    host: Arc<dyn HostStore>,
    transport: Arc<dyn Transport>,
    queue: Arc<Mutex<PointWriteQueue>>,
    worker: Option<WriteQueueWorker>,
    network_uuid: Option<String>,
    enabled: bool,
}

impl LoraRawModule {
    pub fn new(
        name: impl Into<String>,
        config: Config,
        host: Arc<dyn HostStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let queue = Arc::new(Mutex::new(PointWriteQueue::new(config.queue_config())));
        Self {
            name: name.into(),
            config,
            host,
            transport,
            queue,
            worker: None,
            network_uuid: None,
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Message IDs currently awaiting acknowledgment
    pub fn pending_message_ids(&self) -> Vec<u16> {
        lock(&self.queue).pending_ids()
    }

    /// Enable the module: discover networks, rehydrate pending writes and
    /// start the queue worker.
    ///
    /// Host unavailability is not fatal; the module enables degraded with
    /// an empty network set.
    pub fn enable(&mut self) -> Result<(), ModuleError> {
        if self.enabled {
            return Err(ModuleError::AlreadyEnabled);
        }
        info!(module = %self.name, "enabling");

        let networks = match self.host.networks_by_plugin(&self.name) {
            Ok(networks) => networks,
            Err(e) => {
                warn!(error = %e, "host unavailable, enabling with no networks");
                Vec::new()
            }
        };

        self.queue = Arc::new(Mutex::new(PointWriteQueue::new(self.config.queue_config())));

        match networks.first() {
            Some(network) => {
                self.network_uuid = Some(network.uuid.clone());
                match self.host.points_with_pending_write(&network.uuid) {
                    Ok(points) => {
                        let loaded = self.rehydrate(points);
                        if loaded > 0 {
                            info!(count = loaded, "rehydrated pending writes");
                        }
                    }
                    Err(e) => warn!(error = %e, "could not fetch pending points"),
                }
            }
            None => warn!("no LoRaRAW networks exist"),
        }

        let ctx = WorkerContext {
            queue: Arc::clone(&self.queue),
            host: Arc::clone(&self.host),
            transport: Arc::clone(&self.transport),
            default_key: self.config.default_key.clone(),
            idle_tick: self.config.idle_tick(),
        };
        self.worker = Some(WriteQueueWorker::spawn(ctx).map_err(ModuleError::WorkerSpawn)?);

        self.enabled = true;
        info!(module = %self.name, "enabled");
        Ok(())
    }

    /// Disable the module: signal the worker once and wait for it to
    /// finish its current attempt and exit.
    pub fn disable(&mut self) -> Result<(), ModuleError> {
        if !self.enabled {
            return Err(ModuleError::NotEnabled);
        }
        info!(module = %self.name, "disabling");
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        self.enabled = false;
        info!(module = %self.name, "disabled");
        Ok(())
    }

    /// Process one raw uplink frame from the radio bridge.
    ///
    /// Validates the envelope, decodes per the device's declared frame
    /// format, pushes the readings (plus RSSI/SNR) to the host and
    /// acknowledges any carried message ID against the write queue.
    pub fn handle_uplink(&self, raw: &str) -> Result<DecodedUplink, ModuleError> {
        let raw = raw.trim();
        if !valid_payload(raw) {
            return Err(UplinkError::TooShort(raw.len()).into());
        }
        let address = decode_address(raw);
        let device = self
            .host
            .device_by_address(address)?
            .ok_or_else(|| ModuleError::UnknownDevice(address.to_string()))?;

        let format: FrameFormat = device.model.parse()?;
        let decoded = format.decode(raw, &device.model)?;
        debug!(
            address,
            device = %device.uuid,
            readings = decoded.readings.len(),
            rssi = decoded.common.rssi,
            snr = decoded.common.snr,
            "decoded uplink"
        );

        for reading in &decoded.readings {
            if let Err(e) = self.host.push_reading(&device.uuid, &reading.name, reading.value) {
                warn!(point = %reading.name, error = %e, "could not push reading");
            }
        }
        let [rssi_name, snr_name] = COMMON_VALUE_NAMES;
        let _ = self
            .host
            .push_reading(&device.uuid, rssi_name, decoded.common.rssi as f64);
        let _ = self
            .host
            .push_reading(&device.uuid, snr_name, decoded.common.snr as f64);

        if let Some(id) = decoded.acked_message_id {
            self.acknowledge(id);
        }

        Ok(decoded)
    }

    /// Accept a point write: encode it into a positional frame, queue it
    /// for retried delivery and record it on the host.
    ///
    /// Any validation failure (unknown data type, oversized batch) aborts
    /// the entire outbound message; nothing partial is ever enqueued.
    pub fn write_point(&self, point_uuid: &str, writer: &PointWriter) -> Result<Point, ModuleError> {
        if !self.enabled {
            return Err(ModuleError::NotEnabled);
        }
        let point = self.host.point(point_uuid)?;
        let pending = self.build_pending(&point, writer)?;
        let message_id = pending.message_id;

        lock(&self.queue).enqueue(pending)?;
        info!(point = %point_uuid, message_id, "queued point write");

        Ok(self.host.write_point(point_uuid, writer)?)
    }

    /// UUID of the network this module is serving, once enabled
    pub fn network_uuid(&self) -> Option<&str> {
        self.network_uuid.as_deref()
    }

    /// Rebuild queue entries for points the host reports as still
    /// write-pending. Individual failures are logged and skipped so one
    /// broken point cannot block recovery of the rest.
    fn rehydrate(&self, points: Vec<Point>) -> usize {
        let mut writes = Vec::new();
        for point in points {
            let value = match point.write_value {
                Some(value) => value,
                None => {
                    warn!(point = %point.uuid, "pending write has no value, skipping");
                    continue;
                }
            };
            match self.build_pending(&point, &PointWriter::single(value)) {
                Ok(write) => writes.push(write),
                Err(e) => warn!(point = %point.uuid, error = %e, "could not rebuild pending write"),
            }
        }
        lock(&self.queue).load_pending(writes)
    }

    /// Build the queue entry for a write request
    fn build_pending(&self, point: &Point, writer: &PointWriter) -> Result<PendingPointWrite, ModuleError> {
        let kind: ScalarKind = point.data_type.parse()?;
        let device = self.host.device(&point.device_uuid)?;

        let mut data = SerialData::new();
        data.set_positional(true);
        data.set_request(true);
        let message_id = self.allocate_message_id()?;
        data.set_message_id(message_id);
        data.seal_header()?;

        let mut encoded = 0;
        for value in writer.values() {
            data.encode(ScalarValue::from_f64(kind, value), point.address_id)?;
            encoded += 1;
        }
        if encoded == 0 {
            return Err(ModuleError::EmptyWrite);
        }

        Ok(PendingPointWrite {
            message_id,
            frame: data.into_frame(),
            point_uuid: point.uuid.clone(),
            device_uuid: device.uuid.clone(),
            address: device.address.clone(),
            enqueued_at: Instant::now(),
            attempt_count: 0,
            last_attempt: None,
        })
    }

    /// Generate a message ID that does not collide with an in-flight
    /// write. Collisions are regenerated, never silently overwritten.
    fn allocate_message_id(&self) -> Result<u16, ModuleError> {
        let queue = lock(&self.queue);
        for _ in 0..MESSAGE_ID_ATTEMPTS {
            let id = generate_message_id();
            if !queue.contains(id) {
                return Ok(id);
            }
        }
        Err(ModuleError::MessageIdExhausted(MESSAGE_ID_ATTEMPTS))
    }

    /// Remove the queue entry matching an uplink-observed message ID and
    /// report the completed write to the host.
    fn acknowledge(&self, message_id: u16) {
        let acked = lock(&self.queue).acknowledge(message_id);
        match acked {
            Some(write) => {
                info!(
                    message_id,
                    point = %write.point_uuid,
                    attempts = write.attempt_count,
                    "write acknowledged"
                );
                if let Err(e) = self.host.mark_write_complete(&write.point_uuid) {
                    warn!(point = %write.point_uuid, error = %e, "could not record completion");
                }
            }
            // Stale or colliding ID: first match already won
            None => debug!(message_id, "ack with no matching write"),
        }
    }
}

impl Drop for LoraRawModule {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Device, InMemoryHost, Network};
    use crate::worker::TransportError;

    struct NullTransport;

    impl Transport for NullTransport {
        fn transmit(&self, _frame: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn sample_host() -> Arc<InMemoryHost> {
        let host = Arc::new(InMemoryHost::new());
        host.add_network(Network {
            uuid: "net-1".to_string(),
            name: "site".to_string(),
            plugin: "lora-raw".to_string(),
        });
        host.add_device(Device {
            uuid: "dev-1".to_string(),
            network_uuid: "net-1".to_string(),
            name: "relay".to_string(),
            address: "aabbccdd".to_string(),
            model: "positional".to_string(),
            key_hex: None,
        });
        host.add_point(Point {
            uuid: "pnt-1".to_string(),
            device_uuid: "dev-1".to_string(),
            name: "setpoint".to_string(),
            address_id: 1,
            data_type: "float".to_string(),
            write_pending: false,
            write_value: None,
        });
        host
    }

    fn module(host: Arc<InMemoryHost>) -> LoraRawModule {
        let mut config = Config::default();
        config.write_queue_timeout_ms = 50;
        config.re_iteration_time_ms = 20;
        LoraRawModule::new("lora-raw", config, host, Arc::new(NullTransport))
    }

    #[test]
    fn test_enable_disable_lifecycle() {
        let mut module = module(sample_host());
        assert!(!module.is_enabled());
        module.enable().unwrap();
        assert!(module.is_enabled());
        assert!(matches!(module.enable(), Err(ModuleError::AlreadyEnabled)));
        module.disable().unwrap();
        assert!(matches!(module.disable(), Err(ModuleError::NotEnabled)));
    }

    #[test]
    fn test_enable_degrades_without_networks() {
        let host = Arc::new(InMemoryHost::new());
        let mut module = module(host);
        module.enable().unwrap();
        assert!(module.is_enabled());
        module.disable().unwrap();
    }

    #[test]
    fn test_write_point_requires_enable() {
        let module = module(sample_host());
        assert!(matches!(
            module.write_point("pnt-1", &PointWriter::single(1.0)),
            Err(ModuleError::NotEnabled)
        ));
    }

    #[test]
    fn test_write_point_queues_and_marks_pending() {
        let host = sample_host();
        let mut module = module(Arc::clone(&host));
        module.enable().unwrap();

        let point = module.write_point("pnt-1", &PointWriter::single(21.5)).unwrap();
        assert!(point.write_pending);
        assert_eq!(module.pending_message_ids().len(), 1);

        module.disable().unwrap();
    }

    #[test]
    fn test_write_point_rejects_bad_data_type() {
        let host = sample_host();
        host.add_point(Point {
            uuid: "pnt-2".to_string(),
            device_uuid: "dev-1".to_string(),
            name: "broken".to_string(),
            address_id: 2,
            data_type: "bool".to_string(),
            write_pending: false,
            write_value: None,
        });
        let mut module = module(Arc::clone(&host));
        module.enable().unwrap();

        assert!(matches!(
            module.write_point("pnt-2", &PointWriter::single(1.0)),
            Err(ModuleError::Codec(CodecError::UnknownDataType(_)))
        ));
        // The aborted message never reached the queue
        assert!(module.pending_message_ids().is_empty());

        module.disable().unwrap();
    }

    #[test]
    fn test_write_point_rejects_empty_writer() {
        let host = sample_host();
        let mut module = module(Arc::clone(&host));
        module.enable().unwrap();
        assert!(matches!(
            module.write_point("pnt-1", &PointWriter::default()),
            Err(ModuleError::EmptyWrite)
        ));
        module.disable().unwrap();
    }

    #[test]
    fn test_uplink_unknown_device() {
        let module = module(sample_host());
        assert!(matches!(
            module.handle_uplink("1122334400ff0a28"),
            Err(ModuleError::UnknownDevice(_))
        ));
    }

    #[test]
    fn test_uplink_pushes_readings_and_common_values() {
        let host = sample_host();
        let module = module(Arc::clone(&host));

        let mut data = SerialData::new();
        data.set_positional(true);
        data.seal_header().unwrap();
        data.encode(ScalarValue::Float(19.25), 1).unwrap();
        let raw = format!("aabbccdd{}0a28", hex::encode(data.into_frame()));

        let decoded = module.handle_uplink(&raw).unwrap();
        assert_eq!(decoded.common.rssi, -10);

        let readings = host.readings();
        assert!(readings
            .iter()
            .any(|(_, name, value)| name == "addr_1" && *value == 19.25));
        assert!(readings.iter().any(|(_, name, _)| name == "rssi"));
        assert!(readings.iter().any(|(_, name, _)| name == "snr"));
    }

    #[test]
    fn test_uplink_ack_completes_write() {
        let host = sample_host();
        let mut module = module(Arc::clone(&host));
        module.enable().unwrap();

        module.write_point("pnt-1", &PointWriter::single(21.5)).unwrap();
        let id = module.pending_message_ids()[0];

        // Device echoes the message ID in a positional uplink
        let mut data = SerialData::new();
        data.set_positional(true);
        data.set_message_id(id);
        data.seal_header().unwrap();
        let raw = format!("aabbccdd{}0a28", hex::encode(data.into_frame()));
        module.handle_uplink(&raw).unwrap();

        assert!(module.pending_message_ids().is_empty());
        assert_eq!(host.completed_writes(), vec!["pnt-1".to_string()]);
        assert!(!host.point("pnt-1").unwrap().write_pending);

        module.disable().unwrap();
    }

    #[test]
    fn test_rehydration_on_enable() {
        let host = sample_host();
        host.add_point(Point {
            uuid: "pnt-9".to_string(),
            device_uuid: "dev-1".to_string(),
            name: "stuck".to_string(),
            address_id: 9,
            data_type: "uint16".to_string(),
            write_pending: true,
            write_value: Some(500.0),
        });
        let mut module = module(Arc::clone(&host));
        module.enable().unwrap();

        assert_eq!(module.pending_message_ids().len(), 1);
        module.disable().unwrap();
    }
}
