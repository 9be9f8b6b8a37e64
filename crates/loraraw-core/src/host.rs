//! Host store capability
//!
//! The bridge does not own network/device/point persistence; a remote
//! host service does. This module defines the narrow call surface the
//! core consumes, the minimal models it needs (nothing beyond the fields
//! the codec and the queue read), and an in-memory implementation that
//! serves both as the test double and as a standalone-run store.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::queue::lock;

/// Host store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The host service could not be reached
    #[error("host unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} {uuid} not found")]
    NotFound { kind: &'static str, uuid: String },
}

impl HostError {
    fn not_found(kind: &'static str, uuid: &str) -> Self {
        HostError::NotFound {
            kind,
            uuid: uuid.to_string(),
        }
    }
}

/// A LoRaRAW network owned by this plugin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub uuid: String,
    pub name: String,
    /// Plugin name the network is bound to
    pub plugin: String,
}

/// A radio device on a network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub uuid: String,
    pub network_uuid: String,
    pub name: String,
    /// 8-hex-char radio address, the uplink prefix
    pub address: String,
    /// Declared frame format (see [`crate::decoder::FrameFormat`])
    pub model: String,
    /// Device-specific encryption key material; module default when None
    pub key_hex: Option<String>,
}

/// A point (register) on a device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Point {
    pub uuid: String,
    pub device_uuid: String,
    pub name: String,
    /// Register slot within the device frame
    pub address_id: u8,
    /// Declared wire data type (see [`crate::codec::ScalarKind`])
    pub data_type: String,
    /// A write was accepted but not yet acknowledged by the device
    pub write_pending: bool,
    /// Last requested write value
    pub write_value: Option<f64>,
}

/// A point write request: a 16-slot priority array, highest first.
/// Every non-null slot is encoded into the outbound frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointWriter {
    pub priority: Vec<Option<f64>>,
}

impl PointWriter {
    /// A single-value write at top priority
    pub fn single(value: f64) -> Self {
        Self {
            priority: vec![Some(value)],
        }
    }

    /// The non-null values, in priority order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.priority.iter().filter_map(|v| *v)
    }
}

/// The narrow host call surface the core consumes. One production
/// implementation marshals to the host service; [`InMemoryHost`] is the
/// in-process stand-in used by tests and standalone runs.
pub trait HostStore: Send + Sync {
    fn networks_by_plugin(&self, plugin: &str) -> Result<Vec<Network>, HostError>;

    /// Points on the network with a write still pending (recovery)
    fn points_with_pending_write(&self, network_uuid: &str) -> Result<Vec<Point>, HostError>;

    fn point(&self, uuid: &str) -> Result<Point, HostError>;

    fn device(&self, uuid: &str) -> Result<Device, HostError>;

    fn device_by_address(&self, address: &str) -> Result<Option<Device>, HostError>;

    /// Record an accepted write on the host (marks the point pending)
    fn write_point(&self, uuid: &str, writer: &PointWriter) -> Result<Point, HostError>;

    /// Push a decoded reading for a device point
    fn push_reading(&self, device_uuid: &str, name: &str, value: f64) -> Result<(), HostError>;

    /// The device acknowledged the write
    fn mark_write_complete(&self, point_uuid: &str) -> Result<(), HostError>;

    /// The write exhausted its retries and was dropped
    fn mark_write_failed(&self, point_uuid: &str, reason: &str) -> Result<(), HostError>;
}

#[derive(Debug, Default)]
struct HostState {
    networks: HashMap<String, Network>,
    devices: HashMap<String, Device>,
    points: HashMap<String, Point>,
    readings: Vec<(String, String, f64)>,
    failed_writes: Vec<(String, String)>,
    completed_writes: Vec<String>,
}

/// In-memory host store
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_network(&self, network: Network) {
        lock(&self.state).networks.insert(network.uuid.clone(), network);
    }

    pub fn add_device(&self, device: Device) {
        lock(&self.state).devices.insert(device.uuid.clone(), device);
    }

    pub fn add_point(&self, point: Point) {
        lock(&self.state).points.insert(point.uuid.clone(), point);
    }

    /// Readings pushed so far, as `(device_uuid, name, value)`
    pub fn readings(&self) -> Vec<(String, String, f64)> {
        lock(&self.state).readings.clone()
    }

    /// Abandoned writes, as `(point_uuid, reason)`
    pub fn failed_writes(&self) -> Vec<(String, String)> {
        lock(&self.state).failed_writes.clone()
    }

    /// Point UUIDs whose writes were acknowledged
    pub fn completed_writes(&self) -> Vec<String> {
        lock(&self.state).completed_writes.clone()
    }
}

impl HostStore for InMemoryHost {
    fn networks_by_plugin(&self, plugin: &str) -> Result<Vec<Network>, HostError> {
        let state = lock(&self.state);
        let mut networks: Vec<Network> = state
            .networks
            .values()
            .filter(|n| n.plugin == plugin)
            .cloned()
            .collect();
        networks.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(networks)
    }

    fn points_with_pending_write(&self, network_uuid: &str) -> Result<Vec<Point>, HostError> {
        let state = lock(&self.state);
        let device_uuids: Vec<&String> = state
            .devices
            .values()
            .filter(|d| d.network_uuid == network_uuid)
            .map(|d| &d.uuid)
            .collect();
        let mut points: Vec<Point> = state
            .points
            .values()
            .filter(|p| p.write_pending && device_uuids.contains(&&p.device_uuid))
            .cloned()
            .collect();
        points.sort_by(|a, b| a.uuid.cmp(&b.uuid));
        Ok(points)
    }

    fn point(&self, uuid: &str) -> Result<Point, HostError> {
        lock(&self.state)
            .points
            .get(uuid)
            .cloned()
            .ok_or_else(|| HostError::not_found("point", uuid))
    }

    fn device(&self, uuid: &str) -> Result<Device, HostError> {
        lock(&self.state)
            .devices
            .get(uuid)
            .cloned()
            .ok_or_else(|| HostError::not_found("device", uuid))
    }

    fn device_by_address(&self, address: &str) -> Result<Option<Device>, HostError> {
        Ok(lock(&self.state)
            .devices
            .values()
            .find(|d| d.address.eq_ignore_ascii_case(address))
            .cloned())
    }

    fn write_point(&self, uuid: &str, writer: &PointWriter) -> Result<Point, HostError> {
        let mut state = lock(&self.state);
        let point = state
            .points
            .get_mut(uuid)
            .ok_or_else(|| HostError::not_found("point", uuid))?;
        point.write_pending = true;
        point.write_value = writer.values().next();
        Ok(point.clone())
    }

    fn push_reading(&self, device_uuid: &str, name: &str, value: f64) -> Result<(), HostError> {
        lock(&self.state)
            .readings
            .push((device_uuid.to_string(), name.to_string(), value));
        Ok(())
    }

    fn mark_write_complete(&self, point_uuid: &str) -> Result<(), HostError> {
        let mut state = lock(&self.state);
        if let Some(point) = state.points.get_mut(point_uuid) {
            point.write_pending = false;
        }
        state.completed_writes.push(point_uuid.to_string());
        Ok(())
    }

    fn mark_write_failed(&self, point_uuid: &str, reason: &str) -> Result<(), HostError> {
        let mut state = lock(&self.state);
        if let Some(point) = state.points.get_mut(point_uuid) {
            point.write_pending = false;
        }
        state
            .failed_writes
            .push((point_uuid.to_string(), reason.to_string()));
        Ok(())
    }
}
