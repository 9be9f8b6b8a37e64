//! Module configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::queue::WriteQueueConfig;

/// Configuration surface consumed by the bridge core.
///
/// All fields default sensibly so a missing or partial config still
/// yields a working module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Total transmission attempts per write, first attempt inclusive
    pub write_queue_max_retries: u32,
    /// Per-attempt ack wait, milliseconds
    pub write_queue_timeout_ms: u64,
    /// Maximum queued writes; new writes are rejected when full
    pub write_queue_capacity: usize,
    /// Module-wide fallback encryption key material, hex
    pub default_key: String,
    /// Receive-loop poll interval, milliseconds; also bounds the worker's
    /// idle wait slice so disable returns promptly
    pub re_iteration_time_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_queue_max_retries: 3,
            write_queue_timeout_ms: 10_000,
            write_queue_capacity: 64,
            default_key: "000102030405060708090a0b0c0d0e0f".to_string(),
            re_iteration_time_ms: 5_000,
        }
    }
}

impl Config {
    pub fn write_queue_timeout(&self) -> Duration {
        Duration::from_millis(self.write_queue_timeout_ms)
    }

    pub fn re_iteration_time(&self) -> Duration {
        Duration::from_millis(self.re_iteration_time_ms)
    }

    /// The retry policy handed to the write queue
    pub fn queue_config(&self) -> WriteQueueConfig {
        WriteQueueConfig {
            max_retries: self.write_queue_max_retries,
            timeout: self.write_queue_timeout(),
            capacity: self.write_queue_capacity,
        }
    }

    /// Upper bound on one worker wait slice
    pub fn idle_tick(&self) -> Duration {
        self.write_queue_timeout().min(self.re_iteration_time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.write_queue_max_retries, 3);
        assert_eq!(config.write_queue_timeout(), Duration::from_secs(10));
        assert_eq!(config.queue_config().capacity, 64);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"write_queue_max_retries": 5}"#).unwrap();
        assert_eq!(config.write_queue_max_retries, 5);
        assert_eq!(config.write_queue_timeout_ms, 10_000);
        assert!(!config.default_key.is_empty());
    }

    #[test]
    fn test_idle_tick_is_bounded_by_both_intervals() {
        let mut config = Config::default();
        config.write_queue_timeout_ms = 1_000;
        config.re_iteration_time_ms = 5_000;
        assert_eq!(config.idle_tick(), Duration::from_secs(1));

        config.re_iteration_time_ms = 500;
        assert_eq!(config.idle_tick(), Duration::from_millis(500));
    }
}
