//! RaceConfig - Config Loader output
//!
//! Track layout, timing constants and gateway settings for one race process.

use serde::{Deserialize, Serialize};

use crate::FrameId;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete race configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Lap counting and timing
    #[serde(default)]
    pub laps: LapsConfig,

    /// WebSocket gateway
    #[serde(default)]
    pub server: ServerConfig,
}

/// Lap counting and timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LapsConfig {
    /// Minimum time between two accepted crossings of one robot (ms)
    #[serde(default = "default_safe_interval_ms")]
    pub safe_interval_ms: u64,

    /// Gates of one lap in forward order; `circuit[0]` is start and finish
    #[serde(default = "default_circuit")]
    pub circuit: Vec<FrameId>,

    /// Length of a pit stop (ms)
    #[serde(default = "default_pit_stop_duration_ms")]
    pub pit_stop_duration_ms: u64,

    /// Interval of the periodic TIME broadcast (ms)
    #[serde(default = "default_time_send_interval_ms")]
    pub time_send_interval_ms: u64,
}

fn default_safe_interval_ms() -> u64 {
    1000
}

fn default_circuit() -> Vec<FrameId> {
    vec![1, 2, 3]
}

fn default_pit_stop_duration_ms() -> u64 {
    5000
}

fn default_time_send_interval_ms() -> u64 {
    10_000
}

impl Default for LapsConfig {
    fn default() -> Self {
        Self {
            safe_interval_ms: default_safe_interval_ms(),
            circuit: default_circuit(),
            pit_stop_duration_ms: default_pit_stop_duration_ms(),
            time_send_interval_ms: default_time_send_interval_ms(),
        }
    }
}

/// WebSocket gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket endpoint path
    #[serde(default = "default_path")]
    pub path: String,

    /// Outbound queue capacity per session
    #[serde(default = "default_session_queue_capacity")]
    pub session_queue_capacity: usize,

    /// Size of the recent-broadcast ring read by narration consumers
    #[serde(default = "default_recent_broadcasts")]
    pub recent_broadcasts: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8888
}

fn default_path() -> String {
    "/ws".to_string()
}

fn default_session_queue_capacity() -> usize {
    256
}

fn default_recent_broadcasts() -> usize {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            session_queue_capacity: default_session_queue_capacity(),
            recent_broadcasts: default_recent_broadcasts(),
        }
    }
}

impl ServerConfig {
    /// `host:port` bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
