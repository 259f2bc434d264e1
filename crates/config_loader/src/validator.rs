//! 配置校验模块
//!
//! 校验规则：
//! - circuit 非空且 gate id 唯一
//! - time_send_interval_ms 大于调度器提前唤醒余量
//! - server 队列容量 > 0
//! - server.path 以 '/' 开头

use std::collections::HashSet;

use contracts::{RaceConfig, RaceError};

/// 周期广播的最小间隔 (ms)
pub const MIN_TIME_SEND_INTERVAL_MS: u64 = 50;

/// 校验 RaceConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &RaceConfig) -> Result<(), RaceError> {
    validate_circuit(config)?;
    validate_intervals(config)?;
    validate_server(config)?;
    Ok(())
}

/// 校验 circuit
fn validate_circuit(config: &RaceConfig) -> Result<(), RaceError> {
    let circuit = &config.laps.circuit;
    if circuit.is_empty() {
        return Err(RaceError::config_validation(
            "laps.circuit",
            "circuit must contain at least the start/finish gate",
        ));
    }

    let mut seen = HashSet::new();
    for (idx, frame) in circuit.iter().enumerate() {
        if !seen.insert(frame) {
            return Err(RaceError::config_validation(
                format!("laps.circuit[{}]", idx),
                format!("duplicate gate id {}", frame),
            ));
        }
    }
    Ok(())
}

/// 校验时间参数
fn validate_intervals(config: &RaceConfig) -> Result<(), RaceError> {
    let interval = config.laps.time_send_interval_ms;
    if interval < MIN_TIME_SEND_INTERVAL_MS {
        return Err(RaceError::config_validation(
            "laps.time_send_interval_ms",
            format!(
                "time_send_interval_ms must be >= {}, got {}",
                MIN_TIME_SEND_INTERVAL_MS, interval
            ),
        ));
    }
    Ok(())
}

/// 校验 server 配置
fn validate_server(config: &RaceConfig) -> Result<(), RaceError> {
    let server = &config.server;
    if server.session_queue_capacity == 0 {
        return Err(RaceError::config_validation(
            "server.session_queue_capacity",
            "session_queue_capacity must be > 0",
        ));
    }
    if server.recent_broadcasts == 0 {
        return Err(RaceError::config_validation(
            "server.recent_broadcasts",
            "recent_broadcasts must be > 0",
        ));
    }
    if !server.path.starts_with('/') {
        return Err(RaceError::config_validation(
            "server.path",
            format!("path must start with '/', got '{}'", server.path),
        ));
    }
    Ok(())
}
