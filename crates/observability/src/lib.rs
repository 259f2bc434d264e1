//! # Observability
//!
//! Logging and Prometheus metrics for the lap counter.
//!
//! The default log filter only opens the lap counter's own crates at the
//! requested level; third-party crates (axum, hyper, tungstenite) stay at
//! `warn` unless `RUST_LOG` says otherwise.
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! init_with_config(ObservabilityConfig {
//!     metrics_port: Some(9100),
//!     ..Default::default()
//! })?;
//! observability::metrics::record_frame_outcome(outcome.as_str());
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub use crate::metrics::{
    record_broadcast, record_frame_outcome, record_lap, record_message_handled,
    record_session_drop, record_sessions, record_state, MetricsSummary, RaceMetricsAggregator,
    RunningStats, StatsSummary,
};

/// Crates whose events follow the configured level
const SERVICE_TARGETS: &[&str] = &[
    "lapscounter",
    "race_engine",
    "dispatcher",
    "config_loader",
    "contracts",
    "observability",
];

/// Observability settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus listener port; `None` leaves the exporter off
    pub metrics_port: Option<u16>,
    /// Level for the service crates when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// Structured JSON, one event per line
    #[default]
    Json,
    Pretty,
    Compact,
}

/// Filter directive keeping dependencies at `warn` and the service crates at `level`
pub fn service_filter_directive(level: &str) -> String {
    let mut directive = String::from("warn");
    for target in SERVICE_TARGETS {
        directive.push(',');
        directive.push_str(target);
        directive.push('=');
        directive.push_str(level);
    }
    directive
}

/// Install the tracing subscriber, plus the Prometheus exporter when a port is set
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(service_filter_directive(&config.default_log_level)))
        .context("Invalid log level")?;

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        install_prometheus(port)?;
    }

    tracing::debug!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Start only the Prometheus exporter; logging is already set up
pub fn init_metrics_only(port: u16) -> Result<()> {
    install_prometheus(port)
}

fn install_prometheus(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .with_context(|| format!("Failed to install Prometheus exporter on port {port}"))?;

    tracing::info!(port, "Prometheus metrics endpoint listening");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_leaves_exporter_off() {
        let config = ObservabilityConfig::default();
        assert_eq!(config.metrics_port, None);
        assert_eq!(config.default_log_level, "info");
        assert!(matches!(config.log_format, LogFormat::Json));
    }

    #[test]
    fn test_service_filter_directive() {
        let directive = service_filter_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("race_engine=debug"));
        assert!(directive.contains("lapscounter=debug"));
        assert!(!directive.contains("axum"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
