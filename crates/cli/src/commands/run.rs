//! `run` command implementation.

use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::RaceConfig;
use dispatcher::RaceHub;
use tracing::{error, info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_server(args: &RunArgs) -> Result<()> {
    let mut config = super::load_config(args.config.as_deref()).with_context(|| {
        format!(
            "Failed to load config from {}",
            args.config
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<defaults>".to_string())
        )
    })?;

    apply_overrides(&mut config, args)?;

    info!(
        circuit = ?config.laps.circuit,
        safe_interval_ms = config.laps.safe_interval_ms,
        bind = %config.server.bind_addr(),
        path = %config.server.path,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
        info!("Metrics endpoint available on port {}", args.metrics_port);
    }

    let handle = RaceHub::start(&config);
    let hub = Arc::clone(handle.hub());

    info!("Starting race server...");
    let served = dispatcher::serve(Arc::clone(&hub), &config.server, shutdown_signal()).await;

    println!("{}", hub.summary());
    print_session_metrics(&hub);
    handle.shutdown().await;

    served.context("Race server failed")?;
    info!("Lapscounter finished");
    Ok(())
}

/// Apply CLI overrides and re-validate
fn apply_overrides(config: &mut RaceConfig, args: &RunArgs) -> Result<(), CliError> {
    if let Some(ref host) = args.host {
        info!(host = %host, "Overriding server host from CLI");
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        info!(port = %port, "Overriding server port from CLI");
        config.server.port = port;
    }
    config_loader::ConfigLoader::validate(config).map_err(CliError::InvalidOverride)
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => warn!("Received Ctrl+C, shutting down..."),
        _ = terminate => warn!("Received SIGTERM, shutting down..."),
    }
}

fn print_session_metrics(hub: &RaceHub) {
    let sessions = hub.session_metrics();
    if sessions.is_empty() {
        return;
    }
    println!("Sessions ({}):", sessions.len());
    for (name, snapshot) in sessions {
        println!("  - {name}: {snapshot}");
    }
    println!();
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &RaceConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Laps:");
    println!("  Circuit: {:?}", config.laps.circuit);
    println!("  Safe interval: {} ms", config.laps.safe_interval_ms);
    println!("  Pit stop: {} ms", config.laps.pit_stop_duration_ms);
    println!("  TIME broadcast: every {} ms", config.laps.time_send_interval_ms);
    println!("\nServer:");
    println!("  Listen: ws://{}{}", config.server.bind_addr(), config.server.path);
    println!("  Session queue: {}", config.server.session_queue_capacity);
    println!("  Recent broadcasts: {}", config.server.recent_broadcasts);
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            host: None,
            port: None,
            metrics_port: 0,
            dry_run: true,
        }
    }

    #[test]
    fn test_overrides_replace_bind_address() {
        let mut config = RaceConfig::default();
        let args = RunArgs {
            host: Some("127.0.0.1".to_string()),
            port: Some(7000),
            ..args()
        };
        apply_overrides(&mut config, &args).unwrap();
        assert_eq!(config.server.bind_addr(), "127.0.0.1:7000");
    }

    #[test]
    fn test_overrides_revalidate() {
        let mut config = RaceConfig::default();
        config.laps.circuit.clear();
        let err = apply_overrides(&mut config, &args()).unwrap_err();
        assert!(matches!(err, CliError::InvalidOverride(_)));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_serve() {
        run_server(&args()).await.unwrap();
    }
}
