//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::RaceConfig;
use tracing::info;

use crate::cli::InfoArgs;

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref()).context("Failed to load config")?;
    info!("Loaded configuration info");

    if args.json {
        println!("{}", ConfigLoader::to_json(&config)?);
    } else if args.toml {
        println!("{}", ConfigLoader::to_toml(&config)?);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn print_config_info(config: &RaceConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Lapscounter Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let laps = &config.laps;
    println!("🏁 Circuit ({} gates)", laps.circuit.len());
    for (i, gate) in laps.circuit.iter().enumerate() {
        let prefix = if i == laps.circuit.len() - 1 { "└─" } else { "├─" };
        let role = if i == 0 { " (start/finish)" } else { "" };
        println!("   {} Gate {}{}", prefix, gate, role);
    }

    println!("\n⏱  Timing");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Safe interval: {} ms", laps.safe_interval_ms);
    println!("   ├─ Pit stop: {} ms", laps.pit_stop_duration_ms);
    println!("   └─ TIME broadcast: {} ms", laps.time_send_interval_ms);

    let server = &config.server;
    println!("\n🌐 Server");
    println!("   ├─ Listen: ws://{}{}", server.bind_addr(), server.path);
    println!("   ├─ Session queue: {}", server.session_queue_capacity);
    println!("   └─ Recent broadcasts: {}", server.recent_broadcasts);

    println!();
}
