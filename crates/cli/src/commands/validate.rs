//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RaceConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    gate_count: usize,
    start_gate: u32,
    listen: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match super::load_config(Some(&args.config)) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    gate_count: config.laps.circuit.len(),
                    start_gate: config.laps.circuit.first().copied().unwrap_or_default(),
                    listen: format!("{}{}", config.server.bind_addr(), config.server.path),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RaceConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let laps = &config.laps;

    if laps.circuit.len() < 3 {
        warnings.push(format!(
            "Circuit has {} gate(s) - driving direction cannot be told apart",
            laps.circuit.len()
        ));
    }

    if laps.safe_interval_ms == 0 {
        warnings.push("laps.safe_interval_ms is 0 - sensor bounces are not filtered".to_string());
    }

    if laps.pit_stop_duration_ms == 0 {
        warnings.push("laps.pit_stop_duration_ms is 0 - pit stops end immediately".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Gates: {}", summary.gate_count);
            println!("  Start/finish gate: {}", summary.start_gate);
            println!("  Listen: {}", summary.listen);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
