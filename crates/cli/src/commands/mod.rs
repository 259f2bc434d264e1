//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use contracts::RaceConfig;
use tracing::info;

use crate::error::{CliError, Result};

pub use info::run_info;
pub use run::run_server;
pub use validate::run_validate;

/// Load `path`, or the built-in defaults when no path is given
pub(crate) fn load_config(path: Option<&Path>) -> Result<RaceConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RaceConfig::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    Ok(config_loader::ConfigLoader::load_from_path(path)?)
}
