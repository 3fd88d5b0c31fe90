//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::ServiceConfig;
use tracing::info;

use crate::error::CliError;

/// Load the config file when given, otherwise fall back to defaults
fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(ServiceConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
