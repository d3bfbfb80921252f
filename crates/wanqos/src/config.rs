//! CLI configuration: thin wrapper around `wanqos_config` shared types.
//!
//! Adds the resolution steps that respect `GlobalOpts` overrides
//! (`--config`, `--db`, `--output`).

use clap::ValueEnum;

use wanqos_core::RegistryConfig;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use wanqos_config::{Config, config_path, render_config};

/// Load the config file named by `--config`, or the default one.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(wanqos_config::load_config(global.config.as_deref())?)
}

/// Translate the loaded config, letting `--db` win over `[store] path`.
pub fn registry_config(global: &GlobalOpts, cfg: &Config) -> Result<RegistryConfig, CliError> {
    Ok(wanqos_config::to_registry_config(cfg, global.db.clone())?)
}

/// `--output` flag, then `[defaults] output`.
pub fn output_format(global: &GlobalOpts, cfg: &Config) -> Result<OutputFormat, CliError> {
    if let Some(format) = global.output {
        return Ok(format);
    }
    OutputFormat::from_str(&cfg.defaults.output, true)
        .map_err(|reason| CliError::validation("defaults.output", reason))
}
