//! `clawcord-config`: client configuration management.
//!
//! Provides:
//! - Typed config schema (application, command registration, logging)
//! - YAML loading with a defaults-on-missing-file policy
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with per-field reports

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{MissingEnvVarError, collect_referenced_vars, resolve_env_vars, resolve_env_vars_with};
pub use io::{config_dir, config_file_path, load_config, parse_config};
pub use schema::{ApplicationConfig, ClawcordConfig, CommandsConfig, LoggingConfig};
pub use validation::{ConfigValidationError, ValidationReport, validate};

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Load, apply env substitution, apply defaults and validate a config file.
///
/// Validation findings are logged; the caller decides whether errors are fatal
/// through the returned report.
pub async fn load_and_prepare(path: &Path) -> Result<(ClawcordConfig, ValidationReport)> {
    let raw_config = load_config(path).await?;
    prepare(raw_config, &std::env::vars().collect())
}

/// The pure half of [`load_and_prepare`], with an explicit environment.
pub fn prepare(
    raw_config: ClawcordConfig,
    env: &HashMap<String, String>,
) -> Result<(ClawcordConfig, ValidationReport)> {
    let value: Value =
        serde_json::to_value(&raw_config).context("Failed to serialize config for processing")?;

    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;

    let config: ClawcordConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok((config, report))
}
