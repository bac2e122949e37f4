//! Config file location and loading.

use crate::schema::ClawcordConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

const CONFIG_FILE_NAME: &str = "clawcord.yaml";

/// Resolve the config directory.
/// Priority: `CLAWCORD_CONFIG_DIR` env > `~/.clawcord/` > `./.clawcord`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CLAWCORD_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".clawcord"))
        .unwrap_or_else(|| PathBuf::from(".clawcord"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Parse a config from YAML text. An empty document yields the default config.
pub fn parse_config(raw: &str) -> Result<ClawcordConfig> {
    if raw.trim().is_empty() {
        return Ok(ClawcordConfig::default());
    }
    serde_yaml::from_str(raw).context("Failed to parse config YAML")
}

/// Load and parse the config from disk.
///
/// Returns `Ok(Default::default())` if the file doesn't exist.
pub async fn load_config(path: &Path) -> Result<ClawcordConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(ClawcordConfig::default());
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw)
        .with_context(|| format!("Invalid config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}
