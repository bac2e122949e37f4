//! clawcord client configuration schema.
//!
//! Every field is optional on disk; `defaults::apply_all_defaults` fills the gaps.

use serde::{Deserialize, Serialize};

use clawcord_core::Snowflake;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClawcordConfig {
    /// Application identity and API endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationConfig>,

    /// Command registration behaviour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands: Option<CommandsConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Application
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    /// Bot token, usually `${CLAWCORD_TOKEN}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandsConfig {
    /// Bulk-overwrite remote commands on connect instead of syncing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overwrite_on_connect: Option<bool>,
    /// Delete remote global commands that nothing local declares
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_unregistered: Option<bool>,
    /// Log and skip guilds that refuse registration for missing scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_guild_register_fail: Option<bool>,
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}
