//! Config defaults: applies default values to parsed config.

use crate::schema::{ApplicationConfig, ClawcordConfig, CommandsConfig, LoggingConfig};

pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

pub const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ClawcordConfig) -> ClawcordConfig {
    let config = apply_application_defaults(config);
    let config = apply_command_defaults(config);
    apply_logging_defaults(config)
}

fn apply_application_defaults(mut config: ClawcordConfig) -> ClawcordConfig {
    let app = config
        .application
        .get_or_insert_with(ApplicationConfig::default);
    if app.api_base_url.is_none() {
        app.api_base_url = Some(DEFAULT_API_BASE_URL.to_string());
    }
    config
}

/// Sync is the default strategy; guild scope failures are skipped.
fn apply_command_defaults(mut config: ClawcordConfig) -> ClawcordConfig {
    let commands = config.commands.get_or_insert_with(CommandsConfig::default);
    commands.overwrite_on_connect.get_or_insert(false);
    commands.delete_unregistered.get_or_insert(false);
    commands.ignore_guild_register_fail.get_or_insert(true);
    config
}

fn apply_logging_defaults(mut config: ClawcordConfig) -> ClawcordConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.dir.is_none() {
        logging.dir = Some(DEFAULT_LOG_DIR.to_string());
    }
    config
}
