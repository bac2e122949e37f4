//! Config validation with field paths in every message.

use crate::schema::ClawcordConfig;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ClawcordConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_application(config, &mut report);
    validate_commands(config, &mut report);
    report
}

fn validate_application(config: &ClawcordConfig, report: &mut ValidationReport) {
    let Some(app) = &config.application else {
        report.error("application", "Application section is required");
        return;
    };

    if app.id.is_none() {
        report.error("application.id", "Application id is required");
    }
    if app.token.as_deref().map(str::trim).unwrap_or("").is_empty() {
        report.error("application.token", "Bot token is required");
    }
    if let Some(url) = &app.api_base_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error(
                "application.apiBaseUrl",
                format!("'{url}' is not an http(s) URL"),
            );
        } else if url.starts_with("http://") {
            report.warn("application.apiBaseUrl", "Token will be sent over plain HTTP");
        }
    }
}

fn validate_commands(config: &ClawcordConfig, report: &mut ValidationReport) {
    let Some(commands) = &config.commands else { return };
    if commands.overwrite_on_connect == Some(true) && commands.delete_unregistered == Some(true) {
        report.warn(
            "commands.deleteUnregistered",
            "Ignored when overwriteOnConnect is set; a bulk overwrite already removes unknown commands",
        );
    }
}
