use thiserror::Error;

use clawcord_core::{CommandKind, OptionKind, Snowflake};
use clawcord_http::HttpError;

/// An invalid local declaration. Raised while building commands, before
/// anything is sent to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("option '{0}' cannot have both choices and autocomplete")]
    ChoicesWithAutocomplete(String),

    #[error("group '{parent}' cannot contain another group ('{child}'); at most two levels are allowed")]
    NestingTooDeep { parent: String, child: String },

    #[error("'{child}' ({kind}) cannot be placed under '{parent}': {reason}")]
    InvalidChild {
        parent: String,
        child: String,
        kind: OptionKind,
        reason: &'static str,
    },

    #[error("'{parent}' already has a child named '{name}'")]
    DuplicateName { parent: String, name: String },

    #[error("'{parent}' exceeds the limit of {max} {what}")]
    TooMany {
        parent: String,
        what: &'static str,
        max: usize,
    },

    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("invalid description for '{name}': {reason}")]
    InvalidDescription { name: String, reason: &'static str },

    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("command has no name and its handler does not provide one")]
    MissingName,

    #[error("context menu command '{0}' cannot have options")]
    OptionsOnContextMenu(String),
}

/// Runtime failure while routing, checking or running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("check failed for command '{command}': {reason}")]
    CheckFailure { command: String, reason: String },

    #[error("command '{command}' failed: {error:#}")]
    Handler {
        command: String,
        error: anyhow::Error,
    },

    #[error("autocomplete for '{command}' option '{option}' broke its contract: {reason}")]
    AutocompleteContract {
        command: String,
        option: String,
        reason: String,
    },

    #[error("autocomplete for '{command}' option '{option}' failed: {error:#}")]
    Autocomplete {
        command: String,
        option: String,
        error: anyhow::Error,
    },

    #[error("invalid interaction payload: {0}")]
    InvalidPayload(String),

    #[error("command '{command}' has no subcommand or group named '{name}'")]
    UnknownSubcommand { command: String, name: String },

    #[error("'{0}' cannot be invoked directly")]
    NotInvokable(String),

    #[error("command '{command}' is a {expected} command but was invoked as {found}")]
    SurfaceMismatch {
        command: String,
        expected: CommandKind,
        found: CommandKind,
    },

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("no active command with id {0}")]
    NotFound(Snowflake),
}

impl CommandError {
    pub fn is_check_failure(&self) -> bool {
        matches!(self, Self::CheckFailure { .. })
    }
}
