//! Wire shapes for application commands and their options.
//!
//! These mirror the JSON the platform accepts on upsert and returns on fetch.
//! They carry no behaviour beyond (de)serialization; the declaration-side types
//! that produce them live in `clawcord-commands`.

use serde::{Deserialize, Serialize};

use crate::error::ClawcordError;
use crate::id::Snowflake;
use crate::model::ChannelType;

// ---------------------------------------------------------------------------
// Command surface
// ---------------------------------------------------------------------------

/// The UI surface a command is invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CommandKind {
    #[default]
    ChatInput,
    User,
    Message,
}

impl CommandKind {
    pub fn is_context_menu(self) -> bool {
        matches!(self, Self::User | Self::Message)
    }
}

impl TryFrom<u8> for CommandKind {
    type Error = ClawcordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::ChatInput),
            2 => Ok(Self::User),
            3 => Ok(Self::Message),
            other => Err(ClawcordError::UnknownEnumValue {
                kind: "command type",
                value: other,
            }),
        }
    }
}

impl From<CommandKind> for u8 {
    fn from(kind: CommandKind) -> Self {
        match kind {
            CommandKind::ChatInput => 1,
            CommandKind::User => 2,
            CommandKind::Message => 3,
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ChatInput => "chat_input",
            Self::User => "user",
            Self::Message => "message",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Option kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum OptionKind {
    SubCommand,
    SubCommandGroup,
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
    Attachment,
}

impl OptionKind {
    pub fn is_subcommand(self) -> bool {
        matches!(self, Self::SubCommand)
    }

    pub fn is_group(self) -> bool {
        matches!(self, Self::SubCommandGroup)
    }

    /// Subcommands and groups structure the tree; everything else is a parameter.
    pub fn is_structural(self) -> bool {
        self.is_subcommand() || self.is_group()
    }

    /// Kinds that may carry a fixed choice list or autocomplete.
    pub fn supports_choices(self) -> bool {
        matches!(self, Self::String | Self::Integer | Self::Number)
    }

    pub fn supports_bounds(self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

impl TryFrom<u8> for OptionKind {
    type Error = ClawcordError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::SubCommand,
            2 => Self::SubCommandGroup,
            3 => Self::String,
            4 => Self::Integer,
            5 => Self::Boolean,
            6 => Self::User,
            7 => Self::Channel,
            8 => Self::Role,
            9 => Self::Mentionable,
            10 => Self::Number,
            11 => Self::Attachment,
            other => {
                return Err(ClawcordError::UnknownEnumValue {
                    kind: "option type",
                    value: other,
                });
            }
        })
    }
}

impl From<OptionKind> for u8 {
    fn from(kind: OptionKind) -> Self {
        match kind {
            OptionKind::SubCommand => 1,
            OptionKind::SubCommandGroup => 2,
            OptionKind::String => 3,
            OptionKind::Integer => 4,
            OptionKind::Boolean => 5,
            OptionKind::User => 6,
            OptionKind::Channel => 7,
            OptionKind::Role => 8,
            OptionKind::Mentionable => 9,
            OptionKind::Number => 10,
            OptionKind::Attachment => 11,
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SubCommand => "sub_command",
            Self::SubCommandGroup => "sub_command_group",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Mentionable => "mentionable",
            Self::Number => "number",
            Self::Attachment => "attachment",
        };
        write!(f, "{}", s)
    }
}

// ---------------------------------------------------------------------------
// Choices and bounds
// ---------------------------------------------------------------------------

/// The value half of a choice pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceValue {
    Integer(i64),
    Number(f64),
    String(String),
}

impl ChoiceValue {
    /// Whether this value may be offered for an option of `kind`.
    pub fn fits(&self, kind: OptionKind) -> bool {
        matches!(
            (self, kind),
            (Self::String(_), OptionKind::String)
                | (Self::Integer(_), OptionKind::Integer)
                | (Self::Integer(_), OptionKind::Number)
                | (Self::Number(_), OptionKind::Number)
        )
    }
}

impl From<&str> for ChoiceValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ChoiceValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for ChoiceValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ChoiceValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

/// One (display-name, value) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub value: ChoiceValue,
}

impl OptionChoice {
    pub fn new(name: impl Into<String>, value: impl Into<ChoiceValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A numeric bound for integer or number options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionBound {
    Integer(i64),
    Number(f64),
}

impl OptionBound {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(v) => v as f64,
            Self::Number(v) => v,
        }
    }
}

impl From<i64> for OptionBound {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for OptionBound {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn is_false(v: &bool) -> bool {
    !*v
}

fn default_true() -> bool {
    true
}

/// Serialized form of one option node.
///
/// `required` is `None` for subcommands and groups so the key is left out entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionPayload {
    #[serde(rename = "type")]
    pub kind: OptionKind,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<OptionChoice>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub autocomplete: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channel_types: Vec<ChannelType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<OptionBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<OptionBound>,
}

/// Serialized form of a whole command, as sent on upsert and returned on fetch.
///
/// Server-assigned fields are skipped when absent so the same struct doubles as
/// the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Snowflake>,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionPayload>,
    #[serde(default = "default_true")]
    pub default_permission: bool,
}

impl CommandPayload {
    /// Compound identity used when reconciling local and remote state.
    pub fn key(&self) -> (&str, CommandKind) {
        (self.name.as_str(), self.kind)
    }
}
