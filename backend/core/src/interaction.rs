//! Inbound interaction payloads as delivered by the gateway.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClawcordError;
use crate::id::Snowflake;
use crate::model::{Attachment, Channel, Member, Message, Role, User};
use crate::payload::{CommandKind, OptionChoice, OptionKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum InteractionType {
    Ping,
    ApplicationCommand,
    MessageComponent,
    ApplicationCommandAutocomplete,
    ModalSubmit,
    Unknown(u8),
}

impl From<u8> for InteractionType {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Ping,
            2 => Self::ApplicationCommand,
            3 => Self::MessageComponent,
            4 => Self::ApplicationCommandAutocomplete,
            5 => Self::ModalSubmit,
            other => Self::Unknown(other),
        }
    }
}

impl From<InteractionType> for u8 {
    fn from(kind: InteractionType) -> Self {
        match kind {
            InteractionType::Ping => 1,
            InteractionType::ApplicationCommand => 2,
            InteractionType::MessageComponent => 3,
            InteractionType::ApplicationCommandAutocomplete => 4,
            InteractionType::ModalSubmit => 5,
            InteractionType::Unknown(other) => other,
        }
    }
}

/// Full objects referenced by id elsewhere in the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resolved {
    #[serde(default)]
    pub users: HashMap<Snowflake, User>,
    #[serde(default)]
    pub members: HashMap<Snowflake, Member>,
    #[serde(default)]
    pub roles: HashMap<Snowflake, Role>,
    #[serde(default)]
    pub channels: HashMap<Snowflake, Channel>,
    #[serde(default)]
    pub messages: HashMap<Snowflake, Message>,
    #[serde(default)]
    pub attachments: HashMap<Snowflake, Attachment>,
}

impl Resolved {
    /// A member joined with its user record, since `resolved.members` omits `user`.
    pub fn member(&self, id: Snowflake) -> Option<Member> {
        let mut member = self.members.get(&id)?.clone();
        if member.user.is_none() {
            member.user = self.users.get(&id).cloned();
        }
        Some(member)
    }
}

/// One node of the `data.options` tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandDataOption {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OptionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CommandDataOption>,
    #[serde(default)]
    pub focused: bool,
}

impl CommandDataOption {
    /// The value rendered as the user typed it, used for autocomplete input.
    pub fn value_as_string(&self) -> String {
        match &self.value {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandData {
    pub id: Snowflake,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: CommandKind,
    #[serde(default)]
    pub options: Vec<CommandDataOption>,
    #[serde(default)]
    pub resolved: Resolved,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub application_id: Snowflake,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CommandData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member: Option<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    pub token: String,
}

impl Interaction {
    pub fn from_value(value: Value) -> Result<Self, ClawcordError> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn is_application_command(&self) -> bool {
        self.kind == InteractionType::ApplicationCommand
    }

    pub fn is_autocomplete(&self) -> bool {
        self.kind == InteractionType::ApplicationCommandAutocomplete
    }

    /// The invoking user: the member's user inside a guild, `user` in DMs.
    pub fn author(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }
}

/// Body of an interaction callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl InteractionResponse {
    pub const AUTOCOMPLETE_RESULT: u8 = 8;

    pub fn autocomplete(choices: &[OptionChoice]) -> Self {
        Self {
            kind: Self::AUTOCOMPLETE_RESULT,
            data: Some(serde_json::json!({ "choices": choices })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "id": "1000",
            "application_id": "1",
            "type": 2,
            "token": "tok",
            "guild_id": "50",
            "channel_id": "60",
            "member": {"user": {"id": "7", "username": "alice"}, "roles": []},
            "data": {
                "id": "900",
                "name": "perm",
                "type": 1,
                "options": [{
                    "name": "user",
                    "type": 2,
                    "options": [{
                        "name": "get",
                        "type": 1,
                        "options": [{"name": "target", "type": 6, "value": "8"}]
                    }]
                }],
                "resolved": {
                    "users": {"8": {"id": "8", "username": "bob"}},
                    "members": {"8": {"nick": "bobby", "roles": []}}
                }
            }
        })
    }

    #[test]
    fn test_decodes_nested_options() {
        let interaction = Interaction::from_value(sample()).unwrap();
        assert!(interaction.is_application_command());
        let data = interaction.data.as_ref().unwrap();
        assert_eq!(data.options[0].kind, OptionKind::SubCommandGroup);
        assert_eq!(data.options[0].options[0].options[0].name, "target");
        assert_eq!(interaction.author().unwrap().username, "alice");
    }

    #[test]
    fn test_resolved_member_joins_user() {
        let interaction = Interaction::from_value(sample()).unwrap();
        let resolved = &interaction.data.unwrap().resolved;
        let member = resolved.member(Snowflake(8)).unwrap();
        assert_eq!(member.id(), Some(Snowflake(8)));
        assert_eq!(member.nick.as_deref(), Some("bobby"));
        assert!(resolved.member(Snowflake(9)).is_none());
    }

    #[test]
    fn test_autocomplete_response_shape() {
        let response = InteractionResponse::autocomplete(&[OptionChoice::new("Red", "red")]);
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], json!(8));
        assert_eq!(value["data"]["choices"][0]["value"], json!("red"));
    }

    #[test]
    fn test_value_as_string() {
        let option: CommandDataOption =
            serde_json::from_value(json!({"name": "n", "type": 4, "value": 12, "focused": true}))
                .unwrap();
        assert!(option.focused);
        assert_eq!(option.value_as_string(), "12");
    }
}
