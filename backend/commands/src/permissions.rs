//! Per-guild permission overwrites, kept locally on a command.

use serde::{Deserialize, Serialize};

use clawcord_core::Snowflake;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PermissionTarget {
    Role,
    User,
}

impl From<PermissionTarget> for u8 {
    fn from(target: PermissionTarget) -> Self {
        match target {
            PermissionTarget::Role => 1,
            PermissionTarget::User => 2,
        }
    }
}

impl TryFrom<u8> for PermissionTarget {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Role),
            2 => Ok(Self::User),
            other => Err(format!("unknown permission target type {other}")),
        }
    }
}

/// Allows or denies one role or user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub id: Snowflake,
    #[serde(rename = "type")]
    pub target: PermissionTarget,
    pub permission: bool,
}

impl PermissionOverwrite {
    pub fn role(id: impl Into<Snowflake>, permission: bool) -> Self {
        Self {
            id: id.into(),
            target: PermissionTarget::Role,
            permission,
        }
    }

    pub fn user(id: impl Into<Snowflake>, permission: bool) -> Self {
        Self {
            id: id.into(),
            target: PermissionTarget::User,
            permission,
        }
    }
}

/// The overwrite set of one command in one guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPermissions {
    pub guild_id: Snowflake,
    pub overwrites: Vec<PermissionOverwrite>,
}

impl CommandPermissions {
    pub fn new(guild_id: impl Into<Snowflake>) -> Self {
        Self {
            guild_id: guild_id.into(),
            overwrites: Vec::new(),
        }
    }

    /// Adds an overwrite, replacing any existing one for the same role or user.
    pub fn add_overwrite(&mut self, overwrite: PermissionOverwrite) {
        match self.overwrites.iter_mut().find(|o| o.id == overwrite.id) {
            Some(existing) => *existing = overwrite,
            None => self.overwrites.push(overwrite),
        }
    }

    pub fn get_overwrite(&self, entity_id: Snowflake) -> Option<&PermissionOverwrite> {
        self.overwrites.iter().find(|o| o.id == entity_id)
    }

    pub fn remove_overwrite(&mut self, entity_id: Snowflake) -> Option<PermissionOverwrite> {
        let index = self.overwrites.iter().position(|o| o.id == entity_id)?;
        Some(self.overwrites.remove(index))
    }

    /// Body of the platform's edit-permissions endpoint.
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({ "permissions": self.overwrites })
    }
}
