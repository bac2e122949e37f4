use std::sync::Arc;

use clawcord_core::{CommandData, Interaction, Member, Snowflake, User};

/// What a handler, check or autocomplete callback knows about the interaction
/// it is serving. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InteractionContext {
    interaction: Arc<Interaction>,
    command_path: String,
}

impl InteractionContext {
    pub fn new(interaction: Arc<Interaction>, command_path: impl Into<String>) -> Self {
        Self {
            interaction,
            command_path: command_path.into(),
        }
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn interaction_id(&self) -> Snowflake {
        self.interaction.id
    }

    pub fn token(&self) -> &str {
        &self.interaction.token
    }

    pub fn data(&self) -> Option<&CommandData> {
        self.interaction.data.as_ref()
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.interaction.guild_id
    }

    pub fn channel_id(&self) -> Option<Snowflake> {
        self.interaction.channel_id
    }

    pub fn author(&self) -> Option<&User> {
        self.interaction.author()
    }

    /// The invoking member; `None` outside a guild.
    pub fn member(&self) -> Option<&Member> {
        self.interaction.member.as_ref()
    }

    /// Space-separated qualified name, e.g. `"perm role clear"`.
    pub fn command_path(&self) -> &str {
        &self.command_path
    }
}
