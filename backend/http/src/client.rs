use async_trait::async_trait;

use clawcord_core::{CommandPayload, InteractionResponse, Snowflake};

use crate::error::HttpError;

/// Remote application-command endpoints.
///
/// Upserts return the stored record, including the server-assigned `id`,
/// `application_id` and `version`.
#[async_trait]
pub trait CommandHttp: Send + Sync {
    async fn get_global_commands(&self, app_id: Snowflake) -> Result<Vec<CommandPayload>, HttpError>;

    async fn get_global_command(
        &self,
        app_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError>;

    async fn upsert_global_command(
        &self,
        app_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError>;

    /// Replaces the whole global command set.
    async fn bulk_upsert_global_commands(
        &self,
        app_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError>;

    async fn delete_global_command(
        &self,
        app_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<(), HttpError>;

    async fn get_guild_commands(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
    ) -> Result<Vec<CommandPayload>, HttpError>;

    async fn get_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError>;

    async fn upsert_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError>;

    /// Replaces the whole command set of one guild.
    async fn bulk_upsert_guild_commands(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError>;

    async fn delete_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<(), HttpError>;

    async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), HttpError>;
}
