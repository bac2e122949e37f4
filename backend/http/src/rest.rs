use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use clawcord_core::{CommandPayload, InteractionResponse, Snowflake};
use clawcord_logging::redact_sensitive_data;

use crate::client::CommandHttp;
use crate::error::HttpError;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

/// `reqwest`-backed implementation of the command endpoints.
///
/// Rate limiting and retries are left to the caller; a 429 surfaces as
/// [`HttpError::RateLimited`].
pub struct RestClient {
    client: Client,
    token: String,
    base_url: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token: token.into(),
            base_url: DEFAULT_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn global_path(app_id: Snowflake) -> String {
        format!("/applications/{app_id}/commands")
    }

    fn guild_path(app_id: Snowflake, guild_id: Snowflake) -> String {
        format!("/applications/{app_id}/guilds/{guild_id}/commands")
    }

    /// Sends one request and returns the raw body of a successful response.
    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authorized: bool,
    ) -> Result<String, HttpError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, path = %path, "Sending request to API");

        let mut request = self.client.request(method.clone(), &url);
        if authorized {
            request = request.header("Authorization", format!("Bot {}", self.token));
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                body = %redact_sensitive_data(&text),
                "API request failed"
            );
            return Err(HttpError::from_response(status, &text));
        }
        Ok(text)
    }

    async fn json<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(method, path, body, true).await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn delete(&self, path: &str) -> Result<(), HttpError> {
        self.send::<()>(Method::DELETE, path, None, true).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHttp for RestClient {
    async fn get_global_commands(&self, app_id: Snowflake) -> Result<Vec<CommandPayload>, HttpError> {
        self.json::<_, ()>(Method::GET, &Self::global_path(app_id), None)
            .await
    }

    async fn get_global_command(
        &self,
        app_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError> {
        let path = format!("{}/{command_id}", Self::global_path(app_id));
        self.json::<_, ()>(Method::GET, &path, None).await
    }

    async fn upsert_global_command(
        &self,
        app_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError> {
        self.json(Method::POST, &Self::global_path(app_id), Some(command))
            .await
    }

    async fn bulk_upsert_global_commands(
        &self,
        app_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError> {
        self.json(Method::PUT, &Self::global_path(app_id), Some(commands))
            .await
    }

    async fn delete_global_command(
        &self,
        app_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<(), HttpError> {
        self.delete(&format!("{}/{command_id}", Self::global_path(app_id)))
            .await
    }

    async fn get_guild_commands(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
    ) -> Result<Vec<CommandPayload>, HttpError> {
        self.json::<_, ()>(Method::GET, &Self::guild_path(app_id, guild_id), None)
            .await
    }

    async fn get_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError> {
        let path = format!("{}/{command_id}", Self::guild_path(app_id, guild_id));
        self.json::<_, ()>(Method::GET, &path, None).await
    }

    async fn upsert_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError> {
        self.json(Method::POST, &Self::guild_path(app_id, guild_id), Some(command))
            .await
    }

    async fn bulk_upsert_guild_commands(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError> {
        self.json(Method::PUT, &Self::guild_path(app_id, guild_id), Some(commands))
            .await
    }

    async fn delete_guild_command(
        &self,
        app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<(), HttpError> {
        self.delete(&format!("{}/{command_id}", Self::guild_path(app_id, guild_id)))
            .await
    }

    async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        token: &str,
        response: &InteractionResponse,
    ) -> Result<(), HttpError> {
        // The interaction token authorizes the callback; the bot token is not sent.
        let path = format!("/interactions/{interaction_id}/{token}/callback");
        self.send(Method::POST, &path, Some(response), false).await?;
        Ok(())
    }
}
