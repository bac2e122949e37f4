//! The client-facing facade: owns the registry, the router and the HTTP seam.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use serde_json::json;
use tokio::sync::{RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use clawcord_config::ClawcordConfig;
use clawcord_core::{
    CommandKind, Event, EventBus, EventKind, Interaction, InteractionResponse, ModelCache,
    Snowflake,
};
use clawcord_http::CommandHttp;

use crate::command::Command;
use crate::error::{CommandError, ConfigurationError};
use crate::handler::Check;
use crate::registry::{CommandRegistry, SyncOptions, SyncReport, delete_remote, upsert_edited};
use crate::router::{DispatchOutcome, Router};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotConfig {
    pub application_id: Snowflake,
    /// Clean register on connect instead of an incremental sync.
    pub overwrite_application_commands: bool,
    pub sync: SyncOptions,
}

impl BotConfig {
    pub fn new(application_id: impl Into<Snowflake>) -> Self {
        Self {
            application_id: application_id.into(),
            overwrite_application_commands: false,
            sync: SyncOptions::default(),
        }
    }

    /// Reads the `application` and `commands` sections of a prepared config.
    pub fn from_config(config: &ClawcordConfig) -> Result<Self> {
        let application_id = config
            .application
            .as_ref()
            .and_then(|a| a.id)
            .ok_or_else(|| anyhow!("application.id is not configured"))?;
        let commands = config.commands.clone().unwrap_or_default();
        let defaults = SyncOptions::default();

        Ok(Self {
            application_id,
            overwrite_application_commands: commands.overwrite_on_connect.unwrap_or(false),
            sync: SyncOptions {
                delete_unregistered: commands
                    .delete_unregistered
                    .unwrap_or(defaults.delete_unregistered),
                ignore_guild_register_fail: commands
                    .ignore_guild_register_fail
                    .unwrap_or(defaults.ignore_guild_register_fail),
            },
        })
    }
}

pub struct Bot {
    config: BotConfig,
    http: Arc<dyn CommandHttp>,
    registry: RwLock<CommandRegistry>,
    router: Router,
}

impl Bot {
    pub fn new(config: BotConfig, http: Arc<dyn CommandHttp>, cache: Arc<dyn ModelCache>) -> Self {
        Self {
            config,
            http,
            registry: RwLock::new(CommandRegistry::new()),
            router: Router::new(cache, EventBus::new()),
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        self.router.events()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.router.events().subscribe()
    }

    /// Adds a check that gates every command. Call before sharing the bot.
    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        self.router.add_check(check);
    }

    // -----------------------------------------------------------------------
    // Registry access
    // -----------------------------------------------------------------------

    pub async fn add_pending_command(&self, command: Command) {
        self.registry.write().await.add_pending_command(command);
    }

    pub async fn remove_pending_command(&self, name: &str, kind: CommandKind) -> Option<Command> {
        self.registry.write().await.remove_pending_command(name, kind)
    }

    pub async fn pending_command_names(&self) -> Vec<String> {
        self.registry
            .read()
            .await
            .pending_commands()
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub async fn get_application_command(&self, id: Snowflake) -> Option<Arc<Command>> {
        self.registry.read().await.get_application_command(id)
    }

    pub async fn application_commands(&self) -> Vec<Arc<Command>> {
        self.registry.read().await.application_commands()
    }

    pub async fn remove_application_command(&self, id: Snowflake) -> Option<Arc<Command>> {
        self.registry.write().await.remove_application_command(id)
    }

    /// Deletes a command remotely, then drops it locally. The registry lock
    /// is only held for the final swap, so dispatch keeps running while the
    /// platform answers.
    pub async fn delete_application_command(
        &self,
        id: Snowflake,
        guild_id: Option<Snowflake>,
    ) -> Result<Arc<Command>, CommandError> {
        let command = self
            .registry
            .read()
            .await
            .get_application_command(id)
            .ok_or(CommandError::NotFound(id))?;
        let remaining = delete_remote(
            self.http.as_ref(),
            self.config.application_id,
            &command,
            id,
            guild_id,
        )
        .await?;
        self.registry.write().await.replace(&command, remaining);
        Ok(command)
    }

    /// Edits a copy of an active command, re-upserts it without holding the
    /// registry lock, then swaps the copy in.
    pub async fn edit_application_command<F>(&self, id: Snowflake, edit: F) -> Result<Arc<Command>, CommandError>
    where
        F: FnOnce(&mut Command) -> Result<(), ConfigurationError> + Send,
    {
        let current = self
            .registry
            .read()
            .await
            .get_application_command(id)
            .ok_or(CommandError::NotFound(id))?;
        let edited = upsert_edited(self.http.as_ref(), self.config.application_id, &current, edit).await?;
        self.registry
            .write()
            .await
            .replace(&current, Some(edited))
            .ok_or(CommandError::NotFound(id))
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub async fn sync_application_commands(&self) -> Result<SyncReport, CommandError> {
        let report = self
            .registry
            .write()
            .await
            .sync(self.http.as_ref(), self.config.application_id, self.config.sync)
            .await?;
        self.publish_synced("sync", &report);
        Ok(report)
    }

    pub async fn register_application_commands(&self) -> Result<SyncReport, CommandError> {
        let report = self
            .registry
            .write()
            .await
            .clean_register(self.http.as_ref(), self.config.application_id, self.config.sync)
            .await?;
        self.publish_synced("clean_register", &report);
        Ok(report)
    }

    /// Registration strategy for a fresh connection, chosen by
    /// `overwrite_application_commands`.
    pub async fn on_connect(&self) -> Result<SyncReport, CommandError> {
        if self.config.overwrite_application_commands {
            self.register_application_commands().await
        } else {
            self.sync_application_commands().await
        }
    }

    fn publish_synced(&self, strategy: &str, report: &SyncReport) {
        let report = serde_json::to_value(report).unwrap_or_default();
        self.events().publish(Event::new(
            EventKind::CommandsSynced,
            json!({ "strategy": strategy, "report": report }),
        ));
    }

    // -----------------------------------------------------------------------
    // Interactions
    // -----------------------------------------------------------------------

    /// Routes one interaction and, for autocomplete, sends the suggestions back.
    pub async fn process_application_commands(&self, interaction: Interaction) -> DispatchOutcome {
        let interaction = Arc::new(interaction);
        let outcome = self
            .router
            .dispatch(&self.registry, Arc::clone(&interaction))
            .await;

        if let DispatchOutcome::Autocompleted(choices) = &outcome {
            let response = InteractionResponse::autocomplete(choices);
            if let Err(err) = self
                .http
                .create_interaction_response(interaction.id, &interaction.token, &response)
                .await
            {
                warn!(interaction_id = %interaction.id, error = %err, "Failed to send autocomplete response");
                self.events().publish(
                    Event::new(EventKind::AutocompleteError, json!({ "error": err.to_string() }))
                        .with_interaction(interaction.id),
                );
            } else {
                debug!(interaction_id = %interaction.id, choices = choices.len(), "Sent autocomplete response");
            }
        }
        outcome
    }

    /// Processes an interaction on its own task.
    pub fn handle_interaction(self: &Arc<Self>, interaction: Interaction) -> JoinHandle<DispatchOutcome> {
        let bot = Arc::clone(self);
        tokio::spawn(async move { bot.process_application_commands(interaction).await })
    }

    /// Registers commands, then serves interactions until the channel closes.
    pub async fn start(self: Arc<Self>, mut rx: mpsc::Receiver<Interaction>) -> Result<()> {
        info!(application_id = %self.config.application_id, "Command bot started");

        match self.on_connect().await {
            Ok(report) => info!(pending = report.pending.len(), "Commands ready"),
            Err(err) => {
                error!(error = %err, "Command registration failed");
                return Err(err.into());
            }
        }

        while let Some(interaction) = rx.recv().await {
            debug!(interaction_id = %interaction.id, "Interaction received");
            self.handle_interaction(interaction);
        }

        info!("Interaction stream closed");
        Ok(())
    }
}
