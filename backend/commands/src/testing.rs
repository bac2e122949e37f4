//! In-process fakes shared by the unit tests of this crate.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::{Notify, RwLock};

use clawcord_core::{CommandKind, CommandPayload, Interaction, InteractionResponse, Snowflake};
use clawcord_http::{CommandHttp, HttpError};

use crate::command::Command;
use crate::handler::{CommandHandler, handler_fn};
use crate::registry::CommandRegistry;

pub(crate) const APP_ID: Snowflake = Snowflake(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    GetGlobal,
    UpsertGlobal(String),
    BulkGlobal(usize),
    DeleteGlobal(Snowflake),
    GetGuild(Snowflake),
    UpsertGuild(Snowflake, String),
    BulkGuild(Snowflake, usize),
    DeleteGuild(Snowflake, Snowflake),
    Respond(Snowflake),
}

#[derive(Default)]
struct FakeState {
    next_id: u64,
    global: Vec<CommandPayload>,
    guilds: BTreeMap<Snowflake, Vec<CommandPayload>>,
    forbidden: HashSet<Snowflake>,
    calls: Vec<Call>,
    responses: Vec<(Snowflake, InteractionResponse)>,
}

impl FakeState {
    fn assign(&mut self, mut payload: CommandPayload, guild_id: Option<Snowflake>) -> CommandPayload {
        self.next_id += 1;
        payload.id = Some(Snowflake(1000 + self.next_id));
        payload.application_id = Some(APP_ID);
        payload.guild_id = guild_id;
        payload.version = Some(Snowflake(self.next_id));
        payload
    }

    /// Upsert semantics: same (name, kind) keeps its id.
    fn store(&mut self, guild_id: Option<Snowflake>, payload: &CommandPayload) -> CommandPayload {
        let existing = self
            .scope(guild_id)
            .iter()
            .position(|r| r.key() == payload.key());
        let mut record = self.assign(payload.clone(), guild_id);
        if let Some(index) = existing {
            record.id = self.scope(guild_id)[index].id;
            self.scope(guild_id)[index] = record.clone();
        } else {
            self.scope(guild_id).push(record.clone());
        }
        record
    }

    fn scope(&mut self, guild_id: Option<Snowflake>) -> &mut Vec<CommandPayload> {
        match guild_id {
            Some(guild) => self.guilds.entry(guild).or_default(),
            None => &mut self.global,
        }
    }

    fn check_guild(&self, guild_id: Snowflake) -> Result<(), HttpError> {
        if self.forbidden.contains(&guild_id) {
            return Err(HttpError::MissingScope(format!("Missing Access to guild {guild_id}")));
        }
        Ok(())
    }
}

/// Remote command store that behaves like the platform's upsert endpoints.
#[derive(Default)]
pub(crate) struct FakeHttp {
    state: Mutex<FakeState>,
    stalling: AtomicBool,
    release: Notify,
}

impl FakeHttp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every call to this guild fails with a missing-scope error.
    pub(crate) fn forbid_guild(&self, guild_id: Snowflake) {
        self.state.lock().forbidden.insert(guild_id);
    }

    /// Stores a global record without counting it as a call.
    pub(crate) fn seed_global(&self, name: &str, kind: CommandKind) -> Snowflake {
        let payload = CommandPayload {
            id: None,
            application_id: None,
            guild_id: None,
            version: None,
            kind,
            name: name.to_string(),
            description: "seeded".to_string(),
            options: vec![],
            default_permission: true,
        };
        let mut state = self.state.lock();
        let record = state.store(None, &payload);
        record.id.unwrap_or(Snowflake(0))
    }

    /// Global upserts wait until [`release_upserts`](Self::release_upserts).
    pub(crate) fn stall_upserts(&self) {
        self.stalling.store(true, Ordering::SeqCst);
    }

    pub(crate) fn release_upserts(&self) {
        self.stalling.store(false, Ordering::SeqCst);
        self.release.notify_waiters();
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    /// Single upserts, global and guild.
    pub(crate) fn upsert_count(&self) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, Call::UpsertGlobal(_) | Call::UpsertGuild(..)))
            .count()
    }

    pub(crate) fn global_names(&self) -> Vec<String> {
        self.state.lock().global.iter().map(|r| r.name.clone()).collect()
    }

    pub(crate) fn responses(&self) -> Vec<(Snowflake, InteractionResponse)> {
        self.state.lock().responses.clone()
    }
}

fn not_found(id: Snowflake) -> HttpError {
    HttpError::NotFound(format!("Unknown application command {id}"))
}

#[async_trait]
impl CommandHttp for FakeHttp {
    async fn get_global_commands(&self, _app_id: Snowflake) -> Result<Vec<CommandPayload>, HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::GetGlobal);
        Ok(state.global.clone())
    }

    async fn get_global_command(
        &self,
        _app_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError> {
        let state = self.state.lock();
        state
            .global
            .iter()
            .find(|r| r.id == Some(command_id))
            .cloned()
            .ok_or_else(|| not_found(command_id))
    }

    async fn upsert_global_command(
        &self,
        _app_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError> {
        if self.stalling.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        let mut state = self.state.lock();
        state.calls.push(Call::UpsertGlobal(command.name.clone()));
        Ok(state.store(None, command))
    }

    async fn bulk_upsert_global_commands(
        &self,
        _app_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::BulkGlobal(commands.len()));
        let previous = std::mem::take(&mut state.global);
        let mut records = Vec::new();
        for command in commands {
            let kept = previous.iter().find(|r| r.key() == command.key()).and_then(|r| r.id);
            let mut record = state.assign(command.clone(), None);
            if kept.is_some() {
                record.id = kept;
            }
            records.push(record);
        }
        state.global = records.clone();
        Ok(records)
    }

    async fn delete_global_command(&self, _app_id: Snowflake, command_id: Snowflake) -> Result<(), HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeleteGlobal(command_id));
        let before = state.global.len();
        state.global.retain(|r| r.id != Some(command_id));
        if state.global.len() == before {
            return Err(not_found(command_id));
        }
        Ok(())
    }

    async fn get_guild_commands(
        &self,
        _app_id: Snowflake,
        guild_id: Snowflake,
    ) -> Result<Vec<CommandPayload>, HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::GetGuild(guild_id));
        state.check_guild(guild_id)?;
        Ok(state.guilds.get(&guild_id).cloned().unwrap_or_default())
    }

    async fn get_guild_command(
        &self,
        _app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<CommandPayload, HttpError> {
        let state = self.state.lock();
        state.check_guild(guild_id)?;
        state
            .guilds
            .get(&guild_id)
            .and_then(|records| records.iter().find(|r| r.id == Some(command_id)))
            .cloned()
            .ok_or_else(|| not_found(command_id))
    }

    async fn upsert_guild_command(
        &self,
        _app_id: Snowflake,
        guild_id: Snowflake,
        command: &CommandPayload,
    ) -> Result<CommandPayload, HttpError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::UpsertGuild(guild_id, command.name.clone()));
        state.check_guild(guild_id)?;
        Ok(state.store(Some(guild_id), command))
    }

    async fn bulk_upsert_guild_commands(
        &self,
        _app_id: Snowflake,
        guild_id: Snowflake,
        commands: &[CommandPayload],
    ) -> Result<Vec<CommandPayload>, HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::BulkGuild(guild_id, commands.len()));
        state.check_guild(guild_id)?;
        let records: Vec<CommandPayload> = commands
            .iter()
            .map(|c| state.assign(c.clone(), Some(guild_id)))
            .collect();
        state.guilds.insert(guild_id, records.clone());
        Ok(records)
    }

    async fn delete_guild_command(
        &self,
        _app_id: Snowflake,
        guild_id: Snowflake,
        command_id: Snowflake,
    ) -> Result<(), HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::DeleteGuild(guild_id, command_id));
        state.check_guild(guild_id)?;
        if let Some(records) = state.guilds.get_mut(&guild_id) {
            records.retain(|r| r.id != Some(command_id));
        }
        Ok(())
    }

    async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        _token: &str,
        response: &InteractionResponse,
    ) -> Result<(), HttpError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Respond(interaction_id));
        state.responses.push((interaction_id, response.clone()));
        Ok(())
    }
}

/// An interaction with placeholder envelope fields; keys in `overrides` win.
pub(crate) fn interaction_from(overrides: Value) -> Interaction {
    let mut value = json!({
        "id": "5000",
        "application_id": APP_ID,
        "type": 2,
        "token": "interaction-token",
    });
    if let (Some(base), Value::Object(extra)) = (value.as_object_mut(), overrides) {
        base.extend(extra);
    }
    Interaction::from_value(value).unwrap()
}

pub(crate) fn chat_interaction(command_id: u64, name: &str, options: Value) -> Interaction {
    interaction_from(json!({
        "data": {"id": command_id.to_string(), "name": name, "type": 1, "options": options}
    }))
}

/// A handler that only counts its calls.
pub(crate) fn counter_handler() -> (Arc<dyn CommandHandler>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = handler_fn(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(()) }
    });
    (handler, calls)
}

/// A registry whose commands are already active under the given remote ids.
pub(crate) fn active_registry(commands: Vec<(u64, Command)>) -> RwLock<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    for (id, mut command) in commands {
        let mut record = command.to_payload();
        record.id = Some(Snowflake(id));
        command.apply_remote(None, &record);
        registry.activate(command);
    }
    RwLock::new(registry)
}
