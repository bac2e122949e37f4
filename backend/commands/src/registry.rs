//! Local command registry and its reconciliation with the platform.
//!
//! Commands start out *pending*: declared locally, no remote id. Syncing or
//! clean-registering them against the platform assigns remote ids and moves
//! them to the *active* map, which the router consults on every interaction.
//! A guild command registered in several guilds answers to several remote ids;
//! every one of them points at the same shared descriptor.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use clawcord_core::{CommandKind, CommandPayload, Snowflake};
use clawcord_http::{CommandHttp, HttpError};

use crate::command::Command;
use crate::error::{CommandError, ConfigurationError};

/// Knobs shared by sync and clean register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Delete remote global commands that match no pending declaration.
    pub delete_unregistered: bool,
    /// Treat a guild refusing registration for lack of scope as a warning.
    pub ignore_guild_register_fail: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            delete_unregistered: false,
            ignore_guild_register_fail: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildFailure {
    pub command: String,
    pub guild_id: Snowflake,
    pub error: String,
}

/// What one reconciliation run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Remote ids taken over from existing records without an upsert.
    pub adopted: Vec<Snowflake>,
    /// Remote ids created or overwritten by an upsert.
    pub registered: Vec<Snowflake>,
    pub deleted: Vec<Snowflake>,
    /// Remote global commands with no local declaration, left in place.
    pub orphaned: Vec<Snowflake>,
    /// Names still pending after the run.
    pub pending: Vec<String>,
    pub guild_failures: Vec<GuildFailure>,
}

#[derive(Debug, Default)]
pub struct CommandRegistry {
    pending: Vec<Command>,
    active: HashMap<Snowflake, Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Pending
    // -----------------------------------------------------------------------

    pub fn add_pending_command(&mut self, command: Command) {
        debug!(command = %command.name(), kind = %command.kind(), "Command queued for registration");
        self.pending.push(command);
    }

    pub fn remove_pending_command(&mut self, name: &str, kind: CommandKind) -> Option<Command> {
        let index = self.pending.iter().position(|c| c.matches(name, kind))?;
        Some(self.pending.remove(index))
    }

    pub fn pending_commands(&self) -> &[Command] {
        &self.pending
    }

    // -----------------------------------------------------------------------
    // Active
    // -----------------------------------------------------------------------

    pub fn get_application_command(&self, id: Snowflake) -> Option<Arc<Command>> {
        self.active.get(&id).cloned()
    }

    /// Every active command once, ordered by name.
    pub fn application_commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> = Vec::new();
        for command in self.active.values() {
            if !commands.iter().any(|c| Arc::ptr_eq(c, command)) {
                commands.push(Arc::clone(command));
            }
        }
        commands.sort_by(|a, b| (a.name(), a.kind()).cmp(&(b.name(), b.kind())));
        commands
    }

    /// Forgets a command locally, under every remote id it answers to.
    /// The platform keeps it; interactions for it become unknown.
    pub fn remove_application_command(&mut self, id: Snowflake) -> Option<Arc<Command>> {
        let command = self.active.remove(&id)?;
        self.active.retain(|_, c| !Arc::ptr_eq(c, &command));
        Some(command)
    }

    pub(crate) fn activate(&mut self, command: Command) -> Arc<Command> {
        let ids = command.remote_ids();
        let command = Arc::new(command);
        for id in ids {
            if let Some(previous) = self.active.insert(id, Arc::clone(&command)) {
                warn!(id = %id, previous = %previous.name(), command = %command.name(), "Remote id reassigned");
            }
        }
        info!(command = %command.name(), kind = %command.kind(), "Command active");
        command
    }

    /// Drops `previous` under every id it answers to and activates
    /// `replacement`, if any. Nothing awaits in between, so dispatch sees
    /// either the old entry or the new one.
    pub(crate) fn replace(
        &mut self,
        previous: &Arc<Command>,
        replacement: Option<Command>,
    ) -> Option<Arc<Command>> {
        self.active.retain(|_, c| !Arc::ptr_eq(c, previous));
        replacement.map(|command| self.activate(command))
    }

    fn is_active(&self, id: Snowflake) -> bool {
        self.active.contains_key(&id)
    }

    // -----------------------------------------------------------------------
    // Remote edits
    // -----------------------------------------------------------------------

    /// Deletes a command on the platform and locally. With `guild_id`, only
    /// that guild's registration is removed and the command stays active in
    /// its other guilds.
    pub async fn delete_application_command(
        &mut self,
        http: &dyn CommandHttp,
        application_id: Snowflake,
        id: Snowflake,
        guild_id: Option<Snowflake>,
    ) -> Result<Arc<Command>, CommandError> {
        let command = self
            .get_application_command(id)
            .ok_or(CommandError::NotFound(id))?;
        let remaining = delete_remote(http, application_id, &command, id, guild_id).await?;
        self.replace(&command, remaining);
        Ok(command)
    }

    /// Applies `edit` to a copy of an active command, re-upserts it to every
    /// scope it is declared for, and swaps the copy in.
    pub async fn edit_application_command<F>(
        &mut self,
        http: &dyn CommandHttp,
        application_id: Snowflake,
        id: Snowflake,
        edit: F,
    ) -> Result<Arc<Command>, CommandError>
    where
        F: FnOnce(&mut Command) -> Result<(), ConfigurationError> + Send,
    {
        let current = self
            .get_application_command(id)
            .ok_or(CommandError::NotFound(id))?;
        let edited = upsert_edited(http, application_id, &current, edit).await?;
        self.replace(&current, Some(edited))
            .ok_or(CommandError::NotFound(id))
    }

    // -----------------------------------------------------------------------
    // Sync
    // -----------------------------------------------------------------------

    /// Incremental reconciliation.
    ///
    /// Remote global records matching a pending declaration by (name, kind)
    /// are adopted as-is. Unmatched remote records are deleted or left alone
    /// per `options`. Whatever is still pending afterwards is upserted one by
    /// one. Running it twice without new declarations makes no upserts.
    pub async fn sync(
        &mut self,
        http: &dyn CommandHttp,
        application_id: Snowflake,
        options: SyncOptions,
    ) -> Result<SyncReport, CommandError> {
        let mut report = SyncReport::default();
        if self.pending.is_empty() && !options.delete_unregistered {
            debug!("Nothing pending; skipping command sync");
            return Ok(report);
        }

        let remote = http.get_global_commands(application_id).await?;
        for record in &remote {
            let Some(remote_id) = record.id else { continue };
            if self.is_active(remote_id) {
                continue;
            }

            match self.take_pending_global(&record.name, record.kind) {
                Some(mut command) => {
                    command.apply_remote(None, record);
                    debug!(command = %command.name(), id = %remote_id, "Adopted existing command");
                    report.adopted.push(remote_id);
                    self.activate(command);
                }
                None if options.delete_unregistered => {
                    http.delete_global_command(application_id, remote_id)
                        .await?;
                    info!(command = %record.name, id = %remote_id, "Deleted unregistered command");
                    report.deleted.push(remote_id);
                }
                None => {
                    debug!(command = %record.name, id = %remote_id, "Remote command has no local declaration");
                    report.orphaned.push(remote_id);
                }
            }
        }

        let mut queue = std::mem::take(&mut self.pending).into_iter();
        while let Some(command) = queue.next() {
            match self
                .upsert_one(http, application_id, command, options, &mut report)
                .await
            {
                Ok(None) => {}
                Ok(Some(unregistered)) => self.pending.push(unregistered),
                Err((command, err)) => {
                    self.pending.push(command);
                    self.pending.extend(queue);
                    return Err(err);
                }
            }
        }

        report.pending = self.pending_names();
        info!(
            adopted = report.adopted.len(),
            registered = report.registered.len(),
            deleted = report.deleted.len(),
            pending = report.pending.len(),
            "Application commands synced"
        );
        Ok(report)
    }

    fn take_pending_global(&mut self, name: &str, kind: CommandKind) -> Option<Command> {
        let index = self
            .pending
            .iter()
            .position(|c| c.is_global() && c.matches(name, kind))?;
        Some(self.pending.remove(index))
    }

    /// Upserts one pending command to every scope it is declared for.
    /// Returns the command back when no scope accepted it.
    async fn upsert_one(
        &mut self,
        http: &dyn CommandHttp,
        application_id: Snowflake,
        mut command: Command,
        options: SyncOptions,
        report: &mut SyncReport,
    ) -> Result<Option<Command>, (Command, CommandError)> {
        let payload = command.to_payload();

        if command.is_global() {
            return match http.upsert_global_command(application_id, &payload).await {
                Ok(record) => {
                    command.apply_remote(None, &record);
                    report.registered.extend(record.id);
                    self.activate(command);
                    Ok(None)
                }
                Err(err) => {
                    command.clear_remote();
                    Err((command, err.into()))
                }
            };
        }

        let guilds: Vec<Snowflake> = command.guild_ids().collect();
        for guild in guilds {
            match http
                .upsert_guild_command(application_id, guild, &payload)
                .await
            {
                Ok(record) => {
                    command.apply_remote(Some(guild), &record);
                    report.registered.extend(record.id);
                }
                Err(err) if tolerated(&err, options) => {
                    warn!(command = %command.name(), guild_id = %guild, error = %err, "Guild refused command registration");
                    report.guild_failures.push(GuildFailure {
                        command: command.name().to_string(),
                        guild_id: guild,
                        error: err.to_string(),
                    });
                }
                Err(err) => {
                    command.clear_remote();
                    return Err((command, err.into()));
                }
            }
        }

        if command.is_synced() {
            self.activate(command);
            Ok(None)
        } else {
            Ok(Some(command))
        }
    }

    // -----------------------------------------------------------------------
    // Clean register
    // -----------------------------------------------------------------------

    /// Bulk-overwrites the global set and each referenced guild's set with
    /// every declared command, active and pending alike, then promotes every
    /// command that received a remote id. A repeated run resends the same set.
    ///
    /// Promotion happens even when a later step fails. When the failure left
    /// the platform untouched, the previous local state is kept.
    pub async fn clean_register(
        &mut self,
        http: &dyn CommandHttp,
        application_id: Snowflake,
        options: SyncOptions,
    ) -> Result<SyncReport, CommandError> {
        let mut report = SyncReport::default();
        let previous_pending = self.pending.clone();
        let declared: Vec<Command> = self
            .application_commands()
            .iter()
            .map(|command| {
                let mut command = (**command).clone();
                command.clear_remote();
                command
            })
            .chain(std::mem::take(&mut self.pending))
            .collect();
        let previous_active = std::mem::take(&mut self.active);

        let (mut global, mut scoped): (Vec<Command>, Vec<Command>) =
            declared.into_iter().partition(Command::is_global);

        let outcome = bulk_register(
            http,
            application_id,
            options,
            &mut global,
            &mut scoped,
            &mut report,
        )
        .await;

        if outcome.is_err() && report.registered.is_empty() {
            self.active = previous_active;
            self.pending = previous_pending;
            return outcome.map(|()| report);
        }

        for command in global.into_iter().chain(scoped) {
            if command.is_synced() {
                self.activate(command);
            } else {
                if outcome.is_ok() {
                    warn!(command = %command.name(), "No remote record returned; command stays pending");
                }
                self.pending.push(command);
            }
        }
        report.pending = self.pending_names();

        outcome?;
        info!(
            registered = report.registered.len(),
            pending = report.pending.len(),
            "Application commands registered"
        );
        Ok(report)
    }

    fn pending_names(&self) -> Vec<String> {
        self.pending.iter().map(|c| c.name().to_string()).collect()
    }
}

/// Remote half of a delete. Returns what is left of the command when it is
/// still registered in other guilds.
pub(crate) async fn delete_remote(
    http: &dyn CommandHttp,
    application_id: Snowflake,
    command: &Command,
    id: Snowflake,
    guild_id: Option<Snowflake>,
) -> Result<Option<Command>, CommandError> {
    if command.is_global() {
        http.delete_global_command(application_id, id).await?;
        info!(command = %command.name(), id = %id, "Deleted global command");
        return Ok(None);
    }

    let targets: Vec<(Snowflake, Snowflake)> = match guild_id {
        Some(guild) => {
            let remote = command
                .guild_command_id(guild)
                .ok_or(CommandError::NotFound(id))?;
            vec![(guild, remote)]
        }
        None => command
            .scoped_ids()
            .iter()
            .map(|(guild, remote)| (*guild, *remote))
            .collect(),
    };

    let mut remaining = command.clone();
    for (guild, remote) in targets {
        http.delete_guild_command(application_id, guild, remote)
            .await?;
        info!(command = %command.name(), guild_id = %guild, id = %remote, "Deleted guild command");
        remaining.forget_guild(guild);
    }
    Ok(remaining.is_synced().then_some(remaining))
}

/// Remote half of an edit: applies `edit` to a copy of `current` and
/// re-upserts the copy to every scope it is declared for.
pub(crate) async fn upsert_edited<F>(
    http: &dyn CommandHttp,
    application_id: Snowflake,
    current: &Command,
    edit: F,
) -> Result<Command, CommandError>
where
    F: FnOnce(&mut Command) -> Result<(), ConfigurationError> + Send,
{
    let mut edited = current.clone();
    edit(&mut edited)?;
    edited.clear_remote();

    let payload = edited.to_payload();
    if edited.is_global() {
        let record = http
            .upsert_global_command(application_id, &payload)
            .await?;
        edited.apply_remote(None, &record);
    } else {
        let guilds: Vec<Snowflake> = edited.guild_ids().collect();
        for guild in guilds {
            let record = http
                .upsert_guild_command(application_id, guild, &payload)
                .await?;
            edited.apply_remote(Some(guild), &record);
        }
    }
    info!(command = %edited.name(), "Edited application command");
    Ok(edited)
}

fn tolerated(err: &HttpError, options: SyncOptions) -> bool {
    err.is_missing_scope() && options.ignore_guild_register_fail
}

async fn bulk_register(
    http: &dyn CommandHttp,
    application_id: Snowflake,
    options: SyncOptions,
    global: &mut [Command],
    scoped: &mut [Command],
    report: &mut SyncReport,
) -> Result<(), CommandError> {
    let payloads: Vec<CommandPayload> = global.iter().map(Command::to_payload).collect();
    let records = http
        .bulk_upsert_global_commands(application_id, &payloads)
        .await?;
    match_records(global.iter_mut(), &records, None, report);

    let guilds: BTreeSet<Snowflake> = scoped.iter().flat_map(|c| c.guild_ids()).collect();
    for guild in guilds {
        let payloads: Vec<CommandPayload> = scoped
            .iter()
            .filter(|c| c.in_guild(guild))
            .map(Command::to_payload)
            .collect();

        match http
            .bulk_upsert_guild_commands(application_id, guild, &payloads)
            .await
        {
            Ok(records) => {
                match_records(
                    scoped.iter_mut().filter(|c| c.in_guild(guild)),
                    &records,
                    Some(guild),
                    report,
                );
            }
            Err(err) if tolerated(&err, options) => {
                warn!(guild_id = %guild, error = %err, "Guild refused command registration");
                for command in scoped.iter().filter(|c| c.in_guild(guild)) {
                    report.guild_failures.push(GuildFailure {
                        command: command.name().to_string(),
                        guild_id: guild,
                        error: err.to_string(),
                    });
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Pairs each command with the first unclaimed record of the same (name, kind).
fn match_records<'a>(
    commands: impl Iterator<Item = &'a mut Command>,
    records: &[CommandPayload],
    guild_id: Option<Snowflake>,
    report: &mut SyncReport,
) {
    let mut claimed = vec![false; records.len()];
    for command in commands {
        let found = records
            .iter()
            .enumerate()
            .find(|(i, r)| !claimed[*i] && command.matches(&r.name, r.kind));
        match found {
            Some((index, record)) => {
                claimed[index] = true;
                command.apply_remote(guild_id, record);
                report.registered.extend(record.id);
            }
            None => {
                warn!(command = %command.name(), kind = %command.kind(), "Bulk response is missing command");
            }
        }
    }
}
