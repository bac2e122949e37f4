//! The command descriptor: one user-declared command on one surface.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use clawcord_core::{CommandKind, CommandPayload, Snowflake};

use crate::context::InteractionContext;
use crate::error::{CommandError, ConfigurationError};
use crate::handler::{Arguments, Check, Cog, CommandHandler, Invocation};
use crate::option::{self, CommandOption, Parent, attach, serialize_children};
use crate::permissions::{CommandPermissions, PermissionOverwrite};

pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Declaration-time settings for a [`Command`].
#[derive(Debug, Clone, Default)]
pub struct CommandConfig {
    /// Falls back to [`CommandHandler::name`].
    pub name: Option<String>,
    /// Falls back to [`CommandHandler::description`], then [`DEFAULT_DESCRIPTION`].
    /// Ignored for context menus.
    pub description: Option<String>,
    /// Empty means global.
    pub guild_ids: Vec<Snowflake>,
    /// Defaults to `true`.
    pub default_permission: Option<bool>,
    /// Free-form user data carried alongside the command.
    pub extras: HashMap<String, Value>,
}

impl CommandConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn guild(mut self, guild_id: impl Into<Snowflake>) -> Self {
        self.guild_ids.push(guild_id.into());
        self
    }

    pub fn guilds(mut self, guild_ids: impl IntoIterator<Item = Snowflake>) -> Self {
        self.guild_ids.extend(guild_ids);
        self
    }

    pub fn default_permission(mut self, allowed: bool) -> Self {
        self.default_permission = Some(allowed);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extras.insert(key.into(), value);
        self
    }
}

#[derive(Clone)]
pub struct Command {
    name: String,
    description: String,
    kind: CommandKind,
    guild_ids: BTreeSet<Snowflake>,
    default_permission: bool,
    id: Option<Snowflake>,
    application_id: Option<Snowflake>,
    version: Option<Snowflake>,
    /// Remote id per guild for guild-scoped commands.
    scoped_ids: BTreeMap<Snowflake, Snowflake>,
    options: Vec<CommandOption>,
    handler: Arc<dyn CommandHandler>,
    checks: Vec<Arc<dyn Check>>,
    cog: Option<Arc<dyn Cog>>,
    permissions: BTreeMap<Snowflake, CommandPermissions>,
    extras: HashMap<String, Value>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("guild_ids", &self.guild_ids)
            .field("id", &self.id)
            .field("scoped_ids", &self.scoped_ids)
            .field("options", &self.options)
            .field("checks", &self.checks.len())
            .field("cog", &self.cog.as_ref().map(|c| c.name().to_string()))
            .finish()
    }
}

impl Command {
    pub fn new(
        kind: CommandKind,
        handler: Arc<dyn CommandHandler>,
        config: CommandConfig,
    ) -> Result<Self, ConfigurationError> {
        let name = config
            .name
            .or_else(|| handler.name().map(str::to_string))
            .ok_or(ConfigurationError::MissingName)?;

        let description = if kind.is_context_menu() {
            String::new()
        } else {
            config
                .description
                .or_else(|| handler.description().map(str::to_string))
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string())
        };

        if kind.is_context_menu() {
            let len = name.chars().count();
            if len == 0 || len > option::MAX_NAME_LEN {
                return Err(ConfigurationError::InvalidName {
                    name,
                    reason: "must be 1-32 characters",
                });
            }
        } else {
            option::validate_chat_name(&name)?;
            option::validate_description(&name, &description)?;
        }

        Ok(Self {
            name,
            description,
            kind,
            guild_ids: config.guild_ids.into_iter().collect(),
            default_permission: config.default_permission.unwrap_or(true),
            id: None,
            application_id: None,
            version: None,
            scoped_ids: BTreeMap::new(),
            options: Vec::new(),
            handler,
            checks: Vec::new(),
            cog: None,
            permissions: BTreeMap::new(),
            extras: config.extras,
        })
    }

    /// A chat-input (slash) command.
    pub fn slash(handler: Arc<dyn CommandHandler>, config: CommandConfig) -> Result<Self, ConfigurationError> {
        Self::new(CommandKind::ChatInput, handler, config)
    }

    /// A user context-menu command.
    pub fn user(handler: Arc<dyn CommandHandler>, config: CommandConfig) -> Result<Self, ConfigurationError> {
        Self::new(CommandKind::User, handler, config)
    }

    /// A message context-menu command.
    pub fn message(handler: Arc<dyn CommandHandler>, config: CommandConfig) -> Result<Self, ConfigurationError> {
        Self::new(CommandKind::Message, handler, config)
    }

    // -- accessors --------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn guild_ids(&self) -> impl Iterator<Item = Snowflake> + '_ {
        self.guild_ids.iter().copied()
    }

    pub fn is_global(&self) -> bool {
        self.guild_ids.is_empty()
    }

    pub fn in_guild(&self, guild_id: Snowflake) -> bool {
        self.guild_ids.contains(&guild_id)
    }

    pub fn default_permission(&self) -> bool {
        self.default_permission
    }

    /// Remote id; for guild commands, the first one assigned.
    pub fn id(&self) -> Option<Snowflake> {
        self.id
    }

    pub fn application_id(&self) -> Option<Snowflake> {
        self.application_id
    }

    pub fn version(&self) -> Option<Snowflake> {
        self.version
    }

    pub fn guild_command_id(&self, guild_id: Snowflake) -> Option<Snowflake> {
        self.scoped_ids.get(&guild_id).copied()
    }

    pub fn is_synced(&self) -> bool {
        self.id.is_some()
    }

    /// Every remote id this command answers to.
    pub fn remote_ids(&self) -> Vec<Snowflake> {
        let mut ids: Vec<Snowflake> = self.id.into_iter().collect();
        for id in self.scoped_ids.values() {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids
    }

    pub(crate) fn scoped_ids(&self) -> &BTreeMap<Snowflake, Snowflake> {
        &self.scoped_ids
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    pub fn cog(&self) -> Option<&Arc<dyn Cog>> {
        self.cog.as_ref()
    }

    pub fn extras(&self) -> &HashMap<String, Value> {
        &self.extras
    }

    pub fn matches(&self, name: &str, kind: CommandKind) -> bool {
        self.name == name && self.kind == kind
    }

    // -- option tree ------------------------------------------------------

    pub fn options(&self) -> &[CommandOption] {
        &self.options
    }

    pub fn add_child(&mut self, child: CommandOption) -> Result<(), ConfigurationError> {
        if self.kind.is_context_menu() {
            return Err(ConfigurationError::OptionsOnContextMenu(self.name.clone()));
        }
        attach(&mut self.options, &self.name, Parent::Root, child, None)
    }

    /// Places a top-level option at `index` instead of appending it.
    pub fn insert_child(&mut self, index: usize, child: CommandOption) -> Result<(), ConfigurationError> {
        if self.kind.is_context_menu() {
            return Err(ConfigurationError::OptionsOnContextMenu(self.name.clone()));
        }
        attach(&mut self.options, &self.name, Parent::Root, child, Some(index))
    }

    pub fn with_child(mut self, child: CommandOption) -> Result<Self, ConfigurationError> {
        self.add_child(child)?;
        Ok(self)
    }

    pub fn get_child(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.name() == name)
    }

    pub fn get_child_mut(&mut self, name: &str) -> Option<&mut CommandOption> {
        self.options.iter_mut().find(|o| o.name() == name)
    }

    pub fn remove_child(&mut self, name: &str) -> Option<CommandOption> {
        let index = self.options.iter().position(|o| o.name() == name)?;
        Some(self.options.remove(index))
    }

    pub fn has_subcommands(&self) -> bool {
        self.options.iter().any(|o| o.kind().is_structural())
    }

    // -- checks, module, permissions -------------------------------------

    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        self.checks.push(check);
    }

    pub fn with_check(mut self, check: Arc<dyn Check>) -> Self {
        self.add_check(check);
        self
    }

    /// Removes a previously added check by identity.
    pub fn remove_check(&mut self, check: &Arc<dyn Check>) -> bool {
        let before = self.checks.len();
        self.checks.retain(|c| !Arc::ptr_eq(c, check));
        self.checks.len() != before
    }

    /// Binds the command, and every subcommand below it, to a module instance.
    pub fn with_cog(mut self, cog: Arc<dyn Cog>) -> Self {
        self.cog = Some(cog);
        self
    }

    /// Adds or replaces the overwrite for one role or user in `guild_id`.
    pub fn add_permission_overwrite(&mut self, guild_id: Snowflake, overwrite: PermissionOverwrite) {
        self.permissions
            .entry(guild_id)
            .or_insert_with(|| CommandPermissions::new(guild_id))
            .add_overwrite(overwrite);
    }

    /// Replaces the whole overwrite set of one guild.
    pub fn set_permissions(&mut self, permissions: CommandPermissions) {
        self.permissions.insert(permissions.guild_id, permissions);
    }

    pub fn get_permissions(&self, guild_id: Snowflake) -> Option<&CommandPermissions> {
        self.permissions.get(&guild_id)
    }

    pub fn permissions(&self) -> impl Iterator<Item = &CommandPermissions> {
        self.permissions.values()
    }

    // -- remote state -----------------------------------------------------

    /// Upsert body for this command. Server-assigned fields are left out.
    pub fn to_payload(&self) -> CommandPayload {
        CommandPayload {
            id: None,
            application_id: None,
            guild_id: None,
            version: None,
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            options: serialize_children(&self.options),
            default_permission: self.default_permission,
        }
    }

    /// Copies the server-assigned fields of `record` onto this command.
    /// `guild_id` overrides the record's own guild when given.
    pub fn apply_remote(&mut self, guild_id: Option<Snowflake>, record: &CommandPayload) {
        let Some(id) = record.id else { return };
        if let Some(guild) = guild_id.or(record.guild_id) {
            self.scoped_ids.insert(guild, id);
        }
        self.id.get_or_insert(id);
        if record.application_id.is_some() {
            self.application_id = record.application_id;
        }
        if record.version.is_some() {
            self.version = record.version;
        }
    }

    /// Forgets all remote state, returning the command to its declared form.
    pub(crate) fn clear_remote(&mut self) {
        self.id = None;
        self.application_id = None;
        self.version = None;
        self.scoped_ids.clear();
    }

    pub(crate) fn forget_guild(&mut self, guild_id: Snowflake) -> Option<Snowflake> {
        let removed = self.scoped_ids.remove(&guild_id)?;
        if self.id == Some(removed) {
            self.id = self.scoped_ids.values().next().copied();
        }
        Some(removed)
    }

    // -- invocation -------------------------------------------------------

    /// The handler addressed by a qualified path such as `"perm role clear"`.
    pub fn handler_for(&self, path: &str) -> Option<&Arc<dyn CommandHandler>> {
        let mut segments = path.split(' ');
        if segments.next() != Some(self.name.as_str()) {
            return None;
        }

        let mut handler = &self.handler;
        let mut level = self.options.as_slice();
        let mut at_group = false;
        for segment in segments {
            let node = level
                .iter()
                .find(|o| o.kind().is_structural() && o.name() == segment)?;
            at_group = node.kind().is_group();
            if let Some(h) = node.handler() {
                handler = h;
            }
            level = node.children();
        }
        (!at_group).then_some(handler)
    }

    /// Runs the handler addressed by `ctx.command_path()` with the module receiver
    /// attached. The argument shape must match this command's surface.
    pub async fn invoke(&self, ctx: InteractionContext, args: Arguments) -> Result<(), CommandError> {
        let found = match &args {
            Arguments::Options(_) => CommandKind::ChatInput,
            Arguments::User(_) => CommandKind::User,
            Arguments::Message(_) => CommandKind::Message,
        };
        if found != self.kind {
            return Err(CommandError::SurfaceMismatch {
                command: self.name.clone(),
                expected: self.kind,
                found,
            });
        }

        let path = ctx.command_path().to_string();
        let handler = self
            .handler_for(&path)
            .ok_or_else(|| CommandError::NotInvokable(path.clone()))?;

        let invocation = Invocation {
            ctx,
            cog: self.cog.clone(),
            args,
        };
        handler
            .call(invocation)
            .await
            .map_err(|error| CommandError::Handler {
                command: path,
                error,
            })
    }
}
