//! Interaction routing: registry lookup, subcommand walk, checks, invocation.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use clawcord_core::{
    CommandData, CommandDataOption, CommandKind, Event, EventBus, EventKind, Interaction,
    ModelCache, OptionChoice, Snowflake,
};

use crate::autocomplete::resolve_autocomplete;
use crate::command::Command;
use crate::context::InteractionContext;
use crate::error::CommandError;
use crate::handler::{Arguments, Check};
use crate::option::CommandOption;
use crate::registry::CommandRegistry;
use crate::resolve::Resolver;

/// What became of one interaction.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Not an application-command or autocomplete interaction.
    Ignored,
    /// No active command has this id.
    UnknownCommand(Snowflake),
    Completed,
    /// Suggestions to send back, already truncated.
    Autocompleted(Vec<OptionChoice>),
    Failed(CommandError),
}

impl DispatchOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// The option level a chat-input interaction lands on after walking its
/// subcommand and group nodes.
pub(crate) struct Target<'a> {
    pub(crate) path: String,
    pub(crate) declared: &'a [CommandOption],
    pub(crate) supplied: &'a [CommandDataOption],
    /// Group checks, then subcommand checks.
    pub(crate) checks: Vec<&'a Arc<dyn Check>>,
}

/// Descends at most two structural levels. A group must be followed by one
/// of its subcommands.
pub(crate) fn walk<'a>(command: &'a Command, data: &'a CommandData) -> Result<Target<'a>, CommandError> {
    let mut path = command.name().to_string();
    let mut declared = command.options();
    let mut supplied = data.options.as_slice();
    let mut checks = Vec::new();

    let mut in_group = false;
    for _ in 0..2 {
        let Some(first) = supplied.first() else { break };
        if !first.kind.is_structural() {
            break;
        }

        let node = declared
            .iter()
            .find(|o| o.name() == first.name && o.kind() == first.kind)
            .ok_or_else(|| CommandError::UnknownSubcommand {
                command: path.clone(),
                name: first.name.clone(),
            })?;

        path.push(' ');
        path.push_str(node.name());
        checks.extend(node.checks());
        declared = node.children();
        supplied = first.options.as_slice();
        in_group = node.kind().is_group();
        if !in_group {
            break;
        }
    }

    if in_group {
        return Err(CommandError::InvalidPayload(format!(
            "group '{path}' was invoked without a subcommand"
        )));
    }
    Ok(Target {
        path,
        declared,
        supplied,
        checks,
    })
}

pub struct Router {
    cache: Arc<dyn ModelCache>,
    events: EventBus,
    global_checks: Vec<Arc<dyn Check>>,
}

impl Router {
    pub fn new(cache: Arc<dyn ModelCache>, events: EventBus) -> Self {
        Self {
            cache,
            events,
            global_checks: Vec::new(),
        }
    }

    /// Adds a check that gates every command, ahead of module and command checks.
    pub fn add_check(&mut self, check: Arc<dyn Check>) {
        self.global_checks.push(check);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub async fn dispatch(
        &self,
        registry: &RwLock<CommandRegistry>,
        interaction: Arc<Interaction>,
    ) -> DispatchOutcome {
        if !interaction.is_application_command() && !interaction.is_autocomplete() {
            return DispatchOutcome::Ignored;
        }
        let Some(data) = interaction.data.as_ref() else {
            let err = CommandError::InvalidPayload("interaction has no command data".into());
            warn!(interaction_id = %interaction.id, error = %err, "Dropping interaction");
            return DispatchOutcome::Failed(err);
        };

        let command = registry.read().await.get_application_command(data.id);
        let Some(command) = command else {
            debug!(command_id = %data.id, name = %data.name, "Interaction for unknown command");
            self.events.publish(
                Event::new(
                    EventKind::UnknownApplicationCommand,
                    json!({ "command_id": data.id, "name": data.name, "type": data.kind }),
                )
                .with_interaction(interaction.id)
                .with_command(&data.name),
            );
            return DispatchOutcome::UnknownCommand(data.id);
        };

        if interaction.is_autocomplete() {
            return match resolve_autocomplete(&command, &interaction).await {
                Ok(choices) => DispatchOutcome::Autocompleted(choices),
                Err(err) => {
                    warn!(command = %command.name(), error = %err, "Autocomplete failed");
                    self.publish_failure(EventKind::AutocompleteError, &interaction, &command, &err);
                    DispatchOutcome::Failed(err)
                }
            };
        }

        match self.invoke(&command, &interaction).await {
            Ok(path) => {
                info!(command = %path, interaction_id = %interaction.id, "Command completed");
                self.events.publish(
                    Event::new(EventKind::ApplicationCommandCompletion, json!({ "path": path }))
                        .with_interaction(interaction.id)
                        .with_command(command.name()),
                );
                DispatchOutcome::Completed
            }
            Err(err) => {
                if err.is_check_failure() {
                    info!(command = %command.name(), error = %err, "Command blocked by check");
                } else {
                    error!(command = %command.name(), error = %err, "Command failed");
                }
                self.publish_failure(EventKind::ApplicationCommandError, &interaction, &command, &err);
                DispatchOutcome::Failed(err)
            }
        }
    }

    /// Resolves arguments for the command's surface, runs the check gate and
    /// calls the handler. Returns the qualified path that ran.
    async fn invoke(&self, command: &Command, interaction: &Arc<Interaction>) -> Result<String, CommandError> {
        let data = interaction
            .data
            .as_ref()
            .ok_or_else(|| CommandError::InvalidPayload("interaction has no command data".into()))?;
        if data.kind != command.kind() {
            return Err(CommandError::SurfaceMismatch {
                command: command.name().to_string(),
                expected: command.kind(),
                found: data.kind,
            });
        }

        let resolver = Resolver::new(self.cache.as_ref(), interaction);
        let (path, args, scoped_checks) = match command.kind() {
            CommandKind::ChatInput => {
                let target = walk(command, data)?;
                let values = resolver.options(target.declared, target.supplied)?;
                (target.path, Arguments::Options(values), target.checks)
            }
            CommandKind::User => {
                let id = target_id(data)?;
                let user = resolver.user(id).ok_or_else(|| {
                    CommandError::InvalidPayload(format!("target user {id} could not be resolved"))
                })?;
                (command.name().to_string(), Arguments::User(user), Vec::new())
            }
            CommandKind::Message => {
                let id = target_id(data)?;
                let message = resolver.message(id).ok_or_else(|| {
                    CommandError::InvalidPayload(format!("target message {id} could not be resolved"))
                })?;
                (command.name().to_string(), Arguments::Message(message), Vec::new())
            }
        };

        let ctx = InteractionContext::new(Arc::clone(interaction), path.clone());
        self.run_checks(command, &scoped_checks, &ctx).await?;

        self.events.publish(
            Event::new(EventKind::ApplicationCommandRun, json!({ "path": path }))
                .with_interaction(interaction.id)
                .with_command(command.name()),
        );
        command.invoke(ctx, args).await?;
        Ok(path)
    }

    /// Global, module, command, then group and subcommand checks. The first
    /// refusal or error stops the chain.
    async fn run_checks(
        &self,
        command: &Command,
        scoped: &[&Arc<dyn Check>],
        ctx: &InteractionContext,
    ) -> Result<(), CommandError> {
        let refused = |reason: String| CommandError::CheckFailure {
            command: ctx.command_path().to_string(),
            reason,
        };

        for check in &self.global_checks {
            gate(check.check(ctx).await, "global check").map_err(refused)?;
        }
        if let Some(cog) = command.cog() {
            gate(cog.cog_check(ctx).await, cog.name()).map_err(refused)?;
        }
        for check in command.checks() {
            gate(check.check(ctx).await, "command check").map_err(refused)?;
        }
        for check in scoped {
            gate(check.check(ctx).await, "subcommand check").map_err(refused)?;
        }
        Ok(())
    }

    fn publish_failure(&self, kind: EventKind, interaction: &Interaction, command: &Command, err: &CommandError) {
        self.events.publish(
            Event::new(
                kind,
                json!({ "error": err.to_string(), "check_failure": err.is_check_failure() }),
            )
            .with_interaction(interaction.id)
            .with_command(command.name()),
        );
    }
}

fn gate(result: anyhow::Result<bool>, source: &str) -> Result<(), String> {
    match result {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!("{source} returned false")),
        Err(err) => Err(format!("{source} raised: {err:#}")),
    }
}

fn target_id(data: &CommandData) -> Result<Snowflake, CommandError> {
    data.target_id
        .ok_or_else(|| CommandError::InvalidPayload("context menu interaction has no target_id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandConfig;
    use crate::handler::{Cog, check_fn, handler_fn};
    use crate::testing::{active_registry, counter_handler, interaction_from};
    use clawcord_core::NoCache;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::any::Any;
    use std::sync::atomic::Ordering;

    fn router() -> Router {
        Router::new(Arc::new(NoCache), EventBus::new())
    }

    fn chat(id: u64, name: &str, options: serde_json::Value) -> Arc<Interaction> {
        Arc::new(interaction_from(json!({
            "guild_id": "5",
            "data": {"id": id.to_string(), "name": name, "type": 1, "options": options}
        })))
    }

    #[tokio::test]
    async fn test_unknown_command_publishes_one_event() {
        let router = router();
        let mut rx = router.events().subscribe();
        let (handler, calls) = counter_handler();
        let registry = active_registry(vec![(
            100,
            Command::slash(handler, CommandConfig::named("ping")).unwrap(),
        )]);

        let outcome = router.dispatch(&registry, chat(999, "ghost", json!([]))).await;

        assert!(matches!(outcome, DispatchOutcome::UnknownCommand(Snowflake(999))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::UnknownApplicationCommand);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_group_routes_to_subcommand() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let record = Arc::clone(&seen);
        let clear = handler_fn(move |inv| {
            let record = Arc::clone(&record);
            async move {
                record.lock().push(inv.ctx.command_path().to_string());
                Ok(())
            }
        });
        let (root, root_calls) = counter_handler();
        let command = Command::slash(root, CommandConfig::named("perm"))
            .unwrap()
            .with_child(
                CommandOption::group("role", "Role perms")
                    .with_child(
                        CommandOption::subcommand("clear", "Clear", clear)
                            .with_child(CommandOption::string("reason", "Why").required(false))
                            .unwrap(),
                    )
                    .unwrap(),
            )
            .unwrap();
        let registry = active_registry(vec![(1, command)]);

        let outcome = router()
            .dispatch(
                &registry,
                chat(
                    1,
                    "perm",
                    json!([{"name": "role", "type": 2, "options": [
                        {"name": "clear", "type": 1, "options": [
                            {"name": "reason", "type": 3, "value": "spam"}
                        ]}
                    ]}]),
                ),
            )
            .await;

        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(*seen.lock(), vec!["perm role clear".to_string()]);
        assert_eq!(root_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_group_without_subcommand_fails() {
        let command = Command::slash(handler_fn(|_| async { Ok(()) }), CommandConfig::named("perm"))
            .unwrap()
            .with_child(
                CommandOption::group("role", "Role perms")
                    .with_child(CommandOption::subcommand("clear", "Clear", handler_fn(|_| async { Ok(()) })))
                    .unwrap(),
            )
            .unwrap();
        let registry = active_registry(vec![(1, command)]);
        let outcome = router()
            .dispatch(&registry, chat(1, "perm", json!([{"name": "role", "type": 2}])))
            .await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(CommandError::InvalidPayload(_))
        ));
    }

    struct Admin {
        allow: bool,
    }

    #[async_trait::async_trait]
    impl Cog for Admin {
        fn name(&self) -> &str {
            "admin"
        }

        async fn cog_check(&self, _ctx: &InteractionContext) -> anyhow::Result<bool> {
            Ok(self.allow)
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[tokio::test]
    async fn test_check_order_and_short_circuit() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let tracked = |label: &'static str, pass: bool| {
            let order = Arc::clone(&order);
            check_fn(move |_| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().push(label);
                    Ok(pass)
                }
            })
        };

        let mut router = router();
        router.add_check(tracked("global", true));
        let (handler, calls) = counter_handler();
        let command = Command::slash(handler, CommandConfig::named("kick"))
            .unwrap()
            .with_check(tracked("command", false))
            .with_check(tracked("never", true))
            .with_cog(Arc::new(Admin { allow: true }));
        let registry = active_registry(vec![(1, command)]);

        let outcome = router.dispatch(&registry, chat(1, "kick", json!([]))).await;

        match outcome {
            DispatchOutcome::Failed(err) => assert!(err.is_check_failure()),
            other => panic!("expected check failure, got {other:?}"),
        }
        assert_eq!(*order.lock(), vec!["global", "command"]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cog_check_blocks_and_receiver_is_passed() {
        let (handler, calls) = counter_handler();
        let blocked = Command::slash(handler, CommandConfig::named("kick"))
            .unwrap()
            .with_cog(Arc::new(Admin { allow: false }));

        let seen = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&seen);
        let allowed = Command::slash(
            handler_fn(move |inv| {
                let flag = Arc::clone(&flag);
                async move {
                    flag.store(inv.receiver::<Admin>().is_some(), Ordering::SeqCst);
                    Ok(())
                }
            }),
            CommandConfig::named("ban"),
        )
        .unwrap()
        .with_cog(Arc::new(Admin { allow: true }));
        let registry = active_registry(vec![(1, blocked), (2, allowed)]);
        let router = router();

        let outcome = router.dispatch(&registry, chat(1, "kick", json!([]))).await;
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let outcome = router.dispatch(&registry, chat(2, "ban", json!([]))).await;
        assert!(outcome.is_completed());
        assert!(seen.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_handler_error_publishes_error_event() {
        let router = router();
        let mut rx = router.events().subscribe();
        let command = Command::slash(
            handler_fn(|_| async { Err::<(), _>(anyhow::anyhow!("db down")) }),
            CommandConfig::named("stats"),
        )
        .unwrap();
        let registry = active_registry(vec![(1, command)]);

        let outcome = router.dispatch(&registry, chat(1, "stats", json!([]))).await;
        assert!(matches!(outcome, DispatchOutcome::Failed(CommandError::Handler { .. })));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok()).map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::ApplicationCommandRun, EventKind::ApplicationCommandError]
        );
    }

    #[tokio::test]
    async fn test_user_context_menu_receives_member() {
        let got = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&got);
        let command = Command::user(
            handler_fn(move |inv| {
                let slot = Arc::clone(&slot);
                async move {
                    if let Arguments::User(user) = inv.args {
                        *slot.lock() = user.id();
                    }
                    Ok(())
                }
            }),
            CommandConfig::named("ping"),
        )
        .unwrap();
        let registry = active_registry(vec![(3, command)]);
        let interaction = Arc::new(interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "3", "name": "ping", "type": 2, "target_id": "42",
                "resolved": {
                    "users": {"42": {"id": "42", "username": "ana"}},
                    "members": {"42": {"roles": []}}
                }}
        })));

        let outcome = router().dispatch(&registry, interaction).await;
        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(*got.lock(), Some(Snowflake(42)));
    }

    #[tokio::test]
    async fn test_message_context_menu_missing_target_fails() {
        let command = Command::message(handler_fn(|_| async { Ok(()) }), CommandConfig::named("Quote")).unwrap();
        let registry = active_registry(vec![(4, command)]);
        let interaction = Arc::new(interaction_from(json!({
            "data": {"id": "4", "name": "Quote", "type": 3, "target_id": "8"}
        })));
        let outcome = router().dispatch(&registry, interaction).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(CommandError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn test_ping_interaction_ignored() {
        let registry = active_registry(vec![]);
        let interaction = Arc::new(interaction_from(json!({"type": 1})));
        assert!(matches!(
            router().dispatch(&registry, interaction).await,
            DispatchOutcome::Ignored
        ));
    }
}
