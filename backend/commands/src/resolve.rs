//! Turns raw interaction option values into typed [`OptionValue`]s.
//!
//! Entity options are looked up in the model cache first and fall back to the
//! payload's `resolved` section. Ids neither can resolve become
//! [`OptionValue::Missing`] rather than an error.

use serde_json::Value;

use clawcord_core::{
    CommandDataOption, Interaction, Message, ModelCache, OptionKind, Resolved, Role, Snowflake,
    Channel,
};

use crate::error::CommandError;
use crate::handler::{Mentionable, OptionValue, OptionValues, ResolvedUser};
use crate::option::CommandOption;

pub(crate) struct Resolver<'a> {
    cache: &'a dyn ModelCache,
    guild_id: Option<Snowflake>,
    resolved: Option<&'a Resolved>,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(cache: &'a dyn ModelCache, interaction: &'a Interaction) -> Self {
        let data = interaction.data.as_ref();
        Self {
            cache,
            guild_id: interaction
                .guild_id
                .or_else(|| data.and_then(|d| d.guild_id)),
            resolved: data.map(|d| &d.resolved),
        }
    }

    /// In a guild: cached member, then payload member, then bare payload user.
    /// Outside one: cached user, then payload user.
    pub(crate) fn user(&self, id: Snowflake) -> Option<ResolvedUser> {
        let from_payload_user = || {
            self.resolved
                .and_then(|r| r.users.get(&id))
                .cloned()
                .map(ResolvedUser::User)
        };

        match self.guild_id {
            Some(guild) => self
                .cache
                .member(guild, id)
                .or_else(|| self.resolved.and_then(|r| r.member(id)))
                .map(ResolvedUser::Member)
                .or_else(from_payload_user),
            None => self
                .cache
                .user(id)
                .map(ResolvedUser::User)
                .or_else(from_payload_user),
        }
    }

    pub(crate) fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.cache
            .channel(self.guild_id, id)
            .or_else(|| self.resolved.and_then(|r| r.channels.get(&id)).cloned())
    }

    pub(crate) fn role(&self, id: Snowflake) -> Option<Role> {
        self.guild_id
            .and_then(|guild| self.cache.role(guild, id))
            .or_else(|| self.resolved.and_then(|r| r.roles.get(&id)).cloned())
    }

    /// Members win over roles when an id could be either.
    pub(crate) fn mentionable(&self, id: Snowflake) -> Option<Mentionable> {
        self.user(id)
            .map(Mentionable::User)
            .or_else(|| self.role(id).map(Mentionable::Role))
    }

    pub(crate) fn message(&self, id: Snowflake) -> Option<Message> {
        self.resolved.and_then(|r| r.messages.get(&id)).cloned()
    }

    /// Resolves the options supplied at one level of the tree against the
    /// declarations at that level, keyed by each declaration's binding name.
    pub(crate) fn options(
        &self,
        declared: &[CommandOption],
        supplied: &[CommandDataOption],
    ) -> Result<OptionValues, CommandError> {
        let mut values = OptionValues::new();
        for option in supplied {
            let declaration = declared
                .iter()
                .find(|d| d.name() == option.name)
                .ok_or_else(|| {
                    CommandError::InvalidPayload(format!("option '{}' is not declared", option.name))
                })?;
            if declaration.kind() != option.kind {
                return Err(CommandError::InvalidPayload(format!(
                    "option '{}' arrived as {} but is declared as {}",
                    option.name,
                    option.kind,
                    declaration.kind()
                )));
            }
            values.insert(declaration.binding(), self.value(option)?);
        }
        Ok(values)
    }

    fn value(&self, option: &CommandDataOption) -> Result<OptionValue, CommandError> {
        let raw = option.value.as_ref().ok_or_else(|| {
            CommandError::InvalidPayload(format!("option '{}' has no value", option.name))
        })?;
        let mismatch = || {
            CommandError::InvalidPayload(format!(
                "option '{}' value {raw} is not a valid {}",
                option.name, option.kind
            ))
        };

        let value = match option.kind {
            OptionKind::String => OptionValue::String(raw.as_str().ok_or_else(mismatch)?.to_string()),
            OptionKind::Integer => OptionValue::Integer(raw.as_i64().ok_or_else(mismatch)?),
            OptionKind::Number => OptionValue::Number(raw.as_f64().ok_or_else(mismatch)?),
            OptionKind::Boolean => OptionValue::Boolean(raw.as_bool().ok_or_else(mismatch)?),
            kind @ (OptionKind::User
            | OptionKind::Channel
            | OptionKind::Role
            | OptionKind::Mentionable
            | OptionKind::Attachment) => {
                let id = entity_id(raw).ok_or_else(mismatch)?;
                let found = match kind {
                    OptionKind::User => self.user(id).map(OptionValue::User),
                    OptionKind::Channel => self.channel(id).map(OptionValue::Channel),
                    OptionKind::Role => self.role(id).map(OptionValue::Role),
                    OptionKind::Mentionable => self.mentionable(id).map(OptionValue::Mentionable),
                    _ => self
                        .resolved
                        .and_then(|r| r.attachments.get(&id))
                        .cloned()
                        .map(OptionValue::Attachment),
                };
                found.unwrap_or(OptionValue::Missing { kind, id })
            }
            OptionKind::SubCommand | OptionKind::SubCommandGroup => {
                return Err(CommandError::InvalidPayload(format!(
                    "'{}' is a {} where a value was expected",
                    option.name, option.kind
                )));
            }
        };
        Ok(value)
    }
}

fn entity_id(raw: &Value) -> Option<Snowflake> {
    serde_json::from_value(raw.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::interaction_from;
    use clawcord_core::{InMemoryCache, Member, NoCache, User};
    use serde_json::json;

    fn user(id: u64, name: &str) -> User {
        serde_json::from_value(json!({"id": id.to_string(), "username": name})).unwrap()
    }

    #[test]
    fn test_scalar_values_and_binding() {
        let interaction = interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "1", "name": "echo", "type": 1, "options": [
                {"name": "text", "type": 3, "value": "hi"},
                {"name": "times", "type": 4, "value": 3},
                {"name": "ratio", "type": 10, "value": 2},
                {"name": "loud", "type": 5, "value": true}
            ]}
        }));
        let declared = vec![
            CommandOption::string("text", "Text").arg("message"),
            CommandOption::integer("times", "Times"),
            CommandOption::number("ratio", "Ratio"),
            CommandOption::boolean("loud", "Loud"),
        ];
        let resolver = Resolver::new(&NoCache, &interaction);
        let data = interaction.data.as_ref().unwrap();
        let values = resolver.options(&declared, &data.options).unwrap();

        assert_eq!(values.string("message"), Some("hi"));
        assert!(values.get("text").is_none());
        assert_eq!(values.integer("times"), Some(3));
        assert_eq!(values.number("ratio"), Some(2.0));
        assert_eq!(values.boolean("loud"), Some(true));
    }

    #[test]
    fn test_undeclared_option_rejected() {
        let interaction = interaction_from(json!({
            "data": {"id": "1", "name": "echo", "type": 1, "options": [
                {"name": "ghost", "type": 3, "value": "x"}
            ]}
        }));
        let resolver = Resolver::new(&NoCache, &interaction);
        let data = interaction.data.as_ref().unwrap();
        let err = resolver.options(&[], &data.options).unwrap_err();
        assert!(matches!(err, CommandError::InvalidPayload(_)));
    }

    #[test]
    fn test_user_joins_payload_member_with_user() {
        let interaction = interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "1", "name": "who", "type": 1,
                "options": [{"name": "target", "type": 6, "value": "42"}],
                "resolved": {
                    "users": {"42": {"id": "42", "username": "ana"}},
                    "members": {"42": {"nick": "Ana", "roles": []}}
                }
            }
        }));
        let resolver = Resolver::new(&NoCache, &interaction);
        match resolver.user(Snowflake(42)).unwrap() {
            ResolvedUser::Member(member) => {
                assert_eq!(member.nick.as_deref(), Some("Ana"));
                assert_eq!(member.user.unwrap().username, "ana");
            }
            other => panic!("expected member, got {other:?}"),
        }
    }

    #[test]
    fn test_cache_takes_precedence() {
        let cache = InMemoryCache::new();
        let member: Member = serde_json::from_value(json!({
            "user": {"id": "42", "username": "cached"},
            "roles": []
        }))
        .unwrap();
        cache.insert_member(Snowflake(5), member);

        let interaction = interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "1", "name": "who", "type": 1,
                "resolved": {"users": {"42": {"id": "42", "username": "payload"}}}}
        }));
        let resolver = Resolver::new(&cache, &interaction);
        let resolved = resolver.user(Snowflake(42)).unwrap();
        assert_eq!(resolved.user().unwrap().username, "cached");
    }

    #[test]
    fn test_mentionable_prefers_member_over_role() {
        let cache = InMemoryCache::new();
        cache.insert_member(
            Snowflake(5),
            Member {
                user: Some(user(77, "both")),
                nick: None,
                roles: vec![],
                joined_at: None,
                permissions: None,
            },
        );
        cache.insert_role(
            Snowflake(5),
            serde_json::from_value(json!({"id": "77", "name": "clash"})).unwrap(),
        );

        let interaction = interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "1", "name": "m", "type": 1,
                "options": [{"name": "who", "type": 9, "value": "77"}]}
        }));
        let resolver = Resolver::new(&cache, &interaction);
        let data = interaction.data.as_ref().unwrap();
        let values = resolver
            .options(&[CommandOption::mentionable("who", "Who")], &data.options)
            .unwrap();
        assert!(matches!(
            values.mentionable("who"),
            Some(Mentionable::User(ResolvedUser::Member(_)))
        ));
    }

    #[test]
    fn test_unresolvable_entity_is_missing() {
        let interaction = interaction_from(json!({
            "guild_id": "5",
            "data": {"id": "1", "name": "c", "type": 1,
                "options": [{"name": "where", "type": 7, "value": "900"}]}
        }));
        let resolver = Resolver::new(&NoCache, &interaction);
        let data = interaction.data.as_ref().unwrap();
        let values = resolver
            .options(&[CommandOption::channel("where", "Where")], &data.options)
            .unwrap();
        assert_eq!(
            values.get("where"),
            Some(&OptionValue::Missing {
                kind: OptionKind::Channel,
                id: Snowflake(900)
            })
        );
    }

    #[test]
    fn test_dm_user_falls_back_to_payload_user() {
        let interaction = interaction_from(json!({
            "data": {"id": "1", "name": "who", "type": 1,
                "resolved": {"users": {"42": {"id": "42", "username": "dm"}}}}
        }));
        let resolver = Resolver::new(&NoCache, &interaction);
        assert!(matches!(
            resolver.user(Snowflake(42)),
            Some(ResolvedUser::User(_))
        ));
    }
}
