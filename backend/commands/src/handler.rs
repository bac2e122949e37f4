//! The seams user code plugs into: handlers, checks, modules and autocomplete
//! callbacks, plus the typed arguments a handler receives.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use clawcord_core::{
    Attachment, Channel, Member, Message, OptionChoice, OptionKind, Role, Snowflake, User,
};

use crate::context::InteractionContext;

// ---------------------------------------------------------------------------
// Handler traits
// ---------------------------------------------------------------------------

/// The body of a command or subcommand.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, invocation: Invocation) -> Result<()>;

    /// Fallback name when the declaration does not give one.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Fallback description when the declaration does not give one.
    fn description(&self) -> Option<&str> {
        None
    }
}

/// A pre-invocation predicate. `Ok(false)` and `Err` both block the command.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self, ctx: &InteractionContext) -> Result<bool>;
}

/// A module instance commands can be bound to. Its check runs before the
/// command's own checks and handlers receive it as their receiver.
#[async_trait]
pub trait Cog: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn cog_check(&self, _ctx: &InteractionContext) -> Result<bool> {
        Ok(true)
    }

    fn as_any(&self) -> &dyn Any;
}

/// Produces suggestions for the option the user is typing into.
#[async_trait]
pub trait AutocompleteHandler: Send + Sync {
    async fn complete(&self, request: AutocompleteRequest) -> Result<Vec<OptionChoice>>;
}

// ---------------------------------------------------------------------------
// Closure adapters
// ---------------------------------------------------------------------------

pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn call(&self, invocation: Invocation) -> Result<()> {
        (self.f)(invocation).await
    }
}

/// Wraps an async closure as a [`CommandHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

pub struct FnCheck<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Check for FnCheck<F>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    async fn check(&self, ctx: &InteractionContext) -> Result<bool> {
        (self.f)(ctx.clone()).await
    }
}

pub fn check_fn<F, Fut>(f: F) -> Arc<dyn Check>
where
    F: Fn(InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<bool>> + Send + 'static,
{
    Arc::new(FnCheck { f })
}

pub struct FnAutocomplete<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> AutocompleteHandler for FnAutocomplete<F>
where
    F: Fn(AutocompleteRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<OptionChoice>>> + Send + 'static,
{
    async fn complete(&self, request: AutocompleteRequest) -> Result<Vec<OptionChoice>> {
        (self.f)(request).await
    }
}

pub fn autocomplete_fn<F, Fut>(f: F) -> Arc<dyn AutocompleteHandler>
where
    F: Fn(AutocompleteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<OptionChoice>>> + Send + 'static,
{
    Arc::new(FnAutocomplete { f })
}

fn downcast<T: Cog>(cog: &Option<Arc<dyn Cog>>) -> Option<&T> {
    cog.as_deref()?.as_any().downcast_ref::<T>()
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Everything a handler is called with. The argument shape is fixed by the
/// command's surface.
pub struct Invocation {
    pub ctx: InteractionContext,
    pub cog: Option<Arc<dyn Cog>>,
    pub args: Arguments,
}

impl Invocation {
    /// The bound module as its concrete type.
    pub fn receiver<T: Cog>(&self) -> Option<&T> {
        downcast(&self.cog)
    }

    pub fn options(&self) -> Option<&OptionValues> {
        match &self.args {
            Arguments::Options(values) => Some(values),
            _ => None,
        }
    }
}

pub struct AutocompleteRequest {
    pub ctx: InteractionContext,
    pub cog: Option<Arc<dyn Cog>>,
    /// Declared name of the focused option.
    pub option: String,
    /// What the user has typed so far.
    pub value: String,
    /// Raw values of the other options already filled in.
    pub filled: HashMap<String, Value>,
}

impl AutocompleteRequest {
    pub fn receiver<T: Cog>(&self) -> Option<&T> {
        downcast(&self.cog)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    Options(OptionValues),
    User(ResolvedUser),
    Message(Message),
}

// ---------------------------------------------------------------------------
// Resolved values
// ---------------------------------------------------------------------------

/// A user option target: a full guild member when one could be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedUser {
    Member(Member),
    User(User),
}

impl ResolvedUser {
    pub fn id(&self) -> Option<Snowflake> {
        match self {
            Self::Member(m) => m.id(),
            Self::User(u) => Some(u.id),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Member(m) => m.user.as_ref(),
            Self::User(u) => Some(u),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mentionable {
    User(ResolvedUser),
    Role(Role),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(ResolvedUser),
    Channel(Channel),
    Role(Role),
    Mentionable(Mentionable),
    Attachment(Attachment),
    /// An entity id neither the cache nor the payload could resolve.
    Missing { kind: OptionKind, id: Snowflake },
}

/// Resolved option values keyed by binding name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionValues {
    values: HashMap<String, OptionValue>,
}

impl OptionValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, binding: impl Into<String>, value: OptionValue) {
        self.values.insert(binding.into(), value);
    }

    pub fn get(&self, binding: &str) -> Option<&OptionValue> {
        self.values.get(binding)
    }

    pub fn contains(&self, binding: &str) -> bool {
        self.values.contains_key(binding)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn string(&self, binding: &str) -> Option<&str> {
        match self.get(binding)? {
            OptionValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, binding: &str) -> Option<i64> {
        match self.get(binding)? {
            OptionValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Number options may arrive as integral JSON; both read as `f64`.
    pub fn number(&self, binding: &str) -> Option<f64> {
        match self.get(binding)? {
            OptionValue::Number(v) => Some(*v),
            OptionValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn boolean(&self, binding: &str) -> Option<bool> {
        match self.get(binding)? {
            OptionValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn user(&self, binding: &str) -> Option<&ResolvedUser> {
        match self.get(binding)? {
            OptionValue::User(u) => Some(u),
            _ => None,
        }
    }

    pub fn channel(&self, binding: &str) -> Option<&Channel> {
        match self.get(binding)? {
            OptionValue::Channel(c) => Some(c),
            _ => None,
        }
    }

    pub fn role(&self, binding: &str) -> Option<&Role> {
        match self.get(binding)? {
            OptionValue::Role(r) => Some(r),
            _ => None,
        }
    }

    pub fn mentionable(&self, binding: &str) -> Option<&Mentionable> {
        match self.get(binding)? {
            OptionValue::Mentionable(m) => Some(m),
            _ => None,
        }
    }

    pub fn attachment(&self, binding: &str) -> Option<&Attachment> {
        match self.get(binding)? {
            OptionValue::Attachment(a) => Some(a),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Music {
        volume: u8,
    }

    impl Cog for Music {
        fn name(&self) -> &str {
            "music"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Other;

    impl Cog for Other {
        fn name(&self) -> &str {
            "other"
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_receiver_downcast() {
        let cog: Option<Arc<dyn Cog>> = Some(Arc::new(Music { volume: 7 }));
        assert_eq!(downcast::<Music>(&cog).map(|m| m.volume), Some(7));
        assert!(downcast::<Other>(&cog).is_none());
        assert!(downcast::<Music>(&None).is_none());
    }

    #[test]
    fn test_typed_getters() {
        let mut values = OptionValues::new();
        values.insert("count", OptionValue::Integer(3));
        values.insert("ratio", OptionValue::Number(0.5));
        values.insert("name", OptionValue::String("x".into()));

        assert_eq!(values.integer("count"), Some(3));
        assert_eq!(values.number("count"), Some(3.0));
        assert_eq!(values.number("ratio"), Some(0.5));
        assert_eq!(values.string("name"), Some("x"));
        assert_eq!(values.string("count"), None);
        assert!(values.boolean("missing").is_none());
        assert_eq!(values.len(), 3);
    }
}
