//! The option tree: parameters, subcommands and subcommand groups.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use clawcord_core::{ChannelType, OptionBound, OptionChoice, OptionKind, OptionPayload};

use crate::error::ConfigurationError;
use crate::handler::{AutocompleteHandler, Check, CommandHandler};

/// Platform cap on options per node and on choices per option.
pub const MAX_OPTIONS: usize = 25;
pub const MAX_CHOICES: usize = 25;

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_DESCRIPTION_LEN: usize = 100;

static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-_\p{L}\p{N}]{1,32}$").unwrap());

pub(crate) fn validate_chat_name(name: &str) -> Result<(), ConfigurationError> {
    let reason = if name.is_empty() {
        "must not be empty"
    } else if name.chars().count() > MAX_NAME_LEN {
        "must be at most 32 characters"
    } else if !NAME_RE.is_match(name) {
        "may only contain letters, digits, '-' and '_'"
    } else if name.to_lowercase() != name {
        "must be lowercase"
    } else {
        return Ok(());
    };
    Err(ConfigurationError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

pub(crate) fn validate_description(name: &str, description: &str) -> Result<(), ConfigurationError> {
    let reason = match description.chars().count() {
        0 => "must not be empty",
        n if n > MAX_DESCRIPTION_LEN => "must be at most 100 characters",
        _ => return Ok(()),
    };
    Err(ConfigurationError::InvalidDescription {
        name: name.to_string(),
        reason,
    })
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// What a list of sibling options hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Parent {
    /// A chat-input command itself.
    Root,
    Group,
    SubCommand,
    Parameter,
}

impl Parent {
    fn of(kind: OptionKind) -> Self {
        match kind {
            OptionKind::SubCommandGroup => Self::Group,
            OptionKind::SubCommand => Self::SubCommand,
            _ => Self::Parameter,
        }
    }
}

/// Validates `child` against its future siblings and places it at `at`,
/// or last when `at` is `None` or past the end.
pub(crate) fn attach(
    siblings: &mut Vec<CommandOption>,
    parent_name: &str,
    parent: Parent,
    child: CommandOption,
    at: Option<usize>,
) -> Result<(), ConfigurationError> {
    child.validate()?;

    let kind = child.kind;
    let invalid = |reason| ConfigurationError::InvalidChild {
        parent: parent_name.to_string(),
        child: child.name.clone(),
        kind,
        reason,
    };

    match parent {
        Parent::Parameter => return Err(invalid("parameters have no children")),
        Parent::Group if kind.is_group() => {
            return Err(ConfigurationError::NestingTooDeep {
                parent: parent_name.to_string(),
                child: child.name.clone(),
            });
        }
        Parent::Group if !kind.is_subcommand() => {
            return Err(invalid("groups may only contain subcommands"));
        }
        Parent::SubCommand if kind.is_structural() => {
            return Err(invalid("subcommands may only contain parameters"));
        }
        Parent::Root => {
            if let Some(first) = siblings.first() {
                if first.kind.is_structural() != kind.is_structural() {
                    return Err(invalid("parameters and subcommands cannot be mixed"));
                }
            }
        }
        _ => {}
    }

    if siblings.iter().any(|s| s.name == child.name) {
        return Err(ConfigurationError::DuplicateName {
            parent: parent_name.to_string(),
            name: child.name,
        });
    }
    if siblings.len() >= MAX_OPTIONS {
        return Err(ConfigurationError::TooMany {
            parent: parent_name.to_string(),
            what: "options",
            max: MAX_OPTIONS,
        });
    }

    let index = at.map_or(siblings.len(), |i| i.min(siblings.len()));
    siblings.insert(index, child);
    Ok(())
}

/// Serializes siblings with every required option ahead of the optional ones,
/// keeping declaration order inside each partition.
pub(crate) fn serialize_children(children: &[CommandOption]) -> Vec<OptionPayload> {
    let (required, optional): (Vec<&CommandOption>, Vec<&CommandOption>) =
        children.iter().partition(|c| c.is_required());
    required
        .into_iter()
        .chain(optional)
        .map(CommandOption::to_payload)
        .collect()
}

// ---------------------------------------------------------------------------
// CommandOption
// ---------------------------------------------------------------------------

/// One node of a chat-input command's option tree.
///
/// Built with the kind-specific constructors and chained setters; rules are
/// checked when the node is attached to a parent.
#[derive(Clone)]
pub struct CommandOption {
    name: String,
    description: String,
    kind: OptionKind,
    required: Option<bool>,
    choices: Vec<OptionChoice>,
    autocomplete: Option<Arc<dyn AutocompleteHandler>>,
    channel_types: Vec<ChannelType>,
    min_value: Option<OptionBound>,
    max_value: Option<OptionBound>,
    arg: Option<String>,
    children: Vec<CommandOption>,
    handler: Option<Arc<dyn CommandHandler>>,
    checks: Vec<Arc<dyn Check>>,
}

impl fmt::Debug for CommandOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandOption")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("choices", &self.choices.len())
            .field("autocomplete", &self.autocomplete.is_some())
            .field("children", &self.children)
            .field("checks", &self.checks.len())
            .finish()
    }
}

impl CommandOption {
    pub fn new(kind: OptionKind, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            required: None,
            choices: Vec::new(),
            autocomplete: None,
            channel_types: Vec::new(),
            min_value: None,
            max_value: None,
            arg: None,
            children: Vec::new(),
            handler: None,
            checks: Vec::new(),
        }
    }

    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::String, name, description)
    }

    pub fn integer(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Integer, name, description)
    }

    pub fn number(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Number, name, description)
    }

    pub fn boolean(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Boolean, name, description)
    }

    pub fn user(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::User, name, description)
    }

    pub fn channel(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Channel, name, description)
    }

    pub fn role(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Role, name, description)
    }

    pub fn mentionable(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Mentionable, name, description)
    }

    pub fn attachment(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::Attachment, name, description)
    }

    pub fn subcommand(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Self {
        let mut option = Self::new(OptionKind::SubCommand, name, description);
        option.handler = Some(handler);
        option
    }

    pub fn group(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(OptionKind::SubCommandGroup, name, description)
    }

    // -- builder ----------------------------------------------------------

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn choice(mut self, choice: OptionChoice) -> Self {
        self.choices.push(choice);
        self
    }

    pub fn choices(mut self, choices: impl IntoIterator<Item = OptionChoice>) -> Self {
        self.choices.extend(choices);
        self
    }

    pub fn autocomplete(mut self, handler: Arc<dyn AutocompleteHandler>) -> Self {
        self.autocomplete = Some(handler);
        self
    }

    pub fn channel_types(mut self, types: impl IntoIterator<Item = ChannelType>) -> Self {
        self.channel_types.extend(types);
        self
    }

    pub fn min_value(mut self, min: impl Into<OptionBound>) -> Self {
        self.min_value = Some(min.into());
        self
    }

    pub fn max_value(mut self, max: impl Into<OptionBound>) -> Self {
        self.max_value = Some(max.into());
        self
    }

    /// Binds the resolved value under `arg` instead of the option name.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn check(mut self, check: Arc<dyn Check>) -> Self {
        self.checks.push(check);
        self
    }

    pub fn with_child(mut self, child: CommandOption) -> Result<Self, ConfigurationError> {
        self.add_child(child)?;
        Ok(self)
    }

    // -- accessors --------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn kind(&self) -> OptionKind {
        self.kind
    }

    /// Parameters default to required; subcommands and groups never are.
    pub fn is_required(&self) -> bool {
        !self.kind.is_structural() && self.required.unwrap_or(true)
    }

    pub fn get_choices(&self) -> &[OptionChoice] {
        &self.choices
    }

    pub fn autocomplete_handler(&self) -> Option<&Arc<dyn AutocompleteHandler>> {
        self.autocomplete.as_ref()
    }

    pub fn can_autocomplete(&self) -> bool {
        self.autocomplete.is_some()
    }

    pub fn get_channel_types(&self) -> &[ChannelType] {
        &self.channel_types
    }

    pub fn bounds(&self) -> (Option<OptionBound>, Option<OptionBound>) {
        (self.min_value, self.max_value)
    }

    /// The key the resolved value is stored under.
    pub fn binding(&self) -> &str {
        self.arg.as_deref().unwrap_or(&self.name)
    }

    pub fn children(&self) -> &[CommandOption] {
        &self.children
    }

    pub fn handler(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.handler.as_ref()
    }

    pub fn checks(&self) -> &[Arc<dyn Check>] {
        &self.checks
    }

    // -- tree ops ---------------------------------------------------------

    pub fn add_child(&mut self, child: CommandOption) -> Result<(), ConfigurationError> {
        attach(&mut self.children, &self.name, Parent::of(self.kind), child, None)
    }

    /// Like [`add_child`](Self::add_child), but places the child at `index`.
    pub fn insert_child(&mut self, index: usize, child: CommandOption) -> Result<(), ConfigurationError> {
        attach(&mut self.children, &self.name, Parent::of(self.kind), child, Some(index))
    }

    pub fn get_child(&self, name: &str) -> Option<&CommandOption> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn get_child_mut(&mut self, name: &str) -> Option<&mut CommandOption> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    pub fn remove_child(&mut self, name: &str) -> Option<CommandOption> {
        let index = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(index))
    }

    // -- choices ----------------------------------------------------------

    pub fn add_choice(&mut self, choice: OptionChoice) -> Result<(), ConfigurationError> {
        self.choices.push(choice);
        if let Err(err) = self.validate_choices() {
            self.choices.pop();
            return Err(err);
        }
        Ok(())
    }

    /// Places a choice at `index`, or last when `index` is past the end.
    pub fn insert_choice(&mut self, index: usize, choice: OptionChoice) -> Result<(), ConfigurationError> {
        let index = index.min(self.choices.len());
        self.choices.insert(index, choice);
        if let Err(err) = self.validate_choices() {
            self.choices.remove(index);
            return Err(err);
        }
        Ok(())
    }

    pub fn get_choice(&self, name: &str) -> Option<&OptionChoice> {
        self.choices.iter().find(|c| c.name == name)
    }

    pub fn remove_choice(&mut self, name: &str) -> Option<OptionChoice> {
        let index = self.choices.iter().position(|c| c.name == name)?;
        Some(self.choices.remove(index))
    }

    // -- checks & serialization -------------------------------------------

    fn invalid(&self, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidOption {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    fn validate_choices(&self) -> Result<(), ConfigurationError> {
        if self.choices.is_empty() {
            return Ok(());
        }
        if self.autocomplete.is_some() {
            return Err(ConfigurationError::ChoicesWithAutocomplete(self.name.clone()));
        }
        if !self.kind.supports_choices() {
            return Err(self.invalid(format!("{} options cannot have choices", self.kind)));
        }
        if self.choices.len() > MAX_CHOICES {
            return Err(ConfigurationError::TooMany {
                parent: self.name.clone(),
                what: "choices",
                max: MAX_CHOICES,
            });
        }
        for choice in &self.choices {
            let len = choice.name.chars().count();
            if len == 0 || len > MAX_DESCRIPTION_LEN {
                return Err(self.invalid(format!(
                    "choice name '{}' must be 1-100 characters",
                    choice.name
                )));
            }
            if !choice.value.fits(self.kind) {
                return Err(self.invalid(format!(
                    "choice '{}' has a value that does not fit a {} option",
                    choice.name, self.kind
                )));
            }
        }
        Ok(())
    }

    /// Checks this node and everything below it.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        validate_chat_name(&self.name)?;
        validate_description(&self.name, &self.description)?;

        let structural = self.kind.is_structural();
        if structural && self.required.is_some() {
            return Err(self.invalid("required cannot be set on subcommands or groups"));
        }
        if !structural && !self.checks.is_empty() {
            return Err(self.invalid("checks can only be attached to subcommands or groups"));
        }
        if self.kind.is_subcommand() && self.handler.is_none() {
            return Err(self.invalid("subcommand has no handler"));
        }

        self.validate_choices()?;
        if self.autocomplete.is_some() && !self.kind.supports_choices() {
            return Err(self.invalid(format!("{} options cannot autocomplete", self.kind)));
        }
        if !self.channel_types.is_empty() && self.kind != OptionKind::Channel {
            return Err(self.invalid("channel types only apply to channel options"));
        }

        if self.min_value.is_some() || self.max_value.is_some() {
            if !self.kind.supports_bounds() {
                return Err(self.invalid("min/max values only apply to integer and number options"));
            }
            let integral = |b: &Option<OptionBound>| !matches!(b, Some(OptionBound::Number(_)));
            if self.kind == OptionKind::Integer
                && !(integral(&self.min_value) && integral(&self.max_value))
            {
                return Err(self.invalid("integer options need integer bounds"));
            }
            if let (Some(min), Some(max)) = (self.min_value, self.max_value) {
                if min.as_f64() > max.as_f64() {
                    return Err(self.invalid("min_value is greater than max_value"));
                }
            }
        }

        if structural && self.children.len() > MAX_OPTIONS {
            return Err(ConfigurationError::TooMany {
                parent: self.name.clone(),
                what: "options",
                max: MAX_OPTIONS,
            });
        }
        self.children.iter().try_for_each(CommandOption::validate)
    }

    pub fn to_payload(&self) -> OptionPayload {
        OptionPayload {
            kind: self.kind,
            name: self.name.clone(),
            description: self.description.clone(),
            required: (!self.kind.is_structural()).then(|| self.is_required()),
            choices: self.choices.clone(),
            options: serialize_children(&self.children),
            autocomplete: self.autocomplete.is_some(),
            channel_types: self.channel_types.clone(),
            min_value: self.min_value,
            max_value: self.max_value,
        }
    }
}
