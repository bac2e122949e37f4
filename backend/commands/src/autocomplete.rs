//! Suggestion lookup for the option a user is currently typing into.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use clawcord_core::{CommandKind, Interaction, OptionChoice};

use crate::command::Command;
use crate::context::InteractionContext;
use crate::error::CommandError;
use crate::handler::AutocompleteRequest;
use crate::option::MAX_CHOICES;
use crate::router::walk;

/// Finds the focused option, calls its autocomplete handler and returns at
/// most [`MAX_CHOICES`] suggestions, each of which fits the option's kind.
pub async fn resolve_autocomplete(
    command: &Command,
    interaction: &Arc<Interaction>,
) -> Result<Vec<OptionChoice>, CommandError> {
    let data = interaction
        .data
        .as_ref()
        .ok_or_else(|| CommandError::InvalidPayload("autocomplete interaction has no command data".into()))?;
    if command.kind() != CommandKind::ChatInput || data.kind != CommandKind::ChatInput {
        return Err(CommandError::SurfaceMismatch {
            command: command.name().to_string(),
            expected: CommandKind::ChatInput,
            found: data.kind,
        });
    }

    let target = walk(command, data)?;
    let focused = target
        .supplied
        .iter()
        .find(|o| o.focused)
        .ok_or_else(|| CommandError::InvalidPayload("autocomplete interaction has no focused option".into()))?;

    let contract = |reason: String| CommandError::AutocompleteContract {
        command: target.path.clone(),
        option: focused.name.clone(),
        reason,
    };

    let declared = target
        .declared
        .iter()
        .find(|o| o.name() == focused.name)
        .ok_or_else(|| contract("option is not declared".into()))?;
    let handler = declared
        .autocomplete_handler()
        .ok_or_else(|| contract("option has no autocomplete handler".into()))?;

    let filled: HashMap<String, serde_json::Value> = target
        .supplied
        .iter()
        .filter(|o| !o.focused)
        .filter_map(|o| o.value.clone().map(|v| (o.name.clone(), v)))
        .collect();

    let request = AutocompleteRequest {
        ctx: InteractionContext::new(Arc::clone(interaction), target.path.clone()),
        cog: command.cog().cloned(),
        option: declared.name().to_string(),
        value: focused.value_as_string(),
        filled,
    };

    let mut choices = handler
        .complete(request)
        .await
        .map_err(|error| CommandError::Autocomplete {
            command: target.path.clone(),
            option: focused.name.clone(),
            error,
        })?;

    if let Some(bad) = choices.iter().find(|c| !c.value.fits(declared.kind())) {
        return Err(contract(format!(
            "choice '{}' does not fit a {} option",
            bad.name,
            declared.kind()
        )));
    }

    if choices.len() > MAX_CHOICES {
        debug!(
            command = %target.path,
            option = %declared.name(),
            returned = choices.len(),
            "Truncating autocomplete suggestions"
        );
        choices.truncate(MAX_CHOICES);
    }
    Ok(choices)
}
