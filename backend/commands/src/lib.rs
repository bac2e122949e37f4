//! Application-command declaration, registration and dispatch.
//!
//! Declare [`Command`]s with their [`CommandOption`] trees, queue them on a
//! [`Bot`], and let it reconcile them with the platform on connect. Incoming
//! interactions are routed to the right handler, with checks, argument
//! resolution and autocomplete handled on the way.

pub mod autocomplete;
pub mod bot;
pub mod command;
pub mod context;
pub mod error;
pub mod handler;
pub mod option;
pub mod permissions;
pub mod registry;
mod resolve;
pub mod router;

#[cfg(test)]
mod testing;

pub use autocomplete::resolve_autocomplete;
pub use bot::{Bot, BotConfig};
pub use command::{Command, CommandConfig};
pub use context::InteractionContext;
pub use error::{CommandError, ConfigurationError};
pub use handler::{
    Arguments, AutocompleteHandler, AutocompleteRequest, Check, Cog, CommandHandler, Invocation,
    Mentionable, OptionValue, OptionValues, ResolvedUser, autocomplete_fn, check_fn, handler_fn,
};
pub use option::{CommandOption, MAX_CHOICES, MAX_OPTIONS};
pub use permissions::{CommandPermissions, PermissionOverwrite, PermissionTarget};
pub use registry::{CommandRegistry, GuildFailure, SyncOptions, SyncReport};
pub use router::{DispatchOutcome, Router};
