pub mod cache;
pub mod error;
pub mod event;
pub mod id;
pub mod interaction;
pub mod model;
pub mod payload;

pub use cache::{InMemoryCache, ModelCache, NoCache};
pub use error::ClawcordError;
pub use event::{Event, EventBus, EventKind};
pub use id::Snowflake;
pub use interaction::{
    CommandData, CommandDataOption, Interaction, InteractionResponse, InteractionType, Resolved,
};
pub use model::{Attachment, Channel, ChannelType, Member, Message, Role, User};
pub use payload::{
    ChoiceValue, CommandKind, CommandPayload, OptionBound, OptionChoice, OptionKind, OptionPayload,
};
