//! Lookup-by-id into whatever entity cache the client keeps.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::id::Snowflake;
use crate::model::{Channel, Member, Role, User};

/// Resolution interface the router uses before falling back to the payload's
/// `resolved` section. Every lookup may miss.
pub trait ModelCache: Send + Sync {
    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member>;
    fn user(&self, user_id: Snowflake) -> Option<User>;
    fn channel(&self, guild_id: Option<Snowflake>, channel_id: Snowflake) -> Option<Channel>;
    fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role>;
}

/// A cache that never has anything. Useful when the client runs without member intents.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl ModelCache for NoCache {
    fn member(&self, _: Snowflake, _: Snowflake) -> Option<Member> {
        None
    }

    fn user(&self, _: Snowflake) -> Option<User> {
        None
    }

    fn channel(&self, _: Option<Snowflake>, _: Snowflake) -> Option<Channel> {
        None
    }

    fn role(&self, _: Snowflake, _: Snowflake) -> Option<Role> {
        None
    }
}

#[derive(Debug, Default)]
struct CacheState {
    members: HashMap<(Snowflake, Snowflake), Member>,
    users: HashMap<Snowflake, User>,
    channels: HashMap<Snowflake, Channel>,
    roles: HashMap<(Snowflake, Snowflake), Role>,
}

/// Thread-safe in-memory entity cache.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    state: RwLock<CacheState>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the member and, when present, its user.
    pub fn insert_member(&self, guild_id: Snowflake, member: Member) {
        let mut state = self.state.write();
        if let Some(user) = member.user.clone() {
            let id = user.id;
            state.users.insert(id, user);
            state.members.insert((guild_id, id), member);
        }
    }

    pub fn insert_user(&self, user: User) {
        self.state.write().users.insert(user.id, user);
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.state.write().channels.insert(channel.id, channel);
    }

    pub fn insert_role(&self, guild_id: Snowflake, role: Role) {
        self.state.write().roles.insert((guild_id, role.id), role);
    }
}

impl ModelCache for InMemoryCache {
    fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.state.read().members.get(&(guild_id, user_id)).cloned()
    }

    fn user(&self, user_id: Snowflake) -> Option<User> {
        self.state.read().users.get(&user_id).cloned()
    }

    fn channel(&self, guild_id: Option<Snowflake>, channel_id: Snowflake) -> Option<Channel> {
        let state = self.state.read();
        let channel = state.channels.get(&channel_id)?;
        match (guild_id, channel.guild_id) {
            (Some(expected), Some(actual)) if expected != actual => None,
            _ => Some(channel.clone()),
        }
    }

    fn role(&self, guild_id: Snowflake, role_id: Snowflake) -> Option<Role> {
        self.state.read().roles.get(&(guild_id, role_id)).cloned()
    }
}
