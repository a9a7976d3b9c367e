//! In-memory store
//!
//! Implements every repository trait over process memory. Each guild's data
//! sits behind its own `RwLock`, so a multi-row write (role deletion, lockdown)
//! is applied atomically with respect to other writers of the same guild while
//! different guilds never contend. Used by tests and single-node deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;

use haven_core::entities::{
    AuditLogEntry, AuditLogQuery, Channel, ChannelOverride, Guild, GuildMember, OverrideTarget,
    Role,
};
use haven_core::error::DomainError;
use haven_core::traits::{
    AuditLogRepository, ChannelRepository, GuildRepository, MemberRepository,
    OverrideRepository, PermissionInputs, RepoResult, RoleRepository, SnapshotRepository,
};
use haven_core::value_objects::{Overwrite, Snowflake};

/// Everything stored for one guild
#[derive(Debug)]
struct GuildState {
    guild: Guild,
    roles: BTreeMap<Snowflake, Role>,
    channels: BTreeMap<Snowflake, Channel>,
    members: BTreeMap<Snowflake, GuildMember>,
    overrides: HashMap<(Snowflake, OverrideTarget), ChannelOverride>,
    audit: BTreeMap<Snowflake, AuditLogEntry>,
}

impl GuildState {
    fn new(guild: Guild) -> Self {
        Self {
            guild,
            roles: BTreeMap::new(),
            channels: BTreeMap::new(),
            members: BTreeMap::new(),
            overrides: HashMap::new(),
            audit: BTreeMap::new(),
        }
    }

    fn insert_role(&mut self, role: &Role) -> RepoResult<()> {
        if role.is_everyone && self.roles.values().any(|r| r.is_everyone) {
            return Err(DomainError::ValidationError(
                "guild already has an @everyone role".to_string(),
            ));
        }
        if self.roles.contains_key(&role.id) {
            return Err(DomainError::ValidationError(format!("role {} already exists", role.id)));
        }
        self.roles.insert(role.id, role.clone());
        Ok(())
    }
}

type SharedGuild = Arc<RwLock<GuildState>>;

/// Thread-safe in-memory implementation of all repositories
///
/// Uses `DashMap` for the guild table and the id indexes that route a role or
/// channel id to its owning guild.
#[derive(Default)]
pub struct MemoryStore {
    guilds: DashMap<Snowflake, SharedGuild>,
    role_index: DashMap<Snowflake, Snowflake>,
    channel_index: DashMap<Snowflake, Snowflake>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of guilds held
    pub fn guild_count(&self) -> usize {
        self.guilds.len()
    }

    fn guild(&self, guild_id: Snowflake) -> Option<SharedGuild> {
        self.guilds.get(&guild_id).map(|r| Arc::clone(r.value()))
    }

    fn require_guild(&self, guild_id: Snowflake) -> RepoResult<SharedGuild> {
        self.guild(guild_id).ok_or(DomainError::GuildNotFound(guild_id))
    }

    fn guild_of_role(&self, role_id: Snowflake) -> Option<SharedGuild> {
        let guild_id = *self.role_index.get(&role_id)?;
        self.guild(guild_id)
    }

    fn guild_of_channel(&self, channel_id: Snowflake) -> Option<SharedGuild> {
        let guild_id = *self.channel_index.get(&channel_id)?;
        self.guild(guild_id)
    }
}

#[async_trait]
impl GuildRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Guild>> {
        Ok(self.guild(id).map(|state| state.read().guild.clone()))
    }

    async fn create(&self, guild: &Guild, everyone: &Role) -> RepoResult<()> {
        let mut state = GuildState::new(guild.clone());
        state.insert_role(everyone)?;

        match self.guilds.entry(guild.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(DomainError::ValidationError(format!(
                    "guild {} already exists",
                    guild.id
                )));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::new(RwLock::new(state)));
            }
        }
        self.role_index.insert(everyone.id, guild.id);

        tracing::debug!(guild_id = %guild.id, "Guild stored");
        Ok(())
    }

    async fn update(&self, guild: &Guild) -> RepoResult<()> {
        let shared = self.require_guild(guild.id)?;
        let mut state = shared.write();
        state.guild.name.clone_from(&guild.name);
        state.guild.owner_id = guild.owner_id;
        state.guild.updated_at = guild.updated_at;
        Ok(())
    }
}

#[async_trait]
impl ChannelRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Channel>> {
        Ok(self
            .guild_of_channel(id)
            .and_then(|state| state.read().channels.get(&id).cloned()))
    }

    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Channel>> {
        let Some(shared) = self.guild(guild_id) else {
            return Ok(Vec::new());
        };
        let mut channels: Vec<Channel> = shared.read().channels.values().cloned().collect();
        channels.sort_by_key(|c| (c.position, c.id));
        Ok(channels)
    }

    async fn create(&self, channel: &Channel) -> RepoResult<()> {
        let shared = self.require_guild(channel.guild_id)?;
        {
            let mut state = shared.write();
            if state.channels.contains_key(&channel.id) {
                return Err(DomainError::ValidationError(format!(
                    "channel {} already exists",
                    channel.id
                )));
            }
            state.channels.insert(channel.id, channel.clone());
        }
        self.channel_index.insert(channel.id, channel.guild_id);
        Ok(())
    }

    async fn update(&self, channel: &Channel) -> RepoResult<()> {
        let shared = self
            .guild_of_channel(channel.id)
            .ok_or(DomainError::ChannelNotFound(channel.id))?;
        let mut state = shared.write();
        let stored = state
            .channels
            .get_mut(&channel.id)
            .ok_or(DomainError::ChannelNotFound(channel.id))?;

        // Lockdown columns only change through set_lockdown
        stored.name.clone_from(&channel.name);
        stored.topic.clone_from(&channel.topic);
        stored.position = channel.position;
        stored.parent_id = channel.parent_id;
        stored.updated_at = channel.updated_at;
        Ok(())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let shared = self
            .guild_of_channel(id)
            .ok_or(DomainError::ChannelNotFound(id))?;
        {
            let mut state = shared.write();
            if state.channels.remove(&id).is_none() {
                return Err(DomainError::ChannelNotFound(id));
            }
            state.overrides.retain(|(channel_id, _), _| *channel_id != id);
            for channel in state.channels.values_mut() {
                if channel.parent_id == Some(id) {
                    channel.parent_id = None;
                }
            }
        }
        self.channel_index.remove(&id);
        Ok(())
    }

    async fn set_lockdown(
        &self,
        channel: &Channel,
        everyone_role_id: Snowflake,
        everyone_override: Option<Overwrite>,
    ) -> RepoResult<()> {
        let shared = self
            .guild_of_channel(channel.id)
            .ok_or(DomainError::ChannelNotFound(channel.id))?;
        let mut state = shared.write();

        let stored = state
            .channels
            .get_mut(&channel.id)
            .ok_or(DomainError::ChannelNotFound(channel.id))?;
        stored.locked = channel.locked;
        stored.pre_lock_override = channel.pre_lock_override;
        stored.updated_at = channel.updated_at;

        let key = (channel.id, OverrideTarget::Role(everyone_role_id));
        match everyone_override {
            Some(overwrite) => {
                let entry =
                    ChannelOverride::for_role(channel.id, channel.guild_id, everyone_role_id, overwrite);
                state.overrides.insert(key, entry);
            }
            None => {
                state.overrides.remove(&key);
            }
        }

        tracing::debug!(channel_id = %channel.id, locked = channel.locked, "Lockdown state stored");
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Role>> {
        Ok(self
            .guild_of_role(id)
            .and_then(|state| state.read().roles.get(&id).cloned()))
    }

    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Role>> {
        let Some(shared) = self.guild(guild_id) else {
            return Ok(Vec::new());
        };
        let mut roles: Vec<Role> = shared.read().roles.values().cloned().collect();
        roles.sort_by_key(|r| (r.position, r.id));
        Ok(roles)
    }

    async fn find_everyone(&self, guild_id: Snowflake) -> RepoResult<Option<Role>> {
        Ok(self.guild(guild_id).and_then(|state| {
            state.read().roles.values().find(|r| r.is_everyone).cloned()
        }))
    }

    async fn create(&self, role: &Role) -> RepoResult<()> {
        let shared = self.require_guild(role.guild_id)?;
        shared.write().insert_role(role)?;
        self.role_index.insert(role.id, role.guild_id);
        Ok(())
    }

    async fn update(&self, role: &Role) -> RepoResult<()> {
        let shared = self
            .guild_of_role(role.id)
            .ok_or(DomainError::RoleNotFound(role.id))?;
        let mut state = shared.write();
        let stored = state
            .roles
            .get_mut(&role.id)
            .ok_or(DomainError::RoleNotFound(role.id))?;

        let Role { guild_id, is_everyone, created_at, .. } = *stored;
        *stored = Role {
            guild_id,
            is_everyone,
            created_at,
            ..role.clone()
        };
        Ok(())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let shared = self.guild_of_role(id).ok_or(DomainError::RoleNotFound(id))?;
        {
            let mut state = shared.write();
            match state.roles.get(&id) {
                None => return Err(DomainError::RoleNotFound(id)),
                Some(role) if role.is_everyone => return Err(DomainError::CannotDeleteEveryoneRole),
                Some(_) => {}
            }

            state.overrides.retain(|(_, target), _| *target != OverrideTarget::Role(id));
            for member in state.members.values_mut() {
                member.remove_role(id);
            }
            state.roles.remove(&id);
        }
        self.role_index.remove(&id);

        tracing::debug!(role_id = %id, "Role removed with its overrides and assignments");
        Ok(())
    }

    async fn update_positions(&self, guild_id: Snowflake, positions: &[(Snowflake, i32)]) -> RepoResult<()> {
        let shared = self.require_guild(guild_id)?;
        let mut state = shared.write();

        // Validate the whole batch before touching anything
        for (role_id, _) in positions {
            match state.roles.get(role_id) {
                Some(role) if !role.is_everyone => {}
                _ => return Err(DomainError::RoleNotFound(*role_id)),
            }
        }

        for (role_id, position) in positions {
            if let Some(role) = state.roles.get_mut(role_id) {
                role.set_position(*position);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MemberRepository for MemoryStore {
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<GuildMember>> {
        Ok(self
            .guild(guild_id)
            .and_then(|state| state.read().members.get(&user_id).cloned()))
    }

    async fn find_by_guild(
        &self,
        guild_id: Snowflake,
        limit: i64,
        after: Option<Snowflake>,
    ) -> RepoResult<Vec<GuildMember>> {
        let Some(shared) = self.guild(guild_id) else {
            return Ok(Vec::new());
        };
        let limit = usize::try_from(limit.clamp(1, 1000)).unwrap_or(1000);
        let state = shared.read();
        let members = state
            .members
            .values()
            .filter(|m| after.map_or(true, |cursor| m.user_id > cursor))
            .take(limit)
            .cloned()
            .collect();
        Ok(members)
    }

    async fn is_member(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self
            .guild(guild_id)
            .is_some_and(|state| state.read().members.contains_key(&user_id)))
    }

    async fn create(&self, member: &GuildMember) -> RepoResult<()> {
        let shared = self.require_guild(member.guild_id)?;
        let mut state = shared.write();
        if state.members.contains_key(&member.user_id) {
            return Err(DomainError::AlreadyMember);
        }
        state.members.insert(member.user_id, member.clone());
        Ok(())
    }

    async fn delete(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<()> {
        let shared = self.guild(guild_id).ok_or(DomainError::MemberNotFound)?;
        let removed = shared.write().members.remove(&user_id);
        removed.map(|_| ()).ok_or(DomainError::MemberNotFound)
    }

    async fn add_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()> {
        let shared = self.guild(guild_id).ok_or(DomainError::MemberNotFound)?;
        let mut state = shared.write();
        if !state.roles.contains_key(&role_id) {
            return Err(DomainError::RoleNotFound(role_id));
        }
        let member = state
            .members
            .get_mut(&user_id)
            .ok_or(DomainError::MemberNotFound)?;
        if member.add_role(role_id) {
            Ok(())
        } else {
            Err(DomainError::AlreadyHasRole)
        }
    }

    async fn remove_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()> {
        if let Some(shared) = self.guild(guild_id) {
            if let Some(member) = shared.write().members.get_mut(&user_id) {
                member.remove_role(role_id);
            }
        }
        Ok(())
    }

    async fn get_role_ids(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let mut role_ids = self
            .guild(guild_id)
            .and_then(|state| state.read().members.get(&user_id).map(|m| m.role_ids.clone()))
            .unwrap_or_default();
        role_ids.sort_unstable();
        Ok(role_ids)
    }
}

#[async_trait]
impl OverrideRepository for MemoryStore {
    async fn find_by_channel(&self, channel_id: Snowflake) -> RepoResult<Vec<ChannelOverride>> {
        let Some(shared) = self.guild_of_channel(channel_id) else {
            return Ok(Vec::new());
        };
        let mut overrides: Vec<ChannelOverride> = shared
            .read()
            .overrides
            .values()
            .filter(|o| o.channel_id == channel_id)
            .cloned()
            .collect();
        overrides.sort_by_key(|o| (o.target.kind(), o.target.id()));
        Ok(overrides)
    }

    async fn find(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<Option<ChannelOverride>> {
        Ok(self
            .guild_of_channel(channel_id)
            .and_then(|state| state.read().overrides.get(&(channel_id, target)).cloned()))
    }

    async fn upsert(&self, channel_override: &ChannelOverride) -> RepoResult<()> {
        let channel_id = channel_override.channel_id;
        let shared = self
            .guild_of_channel(channel_id)
            .ok_or(DomainError::ChannelNotFound(channel_id))?;
        shared
            .write()
            .overrides
            .insert((channel_id, channel_override.target), channel_override.clone());
        Ok(())
    }

    async fn delete(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<bool> {
        Ok(self
            .guild_of_channel(channel_id)
            .is_some_and(|state| state.write().overrides.remove(&(channel_id, target)).is_some()))
    }
}

#[async_trait]
impl SnapshotRepository for MemoryStore {
    async fn load_permission_inputs(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
    ) -> RepoResult<Option<PermissionInputs>> {
        let Some(shared) = self.guild(guild_id) else {
            return Ok(None);
        };
        // One read guard for every row keeps the view consistent
        let state = shared.read();

        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by_key(|r| (r.position, r.id));

        let channel = channel_id.and_then(|id| state.channels.get(&id).cloned());
        let mut channel_overrides: Vec<ChannelOverride> = match &channel {
            Some(channel) => state
                .overrides
                .values()
                .filter(|o| o.channel_id == channel.id)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        channel_overrides.sort_by_key(|o| (o.target.kind(), o.target.id()));

        Ok(Some(PermissionInputs {
            guild: state.guild.clone(),
            member: state.members.get(&user_id).cloned(),
            roles,
            channel,
            channel_overrides,
        }))
    }
}

#[async_trait]
impl AuditLogRepository for MemoryStore {
    async fn append(&self, entry: &AuditLogEntry) -> RepoResult<()> {
        let shared = self.require_guild(entry.guild_id)?;
        shared.write().audit.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn query(&self, query: &AuditLogQuery) -> RepoResult<Vec<AuditLogEntry>> {
        let Some(shared) = self.guild(query.guild_id) else {
            return Ok(Vec::new());
        };
        let limit = query.limit as usize;
        let state = shared.read();
        let entries = state
            .audit
            .values()
            .rev()
            .filter(|entry| query.matches(entry))
            .take(limit)
            .cloned()
            .collect();
        Ok(entries)
    }
}
