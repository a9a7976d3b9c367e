//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Multi-row mutations (role delete, reorder,
//! lockdown) must be atomic per guild in every implementation.

use async_trait::async_trait;

use crate::entities::{
    AuditLogEntry, AuditLogQuery, Channel, ChannelOverride, Guild, GuildMember, OverrideTarget,
    Role,
};
use crate::error::DomainError;
use crate::value_objects::{Overwrite, Snowflake};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Guild Repository
// ============================================================================

#[async_trait]
pub trait GuildRepository: Send + Sync {
    /// Find guild by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Guild>>;

    /// Create a guild together with its @everyone role
    async fn create(&self, guild: &Guild, everyone: &Role) -> RepoResult<()>;

    /// Update an existing guild
    async fn update(&self, guild: &Guild) -> RepoResult<()>;
}

// ============================================================================
// Channel Repository
// ============================================================================

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Find channel by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Channel>>;

    /// List all channels in a guild (ordered by position)
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Channel>>;

    /// Create a new channel
    async fn create(&self, channel: &Channel) -> RepoResult<()>;

    /// Update an existing channel
    async fn update(&self, channel: &Channel) -> RepoResult<()>;

    /// Delete a channel and its overrides
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Persist the channel's lock state and write the @everyone override in one step.
    ///
    /// `everyone_override` of `None` removes the @everyone override row.
    async fn set_lockdown(
        &self,
        channel: &Channel,
        everyone_role_id: Snowflake,
        everyone_override: Option<Overwrite>,
    ) -> RepoResult<()>;
}

// ============================================================================
// Role Repository
// ============================================================================

#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Find role by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Role>>;

    /// List all roles in a guild (ordered by position, then id)
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Role>>;

    /// Find the @everyone role for a guild
    async fn find_everyone(&self, guild_id: Snowflake) -> RepoResult<Option<Role>>;

    /// Create a new role
    async fn create(&self, role: &Role) -> RepoResult<()>;

    /// Update an existing role
    async fn update(&self, role: &Role) -> RepoResult<()>;

    /// Delete a role, removing it from every member and every channel override
    async fn delete(&self, id: Snowflake) -> RepoResult<()>;

    /// Update role positions in bulk
    async fn update_positions(&self, guild_id: Snowflake, positions: &[(Snowflake, i32)]) -> RepoResult<()>;
}

// ============================================================================
// Member Repository
// ============================================================================

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Find member by guild and user ID
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<GuildMember>>;

    /// List members in a guild, ordered by user id
    async fn find_by_guild(&self, guild_id: Snowflake, limit: i64, after: Option<Snowflake>) -> RepoResult<Vec<GuildMember>>;

    /// Check if user is a member of guild
    async fn is_member(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    /// Add member to guild
    async fn create(&self, member: &GuildMember) -> RepoResult<()>;

    /// Remove member from guild
    async fn delete(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<()>;

    /// Add role to member
    async fn add_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()>;

    /// Remove role from member
    async fn remove_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()>;

    /// Get all explicitly assigned role IDs for a member
    async fn get_role_ids(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Vec<Snowflake>>;
}

// ============================================================================
// Override Repository
// ============================================================================

#[async_trait]
pub trait OverrideRepository: Send + Sync {
    /// All overrides on a channel, role and member alike
    async fn find_by_channel(&self, channel_id: Snowflake) -> RepoResult<Vec<ChannelOverride>>;

    /// The override for one target on a channel
    async fn find(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<Option<ChannelOverride>>;

    /// Insert or replace the override for `(channel, target)`
    async fn upsert(&self, channel_override: &ChannelOverride) -> RepoResult<()>;

    /// Delete the override for `(channel, target)`; returns false if none existed
    async fn delete(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<bool>;
}

// ============================================================================
// Permission Inputs
// ============================================================================

/// The rows one permission decision reads, taken from a single consistent view
#[derive(Debug, Clone)]
pub struct PermissionInputs {
    pub guild: Guild,
    /// `None` when the user is not a member
    pub member: Option<GuildMember>,
    /// Ordered by position, then id
    pub roles: Vec<Role>,
    /// The requested channel, when it exists in this guild
    pub channel: Option<Channel>,
    pub channel_overrides: Vec<ChannelOverride>,
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Read the guild, the user's membership, the guild's roles and optionally one
    /// channel with its overrides, all from the same point in time.
    ///
    /// A concurrent multi-row write is seen either fully or not at all.
    /// Returns `None` when the guild does not exist.
    async fn load_permission_inputs(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
    ) -> RepoResult<Option<PermissionInputs>>;
}

// ============================================================================
// Audit Log Repository
// ============================================================================

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry; entries are never updated
    async fn append(&self, entry: &AuditLogEntry) -> RepoResult<()>;

    /// Entries matching the query, newest first, at most `query.limit`
    async fn query(&self, query: &AuditLogQuery) -> RepoResult<Vec<AuditLogEntry>>;
}
