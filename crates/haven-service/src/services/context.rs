//! Service context - dependency container for services
//!
//! Holds all repositories, the ID generator, audit settings and the guild lock registry.

use std::sync::Arc;

use haven_common::{AppConfig, AuditConfig};
use haven_core::traits::{
    AuditLogRepository, ChannelRepository, GuildRepository, MemberRepository,
    OverrideRepository, RoleRepository, SnapshotRepository,
};
use haven_core::entities::{Channel, Role};
use haven_core::{DomainError, Snowflake, SnowflakeGenerator};
use haven_db::{
    MemoryStore, PgAuditLogRepository, PgChannelRepository, PgGuildRepository,
    PgMemberRepository, PgOverrideRepository, PgPool, PgRoleRepository, PgSnapshotRepository,
};
use tokio::sync::OwnedMutexGuard;

use super::error::{ServiceError, ServiceResult};
use super::locks::GuildLocks;

/// Service context containing all dependencies
///
/// This is the main dependency container that gets passed to all services.
/// It provides access to:
/// - Repositories (PostgreSQL or the in-memory store)
/// - Snowflake generator for ID generation
/// - Audit log paging limits
/// - The per-guild write locks
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    guild_repo: Arc<dyn GuildRepository>,
    channel_repo: Arc<dyn ChannelRepository>,
    role_repo: Arc<dyn RoleRepository>,
    member_repo: Arc<dyn MemberRepository>,
    override_repo: Arc<dyn OverrideRepository>,
    snapshot_repo: Arc<dyn SnapshotRepository>,
    audit_repo: Arc<dyn AuditLogRepository>,

    snowflake_generator: Arc<SnowflakeGenerator>,
    audit_config: AuditConfig,
    guild_locks: GuildLocks,
}

impl ServiceContext {
    /// Create a context over PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            guild_repo: Arc::new(PgGuildRepository::new(pool.clone())),
            channel_repo: Arc::new(PgChannelRepository::new(pool.clone())),
            role_repo: Arc::new(PgRoleRepository::new(pool.clone())),
            member_repo: Arc::new(PgMemberRepository::new(pool.clone())),
            override_repo: Arc::new(PgOverrideRepository::new(pool.clone())),
            snapshot_repo: Arc::new(PgSnapshotRepository::new(pool.clone())),
            audit_repo: Arc::new(PgAuditLogRepository::new(pool)),
            snowflake_generator: Arc::new(SnowflakeGenerator::new(config.snowflake.worker_id)),
            audit_config: config.audit,
            guild_locks: GuildLocks::new(),
        }
    }

    /// Create a context where every repository is the same in-memory store
    pub fn in_memory(store: Arc<MemoryStore>, worker_id: u16) -> Self {
        Self {
            guild_repo: store.clone(),
            channel_repo: store.clone(),
            role_repo: store.clone(),
            member_repo: store.clone(),
            override_repo: store.clone(),
            snapshot_repo: store.clone(),
            audit_repo: store,
            snowflake_generator: Arc::new(SnowflakeGenerator::new(worker_id)),
            audit_config: AuditConfig::default(),
            guild_locks: GuildLocks::new(),
        }
    }

    // === Repositories ===

    /// Get the guild repository
    pub fn guild_repo(&self) -> &dyn GuildRepository {
        self.guild_repo.as_ref()
    }

    /// Get the channel repository
    pub fn channel_repo(&self) -> &dyn ChannelRepository {
        self.channel_repo.as_ref()
    }

    /// Get the role repository
    pub fn role_repo(&self) -> &dyn RoleRepository {
        self.role_repo.as_ref()
    }

    /// Get the member repository
    pub fn member_repo(&self) -> &dyn MemberRepository {
        self.member_repo.as_ref()
    }

    /// Get the channel override repository
    pub fn override_repo(&self) -> &dyn OverrideRepository {
        self.override_repo.as_ref()
    }

    /// Get the repository that loads permission inputs in one consistent read
    pub fn snapshot_repo(&self) -> &dyn SnapshotRepository {
        self.snapshot_repo.as_ref()
    }

    /// Get the audit log repository
    pub fn audit_repo(&self) -> &dyn AuditLogRepository {
        self.audit_repo.as_ref()
    }

    // === Settings ===

    pub fn audit_config(&self) -> &AuditConfig {
        &self.audit_config
    }

    /// Get the snowflake ID generator
    pub fn snowflake_generator(&self) -> &SnowflakeGenerator {
        self.snowflake_generator.as_ref()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }

    // === Concurrency ===

    pub fn guild_locks(&self) -> &GuildLocks {
        &self.guild_locks
    }

    /// Hold the guild's write lock until the returned guard is dropped
    pub async fn lock_guild(&self, guild_id: Snowflake) -> OwnedMutexGuard<()> {
        self.guild_locks.acquire(guild_id).await
    }

    /// Hold the write lock of the channel's guild, returning the channel as read under the lock
    pub async fn lock_channel_guild(
        &self,
        channel_id: Snowflake,
    ) -> ServiceResult<(OwnedMutexGuard<()>, Channel)> {
        let guild_id = self.find_channel(channel_id).await?.guild_id;
        let guard = self.lock_guild(guild_id).await;
        let channel = self.find_channel(channel_id).await?;
        Ok((guard, channel))
    }

    // === Lookups ===

    pub async fn find_channel(&self, channel_id: Snowflake) -> ServiceResult<Channel> {
        self.channel_repo
            .find_by_id(channel_id)
            .await?
            .ok_or_else(|| DomainError::ChannelNotFound(channel_id).into())
    }

    /// Find a role, treating a role of another guild as missing
    pub async fn find_role(&self, guild_id: Snowflake, role_id: Snowflake) -> ServiceResult<Role> {
        match self.role_repo.find_by_id(role_id).await? {
            Some(role) if role.guild_id == guild_id => Ok(role),
            _ => Err(DomainError::RoleNotFound(role_id).into()),
        }
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("worker_id", &self.snowflake_generator.worker_id())
            .field("audit_config", &self.audit_config)
            .field("guild_locks", &self.guild_locks)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    guild_repo: Option<Arc<dyn GuildRepository>>,
    channel_repo: Option<Arc<dyn ChannelRepository>>,
    role_repo: Option<Arc<dyn RoleRepository>>,
    member_repo: Option<Arc<dyn MemberRepository>>,
    override_repo: Option<Arc<dyn OverrideRepository>>,
    snapshot_repo: Option<Arc<dyn SnapshotRepository>>,
    audit_repo: Option<Arc<dyn AuditLogRepository>>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
    audit_config: Option<AuditConfig>,
    guild_locks: Option<GuildLocks>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one value for every repository
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: GuildRepository
            + ChannelRepository
            + RoleRepository
            + MemberRepository
            + OverrideRepository
            + SnapshotRepository
            + AuditLogRepository
            + 'static,
    {
        self.guild_repo(store.clone())
            .channel_repo(store.clone())
            .role_repo(store.clone())
            .member_repo(store.clone())
            .override_repo(store.clone())
            .snapshot_repo(store.clone())
            .audit_repo(store)
    }

    pub fn guild_repo(mut self, repo: Arc<dyn GuildRepository>) -> Self {
        self.guild_repo = Some(repo);
        self
    }

    pub fn channel_repo(mut self, repo: Arc<dyn ChannelRepository>) -> Self {
        self.channel_repo = Some(repo);
        self
    }

    pub fn role_repo(mut self, repo: Arc<dyn RoleRepository>) -> Self {
        self.role_repo = Some(repo);
        self
    }

    pub fn member_repo(mut self, repo: Arc<dyn MemberRepository>) -> Self {
        self.member_repo = Some(repo);
        self
    }

    pub fn override_repo(mut self, repo: Arc<dyn OverrideRepository>) -> Self {
        self.override_repo = Some(repo);
        self
    }

    pub fn snapshot_repo(mut self, repo: Arc<dyn SnapshotRepository>) -> Self {
        self.snapshot_repo = Some(repo);
        self
    }

    pub fn audit_repo(mut self, repo: Arc<dyn AuditLogRepository>) -> Self {
        self.audit_repo = Some(repo);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    pub fn audit_config(mut self, config: AuditConfig) -> Self {
        self.audit_config = Some(config);
        self
    }

    /// Share a lock registry with another context over the same data
    pub fn guild_locks(mut self, locks: GuildLocks) -> Self {
        self.guild_locks = Some(locks);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any repository is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            guild_repo: self.guild_repo.ok_or_else(|| ServiceError::validation("guild_repo is required"))?,
            channel_repo: self.channel_repo.ok_or_else(|| ServiceError::validation("channel_repo is required"))?,
            role_repo: self.role_repo.ok_or_else(|| ServiceError::validation("role_repo is required"))?,
            member_repo: self.member_repo.ok_or_else(|| ServiceError::validation("member_repo is required"))?,
            override_repo: self.override_repo.ok_or_else(|| ServiceError::validation("override_repo is required"))?,
            snapshot_repo: self.snapshot_repo.ok_or_else(|| ServiceError::validation("snapshot_repo is required"))?,
            audit_repo: self.audit_repo.ok_or_else(|| ServiceError::validation("audit_repo is required"))?,
            snowflake_generator: self.snowflake_generator.unwrap_or_default(),
            audit_config: self.audit_config.unwrap_or_default(),
            guild_locks: self.guild_locks.unwrap_or_default(),
        })
    }
}
