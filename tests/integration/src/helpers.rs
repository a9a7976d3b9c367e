//! Test helpers for integration tests
//!
//! `TestHarness` wires a `ServiceContext` to a fresh in-memory store. The `seed_*`
//! methods write straight to the repositories, skipping permission checks, so a
//! scenario can be set up before the services under test are called.

use std::sync::Arc;

use anyhow::Result;
use haven_core::entities::{Channel, ChannelOverride, Guild, GuildMember, OverrideTarget, Role};
use haven_core::{Overwrite, Permissions, Snowflake};
use haven_db::MemoryStore;
use haven_service::{ServiceContext, ServiceError};

/// Worker id used by every test context
pub const TEST_WORKER_ID: u16 = 7;

/// Service context over an isolated in-memory store
pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub ctx: ServiceContext,
}

impl TestHarness {
    pub fn new() -> Self {
        init_test_tracing();
        let store = MemoryStore::new_shared();
        let ctx = ServiceContext::in_memory(store.clone(), TEST_WORKER_ID);
        Self { store, ctx }
    }

    /// A fresh id; also used for users, which the store does not track
    pub fn id(&self) -> Snowflake {
        self.ctx.generate_id()
    }

    /// Guild whose @everyone role carries `everyone_permissions`
    pub async fn seed_guild(&self, owner_id: Snowflake, everyone_permissions: Permissions) -> Result<Guild> {
        let guild = Guild::new(self.id(), format!("guild-{}", crate::unique_suffix()), owner_id);
        let mut everyone = Role::everyone(guild.id, guild.id);
        everyone.set_permissions(everyone_permissions);

        self.ctx.guild_repo().create(&guild, &everyone).await?;
        Ok(guild)
    }

    pub async fn seed_channel(&self, guild_id: Snowflake) -> Result<Channel> {
        let channel = Channel::new_text(self.id(), guild_id, format!("channel-{}", crate::unique_suffix()));
        self.ctx.channel_repo().create(&channel).await?;
        Ok(channel)
    }

    pub async fn seed_role(
        &self,
        guild_id: Snowflake,
        name: &str,
        permissions: Permissions,
        position: i32,
    ) -> Result<Role> {
        let role = Role::new(self.id(), guild_id, name.to_string(), permissions).at_position(position);
        self.ctx.role_repo().create(&role).await?;
        Ok(role)
    }

    pub async fn seed_member(&self, guild_id: Snowflake, user_id: Snowflake, roles: &[Snowflake]) -> Result<GuildMember> {
        let member = GuildMember::new(guild_id, user_id).with_roles(roles.iter().copied());
        self.ctx.member_repo().create(&member).await?;
        Ok(member)
    }

    pub async fn seed_override(&self, channel: &Channel, target: OverrideTarget, overwrite: Overwrite) -> Result<()> {
        let ov = ChannelOverride::new(channel.id, channel.guild_id, target, overwrite);
        self.ctx.override_repo().upsert(&ov).await?;
        Ok(())
    }

    /// Current stored override for a target, if any
    pub async fn stored_override(&self, channel_id: Snowflake, target: OverrideTarget) -> Result<Option<Overwrite>> {
        Ok(self
            .ctx
            .override_repo()
            .find(channel_id, target)
            .await?
            .map(|ov| ov.overwrite))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Install the subscriber once; later calls are no-ops
pub fn init_test_tracing() {
    let _ = haven_common::try_init_tracing();
}

/// Assert the error is a denial (missing flag, hierarchy or escalation)
pub fn assert_forbidden<T: std::fmt::Debug>(result: Result<T, ServiceError>) {
    match result {
        Err(e) => assert!(e.is_forbidden(), "expected forbidden, got {e:?}"),
        Ok(v) => panic!("expected forbidden, got Ok({v:?})"),
    }
}

/// Assert the error carries a specific error code
pub fn assert_error_code<T: std::fmt::Debug>(result: Result<T, ServiceError>, code: &str) {
    match result {
        Err(e) => assert_eq!(e.error_code(), code, "unexpected error: {e:?}"),
        Ok(v) => panic!("expected {code}, got Ok({v:?})"),
    }
}
