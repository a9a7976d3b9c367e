//! PostgreSQL implementation of SnapshotRepository
//!
//! All reads for one permission decision share a REPEATABLE READ transaction,
//! so a role deletion or lockdown committed mid-load is either fully visible
//! or not visible at all.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::{Channel, ChannelOverride, Guild, GuildMember, Role};
use haven_core::traits::{PermissionInputs, RepoResult, SnapshotRepository};
use haven_core::value_objects::Snowflake;

use crate::models::{ChannelModel, ChannelOverrideModel, GuildMemberModel, GuildModel, RoleModel};

use super::channel::CHANNEL_COLUMNS;
use super::error::map_db_error;
use super::member::member_query;
use super::role::ROLE_COLUMNS;

/// PostgreSQL implementation of SnapshotRepository
#[derive(Clone)]
pub struct PgSnapshotRepository {
    pool: PgPool,
}

impl PgSnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotRepository for PgSnapshotRepository {
    #[instrument(skip(self))]
    async fn load_permission_inputs(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
    ) -> RepoResult<Option<PermissionInputs>> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let guild = sqlx::query_as::<_, GuildModel>(
            "SELECT id, name, owner_id, created_at, updated_at FROM guilds WHERE id = $1",
        )
        .bind(guild_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let Some(guild) = guild else {
            return Ok(None);
        };

        let member = sqlx::query_as::<_, GuildMemberModel>(&member_query(
            "m.guild_id = $1 AND m.user_id = $2",
            "",
        ))
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let roles = sqlx::query_as::<_, RoleModel>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE guild_id = $1 ORDER BY position, id"
        ))
        .bind(guild_id.into_inner())
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let mut channel = None;
        let mut channel_overrides = Vec::new();
        if let Some(channel_id) = channel_id {
            channel = sqlx::query_as::<_, ChannelModel>(&format!(
                "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = $1 AND guild_id = $2"
            ))
            .bind(channel_id.into_inner())
            .bind(guild_id.into_inner())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_error)?
            .map(Channel::from);

            if channel.is_some() {
                channel_overrides = sqlx::query_as::<_, ChannelOverrideModel>(
                    r#"
                    SELECT channel_id, guild_id, target_type, target_id,
                           allow_permissions, deny_permissions, updated_at
                    FROM channel_overrides
                    WHERE channel_id = $1
                    ORDER BY target_type, target_id
                    "#,
                )
                .bind(channel_id.into_inner())
                .fetch_all(&mut *tx)
                .await
                .map_err(map_db_error)?
                .into_iter()
                .map(ChannelOverride::try_from)
                .collect::<RepoResult<Vec<_>>>()?;
            }
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(Some(PermissionInputs {
            guild: Guild::from(guild),
            member: member.map(GuildMember::from),
            roles: roles.into_iter().map(Role::from).collect(),
            channel,
            channel_overrides,
        }))
    }
}
