//! PostgreSQL implementation of OverrideRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::{ChannelOverride, OverrideTarget};
use haven_core::traits::{OverrideRepository, RepoResult};
use haven_core::value_objects::Snowflake;

use crate::models::ChannelOverrideModel;

use super::error::{lock_guild, map_db_error};

/// PostgreSQL implementation of OverrideRepository
#[derive(Clone)]
pub struct PgOverrideRepository {
    pool: PgPool,
}

impl PgOverrideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OverrideRepository for PgOverrideRepository {
    #[instrument(skip(self))]
    async fn find_by_channel(&self, channel_id: Snowflake) -> RepoResult<Vec<ChannelOverride>> {
        let results = sqlx::query_as::<_, ChannelOverrideModel>(
            r#"
            SELECT channel_id, guild_id, target_type, target_id,
                   allow_permissions, deny_permissions, updated_at
            FROM channel_overrides
            WHERE channel_id = $1
            ORDER BY target_type, target_id
            "#,
        )
        .bind(channel_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(ChannelOverride::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<Option<ChannelOverride>> {
        let result = sqlx::query_as::<_, ChannelOverrideModel>(
            r#"
            SELECT channel_id, guild_id, target_type, target_id,
                   allow_permissions, deny_permissions, updated_at
            FROM channel_overrides
            WHERE channel_id = $1 AND target_type = $2 AND target_id = $3
            "#,
        )
        .bind(channel_id.into_inner())
        .bind(target.kind())
        .bind(target.id().into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(ChannelOverride::try_from).transpose()
    }

    #[instrument(skip(self, channel_override), fields(channel_id = %channel_override.channel_id))]
    async fn upsert(&self, channel_override: &ChannelOverride) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        lock_guild(&mut tx, channel_override.guild_id).await?;

        sqlx::query(
            r#"
            INSERT INTO channel_overrides (channel_id, guild_id, target_type, target_id,
                                           allow_permissions, deny_permissions, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (channel_id, target_type, target_id)
            DO UPDATE SET allow_permissions = EXCLUDED.allow_permissions,
                          deny_permissions = EXCLUDED.deny_permissions,
                          updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(channel_override.channel_id.into_inner())
        .bind(channel_override.guild_id.into_inner())
        .bind(channel_override.target.kind())
        .bind(channel_override.target.id().into_inner())
        .bind(channel_override.overwrite.allow.to_string())
        .bind(channel_override.overwrite.deny.to_string())
        .bind(channel_override.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, channel_id: Snowflake, target: OverrideTarget) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM channel_overrides
            WHERE channel_id = $1 AND target_type = $2 AND target_id = $3
            "#,
        )
        .bind(channel_id.into_inner())
        .bind(target.kind())
        .bind(target.id().into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }
}
