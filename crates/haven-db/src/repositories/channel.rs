//! PostgreSQL implementation of ChannelRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::Channel;
use haven_core::traits::{ChannelRepository, RepoResult};
use haven_core::value_objects::{Overwrite, Snowflake};

use crate::mappers::pre_lock_columns;
use crate::models::ChannelModel;

use super::error::{channel_not_found, lock_guild, map_db_error};

pub(super) const CHANNEL_COLUMNS: &str = "id, guild_id, name, channel_type, topic, position, parent_id, \
                               locked, pre_lock_allow, pre_lock_deny, created_at, updated_at";

/// PostgreSQL implementation of ChannelRepository
#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Channel>> {
        let result = sqlx::query_as::<_, ChannelModel>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Channel::from))
    }

    #[instrument(skip(self))]
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Channel>> {
        let results = sqlx::query_as::<_, ChannelModel>(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE guild_id = $1 ORDER BY position, id"
        ))
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Channel::from).collect())
    }

    #[instrument(skip(self, channel), fields(channel_id = %channel.id))]
    async fn create(&self, channel: &Channel) -> RepoResult<()> {
        let (pre_allow, pre_deny) = pre_lock_columns(channel);

        sqlx::query(
            r#"
            INSERT INTO channels (id, guild_id, name, channel_type, topic, position, parent_id,
                                  locked, pre_lock_allow, pre_lock_deny, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(channel.id.into_inner())
        .bind(channel.guild_id.into_inner())
        .bind(&channel.name)
        .bind(channel.channel_type.as_i16())
        .bind(&channel.topic)
        .bind(channel.position)
        .bind(channel.parent_id.map(Snowflake::into_inner))
        .bind(channel.locked)
        .bind(pre_allow)
        .bind(pre_deny)
        .bind(channel.created_at)
        .bind(channel.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, channel), fields(channel_id = %channel.id))]
    async fn update(&self, channel: &Channel) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE channels
            SET name = $2, topic = $3, position = $4, parent_id = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(channel.id.into_inner())
        .bind(&channel.name)
        .bind(&channel.topic)
        .bind(channel.position)
        .bind(channel.parent_id.map(Snowflake::into_inner))
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(channel_not_found(channel.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        // channel_overrides rows go with the channel via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(channel_not_found(id));
        }

        Ok(())
    }

    #[instrument(skip(self, channel, everyone_override), fields(channel_id = %channel.id, locked = channel.locked))]
    async fn set_lockdown(
        &self,
        channel: &Channel,
        everyone_role_id: Snowflake,
        everyone_override: Option<Overwrite>,
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        lock_guild(&mut tx, channel.guild_id).await?;

        let (pre_allow, pre_deny) = pre_lock_columns(channel);
        let result = sqlx::query(
            r#"
            UPDATE channels
            SET locked = $2, pre_lock_allow = $3, pre_lock_deny = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(channel.id.into_inner())
        .bind(channel.locked)
        .bind(pre_allow)
        .bind(pre_deny)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(channel_not_found(channel.id));
        }

        match everyone_override {
            Some(ow) => {
                sqlx::query(
                    r#"
                    INSERT INTO channel_overrides (channel_id, guild_id, target_type, target_id,
                                                   allow_permissions, deny_permissions, updated_at)
                    VALUES ($1, $2, 'role', $3, $4, $5, NOW())
                    ON CONFLICT (channel_id, target_type, target_id)
                    DO UPDATE SET allow_permissions = EXCLUDED.allow_permissions,
                                  deny_permissions = EXCLUDED.deny_permissions,
                                  updated_at = NOW()
                    "#,
                )
                .bind(channel.id.into_inner())
                .bind(channel.guild_id.into_inner())
                .bind(everyone_role_id.into_inner())
                .bind(ow.allow.to_string())
                .bind(ow.deny.to_string())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }
            None => {
                sqlx::query(
                    r#"
                    DELETE FROM channel_overrides
                    WHERE channel_id = $1 AND target_type = 'role' AND target_id = $2
                    "#,
                )
                .bind(channel.id.into_inner())
                .bind(everyone_role_id.into_inner())
                .execute(&mut *tx)
                .await
                .map_err(map_db_error)?;
            }
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }
}
