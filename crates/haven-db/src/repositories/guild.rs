//! PostgreSQL implementation of GuildRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::{Guild, Role};
use haven_core::traits::{GuildRepository, RepoResult};
use haven_core::value_objects::Snowflake;

use crate::models::GuildModel;

use super::error::{guild_not_found, map_db_error};
use super::role::insert_role;

/// PostgreSQL implementation of GuildRepository
#[derive(Clone)]
pub struct PgGuildRepository {
    pool: PgPool,
}

impl PgGuildRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuildRepository for PgGuildRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Guild>> {
        let result = sqlx::query_as::<_, GuildModel>(
            r#"
            SELECT id, name, owner_id, created_at, updated_at
            FROM guilds
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Guild::from))
    }

    #[instrument(skip(self, guild, everyone), fields(guild_id = %guild.id))]
    async fn create(&self, guild: &Guild, everyone: &Role) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        sqlx::query(
            r#"
            INSERT INTO guilds (id, name, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(guild.id.into_inner())
        .bind(&guild.name)
        .bind(guild.owner_id.into_inner())
        .bind(guild.created_at)
        .bind(guild.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(map_db_error)?;

        insert_role(&mut tx, everyone).await?;

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self, guild), fields(guild_id = %guild.id))]
    async fn update(&self, guild: &Guild) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE guilds
            SET name = $2, owner_id = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(guild.id.into_inner())
        .bind(&guild.name)
        .bind(guild.owner_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(guild_not_found(guild.id));
        }

        Ok(())
    }
}
