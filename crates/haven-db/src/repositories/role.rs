//! PostgreSQL implementation of RoleRepository

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::instrument;

use haven_core::entities::Role;
use haven_core::error::DomainError;
use haven_core::traits::{RepoResult, RoleRepository};
use haven_core::value_objects::Snowflake;

use crate::models::RoleModel;

use super::error::{lock_guild, map_db_error, map_unique_violation, role_not_found};

pub(super) const ROLE_COLUMNS: &str = "id, guild_id, name, color, hoist, position, permissions, is_admin, \
                            mentionable, show_tag, tag_style, is_everyone, created_at, updated_at";

/// PostgreSQL implementation of RoleRepository
#[derive(Clone)]
pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a role on an existing connection or transaction
pub(super) async fn insert_role(conn: &mut PgConnection, role: &Role) -> RepoResult<()> {
    sqlx::query(
        r#"
        INSERT INTO roles (id, guild_id, name, color, hoist, position, permissions, is_admin,
                           mentionable, show_tag, tag_style, is_everyone, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(role.id.into_inner())
    .bind(role.guild_id.into_inner())
    .bind(&role.name)
    .bind(role.color)
    .bind(role.hoist)
    .bind(role.position)
    .bind(role.permissions.to_string())
    .bind(role.is_admin)
    .bind(role.mentionable)
    .bind(role.show_tag)
    .bind(&role.tag_style)
    .bind(role.is_everyone)
    .bind(role.created_at)
    .bind(role.updated_at)
    .execute(conn)
    .await
    .map_err(|e| {
        map_unique_violation(e, || {
            DomainError::ValidationError("guild already has an @everyone role".to_string())
        })
    })?;

    Ok(())
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Role>> {
        let result = sqlx::query_as::<_, RoleModel>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
        ))
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Role::from))
    }

    #[instrument(skip(self))]
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Vec<Role>> {
        let results = sqlx::query_as::<_, RoleModel>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE guild_id = $1 ORDER BY position, id"
        ))
        .bind(guild_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Role::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_everyone(&self, guild_id: Snowflake) -> RepoResult<Option<Role>> {
        let result = sqlx::query_as::<_, RoleModel>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles WHERE guild_id = $1 AND is_everyone = TRUE"
        ))
        .bind(guild_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Role::from))
    }

    #[instrument(skip(self, role), fields(role_id = %role.id))]
    async fn create(&self, role: &Role) -> RepoResult<()> {
        let mut conn = self.pool.acquire().await.map_err(map_db_error)?;
        insert_role(&mut conn, role).await
    }

    #[instrument(skip(self, role), fields(role_id = %role.id))]
    async fn update(&self, role: &Role) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE roles
            SET name = $2, color = $3, hoist = $4, position = $5, permissions = $6,
                is_admin = $7, mentionable = $8, show_tag = $9, tag_style = $10, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(role.id.into_inner())
        .bind(&role.name)
        .bind(role.color)
        .bind(role.hoist)
        .bind(role.position)
        .bind(role.permissions.to_string())
        .bind(role.is_admin)
        .bind(role.mentionable)
        .bind(role.show_tag)
        .bind(&role.tag_style)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(role_not_found(role.id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let row = sqlx::query_as::<_, (i64, bool)>(
            "SELECT guild_id, is_everyone FROM roles WHERE id = $1",
        )
        .bind(id.into_inner())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let (guild_id, is_everyone) = row.ok_or_else(|| role_not_found(id))?;
        if is_everyone {
            return Err(DomainError::CannotDeleteEveryoneRole);
        }

        lock_guild(&mut tx, Snowflake::new(guild_id)).await?;

        // Overrides reference roles polymorphically, so no FK cascade covers them
        sqlx::query("DELETE FROM channel_overrides WHERE target_type = 'role' AND target_id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        sqlx::query("DELETE FROM member_roles WHERE role_id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id.into_inner())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(role_not_found(id));
        }

        tx.commit().await.map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self, positions))]
    async fn update_positions(
        &self,
        guild_id: Snowflake,
        positions: &[(Snowflake, i32)],
    ) -> RepoResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;
        lock_guild(&mut tx, guild_id).await?;

        for (role_id, position) in positions {
            let result = sqlx::query(
                r#"
                UPDATE roles
                SET position = $3, updated_at = NOW()
                WHERE id = $1 AND guild_id = $2 AND is_everyone = FALSE
                "#,
            )
            .bind(role_id.into_inner())
            .bind(guild_id.into_inner())
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;

            if result.rows_affected() == 0 {
                return Err(role_not_found(*role_id));
            }
        }

        tx.commit().await.map_err(map_db_error)?;

        Ok(())
    }
}
