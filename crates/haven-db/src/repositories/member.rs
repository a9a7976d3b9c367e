//! PostgreSQL implementation of MemberRepository
//!
//! Members are read together with their role ids in one statement; the
//! aggregate below is shared by every read.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::GuildMember;
use haven_core::error::DomainError;
use haven_core::traits::{MemberRepository, RepoResult};
use haven_core::value_objects::Snowflake;

use crate::models::GuildMemberModel;

use super::error::{map_db_error, map_unique_violation};

/// Largest page `find_by_guild` returns
const MAX_PAGE: i64 = 1000;

/// Member columns plus `role_ids`, grouped per member; `tail` follows the GROUP BY
pub(super) fn member_query(filter: &str, tail: &str) -> String {
    format!(
        r#"
        SELECT m.guild_id, m.user_id, m.nickname, m.joined_at, m.updated_at,
               COALESCE(
                   array_agg(mr.role_id ORDER BY mr.role_id) FILTER (WHERE mr.role_id IS NOT NULL),
                   '{{}}'
               ) AS role_ids
        FROM guild_members m
        LEFT JOIN member_roles mr ON mr.guild_id = m.guild_id AND mr.user_id = m.user_id
        WHERE {filter}
        GROUP BY m.guild_id, m.user_id
        {tail}
        "#
    )
}

/// PostgreSQL implementation of MemberRepository
#[derive(Clone)]
pub struct PgMemberRepository {
    pool: PgPool,
}

impl PgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for PgMemberRepository {
    #[instrument(skip(self))]
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<GuildMember>> {
        let sql = member_query("m.guild_id = $1 AND m.user_id = $2", "");
        let model = sqlx::query_as::<_, GuildMemberModel>(&sql)
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(model.map(GuildMember::from))
    }

    #[instrument(skip(self))]
    async fn find_by_guild(
        &self,
        guild_id: Snowflake,
        limit: i64,
        after: Option<Snowflake>,
    ) -> RepoResult<Vec<GuildMember>> {
        let sql = member_query(
            "m.guild_id = $1 AND ($2::BIGINT IS NULL OR m.user_id > $2)",
            "ORDER BY m.user_id LIMIT $3",
        );
        let models = sqlx::query_as::<_, GuildMemberModel>(&sql)
            .bind(guild_id.into_inner())
            .bind(after.map(Snowflake::into_inner))
            .bind(limit.clamp(1, MAX_PAGE))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(models.into_iter().map(GuildMember::from).collect())
    }

    #[instrument(skip(self))]
    async fn is_member(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM guild_members WHERE guild_id = $1 AND user_id = $2)",
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)
    }

    #[instrument(skip(self, member), fields(guild_id = %member.guild_id, user_id = %member.user_id))]
    async fn create(&self, member: &GuildMember) -> RepoResult<()> {
        let role_ids: Vec<i64> = member.role_ids.iter().map(|id| id.into_inner()).collect();

        // Both rows land in one statement, so a failed role insert leaves no member behind
        sqlx::query(
            r#"
            WITH new_member AS (
                INSERT INTO guild_members (guild_id, user_id, nickname, joined_at, updated_at)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING guild_id, user_id
            )
            INSERT INTO member_roles (guild_id, user_id, role_id)
            SELECT new_member.guild_id, new_member.user_id, r.role_id
            FROM new_member, UNNEST($6::BIGINT[]) AS r(role_id)
            ON CONFLICT (guild_id, user_id, role_id) DO NOTHING
            "#,
        )
        .bind(member.guild_id.into_inner())
        .bind(member.user_id.into_inner())
        .bind(&member.nickname)
        .bind(member.joined_at)
        .bind(member.updated_at)
        .bind(&role_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, || DomainError::AlreadyMember))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<()> {
        let removed = sqlx::query("DELETE FROM guild_members WHERE guild_id = $1 AND user_id = $2")
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?
            .rows_affected();

        if removed == 0 {
            return Err(DomainError::MemberNotFound);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()> {
        // Inserting through the member row turns "no such member" into zero rows
        // instead of a foreign key error
        let inserted = sqlx::query(
            r#"
            INSERT INTO member_roles (guild_id, user_id, role_id)
            SELECT m.guild_id, m.user_id, $3
            FROM guild_members m
            WHERE m.guild_id = $1 AND m.user_id = $2
            ON CONFLICT (guild_id, user_id, role_id) DO NOTHING
            "#,
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .bind(role_id.into_inner())
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?
        .rows_affected();

        if inserted == 0 {
            return if self.is_member(guild_id, user_id).await? {
                Err(DomainError::AlreadyHasRole)
            } else {
                Err(DomainError::MemberNotFound)
            };
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_role(&self, guild_id: Snowflake, user_id: Snowflake, role_id: Snowflake) -> RepoResult<()> {
        sqlx::query("DELETE FROM member_roles WHERE guild_id = $1 AND user_id = $2 AND role_id = $3")
            .bind(guild_id.into_inner())
            .bind(user_id.into_inner())
            .bind(role_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_role_ids(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Vec<Snowflake>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT role_id FROM member_roles WHERE guild_id = $1 AND user_id = $2 ORDER BY role_id",
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids.into_iter().map(Snowflake::new).collect())
    }
}
