//! PostgreSQL implementation of AuditLogRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use haven_core::entities::{AuditLogEntry, AuditLogQuery};
use haven_core::traits::{AuditLogRepository, RepoResult};
use haven_core::value_objects::Snowflake;

use crate::models::AuditLogModel;

use super::error::map_db_error;

/// PostgreSQL implementation of AuditLogRepository
#[derive(Clone)]
pub struct PgAuditLogRepository {
    pool: PgPool,
}

impl PgAuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogRepository for PgAuditLogRepository {
    #[instrument(skip(self, entry), fields(guild_id = %entry.guild_id, action = %entry.action))]
    async fn append(&self, entry: &AuditLogEntry) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, guild_id, actor_id, action, target_type, target_id,
                                    channel_id, permission, verdict, changes, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(entry.id.into_inner())
        .bind(entry.guild_id.into_inner())
        .bind(entry.actor_id.into_inner())
        .bind(entry.action.as_str())
        .bind(entry.target_type.map(|t| t.as_str()))
        .bind(entry.target_id.map(Snowflake::into_inner))
        .bind(entry.channel_id.map(Snowflake::into_inner))
        .bind(entry.permission.map(|p| p.name()))
        .bind(entry.verdict.as_str())
        .bind(&entry.changes)
        .bind(&entry.reason)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn query(&self, query: &AuditLogQuery) -> RepoResult<Vec<AuditLogEntry>> {
        let results = sqlx::query_as::<_, AuditLogModel>(
            r#"
            SELECT id, guild_id, actor_id, action, target_type, target_id, channel_id,
                   permission, verdict, changes, reason, created_at
            FROM audit_logs
            WHERE guild_id = $1
              AND ($2::BIGINT IS NULL OR actor_id = $2)
              AND ($3::VARCHAR IS NULL OR action = $3)
              AND ($4::VARCHAR IS NULL OR target_type = $4)
              AND ($5::TIMESTAMPTZ IS NULL OR created_at > $5)
              AND ($6::TIMESTAMPTZ IS NULL OR created_at < $6)
              AND ($7::BIGINT IS NULL OR id < $7)
            ORDER BY id DESC
            LIMIT $8
            "#,
        )
        .bind(query.guild_id.into_inner())
        .bind(query.actor_id.map(Snowflake::into_inner))
        .bind(query.action.map(|a| a.as_str()))
        .bind(query.target_type.map(|t| t.as_str()))
        .bind(query.after)
        .bind(query.before)
        .bind(query.before_id.map(Snowflake::into_inner))
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results.into_iter().map(AuditLogEntry::try_from).collect()
    }
}
