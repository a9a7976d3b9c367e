//! Error handling utilities for repositories

use haven_core::error::DomainError;
use haven_core::traits::RepoResult;
use haven_core::value_objects::Snowflake;
use sqlx::{Error as SqlxError, PgConnection};

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    DomainError::DatabaseError(e.to_string())
}

/// Serialize writers of one guild for the rest of the transaction
pub async fn lock_guild(conn: &mut PgConnection, guild_id: Snowflake) -> RepoResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(guild_id.into_inner())
        .execute(conn)
        .await
        .map_err(map_db_error)?;
    Ok(())
}

pub fn guild_not_found(id: Snowflake) -> DomainError {
    DomainError::GuildNotFound(id)
}

pub fn channel_not_found(id: Snowflake) -> DomainError {
    DomainError::ChannelNotFound(id)
}

pub fn role_not_found(id: Snowflake) -> DomainError {
    DomainError::RoleNotFound(id)
}
