//! Member database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A guild_members row joined with its member_roles, aggregated into one array
#[derive(Debug, Clone, FromRow)]
pub struct GuildMemberModel {
    pub guild_id: i64,
    pub user_id: i64,
    pub nickname: Option<String>,
    /// Held role ids, ascending; empty for a member with only @everyone
    pub role_ids: Vec<i64>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
