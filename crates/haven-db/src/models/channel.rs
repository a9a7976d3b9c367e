//! Channel database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for channels table
#[derive(Debug, Clone, FromRow)]
pub struct ChannelModel {
    pub id: i64,
    pub guild_id: i64,
    pub name: String,
    pub channel_type: i16,
    pub topic: Option<String>,
    pub position: i32,
    pub parent_id: Option<i64>,
    pub locked: bool,
    /// @everyone override saved by lockdown; both NULL when there was none
    pub pre_lock_allow: Option<String>,
    pub pre_lock_deny: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
