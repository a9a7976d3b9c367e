//! Channel override database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for channel_overrides table
#[derive(Debug, Clone, FromRow)]
pub struct ChannelOverrideModel {
    pub channel_id: i64,
    pub guild_id: i64,
    /// 'role' or 'member'
    pub target_type: String,
    pub target_id: i64,
    pub allow_permissions: String,
    pub deny_permissions: String,
    pub updated_at: DateTime<Utc>,
}
