//! Response DTOs
//!
//! All response DTOs implement `Serialize` for JSON output.
//! Snowflake IDs and permission bitfields are serialized as strings for JavaScript compatibility.

use chrono::{DateTime, Utc};
use serde::Serialize;

use haven_core::Permissions;

// ============================================================================
// Common Response Types
// ============================================================================

/// Cursor-paginated list, newest first
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, before: Option<String>, has_more: bool, limit: u32) -> Self {
        Self {
            data,
            pagination: PaginationMeta {
                before,
                has_more,
                limit,
            },
        }
    }
}

/// Pagination metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Pass as `before_id` to fetch the next page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    pub has_more: bool,
    pub limit: u32,
}

// ============================================================================
// Permission Responses
// ============================================================================

/// Effective permissions of one member, in a guild or a channel
#[derive(Debug, Clone, Serialize)]
pub struct EffectivePermissionsResponse {
    pub guild_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    pub user_id: String,
    pub permissions: Permissions,
    /// Names of the set flags
    pub flags: Vec<&'static str>,
}

// ============================================================================
// Role Responses
// ============================================================================

/// Role response
#[derive(Debug, Clone, Serialize)]
pub struct RoleResponse {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub color: i32,
    pub hoist: bool,
    pub position: i32,
    pub permissions: Permissions,
    pub is_admin: bool,
    pub mentionable: bool,
    pub show_tag: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_style: Option<String>,
    pub is_everyone: bool,
}

// ============================================================================
// Member Responses
// ============================================================================

/// Guild member response
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub guild_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Explicitly held roles; @everyone is implicit
    pub roles: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

// ============================================================================
// Channel Responses
// ============================================================================

/// Channel response
#[derive(Debug, Clone, Serialize)]
pub struct ChannelResponse {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: i16,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub locked: bool,
}

/// Channel permission override response
#[derive(Debug, Clone, Serialize)]
pub struct OverrideResponse {
    pub channel_id: String,
    /// "role" or "member"
    #[serde(rename = "type")]
    pub target_type: &'static str,
    pub target_id: String,
    pub allow: Permissions,
    pub deny: Permissions,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Audit Log Responses
// ============================================================================

/// Audit log entry response
#[derive(Debug, Clone, Serialize)]
pub struct AuditLogEntryResponse {
    pub id: String,
    pub guild_id: String,
    pub actor_id: String,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission: Option<&'static str>,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
