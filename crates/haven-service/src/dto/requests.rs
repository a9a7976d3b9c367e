//! Request DTOs for service inputs
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.
//! Bitfields arrive as decimal strings (numbers are accepted too); undefined
//! bits are rejected during deserialization.

use chrono::{DateTime, Utc};
use haven_core::{PermissionFlag, Permissions};
use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Role Requests
// ============================================================================

/// Create role request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    pub name: String,

    /// Role color as integer (RGB)
    #[serde(default)]
    #[validate(range(min = 0, max = 0x00FF_FFFF, message = "Color must be a 24-bit RGB value"))]
    pub color: i32,

    /// Whether to display role members separately
    #[serde(default)]
    pub hoist: bool,

    /// Base permissions; empty when omitted
    #[serde(default)]
    pub permissions: Permissions,

    /// Grant ADMINISTRATOR; equivalent to setting the bit in `permissions`
    #[serde(default)]
    pub is_admin: bool,

    /// Whether the role can be mentioned
    #[serde(default)]
    pub mentionable: bool,

    /// Show the role tag next to member names
    #[serde(default)]
    pub show_tag: bool,

    #[validate(length(max = 32, message = "Tag style must be at most 32 characters"))]
    pub tag_style: Option<String>,

    /// Position in role hierarchy; defaults to just above @everyone
    #[validate(range(min = 1, message = "Position must be >= 1"))]
    pub position: Option<i32>,
}

/// Update role request
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    pub name: Option<String>,

    /// Role color as integer (RGB)
    #[validate(range(min = 0, max = 0x00FF_FFFF, message = "Color must be a 24-bit RGB value"))]
    pub color: Option<i32>,

    /// Whether to display role members separately
    pub hoist: Option<bool>,

    /// Replacement permissions bitfield
    pub permissions: Option<Permissions>,

    pub is_admin: Option<bool>,

    /// Whether the role can be mentioned
    pub mentionable: Option<bool>,

    pub show_tag: Option<bool>,

    #[validate(length(max = 32, message = "Tag style must be at most 32 characters"))]
    pub tag_style: Option<String>,
}

/// Role position update (for bulk reordering)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RolePosition {
    /// Role ID (Snowflake as string)
    pub id: String,

    #[validate(range(min = 1, message = "Position must be >= 1"))]
    pub position: i32,
}

/// Bulk role position update request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReorderRolesRequest {
    #[validate(length(min = 1, max = 250, message = "Must reorder 1-250 roles"), nested)]
    pub positions: Vec<RolePosition>,
}

/// Flip a single permission flag on a role (settings UI toggle)
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ToggleRoleFlagRequest {
    pub flag: PermissionFlag,
    pub enabled: bool,
}

// ============================================================================
// Channel Override Requests
// ============================================================================

/// Set a channel permission override for a role or a member
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SetOverrideRequest {
    #[serde(default)]
    pub allow: Permissions,

    #[serde(default)]
    pub deny: Permissions,
}

// ============================================================================
// Channel Lockdown Requests
// ============================================================================

/// Lock or unlock a channel
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct LockdownRequest {
    /// Recorded in the audit log
    #[validate(length(max = 512, message = "Reason must be at most 512 characters"))]
    pub reason: Option<String>,
}

// ============================================================================
// Audit Log Requests
// ============================================================================

/// Audit log query parameters
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuditLogQueryParams {
    /// Filter by actor (Snowflake as string)
    pub actor_id: Option<String>,

    /// Filter by action, e.g. "ROLE_UPDATE"
    pub action: Option<String>,

    /// Filter by target type, e.g. "channel_override"
    pub target_type: Option<String>,

    /// Only entries created strictly after this instant
    pub after: Option<DateTime<Utc>>,

    /// Only entries created strictly before this instant
    pub before: Option<DateTime<Utc>>,

    /// Keyset cursor: only entries with a smaller id
    pub before_id: Option<String>,

    /// Page size; clamped to the configured maximum
    #[validate(range(min = 1, message = "Limit must be >= 1"))]
    pub limit: Option<u32>,
}
