//! Entity to DTO mappers

use haven_core::entities::{AuditLogEntry, Channel, ChannelOverride, GuildMember, Role};
use haven_core::{PermissionSnapshot, Permissions, Snowflake};

use super::responses::{
    AuditLogEntryResponse, ChannelResponse, EffectivePermissionsResponse, MemberResponse,
    OverrideResponse, RoleResponse,
};

// ============================================================================
// Role Mappers
// ============================================================================

impl From<&Role> for RoleResponse {
    fn from(role: &Role) -> Self {
        Self {
            id: role.id.to_string(),
            guild_id: role.guild_id.to_string(),
            name: role.name.clone(),
            color: role.color,
            hoist: role.hoist,
            position: role.position,
            permissions: role.permissions,
            is_admin: role.grants_administrator(),
            mentionable: role.mentionable,
            show_tag: role.show_tag,
            tag_style: role.tag_style.clone(),
            is_everyone: role.is_everyone,
        }
    }
}

impl From<Role> for RoleResponse {
    fn from(role: Role) -> Self {
        Self::from(&role)
    }
}

// ============================================================================
// Member Mappers
// ============================================================================

impl From<&GuildMember> for MemberResponse {
    fn from(member: &GuildMember) -> Self {
        Self {
            guild_id: member.guild_id.to_string(),
            user_id: member.user_id.to_string(),
            nickname: member.nickname.clone(),
            roles: member.role_ids.iter().map(ToString::to_string).collect(),
            joined_at: member.joined_at,
        }
    }
}

// ============================================================================
// Channel Mappers
// ============================================================================

impl From<&Channel> for ChannelResponse {
    fn from(channel: &Channel) -> Self {
        Self {
            id: channel.id.to_string(),
            guild_id: channel.guild_id.to_string(),
            name: channel.name.clone(),
            channel_type: channel.channel_type.as_i16(),
            position: channel.position,
            parent_id: channel.parent_id.map(|id| id.to_string()),
            locked: channel.locked,
        }
    }
}

impl From<&ChannelOverride> for OverrideResponse {
    fn from(ov: &ChannelOverride) -> Self {
        Self {
            channel_id: ov.channel_id.to_string(),
            target_type: ov.target.kind(),
            target_id: ov.target.id().to_string(),
            allow: ov.overwrite.allow,
            deny: ov.overwrite.deny,
            updated_at: ov.updated_at,
        }
    }
}

impl From<ChannelOverride> for OverrideResponse {
    fn from(ov: ChannelOverride) -> Self {
        Self::from(&ov)
    }
}

// ============================================================================
// Audit Log Mappers
// ============================================================================

impl From<AuditLogEntry> for AuditLogEntryResponse {
    fn from(entry: AuditLogEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            guild_id: entry.guild_id.to_string(),
            actor_id: entry.actor_id.to_string(),
            action: entry.action.as_str(),
            target_type: entry.target_type.map(|t| t.as_str()),
            target_id: entry.target_id.map(|id| id.to_string()),
            channel_id: entry.channel_id.map(|id| id.to_string()),
            permission: entry.permission.map(|p| p.name()),
            verdict: entry.verdict.as_str(),
            changes: entry.changes,
            reason: entry.reason,
            created_at: entry.created_at,
        }
    }
}

// ============================================================================
// Permission Mappers
// ============================================================================

impl EffectivePermissionsResponse {
    pub fn new(
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        snapshot: &PermissionSnapshot,
        permissions: Permissions,
    ) -> Self {
        Self {
            guild_id: guild_id.to_string(),
            channel_id: channel_id.map(|id| id.to_string()),
            user_id: snapshot.user_id.to_string(),
            permissions,
            flags: permissions.list(),
        }
    }
}
