//! Audit log entity - append-only record of privileged actions and denials

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::value_objects::{PermissionFlag, Snowflake};

/// Action recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    RoleCreate,
    RoleUpdate,
    RoleDelete,
    RoleReorder,
    MemberRoleAdd,
    MemberRoleRemove,
    OverrideSet,
    OverrideDelete,
    ChannelLock,
    ChannelUnlock,
    ChannelView,
    OverrideList,
    AuditLogView,
}

impl AuditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RoleCreate => "ROLE_CREATE",
            Self::RoleUpdate => "ROLE_UPDATE",
            Self::RoleDelete => "ROLE_DELETE",
            Self::RoleReorder => "ROLE_REORDER",
            Self::MemberRoleAdd => "MEMBER_ROLE_ADD",
            Self::MemberRoleRemove => "MEMBER_ROLE_REMOVE",
            Self::OverrideSet => "OVERRIDE_SET",
            Self::OverrideDelete => "OVERRIDE_DELETE",
            Self::ChannelLock => "CHANNEL_LOCK",
            Self::ChannelUnlock => "CHANNEL_UNLOCK",
            Self::ChannelView => "CHANNEL_VIEW",
            Self::OverrideList => "OVERRIDE_LIST",
            Self::AuditLogView => "AUDIT_LOG_VIEW",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let action = match s {
            "ROLE_CREATE" => Self::RoleCreate,
            "ROLE_UPDATE" => Self::RoleUpdate,
            "ROLE_DELETE" => Self::RoleDelete,
            "ROLE_REORDER" => Self::RoleReorder,
            "MEMBER_ROLE_ADD" => Self::MemberRoleAdd,
            "MEMBER_ROLE_REMOVE" => Self::MemberRoleRemove,
            "OVERRIDE_SET" => Self::OverrideSet,
            "OVERRIDE_DELETE" => Self::OverrideDelete,
            "CHANNEL_LOCK" => Self::ChannelLock,
            "CHANNEL_UNLOCK" => Self::ChannelUnlock,
            "CHANNEL_VIEW" => Self::ChannelView,
            "OVERRIDE_LIST" => Self::OverrideList,
            "AUDIT_LOG_VIEW" => Self::AuditLogView,
            other => {
                return Err(DomainError::ValidationError(format!(
                    "unknown audit action: {other}"
                )))
            }
        };
        Ok(action)
    }
}

/// Kind of object an audit entry points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditTargetType {
    Role,
    Member,
    Channel,
    ChannelOverride,
}

impl AuditTargetType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Member => "member",
            Self::Channel => "channel",
            Self::ChannelOverride => "channel_override",
        }
    }
}

impl fmt::Display for AuditTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditTargetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "role" => Ok(Self::Role),
            "member" => Ok(Self::Member),
            "channel" => Ok(Self::Channel),
            "channel_override" => Ok(Self::ChannelOverride),
            other => Err(DomainError::ValidationError(format!(
                "unknown audit target type: {other}"
            ))),
        }
    }
}

/// Outcome of the gated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditVerdict {
    Allowed,
    Denied,
}

impl AuditVerdict {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Denied => "denied",
        }
    }

    /// Lenient read from storage; anything but "denied" is an allowed entry
    pub fn from_stored(s: &str) -> Self {
        if s == "denied" {
            Self::Denied
        } else {
            Self::Allowed
        }
    }
}

/// The operation a permission check guards, kept for the audit entry if the check fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptedAction {
    pub action: AuditAction,
    pub target: Option<(AuditTargetType, Snowflake)>,
}

impl AttemptedAction {
    pub const fn new(action: AuditAction) -> Self {
        Self { action, target: None }
    }

    #[must_use]
    pub const fn on(mut self, target_type: AuditTargetType, target_id: Snowflake) -> Self {
        self.target = Some((target_type, target_id));
        self
    }
}

impl From<AuditAction> for AttemptedAction {
    fn from(action: AuditAction) -> Self {
        Self::new(action)
    }
}

/// Audit log entry
///
/// `action` is what the actor did, or tried to do when `verdict` is `Denied`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditLogEntry {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub actor_id: Snowflake,
    pub action: AuditAction,
    pub target_type: Option<AuditTargetType>,
    pub target_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub permission: Option<PermissionFlag>,
    pub verdict: AuditVerdict,
    pub changes: Option<serde_json::Value>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    /// Entry for a successful mutation
    pub fn new(id: Snowflake, guild_id: Snowflake, actor_id: Snowflake, action: AuditAction) -> Self {
        Self {
            id,
            guild_id,
            actor_id,
            action,
            target_type: None,
            target_id: None,
            channel_id: None,
            permission: None,
            verdict: AuditVerdict::Allowed,
            changes: None,
            reason: None,
            created_at: Utc::now(),
        }
    }

    /// Entry for a refused permission check on `attempt`
    pub fn denied(
        id: Snowflake,
        guild_id: Snowflake,
        actor_id: Snowflake,
        attempt: AttemptedAction,
        permission: PermissionFlag,
        channel_id: Option<Snowflake>,
    ) -> Self {
        Self {
            target_type: attempt.target.map(|(kind, _)| kind),
            target_id: attempt.target.map(|(_, id)| id),
            permission: Some(permission),
            channel_id,
            verdict: AuditVerdict::Denied,
            ..Self::new(id, guild_id, actor_id, attempt.action)
        }
    }

    #[must_use]
    pub fn with_target(mut self, target_type: AuditTargetType, target_id: Snowflake) -> Self {
        self.target_type = Some(target_type);
        self.target_id = Some(target_id);
        self
    }

    #[must_use]
    pub fn with_channel(mut self, channel_id: Snowflake) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    #[must_use]
    pub fn with_changes(mut self, changes: serde_json::Value) -> Self {
        self.changes = Some(changes);
        self
    }

    #[must_use]
    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }

    #[inline]
    pub fn is_denied(&self) -> bool {
        self.verdict == AuditVerdict::Denied
    }
}

/// Filters for reading a guild's audit log, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditLogQuery {
    pub guild_id: Snowflake,
    pub actor_id: Option<Snowflake>,
    pub action: Option<AuditAction>,
    pub target_type: Option<AuditTargetType>,
    pub after: Option<DateTime<Utc>>,
    pub before: Option<DateTime<Utc>>,
    /// Keyset cursor: only entries with a smaller id
    pub before_id: Option<Snowflake>,
    pub limit: u32,
}

impl AuditLogQuery {
    pub fn new(guild_id: Snowflake, limit: u32) -> Self {
        Self {
            guild_id,
            actor_id: None,
            action: None,
            target_type: None,
            after: None,
            before: None,
            before_id: None,
            limit,
        }
    }

    /// True if `entry` passes every filter except the limit
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        entry.guild_id == self.guild_id
            && self.actor_id.map_or(true, |id| entry.actor_id == id)
            && self.action.map_or(true, |a| entry.action == a)
            && self.target_type.map_or(true, |t| entry.target_type == Some(t))
            && self.after.map_or(true, |t| entry.created_at > t)
            && self.before.map_or(true, |t| entry.created_at < t)
            && self.before_id.map_or(true, |id| entry.id < id)
    }
}
