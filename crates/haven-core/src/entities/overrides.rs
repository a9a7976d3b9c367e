//! Channel permission overrides - per-role and per-member allow/deny pairs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Overwrite, Snowflake};

/// Who a channel override applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverrideTarget {
    Role(Snowflake),
    Member(Snowflake),
}

impl OverrideTarget {
    /// Storage discriminator ("role" or "member")
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Role(_) => "role",
            Self::Member(_) => "member",
        }
    }

    pub fn id(&self) -> Snowflake {
        match self {
            Self::Role(id) | Self::Member(id) => *id,
        }
    }

    /// Rebuild a target from its stored discriminator
    pub fn from_parts(kind: &str, id: Snowflake) -> Option<Self> {
        match kind {
            "role" => Some(Self::Role(id)),
            "member" => Some(Self::Member(id)),
            _ => None,
        }
    }

    #[inline]
    pub fn is_role(&self) -> bool {
        matches!(self, Self::Role(_))
    }
}

/// Channel override row. One per (channel, target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOverride {
    pub channel_id: Snowflake,
    pub guild_id: Snowflake,
    pub target: OverrideTarget,
    pub overwrite: Overwrite,
    pub updated_at: DateTime<Utc>,
}

impl ChannelOverride {
    pub fn new(
        channel_id: Snowflake,
        guild_id: Snowflake,
        target: OverrideTarget,
        overwrite: Overwrite,
    ) -> Self {
        Self {
            channel_id,
            guild_id,
            target,
            overwrite,
            updated_at: Utc::now(),
        }
    }

    pub fn for_role(channel_id: Snowflake, guild_id: Snowflake, role_id: Snowflake, overwrite: Overwrite) -> Self {
        Self::new(channel_id, guild_id, OverrideTarget::Role(role_id), overwrite)
    }

    pub fn for_member(channel_id: Snowflake, guild_id: Snowflake, user_id: Snowflake, overwrite: Overwrite) -> Self {
        Self::new(channel_id, guild_id, OverrideTarget::Member(user_id), overwrite)
    }

    /// Role id if this is a role override
    pub fn role_id(&self) -> Option<Snowflake> {
        match self.target {
            OverrideTarget::Role(id) => Some(id),
            OverrideTarget::Member(_) => None,
        }
    }

    /// User id if this is a member override
    pub fn user_id(&self) -> Option<Snowflake> {
        match self.target {
            OverrideTarget::Member(id) => Some(id),
            OverrideTarget::Role(_) => None,
        }
    }
}
