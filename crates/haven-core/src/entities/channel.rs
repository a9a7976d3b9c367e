//! Channel entity - represents a text channel, voice channel, or category

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{Overwrite, Snowflake};

/// Channel type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ChannelType {
    #[default]
    Text = 0,
    Voice = 2,
    Category = 4,
}

impl ChannelType {
    #[inline]
    #[must_use]
    pub fn as_i16(self) -> i16 {
        self as i16
    }
}

impl From<i16> for ChannelType {
    fn from(value: i16) -> Self {
        match value {
            2 => Self::Voice,
            4 => Self::Category,
            _ => Self::Text, // Default for 0 and unknown values
        }
    }
}

/// Channel entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    pub channel_type: ChannelType,
    pub topic: Option<String>,
    pub position: i32,
    pub parent_id: Option<Snowflake>,
    /// Lockdown state; the lock itself is an @everyone override
    pub locked: bool,
    /// @everyone override in place before the lock, restored on unlock
    pub pre_lock_override: Option<Overwrite>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    #[must_use]
    pub fn new(id: Snowflake, guild_id: Snowflake, name: String, channel_type: ChannelType) -> Self {
        let now = Utc::now();
        Self {
            id,
            guild_id,
            name,
            channel_type,
            topic: None,
            position: 0,
            parent_id: None,
            locked: false,
            pre_lock_override: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn new_text(id: Snowflake, guild_id: Snowflake, name: String) -> Self {
        Self::new(id, guild_id, name, ChannelType::Text)
    }

    #[inline]
    #[must_use]
    pub fn is_voice(&self) -> bool {
        matches!(self.channel_type, ChannelType::Voice)
    }

    #[inline]
    #[must_use]
    pub fn is_category(&self) -> bool {
        matches!(self.channel_type, ChannelType::Category)
    }

    /// Enter lockdown, remembering the @everyone override it replaces
    pub fn lock(&mut self, previous: Option<Overwrite>) {
        self.locked = true;
        self.pre_lock_override = previous;
        self.updated_at = Utc::now();
    }

    /// Leave lockdown, handing back the override to restore
    pub fn unlock(&mut self) -> Option<Overwrite> {
        self.locked = false;
        self.updated_at = Utc::now();
        self.pre_lock_override.take()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    /// Move channel to a category
    pub fn set_parent(&mut self, parent_id: Option<Snowflake>) {
        self.parent_id = parent_id;
        self.updated_at = Utc::now();
    }
}
