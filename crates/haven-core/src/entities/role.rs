//! Role entity - represents a guild role with permissions

use chrono::{DateTime, Utc};

use crate::value_objects::{Permissions, Snowflake};

/// Role entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    pub color: i32,
    pub hoist: bool,
    /// Rank; higher positions win override conflicts. @everyone is always 0.
    pub position: i32,
    pub permissions: Permissions,
    /// Tracked alongside the ADMINISTRATOR bit for fast-path checks
    pub is_admin: bool,
    pub mentionable: bool,
    pub show_tag: bool,
    pub tag_style: Option<String>,
    pub is_everyone: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(
        id: Snowflake,
        guild_id: Snowflake,
        name: String,
        permissions: Permissions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            guild_id,
            name,
            color: 0,
            hoist: false,
            position: 0,
            permissions,
            is_admin: permissions.contains(Permissions::ADMINISTRATOR),
            mentionable: false,
            show_tag: false,
            tag_style: None,
            is_everyone: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create the @everyone role for a guild
    pub fn everyone(id: Snowflake, guild_id: Snowflake) -> Self {
        Self {
            name: "@everyone".to_string(),
            is_everyone: true,
            ..Self::new(id, guild_id, String::new(), Permissions::DEFAULT)
        }
    }

    /// Builder-style position setter
    #[must_use]
    pub fn at_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// True if holding this role bypasses every check
    #[inline]
    pub fn grants_administrator(&self) -> bool {
        self.is_admin || self.permissions.contains(Permissions::ADMINISTRATOR)
    }

    /// Compare role positions for hierarchy (higher position = more authority)
    #[inline]
    pub fn is_higher_than(&self, other: &Role) -> bool {
        self.position > other.position
    }

    /// Check if this role can manage another role
    pub fn can_manage(&self, other: &Role) -> bool {
        // @everyone can never be managed through hierarchy
        !other.is_everyone && self.is_higher_than(other)
    }

    /// Get the color as a hex string (without #)
    pub fn color_hex(&self) -> String {
        format!("{:06x}", self.color)
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
        self.updated_at = Utc::now();
    }

    pub fn set_color(&mut self, color: i32) {
        self.color = color;
        self.updated_at = Utc::now();
    }

    /// Update role permissions, keeping `is_admin` in step with the ADMINISTRATOR bit
    pub fn set_permissions(&mut self, permissions: Permissions) {
        self.permissions = permissions;
        self.is_admin = permissions.contains(Permissions::ADMINISTRATOR);
        self.updated_at = Utc::now();
    }

    /// Toggle administrator, keeping the ADMINISTRATOR bit in step
    pub fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
        self.permissions.set(Permissions::ADMINISTRATOR, is_admin);
        self.updated_at = Utc::now();
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
        self.updated_at = Utc::now();
    }

    pub fn set_hoist(&mut self, hoist: bool) {
        self.hoist = hoist;
        self.updated_at = Utc::now();
    }

    pub fn set_mentionable(&mut self, mentionable: bool) {
        self.mentionable = mentionable;
        self.updated_at = Utc::now();
    }

    pub fn set_tag(&mut self, show_tag: bool, tag_style: Option<String>) {
        self.show_tag = show_tag;
        self.tag_style = tag_style;
        self.updated_at = Utc::now();
    }
}
