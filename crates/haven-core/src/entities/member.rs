//! Member entity - represents a user's membership in a guild

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

/// Guild member entity (junction between user and guild)
///
/// `role_ids` holds explicitly assigned roles only; @everyone is implicit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildMember {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub nickname: Option<String>,
    pub role_ids: Vec<Snowflake>,
    pub joined_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GuildMember {
    pub fn new(guild_id: Snowflake, user_id: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            user_id,
            nickname: None,
            role_ids: Vec::new(),
            joined_at: now,
            updated_at: now,
        }
    }

    /// Builder-style role assignment
    #[must_use]
    pub fn with_roles(mut self, role_ids: impl IntoIterator<Item = Snowflake>) -> Self {
        for role_id in role_ids {
            self.add_role(role_id);
        }
        self
    }

    #[inline]
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Add a role to the member; returns false if already held
    pub fn add_role(&mut self, role_id: Snowflake) -> bool {
        if self.has_role(role_id) {
            return false;
        }
        self.role_ids.push(role_id);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a role from the member; returns false if not held
    pub fn remove_role(&mut self, role_id: Snowflake) -> bool {
        match self.role_ids.iter().position(|&id| id == role_id) {
            Some(pos) => {
                self.role_ids.remove(pos);
                self.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Held role ids as a set, without the implicit @everyone role
    pub fn held_role_ids(&self) -> HashSet<Snowflake> {
        self.role_ids.iter().copied().collect()
    }

    pub fn set_nickname(&mut self, nickname: Option<String>) {
        self.nickname = nickname;
        self.updated_at = Utc::now();
    }

    /// Get display name (nickname if set, otherwise fallback)
    pub fn display_name<'a>(&'a self, username: &'a str) -> &'a str {
        self.nickname.as_deref().unwrap_or(username)
    }
}
