//! Loaded inputs for one permission decision

use std::collections::{HashMap, HashSet};

use crate::entities::{ChannelOverride, OverrideTarget, Role};
use crate::value_objects::{Overwrite, Permissions, Snowflake};

use super::compute::{compute_channel_permissions, compute_server_permissions};
use super::hierarchy::highest_position;

/// Roles, membership and channel overrides for one (guild, member, channel) check.
///
/// Built fresh for every decision and dropped afterwards; effective permissions
/// are never cached.
#[derive(Debug, Clone)]
pub struct PermissionSnapshot {
    pub user_id: Snowflake,
    pub roles: Vec<Role>,
    pub held_role_ids: HashSet<Snowflake>,
    pub is_owner: bool,
    pub channel_overrides: Vec<ChannelOverride>,
}

impl PermissionSnapshot {
    pub fn new(
        user_id: Snowflake,
        roles: Vec<Role>,
        held_role_ids: HashSet<Snowflake>,
        is_owner: bool,
    ) -> Self {
        Self {
            user_id,
            roles,
            held_role_ids,
            is_owner,
            channel_overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_channel_overrides(mut self, overrides: Vec<ChannelOverride>) -> Self {
        self.channel_overrides = overrides;
        self
    }

    pub fn everyone_role(&self) -> Option<&Role> {
        self.roles.iter().find(|r| r.is_everyone)
    }

    /// Explicitly held roles that exist in the guild
    pub fn held_roles(&self) -> Vec<Role> {
        self.roles
            .iter()
            .filter(|r| !r.is_everyone && self.held_role_ids.contains(&r.id))
            .cloned()
            .collect()
    }

    pub fn highest_position(&self) -> i32 {
        highest_position(&self.roles, &self.held_role_ids)
    }

    pub fn server_permissions(&self) -> Permissions {
        compute_server_permissions(&self.roles, &self.held_role_ids, self.is_owner)
    }

    /// Channel permissions using the loaded overrides
    pub fn channel_permissions(&self) -> Permissions {
        let everyone_id = self.everyone_role().map(|r| r.id);

        let mut everyone_override: Option<Overwrite> = None;
        let mut user_override: Option<Overwrite> = None;
        let mut role_overrides: HashMap<Snowflake, Overwrite> = HashMap::new();

        for ov in &self.channel_overrides {
            match ov.target {
                OverrideTarget::Role(id) if Some(id) == everyone_id => everyone_override = Some(ov.overwrite),
                OverrideTarget::Role(id) => {
                    role_overrides.insert(id, ov.overwrite);
                }
                OverrideTarget::Member(id) if id == self.user_id => user_override = Some(ov.overwrite),
                OverrideTarget::Member(_) => {}
            }
        }

        compute_channel_permissions(
            self.server_permissions(),
            &self.held_roles(),
            &role_overrides,
            everyone_override,
            user_override,
        )
    }
}
