//! Role hierarchy and escalation rules
//!
//! Rules for a non-owner actor:
//! 1. Can only touch roles strictly below their highest role
//! 2. Can only manage members whose highest role is strictly below theirs
//! 3. Cannot grant permissions they don't have

use std::collections::HashSet;

use crate::entities::Role;
use crate::error::DomainError;
use crate::value_objects::{Permissions, Snowflake};

/// Highest position among the held roles; 0 (the @everyone rank) if none
pub fn highest_position(roles: &[Role], held_role_ids: &HashSet<Snowflake>) -> i32 {
    roles
        .iter()
        .filter(|r| !r.is_everyone && held_role_ids.contains(&r.id))
        .map(|r| r.position)
        .max()
        .unwrap_or(0)
}

/// Check that an actor may create, edit, assign or remove a role at `target_position`
pub fn ensure_can_manage_position(
    actor_is_owner: bool,
    actor_highest: i32,
    target_position: i32,
) -> Result<(), DomainError> {
    if actor_is_owner || target_position < actor_highest {
        Ok(())
    } else {
        Err(DomainError::CannotModifyHigherRole)
    }
}

/// Check that `granted` only contains flags the actor already holds
pub fn ensure_no_escalation(actor_permissions: Permissions, granted: Permissions) -> Result<(), DomainError> {
    let escalation = granted - actor_permissions;
    if escalation.is_empty() {
        Ok(())
    } else {
        Err(DomainError::CannotEscalate(escalation.list().join(", ")))
    }
}

/// Check that an actor may act on another member
pub fn ensure_can_manage_member(
    actor_is_owner: bool,
    actor_highest: i32,
    target_is_owner: bool,
    target_highest: i32,
) -> Result<(), DomainError> {
    if target_is_owner {
        return Err(DomainError::CannotManageOwner);
    }
    if actor_is_owner || target_highest < actor_highest {
        Ok(())
    } else {
        Err(DomainError::CannotModifyHigherRole)
    }
}
