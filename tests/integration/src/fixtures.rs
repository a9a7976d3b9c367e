//! Test fixtures and data generators
//!
//! Provides reusable request bodies for integration tests.

use std::sync::atomic::{AtomicU64, Ordering};

use haven_core::{PermissionFlag, Permissions};
use haven_service::dto::{
    CreateRoleRequest, LockdownRequest, ReorderRolesRequest, RolePosition, SetOverrideRequest,
    ToggleRoleFlagRequest,
};

/// Counter for unique test data
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Get a unique suffix for test data
pub fn unique_suffix() -> u64 {
    COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Role creation request with a unique name
pub fn create_role_request(permissions: Permissions, position: i32) -> CreateRoleRequest {
    CreateRoleRequest {
        name: format!("role-{}", unique_suffix()),
        color: 0,
        hoist: false,
        permissions,
        is_admin: false,
        mentionable: false,
        show_tag: false,
        tag_style: None,
        position: Some(position),
    }
}

/// Reorder request from (role, position) pairs
pub fn reorder_request(positions: &[(haven_core::Snowflake, i32)]) -> ReorderRolesRequest {
    ReorderRolesRequest {
        positions: positions
            .iter()
            .map(|(id, position)| RolePosition {
                id: id.to_string(),
                position: *position,
            })
            .collect(),
    }
}

pub fn allow(permissions: Permissions) -> SetOverrideRequest {
    SetOverrideRequest {
        allow: permissions,
        deny: Permissions::empty(),
    }
}

pub fn deny(permissions: Permissions) -> SetOverrideRequest {
    SetOverrideRequest {
        allow: Permissions::empty(),
        deny: permissions,
    }
}

pub fn toggle(flag: PermissionFlag, enabled: bool) -> ToggleRoleFlagRequest {
    ToggleRoleFlagRequest { flag, enabled }
}

pub fn lockdown(reason: &str) -> LockdownRequest {
    LockdownRequest {
        reason: Some(reason.to_string()),
    }
}
