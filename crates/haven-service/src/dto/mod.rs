//! Data transfer objects for service inputs and outputs
//!
//! This module provides:
//! - Request DTOs with validation
//! - Response DTOs for serializing outputs
//! - Mappers for converting domain entities to DTOs

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    AuditLogQueryParams, CreateRoleRequest, LockdownRequest, ReorderRolesRequest, RolePosition,
    SetOverrideRequest, ToggleRoleFlagRequest, UpdateRoleRequest,
};

pub use responses::{
    AuditLogEntryResponse, ChannelResponse, EffectivePermissionsResponse, MemberResponse,
    OverrideResponse, PaginatedResponse, PaginationMeta, RoleResponse,
};
