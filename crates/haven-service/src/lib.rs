//! # haven-service
//!
//! Application layer: permission checks, role and override management,
//! channel lockdown and the audit log, with request/response DTOs.

pub mod dto;
pub mod services;

pub use services::{
    AuditService, ChannelService, GuildLocks, MemberService, OverrideService, PermissionService,
    RoleService, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
    LOCKDOWN_PERMISSIONS,
};
