//! # haven-core
//!
//! Domain layer: permission flags, the permission resolver, entities, repository traits,
//! and domain errors. This crate has zero dependencies on infrastructure (database,
//! web framework, etc.).

pub mod entities;
pub mod error;
pub mod resolver;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AttemptedAction, AuditAction, AuditLogEntry, AuditLogQuery, AuditTargetType, AuditVerdict,
    Channel, ChannelOverride, ChannelType, Guild, GuildMember, OverrideTarget, Role,
};
pub use error::DomainError;
pub use resolver::{
    compute_channel_permissions, compute_server_permissions, ensure_can_manage_member,
    ensure_can_manage_position, ensure_no_escalation, has_permission, highest_position,
    toggle_flag, PermissionSnapshot,
};
pub use traits::{
    AuditLogRepository, ChannelRepository, GuildRepository, MemberRepository,
    OverrideRepository, PermissionInputs, RepoResult, RoleRepository, SnapshotRepository,
};
pub use value_objects::{
    Overwrite, PermissionFlag, Permissions, PermissionsParseError, Snowflake,
    SnowflakeGenerator, SnowflakeParseError,
};
