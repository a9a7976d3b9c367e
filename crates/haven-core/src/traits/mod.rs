//! Repository traits (ports)

mod repositories;

pub use repositories::{
    AuditLogRepository, ChannelRepository, GuildRepository, MemberRepository,
    OverrideRepository, PermissionInputs, RepoResult, RoleRepository, SnapshotRepository,
};
