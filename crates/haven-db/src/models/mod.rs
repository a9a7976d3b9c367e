//! Database models - SQLx-compatible structs for PostgreSQL tables

mod audit_log;
mod channel;
mod guild;
mod member;
mod overrides;
mod role;

pub use audit_log::AuditLogModel;
pub use channel::ChannelModel;
pub use guild::GuildModel;
pub use member::GuildMemberModel;
pub use overrides::ChannelOverrideModel;
pub use role::RoleModel;
