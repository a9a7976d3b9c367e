//! Domain entities - core business objects

mod audit_log;
mod channel;
mod guild;
mod member;
mod overrides;
mod role;

pub use audit_log::{AttemptedAction, AuditAction, AuditLogEntry, AuditLogQuery, AuditTargetType, AuditVerdict};
pub use channel::{Channel, ChannelType};
pub use guild::Guild;
pub use member::GuildMember;
pub use overrides::{ChannelOverride, OverrideTarget};
pub use role::Role;
