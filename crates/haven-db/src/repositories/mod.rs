//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in haven-core.
//! Multi-row writes run in one transaction holding the guild's advisory lock.

mod audit_log;
mod channel;
mod error;
mod guild;
mod member;
mod overrides;
mod role;
mod snapshot;

pub use audit_log::PgAuditLogRepository;
pub use channel::PgChannelRepository;
pub use guild::PgGuildRepository;
pub use member::PgMemberRepository;
pub use overrides::PgOverrideRepository;
pub use role::PgRoleRepository;
pub use snapshot::PgSnapshotRepository;
