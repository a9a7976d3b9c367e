//! Business logic services
//!
//! Every service borrows a [`ServiceContext`], loads what a decision needs,
//! resolves permissions through haven-core, and writes back under the guild lock.

pub mod audit;
pub mod channel;
pub mod context;
pub mod error;
pub mod locks;
pub mod member;
pub mod overrides;
pub mod permission;
pub mod role;

// Re-export all services for convenience
pub use audit::AuditService;
pub use channel::{ChannelService, LOCKDOWN_PERMISSIONS};
pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use locks::GuildLocks;
pub use member::MemberService;
pub use overrides::OverrideService;
pub use permission::PermissionService;
pub use role::RoleService;
