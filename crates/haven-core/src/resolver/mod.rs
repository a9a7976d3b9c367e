//! Permission resolver
//!
//! Pure functions from explicitly passed role, membership and override data to
//! an effective bitfield. Nothing here performs I/O or keeps state between calls.

mod compute;
mod hierarchy;
mod snapshot;

pub use compute::{compute_channel_permissions, compute_server_permissions, has_permission, toggle_flag};
pub use hierarchy::{ensure_can_manage_member, ensure_can_manage_position, ensure_no_escalation, highest_position};
pub use snapshot::PermissionSnapshot;
