//! Value objects - immutable types that represent domain concepts

mod overwrite;
mod permissions;
mod snowflake;

pub use overwrite::Overwrite;
pub use permissions::{PermissionFlag, Permissions, PermissionsParseError};
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
