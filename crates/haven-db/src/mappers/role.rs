//! Role entity <-> model mapper

use haven_core::entities::Role;
use haven_core::value_objects::{Permissions, Snowflake};

use crate::models::RoleModel;

/// Convert RoleModel to Role entity
///
/// Stored bitfields are read leniently: unknown bits are dropped and a
/// malformed value reads as no permissions.
impl From<RoleModel> for Role {
    fn from(model: RoleModel) -> Self {
        Role {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            name: model.name,
            color: model.color,
            hoist: model.hoist,
            position: model.position,
            permissions: Permissions::from_stored(&model.permissions),
            is_admin: model.is_admin,
            mentionable: model.mentionable,
            show_tag: model.show_tag,
            tag_style: model.tag_style,
            is_everyone: model.is_everyone,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
