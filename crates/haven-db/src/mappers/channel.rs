//! Channel entity <-> model mapper

use haven_core::entities::{Channel, ChannelType};
use haven_core::value_objects::{Overwrite, Permissions, Snowflake};

use crate::models::ChannelModel;

/// Convert ChannelModel to Channel entity
impl From<ChannelModel> for Channel {
    fn from(model: ChannelModel) -> Self {
        let pre_lock_override = match (&model.pre_lock_allow, &model.pre_lock_deny) {
            (None, None) => None,
            (allow, deny) => Some(Overwrite::new(
                allow.as_deref().map(Permissions::from_stored).unwrap_or_default(),
                deny.as_deref().map(Permissions::from_stored).unwrap_or_default(),
            )),
        };

        Channel {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            name: model.name,
            channel_type: ChannelType::from(model.channel_type),
            topic: model.topic,
            position: model.position,
            parent_id: model.parent_id.map(Snowflake::new),
            locked: model.locked,
            pre_lock_override,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Split a saved lockdown override into its (allow, deny) columns
pub fn pre_lock_columns(channel: &Channel) -> (Option<String>, Option<String>) {
    match channel.pre_lock_override {
        Some(ow) => (Some(ow.allow.to_string()), Some(ow.deny.to_string())),
        None => (None, None),
    }
}
