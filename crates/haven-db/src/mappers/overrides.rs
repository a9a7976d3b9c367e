//! ChannelOverride entity <-> model mapper

use haven_core::entities::{ChannelOverride, OverrideTarget};
use haven_core::error::DomainError;
use haven_core::value_objects::{Overwrite, Permissions, Snowflake};

use crate::models::ChannelOverrideModel;

impl TryFrom<ChannelOverrideModel> for ChannelOverride {
    type Error = DomainError;

    fn try_from(model: ChannelOverrideModel) -> Result<Self, Self::Error> {
        let target = OverrideTarget::from_parts(&model.target_type, Snowflake::new(model.target_id))
            .ok_or_else(|| {
                DomainError::DatabaseError(format!("unknown override target type: {}", model.target_type))
            })?;

        Ok(ChannelOverride {
            channel_id: Snowflake::new(model.channel_id),
            guild_id: Snowflake::new(model.guild_id),
            target,
            overwrite: Overwrite::new(
                Permissions::from_stored(&model.allow_permissions),
                Permissions::from_stored(&model.deny_permissions),
            ),
            updated_at: model.updated_at,
        })
    }
}
