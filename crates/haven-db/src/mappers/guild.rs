//! Guild entity <-> model mapper

use haven_core::entities::Guild;
use haven_core::value_objects::Snowflake;

use crate::models::GuildModel;

/// Convert GuildModel to Guild entity
impl From<GuildModel> for Guild {
    fn from(model: GuildModel) -> Self {
        Guild {
            id: Snowflake::new(model.id),
            name: model.name,
            owner_id: Snowflake::new(model.owner_id),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
