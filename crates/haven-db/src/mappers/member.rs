//! GuildMember entity <-> model mapper

use haven_core::entities::GuildMember;
use haven_core::value_objects::Snowflake;

use crate::models::GuildMemberModel;

impl From<GuildMemberModel> for GuildMember {
    fn from(model: GuildMemberModel) -> Self {
        GuildMember {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            nickname: model.nickname,
            role_ids: model.role_ids.into_iter().map(Snowflake::new).collect(),
            joined_at: model.joined_at,
            updated_at: model.updated_at,
        }
    }
}
