//! AuditLogEntry entity <-> model mapper

use haven_core::entities::{AuditAction, AuditLogEntry, AuditTargetType, AuditVerdict};
use haven_core::error::DomainError;
use haven_core::value_objects::{PermissionFlag, Snowflake};

use crate::models::AuditLogModel;

impl TryFrom<AuditLogModel> for AuditLogEntry {
    type Error = DomainError;

    fn try_from(model: AuditLogModel) -> Result<Self, Self::Error> {
        let action: AuditAction = model
            .action
            .parse()
            .map_err(|e: DomainError| DomainError::DatabaseError(e.to_string()))?;
        let target_type = model
            .target_type
            .as_deref()
            .map(str::parse::<AuditTargetType>)
            .transpose()
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        Ok(AuditLogEntry {
            id: Snowflake::new(model.id),
            guild_id: Snowflake::new(model.guild_id),
            actor_id: Snowflake::new(model.actor_id),
            action,
            target_type,
            target_id: model.target_id.map(Snowflake::new),
            channel_id: model.channel_id.map(Snowflake::new),
            // Flags renamed since the entry was written read as absent
            permission: model.permission.as_deref().and_then(|p| p.parse::<PermissionFlag>().ok()),
            verdict: AuditVerdict::from_stored(&model.verdict),
            changes: model.changes,
            reason: model.reason,
            created_at: model.created_at,
        })
    }
}
