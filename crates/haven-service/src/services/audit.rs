//! Audit service
//!
//! Appends audit log entries and serves the filtered, paginated log.

use haven_core::entities::{AttemptedAction, AuditAction, AuditLogEntry, AuditLogQuery, AuditTargetType};
use haven_core::{PermissionFlag, Snowflake};
use tracing::{error, instrument};
use validator::Validate;

use crate::dto::{AuditLogEntryResponse, AuditLogQueryParams, PaginatedResponse};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Audit log service
pub struct AuditService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuditService<'a> {
    /// Create a new AuditService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Start an entry for a successful action, with a fresh id
    pub fn entry(&self, guild_id: Snowflake, actor_id: Snowflake, action: AuditAction) -> AuditLogEntry {
        AuditLogEntry::new(self.ctx.generate_id(), guild_id, actor_id, action)
    }

    /// Append an entry
    #[instrument(skip(self, entry), fields(guild_id = %entry.guild_id, action = %entry.action))]
    pub async fn record(&self, entry: &AuditLogEntry) -> ServiceResult<()> {
        self.ctx.audit_repo().append(entry).await?;
        Ok(())
    }

    /// Append an entry after a mutation has already been applied
    ///
    /// The mutation stands even if the log write fails; the failure is logged.
    pub async fn record_after(&self, entry: AuditLogEntry) {
        if let Err(e) = self.record(&entry).await {
            error!(
                error = %e,
                guild_id = %entry.guild_id,
                action = %entry.action,
                "Failed to write audit log entry"
            );
        }
    }

    /// Record a denied permission check under the action that was attempted
    #[instrument(skip(self))]
    pub async fn record_denied(
        &self,
        guild_id: Snowflake,
        actor_id: Snowflake,
        attempt: AttemptedAction,
        permission: PermissionFlag,
        channel_id: Option<Snowflake>,
        reason: Option<String>,
    ) {
        let entry = AuditLogEntry::denied(
            self.ctx.generate_id(),
            guild_id,
            actor_id,
            attempt,
            permission,
            channel_id,
        )
        .with_reason(reason);
        self.record_after(entry).await;
    }

    /// List audit log entries, newest first; requires VIEW_AUDIT_LOG
    #[instrument(skip(self, params))]
    pub async fn list(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        params: AuditLogQueryParams,
    ) -> ServiceResult<PaginatedResponse<AuditLogEntryResponse>> {
        params.validate()?;

        PermissionService::new(self.ctx)
            .require(
                guild_id,
                None,
                user_id,
                PermissionFlag::ViewAuditLog,
                AuditAction::AuditLogView.into(),
            )
            .await?;

        let limit = self.ctx.audit_config().page_size(params.limit);
        let mut query = AuditLogQuery::new(guild_id, limit.saturating_add(1));
        query.actor_id = parse_id(params.actor_id.as_deref(), "actor_id")?;
        query.before_id = parse_id(params.before_id.as_deref(), "before_id")?;
        query.action = params
            .action
            .as_deref()
            .map(str::parse::<AuditAction>)
            .transpose()?;
        query.target_type = params
            .target_type
            .as_deref()
            .map(str::parse::<AuditTargetType>)
            .transpose()?;
        query.after = params.after;
        query.before = params.before;

        let mut entries = self.ctx.audit_repo().query(&query).await?;

        // One extra row was fetched to learn whether another page exists
        let has_more = entries.len() > limit as usize;
        entries.truncate(limit as usize);
        let cursor = if has_more {
            entries.last().map(|e| e.id.to_string())
        } else {
            None
        };

        let data = entries.into_iter().map(AuditLogEntryResponse::from).collect();
        Ok(PaginatedResponse::new(data, cursor, has_more, limit))
    }
}

fn parse_id(raw: Option<&str>, field: &str) -> ServiceResult<Option<Snowflake>> {
    raw.map(|s| {
        Snowflake::parse(s).map_err(|_| ServiceError::validation(format!("Invalid {field} format")))
    })
    .transpose()
}
