//! Channel override service
//!
//! Writes per-role and per-member allow/deny pairs on a channel. The actor needs
//! MANAGE_ROLES or MANAGE_CHANNELS in that channel, must outrank the target, and
//! may only allow or deny flags they hold in the channel themselves.

use haven_core::entities::{
    AttemptedAction, AuditAction, AuditTargetType, Channel, ChannelOverride, OverrideTarget,
};
use haven_core::{
    ensure_can_manage_position, ensure_no_escalation, DomainError, Overwrite, PermissionFlag,
    PermissionSnapshot, Snowflake,
};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::{OverrideResponse, SetOverrideRequest};

use super::audit::AuditService;
use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

const OVERRIDE_PERMISSIONS: &[PermissionFlag] = &[PermissionFlag::ManageRoles, PermissionFlag::ManageChannels];

/// Channel override service
pub struct OverrideService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> OverrideService<'a> {
    /// Create a new OverrideService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// All overrides on a channel
    #[instrument(skip(self))]
    pub async fn list_overrides(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Vec<OverrideResponse>> {
        let channel = self.ctx.find_channel(channel_id).await?;
        let snapshot = self
            .require(&channel, user_id, AuditAction::OverrideList.into())
            .await?;

        Ok(snapshot.channel_overrides.iter().map(OverrideResponse::from).collect())
    }

    /// Create or replace the override for a role
    #[instrument(skip(self))]
    pub async fn set_role_override(
        &self,
        channel_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
        request: SetOverrideRequest,
    ) -> ServiceResult<OverrideResponse> {
        self.set_override(channel_id, OverrideTarget::Role(role_id), actor_id, request)
            .await
    }

    /// Create or replace the override for a member
    #[instrument(skip(self))]
    pub async fn set_user_override(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
        actor_id: Snowflake,
        request: SetOverrideRequest,
    ) -> ServiceResult<OverrideResponse> {
        self.set_override(channel_id, OverrideTarget::Member(user_id), actor_id, request)
            .await
    }

    /// Remove an override
    #[instrument(skip(self))]
    pub async fn delete_override(
        &self,
        channel_id: Snowflake,
        target: OverrideTarget,
        actor_id: Snowflake,
    ) -> ServiceResult<()> {
        let (_guard, channel) = self.ctx.lock_channel_guild(channel_id).await?;

        let attempt = AttemptedAction::new(AuditAction::OverrideDelete)
            .on(AuditTargetType::ChannelOverride, target.id());
        let actor = self.require(&channel, actor_id, attempt).await?;
        let previous = actor
            .channel_overrides
            .iter()
            .find(|ov| ov.target == target)
            .map(|ov| ov.overwrite)
            .ok_or(DomainError::OverrideNotFound)?;

        self.ensure_can_target(&actor, &channel, target).await?;

        if !self.ctx.override_repo().delete(channel_id, target).await? {
            return Err(DomainError::OverrideNotFound.into());
        }

        info!(channel_id = %channel_id, target = target.kind(), target_id = %target.id(), "Channel override deleted");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(channel.guild_id, actor_id, AuditAction::OverrideDelete)
                    .with_target(AuditTargetType::ChannelOverride, target.id())
                    .with_channel(channel_id)
                    .with_changes(json!({
                        "type": target.kind(),
                        "allow": { "old": previous.allow, "new": null },
                        "deny": { "old": previous.deny, "new": null },
                    })),
            )
            .await;

        Ok(())
    }

    async fn set_override(
        &self,
        channel_id: Snowflake,
        target: OverrideTarget,
        actor_id: Snowflake,
        request: SetOverrideRequest,
    ) -> ServiceResult<OverrideResponse> {
        let overwrite = Overwrite::new(request.allow, request.deny);
        overwrite.validate()?;

        let (_guard, channel) = self.ctx.lock_channel_guild(channel_id).await?;

        let attempt = AttemptedAction::new(AuditAction::OverrideSet)
            .on(AuditTargetType::ChannelOverride, target.id());
        let actor = self.require(&channel, actor_id, attempt).await?;
        self.ensure_can_target(&actor, &channel, target).await?;
        ensure_no_escalation(actor.channel_permissions(), overwrite.allow | overwrite.deny)?;

        let previous = actor
            .channel_overrides
            .iter()
            .find(|ov| ov.target == target)
            .map(|ov| ov.overwrite)
            .unwrap_or_default();

        let channel_override = ChannelOverride::new(channel_id, channel.guild_id, target, overwrite);
        self.ctx.override_repo().upsert(&channel_override).await?;

        info!(
            channel_id = %channel_id,
            target = target.kind(),
            target_id = %target.id(),
            allow = %overwrite.allow,
            deny = %overwrite.deny,
            "Channel override set"
        );

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(channel.guild_id, actor_id, AuditAction::OverrideSet)
                    .with_target(AuditTargetType::ChannelOverride, target.id())
                    .with_channel(channel_id)
                    .with_changes(json!({
                        "type": target.kind(),
                        "allow": { "old": previous.allow, "new": overwrite.allow },
                        "deny": { "old": previous.deny, "new": overwrite.deny },
                    })),
            )
            .await;

        Ok(OverrideResponse::from(channel_override))
    }

    async fn require(
        &self,
        channel: &Channel,
        user_id: Snowflake,
        attempt: AttemptedAction,
    ) -> ServiceResult<PermissionSnapshot> {
        PermissionService::new(self.ctx)
            .require_any(channel.guild_id, Some(channel.id), user_id, OVERRIDE_PERMISSIONS, attempt)
            .await
    }

    /// The target must exist and sit below the actor
    async fn ensure_can_target(
        &self,
        actor: &PermissionSnapshot,
        channel: &Channel,
        target: OverrideTarget,
    ) -> ServiceResult<()> {
        match target {
            OverrideTarget::Role(role_id) => {
                let role = actor
                    .roles
                    .iter()
                    .find(|r| r.id == role_id)
                    .ok_or(DomainError::RoleNotFound(role_id))?;

                if role.is_everyone {
                    // Lockdown owns the @everyone override until unlock
                    if channel.locked {
                        return Err(DomainError::ChannelAlreadyLocked.into());
                    }
                    return Ok(());
                }
                ensure_can_manage_position(actor.is_owner, actor.highest_position(), role.position)?;
            }
            // The actor already passed the membership check in `require`
            OverrideTarget::Member(user_id) if user_id == actor.user_id => {}
            OverrideTarget::Member(user_id) => {
                PermissionService::new(self.ctx)
                    .ensure_can_manage_member(actor, channel.guild_id, user_id)
                    .await?;
            }
        }
        Ok(())
    }
}
