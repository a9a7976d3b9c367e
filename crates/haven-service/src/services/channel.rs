//! Channel service
//!
//! Channel lookups and lockdown. Locking rewrites the @everyone override to deny
//! [`LOCKDOWN_PERMISSIONS`] and keeps the override it replaced on the channel;
//! unlocking puts that override back, or removes the row if there was none.

use haven_core::entities::{AttemptedAction, AuditAction, AuditTargetType, Channel, OverrideTarget};
use haven_core::{DomainError, Overwrite, PermissionFlag, PermissionSnapshot, Permissions, Snowflake};
use serde_json::json;
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::{ChannelResponse, LockdownRequest};

use super::audit::AuditService;
use super::context::ServiceContext;
use super::error::ServiceResult;
use super::permission::PermissionService;

/// Flags the @everyone role loses while a channel is locked
pub const LOCKDOWN_PERMISSIONS: Permissions = Permissions::SEND_MESSAGES.union(Permissions::ADD_REACTIONS);

/// Channel service
pub struct ChannelService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChannelService<'a> {
    /// Create a new ChannelService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Get a channel the user can see
    #[instrument(skip(self))]
    pub async fn get_channel(&self, channel_id: Snowflake, user_id: Snowflake) -> ServiceResult<ChannelResponse> {
        let channel = self.ctx.find_channel(channel_id).await?;
        PermissionService::new(self.ctx)
            .require(
                channel.guild_id,
                Some(channel_id),
                user_id,
                PermissionFlag::ViewChannel,
                AttemptedAction::new(AuditAction::ChannelView).on(AuditTargetType::Channel, channel_id),
            )
            .await?;

        Ok(ChannelResponse::from(&channel))
    }

    /// Put a channel into lockdown
    #[instrument(skip(self, request))]
    pub async fn lock_channel(
        &self,
        channel_id: Snowflake,
        actor_id: Snowflake,
        request: LockdownRequest,
    ) -> ServiceResult<ChannelResponse> {
        request.validate()?;
        let (_guard, mut channel) = self.ctx.lock_channel_guild(channel_id).await?;

        let actor = self
            .require_manage_channels(&channel, actor_id, AuditAction::ChannelLock)
            .await?;
        if channel.locked {
            return Err(DomainError::ChannelAlreadyLocked.into());
        }

        let everyone_id = everyone_role_id(&actor, &channel)?;
        let previous = everyone_override(&actor, everyone_id);
        let locked = lockdown_override(previous);

        channel.lock(previous);
        self.ctx
            .channel_repo()
            .set_lockdown(&channel, everyone_id, Some(locked))
            .await?;

        info!(channel_id = %channel_id, guild_id = %channel.guild_id, "Channel locked");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(channel.guild_id, actor_id, AuditAction::ChannelLock)
                    .with_target(AuditTargetType::Channel, channel_id)
                    .with_channel(channel_id)
                    .with_reason(request.reason)
                    .with_changes(json!({
                        "everyone_override": {
                            "old": previous,
                            "new": locked,
                        },
                    })),
            )
            .await;

        Ok(ChannelResponse::from(&channel))
    }

    /// Lift a lockdown, restoring the @everyone override from before it
    #[instrument(skip(self, request))]
    pub async fn unlock_channel(
        &self,
        channel_id: Snowflake,
        actor_id: Snowflake,
        request: LockdownRequest,
    ) -> ServiceResult<ChannelResponse> {
        request.validate()?;
        let (_guard, mut channel) = self.ctx.lock_channel_guild(channel_id).await?;

        let actor = self
            .require_manage_channels(&channel, actor_id, AuditAction::ChannelUnlock)
            .await?;
        if !channel.locked {
            return Err(DomainError::ChannelNotLocked.into());
        }

        let everyone_id = everyone_role_id(&actor, &channel)?;
        let current = everyone_override(&actor, everyone_id);
        let restored = channel.unlock();

        self.ctx
            .channel_repo()
            .set_lockdown(&channel, everyone_id, restored)
            .await?;

        info!(channel_id = %channel_id, guild_id = %channel.guild_id, restored = restored.is_some(), "Channel unlocked");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(channel.guild_id, actor_id, AuditAction::ChannelUnlock)
                    .with_target(AuditTargetType::Channel, channel_id)
                    .with_channel(channel_id)
                    .with_reason(request.reason)
                    .with_changes(json!({
                        "everyone_override": {
                            "old": current,
                            "new": restored,
                        },
                    })),
            )
            .await;

        Ok(ChannelResponse::from(&channel))
    }

    async fn require_manage_channels(
        &self,
        channel: &Channel,
        actor_id: Snowflake,
        action: AuditAction,
    ) -> ServiceResult<PermissionSnapshot> {
        let attempt = AttemptedAction::new(action).on(AuditTargetType::Channel, channel.id);
        PermissionService::new(self.ctx)
            .require(channel.guild_id, Some(channel.id), actor_id, PermissionFlag::ManageChannels, attempt)
            .await
    }
}

fn everyone_role_id(snapshot: &PermissionSnapshot, channel: &Channel) -> ServiceResult<Snowflake> {
    snapshot
        .everyone_role()
        .map(|r| r.id)
        .ok_or_else(|| DomainError::RoleNotFound(channel.guild_id).into())
}

fn everyone_override(snapshot: &PermissionSnapshot, everyone_id: Snowflake) -> Option<Overwrite> {
    snapshot
        .channel_overrides
        .iter()
        .find(|ov| ov.target == OverrideTarget::Role(everyone_id))
        .map(|ov| ov.overwrite)
}

/// The @everyone override in force during lockdown
///
/// Keeps every other allow and deny of the previous override.
fn lockdown_override(previous: Option<Overwrite>) -> Overwrite {
    let previous = previous.unwrap_or_default();
    Overwrite::new(
        previous.allow - LOCKDOWN_PERMISSIONS,
        previous.deny | LOCKDOWN_PERMISSIONS,
    )
}
