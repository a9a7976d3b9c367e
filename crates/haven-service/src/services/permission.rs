//! Permission service
//!
//! Loads a fresh `PermissionSnapshot` for every decision and hands it to the
//! pure resolver in haven-core. Denials are written to the audit log before
//! the error is returned.

use haven_core::entities::AttemptedAction;
use haven_core::traits::PermissionInputs;
use haven_core::{
    ensure_can_manage_member, has_permission, highest_position, DomainError, PermissionFlag,
    PermissionSnapshot, Permissions, Snowflake,
};
use tracing::{debug, instrument, warn};

use crate::dto::EffectivePermissionsResponse;

use super::audit::AuditService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Permission service for access control
pub struct PermissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PermissionService<'a> {
    /// Create a new PermissionService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Load roles, membership and (optionally) one channel's overrides for a user
    ///
    /// Everything comes from a single consistent read of the store. Fails with
    /// `MemberNotFound` for a user who is neither a member nor the owner, and with
    /// `ChannelNotFound` when the channel is not in this guild.
    #[instrument(skip(self))]
    pub async fn load_snapshot(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        channel_id: Option<Snowflake>,
    ) -> ServiceResult<PermissionSnapshot> {
        let inputs = self
            .ctx
            .snapshot_repo()
            .load_permission_inputs(guild_id, user_id, channel_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Guild", guild_id.to_string()))?;

        snapshot_from_inputs(user_id, channel_id, inputs)
    }

    /// Effective permissions of a member across the guild
    #[instrument(skip(self))]
    pub async fn guild_permissions(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Permissions> {
        let snapshot = self.load_snapshot(guild_id, user_id, None).await?;
        let permissions = snapshot.server_permissions();

        debug!(%guild_id, %user_id, %permissions, "Computed guild permissions");
        Ok(permissions)
    }

    /// Effective permissions of a member in one channel
    #[instrument(skip(self))]
    pub async fn channel_permissions(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Permissions> {
        let guild_id = self.ctx.find_channel(channel_id).await?.guild_id;
        let snapshot = self.load_snapshot(guild_id, user_id, Some(channel_id)).await?;
        let permissions = snapshot.channel_permissions();

        debug!(%channel_id, %user_id, %permissions, "Computed channel permissions");
        Ok(permissions)
    }

    /// Effective permissions with flag names, for display
    #[instrument(skip(self))]
    pub async fn effective_permissions(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
    ) -> ServiceResult<EffectivePermissionsResponse> {
        let (snapshot, permissions) = self.resolve(guild_id, channel_id, user_id).await?;
        Ok(EffectivePermissionsResponse::new(guild_id, channel_id, &snapshot, permissions))
    }

    /// Check if a user holds `flag`, in the channel when one is given
    #[instrument(skip(self))]
    pub async fn check(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        flag: PermissionFlag,
    ) -> ServiceResult<bool> {
        let (_, permissions) = self.resolve(guild_id, channel_id, user_id).await?;
        Ok(has_permission(permissions, flag))
    }

    /// Require `flag` for `attempt`; a denial is audited under the attempted action
    /// and returned as `PermissionDenied`
    ///
    /// Returns the snapshot the decision was made on, for follow-up hierarchy checks.
    pub async fn require(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        flag: PermissionFlag,
        attempt: AttemptedAction,
    ) -> ServiceResult<PermissionSnapshot> {
        self.require_any(guild_id, channel_id, user_id, &[flag], attempt).await
    }

    /// Require at least one of `flags`
    ///
    /// The entry for a denial names the first flag; when there are alternatives,
    /// all of them are listed in the entry's reason.
    #[instrument(skip(self))]
    pub async fn require_any(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
        flags: &[PermissionFlag],
        attempt: AttemptedAction,
    ) -> ServiceResult<PermissionSnapshot> {
        let (snapshot, permissions) = self.resolve(guild_id, channel_id, user_id).await?;

        if flags.iter().any(|&flag| has_permission(permissions, flag)) {
            return Ok(snapshot);
        }

        let Some(&checked) = flags.first() else {
            return Ok(snapshot);
        };
        let names = flags.iter().map(|f| f.name()).collect::<Vec<_>>().join(" or ");
        warn!(
            %guild_id,
            ?channel_id,
            %user_id,
            action = %attempt.action,
            permission = %names,
            "Permission denied"
        );

        let reason = (flags.len() > 1).then(|| format!("requires {names}"));
        AuditService::new(self.ctx)
            .record_denied(guild_id, user_id, attempt, checked, channel_id, reason)
            .await;

        Err(ServiceError::permission_denied(names))
    }

    /// Check if a user owns the guild
    #[instrument(skip(self))]
    pub async fn is_guild_owner(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<bool> {
        let guild = self
            .ctx
            .guild_repo()
            .find_by_id(guild_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Guild", guild_id.to_string()))?;

        Ok(guild.is_owner(user_id))
    }

    /// Check whether `actor_id` outranks `target_id`
    #[instrument(skip(self))]
    pub async fn can_manage_member(
        &self,
        guild_id: Snowflake,
        actor_id: Snowflake,
        target_id: Snowflake,
    ) -> ServiceResult<bool> {
        let actor = self.load_snapshot(guild_id, actor_id, None).await?;
        match self.ensure_can_manage_member(&actor, guild_id, target_id).await {
            Ok(()) => Ok(true),
            Err(ServiceError::Domain(e)) if e.is_authorization() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fail unless the actor outranks the target member
    pub async fn ensure_can_manage_member(
        &self,
        actor: &PermissionSnapshot,
        guild_id: Snowflake,
        target_id: Snowflake,
    ) -> ServiceResult<()> {
        let target = self.load_snapshot(guild_id, target_id, None).await?;
        // Rank the target against the roles the actor's decision was made on
        let target_highest = highest_position(&actor.roles, &target.held_role_ids);

        ensure_can_manage_member(actor.is_owner, actor.highest_position(), target.is_owner, target_highest)?;
        Ok(())
    }

    /// Snapshot plus the permissions it resolves to, in the channel when one is given
    async fn resolve(
        &self,
        guild_id: Snowflake,
        channel_id: Option<Snowflake>,
        user_id: Snowflake,
    ) -> ServiceResult<(PermissionSnapshot, Permissions)> {
        let snapshot = self.load_snapshot(guild_id, user_id, channel_id).await?;
        let permissions = match channel_id {
            Some(_) => snapshot.channel_permissions(),
            None => snapshot.server_permissions(),
        };
        Ok((snapshot, permissions))
    }
}

fn snapshot_from_inputs(
    user_id: Snowflake,
    channel_id: Option<Snowflake>,
    inputs: PermissionInputs,
) -> ServiceResult<PermissionSnapshot> {
    let is_owner = inputs.guild.is_owner(user_id);
    let held_role_ids = match inputs.member {
        Some(member) => member.held_role_ids(),
        None if is_owner => Default::default(),
        None => return Err(DomainError::MemberNotFound.into()),
    };

    let snapshot = PermissionSnapshot::new(user_id, inputs.roles, held_role_ids, is_owner);
    match (channel_id, inputs.channel) {
        (None, _) => Ok(snapshot),
        (Some(_), Some(_)) => Ok(snapshot.with_channel_overrides(inputs.channel_overrides)),
        (Some(channel_id), None) => Err(DomainError::ChannelNotFound(channel_id).into()),
    }
}
