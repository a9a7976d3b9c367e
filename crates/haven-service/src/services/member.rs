//! Member service
//!
//! Handles guild membership and role assignment.

use haven_core::entities::{AttemptedAction, AuditAction, AuditTargetType, GuildMember};
use haven_core::{ensure_can_manage_position, DomainError, PermissionFlag, Snowflake};
use serde_json::json;
use tracing::{info, instrument};

use crate::dto::MemberResponse;

use super::audit::AuditService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Member service
pub struct MemberService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MemberService<'a> {
    /// Create a new MemberService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Add a user to a guild; they hold only the implicit @everyone role
    #[instrument(skip(self))]
    pub async fn join(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<MemberResponse> {
        let _guard = self.ctx.lock_guild(guild_id).await;

        self.ctx
            .guild_repo()
            .find_by_id(guild_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Guild", guild_id.to_string()))?;

        if self.ctx.member_repo().is_member(guild_id, user_id).await? {
            return Err(DomainError::AlreadyMember.into());
        }

        let member = GuildMember::new(guild_id, user_id);
        self.ctx.member_repo().create(&member).await?;

        info!(guild_id = %guild_id, user_id = %user_id, "Member joined guild");

        Ok(MemberResponse::from(&member))
    }

    /// Get a member; the caller must be a member too
    #[instrument(skip(self))]
    pub async fn get_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        requester_id: Snowflake,
    ) -> ServiceResult<MemberResponse> {
        PermissionService::new(self.ctx)
            .load_snapshot(guild_id, requester_id, None)
            .await?;

        let member = self
            .ctx
            .member_repo()
            .find(guild_id, user_id)
            .await?
            .ok_or(DomainError::MemberNotFound)?;

        Ok(MemberResponse::from(&member))
    }

    /// Give a member a role
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
    ) -> ServiceResult<MemberResponse> {
        let _guard = self.ctx.lock_guild(guild_id).await;

        let member = self
            .authorize_role_change(guild_id, user_id, role_id, actor_id, AuditAction::MemberRoleAdd)
            .await?;
        if member.has_role(role_id) {
            return Err(DomainError::AlreadyHasRole.into());
        }

        self.ctx.member_repo().add_role(guild_id, user_id, role_id).await?;

        info!(guild_id = %guild_id, user_id = %user_id, role_id = %role_id, "Role assigned");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::MemberRoleAdd)
                    .with_target(AuditTargetType::Member, user_id)
                    .with_changes(json!({ "role_id": role_id })),
            )
            .await;

        let mut member = member;
        member.add_role(role_id);
        Ok(MemberResponse::from(&member))
    }

    /// Take a role away from a member
    #[instrument(skip(self))]
    pub async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
    ) -> ServiceResult<MemberResponse> {
        let _guard = self.ctx.lock_guild(guild_id).await;

        let mut member = self
            .authorize_role_change(guild_id, user_id, role_id, actor_id, AuditAction::MemberRoleRemove)
            .await?;
        if !member.has_role(role_id) {
            return Err(ServiceError::not_found("Member role", role_id.to_string()));
        }

        self.ctx.member_repo().remove_role(guild_id, user_id, role_id).await?;

        info!(guild_id = %guild_id, user_id = %user_id, role_id = %role_id, "Role removed");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::MemberRoleRemove)
                    .with_target(AuditTargetType::Member, user_id)
                    .with_changes(json!({ "role_id": role_id })),
            )
            .await;

        member.remove_role(role_id);
        Ok(MemberResponse::from(&member))
    }

    /// MANAGE_ROLES, a role below the actor, and (for someone else) a member below the actor
    async fn authorize_role_change(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
        action: AuditAction,
    ) -> ServiceResult<GuildMember> {
        let permissions = PermissionService::new(self.ctx);
        let attempt = AttemptedAction::new(action).on(AuditTargetType::Member, user_id);
        let actor = permissions
            .require(guild_id, None, actor_id, PermissionFlag::ManageRoles, attempt)
            .await?;

        let role = self.ctx.find_role(guild_id, role_id).await?;
        if role.is_everyone {
            return Err(DomainError::CannotModifyEveryoneRole.into());
        }
        ensure_can_manage_position(actor.is_owner, actor.highest_position(), role.position)?;

        if user_id != actor_id {
            permissions.ensure_can_manage_member(&actor, guild_id, user_id).await?;
        }

        self.ctx
            .member_repo()
            .find(guild_id, user_id)
            .await?
            .ok_or_else(|| DomainError::MemberNotFound.into())
    }
}
