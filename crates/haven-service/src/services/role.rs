//! Role service
//!
//! Handles role creation, editing, deletion and reordering under the hierarchy rules:
//! a non-owner actor needs MANAGE_ROLES, may only touch roles strictly below their
//! highest role, and may not grant flags they do not hold.

use std::collections::{HashMap, HashSet};

use haven_core::entities::{AttemptedAction, AuditAction, AuditTargetType, Role};
use haven_core::{
    ensure_can_manage_position, ensure_no_escalation, toggle_flag, DomainError, PermissionFlag,
    PermissionSnapshot, Permissions, Snowflake,
};
use serde_json::{json, Map, Value};
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::{
    CreateRoleRequest, ReorderRolesRequest, RoleResponse, ToggleRoleFlagRequest, UpdateRoleRequest,
};

use super::audit::AuditService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Position given to new roles when the request names none: just above @everyone
const DEFAULT_ROLE_POSITION: i32 = 1;

/// Role service
pub struct RoleService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RoleService<'a> {
    /// Create a new RoleService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a new role
    #[instrument(skip(self, request))]
    pub async fn create_role(
        &self,
        guild_id: Snowflake,
        actor_id: Snowflake,
        request: CreateRoleRequest,
    ) -> ServiceResult<RoleResponse> {
        request.validate()?;
        let _guard = self.ctx.lock_guild(guild_id).await;

        let actor = self
            .require_manage_roles(guild_id, actor_id, AuditAction::RoleCreate.into())
            .await?;

        let mut permissions = request.permissions;
        if request.is_admin {
            permissions |= Permissions::ADMINISTRATOR;
        }
        ensure_no_escalation(actor.server_permissions(), permissions)?;

        let position = request.position.unwrap_or(DEFAULT_ROLE_POSITION);
        ensure_can_manage_position(actor.is_owner, actor.highest_position(), position)?;

        let mut role = Role::new(self.ctx.generate_id(), guild_id, request.name, permissions)
            .at_position(position);
        role.color = request.color;
        role.hoist = request.hoist;
        role.mentionable = request.mentionable;
        role.show_tag = request.show_tag;
        role.tag_style = request.tag_style;

        self.ctx.role_repo().create(&role).await?;

        info!(role_id = %role.id, guild_id = %guild_id, position, "Role created");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::RoleCreate)
                    .with_target(AuditTargetType::Role, role.id)
                    .with_changes(json!({
                        "name": role.name,
                        "permissions": role.permissions,
                        "position": role.position,
                    })),
            )
            .await;

        Ok(RoleResponse::from(&role))
    }

    /// Get role by ID
    #[instrument(skip(self))]
    pub async fn get_role(&self, guild_id: Snowflake, role_id: Snowflake) -> ServiceResult<RoleResponse> {
        let role = self.ctx.find_role(guild_id, role_id).await?;
        Ok(RoleResponse::from(&role))
    }

    /// Update role
    #[instrument(skip(self, request))]
    pub async fn update_role(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
        request: UpdateRoleRequest,
    ) -> ServiceResult<RoleResponse> {
        request.validate()?;
        let _guard = self.ctx.lock_guild(guild_id).await;

        let attempt = AttemptedAction::new(AuditAction::RoleUpdate).on(AuditTargetType::Role, role_id);
        let actor = self.require_manage_roles(guild_id, actor_id, attempt).await?;
        let mut role = self.ctx.find_role(guild_id, role_id).await?;
        ensure_can_manage_position(actor.is_owner, actor.highest_position(), role.position)?;

        // @everyone keeps its name; only its permissions and display attributes are editable
        if role.is_everyone && request.name.is_some() {
            return Err(DomainError::CannotModifyEveryoneRole.into());
        }

        let before = role.clone();

        if let Some(name) = request.name {
            role.set_name(name);
        }
        if let Some(color) = request.color {
            role.set_color(color);
        }
        if let Some(hoist) = request.hoist {
            role.set_hoist(hoist);
        }
        if let Some(mentionable) = request.mentionable {
            role.set_mentionable(mentionable);
        }
        if request.show_tag.is_some() || request.tag_style.is_some() {
            let show_tag = request.show_tag.unwrap_or(role.show_tag);
            let tag_style = request.tag_style.or_else(|| role.tag_style.clone());
            role.set_tag(show_tag, tag_style);
        }
        if let Some(permissions) = request.permissions {
            role.set_permissions(permissions);
        }
        if let Some(is_admin) = request.is_admin {
            role.set_admin(is_admin);
        }

        // Only newly granted bits count; a lower role may already hold flags the actor lacks
        ensure_no_escalation(actor.server_permissions(), role.permissions - before.permissions)?;

        let changes = role_changes(&before, &role);
        if changes.is_empty() {
            return Ok(RoleResponse::from(&role));
        }

        self.ctx.role_repo().update(&role).await?;

        info!(role_id = %role_id, fields = changes.len(), "Role updated");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::RoleUpdate)
                    .with_target(AuditTargetType::Role, role.id)
                    .with_changes(Value::Object(changes)),
            )
            .await;

        Ok(RoleResponse::from(&role))
    }

    /// Flip one permission flag on a role
    #[instrument(skip(self))]
    pub async fn toggle_role_flag(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
        request: ToggleRoleFlagRequest,
    ) -> ServiceResult<RoleResponse> {
        let _guard = self.ctx.lock_guild(guild_id).await;

        let attempt = AttemptedAction::new(AuditAction::RoleUpdate).on(AuditTargetType::Role, role_id);
        let actor = self.require_manage_roles(guild_id, actor_id, attempt).await?;
        let mut role = self.ctx.find_role(guild_id, role_id).await?;
        ensure_can_manage_position(actor.is_owner, actor.highest_position(), role.position)?;

        if request.enabled {
            ensure_no_escalation(actor.server_permissions(), request.flag.bit())?;
        }

        let before = role.permissions;
        let after = toggle_flag(before, request.flag, request.enabled);
        if after == before {
            return Ok(RoleResponse::from(&role));
        }

        role.set_permissions(after);
        self.ctx.role_repo().update(&role).await?;

        info!(role_id = %role_id, flag = request.flag.name(), enabled = request.enabled, "Role flag toggled");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::RoleUpdate)
                    .with_target(AuditTargetType::Role, role.id)
                    .with_changes(json!({
                        "flag": request.flag.name(),
                        "enabled": request.enabled,
                        "permissions": { "old": before, "new": after },
                    })),
            )
            .await;

        Ok(RoleResponse::from(&role))
    }

    /// Delete role, along with its channel overrides and member assignments
    #[instrument(skip(self))]
    pub async fn delete_role(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        actor_id: Snowflake,
    ) -> ServiceResult<()> {
        let _guard = self.ctx.lock_guild(guild_id).await;

        let attempt = AttemptedAction::new(AuditAction::RoleDelete).on(AuditTargetType::Role, role_id);
        let actor = self.require_manage_roles(guild_id, actor_id, attempt).await?;
        let role = self.ctx.find_role(guild_id, role_id).await?;

        if role.is_everyone {
            return Err(DomainError::CannotDeleteEveryoneRole.into());
        }
        ensure_can_manage_position(actor.is_owner, actor.highest_position(), role.position)?;

        self.ctx.role_repo().delete(role_id).await?;

        info!(role_id = %role_id, guild_id = %guild_id, "Role deleted");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::RoleDelete)
                    .with_target(AuditTargetType::Role, role_id)
                    .with_changes(json!({
                        "name": role.name,
                        "permissions": role.permissions,
                        "position": role.position,
                    })),
            )
            .await;

        Ok(())
    }

    /// Get all roles in a guild, lowest position first
    #[instrument(skip(self))]
    pub async fn list_roles(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Vec<RoleResponse>> {
        // Members only; the snapshot load rejects outsiders
        let snapshot = PermissionService::new(self.ctx)
            .load_snapshot(guild_id, user_id, None)
            .await?;

        Ok(snapshot.roles.iter().map(RoleResponse::from).collect())
    }

    /// Update role positions in bulk
    #[instrument(skip(self, request))]
    pub async fn reorder_roles(
        &self,
        guild_id: Snowflake,
        actor_id: Snowflake,
        request: ReorderRolesRequest,
    ) -> ServiceResult<Vec<RoleResponse>> {
        request.validate()?;
        let _guard = self.ctx.lock_guild(guild_id).await;

        let actor = self
            .require_manage_roles(guild_id, actor_id, AuditAction::RoleReorder.into())
            .await?;
        let roles: HashMap<Snowflake, &Role> = actor.roles.iter().map(|r| (r.id, r)).collect();
        let actor_highest = actor.highest_position();

        let mut seen = HashSet::with_capacity(request.positions.len());
        let mut updates: Vec<(Snowflake, i32)> = Vec::with_capacity(request.positions.len());
        let mut moves = Vec::with_capacity(request.positions.len());

        for pos in &request.positions {
            let role_id = Snowflake::parse(&pos.id)
                .map_err(|_| ServiceError::validation("Invalid role ID format"))?;
            if !seen.insert(role_id) {
                return Err(ServiceError::validation(format!("Role {role_id} listed twice")));
            }

            let role = roles
                .get(&role_id)
                .ok_or(DomainError::RoleNotFound(role_id))?;
            if role.is_everyone {
                return Err(DomainError::CannotModifyEveryoneRole.into());
            }

            // Both where the role is and where it goes must be below the actor
            ensure_can_manage_position(actor.is_owner, actor_highest, role.position)?;
            ensure_can_manage_position(actor.is_owner, actor_highest, pos.position)?;

            updates.push((role_id, pos.position));
            moves.push(json!({ "id": role_id, "old": role.position, "new": pos.position }));
        }

        self.ctx
            .role_repo()
            .update_positions(guild_id, &updates)
            .await?;

        info!(guild_id = %guild_id, count = updates.len(), "Role positions updated");

        let audit = AuditService::new(self.ctx);
        audit
            .record_after(
                audit
                    .entry(guild_id, actor_id, AuditAction::RoleReorder)
                    .with_changes(json!({ "positions": moves })),
            )
            .await;

        let roles = self.ctx.role_repo().find_by_guild(guild_id).await?;
        Ok(roles.iter().map(RoleResponse::from).collect())
    }

    async fn require_manage_roles(
        &self,
        guild_id: Snowflake,
        actor_id: Snowflake,
        attempt: AttemptedAction,
    ) -> ServiceResult<PermissionSnapshot> {
        PermissionService::new(self.ctx)
            .require(guild_id, None, actor_id, PermissionFlag::ManageRoles, attempt)
            .await
    }
}

/// Changed fields as `{field: {old, new}}`
fn role_changes(before: &Role, after: &Role) -> Map<String, Value> {
    let mut changes = Map::new();
    let mut diff = |field: &str, old: Value, new: Value| {
        if old != new {
            changes.insert(field.to_string(), json!({ "old": old, "new": new }));
        }
    };

    diff("name", json!(before.name), json!(after.name));
    diff("color", json!(before.color), json!(after.color));
    diff("hoist", json!(before.hoist), json!(after.hoist));
    diff("mentionable", json!(before.mentionable), json!(after.mentionable));
    diff("show_tag", json!(before.show_tag), json!(after.show_tag));
    diff("tag_style", json!(before.tag_style), json!(after.tag_style));
    diff("permissions", json!(before.permissions), json!(after.permissions));
    diff("is_admin", json!(before.is_admin), json!(after.is_admin));

    changes
}
