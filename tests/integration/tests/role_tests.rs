//! Role management and assignment under the hierarchy rules
//!
//! Run with: cargo test -p integration-tests --test role_tests

use haven_core::entities::OverrideTarget;
use haven_core::{Guild, Overwrite, PermissionFlag, Permissions, Role, Snowflake};
use haven_service::dto::UpdateRoleRequest;
use haven_service::{MemberService, PermissionService, RoleService};
use integration_tests::{
    assert_error_code, assert_forbidden, create_role_request, reorder_request, toggle, TestHarness,
};

const MOD_PERMISSIONS: Permissions = Permissions::MANAGE_ROLES.union(Permissions::KICK_MEMBERS);

/// Guild with a moderator (MANAGE_ROLES|KICK_MEMBERS at position 10) and a plain member
struct Setup {
    h: TestHarness,
    guild: Guild,
    owner: Snowflake,
    moderator: Snowflake,
    member: Snowflake,
    mod_role: Role,
}

async fn setup() -> anyhow::Result<Setup> {
    let h = TestHarness::new();
    let owner = h.id();
    let moderator = h.id();
    let member = h.id();

    let guild = h.seed_guild(owner, Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES).await?;
    let mod_role = h.seed_role(guild.id, "Moderator", MOD_PERMISSIONS, 10).await?;
    h.seed_member(guild.id, moderator, &[mod_role.id]).await?;
    h.seed_member(guild.id, member, &[]).await?;

    Ok(Setup {
        h,
        guild,
        owner,
        moderator,
        member,
        mod_role,
    })
}

#[tokio::test]
async fn test_moderator_creates_role_below_itself() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);

    let created = roles
        .create_role(s.guild.id, s.moderator, create_role_request(Permissions::KICK_MEMBERS, 5))
        .await?;
    assert_eq!(created.position, 5);
    assert_eq!(created.permissions, Permissions::KICK_MEMBERS);
    assert!(!created.is_admin);

    let same_rank = roles
        .create_role(s.guild.id, s.moderator, create_role_request(Permissions::empty(), 10))
        .await;
    assert_error_code(same_rank, "CANNOT_MODIFY_HIGHER_ROLE");
    Ok(())
}

#[tokio::test]
async fn test_cannot_grant_unheld_flags() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);

    let result = roles
        .create_role(s.guild.id, s.moderator, create_role_request(Permissions::BAN_MEMBERS, 2))
        .await;
    assert_error_code(result, "CANNOT_ESCALATE");

    let mut admin = create_role_request(Permissions::empty(), 2);
    admin.is_admin = true;
    assert_error_code(roles.create_role(s.guild.id, s.moderator, admin.clone()).await, "CANNOT_ESCALATE");

    // The owner holds everything
    let created = roles.create_role(s.guild.id, s.owner, admin).await?;
    assert!(created.is_admin);
    assert!(created.permissions.contains(Permissions::ADMINISTRATOR));
    Ok(())
}

#[tokio::test]
async fn test_new_role_defaults_above_everyone() -> anyhow::Result<()> {
    let s = setup().await?;
    let mut request = create_role_request(Permissions::empty(), 1);
    request.position = None;

    let created = RoleService::new(&s.h.ctx).create_role(s.guild.id, s.owner, request).await?;
    assert_eq!(created.position, 1);
    Ok(())
}

#[tokio::test]
async fn test_member_without_manage_roles_is_denied() -> anyhow::Result<()> {
    let s = setup().await?;
    let result = RoleService::new(&s.h.ctx)
        .create_role(s.guild.id, s.member, create_role_request(Permissions::empty(), 1))
        .await;
    assert_forbidden(result);
    Ok(())
}

#[tokio::test]
async fn test_update_role_respects_hierarchy() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);
    let senior = s.h.seed_role(s.guild.id, "Senior", Permissions::empty(), 12).await?;
    let junior = s.h.seed_role(s.guild.id, "Junior", Permissions::empty(), 4).await?;

    let rename = UpdateRoleRequest {
        name: Some("Renamed".to_string()),
        ..Default::default()
    };
    assert_forbidden(roles.update_role(s.guild.id, senior.id, s.moderator, rename.clone()).await);
    assert_forbidden(roles.update_role(s.guild.id, s.mod_role.id, s.moderator, rename.clone()).await);

    let updated = roles.update_role(s.guild.id, junior.id, s.moderator, rename).await?;
    assert_eq!(updated.name, "Renamed");

    let grant = UpdateRoleRequest {
        permissions: Some(Permissions::KICK_MEMBERS | Permissions::MANAGE_GUILD),
        ..Default::default()
    };
    assert_error_code(
        roles.update_role(s.guild.id, junior.id, s.moderator, grant).await,
        "CANNOT_ESCALATE",
    );
    Ok(())
}

#[tokio::test]
async fn test_everyone_role_keeps_its_name() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);

    let rename = UpdateRoleRequest {
        name: Some("everybody".to_string()),
        ..Default::default()
    };
    assert_error_code(
        roles.update_role(s.guild.id, s.guild.id, s.owner, rename).await,
        "CANNOT_MODIFY_EVERYONE_ROLE",
    );

    let perms = UpdateRoleRequest {
        permissions: Some(Permissions::VIEW_CHANNEL),
        ..Default::default()
    };
    let updated = roles.update_role(s.guild.id, s.guild.id, s.owner, perms).await?;
    assert!(updated.is_everyone);
    assert_eq!(updated.permissions, Permissions::VIEW_CHANNEL);

    let member_perms = PermissionService::new(&s.h.ctx).guild_permissions(s.guild.id, s.member).await?;
    assert_eq!(member_perms, Permissions::VIEW_CHANNEL);
    Ok(())
}

#[tokio::test]
async fn test_toggle_role_flag() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);
    let helper = s.h.seed_role(s.guild.id, "Helper", Permissions::empty(), 3).await?;

    let on = roles
        .toggle_role_flag(s.guild.id, helper.id, s.owner, toggle(PermissionFlag::ViewAuditLog, true))
        .await?;
    assert_eq!(on.permissions, Permissions::VIEW_AUDIT_LOG);

    let off = roles
        .toggle_role_flag(s.guild.id, helper.id, s.owner, toggle(PermissionFlag::ViewAuditLog, false))
        .await?;
    assert!(off.permissions.is_empty());

    // The moderator does not hold VIEW_AUDIT_LOG, but may clear flags
    let result = roles
        .toggle_role_flag(s.guild.id, helper.id, s.moderator, toggle(PermissionFlag::ViewAuditLog, true))
        .await;
    assert_error_code(result, "CANNOT_ESCALATE");
    roles
        .toggle_role_flag(s.guild.id, helper.id, s.moderator, toggle(PermissionFlag::KickMembers, true))
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_delete_role_cascades() -> anyhow::Result<()> {
    let s = setup().await?;
    let channel = s.h.seed_channel(s.guild.id).await?;
    let muted = s.h.seed_role(s.guild.id, "Muted", Permissions::empty(), 2).await?;
    s.h.ctx.member_repo().add_role(s.guild.id, s.member, muted.id).await?;
    s.h.seed_override(&channel, OverrideTarget::Role(muted.id), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;

    let perms = PermissionService::new(&s.h.ctx);
    assert!(!perms.channel_permissions(channel.id, s.member).await?.contains(Permissions::SEND_MESSAGES));

    RoleService::new(&s.h.ctx).delete_role(s.guild.id, muted.id, s.moderator).await?;

    assert!(s.h.stored_override(channel.id, OverrideTarget::Role(muted.id)).await?.is_none());
    let member = s.h.ctx.member_repo().find(s.guild.id, s.member).await?;
    assert!(member.is_some_and(|m| m.role_ids.is_empty()));
    assert!(perms.channel_permissions(channel.id, s.member).await?.contains(Permissions::SEND_MESSAGES));
    Ok(())
}

#[tokio::test]
async fn test_everyone_role_cannot_be_deleted() -> anyhow::Result<()> {
    let s = setup().await?;
    let result = RoleService::new(&s.h.ctx).delete_role(s.guild.id, s.guild.id, s.owner).await;
    assert_error_code(result, "CANNOT_DELETE_EVERYONE_ROLE");
    Ok(())
}

#[tokio::test]
async fn test_reorder_roles() -> anyhow::Result<()> {
    let s = setup().await?;
    let roles = RoleService::new(&s.h.ctx);
    let a = s.h.seed_role(s.guild.id, "A", Permissions::empty(), 2).await?;
    let b = s.h.seed_role(s.guild.id, "B", Permissions::empty(), 6).await?;

    let listed = roles
        .reorder_roles(s.guild.id, s.moderator, reorder_request(&[(a.id, 7), (b.id, 3)]))
        .await?;
    let order: Vec<String> = listed.iter().map(|r| r.name.clone()).collect();
    assert_eq!(order, vec!["@everyone", "B", "A", "Moderator"]);

    // Cannot lift a role to or above the actor's own rank
    let result = roles
        .reorder_roles(s.guild.id, s.moderator, reorder_request(&[(a.id, 10)]))
        .await;
    assert_error_code(result, "CANNOT_MODIFY_HIGHER_ROLE");

    let result = roles
        .reorder_roles(s.guild.id, s.owner, reorder_request(&[(s.guild.id, 4)]))
        .await;
    assert_error_code(result, "CANNOT_MODIFY_EVERYONE_ROLE");

    let listed = roles.list_roles(s.guild.id, s.member).await?;
    assert_eq!(listed.len(), 4);
    assert!(listed[0].is_everyone);
    Ok(())
}

#[tokio::test]
async fn test_assign_and_remove_role() -> anyhow::Result<()> {
    let s = setup().await?;
    let members = MemberService::new(&s.h.ctx);
    let helper = s.h.seed_role(s.guild.id, "Helper", Permissions::empty(), 3).await?;
    let senior = s.h.seed_role(s.guild.id, "Senior", Permissions::empty(), 11).await?;

    let assigned = members.assign_role(s.guild.id, s.member, helper.id, s.moderator).await?;
    assert_eq!(assigned.roles, vec![helper.id.to_string()]);

    assert_error_code(
        members.assign_role(s.guild.id, s.member, helper.id, s.moderator).await,
        "ALREADY_HAS_ROLE",
    );
    assert_forbidden(members.assign_role(s.guild.id, s.member, senior.id, s.moderator).await);
    assert_error_code(
        members.assign_role(s.guild.id, s.member, s.guild.id, s.moderator).await,
        "CANNOT_MODIFY_EVERYONE_ROLE",
    );

    let removed = members.remove_role(s.guild.id, s.member, helper.id, s.moderator).await?;
    assert!(removed.roles.is_empty());
    assert_error_code(
        members.remove_role(s.guild.id, s.member, helper.id, s.moderator).await,
        "NOT_FOUND",
    );
    Ok(())
}

#[tokio::test]
async fn test_role_changes_need_rank_over_member() -> anyhow::Result<()> {
    let s = setup().await?;
    let members = MemberService::new(&s.h.ctx);
    let helper = s.h.seed_role(s.guild.id, "Helper", Permissions::empty(), 3).await?;

    let peer = s.h.id();
    s.h.seed_member(s.guild.id, peer, &[s.mod_role.id]).await?;

    assert_forbidden(members.assign_role(s.guild.id, peer, helper.id, s.moderator).await);
    assert_error_code(
        members.assign_role(s.guild.id, s.owner, helper.id, s.moderator).await,
        "CANNOT_MANAGE_OWNER",
    );

    // A moderator may still give themselves a lower role
    members.assign_role(s.guild.id, s.moderator, helper.id, s.moderator).await?;
    Ok(())
}

#[tokio::test]
async fn test_join_and_get_member() -> anyhow::Result<()> {
    let s = setup().await?;
    let members = MemberService::new(&s.h.ctx);
    let newcomer = s.h.id();

    let joined = members.join(s.guild.id, newcomer).await?;
    assert!(joined.roles.is_empty());
    assert_error_code(members.join(s.guild.id, newcomer).await, "ALREADY_MEMBER");

    let fetched = members.get_member(s.guild.id, newcomer, s.member).await?;
    assert_eq!(fetched.user_id, newcomer.to_string());

    let perms = PermissionService::new(&s.h.ctx).guild_permissions(s.guild.id, newcomer).await?;
    assert_eq!(perms, Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES);

    assert_error_code(members.get_member(s.guild.id, newcomer, s.h.id()).await, "UNKNOWN_MEMBER");
    Ok(())
}

#[tokio::test]
async fn test_concurrent_role_creation() -> anyhow::Result<()> {
    let s = setup().await?;

    let mut handles = Vec::new();
    for position in 1..=8 {
        let ctx = s.h.ctx.clone();
        let guild_id = s.guild.id;
        let actor = s.moderator;
        handles.push(tokio::spawn(async move {
            RoleService::new(&ctx)
                .create_role(guild_id, actor, create_role_request(Permissions::empty(), position))
                .await
        }));
    }
    for handle in handles {
        handle.await??;
    }

    // @everyone, Moderator and the eight new roles
    let roles = RoleService::new(&s.h.ctx).list_roles(s.guild.id, s.member).await?;
    assert_eq!(roles.len(), 10);
    assert!(s.h.ctx.guild_locks().len() <= 1);
    Ok(())
}
