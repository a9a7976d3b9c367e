//! Permission resolution through the service layer
//!
//! Run with: cargo test -p integration-tests --test permission_tests

use haven_core::entities::{AuditAction, AuditLogQuery, AuditTargetType, OverrideTarget};
use haven_core::{Overwrite, PermissionFlag, Permissions};
use haven_service::{PermissionService, RoleService};
use integration_tests::{assert_error_code, assert_forbidden, create_role_request, TestHarness};

const BASE: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

#[tokio::test]
async fn test_muted_member_cannot_send_in_channel() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let muted = h.seed_role(guild.id, "Muted", Permissions::empty(), 5).await?;
    h.seed_member(guild.id, user, &[muted.id]).await?;
    h.seed_override(&channel, OverrideTarget::Role(muted.id), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;

    let perms = PermissionService::new(&h.ctx).channel_permissions(channel.id, user).await?;

    assert!(perms.contains(Permissions::VIEW_CHANNEL));
    assert!(!perms.contains(Permissions::SEND_MESSAGES));
    Ok(())
}

#[tokio::test]
async fn test_moderator_muted_keeps_server_flags() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let muted_in = h.seed_channel(guild.id).await?;
    let other = h.seed_channel(guild.id).await?;
    let moderator = h.seed_role(guild.id, "Moderator", Permissions::KICK_MEMBERS, 3).await?;
    let muted = h.seed_role(guild.id, "Muted", Permissions::empty(), 5).await?;
    h.seed_member(guild.id, user, &[moderator.id, muted.id]).await?;
    h.seed_override(&muted_in, OverrideTarget::Role(muted.id), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;

    let service = PermissionService::new(&h.ctx);

    let in_channel = service.channel_permissions(muted_in.id, user).await?;
    assert!(in_channel.contains(Permissions::KICK_MEMBERS));
    assert!(!in_channel.contains(Permissions::SEND_MESSAGES));

    let elsewhere = service.channel_permissions(other.id, user).await?;
    assert!(elsewhere.contains(Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS));

    let server = service.guild_permissions(guild.id, user).await?;
    assert!(server.contains(Permissions::SEND_MESSAGES | Permissions::KICK_MEMBERS));

    assert!(!service.check(guild.id, Some(muted_in.id), user, PermissionFlag::SendMessages).await?);
    assert!(service.check(guild.id, None, user, PermissionFlag::KickMembers).await?);
    Ok(())
}

#[tokio::test]
async fn test_owner_and_admin_bypass_overrides() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let admin = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let admin_role = h.seed_role(guild.id, "Admin", Permissions::ADMINISTRATOR, 2).await?;
    h.seed_member(guild.id, admin, &[admin_role.id]).await?;
    h.seed_override(&channel, OverrideTarget::Role(guild.id), Overwrite::deny(Permissions::all()))
        .await?;
    h.seed_override(&channel, OverrideTarget::Member(admin), Overwrite::deny(Permissions::VIEW_CHANNEL))
        .await?;

    let service = PermissionService::new(&h.ctx);
    assert_eq!(service.channel_permissions(channel.id, owner).await?, Permissions::ALL);
    assert_eq!(service.channel_permissions(channel.id, admin).await?, Permissions::ALL);
    assert!(service.is_guild_owner(guild.id, owner).await?);
    assert!(!service.is_guild_owner(guild.id, admin).await?);
    Ok(())
}

#[tokio::test]
async fn test_member_override_applies_last() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let speaker = h.seed_role(guild.id, "Speaker", Permissions::empty(), 1).await?;
    h.seed_member(guild.id, user, &[speaker.id]).await?;

    // @everyone loses SEND_MESSAGES, the role gives it back
    h.seed_override(&channel, OverrideTarget::Role(guild.id), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;
    h.seed_override(&channel, OverrideTarget::Role(speaker.id), Overwrite::allow(Permissions::SEND_MESSAGES))
        .await?;

    let service = PermissionService::new(&h.ctx);
    assert!(service.channel_permissions(channel.id, user).await?.contains(Permissions::SEND_MESSAGES));

    h.seed_override(&channel, OverrideTarget::Member(user), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;
    assert!(!service.channel_permissions(channel.id, user).await?.contains(Permissions::SEND_MESSAGES));
    Ok(())
}

#[tokio::test]
async fn test_effective_permissions_lists_flags() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    h.seed_member(guild.id, user, &[]).await?;

    let response = PermissionService::new(&h.ctx)
        .effective_permissions(guild.id, None, user)
        .await?;

    assert_eq!(response.permissions, BASE);
    assert_eq!(response.flags, vec!["VIEW_CHANNEL", "SEND_MESSAGES"]);
    assert_eq!(response.user_id, user.to_string());
    assert!(response.channel_id.is_none());
    Ok(())
}

#[tokio::test]
async fn test_non_member_is_not_resolved() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let guild = h.seed_guild(h.id(), BASE).await?;

    let result = PermissionService::new(&h.ctx).guild_permissions(guild.id, h.id()).await;
    assert_error_code(result, "UNKNOWN_MEMBER");
    Ok(())
}

#[tokio::test]
async fn test_denial_is_audited() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let helper = h.seed_role(guild.id, "Helper", Permissions::empty(), 1).await?;
    h.seed_member(guild.id, user, &[]).await?;

    let roles = RoleService::new(&h.ctx);
    assert_forbidden(roles.create_role(guild.id, user, create_role_request(Permissions::empty(), 1)).await);
    assert_forbidden(roles.delete_role(guild.id, helper.id, user).await);

    let mut query = AuditLogQuery::new(guild.id, 10);
    query.action = Some(AuditAction::RoleDelete);
    let entries = h.ctx.audit_repo().query(&query).await?;

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor_id, user);
    assert_eq!(entries[0].target_type, Some(AuditTargetType::Role));
    assert_eq!(entries[0].target_id, Some(helper.id));
    assert_eq!(entries[0].permission, Some(PermissionFlag::ManageRoles));
    assert!(entries[0].is_denied());

    // The refused create is filed under its own action, without a target
    query.action = Some(AuditAction::RoleCreate);
    let entries = h.ctx.audit_repo().query(&query).await?;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_denied());
    assert!(entries[0].target_id.is_none());
    assert!(entries[0].reason.is_none());
    Ok(())
}

#[tokio::test]
async fn test_can_manage_member_follows_hierarchy() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let senior = h.id();
    let junior = h.id();

    let guild = h.seed_guild(owner, BASE).await?;
    let high = h.seed_role(guild.id, "High", Permissions::empty(), 8).await?;
    let low = h.seed_role(guild.id, "Low", Permissions::empty(), 2).await?;
    h.seed_member(guild.id, senior, &[high.id]).await?;
    h.seed_member(guild.id, junior, &[low.id]).await?;

    let service = PermissionService::new(&h.ctx);
    assert!(service.can_manage_member(guild.id, senior, junior).await?);
    assert!(!service.can_manage_member(guild.id, junior, senior).await?);
    assert!(!service.can_manage_member(guild.id, senior, owner).await?);
    assert!(service.can_manage_member(guild.id, owner, senior).await?);
    Ok(())
}
