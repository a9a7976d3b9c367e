//! Channel override writes
//!
//! Run with: cargo test -p integration-tests --test override_tests

use haven_core::entities::{AuditAction, AuditLogQuery, AuditTargetType, OverrideTarget};
use haven_core::{Overwrite, PermissionFlag, Permissions};
use haven_service::dto::SetOverrideRequest;
use haven_service::{OverrideService, PermissionService};
use integration_tests::{allow, assert_error_code, assert_forbidden, deny, TestHarness};

const BASE: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

#[tokio::test]
async fn test_set_list_and_delete_role_override() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let muted = h.seed_role(guild.id, "Muted", Permissions::empty(), 2).await?;
    h.seed_member(guild.id, user, &[muted.id]).await?;

    let overrides = OverrideService::new(&h.ctx);
    let permissions = PermissionService::new(&h.ctx);

    let set = overrides
        .set_role_override(channel.id, muted.id, owner, deny(Permissions::SEND_MESSAGES))
        .await?;
    assert_eq!(set.target_type, "role");
    assert_eq!(set.deny, Permissions::SEND_MESSAGES);
    assert!(!permissions.channel_permissions(channel.id, user).await?.contains(Permissions::SEND_MESSAGES));

    // Setting again replaces the pair
    overrides
        .set_role_override(channel.id, muted.id, owner, allow(Permissions::ATTACH_FILES))
        .await?;
    let listed = overrides.list_overrides(channel.id, owner).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].allow, Permissions::ATTACH_FILES);
    assert!(listed[0].deny.is_empty());

    overrides
        .delete_override(channel.id, OverrideTarget::Role(muted.id), owner)
        .await?;
    assert!(overrides.list_overrides(channel.id, owner).await?.is_empty());

    let again = overrides
        .delete_override(channel.id, OverrideTarget::Role(muted.id), owner)
        .await;
    assert_error_code(again, "UNKNOWN_OVERRIDE");
    Ok(())
}

#[tokio::test]
async fn test_overlapping_override_is_rejected() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;

    let request = SetOverrideRequest {
        allow: Permissions::SEND_MESSAGES | Permissions::SPEAK,
        deny: Permissions::SEND_MESSAGES,
    };
    let result = OverrideService::new(&h.ctx)
        .set_role_override(channel.id, guild.id, owner, request)
        .await;
    assert_error_code(result, "OVERLAPPING_OVERRIDE");
    assert!(h.stored_override(channel.id, OverrideTarget::Role(guild.id)).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_unknown_targets_are_rejected() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let other_guild = h.seed_guild(owner, BASE).await?;
    let foreign = h.seed_role(other_guild.id, "Foreign", Permissions::empty(), 1).await?;

    let overrides = OverrideService::new(&h.ctx);
    assert_error_code(
        overrides.set_role_override(channel.id, h.id(), owner, deny(Permissions::SPEAK)).await,
        "UNKNOWN_ROLE",
    );
    assert_error_code(
        overrides.set_role_override(channel.id, foreign.id, owner, deny(Permissions::SPEAK)).await,
        "UNKNOWN_ROLE",
    );
    assert_error_code(
        overrides.set_user_override(channel.id, h.id(), owner, deny(Permissions::SPEAK)).await,
        "UNKNOWN_MEMBER",
    );
    assert_error_code(
        overrides.set_role_override(h.id(), guild.id, owner, deny(Permissions::SPEAK)).await,
        "UNKNOWN_CHANNEL",
    );
    Ok(())
}

#[tokio::test]
async fn test_manage_channels_is_enough() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let keeper = h.id();
    let user = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let keeper_role = h
        .seed_role(guild.id, "Keeper", Permissions::MANAGE_CHANNELS, 6)
        .await?;
    h.seed_member(guild.id, keeper, &[keeper_role.id]).await?;
    h.seed_member(guild.id, user, &[]).await?;

    let overrides = OverrideService::new(&h.ctx);
    let set = overrides
        .set_user_override(channel.id, user, keeper, deny(Permissions::SEND_MESSAGES))
        .await?;
    assert_eq!(set.target_type, "member");
    assert_eq!(set.target_id, user.to_string());

    // A flag the keeper lacks cannot be allowed or denied
    assert_error_code(
        overrides.set_user_override(channel.id, user, keeper, allow(Permissions::ATTACH_FILES)).await,
        "CANNOT_ESCALATE",
    );
    assert_error_code(
        overrides.set_role_override(channel.id, guild.id, keeper, deny(Permissions::BAN_MEMBERS)).await,
        "CANNOT_ESCALATE",
    );

    // Plain members cannot write overrides at all
    assert_forbidden(
        overrides
            .set_role_override(channel.id, guild.id, user, deny(Permissions::SEND_MESSAGES))
            .await,
    );
    Ok(())
}

#[tokio::test]
async fn test_override_targets_must_rank_below_actor() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let keeper = h.id();
    let senior = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let keeper_role = h.seed_role(guild.id, "Keeper", Permissions::MANAGE_ROLES, 4).await?;
    let senior_role = h.seed_role(guild.id, "Senior", Permissions::empty(), 8).await?;
    h.seed_member(guild.id, keeper, &[keeper_role.id]).await?;
    h.seed_member(guild.id, senior, &[senior_role.id]).await?;

    let overrides = OverrideService::new(&h.ctx);
    assert_forbidden(
        overrides
            .set_role_override(channel.id, senior_role.id, keeper, deny(Permissions::SEND_MESSAGES))
            .await,
    );
    assert_forbidden(
        overrides
            .set_user_override(channel.id, senior, keeper, deny(Permissions::SEND_MESSAGES))
            .await,
    );
    assert_error_code(
        overrides
            .set_user_override(channel.id, owner, keeper, deny(Permissions::SEND_MESSAGES))
            .await,
        "CANNOT_MANAGE_OWNER",
    );

    // The owner outranks everyone
    h.seed_override(&channel, OverrideTarget::Member(senior), Overwrite::deny(Permissions::SEND_MESSAGES))
        .await?;
    assert_forbidden(
        overrides
            .delete_override(channel.id, OverrideTarget::Member(senior), keeper)
            .await,
    );
    overrides
        .delete_override(channel.id, OverrideTarget::Member(senior), owner)
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_denied_override_write_is_audited_with_alternatives() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let muted = h.seed_role(guild.id, "Muted", Permissions::empty(), 1).await?;
    h.seed_member(guild.id, user, &[]).await?;

    let result = OverrideService::new(&h.ctx)
        .set_role_override(channel.id, muted.id, user, deny(Permissions::SEND_MESSAGES))
        .await;
    assert_forbidden(result);
    assert!(h.stored_override(channel.id, OverrideTarget::Role(muted.id)).await?.is_none());

    let mut query = AuditLogQuery::new(guild.id, 10);
    query.action = Some(AuditAction::OverrideSet);
    let entries = h.ctx.audit_repo().query(&query).await?;

    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_denied());
    assert_eq!(entries[0].channel_id, Some(channel.id));
    assert_eq!(entries[0].target_type, Some(AuditTargetType::ChannelOverride));
    assert_eq!(entries[0].target_id, Some(muted.id));
    assert_eq!(entries[0].permission, Some(PermissionFlag::ManageRoles));
    assert_eq!(entries[0].reason.as_deref(), Some("requires MANAGE_ROLES or MANAGE_CHANNELS"));
    Ok(())
}
