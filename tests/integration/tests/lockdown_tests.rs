//! Channel lockdown round trips
//!
//! Run with: cargo test -p integration-tests --test lockdown_tests

use haven_core::entities::{AuditAction, AuditLogQuery, OverrideTarget};
use haven_core::{Overwrite, Permissions};
use haven_service::{ChannelService, OverrideService, PermissionService, LOCKDOWN_PERMISSIONS};
use integration_tests::{allow, assert_error_code, assert_forbidden, lockdown, TestHarness};

const BASE: Permissions = Permissions::VIEW_CHANNEL
    .union(Permissions::SEND_MESSAGES)
    .union(Permissions::ADD_REACTIONS);

#[tokio::test]
async fn test_lock_and_unlock_without_previous_override() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    h.seed_member(guild.id, user, &[]).await?;

    let channels = ChannelService::new(&h.ctx);
    let permissions = PermissionService::new(&h.ctx);

    let locked = channels.lock_channel(channel.id, owner, lockdown("raid")).await?;
    assert!(locked.locked);
    assert_eq!(
        h.stored_override(channel.id, OverrideTarget::Role(guild.id)).await?,
        Some(Overwrite::deny(LOCKDOWN_PERMISSIONS))
    );
    assert_eq!(
        permissions.channel_permissions(channel.id, user).await?,
        Permissions::VIEW_CHANNEL
    );

    let unlocked = channels.unlock_channel(channel.id, owner, lockdown("over")).await?;
    assert!(!unlocked.locked);
    assert!(h.stored_override(channel.id, OverrideTarget::Role(guild.id)).await?.is_none());
    assert_eq!(permissions.channel_permissions(channel.id, user).await?, BASE);
    Ok(())
}

#[tokio::test]
async fn test_unlock_restores_previous_override() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;

    let previous = Overwrite::new(
        Permissions::SEND_MESSAGES | Permissions::ATTACH_FILES,
        Permissions::EMBED_LINKS,
    );
    h.seed_override(&channel, OverrideTarget::Role(guild.id), previous).await?;

    let channels = ChannelService::new(&h.ctx);
    channels.lock_channel(channel.id, owner, lockdown("spam")).await?;

    let during = h.stored_override(channel.id, OverrideTarget::Role(guild.id)).await?;
    assert_eq!(
        during,
        Some(Overwrite::new(
            Permissions::ATTACH_FILES,
            Permissions::EMBED_LINKS | LOCKDOWN_PERMISSIONS,
        ))
    );
    let stored = h.ctx.find_channel(channel.id).await?;
    assert!(stored.locked);
    assert_eq!(stored.pre_lock_override, Some(previous));

    channels.unlock_channel(channel.id, owner, lockdown("done")).await?;
    assert_eq!(
        h.stored_override(channel.id, OverrideTarget::Role(guild.id)).await?,
        Some(previous)
    );
    let stored = h.ctx.find_channel(channel.id).await?;
    assert!(!stored.locked);
    assert!(stored.pre_lock_override.is_none());
    Ok(())
}

#[tokio::test]
async fn test_lock_state_errors() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let channels = ChannelService::new(&h.ctx);

    assert_error_code(
        channels.unlock_channel(channel.id, owner, lockdown("nothing")).await,
        "CHANNEL_NOT_LOCKED",
    );

    channels.lock_channel(channel.id, owner, lockdown("first")).await?;
    assert_error_code(
        channels.lock_channel(channel.id, owner, lockdown("second")).await,
        "CHANNEL_ALREADY_LOCKED",
    );

    // Lockdown owns the @everyone override until unlock
    let overrides = OverrideService::new(&h.ctx);
    assert_error_code(
        overrides
            .set_role_override(channel.id, guild.id, owner, allow(Permissions::SEND_MESSAGES))
            .await,
        "CHANNEL_ALREADY_LOCKED",
    );
    assert_error_code(
        overrides
            .delete_override(channel.id, OverrideTarget::Role(guild.id), owner)
            .await,
        "CHANNEL_ALREADY_LOCKED",
    );
    Ok(())
}

#[tokio::test]
async fn test_lock_requires_manage_channels() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();
    let keeper = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let channel = h.seed_channel(guild.id).await?;
    let keeper_role = h
        .seed_role(guild.id, "Keeper", Permissions::MANAGE_CHANNELS, 3)
        .await?;
    h.seed_member(guild.id, user, &[]).await?;
    h.seed_member(guild.id, keeper, &[keeper_role.id]).await?;

    let channels = ChannelService::new(&h.ctx);
    assert_forbidden(channels.lock_channel(channel.id, user, lockdown("no")).await);

    channels.lock_channel(channel.id, keeper, lockdown("yes")).await?;
    // The keeper's own SEND_MESSAGES comes from @everyone and is now denied
    let perms = PermissionService::new(&h.ctx).channel_permissions(channel.id, keeper).await?;
    assert!(perms.contains(Permissions::MANAGE_CHANNELS));
    assert!(!perms.contains(Permissions::SEND_MESSAGES));

    channels.unlock_channel(channel.id, keeper, lockdown("lifted")).await?;

    let mut query = AuditLogQuery::new(guild.id, 10);
    query.actor_id = Some(keeper);
    let entries = h.ctx.audit_repo().query(&query).await?;
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::ChannelUnlock, AuditAction::ChannelLock]);
    assert_eq!(entries[1].reason.as_deref(), Some("yes"));
    assert_eq!(entries[1].channel_id, Some(channel.id));
    Ok(())
}
