//! Audit log listing, filters and paging
//!
//! Run with: cargo test -p integration-tests --test audit_tests

use std::collections::HashSet;

use haven_core::{Permissions, Snowflake};
use haven_service::dto::AuditLogQueryParams;
use haven_service::{AuditService, RoleService};
use integration_tests::{assert_error_code, assert_forbidden, create_role_request, TestHarness};

const BASE: Permissions = Permissions::VIEW_CHANNEL.union(Permissions::SEND_MESSAGES);

#[tokio::test]
async fn test_list_requires_view_audit_log() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let user = h.id();
    let auditor = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let auditor_role = h.seed_role(guild.id, "Auditor", Permissions::VIEW_AUDIT_LOG, 2).await?;
    h.seed_member(guild.id, user, &[]).await?;
    h.seed_member(guild.id, auditor, &[auditor_role.id]).await?;

    let audit = AuditService::new(&h.ctx);
    assert_forbidden(audit.list(guild.id, user, AuditLogQueryParams::default()).await);

    // The refused read is itself on the log
    let page = audit.list(guild.id, auditor, AuditLogQueryParams::default()).await?;
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].action, "AUDIT_LOG_VIEW");
    assert_eq!(page.data[0].verdict, "denied");
    assert_eq!(page.data[0].permission, Some("VIEW_AUDIT_LOG"));
    assert_eq!(page.data[0].actor_id, user.to_string());
    assert!(!page.pagination.has_more);
    Ok(())
}

#[tokio::test]
async fn test_paging_walks_newest_first() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let guild = h.seed_guild(owner, BASE).await?;

    let roles = RoleService::new(&h.ctx);
    let mut created = Vec::new();
    for position in 1..=5 {
        let role = roles
            .create_role(guild.id, owner, create_role_request(Permissions::empty(), position))
            .await?;
        created.push(role.id);
    }

    let audit = AuditService::new(&h.ctx);
    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let params = AuditLogQueryParams {
            limit: Some(2),
            before_id: cursor.clone(),
            ..Default::default()
        };
        let page = audit.list(guild.id, owner, params).await?;
        assert!(page.data.len() <= 2);
        seen.extend(page.data.iter().map(|e| e.target_id.clone().unwrap_or_default()));

        if !page.pagination.has_more {
            assert!(page.pagination.before.is_none());
            break;
        }
        cursor = page.pagination.before;
    }

    created.reverse();
    assert_eq!(seen, created);
    Ok(())
}

#[tokio::test]
async fn test_filters() -> anyhow::Result<()> {
    let h = TestHarness::new();
    let owner = h.id();
    let other = h.id();
    let guild = h.seed_guild(owner, BASE).await?;
    let manager = h.seed_role(guild.id, "Manager", Permissions::MANAGE_ROLES, 5).await?;
    h.seed_member(guild.id, other, &[manager.id]).await?;

    let roles = RoleService::new(&h.ctx);
    let first = roles
        .create_role(guild.id, owner, create_role_request(Permissions::empty(), 1))
        .await?;
    roles
        .create_role(guild.id, other, create_role_request(Permissions::empty(), 2))
        .await?;
    let first_id = Snowflake::parse(&first.id)?;
    roles.delete_role(guild.id, first_id, owner).await?;

    let audit = AuditService::new(&h.ctx);

    let by_owner = audit
        .list(
            guild.id,
            owner,
            AuditLogQueryParams {
                actor_id: Some(owner.to_string()),
                ..Default::default()
            },
        )
        .await?;
    let actions: Vec<&str> = by_owner.data.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec!["ROLE_DELETE", "ROLE_CREATE"]);

    let creates = audit
        .list(
            guild.id,
            owner,
            AuditLogQueryParams {
                action: Some("ROLE_CREATE".to_string()),
                target_type: Some("role".to_string()),
                ..Default::default()
            },
        )
        .await?;
    let actors: HashSet<String> = creates.data.iter().map(|e| e.actor_id.clone()).collect();
    assert_eq!(creates.data.len(), 2);
    assert_eq!(actors.len(), 2);

    let deleted = &by_owner.data[0];
    assert_eq!(deleted.target_id.as_deref(), Some(first.id.as_str()));
    let changes = deleted.changes.as_ref().map(|c| c["name"].clone());
    assert_eq!(changes, Some(serde_json::Value::String(first.name.clone())));

    assert_error_code(
        audit
            .list(
                guild.id,
                owner,
                AuditLogQueryParams {
                    action: Some("ROLE_RENAME".to_string()),
                    ..Default::default()
                },
            )
            .await,
        "VALIDATION_ERROR",
    );
    assert_error_code(
        audit
            .list(
                guild.id,
                owner,
                AuditLogQueryParams {
                    before_id: Some("abc".to_string()),
                    ..Default::default()
                },
            )
            .await,
        "VALIDATION_ERROR",
    );
    Ok(())
}
