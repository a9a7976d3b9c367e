//! Server-level and channel-level permission computation.
//!
//! Resolution order:
//! 1. Guild owner has all permissions
//! 2. Start with @everyone role permissions, OR in every held role
//! 3. Any contributing administrator role grants all permissions
//! 4. In a channel: @everyone override, then held-role overrides by position
//!    ascending, then the member's own override

use std::collections::{HashMap, HashSet};

use crate::entities::Role;
use crate::value_objects::{Overwrite, PermissionFlag, Permissions, Snowflake};

/// Compute a member's server-wide permissions.
///
/// `held_role_ids` are the explicitly assigned roles; the @everyone role in
/// `roles` is always applied. Ids with no matching role contribute nothing.
pub fn compute_server_permissions(
    roles: &[Role],
    held_role_ids: &HashSet<Snowflake>,
    is_owner: bool,
) -> Permissions {
    if is_owner {
        return Permissions::ALL;
    }

    let mut perms = Permissions::empty();
    for role in roles
        .iter()
        .filter(|r| r.is_everyone || held_role_ids.contains(&r.id))
    {
        if role.grants_administrator() {
            return Permissions::ALL;
        }
        perms |= role.permissions;
    }

    perms
}

/// Compute a member's permissions inside one channel.
///
/// `role_overrides` is keyed by role id and is consulted only for roles in
/// `held_roles`. Each override clears its deny bits before setting its allow
/// bits, so later (higher) overrides win.
pub fn compute_channel_permissions(
    server_perms: Permissions,
    held_roles: &[Role],
    role_overrides: &HashMap<Snowflake, Overwrite>,
    everyone_override: Option<Overwrite>,
    user_override: Option<Overwrite>,
) -> Permissions {
    if server_perms.contains(Permissions::ADMINISTRATOR) {
        return Permissions::ALL;
    }

    let mut perms = server_perms;

    if let Some(everyone) = everyone_override {
        perms = everyone.apply(perms);
    }

    let mut ordered: Vec<(&Role, &Overwrite)> = held_roles
        .iter()
        .filter(|r| !r.is_everyone)
        .filter_map(|r| role_overrides.get(&r.id).map(|ow| (r, ow)))
        .collect();
    ordered.sort_by_key(|(r, _)| (r.position, r.id));
    ordered.dedup_by_key(|(r, _)| r.id);

    for (_, overwrite) in ordered {
        perms = overwrite.apply(perms);
    }

    if let Some(member) = user_override {
        perms = member.apply(perms);
    }

    perms
}

/// True iff `flag` is set in `bitfield`. Administrator is not special here.
#[inline]
pub fn has_permission(bitfield: Permissions, flag: PermissionFlag) -> bool {
    bitfield.has_flag(flag)
}

/// Set or clear a single flag
#[inline]
#[must_use]
pub fn toggle_flag(bitfield: Permissions, flag: PermissionFlag, on: bool) -> Permissions {
    bitfield.with_flag(flag, on)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUILD: Snowflake = Snowflake::new(1);
    const EVERYONE_ID: Snowflake = Snowflake::new(100);

    fn everyone(perms: Permissions) -> Role {
        let mut role = Role::everyone(EVERYONE_ID, GUILD);
        role.set_permissions(perms);
        role
    }

    fn role(id: i64, position: i32, perms: Permissions) -> Role {
        Role::new(Snowflake::new(id), GUILD, format!("role-{id}"), perms).at_position(position)
    }

    fn held(ids: &[i64]) -> HashSet<Snowflake> {
        ids.iter().copied().map(Snowflake::new).collect()
    }

    fn sample_bitfields() -> Vec<Permissions> {
        vec![
            Permissions::empty(),
            Permissions::DEFAULT,
            Permissions::ALL,
            Permissions::VIEW_CHANNEL | Permissions::KICK_MEMBERS | Permissions::EMBED_LINKS,
            Permissions::from_bits_truncate(0b1010_1010_1010_1010_1010),
            Permissions::from_bits_truncate(0b0101_0101_0101_0101_0101),
            Permissions::ADMINISTRATOR,
        ]
    }

    #[test]
    fn test_admin_role_grants_all_regardless_of_other_roles() {
        let roles = vec![
            everyone(Permissions::VIEW_CHANNEL),
            role(2, 1, Permissions::empty()),
            role(3, 2, Permissions::ADMINISTRATOR),
        ];
        assert_eq!(compute_server_permissions(&roles, &held(&[2, 3]), false), Permissions::ALL);

        let mut flagged = role(4, 1, Permissions::SEND_MESSAGES);
        flagged.is_admin = true;
        let roles = vec![everyone(Permissions::empty()), flagged, role(5, 9, Permissions::empty())];
        assert_eq!(compute_server_permissions(&roles, &held(&[4, 5]), false), Permissions::ALL);
    }

    #[test]
    fn test_owner_gets_all_without_roles() {
        let roles = vec![everyone(Permissions::empty())];
        assert_eq!(compute_server_permissions(&roles, &HashSet::new(), true), Permissions::ALL);
        assert_eq!(compute_server_permissions(&[], &HashSet::new(), true), Permissions::ALL);
    }

    #[test]
    fn test_member_without_roles_gets_everyone_bitfield() {
        let roles = vec![everyone(Permissions::DEFAULT), role(2, 1, Permissions::KICK_MEMBERS)];
        assert_eq!(compute_server_permissions(&roles, &HashSet::new(), false), Permissions::DEFAULT);
    }

    #[test]
    fn test_held_roles_are_unioned() {
        let roles = vec![
            everyone(Permissions::VIEW_CHANNEL),
            role(2, 1, Permissions::KICK_MEMBERS),
            role(3, 2, Permissions::BAN_MEMBERS),
        ];
        assert_eq!(
            compute_server_permissions(&roles, &held(&[2, 3]), false),
            Permissions::VIEW_CHANNEL | Permissions::KICK_MEMBERS | Permissions::BAN_MEMBERS
        );
    }

    #[test]
    fn test_dangling_role_ids_contribute_nothing() {
        let roles = vec![everyone(Permissions::VIEW_CHANNEL)];
        assert_eq!(
            compute_server_permissions(&roles, &held(&[404, 405]), false),
            Permissions::VIEW_CHANNEL
        );
    }

    #[test]
    fn test_no_overrides_yields_server_permissions() {
        let roles = vec![everyone(Permissions::DEFAULT), role(2, 1, Permissions::MANAGE_MESSAGES)];
        let server = compute_server_permissions(&roles, &held(&[2]), false);
        let channel = compute_channel_permissions(server, &roles[1..], &HashMap::new(), None, None);
        assert_eq!(channel, server);
    }

    #[test]
    fn test_higher_role_override_wins() {
        let a = role(2, 1, Permissions::empty());
        let b = role(3, 2, Permissions::empty());
        let overrides = HashMap::from([
            (a.id, Overwrite::deny(Permissions::SEND_MESSAGES)),
            (b.id, Overwrite::allow(Permissions::SEND_MESSAGES)),
        ]);
        let base = Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES;

        // Storage order must not matter
        let forward = compute_channel_permissions(base, &[a.clone(), b.clone()], &overrides, None, None);
        let reverse = compute_channel_permissions(base, &[b, a], &overrides, None, None);
        assert!(forward.has(Permissions::SEND_MESSAGES));
        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_equal_positions_break_ties_by_id() {
        let low_id = role(2, 4, Permissions::empty());
        let high_id = role(3, 4, Permissions::empty());
        let overrides = HashMap::from([
            (low_id.id, Overwrite::allow(Permissions::SEND_MESSAGES)),
            (high_id.id, Overwrite::deny(Permissions::SEND_MESSAGES)),
        ]);
        let base = Permissions::SEND_MESSAGES;

        let a = compute_channel_permissions(base, &[low_id.clone(), high_id.clone()], &overrides, None, None);
        let b = compute_channel_permissions(base, &[high_id, low_id], &overrides, None, None);
        assert!(!a.has(Permissions::SEND_MESSAGES));
        assert_eq!(a, b);
    }

    #[test]
    fn test_user_override_beats_role_overrides() {
        let a = role(2, 1, Permissions::empty());
        let b = role(3, 2, Permissions::empty());
        let overrides = HashMap::from([
            (a.id, Overwrite::deny(Permissions::SEND_MESSAGES)),
            (b.id, Overwrite::allow(Permissions::SEND_MESSAGES)),
        ]);
        let perms = compute_channel_permissions(
            Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES,
            &[a, b],
            &overrides,
            None,
            Some(Overwrite::deny(Permissions::SEND_MESSAGES)),
        );
        assert!(!perms.has(Permissions::SEND_MESSAGES));
        assert!(perms.has(Permissions::VIEW_CHANNEL));
    }

    #[test]
    fn test_everyone_override_applies_before_roles() {
        let helper = role(2, 1, Permissions::empty());
        let overrides = HashMap::from([(helper.id, Overwrite::allow(Permissions::SEND_MESSAGES))]);
        let perms = compute_channel_permissions(
            Permissions::DEFAULT,
            &[helper],
            &overrides,
            Some(Overwrite::deny(Permissions::SEND_MESSAGES | Permissions::ADD_REACTIONS)),
            None,
        );
        assert!(perms.has(Permissions::SEND_MESSAGES));
        assert!(!perms.has(Permissions::ADD_REACTIONS));
    }

    #[test]
    fn test_overrides_for_unheld_roles_are_ignored() {
        let held_role = role(2, 1, Permissions::empty());
        let overrides = HashMap::from([(Snowflake::new(99), Overwrite::deny(Permissions::VIEW_CHANNEL))]);
        let perms = compute_channel_permissions(Permissions::VIEW_CHANNEL, &[held_role], &overrides, None, None);
        assert_eq!(perms, Permissions::VIEW_CHANNEL);
    }

    #[test]
    fn test_administrator_bypasses_channel_overrides() {
        let admin = role(2, 1, Permissions::ADMINISTRATOR);
        let overrides = HashMap::from([(admin.id, Overwrite::deny(Permissions::ALL))]);
        let perms = compute_channel_permissions(
            Permissions::ADMINISTRATOR,
            &[admin],
            &overrides,
            Some(Overwrite::deny(Permissions::ALL)),
            Some(Overwrite::deny(Permissions::ALL)),
        );
        assert_eq!(perms, Permissions::ALL);
    }

    #[test]
    fn test_overlapping_override_resolves_allow_wins() {
        let perms = compute_channel_permissions(
            Permissions::empty(),
            &[],
            &HashMap::new(),
            Some(Overwrite::new(Permissions::SPEAK, Permissions::SPEAK)),
            None,
        );
        assert!(perms.has(Permissions::SPEAK));
    }

    #[test]
    fn test_channel_computation_is_idempotent() {
        let a = role(2, 1, Permissions::empty());
        let b = role(3, 2, Permissions::empty());
        let overrides = HashMap::from([
            (a.id, Overwrite::new(Permissions::ATTACH_FILES, Permissions::SEND_MESSAGES)),
            (b.id, Overwrite::allow(Permissions::PIN_MESSAGES)),
        ]);
        let held_roles = [a, b];
        let everyone_ow = Some(Overwrite::deny(Permissions::EMBED_LINKS));
        let user_ow = Some(Overwrite::allow(Permissions::SPEAK));

        let first = compute_channel_permissions(Permissions::DEFAULT, &held_roles, &overrides, everyone_ow, user_ow);
        let second = compute_channel_permissions(Permissions::DEFAULT, &held_roles, &overrides, everyone_ow, user_ow);
        assert_eq!(first, second);
    }

    #[test]
    fn test_toggle_set_then_clear_round_trips() {
        for bf in sample_bitfields() {
            for flag in PermissionFlag::ALL_FLAGS {
                if bf.has_flag(flag) {
                    continue;
                }
                assert_eq!(toggle_flag(toggle_flag(bf, flag, true), flag, false), bf);
            }
        }
    }

    #[test]
    fn test_toggle_sets_and_clears_single_bit() {
        let bf = toggle_flag(Permissions::empty(), PermissionFlag::ManageRoles, true);
        assert_eq!(bf, Permissions::MANAGE_ROLES);
        assert_eq!(toggle_flag(bf, PermissionFlag::ManageRoles, false), Permissions::empty());
        assert_eq!(toggle_flag(bf, PermissionFlag::ManageRoles, true), bf);
    }

    #[test]
    fn test_has_permission_matches_bit_exhaustively() {
        for bf in sample_bitfields() {
            for flag in PermissionFlag::ALL_FLAGS {
                let bit_set = u64::from(bf) & (1u64 << flag.position()) != 0;
                assert_eq!(has_permission(bf, flag), bit_set, "{flag} in {bf}");
            }
        }
    }

    #[test]
    fn test_has_permission_has_no_admin_special_case() {
        assert!(!has_permission(Permissions::ADMINISTRATOR, PermissionFlag::SendMessages));
    }

    #[test]
    fn test_muted_member_scenario() {
        let roles = vec![
            everyone(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES),
            role(2, 5, Permissions::empty()),
        ];
        let held_ids = held(&[2]);
        let overrides = HashMap::from([(Snowflake::new(2), Overwrite::deny(Permissions::SEND_MESSAGES))]);

        let server = compute_server_permissions(&roles, &held_ids, false);
        let channel = compute_channel_permissions(server, &roles[1..], &overrides, None, None);

        assert!(has_permission(channel, PermissionFlag::ViewChannel));
        assert!(!has_permission(channel, PermissionFlag::SendMessages));
    }

    #[test]
    fn test_muted_moderator_scenario() {
        let roles = vec![
            everyone(Permissions::VIEW_CHANNEL | Permissions::SEND_MESSAGES),
            role(2, 3, Permissions::KICK_MEMBERS),
            role(3, 5, Permissions::empty()),
        ];
        let held_ids = held(&[2, 3]);
        let muted_channel = HashMap::from([(Snowflake::new(3), Overwrite::deny(Permissions::SEND_MESSAGES))]);

        let server = compute_server_permissions(&roles, &held_ids, false);
        let in_muted = compute_channel_permissions(server, &roles[1..], &muted_channel, None, None);
        let elsewhere = compute_channel_permissions(server, &roles[1..], &HashMap::new(), None, None);

        assert!(has_permission(server, PermissionFlag::KickMembers));
        assert!(has_permission(in_muted, PermissionFlag::KickMembers));
        assert!(!has_permission(in_muted, PermissionFlag::SendMessages));
        assert!(has_permission(elsewhere, PermissionFlag::SendMessages));
        assert!(has_permission(server, PermissionFlag::SendMessages));
    }
}
