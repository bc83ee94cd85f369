use super::*;
use crate::error::AccessError;
use yare::parameterized;

#[test]
fn test_group_tier_shadows_other() {
    let acl = acl(vec![
        (AceWho::group("staff"), privs(&["read"])),
        (AceWho::other(), privs(&["all"])),
    ]);
    assert!(!allowed(&member("alice", &["staff"]), &["write"], &acl));
    assert!(allowed(&user("bob"), &["write"], &acl));
}

#[test]
fn test_user_tier_shadows_group() {
    let acl = acl(vec![
        (AceWho::user("alice"), denials(&[PrivilegeType::Read])),
        (AceWho::group("staff"), privs(&["read"])),
    ]);
    assert!(!allowed(&member("alice", &["staff"]), &["read"], &acl));
    assert!(allowed(&member("carol", &["staff"]), &["read"], &acl));
}

#[test]
fn test_group_entries_are_merged() {
    let acl = acl(vec![
        (AceWho::group("readers"), privs(&["read"])),
        (
            AceWho::group("editors"),
            [privs(&["write"]), denials(&[PrivilegeType::WriteAcl])].concat(),
        ),
    ]);
    let result = evaluate(
        &member("alice", &["readers", "editors"]),
        &["read", "write-content"],
        &acl,
    );
    assert!(result.access_allowed());
    let privileges = result.privileges().unwrap();
    assert_eq!(privileges.state(PrivilegeType::WriteAcl), PrivilegeState::Allowed);
    assert_eq!(privileges.state(PrivilegeType::Unlock), PrivilegeState::Denied);
}

#[test]
fn test_group_principal_matches_own_entry() {
    let staff = Principal::new(WhoType::Group, "staff", "/principals/groups/staff");
    let acl = acl(vec![(AceWho::group("staff"), privs(&["read"]))]);
    assert!(allowed(&staff, &["read"], &acl));
}

#[test]
fn test_resource_like_principal() {
    let room = Principal::new(WhoType::Resource, "room1", "/principals/resources/room1");
    let acl = acl(vec![
        (
            AceWho::new(Some("room1"), WhoType::Resource, false),
            privs(&["schedule-deliver"]),
        ),
        (AceWho::authenticated(), privs(&["read"])),
    ]);
    assert!(allowed(&room, &["schedule-deliver-invite"], &acl));
    assert!(!allowed(&room, &["read"], &acl));
}

#[test]
fn test_negated_user_entry() {
    let acl = acl(vec![(AceWho::user("alice").negated(), privs(&["read"]))]);
    assert!(allowed(&user("bob"), &["read"], &acl));
    assert_eq!(evaluate(&user("alice"), &["read"], &acl), CurrentAccess::denied());
}

#[test]
fn test_authenticated_before_other() {
    let acl = acl(vec![
        (AceWho::authenticated(), privs(&["read"])),
        (AceWho::other(), privs(&["all"])),
    ]);
    assert!(!allowed(&user("bob"), &["write"], &acl));
}

#[test]
fn test_owner_entry_denial_is_kept() {
    let acl = acl(vec![(AceWho::owner(), denials(&[PrivilegeType::WriteAcl]))]);
    let result = evaluate(&owner(), &[], &acl);
    let privileges = result.privileges().unwrap();
    assert_eq!(privileges.state(PrivilegeType::WriteAcl), PrivilegeState::Denied);
    assert_eq!(privileges.state(PrivilegeType::Write), PrivilegeState::Allowed);
    assert!(!allowed(&owner(), &["write-acl"], &acl));
}

#[test]
fn test_unauthenticated_requester_is_never_owner() {
    let anonymous = Principal::unauthenticated();
    let result = access()
        .evaluate_access(&resolver, &anonymous, &anonymous, &privs(&["read"]), "", None)
        .unwrap();
    assert_eq!(result, CurrentAccess::denied());
}

#[test]
fn test_inherited_entries_apply() {
    let acl = "WU05 aliceyRI07 /parent ";
    let result = evaluate(&user("alice"), &["read-acl"], acl);
    assert!(result.access_allowed());
    assert_eq!(
        result.privileges().unwrap().state(PrivilegeType::ReadAcl),
        PrivilegeState::AllowedInherited
    );
}

#[test]
fn test_filter_clamps_owner() {
    let filter = PrivilegeSet::default_non_owner_privileges();
    let run = |desired: &[&str]| {
        access()
            .evaluate_access(&resolver, &owner(), &owner(), &privs(desired), "", Some(&filter))
            .unwrap()
            .access_allowed()
    };
    assert!(run(&["read"]));
    assert!(!run(&["write"]));
}

#[test]
fn test_unspecified_filter_slots_do_not_constrain() {
    let acl = acl(vec![(AceWho::other(), privs(&["read"]))]);
    let filter = PrivilegeSet::unspecified();
    let result = access()
        .evaluate_access(&resolver, &user("bob"), &owner(), &privs(&["read"]), &acl, Some(&filter))
        .unwrap();
    assert!(result.access_allowed());
}

#[test]
fn test_empty_desired_means_any() {
    let readable = acl(vec![(AceWho::other(), privs(&["read-free-busy"]))]);
    assert!(allowed(&user("bob"), &[], &readable));

    let locked = acl(vec![(AceWho::other(), denials(&[PrivilegeType::All]))]);
    let result = evaluate(&user("bob"), &[], &locked);
    assert!(!result.access_allowed());
    assert!(result.privileges().is_some());
}

#[test]
fn test_explicit_none_is_not_any_access() {
    let anonymous = Principal::unauthenticated();
    let locked = acl(vec![(AceWho::unauthenticated(), privs(&["none"]))]);
    let result = access()
        .evaluate_access(&resolver, &anonymous, &owner(), &[], &locked, None)
        .unwrap();
    assert!(!result.access_allowed());
    assert_eq!(
        result.privileges().unwrap().state(PrivilegeType::None),
        PrivilegeState::Allowed
    );

    let none_for_other = acl(vec![(AceWho::other(), privs(&["none"]))]);
    assert!(!allowed(&user("bob"), &[], &none_for_other));
}

#[test_log::test]
fn test_malformed_acl_is_an_error() {
    let err = access()
        .evaluate_access(&resolver, &user("bob"), &owner(), &privs(&["read"]), "WONyZ ", None)
        .unwrap_err();
    assert!(matches!(err, AccessError::BadAce(_)), "{err:?}");
}

#[parameterized(
    owner_entry = { "WONyA" },
    unnamed_entry = { "WZNyR" },
    after_inherited_marker = { "WLNyRI02 /a" },
    second_entry = { "WLNyR WZNyR" },
)]
fn test_missing_ace_terminator_is_bad_acl(input: &str) {
    let err = access()
        .evaluate_access(&resolver, &user("bob"), &owner(), &privs(&["read"]), input, None)
        .unwrap_err();
    assert!(matches!(err, AccessError::BadAcl(_)), "{err:?}");
}

#[test]
fn test_legacy_flags_decode() {
    assert!(allowed(&user("bob"), &["read"], "WZN3R "));
    assert!(!allowed(&user("bob"), &["read"], "WZN2R "));
}
