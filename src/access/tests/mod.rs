use std::sync::Arc;

use super::*;
use crate::privilege_set::PrivilegeState;
use crate::privileges::PrivilegeType;
use crate::types::{Ace, AceWho, Principal};

mod tiers;

fn resolver(name: &str, who_type: WhoType) -> String {
    format!("/principals/{who_type}s/{name}")
}

fn user(name: &str) -> Principal {
    Principal::user(name, format!("/principals/users/{name}"))
}

fn member(name: &str, groups: &[&str]) -> Principal {
    user(name).with_groups(groups.iter().map(|g| format!("/principals/groups/{g}")))
}

fn owner() -> Principal {
    user("owner")
}

fn access() -> Access {
    Access::new(PrivilegeCatalog::standard())
}

fn privs(names: &[&str]) -> Vec<Arc<Privilege>> {
    PrivilegeCatalog::standard()
        .privileges_named(names)
        .unwrap()
}

fn denials(kinds: &[PrivilegeType]) -> Vec<Arc<Privilege>> {
    let catalog = PrivilegeCatalog::standard();
    kinds.iter().map(|kind| catalog.denial(*kind)).collect()
}

/// Encode an ACL built from `(who, privileges)` pairs.
fn acl(entries: Vec<(AceWho, Vec<Arc<Privilege>>)>) -> String {
    entries
        .into_iter()
        .map(|(who, privs)| Ace::new(who, privs, None))
        .collect::<Acl>()
        .encode()
}

fn evaluate(who: &Principal, desired: &[&str], acl: &str) -> CurrentAccess {
    access()
        .evaluate_access(&resolver, who, &owner(), &privs(desired), acl, None)
        .unwrap()
}

fn allowed(who: &Principal, desired: &[&str], acl: &str) -> bool {
    evaluate(who, desired, acl).access_allowed()
}
