//! The fixed privilege taxonomy.
//!
//! Privileges form a containment tree rooted at `all`; granting a node grants
//! everything below it. The catalog holds two structurally identical trees,
//! one for grants and one for denials, plus the disjoint `none` leaf. Each
//! node carries a single character used by the ACL codec.
//!
//! ```text
//! all
//!  ├─ read
//!  │   ├─ read-acl
//!  │   ├─ read-current-user-privilege-set
//!  │   └─ read-free-busy
//!  ├─ write
//!  │   ├─ write-acl
//!  │   ├─ write-properties
//!  │   ├─ write-content
//!  │   ├─ bind
//!  │   │   ├─ schedule ─ {schedule-request, schedule-reply, schedule-free-busy}
//!  │   │   ├─ schedule-deliver ─ {schedule-deliver-invite, schedule-deliver-reply, schedule-query-freebusy}
//!  │   │   └─ schedule-send ─ {schedule-send-invite, schedule-send-reply, schedule-send-freebusy}
//!  │   └─ unbind
//!  └─ unlock
//! none
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::codec::{AclEncoder, EncodedAcl};
use crate::error::{AccessError, Result};

/// Flag preceding a granted privilege in the encoded form.
pub(crate) const ALLOWED_FLAG: char = 'y';
/// Flag preceding a denied privilege in the encoded form.
pub(crate) const DENIED_FLAG: char = 'n';
/// Legacy allowed flag, accepted on decode only.
pub(crate) const OLD_ALLOWED_FLAG: char = '3';
/// Legacy denied flag, accepted on decode only.
pub(crate) const OLD_DENIED_FLAG: char = '2';

/// Number of privilege slots in a [`crate::PrivilegeSet`].
pub const PRIVILEGE_COUNT: usize = 25;

/// Every recognised privilege, in slot order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum PrivilegeType {
    All = 0,
    Read = 1,
    ReadAcl = 2,
    ReadCurrentUserPrivilegeSet = 3,
    ReadFreeBusy = 4,
    Write = 5,
    WriteAcl = 6,
    WriteProperties = 7,
    WriteContent = 8,
    Bind = 9,
    Schedule = 10,
    ScheduleRequest = 11,
    ScheduleReply = 12,
    ScheduleFreeBusy = 13,
    Unbind = 14,
    Unlock = 15,
    ScheduleDeliver = 16,
    ScheduleDeliverInvite = 17,
    ScheduleDeliverReply = 18,
    ScheduleQueryFreebusy = 19,
    ScheduleSend = 20,
    ScheduleSendInvite = 21,
    ScheduleSendReply = 22,
    ScheduleSendFreebusy = 23,
    None = 24,
}

impl PrivilegeType {
    /// Slot index in a privilege set.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The WebDAV/CalDAV local name, e.g. `read-acl`.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The character identifying this privilege in an encoded ACL.
    pub fn encoding(self) -> char {
        match self {
            Self::All => 'A',
            Self::Read => 'R',
            Self::ReadAcl => 'r',
            Self::ReadCurrentUserPrivilegeSet => 'P',
            Self::ReadFreeBusy => 'F',
            Self::Write => 'W',
            Self::WriteAcl => 'a',
            Self::WriteProperties => 'p',
            Self::WriteContent => 'c',
            Self::Bind => 'b',
            Self::Schedule => 'S',
            Self::ScheduleRequest => 't',
            Self::ScheduleReply => 'y',
            Self::ScheduleFreeBusy => 's',
            Self::Unbind => 'u',
            Self::Unlock => 'U',
            Self::ScheduleDeliver => 'D',
            Self::ScheduleDeliverInvite => 'i',
            Self::ScheduleDeliverReply => 'e',
            Self::ScheduleQueryFreebusy => 'q',
            Self::ScheduleSend => 'T',
            Self::ScheduleSendInvite => 'I',
            Self::ScheduleSendReply => 'E',
            Self::ScheduleSendFreebusy => 'Q',
            Self::None => 'N',
        }
    }

    pub fn from_encoding(c: char) -> Option<Self> {
        Self::iter().find(|p| p.encoding() == c)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }

    fn description(self) -> &'static str {
        match self {
            Self::All => "All privileges",
            Self::Read => "Read resource content and properties",
            Self::ReadAcl => "Read access control list",
            Self::ReadCurrentUserPrivilegeSet => "Read current user's privileges",
            Self::ReadFreeBusy => "Query free-busy information",
            Self::Write => "Write to resource",
            Self::WriteAcl => "Write access control list",
            Self::WriteProperties => "Write resource properties",
            Self::WriteContent => "Write resource content",
            Self::Bind => "Add child resources",
            Self::Schedule => "Scheduling operations",
            Self::ScheduleRequest => "Send scheduling requests",
            Self::ScheduleReply => "Send scheduling replies",
            Self::ScheduleFreeBusy => "Query scheduling free-busy",
            Self::Unbind => "Remove child resources",
            Self::Unlock => "Unlock a locked resource",
            Self::ScheduleDeliver => "Deliver scheduling messages",
            Self::ScheduleDeliverInvite => "Deliver scheduling invitations",
            Self::ScheduleDeliverReply => "Deliver scheduling replies",
            Self::ScheduleQueryFreebusy => "Query free-busy of the inbox owner",
            Self::ScheduleSend => "Send scheduling messages",
            Self::ScheduleSendInvite => "Send scheduling invitations",
            Self::ScheduleSendReply => "Send scheduling replies from the outbox",
            Self::ScheduleSendFreebusy => "Send free-busy requests",
            Self::None => "No privileges",
        }
    }

    fn contained(self) -> &'static [PrivilegeType] {
        match self {
            Self::All => &[Self::Read, Self::Write, Self::Unlock],
            Self::Read => &[
                Self::ReadAcl,
                Self::ReadCurrentUserPrivilegeSet,
                Self::ReadFreeBusy,
            ],
            Self::Write => &[
                Self::WriteAcl,
                Self::WriteProperties,
                Self::WriteContent,
                Self::Bind,
                Self::Unbind,
            ],
            Self::Bind => &[Self::Schedule, Self::ScheduleDeliver, Self::ScheduleSend],
            Self::Schedule => &[
                Self::ScheduleRequest,
                Self::ScheduleReply,
                Self::ScheduleFreeBusy,
            ],
            Self::ScheduleDeliver => &[
                Self::ScheduleDeliverInvite,
                Self::ScheduleDeliverReply,
                Self::ScheduleQueryFreebusy,
            ],
            Self::ScheduleSend => &[
                Self::ScheduleSendInvite,
                Self::ScheduleSendReply,
                Self::ScheduleSendFreebusy,
            ],
            _ => &[],
        }
    }
}

impl Display for PrivilegeType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

/// A node of the privilege tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Privilege {
    kind: PrivilegeType,
    description: &'static str,
    is_abstract: bool,
    is_denial: bool,
    contained: Vec<Arc<Privilege>>,
}

impl Privilege {
    fn build(kind: PrivilegeType) -> Self {
        Privilege {
            kind,
            description: kind.description(),
            is_abstract: false,
            is_denial: false,
            contained: kind
                .contained()
                .iter()
                .map(|child| Arc::new(Privilege::build(*child)))
                .collect(),
        }
    }

    /// Deep copy of this subtree with every node flagged as a denial.
    pub fn clone_denied(&self) -> Privilege {
        Privilege {
            kind: self.kind,
            description: self.description,
            is_abstract: self.is_abstract,
            is_denial: true,
            contained: self
                .contained
                .iter()
                .map(|child| Arc::new(child.clone_denied()))
                .collect(),
        }
    }

    pub fn kind(&self) -> PrivilegeType {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn encoding(&self) -> char {
        self.kind.encoding()
    }

    pub fn index(&self) -> usize {
        self.kind.index()
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_denial(&self) -> bool {
        self.is_denial
    }

    pub fn contained(&self) -> &[Arc<Privilege>] {
        &self.contained
    }

    /// True if this node is, or transitively contains, `kind`.
    pub fn contains(&self, kind: PrivilegeType) -> bool {
        self.kind == kind || self.contained.iter().any(|c| c.contains(kind))
    }

    /// Write the flag and privilege characters.
    pub fn encode(&self, enc: &mut AclEncoder) {
        enc.add_char(if self.is_denial {
            DENIED_FLAG
        } else {
            ALLOWED_FLAG
        });
        enc.add_char(self.encoding());
    }

    fn find(self: &Arc<Self>, encoding: char) -> Option<&Arc<Privilege>> {
        if self.encoding() == encoding {
            return Some(self);
        }
        self.contained.iter().find_map(|child| child.find(encoding))
    }
}

impl Display for Privilege {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.is_denial {
            write!(f, "not-{}", self.name())
        } else {
            f.write_str(self.name())
        }
    }
}

static STANDARD: Lazy<Arc<PrivilegeCatalog>> = Lazy::new(|| Arc::new(PrivilegeCatalog::build()));

/// The immutable privilege taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeCatalog {
    grants: Arc<Privilege>,
    denials: Arc<Privilege>,
    none_grant: Arc<Privilege>,
    none_denial: Arc<Privilege>,
    grants_by_index: Vec<Arc<Privilege>>,
    denials_by_index: Vec<Arc<Privilege>>,
}

fn flatten(node: &Arc<Privilege>, out: &mut Vec<Arc<Privilege>>) {
    out.push(node.clone());
    for child in node.contained() {
        flatten(child, out);
    }
}

fn index_nodes(root: &Arc<Privilege>, none: &Arc<Privilege>) -> Vec<Arc<Privilege>> {
    let mut nodes = Vec::with_capacity(PRIVILEGE_COUNT);
    flatten(root, &mut nodes);
    flatten(none, &mut nodes);
    nodes.sort_by_key(|p| p.index());
    nodes
}

impl PrivilegeCatalog {
    /// Build the grant and denial trees.
    pub fn build() -> Self {
        let grants = Privilege::build(PrivilegeType::All);
        let denials = grants.clone_denied();
        let none_grant = Privilege::build(PrivilegeType::None);
        let none_denial = none_grant.clone_denied();

        let grants = Arc::new(grants);
        let denials = Arc::new(denials);
        let none_grant = Arc::new(none_grant);
        let none_denial = Arc::new(none_denial);

        PrivilegeCatalog {
            grants_by_index: index_nodes(&grants, &none_grant),
            denials_by_index: index_nodes(&denials, &none_denial),
            grants,
            denials,
            none_grant,
            none_denial,
        }
    }

    /// Shared catalog, built on first use.
    pub fn standard() -> Arc<PrivilegeCatalog> {
        STANDARD.clone()
    }

    /// Root of the grant tree (`all`).
    pub fn grants(&self) -> &Arc<Privilege> {
        &self.grants
    }

    /// Root of the denial tree (`all`, denied).
    pub fn denials(&self) -> &Arc<Privilege> {
        &self.denials
    }

    /// The grant node for `kind`.
    pub fn privilege(&self, kind: PrivilegeType) -> Arc<Privilege> {
        self.grants_by_index[kind.index()].clone()
    }

    /// The denial node for `kind`.
    pub fn denial(&self, kind: PrivilegeType) -> Arc<Privilege> {
        self.denials_by_index[kind.index()].clone()
    }

    /// Resolve privileges by their local names, e.g. `["read", "write-content"]`.
    pub fn privileges_named(&self, names: &[&str]) -> Result<Vec<Arc<Privilege>>> {
        names
            .iter()
            .map(|name| {
                PrivilegeType::from_str(name)
                    .map(|kind| self.privilege(kind))
                    .map_err(|_| AccessError::BadAce(format!("unknown privilege '{name}'")))
            })
            .collect()
    }

    /// Read one allow/deny flag and one privilege character from `acl` and
    /// return the matching tree node.
    pub fn find_priv(&self, acl: &mut EncodedAcl) -> Result<Arc<Privilege>> {
        let denial = match acl.get_char() {
            Some(ALLOWED_FLAG) | Some(OLD_ALLOWED_FLAG) => false,
            Some(DENIED_FLAG) | Some(OLD_DENIED_FLAG) => true,
            Some(c) => {
                return Err(AccessError::BadAce(format!(
                    "unknown privilege flag '{c}' at position {}",
                    acl.pos() - 1
                )));
            }
            None => {
                return Err(AccessError::BadAce(
                    "expected privilege flag, found end of acl".to_string(),
                ));
            }
        };

        let encoding = acl.get_char().ok_or_else(|| {
            AccessError::BadAce("expected privilege, found end of acl".to_string())
        })?;

        self.try_lookup(encoding, denial).cloned().ok_or_else(|| {
            AccessError::BadAce(format!(
                "unknown privilege '{encoding}' at position {}",
                acl.pos() - 1
            ))
        })
    }

    /// Read privileges until the end of the privilege list (a space, the
    /// inherited flag or the end of input), in encounter order. A missing
    /// terminator is left for the entry decoder to report.
    pub fn get_privs(&self, acl: &mut EncodedAcl) -> Result<Vec<Arc<Privilege>>> {
        let mut privs = Vec::new();

        loop {
            match acl.get_char() {
                Some(' ') | Some(crate::types::INHERITED_FLAG) => {
                    acl.back(1)?;
                    return Ok(privs);
                }
                Some(_) => {
                    acl.back(1)?;
                    privs.push(self.find_priv(acl)?);
                }
                None => return Ok(privs),
            }
        }
    }

    /// Every grant node in slot order.
    pub fn all_privileges(&self) -> Vec<Arc<Privilege>> {
        PrivilegeType::iter().map(|kind| self.privilege(kind)).collect()
    }

    fn try_lookup(&self, encoding: char, denial: bool) -> Option<&Arc<Privilege>> {
        let (root, none) = if denial {
            (&self.denials, &self.none_denial)
        } else {
            (&self.grants, &self.none_grant)
        };
        root.find(encoding).or_else(|| none.find(encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use yare::parameterized;

    #[test]
    fn test_encodings_are_unique() {
        let encodings: HashSet<char> = PrivilegeType::iter().map(|p| p.encoding()).collect();
        assert_eq!(encodings.len(), PRIVILEGE_COUNT);
        assert_eq!(PrivilegeType::iter().count(), PRIVILEGE_COUNT);
    }

    #[test]
    fn test_index_matches_iteration_order() {
        for (i, kind) in PrivilegeType::iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(PrivilegeType::from_index(i), Some(kind));
        }
        assert_eq!(PrivilegeType::All.index(), 0);
    }

    #[parameterized(
        all = { "all", PrivilegeType::All },
        read_cups = { "read-current-user-privilege-set", PrivilegeType::ReadCurrentUserPrivilegeSet },
        free_busy = { "read-free-busy", PrivilegeType::ReadFreeBusy },
        query_freebusy = { "schedule-query-freebusy", PrivilegeType::ScheduleQueryFreebusy },
        none = { "none", PrivilegeType::None },
    )]
    fn test_privilege_names(name: &str, kind: PrivilegeType) {
        assert_eq!(kind.name(), name);
        assert_eq!(PrivilegeType::from_str(name).unwrap(), kind);
    }

    #[test]
    fn test_every_type_is_in_the_catalog() {
        let catalog = PrivilegeCatalog::build();
        for kind in PrivilegeType::iter() {
            let grant = catalog.privilege(kind);
            let denial = catalog.denial(kind);
            assert_eq!(grant.kind(), kind);
            assert!(!grant.is_denial());
            assert_eq!(denial.kind(), kind);
            assert!(denial.is_denial());
        }
    }

    #[test]
    fn test_denial_tree_mirrors_grants() {
        let catalog = PrivilegeCatalog::build();
        fn shape(p: &Privilege) -> Vec<PrivilegeType> {
            let mut out = vec![p.kind()];
            for c in p.contained() {
                out.extend(shape(c));
            }
            out
        }
        assert_eq!(shape(catalog.grants()), shape(catalog.denials()));
        assert_eq!(shape(catalog.grants()).len(), PRIVILEGE_COUNT - 1);
    }

    #[test]
    fn test_containment() {
        let catalog = PrivilegeCatalog::build();
        let all = catalog.privilege(PrivilegeType::All);
        assert!(all.contains(PrivilegeType::ScheduleSendFreebusy));
        assert!(!all.contains(PrivilegeType::None));

        let read = catalog.privilege(PrivilegeType::Read);
        assert!(read.contains(PrivilegeType::ReadAcl));
        assert!(read.contains(PrivilegeType::ReadFreeBusy));
        assert!(!read.contains(PrivilegeType::Write));

        let bind = catalog.privilege(PrivilegeType::Bind);
        assert!(bind.contains(PrivilegeType::ScheduleReply));
        assert!(!bind.contains(PrivilegeType::Unbind));
    }

    #[parameterized(
        allowed_read = { "yR", PrivilegeType::Read, false },
        denied_write_content = { "nc", PrivilegeType::WriteContent, true },
        legacy_allowed = { "3A", PrivilegeType::All, false },
        legacy_denied = { "2u", PrivilegeType::Unbind, true },
        schedule_reply_char = { "yy", PrivilegeType::ScheduleReply, false },
        none = { "yN", PrivilegeType::None, false },
    )]
    fn test_find_priv(input: &str, kind: PrivilegeType, denial: bool) {
        let catalog = PrivilegeCatalog::build();
        let mut acl = EncodedAcl::new(input);
        let p = catalog.find_priv(&mut acl).unwrap();
        assert_eq!(p.kind(), kind);
        assert_eq!(p.is_denial(), denial);
    }

    #[parameterized(
        bad_flag = { "xR" },
        bad_priv = { "yZ" },
        truncated = { "y" },
        empty = { "" },
    )]
    fn test_find_priv_rejects(input: &str) {
        let catalog = PrivilegeCatalog::build();
        let mut acl = EncodedAcl::new(input);
        assert!(matches!(
            catalog.find_priv(&mut acl),
            Err(AccessError::BadAce(_))
        ));
    }

    #[test]
    fn test_get_privs_stops_at_terminator() {
        let catalog = PrivilegeCatalog::build();
        let mut acl = EncodedAcl::new("yRncI");
        let privs = catalog.get_privs(&mut acl).unwrap();
        let kinds: Vec<_> = privs.iter().map(|p| p.kind()).collect();
        assert_eq!(kinds, vec![PrivilegeType::Read, PrivilegeType::WriteContent]);
        assert_eq!(acl.get_char(), Some('I'));
    }

    #[test]
    fn test_get_privs_stops_at_end_of_input() {
        let catalog = PrivilegeCatalog::build();
        let mut acl = EncodedAcl::new("yR");
        let privs = catalog.get_privs(&mut acl).unwrap();
        assert_eq!(privs.len(), 1);
        assert!(!acl.has_more());
    }

    #[test]
    fn test_privilege_encode() {
        let catalog = PrivilegeCatalog::build();
        let mut enc = AclEncoder::new();
        catalog.privilege(PrivilegeType::Read).encode(&mut enc);
        catalog.denial(PrivilegeType::Unbind).encode(&mut enc);
        assert_eq!(enc.finish(), "yRnu");
    }

    #[test]
    fn test_privileges_named() {
        let catalog = PrivilegeCatalog::standard();
        let privs = catalog.privileges_named(&["read", "write-content"]).unwrap();
        assert_eq!(privs[0].kind(), PrivilegeType::Read);
        assert_eq!(privs[1].kind(), PrivilegeType::WriteContent);
        assert!(catalog.privileges_named(&["fly"]).is_err());
    }

    #[test]
    fn test_standard_catalog_is_shared() {
        assert!(Arc::ptr_eq(
            &PrivilegeCatalog::standard(),
            &PrivilegeCatalog::standard()
        ));
    }
}
