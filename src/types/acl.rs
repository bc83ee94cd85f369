//! Access control lists and their encoded form.

use std::collections::BTreeMap;
use std::collections::btree_map::Values;
use std::fmt::{Display, Formatter, Result as FmtResult};

use itertools::Itertools;
use tracing::trace;

use crate::codec::{AclEncoder, EncodedAcl};
use crate::error::Result;
use crate::privilege_set::PrivilegeSet;
use crate::privileges::PrivilegeCatalog;
use crate::traits::HrefResolver;

use super::ace::{Ace, PathStamp};
use super::who::{AceWho, WhoType};

/// The entries of one entity, keyed and ordered by [`AceWho`].
///
/// There is at most one entry per selector; adding an entry for a selector
/// already present replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Acl {
    aces: BTreeMap<AceWho, Ace>,
}

impl Acl {
    pub fn new() -> Self {
        Acl::default()
    }

    /// Insert `ace`, replacing any entry for the same selector.
    pub fn add_ace(&mut self, ace: Ace) -> Option<Ace> {
        self.aces.insert(ace.who().clone(), ace)
    }

    pub fn with_ace(mut self, ace: Ace) -> Self {
        self.add_ace(ace);
        self
    }

    pub fn get(&self, who: &AceWho) -> Option<&Ace> {
        self.aces.get(who)
    }

    /// Entries in selector order.
    pub fn aces(&self) -> Values<'_, AceWho, Ace> {
        self.aces.values()
    }

    pub fn len(&self) -> usize {
        self.aces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aces.is_empty()
    }

    /// A copy without the entry for `who`, or `None` if there was no such
    /// entry.
    pub fn remove_who(&self, who: &AceWho) -> Option<Acl> {
        if !self.aces.contains_key(who) {
            return None;
        }
        let mut aces = self.aces.clone();
        aces.remove(who);
        Some(Acl { aces })
    }

    /// Decode a complete encoded ACL. Entries carrying no inherited marker
    /// are stamped with `path`.
    pub fn decode(catalog: &PrivilegeCatalog, text: &str, path: Option<&str>) -> Result<Acl> {
        let stamp = match path {
            Some(path) => PathStamp::Default(path),
            None => PathStamp::Encoded,
        };
        Self::decode_stamped(catalog, text, stamp)
    }

    fn decode_stamped(catalog: &PrivilegeCatalog, text: &str, stamp: PathStamp<'_>) -> Result<Acl> {
        let mut acl = EncodedAcl::new(text);
        let mut aces = BTreeMap::new();
        while acl.has_more() {
            let ace = Ace::decode_stamped(catalog, &mut acl, stamp)?;
            aces.insert(ace.who().clone(), ace);
        }
        trace!(event = "Acl", phase = "Decoded", aces = aces.len());
        Ok(Acl { aces })
    }

    /// Encode the locally declared entries. Inherited entries are left out.
    pub fn encode(&self) -> String {
        self.encode_filtered(|ace| !ace.is_inherited())
    }

    /// Encode every entry, inherited ones included.
    pub fn encode_all(&self) -> String {
        self.encode_filtered(|_| true)
    }

    fn encode_filtered(&self, keep: impl Fn(&Ace) -> bool) -> String {
        let mut enc = AclEncoder::new();
        for ace in self.aces.values().filter(|&ace| keep(ace)) {
            ace.encode(&mut enc);
        }
        enc.finish()
    }

    /// Treat `self` as the parent ACL and overlay the encoded ACL of a
    /// nearer entity at `path`.
    ///
    /// Every child entry is stamped as inherited from `path`, replacing any
    /// marker already encoded in `child`; `Acl::decode(text, Some(path))`
    /// instead keeps an encoded marker. Child entries replace parent
    /// entries with the same selector.
    pub fn merge(&self, catalog: &PrivilegeCatalog, child: &str, path: &str) -> Result<Acl> {
        let mut merged = Self::decode_stamped(catalog, child, PathStamp::Override(path))?;
        for (who, ace) in &self.aces {
            merged
                .aces
                .entry(who.clone())
                .or_insert_with(|| ace.clone());
        }
        Ok(merged)
    }

    /// Combined privileges of every entry of class `who_type` that matches
    /// the principal at `href`, or `None` if no entry matched.
    ///
    /// Inherited entries contribute inherited states.
    pub fn privileges_for(
        &self,
        resolver: &dyn HrefResolver,
        who_type: WhoType,
        href: Option<&str>,
    ) -> Option<PrivilegeSet> {
        self.aces
            .values()
            .filter(|ace| ace.who().who_type() == who_type)
            .filter(|ace| ace.who().who_match(resolver, href))
            .fold(None, |acc, ace| {
                Some(PrivilegeSet::merge(
                    acc.as_ref(),
                    ace.how(),
                    ace.is_inherited(),
                ))
            })
    }
}

impl FromIterator<Ace> for Acl {
    fn from_iter<I: IntoIterator<Item = Ace>>(iter: I) -> Self {
        let mut acl = Acl::new();
        for ace in iter {
            acl.add_ace(ace);
        }
        acl
    }
}

impl Display for Acl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.aces.values().join("; "))
    }
}
