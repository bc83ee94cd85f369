//! Access control entries.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::Arc;

use itertools::Itertools;

use crate::codec::{AclEncoder, EncodedAcl};
use crate::error::{AccessError, Result};
use crate::privilege_set::PrivilegeSet;
use crate::privileges::{Privilege, PrivilegeCatalog};

use super::who::AceWho;

/// Marks the path an entry was inherited from.
pub const INHERITED_FLAG: char = 'I';

/// How a decode stamps the inherited-from path onto entries.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PathStamp<'a> {
    /// Use the encoded marker, if any.
    Encoded,
    /// Use the encoded marker, falling back to this path.
    Default(&'a str),
    /// Always use this path, discarding any encoded marker.
    Override(&'a str),
}

/// One (who, privileges, inherited-from) rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ace {
    who: AceWho,
    privs: Vec<Arc<Privilege>>,
    how: PrivilegeSet,
    inherited_from: Option<String>,
}

impl Ace {
    /// Build an entry; the privilege set is derived from `privs` in order.
    pub fn new(who: AceWho, privs: Vec<Arc<Privilege>>, inherited_from: Option<String>) -> Self {
        let how = PrivilegeSet::from_privileges(&privs);
        Ace {
            who,
            privs,
            how,
            inherited_from,
        }
    }

    pub fn who(&self) -> &AceWho {
        &self.who
    }

    /// The privileges as declared, in order.
    pub fn privs(&self) -> &[Arc<Privilege>] {
        &self.privs
    }

    /// The resolved privilege set, implied privileges included.
    pub fn how(&self) -> &PrivilegeSet {
        &self.how
    }

    pub fn inherited_from(&self) -> Option<&str> {
        self.inherited_from.as_deref()
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited_from.is_some()
    }

    /// Copy of this entry with a different origin.
    pub fn with_inherited_from(&self, path: Option<String>) -> Self {
        Ace {
            inherited_from: path,
            ..self.clone()
        }
    }

    /// Decode one entry. Entries without an inherited marker are stamped
    /// with `context_path`.
    pub fn decode(
        catalog: &PrivilegeCatalog,
        acl: &mut EncodedAcl,
        context_path: Option<&str>,
    ) -> Result<Self> {
        let stamp = match context_path {
            Some(path) => PathStamp::Default(path),
            None => PathStamp::Encoded,
        };
        Self::decode_stamped(catalog, acl, stamp)
    }

    pub(crate) fn decode_stamped(
        catalog: &PrivilegeCatalog,
        acl: &mut EncodedAcl,
        stamp: PathStamp<'_>,
    ) -> Result<Self> {
        let who = AceWho::decode(acl)?;
        let privs = catalog.get_privs(acl)?;
        let how = PrivilegeSet::from_privileges(&privs);

        let mut inherited_from = None;
        match acl.get_char() {
            Some(INHERITED_FLAG) => {
                if let PathStamp::Override(_) = stamp {
                    acl.skip_string()?;
                } else {
                    inherited_from = acl.get_string()?;
                }
            }
            Some(_) => acl.back(1)?,
            None => {}
        }

        if inherited_from.is_none() {
            inherited_from = match stamp {
                PathStamp::Encoded => None,
                PathStamp::Default(path) | PathStamp::Override(path) => Some(path.to_string()),
            };
        }

        match acl.get_char() {
            Some(' ') => {}
            Some(c) => {
                return Err(AccessError::BadAcl(format!(
                    "expected end of ace, found '{c}' at position {}",
                    acl.pos() - 1
                )));
            }
            None => {
                return Err(AccessError::BadAcl(
                    "expected end of ace, found end of acl".to_string(),
                ));
            }
        }

        Ok(Ace {
            who,
            privs,
            how,
            inherited_from,
        })
    }

    pub fn encode(&self, enc: &mut AclEncoder) {
        self.who.encode(enc);
        for p in &self.privs {
            p.encode(enc);
        }
        if let Some(path) = &self.inherited_from {
            enc.add_char(INHERITED_FLAG);
            enc.encode_string(Some(path));
        }
        enc.add_char(' ');
    }
}

impl Display for Ace {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}: {}", self.who, self.privs.iter().join(" "))?;
        if let Some(path) = &self.inherited_from {
            write!(f, " (inherited from {path})")?;
        }
        Ok(())
    }
}
