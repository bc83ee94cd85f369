//! ACE principal selectors.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{EnumIter, IntoStaticStr};

use crate::codec::{AclEncoder, EncodedAcl};
use crate::error::{AccessError, Result};
use crate::traits::HrefResolver;

const WHO_FLAG: char = 'W';
const NOT_WHO_FLAG: char = 'N';

/// The class of principal an ACE applies to.
///
/// Declaration order is the sort order of ACEs within an ACL.
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
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WhoType {
    Owner,
    User,
    Group,
    Host,
    Ticket,
    Resource,
    Venue,
    Unauthenticated,
    Authenticated,
    Other,
    All,
}

impl WhoType {
    pub fn encoding(self) -> char {
        match self {
            Self::Owner => 'O',
            Self::User => 'U',
            Self::Group => 'G',
            Self::Host => 'H',
            Self::Ticket => 'T',
            Self::Resource => 'R',
            Self::Venue => 'V',
            Self::Unauthenticated => 'X',
            Self::Authenticated => 'A',
            Self::Other => 'Z',
            Self::All => 'L',
        }
    }

    pub fn from_encoding(c: char) -> Option<Self> {
        Self::iter().find(|w| w.encoding() == c)
    }

    /// Classes whose ACEs carry a principal name.
    pub fn is_named(self) -> bool {
        matches!(
            self,
            Self::User | Self::Group | Self::Host | Self::Ticket | Self::Resource | Self::Venue
        )
    }

    /// Named classes other than users and groups, evaluated in their own tier.
    pub fn is_resource_like(self) -> bool {
        matches!(
            self,
            Self::Host | Self::Ticket | Self::Resource | Self::Venue
        )
    }
}

impl Display for WhoType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let s: &'static str = (*self).into();
        f.write_str(s)
    }
}

/// Who an ACE applies to: a principal class, an optional name, and a
/// negation flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AceWho {
    name: Option<String>,
    who_type: WhoType,
    not_who: bool,
}

impl AceWho {
    /// Build a selector. Names given for unnamed classes are dropped.
    pub fn new<S: Into<String>>(name: Option<S>, who_type: WhoType, not_who: bool) -> Self {
        AceWho {
            name: name.filter(|_| who_type.is_named()).map(Into::into),
            who_type,
            not_who,
        }
    }

    pub fn owner() -> Self {
        AceWho::new(None::<String>, WhoType::Owner, false)
    }

    pub fn user(name: impl Into<String>) -> Self {
        AceWho::new(Some(name), WhoType::User, false)
    }

    pub fn group(name: impl Into<String>) -> Self {
        AceWho::new(Some(name), WhoType::Group, false)
    }

    pub fn authenticated() -> Self {
        AceWho::new(None::<String>, WhoType::Authenticated, false)
    }

    pub fn unauthenticated() -> Self {
        AceWho::new(None::<String>, WhoType::Unauthenticated, false)
    }

    pub fn other() -> Self {
        AceWho::new(None::<String>, WhoType::Other, false)
    }

    pub fn all() -> Self {
        AceWho::new(None::<String>, WhoType::All, false)
    }

    /// Same selector, negated.
    pub fn negated(mut self) -> Self {
        self.not_who = !self.not_who;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn who_type(&self) -> WhoType {
        self.who_type
    }

    pub fn not_who(&self) -> bool {
        self.not_who
    }

    /// Does this selector match the principal at `requestor_href`?
    ///
    /// The selector's name is resolved through `resolver` with this
    /// selector's type. A missing name matches any requestor; a missing
    /// requestor only matches a missing name. The result is inverted for
    /// negated selectors.
    pub fn who_match(&self, resolver: &dyn HrefResolver, requestor_href: Option<&str>) -> bool {
        let matched = match (&self.name, requestor_href) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(name), Some(href)) => resolver.principal_href(name, self.who_type) == href,
        };
        matched != self.not_who
    }

    pub fn encode(&self, enc: &mut AclEncoder) {
        enc.add_char(if self.not_who { NOT_WHO_FLAG } else { WHO_FLAG });
        enc.add_char(self.who_type.encoding());
        enc.encode_string(self.name.as_deref());
    }

    pub fn decode(acl: &mut EncodedAcl) -> Result<Self> {
        let not_who = match acl.get_char() {
            Some(WHO_FLAG) => false,
            Some(NOT_WHO_FLAG) => true,
            Some(c) => {
                return Err(AccessError::BadAce(format!(
                    "unknown who flag '{c}' at position {}",
                    acl.pos() - 1
                )));
            }
            None => {
                return Err(AccessError::BadAce(
                    "expected who flag, found end of acl".to_string(),
                ));
            }
        };

        let who_type = match acl.get_char() {
            Some(c) => WhoType::from_encoding(c).ok_or_else(|| {
                AccessError::BadAce(format!(
                    "unknown who type '{c}' at position {}",
                    acl.pos() - 1
                ))
            })?,
            None => {
                return Err(AccessError::BadAce(
                    "expected who type, found end of acl".to_string(),
                ));
            }
        };

        let name = acl.get_string()?;

        Ok(AceWho {
            name,
            who_type,
            not_who,
        })
    }
}

/// Negated selectors first, then by class, then by name (absent first).
impl Ord for AceWho {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .not_who
            .cmp(&self.not_who)
            .then_with(|| self.who_type.cmp(&other.who_type))
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for AceWho {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for AceWho {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.not_who {
            f.write_str("not ")?;
        }
        match &self.name {
            Some(name) => write!(f, "{} {name}", self.who_type),
            None => write!(f, "{}", self.who_type),
        }
    }
}
