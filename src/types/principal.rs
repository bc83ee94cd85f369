//! The requesting principal, as seen by the evaluator.

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use super::who::WhoType;

/// What the evaluator needs to know about a requester or an owner.
///
/// Implemented by the host's principal type; [`Principal`] is a plain value
/// implementation.
pub trait AccessPrincipal: Send + Sync {
    /// The class of principal: user, group, host, ...
    fn kind(&self) -> WhoType;

    fn account(&self) -> &str;

    /// Canonical href, e.g. `/principals/users/alice`.
    fn principal_ref(&self) -> &str;

    fn unauthenticated(&self) -> bool;

    /// Hrefs of every group the principal belongs to, directly or
    /// transitively.
    fn group_names(&self) -> &BTreeSet<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    kind: WhoType,
    account: String,
    principal_ref: String,
    unauthenticated: bool,
    #[serde(default)]
    group_names: BTreeSet<String>,
}

impl Principal {
    pub fn new(kind: WhoType, account: impl Into<String>, principal_ref: impl Into<String>) -> Self {
        Principal {
            kind,
            account: account.into(),
            principal_ref: principal_ref.into(),
            unauthenticated: false,
            group_names: BTreeSet::new(),
        }
    }

    /// An authenticated user at `principal_ref`.
    pub fn user(account: impl Into<String>, principal_ref: impl Into<String>) -> Self {
        Principal::new(WhoType::User, account, principal_ref)
    }

    /// The anonymous principal.
    pub fn unauthenticated() -> Self {
        Principal {
            unauthenticated: true,
            ..Principal::new(WhoType::Unauthenticated, "", "")
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_names.extend(groups.into_iter().map(Into::into));
        self
    }
}

impl AccessPrincipal for Principal {
    fn kind(&self) -> WhoType {
        self.kind
    }

    fn account(&self) -> &str {
        &self.account
    }

    fn principal_ref(&self) -> &str {
        &self.principal_ref
    }

    fn unauthenticated(&self) -> bool {
        self.unauthenticated
    }

    fn group_names(&self) -> &BTreeSet<String> {
        &self.group_names
    }
}

impl Display for Principal {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.unauthenticated {
            f.write_str("unauthenticated")
        } else {
            write!(f, "{} {}", self.kind, self.principal_ref)
        }
    }
}
