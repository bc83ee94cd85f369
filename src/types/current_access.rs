use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::privilege_set::PrivilegeSet;

/// Outcome of one evaluation.
///
/// `privileges` is `None` when no entry applied to the requester at all.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrentAccess {
    privileges: Option<PrivilegeSet>,
    access_allowed: bool,
}

impl CurrentAccess {
    pub fn new(privileges: Option<PrivilegeSet>, access_allowed: bool) -> Self {
        CurrentAccess {
            privileges,
            access_allowed,
        }
    }

    /// No applicable entry, no access.
    pub fn denied() -> Self {
        CurrentAccess::new(None, false)
    }

    pub fn privileges(&self) -> Option<&PrivilegeSet> {
        self.privileges.as_ref()
    }

    pub fn access_allowed(&self) -> bool {
        self.access_allowed
    }
}

impl Display for CurrentAccess {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let verdict = if self.access_allowed { "allowed" } else { "denied" };
        match &self.privileges {
            Some(privs) => write!(f, "{verdict} [{privs}]"),
            None => write!(f, "{verdict} [no privileges]"),
        }
    }
}
