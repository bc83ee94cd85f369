//! Per-privilege access states and the algebra used to combine them.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::privileges::{PRIVILEGE_COUNT, Privilege, PrivilegeType};

/// State of a single privilege slot.
///
/// Ordered by strength when merging:
/// `Allowed > Denied > AllowedInherited > DeniedInherited > Unspecified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrivilegeState {
    Allowed,
    Denied,
    AllowedInherited,
    DeniedInherited,
    Unspecified,
}

impl PrivilegeState {
    fn strength(self) -> u8 {
        match self {
            Self::Allowed => 4,
            Self::Denied => 3,
            Self::AllowedInherited => 2,
            Self::DeniedInherited => 1,
            Self::Unspecified => 0,
        }
    }

    /// `Allowed` or `AllowedInherited`.
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed | Self::AllowedInherited)
    }

    /// `Denied` or `DeniedInherited`.
    pub fn is_denied(self) -> bool {
        matches!(self, Self::Denied | Self::DeniedInherited)
    }

    pub fn is_specified(self) -> bool {
        self != Self::Unspecified
    }

    /// The inherited counterpart of a concrete state.
    pub fn inherited(self) -> Self {
        match self {
            Self::Allowed => Self::AllowedInherited,
            Self::Denied => Self::DeniedInherited,
            other => other,
        }
    }

    /// Single character used when rendering a set for diagnostics.
    pub fn code(self) -> char {
        match self {
            Self::Allowed => 'y',
            Self::Denied => 'n',
            Self::AllowedInherited => 'Y',
            Self::DeniedInherited => 'N',
            Self::Unspecified => '?',
        }
    }
}

impl Ord for PrivilegeState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.strength().cmp(&other.strength())
    }
}

impl PartialOrd for PrivilegeState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Set `node` and everything it contains to allowed or denied.
///
/// A denial only fills slots that are still unspecified; a grant always wins.
pub(crate) fn expand_states(states: &mut [PrivilegeState; PRIVILEGE_COUNT], node: &Privilege) {
    let slot = &mut states[node.index()];
    if node.is_denial() {
        if *slot == PrivilegeState::Unspecified {
            *slot = PrivilegeState::Denied;
        }
    } else {
        *slot = PrivilegeState::Allowed;
    }

    for child in node.contained() {
        expand_states(states, child);
    }
}

/// One state per privilege slot. Slot 0 is always `all`.
///
/// Values are immutable; every operation returns a new set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrivilegeSet {
    states: [PrivilegeState; PRIVILEGE_COUNT],
}

impl Default for PrivilegeSet {
    fn default() -> Self {
        PrivilegeSet::unspecified()
    }
}

impl PrivilegeSet {
    /// A set with every slot unspecified.
    pub fn unspecified() -> Self {
        Self::filled(PrivilegeState::Unspecified)
    }

    fn filled(state: PrivilegeState) -> Self {
        PrivilegeSet {
            states: [state; PRIVILEGE_COUNT],
        }
    }

    /// Everything allowed.
    pub fn default_owner_privileges() -> Self {
        Self::filled(PrivilegeState::Allowed)
    }

    /// Read access only, everything else denied.
    pub fn default_non_owner_privileges() -> Self {
        let mut set = Self::filled(PrivilegeState::Denied);
        for kind in [
            PrivilegeType::Read,
            PrivilegeType::ReadAcl,
            PrivilegeType::ReadCurrentUserPrivilegeSet,
            PrivilegeType::ReadFreeBusy,
        ] {
            set.states[kind.index()] = PrivilegeState::Allowed;
        }
        set
    }

    /// The set granted (or denied) by a single privilege, including the
    /// privileges it contains.
    pub fn from_privilege(privilege: &Privilege) -> Self {
        Self::unspecified().add_privilege(privilege)
    }

    pub fn from_privileges<P: AsRef<Privilege>>(privileges: &[P]) -> Self {
        privileges
            .iter()
            .fold(Self::unspecified(), |set, p| set.add_privilege(p.as_ref()))
    }

    /// Copy of this set with `privilege` applied on top.
    pub fn add_privilege(&self, privilege: &Privilege) -> Self {
        let mut states = self.states;
        expand_states(&mut states, privilege);
        PrivilegeSet { states }
    }

    /// Copy of this set with a single slot replaced.
    pub fn with_state(&self, kind: PrivilegeType, state: PrivilegeState) -> Self {
        let mut states = self.states;
        states[kind.index()] = state;
        PrivilegeSet { states }
    }

    /// Combine `more` into `current`, keeping the stronger state per slot.
    ///
    /// With `inherited`, concrete states in `more` are first turned into
    /// their inherited counterparts.
    pub fn merge(current: Option<&PrivilegeSet>, more: &PrivilegeSet, inherited: bool) -> Self {
        let mut more = *more;
        if inherited {
            for state in more.states.iter_mut() {
                *state = state.inherited();
            }
        }

        let Some(current) = current else {
            return more;
        };

        let mut states = current.states;
        for (slot, incoming) in states.iter_mut().zip(more.states) {
            if incoming > *slot {
                *slot = incoming;
            }
        }
        PrivilegeSet { states }
    }

    /// Clamp this set to an upper bound.
    ///
    /// A slot is lowered to the filter's value when it would otherwise be
    /// allowed where the filter denies, or when it is unspecified and the
    /// filter is explicit. Unspecified filter slots do not constrain.
    pub fn filter(&self, filter: &PrivilegeSet) -> Self {
        let mut states = self.states;
        for (slot, bound) in states.iter_mut().zip(filter.states) {
            if !bound.is_specified() {
                continue;
            }
            if !slot.is_specified() || (slot.is_allowed() && bound.is_denied()) {
                *slot = bound;
            }
        }
        PrivilegeSet { states }
    }

    /// Resolve unspecified slots: allowed for the owner, denied otherwise.
    pub fn set_unspecified(&self, is_owner: bool) -> Self {
        let default = if is_owner {
            PrivilegeState::Allowed
        } else {
            PrivilegeState::Denied
        };
        let mut states = self.states;
        for state in states.iter_mut() {
            if *state == PrivilegeState::Unspecified {
                *state = default;
            }
        }
        PrivilegeSet { states }
    }

    pub fn any_allowed(&self) -> bool {
        self.states.iter().any(|s| s.is_allowed())
    }

    pub fn get_privilege(&self, index: usize) -> Option<PrivilegeState> {
        self.states.get(index).copied()
    }

    pub fn state(&self, kind: PrivilegeType) -> PrivilegeState {
        self.states[kind.index()]
    }

    pub fn states(&self) -> &[PrivilegeState; PRIVILEGE_COUNT] {
        &self.states
    }

    /// Privileges whose slot resolves to allowed, in slot order.
    pub fn allowed_types(&self) -> Vec<PrivilegeType> {
        PrivilegeType::iter()
            .filter(|kind| self.state(*kind).is_allowed())
            .collect()
    }
}

impl Display for PrivilegeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        for state in &self.states {
            write!(f, "{}", state.code())?;
        }
        Ok(())
    }
}
