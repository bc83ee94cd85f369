//! Data model: ACE selectors, entries, lists, principals and results.
//!
//! Encoded forms (one line, no separators between entries):
//! - Selector: `W`/`N` (who/not-who), a type character, an encoded name.
//! - Entry: selector, one or more flag+privilege pairs, an optional
//!   `I` + encoded path, then a space.
//! - Encoded string: `N` for none, else `0<len> ` followed by the characters.

mod ace;
mod acl;
mod current_access;
mod principal;
mod who;

pub use ace::{Ace, INHERITED_FLAG};
pub use acl::Acl;
pub use current_access::CurrentAccess;
pub use principal::{AccessPrincipal, Principal};
pub use who::{AceWho, WhoType};
