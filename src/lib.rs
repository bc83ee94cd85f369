// src/lib.rs
//! WebDAV/CalDAV access control: the compact ACL codec, the privilege
//! taxonomy, and cached evaluation of a requester's access to an entity.

pub use access::Access;
pub use cache::{CacheKey, EvaluationCache};
pub use error::{AccessError, Result};
pub use privilege_set::{PrivilegeSet, PrivilegeState};
pub use privileges::{PRIVILEGE_COUNT, Privilege, PrivilegeCatalog, PrivilegeType};
pub use traits::HrefResolver;
pub use types::{AccessPrincipal, Ace, AceWho, Acl, CurrentAccess, Principal, WhoType};

mod access;
mod cache;
pub mod codec;
mod error;
pub mod metrics;
mod privilege_set;
mod privileges;
mod timers;
mod traits;
mod types;
