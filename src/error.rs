use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding or evaluating access control lists.
///
/// Every variant is a data-validation failure; none of them is transient.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessError {
    #[error("cannot rewind {count} position(s) from position {pos}")]
    Rewind { pos: usize, count: usize },

    #[error("bad length: {0}")]
    Length(String),

    #[error("bad ace: {0}")]
    BadAce(String),

    #[error("bad acl: {0}")]
    BadAcl(String),

    #[error("bad xml acl: {0}")]
    BadXmlAcl(String),

    #[error("Poisoned lock error: {0}")]
    PoisonedLock(String),
}

impl<T> From<std::sync::PoisonError<T>> for AccessError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        AccessError::PoisonedLock(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AccessError>;
