use crate::types::WhoType;

/// Principal directory lookup: maps a name used in an ACE to the canonical
/// href of that principal, e.g. (`alice`, `User`) to `/principals/users/alice`.
///
/// Supplied by the host application; the engine only compares hrefs.
pub trait HrefResolver: Send + Sync {
    fn principal_href(&self, name: &str, who_type: WhoType) -> String;
}

impl<F> HrefResolver for F
where
    F: Fn(&str, WhoType) -> String + Send + Sync,
{
    fn principal_href(&self, name: &str, who_type: WhoType) -> String {
        self(name, who_type)
    }
}
