use std::fmt;

use crate::security::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
    Delete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "READ",
            Permission::Write => "WRITE",
            Permission::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean permission check keyed by resource, permission set and subject.
/// Every permission in `permissions` must be granted.
pub trait AccessGate: Send + Sync {
    fn has_access(
        &self,
        resource: &str,
        permissions: &[Permission],
        session: Option<&Session>,
    ) -> bool;
}

/// Gate used when no access-control subsystem is installed.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn has_access(&self, _: &str, _: &[Permission], _: Option<&Session>) -> bool {
        true
    }
}

/// Keep the items whose name the subject may read. Order is preserved.
pub fn filter_readable<T, F>(
    items: impl IntoIterator<Item = T>,
    gate: &dyn AccessGate,
    session: Option<&Session>,
    name_of: F,
) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    items
        .into_iter()
        .filter(|item| gate.has_access(name_of(item), &[Permission::Read], session))
        .collect()
}
