//! Subjects, roles and the hooks the broker uses to scope connections.

use std::fmt;

use crate::error::OlapResult;

pub const SYSTEM_USER: &str = "system";

/// The caller on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    locale: Option<String>,
}

impl Session {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: None,
        }
    }

    /// Identity used for work that must see every catalog (cache rebuilds,
    /// descriptor generation) when security is enabled.
    pub fn system() -> Self {
        Self::new(SYSTEM_USER)
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }
}

/// A fixed role object. When one is configured on the service it replaces
/// per-subject role mapping for every hosted connection.
pub trait Role: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
}

/// Maps a subject to the engine role names it gets on a catalog.
///
/// Returning `Ok(None)` is treated like an empty list: the connection is
/// opened without any role restriction.
pub trait RoleMapper: Send + Sync {
    fn map_connection_roles(
        &self,
        session: &Session,
        catalog: &str,
    ) -> OlapResult<Option<Vec<String>>>;
}

pub trait SecurityHelper: Send + Sync {
    /// Probed once per service instance; the answer is cached for its
    /// lifetime.
    fn is_security_enabled(&self) -> bool;

    fn system_session(&self) -> Session {
        Session::system()
    }
}

/// Security layer for deployments without user management.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecurity;

impl SecurityHelper for NoSecurity {
    fn is_security_enabled(&self) -> bool {
        false
    }
}
