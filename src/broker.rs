//! Connection brokering.
//!
//! Resolves a catalog name to a live engine connection. Hosted catalogs are
//! opened on the local engine under an effective role; remote catalogs go
//! through the driver registered for them.

use std::sync::Arc;

use log::debug;

use crate::access::Permission;
use crate::connection::{OlapConnection, Properties, RoleHandle, RoleRegistry, LOCALE_PROPERTY};
use crate::error::{OlapResult, OlapServiceError};
use crate::filter::remote_connection_properties;
use crate::registry::CatalogRegistry;
use crate::security::{Role, Session};
use crate::service::OlapService;

/// Keeps a fixed role registered with the engine for the duration of one
/// `connect` call.
struct RoleRegistration<'a> {
    registry: &'a dyn RoleRegistry,
    handle: RoleHandle,
}

impl<'a> RoleRegistration<'a> {
    fn register(registry: &'a dyn RoleRegistry, role: Arc<dyn Role>) -> Self {
        let handle = registry.register(role);
        Self { registry, handle }
    }

    fn moniker(&self) -> &str {
        self.handle.moniker()
    }
}

impl Drop for RoleRegistration<'_> {
    fn drop(&mut self) {
        self.registry.deregister(&self.handle);
    }
}

impl OlapService {
    /// Open a connection to `catalog` on behalf of `session`.
    ///
    /// `None` opens a connection to the service's default data source with
    /// no catalog or role; discovery requests use it to enumerate data
    /// sources. The caller owns the returned connection and must close it.
    pub fn connect(
        &self,
        catalog: Option<&str>,
        session: Option<&Session>,
    ) -> OlapResult<Box<dyn OlapConnection>> {
        let locale = self.resolve_locale(session);
        self.connect_with_locale(catalog, session, &locale)
    }

    pub(crate) fn connect_with_locale(
        &self,
        catalog: Option<&str>,
        session: Option<&Session>,
        locale: &str,
    ) -> OlapResult<Box<dyn OlapConnection>> {
        let Some(name) = catalog else {
            return self.connect_default();
        };

        if !self.has_access(name, &[Permission::Read], session) {
            debug!("User does not have read access to catalog {name}");
            return Err(OlapServiceError::access_denied(name));
        }

        self.open_catalog(name, session, locale)
    }

    /// Open `name` without the Read check. Cache rebuilds use this so the
    /// shared list does not depend on who triggered the rebuild; readers are
    /// filtered when the list is served.
    pub(crate) fn open_catalog(
        &self,
        name: &str,
        session: Option<&Session>,
        locale: &str,
    ) -> OlapResult<Box<dyn OlapConnection>> {
        let registry = self.registry()?;
        if registry.remote_names()?.iter().any(|n| n == name) {
            return self.connect_remote(registry.as_ref(), name);
        }
        if !registry.hosted_names()?.iter().any(|n| n == name) {
            return Err(OlapServiceError::NotFound(name.to_string()));
        }

        self.connect_hosted(name, session, locale)
    }

    fn connect_default(&self) -> OlapResult<Box<dyn OlapConnection>> {
        let data_source = &self.config.data_source_name;
        self.engine()?
            .open_connection(data_source, None, None, &Properties::new())
            .map_err(|e| {
                OlapServiceError::engine(
                    format!("Failed to open connection to data source {data_source}"),
                    e,
                )
            })
    }

    fn connect_hosted(
        &self,
        name: &str,
        session: Option<&Session>,
        locale: &str,
    ) -> OlapResult<Box<dyn OlapConnection>> {
        let engine = self.engine()?;

        // Deregistered when this guard drops, whether or not the open succeeds.
        let registration = self
            .role
            .as_ref()
            .map(|role| RoleRegistration::register(engine.role_registry(), Arc::clone(role)));

        let role = match &registration {
            Some(registration) => registration.moniker().to_string(),
            None => self.mapped_roles(name, session)?.join(","),
        };

        let mut properties = Properties::new();
        properties.insert(LOCALE_PROPERTY.to_string(), locale.to_string());

        engine
            .open_connection(
                &self.config.data_source_name,
                Some(name),
                (!role.is_empty()).then_some(role.as_str()),
                &properties,
            )
            .map_err(|e| {
                OlapServiceError::engine(format!("Failed to open connection to catalog {name}"), e)
            })
    }

    /// Roles the mapper assigns to `session` on `catalog`.
    ///
    /// Without a session or without a mapper the list is empty and the
    /// connection is opened with no role restriction at all. Deployments
    /// relying on role mapping for isolation must install a mapper.
    fn mapped_roles(&self, catalog: &str, session: Option<&Session>) -> OlapResult<Vec<String>> {
        match (session, &self.role_mapper) {
            (Some(session), Some(mapper)) => Ok(mapper
                .map_connection_roles(session, catalog)?
                .unwrap_or_default()),
            _ => Ok(Vec::new()),
        }
    }

    fn connect_remote(
        &self,
        registry: &dyn CatalogRegistry,
        name: &str,
    ) -> OlapResult<Box<dyn OlapConnection>> {
        let info = registry.remote_info(name)?;

        let driver = self.drivers.get(&info.class_name).ok_or_else(|| {
            OlapServiceError::config(format!(
                "No driver registered for {} (catalog {name})",
                info.class_name
            ))
        })?;

        let properties = remote_connection_properties(&info, &self.filters);

        driver.connect(&info.url, &properties).map_err(|e| {
            OlapServiceError::engine(format!("Failed to connect to remote catalog {name}"), e)
        })
    }
}
