//! The OLAP service: catalog metadata cache plus connection broker.
//!
//! One [`OlapService`] owns a single reader/writer lock. Cache reads take it
//! shared; cache population, region creation, invalidation and flushes take
//! it exclusively and hold it for their whole duration. Brokering a
//! connection takes no lock at all.
//!
//! The operations are split by concern:
//!
//! - [`crate::cache`]: `catalogs`, `schemas`, `cubes`, `invalidate`
//! - [`crate::broker`]: `connect`
//! - [`crate::refresh`]: `refresh`, `flush`, `flush_all`
//! - [`crate::admin`]: catalog registration and removal
//! - [`crate::datasources`]: the XML data-source descriptor

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::access::{AccessGate, AllowAll, Permission};
use crate::config::ServiceConfig;
use crate::connection::{QueryEngine, RemoteDriver};
use crate::engine::DuckDbEngine;
use crate::error::OlapResult;
use crate::filter::ConnectionFilter;
use crate::lazy::InitOnce;
use crate::region_cache::{InMemoryRegionCache, RegionCache};
use crate::registry::{CatalogRegistry, InMemoryCatalogRegistry};
use crate::security::{NoSecurity, Role, RoleMapper, SecurityHelper, Session};

/// Region of the [`RegionCache`] holding catalog lists, keyed by locale.
pub const CATALOG_CACHE_REGION: &str = "iolapservice-catalog-cache";

pub struct OlapService {
    pub(crate) config: ServiceConfig,
    pub(crate) cache_lock: RwLock<()>,
    pub(crate) regions: Arc<dyn RegionCache>,
    pub(crate) access: Arc<dyn AccessGate>,
    registry: InitOnce<Arc<dyn CatalogRegistry>>,
    engine: InitOnce<Arc<dyn QueryEngine>>,
    security: Arc<dyn SecurityHelper>,
    security_enabled: OnceLock<bool>,
    pub(crate) role_mapper: Option<Arc<dyn RoleMapper>>,
    pub(crate) role: Option<Arc<dyn Role>>,
    pub(crate) filters: Vec<Arc<dyn ConnectionFilter>>,
    pub(crate) drivers: HashMap<String, Arc<dyn RemoteDriver>>,
}

impl OlapService {
    pub fn builder(config: ServiceConfig) -> OlapServiceBuilder {
        OlapServiceBuilder::new(config)
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub(crate) fn registry(&self) -> OlapResult<&Arc<dyn CatalogRegistry>> {
        self.registry.get()
    }

    pub(crate) fn engine(&self) -> OlapResult<&Arc<dyn QueryEngine>> {
        self.engine.get()
    }

    pub(crate) fn is_security_enabled(&self) -> bool {
        *self
            .security_enabled
            .get_or_init(|| self.security.is_security_enabled())
    }

    pub(crate) fn has_access(
        &self,
        catalog: &str,
        permissions: &[Permission],
        session: Option<&Session>,
    ) -> bool {
        self.access.has_access(catalog, permissions, session)
    }

    /// Run `work` as the system identity when security is enabled, otherwise
    /// as the caller.
    pub(crate) fn run_privileged<T, F>(&self, session: Option<&Session>, work: F) -> OlapResult<T>
    where
        F: FnOnce(Option<&Session>) -> OlapResult<T>,
    {
        if self.is_security_enabled() {
            let system = self.security.system_session();
            work(Some(&system))
        } else {
            work(session)
        }
    }

    pub(crate) fn resolve_locale(&self, session: Option<&Session>) -> String {
        session
            .and_then(Session::locale)
            .unwrap_or(self.config.default_locale.as_str())
            .to_string()
    }

    // A panic while a guard is held can only interrupt a rebuild before the
    // new list is published, so a poisoned lock still guards consistent data.
    pub(crate) fn read_lock(&self) -> RwLockReadGuard<'_, ()> {
        self.cache_lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_lock(&self) -> RwLockWriteGuard<'_, ()> {
        self.cache_lock.write().unwrap_or_else(PoisonError::into_inner)
    }
}

type Factory<T> = Box<dyn Fn() -> OlapResult<T> + Send + Sync>;

pub struct OlapServiceBuilder {
    config: ServiceConfig,
    engine: Option<Factory<Arc<dyn QueryEngine>>>,
    registry: Option<Factory<Arc<dyn CatalogRegistry>>>,
    regions: Option<Arc<dyn RegionCache>>,
    access: Option<Arc<dyn AccessGate>>,
    security: Option<Arc<dyn SecurityHelper>>,
    role_mapper: Option<Arc<dyn RoleMapper>>,
    role: Option<Arc<dyn Role>>,
    filters: Vec<Arc<dyn ConnectionFilter>>,
    drivers: HashMap<String, Arc<dyn RemoteDriver>>,
}

impl OlapServiceBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            engine: None,
            registry: None,
            regions: None,
            access: None,
            security: None,
            role_mapper: None,
            role: None,
            filters: Vec::new(),
            drivers: HashMap::new(),
        }
    }

    pub fn engine(self, engine: Arc<dyn QueryEngine>) -> Self {
        self.engine_factory(move || Ok(Arc::clone(&engine)))
    }

    /// Defer engine creation to first use.
    pub fn engine_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> OlapResult<Arc<dyn QueryEngine>> + Send + Sync + 'static,
    {
        self.engine = Some(Box::new(factory));
        self
    }

    pub fn registry(self, registry: Arc<dyn CatalogRegistry>) -> Self {
        self.registry_factory(move || Ok(Arc::clone(&registry)))
    }

    pub fn registry_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> OlapResult<Arc<dyn CatalogRegistry>> + Send + Sync + 'static,
    {
        self.registry = Some(Box::new(factory));
        self
    }

    pub fn region_cache(mut self, regions: Arc<dyn RegionCache>) -> Self {
        self.regions = Some(regions);
        self
    }

    pub fn access_gate(mut self, access: Arc<dyn AccessGate>) -> Self {
        self.access = Some(access);
        self
    }

    pub fn security_helper(mut self, security: Arc<dyn SecurityHelper>) -> Self {
        self.security = Some(security);
        self
    }

    pub fn role_mapper(mut self, mapper: Arc<dyn RoleMapper>) -> Self {
        self.role_mapper = Some(mapper);
        self
    }

    /// Fixed role used for every hosted connection instead of the mapper.
    pub fn role(mut self, role: Arc<dyn Role>) -> Self {
        self.role = Some(role);
        self
    }

    pub fn connection_filter(mut self, filter: Arc<dyn ConnectionFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn connection_filters<I>(mut self, filters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn ConnectionFilter>>,
    {
        self.filters.extend(filters);
        self
    }

    pub fn remote_driver(mut self, class_name: &str, driver: Arc<dyn RemoteDriver>) -> Self {
        self.drivers.insert(class_name.to_string(), driver);
        self
    }

    pub fn build(self) -> OlapService {
        let engine = match self.engine {
            Some(factory) => InitOnce::new(factory),
            None => {
                let config = self.config.clone();
                InitOnce::new(move || {
                    let engine: Arc<dyn QueryEngine> = Arc::new(DuckDbEngine::from_config(&config)?);
                    Ok(engine)
                })
            }
        };
        let registry = match self.registry {
            Some(factory) => InitOnce::new(factory),
            None => {
                let registry: Arc<dyn CatalogRegistry> = Arc::new(InMemoryCatalogRegistry::new());
                InitOnce::ready(registry)
            }
        };

        OlapService {
            config: self.config,
            cache_lock: RwLock::new(()),
            regions: self
                .regions
                .unwrap_or_else(|| Arc::new(InMemoryRegionCache::new()) as Arc<dyn RegionCache>),
            access: self
                .access
                .unwrap_or_else(|| Arc::new(AllowAll) as Arc<dyn AccessGate>),
            registry,
            engine,
            security: self
                .security
                .unwrap_or_else(|| Arc::new(NoSecurity) as Arc<dyn SecurityHelper>),
            security_enabled: OnceLock::new(),
            role_mapper: self.role_mapper,
            role: self.role,
            filters: self.filters,
            drivers: self.drivers,
        }
    }
}
