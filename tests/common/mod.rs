#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use trex_olap::connection::PASSWORD_PROPERTY;
use trex_olap::{
    AccessGate, CatalogRegistry, ConnectionFilter, CubeMetadata, EngineError, HostedCatalogInfo,
    InMemoryCatalogRegistry, OlapConnection, OlapResult, OlapService, OlapServiceBuilder,
    Permission, Properties, QueryEngine, RemoteDriver, RemoteServerInfo, Role, RoleHandle,
    RoleMapper, RoleRegistry, SchemaMetadata, SecurityHelper, ServiceConfig, Session,
};

static INIT: Once = Once::new();

/// Initialize logging once for the whole test binary.
pub fn init_test_env() {
    INIT.call_once(|| {
        trex_olap::logging::init();
    });
}

pub fn schema(name: &str, cubes: &[(&str, &str)], roles: &[&str]) -> SchemaMetadata {
    SchemaMetadata {
        name: name.to_string(),
        cubes: cubes
            .iter()
            .map(|(n, c)| CubeMetadata {
                name: n.to_string(),
                caption: c.to_string(),
            })
            .collect(),
        available_roles: roles.iter().map(|r| r.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Engine double
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OpenCall {
    pub data_source: String,
    pub catalog: Option<String>,
    pub role: Option<String>,
    pub properties: Properties,
}

#[derive(Default)]
pub struct CountingRoleRegistry {
    next: AtomicUsize,
    registered: AtomicUsize,
    deregistered: AtomicUsize,
    live: Mutex<HashMap<String, Arc<dyn Role>>>,
}

impl CountingRoleRegistry {
    pub fn registered(&self) -> usize {
        self.registered.load(Ordering::SeqCst)
    }

    pub fn deregistered(&self) -> usize {
        self.deregistered.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }
}

impl RoleRegistry for CountingRoleRegistry {
    fn register(&self, role: Arc<dyn Role>) -> RoleHandle {
        let id = self.next.fetch_add(1, Ordering::SeqCst);
        let moniker = format!("lockbox-{id}");
        self.live.lock().unwrap().insert(moniker.clone(), role);
        self.registered.fetch_add(1, Ordering::SeqCst);
        RoleHandle::new(moniker)
    }

    fn lookup(&self, moniker: &str) -> Option<Arc<dyn Role>> {
        self.live.lock().unwrap().get(moniker).cloned()
    }

    fn deregister(&self, handle: &RoleHandle) {
        self.live.lock().unwrap().remove(handle.moniker());
        self.deregistered.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct StubConnection {
    catalog: Option<String>,
    role: Option<String>,
    schemas: Option<Vec<SchemaMetadata>>,
    fail_flush: bool,
    flushed: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl OlapConnection for StubConnection {
    fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn list_schemas(&self) -> Result<Vec<SchemaMetadata>, EngineError> {
        self.schemas
            .clone()
            .ok_or_else(|| "introspection failed".into())
    }

    fn flush_schema_cache(&self) -> Result<(), EngineError> {
        if self.fail_flush {
            return Err("flush refused".into());
        }
        self.flushed
            .lock()
            .unwrap()
            .push(self.catalog.clone().unwrap_or_default());
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), EngineError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingEngine {
    catalogs: Mutex<HashMap<String, Vec<SchemaMetadata>>>,
    broken: Mutex<HashSet<String>>,
    failing_flush: Mutex<HashSet<String>>,
    refuse: AtomicBool,
    opens: Mutex<Vec<OpenCall>>,
    global_flushes: AtomicUsize,
    flushed: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
    pub roles: CountingRoleRegistry,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(self, name: &str, schemas: Vec<SchemaMetadata>) -> Self {
        self.put_catalog(name, schemas);
        self
    }

    /// Replace what introspecting `name` returns from now on.
    pub fn put_catalog(&self, name: &str, schemas: Vec<SchemaMetadata>) {
        self.catalogs
            .lock()
            .unwrap()
            .insert(name.to_string(), schemas);
    }

    pub fn break_introspection(&self, name: &str) {
        self.broken.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_flush(&self, name: &str) {
        self.failing_flush.lock().unwrap().insert(name.to_string());
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn opens(&self) -> Vec<OpenCall> {
        self.opens.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opens.lock().unwrap().len()
    }

    pub fn global_flushes(&self) -> usize {
        self.global_flushes.load(Ordering::SeqCst)
    }

    pub fn flushed(&self) -> Vec<String> {
        self.flushed.lock().unwrap().clone()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl QueryEngine for RecordingEngine {
    fn open_connection(
        &self,
        data_source: &str,
        catalog: Option<&str>,
        role: Option<&str>,
        properties: &Properties,
    ) -> Result<Box<dyn OlapConnection>, EngineError> {
        self.opens.lock().unwrap().push(OpenCall {
            data_source: data_source.to_string(),
            catalog: catalog.map(str::to_string),
            role: role.map(str::to_string),
            properties: properties.clone(),
        });

        if self.refuse.load(Ordering::SeqCst) {
            return Err("engine refused the connection".into());
        }

        let schemas = match catalog {
            Some(name) if self.broken.lock().unwrap().contains(name) => None,
            Some(name) => Some(
                self.catalogs
                    .lock()
                    .unwrap()
                    .get(name)
                    .cloned()
                    .unwrap_or_default(),
            ),
            None => Some(Vec::new()),
        };
        let fail_flush = catalog
            .map(|name| self.failing_flush.lock().unwrap().contains(name))
            .unwrap_or(false);

        Ok(Box::new(StubConnection {
            catalog: catalog.map(str::to_string),
            role: role.map(str::to_string),
            schemas,
            fail_flush,
            flushed: Arc::clone(&self.flushed),
            closes: Arc::clone(&self.closes),
        }))
    }

    fn flush_all_schema_caches(&self) -> Result<(), EngineError> {
        self.global_flushes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn role_registry(&self) -> &dyn RoleRegistry {
        &self.roles
    }
}

// ---------------------------------------------------------------------------
// Remote driver double
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingDriver {
    calls: Mutex<Vec<(String, Properties)>>,
    failing_flush: Mutex<HashSet<String>>,
    refuse: AtomicBool,
    flushed: Arc<Mutex<Vec<String>>>,
    closes: Arc<AtomicUsize>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(String, Properties)> {
        self.calls.lock().unwrap().clone()
    }

    /// Flushes through connections to `url` will fail.
    pub fn fail_flush(&self, url: &str) {
        self.failing_flush.lock().unwrap().insert(url.to_string());
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn flushed(&self) -> Vec<String> {
        self.flushed.lock().unwrap().clone()
    }
}

impl RemoteDriver for RecordingDriver {
    fn connect(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Box<dyn OlapConnection>, EngineError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), properties.clone()));

        if self.refuse.load(Ordering::SeqCst) {
            return Err(format!("cannot reach {url}").into());
        }

        Ok(Box::new(StubConnection {
            catalog: Some(url.to_string()),
            role: None,
            schemas: Some(vec![schema("Remote", &[("Inventory", "Inventory")], &[])]),
            fail_flush: self.failing_flush.lock().unwrap().contains(url),
            flushed: Arc::clone(&self.flushed),
            closes: Arc::clone(&self.closes),
        }))
    }
}

/// Records the properties it sees and tags them.
#[derive(Default)]
pub struct SpyFilter {
    seen: Mutex<Vec<Properties>>,
}

impl SpyFilter {
    pub fn seen(&self) -> Vec<Properties> {
        self.seen.lock().unwrap().clone()
    }
}

impl ConnectionFilter for SpyFilter {
    fn filter_properties(&self, properties: &mut Properties) {
        self.seen.lock().unwrap().push(properties.clone());
        properties.insert("Catalog".to_string(), "Inventory".to_string());
        properties.insert(PASSWORD_PROPERTY.to_string(), "forged".to_string());
    }
}

pub fn remote_info(name: &str, url: &str) -> RemoteServerInfo {
    RemoteServerInfo {
        name: name.to_string(),
        class_name: "org.olap4j.driver.xmla.XmlaOlap4jDriver".to_string(),
        url: url.to_string(),
        user: Some("svc".to_string()),
        password: Some("s3cret".to_string()),
        properties: Properties::new(),
    }
}

// ---------------------------------------------------------------------------
// Security doubles
// ---------------------------------------------------------------------------

/// Access gate backed by explicit per-user grants. Anonymous callers get
/// nothing.
#[derive(Default)]
pub struct GrantTable {
    grants: Mutex<HashMap<String, HashSet<(String, Permission)>>>,
    superusers: Mutex<HashSet<String>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, user: &str, catalog: &str, permissions: &[Permission]) {
        let mut grants = self.grants.lock().unwrap();
        let entry = grants.entry(user.to_string()).or_default();
        for p in permissions {
            entry.insert((catalog.to_string(), *p));
        }
    }

    pub fn revoke(&self, user: &str, catalog: &str) {
        if let Some(entry) = self.grants.lock().unwrap().get_mut(user) {
            entry.retain(|(c, _)| c != catalog);
        }
    }

    pub fn superuser(&self, user: &str) {
        self.superusers.lock().unwrap().insert(user.to_string());
    }
}

impl AccessGate for GrantTable {
    fn has_access(&self, resource: &str, permissions: &[Permission], session: Option<&Session>) -> bool {
        let Some(session) = session else {
            return false;
        };
        if self.superusers.lock().unwrap().contains(session.name()) {
            return true;
        }
        let grants = self.grants.lock().unwrap();
        let Some(entry) = grants.get(session.name()) else {
            return false;
        };
        permissions
            .iter()
            .all(|p| entry.contains(&(resource.to_string(), *p)))
    }
}

#[derive(Default)]
pub struct StaticRoleMapper {
    roles: Mutex<HashMap<(String, String), Option<Vec<String>>>>,
    calls: AtomicUsize,
}

impl StaticRoleMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(self, user: &str, catalog: &str, roles: Option<&[&str]>) -> Self {
        self.roles.lock().unwrap().insert(
            (user.to_string(), catalog.to_string()),
            roles.map(|r| r.iter().map(|s| s.to_string()).collect()),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RoleMapper for StaticRoleMapper {
    fn map_connection_roles(
        &self,
        session: &Session,
        catalog: &str,
    ) -> OlapResult<Option<Vec<String>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&(session.name().to_string(), catalog.to_string()))
            .cloned()
            .flatten())
    }
}

/// Security layer that reports security as enabled.
pub struct EnabledSecurity;

impl SecurityHelper for EnabledSecurity {
    fn is_security_enabled(&self) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FixedRole(pub &'static str);

impl Role for FixedRole {
    fn name(&self) -> &str {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn registry_with_hosted(names: &[&str]) -> Arc<InMemoryCatalogRegistry> {
    let registry = InMemoryCatalogRegistry::new();
    for name in names {
        registry
            .add_hosted(HostedCatalogInfo {
                name: name.to_string(),
                data_source_info: Some(format!("DataSource={name}")),
                definition: format!("mondrian:/{name}"),
            })
            .unwrap();
    }
    Arc::new(registry)
}

pub fn builder(
    engine: &Arc<RecordingEngine>,
    registry: &Arc<InMemoryCatalogRegistry>,
) -> OlapServiceBuilder {
    init_test_env();
    OlapService::builder(ServiceConfig::default())
        .engine(engine.clone())
        .registry(registry.clone())
}
