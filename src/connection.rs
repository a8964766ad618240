//! Contracts the broker needs from the analytical query engine.
//!
//! The engine itself lives outside this crate. Everything here is a trait so a
//! DuckDB-backed engine ([`crate::engine::DuckDbEngine`]) and in-process test
//! doubles can be plugged in interchangeably.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::EngineError;
use crate::security::Role;

/// Connection properties handed to an engine or a remote driver.
pub type Properties = BTreeMap<String, String>;

pub const LOCALE_PROPERTY: &str = "Locale";
pub const USER_PROPERTY: &str = "user";
pub const PASSWORD_PROPERTY: &str = "password";

/// Cube description as reported by a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CubeMetadata {
    pub name: String,
    pub caption: String,
}

/// Schema description as reported by a live connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaMetadata {
    pub name: String,
    pub cubes: Vec<CubeMetadata>,
    /// Roles the engine recognises for this schema.
    pub available_roles: Vec<String>,
}

/// A live session against the engine, scoped to one catalog and one
/// effective role. Owned by whoever asked for it.
pub trait OlapConnection: Send {
    fn catalog(&self) -> Option<&str>;

    fn role(&self) -> Option<&str>;

    fn list_schemas(&self) -> Result<Vec<SchemaMetadata>, EngineError>;

    /// Evicts this connection's catalog from the engine's schema cache.
    fn flush_schema_cache(&self) -> Result<(), EngineError>;

    fn close(self: Box<Self>) -> Result<(), EngineError>;
}

pub trait QueryEngine: Send + Sync {
    fn open_connection(
        &self,
        data_source: &str,
        catalog: Option<&str>,
        role: Option<&str>,
        properties: &Properties,
    ) -> Result<Box<dyn OlapConnection>, EngineError>;

    /// Engine-wide eviction of every hosted schema.
    fn flush_all_schema_caches(&self) -> Result<(), EngineError>;

    fn role_registry(&self) -> &dyn RoleRegistry;
}

/// Opaque token naming a role object registered with a [`RoleRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleHandle {
    moniker: String,
}

impl RoleHandle {
    pub fn new(moniker: impl Into<String>) -> Self {
        Self {
            moniker: moniker.into(),
        }
    }

    pub fn moniker(&self) -> &str {
        &self.moniker
    }
}

impl fmt::Display for RoleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.moniker)
    }
}

/// The engine's identity registry. A role object registered here can be
/// referenced by its moniker in place of a role name when a connection is
/// opened.
pub trait RoleRegistry: Send + Sync {
    fn register(&self, role: Arc<dyn Role>) -> RoleHandle;

    fn lookup(&self, moniker: &str) -> Option<Arc<dyn Role>>;

    fn deregister(&self, handle: &RoleHandle);
}

/// Driver for catalogs served by an external engine instance.
pub trait RemoteDriver: Send + Sync {
    fn connect(
        &self,
        url: &str,
        properties: &Properties,
    ) -> Result<Box<dyn OlapConnection>, EngineError>;
}
