//! OLAP catalog metadata cache and connection broker.
//!
//! [`OlapService`] discovers the catalogs registered in a [`CatalogRegistry`],
//! caches their schema and cube metadata per locale, filters what each caller
//! sees through an [`AccessGate`], and opens role-scoped connections to a
//! [`QueryEngine`]. A DuckDB-backed engine is provided in [`engine`].

pub mod access;
pub mod admin;
pub mod broker;
pub mod cache;
pub mod config;
pub mod connection;
pub mod datasources;
pub mod engine;
pub mod error;
pub mod filter;
pub mod lazy;
pub mod logging;
pub mod model;
pub mod refresh;
pub mod region_cache;
pub mod registry;
pub mod result;
pub mod security;
pub mod service;

pub use access::{AccessGate, AllowAll, Permission};
pub use config::ServiceConfig;
pub use connection::{
    CubeMetadata, OlapConnection, Properties, QueryEngine, RemoteDriver, RoleHandle, RoleRegistry,
    SchemaMetadata,
};
pub use engine::DuckDbEngine;
pub use error::{EngineError, OlapResult, OlapServiceError, Reason};
pub use filter::ConnectionFilter;
pub use model::{Catalog, Cube, Schema};
pub use region_cache::{InMemoryRegionCache, RegionCache};
pub use registry::{CatalogRegistry, HostedCatalogInfo, InMemoryCatalogRegistry, RemoteServerInfo};
pub use security::{NoSecurity, Role, RoleMapper, SecurityHelper, Session};
pub use service::{OlapService, OlapServiceBuilder, CATALOG_CACHE_REGION};
