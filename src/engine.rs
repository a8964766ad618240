//! DuckDB-backed [`QueryEngine`].
//!
//! Every database attached to the root DuckDB instance is a hosted catalog.
//! Its schemas are DuckDB schemas and its cubes are the tables and views in
//! them. Connections are clones of the root connection, so they share the
//! instance's attached databases.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use duckdb::{Config, Connection};
use log::debug;

use crate::config::ServiceConfig;
use crate::connection::{
    CubeMetadata, OlapConnection, Properties, QueryEngine, RoleHandle, RoleRegistry,
    SchemaMetadata, LOCALE_PROPERTY,
};
use crate::error::{EngineError, OlapResult, OlapServiceError};
use crate::result::QueryRows;
use crate::security::Role;

const SCHEMAS_SQL: &str = "SELECT schema_name FROM information_schema.schemata \
     WHERE catalog_name = ? ORDER BY schema_name";

const CUBES_SQL: &str = "SELECT table_name, comment FROM duckdb_tables() \
     WHERE database_name = ? AND schema_name = ? \
     UNION ALL \
     SELECT view_name, comment FROM duckdb_views() \
     WHERE database_name = ? AND schema_name = ? AND NOT internal \
     ORDER BY 1";

const DATABASE_EXISTS_SQL: &str = "SELECT database_name FROM duckdb_databases() WHERE database_name = ?";

pub struct DuckDbEngine {
    conn: Mutex<Connection>,
    roles: MonikerRegistry,
}

impl DuckDbEngine {
    pub fn open(path: &str, allow_unsigned_extensions: bool) -> OlapResult<Self> {
        let mut config = Config::default();
        if allow_unsigned_extensions {
            config = config
                .allow_unsigned_extensions()
                .map_err(|e| OlapServiceError::engine("Failed to set config", e))?;
        }

        let conn = Connection::open_with_flags(path, config)
            .map_err(|e| OlapServiceError::engine(format!("Failed to open database {path}"), e))?;

        Ok(DuckDbEngine {
            conn: Mutex::new(conn),
            roles: MonikerRegistry::new(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> OlapResult<Self> {
        Self::open(&config.database_path, config.allow_unsigned_extensions)
    }

    pub fn execute(&self, sql: &str) -> OlapResult<()> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        conn.execute_batch(sql)
            .map_err(|e| OlapServiceError::engine("Failed to execute statement", e))
    }

    /// Attach a database file as a hosted catalog named `name`.
    pub fn attach(&self, name: &str, path: &str) -> OlapResult<()> {
        let sql = format!(
            "ATTACH '{}' AS {}",
            path.replace('\'', "''"),
            quote_identifier(name)
        );
        self.execute(&sql)
    }

    fn clone_connection(&self) -> Result<Connection, EngineError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(conn.try_clone()?)
    }
}

impl QueryEngine for DuckDbEngine {
    fn open_connection(
        &self,
        data_source: &str,
        catalog: Option<&str>,
        role: Option<&str>,
        properties: &Properties,
    ) -> Result<Box<dyn OlapConnection>, EngineError> {
        let conn = self.clone_connection()?;

        if let Some(name) = catalog {
            let found = QueryRows::from_query(&conn, DATABASE_EXISTS_SQL, &[name])?;
            if found.is_empty() {
                return Err(format!("Catalog {name} is not attached to data source {data_source}").into());
            }
        }

        // Monikers only live for the duration of this call; resolve them now.
        let roles = match role {
            Some(role) => match self.roles.lookup(role) {
                Some(object) => vec![object.name().to_string()],
                None => role.split(',').map(str::to_string).collect(),
            },
            None => Vec::new(),
        };

        debug!(
            "Opened DuckDB connection (catalog={:?}, roles={:?}, locale={:?})",
            catalog,
            roles,
            properties.get(LOCALE_PROPERTY)
        );

        Ok(Box::new(DuckDbConnection {
            conn,
            catalog: catalog.map(str::to_string),
            role: role.map(str::to_string),
            roles,
        }))
    }

    // DuckDB reads catalog metadata live; there is nothing to evict.
    fn flush_all_schema_caches(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn role_registry(&self) -> &dyn RoleRegistry {
        &self.roles
    }
}

pub struct DuckDbConnection {
    conn: Connection,
    catalog: Option<String>,
    role: Option<String>,
    roles: Vec<String>,
}

impl OlapConnection for DuckDbConnection {
    fn catalog(&self) -> Option<&str> {
        self.catalog.as_deref()
    }

    fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn list_schemas(&self) -> Result<Vec<SchemaMetadata>, EngineError> {
        let Some(catalog) = self.catalog.as_deref() else {
            return Ok(Vec::new());
        };

        let schema_rows = QueryRows::from_query(&self.conn, SCHEMAS_SQL, &[catalog])?;
        let mut schemas = Vec::with_capacity(schema_rows.len());
        for i in 0..schema_rows.len() {
            let Some(schema) = schema_rows.text(i, 0) else {
                continue;
            };
            let cube_rows =
                QueryRows::from_query(&self.conn, CUBES_SQL, &[catalog, &schema, catalog, &schema])?;
            let cubes = (0..cube_rows.len())
                .filter_map(|j| {
                    let name = cube_rows.text(j, 0)?;
                    let caption = cube_rows
                        .text(j, 1)
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| name.clone());
                    Some(CubeMetadata { name, caption })
                })
                .collect();
            schemas.push(SchemaMetadata {
                name: schema,
                cubes,
                available_roles: self.roles.clone(),
            });
        }
        Ok(schemas)
    }

    fn flush_schema_cache(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<(), EngineError> {
        drop(self.conn);
        Ok(())
    }
}

/// In-process identity registry handing out hex monikers.
#[derive(Default)]
pub struct MonikerRegistry {
    next: AtomicU64,
    entries: Mutex<HashMap<String, Arc<dyn Role>>>,
}

impl MonikerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoleRegistry for MonikerRegistry {
    fn register(&self, role: Arc<dyn Role>) -> RoleHandle {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        let moniker = format!("moniker:{}", hex::encode(id.to_be_bytes()));
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(moniker.clone(), role);
        RoleHandle::new(moniker)
    }

    fn lookup(&self, moniker: &str) -> Option<Arc<dyn Role>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(moniker)
            .cloned()
    }

    fn deregister(&self, handle: &RoleHandle) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(handle.moniker());
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
