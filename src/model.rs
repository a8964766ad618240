//! Cached catalog metadata.
//!
//! A [`Catalog`] is assembled once during a refresh and never mutated after it
//! is placed in the cache; a later refresh replaces it wholesale. Schemas and
//! cubes refer back to their parents by name only.

use std::sync::Arc;

use crate::connection::SchemaMetadata;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub name: String,
    pub schemas: Vec<Schema>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub name: String,
    /// Name of the owning catalog.
    pub catalog: String,
    pub cubes: Vec<Cube>,
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cube {
    pub name: String,
    pub caption: String,
    /// Name of the owning schema.
    pub schema: String,
    /// Name of the catalog owning that schema.
    pub catalog: String,
}

impl Catalog {
    /// Build a catalog aggregate from introspected schema metadata, keeping
    /// the engine's ordering.
    pub fn from_metadata(name: &str, metadata: Vec<SchemaMetadata>) -> Self {
        let schemas = metadata
            .into_iter()
            .map(|schema| {
                let cubes = schema
                    .cubes
                    .into_iter()
                    .map(|cube| Cube {
                        name: cube.name,
                        caption: cube.caption,
                        schema: schema.name.clone(),
                        catalog: name.to_string(),
                    })
                    .collect();
                Schema {
                    name: schema.name,
                    catalog: name.to_string(),
                    cubes,
                    roles: schema.available_roles,
                }
            })
            .collect();

        Catalog {
            name: name.to_string(),
            schemas,
        }
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }
}

impl Schema {
    pub fn cube(&self, name: &str) -> Option<&Cube> {
        self.cubes.iter().find(|c| c.name == name)
    }
}

/// Order catalogs by name using a plain byte comparison (`"Zeta"` sorts
/// before `"beta"`).
pub fn sort_by_name(catalogs: &mut [Arc<Catalog>]) {
    catalogs.sort_by(|a, b| a.name.cmp(&b.name));
}
