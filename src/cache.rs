//! Locale-partitioned catalog metadata cache.
//!
//! A locale's entry in [`CATALOG_CACHE_REGION`] is either absent (not yet
//! populated) or a complete, sorted catalog list. Lists are never edited in
//! place; a rebuild publishes a new list under the write lock. Access control
//! is applied when reading, so grant changes show up without invalidation.

use std::sync::Arc;

use log::debug;

use crate::access::filter_readable;
use crate::error::OlapResult;
use crate::model::{Catalog, Cube, Schema};
use crate::region_cache::CatalogList;
use crate::security::Session;
use crate::service::{OlapService, CATALOG_CACHE_REGION};

impl OlapService {
    /// Catalogs cached for `locale` that `session` may read, populating the
    /// locale on first use.
    pub fn catalogs(&self, locale: &str, session: Option<&Session>) -> OlapResult<Vec<Arc<Catalog>>> {
        let cached = self.init_cache(locale, session)?;
        Ok(filter_readable(
            cached.iter().cloned(),
            self.access.as_ref(),
            session,
            |c| c.name.as_str(),
        ))
    }

    /// Schemas of the readable catalogs, optionally restricted to one
    /// catalog.
    pub fn schemas(
        &self,
        locale: &str,
        catalog: Option<&str>,
        session: Option<&Session>,
    ) -> OlapResult<Vec<Schema>> {
        Ok(self
            .catalogs(locale, session)?
            .iter()
            .filter(|c| catalog.map_or(true, |name| c.name == name))
            .flat_map(|c| c.schemas.iter().cloned())
            .collect())
    }

    pub fn cubes(
        &self,
        locale: &str,
        catalog: Option<&str>,
        schema: Option<&str>,
        session: Option<&Session>,
    ) -> OlapResult<Vec<Cube>> {
        Ok(self
            .schemas(locale, catalog, session)?
            .into_iter()
            .filter(|s| schema.map_or(true, |name| s.name == name))
            .flat_map(|s| s.cubes)
            .collect())
    }

    /// Drop cached metadata for one locale, or for every locale when
    /// `locale` is `None`. The next read repopulates.
    pub fn invalidate(&self, locale: Option<&str>) {
        let _guard = self.write_lock();
        self.clear_locked(locale);
    }

    /// Whether `locale` currently holds a populated list.
    pub fn is_populated(&self, locale: &str) -> bool {
        let _guard = self.read_lock();
        self.regions.get(CATALOG_CACHE_REGION, locale).is_some()
    }

    /// Caller must hold the write lock.
    pub(crate) fn clear_locked(&self, locale: Option<&str>) {
        match locale {
            Some(locale) => {
                debug!("Clearing catalog cache for locale {locale}");
                self.regions.remove(CATALOG_CACHE_REGION, locale);
            }
            None => {
                debug!("Clearing catalog cache for all locales");
                self.regions.clear_region(CATALOG_CACHE_REGION);
            }
        }
    }

    pub(crate) fn ensure_region(&self) {
        {
            let _guard = self.read_lock();
            if self.regions.region_exists(CATALOG_CACHE_REGION) {
                return;
            }
        }
        let _guard = self.write_lock();
        if !self.regions.region_exists(CATALOG_CACHE_REGION) {
            self.regions.create_region(CATALOG_CACHE_REGION);
        }
    }

    fn init_cache(&self, locale: &str, session: Option<&Session>) -> OlapResult<CatalogList> {
        self.ensure_region();

        {
            let _guard = self.read_lock();
            if let Some(cached) = self.regions.get(CATALOG_CACHE_REGION, locale) {
                return Ok(cached);
            }
        }

        let _guard = self.write_lock();
        // Another thread may have finished the rebuild while we waited.
        if let Some(cached) = self.regions.get(CATALOG_CACHE_REGION, locale) {
            return Ok(cached);
        }
        self.rebuild_locked(locale, session)
    }
}
