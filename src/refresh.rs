//! Cache rebuilds and engine cache flushes.
//!
//! Rebuilds are best effort per catalog: a catalog that cannot be opened or
//! introspected is logged and left out of that cycle's list. Every
//! registered catalog is introspected regardless of the caller's grants;
//! access is applied when the list is read. Failures in the
//! surrounding orchestration (listing the registry, for instance) abort the
//! rebuild and reach the caller.

use std::sync::Arc;

use log::{error, info, warn};

use crate::error::{OlapResult, OlapServiceError};
use crate::model::{sort_by_name, Catalog};
use crate::region_cache::CatalogList;
use crate::security::Session;
use crate::service::{OlapService, CATALOG_CACHE_REGION};

impl OlapService {
    /// Rebuild the cached catalog list for `locale`, replacing whatever was
    /// there.
    pub fn refresh(&self, locale: &str, session: Option<&Session>) -> OlapResult<()> {
        self.ensure_region();
        let _guard = self.write_lock();
        self.rebuild_locked(locale, session).map(|_| ())
    }

    /// Caller must hold the write lock for the whole call.
    pub(crate) fn rebuild_locked(
        &self,
        locale: &str,
        session: Option<&Session>,
    ) -> OlapResult<CatalogList> {
        self.regions.remove(CATALOG_CACHE_REGION, locale);

        match self.run_privileged(session, |s| self.load_catalogs(locale, s)) {
            Ok(mut catalogs) => {
                sort_by_name(&mut catalogs);
                info!(
                    "Cached {} catalog(s) for locale {locale}",
                    catalogs.len()
                );
                let list: CatalogList = Arc::new(catalogs);
                self.regions
                    .put(CATALOG_CACHE_REGION, locale, Arc::clone(&list));
                Ok(list)
            }
            Err(e) => {
                error!("Failed to initialize the catalog cache for locale {locale}: {e}");
                Err(e)
            }
        }
    }

    fn load_catalogs(&self, locale: &str, session: Option<&Session>) -> OlapResult<Vec<Arc<Catalog>>> {
        let registry = self.registry()?;
        let mut names = registry.hosted_names()?;
        names.extend(registry.remote_names()?);

        let mut catalogs = Vec::with_capacity(names.len());
        for name in &names {
            match self.introspect(name, locale, session) {
                Ok(catalog) => catalogs.push(Arc::new(catalog)),
                Err(e) => warn!("Failed to initialize the cache for catalog {name}: {e}"),
            }
        }
        Ok(catalogs)
    }

    fn introspect(&self, name: &str, locale: &str, session: Option<&Session>) -> OlapResult<Catalog> {
        let conn = self.open_catalog(name, session, locale)?;
        let schemas = conn.list_schemas();
        if let Err(e) = conn.close() {
            warn!("Failed to gracefully close connection to catalog {name}: {e}");
        }
        let schemas = schemas
            .map_err(|e| OlapServiceError::engine(format!("Failed to introspect catalog {name}"), e))?;
        Ok(Catalog::from_metadata(name, schemas))
    }

    /// Evict one catalog from the engine's schema cache. The metadata cache
    /// is left as it is.
    pub fn flush(&self, locale: &str, catalog: &str, session: Option<&Session>) -> OlapResult<()> {
        let _guard = self.write_lock();

        let conn = self.connect_with_locale(Some(catalog), session, locale)?;
        let flushed = conn.flush_schema_cache();
        if let Err(e) = conn.close() {
            warn!("Failed to gracefully close connection to catalog {catalog}: {e}");
        }
        flushed.map_err(|e| {
            warn!("Failed to flush catalog {catalog}: {e}");
            OlapServiceError::engine(format!("Failed to flush catalog {catalog}"), e)
        })
    }

    /// Drop all cached metadata, flush every hosted schema on the engine and
    /// ask each readable remote catalog to flush its own cache.
    ///
    /// Cached lists for every locale are cleared, since the engine-wide flush
    /// invalidates metadata regardless of locale. `locale` is the locale the
    /// remote connections are opened with.
    pub fn flush_all(&self, locale: &str, session: Option<&Session>) -> OlapResult<()> {
        let _guard = self.write_lock();

        self.clear_locked(None);

        self.engine()?
            .flush_all_schema_caches()
            .map_err(|e| OlapServiceError::engine("Failed to flush hosted catalogs", e))?;

        self.flush_remote_catalogs(locale, session)
    }

    // Remote catalogs may live in separate engine instances, so each one is
    // flushed individually.
    fn flush_remote_catalogs(&self, locale: &str, session: Option<&Session>) -> OlapResult<()> {
        for name in self.remote_catalog_names(session)? {
            let flushed = self
                .connect_with_locale(Some(&name), session, locale)
                .and_then(|conn| {
                    let result = conn.flush_schema_cache();
                    if let Err(e) = conn.close() {
                        warn!("Failed to gracefully close connection to catalog {name}: {e}");
                    }
                    result.map_err(|e| OlapServiceError::engine("flush rejected", e))
                });
            if let Err(e) = flushed {
                warn!("Failed to flush remote catalog {name}: {e}");
            }
        }
        Ok(())
    }
}
