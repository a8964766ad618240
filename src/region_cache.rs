//! Process-wide key/value store partitioned into named regions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::model::Catalog;

/// Cached catalogs for one locale, already sorted by name.
pub type CatalogList = Arc<Vec<Arc<Catalog>>>;

pub trait RegionCache: Send + Sync {
    fn region_exists(&self, region: &str) -> bool;

    fn create_region(&self, region: &str);

    fn get(&self, region: &str, key: &str) -> Option<CatalogList>;

    /// Stores `value` under `key`. Writes to a region that was never created
    /// are dropped.
    fn put(&self, region: &str, key: &str, value: CatalogList);

    fn remove(&self, region: &str, key: &str);

    fn clear_region(&self, region: &str);
}

#[derive(Debug, Default)]
pub struct InMemoryRegionCache {
    regions: Mutex<HashMap<String, HashMap<String, CatalogList>>>,
}

impl InMemoryRegionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegionCache for InMemoryRegionCache {
    fn region_exists(&self, region: &str) -> bool {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.contains_key(region)
    }

    fn create_region(&self, region: &str) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.entry(region.to_string()).or_default();
    }

    fn get(&self, region: &str, key: &str) -> Option<CatalogList> {
        let regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        regions.get(region).and_then(|r| r.get(key)).cloned()
    }

    fn put(&self, region: &str, key: &str, value: CatalogList) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        match regions.get_mut(region) {
            Some(entries) => {
                entries.insert(key.to_string(), value);
            }
            None => log::debug!("Dropping write to missing cache region {region}"),
        }
    }

    fn remove(&self, region: &str, key: &str) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = regions.get_mut(region) {
            entries.remove(key);
        }
    }

    fn clear_region(&self, region: &str) {
        let mut regions = self.regions.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(entries) = regions.get_mut(region) {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(names: &[&str]) -> CatalogList {
        Arc::new(
            names
                .iter()
                .map(|n| Arc::new(Catalog::from_metadata(n, Vec::new())))
                .collect(),
        )
    }

    #[test]
    fn put_requires_region() {
        let cache = InMemoryRegionCache::new();
        cache.put("r", "en", list(&["Sales"]));
        assert!(cache.get("r", "en").is_none());

        cache.create_region("r");
        assert!(cache.region_exists("r"));
        cache.put("r", "en", list(&["Sales"]));
        assert_eq!(cache.get("r", "en").unwrap().len(), 1);
    }

    #[test]
    fn clear_keeps_region() {
        let cache = InMemoryRegionCache::new();
        cache.create_region("r");
        cache.put("r", "en", list(&["Sales"]));
        cache.put("r", "fr", list(&["Ventes"]));

        cache.remove("r", "fr");
        assert!(cache.get("r", "fr").is_none());
        assert!(cache.get("r", "en").is_some());

        cache.clear_region("r");
        assert!(cache.region_exists("r"));
        assert!(cache.get("r", "en").is_none());
    }

    #[test]
    fn empty_list_is_distinct_from_absent() {
        let cache = InMemoryRegionCache::new();
        cache.create_region("r");
        cache.put("r", "en", list(&[]));
        assert!(cache.get("r", "en").unwrap().is_empty());
        assert!(cache.get("r", "de").is_none());
    }
}
