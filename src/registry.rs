//! Catalog registrations: hosted catalogs served by the local engine and
//! remote catalogs reached through a driver.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use crate::connection::Properties;
use crate::error::{OlapResult, OlapServiceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedCatalogInfo {
    pub name: String,
    pub data_source_info: Option<String>,
    /// Schema definition text, published verbatim in the data-source
    /// descriptor.
    pub definition: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct RemoteServerInfo {
    pub name: String,
    /// Driver identifier; must match a driver registered on the service.
    pub class_name: String,
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub properties: Properties,
}

impl fmt::Debug for RemoteServerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteServerInfo")
            .field("name", &self.name)
            .field("class_name", &self.class_name)
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("properties", &self.properties)
            .finish()
    }
}

/// Persistent store of catalog definitions.
///
/// Names are unique across hosted and remote registrations. Adding an
/// existing name replaces the previous registration; overwrite policy is
/// enforced by the caller.
pub trait CatalogRegistry: Send + Sync {
    fn hosted_names(&self) -> OlapResult<Vec<String>>;

    fn remote_names(&self) -> OlapResult<Vec<String>>;

    fn hosted_info(&self, name: &str) -> OlapResult<HostedCatalogInfo>;

    fn remote_info(&self, name: &str) -> OlapResult<RemoteServerInfo>;

    fn add_hosted(&self, info: HostedCatalogInfo) -> OlapResult<()>;

    fn add_remote(&self, info: RemoteServerInfo) -> OlapResult<()>;

    fn delete(&self, name: &str) -> OlapResult<()>;
}

#[derive(Debug, Default)]
struct RegistryState {
    hosted: BTreeMap<String, HostedCatalogInfo>,
    remote: BTreeMap<String, RemoteServerInfo>,
}

/// Process-local registry, used when no persistent store is wired in.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryCatalogRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hosted(self, name: &str, definition: &str) -> Self {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            state.hosted.insert(
                name.to_string(),
                HostedCatalogInfo {
                    name: name.to_string(),
                    data_source_info: None,
                    definition: definition.to_string(),
                },
            );
        }
        self
    }
}

impl CatalogRegistry for InMemoryCatalogRegistry {
    fn hosted_names(&self) -> OlapResult<Vec<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.hosted.keys().cloned().collect())
    }

    fn remote_names(&self) -> OlapResult<Vec<String>> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(state.remote.keys().cloned().collect())
    }

    fn hosted_info(&self, name: &str) -> OlapResult<HostedCatalogInfo> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .hosted
            .get(name)
            .cloned()
            .ok_or_else(|| OlapServiceError::NotFound(name.to_string()))
    }

    fn remote_info(&self, name: &str) -> OlapResult<RemoteServerInfo> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state
            .remote
            .get(name)
            .cloned()
            .ok_or_else(|| OlapServiceError::NotFound(name.to_string()))
    }

    fn add_hosted(&self, info: HostedCatalogInfo) -> OlapResult<()> {
        if info.name.trim().is_empty() {
            return Err(OlapServiceError::registry("catalog name must be non-empty"));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.remote.remove(&info.name);
        state.hosted.insert(info.name.clone(), info);
        Ok(())
    }

    fn add_remote(&self, info: RemoteServerInfo) -> OlapResult<()> {
        if info.name.trim().is_empty() {
            return Err(OlapServiceError::registry("catalog name must be non-empty"));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.hosted.remove(&info.name);
        state.remote.insert(info.name.clone(), info);
        Ok(())
    }

    fn delete(&self, name: &str) -> OlapResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let hosted = state.hosted.remove(name).is_some();
        let remote = state.remote.remove(name).is_some();
        if hosted || remote {
            Ok(())
        } else {
            Err(OlapServiceError::NotFound(name.to_string()))
        }
    }
}
