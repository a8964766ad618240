//! Catalog registration and removal.
//!
//! Registration changes do not touch the metadata cache; callers that need
//! the new catalog listed right away follow up with `flush_all` or
//! `invalidate`.

use log::debug;

use crate::access::{filter_readable, Permission};
use crate::error::{OlapResult, OlapServiceError};
use crate::registry::{HostedCatalogInfo, RemoteServerInfo};
use crate::security::Session;
use crate::service::OlapService;

impl OlapService {
    /// Names of every hosted and remote catalog `session` can read, sorted.
    /// Answers from the registry alone; no connection is opened.
    pub fn catalog_names(&self, session: Option<&Session>) -> OlapResult<Vec<String>> {
        let mut names = self.hosted_catalog_names(session)?;
        names.extend(self.remote_catalog_names(session)?);
        names.sort();
        Ok(names)
    }

    pub fn hosted_catalog_names(&self, session: Option<&Session>) -> OlapResult<Vec<String>> {
        let names = self.registry()?.hosted_names()?;
        Ok(filter_readable(names, self.access.as_ref(), session, |n| n.as_str()))
    }

    pub fn remote_catalog_names(&self, session: Option<&Session>) -> OlapResult<Vec<String>> {
        let names = self.registry()?.remote_names()?;
        Ok(filter_readable(names, self.access.as_ref(), session, |n| n.as_str()))
    }

    pub fn add_hosted_catalog(
        &self,
        name: &str,
        data_source_info: Option<&str>,
        definition: &str,
        overwrite: bool,
        session: Option<&Session>,
    ) -> OlapResult<()> {
        self.check_registration(name, overwrite, session)?;

        self.registry()?.add_hosted(HostedCatalogInfo {
            name: name.to_string(),
            data_source_info: data_source_info.map(str::to_string),
            definition: definition.to_string(),
        })
    }

    pub fn add_remote_catalog(
        &self,
        info: RemoteServerInfo,
        overwrite: bool,
        session: Option<&Session>,
    ) -> OlapResult<()> {
        self.check_registration(&info.name, overwrite, session)?;
        self.registry()?.add_remote(info)
    }

    pub fn remove_catalog(&self, name: &str, session: Option<&Session>) -> OlapResult<()> {
        if !self.has_access(name, &[Permission::Delete], session) {
            debug!("User does not have delete access to catalog {name}");
            return Err(OlapServiceError::access_denied(name));
        }

        if !self.catalog_names(session)?.iter().any(|n| n == name) {
            return Err(OlapServiceError::NotFound(name.to_string()));
        }

        self.registry()?.delete(name)
    }

    fn check_registration(
        &self,
        name: &str,
        overwrite: bool,
        session: Option<&Session>,
    ) -> OlapResult<()> {
        if !self.has_access(name, &[Permission::Write], session) {
            debug!("User does not have write access to catalog {name}");
            return Err(OlapServiceError::access_denied(name));
        }

        if !overwrite && self.catalog_names(session)?.iter().any(|n| n == name) {
            return Err(OlapServiceError::AlreadyExists(name.to_string()));
        }
        Ok(())
    }
}
