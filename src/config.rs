use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{OlapResult, OlapServiceError};

pub const CONFIG_ENV: &str = "TREX_OLAP_CONFIG";

/// Service configuration, parsed from the `TREX_OLAP_CONFIG` env var or any
/// JSON document. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Name of the single data source the service exposes to discovery
    /// clients. Catalog-less connections are opened against it.
    #[serde(default = "default_data_source_name")]
    pub data_source_name: String,
    #[serde(default = "default_data_source_description")]
    pub data_source_description: String,
    #[serde(default = "default_provider_name")]
    pub provider_name: String,
    /// Locale used when the caller's session does not carry one.
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// DuckDB database backing the default engine.
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default)]
    pub allow_unsigned_extensions: bool,
}

fn default_data_source_name() -> String {
    "Trex".to_string()
}

fn default_data_source_description() -> String {
    "TrexSQL OLAP Datasources".to_string()
}

fn default_provider_name() -> String {
    "TrexXMLA".to_string()
}

fn default_locale() -> String {
    "en_US".to_string()
}

fn default_database_path() -> String {
    ":memory:".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data_source_name: default_data_source_name(),
            data_source_description: default_data_source_description(),
            provider_name: default_provider_name(),
            default_locale: default_locale(),
            database_path: default_database_path(),
            allow_unsigned_extensions: false,
        }
    }
}

impl ServiceConfig {
    /// Reads `TREX_OLAP_CONFIG`; an unset variable yields the defaults.
    pub fn from_env() -> OlapResult<Self> {
        match env::var(CONFIG_ENV) {
            Ok(raw) => Self::from_json(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_json(json: &str) -> OlapResult<Self> {
        let config: ServiceConfig = serde_json::from_str(json).map_err(|e| {
            OlapServiceError::config(format!("Failed to parse {CONFIG_ENV} JSON: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> OlapResult<()> {
        if self.data_source_name.trim().is_empty() {
            return Err(OlapServiceError::config("data_source_name must be non-empty"));
        }
        if self.default_locale.trim().is_empty() {
            return Err(OlapServiceError::config("default_locale must be non-empty"));
        }
        if self.database_path.is_empty() {
            return Err(OlapServiceError::config("database_path must be non-empty"));
        }
        Ok(())
    }
}
