//! Error taxonomy shared by the metadata cache, the connection broker and the
//! administrative calls.

use std::error::Error as StdError;

use thiserror::Error;

/// Error reported by collaborators outside this crate (query engines, remote
/// drivers). Boxed so every engine can surface its own error type.
pub type EngineError = Box<dyn StdError + Send + Sync + 'static>;

pub type OlapResult<T> = Result<T, OlapServiceError>;

/// Coarse classification of an [`OlapServiceError`], for callers that only
/// branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    AccessDenied,
    AlreadyExists,
    NotFound,
    EngineFailure,
    ConfigurationFailure,
    Registry,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::AccessDenied => "ACCESS_DENIED",
            Reason::AlreadyExists => "ALREADY_EXISTS",
            Reason::NotFound => "NOT_FOUND",
            Reason::EngineFailure => "ENGINE_FAILURE",
            Reason::ConfigurationFailure => "CONFIGURATION_FAILURE",
            Reason::Registry => "REGISTRY",
        }
    }
}

#[derive(Error, Debug)]
pub enum OlapServiceError {
    #[error("Insufficient permission on catalog '{catalog}'")]
    AccessDenied { catalog: String },

    #[error("Catalog '{0}' already exists")]
    AlreadyExists(String),

    #[error("Catalog '{0}' not found")]
    NotFound(String),

    #[error("Engine failure: {message}")]
    EngineFailure {
        message: String,
        #[source]
        source: Option<EngineError>,
    },

    #[error("Configuration error: {message}")]
    ConfigurationFailure { message: String },

    #[error("Catalog registry error: {message}")]
    Registry { message: String },
}

impl OlapServiceError {
    pub fn access_denied(catalog: &str) -> Self {
        Self::AccessDenied {
            catalog: catalog.to_string(),
        }
    }

    pub fn engine(message: impl Into<String>, source: impl Into<EngineError>) -> Self {
        Self::EngineFailure {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn engine_message(message: impl Into<String>) -> Self {
        Self::EngineFailure {
            message: message.into(),
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigurationFailure {
            message: message.into(),
        }
    }

    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry {
            message: message.into(),
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            Self::AccessDenied { .. } => Reason::AccessDenied,
            Self::AlreadyExists(_) => Reason::AlreadyExists,
            Self::NotFound(_) => Reason::NotFound,
            Self::EngineFailure { .. } => Reason::EngineFailure,
            Self::ConfigurationFailure { .. } => Reason::ConfigurationFailure,
            Self::Registry { .. } => Reason::Registry,
        }
    }
}
