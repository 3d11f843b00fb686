use std::path::PathBuf;

use thiserror::Error;

use crate::cache::{CacheError, SourceError, StoreError};
use crate::domain::error::DomainError;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("invalid fixture `{path}`: {message}")]
    Fixture { path: PathBuf, message: String },
    #[error("invalid event on line {line}: {message}")]
    Event { line: usize, message: String },
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<StoreError> for InfraError {
    fn from(err: StoreError) -> Self {
        Self::Cache(err.into())
    }
}

impl From<SourceError> for InfraError {
    fn from(err: SourceError) -> Self {
        Self::Cache(err.into())
    }
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }

    pub fn fixture(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Fixture {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn event(line: usize, message: impl Into<String>) -> Self {
        Self::Event {
            line,
            message: message.into(),
        }
    }
}
