use thiserror::Error;

use super::lists::SourceError;
use super::store::StoreError;

/// Failure surfaced while keeping caches consistent. Never masked: the
/// dispatcher hands it straight back to the caller.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("list repopulation failed: {0}")]
    Source(#[from] SourceError),
}
