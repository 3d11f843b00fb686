//! Product ID list repopulation.
//!
//! `ListRepopulator` is what the updater calls when a list it wants to patch is
//! missing. `ProductListStore` implements it as a read-through cache over a
//! `ProductSource`, the authoritative listing queries.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::domain::entities::{CategoryId, ProductId, SortOrder};

use super::error::CacheError;
use super::keys::ListKey;
use super::store::{CachedValue, TagStore};

const METRIC_LIST_REBUILD: &str = "catalog_cache_list_rebuild_total";

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("product source error: {0}")]
    Query(String),
    #[error("product source timeout")]
    Timeout,
}

impl SourceError {
    pub fn query(err: impl std::fmt::Display) -> Self {
        Self::Query(err.to_string())
    }
}

/// Listing queries against the source of truth.
pub trait ProductSource: Send + Sync {
    fn active_ids(&self) -> Result<Vec<ProductId>, SourceError>;

    fn ids_in_category(&self, category: CategoryId) -> Result<Vec<ProductId>, SourceError>;

    fn ids_sorted(&self, sort: SortOrder) -> Result<Vec<ProductId>, SourceError>;
}

/// Reads that rebuild and store a list when its cache entry is missing.
pub trait ListRepopulator: Send + Sync {
    fn active_list(&self) -> Result<Vec<ProductId>, CacheError>;

    fn by_category(&self, category: CategoryId) -> Result<Vec<ProductId>, CacheError>;

    fn by_sorting(&self, sort: SortOrder) -> Result<Vec<ProductId>, CacheError>;

    /// Recompute and overwrite a sorting list whether or not it is cached.
    fn refresh_sorting(&self, sort: SortOrder) -> Result<Vec<ProductId>, CacheError>;

    fn repopulate(&self, list: ListKey) -> Result<Vec<ProductId>, CacheError> {
        match list {
            ListKey::Active => self.active_list(),
            ListKey::Category(category) => self.by_category(category),
            ListKey::Sorting(sort) => self.by_sorting(sort),
        }
    }
}

/// Read-through list cache backed by a `TagStore`.
pub struct ProductListStore {
    store: Arc<dyn TagStore>,
    source: Arc<dyn ProductSource>,
}

impl ProductListStore {
    pub fn new(store: Arc<dyn TagStore>, source: Arc<dyn ProductSource>) -> Self {
        Self { store, source }
    }

    /// Cached list, or `None` when the entry is absent, empty, or not a list.
    pub fn cached(&self, list: ListKey) -> Result<Option<Vec<ProductId>>, CacheError> {
        let cached = self
            .store
            .get(&list.tags(), &list.cache_key())?
            .and_then(CachedValue::into_ids)
            .filter(|ids| !ids.is_empty());
        Ok(cached)
    }

    fn read_through(&self, list: ListKey) -> Result<Vec<ProductId>, CacheError> {
        if let Some(ids) = self.cached(list)? {
            return Ok(ids);
        }
        self.rebuild(list)
    }

    fn rebuild(&self, list: ListKey) -> Result<Vec<ProductId>, CacheError> {
        let ids = match list {
            ListKey::Active => self.source.active_ids()?,
            ListKey::Category(category) => self.source.ids_in_category(category)?,
            ListKey::Sorting(sort) => self.source.ids_sorted(sort)?,
        };

        self.store.set_forever(
            &list.tags(),
            list.cache_key(),
            CachedValue::Ids(ids.clone()),
        )?;

        counter!(METRIC_LIST_REBUILD, "list" => list.kind()).increment(1);
        info!(list = %list, count = ids.len(), "Rebuilt product list cache");
        Ok(ids)
    }
}

impl ListRepopulator for ProductListStore {
    fn active_list(&self) -> Result<Vec<ProductId>, CacheError> {
        self.read_through(ListKey::Active)
    }

    fn by_category(&self, category: CategoryId) -> Result<Vec<ProductId>, CacheError> {
        self.read_through(ListKey::Category(category))
    }

    fn by_sorting(&self, sort: SortOrder) -> Result<Vec<ProductId>, CacheError> {
        self.read_through(ListKey::Sorting(sort))
    }

    fn refresh_sorting(&self, sort: SortOrder) -> Result<Vec<ProductId>, CacheError> {
        self.rebuild(ListKey::Sorting(sort))
    }
}
