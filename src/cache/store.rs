//! Tag-indexed cache storage.
//!
//! `TagStore` is the contract the rest of the crate writes against; a shared or
//! networked backend implements it the same way `MemoryTagStore` does. Entries
//! never expire: they live until cleared, flushed, or overwritten.

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::domain::entities::ProductId;

use super::keys::{CacheKey, CacheTag, EntryAddress, TagSet};
use super::lock::{rw_read, rw_write};
use super::registry::TagIndex;

const SOURCE: &str = "cache::store";

const METRIC_CACHE_HIT: &str = "catalog_cache_hit_total";
const METRIC_CACHE_MISS: &str = "catalog_cache_miss_total";
const METRIC_CACHE_WRITE: &str = "catalog_cache_write_total";
const METRIC_CACHE_CLEAR: &str = "catalog_cache_clear_total";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache backend error: {message}")]
    Backend { message: String },
    #[error("cache backend unavailable")]
    Unavailable,
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Value held by a cache entry.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    /// Ordered product IDs, without duplicates.
    Ids(Vec<ProductId>),
    /// A materialized single item.
    Document(Value),
}

impl CachedValue {
    pub fn into_ids(self) -> Option<Vec<ProductId>> {
        match self {
            CachedValue::Ids(ids) => Some(ids),
            CachedValue::Document(_) => None,
        }
    }

    pub fn into_document(self) -> Option<Value> {
        match self {
            CachedValue::Document(document) => Some(document),
            CachedValue::Ids(_) => None,
        }
    }
}

/// Key/value cache where every entry is addressed by a tag set and a key.
pub trait TagStore: Send + Sync {
    fn get(&self, tags: &TagSet, key: &CacheKey) -> Result<Option<CachedValue>, StoreError>;

    /// Store without expiry, replacing any value at exactly `(tags, key)`.
    fn set_forever(
        &self,
        tags: &TagSet,
        key: CacheKey,
        value: CachedValue,
    ) -> Result<(), StoreError>;

    /// Remove the entry at `(tags, key)`. Returns whether one existed.
    fn clear(&self, tags: &TagSet, key: &CacheKey) -> Result<bool, StoreError>;

    /// Remove every entry carrying `tag`. Returns how many were removed.
    fn flush_tag(&self, tag: CacheTag) -> Result<usize, StoreError>;
}

/// Process-local, unbounded `TagStore`.
///
/// The tag index is only updated while the entries write lock is held, so an
/// entry and its index record never diverge.
pub struct MemoryTagStore {
    entries: RwLock<HashMap<EntryAddress, CachedValue>>,
    index: TagIndex,
}

impl MemoryTagStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            index: TagIndex::new(),
        }
    }

    /// Get the number of stored entries.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryTagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TagStore for MemoryTagStore {
    fn get(&self, tags: &TagSet, key: &CacheKey) -> Result<Option<CachedValue>, StoreError> {
        let address = EntryAddress::new(tags.clone(), *key);
        let value = rw_read(&self.entries, SOURCE, "get").get(&address).cloned();

        if value.is_some() {
            counter!(METRIC_CACHE_HIT).increment(1);
        } else {
            counter!(METRIC_CACHE_MISS).increment(1);
        }

        Ok(value)
    }

    fn set_forever(
        &self,
        tags: &TagSet,
        key: CacheKey,
        value: CachedValue,
    ) -> Result<(), StoreError> {
        let address = EntryAddress::new(tags.clone(), key);
        let mut entries = rw_write(&self.entries, SOURCE, "set_forever");
        self.index.register(&address);
        entries.insert(address, value);
        drop(entries);

        counter!(METRIC_CACHE_WRITE).increment(1);
        Ok(())
    }

    fn clear(&self, tags: &TagSet, key: &CacheKey) -> Result<bool, StoreError> {
        let address = EntryAddress::new(tags.clone(), *key);
        let mut entries = rw_write(&self.entries, SOURCE, "clear");
        let removed = entries.remove(&address).is_some();
        if removed {
            self.index.unregister(&address);
        }
        drop(entries);

        if removed {
            counter!(METRIC_CACHE_CLEAR).increment(1);
        }
        Ok(removed)
    }

    fn flush_tag(&self, tag: CacheTag) -> Result<usize, StoreError> {
        let mut entries = rw_write(&self.entries, SOURCE, "flush_tag");
        let affected = self.index.unregister_tag(tag);
        let removed = affected
            .iter()
            .filter(|address| entries.remove(*address).is_some())
            .count();
        drop(entries);

        counter!(METRIC_CACHE_CLEAR).increment(removed as u64);
        debug!(
            tag = %tag,
            removed,
            remaining_tags = self.index.tag_count(),
            "Flushed cache tag"
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use serde_json::json;

    use super::*;
    use crate::cache::keys::ListKey;
    use crate::domain::entities::{CategoryId, SortOrder};

    fn ids(raw: &[u64]) -> CachedValue {
        CachedValue::Ids(raw.iter().copied().map(ProductId).collect())
    }

    #[test]
    fn list_roundtrip_and_clear() {
        let store = MemoryTagStore::new();
        let list = ListKey::Active;

        assert!(
            store
                .get(&list.tags(), &list.cache_key())
                .expect("get")
                .is_none()
        );

        store
            .set_forever(&list.tags(), list.cache_key(), ids(&[1, 2, 3]))
            .expect("set");
        let cached = store.get(&list.tags(), &list.cache_key()).expect("get");
        assert_eq!(cached, Some(ids(&[1, 2, 3])));

        assert!(store.clear(&list.tags(), &list.cache_key()).expect("clear"));
        assert!(!store.clear(&list.tags(), &list.cache_key()).expect("clear"));
        assert!(store.is_empty());
    }

    #[test]
    fn set_forever_overwrites_the_exact_address() {
        let store = MemoryTagStore::new();
        let list = ListKey::Sorting(SortOrder::Newest);

        store
            .set_forever(&list.tags(), list.cache_key(), ids(&[1]))
            .expect("set");
        store
            .set_forever(&list.tags(), list.cache_key(), ids(&[2, 1]))
            .expect("set");

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get(&list.tags(), &list.cache_key()).expect("get"),
            Some(ids(&[2, 1]))
        );
    }

    #[test]
    fn same_key_under_different_tags_is_a_different_entry() {
        let store = MemoryTagStore::new();
        let product_tags = TagSet::new([CacheTag::Catalog, CacheTag::ProductElement]);
        let brand_tags = TagSet::new([CacheTag::Catalog, CacheTag::BrandElement]);

        store
            .set_forever(
                &product_tags,
                CacheKey::Item(7),
                CachedValue::Document(json!({"kind": "product"})),
            )
            .expect("set");

        assert!(
            store
                .get(&brand_tags, &CacheKey::Item(7))
                .expect("get")
                .is_none()
        );
        assert!(
            !store
                .clear(&brand_tags, &CacheKey::Item(7))
                .expect("clear")
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn flush_tag_removes_only_tagged_entries() {
        let store = MemoryTagStore::new();
        let category = ListKey::Category(CategoryId::non_empty(5).expect("non-empty category"));
        let newest = ListKey::Sorting(SortOrder::Newest);
        let item_tags = TagSet::new([CacheTag::Catalog, CacheTag::ProductElement]);

        store
            .set_forever(&category.tags(), category.cache_key(), ids(&[1]))
            .expect("set");
        store
            .set_forever(&newest.tags(), newest.cache_key(), ids(&[1, 2]))
            .expect("set");
        store
            .set_forever(
                &item_tags,
                CacheKey::Item(1),
                CachedValue::Document(json!({})),
            )
            .expect("set");

        assert_eq!(store.flush_tag(CacheTag::ProductList).expect("flush"), 2);
        assert_eq!(store.len(), 1);
        assert!(
            store
                .get(&item_tags, &CacheKey::Item(1))
                .expect("get")
                .is_some()
        );

        assert_eq!(store.flush_tag(CacheTag::Catalog).expect("flush"), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_clear_and_set_keep_entries_flushable() {
        let store = MemoryTagStore::new();
        let list = ListKey::Active;
        let tags = list.tags();

        for _ in 0..200 {
            std::thread::scope(|scope| {
                scope.spawn(|| {
                    for _ in 0..20 {
                        store
                            .set_forever(&tags, list.cache_key(), ids(&[1]))
                            .expect("set");
                    }
                });
                scope.spawn(|| {
                    for _ in 0..20 {
                        store.clear(&tags, &list.cache_key()).expect("clear");
                    }
                });
            });

            store.flush_tag(CacheTag::Catalog).expect("flush");
            assert!(store.is_empty());
            assert_eq!(store.index.tag_count(), 0);
        }
    }

    #[test]
    fn memory_store_recovers_from_poisoned_lock() {
        let store = MemoryTagStore::new();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        let list = ListKey::Active;
        store
            .set_forever(&list.tags(), list.cache_key(), ids(&[4]))
            .expect("set");
        assert_eq!(
            store.get(&list.tags(), &list.cache_key()).expect("get"),
            Some(ids(&[4]))
        );
    }
}
