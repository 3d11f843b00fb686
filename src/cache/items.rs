//! Single-item caches, one per entity type.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::keys::{CacheKey, CacheTag, TagSet};
use super::store::{CachedValue, StoreError, TagStore};

/// Entity types that have a materialized single-item cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Product,
    Brand,
}

impl ItemKind {
    pub fn element_tag(self) -> CacheTag {
        match self {
            ItemKind::Product => CacheTag::ProductElement,
            ItemKind::Brand => CacheTag::BrandElement,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemKind::Product => "product",
            ItemKind::Brand => "brand",
        }
    }
}

/// Handle on the single-item cache of one entity type.
#[derive(Clone)]
pub struct ItemCache {
    store: Arc<dyn TagStore>,
    kind: ItemKind,
    tags: TagSet,
}

impl ItemCache {
    pub fn for_kind(store: Arc<dyn TagStore>, kind: ItemKind) -> Self {
        Self {
            store,
            kind,
            tags: TagSet::new([CacheTag::Catalog, kind.element_tag()]),
        }
    }

    pub fn get(&self, id: u64) -> Result<Option<Value>, StoreError> {
        Ok(self
            .store
            .get(&self.tags, &CacheKey::Item(id))?
            .and_then(CachedValue::into_document))
    }

    pub fn put(&self, id: u64, document: Value) -> Result<(), StoreError> {
        self.store
            .set_forever(&self.tags, CacheKey::Item(id), CachedValue::Document(document))
    }

    /// Drop the materialized item so the next read rebuilds it.
    pub fn clear(&self, id: u64) -> Result<(), StoreError> {
        let existed = self.store.clear(&self.tags, &CacheKey::Item(id))?;
        debug!(kind = self.kind.as_str(), id, existed, "Cleared item cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cache::store::MemoryTagStore;

    #[test]
    fn put_get_clear() {
        let store = Arc::new(MemoryTagStore::new());
        let products = ItemCache::for_kind(store, ItemKind::Product);

        products
            .put(11, json!({"name": "Kettle"}))
            .expect("put");
        assert_eq!(
            products.get(11).expect("get"),
            Some(json!({"name": "Kettle"}))
        );

        products.clear(11).expect("clear");
        assert_eq!(products.get(11).expect("get"), None);
    }

    #[test]
    fn clearing_an_absent_item_is_not_an_error() {
        let store = Arc::new(MemoryTagStore::new());
        let brands = ItemCache::for_kind(store, ItemKind::Brand);
        brands.clear(99).expect("clear");
    }

    #[test]
    fn kinds_do_not_share_entries() {
        let store = Arc::new(MemoryTagStore::new());
        let products = ItemCache::for_kind(store.clone(), ItemKind::Product);
        let brands = ItemCache::for_kind(store, ItemKind::Brand);

        products.put(1, json!("product")).expect("put");
        brands.put(1, json!("brand")).expect("put");

        brands.clear(1).expect("clear");
        assert_eq!(products.get(1).expect("get"), Some(json!("product")));
    }
}
