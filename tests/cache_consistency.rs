//! End-to-end consistency of list and item caches across model events.
//!
//! Every test wires the real event bus, observers, and read-through list
//! store over an in-memory catalog, then checks what the cache holds.

use std::sync::Arc;

use catalog_cache::cache::{
    CacheConfig, CacheError, CacheKey, CacheTag, CachedValue, Entity, EntityChange, EventBus,
    ItemCache, ItemKind, ListKey, ListRepopulator, MemoryTagStore, ModelEvent, ProductListStore,
    StoreError, TagSet, TagStore, subscribe_catalog_observers,
};
use catalog_cache::domain::catalog::ProductRecord;
use catalog_cache::domain::entities::{
    BrandId, BrandSnapshot, CategoryId, ProductChange, ProductId, ProductSnapshot, SortOrder,
};
use catalog_cache::infra::catalog::InMemoryCatalog;
use serde_json::json;

struct Harness {
    catalog: Arc<InMemoryCatalog>,
    store: Arc<MemoryTagStore>,
    lists: Arc<ProductListStore>,
    bus: EventBus,
}

impl Harness {
    fn new(config: CacheConfig) -> Self {
        let catalog = Arc::new(InMemoryCatalog::new());
        for (id, active, category, popularity) in [
            (1, true, 5, 10),
            (2, true, 5, 30),
            (3, false, 7, 20),
            (4, true, 9, 0),
        ] {
            catalog.upsert_product(record(id, active, category, popularity));
        }

        let store = Arc::new(MemoryTagStore::new());
        let lists = Arc::new(ProductListStore::new(store.clone(), catalog.clone()));
        let bus = subscribe_catalog_observers(config, store.clone(), lists.clone());

        Self {
            catalog,
            store,
            lists,
            bus,
        }
    }

    fn warm(&self) {
        self.lists.active_list().expect("active list");
        for category in [5, 7, 9] {
            self.lists.by_category(category_id(category)).expect("category list");
        }
        for sort in SortOrder::ALL {
            self.lists.by_sorting(sort).expect("sorting list");
        }
    }

    fn read(&self, list: ListKey) -> Option<Vec<u64>> {
        self.store
            .get(&list.tags(), &list.cache_key())
            .expect("store read")
            .and_then(CachedValue::into_ids)
            .map(|ids| ids.into_iter().map(|id| id.0).collect())
    }

    fn seed(&self, list: ListKey, raw: &[u64]) {
        self.store
            .set_forever(
                &list.tags(),
                list.cache_key(),
                CachedValue::Ids(raw.iter().copied().map(ProductId).collect()),
            )
            .expect("seed list");
    }

    /// Persist a product and dispatch its save, as a host would.
    fn save(&self, current: ProductSnapshot) {
        let mut stored = self
            .catalog
            .product(current.id)
            .unwrap_or_else(|| record(current.id.0, false, 0, 0));
        let original = stored.snapshot.clone();
        stored.snapshot = current.clone();
        self.catalog.upsert_product(stored);

        self.bus
            .dispatch(ModelEvent::AfterSave(EntityChange::Product(
                ProductChange::new(original, current),
            )))
            .expect("dispatch save");
    }

    fn delete(&self, id: u64) {
        let removed = self.catalog.remove_product(ProductId(id)).expect("stored product");
        self.bus
            .dispatch(ModelEvent::AfterDelete(Entity::Product(removed.snapshot)))
            .expect("dispatch delete");
    }
}

fn category_id(raw: u64) -> CategoryId {
    CategoryId::non_empty(raw).expect("non-empty category")
}

fn snapshot(id: u64, active: bool, category: u64, popularity: i64) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId(id),
        active,
        category_id: CategoryId::non_empty(category),
        popularity,
    }
}

fn record(id: u64, active: bool, category: u64, popularity: i64) -> ProductRecord {
    ProductRecord {
        snapshot: snapshot(id, active, category, popularity),
        price_cents: id * 100,
        brand_id: None,
    }
}

#[test]
fn every_product_save_clears_its_item() {
    let harness = Harness::new(CacheConfig::default());
    let items = ItemCache::for_kind(harness.store.clone(), ItemKind::Product);
    items.put(1, json!({"id": 1})).expect("put item");
    items.put(2, json!({"id": 2})).expect("put item");

    harness.save(snapshot(1, true, 5, 10));

    assert_eq!(items.get(1).expect("item read"), None);
    assert_eq!(items.get(2).expect("item read"), Some(json!({"id": 2})));
}

#[test]
fn every_product_delete_clears_its_item() {
    let harness = Harness::new(CacheConfig::default());
    harness.warm();
    let items = ItemCache::for_kind(harness.store.clone(), ItemKind::Product);
    items.put(3, json!({"id": 3})).expect("put item");
    items.put(4, json!({"id": 4})).expect("put item");

    harness.delete(3);

    assert_eq!(items.get(3).expect("item read"), None);
    assert_eq!(items.get(4).expect("item read"), Some(json!({"id": 4})));
}

#[test]
fn category_move_patches_exactly_two_lists() {
    let harness = Harness::new(CacheConfig::default());
    harness.warm();
    let before_nine = harness.read(ListKey::Category(category_id(9)));
    let before_sortings: Vec<_> = SortOrder::ALL
        .into_iter()
        .map(|sort| harness.read(ListKey::Sorting(sort)))
        .collect();

    harness.save(snapshot(1, true, 7, 10));

    assert_eq!(harness.read(ListKey::Category(category_id(5))), Some(vec![2]));
    assert_eq!(
        harness.read(ListKey::Category(category_id(7))),
        Some(vec![3, 1])
    );
    assert_eq!(harness.read(ListKey::Category(category_id(9))), before_nine);
    let after_sortings: Vec<_> = SortOrder::ALL
        .into_iter()
        .map(|sort| harness.read(ListKey::Sorting(sort)))
        .collect();
    assert_eq!(after_sortings, before_sortings);
}

#[test]
fn active_flip_rebuilds_from_source_instead_of_patching() {
    let harness = Harness::new(CacheConfig::default());
    // A patch would keep the bogus member; a rebuild replaces the list.
    harness.seed(ListKey::Active, &[99, 1, 2, 4]);

    harness.save(snapshot(3, true, 7, 20));

    assert_eq!(harness.read(ListKey::Active), Some(vec![1, 2, 3, 4]));
}

#[test]
fn delete_sweeps_every_sorting_list_and_rebuilds_missing_ones() {
    let harness = Harness::new(CacheConfig::default());
    harness.warm();
    let newest = ListKey::Sorting(SortOrder::Newest);
    harness
        .store
        .clear(&newest.tags(), &newest.cache_key())
        .expect("clear newest");

    harness.delete(2);

    for sort in SortOrder::ALL {
        let ids = harness
            .read(ListKey::Sorting(sort))
            .expect("sorting list present");
        assert!(!ids.contains(&2), "{sort} still lists product 2");
    }
    assert_eq!(harness.read(newest), Some(vec![4, 3, 1]));
    assert_eq!(harness.read(ListKey::Active), Some(vec![1, 4]));
    assert_eq!(harness.read(ListKey::Category(category_id(5))), Some(vec![1]));
}

#[test]
fn popularity_refresh_requires_the_extension() {
    let stale = [4, 3, 2, 1];
    let popularity = ListKey::Sorting(SortOrder::PopularityDesc);

    let without = Harness::new(CacheConfig::default());
    without.seed(popularity, &stale);
    without.save(snapshot(4, true, 9, 50));
    assert_eq!(without.read(popularity), Some(stale.to_vec()));

    let with = Harness::new(CacheConfig {
        popularity_extension: true,
        ..Default::default()
    });
    with.seed(popularity, &stale);
    with.save(snapshot(4, true, 9, 50));
    assert_eq!(with.read(popularity), Some(vec![4, 2, 3, 1]));
}

#[test]
fn tag_flush_removes_only_tagged_entries() {
    let harness = Harness::new(CacheConfig::default());
    harness.warm();
    let items = ItemCache::for_kind(harness.store.clone(), ItemKind::Product);
    items.put(1, json!("item")).expect("put item");
    let before = harness.store.len();

    let removed = harness
        .store
        .flush_tag(CacheTag::CategoryElement)
        .expect("flush");

    assert_eq!(removed, 3);
    assert_eq!(harness.store.len(), before - 3);
    assert_eq!(harness.read(ListKey::Category(category_id(5))), None);
    assert!(harness.read(ListKey::Active).is_some());
    assert_eq!(items.get(1).expect("item read"), Some(json!("item")));
}

#[test]
fn same_key_under_different_tags_is_a_different_entry() {
    let store = MemoryTagStore::new();
    let lists = TagSet::new([CacheTag::Catalog, CacheTag::ProductList]);
    let items = TagSet::new([CacheTag::Catalog, CacheTag::ProductElement]);

    store
        .set_forever(&lists, CacheKey::Item(1), CachedValue::Ids(vec![ProductId(1)]))
        .expect("write");

    assert_eq!(store.get(&items, &CacheKey::Item(1)).expect("read"), None);
}

#[test]
fn brand_events_touch_only_brand_items() {
    let harness = Harness::new(CacheConfig::default());
    harness.warm();
    let brands = ItemCache::for_kind(harness.store.clone(), ItemKind::Brand);
    brands.put(8, json!("brand")).expect("put brand");
    let before = harness.store.len();

    harness
        .bus
        .dispatch(ModelEvent::AfterDelete(Entity::Brand(BrandSnapshot {
            id: BrandId(8),
        })))
        .expect("dispatch");

    assert_eq!(brands.get(8).expect("brand read"), None);
    assert_eq!(harness.store.len(), before - 1);
}

/// Store whose reads fail, to observe error propagation.
struct UnreachableStore;

impl TagStore for UnreachableStore {
    fn get(&self, _tags: &TagSet, _key: &CacheKey) -> Result<Option<CachedValue>, StoreError> {
        Err(StoreError::Unavailable)
    }

    fn set_forever(
        &self,
        _tags: &TagSet,
        _key: CacheKey,
        _value: CachedValue,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    fn clear(&self, _tags: &TagSet, _key: &CacheKey) -> Result<bool, StoreError> {
        Ok(false)
    }

    fn flush_tag(&self, _tag: CacheTag) -> Result<usize, StoreError> {
        Ok(0)
    }
}

#[test]
fn store_failures_propagate_out_of_dispatch() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let store: Arc<dyn TagStore> = Arc::new(UnreachableStore);
    let lists = Arc::new(ProductListStore::new(store.clone(), catalog));
    let bus = subscribe_catalog_observers(CacheConfig::default(), store, lists);

    let err = bus
        .dispatch(ModelEvent::AfterDelete(Entity::Product(snapshot(
            1, false, 0, 0,
        ))))
        .expect_err("unreachable store");

    assert!(matches!(err, CacheError::Store(StoreError::Unavailable)));
}
