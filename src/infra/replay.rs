//! Event replay against an in-memory catalog.
//!
//! Each event line is persisted to the catalog first and dispatched second,
//! the order a host application runs its model hooks in. Events are JSON
//! objects tagged by channel:
//!
//! ```text
//! {"event":"product.after.save","product":{"id":7,"active":true,"category_id":5}}
//! {"event":"product.after.delete","product":{"id":7}}
//! {"event":"brand.after.save","brand":{"id":1,"name":"Acme"}}
//! {"event":"brand.after.delete","brand":{"id":1}}
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{
    CacheConfig, CacheEvent, CachedValue, Entity, EntityChange, EventBus, ItemCache, ItemKind,
    ListKey, ListRepopulator, MemoryTagStore, ModelEvent, ProductListStore, ProductSource,
    TagStore, subscribe_catalog_observers,
};
use crate::domain::catalog::{BrandRecord, ProductRecord};
use crate::domain::entities::{
    BrandSnapshot, CategoryId, ProductChange, ProductId, ProductSnapshot, SortOrder,
};

use super::catalog::{CatalogFixture, InMemoryCatalog};
use super::error::InfraError;

/// One line of a replay file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event")]
pub enum ReplayEvent {
    #[serde(rename = "product.after.save")]
    ProductSaved {
        product: ProductRecord,
        /// Pre-save state as the host saw it. Defaults to the stored record.
        #[serde(default)]
        original: Option<ProductSnapshot>,
    },
    #[serde(rename = "product.after.delete")]
    ProductDeleted { product: ProductSnapshot },
    #[serde(rename = "brand.after.save")]
    BrandSaved { brand: BrandRecord },
    #[serde(rename = "brand.after.delete")]
    BrandDeleted { brand: BrandSnapshot },
}

impl ReplayEvent {
    /// Reject events that cannot describe a single entity.
    fn validate(&self) -> Result<(), String> {
        if let ReplayEvent::ProductSaved {
            product,
            original: Some(original),
        } = self
            && original.id != product.id()
        {
            return Err(format!(
                "original product {} does not match saved product {}",
                original.id,
                product.id()
            ));
        }
        Ok(())
    }
}

/// Parse a JSON-lines replay file. Blank lines and `#` comments are skipped.
pub fn parse_events(input: &str) -> Result<Vec<ReplayEvent>, InfraError> {
    let mut events = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: ReplayEvent = serde_json::from_str(line)
            .map_err(|err| InfraError::event(index + 1, err.to_string()))?;
        event
            .validate()
            .map_err(|reason| InfraError::event(index + 1, reason))?;
        events.push(event);
    }
    Ok(events)
}

/// A cached list whose membership disagrees with the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListDrift {
    pub list: String,
    /// Cached IDs the catalog no longer places in the list.
    pub stale: Vec<ProductId>,
    /// IDs the catalog places in the list that the cache lacks.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<ProductId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemCounts {
    pub products: usize,
    pub brands: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub events: usize,
    pub dispatched: usize,
    /// Every known list by label; `None` when the entry is not cached.
    pub lists: BTreeMap<String, Option<Vec<ProductId>>>,
    /// Item documents still cached.
    pub items: ItemCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drift: Option<Vec<ListDrift>>,
}

impl ReplayReport {
    pub fn is_consistent(&self) -> bool {
        self.drift.as_ref().is_none_or(Vec::is_empty)
    }
}

#[derive(Debug, Clone)]
pub struct ReplayOptions {
    pub fixture: PathBuf,
    pub events: PathBuf,
    pub verify: bool,
}

/// Load the fixture, warm every cache, replay the events, and report.
pub fn run(options: &ReplayOptions, config: CacheConfig) -> Result<ReplayReport, InfraError> {
    let events = parse_events(&fs::read_to_string(&options.events)?)?;

    info!(
        fixture = %options.fixture.display(),
        events = events.len(),
        enabled = config.is_enabled(),
        "Replay started"
    );

    let mut session = open_session(&options.fixture, config)?;
    session.warm()?;

    let total = events.len();
    let mut dispatched = 0;
    for event in events {
        if session.apply(event)?.is_some() {
            dispatched += 1;
        }
    }

    let drift = if options.verify {
        Some(session.verify()?)
    } else {
        None
    };

    let report = ReplayReport {
        events: total,
        dispatched,
        lists: session.lists(),
        items: session.item_counts()?,
        drift,
    };

    if report.is_consistent() {
        info!(events = total, dispatched, "Replay finished");
    } else {
        warn!(events = total, dispatched, "Replay finished with drifted lists");
    }
    Ok(report)
}

/// Catalog, cache, and event bus wired together for one replay.
pub struct ReplaySession {
    catalog: Arc<InMemoryCatalog>,
    store: Arc<MemoryTagStore>,
    lists: Arc<ProductListStore>,
    bus: EventBus,
    categories: BTreeSet<CategoryId>,
}

impl ReplaySession {
    pub fn new(catalog: Arc<InMemoryCatalog>, config: CacheConfig) -> Self {
        let store = Arc::new(MemoryTagStore::new());
        let lists = Arc::new(ProductListStore::new(store.clone(), catalog.clone()));
        let bus = subscribe_catalog_observers(config, store.clone(), lists.clone());
        let categories = catalog.categories();

        Self {
            catalog,
            store,
            lists,
            bus,
            categories,
        }
    }

    /// Populate every list and item cache from the catalog.
    pub fn warm(&self) -> Result<(), InfraError> {
        self.lists.active_list()?;
        for category in &self.categories {
            self.lists.by_category(*category)?;
        }
        for sort in SortOrder::ALL {
            self.lists.by_sorting(sort)?;
        }

        let products = ItemCache::for_kind(self.store.clone(), ItemKind::Product);
        for record in self.catalog.products() {
            products.put(record.id().0, document(&record)?)?;
        }
        let brands = ItemCache::for_kind(self.store.clone(), ItemKind::Brand);
        for record in self.catalog.brands() {
            brands.put(record.id.0, document(&record)?)?;
        }

        debug!(entries = self.store.len(), "Caches warmed");
        Ok(())
    }

    /// Persist the event's change to the catalog, then dispatch it.
    pub fn apply(&mut self, event: ReplayEvent) -> Result<Option<CacheEvent>, InfraError> {
        let model_event = match event {
            ReplayEvent::ProductSaved { product, original } => {
                let previous = self.catalog.upsert_product(product.clone());
                let original = original.or(previous.map(|record| record.snapshot));
                let current = product.snapshot;
                let change = match original {
                    Some(original) => ProductChange::new(original, current),
                    None => ProductChange::created(current),
                };
                self.track(change.current.category_id);
                self.track(change.original.category_id);
                ModelEvent::AfterSave(EntityChange::Product(change))
            }
            ReplayEvent::ProductDeleted { product } => {
                let snapshot = self
                    .catalog
                    .remove_product(product.id)
                    .map(|record| record.snapshot)
                    .unwrap_or(product);
                self.track(snapshot.category_id);
                ModelEvent::AfterDelete(Entity::Product(snapshot))
            }
            ReplayEvent::BrandSaved { brand } => {
                let snapshot = BrandSnapshot { id: brand.id };
                self.catalog.upsert_brand(brand);
                ModelEvent::AfterSave(EntityChange::Brand(snapshot))
            }
            ReplayEvent::BrandDeleted { brand } => {
                self.catalog.remove_brand(brand.id);
                ModelEvent::AfterDelete(Entity::Brand(brand))
            }
        };

        Ok(self.bus.dispatch(model_event)?)
    }

    /// Every list the session knows of, with its cached IDs if present.
    pub fn lists(&self) -> BTreeMap<String, Option<Vec<ProductId>>> {
        self.known_lists()
            .map(|list| (label(list), self.cached(list)))
            .collect()
    }

    /// Compare cached lists against the catalog.
    ///
    /// Active and category lists must match as sets. Sorting lists only need
    /// to hold no stale IDs: saves never append to them.
    pub fn verify(&self) -> Result<Vec<ListDrift>, InfraError> {
        let mut drift = Vec::new();

        for list in self.known_lists() {
            let Some(cached) = self.cached(list) else {
                continue;
            };
            let expected: BTreeSet<ProductId> = match list {
                ListKey::Active => self.catalog.active_ids(),
                ListKey::Category(category) => self.catalog.ids_in_category(category),
                ListKey::Sorting(sort) => self.catalog.ids_sorted(sort),
            }?
            .into_iter()
            .collect();
            let cached_set: BTreeSet<ProductId> = cached.iter().copied().collect();

            let stale: Vec<ProductId> = cached_set.difference(&expected).copied().collect();
            let missing: Vec<ProductId> = match list {
                ListKey::Sorting(_) => Vec::new(),
                _ => expected.difference(&cached_set).copied().collect(),
            };

            if !stale.is_empty() || !missing.is_empty() {
                warn!(list = %list, stale = stale.len(), missing = missing.len(), "Cached list drifted");
                drift.push(ListDrift {
                    list: label(list),
                    stale,
                    missing,
                });
            }
        }

        Ok(drift)
    }

    pub fn item_counts(&self) -> Result<ItemCounts, InfraError> {
        let products = ItemCache::for_kind(self.store.clone(), ItemKind::Product);
        let brands = ItemCache::for_kind(self.store.clone(), ItemKind::Brand);
        let mut counts = ItemCounts::default();

        for record in self.catalog.products() {
            if products.get(record.id().0)?.is_some() {
                counts.products += 1;
            }
        }
        for record in self.catalog.brands() {
            if brands.get(record.id.0)?.is_some() {
                counts.brands += 1;
            }
        }
        Ok(counts)
    }

    fn track(&mut self, category: Option<CategoryId>) {
        if let Some(category) = category {
            self.categories.insert(category);
        }
    }

    fn known_lists(&self) -> impl Iterator<Item = ListKey> + '_ {
        std::iter::once(ListKey::Active)
            .chain(self.categories.iter().copied().map(ListKey::Category))
            .chain(SortOrder::ALL.into_iter().map(ListKey::Sorting))
    }

    /// Raw cached IDs, including an empty list.
    fn cached(&self, list: ListKey) -> Option<Vec<ProductId>> {
        self.store
            .get(&list.tags(), &list.cache_key())
            .ok()
            .flatten()
            .and_then(CachedValue::into_ids)
    }
}

fn label(list: ListKey) -> String {
    match list {
        ListKey::Active => "active".to_string(),
        ListKey::Category(category) => format!("category:{category}"),
        ListKey::Sorting(sort) => format!("sorting:{sort}"),
    }
}

fn document<T: Serialize>(record: &T) -> Result<serde_json::Value, InfraError> {
    Ok(serde_json::to_value(record)?)
}

/// Read the fixture at `path` and build a session over it.
pub fn open_session(path: &Path, config: CacheConfig) -> Result<ReplaySession, InfraError> {
    let fixture = CatalogFixture::load(path)?;
    let catalog = Arc::new(InMemoryCatalog::from_fixture(fixture)?);
    Ok(ReplaySession::new(catalog, config))
}
