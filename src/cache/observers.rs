//! Observers that keep product and brand caches consistent.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::entities::{ProductChange, ProductSnapshot};

use super::config::PopularityExtension;
use super::error::CacheError;
use super::events::{Entity, EntityChange, ModelObserver};
use super::items::{ItemCache, ItemKind};
use super::lists::ListRepopulator;
use super::patch::ListPatcher;
use super::planner::{ListAction, RefreshPlan};
use super::store::TagStore;

/// Reacts to product saves and deletes.
///
/// Every event clears the product's item cache; the list caches it touches
/// are decided by `RefreshPlan`.
pub struct ProductObserver {
    store: Arc<dyn TagStore>,
    items: ItemCache,
    lists: Arc<dyn ListRepopulator>,
    patcher: ListPatcher,
    popularity: Option<PopularityExtension>,
}

impl ProductObserver {
    pub fn new(
        store: Arc<dyn TagStore>,
        lists: Arc<dyn ListRepopulator>,
        popularity: Option<PopularityExtension>,
    ) -> Self {
        Self {
            items: ItemCache::for_kind(store.clone(), ItemKind::Product),
            patcher: ListPatcher::new(store.clone(), lists.clone()),
            store,
            lists,
            popularity,
        }
    }

    pub fn on_save(&self, change: &ProductChange) -> Result<RefreshPlan, CacheError> {
        let plan = RefreshPlan::for_save(change, self.popularity.as_ref());
        self.apply(&plan)?;
        Ok(plan)
    }

    pub fn on_delete(&self, product: &ProductSnapshot) -> Result<RefreshPlan, CacheError> {
        let plan = RefreshPlan::for_delete(product);
        self.apply(&plan)?;
        Ok(plan)
    }

    fn apply(&self, plan: &RefreshPlan) -> Result<(), CacheError> {
        self.items.clear(plan.product.0)?;

        for action in &plan.actions {
            match *action {
                ListAction::Rebuild(list) => {
                    self.store.clear(&list.tags(), &list.cache_key())?;
                    self.lists.repopulate(list)?;
                }
                ListAction::Refresh(sort) => {
                    self.lists.refresh_sorting(sort)?;
                }
                ListAction::Add(list) => {
                    self.patcher.add(list, plan.product)?;
                }
                ListAction::Remove(list) => {
                    self.patcher.remove(list, plan.product)?;
                }
            }
        }

        if plan.is_item_only() {
            debug!(product_id = %plan.product, "Product cache refreshed: item only");
        } else {
            info!(plan = %plan, "Product cache refreshed");
        }
        Ok(())
    }
}

impl ModelObserver for ProductObserver {
    fn after_save(&self, change: &EntityChange) -> Result<(), CacheError> {
        let EntityChange::Product(change) = change else {
            return Ok(());
        };
        self.on_save(change).map(|_| ())
    }

    fn after_delete(&self, entity: &Entity) -> Result<(), CacheError> {
        let Entity::Product(product) = entity else {
            return Ok(());
        };
        self.on_delete(product).map(|_| ())
    }
}

/// Brands have no list caches; only the item entry is dropped.
pub struct BrandObserver {
    items: ItemCache,
}

impl BrandObserver {
    pub fn new(store: Arc<dyn TagStore>) -> Self {
        Self {
            items: ItemCache::for_kind(store, ItemKind::Brand),
        }
    }
}

impl ModelObserver for BrandObserver {
    fn after_save(&self, change: &EntityChange) -> Result<(), CacheError> {
        let EntityChange::Brand(brand) = change else {
            return Ok(());
        };
        Ok(self.items.clear(brand.id.0)?)
    }

    fn after_delete(&self, entity: &Entity) -> Result<(), CacheError> {
        let Entity::Brand(brand) = entity else {
            return Ok(());
        };
        Ok(self.items.clear(brand.id.0)?)
    }
}
