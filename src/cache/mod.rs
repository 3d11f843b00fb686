//! Catalog cache consistency.
//!
//! Keeps single-item caches and product ID list caches consistent with the
//! catalog as products and brands are saved or deleted:
//!
//! - **Store**: tag-indexed entries that never expire (`TagStore`)
//! - **Lists**: read-through list caches and their repopulation (`ListRepopulator`)
//! - **Planner**: field-level change detection (`RefreshPlan`)
//! - **Observers**: plan execution on model events (`ProductObserver`, `BrandObserver`)
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! popularity_extension = false
//! ```

use std::sync::Arc;

mod config;
mod error;
mod events;
mod items;
mod keys;
mod lists;
pub(crate) mod lock;
mod observers;
mod patch;
mod planner;
mod registry;
mod store;

pub use config::{CacheConfig, PopularityExtension};
pub use error::CacheError;
pub use events::{CacheEvent, Entity, EntityChange, Epoch, EventBus, ModelEvent, ModelObserver};
pub use items::{ItemCache, ItemKind};
pub use keys::{CacheKey, CacheTag, EntryAddress, ListKey, TagSet};
pub use lists::{ListRepopulator, ProductListStore, ProductSource, SourceError};
pub use observers::{BrandObserver, ProductObserver};
pub use patch::{ListPatcher, PatchOp, PatchOutcome};
pub use planner::{ListAction, RefreshPlan};
pub use registry::TagIndex;
pub use store::{CachedValue, MemoryTagStore, StoreError, TagStore};

/// Event bus with the product and brand observers subscribed.
///
/// The popularity capability is resolved here, once, from `config`.
pub fn subscribe_catalog_observers(
    config: CacheConfig,
    store: Arc<dyn TagStore>,
    lists: Arc<dyn ListRepopulator>,
) -> EventBus {
    let popularity = config.popularity_extension();
    let mut bus = EventBus::new(config);
    bus.subscribe(Arc::new(ProductObserver::new(
        store.clone(),
        lists,
        popularity,
    )));
    bus.subscribe(Arc::new(BrandObserver::new(store)));
    bus
}
