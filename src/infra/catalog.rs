//! In-memory catalog used as the source of truth for list rebuilds.
//!
//! Loaded from a TOML fixture:
//!
//! ```toml
//! [[products]]
//! id = 1
//! active = true
//! category_id = 5
//! popularity = 12
//! price_cents = 1999
//!
//! [[brands]]
//! id = 1
//! name = "Acme"
//! ```

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::cache::lock::{rw_read, rw_write};
use crate::cache::{ProductSource, SourceError};
use crate::domain::catalog::{BrandRecord, ProductRecord};
use crate::domain::entities::{BrandId, CategoryId, ProductId, SortOrder};
use crate::domain::error::DomainError;

use super::error::InfraError;

const SOURCE: &str = "infra::catalog";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFixture {
    pub products: Vec<ProductRecord>,
    pub brands: Vec<BrandRecord>,
}

impl CatalogFixture {
    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let data = fs::read_to_string(path)?;
        toml::from_str(&data).map_err(|err| InfraError::fixture(path, err.to_string()))
    }
}

/// Products and brands keyed by ID.
///
/// Every product, active or not, is a member of its category list and of
/// every sorting list. The active list holds active products only.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<BTreeMap<ProductId, ProductRecord>>,
    brands: RwLock<BTreeMap<BrandId, BrandRecord>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fixture(fixture: CatalogFixture) -> Result<Self, DomainError> {
        let mut products = BTreeMap::new();
        for record in fixture.products {
            let id = record.id();
            if products.insert(id, record).is_some() {
                return Err(DomainError::DuplicateProduct(id));
            }
        }

        let mut brands = BTreeMap::new();
        for record in fixture.brands {
            let id = record.id;
            if brands.insert(id, record).is_some() {
                return Err(DomainError::DuplicateBrand(id));
            }
        }

        Ok(Self {
            products: RwLock::new(products),
            brands: RwLock::new(brands),
        })
    }

    pub fn product(&self, id: ProductId) -> Option<ProductRecord> {
        rw_read(&self.products, SOURCE, "product")
            .get(&id)
            .cloned()
    }

    pub fn products(&self) -> Vec<ProductRecord> {
        rw_read(&self.products, SOURCE, "products")
            .values()
            .cloned()
            .collect()
    }

    pub fn brands(&self) -> Vec<BrandRecord> {
        rw_read(&self.brands, SOURCE, "brands")
            .values()
            .cloned()
            .collect()
    }

    /// Categories that currently hold at least one product.
    pub fn categories(&self) -> BTreeSet<CategoryId> {
        rw_read(&self.products, SOURCE, "categories")
            .values()
            .filter_map(ProductRecord::category)
            .collect()
    }

    /// Insert or replace a product, returning the previous record.
    pub fn upsert_product(&self, record: ProductRecord) -> Option<ProductRecord> {
        rw_write(&self.products, SOURCE, "upsert_product").insert(record.id(), record)
    }

    pub fn remove_product(&self, id: ProductId) -> Option<ProductRecord> {
        rw_write(&self.products, SOURCE, "remove_product").remove(&id)
    }

    pub fn upsert_brand(&self, record: BrandRecord) -> Option<BrandRecord> {
        rw_write(&self.brands, SOURCE, "upsert_brand").insert(record.id, record)
    }

    pub fn remove_brand(&self, id: BrandId) -> Option<BrandRecord> {
        rw_write(&self.brands, SOURCE, "remove_brand").remove(&id)
    }
}

impl ProductSource for InMemoryCatalog {
    fn active_ids(&self) -> Result<Vec<ProductId>, SourceError> {
        Ok(rw_read(&self.products, SOURCE, "active_ids")
            .values()
            .filter(|record| record.is_active())
            .map(ProductRecord::id)
            .collect())
    }

    fn ids_in_category(&self, category: CategoryId) -> Result<Vec<ProductId>, SourceError> {
        Ok(rw_read(&self.products, SOURCE, "ids_in_category")
            .values()
            .filter(|record| record.category() == Some(category))
            .map(ProductRecord::id)
            .collect())
    }

    fn ids_sorted(&self, sort: SortOrder) -> Result<Vec<ProductId>, SourceError> {
        let guard = rw_read(&self.products, SOURCE, "ids_sorted");
        // Map iteration is ID-ascending; stable sorts keep that as the tiebreak.
        let mut records: Vec<&ProductRecord> = guard.values().collect();

        match sort {
            SortOrder::PriceAsc => records.sort_by_key(|record| record.price_cents),
            SortOrder::PriceDesc => records.sort_by_key(|record| Reverse(record.price_cents)),
            SortOrder::Newest => records.sort_by_key(|record| Reverse(record.id())),
            SortOrder::PopularityDesc => records.sort_by_key(|record| Reverse(record.popularity())),
            SortOrder::Default => {}
        }

        Ok(records.into_iter().map(ProductRecord::id).collect())
    }
}
