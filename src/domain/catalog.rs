//! Catalog records as held by the source of truth.

use serde::{Deserialize, Serialize};

use super::entities::{BrandId, CategoryId, ProductId, ProductSnapshot};

/// A stored product with the fields list queries sort and filter on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(flatten)]
    pub snapshot: ProductSnapshot,
    #[serde(default)]
    pub price_cents: u64,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
}

impl ProductRecord {
    pub fn id(&self) -> ProductId {
        self.snapshot.id
    }

    pub fn is_active(&self) -> bool {
        self.snapshot.active
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.snapshot.category_id
    }

    pub fn popularity(&self) -> i64 {
        self.snapshot.popularity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRecord {
    pub id: BrandId,
    #[serde(default)]
    pub name: String,
}
