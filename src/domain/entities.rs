//! Catalog entity identifiers and the tracked-field snapshots carried by model events.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandId(pub u64);

/// Category foreign key. Zero is the "no category" value in raw records and is
/// never a valid `CategoryId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u64);

impl CategoryId {
    /// Normalize a raw column value, mapping the empty value to `None`.
    pub fn non_empty(raw: u64) -> Option<Self> {
        (raw != 0).then_some(Self(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tracked fields of a product at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    #[serde(default)]
    pub active: bool,
    #[serde(default, deserialize_with = "deserialize_category")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub popularity: i64,
}

impl ProductSnapshot {
    /// Snapshot with every tracked field at its empty value.
    pub fn blank(id: ProductId) -> Self {
        Self {
            id,
            active: false,
            category_id: None,
            popularity: 0,
        }
    }
}

/// Pre-save and post-save values of a product's tracked fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductChange {
    pub current: ProductSnapshot,
    pub original: ProductSnapshot,
}

impl ProductChange {
    pub fn new(original: ProductSnapshot, current: ProductSnapshot) -> Self {
        Self { current, original }
    }

    /// A product saved for the first time has no stored original; every tracked
    /// field is compared against its empty value.
    pub fn created(current: ProductSnapshot) -> Self {
        let original = ProductSnapshot::blank(current.id);
        Self { current, original }
    }

    pub fn id(&self) -> ProductId {
        self.current.id
    }

    pub fn active_changed(&self) -> bool {
        self.current.active != self.original.active
    }

    pub fn category_changed(&self) -> bool {
        self.current.category_id != self.original.category_id
    }

    pub fn popularity_changed(&self) -> bool {
        self.current.popularity != self.original.popularity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandSnapshot {
    pub id: BrandId,
}

/// Orderings for which a product ID list is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    PriceAsc,
    PriceDesc,
    Newest,
    PopularityDesc,
    Default,
}

impl SortOrder {
    pub const ALL: [SortOrder; 5] = [
        SortOrder::PriceAsc,
        SortOrder::PriceDesc,
        SortOrder::Newest,
        SortOrder::PopularityDesc,
        SortOrder::Default,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "price|asc",
            SortOrder::PriceDesc => "price|desc",
            SortOrder::Newest => "new",
            SortOrder::PopularityDesc => "popularity|desc",
            SortOrder::Default => "no",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn deserialize_category<'de, D>(deserializer: D) -> Result<Option<CategoryId>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<u64>::deserialize(deserializer)?;
    Ok(raw.and_then(CategoryId::non_empty))
}
