//! Cache tag and key definitions.
//!
//! An entry is addressed by a `TagSet` together with a `CacheKey`. The same key
//! stored under two different tag sets is two distinct entries.

use std::collections::BTreeSet;
use std::fmt;

use crate::domain::entities::{CategoryId, SortOrder};

/// Label attached to cache entries for bulk invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheTag {
    /// Carried by every entry this crate writes.
    Catalog,
    /// Product ID lists.
    ProductList,
    /// Lists scoped to a single category.
    CategoryElement,
    /// Single materialized products.
    ProductElement,
    /// Single materialized brands.
    BrandElement,
}

impl CacheTag {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheTag::Catalog => "catalog",
            CacheTag::ProductList => "catalog-product-list",
            CacheTag::CategoryElement => "catalog-category-element",
            CacheTag::ProductElement => "catalog-product-element",
            CacheTag::BrandElement => "catalog-brand-element",
        }
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, de-duplicated set of tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagSet(BTreeSet<CacheTag>);

impl TagSet {
    pub fn new(tags: impl IntoIterator<Item = CacheTag>) -> Self {
        Self(tags.into_iter().collect())
    }

    pub fn contains(&self, tag: CacheTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = CacheTag> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for tag in &self.0 {
            if !first {
                f.write_str(",")?;
            }
            f.write_str(tag.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// Identifies one cached product ID list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ListKey {
    /// Products with the active flag set.
    Active,
    /// Every product assigned to a category.
    Category(CategoryId),
    /// Every product, in a sort order.
    Sorting(SortOrder),
}

impl ListKey {
    /// Tags the list is stored under.
    pub fn tags(self) -> TagSet {
        match self {
            ListKey::Active | ListKey::Sorting(_) => {
                TagSet::new([CacheTag::Catalog, CacheTag::ProductList])
            }
            ListKey::Category(_) => TagSet::new([
                CacheTag::Catalog,
                CacheTag::ProductList,
                CacheTag::CategoryElement,
            ]),
        }
    }

    pub fn cache_key(self) -> CacheKey {
        CacheKey::List(self)
    }

    /// Short label for metrics.
    pub fn kind(self) -> &'static str {
        match self {
            ListKey::Active => "active",
            ListKey::Category(_) => "category",
            ListKey::Sorting(_) => "sorting",
        }
    }
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The active list is keyed by the list tag itself.
            ListKey::Active => f.write_str(CacheTag::ProductList.as_str()),
            ListKey::Category(category) => write!(f, "{category}"),
            ListKey::Sorting(sort) => f.write_str(sort.as_str()),
        }
    }
}

/// Key half of an entry address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// Single materialized entity, by raw ID.
    Item(u64),
    List(ListKey),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Item(id) => write!(f, "{id}"),
            CacheKey::List(list) => write!(f, "{list}"),
        }
    }
}

/// Full address of one cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryAddress {
    pub tags: TagSet,
    pub key: CacheKey,
}

impl EntryAddress {
    pub fn new(tags: TagSet, key: CacheKey) -> Self {
        Self { tags, key }
    }
}

impl fmt::Display for EntryAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]{}", self.tags, self.key)
    }
}
