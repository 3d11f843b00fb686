//! Cache configuration.
//!
//! Controls whether model events touch the cache and which optional
//! extensions are installed. Resolved from the `[cache]` table of the settings.

use crate::domain::entities::SortOrder;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Keep caches consistent on model events.
    pub enabled: bool,
    /// The popularity-tracking extension is installed.
    pub popularity_extension: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            popularity_extension: false,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Resolve the popularity capability once, at startup.
    pub fn popularity_extension(&self) -> Option<PopularityExtension> {
        self.popularity_extension.then(PopularityExtension::new)
    }
}

/// Installed popularity-tracking extension. Its presence makes popularity
/// changes refresh the sort order it maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopularityExtension {
    sorting: SortOrder,
}

impl PopularityExtension {
    pub fn new() -> Self {
        Self {
            sorting: SortOrder::PopularityDesc,
        }
    }

    pub fn sorting(&self) -> SortOrder {
        self.sorting
    }
}

impl Default for PopularityExtension {
    fn default() -> Self {
        Self::new()
    }
}
