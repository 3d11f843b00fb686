//! Tag index.
//!
//! Tracks which entry addresses carry each tag so a whole tag can be flushed
//! without scanning the store.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{CacheTag, EntryAddress};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Maps each tag to the addresses of the entries stored under it.
pub struct TagIndex {
    tag_to_entries: RwLock<HashMap<CacheTag, HashSet<EntryAddress>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self {
            tag_to_entries: RwLock::new(HashMap::new()),
        }
    }

    /// Record an entry under every tag in its address.
    pub fn register(&self, address: &EntryAddress) {
        let mut index = rw_write(&self.tag_to_entries, SOURCE, "register");
        for tag in address.tags.iter() {
            index.entry(tag).or_default().insert(address.clone());
        }
    }

    /// Forget an entry under every tag in its address.
    pub fn unregister(&self, address: &EntryAddress) {
        let mut index = rw_write(&self.tag_to_entries, SOURCE, "unregister");
        for tag in address.tags.iter() {
            if let Some(entries) = index.get_mut(&tag) {
                entries.remove(address);
                if entries.is_empty() {
                    index.remove(&tag);
                }
            }
        }
    }

    /// Remove every address carrying `tag`, including its registrations under
    /// the other tags it was stored with. Returns the removed addresses.
    pub fn unregister_tag(&self, tag: CacheTag) -> HashSet<EntryAddress> {
        let mut index = rw_write(&self.tag_to_entries, SOURCE, "unregister_tag");
        let affected = index.remove(&tag).unwrap_or_default();

        for address in &affected {
            for other in address.tags.iter().filter(|other| *other != tag) {
                if let Some(entries) = index.get_mut(&other) {
                    entries.remove(address);
                    if entries.is_empty() {
                        index.remove(&other);
                    }
                }
            }
        }

        affected
    }

    /// Number of tags with at least one entry.
    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_entries, SOURCE, "tag_count").len()
    }
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}
