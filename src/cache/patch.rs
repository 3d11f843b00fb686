//! Incremental list maintenance.
//!
//! Adds or removes a single product ID in a cached list instead of rebuilding
//! it. A list that is not cached is handed to the repopulator, which reads live
//! state and therefore already includes or excludes the product.

use std::fmt;
use std::sync::Arc;

use metrics::counter;
use tracing::debug;

use crate::domain::entities::ProductId;

use super::error::CacheError;
use super::keys::ListKey;
use super::lists::ListRepopulator;
use super::store::{CachedValue, TagStore};

const METRIC_LIST_PATCH: &str = "catalog_cache_list_patch_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOp {
    Add,
    Remove,
}

impl PatchOp {
    fn as_str(self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
        }
    }
}

/// What a patch did to the cached list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Added,
    Removed,
    /// Membership already matched; nothing written.
    Unchanged,
    /// The list was missing and was rebuilt instead of patched.
    Repopulated,
}

impl PatchOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchOutcome::Added => "added",
            PatchOutcome::Removed => "removed",
            PatchOutcome::Unchanged => "unchanged",
            PatchOutcome::Repopulated => "repopulated",
        }
    }
}

impl fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct ListPatcher {
    store: Arc<dyn TagStore>,
    lists: Arc<dyn ListRepopulator>,
}

impl ListPatcher {
    pub fn new(store: Arc<dyn TagStore>, lists: Arc<dyn ListRepopulator>) -> Self {
        Self { store, lists }
    }

    /// Append `id` unless it is already a member.
    pub fn add(&self, list: ListKey, id: ProductId) -> Result<PatchOutcome, CacheError> {
        self.patch(list, id, PatchOp::Add)
    }

    /// Remove the single occurrence of `id`, if present.
    pub fn remove(&self, list: ListKey, id: ProductId) -> Result<PatchOutcome, CacheError> {
        self.patch(list, id, PatchOp::Remove)
    }

    fn patch(
        &self,
        list: ListKey,
        id: ProductId,
        op: PatchOp,
    ) -> Result<PatchOutcome, CacheError> {
        let tags = list.tags();
        let key = list.cache_key();

        let cached = self
            .store
            .get(&tags, &key)?
            .and_then(CachedValue::into_ids)
            .filter(|ids| !ids.is_empty());

        let outcome = match cached {
            None => {
                self.lists.repopulate(list)?;
                PatchOutcome::Repopulated
            }
            Some(mut ids) => {
                let position = ids.iter().position(|member| *member == id);
                match (op, position) {
                    (PatchOp::Add, Some(_)) | (PatchOp::Remove, None) => PatchOutcome::Unchanged,
                    (PatchOp::Add, None) => {
                        ids.push(id);
                        self.store.set_forever(&tags, key, CachedValue::Ids(ids))?;
                        PatchOutcome::Added
                    }
                    (PatchOp::Remove, Some(index)) => {
                        ids.remove(index);
                        self.store.set_forever(&tags, key, CachedValue::Ids(ids))?;
                        PatchOutcome::Removed
                    }
                }
            }
        };

        counter!(
            METRIC_LIST_PATCH,
            "op" => op.as_str(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        debug!(list = %list, product_id = %id, op = op.as_str(), outcome = %outcome, "Patched product list");

        Ok(outcome)
    }
}
