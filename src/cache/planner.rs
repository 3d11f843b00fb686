//! Refresh plan generation.
//!
//! Turns one product save or delete into the ordered list of cache actions
//! that restore consistency. Pure: no store access happens here.

use std::fmt;

use crate::domain::entities::{ProductChange, ProductId, ProductSnapshot, SortOrder};

use super::config::PopularityExtension;
use super::keys::ListKey;

/// One list maintenance step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    /// Clear a list wholesale, then read it back through the repopulator.
    Rebuild(ListKey),
    /// Recompute and overwrite a sorting list.
    Refresh(SortOrder),
    /// Append the product to a cached list.
    Add(ListKey),
    /// Drop the product from a cached list.
    Remove(ListKey),
}

impl fmt::Display for ListAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListAction::Rebuild(list) => write!(f, "rebuild({list})"),
            ListAction::Refresh(sort) => write!(f, "refresh({sort})"),
            ListAction::Add(list) => write!(f, "add({list})"),
            ListAction::Remove(list) => write!(f, "remove({list})"),
        }
    }
}

/// Actions for one product event, in execution order.
///
/// The single-item entry is always cleared first; it is not listed in
/// `actions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshPlan {
    pub product: ProductId,
    pub actions: Vec<ListAction>,
}

impl fmt::Display for RefreshPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RefreshPlan {{ product: {}, actions: [", self.product)?;
        for (index, action) in self.actions.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{action}")?;
        }
        f.write_str("] }")
    }
}

impl RefreshPlan {
    /// Plan for a saved product.
    ///
    /// - an active flip rebuilds the active list rather than patching it
    /// - a category move adds to the new list, then removes from the old one
    /// - a popularity change refreshes the popularity sorting, only with the
    ///   extension installed
    pub fn for_save(change: &ProductChange, popularity: Option<&PopularityExtension>) -> Self {
        let mut actions = Vec::new();

        if change.active_changed() {
            actions.push(ListAction::Rebuild(ListKey::Active));
        }

        if change.category_changed() {
            if let Some(category) = change.current.category_id {
                actions.push(ListAction::Add(ListKey::Category(category)));
            }
            if let Some(category) = change.original.category_id {
                actions.push(ListAction::Remove(ListKey::Category(category)));
            }
        }

        if let Some(extension) = popularity
            && change.popularity_changed()
        {
            actions.push(ListAction::Refresh(extension.sorting()));
        }

        Self {
            product: change.id(),
            actions,
        }
    }

    /// Plan for a deleted product: remove it from every list it could be in.
    pub fn for_delete(product: &ProductSnapshot) -> Self {
        let mut actions = Vec::new();

        if product.active {
            actions.push(ListAction::Remove(ListKey::Active));
        }

        if let Some(category) = product.category_id {
            actions.push(ListAction::Remove(ListKey::Category(category)));
        }

        // Position in each ordering is unknown, so every sorting list is
        // patched on its own.
        actions.extend(
            SortOrder::ALL
                .into_iter()
                .map(|sort| ListAction::Remove(ListKey::Sorting(sort))),
        );

        Self {
            product: product.id,
            actions,
        }
    }

    /// True when only the single-item entry is affected.
    pub fn is_item_only(&self) -> bool {
        self.actions.is_empty()
    }
}
