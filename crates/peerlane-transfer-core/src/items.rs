//! Shared, concurrently observed list of active download adapters.

use std::sync::{Arc, PoisonError, RwLock};

use crate::adapter::DownloadItem;
use crate::identity::TransferIdentity;
use crate::service::ItemAssociation;

/// Stable view of the list at one instant.
pub type ItemSnapshot = Arc<[Arc<DownloadItem>]>;

/// Ordered list of adapters with copy-on-write snapshots.
///
/// Mutations swap in a new slice under the write lock, so an observer
/// iterating a snapshot never sees a partial update. At most one adapter per
/// [`TransferIdentity`] is ever present.
#[derive(Clone, Debug)]
pub struct ActiveItemList {
    items: Arc<RwLock<ItemSnapshot>>,
}

impl ActiveItemList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Arc::new(RwLock::new(Arc::from(Vec::new()))),
        }
    }

    /// Append `item` unless an adapter with the same identity is present.
    /// Returns whether the list changed.
    pub fn add(&self, item: Arc<DownloadItem>) -> bool {
        let mut guard = self.items.write().unwrap_or_else(PoisonError::into_inner);
        if guard.iter().any(|existing| existing.identity() == item.identity()) {
            return false;
        }
        let mut next = guard.to_vec();
        next.push(item);
        *guard = Arc::from(next);
        true
    }

    /// Remove the adapter equal to `item`. Returns whether the list changed.
    pub fn remove(&self, item: &DownloadItem) -> bool {
        self.remove_identity(item.identity()).is_some()
    }

    /// Remove and return the adapter bound to `identity`.
    pub fn remove_identity(&self, identity: TransferIdentity) -> Option<Arc<DownloadItem>> {
        let mut guard = self.items.write().unwrap_or_else(PoisonError::into_inner);
        let position = guard
            .iter()
            .position(|existing| existing.identity() == identity)?;
        let mut next = guard.to_vec();
        let removed = next.remove(position);
        *guard = Arc::from(next);
        Some(removed)
    }

    /// Whether an adapter with `identity` is present.
    #[must_use]
    pub fn contains(&self, identity: TransferIdentity) -> bool {
        self.find(identity).is_some()
    }

    /// Adapter bound to `identity`.
    #[must_use]
    pub fn find(&self, identity: TransferIdentity) -> Option<Arc<DownloadItem>> {
        self.snapshot()
            .iter()
            .find(|item| item.identity() == identity)
            .cloned()
    }

    /// Number of adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Current contents; later mutations do not affect the returned slice.
    #[must_use]
    pub fn snapshot(&self) -> ItemSnapshot {
        Arc::clone(&self.items.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for ActiveItemList {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemAssociation for ActiveItemList {
    fn item_for(&self, identity: &TransferIdentity) -> Option<Arc<DownloadItem>> {
        self.find(*identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn add_is_idempotent_per_identity() {
        let list = ActiveItemList::new();
        assert!(list.add(Arc::new(DownloadItem::absent())));
        assert!(!list.add(Arc::new(DownloadItem::absent())));
        assert_eq!(list.len(), 1);
        assert!(list.contains(TransferIdentity::Absent));
    }

    #[test]
    fn snapshots_survive_removal() {
        let list = ActiveItemList::new();
        let item = Arc::new(DownloadItem::absent());
        list.add(Arc::clone(&item));

        let before = list.snapshot();
        assert!(list.remove(&item));
        assert!(!list.remove(&item));

        assert_eq!(before.len(), 1);
        assert!(list.is_empty());
        assert!(list.item_for(&TransferIdentity::Absent).is_none());
    }

    #[test]
    fn concurrent_removal_happens_once() {
        let list = ActiveItemList::new();
        list.add(Arc::new(DownloadItem::absent()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let list = list.clone();
                thread::spawn(move || list.remove_identity(TransferIdentity::Absent).is_some())
            })
            .collect();
        let removed = handles
            .into_iter()
            .map(|handle| handle.join().expect("thread completes"))
            .filter(|removed| *removed)
            .count();

        assert_eq!(removed, 1);
        assert!(list.is_empty());
    }
}
