//! Ordered queue of scheduled write actions
//!
//! Bookkeeping rules:
//!
//! - Appends are cheap: the resource cache (when computed) grows additively,
//!   and order tracking compares only the two newest elements.
//! - Removals are pessimistic about the cache: several actions may declare
//!   overlapping resources, so once any removed action declared a non-empty
//!   set the summary cannot be subtracted, only recomputed.
//! - Sorting is lazy: a full resort happens only when the queue is dirty and
//!   someone calls `sort()`.

use crate::sort::SortPolicy;
use cascara_core::{CascadeError, PendingAction, ResourceKey, Result, UnitOfWork};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Queue of pending write actions for one unit of work.
#[derive(Debug)]
pub struct PendingActionQueue<A: PendingAction> {
    items: Vec<A>,
    policy: SortPolicy<A>,
    /// An append has broken the maintained order since the last full sort.
    dirty: bool,
    /// Union of every action's declared resources; `None` = uncomputed.
    resources: Option<BTreeSet<ResourceKey>>,
}

impl<A: PendingAction> PendingActionQueue<A> {
    pub fn new(policy: SortPolicy<A>) -> Self {
        Self {
            items: Vec::new(),
            policy,
            dirty: false,
            resources: None,
        }
    }

    /// Insertion-ordered queue; `sort()` is a no-op.
    pub fn unsorted() -> Self {
        Self::new(SortPolicy::Unsorted)
    }

    /// Queue ordered by the actions' natural order.
    pub fn natural() -> Self {
        Self::new(SortPolicy::Natural)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&A> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, A> {
        self.items.iter()
    }

    /// Whether an out-of-order append has been observed since the last sort.
    pub fn is_sort_pending(&self) -> bool {
        self.dirty
    }

    /// Append an action.
    ///
    /// A computed resource cache is extended in place with the action's
    /// declared resources. Order tracking compares only the new last two
    /// elements, keeping already-sorted appends O(1).
    pub fn add(&mut self, action: A) {
        if let Some(cache) = self.resources.as_mut() {
            if let Some(declared) = action.affected_resources() {
                cache.extend(declared);
            }
        }
        if self.policy.tracks_order() && !self.dirty {
            if let Some(last) = self.items.last() {
                if self.policy.compare(&action, last) == Ordering::Less {
                    self.dirty = true;
                    trace!(target: "cascara::queue", len = self.items.len(), "out-of-order append, sort pending");
                }
            }
        }
        self.items.push(action);
    }

    /// Remove the action at `index`.
    pub fn remove(&mut self, index: usize) -> Result<A> {
        if index >= self.items.len() {
            return Err(CascadeError::InvalidArgument(
                "pending-action removal index out of range",
            ));
        }
        let removed = self.items.remove(index);
        self.invalidate_if_declared(std::slice::from_ref(&removed));
        Ok(removed)
    }

    /// Remove the `n` most recently appended actions, returning them oldest
    /// first.
    pub fn remove_last_n(&mut self, n: usize) -> Result<Vec<A>> {
        if n > self.items.len() {
            return Err(CascadeError::InvalidArgument(
                "cannot remove more pending actions than are queued",
            ));
        }
        let removed = self.items.split_off(self.items.len() - n);
        self.invalidate_if_declared(&removed);
        Ok(removed)
    }

    /// Bring the queue into the policy's order, if an append broke it.
    pub fn sort(&mut self) {
        if !self.dirty {
            return;
        }
        debug!(target: "cascara::queue", len = self.items.len(), "full resort");
        self.policy.sort(&mut self.items);
        self.dirty = false;
    }

    /// Union of every queued action's declared resources. Cached; an action
    /// that declares nothing contributes nothing.
    pub fn affected_resources(&mut self) -> &BTreeSet<ResourceKey> {
        let items = &self.items;
        self.resources.get_or_insert_with(|| {
            let mut all = BTreeSet::new();
            for action in items {
                if let Some(declared) = action.affected_resources() {
                    all.extend(declared);
                }
            }
            all
        })
    }

    /// Drop all queued actions; called on flush and on rollback.
    pub fn clear(&mut self) {
        self.items.clear();
        self.dirty = false;
        self.resources = None;
    }

    /// Give every action a chance to re-attach to the live unit of work.
    ///
    /// Required after [`PendingActionQueue::restore`]: internal references
    /// held by actions are not guaranteed to survive the persistence round
    /// trip.
    pub fn rebind(&mut self, uow: &dyn UnitOfWork) {
        for action in &mut self.items {
            action.rebind(uow);
        }
        debug!(target: "cascara::queue", len = self.items.len(), "actions rebound to unit of work");
    }

    /// Persistable form of the queue state, consuming the queue. The sort
    /// policy is not part of it (comparators do not serialize) and is
    /// supplied again on restore.
    pub fn into_saved(self) -> SavedQueue<A> {
        SavedQueue {
            items: self.items,
            dirty: self.dirty,
            resources: self.resources,
        }
    }

    /// Persistable copy of the queue state, leaving the queue intact.
    pub fn snapshot(&self) -> SavedQueue<A>
    where
        A: Clone,
    {
        SavedQueue {
            items: self.items.clone(),
            dirty: self.dirty,
            resources: self.resources.clone(),
        }
    }

    /// Rebuild a queue from its persisted form. Order, pending-sort state,
    /// and the resource-cache state all survive, so resuming never forces an
    /// eager recomputation. Call [`PendingActionQueue::rebind`] next.
    pub fn restore(saved: SavedQueue<A>, policy: SortPolicy<A>) -> Self {
        Self {
            items: saved.items,
            policy,
            dirty: saved.dirty,
            resources: saved.resources,
        }
    }

    fn invalidate_if_declared(&mut self, removed: &[A]) {
        if self.resources.is_none() {
            return;
        }
        let declared_any = removed.iter().any(|action| {
            action
                .affected_resources()
                .is_some_and(|set| !set.is_empty())
        });
        if declared_any {
            // Other actions may declare overlapping resources; subtraction
            // would under-invalidate. Recompute on next demand.
            self.resources = None;
            debug!(target: "cascara::queue", "resource summary invalidated by removal");
        }
    }
}

/// Serializable state of a suspended queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedQueue<A> {
    items: Vec<A>,
    dirty: bool,
    resources: Option<BTreeSet<ResourceKey>>,
}

impl<A: Serialize> SavedQueue<A> {
    /// Encode with MessagePack.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| CascadeError::Serialization(e.to_string()))
    }
}

impl<A: DeserializeOwned> SavedQueue<A> {
    /// Decode a [`SavedQueue::to_bytes`] payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        rmp_serde::from_slice(bytes).map_err(|e| CascadeError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascara_core::EntityRef;

    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    struct TestAction {
        seq: u32,
        resources: Vec<String>,
    }

    impl TestAction {
        fn new(seq: u32, resources: &[&str]) -> Self {
            Self {
                seq,
                resources: resources.iter().map(|r| r.to_string()).collect(),
            }
        }
    }

    impl PendingAction for TestAction {
        fn affected_resources(&self) -> Option<BTreeSet<ResourceKey>> {
            if self.resources.is_empty() {
                None
            } else {
                Some(
                    self.resources
                        .iter()
                        .map(|r| ResourceKey::new(r.clone()))
                        .collect(),
                )
            }
        }

        fn rebind(&mut self, _uow: &dyn UnitOfWork) {}
    }

    struct TestUow;

    impl UnitOfWork for TestUow {
        fn unresolved_insert_count(&self) -> usize {
            0
        }

        fn describe_entity(&self, entity: &EntityRef) -> String {
            format!("{entity:?}")
        }
    }

    fn keys(names: &[&str]) -> BTreeSet<ResourceKey> {
        names.iter().map(|n| ResourceKey::from(*n)).collect()
    }

    #[test]
    fn resource_summary_unions_declared_sets() {
        let mut q = PendingActionQueue::unsorted();
        q.add(TestAction::new(1, &["T1"]));
        q.add(TestAction::new(2, &["T2"]));
        q.add(TestAction::new(3, &[]));
        assert_eq!(*q.affected_resources(), keys(&["T1", "T2"]));
    }

    #[test]
    fn computed_cache_grows_additively_on_add() {
        let mut q = PendingActionQueue::unsorted();
        q.add(TestAction::new(1, &["T1"]));
        assert_eq!(*q.affected_resources(), keys(&["T1"]));
        q.add(TestAction::new(2, &["T2", "T3"]));
        assert_eq!(*q.affected_resources(), keys(&["T1", "T2", "T3"]));
    }

    #[test]
    fn removal_of_declaring_action_invalidates_cache() {
        let mut q = PendingActionQueue::unsorted();
        q.add(TestAction::new(1, &["T1"]));
        q.add(TestAction::new(2, &["T2"]));
        q.add(TestAction::new(3, &[]));
        assert_eq!(*q.affected_resources(), keys(&["T1", "T2"]));

        let removed = q.remove(0).unwrap();
        assert_eq!(removed.seq, 1);
        // The recomputed summary must reflect the true remaining set, not a
        // stale cache still containing T1.
        assert_eq!(*q.affected_resources(), keys(&["T2"]));
    }

    #[test]
    fn removal_of_nondeclaring_action_keeps_cache() {
        let mut q = PendingActionQueue::unsorted();
        q.add(TestAction::new(1, &["T1"]));
        q.add(TestAction::new(2, &[]));
        assert_eq!(*q.affected_resources(), keys(&["T1"]));
        q.remove(1).unwrap();
        assert_eq!(*q.affected_resources(), keys(&["T1"]));
    }

    #[test]
    fn remove_last_n_returns_newest_oldest_first() {
        let mut q = PendingActionQueue::unsorted();
        for seq in 1..=4 {
            q.add(TestAction::new(seq, &[]));
        }
        let removed = q.remove_last_n(2).unwrap();
        assert_eq!(removed.iter().map(|a| a.seq).collect::<Vec<_>>(), [3, 4]);
        assert_eq!(q.len(), 2);
        assert!(q.remove_last_n(3).is_err());
        q.remove_last_n(0).unwrap();
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn out_of_range_removal_is_invalid_argument() {
        let mut q: PendingActionQueue<TestAction> = PendingActionQueue::unsorted();
        assert!(matches!(
            q.remove(0),
            Err(CascadeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn in_order_appends_never_mark_dirty() {
        let mut q = PendingActionQueue::natural();
        for seq in 1..=5 {
            q.add(TestAction::new(seq, &[]));
            assert!(!q.is_sort_pending());
        }
        // sort() on a clean queue is a no-op.
        q.sort();
        assert_eq!(q.iter().map(|a| a.seq).collect::<Vec<_>>(), [1, 2, 3, 4, 5]);
    }

    #[test]
    fn out_of_order_append_marks_dirty_and_sort_restores_order() {
        let mut q = PendingActionQueue::natural();
        q.add(TestAction::new(2, &[]));
        q.add(TestAction::new(4, &[]));
        q.add(TestAction::new(3, &[]));
        assert!(q.is_sort_pending());
        // Stays dirty even if later appends are in order.
        q.add(TestAction::new(9, &[]));
        assert!(q.is_sort_pending());

        q.sort();
        assert!(!q.is_sort_pending());
        assert_eq!(q.iter().map(|a| a.seq).collect::<Vec<_>>(), [2, 3, 4, 9]);
    }

    #[test]
    fn comparator_policy_orders_by_supplied_comparison() {
        // Reverse ordering by sequence.
        let mut q = PendingActionQueue::new(SortPolicy::Comparator(Box::new(
            |a: &TestAction, b: &TestAction| b.seq.cmp(&a.seq),
        )));
        q.add(TestAction::new(3, &[]));
        q.add(TestAction::new(1, &[]));
        assert!(!q.is_sort_pending());
        q.add(TestAction::new(2, &[]));
        assert!(q.is_sort_pending());
        q.sort();
        assert_eq!(q.iter().map(|a| a.seq).collect::<Vec<_>>(), [3, 2, 1]);
    }

    #[test]
    fn unsorted_policy_keeps_insertion_order() {
        let mut q = PendingActionQueue::unsorted();
        q.add(TestAction::new(3, &[]));
        q.add(TestAction::new(1, &[]));
        assert!(!q.is_sort_pending());
        q.sort();
        assert_eq!(q.iter().map(|a| a.seq).collect::<Vec<_>>(), [3, 1]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut q = PendingActionQueue::natural();
        q.add(TestAction::new(2, &["T1"]));
        q.add(TestAction::new(1, &[]));
        q.affected_resources();
        q.clear();
        assert!(q.is_empty());
        assert!(!q.is_sort_pending());
        assert!(q.affected_resources().is_empty());
    }

    #[test]
    fn rebind_visits_every_action() {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
        struct Rebindable {
            seq: u32,
            #[serde(skip)]
            bound: bool,
        }
        impl PendingAction for Rebindable {
            fn affected_resources(&self) -> Option<BTreeSet<ResourceKey>> {
                None
            }
            fn rebind(&mut self, _uow: &dyn UnitOfWork) {
                self.bound = true;
            }
        }

        let mut q = PendingActionQueue::natural();
        q.add(Rebindable { seq: 1, bound: false });
        q.add(Rebindable { seq: 2, bound: false });
        q.rebind(&TestUow);
        assert!(q.iter().all(|a| a.bound));
    }
}
