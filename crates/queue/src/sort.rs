//! Interchangeable ordering policies for the pending-action queue
//!
//! The queue appends far more often than it sorts, and appends are almost
//! always already in order. Each ordering policy therefore only *tracks*
//! order on append (comparing the two newest elements) and defers the full
//! resort until someone actually needs the queue sorted.

use cascara_core::PendingAction;
use std::cmp::Ordering;

/// Externally supplied comparison for the comparator policy.
pub type ActionComparator<A> = Box<dyn Fn(&A, &A) -> Ordering>;

/// How the queue orders its actions.
pub enum SortPolicy<A> {
    /// Insertion order is the only order; `sort()` is a no-op. Used when
    /// actions have no meaningful relative order (independent updates).
    Unsorted,
    /// Actions sort by their natural (`Ord`) order.
    Natural,
    /// Actions sort by an externally supplied comparator.
    Comparator(ActionComparator<A>),
}

impl<A: PendingAction> SortPolicy<A> {
    /// Whether this policy maintains an order at all.
    pub fn tracks_order(&self) -> bool {
        !matches!(self, Self::Unsorted)
    }

    /// Compare two actions under this policy. Meaningless for `Unsorted`.
    pub(crate) fn compare(&self, a: &A, b: &A) -> Ordering {
        match self {
            Self::Unsorted => Ordering::Equal,
            Self::Natural => a.cmp(b),
            Self::Comparator(cmp) => cmp(a, b),
        }
    }

    /// Stable full resort under this policy.
    pub(crate) fn sort(&self, items: &mut [A]) {
        match self {
            Self::Unsorted => {}
            Self::Natural => items.sort(),
            Self::Comparator(cmp) => items.sort_by(|a, b| cmp(a, b)),
        }
    }
}

impl<A> std::fmt::Debug for SortPolicy<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unsorted => "Unsorted",
            Self::Natural => "Natural",
            Self::Comparator(_) => "Comparator",
        };
        f.write_str(name)
    }
}
