//! Pending-action queue for a unit of work
//!
//! Write actions decided by a cascade are appended here and flushed later by
//! the owning unit of work. The queue keeps a lazily maintained sort (three
//! interchangeable policies) and an incrementally maintained summary of the
//! storage resources the queued actions touch, used for cache invalidation.
//!
//! The queue state can be snapshotted to a serializable form so a suspended
//! unit of work can be resumed; restoring requires an explicit
//! [`PendingActionQueue::rebind`] pass to re-attach actions to the live unit
//! of work.

pub mod queue;
pub mod sort;

pub use queue::{PendingActionQueue, SavedQueue};
pub use sort::{ActionComparator, SortPolicy};
