//! Narrow collaborator interfaces
//!
//! The engine is an in-process library; everything it needs from the
//! surrounding persistence layer comes in through these traits. None of them
//! assume value equality, hashing, or any storage semantics of the
//! implementing types.

use crate::error::Result;
use crate::handle::{EntityRef, ResourceKey};
use std::collections::BTreeSet;

/// Handle to the enclosing unit of work (one logical session/transaction).
///
/// The engine only ever needs two things from it: the count of insert
/// actions that have been scheduled but not yet resolved (queried by the
/// save-family lifecycle guard), and diagnostic rendering of entities for
/// error messages.
pub trait UnitOfWork {
    /// Insert actions queued but not yet resolved into concrete writes.
    fn unresolved_insert_count(&self) -> usize;

    /// Render an entity for diagnostics. Never used for identity decisions.
    fn describe_entity(&self, entity: &EntityRef) -> String;
}

/// Pluggable policy for duplicate representations discovered during a merge.
///
/// A merge may find two distinct in-memory instances that both correspond to
/// the same logical record. Whether that is acceptable is a product decision,
/// not a bookkeeping one, so the context delegates entirely to this observer.
pub trait CopyObserver {
    /// Called exactly once per detected duplicate: `incoming` has just been
    /// registered against `managed`, displacing `displaced` from the inverse
    /// map. Return an error to veto and abort the whole merge; partial map
    /// mutations remain visible until the context is cleared.
    fn on_duplicate_detected(
        &mut self,
        managed: &EntityRef,
        incoming: &EntityRef,
        displaced: &EntityRef,
    ) -> Result<()>;

    /// Called when the top-level merge operation completes successfully,
    /// before the context clears its state.
    fn on_top_level_complete(&mut self) -> Result<()>;

    /// Discard per-operation state. The observer itself stays installed for
    /// the rest of the unit of work.
    fn reset(&mut self);
}

/// A scheduled write action held by the pending-action queue.
///
/// The `Ord` supertrait supplies the action's natural ordering, used by the
/// natural sort policy.
pub trait PendingAction: Ord {
    /// Storage resources this action reads or writes. `None` means the
    /// action declares nothing and contributes nothing to the queue's
    /// resource summary.
    fn affected_resources(&self) -> Option<BTreeSet<ResourceKey>>;

    /// Re-attach to a live unit of work after the queue was restored from
    /// its persisted form. Internal references are not guaranteed to survive
    /// the round trip, so this call is required before the action is used.
    fn rebind(&mut self, uow: &dyn UnitOfWork);
}
