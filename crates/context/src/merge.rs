//! Bidirectional merge-entity / managed-result cross-reference
//!
//! A merge cascade hands every (merge entity, managed result) pair it
//! resolves to this context. Three identity maps interlock:
//!
//! - `merge_to_managed` — merge entity to its managed result; a binding,
//!   once made, is immutable for the life of the context.
//! - `managed_to_merge` — inverse, last-write-wins: when several merge
//!   entities converge on one managed result, only the most recently
//!   associated one is held. The displacement is what drives duplicate
//!   detection.
//! - `operated_on` — whether the cascade has actually started operating on a
//!   merge entity. Keys always mirror `merge_to_managed`; the two-phase
//!   registration pattern (associate first, promote later) is what lets the
//!   cascade tell "known but not yet visited" from "currently being
//!   processed" when the merge graph has forward references.
//!
//! Duplicate representations are not judged here: a pluggable
//! [`CopyObserver`] decides whether two merge entities for one managed
//! result are acceptable.

use crate::lifecycle::OperationLifecycle;
use cascara_core::{
    CascadeError, CopyObserver, EntityRef, EventRef, IdentityMap, OperationKind, Result,
    UnitOfWork,
};
use std::rc::Rc;
use tracing::{debug, trace};

/// Produces the copy-detection strategy for a unit of work.
///
/// Resolved once, on the first `before_operation` of the context's life.
pub type CopyObserverFactory = Rc<dyn Fn() -> Box<dyn CopyObserver>>;

/// Merge-operation bookkeeping context.
pub struct MergeReconciliationContext {
    lifecycle: OperationLifecycle,
    merge_to_managed: IdentityMap<EntityRef>,
    managed_to_merge: IdentityMap<EntityRef>,
    operated_on: IdentityMap<bool>,
    observer: Option<Box<dyn CopyObserver>>,
    observer_factory: CopyObserverFactory,
}

// Guarantees cleanup on every exit path out of `after_operation`, including
// panics escaping the observer notification.
struct ClearOnDrop<'a>(&'a mut MergeReconciliationContext);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
    }
}

impl MergeReconciliationContext {
    pub fn new(observer_factory: CopyObserverFactory) -> Self {
        Self {
            lifecycle: OperationLifecycle::new(OperationKind::Merge),
            merge_to_managed: IdentityMap::new(),
            managed_to_merge: IdentityMap::new(),
            operated_on: IdentityMap::new(),
            observer: None,
            observer_factory,
        }
    }

    pub fn kind(&self) -> OperationKind {
        OperationKind::Merge
    }

    pub fn is_in_progress(&self) -> bool {
        self.lifecycle.is_in_progress()
    }

    /// Start a merge operation. Installs the configured copy-detection
    /// strategy on the first invocation ever for this context instance.
    pub fn before_operation(&mut self, event: &EventRef) -> Result<()> {
        self.lifecycle.begin(event)?;
        if self.observer.is_none() {
            self.observer = Some((self.observer_factory)());
            debug!(target: "cascara::context", "copy-detection strategy installed");
        }
        Ok(())
    }

    /// Finish the merge started with `event`.
    ///
    /// When `success` is true the observer is notified that the top-level
    /// merge completed, before any state is dropped. The context is cleared
    /// on every path out of this call once the preconditions pass.
    pub fn after_operation(&mut self, event: &EventRef, success: bool) -> Result<()> {
        self.lifecycle.check_finish(event)?;
        let guard = ClearOnDrop(self);
        if success {
            match guard.0.observer.as_mut() {
                Some(observer) => observer.on_top_level_complete(),
                None => Ok(()),
            }
        } else {
            Ok(())
        }
    }

    /// True iff the cascade has been promoted to actually operating on `m`.
    pub fn is_in_merge_process(&self, merge_entity: &EntityRef) -> bool {
        self.operated_on.get(merge_entity) == Some(&true)
    }

    /// Managed result bound to a merge entity, if any.
    pub fn get_managed_result(&self, merge_entity: &EntityRef) -> Option<EntityRef> {
        self.merge_to_managed.get(merge_entity).cloned()
    }

    /// Merge entity most recently associated with a managed result, if any.
    pub fn get_merge_entity_for(&self, managed: &EntityRef) -> Option<EntityRef> {
        self.managed_to_merge.get(managed).cloned()
    }

    /// Number of registered merge entities.
    pub fn registered_len(&self) -> usize {
        self.merge_to_managed.len()
    }

    /// Bind `merge_entity` to `managed`, recording whether the cascade is
    /// already operating on it.
    ///
    /// Re-associating an already-registered merge entity with the same
    /// managed result is idempotent (the `operated_on` flag is overwritten);
    /// with a *different* result it fails, the binding is immutable. When a
    /// newly registered merge entity displaces a different prior one from
    /// the inverse map, the copy observer is consulted; its veto propagates
    /// and aborts the merge, but mutations already applied stay visible
    /// until `clear()`.
    pub fn associate(
        &mut self,
        merge_entity: &EntityRef,
        managed: &EntityRef,
        operated_on: bool,
        uow: &dyn UnitOfWork,
    ) -> Result<()> {
        self.lifecycle.require_in_progress()?;
        self.check_registration_consistency(merge_entity)?;

        if let Some(existing) = self.merge_to_managed.get(merge_entity) {
            if !existing.same_instance(managed) {
                return Err(CascadeError::ResultReplacementNotAllowed {
                    entity: uow.describe_entity(merge_entity),
                });
            }
        }

        let newly_registered = self
            .merge_to_managed
            .insert(merge_entity, managed.clone())
            .is_none();
        self.operated_on.insert(merge_entity, operated_on);
        let displaced = self.managed_to_merge.insert(managed, merge_entity.clone());

        trace!(
            target: "cascara::context",
            merge_entity = ?merge_entity,
            managed = ?managed,
            operated_on,
            newly_registered,
            "merge association recorded"
        );

        if newly_registered {
            if let Some(displaced) = displaced {
                if !displaced.same_instance(merge_entity) {
                    // Two distinct merge entities now represent one managed
                    // result; policy belongs to the observer.
                    debug!(
                        target: "cascara::context",
                        managed = ?managed,
                        incoming = ?merge_entity,
                        displaced = ?displaced,
                        "duplicate representation detected"
                    );
                    let observer = self.observer.as_mut().ok_or_else(|| {
                        CascadeError::InternalInconsistency(
                            "copy observer missing while a merge is in progress".to_string(),
                        )
                    })?;
                    observer.on_duplicate_detected(managed, merge_entity, &displaced)?;
                }
            }
        }
        Ok(())
    }

    /// Promote (or demote) the operated-on status of a registered merge
    /// entity.
    pub fn set_operated_on(
        &mut self,
        merge_entity: &EntityRef,
        operated_on: bool,
        uow: &dyn UnitOfWork,
    ) -> Result<()> {
        self.lifecycle.require_in_progress()?;
        self.check_registration_consistency(merge_entity)?;
        if !self.merge_to_managed.contains(merge_entity) {
            return Err(CascadeError::UnknownMergeEntity {
                entity: uow.describe_entity(merge_entity),
            });
        }
        self.operated_on.insert(merge_entity, operated_on);
        Ok(())
    }

    /// Empty all three maps, reset the observer's per-operation state, and
    /// return the lifecycle to `NotStarted`. The observer stays installed
    /// for the rest of the unit of work.
    pub fn clear(&mut self) {
        self.merge_to_managed.clear();
        self.managed_to_merge.clear();
        self.operated_on.clear();
        if let Some(observer) = self.observer.as_mut() {
            observer.reset();
        }
        self.lifecycle.reset();
    }

    // The registration maps must agree on membership for every entity; a
    // disagreement means some code path mutated one map without the other.
    fn check_registration_consistency(&self, merge_entity: &EntityRef) -> Result<()> {
        let in_forward = self.merge_to_managed.contains(merge_entity);
        let in_status = self.operated_on.contains(merge_entity);
        if in_forward != in_status {
            return Err(CascadeError::InternalInconsistency(format!(
                "entity registered in {} but not in {}",
                if in_forward { "merge-to-managed" } else { "operated-on" },
                if in_forward { "operated-on" } else { "merge-to-managed" },
            )));
        }
        if self.merge_to_managed.len() != self.operated_on.len() {
            return Err(CascadeError::InternalInconsistency(format!(
                "map sizes diverged: merge-to-managed={} operated-on={}",
                self.merge_to_managed.len(),
                self.operated_on.len(),
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for MergeReconciliationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeReconciliationContext")
            .field("in_progress", &self.is_in_progress())
            .field("registered", &self.merge_to_managed.len())
            .field("observer_installed", &self.observer.is_some())
            .finish()
    }
}

/// Stock observer: duplicate representations are silently accepted.
#[derive(Debug, Default)]
pub struct AllowDuplicates;

impl CopyObserver for AllowDuplicates {
    fn on_duplicate_detected(
        &mut self,
        _managed: &EntityRef,
        _incoming: &EntityRef,
        _displaced: &EntityRef,
    ) -> Result<()> {
        Ok(())
    }

    fn on_top_level_complete(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}
}

/// Stock observer: any duplicate representation aborts the merge.
#[derive(Debug, Default)]
pub struct RejectDuplicates;

impl CopyObserver for RejectDuplicates {
    fn on_duplicate_detected(
        &mut self,
        managed: &EntityRef,
        _incoming: &EntityRef,
        _displaced: &EntityRef,
    ) -> Result<()> {
        Err(CascadeError::DuplicateRepresentationRejected {
            managed: format!("{managed:?}"),
        })
    }

    fn on_top_level_complete(&mut self) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) {}
}
