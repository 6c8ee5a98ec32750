//! Identity-based visited set for non-merge cascades
//!
//! Persist, save-or-update, lock, delete, refresh, and replicate cascades all
//! need exactly one piece of bookkeeping: "have I seen this instance
//! already?". Membership is by reference identity, never by the entity's own
//! equality, so two value-equal instances are visited independently and a
//! cyclic graph still terminates.

use crate::lifecycle::OperationLifecycle;
use cascara_core::{
    CascadeError, EntityRef, EventRef, IdentitySet, OperationKind, Result, UnitOfWork,
};
use tracing::trace;

/// Visited-entity context for one non-merge operation kind.
#[derive(Debug)]
pub struct VisitedSetContext {
    lifecycle: OperationLifecycle,
    visited: IdentitySet,
}

impl VisitedSetContext {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            lifecycle: OperationLifecycle::new(kind),
            visited: IdentitySet::new(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.lifecycle.kind()
    }

    pub fn is_in_progress(&self) -> bool {
        self.lifecycle.is_in_progress()
    }

    /// Start an operation of this kind.
    ///
    /// Save-family kinds additionally require that no unresolved insert
    /// actions are queued. If that guard trips, the context is left
    /// `InProgress` and the caller must `clear()` before retrying.
    pub fn before_operation(&mut self, event: &EventRef, uow: &dyn UnitOfWork) -> Result<()> {
        self.lifecycle.begin(event)?;
        self.check_no_unresolved_inserts(uow)
    }

    /// Finish the operation started with `event`.
    ///
    /// On success the save-family guard is re-asserted; regardless of the
    /// guard's outcome or the `success` flag, the context is cleared and
    /// returns to `NotStarted`.
    pub fn after_operation(
        &mut self,
        event: &EventRef,
        success: bool,
        uow: &dyn UnitOfWork,
    ) -> Result<()> {
        self.lifecycle.check_finish(event)?;
        let outcome = if success {
            self.check_no_unresolved_inserts(uow)
        } else {
            Ok(())
        };
        self.clear();
        outcome
    }

    /// Record a visit; `Ok(true)` means the instance was novel and the
    /// cascade may recurse, `Ok(false)` means stop here.
    pub fn add_entity(&mut self, entity: &EntityRef) -> Result<bool> {
        self.lifecycle.require_in_progress()?;
        let novel = self.visited.insert(entity);
        trace!(
            target: "cascara::context",
            kind = %self.kind(),
            entity = ?entity,
            novel,
            "entity visited"
        );
        Ok(novel)
    }

    /// Record a visit to an entity known to be transient (no persisted
    /// counterpart yet). Same set, distinct trace event.
    pub fn add_transient_entity(&mut self, entity: &EntityRef) -> Result<bool> {
        self.lifecycle.require_in_progress()?;
        let novel = self.visited.insert(entity);
        trace!(
            target: "cascara::context",
            kind = %self.kind(),
            entity = ?entity,
            novel,
            "transient entity visited"
        );
        Ok(novel)
    }

    /// Record that an entity has been re-read from the backing store.
    pub fn add_refreshed_entity(&mut self, entity: &EntityRef) -> Result<bool> {
        self.lifecycle.require_in_progress()?;
        let novel = self.visited.insert(entity);
        trace!(
            target: "cascara::context",
            kind = %self.kind(),
            entity = ?entity,
            novel,
            "entity refreshed"
        );
        Ok(novel)
    }

    /// Pure membership query used by refresh cascades.
    pub fn is_refreshed(&self, entity: &EntityRef) -> bool {
        self.visited.contains(entity)
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Empty the visited set and reset the lifecycle. Called automatically at
    /// the end of `after_operation`; callers that abort before reaching
    /// `after_operation` must call this themselves or the context stays
    /// wedged `InProgress` for the rest of the unit of work.
    pub fn clear(&mut self) {
        self.visited.clear();
        self.lifecycle.reset();
    }

    fn check_no_unresolved_inserts(&self, uow: &dyn UnitOfWork) -> Result<()> {
        if !self.kind().is_save_family() {
            return Ok(());
        }
        let count = uow.unresolved_insert_count();
        if count == 0 {
            Ok(())
        } else {
            Err(CascadeError::UnresolvedInsertActions {
                kind: self.kind(),
                count,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct FakeUow {
        unresolved_inserts: usize,
    }

    impl UnitOfWork for FakeUow {
        fn unresolved_insert_count(&self) -> usize {
            self.unresolved_inserts
        }

        fn describe_entity(&self, entity: &EntityRef) -> String {
            format!("{entity:?}")
        }
    }

    fn uow() -> FakeUow {
        FakeUow {
            unresolved_inserts: 0,
        }
    }

    fn entity() -> EntityRef {
        EntityRef::new(Rc::new(0u8))
    }

    fn event() -> EventRef {
        EventRef::new(Rc::new(()))
    }

    #[test]
    fn add_entity_reports_novelty_once() {
        let mut ctx = VisitedSetContext::new(OperationKind::Delete);
        let e = event();
        ctx.before_operation(&e, &uow()).unwrap();
        let a = entity();
        assert!(ctx.add_entity(&a).unwrap());
        assert!(!ctx.add_entity(&a).unwrap());
        assert!(!ctx.add_entity(&a.clone()).unwrap());
        ctx.after_operation(&e, true, &uow()).unwrap();
    }

    #[test]
    fn add_outside_operation_fails() {
        let mut ctx = VisitedSetContext::new(OperationKind::Delete);
        assert!(matches!(
            ctx.add_entity(&entity()),
            Err(CascadeError::NotInProgress {
                kind: OperationKind::Delete
            })
        ));
    }

    #[test]
    fn after_operation_clears_the_set() {
        let mut ctx = VisitedSetContext::new(OperationKind::Replicate);
        let e = event();
        let a = entity();
        ctx.before_operation(&e, &uow()).unwrap();
        ctx.add_entity(&a).unwrap();
        ctx.after_operation(&e, true, &uow()).unwrap();
        assert!(!ctx.is_in_progress());
        assert_eq!(ctx.visited_len(), 0);

        // Reused for the next operation of the same kind: previously visited
        // entities are novel again.
        let e2 = event();
        ctx.before_operation(&e2, &uow()).unwrap();
        assert!(ctx.add_entity(&a).unwrap());
        ctx.after_operation(&e2, false, &uow()).unwrap();
    }

    #[test]
    fn save_family_guard_blocks_begin() {
        let mut ctx = VisitedSetContext::new(OperationKind::Persist);
        let busy = FakeUow {
            unresolved_inserts: 2,
        };
        let e = event();
        let err = ctx.before_operation(&e, &busy).unwrap_err();
        assert!(matches!(
            err,
            CascadeError::UnresolvedInsertActions {
                kind: OperationKind::Persist,
                count: 2
            }
        ));
        // Documented sharp edge: the failed begin leaves the context started.
        assert!(ctx.is_in_progress());
        ctx.clear();
        assert!(!ctx.is_in_progress());
    }

    #[test]
    fn save_family_guard_reasserted_on_success_only() {
        let mut ctx = VisitedSetContext::new(OperationKind::SaveOrUpdate);
        let e = event();
        ctx.before_operation(&e, &uow()).unwrap();
        let busy = FakeUow {
            unresolved_inserts: 1,
        };
        let err = ctx.after_operation(&e, true, &busy).unwrap_err();
        assert!(matches!(err, CascadeError::UnresolvedInsertActions { .. }));
        // Cleanup is guaranteed even when the post hook fails.
        assert!(!ctx.is_in_progress());

        let e2 = event();
        ctx.before_operation(&e2, &uow()).unwrap();
        ctx.after_operation(&e2, false, &busy).unwrap();
        assert!(!ctx.is_in_progress());
    }

    #[test]
    fn non_save_kinds_ignore_unresolved_inserts() {
        let mut ctx = VisitedSetContext::new(OperationKind::Delete);
        let busy = FakeUow {
            unresolved_inserts: 5,
        };
        let e = event();
        ctx.before_operation(&e, &busy).unwrap();
        ctx.after_operation(&e, true, &busy).unwrap();
    }

    #[test]
    fn refresh_membership_is_pure() {
        let mut ctx = VisitedSetContext::new(OperationKind::Refresh);
        let e = event();
        let a = entity();
        ctx.before_operation(&e, &uow()).unwrap();
        assert!(!ctx.is_refreshed(&a));
        ctx.add_refreshed_entity(&a).unwrap();
        assert!(ctx.is_refreshed(&a));
        ctx.after_operation(&e, true, &uow()).unwrap();
        assert!(!ctx.is_refreshed(&a));
    }
}
