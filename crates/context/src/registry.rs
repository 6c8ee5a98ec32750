//! Per-unit-of-work cache of operation contexts
//!
//! At most one live context per operation kind. Storage is a fixed-size slot
//! table indexed by [`OperationKind::index`]; the canonical shape for the
//! merge kind is [`MergeReconciliationContext`], every other kind gets a
//! [`VisitedSetContext`]. Contexts are created lazily on first use and
//! reused (cleared, not destroyed) across repeated operations of the same
//! kind; `clear()` drops them all when the unit of work ends.
//!
//! The single-active-operation-per-kind rule this registry enforces is a
//! discipline for catching reentrancy bugs, not a mutex: everything here is
//! single-threaded within one unit of work.

use crate::merge::{AllowDuplicates, CopyObserverFactory, MergeReconciliationContext};
use crate::visited::VisitedSetContext;
use cascara_core::{CascadeError, OperationKind, Result};
use std::rc::Rc;
use tracing::debug;

/// A cached context, in its canonical shape for the kind.
#[derive(Debug)]
pub enum KindContext {
    Visited(VisitedSetContext),
    Merge(MergeReconciliationContext),
}

impl KindContext {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Visited(ctx) => ctx.kind(),
            Self::Merge(ctx) => ctx.kind(),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        match self {
            Self::Visited(ctx) => ctx.is_in_progress(),
            Self::Merge(ctx) => ctx.is_in_progress(),
        }
    }

    pub fn clear(&mut self) {
        match self {
            Self::Visited(ctx) => ctx.clear(),
            Self::Merge(ctx) => ctx.clear(),
        }
    }
}

/// Lazily populated context table for one unit of work.
pub struct ContextRegistry {
    slots: [Option<KindContext>; OperationKind::COUNT],
    observer_factory: CopyObserverFactory,
}

impl ContextRegistry {
    /// Registry with the default (silently accepting) duplicate policy.
    pub fn new() -> Self {
        Self::with_observer_factory(Rc::new(|| Box::new(AllowDuplicates)))
    }

    /// Registry with a configured duplicate-detection strategy; the factory
    /// is invoked once, when the merge context first starts.
    pub fn with_observer_factory(observer_factory: CopyObserverFactory) -> Self {
        Self {
            slots: Default::default(),
            observer_factory,
        }
    }

    /// Get-or-create the visited-set context for a non-merge kind.
    ///
    /// `expect_in_progress` guards against starting an operation that is
    /// already running, or finishing one that never started; a mismatch is
    /// `UnexpectedState`. Asking for the merge kind through this accessor is
    /// `TypeMismatch`.
    pub fn visited_context(
        &mut self,
        kind: OperationKind,
        expect_in_progress: bool,
    ) -> Result<&mut VisitedSetContext> {
        let slot = self.get_or_create(kind);
        Self::check_state(slot, kind, expect_in_progress)?;
        match slot {
            KindContext::Visited(ctx) => Ok(ctx),
            KindContext::Merge(_) => Err(CascadeError::TypeMismatch {
                kind,
                expected: "visited-set",
            }),
        }
    }

    /// Get-or-create the merge reconciliation context.
    pub fn merge_context(
        &mut self,
        expect_in_progress: bool,
    ) -> Result<&mut MergeReconciliationContext> {
        let kind = OperationKind::Merge;
        let slot = self.get_or_create(kind);
        Self::check_state(slot, kind, expect_in_progress)?;
        match slot {
            KindContext::Merge(ctx) => Ok(ctx),
            KindContext::Visited(_) => Err(CascadeError::TypeMismatch {
                kind,
                expected: "merge-reconciliation",
            }),
        }
    }

    /// Whether an operation of this kind is live. Absent context reads as
    /// not in progress.
    pub fn is_operation_in_progress(&self, kind: OperationKind) -> bool {
        self.slots[kind.index()]
            .as_ref()
            .is_some_and(KindContext::is_in_progress)
    }

    /// Drop every cached context. Called once when the owning unit of work
    /// ends.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        debug!(target: "cascara::context", "context registry cleared");
    }

    fn get_or_create(&mut self, kind: OperationKind) -> &mut KindContext {
        self.slots[kind.index()].get_or_insert_with(|| {
            debug!(target: "cascara::context", kind = %kind, "context created");
            match kind {
                OperationKind::Merge => KindContext::Merge(MergeReconciliationContext::new(
                    Rc::clone(&self.observer_factory),
                )),
                _ => KindContext::Visited(VisitedSetContext::new(kind)),
            }
        })
    }

    fn check_state(slot: &KindContext, kind: OperationKind, expected: bool) -> Result<()> {
        let actual = slot.is_in_progress();
        if actual != expected {
            return Err(CascadeError::UnexpectedState {
                kind,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContextRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live: Vec<OperationKind> = OperationKind::ALL
            .into_iter()
            .filter(|k| self.slots[k.index()].is_some())
            .collect();
        f.debug_struct("ContextRegistry")
            .field("cached", &live)
            .finish()
    }
}
