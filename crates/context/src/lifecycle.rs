//! Start/stop state machine shared by every operation context
//!
//! `NotStarted -> InProgress -> NotStarted`, keyed on the root event the
//! operation was started with. The original design hung per-kind behavior off
//! virtual lifecycle hooks; here the lifecycle is a plain struct the contexts
//! compose, and each context runs its own pre/post checks around the
//! transitions.
//!
//! The finish path is deliberately split in two: [`OperationLifecycle::check_finish`]
//! verifies the preconditions, and the owning context then performs its hook
//! work under a guard that clears state on every exit path. A hook failure
//! must never leave a context stuck `InProgress`.

use cascara_core::{CascadeError, EventRef, OperationKind, Result};
use tracing::debug;

/// Phase of an operation lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    NotStarted,
    InProgress,
}

/// Generic start/stop machine for one operation kind.
#[derive(Debug)]
pub struct OperationLifecycle {
    kind: OperationKind,
    phase: OperationPhase,
    event: Option<EventRef>,
}

impl OperationLifecycle {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            phase: OperationPhase::NotStarted,
            event: None,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase == OperationPhase::InProgress
    }

    /// Fail unless an operation is live. Used by per-entity context calls.
    pub fn require_in_progress(&self) -> Result<()> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(CascadeError::NotInProgress { kind: self.kind })
        }
    }

    /// Transition to `InProgress`, storing the root event.
    pub fn begin(&mut self, event: &EventRef) -> Result<()> {
        if self.is_in_progress() {
            return Err(CascadeError::AlreadyInProgress { kind: self.kind });
        }
        self.event = Some(event.clone());
        self.phase = OperationPhase::InProgress;
        debug!(target: "cascara::context", kind = %self.kind, "operation started");
        Ok(())
    }

    /// Verify that `event` may finish the live operation.
    ///
    /// Does not mutate: the owning context runs its post hook and then resets
    /// unconditionally, so preconditions have to be checked up front.
    pub fn check_finish(&self, event: &EventRef) -> Result<()> {
        let stored = match &self.event {
            Some(stored) if self.is_in_progress() => stored,
            _ => return Err(CascadeError::NotInProgress { kind: self.kind }),
        };
        if !stored.same_instance(event) {
            return Err(CascadeError::PayloadMismatch { kind: self.kind });
        }
        Ok(())
    }

    /// Return to `NotStarted`, dropping the stored event.
    pub fn reset(&mut self) {
        if self.is_in_progress() {
            debug!(target: "cascara::context", kind = %self.kind, "operation cleared");
        }
        self.phase = OperationPhase::NotStarted;
        self.event = None;
    }
}
