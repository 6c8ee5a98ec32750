//! Error taxonomy for the bookkeeping engine
//!
//! Every failure mode gets its own variant so cascade algorithms and tests
//! can discriminate them. Precondition violations abort the current cascade;
//! invariant violations (`InternalInconsistency`, `ResultReplacementNotAllowed`,
//! `UnknownMergeEntity`) signal caller misuse or an algorithm bug and are
//! never silently repaired.
//!
//! Failures do not roll back partial mutations already applied to a context's
//! maps; diagnostics rely on seeing the state as it was at the point of
//! failure, and only an explicit `clear()` discards it.

use crate::kind::OperationKind;
use thiserror::Error;

/// Result type alias for bookkeeping operations.
pub type Result<T> = std::result::Result<T, CascadeError>;

/// Failure modes of the cascading-operation bookkeeping engine.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// `before_operation` called while an operation of this kind is live.
    #[error("a {kind} operation is already in progress")]
    AlreadyInProgress { kind: OperationKind },

    /// Context used or finished while no operation of this kind is live.
    #[error("no {kind} operation is in progress")]
    NotInProgress { kind: OperationKind },

    /// `after_operation` called with a different root event than
    /// `before_operation` stored.
    #[error("{kind} operation finished with a different root event than it started with")]
    PayloadMismatch { kind: OperationKind },

    /// Malformed caller input the type system cannot rule out.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Save-family guard: unresolved insert actions are still queued.
    #[error("{count} unresolved insert action(s) pending around a {kind} operation")]
    UnresolvedInsertActions { kind: OperationKind, count: usize },

    /// A merge entity's managed result, once fixed, is immutable for the
    /// life of the context.
    #[error("cannot replace the managed result already associated with {entity}")]
    ResultReplacementNotAllowed { entity: String },

    /// Status change requested for an entity the merge context never saw.
    #[error("{entity} was never registered with the merge context")]
    UnknownMergeEntity { entity: String },

    /// The three merge cross-reference maps disagree; caller/algorithm bug.
    #[error("merge bookkeeping maps are out of sync: {0}")]
    InternalInconsistency(String),

    /// Registry guard: the live context's in-progress flag did not match
    /// the caller's expectation.
    #[error("{kind} context expected in-progress={expected} but found in-progress={actual}")]
    UnexpectedState {
        kind: OperationKind,
        expected: bool,
        actual: bool,
    },

    /// Registry guard: the cached context is not the concrete shape the
    /// caller asked for.
    #[error("cached {kind} context is not a {expected} context")]
    TypeMismatch {
        kind: OperationKind,
        expected: &'static str,
    },

    /// The installed copy observer vetoed a duplicate representation.
    #[error("two merge entities represent the same managed result {managed}")]
    DuplicateRepresentationRejected { managed: String },

    /// Encoding or decoding a persisted queue snapshot failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}
