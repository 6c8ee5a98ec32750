//! Operation contexts for cascading graph traversals
//!
//! A cascade (persist, merge, delete, refresh, replicate, ...) walks a
//! potentially cyclic graph of domain objects. The contexts in this crate are
//! the bookkeeping that lets it terminate: an identity-based visited set for
//! the simple kinds, and a three-map cross-reference for merge, which has to
//! reconcile multiple in-memory representations of the same logical record.
//!
//! All contexts are scoped to one unit of work, used from one logical thread,
//! created lazily by [`ContextRegistry`], and reused (cleared, not destroyed)
//! across repeated operations of the same kind.

pub mod lifecycle;
pub mod merge;
pub mod registry;
pub mod visited;

pub use lifecycle::{OperationLifecycle, OperationPhase};
pub use merge::{
    AllowDuplicates, CopyObserverFactory, MergeReconciliationContext, RejectDuplicates,
};
pub use registry::{ContextRegistry, KindContext};
pub use visited::VisitedSetContext;
