//! Cascara - cascading-operation bookkeeping for unit-of-work persistence layers
//!
//! Cascara is the bookkeeping a persistence layer needs to traverse
//! potentially cyclic graphs of domain objects while running persist, merge,
//! delete, refresh, or replicate cascades, and to manage the queue of pending
//! write actions those traversals produce. It detects and stops infinite
//! recursion without relying on entities' own equality, reconciles multiple
//! in-memory representations of one logical record during a merge, and keeps
//! an incrementally maintained summary of the storage resources the queued
//! writes touch.
//!
//! # Quick Start
//!
//! ```ignore
//! use cascara::{ContextRegistry, EntityRef, EventRef, OperationKind};
//!
//! let mut registry = ContextRegistry::new();
//! let event = EventRef::new(root_event);
//!
//! // Start a delete cascade.
//! let ctx = registry.visited_context(OperationKind::Delete, false)?;
//! ctx.before_operation(&event, &unit_of_work)?;
//!
//! // At each node: recurse only when the instance is novel.
//! if ctx.add_entity(&entity)? {
//!     // ... cascade to associations, schedule pending actions ...
//! }
//!
//! ctx.after_operation(&event, true, &unit_of_work)?;
//! ```
//!
//! # Scope
//!
//! This is an in-process library scoped to a single unit of work and a single
//! logical thread of control. Command generation, schema binding, value
//! conversion, and I/O are external collaborators reached through the traits
//! in [`cascara_core::traits`].

pub use cascara_context::{
    AllowDuplicates, ContextRegistry, CopyObserverFactory, KindContext,
    MergeReconciliationContext, OperationLifecycle, OperationPhase, RejectDuplicates,
    VisitedSetContext,
};
pub use cascara_core::{
    CascadeError, CopyObserver, EntityRef, EventRef, IdentityKey, IdentityMap, IdentitySet,
    OperationKind, PendingAction, ResourceKey, Result, UnitOfWork,
};
pub use cascara_queue::{ActionComparator, PendingActionQueue, SavedQueue, SortPolicy};
