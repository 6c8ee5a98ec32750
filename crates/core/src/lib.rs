//! Core vocabulary for the cascara bookkeeping engine
//!
//! This crate defines the types shared by every other layer: the closed set
//! of operation kinds, identity-keyed entity/event handles and collections,
//! the error taxonomy, and the narrow traits through which the surrounding
//! persistence layer plugs in (unit of work, copy observer, pending action).
//!
//! Nothing in here performs I/O or generates storage commands; those concerns
//! live in the (out-of-scope) layers that consume this engine.

pub mod error;
pub mod handle;
pub mod identity;
pub mod kind;
pub mod traits;

pub use error::{CascadeError, Result};
pub use handle::{EntityRef, EventRef, IdentityKey, ResourceKey};
pub use identity::{IdentityMap, IdentitySet};
pub use kind::OperationKind;
pub use traits::{CopyObserver, PendingAction, UnitOfWork};
