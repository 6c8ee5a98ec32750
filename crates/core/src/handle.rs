//! Identity-keyed handles for entities, root events, and storage resources
//!
//! Domain entities may have absent, partial, or outright misleading value
//! equality, so the bookkeeping engine never consults an entity's own
//! `Eq`/`Hash`. Instead it works through [`EntityRef`], a cloneable handle
//! whose equality and hash are derived from the identity of the underlying
//! allocation. Two value-equal but distinct instances are distinct keys; two
//! clones of one handle are the same key.
//!
//! Holding an `EntityRef` keeps the underlying allocation alive, so an
//! identity stored in a map can never be recycled out from under it.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Stable synthetic identity of a live entity or event instance.
///
/// Derived from the allocation address; only meaningful while some handle to
/// the instance is alive.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(usize);

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({:#x})", self.0)
    }
}

/// Opaque handle to a domain entity, compared by reference identity.
pub struct EntityRef(Rc<dyn Any>);

impl EntityRef {
    /// Wrap a shared entity instance.
    pub fn new<T: 'static>(entity: Rc<T>) -> Self {
        Self(entity)
    }

    /// Wrap an already type-erased instance.
    pub fn from_dyn(entity: Rc<dyn Any>) -> Self {
        Self(entity)
    }

    /// Synthetic identity of the referenced instance.
    #[inline]
    pub fn identity(&self) -> IdentityKey {
        IdentityKey(Rc::as_ptr(&self.0) as *const () as usize)
    }

    /// Whether two handles refer to the same in-memory instance.
    #[inline]
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Recover the concrete entity, if the caller knows its type.
    pub fn downcast<T: 'static>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.0).downcast::<T>().ok()
    }
}

impl Clone for EntityRef {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

// Identity semantics only: value equality of the underlying entity is
// deliberately not consulted.
impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl Eq for EntityRef {}

impl Hash for EntityRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({:#x})", self.identity().0)
    }
}

/// Opaque handle to the root event an operation was started with.
///
/// Lifecycles compare the event passed to `after_operation` against the one
/// stored by `before_operation` by instance identity, never by value.
pub struct EventRef(Rc<dyn Any>);

impl EventRef {
    /// Wrap a shared root-event instance.
    pub fn new<T: 'static>(event: Rc<T>) -> Self {
        Self(event)
    }

    /// Whether two handles refer to the same event instance.
    #[inline]
    pub fn same_instance(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Clone for EventRef {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl fmt::Debug for EventRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventRef({:#x})", Rc::as_ptr(&self.0) as *const () as usize)
    }
}

/// Identifier for a unit of backing storage (e.g. a table) touched by a
/// pending action; used for cache invalidation at flush time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceKey {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
