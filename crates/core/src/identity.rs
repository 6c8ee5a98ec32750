//! Identity-keyed collections over entity handles
//!
//! Thin wrappers around `FxHashMap`/`FxHashSet` keyed by [`EntityRef`]'s
//! identity semantics. The wrappers hold the handles themselves, so every
//! registered identity pins its allocation for the lifetime of the entry.

use crate::handle::EntityRef;
use rustc_hash::{FxHashMap, FxHashSet};

/// Set of visited entity instances, keyed by reference identity.
#[derive(Debug, Default)]
pub struct IdentitySet {
    inner: FxHashSet<EntityRef>,
}

impl IdentitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity; returns true when the instance was not yet present.
    pub fn insert(&mut self, entity: &EntityRef) -> bool {
        self.inner.insert(entity.clone())
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.inner.contains(entity)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every entry. Retains allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

/// Map keyed by entity instance identity.
#[derive(Debug)]
pub struct IdentityMap<V> {
    inner: FxHashMap<EntityRef, V>,
}

impl<V> Default for IdentityMap<V> {
    fn default() -> Self {
        Self {
            inner: FxHashMap::default(),
        }
    }
}

impl<V> IdentityMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite; returns the previous value, if any.
    pub fn insert(&mut self, entity: &EntityRef, value: V) -> Option<V> {
        self.inner.insert(entity.clone(), value)
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&V> {
        self.inner.get(entity)
    }

    pub fn contains(&self, entity: &EntityRef) -> bool {
        self.inner.contains_key(entity)
    }

    pub fn remove(&mut self, entity: &EntityRef) -> Option<V> {
        self.inner.remove(entity)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityRef, &V)> {
        self.inner.iter()
    }

    /// Drop every entry. Retains allocated capacity for reuse.
    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn entity() -> EntityRef {
        EntityRef::new(Rc::new(0u8))
    }

    #[test]
    fn set_reports_novelty_per_instance() {
        let mut set = IdentitySet::new();
        let a = entity();
        let b = entity();
        assert!(set.insert(&a));
        assert!(!set.insert(&a));
        assert!(!set.insert(&a.clone()));
        assert!(set.insert(&b));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn map_distinguishes_value_equal_instances() {
        let mut map = IdentityMap::new();
        let a = EntityRef::new(Rc::new(String::from("same")));
        let b = EntityRef::new(Rc::new(String::from("same")));
        map.insert(&a, 1);
        map.insert(&b, 2);
        assert_eq!(map.get(&a), Some(&1));
        assert_eq!(map.get(&b), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn map_overwrite_returns_previous() {
        let mut map = IdentityMap::new();
        let a = entity();
        assert_eq!(map.insert(&a, 1), None);
        assert_eq!(map.insert(&a, 2), Some(1));
        assert_eq!(map.get(&a), Some(&2));
    }

    #[test]
    fn clear_empties_but_keeps_usable() {
        let mut map = IdentityMap::new();
        let a = entity();
        map.insert(&a, ());
        map.clear();
        assert!(map.is_empty());
        assert!(!map.contains(&a));
        map.insert(&a, ());
        assert_eq!(map.len(), 1);
    }
}
