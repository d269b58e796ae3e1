//! Specialization cache.
//!
//! Maps (generic routine, interned specialized parameter types) to the
//! routine created for that signature. The cache is shared by every routine
//! inferred in a session, so it is guarded by a mutex.

use std::sync::{Mutex, PoisonError};

use rustc_hash::FxHashMap;

use tyspec_core::{RoutineId, TypeId};

type Key = (RoutineId, Vec<TypeId>);

/// Cache of generic routine specializations.
#[derive(Debug, Default)]
pub struct SpecializationCache {
    entries: Mutex<FxHashMap<Key, RoutineId>>,
}

impl SpecializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached specialization.
    pub fn get(&self, generic: RoutineId, params: &[TypeId]) -> Option<RoutineId> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&(generic, params.to_vec())).copied()
    }

    /// Return the cached specialization, or create one with `create` and
    /// insert it before the lock is released.
    ///
    /// The flag is `true` when `create` ran. `create` must not touch the
    /// cache.
    pub fn get_or_insert_with<F>(&self, generic: RoutineId, params: Vec<TypeId>, create: F) -> (RoutineId, bool)
    where
        F: FnOnce() -> RoutineId,
    {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (generic, params);
        if let Some(existing) = entries.get(&key) {
            return (*existing, false);
        }
        let id = create();
        entries.insert(key, id);
        (id, true)
    }

    /// Number of cached specializations.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Specializations created for one generic routine.
    pub fn specializations_of(&self, generic: RoutineId) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .filter(|(g, _)| *g == generic)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_keys_reuse_the_entry() {
        let cache = SpecializationCache::new();
        let generic = RoutineId::new(0);
        let (first, created) = cache.get_or_insert_with(generic, vec![TypeId::new(1)], || RoutineId::new(10));
        assert!(created);
        let (second, created) = cache.get_or_insert_with(generic, vec![TypeId::new(1)], || RoutineId::new(11));
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn keys_distinguish_generic_and_params() {
        let cache = SpecializationCache::new();
        cache.get_or_insert_with(RoutineId::new(0), vec![TypeId::new(1)], || RoutineId::new(10));
        cache.get_or_insert_with(RoutineId::new(0), vec![TypeId::new(2)], || RoutineId::new(11));
        cache.get_or_insert_with(RoutineId::new(1), vec![TypeId::new(1)], || RoutineId::new(12));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.specializations_of(RoutineId::new(0)), 2);
        assert_eq!(cache.get(RoutineId::new(1), &[TypeId::new(1)]), Some(RoutineId::new(12)));
        assert_eq!(cache.get(RoutineId::new(1), &[TypeId::new(2)]), None);
    }
}
