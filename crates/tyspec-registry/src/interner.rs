//! Session-wide type interning.
//!
//! Types are bucketed by their structural [`TypeHash`] and compared for
//! equality inside the bucket, so a hash collision never merges two distinct
//! types. The table is append-only: an id, once handed out, names the same
//! type for the life of the interner.

use std::sync::{PoisonError, RwLock};

use rustc_hash::FxHashMap;

use tyspec_core::{Type, TypeHash, TypeId};

#[derive(Default)]
struct Table {
    types: Vec<Type>,
    buckets: FxHashMap<TypeHash, Vec<TypeId>>,
}

impl Table {
    fn find(&self, hash: TypeHash, ty: &Type) -> Option<TypeId> {
        self.buckets
            .get(&hash)?
            .iter()
            .copied()
            .find(|id| self.types[id.index()] == *ty)
    }
}

/// Append-only table of canonical types.
#[derive(Default)]
pub struct TypeInterner {
    table: RwLock<Table>,
}

impl TypeInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The canonical id of `ty`, allocating one on first sight.
    pub fn intern(&self, ty: &Type) -> TypeId {
        let hash = TypeHash::of(ty);
        {
            let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = table.find(hash, ty) {
                return id;
            }
        }

        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        // Another thread may have inserted it between the two locks.
        if let Some(id) = table.find(hash, ty) {
            return id;
        }
        let id = TypeId::new(table.types.len() as u32);
        table.types.push(ty.clone());
        table.buckets.entry(hash).or_default().push(id);
        id
    }

    /// Intern an ordered list of types.
    pub fn intern_all(&self, types: &[Type]) -> Vec<TypeId> {
        types.iter().map(|ty| self.intern(ty)).collect()
    }

    /// The type behind an id.
    pub fn get(&self, id: TypeId) -> Option<Type> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        table.types.get(id.index()).cloned()
    }

    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .types
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TypeInterner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeInterner")
            .field("len", &self.len())
            .finish()
    }
}
