//! Deterministic structural type hashing.
//!
//! [`TypeHash`] is a 64-bit digest of a type's full structure (tag, qualifiers,
//! nested arguments, names). The interner uses it to bucket candidate types so
//! that structurally equal types share one canonical id, and routine
//! specializations are keyed by the digests of their parameter types.
//!
//! # Hash Computation
//!
//! Each tag mixes a domain constant into an XXHash64 digest of its children,
//! so `list<int>` and `array<int>` never collide on structure alone.
//!
//! ```
//! use tyspec_core::{Type, TypeHash};
//!
//! let a = TypeHash::of(&Type::list(Type::int()));
//! let b = TypeHash::of(&Type::list(Type::int()));
//! let c = TypeHash::of(&Type::array(Type::int()));
//! assert_eq!(a, b);
//! assert_ne!(a, c);
//! ```

use std::fmt;

use xxhash_rust::xxh64::xxh64;

use crate::types::{Param, ParamKind, RoutineType, Type, TypeKind};

/// Domain-specific mixing constants, one per type tag.
pub mod hash_constants {
    pub const SEP: u64 = 0x4bc94d6bd06053ad;
    pub const NONE: u64 = 0x2fac10b63a6cc57c;
    pub const BOOL: u64 = 0x5ea77ffbcdf5f302;
    pub const INT: u64 = 0x7d3c8b4a92e15f6d;
    pub const FLOAT: u64 = 0x3e9f5d2a8c7b1403;
    pub const COMPLEX: u64 = 0x9a7f3d5e2b8c4601;
    pub const STRING: u64 = 0x1a095090689d4647;
    pub const ENUM: u64 = 0x9e3779b97f4a7c15;
    pub const LIST: u64 = 0xbf58476d1ce4e5b9;
    pub const MAP: u64 = 0x94d049bb133111eb;
    pub const ARRAY: u64 = 0xd6e8feb86659fd93;
    pub const TUPLE: u64 = 0xe7037ed1a0b428db;
    pub const VARIANT: u64 = 0xc6a4a7935bd1e995;
    pub const ROUTINE: u64 = 0x8648dbbc94d49b8d;
    pub const OVERLOADS: u64 = 0xa2b48b2c69e0d657;
    pub const OBJECT: u64 = 0x7c3e9f2a5b8d1403;
    pub const INTERFACE: u64 = 0x5d8c7b4a3e9f2106;
    pub const HOLDER: u64 = 0x3f1e9d8c7b5a4203;
    pub const ANY: u64 = 0x1a2b3c4d5e6f7089;
    pub const SECTION: u64 = 0x9f8e7d6c5b4a3210;
}

use hash_constants as hc;

/// A deterministic 64-bit structural digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Hash of a name within a domain.
    #[inline]
    pub fn from_name(domain: u64, name: &str) -> Self {
        TypeHash(xxh64(name.as_bytes(), domain))
    }

    /// Combine a domain constant with an ordered list of child digests.
    pub fn combine(domain: u64, parts: &[TypeHash]) -> Self {
        let mut bytes = Vec::with_capacity(8 * (parts.len() + 1));
        bytes.extend_from_slice(&domain.to_le_bytes());
        for (i, part) in parts.iter().enumerate() {
            let mixed = part.0 ^ hc::SEP.rotate_left(i as u32);
            bytes.extend_from_slice(&mixed.to_le_bytes());
        }
        TypeHash(xxh64(&bytes, domain))
    }

    /// Structural digest of a type.
    pub fn of(ty: &Type) -> Self {
        let qualifiers = TypeHash(u64::from(ty.attrs().bits()));
        let body = match ty.kind() {
            TypeKind::None => TypeHash(hc::NONE),
            TypeKind::Bool => TypeHash(hc::BOOL),
            TypeKind::Int => TypeHash(hc::INT),
            TypeKind::Float => TypeHash(hc::FLOAT),
            TypeKind::Complex => TypeHash(hc::COMPLEX),
            TypeKind::String => TypeHash(hc::STRING),
            TypeKind::Any => TypeHash(hc::ANY),
            TypeKind::Enum(e) => {
                let mut parts = vec![TypeHash::from_name(hc::ENUM, &e.name)];
                for (symbol, value) in &e.symbols {
                    parts.push(TypeHash::from_name(hc::ENUM, symbol));
                    parts.push(TypeHash(*value as u64));
                }
                TypeHash::combine(hc::ENUM, &parts)
            }
            TypeKind::List(e) => TypeHash::combine(hc::LIST, &[TypeHash::of(e)]),
            TypeKind::Array(e) => TypeHash::combine(hc::ARRAY, &[TypeHash::of(e)]),
            TypeKind::Map(k, v) => TypeHash::combine(hc::MAP, &[TypeHash::of(k), TypeHash::of(v)]),
            TypeKind::Tuple(t) => {
                let mut parts = Vec::with_capacity(t.items.len() * 2 + 1);
                parts.push(TypeHash(u64::from(t.variadic)));
                for item in &t.items {
                    parts.push(match &item.name {
                        Some(name) => TypeHash::from_name(hc::TUPLE, name),
                        None => TypeHash::EMPTY,
                    });
                    parts.push(TypeHash::of(&item.ty));
                }
                TypeHash::combine(hc::TUPLE, &parts)
            }
            TypeKind::Variant(alts) => {
                let parts: Vec<_> = alts.iter().map(TypeHash::of).collect();
                TypeHash::combine(hc::VARIANT, &parts)
            }
            TypeKind::Routine(r) => TypeHash::of_routine(r),
            TypeKind::Overloads(id) => TypeHash::combine(hc::OVERLOADS, &[TypeHash(u64::from(id.0))]),
            TypeKind::Object(id) => TypeHash::combine(hc::OBJECT, &[TypeHash(u64::from(id.0))]),
            TypeKind::Interface(id) => {
                TypeHash::combine(hc::INTERFACE, &[TypeHash(u64::from(id.0))])
            }
            TypeKind::Holder(id, _) => TypeHash::combine(hc::HOLDER, &[TypeHash(u64::from(id.0))]),
        };
        TypeHash::combine(hc::SEP, &[body, qualifiers])
    }

    /// Structural digest of a routine signature.
    pub fn of_routine(routine: &RoutineType) -> Self {
        let mut parts: Vec<TypeHash> = routine.params.iter().map(param_hash).collect();
        parts.push(TypeHash::of(&routine.ret));
        if let Some(section) = &routine.section {
            parts.push(TypeHash::combine(hc::SECTION, &[TypeHash::of_routine(section)]));
        }
        TypeHash::combine(hc::ROUTINE, &parts)
    }

    /// Digest of an ordered parameter-type list, used as a specialization key.
    pub fn of_signature(types: &[Type]) -> Self {
        let parts: Vec<_> = types.iter().map(TypeHash::of).collect();
        TypeHash::combine(hc::ROUTINE, &parts)
    }
}

fn param_hash(param: &Param) -> TypeHash {
    let kind = match param.kind {
        ParamKind::Positional => 0,
        ParamKind::Default => 1,
        ParamKind::SelfParam => 2,
        ParamKind::Variadic => 3,
    };
    TypeHash::combine(
        hc::ROUTINE,
        &[
            TypeHash::from_name(hc::SEP, &param.name),
            TypeHash(kind),
            TypeHash::of(&param.ty),
        ],
    )
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ClassId, HolderId, TupleItem, TupleType};

    #[test]
    fn hash_is_deterministic() {
        let ty = Type::map(Type::string(), Type::list(Type::float()));
        assert_eq!(TypeHash::of(&ty), TypeHash::of(&ty.clone()));
    }

    #[test]
    fn tags_are_domain_separated() {
        assert_ne!(
            TypeHash::of(&Type::list(Type::int())),
            TypeHash::of(&Type::array(Type::int()))
        );
        assert_ne!(
            TypeHash::of(&Type::object(ClassId::new(1))),
            TypeHash::of(&Type::holder(HolderId::new(1), "T"))
        );
    }

    #[test]
    fn qualifiers_change_hash() {
        let ty = Type::list(Type::int());
        assert_ne!(TypeHash::of(&ty), TypeHash::of(&ty.to_invariable()));
    }

    #[test]
    fn tuple_names_change_hash() {
        let named = Type::tuple(TupleType {
            items: vec![TupleItem::named("x", Type::int())],
            variadic: false,
        });
        let plain = Type::tuple_of(vec![Type::int()]);
        assert_ne!(TypeHash::of(&named), TypeHash::of(&plain));
    }

    #[test]
    fn signature_order_matters() {
        let a = TypeHash::of_signature(&[Type::int(), Type::string()]);
        let b = TypeHash::of_signature(&[Type::string(), Type::int()]);
        assert_ne!(a, b);
    }
}
