//! The type lattice: ranked matching, substitution and per-category type
//! operations.
//!
//! [`TypeMatcher::match_type`] answers "may a value of `source` flow into a
//! slot of `target`, and how well?". It never fails with an error; a
//! [`MatchRank::None`] is interpreted by the caller. Type holders in the
//! target are bound in a [`SubstitutionMap`] as a side effect, which is how
//! generic routines learn their concrete parameter types.

mod matcher;
mod ops;

pub use matcher::TypeMatcher;
pub use ops::{MethodTable, OpsContext, TypeOperations, operations_for};

use rustc_hash::FxHashMap;

use tyspec_core::{HolderId, Param, RoutineType, TupleItem, TupleType, Type, TypeAttrs, TypeKind};

/// Quality of a match, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// No match.
    None,
    /// Matched through `any` or a loose type; checked at run time.
    Any,
    /// Matched through widening, inheritance or holder binding.
    Subtype,
    /// Identical types.
    Exact,
}

impl MatchRank {
    #[inline]
    pub fn is_match(self) -> bool {
        self != MatchRank::None
    }
}

/// Holder bindings: holder id → concrete type.
pub type SubstitutionMap = FxHashMap<HolderId, Type>;

/// Replace bound holders in `ty`, recursively.
///
/// A holder's qualifiers are combined with those of its binding. Unbound
/// holders remain; callers check [`Type::is_parametric`] on the result.
pub fn specialize(ty: &Type, subst: &SubstitutionMap) -> Type {
    if !ty.is_parametric() || subst.is_empty() {
        return ty.clone();
    }
    let qualifiers = ty.attrs() & TypeAttrs::QUALIFIERS;
    let specialized = match ty.kind() {
        TypeKind::Holder(id, _) => match subst.get(id) {
            Some(bound) => return bound.with_qualifiers(bound.attrs() | qualifiers),
            None => return ty.clone(),
        },
        TypeKind::List(e) => Type::list(specialize(e, subst)),
        TypeKind::Array(e) => Type::array(specialize(e, subst)),
        TypeKind::Map(k, v) => Type::map(specialize(k, subst), specialize(v, subst)),
        TypeKind::Tuple(t) => Type::tuple(TupleType {
            items: t
                .items
                .iter()
                .map(|item| TupleItem {
                    name: item.name.clone(),
                    ty: specialize(&item.ty, subst),
                })
                .collect(),
            variadic: t.variadic,
        }),
        TypeKind::Variant(alts) => {
            Type::variant(alts.iter().map(|alt| specialize(alt, subst)).collect())
        }
        TypeKind::Routine(r) => Type::routine(specialize_signature(r, subst)),
        _ => return ty.clone(),
    };
    specialized.with_qualifiers(qualifiers)
}

/// [`specialize`] applied to every part of a signature.
pub fn specialize_signature(sig: &RoutineType, subst: &SubstitutionMap) -> RoutineType {
    let params = sig
        .params
        .iter()
        .map(|p| Param {
            name: p.name.clone(),
            ty: specialize(&p.ty, subst),
            kind: p.kind,
        })
        .collect();
    let mut out = RoutineType::new(params, specialize(&sig.ret, subst));
    if let Some(section) = &sig.section {
        out = out.with_section(specialize_signature(section, subst));
    }
    out
}

/// The base type: `const`, `invar` and `var` stripped from the top level and
/// from one level of nested type arguments.
pub fn project_base(ty: &Type) -> Type {
    let base = match ty.kind() {
        TypeKind::List(e) => Type::list(e.unqualified()),
        TypeKind::Array(e) => Type::array(e.unqualified()),
        TypeKind::Map(k, v) => Type::map(k.unqualified(), v.unqualified()),
        TypeKind::Tuple(t) => Type::tuple(TupleType {
            items: t
                .items
                .iter()
                .map(|item| TupleItem {
                    name: item.name.clone(),
                    ty: item.ty.unqualified(),
                })
                .collect(),
            variadic: t.variadic,
        }),
        TypeKind::Variant(alts) => Type::variant(alts.iter().map(Type::unqualified).collect()),
        _ => ty.clone(),
    };
    base.unqualified()
}
