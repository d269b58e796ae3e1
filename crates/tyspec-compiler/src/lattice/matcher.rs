//! Ranked structural matching.

use tyspec_core::{EnumKind, EnumType, HolderId, ParamKind, RoutineType, TupleType, Type, TypeKind, Value};
use tyspec_registry::ClassRegistry;

use super::{MatchRank, SubstitutionMap, project_base};

/// Matches types against the class registry's is-a relation.
#[derive(Clone, Copy)]
pub struct TypeMatcher<'r> {
    registry: &'r ClassRegistry,
}

impl<'r> TypeMatcher<'r> {
    pub fn new(registry: &'r ClassRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ClassRegistry {
        self.registry
    }

    /// Rank `source` flowing into `target`, binding target holders in `subst`.
    ///
    /// Rules, by priority:
    ///
    /// 1. An `any` target or a loose source matches as [`MatchRank::Any`].
    /// 2. A holder target binds to the base of `source`; the first binding
    ///    wins and later sources are matched against it.
    /// 3. Qualifiers must be compatible, then the tags are compared
    ///    structurally.
    pub fn match_type(&self, source: &Type, target: &Type, subst: &mut SubstitutionMap) -> MatchRank {
        if target.is_any() || source.is_loose() {
            return MatchRank::Any;
        }
        if let TypeKind::Holder(id, _) = target.kind() {
            return self.bind(*id, source, subst);
        }
        if !qualifiers_compatible(source, target) {
            return MatchRank::None;
        }
        // Optional and union sources must fit as a whole.
        if let TypeKind::Variant(alts) = source.kind() {
            return self.match_variant_source(alts, target, subst);
        }
        if let TypeKind::Variant(alts) = target.kind() {
            return self.match_variant_target(source, alts, subst);
        }
        self.match_structure(source, target, subst)
    }

    /// Rank a constant value against `target` through its intrinsic type.
    pub fn match_value(&self, value: &Value, target: &Type, subst: &mut SubstitutionMap) -> MatchRank {
        match value.intrinsic_type() {
            Some(ty) => self.match_type(&ty, target, subst),
            None => MatchRank::None,
        }
    }

    /// The wider of two literal item types, or `None` when neither accepts
    /// the other.
    pub fn join(&self, a: &Type, b: &Type) -> Option<Type> {
        let a = project_base(a);
        let b = project_base(b);
        if a == b {
            return Some(a);
        }
        let mut scratch = SubstitutionMap::default();
        if self.match_type(&a, &b, &mut scratch).is_match() {
            return Some(b);
        }
        scratch.clear();
        if self.match_type(&b, &a, &mut scratch).is_match() {
            return Some(a);
        }
        None
    }

    fn bind(&self, id: HolderId, source: &Type, subst: &mut SubstitutionMap) -> MatchRank {
        if let Some(bound) = subst.get(&id).cloned() {
            return self.match_type(source, &bound, subst);
        }
        subst.insert(id, project_base(source));
        MatchRank::Subtype
    }

    fn match_variant_source(&self, alts: &[Type], target: &Type, subst: &mut SubstitutionMap) -> MatchRank {
        let mut matched = 0usize;
        let mut weakest = MatchRank::Exact;
        for alt in alts {
            let rank = self.match_type(alt, target, subst);
            if rank.is_match() {
                matched += 1;
                weakest = weakest.min(rank);
            }
        }
        match matched {
            0 => MatchRank::None,
            n if n == alts.len() => weakest,
            _ => MatchRank::Any,
        }
    }

    fn match_variant_target(&self, source: &Type, alts: &[Type], subst: &mut SubstitutionMap) -> MatchRank {
        let mut best = (MatchRank::None, None);
        for alt in alts {
            let mut trial = subst.clone();
            let rank = self.match_type(source, alt, &mut trial);
            if rank > best.0 {
                best = (rank, Some(trial));
            }
        }
        if let (_, Some(trial)) = &best {
            subst.clone_from(trial);
        }
        best.0
    }

    fn match_structure(&self, source: &Type, target: &Type, subst: &mut SubstitutionMap) -> MatchRank {
        use TypeKind::*;

        if let (Some(s), Some(t)) = (source.numeric_rank(), target.numeric_rank()) {
            return match s.cmp(&t) {
                std::cmp::Ordering::Equal => MatchRank::Exact,
                std::cmp::Ordering::Less => MatchRank::Subtype,
                std::cmp::Ordering::Greater => MatchRank::None,
            };
        }

        match (source.kind(), target.kind()) {
            (None, None) | (String, String) => MatchRank::Exact,
            (Enum(s), Enum(t)) => match_enum(s, t),
            (List(s), List(t)) | (Array(s), Array(t)) => self.match_type(s, t, subst),
            (Map(sk, sv), Map(tk, tv)) => {
                let key = self.match_type(sk, tk, subst);
                if !key.is_match() {
                    return MatchRank::None;
                }
                key.min(self.match_type(sv, tv, subst))
            }
            (Tuple(s), Tuple(t)) => self.match_tuple(s, t, subst),
            (Routine(s), Routine(t)) => self.match_routine(s, t, subst),
            (Overloads(s), Overloads(t)) if s == t => MatchRank::Exact,
            (Overloads(_), Routine(_)) => MatchRank::Any,
            (Object(s), Object(t)) if s == t => MatchRank::Exact,
            (Object(s), Object(t)) if self.registry.is_subclass(*s, *t) => MatchRank::Subtype,
            (Object(s), Interface(t)) if self.registry.implements(*s, *t) => MatchRank::Subtype,
            (Interface(s), Interface(t)) if s == t => MatchRank::Exact,
            (Interface(s), Interface(t)) if self.registry.interface_extends(*s, *t) => {
                MatchRank::Subtype
            }
            _ => MatchRank::None,
        }
    }

    fn match_tuple(&self, source: &TupleType, target: &TupleType, subst: &mut SubstitutionMap) -> MatchRank {
        if source.variadic && !target.variadic {
            return MatchRank::None;
        }
        let fits = if target.variadic {
            source.items.len() + 1 >= target.items.len()
        } else {
            source.items.len() == target.items.len()
        };
        if !fits {
            return MatchRank::None;
        }
        let mut weakest = MatchRank::Exact;
        for (index, item) in source.items.iter().enumerate() {
            let target_name = target.items.get(index).and_then(|i| i.name.as_ref());
            if let (Some(s), Some(t)) = (item.name.as_ref(), target_name)
                && s != t
            {
                return MatchRank::None;
            }
            let Some(expected) = target.item_type(index) else {
                return MatchRank::None;
            };
            let rank = self.match_type(&item.ty, expected, subst);
            if !rank.is_match() {
                return MatchRank::None;
            }
            weakest = weakest.min(rank);
        }
        weakest
    }

    /// Parameters are contravariant, the return type covariant. The source
    /// may take extra trailing parameters if they are optional.
    fn match_routine(&self, source: &RoutineType, target: &RoutineType, subst: &mut SubstitutionMap) -> MatchRank {
        if source.params.len() < target.params.len() {
            return MatchRank::None;
        }
        let extras_optional = source.params[target.params.len()..]
            .iter()
            .all(|p| matches!(p.kind, ParamKind::Default | ParamKind::Variadic));
        if !extras_optional {
            return MatchRank::None;
        }
        let mut weakest = MatchRank::Exact;
        for (s, t) in source.params.iter().zip(&target.params) {
            let rank = self.match_type(&t.ty, &s.ty, subst);
            if !rank.is_match() {
                return MatchRank::None;
            }
            weakest = weakest.min(rank);
        }
        let ret = if target.ret.is_none() {
            MatchRank::Exact
        } else {
            self.match_type(&source.ret, &target.ret, subst)
        };
        if !ret.is_match() {
            return MatchRank::None;
        }
        weakest = weakest.min(ret);
        match (&source.section, &target.section) {
            (_, Option::None) => weakest,
            (Some(s), Some(t)) => weakest.min(self.match_routine(s, t, subst)),
            (Option::None, Some(_)) => MatchRank::None,
        }
    }
}

/// `var` targets reject invariable sources; plain mutable targets accept
/// them for value types only.
fn qualifiers_compatible(source: &Type, target: &Type) -> bool {
    if !source.is_invariable() {
        return true;
    }
    if target.is_var() {
        return false;
    }
    target.is_invariable() || source.is_primitive()
}

fn match_enum(source: &EnumType, target: &EnumType) -> MatchRank {
    if source == target {
        return MatchRank::Exact;
    }
    let symbol_fits = source.kind == EnumKind::Symbol
        && target.kind != EnumKind::Symbol
        && source.symbols.iter().all(|(name, _)| target.contains(name));
    if symbol_fits {
        MatchRank::Subtype
    } else {
        MatchRank::None
    }
}
