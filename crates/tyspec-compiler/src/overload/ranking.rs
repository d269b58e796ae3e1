//! Candidate scoring and best-match selection.

use tyspec_core::{ParamKind, RoutineId, RoutineType, Type};

use crate::lattice::{MatchRank, SubstitutionMap, TypeMatcher};

/// Arguments of a call, as seen by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct CallArgs<'a> {
    /// Explicit receiver of a method call.
    pub receiver: Option<&'a Type>,
    /// The caller's own `self`, offered to methods called without a
    /// receiver from inside another method.
    pub implicit_self: Option<&'a Type>,
    pub args: &'a [Type],
}

impl<'a> CallArgs<'a> {
    pub fn new(args: &'a [Type]) -> Self {
        Self {
            receiver: None,
            implicit_self: None,
            args,
        }
    }

    pub fn with_receiver(mut self, receiver: &'a Type) -> Self {
        self.receiver = Some(receiver);
        self
    }

    pub fn with_implicit_self(mut self, implicit: Option<&'a Type>) -> Self {
        self.implicit_self = implicit;
        self
    }
}

/// A scored candidate.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub routine: Option<RoutineId>,
    pub signature: RoutineType,
    pub rank: MatchRank,
    pub subst: SubstitutionMap,
    /// A default was omitted or a variadic parameter was used.
    pub uses_optional: bool,
    pub generic: bool,
}

/// Score `signature` against a call. Returns `None` when it does not apply.
pub fn score(matcher: &TypeMatcher<'_>, signature: &RoutineType, call: &CallArgs<'_>) -> Option<(MatchRank, SubstitutionMap, bool)> {
    let mut subst = SubstitutionMap::default();
    let mut weakest = MatchRank::Exact;
    let mut params = signature.params.as_slice();
    let mut args: Vec<&Type> = call.args.iter().collect();

    if signature.has_self() {
        let self_param = &params[0];
        params = &params[1..];
        let receiver = match call.receiver.or(call.implicit_self) {
            Some(receiver) => receiver,
            // `Class.method(obj, ...)`: the first argument is the receiver.
            None if !args.is_empty() => args.remove(0),
            None => return None,
        };
        weakest = weakest.min(matcher.match_type(receiver, &self_param.ty, &mut subst));
    } else if let Some(receiver) = call.receiver {
        args.insert(0, receiver);
    }
    if !weakest.is_match() {
        return None;
    }

    let mut uses_optional = false;
    let mut next = 0usize;
    for param in params {
        match param.kind {
            ParamKind::Variadic => {
                uses_optional = true;
                for arg in &args[next..] {
                    weakest = weakest.min(matcher.match_type(arg, &param.ty, &mut subst));
                }
                next = args.len();
                break;
            }
            _ if next < args.len() => {
                weakest = weakest.min(matcher.match_type(args[next], &param.ty, &mut subst));
                next += 1;
            }
            ParamKind::Default => uses_optional = true,
            _ => return None,
        }
        if !weakest.is_match() {
            return None;
        }
    }
    if next < args.len() || !weakest.is_match() {
        return None;
    }
    Some((weakest, subst, uses_optional))
}

/// Outcome of picking among viable candidates.
#[derive(Debug)]
pub enum Selection {
    Best(Candidate),
    /// Tied candidates that differ only in an open return type: resolved at
    /// run time.
    Deferred(Vec<Candidate>),
    Ambiguous(Vec<Candidate>),
}

/// Pick the best candidate.
///
/// The highest rank wins. Among tied candidates a single non-generic one is
/// preferred over generic ones.
pub fn select(mut viable: Vec<Candidate>) -> Option<Selection> {
    let best_rank = viable.iter().map(|c| c.rank).max()?;
    viable.retain(|c| c.rank == best_rank);
    if viable.len() == 1 {
        return viable.pop().map(Selection::Best);
    }

    let concrete: Vec<usize> = (0..viable.len()).filter(|&i| !viable[i].generic).collect();
    if let [only] = concrete.as_slice() {
        return Some(Selection::Best(viable.swap_remove(*only)));
    }

    if differ_only_in_open_returns(&viable) {
        return Some(Selection::Deferred(viable));
    }
    Some(Selection::Ambiguous(viable))
}

/// Tied candidates with the same parameters whose return types disagree,
/// where every disagreeing return type is still open and so reads as `any`
/// to the caller.
fn differ_only_in_open_returns(tied: &[Candidate]) -> bool {
    let Some((first, rest)) = tied.split_first() else {
        return false;
    };
    let params = params_of(&first.signature);
    if !rest.iter().all(|c| params_of(&c.signature) == params) {
        return false;
    }
    let ret = first.signature.return_type();
    let disagreeing: Vec<&Type> = rest
        .iter()
        .map(|c| c.signature.return_type())
        .filter(|other| *other != ret)
        .collect();
    !disagreeing.is_empty() && (ret.is_parametric() || disagreeing.iter().all(|other| other.is_parametric()))
}

fn params_of(signature: &RoutineType) -> Vec<&Type> {
    signature.params.iter().map(|p| &p.ty).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{ClassId, HolderId, Param};
    use tyspec_registry::{ClassDef, ClassRegistry};

    fn sig(params: Vec<Param>) -> RoutineType {
        RoutineType::new(params, Type::none())
    }

    fn run(signature: &RoutineType, args: &[Type]) -> Option<(MatchRank, bool)> {
        let registry = ClassRegistry::new();
        let matcher = TypeMatcher::new(&registry);
        score(&matcher, signature, &CallArgs::new(args)).map(|(rank, _, optional)| (rank, optional))
    }

    #[test]
    fn exact_positional_match() {
        let s = sig(vec![Param::new("a", Type::int()), Param::new("b", Type::string())]);
        assert_eq!(run(&s, &[Type::int(), Type::string()]), Some((MatchRank::Exact, false)));
        assert_eq!(run(&s, &[Type::int()]), None);
        assert_eq!(run(&s, &[Type::int(), Type::string(), Type::int()]), None);
    }

    #[test]
    fn weakest_argument_decides() {
        let s = sig(vec![Param::new("a", Type::float()), Param::new("b", Type::int())]);
        assert_eq!(run(&s, &[Type::int(), Type::int()]), Some((MatchRank::Subtype, false)));
        assert_eq!(run(&s, &[Type::any(), Type::int()]), Some((MatchRank::Any, false)));
    }

    #[test]
    fn defaults_may_be_omitted() {
        let s = sig(vec![Param::new("a", Type::int()), Param::with_default("b", Type::int())]);
        assert_eq!(run(&s, &[Type::int()]), Some((MatchRank::Exact, true)));
        assert_eq!(run(&s, &[Type::int(), Type::int()]), Some((MatchRank::Exact, false)));
    }

    #[test]
    fn variadic_absorbs_the_rest() {
        let s = sig(vec![Param::new("fmt", Type::string()), Param::variadic("rest", Type::int())]);
        assert_eq!(run(&s, &[Type::string(), Type::int(), Type::int()]), Some((MatchRank::Exact, true)));
        assert_eq!(run(&s, &[Type::string(), Type::string()]), None);
    }

    #[test]
    fn receivers_bind_self() {
        let mut registry = ClassRegistry::new();
        let point = registry.register_class(ClassDef::new("Point")).unwrap();
        let matcher = TypeMatcher::new(&registry);
        let s = sig(vec![Param::self_param(Type::object(point)), Param::new("d", Type::int())]);
        let receiver = Type::object(point);
        let args = [Type::int()];
        let call = CallArgs::new(&args).with_receiver(&receiver);
        assert!(score(&matcher, &s, &call).is_some());

        // Without a receiver the first argument becomes self.
        let args = [Type::object(point), Type::int()];
        assert!(score(&matcher, &s, &CallArgs::new(&args)).is_some());

        let other = Type::object(ClassId::new(7));
        let args = [Type::int()];
        assert!(score(&matcher, &s, &CallArgs::new(&args).with_receiver(&other)).is_none());
    }

    #[test]
    fn receiver_of_a_plain_routine_is_the_first_argument() {
        let registry = ClassRegistry::new();
        let matcher = TypeMatcher::new(&registry);
        let s = sig(vec![Param::new("s", Type::string()), Param::new("n", Type::int())]);
        let receiver = Type::string();
        let args = [Type::int()];
        assert!(score(&matcher, &s, &CallArgs::new(&args).with_receiver(&receiver)).is_some());
    }

    #[test]
    fn generic_parameters_bind() {
        let registry = ClassRegistry::new();
        let matcher = TypeMatcher::new(&registry);
        let t = Type::holder(HolderId::new(0), "T");
        let s = sig(vec![Param::new("a", t.clone()), Param::new("b", t)]);
        let args = [Type::int(), Type::int()];
        let (rank, subst, _) = score(&matcher, &s, &CallArgs::new(&args)).unwrap();
        assert_eq!(rank, MatchRank::Subtype);
        assert_eq!(subst.get(&HolderId::new(0)), Some(&Type::int()));
        let args = [Type::int(), Type::string()];
        assert!(score(&matcher, &s, &CallArgs::new(&args)).is_none());
    }

    fn candidate(params: Vec<Type>, rank: MatchRank, generic: bool) -> Candidate {
        Candidate {
            routine: None,
            signature: sig(params.into_iter().map(|ty| Param::new("p", ty)).collect()),
            rank,
            subst: SubstitutionMap::default(),
            uses_optional: false,
            generic,
        }
    }

    #[test]
    fn selection_prefers_rank_then_concrete() {
        let picked = select(vec![
            candidate(vec![Type::float()], MatchRank::Subtype, false),
            candidate(vec![Type::int()], MatchRank::Exact, false),
        ]);
        let Some(Selection::Best(best)) = picked else {
            panic!("expected a single best candidate");
        };
        assert_eq!(best.signature.params[0].ty, Type::int());

        let t = Type::holder(HolderId::new(0), "T");
        let picked = select(vec![
            candidate(vec![t], MatchRank::Subtype, true),
            candidate(vec![Type::float()], MatchRank::Subtype, false),
        ]);
        assert!(matches!(picked, Some(Selection::Best(c)) if !c.generic));
    }

    #[test]
    fn ties_are_ambiguous_or_deferred() {
        let picked = select(vec![
            candidate(vec![Type::int()], MatchRank::Any, false),
            candidate(vec![Type::string()], MatchRank::Any, false),
        ]);
        assert!(matches!(picked, Some(Selection::Ambiguous(c)) if c.len() == 2));

        // Same parameters, concrete returns: nothing to defer to.
        let picked = select(vec![
            candidate(vec![Type::int()], MatchRank::Exact, false),
            candidate(vec![Type::int()], MatchRank::Exact, false),
        ]);
        assert!(matches!(picked, Some(Selection::Ambiguous(_))));
        assert!(select(Vec::new()).is_none());
    }

    fn returning(params: Vec<Type>, ret: Type) -> Candidate {
        let mut c = candidate(params, MatchRank::Exact, false);
        c.signature = c.signature.with_return(ret);
        c
    }

    #[test]
    fn open_return_types_are_deferred() {
        let open = Type::holder(HolderId::new(1), "R");
        let picked = select(vec![
            returning(vec![Type::int()], Type::int()),
            returning(vec![Type::int()], open.clone()),
        ]);
        assert!(matches!(picked, Some(Selection::Deferred(c)) if c.len() == 2));

        let picked = select(vec![
            returning(vec![Type::int()], Type::int()),
            returning(vec![Type::int()], Type::string()),
        ]);
        assert!(matches!(picked, Some(Selection::Ambiguous(_))));

        // Open returns do not excuse different parameters.
        let picked = select(vec![
            returning(vec![Type::int()], open),
            returning(vec![Type::float()], Type::int()),
        ]);
        assert!(matches!(picked, Some(Selection::Ambiguous(_))));
    }
}
