//! Call resolution.
//!
//! Selects the routine a call executes:
//!
//! 1. Collect candidates: a single routine, an overload set, or a class's
//!    constructors. Candidates invisible from the calling class are dropped.
//! 2. Score every candidate positionally (see [`ranking`]).
//! 3. Pick the best; ties are ambiguous unless they can be deferred.
//! 4. Generic winners are specialized through the session cache.

mod ranking;

pub use ranking::{CallArgs, Candidate, Selection, score, select};

use log::warn;

use tyspec_core::{ClassId, InferenceError, OverloadId, PassError, RoutineId, RoutineType, Type};

use crate::lattice::MatchRank;
use crate::session::Session;

/// What is being called.
#[derive(Debug, Clone)]
pub enum Callee {
    /// A known routine.
    Routine(RoutineId),
    Overloads(OverloadId),
    /// A class value: calls its constructors.
    Class(ClassId),
    /// A routine-typed value whose routine is not known.
    Signature(RoutineType),
    /// An `any` value, dispatched at run time.
    Dynamic,
}

/// The routine a call resolved to.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// `None` when the routine is only known at run time.
    pub routine: Option<RoutineId>,
    /// Signature of the selected routine after specialization.
    pub signature: Option<RoutineType>,
    pub result: Type,
    pub rank: MatchRank,
    /// All arguments match exactly and no defaults or variadics are used.
    pub fast: bool,
    /// `routine` is a specialization of a generic candidate.
    pub specialized: bool,
}

impl Resolution {
    fn dynamic(result: Type, rank: MatchRank) -> Self {
        Self {
            routine: None,
            signature: None,
            result,
            rank,
            fast: false,
            specialized: false,
        }
    }
}

/// Resolves calls made from one routine.
pub struct OverloadResolver<'s, 'r> {
    session: &'s Session<'r>,
    /// Class hosting the calling routine.
    host: Option<ClassId>,
}

impl<'s, 'r> OverloadResolver<'s, 'r> {
    pub fn new(session: &'s Session<'r>, host: Option<ClassId>) -> Self {
        Self { session, host }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, callee: Callee, call: CallArgs<'_>) -> Result<Resolution, PassError> {
        match callee {
            Callee::Dynamic => Ok(Resolution::dynamic(Type::any(), MatchRank::Any)),
            Callee::Routine(id) => {
                let name = self.session.routine_name(id).unwrap_or_default();
                self.resolve_candidates(&name, &[id], call)
            }
            Callee::Overloads(set) => {
                let set = self
                    .session
                    .overload_set(set)
                    .ok_or_else(|| InferenceError::not_callable(set))?;
                self.resolve_candidates(&set.name, &set.routines, call)
            }
            Callee::Class(class) => self.resolve_constructor(class, call),
            Callee::Signature(signature) => self.resolve_signature(&signature, call),
        }
    }

    fn resolve_constructor(&self, class: ClassId, call: CallArgs<'_>) -> Result<Resolution, PassError> {
        let object = Type::object(class);
        match self.session.constructors(class) {
            Some(set) => {
                let mut resolution = self.resolve(Callee::Overloads(set), call)?;
                resolution.result = object;
                Ok(resolution)
            }
            None if call.args.is_empty() => Ok(Resolution {
                fast: true,
                ..Resolution::dynamic(object, MatchRank::Exact)
            }),
            None => Err(InferenceError::param(format!(
                "'{}' has no constructor taking {} arguments",
                object.named(self.session.registry()),
                call.args.len()
            ))
            .into()),
        }
    }

    fn resolve_signature(&self, signature: &RoutineType, call: CallArgs<'_>) -> Result<Resolution, PassError> {
        let matcher = self.session.matcher();
        let Some((rank, _, uses_optional)) = score(&matcher, signature, &call) else {
            return Err(InferenceError::param(format!(
                "({}) for '{}'",
                self.describe(call.args),
                Type::routine(signature.clone()).named(self.session.registry())
            ))
            .into());
        };
        Ok(Resolution {
            routine: None,
            signature: Some(signature.clone()),
            result: result_type(signature),
            rank,
            fast: rank == MatchRank::Exact && !uses_optional,
            specialized: false,
        })
    }

    fn resolve_candidates(&self, name: &str, routines: &[RoutineId], call: CallArgs<'_>) -> Result<Resolution, PassError> {
        let registry = self.session.registry();
        let matcher = self.session.matcher();
        let mut visible = 0usize;
        let mut viable = Vec::new();
        for &id in routines {
            let slot = self.session.require_slot(id)?;
            if let Some(owner) = slot.host
                && !registry.is_accessible(owner, slot.visibility, self.host)
            {
                continue;
            }
            visible += 1;
            let signature = slot.signature();
            if let Some((rank, subst, uses_optional)) = score(&matcher, &signature, &call) {
                viable.push(Candidate {
                    routine: Some(id),
                    generic: signature.has_parametric_params(),
                    signature,
                    rank,
                    subst,
                    uses_optional,
                });
            }
        }

        if visible == 0 && !routines.is_empty() {
            return Err(InferenceError::member_not_permitted(name).into());
        }
        match select(viable) {
            Some(Selection::Best(candidate)) => self.finish(candidate),
            Some(Selection::Deferred(tied)) => {
                warn!(
                    "call of '{name}' matches {} routines differing in an open return type; deferred to run time",
                    tied.len()
                );
                Ok(Resolution::dynamic(Type::any(), tied[0].rank))
            }
            Some(Selection::Ambiguous(_)) => Err(InferenceError::param(format!(
                "ambiguous call of '{name}' with ({})",
                self.describe(call.args)
            ))
            .into()),
            None => Err(InferenceError::param(format!(
                "no routine '{name}' accepts ({})",
                self.describe(call.args)
            ))
            .into()),
        }
    }

    fn finish(&self, candidate: Candidate) -> Result<Resolution, PassError> {
        let Some(id) = candidate.routine else {
            return Ok(Resolution::dynamic(result_type(&candidate.signature), candidate.rank));
        };

        if candidate.generic {
            let specialized = self.session.instantiate(id, &candidate.subst)?;
            let signature = self.session.require_slot(specialized)?.signature();
            // The call is rebound to the specialization, whose parameters the
            // executor still checks.
            return Ok(Resolution {
                routine: Some(specialized),
                result: result_type(&signature),
                signature: Some(signature),
                rank: candidate.rank,
                fast: false,
                specialized: true,
            });
        }

        let slot = self.session.require_slot(id)?;
        if !slot.source.code.is_empty() {
            self.session.ensure_inferred(id)?;
        }
        let signature = slot.signature();
        Ok(Resolution {
            routine: Some(id),
            result: result_type(&signature),
            signature: Some(signature),
            rank: candidate.rank,
            fast: candidate.rank == MatchRank::Exact && !candidate.uses_optional,
            specialized: false,
        })
    }

    fn describe(&self, args: &[Type]) -> String {
        let registry = self.session.registry();
        args.iter()
            .map(|ty| ty.named(registry).to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// A return type still waiting on inference is `any` to the caller.
fn result_type(signature: &RoutineType) -> Type {
    if signature.ret.is_parametric() {
        Type::any()
    } else {
        (*signature.ret).clone()
    }
}
