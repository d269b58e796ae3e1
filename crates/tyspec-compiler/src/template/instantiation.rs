//! Creating specializations.

use log::debug;

use tyspec_core::{InferenceError, PassError, RoutineId, Type};

use crate::lattice::{SubstitutionMap, specialize, specialize_signature};
use crate::routine::Routine;
use crate::session::Session;

impl Session<'_> {
    /// The specialization of `generic` for the holder bindings in `subst`.
    ///
    /// On a cache miss the specialization is registered and cached first,
    /// then inferred, so a recursive call with the same signature finds it.
    pub(crate) fn instantiate(&self, generic: RoutineId, subst: &SubstitutionMap) -> Result<RoutineId, PassError> {
        let slot = self.require_slot(generic)?;
        let signature = specialize_signature(&slot.source.signature, subst);
        if signature.has_parametric_params() {
            return Err(InferenceError::param(format!("failed specialization of '{}'", slot.name)).into());
        }

        let param_types: Vec<Type> = signature.params.iter().map(|p| p.ty.clone()).collect();
        let key = self.interner().intern_all(&param_types);
        let (id, created) = self.cache().get_or_insert_with(generic, key, || {
            let names: Vec<String> = param_types
                .iter()
                .map(|ty| ty.named(self.registry()).to_string())
                .collect();
            let source = &slot.source;
            let mut routine = Routine {
                name: format!("{}<{}>", source.name, names.join(",")),
                signature: signature.clone(),
                ..(**source).clone()
            };
            for register in routine.registers.iter_mut().flatten() {
                *register = specialize(register, subst);
            }
            for declared in routine.declarations.values_mut() {
                *declared = specialize(declared, subst);
            }
            self.insert_slot(routine, Some(generic))
        });

        if created {
            self.count_specialization();
            debug!(
                "specialized '{}' as {} for {}",
                slot.name,
                id,
                Type::routine(signature.clone()).named(self.registry())
            );
        }
        // A body that does not type under these bindings fails the call.
        if let Some(inferred) = self.ensure_inferred(id)?
            && !inferred.success
        {
            return Err(InferenceError::param(format!(
                "failed specialization of '{}' as {}",
                slot.name,
                Type::routine(signature).named(self.registry())
            ))
            .into());
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{ErrorKind, HolderId, Param, RoutineType};
    use tyspec_registry::ClassRegistry;

    fn identity(session: &Session<'_>) -> RoutineId {
        let t = Type::holder(HolderId::new(0), "T");
        let sig = RoutineType::new(vec![Param::new("x", t.clone())], t);
        session.add_routine(Routine::new("id", sig))
    }

    fn bind(ty: Type) -> SubstitutionMap {
        let mut subst = SubstitutionMap::default();
        subst.insert(HolderId::new(0), ty);
        subst
    }

    #[test]
    fn one_specialization_per_signature() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let generic = identity(&session);
        let for_int = session.instantiate(generic, &bind(Type::int())).unwrap();
        let for_string = session.instantiate(generic, &bind(Type::string())).unwrap();
        let again = session.instantiate(generic, &bind(Type::int())).unwrap();
        assert_eq!(for_int, again);
        assert_ne!(for_int, for_string);
        assert_eq!(session.specialization_count(), 2);
        assert_eq!(session.stats().specializations, 2);
        assert_eq!(session.generic_origin(for_int), Some(generic));
        assert_eq!(session.routine_name(for_int).as_deref(), Some("id<int>"));
    }

    #[test]
    fn specialized_signature_is_concrete() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let generic = identity(&session);
        let id = session.instantiate(generic, &bind(Type::float())).unwrap();
        let sig = session.signature(id).unwrap();
        assert_eq!(sig.params[0].ty, Type::float());
    }

    #[test]
    fn unbound_holders_fail_specialization() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let generic = identity(&session);
        let err = session.instantiate(generic, &SubstitutionMap::default()).unwrap_err();
        let PassError::Inference(err) = err else {
            panic!("expected an inference error");
        };
        assert_eq!(err.kind(), ErrorKind::ParamError);
    }
}
