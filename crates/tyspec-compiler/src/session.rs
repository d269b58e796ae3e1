//! The compilation session.
//!
//! A [`Session`] owns everything routines share while they are inferred:
//! the routine table, overload sets and method tables, the type interner and
//! the specialization cache. Independent routines may be inferred on
//! separate threads through one `&Session`.
//!
//! ## Locking
//!
//! - The routine table is a `RwLock<Vec<Arc<RoutineSlot>>>`; slots are
//!   append-only and each carries its own state `Mutex`.
//! - The specialization cache is a `Mutex`, taken before the routine table
//!   when a specialization is created.
//! - No lock is held while a routine is being inferred.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, ThreadId};

use log::debug;
use rustc_hash::FxHashMap;

use tyspec_core::{
    ClassId, Diagnostic, ErrorSink, FatalError, InterfaceId, NullSink, OverloadId, RoutineId, RoutineType,
    Type,
};
use tyspec_registry::{ClassRegistry, TypeInterner, Visibility};

use crate::config::InferenceConfig;
use crate::infer::InferenceDriver;
use crate::lattice::{MethodTable, TypeMatcher};
use crate::routine::{InferredRoutine, Routine, RoutineAttrs};
use crate::template::SpecializationCache;

/// Owner of a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    Class(ClassId),
    Interface(InterfaceId),
}

/// Routines sharing a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadSet {
    pub name: String,
    pub routines: Vec<RoutineId>,
}

#[derive(Debug)]
pub(crate) enum SlotState {
    Pending,
    InProgress(ThreadId),
    Done(Arc<InferredRoutine>),
    Failed(FatalError),
}

/// One entry of the routine table.
#[derive(Debug)]
pub(crate) struct RoutineSlot {
    pub id: RoutineId,
    pub name: String,
    pub host: Option<ClassId>,
    pub visibility: Visibility,
    pub attribs: RoutineAttrs,
    /// Set for specializations: the generic routine this one was made from.
    pub generic_origin: Option<RoutineId>,
    /// The routine as registered; never mutated.
    pub source: Arc<Routine>,
    signature: RwLock<RoutineType>,
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl RoutineSlot {
    fn new(id: RoutineId, source: Routine, generic_origin: Option<RoutineId>) -> Self {
        Self {
            id,
            name: source.name.clone(),
            host: source.host,
            visibility: source.visibility,
            attribs: source.attribs,
            generic_origin,
            signature: RwLock::new(source.signature.clone()),
            source: Arc::new(source),
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        }
    }

    /// The current signature. The return type is fixed by the first return
    /// seen during inference.
    pub fn signature(&self) -> RoutineType {
        self.signature.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_return_type(&self, ret: Type) {
        let mut signature = self.signature.write().unwrap_or_else(PoisonError::into_inner);
        *signature = signature.with_return(ret);
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_generic(&self) -> bool {
        self.signature().has_parametric_params()
    }
}

#[derive(Debug, Default)]
struct Counters {
    routines_inferred: AtomicUsize,
    specializations: AtomicUsize,
    jump_tables: AtomicUsize,
    tail_calls: AtomicUsize,
}

/// Session-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub routines_inferred: usize,
    pub specializations: usize,
    pub jump_tables: usize,
    pub tail_calls: usize,
}

/// Shared state for inferring the routines of one program.
pub struct Session<'r> {
    registry: &'r ClassRegistry,
    interner: TypeInterner,
    config: InferenceConfig,
    sink: Arc<dyn ErrorSink>,
    routines: RwLock<Vec<Arc<RoutineSlot>>>,
    overloads: RwLock<Vec<OverloadSet>>,
    methods: RwLock<FxHashMap<(Host, String), OverloadId>>,
    cache: SpecializationCache,
    counters: Counters,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r ClassRegistry) -> Self {
        Self {
            registry,
            interner: TypeInterner::new(),
            config: InferenceConfig::default(),
            sink: Arc::new(NullSink),
            routines: RwLock::new(Vec::new()),
            overloads: RwLock::new(Vec::new()),
            methods: RwLock::new(FxHashMap::default()),
            cache: SpecializationCache::new(),
            counters: Counters::default(),
        }
    }

    pub fn with_config(mut self, config: InferenceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn registry(&self) -> &'r ClassRegistry {
        self.registry
    }

    pub fn interner(&self) -> &TypeInterner {
        &self.interner
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub(crate) fn matcher(&self) -> TypeMatcher<'r> {
        TypeMatcher::new(self.registry)
    }

    pub(crate) fn cache(&self) -> &SpecializationCache {
        &self.cache
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a routine and return its id.
    pub fn add_routine(&self, routine: Routine) -> RoutineId {
        self.insert_slot(routine, None)
    }

    pub(crate) fn insert_slot(&self, routine: Routine, generic_origin: Option<RoutineId>) -> RoutineId {
        let mut routines = self.routines.write().unwrap_or_else(PoisonError::into_inner);
        let id = RoutineId::new(routines.len() as u32);
        routines.push(Arc::new(RoutineSlot::new(id, routine, generic_origin)));
        id
    }

    /// Register an overload set.
    pub fn add_overloads(&self, name: impl Into<String>, routines: Vec<RoutineId>) -> OverloadId {
        let mut overloads = self.overloads.write().unwrap_or_else(PoisonError::into_inner);
        let id = OverloadId::new(overloads.len() as u32);
        overloads.push(OverloadSet {
            name: name.into(),
            routines,
        });
        id
    }

    /// Register a method on a class or interface. Methods sharing a name on
    /// the same host form one overload set.
    pub fn add_method(&self, host: Host, mut routine: Routine) -> RoutineId {
        if let Host::Class(class) = host {
            routine.host = Some(class);
        }
        let name = routine.name.clone();
        let id = self.add_routine(routine);
        let existing = self
            .methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(host, name.clone()))
            .copied();
        match existing {
            Some(set) => {
                let mut overloads = self.overloads.write().unwrap_or_else(PoisonError::into_inner);
                overloads[set.index()].routines.push(id);
            }
            None => {
                let set = self.add_overloads(name.clone(), vec![id]);
                self.methods
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert((host, name), set);
            }
        }
        id
    }

    /// Register a constructor: a method named after its class.
    pub fn add_constructor(&self, class: ClassId, routine: Routine) -> RoutineId {
        let name = self
            .registry
            .class(class)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| routine.name.clone());
        let mut routine = routine.with_attribs(RoutineAttrs::INITOR);
        routine.name = name;
        self.add_method(Host::Class(class), routine)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub(crate) fn slot(&self, id: RoutineId) -> Option<Arc<RoutineSlot>> {
        self.routines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .cloned()
    }

    pub(crate) fn require_slot(&self, id: RoutineId) -> Result<Arc<RoutineSlot>, FatalError> {
        self.slot(id).ok_or(FatalError::UnknownRoutine { routine: id })
    }

    /// The current signature of a routine.
    pub fn signature(&self, id: RoutineId) -> Option<RoutineType> {
        self.slot(id).map(|slot| slot.signature())
    }

    pub fn routine_name(&self, id: RoutineId) -> Option<String> {
        self.slot(id).map(|slot| slot.name.clone())
    }

    /// The generic routine a specialization was created from.
    pub fn generic_origin(&self, id: RoutineId) -> Option<RoutineId> {
        self.slot(id).and_then(|slot| slot.generic_origin)
    }

    pub fn routine_count(&self) -> usize {
        self.routines.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn overload_set(&self, id: OverloadId) -> Option<OverloadSet> {
        self.overloads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id.index())
            .cloned()
    }

    /// A method set found on `host` itself or inherited.
    pub fn find_method(&self, host: Host, name: &str) -> Option<OverloadId> {
        match host {
            Host::Class(class) => self.class_method(class, name),
            Host::Interface(interface) => self.interface_method(interface, name),
        }
    }

    fn own_method(&self, host: Host, name: &str) -> Option<OverloadId> {
        self.methods
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(host, name.to_string()))
            .copied()
    }

    /// The constructor set of a class.
    pub fn constructors(&self, class: ClassId) -> Option<OverloadId> {
        let name = &self.registry.class(class)?.name;
        self.own_method(Host::Class(class), name)
    }

    /// A finished inference result, if any.
    pub fn inferred(&self, id: RoutineId) -> Option<Arc<InferredRoutine>> {
        let slot = self.slot(id)?;
        let state = slot.state();
        match &*state {
            SlotState::Done(result) => Some(Arc::clone(result)),
            _ => None,
        }
    }

    // ==========================================================================
    // Statistics
    // ==========================================================================

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            routines_inferred: self.counters.routines_inferred.load(Ordering::Relaxed),
            specializations: self.counters.specializations.load(Ordering::Relaxed),
            jump_tables: self.counters.jump_tables.load(Ordering::Relaxed),
            tail_calls: self.counters.tail_calls.load(Ordering::Relaxed),
        }
    }

    /// Number of cached generic specializations.
    pub fn specialization_count(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn count_specialization(&self) {
        self.counters.specializations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_jump_table(&self) {
        self.counters.jump_tables.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn count_tail_call(&self) {
        self.counters.tail_calls.fetch_add(1, Ordering::Relaxed);
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    pub(crate) fn report(&self, diagnostic: &Diagnostic) {
        self.sink.report(diagnostic);
    }

    pub(crate) fn report_fatal(&self, error: &FatalError) {
        self.sink.report_fatal(error);
    }

    // ==========================================================================
    // Inference
    // ==========================================================================

    /// Infer a routine, or return the result of an earlier run.
    ///
    /// If another thread is inferring the routine, this waits for it.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn infer(&self, id: RoutineId) -> Result<Arc<InferredRoutine>, FatalError> {
        let slot = self.require_slot(id)?;
        let current = thread::current().id();
        {
            let mut state = slot.state();
            loop {
                match &*state {
                    SlotState::Done(result) => return Ok(Arc::clone(result)),
                    SlotState::Failed(error) => return Err(error.clone()),
                    SlotState::InProgress(owner) if *owner == current => {
                        return Err(FatalError::MalformedCode {
                            routine: slot.name.clone(),
                            index: 0,
                            message: "routine is already being inferred on this thread".to_string(),
                        });
                    }
                    SlotState::InProgress(_) => {
                        state = slot.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
                    }
                    SlotState::Pending => {
                        *state = SlotState::InProgress(current);
                        break;
                    }
                }
            }
        }
        self.run(&slot)
    }

    /// Infer every registered routine, in registration order.
    pub fn infer_all(&self) -> Vec<Result<Arc<InferredRoutine>, FatalError>> {
        (0..self.routine_count())
            .map(|index| self.infer(RoutineId::new(index as u32)))
            .collect()
    }

    /// Make sure a routine reached by the pass has been inferred.
    ///
    /// Never waits: a routine in progress (recursion, or another thread)
    /// yields `None` and callers use its current signature.
    pub(crate) fn ensure_inferred(&self, id: RoutineId) -> Result<Option<Arc<InferredRoutine>>, FatalError> {
        let slot = self.require_slot(id)?;
        {
            let mut state = slot.state();
            match &*state {
                SlotState::Done(result) => return Ok(Some(Arc::clone(result))),
                SlotState::Failed(_) | SlotState::InProgress(_) => return Ok(None),
                SlotState::Pending => *state = SlotState::InProgress(thread::current().id()),
            }
        }
        self.run(&slot).map(Some)
    }

    fn run(&self, slot: &Arc<RoutineSlot>) -> Result<Arc<InferredRoutine>, FatalError> {
        debug!("inferring routine '{}' ({})", slot.name, slot.id);
        let outcome = InferenceDriver::new(self, Arc::clone(slot)).run();
        let mut state = slot.state();
        let result = match outcome {
            Ok(inferred) => {
                self.counters.routines_inferred.fetch_add(1, Ordering::Relaxed);
                debug!(
                    "inferred routine '{}': {} ({} diagnostics)",
                    slot.name,
                    Type::routine(inferred.signature.clone()).named(self.registry),
                    inferred.diagnostics.len()
                );
                let inferred = Arc::new(inferred);
                *state = SlotState::Done(Arc::clone(&inferred));
                Ok(inferred)
            }
            Err(error) => {
                debug!("inference of '{}' aborted: {error}", slot.name);
                self.report_fatal(&error);
                *state = SlotState::Failed(error.clone());
                Err(error)
            }
        };
        drop(state);
        slot.ready.notify_all();
        result
    }
}

impl MethodTable for Session<'_> {
    fn class_method(&self, class: ClassId, name: &str) -> Option<OverloadId> {
        std::iter::once(class)
            .chain(self.registry.base_chain(class))
            .find_map(|c| self.own_method(Host::Class(c), name))
            .or_else(|| {
                self.registry
                    .all_interfaces(class)
                    .into_iter()
                    .find_map(|i| self.own_method(Host::Interface(i), name))
            })
    }

    fn interface_method(&self, interface: InterfaceId, name: &str) -> Option<OverloadId> {
        if let Some(found) = self.own_method(Host::Interface(interface), name) {
            return Some(found);
        }
        let parents = self.registry.interface(interface)?.parents.clone();
        parents.into_iter().find_map(|parent| self.interface_method(parent, name))
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("routines", &self.routine_count())
            .field("specializations", &self.cache.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::Param;
    use tyspec_registry::{ClassDef, InterfaceDef};

    fn empty(name: &str) -> Routine {
        Routine::new(name, RoutineType::new(vec![], Type::none()))
    }

    #[test]
    fn routines_get_sequential_ids() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let a = session.add_routine(empty("a"));
        let b = session.add_routine(empty("b"));
        assert_eq!((a.0, b.0), (0, 1));
        assert_eq!(session.routine_name(b).as_deref(), Some("b"));
        assert_eq!(session.routine_count(), 2);
    }

    #[test]
    fn methods_with_one_name_share_a_set() {
        let mut registry = ClassRegistry::new();
        let point = registry.register_class(ClassDef::new("Point")).unwrap();
        let session = Session::new(&registry);
        let sig = |ty: Type| RoutineType::new(vec![Param::self_param(Type::object(point)), Param::new("v", ty)], Type::none());
        let a = session.add_method(Host::Class(point), Routine::new("move", sig(Type::int())));
        let b = session.add_method(Host::Class(point), Routine::new("move", sig(Type::float())));
        let set = session.find_method(Host::Class(point), "move").unwrap();
        assert_eq!(session.overload_set(set).unwrap().routines, vec![a, b]);
        assert_eq!(session.slot(a).unwrap().host, Some(point));
    }

    #[test]
    fn methods_are_inherited() {
        let mut registry = ClassRegistry::new();
        let drawable = registry.register_interface(InterfaceDef::new("Drawable")).unwrap();
        let shape = registry.register_interface(InterfaceDef::new("Shape").extends(drawable)).unwrap();
        let base = registry.register_class(ClassDef::new("Base").implements(shape)).unwrap();
        let derived = registry.register_class(ClassDef::new("Derived").extends(base)).unwrap();
        let session = Session::new(&registry);
        session.add_method(Host::Class(base), empty("area"));
        session.add_method(Host::Interface(drawable), empty("draw"));
        assert!(session.class_method(derived, "area").is_some());
        assert!(session.class_method(derived, "draw").is_some());
        assert!(session.interface_method(shape, "draw").is_some());
        assert!(session.class_method(derived, "missing").is_none());
    }

    #[test]
    fn constructors_are_named_after_their_class() {
        let mut registry = ClassRegistry::new();
        let point = registry.register_class(ClassDef::new("Point")).unwrap();
        let session = Session::new(&registry);
        let ctor = session.add_constructor(point, empty("init"));
        let set = session.constructors(point).unwrap();
        assert_eq!(session.overload_set(set).unwrap().routines, vec![ctor]);
        assert!(session.slot(ctor).unwrap().attribs.contains(RoutineAttrs::INITOR));
    }

    #[test]
    fn unknown_routines_are_fatal() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let err = session.infer(RoutineId::new(5)).unwrap_err();
        assert_eq!(err, FatalError::UnknownRoutine { routine: RoutineId::new(5) });
    }

    #[test]
    fn results_are_memoized() {
        let registry = ClassRegistry::new();
        let session = Session::new(&registry);
        let id = session.add_routine(empty("noop"));
        let first = session.infer(id).unwrap();
        let second = session.infer(id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(session.stats().routines_inferred, 1);
        assert!(session.inferred(id).is_some());
    }
}
