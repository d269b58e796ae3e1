//! Generic routine instantiation.
//!
//! A call that binds a generic routine's holders to concrete types is
//! served by a specialization: a copy of the generic routine with the
//! concrete signature, inferred on its own. Specializations are cached per
//! session by (generic routine, interned parameter types).

mod cache;
mod instantiation;

pub use cache::SpecializationCache;
