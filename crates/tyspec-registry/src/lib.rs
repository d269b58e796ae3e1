//! Class registry and type interner for the tyspec inference pass.
//!
//! The registry is the minimal stand-in for the class/namespace system: it
//! records classes, interfaces, their fields and the is-a relation between
//! them. Methods are routines and live in the compilation session.
//!
//! The [`TypeInterner`] hands out stable [`TypeId`](tyspec_core::TypeId)s for
//! structurally equal types and is shared by every routine of a session.

mod class;
mod error;
mod interner;
mod registry;

pub use class::{ClassDef, FieldDef, InterfaceDef, Visibility};
pub use error::RegistryError;
pub use interner::TypeInterner;
pub use registry::{ClassRegistry, FieldLookup};
