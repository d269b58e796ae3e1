//! Core types shared by the tyspec inference pass.
//!
//! This crate holds everything the registry and the compiler agree on:
//!
//! - [`Span`]: source location of an instruction
//! - [`Type`], [`TypeKind`], [`TypeAttrs`]: the structural type representation
//! - [`Value`]: constant pool entries
//! - [`TypeHash`]: deterministic structural hashing used for interning
//! - Identifier newtypes ([`ClassId`], [`RoutineId`], ...)
//! - The error taxonomy ([`InferenceError`], [`FatalError`]) and the
//!   [`ErrorSink`] diagnostics collaborator

pub mod error;
pub mod ids;
pub mod span;
pub mod type_hash;
pub mod types;
pub mod value;

pub use error::{
    CollectingSink, Diagnostic, Diagnostics, ErrorKind, ErrorSink, FatalError, InferenceError,
    NullSink, PassError,
};
pub use ids::{ClassId, HolderId, InterfaceId, OverloadId, RoutineId, TypeId};
pub use span::Span;
pub use type_hash::TypeHash;
pub use types::{
    EnumKind, EnumType, Named, Param, ParamKind, RoutineType, TupleItem, TupleType, Type, TypeAttrs,
    TypeKind, TypeNames,
};
pub use value::{EnumValue, Value};
