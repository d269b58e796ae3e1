//! Type inference and specialization over register bytecode.
//!
//! The pass takes a routine produced by the front-end, with declared and
//! open types, and walks its code once in order:
//!
//! - every register gets exactly one type, fixed at its first write
//! - operators, item and field access, moves and tests are replaced by
//!   opcodes specialized for the operand types
//! - calls are resolved against overload sets, and generic routines are
//!   specialized per set of argument types
//! - dense switches become jump tables and constant tests fold away
//!
//! ## Modules
//!
//! - [`bytecode`]: Instructions, opcodes and operand conventions
//! - [`config`]: Tunables for a session
//! - [`diagnostics`]: Error messages with code snippets
//! - [`graph`]: Editable instruction sequence with jump targets
//! - [`lattice`]: Ranked type matching and substitution
//! - [`operators`]: Operator resolution
//! - [`overload`]: Call resolution
//! - [`routine`]: Routine descriptors in and out of the pass
//! - [`session`]: Shared state for inferring a program

pub mod bytecode;
pub mod config;
pub mod diagnostics;
pub mod graph;
mod infer;
pub mod lattice;
pub mod operators;
pub mod overload;
pub mod routine;
pub mod session;
mod template;

pub use bytecode::{CodeChunk, Instruction, OpCode};
pub use config::{InferenceConfig, InferenceMode};
pub use infer::{RegisterFile, RegisterState};
pub use lattice::{MatchRank, SubstitutionMap, TypeMatcher};
pub use overload::{Callee, Resolution};
pub use routine::{InferredRoutine, Routine, RoutineAttrs};
pub use session::{Host, OverloadSet, Session, SessionStats};
