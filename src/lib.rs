//! tyspec: type inference and bytecode specialization for a dynamically
//! typed register VM.
//!
//! This crate ties the workspace together:
//!
//! - [`core`]: types, values and errors
//! - [`registry`]: classes, interfaces and the type interner
//! - [`compiler`]: the inference pass
//!
//! Most users only need the [`prelude`] and [`infer_program`].

use std::sync::Arc;

use log::{debug, info};

pub use tyspec_compiler as compiler;
pub use tyspec_core as core;
pub use tyspec_registry as registry;

pub mod prelude {
    pub use tyspec_compiler::bytecode::operand::{call, case, decl};
    pub use tyspec_compiler::{
        CodeChunk, Host, InferenceConfig, InferenceMode, InferredRoutine, Instruction, OpCode, Routine,
        RoutineAttrs, Session, SessionStats,
    };
    pub use tyspec_core::{
        ClassId, CollectingSink, Diagnostic, ErrorKind, ErrorSink, FatalError, HolderId, InferenceError, Param,
        RoutineId, RoutineType, Span, Type, Value,
    };
    pub use tyspec_registry::{ClassDef, ClassRegistry, FieldDef, InterfaceDef, Visibility};
}

use tyspec_compiler::{InferredRoutine, Session, SessionStats};
use tyspec_core::FatalError;

/// Outcome of inferring every routine of a session.
#[derive(Debug, Default)]
pub struct ProgramReport {
    /// Routines the pass completed, successful or not.
    pub routines: Vec<Arc<InferredRoutine>>,
    /// Routines aborted by a fatal error.
    pub fatal: Vec<FatalError>,
    pub stats: SessionStats,
}

impl ProgramReport {
    /// Whether every routine was inferred without a diagnostic.
    pub fn is_success(&self) -> bool {
        self.fatal.is_empty() && self.routines.iter().all(|routine| routine.success)
    }

    /// Routines that completed with diagnostics.
    pub fn failed(&self) -> impl Iterator<Item = &InferredRoutine> {
        self.routines.iter().filter(|routine| !routine.success).map(Arc::as_ref)
    }

    pub fn diagnostic_count(&self) -> usize {
        self.routines.iter().map(|routine| routine.diagnostics.len()).sum()
    }
}

/// Infer every routine registered in `session`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn infer_program(session: &Session<'_>) -> ProgramReport {
    let mut report = ProgramReport::default();
    for outcome in session.infer_all() {
        match outcome {
            Ok(routine) => report.routines.push(routine),
            Err(error) => {
                debug!("routine aborted: {error}");
                report.fatal.push(error);
            }
        }
    }
    report.stats = session.stats();
    info!(
        "inferred {} routines ({} with diagnostics, {} aborted), {} specializations, {} jump tables, {} tail calls",
        report.routines.len(),
        report.failed().count(),
        report.fatal.len(),
        report.stats.specializations,
        report.stats.jump_tables,
        report.stats.tail_calls
    );
    report
}
