//! Error types for the inference pass.
//!
//! ## Error Hierarchy
//!
//! ```text
//! PassError (wrapper returned by instruction handlers)
//! ├── InferenceError - recoverable, source-located type errors (one per ErrorKind)
//! └── FatalError     - encoding overflow and broken collaborator contracts
//! ```
//!
//! Recoverable errors become [`Diagnostic`] records once the routine has been
//! flattened; fatal errors abort the routine and are reported separately
//! through [`ErrorSink::report_fatal`].

use std::sync::Mutex;

use thiserror::Error;

use crate::ids::RoutineId;
use crate::Span;

// ============================================================================
// Error Kinds
// ============================================================================

/// The error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value's type does not match the required type.
    TypeMismatch,
    /// Two inferred types for the same register disagree.
    TypeInconsistent,
    /// The callee cannot be invoked.
    NotCallable,
    /// Wrong arity, wrong argument type, or ambiguous overload.
    ParamError,
    /// Unknown or inaccessible field or method.
    FieldError,
    /// Invalid index or key type.
    IndexError,
    /// Assignment to a const or invariable location.
    ConstViolation,
    /// Missing or invalid return, invalid yield or code section.
    ControlFlowError,
    /// Container literal whose items do not unify.
    EnumerationError,
}

impl ErrorKind {
    /// The headline used in diagnostic listings.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "Types not matching",
            ErrorKind::TypeInconsistent => "Inconsistent typing",
            ErrorKind::NotCallable => "Object not callable",
            ErrorKind::ParamError => "Invalid parameters for the call",
            ErrorKind::FieldError => "Invalid member access",
            ErrorKind::IndexError => "Invalid index access",
            ErrorKind::ConstViolation => "Constant or invariable cannot be modified",
            ErrorKind::ControlFlowError => "Invalid control flow",
            ErrorKind::EnumerationError => "Invalid enumeration",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Inference Errors
// ============================================================================

/// A recoverable, source-located type error.
///
/// Errors raised away from the instruction stream (by type capabilities or
/// the matcher) carry a default span; the driver re-anchors them with
/// [`InferenceError::at`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("at {span}: types not matching: '{found}' for '{expected}'")]
    TypeMismatch {
        /// The type that was supplied.
        found: String,
        /// The type that was required.
        expected: String,
        span: Span,
    },

    #[error("at {span}: inconsistent typing of register {register}: '{existing}' then '{found}'")]
    TypeInconsistent {
        register: u16,
        existing: String,
        found: String,
        span: Span,
    },

    #[error("at {span}: object not callable: '{callee}'")]
    NotCallable { callee: String, span: Span },

    #[error("at {span}: invalid parameters for the call: {message}")]
    ParamError { message: String, span: Span },

    #[error("at {span}: {message} '{name}'")]
    FieldError {
        /// Field or method name.
        name: String,
        /// What went wrong ("member not exist", "member not permitted").
        message: String,
        span: Span,
    },

    #[error("at {span}: invalid index access: {message}")]
    IndexError { message: String, span: Span },

    #[error("at {span}: constant or invariable cannot be modified: {message}")]
    ConstViolation { message: String, span: Span },

    #[error("at {span}: {message}")]
    ControlFlow { message: String, span: Span },

    #[error("at {span}: invalid enumeration: {message}")]
    Enumeration { message: String, span: Span },
}

impl InferenceError {
    /// Types not matching.
    pub fn mismatch(found: impl ToString, expected: impl ToString) -> Self {
        InferenceError::TypeMismatch {
            found: found.to_string(),
            expected: expected.to_string(),
            span: Span::default(),
        }
    }

    pub fn param(message: impl Into<String>) -> Self {
        InferenceError::ParamError {
            message: message.into(),
            span: Span::default(),
        }
    }

    pub fn not_callable(callee: impl ToString) -> Self {
        InferenceError::NotCallable {
            callee: callee.to_string(),
            span: Span::default(),
        }
    }

    pub fn no_member(name: impl Into<String>) -> Self {
        InferenceError::FieldError {
            name: name.into(),
            message: "member not exist".to_string(),
            span: Span::default(),
        }
    }

    pub fn member_not_permitted(name: impl Into<String>) -> Self {
        InferenceError::FieldError {
            name: name.into(),
            message: "member not permitted".to_string(),
            span: Span::default(),
        }
    }

    pub fn index(message: impl Into<String>) -> Self {
        InferenceError::IndexError {
            message: message.into(),
            span: Span::default(),
        }
    }

    pub fn const_violation(message: impl Into<String>) -> Self {
        InferenceError::ConstViolation {
            message: message.into(),
            span: Span::default(),
        }
    }

    pub fn control_flow(message: impl Into<String>) -> Self {
        InferenceError::ControlFlow {
            message: message.into(),
            span: Span::default(),
        }
    }

    pub fn enumeration(message: impl Into<String>) -> Self {
        InferenceError::Enumeration {
            message: message.into(),
            span: Span::default(),
        }
    }

    /// The kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            InferenceError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            InferenceError::TypeInconsistent { .. } => ErrorKind::TypeInconsistent,
            InferenceError::NotCallable { .. } => ErrorKind::NotCallable,
            InferenceError::ParamError { .. } => ErrorKind::ParamError,
            InferenceError::FieldError { .. } => ErrorKind::FieldError,
            InferenceError::IndexError { .. } => ErrorKind::IndexError,
            InferenceError::ConstViolation { .. } => ErrorKind::ConstViolation,
            InferenceError::ControlFlow { .. } => ErrorKind::ControlFlowError,
            InferenceError::Enumeration { .. } => ErrorKind::EnumerationError,
        }
    }

    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            InferenceError::TypeMismatch { span, .. }
            | InferenceError::TypeInconsistent { span, .. }
            | InferenceError::NotCallable { span, .. }
            | InferenceError::ParamError { span, .. }
            | InferenceError::FieldError { span, .. }
            | InferenceError::IndexError { span, .. }
            | InferenceError::ConstViolation { span, .. }
            | InferenceError::ControlFlow { span, .. }
            | InferenceError::Enumeration { span, .. } => *span,
        }
    }

    /// Anchor the error at `at` unless it already carries a position.
    pub fn at(mut self, at: Span) -> Self {
        let slot = match &mut self {
            InferenceError::TypeMismatch { span, .. }
            | InferenceError::TypeInconsistent { span, .. }
            | InferenceError::NotCallable { span, .. }
            | InferenceError::ParamError { span, .. }
            | InferenceError::FieldError { span, .. }
            | InferenceError::IndexError { span, .. }
            | InferenceError::ConstViolation { span, .. }
            | InferenceError::ControlFlow { span, .. }
            | InferenceError::Enumeration { span, .. } => span,
        };
        if slot.is_unknown() {
            *slot = at;
        }
        self
    }

    /// The message without the location prefix.
    pub fn detail(&self) -> String {
        let full = self.to_string();
        match full.split_once(": ") {
            Some((_, rest)) => rest.to_string(),
            None => full,
        }
    }
}

// ============================================================================
// Fatal Errors
// ============================================================================

/// Unrecoverable conditions that abort inference of a routine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalError {
    #[error("routine '{routine}' has {count} instructions, exceeding the encoding limit of {limit}")]
    InstructionOverflow {
        routine: String,
        count: usize,
        limit: usize,
    },

    #[error("routine '{routine}' uses {count} registers, exceeding the encoding limit of {limit}")]
    RegisterOverflow {
        routine: String,
        count: usize,
        limit: usize,
    },

    #[error("{routine} is not registered with the session")]
    UnknownRoutine { routine: RoutineId },

    #[error("malformed code in '{routine}' at instruction {index}: {message}")]
    MalformedCode {
        routine: String,
        index: usize,
        message: String,
    },
}

/// Error returned by instruction handlers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PassError {
    /// Recoverable type error for the current instruction.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Unrecoverable error; abandon the routine.
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl PassError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, PassError::Fatal(_))
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// One diagnostic record: kind, location and the fully formatted message
/// (including the instruction listing).
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A collection of diagnostics for one routine.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.records.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    /// Whether any record has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.records.iter().any(|d| d.kind == kind)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    /// `Ok(())` when empty, otherwise the first record.
    pub fn into_result(self) -> Result<(), Diagnostic> {
        match self.records.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ============================================================================
// Error Sink
// ============================================================================

/// Receives diagnostics as routines finish inference.
///
/// Sinks are shared by every routine of a session, possibly across threads.
pub trait ErrorSink: Send + Sync {
    /// An ordinary type error.
    fn report(&self, diagnostic: &Diagnostic);

    /// An unrecoverable error that aborted a routine.
    fn report_fatal(&self, error: &FatalError);
}

/// Discards everything.
#[derive(Debug, Default)]
pub struct NullSink;

impl ErrorSink for NullSink {
    fn report(&self, _: &Diagnostic) {}

    fn report_fatal(&self, _: &FatalError) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    fatal: Mutex<Vec<FatalError>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the ordinary diagnostics reported so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self.diagnostics.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Snapshot of the fatal errors reported so far.
    pub fn fatal_errors(&self) -> Vec<FatalError> {
        match self.fatal.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let mut records = match self.diagnostics.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(diagnostic.clone());
    }

    fn report_fatal(&self, error: &FatalError) {
        let mut records = match self.fatal.lock() {
            Ok(records) => records,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push(error.clone());
    }
}
