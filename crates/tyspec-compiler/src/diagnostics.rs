//! Diagnostic messages with code snippets.
//!
//! Every recoverable error is rendered together with a listing of the
//! instructions around the one that failed:
//!
//! ```text
//! [[ERROR]] in routine "area":
//!   At line 3 : Types not matching --- " types not matching: 'string' for 'int' ";
//!   In code snippet:
//!        1:  GETCL      :     0 ,     0 ,     2 ;     2
//!   >>   2:  ADD        :     1 ,     2 ,     3 ;     3
//!        3:  RETURN     :     3 ,     1 ,     0 ;     4
//! ```

use std::fmt::Write;

use tyspec_core::{Diagnostic, InferenceError};

use crate::bytecode::CodeChunk;

/// Render the diagnostic for `error`, raised at flat instruction `position`
/// of `code`, with `context` instructions shown on either side.
pub fn render(routine: &str, error: &InferenceError, code: &CodeChunk, position: Option<usize>, context: usize) -> Diagnostic {
    let span = error.span();
    let mut message = String::new();
    let _ = writeln!(message, "[[ERROR]] in routine \"{routine}\":");
    let _ = writeln!(
        message,
        "  At line {} : {} --- \" {} \";",
        span.line,
        error.kind().as_str(),
        error.detail()
    );
    if let Some(position) = position.filter(|&p| p < code.len()) {
        message.push_str("  In code snippet:\n");
        let first = position.saturating_sub(context);
        let last = (position + context).min(code.len() - 1);
        for index in first..=last {
            let marker = if index == position { ">>" } else { "  " };
            let _ = writeln!(message, "  {marker} {index:>4}:  {}", code[index]);
        }
    }
    Diagnostic::new(error.kind(), span, message)
}
