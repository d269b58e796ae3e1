//! Source positions attached to instructions.
//!
//! Every flat instruction handed to the pass carries a [`Span`]. Nodes inserted
//! during inference inherit the span of the instruction they were inserted for,
//! so diagnostics always point back at user source.

use std::fmt;

/// Source location of one instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed, 0 when unknown).
    pub line: u32,
    /// Column of the first token (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes of the expression that produced the instruction.
    pub len: u32,
}

impl Span {
    /// Create a span from a line, column, and length.
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// A span that only knows its line.
    #[inline]
    pub fn line(line: u32) -> Self {
        Self { line, col: 1, len: 0 }
    }

    /// Whether the span carries no position (synthesized code without source).
    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.line == 0
    }

    /// Smallest span starting at the earlier position and covering both.
    ///
    /// Spans on different lines keep the earlier line; the length is then only
    /// meaningful for the first line.
    pub fn cover(self, other: Span) -> Span {
        if self.is_unknown() {
            return other;
        }
        if other.is_unknown() {
            return self;
        }
        let (first, second) = if (other.line, other.col) < (self.line, self.col) {
            (other, self)
        } else {
            (self, other)
        };
        if first.line != second.line {
            return first;
        }
        let end = (first.col + first.len).max(second.col + second.len);
        Span::new(first.line, first.col, end - first.col)
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
