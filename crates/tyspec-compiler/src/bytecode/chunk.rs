//! Flat code for a single routine.
//!
//! A `CodeChunk` is what the front-end hands to the pass and what the pass
//! hands back: instructions in program order, jump operands holding absolute
//! instruction indices.

use std::fmt;

use tyspec_core::Span;

use super::OpCode;

/// A three-operand instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub a: u16,
    pub b: u16,
    pub c: u16,
    pub span: Span,
}

impl Instruction {
    pub fn new(op: OpCode, a: u16, b: u16, c: u16) -> Self {
        Self {
            op,
            a,
            b,
            c,
            span: Span::default(),
        }
    }

    /// Attach a source span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} : {:>5} , {:>5} , {:>5} ;  {:>4}",
            self.op.name(),
            self.a,
            self.b,
            self.c,
            self.span.line
        )
    }
}

/// The instructions of one routine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeChunk {
    code: Vec<Instruction>,
}

impl CodeChunk {
    /// Create a new empty chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a chunk with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    /// Append an instruction and return its index.
    pub fn push(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    /// Append an instruction built from its parts.
    pub fn emit(&mut self, op: OpCode, a: u16, b: u16, c: u16, line: u32) -> usize {
        self.push(Instruction::new(op, a, b, c).at(Span::line(line)))
    }

    /// Emit a jump whose target is patched later.
    ///
    /// The target is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, a: u16, line: u32) -> usize {
        self.emit(op, a, 0xFFFF, 0, line)
    }

    /// Point the jump at `index` to the next instruction to be emitted.
    pub fn patch_jump(&mut self, index: usize) {
        let target = self.code.len() as u16;
        if let Some(instruction) = self.code.get_mut(index) {
            instruction.b = target;
        }
    }

    pub fn get(&self, index: usize) -> Option<&Instruction> {
        self.code.get(index)
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.code.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.code
    }

    pub fn into_vec(self) -> Vec<Instruction> {
        self.code
    }

    /// Extract all opcodes, ignoring operands.
    ///
    /// This is useful for testing instruction sequences without worrying
    /// about specific register numbers.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.code.iter().map(|i| i.op).collect()
    }

    /// Check that this chunk holds exactly the given opcode sequence.
    ///
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check that this chunk contains the given opcodes (in order, but not
    /// necessarily contiguous).
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }
}

impl From<Vec<Instruction>> for CodeChunk {
    fn from(code: Vec<Instruction>) -> Self {
        Self { code }
    }
}

impl std::ops::Index<usize> for CodeChunk {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Instruction {
        &self.code[index]
    }
}

impl<'a> IntoIterator for &'a CodeChunk {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.code.iter()
    }
}
