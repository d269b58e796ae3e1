//! Flag and mode constants packed into instruction operands.

/// Flags on the `b` operand of `CALL`, `MCALL` and `YIELD`.
///
/// The low byte holds the argument count.
pub mod call {
    pub const COUNT_MASK: u16 = 0x00ff;
    /// Every argument matched its parameter exactly.
    pub const FAST: u16 = 0x100;
    /// The result is returned immediately.
    pub const TAIL: u16 = 0x200;
    /// A code section follows the call.
    pub const BLOCK: u16 = 0x400;
    /// The trailing tuple argument is expanded into positional arguments.
    pub const EXPAR: u16 = 0x800;

    /// Argument count of a call `b` operand.
    pub fn count(b: u16) -> usize {
        usize::from(b & COUNT_MASK)
    }
}

/// Flags on the `b` operand of `MOVE`.
pub mod decl {
    /// Assignment to an existing variable.
    pub const ASSIGN: u16 = 0x1;
    /// Explicit declaration.
    pub const EXPLICIT: u16 = 0x2;
    /// `invar` declaration.
    pub const INVAR: u16 = 0x4;
}

/// Modes on the `c` operand of `CASE`.
pub mod case {
    pub const ORDERED: u16 = 0;
    pub const UNORDERED: u16 = 1;
    pub const TABLE: u16 = 2;
}
