//! Bytecode types for the inference pass.
//!
//! - [`OpCode`] - The instruction set of the register VM
//! - [`Instruction`] - One three-operand instruction with its source span
//! - [`CodeChunk`] - The flat code of a routine
//! - [`operand`] - Flag and mode constants packed into operands

mod chunk;
mod opcode;
pub mod operand;

pub use chunk::{CodeChunk, Instruction};
pub use opcode::OpCode;
