//! Instruction set of the register VM.
//!
//! Every instruction has three `u16` operands `a`, `b`, `c` (see
//! [`Instruction`](super::Instruction)). Generic opcodes dispatch on the
//! runtime type of their operands; the inference pass rewrites them into the
//! type-specialized variants listed after each generic one.
//!
//! Specialized names spell their operand types after the underscore, in the
//! order destination, first operand, second operand: `ADD_FFF` adds two
//! floats into a float, `LT_BII` compares two ints into a bool, `MOVE_FI`
//! moves an int into a float register.

use num_enum::{IntoPrimitive, TryFromPrimitive};

macro_rules! opcodes {
    ($( $(#[$meta:meta])* $variant:ident => $name:literal, )*) => {
        /// VM operation codes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
        #[repr(u16)]
        pub enum OpCode {
            $( $(#[$meta])* $variant, )*
        }

        impl OpCode {
            /// Every opcode, in encoding order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            /// Get the listing name of this opcode.
            pub fn name(self) -> &'static str {
                match self {
                    $( OpCode::$variant => $name, )*
                }
            }
        }
    };
}

opcodes! {
    // =========================================================================
    // Loads and moves
    // =========================================================================
    /// No operation.
    Nop => "NOP",
    /// Load constant `b` into register `c`.
    GetCl => "GETCL",
    GetClB => "GETCL_B",
    GetClI => "GETCL_I",
    GetClF => "GETCL_F",
    GetClC => "GETCL_C",
    /// Load local `a` into register `c`.
    Load => "LOAD",
    /// Move `a` into `c`; `b` carries declaration flags.
    Move => "MOVE",
    // The sixteen numeric moves are laid out as `MoveBB + 4 * dest + source`
    // over the ranks bool, int, float, complex.
    MoveBB => "MOVE_BB",
    MoveBI => "MOVE_BI",
    MoveBF => "MOVE_BF",
    MoveBC => "MOVE_BC",
    MoveIB => "MOVE_IB",
    MoveII => "MOVE_II",
    MoveIF => "MOVE_IF",
    MoveIC => "MOVE_IC",
    MoveFB => "MOVE_FB",
    MoveFI => "MOVE_FI",
    MoveFF => "MOVE_FF",
    MoveFC => "MOVE_FC",
    MoveCB => "MOVE_CB",
    MoveCI => "MOVE_CI",
    MoveCF => "MOVE_CF",
    MoveCC => "MOVE_CC",
    /// String copy.
    MoveSS => "MOVE_SS",
    /// Reference move between identical non-primitive types.
    MovePP => "MOVE_PP",
    /// Value move between identical non-numeric value types.
    MoveXX => "MOVE_XX",
    /// Convert `a` to the type preset on `c`.
    Cast => "CAST",
    CastB => "CAST_B",
    CastI => "CAST_I",
    CastF => "CAST_F",
    CastC => "CAST_C",
    CastS => "CAST_S",

    // =========================================================================
    // Unary operators
    // =========================================================================
    Not => "NOT",
    NotB => "NOT_B",
    NotI => "NOT_I",
    NotF => "NOT_F",
    Minus => "MINUS",
    MinusI => "MINUS_I",
    MinusF => "MINUS_F",
    MinusC => "MINUS_C",
    /// Bitwise complement.
    Tilde => "TILDE",
    TildeI => "TILDE_I",
    /// Size of a container or string.
    Size => "SIZE",

    // =========================================================================
    // Arithmetic
    // =========================================================================
    Add => "ADD",
    AddIII => "ADD_III",
    AddFFF => "ADD_FFF",
    AddCCC => "ADD_CCC",
    /// String concatenation.
    AddSSS => "ADD_SSS",
    Sub => "SUB",
    SubIII => "SUB_III",
    SubFFF => "SUB_FFF",
    SubCCC => "SUB_CCC",
    Mul => "MUL",
    MulIII => "MUL_III",
    MulFFF => "MUL_FFF",
    MulCCC => "MUL_CCC",
    Div => "DIV",
    DivIII => "DIV_III",
    DivFFF => "DIV_FFF",
    DivCCC => "DIV_CCC",
    Mod => "MOD",
    ModIII => "MOD_III",
    ModFFF => "MOD_FFF",
    Pow => "POW",
    PowIII => "POW_III",
    PowFFF => "POW_FFF",

    // =========================================================================
    // Logic and comparison (produce bool)
    // =========================================================================
    And => "AND",
    AndBBB => "AND_BBB",
    AndBII => "AND_BII",
    AndBFF => "AND_BFF",
    Or => "OR",
    OrBBB => "OR_BBB",
    OrBII => "OR_BII",
    OrBFF => "OR_BFF",
    Lt => "LT",
    LtBII => "LT_BII",
    LtBFF => "LT_BFF",
    LtBSS => "LT_BSS",
    Le => "LE",
    LeBII => "LE_BII",
    LeBFF => "LE_BFF",
    LeBSS => "LE_BSS",
    Eq => "EQ",
    EqBII => "EQ_BII",
    EqBFF => "EQ_BFF",
    EqBCC => "EQ_BCC",
    EqBSS => "EQ_BSS",
    Ne => "NE",
    NeBII => "NE_BII",
    NeBFF => "NE_BFF",
    NeBCC => "NE_BCC",
    NeBSS => "NE_BSS",
    /// Membership test: item `a` in container `b`.
    In => "IN",

    // =========================================================================
    // Bitwise
    // =========================================================================
    BitAnd => "BITAND",
    BitAndIII => "BITAND_III",
    BitOr => "BITOR",
    BitOrIII => "BITOR_III",
    BitXor => "BITXOR",
    BitXorIII => "BITXOR_III",
    BitLft => "BITLFT",
    BitLftIII => "BITLFT_III",
    BitRit => "BITRIT",
    BitRitIII => "BITRIT_III",

    // =========================================================================
    // Container literals
    // =========================================================================
    Tuple => "TUPLE",
    List => "LIST",
    Map => "MAP",
    Array => "ARRAY",

    // =========================================================================
    // Item access
    // =========================================================================
    /// `c = a[b]`.
    GetI => "GETI",
    /// List item by int index.
    GetILI => "GETI_LI",
    GetILII => "GETI_LII",
    GetILFI => "GETI_LFI",
    GetILCI => "GETI_LCI",
    GetIAII => "GETI_AII",
    GetIAFI => "GETI_AFI",
    GetIACI => "GETI_ACI",
    /// Character code of a string.
    GetISI => "GETI_SI",
    /// Tuple item by int register.
    GetITI => "GETI_TI",
    /// `c = a[a+1, ..., a+b]`.
    GetMI => "GETMI",
    /// `c[b] = a`.
    SetI => "SETI",
    SetILI => "SETI_LI",
    SetILIII => "SETI_LIII",
    SetILFIF => "SETI_LFIF",
    SetILCIC => "SETI_LCIC",
    SetIAIII => "SETI_AIII",
    SetIAFIF => "SETI_AFIF",
    SetIACIC => "SETI_ACIC",
    SetISII => "SETI_SII",
    SetITI => "SETI_TI",
    /// `c[c+1, ..., c+b] = a`.
    SetMI => "SETMI",

    // =========================================================================
    // Field access
    // =========================================================================
    /// `c = a.<const b>`.
    GetF => "GETF",
    // Specialized tuple fields take the item position in `b`.
    GetFTI => "GETF_TI",
    GetFTF => "GETF_TF",
    GetFTC => "GETF_TC",
    GetFTX => "GETF_TX",
    /// `c.<const b> = a`.
    SetF => "SETF",
    SetFTII => "SETF_TII",
    SetFTFF => "SETF_TFF",
    SetFTCC => "SETF_TCC",
    SetFTSS => "SETF_TSS",
    SetFTXX => "SETF_TXX",

    // =========================================================================
    // Control flow and calls
    // =========================================================================
    /// Create a closure from routine constant `a`.
    Routine => "ROUTINE",
    /// Jump to `b`.
    Goto => "GOTO",
    /// Dispatch on `a` over the `c` CASE instructions that follow; `b` is
    /// the default target.
    Switch => "SWITCH",
    /// Case constant `a`, target `b`, mode `c`.
    Case => "CASE",
    /// Fall through if `a` is true, otherwise jump to `b`.
    Test => "TEST",
    TestB => "TEST_B",
    TestI => "TEST_I",
    TestF => "TEST_F",
    /// Call `a` with the arguments that follow it.
    Call => "CALL",
    /// Method call: the first argument is the receiver.
    MCall => "MCALL",
    Return => "RETURN",
    /// Invoke the code section of the current routine.
    Yield => "YIELD",
    /// Code section header: parameters `a..a+b`.
    Sect => "SECT",
    /// Removed by the pass; dropped on flattening.
    Unused => "UNUSED",
}

impl OpCode {
    /// Convert from raw encoding, returning `None` for an invalid value.
    pub fn from_u16(value: u16) -> Option<OpCode> {
        OpCode::try_from(value).ok()
    }

    /// The numeric move `dest <- source`, by numeric rank
    /// (0 bool, 1 int, 2 float, 3 complex).
    pub fn numeric_move(dest_rank: u8, source_rank: u8) -> Option<OpCode> {
        if dest_rank > 3 || source_rank > 3 {
            return None;
        }
        let base: u16 = OpCode::MoveBB.into();
        OpCode::from_u16(base + 4 * u16::from(dest_rank) + u16::from(source_rank))
    }

    /// Whether operand `b` is an instruction index.
    pub fn has_jump(self) -> bool {
        matches!(
            self,
            OpCode::Goto | OpCode::Switch | OpCode::Case | OpCode::Test | OpCode::TestB | OpCode::TestI | OpCode::TestF
        )
    }

    /// Whether operand `c` names a destination register.
    pub fn writes_c(self) -> bool {
        !matches!(
            self,
            OpCode::Nop
                | OpCode::SetI
                | OpCode::SetILI
                | OpCode::SetILIII
                | OpCode::SetILFIF
                | OpCode::SetILCIC
                | OpCode::SetIAIII
                | OpCode::SetIAFIF
                | OpCode::SetIACIC
                | OpCode::SetISII
                | OpCode::SetITI
                | OpCode::SetMI
                | OpCode::SetF
                | OpCode::SetFTII
                | OpCode::SetFTFF
                | OpCode::SetFTCC
                | OpCode::SetFTSS
                | OpCode::SetFTXX
                | OpCode::Goto
                | OpCode::Switch
                | OpCode::Case
                | OpCode::Test
                | OpCode::TestB
                | OpCode::TestI
                | OpCode::TestF
                | OpCode::Return
                | OpCode::Sect
                | OpCode::Unused
        )
    }

    /// Generic binary operators, which take `a` and `b` and write `c`.
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            OpCode::Add
                | OpCode::Sub
                | OpCode::Mul
                | OpCode::Div
                | OpCode::Mod
                | OpCode::Pow
                | OpCode::And
                | OpCode::Or
                | OpCode::Lt
                | OpCode::Le
                | OpCode::Eq
                | OpCode::Ne
                | OpCode::BitAnd
                | OpCode::BitOr
                | OpCode::BitXor
                | OpCode::BitLft
                | OpCode::BitRit
        )
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_repr() {
        assert_eq!(u16::from(OpCode::Nop), 0);
        assert_eq!(u16::from(OpCode::GetCl), 1);
    }

    #[test]
    fn opcode_from_u16() {
        assert_eq!(OpCode::from_u16(0), Some(OpCode::Nop));
        assert_eq!(OpCode::from_u16(u16::from(OpCode::Unused)), Some(OpCode::Unused));
        assert_eq!(OpCode::from_u16(u16::from(OpCode::Unused) + 1), None);
    }

    #[test]
    fn opcode_name() {
        assert_eq!(OpCode::AddIII.name(), "ADD_III");
        assert_eq!(OpCode::MoveFI.name(), "MOVE_FI");
        assert_eq!(OpCode::GetILFI.name(), "GETI_LFI");
    }

    #[test]
    fn numeric_moves_follow_rank_layout() {
        assert_eq!(OpCode::numeric_move(2, 1), Some(OpCode::MoveFI));
        assert_eq!(OpCode::numeric_move(1, 0), Some(OpCode::MoveIB));
        assert_eq!(OpCode::numeric_move(3, 3), Some(OpCode::MoveCC));
        assert_eq!(OpCode::numeric_move(4, 0), None);
    }

    #[test]
    fn all_lists_every_opcode_once() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(usize::from(u16::from(*op)), i);
        }
    }

    #[test]
    fn destination_operands() {
        assert!(OpCode::Call.writes_c());
        assert!(OpCode::GetF.writes_c());
        assert!(!OpCode::SetF.writes_c());
        assert!(!OpCode::Return.writes_c());
        assert!(OpCode::Test.has_jump());
        assert!(!OpCode::Call.has_jump());
    }
}
