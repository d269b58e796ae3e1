//! Primitive operator resolution.
//!
//! Handles operators whose operands are numeric or string values and which
//! the VM implements with a dedicated opcode.

use tyspec_core::{Type, TypeKind};

use super::OperatorResolution;
use crate::bytecode::OpCode;

/// Try to resolve a binary operator for primitive operands.
///
/// Returns `None` when the operand types have no primitive form of `op`.
pub fn try_primitive_binary(op: OpCode, left: &Type, right: &Type) -> Option<OperatorResolution> {
    if let (TypeKind::String, TypeKind::String) = (left.kind(), right.kind()) {
        return resolve_strings(op);
    }
    let common = left.numeric_rank()?.max(right.numeric_rank()?);
    match op {
        OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod | OpCode::Pow => {
            // bool operands are promoted to int for arithmetic
            let rank = common.max(1);
            let opcode = arithmetic(op, rank)?;
            let operand = Type::from_numeric_rank(rank)?;
            Some(OperatorResolution::Primitive {
                opcode,
                result: operand.clone(),
                operand,
            })
        }
        OpCode::And | OpCode::Or => {
            let opcode = logical(op, common)?;
            Some(OperatorResolution::Primitive {
                opcode,
                operand: Type::from_numeric_rank(common)?,
                result: Type::bool(),
            })
        }
        OpCode::Lt | OpCode::Le | OpCode::Eq | OpCode::Ne => {
            let rank = common.max(1);
            let opcode = comparison(op, rank)?;
            Some(OperatorResolution::Primitive {
                opcode,
                operand: Type::from_numeric_rank(rank)?,
                result: Type::bool(),
            })
        }
        OpCode::BitAnd | OpCode::BitOr | OpCode::BitXor | OpCode::BitLft | OpCode::BitRit => {
            if common > 1 {
                return None;
            }
            Some(OperatorResolution::Primitive {
                opcode: bitwise(op)?,
                operand: Type::int(),
                result: Type::int(),
            })
        }
        _ => None,
    }
}

/// Try to resolve a unary operator for a primitive operand.
pub fn try_primitive_unary(op: OpCode, operand: &Type) -> Option<OperatorResolution> {
    let rank = operand.numeric_rank()?;
    let (opcode, result) = match (op, rank) {
        (OpCode::Not, 0) => (OpCode::NotB, Type::bool()),
        (OpCode::Not, 1) => (OpCode::NotI, Type::bool()),
        (OpCode::Not, 2) => (OpCode::NotF, Type::bool()),
        (OpCode::Minus, 1) => (OpCode::MinusI, Type::int()),
        (OpCode::Minus, 2) => (OpCode::MinusF, Type::float()),
        (OpCode::Minus, 3) => (OpCode::MinusC, Type::complex()),
        (OpCode::Tilde, 1) => (OpCode::TildeI, Type::int()),
        _ => return None,
    };
    Some(OperatorResolution::Primitive {
        opcode,
        operand: operand.unqualified(),
        result,
    })
}

fn resolve_strings(op: OpCode) -> Option<OperatorResolution> {
    let (opcode, result) = match op {
        OpCode::Add => (OpCode::AddSSS, Type::string()),
        OpCode::Lt => (OpCode::LtBSS, Type::bool()),
        OpCode::Le => (OpCode::LeBSS, Type::bool()),
        OpCode::Eq => (OpCode::EqBSS, Type::bool()),
        OpCode::Ne => (OpCode::NeBSS, Type::bool()),
        _ => return None,
    };
    Some(OperatorResolution::Primitive {
        opcode,
        operand: Type::string(),
        result,
    })
}

fn arithmetic(op: OpCode, rank: u8) -> Option<OpCode> {
    let opcode = match (op, rank) {
        (OpCode::Add, 1) => OpCode::AddIII,
        (OpCode::Add, 2) => OpCode::AddFFF,
        (OpCode::Add, 3) => OpCode::AddCCC,
        (OpCode::Sub, 1) => OpCode::SubIII,
        (OpCode::Sub, 2) => OpCode::SubFFF,
        (OpCode::Sub, 3) => OpCode::SubCCC,
        (OpCode::Mul, 1) => OpCode::MulIII,
        (OpCode::Mul, 2) => OpCode::MulFFF,
        (OpCode::Mul, 3) => OpCode::MulCCC,
        (OpCode::Div, 1) => OpCode::DivIII,
        (OpCode::Div, 2) => OpCode::DivFFF,
        (OpCode::Div, 3) => OpCode::DivCCC,
        (OpCode::Mod, 1) => OpCode::ModIII,
        (OpCode::Mod, 2) => OpCode::ModFFF,
        (OpCode::Pow, 1) => OpCode::PowIII,
        (OpCode::Pow, 2) => OpCode::PowFFF,
        _ => return None,
    };
    Some(opcode)
}

fn logical(op: OpCode, rank: u8) -> Option<OpCode> {
    let opcode = match (op, rank) {
        (OpCode::And, 0) => OpCode::AndBBB,
        (OpCode::And, 1) => OpCode::AndBII,
        (OpCode::And, 2) => OpCode::AndBFF,
        (OpCode::Or, 0) => OpCode::OrBBB,
        (OpCode::Or, 1) => OpCode::OrBII,
        (OpCode::Or, 2) => OpCode::OrBFF,
        _ => return None,
    };
    Some(opcode)
}

fn comparison(op: OpCode, rank: u8) -> Option<OpCode> {
    let opcode = match (op, rank) {
        (OpCode::Lt, 1) => OpCode::LtBII,
        (OpCode::Lt, 2) => OpCode::LtBFF,
        (OpCode::Le, 1) => OpCode::LeBII,
        (OpCode::Le, 2) => OpCode::LeBFF,
        (OpCode::Eq, 1) => OpCode::EqBII,
        (OpCode::Eq, 2) => OpCode::EqBFF,
        (OpCode::Eq, 3) => OpCode::EqBCC,
        (OpCode::Ne, 1) => OpCode::NeBII,
        (OpCode::Ne, 2) => OpCode::NeBFF,
        (OpCode::Ne, 3) => OpCode::NeBCC,
        _ => return None,
    };
    Some(opcode)
}

fn bitwise(op: OpCode) -> Option<OpCode> {
    let opcode = match op {
        OpCode::BitAnd => OpCode::BitAndIII,
        OpCode::BitOr => OpCode::BitOrIII,
        OpCode::BitXor => OpCode::BitXorIII,
        OpCode::BitLft => OpCode::BitLftIII,
        OpCode::BitRit => OpCode::BitRitIII,
        _ => return None,
    };
    Some(opcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opcode(resolution: Option<OperatorResolution>) -> Option<OpCode> {
        match resolution? {
            OperatorResolution::Primitive { opcode, .. } => Some(opcode),
            _ => None,
        }
    }

    #[test]
    fn int_add() {
        let r = try_primitive_binary(OpCode::Add, &Type::int(), &Type::int());
        assert!(matches!(
            r,
            Some(OperatorResolution::Primitive { opcode: OpCode::AddIII, ref result, .. }) if *result == Type::int()
        ));
    }

    #[test]
    fn mixed_arithmetic_widens() {
        let r = try_primitive_binary(OpCode::Mul, &Type::float(), &Type::int());
        let Some(OperatorResolution::Primitive { opcode, operand, result }) = r else {
            panic!("expected a primitive resolution");
        };
        assert_eq!(opcode, OpCode::MulFFF);
        assert_eq!(operand, Type::float());
        assert_eq!(result, Type::float());
    }

    #[test]
    fn bools_promote_to_int_for_arithmetic() {
        assert_eq!(opcode(try_primitive_binary(OpCode::Add, &Type::bool(), &Type::bool())), Some(OpCode::AddIII));
    }

    #[test]
    fn complex_has_no_modulo() {
        assert_eq!(opcode(try_primitive_binary(OpCode::Mod, &Type::complex(), &Type::int())), None);
        assert_eq!(opcode(try_primitive_binary(OpCode::Add, &Type::complex(), &Type::int())), Some(OpCode::AddCCC));
    }

    #[test]
    fn comparisons_produce_bool() {
        let r = try_primitive_binary(OpCode::Lt, &Type::int(), &Type::float());
        let Some(OperatorResolution::Primitive { opcode: op, result, .. }) = r else {
            panic!("expected a primitive resolution");
        };
        assert_eq!(op, OpCode::LtBFF);
        assert_eq!(result, Type::bool());
        assert_eq!(
            opcode(try_primitive_binary(OpCode::Eq, &Type::complex(), &Type::complex())),
            Some(OpCode::EqBCC)
        );
        assert_eq!(opcode(try_primitive_binary(OpCode::Lt, &Type::complex(), &Type::int())), None);
    }

    #[test]
    fn string_operators() {
        assert_eq!(opcode(try_primitive_binary(OpCode::Add, &Type::string(), &Type::string())), Some(OpCode::AddSSS));
        assert_eq!(opcode(try_primitive_binary(OpCode::Ne, &Type::string(), &Type::string())), Some(OpCode::NeBSS));
        assert_eq!(opcode(try_primitive_binary(OpCode::Sub, &Type::string(), &Type::string())), None);
        assert_eq!(opcode(try_primitive_binary(OpCode::Add, &Type::string(), &Type::int())), None);
    }

    #[test]
    fn bitwise_requires_integers() {
        assert_eq!(opcode(try_primitive_binary(OpCode::BitXor, &Type::int(), &Type::bool())), Some(OpCode::BitXorIII));
        assert_eq!(opcode(try_primitive_binary(OpCode::BitAnd, &Type::float(), &Type::int())), None);
    }

    #[test]
    fn logical_operators() {
        assert_eq!(opcode(try_primitive_binary(OpCode::And, &Type::bool(), &Type::bool())), Some(OpCode::AndBBB));
        assert_eq!(opcode(try_primitive_binary(OpCode::Or, &Type::int(), &Type::float())), Some(OpCode::OrBFF));
    }

    #[test]
    fn unary_operators() {
        assert_eq!(opcode(try_primitive_unary(OpCode::Not, &Type::int())), Some(OpCode::NotI));
        assert_eq!(opcode(try_primitive_unary(OpCode::Minus, &Type::complex())), Some(OpCode::MinusC));
        assert_eq!(opcode(try_primitive_unary(OpCode::Minus, &Type::bool())), None);
        assert_eq!(opcode(try_primitive_unary(OpCode::Tilde, &Type::float())), None);
    }
}
