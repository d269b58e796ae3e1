//! Operator resolution.
//!
//! Determines how an operator instruction executes for its operand types:
//!
//! 1. **Primitive** - numeric and string operands map to a specialized
//!    opcode, possibly after widening the operands.
//! 2. **Dynamic** - loose operands (`any`, holders) keep the generic opcode
//!    and are dispatched at run time.
//! 3. **Method** - class operands use the class's operator method, resolved
//!    as a method call.

mod primitive;

pub use primitive::{try_primitive_binary, try_primitive_unary};

use tyspec_core::{InferenceError, OverloadId, Type, TypeKind, TypeNames};

use crate::bytecode::OpCode;
use crate::lattice::MethodTable;

/// How an operator is executed.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorResolution {
    /// A dedicated opcode over operands widened to `operand`.
    Primitive {
        opcode: OpCode,
        operand: Type,
        result: Type,
    },
    /// Generic opcode, dispatched at run time.
    Dynamic { result: Type },
    /// The operator method set of the left (or only) operand's class.
    Method { overloads: OverloadId },
}

/// Method name implementing an operator on a class.
pub fn method_name(op: OpCode) -> Option<&'static str> {
    let name = match op {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::Mod => "%",
        OpCode::Pow => "**",
        OpCode::And => "&&",
        OpCode::Or => "||",
        OpCode::Lt => "<",
        OpCode::Le => "<=",
        OpCode::Eq => "==",
        OpCode::Ne => "!=",
        OpCode::In => "in",
        OpCode::BitAnd => "&",
        OpCode::BitOr => "|",
        OpCode::BitXor => "^",
        OpCode::BitLft => "<<",
        OpCode::BitRit => ">>",
        OpCode::Not => "!",
        OpCode::Minus => "-",
        OpCode::Tilde => "~",
        OpCode::Size => "size",
        _ => return None,
    };
    Some(name)
}

fn produces_bool(op: OpCode) -> bool {
    matches!(op, OpCode::Lt | OpCode::Le | OpCode::Eq | OpCode::Ne | OpCode::In)
}

fn operator_method(methods: &dyn MethodTable, op: OpCode, ty: &Type) -> Option<OverloadId> {
    let name = method_name(op)?;
    match ty.kind() {
        TypeKind::Object(class) => methods.class_method(*class, name),
        TypeKind::Interface(interface) => methods.interface_method(*interface, name),
        _ => None,
    }
}

/// Resolve a binary operator (`IN` included) for its operand types.
pub fn resolve_binary(
    op: OpCode,
    left: &Type,
    right: &Type,
    methods: &dyn MethodTable,
    names: &dyn TypeNames,
) -> Result<OperatorResolution, InferenceError> {
    if op == OpCode::In {
        return resolve_membership(left, right, methods, names);
    }
    if left.is_loose() || right.is_loose() {
        let result = if produces_bool(op) { Type::bool() } else { Type::any() };
        return Ok(OperatorResolution::Dynamic { result });
    }
    let (left_base, right_base) = (left.unqualified(), right.unqualified());
    if let Some(resolution) = try_primitive_binary(op, &left_base, &right_base) {
        return Ok(resolution);
    }
    if let Some(overloads) = operator_method(methods, op, left) {
        return Ok(OperatorResolution::Method { overloads });
    }
    // Identity comparison of any two values.
    if matches!(op, OpCode::Eq | OpCode::Ne) {
        return Ok(OperatorResolution::Dynamic { result: Type::bool() });
    }
    Err(InferenceError::mismatch(
        right.named(names),
        left.named(names),
    ))
}

fn resolve_membership(
    item: &Type,
    container: &Type,
    methods: &dyn MethodTable,
    names: &dyn TypeNames,
) -> Result<OperatorResolution, InferenceError> {
    match container.kind() {
        TypeKind::List(_)
        | TypeKind::Map(..)
        | TypeKind::Array(_)
        | TypeKind::Tuple(_)
        | TypeKind::String
        | TypeKind::Any
        | TypeKind::Holder(..) => Ok(OperatorResolution::Dynamic { result: Type::bool() }),
        _ => operator_method(methods, OpCode::In, container)
            .map(|overloads| OperatorResolution::Method { overloads })
            .ok_or_else(|| InferenceError::mismatch(item.named(names), container.named(names))),
    }
}

/// Resolve a unary operator for its operand type.
pub fn resolve_unary(
    op: OpCode,
    operand: &Type,
    methods: &dyn MethodTable,
    names: &dyn TypeNames,
) -> Result<OperatorResolution, InferenceError> {
    if operand.is_loose() {
        let result = match op {
            OpCode::Not => Type::bool(),
            OpCode::Size => Type::int(),
            _ => Type::any(),
        };
        return Ok(OperatorResolution::Dynamic { result });
    }
    if op == OpCode::Size {
        if matches!(
            operand.kind(),
            TypeKind::List(_) | TypeKind::Map(..) | TypeKind::Array(_) | TypeKind::Tuple(_) | TypeKind::String
        ) {
            return Ok(OperatorResolution::Dynamic { result: Type::int() });
        }
    } else if let Some(resolution) = try_primitive_unary(op, &operand.unqualified()) {
        return Ok(resolution);
    }
    operator_method(methods, op, operand)
        .map(|overloads| OperatorResolution::Method { overloads })
        .ok_or_else(|| {
            InferenceError::mismatch(
                operand.named(names),
                format!("operand of '{}'", method_name(op).unwrap_or("?")),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{ClassId, InterfaceId};
    use tyspec_registry::ClassRegistry;

    struct Methods;

    impl MethodTable for Methods {
        fn class_method(&self, class: ClassId, name: &str) -> Option<OverloadId> {
            (class == ClassId::new(0) && name == "+").then(|| OverloadId::new(9))
        }

        fn interface_method(&self, _: InterfaceId, _: &str) -> Option<OverloadId> {
            None
        }
    }

    fn binary(op: OpCode, left: Type, right: Type) -> Result<OperatorResolution, InferenceError> {
        resolve_binary(op, &left, &right, &Methods, &ClassRegistry::new())
    }

    #[test]
    fn loose_operands_stay_dynamic() {
        assert_eq!(
            binary(OpCode::Add, Type::any(), Type::int()).unwrap(),
            OperatorResolution::Dynamic { result: Type::any() }
        );
        assert_eq!(
            binary(OpCode::Lt, Type::int(), Type::any()).unwrap(),
            OperatorResolution::Dynamic { result: Type::bool() }
        );
    }

    #[test]
    fn qualifiers_do_not_block_primitives() {
        let r = binary(OpCode::Add, Type::int().to_const(), Type::int()).unwrap();
        assert!(matches!(r, OperatorResolution::Primitive { opcode: OpCode::AddIII, .. }));
    }

    #[test]
    fn class_operands_use_operator_methods() {
        let point = Type::object(ClassId::new(0));
        assert_eq!(
            binary(OpCode::Add, point.clone(), point.clone()).unwrap(),
            OperatorResolution::Method { overloads: OverloadId::new(9) }
        );
        assert!(binary(OpCode::Sub, point.clone(), point.clone()).is_err());
        assert_eq!(
            binary(OpCode::Eq, point.clone(), point).unwrap(),
            OperatorResolution::Dynamic { result: Type::bool() }
        );
    }

    #[test]
    fn mismatched_primitives_fail() {
        let err = binary(OpCode::Add, Type::string(), Type::int()).unwrap_err();
        assert_eq!(err.kind(), tyspec_core::ErrorKind::TypeMismatch);
    }

    #[test]
    fn membership() {
        assert_eq!(
            binary(OpCode::In, Type::int(), Type::list(Type::int())).unwrap(),
            OperatorResolution::Dynamic { result: Type::bool() }
        );
        assert!(binary(OpCode::In, Type::int(), Type::float()).is_err());
    }

    #[test]
    fn unary() {
        let registry = ClassRegistry::new();
        let size = resolve_unary(OpCode::Size, &Type::string(), &Methods, &registry).unwrap();
        assert_eq!(size, OperatorResolution::Dynamic { result: Type::int() });
        let minus = resolve_unary(OpCode::Minus, &Type::float(), &Methods, &registry).unwrap();
        assert!(matches!(minus, OperatorResolution::Primitive { opcode: OpCode::MinusF, .. }));
        assert!(resolve_unary(OpCode::Tilde, &Type::string(), &Methods, &registry).is_err());
    }
}
