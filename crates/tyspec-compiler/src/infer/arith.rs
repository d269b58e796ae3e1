//! Unary, binary and membership operators.

use tyspec_core::{OverloadId, Type};

use super::{InferenceDriver, Result};
use crate::bytecode::Instruction;
use crate::graph::NodeId;
use crate::operators::{OperatorResolution, resolve_binary, resolve_unary};
use crate::overload::{CallArgs, Callee};

impl InferenceDriver<'_, '_> {
    /// `NOT`, `MINUS`, `TILDE`, `SIZE`: `c = op a`.
    pub(super) fn infer_unary(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let (operand_reg, operand) = self.untag(node, ins.a);
        self.graph.get_mut(node).a = operand_reg;

        match resolve_unary(ins.op, &operand, self.session, self.names())? {
            OperatorResolution::Primitive { opcode, result, .. } => {
                self.graph.get_mut(node).op = opcode;
                self.write(node, ins.c, result)
            }
            OperatorResolution::Dynamic { result } => self.write(node, ins.c, result),
            OperatorResolution::Method { overloads } => {
                let result = self.operator_call(overloads, &operand, &[])?;
                self.write(node, ins.c, result)
            }
        }
    }

    /// Arithmetic, logic, comparison and bitwise operators: `c = a op b`.
    pub(super) fn infer_binary(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let (left_reg, left) = self.untag(node, ins.a);
        let (right_reg, right) = self.untag(node, ins.b);
        {
            let n = self.graph.get_mut(node);
            n.a = left_reg;
            n.b = right_reg;
        }

        match resolve_binary(ins.op, &left, &right, self.session, self.names())? {
            OperatorResolution::Primitive { opcode, operand, result } => {
                let a = self.widen(node, left_reg, &operand);
                let b = self.widen(node, right_reg, &operand);
                let n = self.graph.get_mut(node);
                n.op = opcode;
                n.a = a;
                n.b = b;
                self.write(node, ins.c, result)
            }
            OperatorResolution::Dynamic { result } => self.write(node, ins.c, result),
            OperatorResolution::Method { overloads } => {
                let result = self.operator_call(overloads, &left, std::slice::from_ref(&right))?;
                self.write(node, ins.c, result)
            }
        }
    }

    /// `IN`: `c = a in b`. A class container answers through its `in`
    /// method, called on the container.
    pub(super) fn infer_membership(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let item = self.registers.ty(ins.a);
        let (container_reg, container) = self.untag(node, ins.b);
        self.graph.get_mut(node).b = container_reg;

        match resolve_binary(ins.op, &item, &container, self.session, self.names())? {
            OperatorResolution::Method { overloads } => {
                let result = self.operator_call(overloads, &container, std::slice::from_ref(&item))?;
                self.write(node, ins.c, result)
            }
            OperatorResolution::Primitive { result, .. } | OperatorResolution::Dynamic { result } => {
                self.write(node, ins.c, result)
            }
        }
    }

    /// Resolve an operator method on `receiver` and return its result type.
    fn operator_call(&self, overloads: OverloadId, receiver: &Type, args: &[Type]) -> Result<Type> {
        let call = CallArgs::new(args).with_receiver(receiver);
        let resolution = self.resolver().resolve(Callee::Overloads(overloads), call)?;
        Ok(resolution.result)
    }
}
