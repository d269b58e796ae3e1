//! Constants, loads, moves and casts.

use tyspec_core::{FatalError, InferenceError, PassError, Span, Type, TypeAttrs, TypeKind, Value};

use super::{InferenceDriver, Result};
use crate::bytecode::{Instruction, OpCode, operand::decl};
use crate::graph::NodeId;
use crate::lattice::specialize;

impl InferenceDriver<'_, '_> {
    /// `GETCL`: load constant `b` into `c`.
    pub(super) fn infer_constant(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let value = self.constant(node, ins.b)?;
        let ty = match &value {
            Value::Routine(id) => {
                let signature = self
                    .session
                    .signature(*id)
                    .ok_or(FatalError::UnknownRoutine { routine: *id })?;
                Type::routine(signature)
            }
            other => other.intrinsic_type().unwrap_or_else(Type::any),
        };
        self.write(node, ins.c, ty)?;

        if let Some(op) = constant_opcode(&value) {
            self.graph.get_mut(node).op = op;
        }
        if let Value::Routine(id) = value {
            self.callees.insert(ins.c, id);
        }
        if self.writes.get(&ins.c) == Some(&1) {
            self.known.insert(ins.c, value);
        }
        Ok(())
    }

    /// `LOAD`: copy local `a` into `c`.
    pub(super) fn infer_load(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let ty = self.registers.ty(ins.a);
        self.write(node, ins.c, ty)?;
        if let Some(id) = self.callees.get(&ins.a).copied() {
            self.callees.insert(ins.c, id);
        }
        Ok(())
    }

    /// `MOVE`: `c = a`, with the declaration flags in `b`.
    pub(super) fn infer_move(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let source = self.registers.ty(ins.a);
        let mut value = if source.is_const() { source.unqualified() } else { source.clone() };
        if ins.b & decl::INVAR != 0 {
            value = value.to_invariable();
        } else if ins.b & decl::EXPLICIT != 0 {
            if source.attrs().contains(TypeAttrs::INVAR) && !source.is_primitive() {
                return Err(InferenceError::const_violation(format!(
                    "invariable '{}' declared as var",
                    self.name(&source)
                ))
                .into());
            }
            value = value.to_var();
        }

        self.known.remove(&ins.c);
        self.callees.remove(&ins.c);

        let opcode = match self.move_target(ins.c) {
            None => {
                let names = self.names();
                self.registers.assign(ins.c, value.clone(), names)?;
                move_opcode(&value, &source)
            }
            Some(target) => {
                let mut subst = self.subst();
                if !self.matcher().match_type(&value, &target, &mut subst).is_match() {
                    return Err(self.mismatch_on(ins.c, &value, &target));
                }
                if target.is_parametric() {
                    for (holder, bound) in subst {
                        self.base.entry(holder).or_insert(bound);
                    }
                    let resolved = specialize(&target, &self.subst());
                    let names = self.names();
                    self.registers.assign(ins.c, resolved.clone(), names)?;
                    move_opcode(&resolved, &source)
                } else {
                    move_opcode(&target, &source)
                }
            }
        };

        if let Some(op) = opcode {
            self.graph.get_mut(node).op = op;
        }
        if let Some(id) = self.callees.get(&ins.a).copied() {
            self.callees.insert(ins.c, id);
        }
        Ok(())
    }

    /// The type a move into `register` must produce, if it is fixed.
    fn move_target(&self, register: u16) -> Option<Type> {
        if self.registers.is_declared(register) {
            return Some(specialize(&self.registers.ty(register), &self.subst()));
        }
        self.registers
            .get(register)
            .filter(|ty| !ty.is_parametric() && !ty.is_any())
            .cloned()
    }

    /// The error for a value that does not fit `register`.
    fn mismatch_on(&self, register: u16, value: &Type, target: &Type) -> PassError {
        if self.registers.is_declared(register) {
            InferenceError::mismatch(self.name(value), self.name(target)).into()
        } else {
            InferenceError::TypeInconsistent {
                register,
                existing: self.name(target),
                found: self.name(value),
                span: Span::default(),
            }
            .into()
        }
    }

    /// `CAST`: convert `a` to the type preset on `c`.
    pub(super) fn infer_cast(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let (source_reg, source) = self.untag(node, ins.a);
        self.graph.get_mut(node).a = source_reg;
        let target = match self.registers.get(ins.c) {
            Some(target) => target.clone(),
            None => return Err(self.malformed(node, "cast target type not preset")),
        };
        if target.is_any() || source.is_loose() {
            return Ok(());
        }

        if source.unqualified() == target.unqualified() {
            if let Some(op) = move_opcode(&target, &source) {
                self.graph.get_mut(node).op = op;
            } else {
                self.graph.get_mut(node).op = OpCode::Move;
            }
            return Ok(());
        }
        if let Some(op) = cast_opcode(&target) {
            self.graph.get_mut(node).op = op;
            return Ok(());
        }

        // Casts between reference types must follow the is-a relation one way
        // or the other.
        let matcher = self.matcher();
        let down = matcher.match_type(&target, &source, &mut self.subst()).is_match();
        let up = matcher.match_type(&source, &target, &mut self.subst()).is_match();
        if !down && !up {
            return Err(InferenceError::mismatch(self.name(&source), self.name(&target)).into());
        }
        Ok(())
    }
}

fn constant_opcode(value: &Value) -> Option<OpCode> {
    match value {
        Value::Bool(_) => Some(OpCode::GetClB),
        Value::Int(_) => Some(OpCode::GetClI),
        Value::Float(_) => Some(OpCode::GetClF),
        Value::Complex(..) => Some(OpCode::GetClC),
        _ => None,
    }
}

fn cast_opcode(target: &Type) -> Option<OpCode> {
    match target.kind() {
        TypeKind::Bool => Some(OpCode::CastB),
        TypeKind::Int => Some(OpCode::CastI),
        TypeKind::Float => Some(OpCode::CastF),
        TypeKind::Complex => Some(OpCode::CastC),
        TypeKind::String => Some(OpCode::CastS),
        _ => None,
    }
}

/// The specialized move of a `source` value into a `dest` register.
pub(super) fn move_opcode(dest: &Type, source: &Type) -> Option<OpCode> {
    let (dest, source) = (dest.unqualified(), source.unqualified());
    if let (Some(d), Some(s)) = (dest.numeric_rank(), source.numeric_rank()) {
        return OpCode::numeric_move(d, s);
    }
    if dest.is_loose() || source.is_loose() || dest != source {
        return None;
    }
    match dest.kind() {
        TypeKind::String => Some(OpCode::MoveSS),
        _ if dest.is_primitive() => Some(OpCode::MoveXX),
        _ => Some(OpCode::MovePP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{ClassId, EnumType};

    #[test]
    fn numeric_moves_follow_ranks() {
        assert_eq!(move_opcode(&Type::float(), &Type::int()), Some(OpCode::MoveFI));
        assert_eq!(move_opcode(&Type::int(), &Type::int().to_const()), Some(OpCode::MoveII));
    }

    #[test]
    fn value_and_reference_moves() {
        assert_eq!(move_opcode(&Type::string(), &Type::string()), Some(OpCode::MoveSS));
        let color = Type::enumeration(EnumType::new("Color", &["red"]));
        assert_eq!(move_opcode(&color, &color), Some(OpCode::MoveXX));
        let list = Type::list(Type::int());
        assert_eq!(move_opcode(&list, &list), Some(OpCode::MovePP));
        let object = Type::object(ClassId::new(0));
        assert_eq!(move_opcode(&object, &Type::object(ClassId::new(1))), None);
        assert_eq!(move_opcode(&Type::any(), &Type::int()), None);
    }

    #[test]
    fn casts_to_primitives_are_specialized() {
        assert_eq!(cast_opcode(&Type::string()), Some(OpCode::CastS));
        assert_eq!(cast_opcode(&Type::complex()), Some(OpCode::CastC));
        assert_eq!(cast_opcode(&Type::list(Type::int())), None);
    }

    #[test]
    fn constants_load_specialized() {
        assert_eq!(constant_opcode(&Value::Int(1)), Some(OpCode::GetClI));
        assert_eq!(constant_opcode(&Value::float(0.5)), Some(OpCode::GetClF));
        assert_eq!(constant_opcode(&Value::string("s")), None);
    }
}
