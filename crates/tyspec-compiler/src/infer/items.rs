//! Container literals, item access and field access.

use tyspec_core::{InferenceError, TupleType, Type, TypeKind, Value};

use super::{InferenceDriver, Result};
use crate::bytecode::{Instruction, OpCode};
use crate::graph::NodeId;
use crate::lattice::operations_for;

impl InferenceDriver<'_, '_> {
    /// `TUPLE`, `LIST`, `ARRAY`, `MAP`: build a container from registers
    /// `a..a+b` into `c`.
    pub(super) fn infer_literal(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let items: Vec<Type> = self
            .register_range(node, ins.a, ins.b)?
            .map(|register| self.registers.ty(register).unqualified())
            .collect();
        let ty = match ins.op {
            OpCode::Tuple => Type::tuple_of(items),
            OpCode::List => Type::list(self.join_items(&items)?),
            OpCode::Array => Type::array(self.join_items(&items)?),
            _ => {
                if items.len() % 2 != 0 {
                    return Err(InferenceError::enumeration(format!(
                        "map literal with {} registers is missing a value",
                        items.len()
                    ))
                    .into());
                }
                let keys: Vec<Type> = items.iter().step_by(2).cloned().collect();
                let values: Vec<Type> = items.iter().skip(1).step_by(2).cloned().collect();
                Type::map(self.join_items(&keys)?, self.join_items(&values)?)
            }
        };
        self.write(node, ins.c, ty)
    }

    /// The common type of container items; `any` when there are none.
    fn join_items(&self, items: &[Type]) -> Result<Type> {
        let matcher = self.matcher();
        let mut iter = items.iter();
        let Some(first) = iter.next() else {
            return Ok(Type::any());
        };
        let mut joined = first.clone();
        for item in iter {
            joined = matcher.join(&joined, item).ok_or_else(|| {
                InferenceError::enumeration(format!(
                    "items '{}' and '{}' have no common type",
                    self.name(&joined),
                    self.name(item)
                ))
            })?;
        }
        Ok(joined)
    }

    /// `GETI` (`c = a[b]`) and `GETMI` (`c = a[a+1, ..., a+b]`).
    pub(super) fn infer_get_item(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        if ins.op == OpCode::GetMI {
            let container = self.fixed_operand(ins.a);
            let first = self.register_after(node, ins.a)?;
            let indices: Vec<Type> = self
                .register_range(node, first, ins.b)?
                .map(|r| self.registers.ty(r))
                .collect();
            let result = operations_for(&container).check_get_item(&self.ops(), &container, &indices)?;
            return self.write(node, ins.c, result);
        }

        let (container_reg, container) = self.untag(node, ins.a);
        self.graph.get_mut(node).a = container_reg;
        let index = self.registers.ty(ins.b);
        let result = operations_for(&container).check_get_item(&self.ops(), &container, std::slice::from_ref(&index))?;
        let result = match (container.kind(), self.known.get(&ins.b)) {
            (TypeKind::Tuple(tuple), Some(Value::Int(position))) => constant_tuple_item(&container, tuple, *position)?,
            _ => result,
        };
        if let Some(op) = get_item_opcode(&container, &index) {
            self.graph.get_mut(node).op = op;
        }
        self.write(node, ins.c, result)
    }

    /// `SETI` (`c[b] = a`) and `SETMI` (`c[c+1, ..., c+b] = a`).
    pub(super) fn infer_set_item(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let container = self.fixed_operand(ins.c);
        let value = self.registers.ty(ins.a);
        let ops = operations_for(&container);

        if ins.op == OpCode::SetMI {
            let first = self.register_after(node, ins.c)?;
            let indices: Vec<Type> = self
                .register_range(node, first, ins.b)?
                .map(|r| self.registers.ty(r))
                .collect();
            ops.check_set_item(&self.ops(), &container, &indices, &value)?;
            return Ok(());
        }

        let index = self.registers.ty(ins.b);
        let slot = ops.check_set_item(&self.ops(), &container, std::slice::from_ref(&index), &value)?;
        let value_reg = self.widen(node, ins.a, &slot);
        let stored = self.registers.ty(value_reg);
        let n = self.graph.get_mut(node);
        n.a = value_reg;
        if let Some(op) = set_item_opcode(&container, &index, &stored) {
            n.op = op;
        }
        Ok(())
    }

    /// `GETF`: `c = a.<const b>`.
    pub(super) fn infer_get_field(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let (object_reg, object) = self.untag(node, ins.a);
        self.graph.get_mut(node).a = object_reg;
        let key = self.constant(node, ins.b)?;

        if let TypeKind::Tuple(tuple) = object.kind() {
            let (position, item) = tuple_item(tuple, &key)?;
            let result = if object.is_invariable() && !item.is_primitive() {
                item.to_invariable()
            } else {
                item.clone()
            };
            let n = self.graph.get_mut(node);
            n.op = match item.kind() {
                TypeKind::Int => OpCode::GetFTI,
                TypeKind::Float => OpCode::GetFTF,
                TypeKind::Complex => OpCode::GetFTC,
                _ => OpCode::GetFTX,
            };
            n.b = position;
            return self.write(node, ins.c, result);
        }

        let name = self.field_name(node, &key)?;
        let result = operations_for(&object).check_get_field(&self.ops(), &object, &name)?;
        self.write(node, ins.c, result)
    }

    /// `SETF`: `c.<const b> = a`.
    pub(super) fn infer_set_field(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let object = self.fixed_operand(ins.c);
        let value = self.registers.ty(ins.a);
        let key = self.constant(node, ins.b)?;

        if let TypeKind::Tuple(tuple) = object.kind() {
            let (position, slot) = tuple_item(tuple, &key)?;
            let slot = slot.clone();
            let accepted =
                slot.is_parametric() || self.matcher().match_type(&value, &slot, &mut self.subst()).is_match();
            if !accepted {
                return Err(InferenceError::mismatch(self.name(&value), self.name(&slot)).into());
            }
            let value_reg = self.widen(node, ins.a, &slot);
            let n = self.graph.get_mut(node);
            n.a = value_reg;
            n.b = position;
            n.op = match slot.kind() {
                TypeKind::Int => OpCode::SetFTII,
                TypeKind::Float => OpCode::SetFTFF,
                TypeKind::Complex => OpCode::SetFTCC,
                TypeKind::String => OpCode::SetFTSS,
                _ => OpCode::SetFTXX,
            };
            return Ok(());
        }

        let name = self.field_name(node, &key)?;
        let field = operations_for(&object).check_set_field(&self.ops(), &object, &name, &value)?;
        let value_reg = self.widen(node, ins.a, &field);
        self.graph.get_mut(node).a = value_reg;
        Ok(())
    }

    fn field_name(&self, node: NodeId, key: &Value) -> Result<String> {
        match key {
            Value::String(name) => Ok(name.clone()),
            other => Err(self.malformed(node, format!("field name constant {other:?} is not a string"))),
        }
    }
}

/// Item of a tuple named or numbered by a field constant.
fn tuple_item<'t>(tuple: &'t TupleType, key: &Value) -> Result<(u16, &'t Type)> {
    let position = match key {
        Value::String(name) => tuple.position(name),
        Value::Int(index) => usize::try_from(*index).ok(),
        _ => None,
    };
    let describe = || match key {
        Value::String(name) => name.clone(),
        other => format!("{other:?}"),
    };
    let position = position.ok_or_else(|| InferenceError::no_member(describe()))?;
    let item = tuple
        .item_type(position)
        .ok_or_else(|| InferenceError::no_member(describe()))?;
    let position = u16::try_from(position).map_err(|_| InferenceError::no_member(describe()))?;
    Ok((position, item))
}

/// Item `position` of a tuple read with a constant index.
fn constant_tuple_item(container: &Type, tuple: &TupleType, position: i64) -> Result<Type> {
    let item = usize::try_from(position).ok().and_then(|p| tuple.item_type(p)).ok_or_else(|| {
        InferenceError::index(format!(
            "index {position} is out of range for a tuple of {} items",
            tuple.items.len()
        ))
    })?;
    Ok(if container.is_invariable() && !item.is_primitive() {
        item.to_invariable()
    } else {
        item.clone()
    })
}

fn is_int(ty: &Type) -> bool {
    matches!(ty.kind(), TypeKind::Int)
}

/// Specialized `GETI` for an int index.
fn get_item_opcode(container: &Type, index: &Type) -> Option<OpCode> {
    if !is_int(index) {
        return None;
    }
    match container.kind() {
        TypeKind::List(elem) => Some(match elem.kind() {
            TypeKind::Int => OpCode::GetILII,
            TypeKind::Float => OpCode::GetILFI,
            TypeKind::Complex => OpCode::GetILCI,
            _ => OpCode::GetILI,
        }),
        TypeKind::Array(elem) => match elem.kind() {
            TypeKind::Int => Some(OpCode::GetIAII),
            TypeKind::Float => Some(OpCode::GetIAFI),
            TypeKind::Complex => Some(OpCode::GetIACI),
            _ => None,
        },
        TypeKind::String => Some(OpCode::GetISI),
        TypeKind::Tuple(_) => Some(OpCode::GetITI),
        _ => None,
    }
}

/// Specialized `SETI` for an int index and a value already widened to the
/// element type.
fn set_item_opcode(container: &Type, index: &Type, value: &Type) -> Option<OpCode> {
    if !is_int(index) {
        return None;
    }
    let same = |elem: &Type| elem.unqualified() == value.unqualified();
    match container.kind() {
        TypeKind::List(elem) => Some(match elem.kind() {
            TypeKind::Int if same(elem) => OpCode::SetILIII,
            TypeKind::Float if same(elem) => OpCode::SetILFIF,
            TypeKind::Complex if same(elem) => OpCode::SetILCIC,
            _ => OpCode::SetILI,
        }),
        TypeKind::Array(elem) => match elem.kind() {
            TypeKind::Int if same(elem) => Some(OpCode::SetIAIII),
            TypeKind::Float if same(elem) => Some(OpCode::SetIAFIF),
            TypeKind::Complex if same(elem) => Some(OpCode::SetIACIC),
            _ => None,
        },
        TypeKind::String if is_int(value) => Some(OpCode::SetISII),
        TypeKind::Tuple(_) => Some(OpCode::SetITI),
        _ => None,
    }
}
