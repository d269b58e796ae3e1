//! Switches and tests.
//!
//! A `SWITCH` over a value known at compile time folds into a `GOTO`. An
//! int or enum switch whose case keys cover more than the configured share
//! of their span becomes a dense jump table: one `CASE_TABLE` entry per key
//! from the smallest to the largest, gaps jumping to the default.

use std::collections::BTreeMap;

use log::debug;

use tyspec_core::{EnumKind, EnumType, EnumValue, InferenceError, Type, TypeKind, Value};

use super::{InferenceDriver, Result};
use crate::bytecode::{Instruction, OpCode, operand::case};
use crate::graph::NodeId;

impl InferenceDriver<'_, '_> {
    /// `SWITCH`: dispatch on `a` over the `c` `CASE` nodes that follow.
    pub(super) fn infer_switch(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let cases = self.case_nodes(node, usize::from(ins.c))?;
        let mut values = Vec::with_capacity(cases.len());
        for &id in &cases {
            let index = self.graph.get(id).a;
            values.push(self.constant(id, index)?);
        }

        let scrutinee = self.fixed_operand(ins.a).unqualified();
        self.check_cases(&scrutinee, &values)?;
        let enum_type = match scrutinee.kind() {
            TypeKind::Enum(etype) => Some(etype.clone()),
            _ => None,
        };

        if let Some(known) = self.known.get(&ins.a).cloned() {
            let matched = values
                .iter()
                .position(|value| same_case(&known, value, enum_type.as_ref()));
            let target = match matched {
                Some(position) => self.graph.get(cases[position]).jump_true,
                None => self.graph.get(node).jump_false,
            };
            self.graph.set_goto(node, target);
            for &id in &cases {
                self.graph.set_unused(id);
            }
            debug!("{}: switch on a constant folded at {}", self.slot.name, ins.span.line);
            return Ok(());
        }

        // A flag value may combine several keys, so flags stay linear.
        let keyed = matches!(scrutinee.kind(), TypeKind::Int)
            || enum_type.as_ref().is_some_and(|etype| etype.kind == EnumKind::Enum);
        if keyed && self.build_table(node, &cases, &values, enum_type.as_ref()) {
            return Ok(());
        }

        for (&id, value) in cases.iter().zip(&values) {
            if matches!(value, Value::Enum(e) if e.is_symbol()) {
                self.graph.get_mut(id).c = case::UNORDERED;
            }
        }
        Ok(())
    }

    fn case_nodes(&self, node: NodeId, count: usize) -> Result<Vec<NodeId>> {
        let mut cases = Vec::with_capacity(count);
        let mut cursor = self.graph.next(node);
        for _ in 0..count {
            let id = cursor
                .filter(|&id| self.graph.get(id).op == OpCode::Case)
                .ok_or_else(|| self.malformed(node, format!("switch expects {count} CASE entries")))?;
            cases.push(id);
            cursor = self.graph.next(id);
        }
        Ok(cases)
    }

    fn check_cases(&self, scrutinee: &Type, values: &[Value]) -> Result<()> {
        if scrutinee.is_loose() {
            return Ok(());
        }
        let matcher = self.matcher();
        for value in values {
            if let (TypeKind::Enum(etype), Value::Enum(e)) = (scrutinee.kind(), value)
                && e.value_in(etype).is_none()
            {
                return Err(InferenceError::enumeration(format!(
                    "'{}' is not a symbol of '{}'",
                    e.symbol_name().unwrap_or("?"),
                    etype.name
                ))
                .into());
            }
            if !matcher.match_value(value, scrutinee, &mut self.subst()).is_match() {
                let found = value.intrinsic_type().unwrap_or_else(Type::any);
                return Err(InferenceError::mismatch(self.name(&found), self.name(scrutinee)).into());
            }
        }
        Ok(())
    }

    /// Replace the cases by a dense table if their keys are dense enough.
    fn build_table(&mut self, node: NodeId, cases: &[NodeId], values: &[Value], enum_type: Option<&EnumType>) -> bool {
        let mut targets: BTreeMap<i64, (Option<NodeId>, u16)> = BTreeMap::new();
        for (&id, value) in cases.iter().zip(values) {
            let Some(key) = value.case_key(enum_type) else {
                return false;
            };
            let arm = self.graph.get(id);
            targets.entry(key).or_insert((arm.jump_true, arm.a));
        }
        let (Some(&min), Some(&max)) = (targets.keys().next(), targets.keys().next_back()) else {
            return false;
        };
        let span = i128::from(max) - i128::from(min) + 1;
        let density = targets.len() as f64 / span as f64;
        if density <= self.session.config().switch_table_density {
            return false;
        }
        let Ok(width) = u16::try_from(span) else {
            return false;
        };

        let default = self.graph.get(node).jump_false;
        for &id in cases {
            self.graph.set_unused(id);
        }
        // Inserted right after the switch in reverse, so the table reads in
        // key order.
        for key in (min..=max).rev() {
            let (target, constant) = match targets.get(&key) {
                Some(&entry) => entry,
                None => (default, self.table_constant(key, enum_type)),
            };
            let entry = self.graph.insert_after(node, OpCode::Case, constant, 0, case::TABLE);
            self.graph.get_mut(entry).jump_true = target;
        }
        self.graph.get_mut(node).c = width;
        self.session.count_jump_table();
        debug!(
            "{}: switch with {} cases over {min}..={max} uses a jump table",
            self.slot.name,
            targets.len()
        );
        true
    }

    /// Append the constant of a table key missing from the cases.
    fn table_constant(&mut self, key: i64, enum_type: Option<&EnumType>) -> u16 {
        let value = match enum_type {
            Some(etype) => Value::Enum(EnumValue {
                etype: etype.clone(),
                value: key,
            }),
            None => Value::Int(key),
        };
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    /// `TEST`: fall through when `a` is true, else jump.
    pub(super) fn infer_test(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        if let Some(truth) = self.known.get(&ins.a).and_then(Value::truthiness) {
            if truth {
                self.graph.set_unused(node);
            } else {
                let target = self.graph.get(node).jump_false;
                self.graph.set_goto(node, target);
            }
            debug!("{}: test on a constant folded at {}", self.slot.name, ins.span.line);
            return Ok(());
        }
        let op = match self.fixed_operand(ins.a).kind() {
            TypeKind::Bool => Some(OpCode::TestB),
            TypeKind::Int => Some(OpCode::TestI),
            TypeKind::Float => Some(OpCode::TestF),
            _ => None,
        };
        if let Some(op) = op {
            self.graph.get_mut(node).op = op;
        }
        Ok(())
    }
}

/// Whether a known switch value selects a case constant.
fn same_case(known: &Value, case: &Value, enum_type: Option<&EnumType>) -> bool {
    match (known.case_key(enum_type), case.case_key(enum_type)) {
        (Some(a), Some(b)) => a == b,
        _ => known == case,
    }
}
