//! Returns and the routine's return type.

use log::debug;

use tyspec_core::{InferenceError, Type};

use super::{InferenceDriver, Result};
use crate::bytecode::Instruction;
use crate::graph::NodeId;
use crate::lattice::{MatchRank, specialize};
use crate::routine::RoutineAttrs;

impl InferenceDriver<'_, '_> {
    /// A `main` routine returns `int`.
    pub(super) fn check_main(&mut self) -> Result<()> {
        if !self.slot.attribs.contains(RoutineAttrs::MAIN) {
            return Ok(());
        }
        if self.ret.is_parametric() {
            self.fix_return(Type::int());
            return Ok(());
        }
        if self.ret.unqualified() != Type::int() {
            return Err(InferenceError::mismatch(self.name(&self.ret), "int").into());
        }
        Ok(())
    }

    /// `RETURN`: return `b` values starting at `a`.
    pub(super) fn infer_return(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let value = match ins.b {
            0 => Type::none(),
            1 => self.registers.ty(ins.a),
            n => Type::tuple_of(
                self.register_range(node, ins.a, n)?
                    .map(|r| self.registers.ty(r))
                    .collect(),
            ),
        };

        let matcher = self.matcher();
        if let Some(frame) = self.ledger.innermost_mut() {
            let expected = frame.expected();
            let accepted = matcher.match_type(&value, &expected, &mut frame.subst).is_match();
            if accepted {
                frame.returned.get_or_insert(value);
                return Ok(());
            }
            return Err(InferenceError::mismatch(self.name(&value), self.name(&expected)).into());
        }

        let ret = specialize(&self.ret, &self.subst());
        if ret.is_parametric() {
            let fixed = value.unqualified();
            debug!("{}: return type fixed to {}", self.slot.name, self.name(&fixed));
            self.fix_return(fixed);
            self.returned = true;
            return Ok(());
        }
        self.returned = true;

        let rank = matcher.match_type(&value, &ret, &mut self.subst());
        if !rank.is_match() {
            return Err(InferenceError::mismatch(self.name(&value), self.name(&ret)).into());
        }
        if rank == MatchRank::Subtype && ins.b == 1 && value.is_numeric() {
            let widened = self.widen(node, ins.a, &ret);
            self.graph.get_mut(node).a = widened;
        }
        Ok(())
    }

    /// After the last instruction: a routine that never returned returns
    /// `none` if its type was open, and is in error if it promised a value.
    pub(super) fn finish_returns(&mut self) -> Result<()> {
        if self.returned {
            return Ok(());
        }
        if self.ret.is_parametric() {
            self.fix_return(Type::none());
            return Ok(());
        }
        if self.ret.is_none() || self.ret.is_any() || self.slot.source.code.is_empty() {
            return Ok(());
        }
        Err(InferenceError::control_flow("return is expected but not present").into())
    }

    fn fix_return(&mut self, ret: Type) {
        self.slot.set_return_type(ret.clone());
        self.ret = ret;
    }
}
