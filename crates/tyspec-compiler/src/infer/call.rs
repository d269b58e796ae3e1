//! Calls, closures, yields and code sections.
//!
//! A call with a code section is laid out as
//!
//! ```text
//! CALL  f, n|BLOCK, r
//! GOTO  end
//! SECT  p, k, req
//! ...               section body, ends in RETURN
//! end:
//! ```
//!
//! The call opens a ledger frame over `SECT..end`. Returns inside the frame
//! go back to the callee's `YIELD` and are typed against the section.

use log::debug;

use tyspec_core::{FatalError, InferenceError, ParamKind, RoutineType, Type, TypeKind, Value};

use super::ledger::Frame;
use super::{InferenceDriver, Result};
use crate::bytecode::{Instruction, OpCode, operand::call};
use crate::graph::NodeId;
use crate::overload::{CallArgs, Callee};

impl InferenceDriver<'_, '_> {
    /// `CALL` and `MCALL`: call `a` with arguments `a+1..`, result in `c`.
    pub(super) fn infer_call(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let first = self.register_after(node, ins.a)?;
        let mut args: Vec<Type> = self
            .register_range(node, first, call::count(ins.b) as u16)?
            .map(|register| self.registers.ty(register))
            .collect();
        let mut known_args = true;
        if ins.b & call::EXPAR != 0 {
            known_args = self.expand_tuple(&mut args)?;
        }

        let callee = match self.callees.get(&ins.a).copied() {
            Some(id) => Callee::Routine(id),
            None => self.callee_of(&self.fixed_operand(ins.a))?,
        };
        let callee = if known_args { callee } else { Callee::Dynamic };
        let dynamic = matches!(callee, Callee::Dynamic);

        let self_type = self.self_type();
        let resolution = if ins.op == OpCode::MCall {
            let Some((receiver, rest)) = args.split_first() else {
                return Err(InferenceError::param("method call without a receiver").into());
            };
            self.resolver()
                .resolve(callee, CallArgs::new(rest).with_receiver(receiver))?
        } else {
            let implicit = match callee {
                Callee::Overloads(_) => self_type.as_ref(),
                _ => None,
            };
            self.resolver()
                .resolve(callee, CallArgs::new(&args).with_implicit_self(implicit))?
        };
        self.write(node, ins.c, resolution.result.clone())?;

        let mut flags = ins.b;
        if resolution.fast {
            flags |= call::FAST;
        }
        if ins.b & call::BLOCK != 0 {
            let section = resolution.signature.as_ref().and_then(|s| s.section.as_deref().cloned());
            if section.is_none() && !dynamic {
                return Err(InferenceError::control_flow("invalid code section").into());
            }
            let result = resolution.signature.as_ref().map(|s| s.return_type().clone());
            self.open_section(node, section, result)?;
        } else if ins.op == OpCode::Call && self.is_tail_call(node, ins.c) {
            flags |= call::TAIL;
            self.session.count_tail_call();
            debug!("{}: tail call at {}", self.slot.name, ins.span.line);
        }
        self.graph.get_mut(node).b = flags;
        Ok(())
    }

    fn callee_of(&self, ty: &Type) -> Result<Callee> {
        match ty.kind() {
            TypeKind::Routine(signature) => Ok(Callee::Signature(signature.clone())),
            TypeKind::Overloads(set) => Ok(Callee::Overloads(*set)),
            TypeKind::Object(class) => Ok(Callee::Class(*class)),
            _ if ty.is_loose() => Ok(Callee::Dynamic),
            _ => Err(InferenceError::not_callable(self.name(ty)).into()),
        }
    }

    /// A call outside every code section whose result the next instruction
    /// returns unchanged.
    fn is_tail_call(&self, node: NodeId, result: u16) -> bool {
        if !self.ledger.is_empty() || self.graph.get(node).c != result {
            return false;
        }
        self.next_kept(node).is_some_and(|next| {
            let next = self.graph.get(next);
            next.op == OpCode::Return && next.a == result && next.b == 1
        })
    }

    /// Push the frame of the code section following a block call.
    fn open_section(&mut self, node: NodeId, section: Option<RoutineType>, result: Option<Type>) -> Result<()> {
        let goto = self
            .graph
            .next(node)
            .filter(|&id| self.graph.get(id).op == OpCode::Goto)
            .ok_or_else(|| self.malformed(node, "block call is not followed by GOTO"))?;
        let sect = self
            .graph
            .next(goto)
            .filter(|&id| self.graph.get(id).op == OpCode::Sect)
            .ok_or_else(|| self.malformed(node, "block call has no SECT header"))?;
        let end = self.graph.get(goto).jump_true;
        let mut frame = Frame::new(node, Some(sect), end, section);
        if let Some(result) = result {
            frame = frame.with_result(result);
        }
        self.ledger.push(frame);
        Ok(())
    }

    /// Redefine a block call's result from the holder bindings its section
    /// returns made.
    pub(super) fn close_section(&mut self, frame: &Frame) -> Result<()> {
        let Some(result) = frame.bound_result() else {
            return Ok(());
        };
        let register = self.graph.get(frame.call).c;
        debug!(
            "{}: block call result r{register} redefined as {}",
            self.slot.name,
            self.name(&result)
        );
        if self.registers.is_declared(register) {
            return self.write(frame.call, register, result);
        }
        self.known.remove(&register);
        self.callees.remove(&register);
        let names = self.names();
        self.registers.refine(register, result, names)?;
        Ok(())
    }

    /// Replace a trailing tuple argument by its items. Returns `false` when
    /// the items are only known at run time.
    fn expand_tuple(&self, args: &mut Vec<Type>) -> Result<bool> {
        let Some(last) = args.pop() else {
            return Err(InferenceError::param("tuple expansion without an argument").into());
        };
        match last.kind() {
            TypeKind::Tuple(tuple) if !tuple.variadic => {
                args.extend(tuple.items.iter().map(|item| item.ty.clone()));
                Ok(true)
            }
            TypeKind::Tuple(_) => Ok(false),
            _ if last.is_loose() => Ok(false),
            _ => Err(InferenceError::param(format!("'{}' cannot be expanded into arguments", self.name(&last))).into()),
        }
    }

    /// `ROUTINE`: a closure over routine constant `a`, into `c`.
    pub(super) fn infer_closure(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let Value::Routine(id) = self.constant(node, ins.a)? else {
            return Err(self.malformed(node, "closure constant is not a routine"));
        };
        self.require_inferred(id)?;
        let signature = self
            .session
            .signature(id)
            .ok_or(FatalError::UnknownRoutine { routine: id })?;
        self.write(node, ins.c, Type::routine(signature))?;
        self.callees.insert(ins.c, id);
        Ok(())
    }

    /// `YIELD`: invoke the caller's code section with `a..a+count`.
    pub(super) fn infer_yield(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let Some(section) = self.slot.signature().section.map(|section| *section) else {
            return Err(InferenceError::control_flow("invalid yield in ordinary routine").into());
        };
        let mut args: Vec<Type> = self
            .register_range(node, ins.a, call::count(ins.b) as u16)?
            .map(|register| self.registers.ty(register))
            .collect();
        let mut known_args = true;
        if ins.b & call::EXPAR != 0 {
            known_args = self.expand_tuple(&mut args)?;
        }
        let callee = if known_args { Callee::Signature(section) } else { Callee::Dynamic };
        let resolution = self.resolver().resolve(callee, CallArgs::new(&args))?;
        self.write(node, ins.c, resolution.result)?;
        if resolution.fast {
            self.graph.get_mut(node).b |= call::FAST;
        }
        Ok(())
    }

    /// `SECT`: type the section parameters `a..a+b` from the block's
    /// signature.
    pub(super) fn infer_section(&mut self, node: NodeId, ins: Instruction) -> Result<()> {
        let Some(frame) = self.ledger.frame_for_section(node) else {
            return Err(InferenceError::control_flow("invalid code section").into());
        };
        let count = usize::from(ins.b);
        let params: Vec<Type> = match &frame.section {
            Some(section) => {
                if count > section.params.len() {
                    return Err(InferenceError::param(format!(
                        "code section takes {} parameters, {count} declared",
                        section.params.len()
                    ))
                    .into());
                }
                section.params[..count]
                    .iter()
                    .map(|param| {
                        let ty = match param.kind {
                            ParamKind::Variadic => Type::list(param.ty.clone()),
                            _ => param.ty.clone(),
                        };
                        if ty.is_parametric() { Type::any() } else { ty }
                    })
                    .collect()
            }
            None => vec![Type::any(); count],
        };

        let registers = self.register_range(node, ins.a, ins.b)?;
        let names = self.names();
        for (register, ty) in registers.zip(params) {
            self.registers.assign(register, ty, names)?;
        }
        Ok(())
    }
}
