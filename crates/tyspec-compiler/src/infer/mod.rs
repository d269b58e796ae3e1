//! The inference driver.
//!
//! [`InferenceDriver`] makes one forward pass over a routine's instruction
//! graph. For every instruction it reads the operand types, checks the
//! operation, types the destination register and rewrites the opcode into
//! its specialized form where the operand types allow it. Conversions the
//! specialized form needs are spliced in as separate nodes.
//!
//! Handlers are grouped by opcode class:
//!
//! - [`moves`] - constants, loads, moves and casts
//! - [`arith`] - unary, binary and membership operators
//! - [`items`] - container literals, item and field access
//! - [`call`] - calls, closures, yields and code sections
//! - [`returns`] - returns and the routine's return type
//! - [`switch`] - switches and tests
//!
//! Recoverable errors are recorded against their node. In normal mode the
//! first one ends the pass; in silent mode the pass goes on with the next
//! instruction. Either way the graph is flattened and every error is
//! rendered with a snippet of the final code.

mod arith;
mod call;
mod items;
mod ledger;
mod moves;
mod registers;
mod returns;
mod switch;

pub use registers::{RegisterFile, RegisterState};

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;

use log::{debug, trace};
use rustc_hash::FxHashMap;

use tyspec_core::{
    Diagnostics, FatalError, InferenceError, ParamKind, PassError, RoutineId, Type, TypeNames, Value,
};

use crate::bytecode::{Instruction, OpCode, operand};
use crate::diagnostics;
use crate::graph::{InstructionGraph, NodeId};
use crate::lattice::{OpsContext, SubstitutionMap, TypeMatcher, specialize};
use crate::overload::OverloadResolver;
use crate::routine::{InferredRoutine, RoutineAttrs};
use crate::session::{RoutineSlot, Session};

use ledger::{Frame, Ledger};

type Result<T> = std::result::Result<T, PassError>;

/// Infers and specializes one routine.
pub(crate) struct InferenceDriver<'s, 'r> {
    session: &'s Session<'r>,
    slot: Arc<RoutineSlot>,
    graph: InstructionGraph,
    registers: RegisterFile,
    constants: Vec<Value>,
    /// Number of instructions writing each register.
    writes: FxHashMap<u16, usize>,
    /// Registers written once, by a constant load.
    known: FxHashMap<u16, Value>,
    /// Registers holding a routine known at compile time.
    callees: FxHashMap<u16, RoutineId>,
    ledger: Ledger,
    /// Holder bindings made through declared registers.
    base: SubstitutionMap,
    /// Routine return type; open until the first return fixes it.
    ret: Type,
    returned: bool,
    nested: VecDeque<(RoutineId, usize)>,
    errors: Vec<(Option<NodeId>, InferenceError)>,
}

impl<'s, 'r> InferenceDriver<'s, 'r> {
    pub(crate) fn new(session: &'s Session<'r>, slot: Arc<RoutineSlot>) -> Self {
        let source = Arc::clone(&slot.source);
        let signature = slot.signature();

        let mut registers = RegisterFile::new(source.register_count());
        for (index, param) in signature.params.iter().enumerate() {
            let ty = match param.kind {
                ParamKind::Variadic => Type::list(param.ty.clone()),
                _ => param.ty.clone(),
            };
            registers.declare(index as u16, ty);
        }
        for (index, preset) in source.registers.iter().enumerate() {
            if let Some(ty) = preset {
                registers.declare(index as u16, ty.clone());
            }
        }
        for (register, ty) in &source.declarations {
            registers.declare(*register, ty.clone());
        }

        let mut nested: Vec<(RoutineId, usize)> = source.nested.clone();
        nested.sort_by_key(|(_, definition)| *definition);

        Self {
            session,
            constants: source.constants.clone(),
            ret: (*signature.ret).clone(),
            slot,
            graph: InstructionGraph::default(),
            registers,
            writes: FxHashMap::default(),
            known: FxHashMap::default(),
            callees: FxHashMap::default(),
            ledger: Ledger::default(),
            base: SubstitutionMap::default(),
            returned: false,
            nested: nested.into(),
            errors: Vec::new(),
        }
    }

    /// Run the pass and produce the inferred routine.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(crate) fn run(mut self) -> std::result::Result<InferredRoutine, FatalError> {
        let source = Arc::clone(&self.slot.source);
        self.graph = InstructionGraph::from_flat_code(&self.slot.name, source.code.as_slice())?;
        self.count_writes();

        let mut stopped = false;
        if let Err(error) = self.check_main() {
            stopped = self.record(self.graph.first(), error)?;
        }

        let mut cursor = if stopped { None } else { self.graph.first() };
        while let Some(node) = cursor {
            let next = self.graph.next(node);
            let closed = self.ledger.close(node);
            if self.close_sections(closed)? {
                stopped = true;
                break;
            }
            let outcome = self.define_nested(node).and_then(|()| self.step(node));
            if let Err(error) = outcome
                && self.record(Some(node), error)?
            {
                stopped = true;
                break;
            }
            cursor = next;
        }

        if !stopped {
            let closed = self.ledger.close_all();
            stopped = self.close_sections(closed)?;
        }
        if !stopped && let Err(error) = self.finish_returns() {
            self.record(self.graph.last(), error)?;
        }
        self.finish()
    }

    fn step(&mut self, node: NodeId) -> Result<()> {
        let ins = self.graph.get(node).instruction();
        trace!("{} [{}] {}", self.slot.name, self.graph.get(node).block, ins);
        self.check_const(&ins)?;
        match ins.op {
            OpCode::GetCl => self.infer_constant(node, ins),
            OpCode::Load => self.infer_load(node, ins),
            OpCode::Move => self.infer_move(node, ins),
            OpCode::Cast => self.infer_cast(node, ins),
            OpCode::Not | OpCode::Minus | OpCode::Tilde | OpCode::Size => self.infer_unary(node, ins),
            OpCode::In => self.infer_membership(node, ins),
            op if op.is_binary() => self.infer_binary(node, ins),
            OpCode::Tuple | OpCode::List | OpCode::Array | OpCode::Map => self.infer_literal(node, ins),
            OpCode::GetI | OpCode::GetMI => self.infer_get_item(node, ins),
            OpCode::SetI | OpCode::SetMI => self.infer_set_item(node, ins),
            OpCode::GetF => self.infer_get_field(node, ins),
            OpCode::SetF => self.infer_set_field(node, ins),
            OpCode::Call | OpCode::MCall => self.infer_call(node, ins),
            OpCode::Routine => self.infer_closure(node, ins),
            OpCode::Return => self.infer_return(node, ins),
            OpCode::Yield => self.infer_yield(node, ins),
            OpCode::Sect => self.infer_section(node, ins),
            OpCode::Switch => self.infer_switch(node, ins),
            OpCode::Test => self.infer_test(node, ins),
            // Jumps, case entries and already specialized instructions.
            _ => Ok(()),
        }
    }

    /// Checks made before dispatch: writes through invariable values.
    fn check_const(&self, ins: &Instruction) -> Result<()> {
        match ins.op {
            OpCode::SetF if self.slot.attribs.contains(RoutineAttrs::INVAR) && self.is_self(ins.c) => {
                Err(InferenceError::const_violation("invariable method cannot modify its receiver").into())
            }
            OpCode::SetI | OpCode::SetMI | OpCode::SetF if self.registers.ty(ins.c).is_invariable() => Err(
                InferenceError::const_violation(format!("'{}' is invariable", self.name(&self.registers.ty(ins.c))))
                    .into(),
            ),
            OpCode::Move if ins.b & operand::decl::ASSIGN != 0 && self.registers.ty(ins.c).is_invariable() => {
                Err(InferenceError::const_violation("assignment to an invariable variable").into())
            }
            _ => Ok(()),
        }
    }

    /// Redefine the results of block calls whose sections just ended.
    /// Returns whether the pass must stop.
    fn close_sections(&mut self, frames: Vec<Frame>) -> std::result::Result<bool, FatalError> {
        for frame in frames {
            if let Err(error) = self.close_section(&frame)
                && self.record(Some(frame.call), error)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Record an error. Returns whether the pass must stop.
    fn record(&mut self, node: Option<NodeId>, error: PassError) -> std::result::Result<bool, FatalError> {
        let error = match error {
            PassError::Fatal(fatal) => return Err(fatal),
            PassError::Inference(error) => error,
        };
        let span = node.map(|n| self.graph.get(n).span).unwrap_or_default();
        let error = error.at(span);
        debug!("{}: {error}", self.slot.name);
        self.errors.push((node, error));
        Ok(!self.session.config().is_silent())
    }

    fn finish(self) -> std::result::Result<InferredRoutine, FatalError> {
        let name = self.slot.name.clone();
        let flat = self.graph.flatten(&name, self.registers.len())?;
        let context = self.session.config().context_lines();

        let mut records = Diagnostics::new();
        for (node, error) in &self.errors {
            let position = node.and_then(|n| flat.position(n));
            let diagnostic = diagnostics::render(&name, error, &flat.code, position, context);
            self.session.report(&diagnostic);
            records.push(diagnostic);
        }

        Ok(InferredRoutine {
            id: self.slot.id,
            name,
            signature: self.slot.signature(),
            registers: self.registers.into_types(),
            code: flat.code,
            constants: self.constants,
            success: records.is_empty(),
            diagnostics: records,
        })
    }

    // ==========================================================================
    // Shared helpers
    // ==========================================================================

    fn count_writes(&mut self) {
        for id in self.graph.node_ids() {
            let node = self.graph.get(id);
            if node.op.writes_c() {
                *self.writes.entry(node.c).or_default() += 1;
            }
        }
    }

    /// Infer nested routines defined at `node`'s instruction.
    fn define_nested(&mut self, node: NodeId) -> Result<()> {
        let block = self.graph.get(node).block;
        if self.graph.head(block) != Some(node) {
            return Ok(());
        }
        while let Some(&(routine, definition)) = self.nested.front()
            && definition <= block
        {
            self.nested.pop_front();
            debug!("{}: nested routine {routine} defined at {definition}", self.slot.name);
            self.require_inferred(routine)?;
        }
        Ok(())
    }

    /// Infer a routine this one defines; a body that does not type fails
    /// the definition.
    fn require_inferred(&self, routine: RoutineId) -> Result<()> {
        if let Some(inferred) = self.session.ensure_inferred(routine)?
            && !inferred.success
        {
            return Err(InferenceError::control_flow(format!("nested routine '{}' failed inference", inferred.name)).into());
        }
        Ok(())
    }

    fn names(&self) -> &'r dyn TypeNames {
        self.session.registry()
    }

    fn name(&self, ty: &Type) -> String {
        ty.named(self.session.registry()).to_string()
    }

    fn matcher(&self) -> TypeMatcher<'r> {
        self.session.matcher()
    }

    fn resolver(&self) -> OverloadResolver<'s, 'r> {
        OverloadResolver::new(self.session, self.slot.host)
    }

    fn ops(&self) -> OpsContext<'_> {
        OpsContext {
            matcher: self.session.matcher(),
            methods: self.session,
            host: self.slot.host,
            in_constructor: self.slot.attribs.contains(RoutineAttrs::INITOR),
        }
    }

    /// The substitution map in effect: declared bindings plus the innermost
    /// code section's.
    fn subst(&self) -> SubstitutionMap {
        let mut subst = self.base.clone();
        if let Some(frame) = self.ledger.innermost() {
            subst.extend(frame.subst.iter().map(|(k, v)| (*k, v.clone())));
        }
        subst
    }

    /// Whether `register` holds the receiver of a method.
    fn is_self(&self, register: u16) -> bool {
        register == 0 && self.slot.signature().has_self()
    }

    fn self_type(&self) -> Option<Type> {
        self.slot.signature().has_self().then(|| self.registers.ty(0))
    }

    fn constant(&self, node: NodeId, index: u16) -> Result<Value> {
        self.constants
            .get(usize::from(index))
            .cloned()
            .ok_or_else(|| self.malformed(node, format!("constant {index} out of range")))
    }

    fn malformed(&self, node: NodeId, message: impl Into<String>) -> PassError {
        FatalError::MalformedCode {
            routine: self.slot.name.clone(),
            index: self.graph.get(node).block,
            message: message.into(),
        }
        .into()
    }

    /// Registers `start..start + count` named by `node`.
    fn register_range(&self, node: NodeId, start: u16, count: u16) -> Result<Range<u16>> {
        let end = start
            .checked_add(count)
            .ok_or_else(|| self.malformed(node, format!("{count} registers from {start} overflow")))?;
        Ok(start..end)
    }

    /// The register right after `register`.
    fn register_after(&self, node: NodeId, register: u16) -> Result<u16> {
        register
            .checked_add(1)
            .ok_or_else(|| self.malformed(node, format!("no register after {register}")))
    }

    /// The next node that will execute after `node`.
    fn next_kept(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = self.graph.next(node);
        while let Some(id) = cursor {
            if !matches!(self.graph.get(id).op, OpCode::Unused | OpCode::Nop) {
                return Some(id);
            }
            cursor = self.graph.next(id);
        }
        None
    }

    /// Type the destination of `node`.
    ///
    /// A declared register must accept the value, with numeric widening
    /// spliced in after `node`; an open register adopts the value's type.
    fn write(&mut self, node: NodeId, register: u16, ty: Type) -> Result<()> {
        self.known.remove(&register);
        self.callees.remove(&register);

        if self.registers.is_declared(register) {
            let mut subst = self.subst();
            let declared = specialize(&self.registers.ty(register), &subst);
            let rank = self.matcher().match_type(&ty, &declared, &mut subst);
            if !rank.is_match() {
                return Err(InferenceError::mismatch(self.name(&ty), self.name(&declared)).into());
            }
            if declared.is_parametric() {
                for (holder, bound) in subst {
                    self.base.entry(holder).or_insert(bound);
                }
                let resolved = specialize(&declared, &self.subst());
                let names = self.names();
                self.registers.assign(register, resolved, names)?;
            }
            self.convert_result(node, register, &ty, &declared);
            return Ok(());
        }

        if let Some(existing) = self.registers.get(register).cloned()
            && widens(&ty, &existing)
        {
            self.convert_result(node, register, &ty, &existing);
            return Ok(());
        }
        let names = self.names();
        self.registers.assign(register, ty, names)?;
        Ok(())
    }

    /// Route a narrower numeric result through a widening move.
    fn convert_result(&mut self, node: NodeId, register: u16, from: &Type, to: &Type) {
        if !widens(from, to) || self.graph.get(node).c != register {
            return;
        }
        let (Some(to_rank), Some(from_rank)) = (to.numeric_rank(), from.numeric_rank()) else {
            return;
        };
        let Some(op) = OpCode::numeric_move(to_rank, from_rank) else {
            return;
        };
        let temp = self.registers.allocate(from.unqualified());
        self.graph.get_mut(node).c = temp;
        self.graph.insert_after(node, op, temp, 0, register);
    }

    /// Widen a numeric operand to `to` before `node`. Returns the register
    /// holding the widened value.
    fn widen(&mut self, node: NodeId, register: u16, to: &Type) -> u16 {
        let from = self.registers.ty(register);
        let (Some(to_rank), Some(from_rank)) = (to.numeric_rank(), from.numeric_rank()) else {
            return register;
        };
        if to_rank <= from_rank {
            return register;
        }
        let Some(op) = OpCode::numeric_move(to_rank, from_rank) else {
            return register;
        };
        let temp = self.registers.allocate(to.unqualified());
        self.graph.insert_before(node, op, register, 0, temp);
        temp
    }

    /// Unwrap an optional `T|none` operand through a cast to `T`.
    fn untag(&mut self, node: NodeId, register: u16) -> (u16, Type) {
        let ty = self.registers.ty(register);
        match ty.untagged() {
            Some(inner) => {
                let inner = inner.clone();
                let temp = self.registers.allocate(inner.clone());
                self.graph.insert_before(node, OpCode::Cast, register, 0, temp);
                (temp, inner)
            }
            None => (register, ty),
        }
    }

    /// Type of an operand that cannot be moved to a fresh register, with an
    /// optional tag removed. The run-time check stays with the instruction.
    fn fixed_operand(&self, register: u16) -> Type {
        let ty = self.registers.ty(register);
        ty.untagged().cloned().unwrap_or(ty)
    }
}

/// Whether `from` widens numerically into `to`.
fn widens(from: &Type, to: &Type) -> bool {
    matches!((from.numeric_rank(), to.numeric_rank()), (Some(f), Some(t)) if f < t)
}
