//! The return ledger.
//!
//! A block call opens a frame covering its code section. Returns inside the
//! frame hand a value back to the callee's `YIELD` and are checked against
//! the section's return type; returns outside every frame return from the
//! routine itself. Holders those returns bind are applied to the callee's
//! return type when the frame closes.

use tyspec_core::{RoutineType, Type};

use crate::graph::NodeId;
use crate::lattice::{SubstitutionMap, specialize};

#[derive(Debug, Clone)]
pub struct Frame {
    /// The block call that opened the frame.
    pub call: NodeId,
    /// The `SECT` header of the section.
    pub sect: Option<NodeId>,
    /// First node after the section; `None` for the end of the routine.
    pub end: Option<NodeId>,
    /// Section signature; `None` when the callee is only known at run time.
    pub section: Option<RoutineType>,
    /// Holder bindings made inside the section.
    pub subst: SubstitutionMap,
    /// Type of the first return seen inside the section.
    pub returned: Option<Type>,
    /// Declared return type of the callee, redefined from `subst` when the
    /// frame closes.
    pub result: Option<Type>,
}

impl Frame {
    pub fn new(call: NodeId, sect: Option<NodeId>, end: Option<NodeId>, section: Option<RoutineType>) -> Self {
        Self {
            call,
            sect,
            end,
            section,
            subst: SubstitutionMap::default(),
            returned: None,
            result: None,
        }
    }

    pub fn with_result(mut self, result: Type) -> Self {
        self.result = Some(result);
        self
    }

    /// The call result once the section's bindings are known. `None` while
    /// it is still open.
    pub fn bound_result(&self) -> Option<Type> {
        let result = self.result.as_ref()?;
        if !result.is_parametric() || self.subst.is_empty() {
            return None;
        }
        Some(specialize(result, &self.subst)).filter(|ty| !ty.is_parametric())
    }

    /// The type returns inside the section must produce.
    pub fn expected(&self) -> Type {
        match &self.section {
            Some(section) => specialize(&section.ret, &self.subst),
            None => Type::any(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    frames: Vec<Frame>,
}

impl Ledger {
    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop every frame whose section ends at `node`.
    pub fn close(&mut self, node: NodeId) -> Vec<Frame> {
        let mut closed = Vec::new();
        while self.frames.last().is_some_and(|frame| frame.end == Some(node)) {
            closed.extend(self.frames.pop());
        }
        closed
    }

    /// Pop every frame still open at the end of the routine.
    pub fn close_all(&mut self) -> Vec<Frame> {
        let mut closed = std::mem::take(&mut self.frames);
        closed.reverse();
        closed
    }

    pub fn innermost(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn innermost_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// The open frame whose section starts at `sect`.
    pub fn frame_for_section(&self, sect: NodeId) -> Option<&Frame> {
        self.frames.iter().rev().find(|frame| frame.sect == Some(sect))
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{HolderId, Param};

    use crate::bytecode::{Instruction, OpCode};
    use crate::graph::InstructionGraph;

    fn nodes(count: usize) -> Vec<NodeId> {
        let code = vec![Instruction::new(OpCode::Nop, 0, 0, 0); count];
        InstructionGraph::from_flat_code("t", &code).unwrap().node_ids()
    }

    #[test]
    fn frames_close_at_their_end() {
        let ids = nodes(4);
        let mut ledger = Ledger::default();
        ledger.push(Frame::new(ids[0], Some(ids[1]), Some(ids[3]), None));
        ledger.push(Frame::new(ids[1], Some(ids[2]), Some(ids[3]), None));
        assert_eq!(ledger.depth(), 2);
        assert!(ledger.close(ids[2]).is_empty());
        assert_eq!(ledger.close(ids[3]).len(), 2);
        assert!(ledger.is_empty());
    }

    #[test]
    fn expected_type_follows_section_bindings() {
        let ids = nodes(2);
        let t = Type::holder(HolderId::new(0), "T");
        let section = RoutineType::new(vec![Param::new("x", Type::int())], t);
        let mut frame = Frame::new(ids[0], Some(ids[1]), None, Some(section));
        assert!(frame.expected().is_holder());
        frame.subst.insert(HolderId::new(0), Type::string());
        assert_eq!(frame.expected(), Type::string());
        let dynamic = Frame::new(ids[0], None, None, None);
        assert!(dynamic.expected().is_any());
    }

    #[test]
    fn section_bindings_fix_the_call_result() {
        let ids = nodes(2);
        let u = Type::holder(HolderId::new(1), "U");
        let section = RoutineType::new(vec![], u.clone());
        let mut frame = Frame::new(ids[0], Some(ids[1]), None, Some(section)).with_result(Type::list(u));
        assert_eq!(frame.bound_result(), None);
        frame.subst.insert(HolderId::new(1), Type::int());
        assert_eq!(frame.bound_result(), Some(Type::list(Type::int())));

        let concrete = Frame::new(ids[0], None, None, None).with_result(Type::int());
        assert_eq!(concrete.bound_result(), None);
    }

    #[test]
    fn frames_left_open_close_at_the_end() {
        let ids = nodes(3);
        let mut ledger = Ledger::default();
        ledger.push(Frame::new(ids[0], Some(ids[1]), None, None));
        ledger.push(Frame::new(ids[1], Some(ids[2]), None, None));
        let closed = ledger.close_all();
        assert_eq!(closed.iter().map(|f| f.call).collect::<Vec<_>>(), vec![ids[1], ids[0]]);
        assert!(ledger.is_empty());
    }

    #[test]
    fn sections_are_found_by_header() {
        let ids = nodes(3);
        let mut ledger = Ledger::default();
        ledger.push(Frame::new(ids[0], Some(ids[1]), None, None));
        assert!(ledger.frame_for_section(ids[1]).is_some());
        assert!(ledger.frame_for_section(ids[2]).is_none());
    }
}
