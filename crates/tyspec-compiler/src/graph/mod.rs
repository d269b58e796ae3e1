//! Instruction graph: the mutable form of a routine's code during inference.
//!
//! Nodes live in a `la_arena::Arena` and form a doubly linked list in program
//! order. Jumps are explicit successor links rather than indices, so the pass
//! can insert conversion nodes and retire instructions without renumbering
//! anything until [`InstructionGraph::flatten`].
//!
//! ## Jump links
//!
//! | Opcode          | Link         |
//! |-----------------|--------------|
//! | `GOTO`, `CASE`  | `jump_true`  |
//! | `TEST*`         | `jump_false` |
//! | `SWITCH`        | `jump_false` (default target) |
//!
//! A link of `None` on a jumping node targets the end of the routine.

use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;

use tyspec_core::{FatalError, Span};

use crate::bytecode::{CodeChunk, Instruction, OpCode};

/// Handle of a node in the graph.
pub type NodeId = Idx<Inode>;

/// One instruction node.
#[derive(Debug, Clone)]
pub struct Inode {
    pub op: OpCode,
    pub a: u16,
    pub b: u16,
    pub c: u16,
    /// Index of the flat instruction this node originates from.
    pub block: usize,
    pub span: Span,
    pub prev: Option<NodeId>,
    pub next: Option<NodeId>,
    pub jump_true: Option<NodeId>,
    pub jump_false: Option<NodeId>,
    /// The node most recently inserted before this one.
    pub extra: Option<NodeId>,
}

impl Inode {
    fn from_instruction(instruction: &Instruction, block: usize) -> Self {
        Self {
            op: instruction.op,
            a: instruction.a,
            b: instruction.b,
            c: instruction.c,
            block,
            span: instruction.span,
            prev: None,
            next: None,
            jump_true: None,
            jump_false: None,
            extra: None,
        }
    }

    /// The jump target of a jumping node.
    pub fn target(&self) -> Option<NodeId> {
        match self.op {
            OpCode::Goto | OpCode::Case => self.jump_true,
            _ => self.jump_false,
        }
    }

    pub fn instruction(&self) -> Instruction {
        Instruction::new(self.op, self.a, self.b, self.c).at(self.span)
    }
}

/// Flat code produced by [`InstructionGraph::flatten`].
#[derive(Debug, Clone)]
pub struct Flattened {
    pub code: CodeChunk,
    positions: FxHashMap<NodeId, usize>,
}

impl Flattened {
    /// Flat index of a node. A dropped node maps to the instruction that
    /// replaced it in sequence.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.positions.get(&node).copied()
    }
}

/// Arena-backed, doubly linked instruction list.
#[derive(Debug, Clone, Default)]
pub struct InstructionGraph {
    nodes: Arena<Inode>,
    first: Option<NodeId>,
    last: Option<NodeId>,
    /// Node created for each flat instruction, by block index.
    heads: Vec<NodeId>,
    len: usize,
}

impl InstructionGraph {
    /// Build the graph from flat code.
    ///
    /// `GETMI`/`SETMI` with a single index are folded into `GETI`/`SETI`.
    pub fn from_flat_code(routine: &str, codes: &[Instruction]) -> Result<Self, FatalError> {
        let mut graph = InstructionGraph::default();
        for (index, instruction) in codes.iter().enumerate() {
            let mut node = Inode::from_instruction(instruction, index);
            fold_multi_index(&mut node).ok_or_else(|| FatalError::MalformedCode {
                routine: routine.to_string(),
                index,
                message: format!("index register after {} overflows", instruction.a.max(instruction.c)),
            })?;
            let id = graph.nodes.alloc(node);
            graph.append(id);
            graph.heads.push(id);
        }

        for (index, instruction) in codes.iter().enumerate() {
            if !instruction.op.has_jump() {
                continue;
            }
            let target = usize::from(instruction.b);
            let link = match target {
                t if t < codes.len() => Some(graph.heads[t]),
                t if t == codes.len() => None,
                _ => {
                    return Err(FatalError::MalformedCode {
                        routine: routine.to_string(),
                        index,
                        message: format!("jump target {target} out of range"),
                    });
                }
            };
            let node = &mut graph.nodes[graph.heads[index]];
            match instruction.op {
                OpCode::Goto | OpCode::Case => node.jump_true = link,
                _ => node.jump_false = link,
            }
        }
        Ok(graph)
    }

    fn append(&mut self, id: NodeId) {
        self.nodes[id].prev = self.last;
        match self.last {
            Some(last) => self.nodes[last].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
        self.len += 1;
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn next(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].next
    }

    pub fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    pub fn get(&self, id: NodeId) -> &Inode {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Inode {
        &mut self.nodes[id]
    }

    /// The node created for flat instruction `block`.
    pub fn head(&self, block: usize) -> Option<NodeId> {
        self.heads.get(block).copied()
    }

    /// Number of linked nodes, retired ones included.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Node ids in program order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.len);
        let mut current = self.first;
        while let Some(id) = current {
            ids.push(id);
            current = self.nodes[id].next;
        }
        ids
    }

    /// Splice a new node in immediately before `node`.
    ///
    /// The new node shares `node`'s block index and span and is recorded as
    /// `node`'s `extra`.
    pub fn insert_before(&mut self, node: NodeId, op: OpCode, a: u16, b: u16, c: u16) -> NodeId {
        let (block, span, prev) = {
            let n = &self.nodes[node];
            (n.block, n.span, n.prev)
        };
        let id = self.nodes.alloc(Inode {
            op,
            a,
            b,
            c,
            block,
            span,
            prev,
            next: Some(node),
            jump_true: None,
            jump_false: None,
            extra: None,
        });
        match prev {
            Some(p) => self.nodes[p].next = Some(id),
            None => self.first = Some(id),
        }
        let n = &mut self.nodes[node];
        n.prev = Some(id);
        n.extra = Some(id);
        self.len += 1;
        id
    }

    /// Splice a new node in immediately after `node`, sharing its block.
    pub fn insert_after(&mut self, node: NodeId, op: OpCode, a: u16, b: u16, c: u16) -> NodeId {
        let (block, span, next) = {
            let n = &self.nodes[node];
            (n.block, n.span, n.next)
        };
        let id = self.nodes.alloc(Inode {
            op,
            a,
            b,
            c,
            block,
            span,
            prev: Some(node),
            next,
            jump_true: None,
            jump_false: None,
            extra: None,
        });
        match next {
            Some(n) => self.nodes[n].prev = Some(id),
            None => self.last = Some(id),
        }
        self.nodes[node].next = Some(id);
        self.len += 1;
        id
    }

    /// Retire a node; it is dropped on flattening.
    pub fn set_unused(&mut self, node: NodeId) {
        let n = &mut self.nodes[node];
        n.op = OpCode::Unused;
        n.jump_true = None;
        n.jump_false = None;
    }

    /// Turn a node into an unconditional jump.
    pub fn set_goto(&mut self, node: NodeId, target: Option<NodeId>) {
        let n = &mut self.nodes[node];
        n.op = OpCode::Goto;
        n.a = 0;
        n.c = 0;
        n.jump_true = target;
        n.jump_false = None;
    }

    /// Convert back into flat code.
    ///
    /// Jump targets are rewound to the first node sharing the target's block
    /// index, so conversions inserted before a jump target run on every path
    /// into it. `Unused` nodes are dropped.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn flatten(&self, routine: &str, registers: usize) -> Result<Flattened, FatalError> {
        let limit = usize::from(u16::MAX);
        if registers > limit {
            return Err(FatalError::RegisterOverflow {
                routine: routine.to_string(),
                count: registers,
                limit,
            });
        }

        let order = self.node_ids();
        let mut block_first: FxHashMap<usize, NodeId> = FxHashMap::default();
        let mut positions: FxHashMap<NodeId, usize> = FxHashMap::default();
        let mut kept = 0usize;
        for &id in &order {
            let node = &self.nodes[id];
            block_first.entry(node.block).or_insert(id);
            positions.insert(id, kept);
            if node.op != OpCode::Unused {
                kept += 1;
            }
        }
        if kept > limit {
            return Err(FatalError::InstructionOverflow {
                routine: routine.to_string(),
                count: kept,
                limit,
            });
        }

        let resolve = |target: Option<NodeId>| -> u16 {
            let index = target
                .map(|t| block_first.get(&self.nodes[t].block).copied().unwrap_or(t))
                .and_then(|t| positions.get(&t).copied())
                .unwrap_or(kept);
            index as u16
        };

        let mut code = CodeChunk::with_capacity(kept);
        for &id in &order {
            let node = &self.nodes[id];
            if node.op == OpCode::Unused {
                continue;
            }
            let mut instruction = node.instruction();
            if node.op.has_jump() {
                instruction.b = resolve(node.target());
            }
            code.push(instruction);
        }
        Ok(Flattened { code, positions })
    }
}

/// Returns `None` when the index register cannot be encoded.
fn fold_multi_index(node: &mut Inode) -> Option<()> {
    match node.op {
        OpCode::GetMI if node.b == 1 => {
            node.b = node.a.checked_add(1)?;
            node.op = OpCode::GetI;
        }
        OpCode::SetMI if node.b == 1 => {
            node.b = node.c.checked_add(1)?;
            node.op = OpCode::SetI;
        }
        _ => {}
    }
    Some(())
}
