//! Routine descriptors: what the front-end hands in and what inference
//! hands back.

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use tyspec_core::{ClassId, Diagnostics, RoutineId, RoutineType, Type, Value};
use tyspec_registry::Visibility;

use crate::bytecode::CodeChunk;

bitflags! {
    /// Routine attributes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RoutineAttrs: u8 {
        /// Program entry point; must return `int`.
        const MAIN = 1 << 0;
        /// Method that may not modify its receiver.
        const INVAR = 1 << 1;
        /// Class constructor.
        const INITOR = 1 << 2;
    }
}

/// A routine as produced by the front-end.
#[derive(Debug, Clone)]
pub struct Routine {
    pub name: String,
    pub attribs: RoutineAttrs,
    pub visibility: Visibility,
    /// Class the routine is a method or constructor of.
    pub host: Option<ClassId>,
    /// May contain type holders.
    pub signature: RoutineType,
    pub constants: Vec<Value>,
    pub code: CodeChunk,
    /// Initial register types; `None` leaves a register open.
    pub registers: Vec<Option<Type>>,
    /// Declared types of variables, by register.
    pub declarations: FxHashMap<u16, Type>,
    /// Nested routines and the instruction index at which each is defined.
    pub nested: Vec<(RoutineId, usize)>,
}

impl Routine {
    pub fn new(name: impl Into<String>, signature: RoutineType) -> Self {
        let registers = vec![None; signature.params.len()];
        Self {
            name: name.into(),
            attribs: RoutineAttrs::empty(),
            visibility: Visibility::Public,
            host: None,
            signature,
            constants: Vec::new(),
            code: CodeChunk::new(),
            registers,
            declarations: FxHashMap::default(),
            nested: Vec::new(),
        }
    }

    pub fn with_attribs(mut self, attribs: RoutineAttrs) -> Self {
        self.attribs |= attribs;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_host(mut self, host: ClassId) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_constants(mut self, constants: Vec<Value>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_code(mut self, code: impl Into<CodeChunk>) -> Self {
        self.code = code.into();
        self
    }

    /// Grow the register file to at least `count` registers.
    pub fn with_register_count(mut self, count: usize) -> Self {
        if self.registers.len() < count {
            self.registers.resize(count, None);
        }
        self
    }

    /// Preset the type of one register, growing the file as needed.
    pub fn with_register(mut self, register: u16, ty: Type) -> Self {
        let index = usize::from(register);
        self = self.with_register_count(index + 1);
        self.registers[index] = Some(ty);
        self
    }

    /// Declare the type of a variable register.
    pub fn with_declaration(mut self, register: u16, ty: Type) -> Self {
        self.declarations.insert(register, ty);
        self
    }

    /// Attach a nested routine defined at instruction `definition`.
    pub fn with_nested(mut self, routine: RoutineId, definition: usize) -> Self {
        self.nested.push((routine, definition));
        self
    }

    /// Append a constant and return its index.
    pub fn add_constant(&mut self, value: Value) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    pub fn param_count(&self) -> usize {
        self.signature.params.len()
    }

    pub fn register_count(&self) -> usize {
        self.registers.len()
    }

    pub fn is_main(&self) -> bool {
        self.attribs.contains(RoutineAttrs::MAIN)
    }

    pub fn is_constructor(&self) -> bool {
        self.attribs.contains(RoutineAttrs::INITOR)
    }

    pub fn is_invariable(&self) -> bool {
        self.attribs.contains(RoutineAttrs::INVAR)
    }
}

/// The result of inferring one routine.
#[derive(Debug, Clone)]
pub struct InferredRoutine {
    pub id: RoutineId,
    pub name: String,
    /// Final signature, with the return type fixed.
    pub signature: RoutineType,
    /// Final register types; registers never written are `any`.
    pub registers: Vec<Type>,
    /// Specialized flat code.
    pub code: CodeChunk,
    /// Constant pool, including constants appended by the pass.
    pub constants: Vec<Value>,
    pub success: bool,
    pub diagnostics: Diagnostics,
}

impl InferredRoutine {
    pub fn register(&self, register: u16) -> Option<&Type> {
        self.registers.get(usize::from(register))
    }

    pub fn return_type(&self) -> &Type {
        self.signature.return_type()
    }
}
