//! Builders for assembling routines in scenario tests.

#![allow(dead_code)]

use std::sync::Arc;

use tyspec::prelude::*;

/// Builds a [`Routine`] one instruction at a time.
pub struct RoutineBuilder {
    name: String,
    params: Vec<Param>,
    ret: Type,
    registers: usize,
    constants: Vec<Value>,
    code: Vec<Instruction>,
    attribs: RoutineAttrs,
    declarations: Vec<(u16, Type)>,
}

impl RoutineBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            params: Vec::new(),
            ret: Type::none(),
            registers: 0,
            constants: Vec::new(),
            code: Vec::new(),
            attribs: RoutineAttrs::empty(),
            declarations: Vec::new(),
        }
    }

    pub fn param(mut self, ty: Type) -> Self {
        let name = format!("p{}", self.params.len());
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn self_param(mut self, ty: Type) -> Self {
        self.params.push(Param::self_param(ty));
        self
    }

    pub fn returns(mut self, ty: Type) -> Self {
        self.ret = ty;
        self
    }

    pub fn registers(mut self, count: usize) -> Self {
        self.registers = count;
        self
    }

    pub fn attribs(mut self, attribs: RoutineAttrs) -> Self {
        self.attribs |= attribs;
        self
    }

    pub fn declare(mut self, register: u16, ty: Type) -> Self {
        self.declarations.push((register, ty));
        self
    }

    /// Add a constant and return its index.
    pub fn constant(&mut self, value: Value) -> u16 {
        self.constants.push(value);
        (self.constants.len() - 1) as u16
    }

    pub fn op(mut self, op: OpCode, a: u16, b: u16, c: u16) -> Self {
        let line = self.code.len() as u32 + 1;
        self.code.push(Instruction::new(op, a, b, c).at(Span::line(line)));
        self
    }

    /// `GETCL` of a fresh constant into `target`.
    pub fn load_constant(mut self, value: Value, target: u16) -> Self {
        let index = self.constant(value);
        self.op(OpCode::GetCl, 0, index, target)
    }

    pub fn ret(self, register: u16) -> Self {
        self.op(OpCode::Return, register, 1, 0)
    }

    pub fn ret_none(self) -> Self {
        self.op(OpCode::Return, 0, 0, 0)
    }

    pub fn build(self) -> Routine {
        let signature = RoutineType::new(self.params, self.ret);
        let mut routine = Routine::new(self.name, signature)
            .with_attribs(self.attribs)
            .with_constants(self.constants)
            .with_code(self.code)
            .with_register_count(self.registers);
        for (register, ty) in self.declarations {
            routine = routine.with_declaration(register, ty);
        }
        routine
    }
}

/// A bare routine with the given signature and no code.
pub fn declared(name: &str, params: Vec<Type>, ret: Type) -> Routine {
    params
        .into_iter()
        .fold(RoutineBuilder::new(name), RoutineBuilder::param)
        .returns(ret)
        .build()
}

/// `id<T>(x: T): T`.
pub fn identity(session: &Session<'_>) -> RoutineId {
    let t = Type::holder(HolderId::new(0), "T");
    session.add_routine(RoutineBuilder::new("id").param(t.clone()).returns(t).ret(0).build())
}

pub fn infer(session: &Session<'_>, routine: Routine) -> Arc<InferredRoutine> {
    let id = session.add_routine(routine);
    session.infer(id).expect("routine aborted")
}

pub fn infer_alone(routine: Routine) -> Arc<InferredRoutine> {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    infer(&session, routine)
}

pub fn error_kinds(inferred: &InferredRoutine) -> Vec<ErrorKind> {
    inferred.diagnostics.iter().map(|d| d.kind).collect()
}
