//! The register file of the routine being inferred.
//!
//! Registers are typed once. A register starts `Unset` (or preset by the
//! front-end), may hold a parametric type while it is `Unresolved`, and is
//! `Resolved` by its first concrete write. Writing a different concrete type
//! afterwards is the `TypeInconsistent` error.

use tyspec_core::{InferenceError, Span, Type, TypeNames};

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterState {
    Unset,
    Unresolved(Type),
    Resolved(Type),
}

impl RegisterState {
    fn of(ty: Type) -> Self {
        if ty.is_parametric() {
            RegisterState::Unresolved(ty)
        } else {
            RegisterState::Resolved(ty)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterFile {
    states: Vec<RegisterState>,
    /// Registers whose type was declared up front; writes are matched
    /// against the declaration.
    declared: Vec<bool>,
}

impl RegisterFile {
    pub fn new(count: usize) -> Self {
        Self {
            states: vec![RegisterState::Unset; count],
            declared: vec![false; count],
        }
    }

    fn ensure(&mut self, register: u16) -> usize {
        let index = usize::from(register);
        if index >= self.states.len() {
            self.states.resize(index + 1, RegisterState::Unset);
            self.declared.resize(index + 1, false);
        }
        index
    }

    /// Fix the type of a register before the pass starts.
    pub fn declare(&mut self, register: u16, ty: Type) {
        let index = self.ensure(register);
        self.states[index] = RegisterState::of(ty);
        self.declared[index] = true;
    }

    pub fn is_declared(&self, register: u16) -> bool {
        self.declared.get(usize::from(register)).copied().unwrap_or(false)
    }

    pub fn state(&self, register: u16) -> &RegisterState {
        self.states.get(usize::from(register)).unwrap_or(&RegisterState::Unset)
    }

    /// The current type, if the register has one.
    pub fn get(&self, register: u16) -> Option<&Type> {
        match self.state(register) {
            RegisterState::Unset => None,
            RegisterState::Unresolved(ty) | RegisterState::Resolved(ty) => Some(ty),
        }
    }

    /// The current type; unset registers read as `any`.
    pub fn ty(&self, register: u16) -> Type {
        self.get(register).cloned().unwrap_or_else(Type::any)
    }

    /// Record a write of `ty`.
    ///
    /// A resolved register accepts its own type again and anything when it
    /// holds `any`; a different concrete type is rejected.
    pub fn assign(&mut self, register: u16, ty: Type, names: &dyn TypeNames) -> Result<(), InferenceError> {
        let index = self.ensure(register);
        match &self.states[index] {
            RegisterState::Resolved(existing) if *existing == ty || existing.is_any() => Ok(()),
            // A value whose type is still open does not unresolve a register.
            RegisterState::Resolved(_) if ty.is_parametric() => Ok(()),
            RegisterState::Resolved(existing) => Err(InferenceError::TypeInconsistent {
                register,
                existing: existing.named(names).to_string(),
                found: ty.named(names).to_string(),
                span: Span::default(),
            }),
            RegisterState::Unset | RegisterState::Unresolved(_) => {
                self.states[index] = RegisterState::of(ty);
                Ok(())
            }
        }
    }

    /// Replace an `any` or open type by `ty` once more is known about it.
    /// Other states are an ordinary write.
    pub fn refine(&mut self, register: u16, ty: Type, names: &dyn TypeNames) -> Result<(), InferenceError> {
        let index = self.ensure(register);
        if matches!(&self.states[index], RegisterState::Resolved(existing) if existing.is_any()) {
            self.states[index] = RegisterState::of(ty);
            return Ok(());
        }
        self.assign(register, ty, names)
    }

    /// Append a fresh register holding `ty`.
    pub fn allocate(&mut self, ty: Type) -> u16 {
        let register = self.states.len() as u16;
        self.states.push(RegisterState::of(ty));
        self.declared.push(false);
        register
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Final register types. Registers never written are `any`.
    pub fn into_types(self) -> Vec<Type> {
        self.states
            .into_iter()
            .map(|state| match state {
                RegisterState::Unset => Type::any(),
                RegisterState::Unresolved(ty) | RegisterState::Resolved(ty) => ty,
            })
            .collect()
    }
}
