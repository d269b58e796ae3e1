//! Routine signatures.

use super::Type;

/// How a parameter accepts arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Required positional parameter.
    Positional,
    /// Parameter with a default value; the argument may be omitted.
    Default,
    /// Implicit receiver of a method.
    SelfParam,
    /// Trailing parameter absorbing all remaining arguments.
    Variadic,
}

/// One parameter of a routine signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    pub name: String,
    pub ty: Type,
    pub kind: ParamKind,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParamKind::Positional,
        }
    }

    pub fn with_default(name: impl Into<String>, ty: Type) -> Self {
        Self {
            kind: ParamKind::Default,
            ..Self::new(name, ty)
        }
    }

    pub fn self_param(ty: Type) -> Self {
        Self {
            kind: ParamKind::SelfParam,
            ..Self::new("self", ty)
        }
    }

    pub fn variadic(name: impl Into<String>, ty: Type) -> Self {
        Self {
            kind: ParamKind::Variadic,
            ..Self::new(name, ty)
        }
    }
}

/// A routine signature: parameters, return type and an optional code-section
/// (block) signature the routine yields to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineType {
    pub params: Vec<Param>,
    pub ret: Box<Type>,
    pub section: Option<Box<RoutineType>>,
}

impl RoutineType {
    pub fn new(params: Vec<Param>, ret: Type) -> Self {
        Self {
            params,
            ret: Box::new(ret),
            section: None,
        }
    }

    /// Attach the signature of the code section this routine yields to.
    pub fn with_section(mut self, section: RoutineType) -> Self {
        self.section = Some(Box::new(section));
        self
    }

    /// Whether the first parameter is an implicit receiver.
    pub fn has_self(&self) -> bool {
        self.params
            .first()
            .is_some_and(|p| p.kind == ParamKind::SelfParam)
    }

    pub fn is_variadic(&self) -> bool {
        self.params
            .last()
            .is_some_and(|p| p.kind == ParamKind::Variadic)
    }

    /// Number of arguments that must be supplied.
    pub fn required_count(&self) -> usize {
        self.params
            .iter()
            .filter(|p| matches!(p.kind, ParamKind::Positional | ParamKind::SelfParam))
            .count()
    }

    pub fn return_type(&self) -> &Type {
        &self.ret
    }

    /// Replace the return type.
    pub fn with_return(&self, ret: Type) -> Self {
        Self {
            params: self.params.clone(),
            ret: Box::new(ret),
            section: self.section.clone(),
        }
    }

    pub fn is_parametric(&self) -> bool {
        self.params.iter().any(|p| p.ty.is_parametric())
            || self.ret.is_parametric()
            || self.section.as_ref().is_some_and(|s| s.is_parametric())
    }

    /// Whether only the parameters contain holders (the routine is generic).
    pub fn has_parametric_params(&self) -> bool {
        self.params.iter().any(|p| p.ty.is_parametric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HolderId;

    #[test]
    fn required_count_skips_defaults_and_variadic() {
        let sig = RoutineType::new(
            vec![
                Param::new("a", Type::int()),
                Param::with_default("b", Type::float()),
                Param::variadic("rest", Type::any()),
            ],
            Type::none(),
        );
        assert_eq!(sig.required_count(), 1);
        assert!(sig.is_variadic());
        assert!(!sig.has_self());
    }

    #[test]
    fn parametric_return_is_not_a_generic_parameter() {
        let t = Type::holder(HolderId::new(1), "T");
        let sig = RoutineType::new(vec![Param::new("x", Type::int())], t.clone());
        assert!(sig.is_parametric());
        assert!(!sig.has_parametric_params());
        assert!(Type::routine(sig).is_parametric());
    }
}
