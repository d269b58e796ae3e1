//! Constant pool values.
//!
//! The front-end hands every routine a constant pool. Literal values know
//! their own intrinsic type; values naming routines, overload sets or classes
//! are typed by the session that owns those entities.

use ordered_float::OrderedFloat;

use crate::ids::{ClassId, OverloadId, RoutineId};
use crate::types::{EnumKind, EnumType, Type};

/// An enumeration value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub etype: EnumType,
    pub value: i64,
}

impl EnumValue {
    /// A free symbol literal such as `$red`.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self {
            etype: EnumType::symbol(name),
            value: 0,
        }
    }

    /// The symbol of this value, if it names exactly one symbol.
    pub fn symbol_name(&self) -> Option<&str> {
        match self.etype.kind {
            EnumKind::Symbol => self.etype.symbols.first().map(|(name, _)| name.as_str()),
            _ => self.etype.symbol_of(self.value),
        }
    }

    pub fn is_symbol(&self) -> bool {
        self.etype.kind == EnumKind::Symbol
    }

    /// Numeric value of this enum value when viewed as a member of `target`.
    ///
    /// Symbol literals are looked up by name; values of the same enumeration
    /// keep their number.
    pub fn value_in(&self, target: &EnumType) -> Option<i64> {
        if self.is_symbol() {
            return self.symbol_name().and_then(|name| target.value_of(name));
        }
        if self.etype.name == target.name {
            return Some(self.value);
        }
        None
    }
}

/// A constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Complex(OrderedFloat<f64>, OrderedFloat<f64>),
    String(String),
    Enum(EnumValue),
    /// A routine defined by the front-end (including nested routines).
    Routine(RoutineId),
    /// A named set of overloaded routines.
    Overloads(OverloadId),
    /// A class value; calling it constructs an instance.
    Class(ClassId),
    /// A type used as a value (casts, type switches).
    Type(Type),
}

impl Value {
    pub fn float(v: f64) -> Self {
        Value::Float(OrderedFloat(v))
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(OrderedFloat(re), OrderedFloat(im))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Intrinsic type of a literal value.
    ///
    /// Returns `None` for values whose type depends on session state
    /// (routines, overload sets, classes).
    pub fn intrinsic_type(&self) -> Option<Type> {
        match self {
            Value::None => Some(Type::none()),
            Value::Bool(_) => Some(Type::bool()),
            Value::Int(_) => Some(Type::int()),
            Value::Float(_) => Some(Type::float()),
            Value::Complex(..) => Some(Type::complex()),
            Value::String(_) => Some(Type::string()),
            Value::Enum(e) => Some(Type::enumeration(e.etype.clone())),
            Value::Type(_) => Some(Type::any()),
            Value::Class(id) => Some(Type::object(*id)),
            Value::Overloads(id) => Some(Type::overloads(*id)),
            Value::Routine(_) => None,
        }
    }

    /// Whether the value is truthy at compile time, for folding tests.
    pub fn truthiness(&self) -> Option<bool> {
        match self {
            Value::None => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(f.0 != 0.0),
            _ => None,
        }
    }

    /// Integer key used for dense switch tables.
    pub fn case_key(&self, enum_type: Option<&EnumType>) -> Option<i64> {
        match (self, enum_type) {
            (Value::Int(i), None) => Some(*i),
            (Value::Enum(e), Some(target)) => e.value_in(target),
            _ => None,
        }
    }
}
