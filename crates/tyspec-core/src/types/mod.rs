//! Structural type representation.
//!
//! A [`Type`] is a [`TypeKind`] tag plus a set of [`TypeAttrs`] qualifiers.
//! Types are plain values: two structurally equal types compare equal, and
//! the session interner maps them to a single canonical [`TypeId`](crate::TypeId).
//!
//! The `PARAMETRIC` attribute is maintained by the constructors: any type that
//! (transitively) contains a [`TypeKind::Holder`] carries it, so callers can
//! test for leftover generic parameters without walking the type.

mod display;
mod enum_type;
mod routine;

pub use display::{Named, TypeNames};
pub use enum_type::{EnumKind, EnumType};
pub use routine::{Param, ParamKind, RoutineType};

use bitflags::bitflags;

use crate::ids::{ClassId, HolderId, InterfaceId, OverloadId};

bitflags! {
    /// Qualifiers orthogonal to the type tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeAttrs: u8 {
        /// Compile-time constant. Implies invariability for matching purposes.
        const CONST = 1 << 0;
        /// Invariable: the value may not be mutated through this reference.
        const INVAR = 1 << 1;
        /// Explicitly declared mutable (`var`) target.
        const VAR = 1 << 2;
        /// The type contains unresolved type holders.
        const PARAMETRIC = 1 << 3;
    }
}

impl TypeAttrs {
    /// The qualifiers a user can write, as opposed to computed ones.
    pub const QUALIFIERS: TypeAttrs = TypeAttrs::CONST
        .union(TypeAttrs::INVAR)
        .union(TypeAttrs::VAR);
}

/// One item of a tuple type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleItem {
    /// Optional field name.
    pub name: Option<String>,
    /// Field type.
    pub ty: Type,
}

impl TupleItem {
    /// An unnamed tuple item.
    pub fn unnamed(ty: Type) -> Self {
        Self { name: None, ty }
    }

    /// A named tuple item.
    pub fn named(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: Some(name.into()),
            ty,
        }
    }
}

/// Tuple type: ordered, optionally named items.
///
/// A variadic tuple repeats the type of its last item for any further
/// positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TupleType {
    pub items: Vec<TupleItem>,
    pub variadic: bool,
}

impl TupleType {
    /// Index of the item called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// Type of the item at `index`, honouring a variadic tail.
    pub fn item_type(&self, index: usize) -> Option<&Type> {
        match self.items.get(index) {
            Some(item) => Some(&item.ty),
            None if self.variadic => self.items.last().map(|item| &item.ty),
            None => None,
        }
    }
}

/// The type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// The `none` type (absence of a value).
    None,
    Bool,
    Int,
    Float,
    Complex,
    String,
    Enum(EnumType),
    List(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Array(Box<Type>),
    Tuple(TupleType),
    /// Union of alternatives, `a|b|c`.
    Variant(Vec<Type>),
    Routine(RoutineType),
    /// A value naming an overload set.
    Overloads(OverloadId),
    /// Instance of a class. Also the type of the class value itself.
    Object(ClassId),
    Interface(InterfaceId),
    /// Placeholder for a generic parameter or a not-yet-inferred type.
    Holder(HolderId, String),
    Any,
}

/// A qualified type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Type {
    kind: TypeKind,
    attrs: TypeAttrs,
}

impl Type {
    /// Build a type from its tag, computing the `PARAMETRIC` attribute.
    pub fn from_kind(kind: TypeKind) -> Self {
        let parametric = match &kind {
            TypeKind::Holder(..) => true,
            TypeKind::List(e) | TypeKind::Array(e) => e.is_parametric(),
            TypeKind::Map(k, v) => k.is_parametric() || v.is_parametric(),
            TypeKind::Tuple(t) => t.items.iter().any(|item| item.ty.is_parametric()),
            TypeKind::Variant(alts) => alts.iter().any(Type::is_parametric),
            TypeKind::Routine(r) => r.is_parametric(),
            _ => false,
        };
        let attrs = if parametric {
            TypeAttrs::PARAMETRIC
        } else {
            TypeAttrs::empty()
        };
        Self { kind, attrs }
    }

    pub fn none() -> Self {
        Self::from_kind(TypeKind::None)
    }

    pub fn bool() -> Self {
        Self::from_kind(TypeKind::Bool)
    }

    pub fn int() -> Self {
        Self::from_kind(TypeKind::Int)
    }

    pub fn float() -> Self {
        Self::from_kind(TypeKind::Float)
    }

    pub fn complex() -> Self {
        Self::from_kind(TypeKind::Complex)
    }

    pub fn string() -> Self {
        Self::from_kind(TypeKind::String)
    }

    pub fn any() -> Self {
        Self::from_kind(TypeKind::Any)
    }

    /// A type holder such as `@T`.
    pub fn holder(id: HolderId, name: impl Into<String>) -> Self {
        Self::from_kind(TypeKind::Holder(id, name.into()))
    }

    pub fn list(elem: Type) -> Self {
        Self::from_kind(TypeKind::List(Box::new(elem)))
    }

    pub fn array(elem: Type) -> Self {
        Self::from_kind(TypeKind::Array(Box::new(elem)))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Self::from_kind(TypeKind::Map(Box::new(key), Box::new(value)))
    }

    /// A tuple of unnamed items.
    pub fn tuple_of(items: Vec<Type>) -> Self {
        Self::tuple(TupleType {
            items: items.into_iter().map(TupleItem::unnamed).collect(),
            variadic: false,
        })
    }

    pub fn tuple(tuple: TupleType) -> Self {
        Self::from_kind(TypeKind::Tuple(tuple))
    }

    /// A variant type. A single alternative collapses to itself.
    pub fn variant(mut alternatives: Vec<Type>) -> Self {
        if alternatives.len() == 1 {
            return alternatives.remove(0);
        }
        Self::from_kind(TypeKind::Variant(alternatives))
    }

    pub fn routine(routine: RoutineType) -> Self {
        Self::from_kind(TypeKind::Routine(routine))
    }

    pub fn overloads(id: OverloadId) -> Self {
        Self::from_kind(TypeKind::Overloads(id))
    }

    pub fn object(class: ClassId) -> Self {
        Self::from_kind(TypeKind::Object(class))
    }

    pub fn interface(id: InterfaceId) -> Self {
        Self::from_kind(TypeKind::Interface(id))
    }

    pub fn enumeration(etype: EnumType) -> Self {
        Self::from_kind(TypeKind::Enum(etype))
    }

    /// The tag.
    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// All attributes, computed ones included.
    #[inline]
    pub fn attrs(&self) -> TypeAttrs {
        self.attrs
    }

    /// Replace the user-facing qualifiers, keeping computed attributes.
    pub fn with_qualifiers(&self, qualifiers: TypeAttrs) -> Self {
        let computed = self.attrs - TypeAttrs::QUALIFIERS;
        Self {
            kind: self.kind.clone(),
            attrs: computed | (qualifiers & TypeAttrs::QUALIFIERS),
        }
    }

    /// This type qualified `const` only.
    pub fn to_const(&self) -> Self {
        self.with_qualifiers(TypeAttrs::CONST)
    }

    /// This type qualified `invar` only.
    pub fn to_invariable(&self) -> Self {
        self.with_qualifiers(TypeAttrs::INVAR)
    }

    /// This type declared `var`.
    pub fn to_var(&self) -> Self {
        self.with_qualifiers(TypeAttrs::VAR)
    }

    /// This type with every qualifier removed at the top level.
    pub fn unqualified(&self) -> Self {
        self.with_qualifiers(TypeAttrs::empty())
    }

    #[inline]
    pub fn is_const(&self) -> bool {
        self.attrs.contains(TypeAttrs::CONST)
    }

    /// Const or invar: the value must not be modified through this type.
    #[inline]
    pub fn is_invariable(&self) -> bool {
        self.attrs.intersects(TypeAttrs::CONST | TypeAttrs::INVAR)
    }

    #[inline]
    pub fn is_var(&self) -> bool {
        self.attrs.contains(TypeAttrs::VAR)
    }

    /// Whether any type holder remains inside this type.
    #[inline]
    pub fn is_parametric(&self) -> bool {
        self.attrs.contains(TypeAttrs::PARAMETRIC)
    }

    #[inline]
    pub fn is_any(&self) -> bool {
        matches!(self.kind, TypeKind::Any)
    }

    #[inline]
    pub fn is_holder(&self) -> bool {
        matches!(self.kind, TypeKind::Holder(..))
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self.kind, TypeKind::None)
    }

    /// Loose types match anything at rank `Any`: `any`, holders, and
    /// containers made only of loose items.
    pub fn is_loose(&self) -> bool {
        match &self.kind {
            TypeKind::Any | TypeKind::Holder(..) => true,
            TypeKind::List(e) | TypeKind::Array(e) => e.is_loose(),
            TypeKind::Map(k, v) => k.is_loose() && v.is_loose(),
            _ => false,
        }
    }

    /// Value types copied on assignment.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::None
                | TypeKind::Bool
                | TypeKind::Int
                | TypeKind::Float
                | TypeKind::Complex
                | TypeKind::String
                | TypeKind::Enum(_)
        )
    }

    /// Position on the numeric widening chain `bool < int < float < complex`.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self.kind {
            TypeKind::Bool => Some(0),
            TypeKind::Int => Some(1),
            TypeKind::Float => Some(2),
            TypeKind::Complex => Some(3),
            _ => None,
        }
    }

    /// The numeric type at a given rank.
    pub fn from_numeric_rank(rank: u8) -> Option<Type> {
        match rank {
            0 => Some(Type::bool()),
            1 => Some(Type::int()),
            2 => Some(Type::float()),
            3 => Some(Type::complex()),
            _ => None,
        }
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// For an optional `T|none` variant, the non-none alternative.
    pub fn untagged(&self) -> Option<&Type> {
        let TypeKind::Variant(alts) = &self.kind else {
            return None;
        };
        if alts.len() != 2 {
            return None;
        }
        match (alts[0].is_none(), alts[1].is_none()) {
            (true, false) => Some(&alts[1]),
            (false, true) => Some(&alts[0]),
            _ => None,
        }
    }

    /// Routine signature, if this is a routine type.
    pub fn as_routine(&self) -> Option<&RoutineType> {
        match &self.kind {
            TypeKind::Routine(r) => Some(r),
            _ => None,
        }
    }
}
