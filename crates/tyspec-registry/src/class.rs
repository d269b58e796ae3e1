//! Class and interface definitions.

use tyspec_core::{ClassId, InterfaceId, Type};

/// Member visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    /// Visible to the owning class and its subclasses.
    Protected,
    /// Visible to the owning class only.
    Private,
}

/// A data field of a class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub visibility: Visibility,
    /// Invariable fields may only be assigned inside the owner's constructor.
    pub invariable: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            invariable: false,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn invariable(mut self) -> Self {
        self.invariable = true;
        self
    }
}

/// A class declaration as handed to the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: String,
    pub base: Option<ClassId>,
    pub interfaces: Vec<InterfaceId>,
    pub fields: Vec<FieldDef>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn extends(mut self, base: ClassId) -> Self {
        self.base = Some(base);
        self
    }

    pub fn implements(mut self, interface: InterfaceId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Index of a field declared directly on this class.
    pub fn own_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// An interface declaration. Interface methods are routines registered with
/// the session under the interface host.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDef {
    pub name: String,
    pub parents: Vec<InterfaceId>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parents: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: InterfaceId) -> Self {
        self.parents.push(parent);
        self
    }
}
