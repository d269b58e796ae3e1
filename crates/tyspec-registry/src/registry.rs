//! ClassRegistry - classes, interfaces and the is-a relation.
//!
//! # Storage Model
//!
//! - **Definitions**: classes and interfaces are stored densely, addressed by
//!   [`ClassId`] and [`InterfaceId`].
//! - **Inheritance**: a `petgraph::DiGraph` with one node per class or
//!   interface. `Extends` edges point from a class to its base (or from an
//!   interface to a parent interface); `Implements` edges point from a class
//!   to an interface.
//!
//! A base must be registered before the definitions that name it, so the
//! graph is acyclic by construction.
//!
//! # Thread Safety
//!
//! The registry is populated single-threaded and is read-only during
//! inference; sessions borrow it immutably.
//!
//! # Example
//!
//! ```
//! use tyspec_core::Type;
//! use tyspec_registry::{ClassDef, ClassRegistry, FieldDef};
//!
//! let mut registry = ClassRegistry::new();
//! let shape = registry.register_class(ClassDef::new("Shape")).unwrap();
//! let circle = registry
//!     .register_class(
//!         ClassDef::new("Circle")
//!             .extends(shape)
//!             .field(FieldDef::new("radius", Type::float())),
//!     )
//!     .unwrap();
//!
//! assert!(registry.is_subclass(circle, shape));
//! assert!(registry.find_field(circle, "radius").is_some());
//! ```

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use rustc_hash::FxHashMap;

use tyspec_core::{ClassId, InterfaceId, TypeNames};

use crate::class::{ClassDef, FieldDef, InterfaceDef, Visibility};
use crate::error::RegistryError;

/// A graph node: one class or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nominal {
    Class(ClassId),
    Interface(InterfaceId),
}

/// Edge kinds of the inheritance graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relation {
    Extends,
    Implements,
}

/// A field found by [`ClassRegistry::find_field`].
#[derive(Debug, Clone, Copy)]
pub struct FieldLookup<'a> {
    /// The class that declares the field.
    pub owner: ClassId,
    /// Position of the field in the owner's declaration.
    pub index: usize,
    pub field: &'a FieldDef,
}

struct ClassEntry {
    def: ClassDef,
    node: NodeIndex,
}

struct InterfaceEntry {
    def: InterfaceDef,
    node: NodeIndex,
}

/// Registry of user classes and interfaces.
#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<ClassEntry>,
    interfaces: Vec<InterfaceEntry>,
    /// Lookup by name.
    class_names: FxHashMap<String, ClassId>,
    interface_names: FxHashMap<String, InterfaceId>,
    graph: DiGraph<Nominal, Relation>,
}

impl ClassRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a class. Its base and interfaces must already be registered.
    pub fn register_class(&mut self, def: ClassDef) -> Result<ClassId, RegistryError> {
        if self.class_names.contains_key(&def.name) {
            return Err(RegistryError::DuplicateClass(def.name));
        }
        for (i, field) in def.fields.iter().enumerate() {
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(RegistryError::DuplicateField {
                    class: def.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        let base_node = match def.base {
            Some(base) => Some(self.class_entry(base)?.node),
            None => None,
        };
        let mut iface_nodes = Vec::with_capacity(def.interfaces.len());
        for iface in &def.interfaces {
            iface_nodes.push(self.interface_entry(*iface)?.node);
        }

        let id = ClassId::new(self.classes.len() as u32);
        let node = self.graph.add_node(Nominal::Class(id));
        if let Some(base_node) = base_node {
            self.graph.add_edge(node, base_node, Relation::Extends);
        }
        for iface_node in iface_nodes {
            self.graph.add_edge(node, iface_node, Relation::Implements);
        }

        log::debug!("registered class '{}' as {}", def.name, id);
        self.class_names.insert(def.name.clone(), id);
        self.classes.push(ClassEntry { def, node });
        Ok(id)
    }

    /// Register an interface. Its parents must already be registered.
    pub fn register_interface(&mut self, def: InterfaceDef) -> Result<InterfaceId, RegistryError> {
        if self.interface_names.contains_key(&def.name) {
            return Err(RegistryError::DuplicateInterface(def.name));
        }
        let mut parent_nodes = Vec::with_capacity(def.parents.len());
        for parent in &def.parents {
            parent_nodes.push(self.interface_entry(*parent)?.node);
        }

        let id = InterfaceId::new(self.interfaces.len() as u32);
        let node = self.graph.add_node(Nominal::Interface(id));
        for parent_node in parent_nodes {
            self.graph.add_edge(node, parent_node, Relation::Extends);
        }

        self.interface_names.insert(def.name.clone(), id);
        self.interfaces.push(InterfaceEntry { def, node });
        Ok(id)
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.index()).map(|e| &e.def)
    }

    pub fn interface(&self, id: InterfaceId) -> Option<&InterfaceDef> {
        self.interfaces.get(id.index()).map(|e| &e.def)
    }

    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.class_names.get(name).copied()
    }

    pub fn interface_by_name(&self, name: &str) -> Option<InterfaceId> {
        self.interface_names.get(name).copied()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn interface_count(&self) -> usize {
        self.interfaces.len()
    }

    fn class_entry(&self, id: ClassId) -> Result<&ClassEntry, RegistryError> {
        self.classes
            .get(id.index())
            .ok_or(RegistryError::UnknownClass(id))
    }

    fn interface_entry(&self, id: InterfaceId) -> Result<&InterfaceEntry, RegistryError> {
        self.interfaces
            .get(id.index())
            .ok_or(RegistryError::UnknownInterface(id))
    }

    /// The base chain of a class, from the immediate parent to the root.
    pub fn base_chain(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let Ok(entry) = self.class_entry(id) else {
            return chain;
        };
        let mut current = entry.node;
        while let Some(base) = self.extended_class(current) {
            chain.push(base.0);
            current = base.1;
        }
        chain
    }

    fn extended_class(&self, node: NodeIndex) -> Option<(ClassId, NodeIndex)> {
        self.graph.edges(node).find_map(|edge| {
            match (edge.weight(), self.graph[edge.target()]) {
                (Relation::Extends, Nominal::Class(base)) => Some((base, edge.target())),
                _ => None,
            }
        })
    }

    /// Find a field on a class or one of its bases. Own fields shadow
    /// inherited ones.
    pub fn find_field(&self, class: ClassId, name: &str) -> Option<FieldLookup<'_>> {
        std::iter::once(class)
            .chain(self.base_chain(class))
            .find_map(|owner| {
                let def = self.class(owner)?;
                let index = def.own_field(name)?;
                Some(FieldLookup {
                    owner,
                    index,
                    field: &def.fields[index],
                })
            })
    }

    // ==========================================================================
    // Is-a relation
    // ==========================================================================

    /// Whether `derived` is `base` or inherits from it.
    pub fn is_subclass(&self, derived: ClassId, base: ClassId) -> bool {
        let (Ok(from), Ok(to)) = (self.class_entry(derived), self.class_entry(base)) else {
            return false;
        };
        self.reaches(from.node, to.node)
    }

    /// Whether `class` (or one of its bases) implements `interface`, directly
    /// or through interface inheritance.
    pub fn implements(&self, class: ClassId, interface: InterfaceId) -> bool {
        let (Ok(from), Ok(to)) = (self.class_entry(class), self.interface_entry(interface)) else {
            return false;
        };
        self.reaches(from.node, to.node)
    }

    /// Whether interface `derived` is `base` or extends it.
    pub fn interface_extends(&self, derived: InterfaceId, base: InterfaceId) -> bool {
        let (Ok(from), Ok(to)) = (self.interface_entry(derived), self.interface_entry(base))
        else {
            return false;
        };
        self.reaches(from.node, to.node)
    }

    /// Interfaces `class` conforms to, nearest first.
    pub fn all_interfaces(&self, class: ClassId) -> Vec<InterfaceId> {
        let Ok(start) = self.class_entry(class) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut dfs = Dfs::new(&self.graph, start.node);
        while let Some(node) = dfs.next(&self.graph) {
            if let Nominal::Interface(id) = self.graph[node] {
                out.push(id);
            }
        }
        out
    }

    fn reaches(&self, from: NodeIndex, to: NodeIndex) -> bool {
        let mut dfs = Dfs::new(&self.graph, from);
        while let Some(node) = dfs.next(&self.graph) {
            if node == to {
                return true;
            }
        }
        false
    }

    // ==========================================================================
    // Accessibility
    // ==========================================================================

    /// Whether code hosted in `host` may access a member of `owner` with the
    /// given visibility. Code without a host only sees public members.
    pub fn is_accessible(&self, owner: ClassId, visibility: Visibility, host: Option<ClassId>) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Private => host == Some(owner),
            Visibility::Protected => host.is_some_and(|h| self.is_subclass(h, owner)),
        }
    }
}

impl TypeNames for ClassRegistry {
    fn class_name(&self, id: ClassId) -> Option<&str> {
        self.class(id).map(|c| c.name.as_str())
    }

    fn interface_name(&self, id: InterfaceId) -> Option<&str> {
        self.interface(id).map(|i| i.name.as_str())
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("class_count", &self.class_count())
            .field("interface_count", &self.interface_count())
            .finish()
    }
}
