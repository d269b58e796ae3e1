//! Human-readable type names.
//!
//! Names follow the source language spelling: `list<int>`, `tuple<x:int,float>`,
//! `routine<a:int=>string>`, `int|none`, `@T`. Class and interface names are
//! only known to the registry, so rendering goes through [`TypeNames`].

use std::fmt::{self, Write};

use super::{Param, ParamKind, RoutineType, TupleType, Type, TypeAttrs, TypeKind};
use crate::ids::{ClassId, InterfaceId};

/// Supplies names for nominal types while formatting.
pub trait TypeNames {
    fn class_name(&self, id: ClassId) -> Option<&str>;
    fn interface_name(&self, id: InterfaceId) -> Option<&str>;
}

/// Fallback naming that prints raw ids.
struct RawNames;

impl TypeNames for RawNames {
    fn class_name(&self, _: ClassId) -> Option<&str> {
        None
    }

    fn interface_name(&self, _: InterfaceId) -> Option<&str> {
        None
    }
}

/// A type paired with the naming used to print it.
pub struct Named<'a> {
    ty: &'a Type,
    names: &'a dyn TypeNames,
}

impl Type {
    /// Display this type using registry names for classes and interfaces.
    pub fn named<'a>(&'a self, names: &'a dyn TypeNames) -> Named<'a> {
        Named { ty: self, names }
    }
}

impl fmt::Display for Named<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self.ty, self.names)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_type(f, self, &RawNames)
    }
}

fn write_type(f: &mut dyn Write, ty: &Type, names: &dyn TypeNames) -> fmt::Result {
    let attrs = ty.attrs();
    if attrs.contains(TypeAttrs::CONST) {
        f.write_str("const ")?;
    } else if attrs.contains(TypeAttrs::INVAR) {
        f.write_str("invar ")?;
    } else if attrs.contains(TypeAttrs::VAR) {
        f.write_str("var ")?;
    }
    match ty.kind() {
        TypeKind::None => f.write_str("none"),
        TypeKind::Bool => f.write_str("bool"),
        TypeKind::Int => f.write_str("int"),
        TypeKind::Float => f.write_str("float"),
        TypeKind::Complex => f.write_str("complex"),
        TypeKind::String => f.write_str("string"),
        TypeKind::Any => f.write_str("any"),
        TypeKind::Enum(e) => f.write_str(&e.name),
        TypeKind::Holder(_, name) => write!(f, "@{name}"),
        TypeKind::List(e) => {
            f.write_str("list<")?;
            write_type(f, e, names)?;
            f.write_char('>')
        }
        TypeKind::Array(e) => {
            f.write_str("array<")?;
            write_type(f, e, names)?;
            f.write_char('>')
        }
        TypeKind::Map(k, v) => {
            f.write_str("map<")?;
            write_type(f, k, names)?;
            f.write_char(',')?;
            write_type(f, v, names)?;
            f.write_char('>')
        }
        TypeKind::Tuple(t) => write_tuple(f, t, names),
        TypeKind::Variant(alts) => {
            for (i, alt) in alts.iter().enumerate() {
                if i > 0 {
                    f.write_char('|')?;
                }
                write_type(f, alt, names)?;
            }
            Ok(())
        }
        TypeKind::Routine(r) => write_routine(f, r, names),
        TypeKind::Overloads(id) => write!(f, "routine[{}]", id.0),
        TypeKind::Object(id) => match names.class_name(*id) {
            Some(name) => f.write_str(name),
            None => write!(f, "{id}"),
        },
        TypeKind::Interface(id) => match names.interface_name(*id) {
            Some(name) => f.write_str(name),
            None => write!(f, "{id}"),
        },
    }
}

fn write_tuple(f: &mut dyn Write, tuple: &TupleType, names: &dyn TypeNames) -> fmt::Result {
    f.write_str("tuple<")?;
    for (i, item) in tuple.items.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        if let Some(name) = &item.name {
            write!(f, "{name}:")?;
        }
        write_type(f, &item.ty, names)?;
    }
    if tuple.variadic {
        f.write_str(",...")?;
    }
    f.write_char('>')
}

fn write_param(f: &mut dyn Write, param: &Param, names: &dyn TypeNames) -> fmt::Result {
    match param.kind {
        ParamKind::Variadic => f.write_str("...:")?,
        ParamKind::Default => write!(f, "{}=", param.name)?,
        ParamKind::Positional | ParamKind::SelfParam => write!(f, "{}:", param.name)?,
    }
    write_type(f, &param.ty, names)
}

fn write_routine(f: &mut dyn Write, routine: &RoutineType, names: &dyn TypeNames) -> fmt::Result {
    f.write_str("routine<")?;
    for (i, param) in routine.params.iter().enumerate() {
        if i > 0 {
            f.write_char(',')?;
        }
        write_param(f, param, names)?;
    }
    f.write_str("=>")?;
    write_type(f, &routine.ret, names)?;
    f.write_char('>')?;
    if let Some(section) = &routine.section {
        f.write_char('[')?;
        for (i, param) in section.params.iter().enumerate() {
            if i > 0 {
                f.write_char(',')?;
            }
            write_param(f, param, names)?;
        }
        f.write_str("=>")?;
        write_type(f, &section.ret, names)?;
        f.write_char(']')?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnumType, HolderId, TupleItem};

    struct Fixed;

    impl TypeNames for Fixed {
        fn class_name(&self, id: ClassId) -> Option<&str> {
            (id.0 == 1).then_some("Point")
        }

        fn interface_name(&self, _: InterfaceId) -> Option<&str> {
            None
        }
    }

    #[test]
    fn container_names() {
        assert_eq!(Type::list(Type::int()).to_string(), "list<int>");
        assert_eq!(
            Type::map(Type::string(), Type::array(Type::float())).to_string(),
            "map<string,array<float>>"
        );
        assert_eq!(
            Type::variant(vec![Type::int(), Type::none()]).to_string(),
            "int|none"
        );
    }

    #[test]
    fn tuple_and_routine_names() {
        let tuple = Type::tuple(TupleType {
            items: vec![TupleItem::named("x", Type::int()), TupleItem::unnamed(Type::string())],
            variadic: false,
        });
        assert_eq!(tuple.to_string(), "tuple<x:int,string>");

        let t = Type::holder(HolderId::new(0), "T");
        let sig = RoutineType::new(vec![Param::new("x", t.clone())], t);
        assert_eq!(Type::routine(sig).to_string(), "routine<x:@T=>@T>");
    }

    #[test]
    fn qualifiers_and_nominal_names() {
        assert_eq!(Type::list(Type::int()).to_invariable().to_string(), "invar list<int>");
        assert_eq!(Type::object(ClassId::new(1)).named(&Fixed).to_string(), "Point");
        assert_eq!(Type::object(ClassId::new(2)).named(&Fixed).to_string(), "class#2");
        assert_eq!(
            Type::enumeration(EnumType::symbol("red")).to_string(),
            "$red"
        );
    }
}
