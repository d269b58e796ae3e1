//! Item and field capabilities, per type category.
//!
//! Each container category implements [`TypeOperations`]; the driver reaches
//! the right implementation through [`operations_for`], which dispatches on
//! the type tag. All checks work on types only: they answer "what type does
//! this access produce" and "is this access allowed".

use tyspec_core::{ClassId, InferenceError, InterfaceId, OverloadId, TupleType, Type, TypeKind};

use super::{SubstitutionMap, TypeMatcher};

/// Method lookup provided by the session.
pub trait MethodTable {
    /// The overload set of methods called `name` on `class` or its bases.
    fn class_method(&self, class: ClassId, name: &str) -> Option<OverloadId>;
    /// The overload set of methods called `name` on `interface` or its parents.
    fn interface_method(&self, interface: InterfaceId, name: &str) -> Option<OverloadId>;
}

/// What an access check needs to know about its surroundings.
pub struct OpsContext<'a> {
    pub matcher: TypeMatcher<'a>,
    pub methods: &'a dyn MethodTable,
    /// Class hosting the routine being inferred.
    pub host: Option<ClassId>,
    /// Whether that routine is a constructor of `host`.
    pub in_constructor: bool,
}

impl OpsContext<'_> {
    fn name(&self, ty: &Type) -> String {
        ty.named(self.matcher.registry()).to_string()
    }

    fn accepts(&self, value: &Type, slot: &Type) -> bool {
        slot.is_parametric()
            || self
                .matcher
                .match_type(value, slot, &mut SubstitutionMap::default())
                .is_match()
    }

    fn is_int(&self, index: &Type) -> bool {
        self.matcher
            .match_type(index, &Type::int(), &mut SubstitutionMap::default())
            .is_match()
    }
}

/// Item and field access checks for one type category.
pub trait TypeOperations: Sync {
    /// Type of `container[indices]`.
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        let _ = indices;
        Err(InferenceError::index(format!("'{}' is not indexable", ctx.name(container))))
    }

    /// Check `container[indices] = value` and return the slot type.
    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        let _ = (indices, value);
        Err(InferenceError::index(format!("'{}' is not indexable", ctx.name(container))))
    }

    /// Type of `container.name`.
    fn check_get_field(&self, ctx: &OpsContext<'_>, container: &Type, name: &str) -> Result<Type, InferenceError> {
        let _ = (ctx, container);
        Err(InferenceError::no_member(name))
    }

    /// Check `container.name = value` and return the slot type.
    fn check_set_field(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        name: &str,
        value: &Type,
    ) -> Result<Type, InferenceError> {
        let _ = (ctx, container, value);
        Err(InferenceError::no_member(name))
    }
}

pub struct ListOps;
pub struct MapOps;
pub struct ArrayOps;
pub struct TupleOps;
pub struct StringOps;
pub struct ObjectOps;
pub struct InterfaceOps;
pub struct AnyOps;
/// Categories with no item or field access at all.
pub struct NoOps;

static LIST: ListOps = ListOps;
static MAP: MapOps = MapOps;
static ARRAY: ArrayOps = ArrayOps;
static TUPLE: TupleOps = TupleOps;
static STRING: StringOps = StringOps;
static OBJECT: ObjectOps = ObjectOps;
static INTERFACE: InterfaceOps = InterfaceOps;
static ANY: AnyOps = AnyOps;
static NONE: NoOps = NoOps;

/// The operations for a type's category.
pub fn operations_for(ty: &Type) -> &'static dyn TypeOperations {
    match ty.kind() {
        TypeKind::List(_) => &LIST,
        TypeKind::Map(..) => &MAP,
        TypeKind::Array(_) => &ARRAY,
        TypeKind::Tuple(_) => &TUPLE,
        TypeKind::String => &STRING,
        TypeKind::Object(_) => &OBJECT,
        TypeKind::Interface(_) => &INTERFACE,
        TypeKind::Any | TypeKind::Holder(..) => &ANY,
        _ => &NONE,
    }
}

impl TypeOperations for NoOps {}

impl TypeOperations for AnyOps {
    fn check_get_item(&self, _: &OpsContext<'_>, _: &Type, _: &[Type]) -> Result<Type, InferenceError> {
        Ok(Type::any())
    }

    fn check_set_item(&self, _: &OpsContext<'_>, _: &Type, _: &[Type], _: &Type) -> Result<Type, InferenceError> {
        Ok(Type::any())
    }

    fn check_get_field(&self, _: &OpsContext<'_>, _: &Type, _: &str) -> Result<Type, InferenceError> {
        Ok(Type::any())
    }

    fn check_set_field(&self, _: &OpsContext<'_>, _: &Type, _: &str, _: &Type) -> Result<Type, InferenceError> {
        Ok(Type::any())
    }
}

fn reject_invariable(ctx: &OpsContext<'_>, container: &Type) -> Result<(), InferenceError> {
    if container.is_invariable() {
        return Err(InferenceError::const_violation(format!(
            "'{}' is invariable",
            ctx.name(container)
        )));
    }
    Ok(())
}

fn single_int_index(ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<(), InferenceError> {
    match indices {
        [index] if ctx.is_int(index) => Ok(()),
        [index] => Err(InferenceError::index(format!(
            "'{}' cannot index '{}'",
            ctx.name(index),
            ctx.name(container)
        ))),
        _ => Err(InferenceError::index(format!(
            "'{}' takes exactly one index, got {}",
            ctx.name(container),
            indices.len()
        ))),
    }
}

fn check_value(ctx: &OpsContext<'_>, value: &Type, slot: &Type) -> Result<(), InferenceError> {
    if ctx.accepts(value, slot) {
        Ok(())
    } else {
        Err(InferenceError::mismatch(ctx.name(value), ctx.name(slot)))
    }
}

/// Items read from an invariable container are invariable unless copied.
fn read_through(container: &Type, item: &Type) -> Type {
    if container.is_invariable() && !item.is_primitive() {
        item.to_invariable()
    } else {
        item.clone()
    }
}

fn element(container: &Type) -> Type {
    match container.kind() {
        TypeKind::List(e) | TypeKind::Array(e) => (**e).clone(),
        _ => Type::any(),
    }
}

impl TypeOperations for ListOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        single_int_index(ctx, container, indices)?;
        Ok(read_through(container, &element(container)))
    }

    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        single_int_index(ctx, container, indices)?;
        let slot = element(container);
        check_value(ctx, value, &slot)?;
        Ok(slot)
    }
}

impl TypeOperations for ArrayOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        array_indices(ctx, container, indices)?;
        Ok(element(container))
    }

    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        array_indices(ctx, container, indices)?;
        let slot = element(container);
        check_value(ctx, value, &slot)?;
        Ok(slot)
    }
}

/// Arrays take one integer index per dimension.
fn array_indices(ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<(), InferenceError> {
    if indices.is_empty() {
        return Err(InferenceError::index(format!("'{}' needs an index", ctx.name(container))));
    }
    match indices.iter().find(|index| !ctx.is_int(index)) {
        Some(bad) => Err(InferenceError::index(format!(
            "'{}' cannot index '{}'",
            ctx.name(bad),
            ctx.name(container)
        ))),
        None => Ok(()),
    }
}

impl TypeOperations for MapOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        let TypeKind::Map(key, value) = container.kind() else {
            return Ok(Type::any());
        };
        map_key(ctx, container, key, indices)?;
        Ok(read_through(container, value))
    }

    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        let TypeKind::Map(key, slot) = container.kind() else {
            return Ok(Type::any());
        };
        map_key(ctx, container, key, indices)?;
        check_value(ctx, value, slot)?;
        Ok((**slot).clone())
    }
}

fn map_key(ctx: &OpsContext<'_>, container: &Type, key: &Type, indices: &[Type]) -> Result<(), InferenceError> {
    match indices {
        [index] if ctx.accepts(index, key) => Ok(()),
        [index] => Err(InferenceError::index(format!(
            "'{}' is not a valid key for '{}'",
            ctx.name(index),
            ctx.name(container)
        ))),
        _ => Err(InferenceError::index(format!(
            "'{}' takes exactly one key, got {}",
            ctx.name(container),
            indices.len()
        ))),
    }
}

impl TypeOperations for StringOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        single_int_index(ctx, container, indices)?;
        Ok(Type::int())
    }

    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        single_int_index(ctx, container, indices)?;
        check_value(ctx, value, &Type::int())?;
        Ok(Type::int())
    }
}

/// A tuple indexed by a register yields its item type only when all items
/// agree.
fn uniform_item(tuple: &TupleType) -> Type {
    let mut items = tuple.items.iter().map(|item| &item.ty);
    match items.next() {
        Some(first) if items.all(|ty| ty == first) => first.clone(),
        _ => Type::any(),
    }
}

impl TypeOperations for TupleOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, indices: &[Type]) -> Result<Type, InferenceError> {
        single_int_index(ctx, container, indices)?;
        let TypeKind::Tuple(tuple) = container.kind() else {
            return Ok(Type::any());
        };
        Ok(read_through(container, &uniform_item(tuple)))
    }

    fn check_set_item(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        indices: &[Type],
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        single_int_index(ctx, container, indices)?;
        let TypeKind::Tuple(tuple) = container.kind() else {
            return Ok(Type::any());
        };
        let slot = uniform_item(tuple);
        check_value(ctx, value, &slot)?;
        Ok(slot)
    }

    fn check_get_field(&self, _: &OpsContext<'_>, container: &Type, name: &str) -> Result<Type, InferenceError> {
        let TypeKind::Tuple(tuple) = container.kind() else {
            return Ok(Type::any());
        };
        let position = tuple.position(name).ok_or_else(|| InferenceError::no_member(name))?;
        Ok(read_through(container, &tuple.items[position].ty))
    }

    fn check_set_field(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        name: &str,
        value: &Type,
    ) -> Result<Type, InferenceError> {
        reject_invariable(ctx, container)?;
        let TypeKind::Tuple(tuple) = container.kind() else {
            return Ok(Type::any());
        };
        let position = tuple.position(name).ok_or_else(|| InferenceError::no_member(name))?;
        let slot = tuple.items[position].ty.clone();
        check_value(ctx, value, &slot)?;
        Ok(slot)
    }
}

impl TypeOperations for ObjectOps {
    fn check_get_item(&self, ctx: &OpsContext<'_>, container: &Type, _: &[Type]) -> Result<Type, InferenceError> {
        Err(InferenceError::index(format!(
            "class '{}' has no item access",
            ctx.name(container)
        )))
    }

    fn check_set_item(&self, ctx: &OpsContext<'_>, container: &Type, _: &[Type], _: &Type) -> Result<Type, InferenceError> {
        Err(InferenceError::index(format!(
            "class '{}' has no item access",
            ctx.name(container)
        )))
    }

    fn check_get_field(&self, ctx: &OpsContext<'_>, container: &Type, name: &str) -> Result<Type, InferenceError> {
        let TypeKind::Object(class) = container.kind() else {
            return Ok(Type::any());
        };
        let registry = ctx.matcher.registry();
        if let Some(found) = registry.find_field(*class, name) {
            if !registry.is_accessible(found.owner, found.field.visibility, ctx.host) {
                return Err(InferenceError::member_not_permitted(name));
            }
            return Ok(read_through(container, &found.field.ty));
        }
        ctx.methods
            .class_method(*class, name)
            .map(Type::overloads)
            .ok_or_else(|| InferenceError::no_member(name))
    }

    fn check_set_field(
        &self,
        ctx: &OpsContext<'_>,
        container: &Type,
        name: &str,
        value: &Type,
    ) -> Result<Type, InferenceError> {
        let TypeKind::Object(class) = container.kind() else {
            return Ok(Type::any());
        };
        let registry = ctx.matcher.registry();
        let found = registry
            .find_field(*class, name)
            .ok_or_else(|| InferenceError::no_member(name))?;
        if !registry.is_accessible(found.owner, found.field.visibility, ctx.host) {
            return Err(InferenceError::member_not_permitted(name));
        }
        if container.is_invariable() {
            return Err(InferenceError::const_violation(format!(
                "field '{name}' of an invariable object"
            )));
        }
        let owner_constructing = ctx.in_constructor && ctx.host == Some(found.owner);
        if found.field.invariable && !owner_constructing {
            return Err(InferenceError::const_violation(format!(
                "invariable field '{name}' outside its constructor"
            )));
        }
        check_value(ctx, value, &found.field.ty)?;
        Ok(found.field.ty.clone())
    }
}

impl TypeOperations for InterfaceOps {
    fn check_get_field(&self, ctx: &OpsContext<'_>, container: &Type, name: &str) -> Result<Type, InferenceError> {
        let TypeKind::Interface(interface) = container.kind() else {
            return Ok(Type::any());
        };
        ctx.methods
            .interface_method(*interface, name)
            .map(Type::overloads)
            .ok_or_else(|| InferenceError::no_member(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tyspec_core::{ErrorKind, TupleItem};
    use tyspec_registry::{ClassDef, ClassRegistry, FieldDef, InterfaceDef, Visibility};

    struct Methods;

    impl MethodTable for Methods {
        fn class_method(&self, _: ClassId, name: &str) -> Option<OverloadId> {
            (name == "area").then(|| OverloadId::new(3))
        }

        fn interface_method(&self, _: InterfaceId, name: &str) -> Option<OverloadId> {
            (name == "draw").then(|| OverloadId::new(4))
        }
    }

    struct Fixture {
        registry: ClassRegistry,
        point: ClassId,
        shape: InterfaceId,
    }

    fn fixture() -> Fixture {
        let mut registry = ClassRegistry::new();
        let shape = registry.register_interface(InterfaceDef::new("Shape")).unwrap();
        let point = registry
            .register_class(
                ClassDef::new("Point")
                    .implements(shape)
                    .field(FieldDef::new("x", Type::int()))
                    .field(FieldDef::new("id", Type::int()).invariable())
                    .field(FieldDef::new("tags", Type::list(Type::string())))
                    .field(FieldDef::new("secret", Type::string()).with_visibility(Visibility::Private)),
            )
            .unwrap();
        Fixture { registry, point, shape }
    }

    fn ctx<'a>(registry: &'a ClassRegistry, host: Option<ClassId>, in_constructor: bool) -> OpsContext<'a> {
        OpsContext {
            matcher: TypeMatcher::new(registry),
            methods: &Methods,
            host,
            in_constructor,
        }
    }

    #[test]
    fn list_items() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let list = Type::list(Type::float());
        let ops = operations_for(&list);
        assert_eq!(ops.check_get_item(&ctx, &list, &[Type::int()]).unwrap(), Type::float());
        let err = ops.check_get_item(&ctx, &list, &[Type::string()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
        assert_eq!(ops.check_set_item(&ctx, &list, &[Type::int()], &Type::int()).unwrap(), Type::float());
        let err = ops
            .check_set_item(&ctx, &list, &[Type::int()], &Type::string())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn invariable_containers_reject_item_writes() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let list = Type::list(Type::int()).to_invariable();
        let err = operations_for(&list)
            .check_set_item(&ctx, &list, &[Type::int()], &Type::int())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstViolation);
    }

    #[test]
    fn items_of_invariable_containers_stay_invariable() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let nested = Type::list(Type::list(Type::int())).to_const();
        let item = operations_for(&nested).check_get_item(&ctx, &nested, &[Type::int()]).unwrap();
        assert!(item.is_invariable());
    }

    #[test]
    fn map_keys() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let map = Type::map(Type::string(), Type::int());
        let ops = operations_for(&map);
        assert_eq!(ops.check_get_item(&ctx, &map, &[Type::string()]).unwrap(), Type::int());
        assert!(ops.check_get_item(&ctx, &map, &[Type::int()]).is_err());
    }

    #[test]
    fn strings_index_to_int() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let s = Type::string();
        assert_eq!(operations_for(&s).check_get_item(&ctx, &s, &[Type::int()]).unwrap(), Type::int());
    }

    #[test]
    fn arrays_take_one_index_per_dimension() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let array = Type::array(Type::float());
        let ops = operations_for(&array);
        assert_eq!(ops.check_get_item(&ctx, &array, &[Type::int(), Type::int()]).unwrap(), Type::float());
        assert!(ops.check_get_item(&ctx, &array, &[]).is_err());
    }

    #[test]
    fn tuples() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let tuple = Type::tuple(TupleType {
            items: vec![TupleItem::named("x", Type::int()), TupleItem::named("name", Type::string())],
            variadic: false,
        });
        let ops = operations_for(&tuple);
        assert_eq!(ops.check_get_field(&ctx, &tuple, "name").unwrap(), Type::string());
        assert_eq!(ops.check_get_item(&ctx, &tuple, &[Type::int()]).unwrap(), Type::any());
        let err = ops.check_get_field(&ctx, &tuple, "z").unwrap_err();
        assert_eq!(err.detail(), "member not exist 'z'");
        assert!(ops.check_set_field(&ctx, &tuple, "x", &Type::string()).is_err());
    }

    #[test]
    fn object_fields_and_methods() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let point = Type::object(f.point);
        let ops = operations_for(&point);
        assert_eq!(ops.check_get_field(&ctx, &point, "x").unwrap(), Type::int());
        assert_eq!(ops.check_get_field(&ctx, &point, "area").unwrap(), Type::overloads(OverloadId::new(3)));
        let err = ops.check_get_field(&ctx, &point, "nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FieldError);
        let err = ops.check_get_field(&ctx, &point, "secret").unwrap_err();
        assert_eq!(err.detail(), "member not permitted 'secret'");
    }

    #[test]
    fn private_fields_are_visible_to_their_class() {
        let f = fixture();
        let ctx = ctx(&f.registry, Some(f.point), false);
        let point = Type::object(f.point);
        assert_eq!(operations_for(&point).check_get_field(&ctx, &point, "secret").unwrap(), Type::string());
    }

    #[test]
    fn invariable_fields_only_in_constructor() {
        let f = fixture();
        let point = Type::object(f.point);
        let outside = ctx(&f.registry, Some(f.point), false);
        let err = operations_for(&point)
            .check_set_field(&outside, &point, "id", &Type::int())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstViolation);

        let constructing = ctx(&f.registry, Some(f.point), true);
        assert!(operations_for(&point)
            .check_set_field(&constructing, &point, "id", &Type::int())
            .is_ok());
    }

    #[test]
    fn invariable_objects_reject_field_writes() {
        let f = fixture();
        let ctx = ctx(&f.registry, Some(f.point), false);
        let point = Type::object(f.point).to_invariable();
        let err = operations_for(&point)
            .check_set_field(&ctx, &point, "x", &Type::int())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstViolation);
        let tags = operations_for(&point).check_get_field(&ctx, &point, "tags").unwrap();
        assert!(tags.is_invariable());
    }

    #[test]
    fn objects_have_no_item_access() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let point = Type::object(f.point);
        let err = operations_for(&point).check_get_item(&ctx, &point, &[Type::int()]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IndexError);
    }

    #[test]
    fn interfaces_expose_methods() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let shape = Type::interface(f.shape);
        assert_eq!(
            operations_for(&shape).check_get_field(&ctx, &shape, "draw").unwrap(),
            Type::overloads(OverloadId::new(4))
        );
        assert!(operations_for(&shape).check_set_field(&ctx, &shape, "draw", &Type::int()).is_err());
    }

    #[test]
    fn any_allows_everything() {
        let f = fixture();
        let ctx = ctx(&f.registry, None, false);
        let any = Type::any();
        assert_eq!(operations_for(&any).check_get_field(&ctx, &any, "x").unwrap(), Type::any());
        let int = Type::int();
        assert!(operations_for(&int).check_get_item(&ctx, &int, &[Type::int()]).is_err());
    }
}
