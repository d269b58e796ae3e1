//! Scenario tests for the inference pass, run through the public API.

mod harness;

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use harness::{RoutineBuilder, declared, error_kinds, identity, infer, infer_alone};
use tyspec::compiler::RegisterFile;
use tyspec::prelude::*;
use tyspec::{ProgramReport, infer_program};

fn numeric(rank: u8) -> Type {
    match rank {
        1 => Type::int(),
        2 => Type::float(),
        _ => Type::complex(),
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

#[test]
fn int_add_infers_int() {
    let inferred = infer_alone(
        RoutineBuilder::new("add")
            .param(Type::int())
            .param(Type::int())
            .returns(Type::int())
            .registers(3)
            .op(OpCode::Add, 0, 1, 2)
            .ret(2)
            .build(),
    );
    assert!(inferred.success);
    assert_eq!(inferred.register(2), Some(&Type::int()));
    inferred.code.assert_opcodes(&[OpCode::AddIII, OpCode::Return]);
}

#[test]
fn float_plus_int_widens_once() {
    let inferred = infer_alone(
        RoutineBuilder::new("mix")
            .param(Type::float())
            .param(Type::int())
            .returns(Type::float())
            .registers(3)
            .op(OpCode::Add, 0, 1, 2)
            .ret(2)
            .build(),
    );
    assert!(inferred.success);
    assert_eq!(inferred.register(2), Some(&Type::float()));
    inferred
        .code
        .assert_opcodes(&[OpCode::MoveFI, OpCode::AddFFF, OpCode::Return]);
    let widenings = inferred.code.iter().filter(|ins| ins.op == OpCode::MoveFI).count();
    assert_eq!(widenings, 1);
}

#[test]
fn string_concatenation_does_not_widen() {
    let inferred = infer_alone(
        RoutineBuilder::new("greet")
            .param(Type::string())
            .returns(Type::string())
            .registers(3)
            .load_constant(Value::string("hello, "), 1)
            .op(OpCode::Add, 1, 0, 2)
            .ret(2)
            .build(),
    );
    assert!(inferred.success);
    assert_eq!(inferred.register(2), Some(&Type::string()));
    inferred
        .code
        .assert_opcodes(&[OpCode::GetCl, OpCode::AddSSS, OpCode::Return]);
}

// =============================================================================
// Calls
// =============================================================================

#[test]
fn ambiguous_overload_is_a_param_error() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let f_int = session.add_routine(declared("f", vec![Type::int()], Type::int()));
    let f_str = session.add_routine(declared("f", vec![Type::string()], Type::string()));
    let f = session.add_overloads("f", vec![f_int, f_str]);

    let caller = RoutineBuilder::new("caller")
        .param(Type::any())
        .registers(4)
        .load_constant(Value::Overloads(f), 1)
        .op(OpCode::Load, 0, 0, 2)
        .op(OpCode::Call, 1, 1, 3)
        .ret_none()
        .build();
    let inferred = infer(&session, caller);
    assert!(!inferred.success);
    assert_eq!(error_kinds(&inferred), vec![ErrorKind::ParamError]);
}

#[test]
fn overloads_pick_the_exact_match() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let f_int = session.add_routine(declared("f", vec![Type::int()], Type::int()));
    let f_str = session.add_routine(declared("f", vec![Type::string()], Type::string()));
    let f = session.add_overloads("f", vec![f_int, f_str]);

    let caller = RoutineBuilder::new("caller")
        .registers(3)
        .load_constant(Value::Overloads(f), 0)
        .load_constant(Value::string("x"), 1)
        .op(OpCode::Call, 0, 1, 2)
        .ret_none()
        .build();
    let inferred = infer(&session, caller);
    assert!(inferred.success);
    assert_eq!(inferred.register(2), Some(&Type::string()));
}

#[test]
fn generic_identity_is_specialized_per_argument_type() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let id = identity(&session);

    let caller = RoutineBuilder::new("caller")
        .registers(9)
        .load_constant(Value::Routine(id), 0)
        .load_constant(Value::Int(1), 1)
        .op(OpCode::Call, 0, 1, 2)
        .op(OpCode::Load, 0, 0, 3)
        .load_constant(Value::string("s"), 4)
        .op(OpCode::Call, 3, 1, 5)
        .op(OpCode::Load, 0, 0, 6)
        .load_constant(Value::Int(2), 7)
        .op(OpCode::Call, 6, 1, 8)
        .ret_none()
        .build();
    let inferred = infer(&session, caller);
    assert!(inferred.success);
    assert_eq!(inferred.register(2), Some(&Type::int()));
    assert_eq!(inferred.register(5), Some(&Type::string()));
    assert_eq!(inferred.register(8), Some(&Type::int()));
    assert_eq!(session.specialization_count(), 2);
    assert_eq!(session.stats().specializations, 2);
}

#[test]
fn arity_mismatch_is_a_param_error() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let g = session.add_routine(declared("g", vec![Type::int(), Type::int()], Type::int()));
    let caller = RoutineBuilder::new("caller")
        .registers(3)
        .load_constant(Value::Routine(g), 0)
        .load_constant(Value::Int(1), 1)
        .op(OpCode::Call, 0, 1, 2)
        .ret_none()
        .build();
    let inferred = infer(&session, caller);
    assert_eq!(error_kinds(&inferred), vec![ErrorKind::ParamError]);
}

// =============================================================================
// Classes
// =============================================================================

fn point_registry() -> (ClassRegistry, ClassId) {
    let mut registry = ClassRegistry::new();
    let point = registry
        .register_class(
            ClassDef::new("Point")
                .field(FieldDef::new("x", Type::float()).invariable())
                .field(FieldDef::new("y", Type::float())),
        )
        .unwrap();
    (registry, point)
}

#[test]
fn invariable_field_outside_constructor_is_a_const_violation() {
    let (registry, point) = point_registry();
    let session = Session::new(&registry);
    let mut builder = RoutineBuilder::new("nudge")
        .param(Type::object(point))
        .param(Type::float())
        .registers(2);
    let x = builder.constant(Value::string("x"));
    let inferred = infer(&session, builder.op(OpCode::SetF, 1, x, 0).ret_none().build());
    assert_eq!(error_kinds(&inferred), vec![ErrorKind::ConstViolation]);
}

#[test]
fn constructor_may_set_invariable_fields() {
    let (registry, point) = point_registry();
    let session = Session::new(&registry);
    let mut builder = RoutineBuilder::new("init")
        .self_param(Type::object(point))
        .param(Type::float())
        .registers(2);
    let x = builder.constant(Value::string("x"));
    let id = session.add_constructor(point, builder.op(OpCode::SetF, 1, x, 0).ret_none().build());
    let inferred = session.infer(id).unwrap();
    assert!(inferred.success, "{:?}", error_kinds(&inferred));
    assert_eq!(inferred.name, "Point");
}

#[test]
fn ordinary_fields_read_their_declared_type() {
    let (registry, point) = point_registry();
    let session = Session::new(&registry);
    let mut builder = RoutineBuilder::new("read")
        .param(Type::object(point))
        .returns(Type::holder(HolderId::new(0), "R"))
        .registers(2);
    let y = builder.constant(Value::string("y"));
    let inferred = infer(&session, builder.op(OpCode::GetF, 0, y, 1).ret(1).build());
    assert!(inferred.success);
    assert_eq!(inferred.return_type(), &Type::float());
}

#[test]
fn missing_field_is_a_field_error() {
    let (registry, point) = point_registry();
    let session = Session::new(&registry);
    let mut builder = RoutineBuilder::new("read").param(Type::object(point)).registers(2);
    let z = builder.constant(Value::string("z"));
    let inferred = infer(&session, builder.op(OpCode::GetF, 0, z, 1).ret_none().build());
    assert_eq!(error_kinds(&inferred), vec![ErrorKind::FieldError]);
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn dense_switch_over_ints_uses_a_table() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let mut builder = RoutineBuilder::new("pick").param(Type::int()).registers(1);
    let keys: Vec<u16> = [0, 1, 2, 3].iter().map(|&k| builder.constant(Value::Int(k))).collect();
    let mut builder = builder.op(OpCode::Switch, 0, 5, keys.len() as u16);
    for key in keys {
        builder = builder.op(OpCode::Case, key, 5, case::ORDERED);
    }
    let inferred = infer(&session, builder.ret_none().build());
    assert!(inferred.success);
    assert_eq!(session.stats().jump_tables, 1);
    assert!(inferred.code.iter().filter(|ins| ins.op == OpCode::Case).all(|ins| ins.c == case::TABLE));
}

#[test]
fn table_density_is_configurable() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry).with_config(InferenceConfig::new().with_switch_table_density(0.99));
    let mut builder = RoutineBuilder::new("pick").param(Type::int()).registers(1);
    let keys: Vec<u16> = [1, 2, 3, 5].iter().map(|&k| builder.constant(Value::Int(k))).collect();
    let mut builder = builder.op(OpCode::Switch, 0, 5, keys.len() as u16);
    for key in keys {
        builder = builder.op(OpCode::Case, key, 5, case::ORDERED);
    }
    let inferred = infer(&session, builder.ret_none().build());
    assert!(inferred.success);
    assert_eq!(session.stats().jump_tables, 0);
}

#[test]
fn main_must_return_int() {
    let inferred = infer_alone(
        RoutineBuilder::new("main")
            .returns(Type::string())
            .registers(1)
            .attribs(RoutineAttrs::MAIN)
            .load_constant(Value::string("done"), 0)
            .ret(0)
            .build(),
    );
    assert_eq!(error_kinds(&inferred), vec![ErrorKind::TypeMismatch]);
}

#[test]
fn diagnostics_carry_a_snippet() {
    let inferred = infer_alone(
        RoutineBuilder::new("area")
            .param(Type::int())
            .returns(Type::int())
            .registers(3)
            .load_constant(Value::string("wide"), 1)
            .op(OpCode::Sub, 0, 1, 2)
            .ret(2)
            .build(),
    );
    let diagnostic = inferred.diagnostics.iter().next().unwrap();
    assert!(diagnostic.message.contains("in routine \"area\""));
    assert!(diagnostic.message.contains(">>"));
    assert_eq!(diagnostic.span.line, 2);
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn sink_receives_every_diagnostic() {
    let registry = ClassRegistry::new();
    let sink = Arc::new(CollectingSink::new());
    let session = Session::new(&registry)
        .with_config(InferenceConfig::new().silent())
        .with_sink(sink.clone());
    session.add_routine(
        RoutineBuilder::new("bad")
            .returns(Type::int())
            .registers(2)
            .load_constant(Value::string("a"), 0)
            .op(OpCode::Minus, 0, 0, 1)
            .ret(1)
            .build(),
    );
    session.add_routine(declared("ok", vec![], Type::none()));

    let report: ProgramReport = infer_program(&session);
    assert!(!report.is_success());
    assert_eq!(report.routines.len(), 2);
    assert_eq!(report.failed().count(), 1);
    assert_eq!(sink.diagnostics().len(), report.diagnostic_count());
    assert!(sink.fatal_errors().is_empty());
}

#[test]
fn independent_routines_infer_in_parallel() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    let id = identity(&session);
    let callers: Vec<RoutineId> = (0..8)
        .map(|n| {
            let value = if n % 2 == 0 { Value::Int(n) } else { Value::string("s") };
            session.add_routine(
                RoutineBuilder::new(&format!("caller{n}"))
                    .registers(3)
                    .load_constant(Value::Routine(id), 0)
                    .load_constant(value, 1)
                    .op(OpCode::Call, 0, 1, 2)
                    .ret_none()
                    .build(),
            )
        })
        .collect();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = callers
            .iter()
            .map(|&caller| {
                let session = &session;
                scope.spawn(move || session.infer(caller))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });
    assert!(results.iter().all(|result| result.as_ref().is_ok_and(|r| r.success)));
    assert_eq!(session.specialization_count(), 2);
}

#[test]
fn unknown_routine_is_fatal() {
    let registry = ClassRegistry::new();
    let session = Session::new(&registry);
    assert!(session.infer(RoutineId::new(7)).is_err());
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn registers_are_written_once(first in 0u8..6, second in 0u8..6) {
        let primitive = |n: u8| match n {
            0 => Type::bool(),
            1 => Type::int(),
            2 => Type::float(),
            3 => Type::complex(),
            4 => Type::string(),
            _ => Type::none(),
        };
        let registry = ClassRegistry::new();
        let mut registers = RegisterFile::new(1);
        registers.assign(0, primitive(first), &registry).unwrap();
        let again = registers.assign(0, primitive(second), &registry);
        prop_assert_eq!(again.is_ok(), first == second);
        prop_assert!(registers.assign(0, primitive(first), &registry).is_ok());
    }

    #[test]
    fn numeric_add_widens_only_the_narrower_operand(left in 1u8..=3, right in 1u8..=3) {
        let inferred = infer_alone(
            RoutineBuilder::new("add")
                .param(numeric(left))
                .param(numeric(right))
                .returns(Type::holder(HolderId::new(0), "R"))
                .registers(3)
                .op(OpCode::Add, 0, 1, 2)
                .ret(2)
                .build(),
        );
        prop_assert!(inferred.success);
        prop_assert_eq!(inferred.return_type(), &numeric(left.max(right)));
        let widenings = inferred
            .code
            .iter()
            .filter(|ins| ins.op.name().starts_with("MOVE_"))
            .count();
        prop_assert_eq!(widenings, usize::from(left != right));
    }
}
