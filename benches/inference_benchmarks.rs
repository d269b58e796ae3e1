//! Performance benchmarks for the inference pass.
//!
//! - Straight-line arithmetic of growing length
//! - Switch-heavy routines that build jump tables
//! - Programs calling one generic routine with many argument types
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect scope timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use tyspec::infer_program;
use tyspec::prelude::*;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `r0 + r1` chained `length` times, alternating int and float operands.
fn arithmetic_chain(length: u16) -> Routine {
    let signature = RoutineType::new(
        vec![Param::new("i", Type::int()), Param::new("f", Type::float())],
        Type::holder(HolderId::new(0), "R"),
    );
    let mut code = Vec::with_capacity(usize::from(length) + 1);
    let mut last = 0;
    for step in 0..length {
        let target = step + 2;
        let operand = if step % 2 == 0 { 1 } else { 0 };
        code.push(Instruction::new(OpCode::Add, last, operand, target));
        last = target;
    }
    code.push(Instruction::new(OpCode::Return, last, 1, 0));
    Routine::new("chain", signature)
        .with_register_count(usize::from(length) + 2)
        .with_code(code)
}

/// A dense int switch with `cases` entries.
fn dense_switch(cases: u16) -> Routine {
    let signature = RoutineType::new(vec![Param::new("key", Type::int())], Type::none());
    let end = cases + 1;
    let mut routine = Routine::new("dispatch", signature);
    let mut code = vec![Instruction::new(OpCode::Switch, 0, end, cases)];
    for key in 0..cases {
        let constant = routine.add_constant(Value::Int(i64::from(key)));
        code.push(Instruction::new(OpCode::Case, constant, end, case::ORDERED));
    }
    code.push(Instruction::new(OpCode::Return, 0, 0, 0));
    routine.with_code(code)
}

fn straight_line_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = ClassRegistry::new();

    let mut group = c.benchmark_group("infer/arithmetic");
    for length in [8u16, 64, 512] {
        group.throughput(Throughput::Elements(u64::from(length)));
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, &length| {
            b.iter(|| {
                let session = Session::new(&registry);
                let id = session.add_routine(arithmetic_chain(length));
                let inferred = session.infer(id);
                end_profiling_frame();
                black_box(inferred)
            });
        });
    }
    group.finish();
}

fn switch_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = ClassRegistry::new();

    let mut group = c.benchmark_group("infer/switch");
    for cases in [4u16, 64, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(cases), &cases, |b, &cases| {
            b.iter(|| {
                let session = Session::new(&registry);
                let id = session.add_routine(dense_switch(cases));
                let inferred = session.infer(id);
                end_profiling_frame();
                black_box(inferred)
            });
        });
    }
    group.finish();
}

fn specialization_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = ClassRegistry::new();
    let values = [Value::Int(1), Value::float(1.5), Value::string("s"), Value::Bool(true)];

    c.bench_function("infer/generic_calls", |b| {
        b.iter(|| {
            let session = Session::new(&registry);
            let t = Type::holder(HolderId::new(0), "T");
            let identity = Routine::new("id", RoutineType::new(vec![Param::new("x", t.clone())], t))
                .with_code(vec![Instruction::new(OpCode::Return, 0, 1, 0)]);
            let id = session.add_routine(identity);
            for n in 0..32 {
                let mut caller = Routine::new(format!("caller{n}"), RoutineType::new(vec![], Type::none()))
                    .with_register_count(3);
                let callee = caller.add_constant(Value::Routine(id));
                let argument = caller.add_constant(values[n % values.len()].clone());
                let caller = caller.with_code(vec![
                    Instruction::new(OpCode::GetCl, 0, callee, 0),
                    Instruction::new(OpCode::GetCl, 0, argument, 1),
                    Instruction::new(OpCode::Call, 0, 1, 2),
                    Instruction::new(OpCode::Return, 0, 0, 0),
                ]);
                session.add_routine(caller);
            }
            let report = infer_program(&session);
            end_profiling_frame();
            black_box(report.stats)
        });
    });
}

criterion_group!(
    benches,
    straight_line_benchmarks,
    switch_benchmarks,
    specialization_benchmarks
);
criterion_main!(benches);
