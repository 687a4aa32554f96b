//! Performance benchmarks for values and the calling convention.
//!
//! - Values: copy-on-write arrays, loose comparison, numeric strings
//! - Dispatch: native functions and methods called through a request
//! - Iteration: array and traversable cursors
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use phpbridge::core::numeric;
use phpbridge::prelude::*;

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

#[cfg(feature = "profile-with-puffin")]
fn print_profiling_stats() {
    let Some(frame_view) = FRAME_VIEW.get() else {
        println!("Profiler not initialized");
        return;
    };
    let frames = frame_view.lock().recent_frames().count();
    println!("\n=== Profiling: {frames} frames recorded ===\n");
}

#[cfg(not(feature = "profile-with-puffin"))]
fn print_profiling_stats() {}

#[derive(Default)]
struct Counter {
    total: i64,
}

struct Steps {
    at: i64,
    end: i64,
}

impl ObjectIterator for Steps {
    fn valid(&self) -> bool {
        self.at < self.end
    }

    fn current(&self) -> Value {
        Value::from(self.at)
    }

    fn key(&self) -> Value {
        Value::from(self.at)
    }

    fn next(&mut self) {
        self.at += 1;
    }

    fn rewind(&mut self) {
        self.at = 0;
    }
}

impl Traversable for Counter {
    fn iterator(&self) -> Box<dyn ObjectIterator> {
        Box::new(Steps {
            at: 0,
            end: self.total,
        })
    }
}

fn engine() -> Rc<Engine> {
    let mut extension = Extension::new("bench", "1.0");
    extension
        .function(
            "add",
            |params: &mut Parameters| -> Result<i64, ValueError> {
                Ok(params.get::<i64>(0)? + params.get::<i64>(1)?)
            },
            [
                Argument::by_val("a").of_type(Type::Numeric),
                Argument::by_val("b").of_type(Type::Numeric),
            ],
        )
        .unwrap()
        .add_class(
            Class::<Counter>::new("Counter")
                .traversable()
                .method(
                    "add",
                    |counter: &mut Counter, params: &mut Parameters| -> Result<i64, ValueError> {
                        counter.total += params.get::<i64>(0)?;
                        Ok(counter.total)
                    },
                    [Argument::by_val("amount").of_type(Type::Numeric)],
                ),
        )
        .unwrap();
    let engine = Rc::new(Engine::new());
    extension.initialize(&engine).unwrap();
    engine
}

fn array_of(size: i64) -> Value {
    (0..size).map(|i| (format!("key{i}"), i)).collect()
}

/// Copy-on-write arrays and comparisons.
fn value_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let mut group = c.benchmark_group("value/arrays");

    for size in [16_i64, 256, 4096] {
        let array = array_of(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("build", size), &size, |b, &size| {
            b.iter(|| black_box(array_of(size)))
        });

        group.bench_with_input(BenchmarkId::new("shared_copy", size), &array, |b, array| {
            b.iter(|| black_box(array.clone()).size())
        });

        group.bench_with_input(
            BenchmarkId::new("separate_on_write", size),
            &array,
            |b, array| {
                b.iter(|| {
                    let mut copy = array.clone();
                    copy.set("extra", 1).unwrap();
                    black_box(copy)
                })
            },
        );

        group.bench_with_input(BenchmarkId::new("loose_eq", size), &array, |b, array| {
            let other = array_of(size);
            b.iter(|| black_box(array.loose_eq(&other)))
        });
    }
    group.finish();

    let mut group = c.benchmark_group("value/numeric");
    for input in ["42", "  -1.5e3", "12abc", "0x1A", "9223372036854775808"] {
        group.bench_with_input(BenchmarkId::new("classify", input), input, |b, input| {
            b.iter(|| black_box(numeric::classify(black_box(input.as_bytes()))))
        });
    }
    group.bench_function("format_double", |b| {
        b.iter(|| black_box(numeric::format_double(black_box(1.0 / 3.0), 14)))
    });
    group.bench_function("add_mixed", |b| {
        let (left, right) = (Value::from("10"), Value::from(2.5));
        b.iter(|| black_box(left.checked_add(&right).unwrap()))
    });
    group.finish();
}

/// Native calls through a request.
fn dispatch_benchmarks(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("dispatch");

    group.bench_function("function", |b| {
        let request = engine.request();
        b.iter(|| {
            let result = request
                .call_function("add", vec![black_box(1).into(), black_box(2).into()])
                .unwrap();
            end_profiling_frame();
            black_box(result)
        })
    });

    group.bench_function("function_coerced", |b| {
        let request = engine.request();
        b.iter(|| {
            black_box(
                request
                    .call_function("add", vec!["1".into(), 2.0.into()])
                    .unwrap(),
            )
        })
    });

    group.bench_function("method", |b| {
        let request = engine.request();
        let counter = request.create_object("Counter", vec![]).unwrap();
        b.iter(|| {
            black_box(
                request
                    .call_method(&counter, "add", vec![1.into()])
                    .unwrap(),
            )
        })
    });

    group.bench_function("callable_string", |b| {
        let request = engine.request();
        let callable = Value::from("add");
        b.iter(|| black_box(request.call(&callable, vec![1.into(), 2.into()]).unwrap()))
    });
    group.finish();
}

/// Cursor overhead per element.
fn iteration_benchmarks(c: &mut Criterion) {
    let engine = engine();
    let mut group = c.benchmark_group("iteration");
    let size = 1024_i64;
    group.throughput(Throughput::Elements(size as u64));

    let array = array_of(size);
    group.bench_function("array", |b| b.iter(|| black_box(array.iter().count())));

    group.bench_function("traversable", |b| {
        let request = engine.request();
        let counter = request.create_object("Counter", vec![]).unwrap();
        request
            .call_method(&counter, "add", vec![size.into()])
            .unwrap();
        b.iter(|| black_box(request.iterate(&counter).count()))
    });
    group.finish();

    print_profiling_stats();
}

criterion_group!(
    benches,
    value_benchmarks,
    dispatch_benchmarks,
    iteration_benchmarks
);
criterion_main!(benches);
