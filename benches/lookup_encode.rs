//! Run-time lookup benchmark
//!
//! A host calls the lookup once per tuning decision, so the hot path is:
//!
//! 1. `Lookup::encode` - one quantize per input, then a mixed-radix fold
//! 2. `Lookup::recommend_into` - encode plus copying the winning outputs
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench lookup_encode
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use scholar::catalog::{Catalog, Problem};
use scholar::compiler::Compiler;
use scholar::config::CompilerConfig;
use scholar::lookup::{ContextValue, Lookup, TuningSlot};
use scholar::variable::StatisticalCategory::{Categorical, Interval, Ordinal, Ratio};
use scholar::variable::{Role, StatisticalCategory, TypedValue, Value, ValueType, Variable};

const SIZE: i64 = 1;
const THREADS: i64 = 2;
const RATE: i64 = 3;
const CHUNK: i64 = 4;

fn variable(
    id: i64,
    name: &str,
    value_type: ValueType,
    category: StatisticalCategory,
    role: Role,
) -> Variable {
    Variable {
        id,
        name: name.to_string(),
        value_type,
        category,
        role,
    }
}

/// Problem 1: size (ratio), threads (categorical), rate (interval) -> chunk
fn lookup(slices: usize) -> Lookup {
    let mut builder = Catalog::builder();
    builder
        .variable(variable(SIZE, "size", ValueType::Float, Ratio, Role::Input))
        .variable(variable(THREADS, "threads", ValueType::Integer, Categorical, Role::Input))
        .variable(variable(RATE, "rate", ValueType::Float, Interval, Role::Input))
        .variable(variable(CHUNK, "chunk", ValueType::Integer, Ordinal, Role::Output))
        .problem(Problem {
            id: 1,
            inputs: vec![SIZE, THREADS, RATE],
            outputs: vec![CHUNK],
        });

    let mut id = 0;
    for size in [1.0, 10.0, 100.0, 1000.0, 10000.0] {
        for threads in [1, 2, 4, 8] {
            for rate in [0.0, 0.25, 0.5, 0.75, 1.0] {
                for chunk in [16, 64, 256] {
                    id += 1;
                    let result = (size / chunk as f64 - threads as f64).abs() + rate;
                    builder.trial(
                        id,
                        1,
                        result,
                        &[
                            (SIZE, Value::Continuous(size)),
                            (THREADS, Value::Discrete(threads)),
                            (RATE, Value::Continuous(rate)),
                            (CHUNK, Value::Discrete(chunk)),
                        ],
                    );
                }
            }
        }
    }

    let catalog = builder.build().unwrap();
    let config = CompilerConfig {
        slices,
        ..CompilerConfig::default()
    };
    let compilation = Compiler::new(&catalog, &config).compile_all().unwrap();
    Lookup::from_artifact(compilation.compiled[0].artifact.clone()).unwrap()
}

fn context() -> [ContextValue; 3] {
    [
        ContextValue::new(SIZE, TypedValue::Float(420.0)),
        ContextValue::new(THREADS, TypedValue::Integer(4)),
        ContextValue::new(RATE, TypedValue::Float(0.6)),
    ]
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_encode");
    for slices in [10, 50, 200] {
        let lookup = lookup(slices);
        let context = context();
        group.bench_with_input(BenchmarkId::from_parameter(slices), &slices, |b, _| {
            b.iter(|| black_box(lookup.encode(black_box(&context))))
        });
    }
    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let lookup = lookup(10);
    let context = context();
    let mut slots = [TuningSlot::new(CHUNK)];
    c.bench_function("lookup_recommend_into", |b| {
        b.iter(|| black_box(lookup.recommend_into(black_box(&context), &mut slots)))
    });
}

criterion_group!(benches, bench_encode, bench_recommend);
criterion_main!(benches);
