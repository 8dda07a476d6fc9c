//! Criterion benchmarks for building and evaluating expressions.
//!
//! Run with: cargo bench -p reckon-eval

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reckon_eval::{BinOp, Builder, Expression, Value};

const VARS: usize = 64;

/// Sum of `(x_i * c_i) - x_{i+1}` terms over `VARS` variables.
fn build(vars: usize) -> Expression<Value> {
    let mut b: Builder<Value> = Builder::new();
    let ids: Vec<_> = (0..vars)
        .map(|i| b.var(&format!("x{i}")).unwrap())
        .collect();
    let mut acc = b.constant(0i64).unwrap();
    for i in 0..vars {
        let c = b.constant(i as i64 + 1).unwrap();
        let term = b.binary(BinOp::Mul, ids[i], c).unwrap();
        let next = ids[(i + 1) % vars];
        let term = b.binary(BinOp::Sub, term, next).unwrap();
        acc = b.binary(BinOp::Add, acc, term).unwrap();
    }
    b.build().unwrap()
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("build_64_vars", |b| b.iter(|| build(black_box(VARS))));
}

fn bench_evaluate(c: &mut Criterion) {
    let expr = build(VARS);
    let mut rng = StdRng::seed_from_u64(7);

    for (name, cache) in [("evaluate_cached", true), ("evaluate_uncached", false)] {
        let mut ctx = expr.context::<Value>(cache);
        for slot in 0..VARS {
            ctx.assign(slot, rng.gen_range(-1000i64..1000)).unwrap();
        }
        c.bench_function(name, |b| {
            b.iter(|| {
                let slot = rng.gen_range(0..VARS);
                ctx.assign(slot, rng.gen_range(-1000i64..1000)).unwrap();
                black_box(expr.evaluate(&mut ctx).unwrap())
            })
        });
    }
}

criterion_group!(benches, bench_build, bench_evaluate);
criterion_main!(benches);
