//! poly_gcd benchmark: dense multivariate GCDs with a planted common factor.
//!
//! Tests: gcd(a·g, b·g) where a, b, g are powers of 4-variable linear forms,
//! measured at the MultiPoly level (heuristic vs subresultant) and through
//! the expression-level entry point with its structural shortcuts.

use cas_ast::{Context, ExprId};
use cas_engine::{calc, expand::expand, gcd, CalcEnv, EvaluationOptions};
use cas_math::poly_gcd::{heur_gcd, sr_gcd};
use cas_math::{multipoly_from_expr, HeuristicGcdConfig, MultiPoly, NoInterrupt, PolyBudget};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

/// `(c0 + c1*x1 + ... + c4*x4)^k + shift`, expanded.
fn linear_power(ctx: &mut Context, vars: &[ExprId], coeffs: &[i64], k: i64, shift: i64) -> ExprId {
    let mut terms = vec![ctx.num(coeffs[0])];
    for (&v, &c) in vars.iter().zip(&coeffs[1..]) {
        let c = ctx.num(c);
        terms.push(calc::mul(ctx, c, v));
    }
    let base = calc::add_all(ctx, terms);
    let p = calc::pow_int(ctx, base, k);
    let s = ctx.num(shift);
    let p = calc::add(ctx, p, s);
    expand(ctx, p, 32)
}

struct Case {
    ctx: Context,
    ag: ExprId,
    bg: ExprId,
    pa: MultiPoly,
    pb: MultiPoly,
}

fn build_case(k: i64) -> Case {
    let mut ctx = Context::new();
    let vars: Vec<ExprId> = ["x1", "x2", "x3", "x4"].iter().map(|n| ctx.var(n)).collect();
    let a = linear_power(&mut ctx, &vars, &[1, 3, 5, 7, 9], k, -1);
    let b = linear_power(&mut ctx, &vars, &[1, -3, -5, 7, -9], k, 1);
    let g = linear_power(&mut ctx, &vars, &[1, 3, 5, -7, 9], k, 3);
    let ag = calc::mul(&mut ctx, a, g);
    let ag = expand(&mut ctx, ag, 32);
    let bg = calc::mul(&mut ctx, b, g);
    let bg = expand(&mut ctx, bg, 32);
    let budget = PolyBudget {
        max_terms: 1_000_000,
        max_pow_exp: 32,
    };
    let pa = multipoly_from_expr(&ctx, ag, &vars, &budget).expect("convert a*g");
    let pb = multipoly_from_expr(&ctx, bg, &vars, &budget).expect("convert b*g");
    Case { ctx, ag, bg, pa, pb }
}

fn bench_poly_gcd(c: &mut Criterion) {
    let cfg = HeuristicGcdConfig::default();
    let mut group = c.benchmark_group("poly_gcd");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for k in [2i64, 3, 4] {
        let case = build_case(k);
        println!(
            "k={}: a*g {} terms, b*g {} terms",
            k,
            case.pa.num_terms(),
            case.pb.num_terms()
        );

        group.bench_with_input(BenchmarkId::new("heuristic", k), &case, |bench, case| {
            bench.iter(|| heur_gcd(&case.pa, &case.pb, &cfg, &NoInterrupt))
        });
        group.bench_with_input(BenchmarkId::new("subresultant", k), &case, |bench, case| {
            bench.iter(|| sr_gcd(&case.pa, &case.pb, &cfg, &NoInterrupt))
        });
        group.bench_with_input(BenchmarkId::new("expression", k), &case, |bench, case| {
            let opts = EvaluationOptions::default();
            let env = CalcEnv::new();
            bench.iter_batched(
                || case.ctx.clone(),
                |mut ctx| gcd(&mut ctx, case.ag, case.bg, &opts, &env),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_poly_gcd);
criterion_main!(benches);
