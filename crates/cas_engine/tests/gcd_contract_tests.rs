//! Contract tests for the expression-level GCD.
//!
//! Tests verify:
//! - gcd * cofactor reproduces each operand
//! - the gcd divides both operands exactly
//! - lcm of coprime operands is their product
//! - non-polynomials and cancellation degrade to (1, a, b)

use cas_ast::{Context, ExprId};
use cas_engine::{calc, expand::expand, gcd, lcm, polynomial_divide, CalcEnv, EvaluationOptions};
use cas_math::{multipoly_from_expr, PolyBudget};
use proptest::prelude::*;

/// `sum c * x^i * y^j`
fn build(ctx: &mut Context, terms: &[(i64, u32, u32)]) -> ExprId {
    let x = ctx.var("x");
    let y = ctx.var("y");
    let parts: Vec<ExprId> = terms
        .iter()
        .map(|&(c, i, j)| {
            let c = ctx.num(c);
            let xi = calc::pow_int(ctx, x, i as i64);
            let yj = calc::pow_int(ctx, y, j as i64);
            calc::mul_all(ctx, [c, xi, yj])
        })
        .collect();
    calc::add_all(ctx, parts)
}

fn same_poly(ctx: &mut Context, a: ExprId, b: ExprId) -> bool {
    let vars = [ctx.var("x"), ctx.var("y")];
    let a = expand(ctx, a, 64);
    let b = expand(ctx, b, 64);
    let budget = PolyBudget::default();
    let pa = multipoly_from_expr(ctx, a, &vars, &budget).unwrap();
    let pb = multipoly_from_expr(ctx, b, &vars, &budget).unwrap();
    pa == pb
}

/// `a` and `b` divide each other.
fn associated(ctx: &mut Context, a: ExprId, b: ExprId, env: &CalcEnv) -> bool {
    let a = expand(ctx, a, 64);
    let b = expand(ctx, b, 64);
    let ab = polynomial_divide(ctx, a, b, env).unwrap();
    let ba = polynomial_divide(ctx, b, a, env).unwrap();
    ab.is_some() && ba.is_some()
}

fn arb_terms() -> impl Strategy<Value = Vec<(i64, u32, u32)>> {
    prop::collection::vec((-5i64..=5, 0u32..=2, 0u32..=2), 1..4)
}

#[test]
fn difference_of_squares_and_linear_factor() {
    let mut ctx = Context::new();
    let a = build(&mut ctx, &[(1, 2, 0), (-1, 0, 0)]);
    let b = build(&mut ctx, &[(1, 1, 0), (-1, 0, 0)]);
    let env = CalcEnv::new();
    let r = gcd(&mut ctx, a, b, &EvaluationOptions::default(), &env);
    assert!(r.succeeded);
    assert!(same_poly(&mut ctx, r.gcd, b));
    let one = ctx.num(1);
    assert!(same_poly(&mut ctx, r.cofactor_b, one));
}

#[test]
fn multivariate_common_factor() {
    let mut ctx = Context::new();
    // (x + y) * (x - 2y) and (x + y) * (3x + 1)
    let g = build(&mut ctx, &[(1, 1, 0), (1, 0, 1)]);
    let p = build(&mut ctx, &[(1, 1, 0), (-2, 0, 1)]);
    let q = build(&mut ctx, &[(3, 1, 0), (1, 0, 0)]);
    let a = calc::mul(&mut ctx, g, p);
    let a = expand(&mut ctx, a, 64);
    let b = calc::mul(&mut ctx, g, q);
    let b = expand(&mut ctx, b, 64);
    let env = CalcEnv::new();
    let r = gcd(&mut ctx, a, b, &EvaluationOptions::default(), &env);
    assert!(r.succeeded);
    assert!(same_poly(&mut ctx, r.gcd, g));
}

#[test]
fn uncanonical_zero_does_not_make_symbol_coprime() {
    let mut ctx = Context::new();
    let x = ctx.var("x");
    let y = ctx.var("y");
    // x + (1 + y)^2 - (1 + 2y + y^2) is x written with a hidden zero
    let one = ctx.num(1);
    let yp1 = calc::add(&mut ctx, one, y);
    let sq = calc::pow_int(&mut ctx, yp1, 2);
    let expanded = build(&mut ctx, &[(1, 0, 0), (2, 0, 1), (1, 0, 2)]);
    let zero = calc::sub(&mut ctx, sq, expanded);
    let b = calc::add(&mut ctx, x, zero);

    let env = CalcEnv::new();
    let r = gcd(&mut ctx, x, b, &EvaluationOptions::default(), &env);
    assert!(r.succeeded);
    assert!(same_poly(&mut ctx, r.gcd, x));
    let ra = calc::mul(&mut ctx, r.gcd, r.cofactor_a);
    assert!(same_poly(&mut ctx, ra, x));
    let rb = calc::mul(&mut ctx, r.gcd, r.cofactor_b);
    assert!(same_poly(&mut ctx, rb, b));
}

#[test]
fn lcm_of_coprime_operands_is_product() {
    let mut ctx = Context::new();
    let a = build(&mut ctx, &[(1, 1, 0), (1, 0, 0)]);
    let b = build(&mut ctx, &[(1, 0, 1), (-2, 0, 0)]);
    let env = CalcEnv::new();
    let l = lcm(&mut ctx, a, b, &EvaluationOptions::default(), &env);
    let ab = calc::mul(&mut ctx, a, b);
    assert!(same_poly(&mut ctx, l, ab));
}

#[test]
fn cancelled_environment_degrades() {
    let mut ctx = Context::new();
    let a = build(&mut ctx, &[(1, 2, 0), (-1, 0, 0)]);
    let b = build(&mut ctx, &[(1, 1, 0), (-1, 0, 0)]);
    let env = CalcEnv::new();
    env.abort_handle().abort();
    let r = gcd(&mut ctx, a, b, &EvaluationOptions::default(), &env);
    assert!(!r.succeeded);
    assert!(ctx.is_one(r.gcd));
    assert_eq!((r.cofactor_a, r.cofactor_b), (a, b));
}

#[test]
fn non_polynomial_operand_degrades() {
    let mut ctx = Context::new();
    let x = ctx.var("x");
    let a = ctx.call("sin", vec![x]);
    let b = build(&mut ctx, &[(1, 1, 0), (-1, 0, 0)]);
    let env = CalcEnv::new();
    let r = gcd(&mut ctx, a, b, &EvaluationOptions::default(), &env);
    assert!(!r.succeeded);
    assert_eq!((r.cofactor_a, r.cofactor_b), (a, b));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn gcd_times_cofactor_reproduces_operands(
        ta in arb_terms(),
        tb in arb_terms(),
        tg in arb_terms(),
    ) {
        let mut ctx = Context::new();
        let a0 = build(&mut ctx, &ta);
        let b0 = build(&mut ctx, &tb);
        let g0 = build(&mut ctx, &tg);
        prop_assume!(!ctx.is_zero(a0) && !ctx.is_zero(b0) && !ctx.is_zero(g0));
        let a = calc::mul(&mut ctx, a0, g0);
        let a = expand(&mut ctx, a, 64);
        let b = calc::mul(&mut ctx, b0, g0);
        let b = expand(&mut ctx, b, 64);

        let env = CalcEnv::new();
        let opts = EvaluationOptions::default();
        let r = gcd(&mut ctx, a, b, &opts, &env);
        prop_assert!(r.succeeded);

        let ra = calc::mul(&mut ctx, r.gcd, r.cofactor_a);
        let rb = calc::mul(&mut ctx, r.gcd, r.cofactor_b);
        prop_assert!(same_poly(&mut ctx, ra, a));
        prop_assert!(same_poly(&mut ctx, rb, b));

        // the planted factor divides the gcd
        let ge = expand(&mut ctx, r.gcd, 64);
        let q = polynomial_divide(&mut ctx, ge, g0, &env).unwrap();
        prop_assert!(q.is_some());
    }

    #[test]
    fn gcd_is_symmetric_up_to_unit(ta in arb_terms(), tb in arb_terms()) {
        let mut ctx = Context::new();
        let a = build(&mut ctx, &ta);
        let b = build(&mut ctx, &tb);
        prop_assume!(!ctx.is_zero(a) && !ctx.is_zero(b));
        let env = CalcEnv::new();
        let opts = EvaluationOptions::default();
        let ab = gcd(&mut ctx, a, b, &opts, &env);
        let ba = gcd(&mut ctx, b, a, &opts, &env);
        prop_assert!(associated(&mut ctx, ab.gcd, ba.gcd, &env));
    }
}
