//! Closed forms for degree 2 and 3.
//!
//! Quadratics: `x = (-b ± √Δ) / 2a` with `Δ = b² - 4ac`; inequalities are
//! answered by interval logic once the signs of `a` and `Δ` are known.
//!
//! Cubics use `Δ = 18abcd - 4b³d + b²c² - 4ac³ - 27a²d²`,
//! `Δ₀ = b² - 3ac` and `Δ₁ = 2b³ - 9abc + 27a²d`:
//! - `Δ = Δ₀ = 0`: triple root `-b/3a`
//! - `Δ = 0`: double root `(9ad - bc)/2Δ₀` and simple root `(4abc - 9a²d - b³)/aΔ₀`
//! - `Δ < 0`: one real root by Cardano, complex companions on request
//! - `Δ > 0`: three real roots in trigonometric form

use std::cmp::Ordering;

use num_rational::BigRational;
use tracing::debug;

use cas_ast::{BuiltinFn, Context, DisplayExpr, ExprId, RelOp};

use crate::approx::approximate_real;
use crate::env::Diagnostic;
use crate::error::CasError;
use crate::expand::expand;
use crate::options::{AngleUnit, ApproximationMode};
use crate::predicates::represents_nonzero;
use crate::solver::isolation::{condition, isolate, sign_of, IsolateCx};
use crate::{calc, logic};

fn num(ctx: &mut Context, k: i64) -> ExprId {
    ctx.num(k)
}

/// Product of a small integer and some factors.
fn term(ctx: &mut Context, k: i64, factors: &[ExprId]) -> ExprId {
    let mut items = vec![num(ctx, k)];
    items.extend_from_slice(factors);
    calc::mul_all(ctx, items)
}

fn expanded(ctx: &mut Context, cx: &IsolateCx<'_>, e: ExprId) -> ExprId {
    expand(ctx, e, cx.opts.max_expand_power)
}

/// One full turn in the active angle unit.
pub(crate) fn full_turn(ctx: &mut Context, unit: AngleUnit) -> ExprId {
    match unit {
        AngleUnit::Radians => {
            let pi = ctx.constant(cas_ast::Constant::Pi);
            term(ctx, 2, &[pi])
        }
        AngleUnit::Degrees => ctx.num(360),
        AngleUnit::Gradians => ctx.num(400),
    }
}

/// `a*x^2 + b*x + c op 0`.
pub(crate) fn solve_quadratic(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    b: ExprId,
    c: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let zero = num(ctx, 0);
    let leading_known = sign_of(ctx, a).is_some_and(|s| s != Ordering::Equal)
        || represents_nonzero(ctx, a)
        || cx.opts.assume_denominators_nonzero;
    let Some(main) = quadratic_roots(ctx, cx, a, b, c, op)? else {
        return Ok(None);
    };
    if leading_known {
        return Ok(Some(main));
    }

    // a = 0 leaves the linear part
    debug!(target: "isolate", "quadratic_degenerate_split");
    let bx = calc::mul(ctx, b, cx.x);
    let linear = calc::add(ctx, bx, c);
    let Some(degenerate) = isolate(ctx, cx, linear, zero, op, depth)? else {
        return Ok(None);
    };
    let a_nonzero = condition(ctx, a, RelOp::Neq, zero);
    let a_zero = condition(ctx, a, RelOp::Eq, zero);
    let main = logic::and(ctx, main, a_nonzero);
    let degenerate = logic::and(ctx, degenerate, a_zero);
    Ok(Some(logic::or(ctx, main, degenerate)))
}

fn quadratic_roots(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    b: ExprId,
    c: ExprId,
    op: RelOp,
) -> Result<Option<ExprId>, CasError> {
    cx.env.check_abort()?;
    let x = cx.x;
    let zero = num(ctx, 0);
    let b2 = calc::pow_int(ctx, b, 2);
    let four_ac = term(ctx, 4, &[a, c]);
    let delta = calc::sub(ctx, b2, four_ac);
    let delta = expanded(ctx, cx, delta);

    let two_a = term(ctx, 2, &[a]);
    let nb = calc::neg(ctx, b);
    let vertex = calc::div(ctx, nb, two_a);
    let sq = calc::sqrt(ctx, delta);
    let lo_num = calc::sub(ctx, nb, sq);
    let hi_num = calc::add(ctx, nb, sq);
    let r1 = calc::div(ctx, lo_num, two_a);
    let r2 = calc::div(ctx, hi_num, two_a);
    let d_sign = sign_of(ctx, delta);
    debug!(target: "isolate", delta = ?d_sign, op = %op, "quadratic");

    if !op.is_inequality() {
        let both = {
            let e1 = ctx.compare(RelOp::Eq, x, r1);
            let e2 = ctx.compare(RelOp::Eq, x, r2);
            logic::or(ctx, e1, e2)
        };
        let roots = match d_sign {
            Some(Ordering::Equal) => ctx.compare(RelOp::Eq, x, vertex),
            Some(Ordering::Greater) => both,
            Some(Ordering::Less) if cx.opts.allow_complex => both,
            Some(Ordering::Less) => ctx.boolean(false),
            None if cx.opts.allow_complex => both,
            None => {
                let real = condition(ctx, delta, RelOp::Geq, zero);
                logic::and(ctx, both, real)
            }
        };
        return Ok(Some(if op == RelOp::Neq {
            logic::not(ctx, roots)
        } else {
            roots
        }));
    }

    let (Some(a_sign), Some(d_sign)) = (sign_of(ctx, a), d_sign) else {
        return Ok(None);
    };
    if a_sign == Ordering::Equal {
        return Ok(None);
    }
    // normalize to a positive leading coefficient
    let op = if a_sign == Ordering::Less { op.flip() } else { op };
    let answer = match d_sign {
        Ordering::Less => ctx.boolean(matches!(op, RelOp::Gt | RelOp::Geq)),
        Ordering::Equal => match op {
            RelOp::Gt => ctx.compare(RelOp::Neq, x, vertex),
            RelOp::Geq => ctx.boolean(true),
            RelOp::Lt => ctx.boolean(false),
            _ => ctx.compare(RelOp::Eq, x, vertex),
        },
        Ordering::Greater => {
            let (lo, hi) = if a_sign == Ordering::Greater {
                (r1, r2)
            } else {
                (r2, r1)
            };
            let outside = |ctx: &mut Context, l: RelOp, h: RelOp| {
                let a = ctx.compare(l, x, lo);
                let b = ctx.compare(h, x, hi);
                logic::or(ctx, a, b)
            };
            let inside = |ctx: &mut Context, l: RelOp, h: RelOp| {
                let a = ctx.compare(l, x, lo);
                let b = ctx.compare(h, x, hi);
                logic::and(ctx, a, b)
            };
            match op {
                RelOp::Gt => outside(ctx, RelOp::Lt, RelOp::Gt),
                RelOp::Geq => outside(ctx, RelOp::Leq, RelOp::Geq),
                RelOp::Lt => inside(ctx, RelOp::Gt, RelOp::Lt),
                _ => inside(ctx, RelOp::Geq, RelOp::Leq),
            }
        }
    };
    Ok(Some(answer))
}

/// `a*x^3 + b*x^2 + c*x + d = 0` (or `!=`); `[a, b, c, d]` with `a != 0`.
pub(crate) fn solve_cubic(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    [a, b, c, d]: [ExprId; 4],
    op: RelOp,
    _depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op.is_inequality() || !matches!(sign_of(ctx, a), Some(Ordering::Less | Ordering::Greater)) {
        return Ok(None);
    }
    cx.env.check_abort()?;
    let x = cx.x;

    let disc = {
        let t1 = term(ctx, 18, &[a, b, c, d]);
        let b3 = calc::pow_int(ctx, b, 3);
        let t2 = term(ctx, -4, &[b3, d]);
        let b2 = calc::pow_int(ctx, b, 2);
        let c2 = calc::pow_int(ctx, c, 2);
        let t3 = calc::mul(ctx, b2, c2);
        let c3 = calc::pow_int(ctx, c, 3);
        let t4 = term(ctx, -4, &[a, c3]);
        let a2 = calc::pow_int(ctx, a, 2);
        let d2 = calc::pow_int(ctx, d, 2);
        let t5 = term(ctx, -27, &[a2, d2]);
        let s = calc::add_all(ctx, [t1, t2, t3, t4, t5]);
        expanded(ctx, cx, s)
    };
    let d0 = {
        let b2 = calc::pow_int(ctx, b, 2);
        let t = term(ctx, -3, &[a, c]);
        let s = calc::add(ctx, b2, t);
        expanded(ctx, cx, s)
    };
    let d1 = {
        let b3 = calc::pow_int(ctx, b, 3);
        let t1 = term(ctx, 2, &[b3]);
        let t2 = term(ctx, -9, &[a, b, c]);
        let a2 = calc::pow_int(ctx, a, 2);
        let t3 = term(ctx, 27, &[a2, d]);
        let s = calc::add_all(ctx, [t1, t2, t3]);
        expanded(ctx, cx, s)
    };
    let Some(disc_sign) = sign_of(ctx, disc) else {
        debug!(target: "isolate", "cubic_undecided_discriminant");
        return Ok(None);
    };
    debug!(target: "isolate", disc = ?disc_sign, "cubic");

    let three_a = term(ctx, 3, &[a]);
    let roots: Vec<ExprId> = match disc_sign {
        Ordering::Equal if ctx.is_zero(d0) => {
            let nb = calc::neg(ctx, b);
            vec![calc::div(ctx, nb, three_a)]
        }
        Ordering::Equal => {
            let t1 = term(ctx, 9, &[a, d]);
            let bc = calc::mul(ctx, b, c);
            let n1 = calc::sub(ctx, t1, bc);
            let den1 = term(ctx, 2, &[d0]);
            let double = calc::div(ctx, n1, den1);
            let t2 = term(ctx, 4, &[a, b, c]);
            let a2 = calc::pow_int(ctx, a, 2);
            let t3 = term(ctx, -9, &[a2, d]);
            let b3 = calc::pow_int(ctx, b, 3);
            let t4 = calc::neg(ctx, b3);
            let n2 = calc::add_all(ctx, [t2, t3, t4]);
            let den2 = calc::mul(ctx, a, d0);
            let simple = calc::div(ctx, n2, den2);
            vec![double, simple]
        }
        Ordering::Less => cardano(ctx, cx, b, three_a, d0, d1),
        Ordering::Greater => {
            let rs = trigonometric_roots(ctx, cx, a, b, c, d);
            if cx.opts.approximation == ApproximationMode::Approximate {
                approximated(ctx, cx, rs)
            } else {
                rs
            }
        }
    };
    let eqs: Vec<ExprId> = roots
        .into_iter()
        .map(|r| ctx.compare(RelOp::Eq, x, r))
        .collect();
    let any = logic::or_all(ctx, eqs);
    Ok(Some(if op == RelOp::Neq {
        logic::not(ctx, any)
    } else {
        any
    }))
}

/// `x = -(b + ξᵏC + Δ₀/(ξᵏC)) / 3a` with `C = ∛((Δ₁ + √(Δ₁² - 4Δ₀³))/2)`.
fn cardano(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    three_a: ExprId,
    d0: ExprId,
    d1: ExprId,
) -> Vec<ExprId> {
    let d1_2 = calc::pow_int(ctx, d1, 2);
    let d0_3 = calc::pow_int(ctx, d0, 3);
    let t = term(ctx, -4, &[d0_3]);
    let under = calc::add(ctx, d1_2, t);
    let under = expanded(ctx, cx, under);
    let sq = calc::sqrt(ctx, under);
    // avoid the cancelling sign when Δ₁ and the root are opposite
    let plus = calc::add(ctx, d1, sq);
    let s = if sign_of(ctx, plus) == Some(Ordering::Equal) {
        calc::sub(ctx, d1, sq)
    } else {
        plus
    };
    let half = ctx.rational(1, 2);
    let s = calc::mul(ctx, s, half);
    let third = ctx.rational(1, 3);
    let big_c = calc::pow(ctx, s, third);

    let mut companions = vec![big_c];
    if cx.opts.allow_complex {
        // ξ = (-1 + i√3)/2
        let i = ctx.constant(cas_ast::Constant::I);
        let three = num(ctx, 3);
        let r3 = calc::sqrt(ctx, three);
        let ir3 = calc::mul(ctx, i, r3);
        let m1 = num(ctx, -1);
        let xi_num = calc::add(ctx, m1, ir3);
        let xi = calc::mul(ctx, xi_num, half);
        let xi2 = calc::pow_int(ctx, xi, 2);
        let xi2 = expand(ctx, xi2, cx.opts.max_expand_power);
        companions.push(calc::mul(ctx, xi, big_c));
        companions.push(calc::mul(ctx, xi2, big_c));
    }
    companions
        .into_iter()
        .map(|ck| {
            let q = calc::div(ctx, d0, ck);
            let s = calc::add_all(ctx, [b, ck, q]);
            let n = calc::neg(ctx, s);
            calc::div(ctx, n, three_a)
        })
        .collect()
}

/// Three real roots: with `p = (3ac - b²)/3a²` and `q = (2b³ - 9abc + 27a²d)/27a³`,
/// `x_k = 2√(-p/3)·cos(θ/3 - kT/3) - b/3a` where
/// `θ = acos(3q/2p · √(-3/p))` and `T` is one full turn.
fn trigonometric_roots(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    b: ExprId,
    c: ExprId,
    d: ExprId,
) -> Vec<ExprId> {
    let a2 = calc::pow_int(ctx, a, 2);
    let a3 = calc::pow_int(ctx, a, 3);
    let b2 = calc::pow_int(ctx, b, 2);
    let b3 = calc::pow_int(ctx, b, 3);

    let p = {
        let t = term(ctx, 3, &[a, c]);
        let n = calc::sub(ctx, t, b2);
        let den = term(ctx, 3, &[a2]);
        let p = calc::div(ctx, n, den);
        expanded(ctx, cx, p)
    };
    let q = {
        let t1 = term(ctx, 2, &[b3]);
        let t2 = term(ctx, -9, &[a, b, c]);
        let t3 = term(ctx, 27, &[a2, d]);
        let n = calc::add_all(ctx, [t1, t2, t3]);
        let den = term(ctx, 27, &[a3]);
        let q = calc::div(ctx, n, den);
        expanded(ctx, cx, q)
    };

    let minus_third = ctx.rational(-1, 3);
    let mp3 = calc::mul(ctx, p, minus_third);
    let sq = calc::sqrt(ctx, mp3);
    let m = term(ctx, 2, &[sq]);

    let m3 = num(ctx, -3);
    let ratio = calc::div(ctx, m3, p);
    let ratio_sq = calc::sqrt(ctx, ratio);
    let three_half = ctx.rational(3, 2);
    let qp = calc::div(ctx, q, p);
    let arg = calc::mul_all(ctx, [three_half, qp, ratio_sq]);
    let theta = calc::func(ctx, BuiltinFn::Acos, vec![arg]);
    let third = ctx.rational(1, 3);
    let theta3 = calc::mul(ctx, theta, third);

    let turn = full_turn(ctx, cx.opts.angle_unit);
    let three_a = term(ctx, 3, &[a]);
    let shift = calc::div(ctx, b, three_a);

    (0..3)
        .map(|k| {
            let step = ctx.rational(-k, 3);
            let offset = calc::mul(ctx, turn, step);
            let angle = calc::add(ctx, theta3, offset);
            let cos = calc::func(ctx, BuiltinFn::Cos, vec![angle]);
            let t = calc::mul(ctx, m, cos);
            calc::sub(ctx, t, shift)
        })
        .collect()
}

/// Replace closed forms by floating-point values, reporting the fact.
fn approximated(ctx: &mut Context, cx: &IsolateCx<'_>, roots: Vec<ExprId>) -> Vec<ExprId> {
    let mut out = Vec::with_capacity(roots.len());
    for r in roots {
        let value = crate::approx::Approx::new(ctx)
            .with_unit(cx.opts.angle_unit)
            .eval(r)
            .filter(|v| crate::approx::is_real(*v))
            .map(|v| v.re)
            .or_else(|| approximate_real(ctx, r));
        match value.and_then(BigRational::from_float) {
            Some(v) => {
                cx.env
                    .report(Diagnostic::Approximated(DisplayExpr::new(ctx, r).to_string()));
                out.push(ctx.number(v));
            }
            None => out.push(r),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::approx::truth_value;
    use crate::calc;
    use crate::env::CalcEnv;
    use crate::options::{ApproximationMode, EvaluationOptions};
    use crate::solver::isolate_x;
    use cas_ast::{Context, DisplayExpr, ExprId, RelOp};
    use num_complex::Complex64;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    /// `x^3 + c2*x^2 + c1*x + c0`
    fn monic_cubic(ctx: &mut Context, x: ExprId, c2: i64, c1: i64, c0: i64) -> ExprId {
        let x3 = calc::pow_int(ctx, x, 3);
        let x2 = calc::pow_int(ctx, x, 2);
        let k2 = ctx.num(c2);
        let k1 = ctx.num(c1);
        let k0 = ctx.num(c0);
        let t2 = calc::mul(ctx, k2, x2);
        let t1 = calc::mul(ctx, k1, x);
        calc::add_all(ctx, [x3, t2, t1, k0])
    }

    #[test]
    fn quadratic_two_rational_roots() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let m5 = ctx.num(-5);
        let m5x = calc::mul(&mut ctx, m5, x);
        let six = ctx.num(6);
        let zero = ctx.num(0);
        let p = calc::add_all(&mut ctx, [x2, m5x, six]);
        let eq = ctx.compare(RelOp::Eq, p, zero);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(show(&ctx, r), "x = 2 or x = 3");
    }

    #[test]
    fn quadratic_without_real_roots() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let one = ctx.num(1);
        let zero = ctx.num(0);
        let p = calc::add_all(&mut ctx, [x2, x, one]);
        let eq = ctx.compare(RelOp::Eq, p, zero);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(show(&ctx, r), "false");

        let opts = EvaluationOptions {
            allow_complex: true,
            ..EvaluationOptions::default()
        };
        let r = isolate_x(&mut ctx, eq, x, &opts, &env).unwrap().unwrap();
        // both complex roots satisfy the equation
        let w = Complex64::new(-0.5, 3f64.sqrt() / 2.0);
        assert_eq!(truth_value(&ctx, r, &[(x, w)]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, w.conj())]), Some(true));
    }

    #[test]
    fn quadratic_inequality_intervals() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let m3 = ctx.num(-3);
        let m3x = calc::mul(&mut ctx, m3, x);
        let two = ctx.num(2);
        let zero = ctx.num(0);
        let p = calc::add_all(&mut ctx, [x2, m3x, two]);
        let gt = ctx.compare(RelOp::Gt, p, zero);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, gt, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(show(&ctx, r), "x < 1 or x > 2");
    }

    #[test]
    fn cubic_with_rational_roots() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        // (x - 1)(x - 2)(x + 3) = x^3 - 7x + 6
        let p = monic_cubic(&mut ctx, x, 0, -7, 6);
        let zero = ctx.num(0);
        let eq = ctx.compare(RelOp::Eq, p, zero);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        for v in [1.0, 2.0, -3.0] {
            assert_eq!(truth_value(&ctx, r, &[(x, Complex64::new(v, 0.0))]), Some(true));
        }
        assert_eq!(truth_value(&ctx, r, &[(x, Complex64::new(0.0, 0.0))]), Some(false));
    }

    #[test]
    fn cubic_with_one_real_root() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        // x^3 + x + 1 has a single real root near -0.6823
        let p = monic_cubic(&mut ctx, x, 0, 1, 1);
        let zero = ctx.num(0);
        let eq = ctx.compare(RelOp::Eq, p, zero);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        let root = Complex64::new(-0.682_327_803_828_019_3, 0.0);
        assert_eq!(truth_value(&ctx, r, &[(x, root)]), Some(true));
    }

    #[test]
    fn cubic_with_three_real_roots_approximated() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        // x^3 - 3x + 1 is irreducible over the rationals
        let p = monic_cubic(&mut ctx, x, 0, -3, 1);
        let zero = ctx.num(0);
        let eq = ctx.compare(RelOp::Eq, p, zero);
        let env = CalcEnv::new();
        let exact = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        let root = Complex64::new(1.532_088_886_237_956, 0.0);
        assert_eq!(truth_value(&ctx, exact, &[(x, root)]), Some(true));
        assert!(env.diagnostics().is_empty());

        let opts = EvaluationOptions {
            approximation: ApproximationMode::Approximate,
            ..EvaluationOptions::default()
        };
        let approx = isolate_x(&mut ctx, eq, x, &opts, &env).unwrap().unwrap();
        assert_eq!(truth_value(&ctx, approx, &[(x, root)]), Some(true));
        assert_eq!(env.diagnostics().len(), 3);
    }
}
