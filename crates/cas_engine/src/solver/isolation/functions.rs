//! Inversion of builtin functions.
//!
//! Periodic functions produce a family of solutions indexed by the integer
//! variable `n`. Principal-value ranges of the inverse functions become side
//! conditions on the right-hand side.

use std::cmp::Ordering;

use num_traits::{One, Zero};
use tracing::debug;

use cas_ast::{BuiltinFn, Constant, Context, Expr, ExprId, RelOp};

use super::{condition, isolate, isolate_all, isolate_any, sign_of, IsolateCx};
use crate::env::INDEX_VARIABLE;
use crate::error::CasError;
use crate::solver::strategies::quadratic::full_turn;
use crate::{calc, logic};

pub(super) fn isolate_function(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    f: BuiltinFn,
    args: &[ExprId],
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    use BuiltinFn::*;
    match (f, args) {
        (Sqrt | Root | Exp, _) => {
            // back to powers
            let rewritten = calc::func(ctx, f, args.to_vec());
            if matches!(ctx.get(rewritten), Expr::Function(..)) {
                return Ok(None);
            }
            isolate(ctx, cx, rewritten, rhs, op, depth)
        }
        (Ln, &[a]) => logarithm(ctx, cx, a, None, rhs, op, depth),
        (Log, &[a, base]) => {
            if cx.has_x(ctx, base) {
                log_base_unknown(ctx, cx, a, base, rhs, op, depth)
            } else {
                logarithm(ctx, cx, a, Some(base), rhs, op, depth)
            }
        }
        (Abs, &[a]) => absolute(ctx, cx, a, rhs, op, depth),
        (Sign, &[a]) => sign(ctx, cx, a, rhs, op, depth),
        (LambertW, &[a]) => lambert(ctx, cx, a, rhs, op, depth),
        (Sin | Cos | Tan, &[a]) => periodic(ctx, cx, f, a, rhs, op, depth),
        (Asin | Acos | Atan, &[a]) => inverse_trig(ctx, cx, f, a, rhs, op, depth),
        (Sinh | Cosh | Tanh | Asinh | Acosh | Atanh, &[a]) => {
            hyperbolic(ctx, cx, f, a, rhs, op, depth)
        }
        _ => {
            debug!(target: "isolate", func = ?f, "no_inverse");
            Ok(None)
        }
    }
}

/// `v` lies in `[lo, hi]` (real mode only).
fn in_range(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    v: ExprId,
    lo: (ExprId, RelOp),
    hi: (ExprId, RelOp),
) -> ExprId {
    if cx.opts.allow_complex {
        return ctx.boolean(true);
    }
    let a = condition(ctx, v, lo.1, lo.0);
    let b = condition(ctx, v, hi.1, hi.0);
    logic::and(ctx, a, b)
}

fn guarded(ctx: &mut Context, sol: Option<ExprId>, guard: ExprId) -> Option<ExprId> {
    sol.map(|s| logic::and(ctx, s, guard))
}

/// `ln(a) op v` or `log(a, b) op v` with `b` free of `x`.
fn logarithm(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    base: Option<ExprId>,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let b = match base {
        Some(b) => b,
        None => ctx.constant(Constant::E),
    };
    let value = calc::pow(ctx, b, v);
    if op == RelOp::Eq {
        return isolate(ctx, cx, a, value, op, depth);
    }
    let one = ctx.num(1);
    let b_minus_one = calc::sub(ctx, b, one);
    let op = match sign_of(ctx, b_minus_one) {
        Some(Ordering::Greater) => op,
        Some(Ordering::Less) => op.flip(),
        _ => return Ok(None),
    };
    let zero = ctx.num(0);
    match op {
        RelOp::Gt | RelOp::Geq => isolate(ctx, cx, a, value, op, depth),
        _ => isolate_all(ctx, cx, &[(a, zero, RelOp::Gt), (a, value, op)], depth),
    }
}

/// `log(c, B) = v`: `B = c^(1/v)`.
fn log_base_unknown(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    c: ExprId,
    base: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq || cx.has_x(ctx, c) {
        return Ok(None);
    }
    match sign_of(ctx, v) {
        // log(c, B) = 0 only for c = 1, where every B qualifies
        Some(Ordering::Equal) | None => Ok(None),
        Some(_) => {
            let inv = calc::recip(ctx, v);
            let value = calc::pow(ctx, c, inv);
            isolate(ctx, cx, base, value, RelOp::Eq, depth)
        }
    }
}

fn absolute(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let neg_v = calc::neg(ctx, v);
    match op {
        RelOp::Eq => {
            let zero = ctx.num(0);
            if ctx.is_zero(v) {
                return isolate(ctx, cx, a, zero, RelOp::Eq, depth);
            }
            let sol = isolate_any(ctx, cx, &[(a, v, RelOp::Eq), (a, neg_v, RelOp::Eq)], depth)?;
            let nonneg = condition(ctx, v, RelOp::Geq, zero);
            Ok(guarded(ctx, sol, nonneg))
        }
        // -v < a < v is empty when v <= 0
        RelOp::Lt | RelOp::Leq => {
            let low = if op.is_strict() { RelOp::Gt } else { RelOp::Geq };
            isolate_all(ctx, cx, &[(a, neg_v, low), (a, v, op)], depth)
        }
        _ => {
            let far = if op.is_strict() { RelOp::Lt } else { RelOp::Leq };
            isolate_any(ctx, cx, &[(a, neg_v, far), (a, v, op)], depth)
        }
    }
}

fn sign(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq {
        return Ok(None);
    }
    let Some(n) = ctx.as_number(v).cloned() else {
        return Ok(None);
    };
    let zero = ctx.num(0);
    let target = if n.is_one() {
        Some(RelOp::Gt)
    } else if (-&n).is_one() {
        Some(RelOp::Lt)
    } else if n.is_zero() {
        Some(RelOp::Eq)
    } else {
        None
    };
    match target {
        Some(rel) => isolate(ctx, cx, a, zero, rel, depth),
        None => Ok(Some(ctx.boolean(false))),
    }
}

/// Principal branch: `W(a) = v` iff `a = v·e^v` with `v >= -1`.
fn lambert(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let e = ctx.constant(Constant::E);
    let ev = calc::pow(ctx, e, v);
    let value = calc::mul(ctx, v, ev);
    let minus_one = ctx.num(-1);
    if op == RelOp::Eq {
        let sol = isolate(ctx, cx, a, value, op, depth)?;
        let on_branch = condition(ctx, v, RelOp::Geq, minus_one);
        return Ok(guarded(ctx, sol, on_branch));
    }
    let one = ctx.num(1);
    let shifted = calc::add(ctx, v, one);
    if sign_of(ctx, shifted) != Some(Ordering::Greater) {
        return Ok(None);
    }
    // W0 is increasing on [-1/e, inf)
    match op {
        RelOp::Gt | RelOp::Geq => isolate(ctx, cx, a, value, op, depth),
        _ => {
            let branch_point = calc::div(ctx, minus_one, e);
            isolate_all(
                ctx,
                cx,
                &[(a, branch_point, RelOp::Geq), (a, value, op)],
                depth,
            )
        }
    }
}

/// `sin`, `cos`, `tan`: one or two principal solutions plus multiples of
/// the period.
fn periodic(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    f: BuiltinFn,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq {
        return Ok(None);
    }
    let Some(n) = cx.env.lookup(ctx, INDEX_VARIABLE) else {
        return Ok(None);
    };
    let turn = full_turn(ctx, cx.opts.angle_unit);
    let half = ctx.rational(1, 2);
    let half_turn = calc::mul(ctx, half, turn);
    let one = ctx.num(1);
    let minus_one = ctx.num(-1);

    let (period, principal, guard) = match f {
        BuiltinFn::Tan => {
            let p = calc::func(ctx, BuiltinFn::Atan, vec![v]);
            let g = ctx.boolean(true);
            (half_turn, vec![p], g)
        }
        BuiltinFn::Sin => {
            let s = calc::func(ctx, BuiltinFn::Asin, vec![v]);
            let mirrored = calc::sub(ctx, half_turn, s);
            let g = in_range(ctx, cx, v, (minus_one, RelOp::Geq), (one, RelOp::Leq));
            (turn, vec![s, mirrored], g)
        }
        _ => {
            let c = calc::func(ctx, BuiltinFn::Acos, vec![v]);
            let neg = calc::neg(ctx, c);
            let g = in_range(ctx, cx, v, (minus_one, RelOp::Geq), (one, RelOp::Leq));
            (turn, vec![c, neg], g)
        }
    };
    if matches!(ctx.get(guard), Expr::Boolean(false)) {
        return Ok(Some(guard));
    }
    let shift = calc::mul(ctx, period, n);
    let mut cases = Vec::with_capacity(principal.len());
    for p in principal {
        let value = calc::add(ctx, p, shift);
        if !cases.iter().any(|&(_, w, _)| w == value) {
            cases.push((a, value, RelOp::Eq));
        }
    }
    let sol = isolate_any(ctx, cx, &cases, depth)?;
    Ok(guarded(ctx, sol, guard))
}

/// Inverse trigonometric functions, `v` restricted to the principal range.
fn inverse_trig(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    f: BuiltinFn,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq {
        return Ok(None);
    }
    let turn = full_turn(ctx, cx.opts.angle_unit);
    let quarter = ctx.rational(1, 4);
    let q = calc::mul(ctx, quarter, turn);
    let neg_q = calc::neg(ctx, q);
    let (forward, guard) = match f {
        BuiltinFn::Asin => {
            let g = in_range(ctx, cx, v, (neg_q, RelOp::Geq), (q, RelOp::Leq));
            (BuiltinFn::Sin, g)
        }
        BuiltinFn::Atan => {
            let g = in_range(ctx, cx, v, (neg_q, RelOp::Gt), (q, RelOp::Lt));
            (BuiltinFn::Tan, g)
        }
        _ => {
            let zero = ctx.num(0);
            let half = ctx.rational(1, 2);
            let h = calc::mul(ctx, half, turn);
            let g = in_range(ctx, cx, v, (zero, RelOp::Geq), (h, RelOp::Leq));
            (BuiltinFn::Cos, g)
        }
    };
    if matches!(ctx.get(guard), Expr::Boolean(false)) {
        return Ok(Some(guard));
    }
    let value = calc::func(ctx, forward, vec![v]);
    let sol = isolate(ctx, cx, a, value, RelOp::Eq, depth)?;
    Ok(guarded(ctx, sol, guard))
}

fn hyperbolic(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    f: BuiltinFn,
    a: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    use BuiltinFn::*;
    let one = ctx.num(1);
    let minus_one = ctx.num(-1);
    let zero = ctx.num(0);
    match f {
        // increasing bijections of the reals
        Sinh | Asinh => {
            let inverse = if f == Sinh { Asinh } else { Sinh };
            let value = calc::func(ctx, inverse, vec![v]);
            isolate(ctx, cx, a, value, op, depth)
        }
        Tanh | Atanh if op == RelOp::Eq => {
            let (inverse, guard) = if f == Tanh {
                let g = in_range(ctx, cx, v, (minus_one, RelOp::Gt), (one, RelOp::Lt));
                (Atanh, g)
            } else {
                (Tanh, ctx.boolean(true))
            };
            let value = calc::func(ctx, inverse, vec![v]);
            let sol = isolate(ctx, cx, a, value, op, depth)?;
            Ok(guarded(ctx, sol, guard))
        }
        Cosh if op == RelOp::Eq => {
            let c = calc::func(ctx, Acosh, vec![v]);
            let guard = if cx.opts.allow_complex {
                ctx.boolean(true)
            } else {
                condition(ctx, v, RelOp::Geq, one)
            };
            if matches!(ctx.get(guard), Expr::Boolean(false)) {
                return Ok(Some(guard));
            }
            let sol = if ctx.is_zero(c) {
                isolate(ctx, cx, a, zero, op, depth)?
            } else {
                let neg = calc::neg(ctx, c);
                isolate_any(ctx, cx, &[(a, c, op), (a, neg, op)], depth)?
            };
            Ok(guarded(ctx, sol, guard))
        }
        Acosh if op == RelOp::Eq => {
            let value = calc::func(ctx, Cosh, vec![v]);
            let sol = isolate(ctx, cx, a, value, op, depth)?;
            let guard = condition(ctx, v, RelOp::Geq, zero);
            Ok(guarded(ctx, sol, guard))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use crate::approx::truth_value;
    use crate::calc;
    use crate::env::CalcEnv;
    use crate::options::EvaluationOptions;
    use crate::solver::isolate_x;
    use cas_ast::{Assumption, BuiltinFn, Constant, Context, DisplayExpr, ExprId, RelOp};
    use num_complex::Complex64;

    fn solve(ctx: &mut Context, l: ExprId, op: RelOp, r: ExprId, x: ExprId) -> Option<ExprId> {
        let c = ctx.compare(op, l, r);
        let env = CalcEnv::new();
        isolate_x(ctx, c, x, &EvaluationOptions::default(), &env).unwrap()
    }

    fn at(v: f64) -> Complex64 {
        Complex64::new(v, 0.0)
    }

    #[test]
    fn logarithm_equation() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let ln = calc::func(&mut ctx, BuiltinFn::Ln, vec![x]);
        let two = ctx.num(2);
        let r = solve(&mut ctx, ln, RelOp::Eq, two, x).unwrap();
        let e2 = std::f64::consts::E.powi(2);
        assert_eq!(truth_value(&ctx, r, &[(x, at(e2))]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, at(2.0))]), Some(false));
    }

    #[test]
    fn logarithm_below_keeps_domain() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let ln = calc::func(&mut ctx, BuiltinFn::Ln, vec![x]);
        let zero = ctx.num(0);
        let r = solve(&mut ctx, ln, RelOp::Lt, zero, x).unwrap();
        assert_eq!(truth_value(&ctx, r, &[(x, at(0.5))]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, at(-0.5))]), Some(false));
        assert_eq!(truth_value(&ctx, r, &[(x, at(1.5))]), Some(false));
    }

    #[test]
    fn absolute_value_band() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let d = calc::sub(&mut ctx, x, one);
        let abs = calc::func(&mut ctx, BuiltinFn::Abs, vec![d]);
        let two = ctx.num(2);
        let r = solve(&mut ctx, abs, RelOp::Lt, two, x).unwrap();
        for (v, expect) in [(0.0, true), (2.5, true), (3.5, false), (-1.5, false)] {
            assert_eq!(truth_value(&ctx, r, &[(x, at(v))]), Some(expect), "at {}", v);
        }
        let m1 = ctx.num(-1);
        let r = solve(&mut ctx, abs, RelOp::Eq, m1, x).unwrap();
        assert_eq!(DisplayExpr::new(&ctx, r).to_string(), "false");
    }

    #[test]
    fn sine_has_periodic_family() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let s = calc::func(&mut ctx, BuiltinFn::Sin, vec![x]);
        let zero = ctx.num(0);
        let r = solve(&mut ctx, s, RelOp::Eq, zero, x).unwrap();
        let n = ctx.var_with("n", Assumption::Integer);
        let pi = std::f64::consts::PI;
        assert_eq!(truth_value(&ctx, r, &[(x, at(pi)), (n, at(0.0))]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, at(2.0 * pi)), (n, at(1.0))]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, at(1.0)), (n, at(0.0))]), Some(false));

        let two = ctx.num(2);
        let r = solve(&mut ctx, s, RelOp::Eq, two, x).unwrap();
        assert_eq!(DisplayExpr::new(&ctx, r).to_string(), "false");
    }

    #[test]
    fn inverse_sine_range() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let s = calc::func(&mut ctx, BuiltinFn::Asin, vec![x]);
        let two = ctx.num(2);
        let r = solve(&mut ctx, s, RelOp::Eq, two, x).unwrap();
        assert_eq!(DisplayExpr::new(&ctx, r).to_string(), "false");
        let pi = ctx.constant(Constant::Pi);
        let sixth = ctx.rational(1, 6);
        let v = calc::mul(&mut ctx, sixth, pi);
        let r = solve(&mut ctx, s, RelOp::Eq, v, x).unwrap();
        assert_eq!(truth_value(&ctx, r, &[(x, at(0.5))]), Some(true));
    }

    #[test]
    fn hyperbolic_cosine() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let c = calc::func(&mut ctx, BuiltinFn::Cosh, vec![x]);
        let one = ctx.num(1);
        let r = solve(&mut ctx, c, RelOp::Eq, one, x).unwrap();
        assert_eq!(DisplayExpr::new(&ctx, r).to_string(), "x = 0");
        let two = ctx.num(2);
        let r = solve(&mut ctx, c, RelOp::Eq, two, x).unwrap();
        let root = 2f64.acosh();
        assert_eq!(truth_value(&ctx, r, &[(x, at(root))]), Some(true));
        assert_eq!(truth_value(&ctx, r, &[(x, at(-root))]), Some(true));
    }
}
