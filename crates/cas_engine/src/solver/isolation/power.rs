use std::cmp::Ordering;

use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};
use tracing::debug;

use cas_ast::{Assumption, BuiltinFn, Constant, Context, ExprId, RelOp};
use cas_math::numeric::exact_log;

use super::{
    condition, isolate, isolate_all, isolate_any, isolate_formula, isolate_x_sub, sign_of,
    IsolateCx,
};
use crate::env::INDEX_VARIABLE;
use crate::error::CasError;
use crate::rational::together;
use crate::solver::strategies::lambert::w_branches;
use crate::{calc, logic};

/// Complex roots are enumerated up to this degree.
const MAX_ENUMERATED_ROOTS: i64 = 16;

pub(super) fn isolate_pow(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    base: ExprId,
    exp: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    match (cx.has_x(ctx, base), cx.has_x(ctx, exp)) {
        (true, false) => x_in_base(ctx, cx, base, exp, rhs, op, depth),
        (false, true) => x_in_exponent(ctx, cx, base, exp, rhs, op, depth),
        (true, true) => x_in_both(ctx, cx, base, exp, rhs, op, depth),
        (false, false) => Ok(None),
    }
}

fn root_of(ctx: &mut Context, v: ExprId, k: i64) -> ExprId {
    let e = ctx.rational(1, k);
    calc::pow(ctx, v, e)
}

/// `B^k op v` for an integer or rational `k`.
fn x_in_base(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    exp: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let Some(n) = ctx.as_number(exp).cloned() else {
        debug!(target: "isolate", "symbolic_exponent");
        return Ok(None);
    };
    if !n.is_integer() {
        return rational_power(ctx, cx, b, &n, v, op, depth);
    }
    let Some(k) = n.to_integer().to_i64() else {
        return Ok(None);
    };
    let zero = ctx.num(0);
    let v_sign = sign_of(ctx, v);

    if k < 0 {
        let pos = calc::pow_int(ctx, b, -k);
        if !op.is_inequality() {
            if v_sign == Some(Ordering::Equal) {
                // B^(-k) never vanishes
                return Ok(Some(ctx.boolean(false)));
            }
            let inv = calc::recip(ctx, v);
            let Some(sol) = isolate(ctx, cx, pos, inv, op, depth)? else {
                return Ok(None);
            };
            let v_nonzero = condition(ctx, v, RelOp::Neq, zero);
            return Ok(Some(logic::and(ctx, sol, v_nonzero)));
        }
        if v_sign == Some(Ordering::Equal) {
            return isolate(ctx, cx, pos, zero, op.strict(), depth);
        }
        let lhs = calc::pow_int(ctx, b, k);
        let diff = calc::sub(ctx, lhs, v);
        let merged = together(ctx, diff, cx.opts, cx.env)?;
        if merged == diff {
            return Ok(None);
        }
        return isolate(ctx, cx, merged, zero, op, depth);
    }

    if k % 2 == 1 {
        // odd powers are monotone
        let r = root_of(ctx, v, k);
        let Some(real) = isolate(ctx, cx, b, r, op, depth)? else {
            return Ok(None);
        };
        if op == RelOp::Eq && cx.opts.allow_complex && k <= MAX_ENUMERATED_ROOTS {
            let Some(others) = complex_roots(ctx, cx, b, r, k, 1..k, depth)? else {
                return Ok(None);
            };
            return Ok(Some(logic::or(ctx, real, others)));
        }
        return Ok(Some(real));
    }

    // even power
    let r = root_of(ctx, v, k);
    let neg_r = calc::neg(ctx, r);
    if op == RelOp::Eq {
        if v_sign == Some(Ordering::Equal) {
            return isolate(ctx, cx, b, zero, RelOp::Eq, depth);
        }
        if cx.opts.allow_complex && k <= MAX_ENUMERATED_ROOTS {
            return complex_roots(ctx, cx, b, r, k, 0..k, depth);
        }
        if v_sign == Some(Ordering::Less) {
            return Ok(Some(ctx.boolean(false)));
        }
        let Some(both) = isolate_any(ctx, cx, &[(b, r, RelOp::Eq), (b, neg_r, RelOp::Eq)], depth)?
        else {
            return Ok(None);
        };
        if v_sign == Some(Ordering::Greater) {
            return Ok(Some(both));
        }
        let real = condition(ctx, v, RelOp::Geq, zero);
        return Ok(Some(logic::and(ctx, both, real)));
    }

    let Some(v_sign) = v_sign else {
        return Ok(None);
    };
    match (v_sign, op) {
        (Ordering::Less, RelOp::Gt | RelOp::Geq) => Ok(Some(ctx.boolean(true))),
        (Ordering::Less, _) => Ok(Some(ctx.boolean(false))),
        (Ordering::Equal, RelOp::Gt) => isolate(ctx, cx, b, zero, RelOp::Neq, depth),
        (Ordering::Equal, RelOp::Geq) => Ok(Some(ctx.boolean(true))),
        (Ordering::Equal, RelOp::Lt) => Ok(Some(ctx.boolean(false))),
        (Ordering::Equal, _) => isolate(ctx, cx, b, zero, RelOp::Eq, depth),
        (_, RelOp::Gt | RelOp::Geq) => {
            let far = if op.is_strict() { RelOp::Lt } else { RelOp::Leq };
            isolate_any(ctx, cx, &[(b, neg_r, far), (b, r, op)], depth)
        }
        (_, _) => {
            let low = if op.is_strict() { RelOp::Gt } else { RelOp::Geq };
            isolate_all(ctx, cx, &[(b, neg_r, low), (b, r, op)], depth)
        }
    }
}

/// `B = r·ω^j` for `j` in `js`, `ω = e^(2πi/k)`.
fn complex_roots(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    r: ExprId,
    k: i64,
    js: std::ops::Range<i64>,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let e = ctx.constant(Constant::E);
    let pi = ctx.constant(Constant::Pi);
    let i = ctx.constant(Constant::I);
    let mut cases = Vec::new();
    for j in js {
        let frac = ctx.rational(2 * j, k);
        let angle = calc::mul_all(ctx, [frac, pi, i]);
        let w = calc::pow(ctx, e, angle);
        let root = calc::mul(ctx, r, w);
        cases.push((b, root, RelOp::Eq));
    }
    isolate_any(ctx, cx, &cases, depth)
}

/// `B^(p/q) op v` with `q > 1`.
fn rational_power(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    n: &BigRational,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let (Some(p), Some(q)) = (n.numer().to_i64(), n.denom().to_i64()) else {
        return Ok(None);
    };
    let zero = ctx.num(0);
    let q_even = q.is_even();

    if p == 1 {
        let vq = calc::pow_int(ctx, v, q);
        if !q_even {
            return isolate(ctx, cx, b, vq, op, depth);
        }
        // principal even root: nonnegative, defined for B >= 0
        let v_sign = sign_of(ctx, v);
        return match op {
            RelOp::Eq => {
                let Some(sol) = isolate(ctx, cx, b, vq, RelOp::Eq, depth)? else {
                    return Ok(None);
                };
                let principal = condition(ctx, v, RelOp::Geq, zero);
                Ok(Some(logic::and(ctx, sol, principal)))
            }
            _ => {
                let Some(v_sign) = v_sign else {
                    return Ok(None);
                };
                let below_zero = v_sign == Ordering::Less;
                let at_zero = v_sign == Ordering::Equal;
                match op {
                    RelOp::Gt if below_zero => isolate(ctx, cx, b, zero, RelOp::Geq, depth),
                    RelOp::Geq if below_zero || at_zero => {
                        isolate(ctx, cx, b, zero, RelOp::Geq, depth)
                    }
                    RelOp::Gt | RelOp::Geq => isolate(ctx, cx, b, vq, op, depth),
                    RelOp::Lt if below_zero || at_zero => Ok(Some(ctx.boolean(false))),
                    RelOp::Leq if below_zero => Ok(Some(ctx.boolean(false))),
                    RelOp::Leq if at_zero => isolate(ctx, cx, b, zero, RelOp::Eq, depth),
                    _ => isolate_all(ctx, cx, &[(b, zero, RelOp::Geq), (b, vq, op)], depth),
                }
            }
        };
    }

    // B^(p/q) = w^p with w = B^(1/q)
    let inv_q = ctx.rational(1, q);
    let w_kernel = calc::pow(ctx, b, inv_q);
    debug!(target: "isolate", p, q, "rational_exponent");
    ctx.with_placeholder("w", Assumption::None, |ctx, w| {
        let sub_cx = cx.with_unknown(w);
        let wp = calc::pow_int(ctx, w, p);
        let Some(in_w) = isolate_x_sub(ctx, &sub_cx, wp, v, op, depth + 1)? else {
            return Ok(None);
        };
        let back = cas_ast::substitute_expr_by_id(ctx, in_w, w, w_kernel);
        isolate_formula(ctx, cx, back, depth + 1)
    })
}

/// `log` to base `b`, as `ln` when the base is `e`.
fn log_base(ctx: &mut Context, v: ExprId, b: ExprId) -> ExprId {
    if matches!(ctx.get(b), cas_ast::Expr::Constant(Constant::E)) {
        calc::func(ctx, BuiltinFn::Ln, vec![v])
    } else {
        calc::func(ctx, BuiltinFn::Log, vec![v, b])
    }
}

/// `B^E op v` with `B` free of `x`.
fn x_in_exponent(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    e: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let zero = ctx.num(0);
    let one = ctx.num(1);
    let v_sign = sign_of(ctx, v);

    if ctx.is_zero(b) {
        // 0^E is 0 for E > 0, undefined otherwise
        let holds = condition(ctx, zero, op, v);
        let Some(pos) = isolate(ctx, cx, e, zero, RelOp::Gt, depth)? else {
            return Ok(None);
        };
        return Ok(Some(logic::and(ctx, holds, pos)));
    }
    if ctx.is_one(b) {
        return Ok(Some(condition(ctx, one, op, v)));
    }
    if let Some(bn) = ctx.as_number(b).cloned() {
        if bn.is_negative() {
            return negative_base(ctx, cx, &bn, e, v, op, depth);
        }
    }

    let Some(b_sign) = sign_of(ctx, b) else {
        return Ok(None);
    };
    if b_sign != Ordering::Greater {
        return Ok(None);
    }
    let b_minus_one = calc::sub(ctx, b, one);
    let growth = sign_of(ctx, b_minus_one);

    let exact = match (ctx.as_number(b), ctx.as_number(v)) {
        (Some(bn), Some(vn)) => exact_log(bn, vn),
        _ => None,
    };
    let log_v = match exact {
        Some(l) => ctx.number(l),
        None => log_base(ctx, v, b),
    };

    if op == RelOp::Eq {
        if v_sign == Some(Ordering::Equal) {
            return Ok(Some(ctx.boolean(false)));
        }
        if cx.opts.allow_complex {
            // E = log_b(v) + 2πi·n / ln(b)
            let Some(n) = cx.env.lookup(ctx, INDEX_VARIABLE) else {
                return Ok(None);
            };
            let two = ctx.num(2);
            let pi = ctx.constant(Constant::Pi);
            let i = ctx.constant(Constant::I);
            let ln_b = calc::func(ctx, BuiltinFn::Ln, vec![b]);
            let turn = calc::mul_all(ctx, [two, pi, i, n]);
            let period = calc::div(ctx, turn, ln_b);
            let value = calc::add(ctx, log_v, period);
            return isolate(ctx, cx, e, value, RelOp::Eq, depth);
        }
        if v_sign == Some(Ordering::Less) {
            return Ok(Some(ctx.boolean(false)));
        }
        let Some(sol) = isolate(ctx, cx, e, log_v, RelOp::Eq, depth)? else {
            return Ok(None);
        };
        if v_sign == Some(Ordering::Greater) {
            return Ok(Some(sol));
        }
        let positive = condition(ctx, v, RelOp::Gt, zero);
        return Ok(Some(logic::and(ctx, sol, positive)));
    }

    let (Some(v_sign), Some(growth)) = (v_sign, growth) else {
        return Ok(None);
    };
    if v_sign != Ordering::Greater {
        // B^E > 0 always
        return Ok(Some(ctx.boolean(matches!(op, RelOp::Gt | RelOp::Geq))));
    }
    let op = match growth {
        Ordering::Greater => op,
        Ordering::Less => op.flip(),
        Ordering::Equal => return Ok(None),
    };
    isolate(ctx, cx, e, log_v, op, depth)
}

/// `(-a)^E = v` over integer `E`: `(-1)^E` alternates, otherwise an exact
/// logarithm of `|v|` with matching parity.
fn negative_base(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    bn: &BigRational,
    e: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq {
        return Ok(None);
    }
    let Some(vn) = ctx.as_number(v).cloned() else {
        return Ok(None);
    };
    if (-bn).is_one() {
        let Some(n) = cx.env.lookup(ctx, INDEX_VARIABLE) else {
            return Ok(None);
        };
        let two_n = calc::scale(ctx, n, &BigRational::from_integer(2.into()));
        return if vn.is_one() {
            isolate(ctx, cx, e, two_n, RelOp::Eq, depth)
        } else if (-&vn).is_one() {
            let one = ctx.num(1);
            let odd = calc::add(ctx, two_n, one);
            isolate(ctx, cx, e, odd, RelOp::Eq, depth)
        } else {
            Ok(Some(ctx.boolean(false)))
        };
    }
    let Some(l) = exact_log(&bn.abs(), &vn.abs()).filter(|l| l.is_integer()) else {
        return Ok(None);
    };
    let odd = l.to_integer().is_odd();
    if odd != vn.is_negative() {
        return Ok(Some(ctx.boolean(false)));
    }
    let value = ctx.number(l);
    isolate(ctx, cx, e, value, RelOp::Eq, depth)
}

/// `f^f = v` by Lambert W: `f = ln(v) / W(ln(v))`.
fn x_in_both(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    b: ExprId,
    e: ExprId,
    v: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if b != e || op != RelOp::Eq || sign_of(ctx, v) != Some(Ordering::Greater) {
        return Ok(None);
    }
    if ctx.is_one(v) {
        let one = ctx.num(1);
        return isolate(ctx, cx, b, one, RelOp::Eq, depth);
    }
    debug!(target: "isolate", "lambert_self_power");
    let ln_v = calc::func(ctx, BuiltinFn::Ln, vec![v]);
    let branches = w_branches(ctx, cx, ln_v);
    let mut cases = Vec::with_capacity(branches.values.len());
    for w in branches.values {
        let value = calc::div(ctx, ln_v, w);
        cases.push((b, value, RelOp::Eq));
    }
    let Some(sol) = isolate_any(ctx, cx, &cases, depth)? else {
        return Ok(None);
    };
    Ok(Some(match branches.condition {
        Some(c) => logic::and(ctx, sol, c),
        None => sol,
    }))
}

#[cfg(test)]
mod tests {
    use crate::approx::truth_value;
    use crate::calc;
    use crate::env::CalcEnv;
    use crate::options::EvaluationOptions;
    use crate::solver::isolate_x;
    use cas_ast::{Context, DisplayExpr, Expr, ExprId, RelOp};
    use num_complex::Complex64;

    fn holds_at(ctx: &Context, f: ExprId, x: ExprId, v: f64) -> Option<bool> {
        truth_value(ctx, f, &[(x, Complex64::new(v, 0.0))])
    }

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    fn solve(ctx: &mut Context, l: ExprId, op: RelOp, r: ExprId, x: ExprId) -> Option<ExprId> {
        let c = ctx.compare(op, l, r);
        let env = CalcEnv::new();
        isolate_x(ctx, c, x, &EvaluationOptions::default(), &env).unwrap()
    }

    #[test]
    fn square_equals_four() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let four = ctx.num(4);
        let r = solve(&mut ctx, x2, RelOp::Eq, four, x).unwrap();
        assert_eq!(holds_at(&ctx, r, x, 2.0), Some(true));
        assert_eq!(holds_at(&ctx, r, x, -2.0), Some(true));
        assert_eq!(holds_at(&ctx, r, x, 4.0), Some(false));
    }

    #[test]
    fn square_less_than_nine() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let nine = ctx.num(9);
        let r = solve(&mut ctx, x2, RelOp::Lt, nine, x).unwrap();
        assert_eq!(holds_at(&ctx, r, x, 0.0), Some(true));
        assert_eq!(holds_at(&ctx, r, x, -2.5), Some(true));
        assert_eq!(holds_at(&ctx, r, x, 3.5), Some(false));
        assert_eq!(holds_at(&ctx, r, x, -3.0), Some(false));
    }

    #[test]
    fn reciprocal() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let inv = calc::recip(&mut ctx, x);
        let two = ctx.num(2);
        let r = solve(&mut ctx, inv, RelOp::Eq, two, x).unwrap();
        assert_eq!(show(&ctx, r), "x = 1/2");
    }

    #[test]
    fn exponential_exact_log() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let p = calc::pow(&mut ctx, two, x);
        let eight = ctx.num(8);
        let r = solve(&mut ctx, p, RelOp::Eq, eight, x).unwrap();
        assert_eq!(show(&ctx, r), "x = 3");

        let m1 = ctx.num(-1);
        let r = solve(&mut ctx, p, RelOp::Eq, m1, x).unwrap();
        assert_eq!(show(&ctx, r), "false");
    }

    #[test]
    fn decreasing_exponential_flips() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let half = ctx.rational(1, 2);
        let p = calc::pow(&mut ctx, half, x);
        let four = ctx.num(4);
        let r = solve(&mut ctx, p, RelOp::Gt, four, x).unwrap();
        assert_eq!(show(&ctx, r), "x < -2");
    }

    #[test]
    fn square_root_equation_checks_sign() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let s = calc::sqrt(&mut ctx, x);
        let three = ctx.num(3);
        let r = solve(&mut ctx, s, RelOp::Eq, three, x).unwrap();
        assert_eq!(show(&ctx, r), "x = 9");
        let m3 = ctx.num(-3);
        let r = solve(&mut ctx, s, RelOp::Eq, m3, x).unwrap();
        assert_eq!(show(&ctx, r), "false");
    }

    #[test]
    fn two_thirds_power() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let e = ctx.rational(2, 3);
        let p = calc::pow(&mut ctx, x, e);
        let four = ctx.num(4);
        let r = solve(&mut ctx, p, RelOp::Eq, four, x).unwrap();
        for v in [8.0, -8.0] {
            assert_eq!(holds_at(&ctx, r, x, v), Some(true));
        }
        assert_eq!(ctx.live_placeholders(), 0);
    }

    #[test]
    fn minus_one_power_uses_index_variable() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let m1 = ctx.num(-1);
        let p = calc::pow(&mut ctx, m1, x);
        let one = ctx.num(1);
        let r = solve(&mut ctx, p, RelOp::Eq, one, x).unwrap();
        let Expr::Compare(RelOp::Eq, l, v) = ctx.get(r).clone() else {
            panic!("expected x = 2n, got {}", show(&ctx, r));
        };
        assert_eq!(l, x);
        let n = ctx.var_with("n", cas_ast::Assumption::Integer);
        assert!(crate::predicates::contains(&ctx, v, n));
    }

    #[test]
    fn self_power() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let p = calc::pow(&mut ctx, x, x);
        let v = ctx.num(27);
        let r = solve(&mut ctx, p, RelOp::Eq, v, x).unwrap();
        assert_eq!(holds_at(&ctx, r, x, 3.0), Some(true));
    }
}
