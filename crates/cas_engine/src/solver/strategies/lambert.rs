//! Lambert W forms.
//!
//! - `a·b^(m·x + n) + c·x = k`  gives  `x = k/c - W(Q)/(m·ln b)` with
//!   `Q = (m·ln b / c)·a·b^(n + m·k/c)`
//! - `a·x + b·ln(x) = k`  gives  `x = (b/a)·W((a/b)·e^(k/b))`
//! - `x·b^(m·x + n) = k`  gives  `x = W(k·m·ln b·b^(-n)) / (m·ln b)`
//!
//! A real argument in `(-1/e, 0)` has the two real branches `W₀` and `W₋₁`;
//! below `-1/e` there is no real solution.

use std::cmp::Ordering;

use tracing::debug;

use cas_ast::views::mul_factors;
use cas_ast::{BuiltinFn, Constant, Context, Expr, ExprId, RelOp};

use super::polynomial::univariate_coeffs;
use crate::approx::{approximate_real, APPROX_TOLERANCE};
use crate::error::CasError;
use crate::predicates::{contains, is_constant};
use crate::solver::isolation::{condition, sign_of, IsolateCx};
use crate::{calc, logic};

/// Real (or principal) values of `W(z)` with the condition under which they
/// are real.
pub(crate) struct WBranches {
    pub values: Vec<ExprId>,
    pub condition: Option<ExprId>,
}

/// `-1/e`
fn branch_point(ctx: &mut Context) -> ExprId {
    let e = ctx.constant(Constant::E);
    let inv = calc::recip(ctx, e);
    calc::neg(ctx, inv)
}

pub(crate) fn w_branches(ctx: &mut Context, cx: &IsolateCx<'_>, z: ExprId) -> WBranches {
    let w0 = calc::func(ctx, BuiltinFn::LambertW, vec![z]);
    let m1 = ctx.num(-1);
    let bp = -(-1.0f64).exp();
    match approximate_real(ctx, z) {
        Some(v) if v < bp - APPROX_TOLERANCE => {
            if cx.opts.allow_complex {
                WBranches {
                    values: vec![w0],
                    condition: None,
                }
            } else {
                WBranches {
                    values: Vec::new(),
                    condition: None,
                }
            }
        }
        Some(v) if v < -APPROX_TOLERANCE && v > bp + APPROX_TOLERANCE => {
            let wm1 = calc::func(ctx, BuiltinFn::LambertW, vec![z, m1]);
            WBranches {
                values: vec![w0, wm1],
                condition: None,
            }
        }
        Some(_) => WBranches {
            values: vec![w0],
            condition: None,
        },
        None if cx.opts.allow_complex || is_constant(ctx, z) => WBranches {
            values: vec![w0],
            condition: None,
        },
        None => {
            let bp = branch_point(ctx);
            let real = condition(ctx, z, RelOp::Geq, bp);
            WBranches {
                values: vec![w0],
                condition: Some(real),
            }
        }
    }
}

/// Disjunction `x = f(w)` over the branches.
fn solutions(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    z: ExprId,
    mut f: impl FnMut(&mut Context, ExprId) -> ExprId,
) -> ExprId {
    let branches = w_branches(ctx, cx, z);
    let eqs: Vec<ExprId> = branches
        .values
        .into_iter()
        .map(|w| {
            let v = f(ctx, w);
            ctx.compare(RelOp::Eq, cx.x, v)
        })
        .collect();
    let any = logic::or_all(ctx, eqs);
    match branches.condition {
        Some(c) => logic::and(ctx, any, c),
        None => any,
    }
}

/// `c` when `t` is `c·x` with `c` free of `x`.
fn linear_coeff(ctx: &mut Context, t: ExprId, x: ExprId) -> Option<ExprId> {
    let mut seen = false;
    let mut rest = Vec::new();
    for f in mul_factors(ctx, t) {
        if f == x && !seen {
            seen = true;
        } else if contains(ctx, f, x) {
            return None;
        } else {
            rest.push(f);
        }
    }
    seen.then(|| calc::mul_all(ctx, rest))
}

/// `(a, b, m, n)` when `t` is `a·b^(m·x + n)`.
fn exp_term(ctx: &mut Context, t: ExprId, x: ExprId) -> Option<(ExprId, ExprId, ExprId, ExprId)> {
    let mut found = None;
    let mut rest = Vec::new();
    for f in mul_factors(ctx, t) {
        if !contains(ctx, f, x) {
            rest.push(f);
            continue;
        }
        match ctx.get(f).clone() {
            Expr::Pow(b, e) if found.is_none() && !contains(ctx, b, x) => {
                let cs = univariate_coeffs(ctx, e, x)?;
                if cs.len() != 2 {
                    return None;
                }
                found = Some((b, cs[1], cs[0]));
            }
            _ => return None,
        }
    }
    let (b, m, n) = found?;
    Some((calc::mul_all(ctx, rest), b, m, n))
}

/// `b` when `t` is `b·ln(x)`.
fn log_term(ctx: &mut Context, t: ExprId, x: ExprId) -> Option<ExprId> {
    let mut found = false;
    let mut rest = Vec::new();
    for f in mul_factors(ctx, t) {
        if !contains(ctx, f, x) {
            rest.push(f);
            continue;
        }
        match ctx.get(f) {
            Expr::Function(name, args)
                if !found && ctx.is_builtin(*name, BuiltinFn::Ln) && args.as_slice() == [x] =>
            {
                found = true;
            }
            _ => return None,
        }
    }
    found.then(|| calc::mul_all(ctx, rest))
}

fn nonzero(ctx: &mut Context, e: ExprId) -> bool {
    matches!(sign_of(ctx, e), Some(Ordering::Less | Ordering::Greater))
}

/// Valid exponential base: positive and not one.
fn usable_base(ctx: &mut Context, b: ExprId) -> bool {
    sign_of(ctx, b) == Some(Ordering::Greater) && !ctx.is_one(b)
}

/// Two-term sums `a·b^(m·x+n) + c·x` and `a·x + b·ln(x)` against `k`.
pub(crate) fn isolate_lambert_sum(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    terms: &[ExprId],
    k: ExprId,
    op: RelOp,
    _depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op != RelOp::Eq || terms.len() != 2 {
        return Ok(None);
    }
    cx.env.check_abort()?;
    let x = cx.x;
    for (i, j) in [(0, 1), (1, 0)] {
        let Some(c) = linear_coeff(ctx, terms[i], x) else {
            continue;
        };
        if !nonzero(ctx, c) {
            continue;
        }

        if let Some((a, b, m, n)) = exp_term(ctx, terms[j], x) {
            if !usable_base(ctx, b) || !nonzero(ctx, m) {
                continue;
            }
            debug!(target: "isolate", "lambert_exponential_linear");
            let ln_b = calc::func(ctx, BuiltinFn::Ln, vec![b]);
            let m_ln_b = calc::mul(ctx, m, ln_b);
            let k_over_c = calc::div(ctx, k, c);
            let mk = calc::mul(ctx, m, k_over_c);
            let shifted = calc::add(ctx, n, mk);
            let bp = calc::pow(ctx, b, shifted);
            let scale = calc::div(ctx, m_ln_b, c);
            let q = calc::mul_all(ctx, [scale, a, bp]);
            let sol = solutions(ctx, cx, q, |ctx, w| {
                let t = calc::div(ctx, w, m_ln_b);
                calc::sub(ctx, k_over_c, t)
            });
            return Ok(Some(sol));
        }

        if let Some(b) = log_term(ctx, terms[j], x) {
            if !nonzero(ctx, b) {
                continue;
            }
            debug!(target: "isolate", "lambert_linear_log");
            let a = c;
            let e = ctx.constant(Constant::E);
            let kb = calc::div(ctx, k, b);
            let ekb = calc::pow(ctx, e, kb);
            let ab = calc::div(ctx, a, b);
            let z = calc::mul(ctx, ab, ekb);
            let sol = solutions(ctx, cx, z, |ctx, w| {
                let ba = calc::div(ctx, b, a);
                calc::mul(ctx, ba, w)
            });
            // ln(x) needs x > 0
            let zero = ctx.num(0);
            let dom = ctx.compare(RelOp::Gt, x, zero);
            return Ok(Some(logic::and(ctx, sol, dom)));
        }
    }
    Ok(None)
}

/// `x·b^(m·x + n) op k` (x-free factors already divided out).
pub(crate) fn isolate_lambert_product(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    factors: &[ExprId],
    k: ExprId,
    op: RelOp,
    _depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if op.is_inequality() || factors.len() != 2 {
        return Ok(None);
    }
    let x = cx.x;
    let Some(pos) = factors.iter().position(|&f| f == x) else {
        return Ok(None);
    };
    let other = factors[1 - pos];
    let Some((a, b, m, n)) = exp_term(ctx, other, x) else {
        return Ok(None);
    };
    if !ctx.is_one(a) || !usable_base(ctx, b) || !nonzero(ctx, m) {
        return Ok(None);
    }
    cx.env.check_abort()?;
    debug!(target: "isolate", "lambert_product");
    let ln_b = calc::func(ctx, BuiltinFn::Ln, vec![b]);
    let m_ln_b = calc::mul(ctx, m, ln_b);
    let nn = calc::neg(ctx, n);
    let b_n = calc::pow(ctx, b, nn);
    let z = calc::mul_all(ctx, [k, m_ln_b, b_n]);
    let sol = solutions(ctx, cx, z, |ctx, w| calc::div(ctx, w, m_ln_b));
    Ok(Some(if op == RelOp::Neq {
        logic::not(ctx, sol)
    } else {
        sol
    }))
}
