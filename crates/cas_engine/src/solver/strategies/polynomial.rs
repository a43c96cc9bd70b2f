//! Univariate polynomial comparisons.
//!
//! The difference `lhs - rhs` is expanded and read as `c0 + c1*x + ... + cn*x^n`
//! with x-free coefficients. Degree 1 and 2 go to closed forms; higher degrees
//! try a power substitution, a rational root (then the product rule) and the
//! cubic formulas, in that order.

use num_integer::Integer;
use num_rational::BigRational;
use tracing::debug;

use cas_ast::views::{add_terms, int_exponent, mul_factors};
use cas_ast::{Context, Expr, ExprId, RelOp};

use super::{quadratic, rational_roots, substitution};
use crate::calc;
use crate::error::CasError;
use crate::expand::expand;
use crate::predicates::contains;
use crate::solver::isolation::{isolate, IsolateCx};

/// Highest degree read as a polynomial.
pub const MAX_DEGREE: usize = 64;

/// Coefficients `[c0, c1, ..., cn]` of `e` as a polynomial in `x`, trailing
/// zeros removed. `None` when some term is not a monomial in `x`.
pub fn univariate_coeffs(ctx: &mut Context, e: ExprId, x: ExprId) -> Option<Vec<ExprId>> {
    let mut buckets: Vec<Vec<ExprId>> = Vec::new();
    for t in add_terms(ctx, e) {
        let mut deg = 0usize;
        let mut rest = Vec::new();
        for f in mul_factors(ctx, t) {
            if f == x {
                deg += 1;
                continue;
            }
            if !contains(ctx, f, x) {
                rest.push(f);
                continue;
            }
            match ctx.get(f) {
                Expr::Pow(b, k) if *b == x => {
                    let k = int_exponent(ctx, *k).filter(|&k| k > 0)?;
                    deg += usize::try_from(k).ok()?;
                }
                _ => return None,
            }
        }
        if deg > MAX_DEGREE {
            return None;
        }
        if buckets.len() <= deg {
            buckets.resize(deg + 1, Vec::new());
        }
        let c = calc::mul_all(ctx, rest);
        buckets[deg].push(c);
    }
    let mut coeffs: Vec<ExprId> = buckets
        .into_iter()
        .map(|b| calc::add_all(ctx, b))
        .collect();
    while coeffs.len() > 1 && coeffs.last().is_some_and(|&c| ctx.is_zero(c)) {
        coeffs.pop();
    }
    if coeffs.is_empty() {
        coeffs.push(ctx.num(0));
    }
    Some(coeffs)
}

/// `c0 + c1*x + ... + cn*x^n`.
pub fn poly_expr(ctx: &mut Context, x: ExprId, coeffs: &[ExprId]) -> ExprId {
    let terms: Vec<ExprId> = coeffs
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let xi = calc::pow_int(ctx, x, i as i64);
            calc::mul(ctx, c, xi)
        })
        .collect();
    calc::add_all(ctx, terms)
}

fn numeric_coeffs(ctx: &Context, coeffs: &[ExprId]) -> Option<Vec<BigRational>> {
    coeffs.iter().map(|&c| ctx.as_number(c).cloned()).collect()
}

/// gcd of the exponents carrying a nonzero coefficient.
fn exponent_gcd(ctx: &Context, coeffs: &[ExprId]) -> usize {
    coeffs
        .iter()
        .enumerate()
        .filter(|&(i, &c)| i > 0 && !ctx.is_zero(c))
        .fold(0usize, |g, (i, _)| g.gcd(&i))
}

/// `lhs op rhs` when `lhs - rhs` is a polynomial in `x`.
pub(crate) fn isolate_polynomial(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let x = cx.x;
    let diff = calc::sub(ctx, lhs, rhs);
    let p = expand(ctx, diff, cx.opts.max_expand_power);
    let Some(cs) = univariate_coeffs(ctx, p, x) else {
        return Ok(None);
    };
    let n = cs.len() - 1;
    if n == 0 {
        return Ok(None);
    }
    let zero = ctx.num(0);

    let low = cs.iter().position(|&c| !ctx.is_zero(c)).unwrap_or(0);
    if low > 0 {
        // x^low * q(x)
        debug!(target: "isolate", low, "factor_common_power");
        let xl = calc::pow_int(ctx, x, low as i64);
        let q = poly_expr(ctx, x, &cs[low..]);
        let prod = calc::mul(ctx, xl, q);
        if prod == lhs {
            return Ok(None);
        }
        return isolate(ctx, cx, prod, zero, op, depth);
    }

    match n {
        1 => {
            let cx1 = calc::mul(ctx, cs[1], x);
            let v = calc::neg(ctx, cs[0]);
            return isolate(ctx, cx, cx1, v, op, depth);
        }
        2 => return quadratic::solve_quadratic(ctx, cx, cs[2], cs[1], cs[0], op, depth),
        _ => {}
    }

    if exponent_gcd(ctx, &cs) > 1 {
        if let Some(r) = substitution::isolate_by_substitution(ctx, cx, p, zero, op, depth)? {
            return Ok(Some(r));
        }
    }

    if let Some(nc) = numeric_coeffs(ctx, &cs) {
        if let Some(r) = rational_roots::find_rational_root(&nc) {
            debug!(target: "isolate", root = %r, "rational_root");
            let q: Vec<ExprId> = rational_roots::deflate(&nc, &r)
                .into_iter()
                .map(|c| ctx.number(c))
                .collect();
            let rn = ctx.number(r);
            let linear = calc::sub(ctx, x, rn);
            let rest = poly_expr(ctx, x, &q);
            let prod = calc::mul(ctx, linear, rest);
            return isolate(ctx, cx, prod, zero, op, depth);
        }
    }

    if n == 3 {
        return quadratic::solve_cubic(ctx, cx, [cs[3], cs[2], cs[1], cs[0]], op, depth);
    }
    debug!(target: "isolate", degree = n, "polynomial_unsolved");
    Ok(None)
}

/// Last resort for sums compared with zero: pull out the lowest power of
/// `x` shared by every term.
pub(crate) fn isolate_by_factoring(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    if !ctx.is_zero(rhs) {
        return Ok(None);
    }
    let x = cx.x;
    let terms = add_terms(ctx, lhs);
    let mut low: Option<i64> = None;
    for &t in &terms {
        let k = mul_factors(ctx, t)
            .into_iter()
            .filter_map(|f| x_power(ctx, f, x))
            .sum::<i64>();
        low = Some(low.map_or(k, |l| l.min(k)));
    }
    let Some(low) = low.filter(|&l| l > 0) else {
        return Ok(None);
    };
    debug!(target: "isolate", low, "factor_common_power");
    let inv = calc::pow_int(ctx, x, -low);
    let reduced: Vec<ExprId> = terms.iter().map(|&t| calc::mul(ctx, t, inv)).collect();
    let q = calc::add_all(ctx, reduced);
    let xl = calc::pow_int(ctx, x, low);
    let prod = calc::mul(ctx, xl, q);
    if prod == lhs {
        return Ok(None);
    }
    isolate(ctx, cx, prod, rhs, op, depth)
}

/// Exponent `k` when `f` is `x^k` with a positive integer `k`.
fn x_power(ctx: &Context, f: ExprId, x: ExprId) -> Option<i64> {
    if f == x {
        return Some(1);
    }
    match ctx.get(f) {
        Expr::Pow(b, k) if *b == x => int_exponent(ctx, *k).filter(|&k| k > 0),
        _ => None,
    }
}
