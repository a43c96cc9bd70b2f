use std::cmp::Ordering;

use tracing::{debug, trace};

use cas_ast::views::{int_exponent, mul_factors};
use cas_ast::{Context, DisplayExpr, Expr, ExprId, RelOp};

use super::{
    condition, denominators_nonzero, isolate, isolate_all, isolate_any, sign_of, IsolateCx,
};
use crate::env::Diagnostic;
use crate::error::CasError;
use crate::expand::expand;
use crate::predicates::represents_nonzero;
use crate::rational::together;
use crate::solver::strategies::{lambert, polynomial, substitution};
use crate::{calc, logic};

/// Products with more x-dependent factors than this are not split into
/// sign cases.
const MAX_SIGN_FACTORS: usize = 6;

pub(super) fn isolate_add(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    terms: &[ExprId],
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let (dependent, free): (Vec<ExprId>, Vec<ExprId>) =
        terms.iter().partition(|&&t| cx.has_x(ctx, t));
    if !free.is_empty() {
        trace!(target: "isolate", moved = free.len(), "move_free_terms");
        let new_lhs = calc::add_all(ctx, dependent);
        let moved = calc::add_all(ctx, free);
        let new_rhs = calc::sub(ctx, rhs, moved);
        return isolate(ctx, cx, new_lhs, new_rhs, op, depth);
    }

    if let Some(r) = polynomial::isolate_polynomial(ctx, cx, lhs, rhs, op, depth)? {
        return Ok(Some(r));
    }
    if let Some(r) = combine_fractions(ctx, cx, lhs, terms, rhs, op, depth)? {
        return Ok(Some(r));
    }
    if let Some(r) = substitution::isolate_by_substitution(ctx, cx, lhs, rhs, op, depth)? {
        return Ok(Some(r));
    }
    if let Some(r) = lambert::isolate_lambert_sum(ctx, cx, terms, rhs, op, depth)? {
        return Ok(Some(r));
    }
    polynomial::isolate_by_factoring(ctx, cx, lhs, rhs, op, depth)
}

/// Bring a sum with x-dependent denominators onto one fraction and compare
/// it with zero. The denominators of the terms stay nonzero.
fn combine_fractions(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    terms: &[ExprId],
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let has_fraction = terms.iter().any(|&t| {
        mul_factors(ctx, t)
            .into_iter()
            .filter_map(|f| negative_power(ctx, f))
            .any(|(b, _)| cx.has_x(ctx, b))
    });
    if !has_fraction {
        return Ok(None);
    }
    let diff = calc::sub(ctx, lhs, rhs);
    let merged = together(ctx, diff, cx.opts, cx.env)?;
    if merged == diff || matches!(ctx.get(merged), Expr::Add(_)) {
        return Ok(None);
    }
    debug!(target: "isolate", "combine_fractions");
    let zero = ctx.num(0);
    let Some(solved) = isolate(ctx, cx, merged, zero, op, depth)? else {
        return Ok(None);
    };
    let Some(defined) = denominators_nonzero(ctx, cx, &[lhs], depth)? else {
        return Ok(None);
    };
    Ok(Some(logic::and(ctx, solved, defined)))
}

pub(super) fn isolate_mul(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    factors: &[ExprId],
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let (dependent, free): (Vec<ExprId>, Vec<ExprId>) =
        factors.iter().partition(|&&f| cx.has_x(ctx, f));
    if !free.is_empty() {
        let c = calc::mul_all(ctx, free);
        let rest = calc::mul_all(ctx, dependent);
        return divide_through(ctx, cx, c, rest, rhs, op, depth);
    }

    if ctx.is_zero(rhs) {
        return zero_product(ctx, cx, &dependent, op, depth);
    }

    // nonzero right side: one fraction against zero, or a sum
    let has_den = dependent.iter().any(|&f| negative_power(ctx, f).is_some());
    if has_den {
        let diff = calc::sub(ctx, lhs, rhs);
        let merged = together(ctx, diff, cx.opts, cx.env)?;
        if merged != diff && matches!(ctx.get(merged), Expr::Mul(_)) {
            let zero = ctx.num(0);
            let Some(solved) = isolate(ctx, cx, merged, zero, op, depth)? else {
                return Ok(None);
            };
            // cancellation may have removed a factor of the original denominator
            let Some(defined) = denominators_nonzero(ctx, cx, &[lhs], depth)? else {
                return Ok(None);
            };
            return Ok(Some(logic::and(ctx, solved, defined)));
        }
    }
    let expanded = expand(ctx, lhs, cx.opts.max_expand_power);
    if expanded != lhs && matches!(ctx.get(expanded), Expr::Add(_)) {
        trace!(target: "isolate", "expand_product");
        let diff = calc::sub(ctx, expanded, rhs);
        let zero = ctx.num(0);
        return isolate(ctx, cx, diff, zero, op, depth);
    }
    lambert::isolate_lambert_product(ctx, cx, &dependent, rhs, op, depth)
}

/// `c * rest op rhs` with `c` free of `x`.
fn divide_through(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    c: ExprId,
    rest: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let q = calc::div(ctx, rhs, c);
    match sign_of(ctx, c) {
        Some(Ordering::Greater) => return isolate(ctx, cx, rest, q, op, depth),
        Some(Ordering::Less) => return isolate(ctx, cx, rest, q, op.flip(), depth),
        Some(Ordering::Equal) => {
            let zero = ctx.num(0);
            return Ok(Some(condition(ctx, zero, op, rhs)));
        }
        None => {}
    }

    let nonzero = represents_nonzero(ctx, c);
    let assumed = !nonzero && cx.opts.assume_denominators_nonzero;
    if assumed && cx.opts.warn_about_denominators_assumed_nonzero {
        cx.env
            .report(Diagnostic::AssumedNonzero(DisplayExpr::new(ctx, c).to_string()));
    }
    let zero = ctx.num(0);
    let degenerate = if nonzero || assumed {
        None
    } else {
        let c_zero = condition(ctx, c, RelOp::Eq, zero);
        let holds = condition(ctx, zero, op, rhs);
        Some(logic::and(ctx, c_zero, holds))
    };

    if !op.is_inequality() {
        let Some(main) = isolate(ctx, cx, rest, q, op, depth)? else {
            return Ok(None);
        };
        let Some(degenerate) = degenerate else {
            return Ok(Some(main));
        };
        debug!(target: "isolate", "split_on_zero_factor");
        let c_nonzero = condition(ctx, c, RelOp::Neq, zero);
        let main = logic::and(ctx, main, c_nonzero);
        return Ok(Some(logic::or(ctx, main, degenerate)));
    }

    // unknown sign: one branch per sign of c
    debug!(target: "isolate", "split_on_factor_sign");
    let Some(pos) = isolate(ctx, cx, rest, q, op, depth)? else {
        return Ok(None);
    };
    let Some(neg) = isolate(ctx, cx, rest, q, op.flip(), depth)? else {
        return Ok(None);
    };
    let c_pos = condition(ctx, c, RelOp::Gt, zero);
    let c_neg = condition(ctx, c, RelOp::Lt, zero);
    let mut branches = vec![logic::and(ctx, c_pos, pos), logic::and(ctx, c_neg, neg)];
    branches.extend(degenerate);
    Ok(Some(logic::or_all(ctx, branches)))
}

/// `(b, k)` for a factor `b^(-k)` with a positive integer `k`.
fn negative_power(ctx: &Context, f: ExprId) -> Option<(ExprId, i64)> {
    match ctx.get(f) {
        Expr::Pow(b, e) => int_exponent(ctx, *e).filter(|&k| k < 0).map(|k| (*b, -k)),
        _ => None,
    }
}

/// Product of x-dependent factors compared with zero.
fn zero_product(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    factors: &[ExprId],
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let zero = ctx.num(0);
    let mut numer: Vec<ExprId> = Vec::new();
    // (base, base^|k|) for every negative power
    let mut denom: Vec<(ExprId, ExprId)> = Vec::new();
    for &f in factors {
        match negative_power(ctx, f) {
            Some((b, k)) => {
                let positive = calc::pow_int(ctx, b, k);
                denom.push((b, positive));
            }
            None => numer.push(f),
        }
    }

    // denominators never vanish
    let den_cases: Vec<(ExprId, ExprId, RelOp)> =
        denom.iter().map(|&(b, _)| (b, zero, RelOp::Neq)).collect();
    let Some(den_ok) = isolate_all(ctx, cx, &den_cases, depth)? else {
        return Ok(None);
    };

    match op {
        RelOp::Eq => {
            let cases: Vec<(ExprId, ExprId, RelOp)> =
                numer.iter().map(|&f| (f, zero, RelOp::Eq)).collect();
            let Some(roots) = isolate_any(ctx, cx, &cases, depth)? else {
                return Ok(None);
            };
            Ok(Some(logic::and(ctx, roots, den_ok)))
        }
        RelOp::Neq => {
            let cases: Vec<(ExprId, ExprId, RelOp)> =
                numer.iter().map(|&f| (f, zero, RelOp::Neq)).collect();
            let Some(nonroots) = isolate_all(ctx, cx, &cases, depth)? else {
                return Ok(None);
            };
            Ok(Some(logic::and(ctx, nonroots, den_ok)))
        }
        _ => {
            let mut items: Vec<(ExprId, bool)> = numer.iter().map(|&f| (f, false)).collect();
            items.extend(denom.iter().map(|&(_, p)| (p, true)));
            if items.len() > MAX_SIGN_FACTORS {
                debug!(target: "isolate", factors = items.len(), "too_many_sign_factors");
                return Ok(None);
            }
            let Some(signs) = sign_cases(ctx, cx, &items, op, depth)? else {
                return Ok(None);
            };
            Ok(Some(logic::and(ctx, signs, den_ok)))
        }
    }
}

/// `f1 * f2 * ... op 0` by the signs of the factors. Denominator factors are
/// never zero, so they take the strict comparison.
fn sign_cases(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    items: &[(ExprId, bool)],
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let zero = ctx.num(0);
    let Some((&(f, is_den), rest)) = items.split_first() else {
        let one = ctx.num(1);
        return Ok(Some(condition(ctx, one, op, zero)));
    };
    let (pos_op, neg_op) = if op.is_strict() || is_den {
        (RelOp::Gt, RelOp::Lt)
    } else {
        (RelOp::Geq, RelOp::Leq)
    };
    if rest.is_empty() {
        let single = if is_den { op.strict() } else { op };
        return isolate(ctx, cx, f, zero, single, depth);
    }

    let Some(f_pos) = isolate(ctx, cx, f, zero, pos_op, depth)? else {
        return Ok(None);
    };
    let Some(r_same) = sign_cases(ctx, cx, rest, op, depth + 1)? else {
        return Ok(None);
    };
    let Some(f_neg) = isolate(ctx, cx, f, zero, neg_op, depth)? else {
        return Ok(None);
    };
    let Some(r_flip) = sign_cases(ctx, cx, rest, op.flip(), depth + 1)? else {
        return Ok(None);
    };
    let a = logic::and(ctx, f_pos, r_same);
    let b = logic::and(ctx, f_neg, r_flip);
    Ok(Some(logic::or(ctx, a, b)))
}
