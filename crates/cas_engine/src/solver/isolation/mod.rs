//! Isolation of an unknown in a comparison.
//!
//! `isolate_x` normalizes `l op r` to `(l - r) op 0` and peels the left side
//! one node at a time: x-free parts move to the right, invertible functions
//! are inverted and products are split into sign cases. A step that is not an
//! equivalence attaches the condition that makes it one (`c != 0`, `v >= 0`).
//! Results are comparisons `x op value` joined with `and` / `or`.

mod arithmetic;
mod functions;
mod power;

use std::cmp::Ordering;

use num_rational::BigRational;
use num_traits::{Signed, Zero};
use tracing::{debug, trace};

use cas_ast::{Assumption, Context, DisplayExpr, Expr, ExprId, RelOp};

use crate::env::CalcEnv;
use crate::error::CasError;
use crate::expand::expand;
use crate::options::{EvaluationOptions, MAX_ISOLATION_DEPTH};
use crate::predicates::{contains, is_constant, represents_negative, represents_positive};
use crate::{approx, calc, logic};

/// Disjunctions with more branches than this are not distributed over
/// side conditions.
const MAX_DISTRIBUTED_BRANCHES: usize = 32;

/// Shared state of one isolation run.
#[derive(Clone, Copy)]
pub(crate) struct IsolateCx<'a> {
    pub x: ExprId,
    pub opts: &'a EvaluationOptions,
    pub env: &'a CalcEnv,
}

impl<'a> IsolateCx<'a> {
    /// Same run, solving for another unknown (substitution placeholders).
    pub(crate) fn with_unknown(&self, x: ExprId) -> IsolateCx<'a> {
        IsolateCx { x, ..*self }
    }

    #[inline]
    pub(crate) fn has_x(&self, ctx: &Context, e: ExprId) -> bool {
        contains(ctx, e, self.x)
    }
}

/// Solve `expr` for the unknown `x`.
///
/// `expr` is a comparison or a logical combination of comparisons. Returns
/// `Ok(None)` when no strategy applies; the caller keeps the input.
pub fn isolate_x(
    ctx: &mut Context,
    expr: ExprId,
    x: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> Result<Option<ExprId>, CasError> {
    env.check_abort()?;
    if !ctx.get(x).is_unknown() {
        return Err(CasError::IsolationError(
            DisplayExpr::new(ctx, x).to_string(),
            "not an unknown".to_string(),
        ));
    }
    let cx = IsolateCx { x, opts, env };
    let Some(solved) = isolate_logic(ctx, &cx, expr)? else {
        debug!(target: "isolate", "unsolved");
        return Ok(None);
    };
    let solved = with_domain(ctx, x, solved);
    let solved = resolve_conditions(ctx, x, solved);
    if !is_solved_form(ctx, x, solved) {
        debug!(target: "isolate", "unsolved_residue");
        return Ok(None);
    }
    Ok(Some(solved))
}

fn isolate_logic(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    e: ExprId,
) -> Result<Option<ExprId>, CasError> {
    match ctx.get(e).clone() {
        Expr::Compare(op, l, r) => isolate_comparison(ctx, cx, op, l, r),
        Expr::Not(inner) => match ctx.get(inner).clone() {
            Expr::Compare(op, l, r) => isolate_comparison(ctx, cx, op.negate(), l, r),
            _ => Ok(isolate_logic(ctx, cx, inner)?.map(|s| logic::not(ctx, s))),
        },
        Expr::And(items) | Expr::Or(items) => {
            let conj = matches!(ctx.get(e), Expr::And(_));
            let mut changed = false;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match isolate_logic(ctx, cx, item)? {
                    Some(s) => {
                        changed = true;
                        out.push(s);
                    }
                    None => out.push(item),
                }
            }
            if !changed {
                return Ok(None);
            }
            Ok(Some(if conj {
                logic::and_all(ctx, out)
            } else {
                logic::or_all(ctx, out)
            }))
        }
        _ => Ok(None),
    }
}

fn isolate_comparison(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    op: RelOp,
    l: ExprId,
    r: ExprId,
) -> Result<Option<ExprId>, CasError> {
    if !cx.has_x(ctx, l) && !cx.has_x(ctx, r) {
        return Ok(None);
    }
    // already solved: keep it as is
    if l == cx.x && !cx.has_x(ctx, r) {
        return Ok(Some(ctx.compare(op, l, r)));
    }
    let lhs = normalized_difference(ctx, cx, l, r);
    let zero = ctx.num(0);
    debug!(target: "isolate", op = %op, "isolate_comparison");
    let Some(solved) = isolate_x_sub(ctx, cx, lhs, zero, op, 0)? else {
        return Ok(None);
    };
    // the input is undefined where one of its denominators vanishes, even
    // when normalization cancelled that factor
    let Some(defined) = denominators_nonzero(ctx, cx, &[l, r], 0)? else {
        return Ok(None);
    };
    Ok(Some(logic::and(ctx, solved, defined)))
}

/// `l - r`, expanded when the options ask for it.
pub(crate) fn normalized_difference(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    l: ExprId,
    r: ExprId,
) -> ExprId {
    let d = calc::sub(ctx, l, r);
    if cx.opts.expand {
        expand(ctx, d, cx.opts.max_expand_power)
    } else {
        d
    }
}

/// Isolate `x` in `lhs op rhs` where `rhs` is normally x-free.
pub(crate) fn isolate_x_sub(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    cx.env.check_abort()?;
    if depth > MAX_ISOLATION_DEPTH {
        debug!(target: "isolate", depth, "depth_limit");
        return Ok(None);
    }
    if cx.has_x(ctx, rhs) {
        if !cx.has_x(ctx, lhs) {
            return isolate_x_sub(ctx, cx, rhs, lhs, op.flip(), depth + 1);
        }
        let d = normalized_difference(ctx, cx, lhs, rhs);
        let zero = ctx.num(0);
        if d == lhs {
            return Ok(None);
        }
        return isolate_x_sub(ctx, cx, d, zero, op, depth + 1);
    }
    if lhs == cx.x {
        return Ok(Some(ctx.compare(op, lhs, rhs)));
    }
    if !cx.has_x(ctx, lhs) {
        return Ok(Some(logic::compare(ctx, op, lhs, rhs)));
    }
    if calc::is_undefined(ctx, rhs) {
        return Ok(None);
    }
    if op == RelOp::Neq && !matches!(ctx.get(lhs), Expr::Mul(_)) {
        let Some(eq) = isolate_x_sub(ctx, cx, lhs, rhs, RelOp::Eq, depth + 1)? else {
            return Ok(None);
        };
        let ne = logic::not(ctx, eq);
        let Some(defined) = denominators_nonzero(ctx, cx, &[lhs], depth)? else {
            return Ok(None);
        };
        return Ok(Some(logic::and(ctx, ne, defined)));
    }

    trace!(target: "isolate", depth, op = %op, "isolate_step");
    match ctx.get(lhs).clone() {
        Expr::Add(terms) => arithmetic::isolate_add(ctx, cx, lhs, &terms, rhs, op, depth),
        Expr::Mul(factors) => arithmetic::isolate_mul(ctx, cx, lhs, &factors, rhs, op, depth),
        Expr::Pow(b, e) => power::isolate_pow(ctx, cx, b, e, rhs, op, depth),
        Expr::Function(name, args) => match ctx.builtin_of(name) {
            Some(f) => functions::isolate_function(ctx, cx, f, &args, rhs, op, depth),
            None => Ok(None),
        },
        _ => Ok(None),
    }
}

/// One level deeper.
#[inline]
pub(crate) fn isolate(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    isolate_x_sub(ctx, cx, lhs, rhs, op, depth + 1)
}

/// Isolate every alternative; `None` as soon as one of them is unsolved,
/// since dropping it would lose solutions.
pub(crate) fn isolate_any(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    cases: &[(ExprId, ExprId, RelOp)],
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let mut out = Vec::with_capacity(cases.len());
    for &(l, r, op) in cases {
        match isolate(ctx, cx, l, r, op, depth)? {
            Some(s) => out.push(s),
            None => return Ok(None),
        }
    }
    Ok(Some(logic::or_all(ctx, out)))
}

/// Conjunction counterpart of [`isolate_any`].
pub(crate) fn isolate_all(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    cases: &[(ExprId, ExprId, RelOp)],
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let mut out = Vec::with_capacity(cases.len());
    for &(l, r, op) in cases {
        match isolate(ctx, cx, l, r, op, depth)? {
            Some(s) => out.push(s),
            None => return Ok(None),
        }
    }
    Ok(Some(logic::and_all(ctx, out)))
}

/// Re-isolate the comparisons of a formula whose left sides are not yet `x`
/// (after back-substitution of a placeholder).
pub(crate) fn isolate_formula(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    f: ExprId,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    match ctx.get(f).clone() {
        Expr::Boolean(_) => Ok(Some(f)),
        Expr::Compare(op, l, r) => {
            let l_has = cx.has_x(ctx, l);
            let r_has = cx.has_x(ctx, r);
            if (l == cx.x && !r_has) || (!l_has && !r_has) {
                return Ok(Some(logic::compare(ctx, op, l, r)));
            }
            isolate(ctx, cx, l, r, op, depth)
        }
        Expr::Not(inner) => Ok(isolate_formula(ctx, cx, inner, depth)?.map(|s| logic::not(ctx, s))),
        Expr::And(items) | Expr::Or(items) => {
            let conj = matches!(ctx.get(f), Expr::And(_));
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match isolate_formula(ctx, cx, item, depth)? {
                    Some(s) => out.push(s),
                    None => return Ok(None),
                }
            }
            Ok(Some(if conj {
                logic::and_all(ctx, out)
            } else {
                logic::or_all(ctx, out)
            }))
        }
        _ => Ok(None),
    }
}

/// `b != 0` for the base `b` of every x-dependent negative power in `exprs`.
pub(crate) fn denominators_nonzero(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    exprs: &[ExprId],
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let mut bases = Vec::new();
    for &e in exprs {
        collect_denominators(ctx, cx, e, &mut bases);
    }
    if bases.is_empty() {
        return Ok(Some(ctx.boolean(true)));
    }
    trace!(target: "isolate", count = bases.len(), "denominators_nonzero");
    let zero = ctx.num(0);
    let cases: Vec<(ExprId, ExprId, RelOp)> =
        bases.into_iter().map(|b| (b, zero, RelOp::Neq)).collect();
    isolate_all(ctx, cx, &cases, depth)
}

fn collect_denominators(ctx: &Context, cx: &IsolateCx<'_>, e: ExprId, out: &mut Vec<ExprId>) {
    match ctx.get(e) {
        Expr::Add(items) | Expr::Mul(items) => {
            for &i in items {
                collect_denominators(ctx, cx, i, out);
            }
        }
        Expr::Pow(b, k) => {
            let negative = ctx.as_number(*k).is_some_and(|n| n.is_negative());
            if negative && cx.has_x(ctx, *b) && !out.contains(b) {
                out.push(*b);
            }
            collect_denominators(ctx, cx, *b, out);
        }
        _ => {}
    }
}

/// Sign of an x-free expression when it can be established.
pub(crate) fn sign_of(ctx: &mut Context, e: ExprId) -> Option<Ordering> {
    if let Some(n) = ctx.as_number(e) {
        return Some(n.cmp(&BigRational::zero()));
    }
    if represents_positive(ctx, e) {
        return Some(Ordering::Greater);
    }
    if represents_negative(ctx, e) {
        return Some(Ordering::Less);
    }
    if is_constant(ctx, e) {
        return approx::approximate_sign(ctx, e);
    }
    None
}

/// `a op b` as a side condition, folded when decidable.
#[inline]
pub(crate) fn condition(ctx: &mut Context, a: ExprId, op: RelOp, b: ExprId) -> ExprId {
    logic::compare(ctx, op, a, b)
}

/// Conjoin the assumption carried by the unknown itself.
fn with_domain(ctx: &mut Context, x: ExprId, solved: ExprId) -> ExprId {
    let assumption = match ctx.get(x) {
        Expr::Variable(v) => ctx.var_info(*v).assumption,
        _ => Assumption::None,
    };
    let zero = ctx.num(0);
    let dom = match assumption {
        Assumption::Positive => ctx.compare(RelOp::Gt, x, zero),
        Assumption::NonNegative => ctx.compare(RelOp::Geq, x, zero),
        Assumption::NonZero => ctx.compare(RelOp::Neq, x, zero),
        _ => return solved,
    };
    logic::and(ctx, solved, dom)
}

/// Distribute conjunctions over disjunctions and evaluate x-dependent side
/// conditions at each `x = v` disjunct.
fn resolve_conditions(ctx: &mut Context, x: ExprId, f: ExprId) -> ExprId {
    match ctx.get(f).clone() {
        Expr::Or(items) => {
            let items: Vec<ExprId> = items
                .into_iter()
                .map(|i| resolve_conditions(ctx, x, i))
                .collect();
            logic::or_all(ctx, items)
        }
        Expr::And(items) => {
            let nested = items.iter().position(|&i| matches!(ctx.get(i), Expr::Or(_)));
            if let Some(pos) = nested {
                let alternatives = match ctx.get(items[pos]) {
                    Expr::Or(alts) => alts.clone(),
                    _ => Vec::new(),
                };
                if alternatives.len() <= MAX_DISTRIBUTED_BRANCHES {
                    let rest: Vec<ExprId> = items
                        .iter()
                        .enumerate()
                        .filter(|&(i, _)| i != pos)
                        .map(|(_, &e)| e)
                        .collect();
                    let mut branches = Vec::with_capacity(alternatives.len());
                    for alt in alternatives {
                        let mut conj = rest.clone();
                        conj.push(alt);
                        let branch = logic::and_all(ctx, conj);
                        branches.push(resolve_conditions(ctx, x, branch));
                    }
                    return logic::or_all(ctx, branches);
                }
                return f;
            }
            let solution = items.iter().find_map(|&i| match *ctx.get(i) {
                Expr::Compare(RelOp::Eq, l, v) if l == x && !contains(ctx, v, x) => Some((i, v)),
                _ => None,
            });
            let Some((eq, v)) = solution else {
                return logic::and_all(ctx, items);
            };
            let mut out = vec![eq];
            for i in items {
                if i == eq {
                    continue;
                }
                if contains(ctx, i, x) {
                    let s = calc::substitute(ctx, i, x, v);
                    out.push(fold_logic(ctx, s));
                } else {
                    out.push(i);
                }
            }
            logic::and_all(ctx, out)
        }
        _ => f,
    }
}

/// Rebuild a formula through the logical builders so decided comparisons fold.
fn fold_logic(ctx: &mut Context, e: ExprId) -> ExprId {
    match ctx.get(e).clone() {
        Expr::Compare(op, l, r) => logic::compare(ctx, op, l, r),
        Expr::And(items) => {
            let items: Vec<ExprId> = items.into_iter().map(|i| fold_logic(ctx, i)).collect();
            logic::and_all(ctx, items)
        }
        Expr::Or(items) => {
            let items: Vec<ExprId> = items.into_iter().map(|i| fold_logic(ctx, i)).collect();
            logic::or_all(ctx, items)
        }
        Expr::Not(inner) => {
            let inner = fold_logic(ctx, inner);
            logic::not(ctx, inner)
        }
        _ => e,
    }
}

/// Every comparison mentioning `x` reads `x op value` with an x-free value,
/// and no substitution placeholder leaked.
fn is_solved_form(ctx: &Context, x: ExprId, e: ExprId) -> bool {
    if cas_ast::collect_unknowns(ctx, e, false)
        .into_iter()
        .any(|u| ctx.is_placeholder(u))
    {
        return false;
    }
    solved_rec(ctx, x, e)
}

fn solved_rec(ctx: &Context, x: ExprId, e: ExprId) -> bool {
    match ctx.get(e) {
        Expr::Boolean(_) => true,
        Expr::Compare(_, l, r) => {
            if contains(ctx, *l, x) || contains(ctx, *r, x) {
                *l == x && !contains(ctx, *r, x)
            } else {
                true
            }
        }
        Expr::And(items) | Expr::Or(items) => items.iter().all(|&i| solved_rec(ctx, x, i)),
        Expr::Not(inner) => solved_rec(ctx, x, *inner),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    #[test]
    fn already_solved_is_kept() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let eq = ctx.compare(RelOp::Eq, x, two);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env).unwrap();
        assert_eq!(r, Some(eq));
    }

    #[test]
    fn rejects_non_unknown() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let eq = ctx.compare(RelOp::Eq, two, two);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, two, &EvaluationOptions::default(), &env);
        assert!(matches!(r, Err(CasError::IsolationError(..))));
    }

    #[test]
    fn side_conditions_are_evaluated_at_solutions() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let zero = ctx.num(0);
        let two = ctx.num(2);
        let m3 = ctx.num(-3);
        let a = ctx.compare(RelOp::Eq, x, two);
        let b = ctx.compare(RelOp::Eq, x, m3);
        let alts = ctx.add(Expr::Or(vec![a, b]));
        let cond = ctx.compare(RelOp::Gt, x, zero);
        let f = ctx.add(Expr::And(vec![alts, cond]));
        let r = resolve_conditions(&mut ctx, x, f);
        assert_eq!(show(&ctx, r), "x = 2");
    }

    #[test]
    fn positive_unknown_restricts_solutions() {
        let mut ctx = Context::new();
        let x = ctx.var_with("x", Assumption::Positive);
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let four = ctx.num(4);
        let eq = ctx.compare(RelOp::Eq, x2, four);
        let env = CalcEnv::new();
        let r = isolate_x(&mut ctx, eq, x, &EvaluationOptions::default(), &env)
            .unwrap()
            .unwrap();
        assert_eq!(show(&ctx, r), "x = 2");
    }
}
