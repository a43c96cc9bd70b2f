//! Conversion between AST expressions and MultiPoly representation.
//!
//! Polynomial atoms are unknowns (symbols, variables, units). Anything else
//! that is not a number, sum, product or nonnegative integer power is
//! rejected with `PolyError::NotPolynomial`.

use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use cas_ast::ordering::{compare_factors, compare_terms};
use cas_ast::traversal::collect_unknowns;
use cas_ast::{Context, Expr, ExprId};

use super::{MultiPoly, PolyBudget, PolyError};

// =============================================================================
// AST → MultiPoly
// =============================================================================

/// Unknowns of all `exprs`, in first-discovery order, without duplicates.
///
/// Unknowns inside function arguments are skipped.
pub fn collect_poly_vars(ctx: &Context, exprs: &[ExprId]) -> Vec<ExprId> {
    let mut out: Vec<ExprId> = Vec::new();
    for &e in exprs {
        for v in collect_unknowns(ctx, e, true) {
            if !out.contains(&v) {
                out.push(v);
            }
        }
    }
    out
}

/// Convert expression to MultiPoly over the given variable order.
pub fn multipoly_from_expr(
    ctx: &Context,
    expr: ExprId,
    vars: &[ExprId],
    budget: &PolyBudget,
) -> Result<MultiPoly, PolyError> {
    match ctx.get(expr) {
        Expr::Number(n) => Ok(MultiPoly::constant(n.clone(), vars.to_vec())),

        Expr::Symbol(_) | Expr::Variable(_) | Expr::Unit(_) => {
            let idx = vars
                .iter()
                .position(|&v| v == expr)
                .ok_or(PolyError::NotPolynomial)?;
            Ok(MultiPoly::var(idx, vars.to_vec()))
        }

        Expr::Add(terms) => {
            let mut acc = MultiPoly::zero(vars.to_vec());
            for &t in terms {
                let pt = multipoly_from_expr(ctx, t, vars, budget)?;
                acc = acc.add(&pt)?;
            }
            check_budget(&acc, budget)?;
            Ok(acc)
        }

        Expr::Mul(factors) => {
            let mut acc = MultiPoly::one(vars.to_vec());
            for &f in factors {
                let pf = multipoly_from_expr(ctx, f, vars, budget)?;
                acc = acc.mul(&pf, budget)?;
            }
            Ok(acc)
        }

        Expr::Pow(base, exp) => {
            // Exponent must be non-negative integer constant
            let e = match ctx.get(*exp) {
                Expr::Number(n) if n.is_integer() && !n.is_negative() => n
                    .to_integer()
                    .to_u32()
                    .ok_or_else(|| PolyError::ExponentTooLarge(u64::MAX))?,
                _ => return Err(PolyError::NotPolynomial),
            };
            let pb = multipoly_from_expr(ctx, *base, vars, budget)?;
            pb.pow(e, budget)
        }

        _ => Err(PolyError::NotPolynomial),
    }
}

/// Whether `expr` is a polynomial over Q in its unknowns.
pub fn is_rational_polynomial(ctx: &Context, expr: ExprId) -> bool {
    match ctx.get(expr) {
        Expr::Number(_) | Expr::Symbol(_) | Expr::Variable(_) | Expr::Unit(_) => true,
        Expr::Add(items) | Expr::Mul(items) => {
            items.iter().all(|&i| is_rational_polynomial(ctx, i))
        }
        Expr::Pow(base, exp) => {
            matches!(ctx.get(*exp), Expr::Number(n) if n.is_integer() && !n.is_negative())
                && is_rational_polynomial(ctx, *base)
        }
        _ => false,
    }
}

fn check_budget(p: &MultiPoly, budget: &PolyBudget) -> Result<(), PolyError> {
    if p.num_terms() > budget.max_terms {
        return Err(PolyError::Exhausted);
    }
    Ok(())
}

// =============================================================================
// MultiPoly → AST
// =============================================================================

/// Convert MultiPoly back to a canonical expression.
///
/// Factors and terms are ordered with `compare_factors` / `compare_terms`,
/// which is the same order canonical arithmetic produces.
pub fn multipoly_to_expr(p: &MultiPoly, ctx: &mut Context) -> ExprId {
    if p.is_zero() {
        return ctx.num(0);
    }

    let mut terms: Vec<ExprId> = p
        .terms
        .iter()
        .map(|(coeff, mono)| build_term_expr(ctx, coeff, mono, &p.vars))
        .collect();
    let view: &Context = ctx;
    terms.sort_by(|a, b| compare_terms(view, *a, *b));
    ctx.add(Expr::Add(terms))
}

fn build_term_expr(
    ctx: &mut Context,
    coeff: &BigRational,
    mono: &[u32],
    vars: &[ExprId],
) -> ExprId {
    let mut factors: Vec<ExprId> = Vec::new();
    for (i, &exp) in mono.iter().enumerate() {
        if exp > 0 {
            if exp == 1 {
                factors.push(vars[i]);
            } else {
                let exp_expr = ctx.num(exp as i64);
                factors.push(ctx.add(Expr::Pow(vars[i], exp_expr)));
            }
        }
    }
    let view: &Context = ctx;
    factors.sort_by(|a, b| compare_factors(view, *a, *b));

    if factors.is_empty() {
        return ctx.number(coeff.clone());
    }
    if !coeff.is_one() && !coeff.is_zero() {
        let c = ctx.number(coeff.clone());
        factors.insert(0, c);
    }
    ctx.add(Expr::Mul(factors))
}
