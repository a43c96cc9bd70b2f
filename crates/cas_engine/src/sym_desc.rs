//! Per-symbol degree statistics of a pair of polynomials.
//!
//! The GCD engine uses these to pick the main variable: symbols shared by
//! both operands come first, in first-discovery order.

use smallvec::SmallVec;

use cas_ast::{Context, Expr, ExprId};
use num_traits::{Signed, ToPrimitive};

use crate::predicates::contains;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymDesc {
    pub sym: ExprId,
    pub deg_a: u32,
    pub deg_b: u32,
    pub ldeg_a: u32,
    pub ldeg_b: u32,
    pub max_deg: u32,
    /// Largest number of terms in a leading coefficient with respect to `sym`
    pub max_lcnops: usize,
}

impl SymDesc {
    pub fn is_shared(&self) -> bool {
        self.deg_a > 0 && self.deg_b > 0
    }
}

pub type SymDescVec = SmallVec<[SymDesc; 4]>;

/// Degree of `e` in `s`; `None` when `e` is not polynomial in `s`.
pub fn degree(ctx: &Context, e: ExprId, s: ExprId) -> Option<u32> {
    degree_by(ctx, e, s, u32::max)
}

/// Lowest degree of `e` in `s`; `None` when `e` is not polynomial in `s`.
pub fn ldegree(ctx: &Context, e: ExprId, s: ExprId) -> Option<u32> {
    degree_by(ctx, e, s, u32::min)
}

fn degree_by(ctx: &Context, e: ExprId, s: ExprId, pick: fn(u32, u32) -> u32) -> Option<u32> {
    if e == s {
        return Some(1);
    }
    match ctx.get(e) {
        Expr::Add(terms) => {
            let mut acc: Option<u32> = None;
            for &t in terms {
                let d = degree_by(ctx, t, s, pick)?;
                acc = Some(acc.map_or(d, |a| pick(a, d)));
            }
            Some(acc.unwrap_or(0))
        }
        Expr::Mul(factors) => factors
            .iter()
            .try_fold(0u32, |acc, &f| acc.checked_add(degree_by(ctx, f, s, pick)?)),
        Expr::Pow(b, x) => {
            if !contains(ctx, *b, s) && !contains(ctx, *x, s) {
                return Some(0);
            }
            let n = match ctx.get(*x) {
                Expr::Number(n) if n.is_integer() && !n.is_negative() => n.to_integer().to_u32()?,
                _ => return None,
            };
            degree_by(ctx, *b, s, pick)?.checked_mul(n)
        }
        _ => {
            if contains(ctx, e, s) {
                None
            } else {
                Some(0)
            }
        }
    }
}

/// Number of terms of `e` whose degree in `s` equals `deg`.
fn lcoeff_terms(ctx: &Context, e: ExprId, s: ExprId, deg: u32) -> usize {
    match ctx.get(e) {
        Expr::Add(terms) => terms
            .iter()
            .filter(|&&t| degree(ctx, t, s) == Some(deg))
            .count(),
        _ => 1,
    }
}

/// Statistics for every unknown of `a` and `b` (function arguments skipped).
///
/// Shared symbols come first; within each class the discovery order of
/// `a` then `b` is kept.
pub fn collect_sym_desc(ctx: &Context, a: ExprId, b: ExprId) -> SymDescVec {
    let syms = cas_math::collect_poly_vars(ctx, &[a, b]);
    let mut out: SymDescVec = SmallVec::new();
    for s in syms {
        let deg_a = degree(ctx, a, s).unwrap_or(0);
        let deg_b = degree(ctx, b, s).unwrap_or(0);
        out.push(SymDesc {
            sym: s,
            deg_a,
            deg_b,
            ldeg_a: ldegree(ctx, a, s).unwrap_or(0),
            ldeg_b: ldegree(ctx, b, s).unwrap_or(0),
            max_deg: deg_a.max(deg_b),
            max_lcnops: lcoeff_terms(ctx, a, s, deg_a).max(lcoeff_terms(ctx, b, s, deg_b)),
        });
    }
    // stable: shared symbols first
    out.sort_by_key(|d| !d.is_shared());
    out
}
