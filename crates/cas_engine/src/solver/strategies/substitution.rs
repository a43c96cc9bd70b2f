//! Substitution `u = kernel(x)`.
//!
//! When every occurrence of `x` is a power of one common kernel the equation
//! is rewritten in a scoped placeholder `u`, solved for `u`, and each solved
//! comparison `u op v` is turned back into `kernel op v` and isolated again.
//! Recognized kernels:
//! - powers of `x` with exponents sharing a factor `g != 1`: `u = x^g`
//! - exponentials `b^(k·R)` of one base and one exponent shape: `u = b^(g·R)`
//! - a single repeated x-dependent subterm such as `sin(x)`

use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use tracing::debug;

use cas_ast::{substitute_expr_by_id, Assumption, Context, Expr, ExprId, RelOp};
use cas_math::numeric::content_gcd;

use crate::calc;
use crate::error::CasError;
use crate::predicates::contains;
use crate::solver::isolation::{isolate_formula, isolate_x_sub, IsolateCx};

/// Name hint of the substitution placeholder.
const SUB_VAR_NAME: &str = "u";

#[derive(Debug, Clone)]
enum Occurrence {
    /// `x^k`
    Power(BigRational),
    /// `base^(k·rest)`
    Exp {
        base: ExprId,
        coeff: BigRational,
        rest: ExprId,
    },
    /// Any other x-dependent subterm, kept whole
    Atom(ExprId),
}

#[derive(Debug, Clone)]
enum Kernel {
    Power(BigRational),
    Exp { base: ExprId, rest: ExprId, g: BigRational },
    Atom(ExprId),
}

fn occurrences(ctx: &mut Context, x: ExprId, e: ExprId, out: &mut Vec<Occurrence>) {
    if !contains(ctx, e, x) {
        return;
    }
    if e == x {
        out.push(Occurrence::Power(BigRational::one()));
        return;
    }
    match ctx.get(e).clone() {
        Expr::Add(items) | Expr::Mul(items) => {
            for i in items {
                occurrences(ctx, x, i, out);
            }
        }
        Expr::Pow(b, k) => {
            if let Some(n) = ctx.as_number(k).cloned() {
                if b == x {
                    out.push(Occurrence::Power(n));
                } else if n.is_integer() {
                    occurrences(ctx, x, b, out);
                } else {
                    out.push(Occurrence::Atom(e));
                }
                return;
            }
            if !contains(ctx, b, x) {
                let (coeff, rest) = calc::split_term(ctx, k);
                out.push(Occurrence::Exp { base: b, coeff, rest });
                return;
            }
            out.push(Occurrence::Atom(e));
        }
        _ => out.push(Occurrence::Atom(e)),
    }
}

fn gcd_all(ks: &[BigRational]) -> BigRational {
    ks.iter()
        .fold(BigRational::zero(), |g, k| content_gcd(&g, k))
}

/// Common kernel of all occurrences, when there is a useful one.
fn kernel_of(occ: &[Occurrence]) -> Option<Kernel> {
    let first = occ.first()?;
    match first {
        Occurrence::Power(_) => {
            let ks: Vec<BigRational> = occ
                .iter()
                .map(|o| match o {
                    Occurrence::Power(k) => Some(k.clone()),
                    _ => None,
                })
                .collect::<Option<_>>()?;
            let g = gcd_all(&ks);
            (!g.is_one() && g.is_positive()).then_some(Kernel::Power(g))
        }
        Occurrence::Exp { base, rest, .. } => {
            let mut ks = Vec::with_capacity(occ.len());
            for o in occ {
                match o {
                    Occurrence::Exp { base: b, coeff, rest: r } if b == base && r == rest => {
                        ks.push(coeff.clone())
                    }
                    _ => return None,
                }
            }
            // a lone exponential is inverted directly
            if ks.iter().all(|k| *k == ks[0]) {
                return None;
            }
            let g = gcd_all(&ks);
            Some(Kernel::Exp {
                base: *base,
                rest: *rest,
                g,
            })
        }
        Occurrence::Atom(a) => {
            let same = occ
                .iter()
                .all(|o| matches!(o, Occurrence::Atom(b) if b == a));
            (same && occ.len() > 1).then_some(Kernel::Atom(*a))
        }
    }
}

fn kernel_expr(ctx: &mut Context, x: ExprId, k: &Kernel) -> ExprId {
    match k {
        Kernel::Power(g) => {
            let g = ctx.number(g.clone());
            calc::pow(ctx, x, g)
        }
        Kernel::Exp { base, rest, g } => {
            let e = calc::scale(ctx, *rest, g);
            calc::pow(ctx, *base, e)
        }
        Kernel::Atom(a) => *a,
    }
}

/// `e` with every kernel occurrence replaced by a power of `u`.
fn rewrite(ctx: &mut Context, x: ExprId, e: ExprId, k: &Kernel, u: ExprId) -> Option<ExprId> {
    if !contains(ctx, e, x) {
        return Some(e);
    }
    let u_pow = |ctx: &mut Context, n: BigRational| {
        let n = ctx.number(n);
        calc::pow(ctx, u, n)
    };
    if let Kernel::Atom(a) = k {
        if e == *a {
            return Some(u);
        }
    }
    if e == x {
        return match k {
            Kernel::Power(g) => Some(u_pow(ctx, g.recip())),
            _ => None,
        };
    }
    match ctx.get(e).clone() {
        Expr::Add(items) => {
            let items = items
                .into_iter()
                .map(|i| rewrite(ctx, x, i, k, u))
                .collect::<Option<Vec<_>>>()?;
            Some(calc::add_all(ctx, items))
        }
        Expr::Mul(items) => {
            let items = items
                .into_iter()
                .map(|i| rewrite(ctx, x, i, k, u))
                .collect::<Option<Vec<_>>>()?;
            Some(calc::mul_all(ctx, items))
        }
        Expr::Pow(b, n) => {
            if let Some(nv) = ctx.as_number(n).cloned() {
                if b == x {
                    return match k {
                        Kernel::Power(g) => Some(u_pow(ctx, nv / g)),
                        _ => None,
                    };
                }
                let rb = rewrite(ctx, x, b, k, u)?;
                return Some(calc::pow(ctx, rb, n));
            }
            match k {
                Kernel::Exp { base, rest, g } if b == *base => {
                    let (c, r) = calc::split_term(ctx, n);
                    (r == *rest).then(|| u_pow(ctx, c / g))
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// Solve `lhs op rhs` through a placeholder for the common kernel of `x`.
pub(crate) fn isolate_by_substitution(
    ctx: &mut Context,
    cx: &IsolateCx<'_>,
    lhs: ExprId,
    rhs: ExprId,
    op: RelOp,
    depth: usize,
) -> Result<Option<ExprId>, CasError> {
    let x = cx.x;
    let mut occ = Vec::new();
    occurrences(ctx, x, lhs, &mut occ);
    let Some(kernel) = kernel_of(&occ) else {
        return Ok(None);
    };
    let kexpr = kernel_expr(ctx, x, &kernel);
    debug!(target: "isolate", kernel = ?kernel, "substitution");

    ctx.with_placeholder(SUB_VAR_NAME, Assumption::None, |ctx, u| {
        let Some(lu) = rewrite(ctx, x, lhs, &kernel, u) else {
            return Ok(None);
        };
        if contains(ctx, lu, x) || lu == u {
            return Ok(None);
        }
        let sub_cx = cx.with_unknown(u);
        let Some(in_u) = isolate_x_sub(ctx, &sub_cx, lu, rhs, op, depth + 1)? else {
            return Ok(None);
        };
        if contains(ctx, in_u, x) {
            return Ok(None);
        }
        let back = substitute_expr_by_id(ctx, in_u, u, kexpr);
        isolate_formula(ctx, cx, back, depth + 1)
    })
}
