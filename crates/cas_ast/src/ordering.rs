//! Deterministic structural ordering.
//!
//! Used to sort the children of commutative nodes so that equal sums and
//! products built in different orders hash-cons to the same id.

use crate::{Context, Expr, ExprId};
use std::cmp::Ordering;

pub fn compare_expr(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let expr_a = context.get(a);
    let expr_b = context.get(b);

    use Expr::*;

    // 1. Hierarchy Check
    let rank_a = get_rank(expr_a);
    let rank_b = get_rank(expr_b);
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }

    // 2. Same Type Comparison
    match (expr_a, expr_b) {
        (Number(n1), Number(n2)) => n1.cmp(n2),
        (Constant(c1), Constant(c2)) => c1.cmp(c2),
        (Symbol(_) | Variable(_) | Unit(_), Symbol(_) | Variable(_) | Unit(_)) => {
            compare_unknowns(context, a, b)
        }
        (Function(n1, args1), Function(n2, args2)) => {
            match context.sym_name(*n1).cmp(context.sym_name(*n2)) {
                Ordering::Equal => compare_args(context, args1, args2),
                ord => ord,
            }
        }
        (Pow(b1, e1), Pow(b2, e2)) => compare_binary(context, *b1, *e1, *b2, *e2),
        (Mul(f1), Mul(f2)) | (Add(f1), Add(f2)) => compare_args(context, f1, f2),
        (And(f1), And(f2)) | (Or(f1), Or(f2)) | (Xor(f1), Xor(f2)) => {
            compare_args(context, f1, f2)
        }
        (Compare(op1, l1, r1), Compare(op2, l2, r2)) => match op1.cmp(op2) {
            Ordering::Equal => compare_binary(context, *l1, *r1, *l2, *r2),
            ord => ord,
        },
        (Not(e1), Not(e2)) => compare_expr(context, *e1, *e2),
        (Boolean(b1), Boolean(b2)) => b1.cmp(b2),
        // Undefined / Aborted carry no payload; different ids cannot happen
        // for the same variant, so fall back to id order.
        _ => a.cmp(&b),
    }
}

/// Order of factors inside a canonical product.
///
/// Numbers first; otherwise by base, then by exponent (a bare factor has
/// exponent 1), so `x < x^2 < y`.
pub fn compare_factors(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    let is_num = |id| matches!(context.get(id), Expr::Number(_));
    match (is_num(a), is_num(b)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        (true, true) => return compare_expr(context, a, b),
        (false, false) => {}
    }
    let (base_a, exp_a) = split_pow(context, a);
    let (base_b, exp_b) = split_pow(context, b);
    match compare_expr(context, base_a, base_b) {
        Ordering::Equal => compare_exponents(context, exp_a, exp_b),
        ord => ord,
    }
}

/// Order of terms inside a canonical sum.
///
/// Numbers first; otherwise the non-numeric factor lists are compared
/// factor by factor, and the numeric coefficient breaks ties.
pub fn compare_terms(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    let (coeff_a, rest_a) = split_coeff(context, a);
    let (coeff_b, rest_b) = split_coeff(context, b);
    match (rest_a.is_empty(), rest_b.is_empty()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    for (fa, fb) in rest_a.iter().zip(rest_b.iter()) {
        match compare_factors(context, *fa, *fb) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    rest_a
        .len()
        .cmp(&rest_b.len())
        .then_with(|| match (coeff_a, coeff_b) {
            (Some(x), Some(y)) => compare_expr(context, x, y),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
}

fn split_pow(context: &Context, id: ExprId) -> (ExprId, Option<ExprId>) {
    match context.get(id) {
        Expr::Pow(b, e) => (*b, Some(*e)),
        _ => (id, None),
    }
}

fn compare_exponents(context: &Context, a: Option<ExprId>, b: Option<ExprId>) -> Ordering {
    let as_num = |e: Option<ExprId>| match e {
        None => Some(num_rational::BigRational::from_integer(1.into())),
        Some(id) => match context.get(id) {
            Expr::Number(n) => Some(n.clone()),
            _ => None,
        },
    };
    match (as_num(a), as_num(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => match (a, b) {
            (Some(x), Some(y)) => compare_expr(context, x, y),
            _ => Ordering::Equal,
        },
    }
}

fn split_coeff(context: &Context, id: ExprId) -> (Option<ExprId>, Vec<ExprId>) {
    match context.get(id) {
        Expr::Number(_) => (Some(id), Vec::new()),
        Expr::Mul(items) => match items.first() {
            Some(&first) if matches!(context.get(first), Expr::Number(_)) => {
                (Some(first), items[1..].to_vec())
            }
            _ => (None, items.clone()),
        },
        _ => (None, vec![id]),
    }
}

fn get_rank(expr: &Expr) -> u8 {
    use Expr::*;
    match expr {
        Number(_) => 0,
        Constant(_) => 1,
        Symbol(_) | Variable(_) | Unit(_) => 2,
        Function(_, _) => 3,
        Pow(_, _) => 4,
        Mul(_) => 5,
        Add(_) => 6,
        Compare(_, _, _) => 7,
        Not(_) => 8,
        And(_) => 9,
        Or(_) => 10,
        Xor(_) => 11,
        Boolean(_) => 12,
        Undefined => 13,
        Aborted => 14,
    }
}

/// Unknowns sort by name first, then by kind, then by arena id.
fn compare_unknowns(context: &Context, a: ExprId, b: ExprId) -> Ordering {
    let name_a = context.unknown_name(a).unwrap_or_default();
    let name_b = context.unknown_name(b).unwrap_or_default();
    name_a
        .cmp(name_b)
        .then_with(|| kind(context.get(a)).cmp(&kind(context.get(b))))
        .then_with(|| a.cmp(&b))
}

fn kind(expr: &Expr) -> u8 {
    match expr {
        Expr::Symbol(_) => 0,
        Expr::Variable(_) => 1,
        _ => 2,
    }
}

fn compare_args(context: &Context, args1: &[ExprId], args2: &[ExprId]) -> Ordering {
    for (a1, a2) in args1.iter().zip(args2.iter()) {
        match compare_expr(context, *a1, *a2) {
            Ordering::Equal => continue,
            ord => return ord,
        }
    }
    args1.len().cmp(&args2.len())
}

fn compare_binary(context: &Context, l1: ExprId, r1: ExprId, l2: ExprId, r2: ExprId) -> Ordering {
    match compare_expr(context, l1, l2) {
        Ordering::Equal => compare_expr(context, r1, r2),
        ord => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_before_unknowns_before_powers() {
        let mut ctx = Context::new();
        let two = ctx.num(2);
        let x = ctx.var("x");
        let x2 = ctx.add(Expr::Pow(x, two));
        assert_eq!(compare_expr(&ctx, two, x), Ordering::Less);
        assert_eq!(compare_expr(&ctx, x, x2), Ordering::Less);
    }

    #[test]
    fn test_polynomial_term_order() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let two = ctx.num(2);
        let m5 = ctx.num(-5);
        let x2 = ctx.add(Expr::Pow(x, two));
        let m5x = ctx.add(Expr::Mul(vec![m5, x]));
        let xy = ctx.add(Expr::Mul(vec![x, y]));
        assert_eq!(compare_terms(&ctx, two, m5x), Ordering::Less);
        assert_eq!(compare_terms(&ctx, m5x, x2), Ordering::Less);
        assert_eq!(compare_terms(&ctx, xy, x2), Ordering::Less);
        assert_eq!(compare_terms(&ctx, x, m5x), Ordering::Less);
        assert_eq!(compare_factors(&ctx, x2, y), Ordering::Less);
    }

    #[test]
    fn test_unknowns_by_name() {
        let mut ctx = Context::new();
        // intern y first so arena order disagrees with name order
        let y = ctx.var("y");
        let x = ctx.var("x");
        assert_eq!(compare_expr(&ctx, x, y), Ordering::Less);
        assert_eq!(compare_expr(&ctx, y, x), Ordering::Greater);
    }
}
