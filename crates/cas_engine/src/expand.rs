use cas_ast::{Context, Expr, ExprId};
use num_traits::{Signed, ToPrimitive};

use crate::calc;

/// Products whose expansion would exceed this many terms are left factored.
pub const EXPAND_TERM_LIMIT: u64 = 10_000;

/// Estimate number of terms that will be generated by expansion.
/// Returns None if the estimate overflows.
pub fn estimate_expand_terms(ctx: &Context, expr: ExprId, max_power: u32) -> Option<u64> {
    match ctx.get(expr) {
        Expr::Pow(base, exp) => {
            let n = match ctx.get(*exp) {
                Expr::Number(num) if num.is_integer() && num.is_positive() => {
                    num.to_integer().to_u32()?
                }
                _ => return Some(1),
            };
            let k = count_add_terms(ctx, *base) as u64;
            if k < 2 || n < 2 || n > max_power {
                return Some(1);
            }
            // multinomial count C(n+k-1, k-1)
            let mut c: u64 = 1;
            for i in 1..k {
                c = c.checked_mul(u64::from(n) + i)? / i;
            }
            Some(c)
        }
        Expr::Mul(factors) => factors.iter().try_fold(1u64, |acc, &f| {
            acc.checked_mul(estimate_expand_terms(ctx, f, max_power).unwrap_or(1))
        }),
        Expr::Add(terms) => terms.iter().try_fold(0u64, |acc, &t| {
            acc.checked_add(estimate_expand_terms(ctx, t, max_power).unwrap_or(1))
        }),
        _ => Some(1),
    }
}

/// Count number of terms in a sum (for estimation)
fn count_add_terms(ctx: &Context, expr: ExprId) -> usize {
    match ctx.get(expr) {
        Expr::Add(terms) => terms.len(),
        _ => 1,
    }
}

/// Expands an expression.
///
/// Children are expanded first (bottom-up), then products are distributed
/// over sums and `(a + b)^n` is multiplied out for `0 < n <= max_power`.
/// Negative integer powers of sums keep their exponent with an expanded
/// base. Function arguments are expanded too.
pub fn expand(ctx: &mut Context, expr: ExprId, max_power: u32) -> ExprId {
    let expr_data = ctx.get(expr).clone();
    match expr_data {
        Expr::Add(terms) => {
            let terms: Vec<ExprId> = terms.iter().map(|&t| expand(ctx, t, max_power)).collect();
            calc::add_all(ctx, terms)
        }
        Expr::Mul(factors) => {
            let factors: Vec<ExprId> = factors
                .iter()
                .map(|&f| expand(ctx, f, max_power))
                .collect();
            let within_limit = estimate_expand_terms(ctx, expr, max_power)
                .is_some_and(|n| n <= EXPAND_TERM_LIMIT);
            if !within_limit {
                return calc::mul_all(ctx, factors);
            }
            let one = ctx.num(1);
            factors
                .into_iter()
                .fold(one, |acc, f| expand_mul(ctx, acc, f))
        }
        Expr::Pow(b, e) => {
            let eb = expand(ctx, b, max_power);
            let ee = expand(ctx, e, max_power);
            expand_pow(ctx, eb, ee, max_power)
        }
        Expr::Function(fn_id, args) => {
            let new_args: Vec<ExprId> = args.iter().map(|&a| expand(ctx, a, max_power)).collect();
            match ctx.builtin_of(fn_id) {
                Some(f) => calc::func(ctx, f, new_args),
                None => ctx.add(Expr::Function(fn_id, new_args)),
            }
        }
        Expr::Compare(op, l, r) => {
            let l = expand(ctx, l, max_power);
            let r = expand(ctx, r, max_power);
            ctx.compare(op, l, r)
        }
        _ => expr,
    }
}

/// Expands multiplication: distributes over addition.
/// a * (b + c) -> a*b + a*c
pub fn expand_mul(ctx: &mut Context, l: ExprId, r: ExprId) -> ExprId {
    let lt = cas_ast::views::add_terms(ctx, l);
    let rt = cas_ast::views::add_terms(ctx, r);
    if lt.len() == 1 && rt.len() == 1 {
        return calc::mul(ctx, l, r);
    }
    let mut products = Vec::with_capacity(lt.len() * rt.len());
    for &a in &lt {
        for &b in &rt {
            products.push(calc::mul(ctx, a, b));
        }
    }
    calc::add_all(ctx, products)
}

/// Expands power: (a + b)^n by repeated distribution.
pub fn expand_pow(ctx: &mut Context, base: ExprId, exp: ExprId, max_power: u32) -> ExprId {
    let n = match ctx.get(exp) {
        Expr::Number(num) if num.is_integer() => num.to_integer().to_i64(),
        _ => None,
    };
    let is_sum = matches!(ctx.get(base), Expr::Add(_));
    match n {
        Some(n) if is_sum && n >= 2 && n <= i64::from(max_power) => {
            let estimate = calc::pow(ctx, base, exp);
            let terms = estimate_expand_terms(ctx, estimate, max_power).unwrap_or(u64::MAX);
            if terms > EXPAND_TERM_LIMIT {
                return estimate;
            }
            let mut acc = base;
            for _ in 1..n {
                acc = expand_mul(ctx, acc, base);
            }
            acc
        }
        Some(n) if is_sum && n <= -2 && -n <= i64::from(max_power) => {
            let pos = ctx.num(-n);
            let inner = expand_pow(ctx, base, pos, max_power);
            calc::recip(ctx, inner)
        }
        _ => {
            let p = calc::pow(ctx, base, exp);
            // (a*b)^n may have produced new products of sums
            if matches!(ctx.get(p), Expr::Mul(_)) && p != base {
                let factors = cas_ast::views::mul_factors(ctx, p);
                if factors.iter().any(|&f| matches!(ctx.get(f), Expr::Add(_))) {
                    let one = ctx.num(1);
                    return factors
                        .into_iter()
                        .fold(one, |acc, f| expand_mul(ctx, acc, f));
                }
            }
            p
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_ast::DisplayExpr;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    #[test]
    fn binomial_square() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let s = calc::add(&mut ctx, x, one);
        let sq = calc::pow_int(&mut ctx, s, 2);
        let e = expand(&mut ctx, sq, 24);
        assert_eq!(show(&ctx, e), "1 + 2*x + x^2");
    }

    #[test]
    fn difference_of_squares_cancels() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let a = calc::add(&mut ctx, x, one);
        let b = calc::sub(&mut ctx, x, one);
        let p = calc::mul(&mut ctx, a, b);
        let e = expand(&mut ctx, p, 24);
        assert_eq!(show(&ctx, e), "-1 + x^2");
    }

    #[test]
    fn power_cap_leaves_large_exponents() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let s = calc::add(&mut ctx, x, y);
        let p = calc::pow_int(&mut ctx, s, 30);
        let e = expand(&mut ctx, p, 24);
        assert_eq!(e, p);
    }

    #[test]
    fn negative_power_expands_base() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let s = calc::add(&mut ctx, x, one);
        let p = calc::pow_int(&mut ctx, s, -2);
        let e = expand(&mut ctx, p, 24);
        assert_eq!(show(&ctx, e), "(1 + 2*x + x^2)^(-1)");
    }
}
