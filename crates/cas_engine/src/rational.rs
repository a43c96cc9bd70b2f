//! Rational-function simplification.
//!
//! Terms of a sum are grouped by denominator, numerators of a group are
//! added and the resulting fraction is cancelled through the GCD engine.
//! Groups are then merged into a single fraction over the lcm of their
//! denominators, unless that would grow the expression.
//!
//! The GCD engine is always entered with `do_polynomial_division` disabled
//! so it never comes back here.

use cas_ast::views::{add_terms, FractionParts};
use cas_ast::{count_all_nodes, Context, Expr, ExprId};
use tracing::{debug, trace};

use crate::calc;
use crate::env::CalcEnv;
use crate::error::CasError;
use crate::expand::expand;
use crate::gcd::{self, polynomial_divide};
use crate::options::{EvaluationOptions, SimplifyParams};
use crate::predicates::is_rational_polynomial;

struct Simp<'a> {
    /// Local copy handed to the GCD engine
    gcd_opts: EvaluationOptions,
    exact_division: bool,
    max_expand_power: u32,
    params: SimplifyParams,
    env: &'a CalcEnv,
}

/// Simplify rational subexpressions of `e`.
///
/// `Ok(Some(new))` when something changed, `Ok(None)` otherwise and
/// `Err(Aborted)` on cancellation.
pub fn do_simplification(
    ctx: &mut Context,
    e: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> Result<Option<ExprId>, CasError> {
    let s = Simp::new(opts, env);
    let out = s.rec(ctx, e, s.params.depth, false)?;
    if out == e {
        return Ok(None);
    }
    debug!(target: "rational", before = count_all_nodes(ctx, e), after = count_all_nodes(ctx, out), "simplified");
    Ok(Some(out))
}

/// Combine `e` into a single cancelled fraction, even when that makes the
/// expression larger.
pub fn together(
    ctx: &mut Context,
    e: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> Result<ExprId, CasError> {
    let s = Simp::new(opts, env);
    s.rec(ctx, e, s.params.depth, true)
}

/// Numerator and denominator of `e` (denominator `1` when there is none).
///
/// Only symbolic factors with negative integer exponents count as
/// denominator; rational coefficients stay in the numerator.
pub fn numer_denom(ctx: &mut Context, e: ExprId) -> (ExprId, ExprId) {
    let parts = FractionParts::from(ctx, e);
    if parts.den.is_empty() {
        return (e, ctx.num(1));
    }
    let coeff = ctx.number(parts.coeff.clone());
    let mut num = vec![coeff];
    for f in &parts.num {
        num.push(calc::pow_int(ctx, f.base, f.exp));
    }
    let mut den = Vec::with_capacity(parts.den.len());
    for f in &parts.den {
        den.push(calc::pow_int(ctx, f.base, f.exp));
    }
    let num = calc::mul_all(ctx, num);
    let den = calc::mul_all(ctx, den);
    (num, den)
}

impl<'a> Simp<'a> {
    fn new(opts: &EvaluationOptions, env: &'a CalcEnv) -> Self {
        Simp {
            gcd_opts: opts.without_polynomial_division(),
            exact_division: opts.do_polynomial_division,
            max_expand_power: opts.max_expand_power,
            params: opts.simplify_params(),
            env,
        }
    }

    fn rec(&self, ctx: &mut Context, e: ExprId, depth: usize, force: bool) -> Result<ExprId, CasError> {
        self.env.check_abort()?;
        if depth == 0 {
            return Ok(e);
        }
        let d = depth - 1;
        let rebuilt = match ctx.get(e).clone() {
            Expr::Add(terms) => {
                let mut ts = Vec::with_capacity(terms.len());
                for t in terms {
                    ts.push(self.rec(ctx, t, d, force)?);
                }
                let sum = calc::add_all(ctx, ts);
                self.combine_sum(ctx, sum, force)?
            }
            Expr::Mul(factors) => {
                let mut fs = Vec::with_capacity(factors.len());
                for f in factors {
                    fs.push(self.rec(ctx, f, d, force)?);
                }
                let prod = calc::mul_all(ctx, fs);
                self.cancel_product(ctx, prod)?
            }
            Expr::Pow(b, x) => {
                let b = self.rec(ctx, b, d, force)?;
                let x = self.rec(ctx, x, d, force)?;
                calc::pow(ctx, b, x)
            }
            Expr::Function(name, args) => {
                let mut out = Vec::with_capacity(args.len());
                for a in args {
                    out.push(self.rec(ctx, a, d, force)?);
                }
                match ctx.builtin_of(name) {
                    Some(f) => calc::func(ctx, f, out),
                    None => ctx.add(Expr::Function(name, out)),
                }
            }
            Expr::Compare(op, l, r) => {
                let l = self.rec(ctx, l, d, force)?;
                let r = self.rec(ctx, r, d, force)?;
                ctx.compare(op, l, r)
            }
            Expr::And(items) => {
                let out = self.rec_all(ctx, items, d, force)?;
                ctx.add(Expr::And(out))
            }
            Expr::Or(items) => {
                let out = self.rec_all(ctx, items, d, force)?;
                ctx.add(Expr::Or(out))
            }
            Expr::Xor(items) => {
                let out = self.rec_all(ctx, items, d, force)?;
                ctx.add(Expr::Xor(out))
            }
            Expr::Not(inner) => {
                let inner = self.rec(ctx, inner, d, force)?;
                ctx.add(Expr::Not(inner))
            }
            _ => e,
        };
        if force || count_all_nodes(ctx, rebuilt) <= count_all_nodes(ctx, e) {
            Ok(rebuilt)
        } else {
            trace!(target: "rational", "rewrite_discarded_size");
            Ok(e)
        }
    }

    fn rec_all(
        &self,
        ctx: &mut Context,
        items: Vec<ExprId>,
        depth: usize,
        force: bool,
    ) -> Result<Vec<ExprId>, CasError> {
        items
            .into_iter()
            .map(|i| self.rec(ctx, i, depth, force))
            .collect()
    }

    /// Cancel `num / den` where both are rational polynomials.
    fn cancel(&self, ctx: &mut Context, num: ExprId, den: ExprId) -> Result<ExprId, CasError> {
        if ctx.is_one(den) {
            return Ok(num);
        }
        if !is_rational_polynomial(ctx, num) || !is_rational_polynomial(ctx, den) {
            return Ok(calc::div(ctx, num, den));
        }
        if ctx.is_zero(num) {
            return Ok(num);
        }
        if self.exact_division {
            if let Some(q) = polynomial_divide(ctx, num, den, self.env)? {
                trace!(target: "rational", "exact_division");
                return Ok(q);
            }
        }
        let g = gcd::gcd(ctx, num, den, &self.gcd_opts, self.env);
        self.env.check_abort()?;
        if !g.succeeded || ctx.is_one(g.gcd) {
            return Ok(calc::div(ctx, num, den));
        }
        trace!(target: "rational", "cancelled_common_factor");
        Ok(calc::div(ctx, g.cofactor_a, g.cofactor_b))
    }

    fn cancel_product(&self, ctx: &mut Context, prod: ExprId) -> Result<ExprId, CasError> {
        if !matches!(ctx.get(prod), Expr::Mul(_) | Expr::Pow(..)) {
            return Ok(prod);
        }
        let (num, den) = numer_denom(ctx, prod);
        if ctx.is_one(den) {
            return Ok(prod);
        }
        self.cancel(ctx, num, den)
    }

    fn combine_sum(&self, ctx: &mut Context, sum: ExprId, force: bool) -> Result<ExprId, CasError> {
        let terms = add_terms(ctx, sum);
        if terms.len() < 2 {
            return self.cancel_product(ctx, sum);
        }

        // group numerators by denominator, keeping first-seen order
        let mut groups: Vec<(ExprId, Vec<ExprId>)> = Vec::new();
        for t in terms {
            let (n, d) = numer_denom(ctx, t);
            match groups.iter_mut().find(|(gd, _)| *gd == d) {
                Some((_, ns)) => ns.push(n),
                None => groups.push((d, vec![n])),
            }
        }
        if groups.iter().all(|(d, _)| ctx.is_one(*d)) {
            return Ok(sum);
        }

        let mut parts: Vec<(ExprId, ExprId)> = Vec::with_capacity(groups.len());
        for (den, nums) in groups {
            self.env.check_abort()?;
            let num = calc::add_all(ctx, nums);
            let num = expand(ctx, num, self.max_expand_power);
            let reduced = self.cancel(ctx, num, den)?;
            parts.push(numer_denom(ctx, reduced));
        }
        let grouped_terms: Vec<ExprId> = parts.iter().map(|&(n, d)| calc::div(ctx, n, d)).collect();
        let grouped = calc::add_all(ctx, grouped_terms);

        let fractional = parts.iter().filter(|(_, d)| !ctx.is_one(*d)).count();
        if parts.len() < 2 || fractional == 0 {
            return Ok(grouped);
        }
        match self.merge(ctx, &parts)? {
            Some(merged)
                if force || count_all_nodes(ctx, merged) <= count_all_nodes(ctx, grouped) =>
            {
                Ok(merged)
            }
            _ => Ok(grouped),
        }
    }

    /// One fraction over the lcm of the denominators.
    fn merge(&self, ctx: &mut Context, parts: &[(ExprId, ExprId)]) -> Result<Option<ExprId>, CasError> {
        let Some((&(mut num, mut den), rest)) = parts.split_first() else {
            return Ok(None);
        };
        for &(n, d) in rest {
            self.env.check_abort()?;
            // n1/d1 + n2/d2 = (n1*(d2/g) + n2*(d1/g)) / ((d1/g)*d2)
            let g = gcd::gcd(ctx, den, d, &self.gcd_opts, self.env);
            let left = calc::mul(ctx, num, g.cofactor_b);
            let right = calc::mul(ctx, n, g.cofactor_a);
            let sum = calc::add(ctx, left, right);
            num = expand(ctx, sum, self.max_expand_power);
            den = calc::mul(ctx, g.cofactor_a, d);
            let work = add_terms(ctx, num).len() * add_terms(ctx, den).len();
            if work > self.params.merge_size_limit {
                debug!(target: "rational", work, limit = self.params.merge_size_limit, "merge_skipped");
                return Ok(None);
            }
        }
        Ok(Some(self.cancel(ctx, num, den)?))
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
    fn same_denominator_terms_cancel() {
        let mut ctx = Context::new();
        let opts = EvaluationOptions::default();
        let env = CalcEnv::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let s = calc::add(&mut ctx, x, one);
        let a = calc::div(&mut ctx, x, s);
        let b = calc::div(&mut ctx, one, s);
        let e = calc::add(&mut ctx, a, b);
        let out = do_simplification(&mut ctx, e, &opts, &env).unwrap();
        assert_eq!(out, Some(one));
    }

    #[test]
    fn common_factor_is_cancelled() {
        let mut ctx = Context::new();
        let opts = EvaluationOptions::default().without_polynomial_division();
        let env = CalcEnv::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let num = calc::sub(&mut ctx, x2, one);
        let den = calc::add(&mut ctx, x, one);
        let f = calc::div(&mut ctx, num, den);
        let out = do_simplification(&mut ctx, f, &opts, &env).unwrap();
        let out = out.map(|o| show(&ctx, o));
        assert_eq!(out.as_deref(), Some("-1 + x"));
    }

    #[test]
    fn nothing_to_do_is_none() {
        let mut ctx = Context::new();
        let opts = EvaluationOptions::default();
        let env = CalcEnv::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let e = calc::add(&mut ctx, x, y);
        assert_eq!(do_simplification(&mut ctx, e, &opts, &env), Ok(None));
    }

    #[test]
    fn together_forces_a_single_fraction() {
        let mut ctx = Context::new();
        let opts = EvaluationOptions::default();
        let env = CalcEnv::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let a = calc::recip(&mut ctx, x);
        let b = calc::recip(&mut ctx, y);
        let e = calc::add(&mut ctx, a, b);
        let t = together(&mut ctx, e, &opts, &env).unwrap();
        let (n, d) = numer_denom(&mut ctx, t);
        assert_eq!(show(&ctx, n), "x + y");
        let xy = calc::mul(&mut ctx, x, y);
        assert_eq!(d, xy);
    }

    #[test]
    fn aborted_simplification_fails() {
        let mut ctx = Context::new();
        let opts = EvaluationOptions::default();
        let env = CalcEnv::new();
        env.abort_handle().abort();
        let x = ctx.var("x");
        assert_eq!(do_simplification(&mut ctx, x, &opts, &env), Err(CasError::Aborted));
    }
}
