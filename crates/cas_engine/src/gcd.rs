//! Expression-level polynomial GCD.
//!
//! [`gcd`] walks a fixed list of structural shortcuts (trivial operands,
//! rational coefficients, factored operands, powers, bare symbols) before
//! converting both operands to [`MultiPoly`] and handing them to
//! `cas_math::poly_gcd`. Structural results keep factored forms, so
//! `gcd(x^2*(x+1), x*(x+1)^3)` is `x*(1 + x)` without expanding anything.
//!
//! The division and content helpers at the end of the file share the
//! conversion code and report failures as [`CasError`].

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};
use tracing::{debug, trace};

use cas_ast::views::mul_factors;
use cas_ast::{Context, Expr, ExprId};
use cas_math::numeric::gcd_rational;
use cas_math::{
    collect_poly_vars, multipoly_from_expr, multipoly_to_expr, poly_gcd, MultiPoly, PolyBudget,
};

use crate::calc;
use crate::env::CalcEnv;
use crate::error::CasError;
use crate::options::EvaluationOptions;
use crate::predicates::is_rational_polynomial;
use crate::sym_desc::collect_sym_desc;

/// Recursion cap of the structural dispatcher.
pub const MAX_GCD_DEPTH: usize = 64;

/// GCD with cofactors: `a = gcd * cofactor_a`, `b = gcd * cofactor_b`.
///
/// When `succeeded` is false the triple is `(1, a, b)`, which only means the
/// engine gave up. It is never a proof that `a` and `b` are coprime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcdResult {
    pub gcd: ExprId,
    pub cofactor_a: ExprId,
    pub cofactor_b: ExprId,
    pub succeeded: bool,
}

impl GcdResult {
    fn degenerate(ctx: &mut Context, a: ExprId, b: ExprId) -> Self {
        GcdResult {
            gcd: ctx.num(1),
            cofactor_a: a,
            cofactor_b: b,
            succeeded: false,
        }
    }
}

/// `(gcd, cofactor_a, cofactor_b)`
type Triple = (ExprId, ExprId, ExprId);

struct GcdCx<'a> {
    opts: &'a EvaluationOptions,
    env: &'a CalcEnv,
}

/// Which operand of the pair is the product being walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    A,
    B,
}

/// GCD of two rational polynomials, normalized to a positive leading
/// coefficient in the pivot ordering.
pub fn gcd(
    ctx: &mut Context,
    a: ExprId,
    b: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> GcdResult {
    if env.is_aborted() {
        return GcdResult::degenerate(ctx, a, b);
    }
    if !is_rational_polynomial(ctx, a) || !is_rational_polynomial(ctx, b) {
        debug!(target: "gcd", "operand_not_polynomial");
        return GcdResult::degenerate(ctx, a, b);
    }
    let cx = GcdCx { opts, env };
    match gcd_rec(ctx, &cx, a, b, 0) {
        Ok(t) => {
            let (gcd, cofactor_a, cofactor_b) = normalize_unit(ctx, a, b, t);
            GcdResult {
                gcd,
                cofactor_a,
                cofactor_b,
                succeeded: true,
            }
        }
        Err(e) => {
            debug!(target: "gcd", reason = %e, "gcd_failed");
            GcdResult::degenerate(ctx, a, b)
        }
    }
}

/// `a * b / gcd(a, b)`, computed as `cofactor_a * b`.
pub fn lcm(
    ctx: &mut Context,
    a: ExprId,
    b: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> ExprId {
    let r = gcd(ctx, a, b, opts, env);
    calc::mul(ctx, r.cofactor_a, b)
}

fn gcd_rec(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    a: ExprId,
    b: ExprId,
    depth: usize,
) -> Result<Triple, CasError> {
    cx.env.check_abort()?;
    if depth > MAX_GCD_DEPTH {
        return Err(CasError::DepthExceeded(depth));
    }
    if let Some(t) = trivial_gcd(ctx, a, b) {
        return Ok(t);
    }
    if let Some(t) = gcd_cleared(ctx, cx, a, b, depth)? {
        return Ok(t);
    }
    if matches!(ctx.get(a), Expr::Mul(_)) {
        return gcd_factored(ctx, cx, a, b, Role::A, depth);
    }
    if matches!(ctx.get(b), Expr::Mul(_)) {
        return gcd_factored(ctx, cx, b, a, Role::B, depth);
    }
    if let Some(t) = gcd_power(ctx, cx, a, b, depth)? {
        return Ok(t);
    }
    if symbol_coprime(ctx, a, b) || symbol_coprime(ctx, b, a) {
        trace!(target: "gcd", "bare_symbol_coprime");
        let one = ctx.num(1);
        return Ok((one, a, b));
    }
    gcd_multivariate(ctx, cx, a, b)
}

fn trivial_gcd(ctx: &mut Context, a: ExprId, b: ExprId) -> Option<Triple> {
    if ctx.is_one(a) || ctx.is_one(b) {
        let one = ctx.num(1);
        return Some((one, a, b));
    }
    match (ctx.is_zero(a), ctx.is_zero(b)) {
        (true, true) => {
            let one = ctx.num(1);
            return Some((a, one, one));
        }
        (true, false) => {
            let one = ctx.num(1);
            return Some((b, a, one));
        }
        (false, true) => {
            let one = ctx.num(1);
            return Some((a, one, b));
        }
        (false, false) => {}
    }
    if let (Some(x), Some(y)) = (calc::number_of(ctx, a), calc::number_of(ctx, b)) {
        // non-integers degrade to 1
        let g = gcd_rational(x.clone(), y.clone());
        let ca = ctx.number(x / &g);
        let cb = ctx.number(y / &g);
        return Some((ctx.number(g), ca, cb));
    }
    if a == b {
        let one = ctx.num(1);
        return Some((a, one, one));
    }
    None
}

// =============================================================================
// Rational coefficients
// =============================================================================

/// Lcm of the coefficient denominators, pushed through sums, products and
/// integer powers.
fn denominator_lcm(ctx: &Context, e: ExprId) -> BigInt {
    match ctx.get(e) {
        Expr::Number(n) => n.denom().clone(),
        Expr::Add(terms) => terms
            .iter()
            .fold(BigInt::one(), |acc, &t| acc.lcm(&denominator_lcm(ctx, t))),
        Expr::Mul(factors) => factors.iter().map(|&f| denominator_lcm(ctx, f)).product(),
        Expr::Pow(base, exp) => match ctx.as_number(*exp) {
            Some(n) if n.is_integer() => match n.to_integer().to_u32() {
                Some(k) => denominator_lcm(ctx, *base).pow(k),
                None => BigInt::one(),
            },
            _ => BigInt::one(),
        },
        _ => BigInt::one(),
    }
}

/// `e * m`, with the multiplier absorbed where the denominators live.
fn push_multiplier(ctx: &mut Context, e: ExprId, m: &BigInt) -> ExprId {
    if m.is_one() {
        return e;
    }
    match ctx.get(e).clone() {
        Expr::Add(terms) => {
            let terms: Vec<ExprId> = terms
                .into_iter()
                .map(|t| push_multiplier(ctx, t, m))
                .collect();
            calc::add_all(ctx, terms)
        }
        Expr::Mul(factors) => {
            let mut rest = m.clone();
            let mut out = Vec::with_capacity(factors.len() + 1);
            for f in factors {
                let mf = denominator_lcm(ctx, f);
                if mf.is_one() || !rest.is_multiple_of(&mf) {
                    out.push(f);
                    continue;
                }
                rest /= &mf;
                out.push(push_multiplier(ctx, f, &mf));
            }
            out.push(ctx.int(rest));
            calc::mul_all(ctx, out)
        }
        Expr::Pow(base, exp) => {
            let mb = denominator_lcm(ctx, base);
            let k = calc::number_of(ctx, exp)
                .filter(|n| n.is_integer())
                .and_then(|n| n.to_integer().to_u32());
            match k {
                Some(k) if !mb.is_one() && mb.pow(k) == *m => {
                    let nb = push_multiplier(ctx, base, &mb);
                    calc::pow(ctx, nb, exp)
                }
                _ => calc::scale(ctx, e, &BigRational::from_integer(m.clone())),
            }
        }
        _ => calc::scale(ctx, e, &BigRational::from_integer(m.clone())),
    }
}

fn gcd_cleared(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    a: ExprId,
    b: ExprId,
    depth: usize,
) -> Result<Option<Triple>, CasError> {
    let ma = denominator_lcm(ctx, a);
    let mb = denominator_lcm(ctx, b);
    if ma.is_one() && mb.is_one() {
        return Ok(None);
    }
    let a2 = push_multiplier(ctx, a, &ma);
    let b2 = push_multiplier(ctx, b, &mb);
    if !denominator_lcm(ctx, a2).is_one() || !denominator_lcm(ctx, b2).is_one() {
        // leave it to the polynomial representation
        return Ok(None);
    }
    debug!(target: "gcd", %ma, %mb, "clearing_denominators");
    let (g, ca, cb) = gcd_rec(ctx, cx, a2, b2, depth + 1)?;
    let ca = calc::scale(ctx, ca, &BigRational::new(BigInt::one(), ma));
    let cb = calc::scale(ctx, cb, &BigRational::new(BigInt::one(), mb));
    Ok(Some((g, ca, cb)))
}

// =============================================================================
// Structural shortcuts
// =============================================================================

/// Walk the factors of `prod` against the running cofactor of `other`.
///
/// Each step leaves coprime cofactors behind, so the product of the partial
/// gcds is the gcd of the whole product.
fn gcd_factored(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    prod: ExprId,
    other: ExprId,
    role: Role,
    depth: usize,
) -> Result<Triple, CasError> {
    trace!(target: "gcd", ?role, "factored_operand");
    let factors = mul_factors(ctx, prod);
    let mut g_parts = Vec::with_capacity(factors.len());
    let mut c_parts = Vec::with_capacity(factors.len());
    let mut rest = other;
    for f in factors {
        cx.env.check_abort()?;
        if ctx.is_one(rest) {
            c_parts.push(f);
            continue;
        }
        let (g, cf, cr) = gcd_rec(ctx, cx, f, rest, depth + 1)?;
        g_parts.push(g);
        c_parts.push(cf);
        rest = cr;
    }
    let g = calc::mul_all(ctx, g_parts);
    let c = calc::mul_all(ctx, c_parts);
    Ok(match role {
        Role::A => (g, c, rest),
        Role::B => (g, rest, c),
    })
}

/// `base^k` with an integer `k >= 2`.
fn int_power(ctx: &Context, e: ExprId) -> Option<(ExprId, u32)> {
    match ctx.get(e) {
        Expr::Pow(base, exp) => {
            let n = ctx.as_number(*exp)?;
            if !n.is_integer() {
                return None;
            }
            let k = n.to_integer().to_u32()?;
            (k >= 2).then_some((*base, k))
        }
        _ => None,
    }
}

fn gcd_power(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    a: ExprId,
    b: ExprId,
    depth: usize,
) -> Result<Option<Triple>, CasError> {
    let t = match (int_power(ctx, a), int_power(ctx, b)) {
        (Some((p, m)), Some((q, n))) => gcd_powers(ctx, cx, (p, m), (q, n), depth)?,
        (Some((p, m)), None) => gcd_powers(ctx, cx, (p, m), (b, 1), depth)?,
        (None, Some((q, n))) => gcd_powers(ctx, cx, (a, 1), (q, n), depth)?,
        (None, None) => return Ok(None),
    };
    Ok(Some(t))
}

/// `gcd(p^m, q^n)`.
fn gcd_powers(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    (p, m): (ExprId, u32),
    (q, n): (ExprId, u32),
    depth: usize,
) -> Result<Triple, CasError> {
    let k = m.min(n);
    if p == q {
        trace!(target: "gcd", m, n, "equal_power_bases");
        let g = calc::pow_int(ctx, p, i64::from(k));
        let ca = calc::pow_int(ctx, p, i64::from(m - k));
        let cb = calc::pow_int(ctx, q, i64::from(n - k));
        return Ok((g, ca, cb));
    }
    let (g1, cp, cq) = gcd_rec(ctx, cx, p, q, depth + 1)?;
    if ctx.is_one(g1) {
        let one = ctx.num(1);
        let a = calc::pow_int(ctx, p, i64::from(m));
        let b = calc::pow_int(ctx, q, i64::from(n));
        return Ok((one, a, b));
    }
    // p^m = g1^k * g1^(m-k) * cp^m, likewise for q^n
    let g1k = calc::pow_int(ctx, g1, i64::from(k));
    let ga = calc::pow_int(ctx, g1, i64::from(m - k));
    let cpm = calc::pow_int(ctx, cp, i64::from(m));
    let ra = calc::mul(ctx, ga, cpm);
    let gb = calc::pow_int(ctx, g1, i64::from(n - k));
    let cqn = calc::pow_int(ctx, cq, i64::from(n));
    let rb = calc::mul(ctx, gb, cqn);
    let (g2, ca, cb) = gcd_rec(ctx, cx, ra, rb, depth + 1)?;
    let g = calc::mul(ctx, g1k, g2);
    Ok((g, ca, cb))
}

/// A bare unknown `s` is coprime to `other` when `other` does not vanish at
/// `s = 0`. The zero test runs on the polynomial form, so an uncanonical
/// zero such as `(1 + y)^2 - (1 + 2*y + y^2)` is recognized.
fn symbol_coprime(ctx: &mut Context, s: ExprId, other: ExprId) -> bool {
    if !ctx.get(s).is_unknown() {
        return false;
    }
    let zero = ctx.num(0);
    let v = calc::substitute(ctx, other, s, zero);
    if ctx.is_zero(v) {
        return false;
    }
    let vars = collect_poly_vars(ctx, &[v]);
    match multipoly_from_expr(ctx, v, &vars, &PolyBudget::default()) {
        Ok(p) => !p.is_zero(),
        // not a polynomial: leave it to the general path
        Err(_) => false,
    }
}

// =============================================================================
// Polynomial representation
// =============================================================================

fn gcd_multivariate(
    ctx: &mut Context,
    cx: &GcdCx<'_>,
    a: ExprId,
    b: ExprId,
) -> Result<Triple, CasError> {
    let descs = collect_sym_desc(ctx, a, b);
    let vars: Vec<ExprId> = descs.iter().map(|d| d.sym).collect();
    let budget = PolyBudget::default();
    let pa = multipoly_from_expr(ctx, a, &vars, &budget).map_err(CasError::from_poly)?;
    let pb = multipoly_from_expr(ctx, b, &vars, &budget).map_err(CasError::from_poly)?;

    // common power of the pivot
    let shift = if vars.is_empty() {
        0
    } else {
        pa.ldegree(0).min(pb.ldegree(0))
    };
    let (pa, pb) = if shift > 0 {
        (pa.shift_down(0, shift), pb.shift_down(0, shift))
    } else {
        (pa, pb)
    };
    debug!(target: "gcd", vars = vars.len(), pivot_shift = shift, "multivariate_gcd");

    if cx.opts.do_polynomial_division {
        if let Some((g, ca, cb)) = exact_quotient(&pa, &pb, cx.env)? {
            trace!(target: "gcd", "exact_division_shortcut");
            return Ok(finish(ctx, &vars, shift, (&g, &ca, &cb)));
        }
    }

    let r = poly_gcd::gcd(&pa, &pb, &cx.opts.gcd, cx.env).map_err(CasError::from_poly)?;
    Ok(finish(
        ctx,
        &vars,
        shift,
        (&r.gcd, &r.cofactor_a, &r.cofactor_b),
    ))
}

/// One integral operand divides the other with an integral quotient.
fn exact_quotient(
    pa: &MultiPoly,
    pb: &MultiPoly,
    env: &CalcEnv,
) -> Result<Option<(MultiPoly, MultiPoly, MultiPoly)>, CasError> {
    if pa.is_constant() || pb.is_constant() || !pa.is_integral() || !pb.is_integral() {
        return Ok(None);
    }
    let one = MultiPoly::one(pa.vars.clone());
    if let Some(q) = pa.divide_in_z(pb, env).map_err(CasError::from_poly)? {
        return Ok(Some((pb.clone(), q, one)));
    }
    if let Some(q) = pb.divide_in_z(pa, env).map_err(CasError::from_poly)? {
        return Ok(Some((pa.clone(), one, q)));
    }
    Ok(None)
}

fn finish(
    ctx: &mut Context,
    vars: &[ExprId],
    shift: u32,
    (g, ca, cb): (&MultiPoly, &MultiPoly, &MultiPoly),
) -> Triple {
    let mut g = multipoly_to_expr(g, ctx);
    if shift > 0 {
        let xs = calc::pow_int(ctx, vars[0], i64::from(shift));
        g = calc::mul(ctx, xs, g);
    }
    let ca = multipoly_to_expr(ca, ctx);
    let cb = multipoly_to_expr(cb, ctx);
    (g, ca, cb)
}

/// Make the lex-leading coefficient of the gcd positive, flipping both
/// cofactors with it.
fn normalize_unit(ctx: &mut Context, a: ExprId, b: ExprId, (g, ca, cb): Triple) -> Triple {
    let negative = match ctx.as_number(g) {
        Some(n) => n.is_negative(),
        None => {
            let vars: Vec<ExprId> = collect_sym_desc(ctx, a, b).iter().map(|d| d.sym).collect();
            multipoly_from_expr(ctx, g, &vars, &PolyBudget::default())
                .map(|p| p.leading_coeff().is_negative())
                .unwrap_or(false)
        }
    };
    if !negative {
        return (g, ca, cb);
    }
    (
        calc::neg(ctx, g),
        calc::neg(ctx, ca),
        calc::neg(ctx, cb),
    )
}

// =============================================================================
// Division and content helpers
// =============================================================================

/// Convert `exprs` over their unknowns, with `lead` as the main variable.
fn to_polys(
    ctx: &Context,
    exprs: &[ExprId],
    lead: Option<ExprId>,
) -> Result<Vec<MultiPoly>, CasError> {
    if exprs.iter().any(|&e| !is_rational_polynomial(ctx, e)) {
        return Err(CasError::NotPolynomial);
    }
    let mut vars = Vec::new();
    if let Some(x) = lead {
        if !ctx.get(x).is_unknown() {
            return Err(CasError::NotPolynomial);
        }
        vars.push(x);
    }
    for v in collect_poly_vars(ctx, exprs) {
        if !vars.contains(&v) {
            vars.push(v);
        }
    }
    let budget = PolyBudget::default();
    exprs
        .iter()
        .map(|&e| multipoly_from_expr(ctx, e, &vars, &budget).map_err(CasError::from_poly))
        .collect()
}

/// Content of `p` with respect to `x`: the gcd of its coefficients in `x`.
pub fn polynomial_content(
    ctx: &mut Context,
    p: ExprId,
    x: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> Result<ExprId, CasError> {
    env.check_abort()?;
    let [mp] = to_array(to_polys(ctx, &[p], Some(x))?)?;
    let c = poly_gcd::content(&mp, 0, &opts.gcd, env).map_err(CasError::from_poly)?;
    Ok(multipoly_to_expr(&c, ctx))
}

/// Sign of the leading coefficient of `p` in `x` (`1` for zero).
pub fn polynomial_unit(ctx: &mut Context, p: ExprId, x: ExprId) -> Result<ExprId, CasError> {
    let [mp] = to_array(to_polys(ctx, &[p], Some(x))?)?;
    Ok(ctx.number(mp.unit()))
}

/// `p / (unit * content)` with respect to `x`.
pub fn polynomial_primpart(
    ctx: &mut Context,
    p: ExprId,
    x: ExprId,
    opts: &EvaluationOptions,
    env: &CalcEnv,
) -> Result<ExprId, CasError> {
    env.check_abort()?;
    let [mp] = to_array(to_polys(ctx, &[p], Some(x))?)?;
    let pp = poly_gcd::primpart(&mp, 0, &opts.gcd, env).map_err(CasError::from_poly)?;
    Ok(multipoly_to_expr(&pp, ctx))
}

/// Gcd of the numerators over the lcm of the denominators, nonnegative.
pub fn integer_content(ctx: &Context, p: ExprId) -> Result<BigRational, CasError> {
    let [mp] = to_array(to_polys(ctx, &[p], None)?)?;
    Ok(mp.integer_content())
}

/// Exact quotient `a / b`; `Ok(None)` when `b` does not divide `a`.
pub fn polynomial_divide(
    ctx: &mut Context,
    a: ExprId,
    b: ExprId,
    env: &CalcEnv,
) -> Result<Option<ExprId>, CasError> {
    env.check_abort()?;
    let [pa, pb] = to_array(to_polys(ctx, &[a, b], None)?)?;
    let q = pa.div_exact(&pb, env).map_err(CasError::from_poly)?;
    Ok(q.map(|q| multipoly_to_expr(&q, ctx)))
}

/// Long division in `x`: `a = q * b + r` with `deg_x r < deg_x b`.
pub fn polynomial_long_division(
    ctx: &mut Context,
    a: ExprId,
    b: ExprId,
    x: ExprId,
    env: &CalcEnv,
) -> Result<(ExprId, ExprId), CasError> {
    env.check_abort()?;
    let [pa, pb] = to_array(to_polys(ctx, &[a, b], Some(x))?)?;
    let (q, r) = pa.div_rem(&pb, 0, env).map_err(CasError::from_poly)?;
    let q = multipoly_to_expr(&q, ctx);
    let r = multipoly_to_expr(&r, ctx);
    Ok((q, r))
}

/// Pseudo-remainder of `a` by `b` in `x`.
pub fn polynomial_pseudo_remainder(
    ctx: &mut Context,
    a: ExprId,
    b: ExprId,
    x: ExprId,
    env: &CalcEnv,
) -> Result<ExprId, CasError> {
    env.check_abort()?;
    let [pa, pb] = to_array(to_polys(ctx, &[a, b], Some(x))?)?;
    let r = pa.prem(&pb, 0, env).map_err(CasError::from_poly)?;
    Ok(multipoly_to_expr(&r, ctx))
}

fn to_array<const N: usize>(v: Vec<MultiPoly>) -> Result<[MultiPoly; N], CasError> {
    v.try_into().map_err(|_| CasError::NotPolynomial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use cas_ast::DisplayExpr;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    fn setup() -> (Context, EvaluationOptions, CalcEnv) {
        (Context::new(), EvaluationOptions::default(), CalcEnv::new())
    }

    #[test]
    fn expanded_operands_share_linear_factor() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let a = calc::sub(&mut ctx, x2, one);
        let two_x = calc::scale(&mut ctx, x, &BigRational::from_integer(2.into()));
        let b = calc::add_all(&mut ctx, [x2, two_x, one]);
        let r = gcd(&mut ctx, a, b, &opts, &env);
        assert!(r.succeeded);
        assert_eq!(show(&ctx, r.gcd), "1 + x");
        assert_eq!(show(&ctx, r.cofactor_a), "-1 + x");
        assert_eq!(show(&ctx, r.cofactor_b), "1 + x");
    }

    #[test]
    fn factored_operands_stay_factored() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let s = calc::add(&mut ctx, x, one);
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let a = calc::mul(&mut ctx, x2, s);
        let s3 = calc::pow_int(&mut ctx, s, 3);
        let b = calc::mul(&mut ctx, x, s3);
        let r = gcd(&mut ctx, a, b, &opts, &env);
        assert!(r.succeeded);
        let g = expand(&mut ctx, r.gcd, 24);
        assert_eq!(show(&ctx, g), "x + x^2");
        assert_eq!(r.cofactor_a, x);
        let s2 = calc::pow_int(&mut ctx, s, 2);
        assert_eq!(r.cofactor_b, s2);
    }

    #[test]
    fn rational_coefficients_are_cleared() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let half = ctx.rational(1, 2);
        let hx = calc::mul(&mut ctx, half, x);
        let a = calc::add(&mut ctx, hx, half);
        let one = ctx.num(1);
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let b = calc::sub(&mut ctx, x2, one);
        let r = gcd(&mut ctx, a, b, &opts, &env);
        assert!(r.succeeded);
        assert_eq!(show(&ctx, r.gcd), "1 + x");
        assert_eq!(ctx.as_number(r.cofactor_a), Some(&BigRational::new(1.into(), 2.into())));
    }

    #[test]
    fn non_polynomial_and_aborted_degrade() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let s = ctx.call("sin", vec![x]);
        let r = gcd(&mut ctx, s, x, &opts, &env);
        assert!(!r.succeeded);
        assert!(ctx.is_one(r.gcd));
        assert_eq!((r.cofactor_a, r.cofactor_b), (s, x));

        env.abort_handle().abort();
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let r = gcd(&mut ctx, x2, x, &opts, &env);
        assert!(!r.succeeded);
    }

    #[test]
    fn numbers_and_sign_normalization() {
        let (mut ctx, opts, env) = setup();
        let a = ctx.num(12);
        let b = ctx.num(-18);
        let r = gcd(&mut ctx, a, b, &opts, &env);
        assert!(ctx.as_number(r.gcd).is_some_and(|n| *n == BigRational::from_integer(6.into())));
        let x = ctx.var("x");
        let mx = calc::neg(&mut ctx, x);
        let r = gcd(&mut ctx, mx, mx, &opts, &env);
        assert_eq!(r.gcd, x);
        assert!(calc::number_of(&ctx, r.cofactor_a).is_some_and(|n| n == -BigRational::one()));
    }

    #[test]
    fn lcm_of_divisor_is_the_multiple() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let b = calc::add(&mut ctx, x2, x);
        let l = lcm(&mut ctx, x, b, &opts, &env);
        assert_eq!(show(&ctx, l), "x + x^2");
    }

    #[test]
    fn content_division_and_pseudo_remainder() {
        let (mut ctx, opts, env) = setup();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let x2 = calc::pow_int(&mut ctx, x, 2);
        let two = BigRational::from_integer(2.into());
        let t1 = calc::mul(&mut ctx, x2, y);
        let t1 = calc::scale(&mut ctx, t1, &two);
        let t2 = calc::scale(&mut ctx, y, &BigRational::from_integer(4.into()));
        let p = calc::add(&mut ctx, t1, t2);
        let c = polynomial_content(&mut ctx, p, x, &opts, &env).unwrap();
        assert_eq!(show(&ctx, c), "2*y");
        let pp = polynomial_primpart(&mut ctx, p, x, &opts, &env).unwrap();
        assert_eq!(show(&ctx, pp), "2 + x^2");

        let one = ctx.num(1);
        let three_x = calc::scale(&mut ctx, x, &BigRational::from_integer(3.into()));
        let two_n = ctx.num(2);
        let a = calc::add_all(&mut ctx, [x2, three_x, two_n]);
        let b = calc::add(&mut ctx, x, one);
        let (q, r) = polynomial_long_division(&mut ctx, a, b, x, &env).unwrap();
        assert_eq!(show(&ctx, q), "2 + x");
        assert!(ctx.is_zero(r));
        assert_eq!(polynomial_divide(&mut ctx, a, b, &env).unwrap(), Some(q));

        let num = calc::add(&mut ctx, x2, one);
        let two_x = calc::scale(&mut ctx, x, &two);
        let den = calc::add(&mut ctx, two_x, one);
        let r = polynomial_pseudo_remainder(&mut ctx, num, den, x, &env).unwrap();
        assert_eq!(show(&ctx, r), "5");
        let m = calc::neg(&mut ctx, num);
        let u = polynomial_unit(&mut ctx, m, x).unwrap();
        assert!(calc::number_of(&ctx, u).is_some_and(|n| n == -BigRational::one()));
    }
}
