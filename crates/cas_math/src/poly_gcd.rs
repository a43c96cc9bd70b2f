//! Multivariate polynomial GCD over Q.
//!
//! Two numeric algorithms over `MultiPoly`:
//!
//! - **Heuristic GCD**: evaluate the main variable at an integer ξ, take the
//!   GCD of the images recursively (one variable fewer), rebuild a candidate
//!   by balanced base-ξ interpolation and validate it by trial division.
//! - **Subresultant PRS**: pseudo-remainder sequence with the ψ/δ
//!   adjustment factors. Exact, used when the heuristic gives up.
//!
//! Results are normalized the same way on both paths: primitive part with a
//! positive lex-leading coefficient, times the gcd of the operands' integer
//! contents. So `a = g * cofactor_a` and `b = g * cofactor_b` hold exactly.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::Zero;
use tracing::{debug, trace};

use crate::error::PolyError;
use crate::interrupt::Interrupt;
use crate::multipoly::{MultiPoly, VarIdx};
use crate::numeric::{bit_length, content_gcd, isqrt};

/// Attempts before the heuristic gives up.
pub const HEUR_GCD_MAX_ATTEMPTS: u32 = 6;
/// Growth factor numerator for the next evaluation point.
pub const HEUR_GCD_GROWTH_NUM: u32 = 73794;
/// Growth factor denominator for the next evaluation point.
pub const HEUR_GCD_GROWTH_DEN: u32 = 27011;
/// Abort when `bitlen(ξ) * degree` exceeds this.
pub const HEUR_GCD_MAX_BITS_TIMES_DEGREE: u64 = 100_000;

/// Tuning of the heuristic GCD. Defaults reproduce the classic constants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeuristicGcdConfig {
    pub max_attempts: u32,
    pub growth_num: u32,
    pub growth_den: u32,
    pub max_bits_times_degree: u64,
}

impl Default for HeuristicGcdConfig {
    fn default() -> Self {
        Self {
            max_attempts: HEUR_GCD_MAX_ATTEMPTS,
            growth_num: HEUR_GCD_GROWTH_NUM,
            growth_den: HEUR_GCD_GROWTH_DEN,
            max_bits_times_degree: HEUR_GCD_MAX_BITS_TIMES_DEGREE,
        }
    }
}

/// GCD with cofactors: `a = gcd * cofactor_a`, `b = gcd * cofactor_b`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolyGcd {
    pub gcd: MultiPoly,
    pub cofactor_a: MultiPoly,
    pub cofactor_b: MultiPoly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    /// Heuristic first, subresultant on failure
    Auto,
    Heuristic,
    Subresultant,
}

/// GCD of two polynomials over identical variable lists.
pub fn gcd(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<PolyGcd, PolyError> {
    gcd_with(a, b, cfg, intr, Strategy::Auto)
}

/// Heuristic GCD only; `Err(HeuristicFailed)` when it gives up.
pub fn heur_gcd(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<PolyGcd, PolyError> {
    gcd_with(a, b, cfg, intr, Strategy::Heuristic)
}

/// Subresultant PRS GCD only.
pub fn sr_gcd(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<PolyGcd, PolyError> {
    gcd_with(a, b, cfg, intr, Strategy::Subresultant)
}

/// `a * b / gcd(a, b)`, normalized to a positive lex-leading coefficient.
pub fn lcm(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    if a.is_zero() || b.is_zero() {
        return Ok(MultiPoly::zero(a.vars.clone()));
    }
    let g = gcd(a, b, cfg, intr)?;
    let l = a.mul_unbounded(&g.cofactor_b)?;
    Ok(l.mul_scalar(&l.unit()))
}

/// Content with respect to `var`: gcd of the coefficients of `var^k`.
///
/// Normalized like [`gcd`]; for a constant `c` this is `|c|`.
pub fn content(
    p: &MultiPoly,
    var: VarIdx,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    let mut coeffs = p.coeffs(var).into_iter();
    let Some(first) = coeffs.next() else {
        return Ok(MultiPoly::zero(p.vars.clone()));
    };
    let mut acc = normalize_single(&first);
    for c in coeffs {
        intr.check()?;
        if acc.is_one() {
            break;
        }
        acc = gcd(&acc, &c, cfg, intr)?.gcd;
    }
    Ok(acc)
}

/// `p / (unit * content)` with respect to `var`.
pub fn primpart(
    p: &MultiPoly,
    var: VarIdx,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    if p.is_zero() {
        return Ok(p.clone());
    }
    let cont = content(p, var, cfg, intr)?;
    let q = p.div_exact(&cont, intr)?.ok_or(PolyError::Inexact)?;
    Ok(q.mul_scalar(&p.unit()))
}

fn gcd_with(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
    strategy: Strategy,
) -> Result<PolyGcd, PolyError> {
    intr.check()?;
    if a.vars != b.vars {
        return Err(PolyError::NotPolynomial);
    }
    let vars = a.vars.clone();

    if a.is_zero() {
        let g = normalize_single(b);
        let unit = MultiPoly::constant(b.unit(), vars.clone());
        return Ok(PolyGcd {
            gcd: g,
            cofactor_a: MultiPoly::zero(vars),
            cofactor_b: unit,
        });
    }
    if b.is_zero() {
        let g = normalize_single(a);
        let unit = MultiPoly::constant(a.unit(), vars.clone());
        return Ok(PolyGcd {
            gcd: g,
            cofactor_a: unit,
            cofactor_b: MultiPoly::zero(vars),
        });
    }

    let (Some(ca), Some(cb)) = (a.constant_value(), b.constant_value()) else {
        return gcd_nonconstant(a, b, cfg, intr, strategy);
    };
    let g = content_gcd(&ca, &cb);
    Ok(PolyGcd {
        gcd: MultiPoly::constant(g.clone(), vars.clone()),
        cofactor_a: MultiPoly::constant(ca / &g, vars.clone()),
        cofactor_b: MultiPoly::constant(cb / &g, vars),
    })
}

fn gcd_nonconstant(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
    strategy: Strategy,
) -> Result<PolyGcd, PolyError> {
    let v = match a.first_var_from(0).into_iter().chain(b.first_var_from(0)).min() {
        Some(v) => v,
        None => return Err(PolyError::NotPolynomial),
    };

    // One operand free of the main variable: only its content can be shared.
    if a.degree(v) == 0 || b.degree(v) == 0 {
        let (free, other) = if a.degree(v) == 0 { (a, b) } else { (b, a) };
        trace!(target: "gcd", var = v, "content_reduction");
        let cont = content(other, v, cfg, intr)?;
        let g = gcd_with(free, &cont, cfg, intr, strategy)?.gcd;
        return with_cofactors(g, a, b, intr);
    }

    let g = match strategy {
        Strategy::Subresultant => sr_gcd_raw(a, b, v, cfg, intr)?,
        Strategy::Heuristic => heur_gcd_raw(a, b, cfg, intr)?,
        Strategy::Auto => match heur_gcd_raw(a, b, cfg, intr) {
            Ok(g) => g,
            Err(PolyError::Interrupted) => return Err(PolyError::Interrupted),
            Err(e) => {
                debug!(target: "gcd", reason = %e, "heuristic_failed_fallback_subresultant");
                sr_gcd_raw(a, b, v, cfg, intr)?
            }
        },
    };
    let g = normalize_gcd(&g, a, b);
    with_cofactors(g, a, b, intr)
}

fn with_cofactors(
    g: MultiPoly,
    a: &MultiPoly,
    b: &MultiPoly,
    intr: &dyn Interrupt,
) -> Result<PolyGcd, PolyError> {
    let cofactor_a = a.div_exact(&g, intr)?.ok_or(PolyError::Inexact)?;
    let cofactor_b = b.div_exact(&g, intr)?.ok_or(PolyError::Inexact)?;
    Ok(PolyGcd {
        gcd: g,
        cofactor_a,
        cofactor_b,
    })
}

/// Primitive, positive-leading form of a single polynomial (times its content).
fn normalize_single(p: &MultiPoly) -> MultiPoly {
    p.mul_scalar(&p.unit())
}

/// Primitive part of `g` with positive leading coefficient, scaled by the
/// gcd of the integer contents of `a` and `b`.
fn normalize_gcd(g: &MultiPoly, a: &MultiPoly, b: &MultiPoly) -> MultiPoly {
    let ic = g.integer_content();
    if ic.is_zero() {
        return g.clone();
    }
    let scale = content_gcd(&a.integer_content(), &b.integer_content()) / (ic * g.unit());
    g.mul_scalar(&scale)
}

// =============================================================================
// Heuristic GCD
// =============================================================================

fn heur_gcd_raw(
    a: &MultiPoly,
    b: &MultiPoly,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    // Remove common content so both operands are integral.
    let gc = content_gcd(&a.integer_content(), &b.integer_content());
    if gc.is_zero() {
        return Err(PolyError::HeuristicFailed);
    }
    let p = a.div_scalar(&gc);
    let q = b.div_scalar(&gc);
    if !p.is_integral() || !q.is_integral() {
        return Err(PolyError::HeuristicFailed);
    }
    let g = heur_gcd_z(&p, &q, 0, cfg, intr)?;
    Ok(g.mul_scalar(&gc))
}

/// Heuristic GCD of integer polynomials whose variables before `from` are
/// already eliminated.
fn heur_gcd_z(
    p: &MultiPoly,
    q: &MultiPoly,
    from: VarIdx,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    intr.check()?;
    if p.is_zero() || q.is_zero() {
        return Err(PolyError::HeuristicFailed);
    }

    let Some(v) = p.first_var_from(from).into_iter().chain(q.first_var_from(from)).min() else {
        // Both integers.
        let g = p.leading_coeff().to_integer().gcd(&q.leading_coeff().to_integer());
        return Ok(MultiPoly::constant(BigRational::from_integer(g), p.vars.clone()));
    };

    let gc = content_gcd(&p.integer_content(), &q.integer_content());
    let p = p.div_scalar(&gc);
    let q = q.div_scalar(&gc);

    let maxdeg = p.degree(v).max(q.degree(v));
    let two = BigInt::from(2);
    let mut xi: BigInt = &two * p.max_coeff().max(q.max_coeff()) + &two;

    for attempt in 0..cfg.max_attempts {
        intr.check()?;
        // ξ is a BigInt, so only the size guard applies.
        if bit_length(&xi).saturating_mul(maxdeg as u64) > cfg.max_bits_times_degree {
            trace!(target: "gcd", attempt, bits = bit_length(&xi), maxdeg, "heuristic_xi_too_large");
            return Err(PolyError::HeuristicFailed);
        }

        let xr = BigRational::from_integer(xi.clone());
        let pe = p.eval_var(v, &xr);
        let qe = q.eval_var(v, &xr);

        match heur_gcd_z(&pe, &qe, v + 1, cfg, intr) {
            Ok(gamma) => {
                if let Some(g) = interpolate(&gamma, &xi, v, maxdeg) {
                    let ic = g.integer_content();
                    if !ic.is_zero() {
                        let g = g.div_scalar(&ic);
                        if p.divide_in_z(&g, intr)?.is_some() && q.divide_in_z(&g, intr)?.is_some()
                        {
                            trace!(target: "gcd", attempt, var = v, "heuristic_success");
                            return Ok(g.mul_scalar(&gc));
                        }
                    }
                }
            }
            Err(PolyError::Interrupted) => return Err(PolyError::Interrupted),
            Err(_) => {}
        }

        // Next evaluation point
        let root4 = isqrt(&isqrt(&xi));
        xi = (&xi * root4 * BigInt::from(cfg.growth_num)).div_floor(&BigInt::from(cfg.growth_den));
        trace!(target: "gcd", attempt, "heuristic_retry");
    }

    Err(PolyError::HeuristicFailed)
}

/// Rebuild a polynomial in `var` from its image at `var = xi` using
/// symmetric base-ξ digits. `None` if more than `maxdeg + 1` digits appear.
fn interpolate(gamma: &MultiPoly, xi: &BigInt, var: VarIdx, maxdeg: u32) -> Option<MultiPoly> {
    let xr = BigRational::from_integer(xi.clone());
    let mut e = gamma.clone();
    let mut terms = Vec::new();
    for i in 0..=maxdeg {
        if e.is_zero() {
            break;
        }
        let gi = e.smod(xi);
        for (c, m) in &gi.terms {
            let mut m = m.clone();
            m[var] = i;
            terms.push((c.clone(), m));
        }
        e = e.sub(&gi).ok()?.div_scalar(&xr);
    }
    if !e.is_zero() {
        return None;
    }
    Some(MultiPoly::from_terms(gamma.vars.clone(), terms))
}

// =============================================================================
// Subresultant PRS
// =============================================================================

fn sr_gcd_raw(
    a: &MultiPoly,
    b: &MultiPoly,
    var: VarIdx,
    cfg: &HeuristicGcdConfig,
    intr: &dyn Interrupt,
) -> Result<MultiPoly, PolyError> {
    let vars = a.vars.clone();
    let (mut c, mut d) = if a.degree(var) >= b.degree(var) {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    };
    let mut cdeg = c.degree(var);
    let mut ddeg = d.degree(var);

    // Contents are attached to the result at the end.
    let cont_c = content(&c, var, cfg, intr)?;
    let cont_d = content(&d, var, cfg, intr)?;
    let gamma = gcd(&cont_c, &cont_d, cfg, intr)?.gcd;
    if ddeg == 0 {
        return Ok(gamma);
    }
    c = c.div_exact(&cont_c, intr)?.ok_or(PolyError::Inexact)?;
    d = d.div_exact(&cont_d, intr)?.ok_or(PolyError::Inexact)?;

    let mut ri = MultiPoly::one(vars.clone());
    let mut psi = MultiPoly::one(vars.clone());
    let mut delta = cdeg - ddeg;
    let max_steps = cdeg + 1;

    for step in 0..=max_steps {
        intr.check()?;
        trace!(target: "gcd", step, cdeg, ddeg, "subresultant_step");
        let r = c.prem(&d, var, intr)?;
        if r.is_zero() {
            let pp = primpart(&d, var, cfg, intr)?;
            return gamma.mul_unbounded(&pp);
        }
        c = d;
        cdeg = ddeg;

        let mut divisor = ri.clone();
        for _ in 0..delta {
            divisor = divisor.mul_unbounded(&psi)?;
        }
        d = r.div_exact(&divisor, intr)?.ok_or(PolyError::Inexact)?;
        ddeg = d.degree(var);
        if ddeg == 0 {
            return Ok(gamma);
        }

        // Next element of subresultant sequence
        ri = c.lcoeff(var);
        if delta == 1 {
            psi = ri.clone();
        } else if delta > 1 {
            let mut num = MultiPoly::one(vars.clone());
            for _ in 0..delta {
                num = num.mul_unbounded(&ri)?;
            }
            let mut den = MultiPoly::one(vars.clone());
            for _ in 0..delta - 1 {
                den = den.mul_unbounded(&psi)?;
            }
            psi = num.div_exact(&den, intr)?.ok_or(PolyError::Inexact)?;
        }
        delta = cdeg - ddeg;
    }

    Err(PolyError::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupt::NoInterrupt;
    use crate::multipoly::PolyBudget;
    use cas_ast::{Context, ExprId};

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(n.into())
    }

    fn xy() -> Vec<ExprId> {
        let mut ctx = Context::new();
        vec![ctx.var("x"), ctx.var("y")]
    }

    fn poly(v: &[ExprId], terms: &[(i64, [u32; 2])]) -> MultiPoly {
        MultiPoly::from_terms(
            v.to_vec(),
            terms.iter().map(|(c, m)| (q(*c), m.to_vec())).collect(),
        )
    }

    fn mul(a: &MultiPoly, b: &MultiPoly) -> MultiPoly {
        a.mul(b, &PolyBudget::default()).unwrap()
    }

    #[test]
    fn univariate_common_factor() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        // (x - 1)(x + 2) and (x - 1)(x + 3)
        let g = poly(&v, &[(1, [1, 0]), (-1, [0, 0])]);
        let a = mul(&g, &poly(&v, &[(1, [1, 0]), (2, [0, 0])]));
        let b = mul(&g, &poly(&v, &[(1, [1, 0]), (3, [0, 0])]));
        for r in [
            gcd(&a, &b, &cfg, &NoInterrupt).unwrap(),
            heur_gcd(&a, &b, &cfg, &NoInterrupt).unwrap(),
            sr_gcd(&a, &b, &cfg, &NoInterrupt).unwrap(),
        ] {
            assert_eq!(r.gcd, g);
            assert_eq!(mul(&r.gcd, &r.cofactor_a), a);
            assert_eq!(mul(&r.gcd, &r.cofactor_b), b);
        }
    }

    #[test]
    fn bivariate_gcd_with_integer_content() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        // 6(x + y)(x - 2) and 4(x + y)(y + 1): gcd = 2(x + y)
        let g = poly(&v, &[(1, [1, 0]), (1, [0, 1])]);
        let a = mul(&mul(&g, &poly(&v, &[(1, [1, 0]), (-2, [0, 0])])), &poly(&v, &[(6, [0, 0])]));
        let b = mul(&mul(&g, &poly(&v, &[(1, [0, 1]), (1, [0, 0])])), &poly(&v, &[(4, [0, 0])]));
        let expected = poly(&v, &[(2, [1, 0]), (2, [0, 1])]);
        assert_eq!(gcd(&a, &b, &cfg, &NoInterrupt).unwrap().gcd, expected);
        assert_eq!(sr_gcd(&a, &b, &cfg, &NoInterrupt).unwrap().gcd, expected);
    }

    #[test]
    fn coprime_gives_one() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        let a = poly(&v, &[(1, [2, 0]), (1, [0, 0])]);
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 0])]);
        let r = gcd(&a, &b, &cfg, &NoInterrupt).unwrap();
        assert!(r.gcd.is_one());
        assert_eq!(r.cofactor_a, a);
    }

    #[test]
    fn free_operand_uses_content() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        // gcd(y, x*y + y) = y
        let a = poly(&v, &[(1, [0, 1])]);
        let b = poly(&v, &[(1, [1, 1]), (1, [0, 1])]);
        let r = gcd(&a, &b, &cfg, &NoInterrupt).unwrap();
        assert_eq!(r.gcd, a);
        assert_eq!(r.cofactor_b, poly(&v, &[(1, [1, 0]), (1, [0, 0])]));
    }

    #[test]
    fn content_and_primpart() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        // -(2y x^2 + 4y) = -2y (x^2 + 2)
        let p = poly(&v, &[(-2, [2, 1]), (-4, [0, 1])]);
        let c = content(&p, 0, &cfg, &NoInterrupt).unwrap();
        assert_eq!(c, poly(&v, &[(2, [0, 1])]));
        let pp = primpart(&p, 0, &cfg, &NoInterrupt).unwrap();
        assert_eq!(pp, poly(&v, &[(1, [2, 0]), (2, [0, 0])]));
    }

    #[test]
    fn lcm_of_overlapping_factors() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        let a = poly(&v, &[(1, [2, 0]), (-1, [0, 0])]); // x^2 - 1
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 0])]); // x + 1
        assert_eq!(lcm(&a, &b, &cfg, &NoInterrupt).unwrap(), a);
    }

    #[test]
    fn tiny_bound_forces_heuristic_failure() {
        let v = xy();
        let cfg = HeuristicGcdConfig {
            max_bits_times_degree: 1,
            ..HeuristicGcdConfig::default()
        };
        let a = poly(&v, &[(1, [2, 0]), (-1, [0, 0])]);
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 0])]);
        assert_eq!(
            heur_gcd(&a, &b, &cfg, &NoInterrupt),
            Err(PolyError::HeuristicFailed)
        );
        // the dispatcher still succeeds through the subresultant path
        assert_eq!(gcd(&a, &b, &cfg, &NoInterrupt).unwrap().gcd, b);
    }

    #[test]
    fn interrupted_before_start() {
        let v = xy();
        let cfg = HeuristicGcdConfig::default();
        let a = poly(&v, &[(1, [2, 0]), (-1, [0, 0])]);
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 0])]);
        let stop = || true;
        assert_eq!(gcd(&a, &b, &cfg, &stop), Err(PolyError::Interrupted));
    }
}
