//! Division and content helpers.
//!
//! - `prem`: pseudo-remainder in a main variable
//! - `div_rem`: long division in a variable over Q[other vars]
//! - `div_exact`: exact multivariate division (lex leading terms)
//! - `divide_in_z`: exact division with an integral quotient
//!
//! Every loop polls the interrupt.

use num_rational::BigRational;
use num_traits::One;

use super::{Monomial, MultiPoly, PolyError, VarIdx};
use crate::interrupt::Interrupt;

impl MultiPoly {
    /// Pseudo-remainder of `self` by `b` with respect to `var`:
    /// `lcoeff(b)^(deg a - deg b + 1) * a = q * b + r`, returns `r`.
    pub fn prem(
        &self,
        b: &MultiPoly,
        var: VarIdx,
        intr: &dyn Interrupt,
    ) -> Result<MultiPoly, PolyError> {
        if b.is_zero() {
            return Err(PolyError::Inexact);
        }
        let mut r = self.clone();
        let mut rdeg = r.degree(var);
        let bdeg = b.degree(var);
        let (blcoeff, eb) = if bdeg <= rdeg {
            let lc = b.lcoeff(var);
            let rest = if bdeg == 0 {
                MultiPoly::zero(b.vars.clone())
            } else {
                b.sub(&lc.mul_term(&BigRational::one(), &var_mono(b, var, bdeg)))?
            };
            (lc, rest)
        } else {
            (MultiPoly::one(b.vars.clone()), b.clone())
        };

        let delta = (rdeg as i64) - (bdeg as i64) + 1;
        let mut steps = 0i64;
        while rdeg >= bdeg && !r.is_zero() {
            intr.check()?;
            let rlcoeff = r.coeff(var, rdeg);
            let shift = var_mono(&r, var, rdeg - bdeg);
            let term = eb.mul_unbounded(&rlcoeff)?.mul_term(&BigRational::one(), &shift);
            let head = rlcoeff.mul_term(&BigRational::one(), &var_mono(&r, var, rdeg));
            r = r.sub(&head)?;
            r = blcoeff.mul_unbounded(&r)?.sub(&term)?;
            rdeg = r.degree(var);
            steps += 1;
        }

        let mut factor = MultiPoly::one(r.vars.clone());
        for _ in 0..(delta - steps).max(0) {
            factor = factor.mul_unbounded(&blcoeff)?;
        }
        factor.mul_unbounded(&r)
    }

    /// Long division in `var`: `self = q * b + r` with `deg_var r < deg_var b`.
    ///
    /// Coefficients live in Q[other vars]; fails with `Inexact` when a
    /// leading coefficient of the running remainder is not divisible by the
    /// leading coefficient of `b`.
    pub fn div_rem(
        &self,
        b: &MultiPoly,
        var: VarIdx,
        intr: &dyn Interrupt,
    ) -> Result<(MultiPoly, MultiPoly), PolyError> {
        if b.is_zero() {
            return Err(PolyError::Inexact);
        }
        let bdeg = b.degree(var);
        let blc = b.lcoeff(var);
        let mut q = MultiPoly::zero(self.vars.clone());
        let mut r = self.clone();
        while !r.is_zero() && r.degree(var) >= bdeg {
            intr.check()?;
            let rdeg = r.degree(var);
            let rlc = r.coeff(var, rdeg);
            let c = rlc.div_exact(&blc, intr)?.ok_or(PolyError::Inexact)?;
            let term = c.mul_term(&BigRational::one(), &var_mono(&r, var, rdeg - bdeg));
            q = q.add(&term)?;
            r = r.sub(&term.mul_unbounded(b)?)?;
        }
        Ok((q, r))
    }

    /// Exact division over Q. `Ok(None)` when `b` does not divide `self`.
    pub fn div_exact(
        &self,
        b: &MultiPoly,
        intr: &dyn Interrupt,
    ) -> Result<Option<MultiPoly>, PolyError> {
        if b.is_zero() {
            return Ok(None);
        }
        if self.is_zero() {
            return Ok(Some(MultiPoly::zero(self.vars.clone())));
        }
        if let Some(c) = b.constant_value() {
            return Ok(Some(self.div_scalar(&c)));
        }
        let n = self.vars.len();
        // Every partial quotient term is a term of the final quotient, so its
        // degrees are bounded by deg(self) - deg(b) in each variable.
        let bounds: Vec<i64> = (0..n)
            .map(|v| self.degree(v) as i64 - b.degree(v) as i64)
            .collect();
        if bounds.iter().any(|&d| d < 0) {
            return Ok(None);
        }

        let (bc, bm) = match b.leading_term() {
            Some(t) => t.clone(),
            None => return Ok(None),
        };
        let mut q_terms = Vec::new();
        let mut r = self.clone();
        while let Some((rc, rm)) = r.leading_term().cloned() {
            intr.check()?;
            let Some(tm) = mono_div(&rm, &bm) else {
                return Ok(None);
            };
            if tm.iter().zip(&bounds).any(|(&e, &d)| e as i64 > d) {
                return Ok(None);
            }
            let tc = rc / &bc;
            r = r.sub(&b.mul_term(&tc, &tm))?;
            q_terms.push((tc, tm));
        }
        Ok(Some(MultiPoly::from_terms(self.vars.clone(), q_terms)))
    }

    /// Exact division with an integral quotient (`divide_in_z`).
    pub fn divide_in_z(
        &self,
        b: &MultiPoly,
        intr: &dyn Interrupt,
    ) -> Result<Option<MultiPoly>, PolyError> {
        Ok(self.div_exact(b, intr)?.filter(MultiPoly::is_integral))
    }

    /// Divide every term by the monomial `m` (exact on monomials only).
    pub fn div_monomial(&self, m: &Monomial) -> Option<MultiPoly> {
        let mut terms = Vec::with_capacity(self.terms.len());
        for (c, tm) in &self.terms {
            terms.push((c.clone(), mono_div(tm, m)?));
        }
        Some(MultiPoly {
            vars: self.vars.clone(),
            terms,
        })
    }
}

/// `a / b` on exponent vectors, if `b` divides `a`.
pub fn mono_div(a: &[u32], b: &[u32]) -> Option<Monomial> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| x.checked_sub(y))
        .collect()
}

/// `var^k` as an exponent vector shaped like `p`.
fn var_mono(p: &MultiPoly, var: VarIdx, k: u32) -> Monomial {
    let mut m = vec![0; p.vars.len()];
    m[var] = k;
    m
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

    #[test]
    fn exact_division_of_difference_of_squares() {
        let v = xy();
        let a = poly(&v, &[(1, [2, 0]), (-1, [0, 2])]);
        let b = poly(&v, &[(1, [1, 0]), (-1, [0, 1])]);
        let quo = a.div_exact(&b, &NoInterrupt).unwrap().unwrap();
        assert_eq!(quo, poly(&v, &[(1, [1, 0]), (1, [0, 1])]));
    }

    #[test]
    fn non_divisible_returns_none() {
        let v = xy();
        let a = poly(&v, &[(1, [2, 0]), (1, [0, 2])]);
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 1])]);
        assert_eq!(a.div_exact(&b, &NoInterrupt).unwrap(), None);
    }

    #[test]
    fn divide_in_z_rejects_fractional_quotient() {
        let v = xy();
        let a = poly(&v, &[(1, [1, 0]), (1, [0, 0])]);
        let b = poly(&v, &[(2, [1, 0]), (2, [0, 0])]);
        assert!(a.div_exact(&b, &NoInterrupt).unwrap().is_some());
        assert_eq!(a.divide_in_z(&b, &NoInterrupt).unwrap(), None);
    }

    #[test]
    fn pseudo_remainder_identity() {
        let v = xy();
        let budget = PolyBudget::default();
        // a = x^3 + y x + 1, b = y x^2 + 1, var x
        let a = poly(&v, &[(1, [3, 0]), (1, [1, 1]), (1, [0, 0])]);
        let b = poly(&v, &[(1, [2, 1]), (1, [0, 0])]);
        let r = a.prem(&b, 0, &NoInterrupt).unwrap();
        assert!(r.degree(0) < b.degree(0));
        // lc(b)^2 * a - r must be divisible by b
        let lc2 = b.lcoeff(0).pow(2, &budget).unwrap();
        let lhs = lc2.mul(&a, &budget).unwrap().sub(&r).unwrap();
        assert!(lhs.div_exact(&b, &NoInterrupt).unwrap().is_some());
    }

    #[test]
    fn long_division_with_remainder() {
        let v = xy();
        // (x^2 + 3x + 5) / (x + 1) = x + 2 rem 3
        let a = poly(&v, &[(1, [2, 0]), (3, [1, 0]), (5, [0, 0])]);
        let b = poly(&v, &[(1, [1, 0]), (1, [0, 0])]);
        let (quo, rem) = a.div_rem(&b, 0, &NoInterrupt).unwrap();
        assert_eq!(quo, poly(&v, &[(1, [1, 0]), (2, [0, 0])]));
        assert_eq!(rem, poly(&v, &[(3, [0, 0])]));
    }

    #[test]
    fn long_division_fails_on_non_dividing_lcoeff() {
        let v = xy();
        // x^2 / (y x + 1): y does not divide 1
        let a = poly(&v, &[(1, [2, 0])]);
        let b = poly(&v, &[(1, [1, 1]), (1, [0, 0])]);
        assert_eq!(a.div_rem(&b, 0, &NoInterrupt), Err(PolyError::Inexact));
    }

    #[test]
    fn interrupt_stops_division() {
        let v = xy();
        let a = poly(&v, &[(1, [2, 0]), (-1, [0, 2])]);
        let b = poly(&v, &[(1, [1, 0]), (-1, [0, 1])]);
        let always = || true;
        assert_eq!(a.div_exact(&b, &always), Err(PolyError::Interrupted));
    }
}
