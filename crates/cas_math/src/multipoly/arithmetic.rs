//! Ring operations on `MultiPoly`.

use num_rational::BigRational;
use num_traits::{One, Zero};
use std::collections::BTreeMap;

use super::{Monomial, MultiPoly, PolyBudget, PolyError, Term};

impl MultiPoly {
    fn same_vars(&self, other: &MultiPoly) -> Result<(), PolyError> {
        if self.vars == other.vars {
            Ok(())
        } else {
            Err(PolyError::NotPolynomial)
        }
    }

    pub fn add(&self, other: &MultiPoly) -> Result<MultiPoly, PolyError> {
        self.same_vars(other)?;
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().cloned());
        Ok(MultiPoly::from_terms(self.vars.clone(), terms))
    }

    pub fn sub(&self, other: &MultiPoly) -> Result<MultiPoly, PolyError> {
        self.same_vars(other)?;
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().map(|(c, m)| (-c, m.clone())));
        Ok(MultiPoly::from_terms(self.vars.clone(), terms))
    }

    pub fn neg(&self) -> MultiPoly {
        MultiPoly {
            vars: self.vars.clone(),
            terms: self.terms.iter().map(|(c, m)| (-c, m.clone())).collect(),
        }
    }

    pub fn mul_scalar(&self, k: &BigRational) -> MultiPoly {
        if k.is_zero() {
            return MultiPoly::zero(self.vars.clone());
        }
        MultiPoly {
            vars: self.vars.clone(),
            terms: self.terms.iter().map(|(c, m)| (c * k, m.clone())).collect(),
        }
    }

    /// Multiply by a single term `c * mono`.
    pub fn mul_term(&self, c: &BigRational, mono: &Monomial) -> MultiPoly {
        if c.is_zero() {
            return MultiPoly::zero(self.vars.clone());
        }
        // Adding a fixed exponent vector preserves lex order.
        MultiPoly {
            vars: self.vars.clone(),
            terms: self
                .terms
                .iter()
                .map(|(tc, tm)| (tc * c, add_mono(tm, mono)))
                .collect(),
        }
    }

    pub fn mul(&self, other: &MultiPoly, budget: &PolyBudget) -> Result<MultiPoly, PolyError> {
        self.same_vars(other)?;
        if self.is_zero() || other.is_zero() {
            return Ok(MultiPoly::zero(self.vars.clone()));
        }
        let mut acc: BTreeMap<Monomial, BigRational> = BTreeMap::new();
        for (ca, ma) in &self.terms {
            for (cb, mb) in &other.terms {
                let entry = acc.entry(add_mono(ma, mb)).or_insert_with(BigRational::zero);
                *entry += ca * cb;
            }
            if acc.len() > budget.max_terms {
                return Err(PolyError::Exhausted);
            }
        }
        let terms: Vec<Term> = acc
            .into_iter()
            .rev()
            .filter(|(_, c)| !c.is_zero())
            .map(|(m, c)| (c, m))
            .collect();
        Ok(MultiPoly {
            vars: self.vars.clone(),
            terms,
        })
    }

    /// Multiplication without a term budget (results are bounded by the
    /// operands, as in cofactor products).
    pub fn mul_unbounded(&self, other: &MultiPoly) -> Result<MultiPoly, PolyError> {
        let budget = PolyBudget {
            max_terms: usize::MAX,
            max_pow_exp: u32::MAX,
        };
        self.mul(other, &budget)
    }

    pub fn pow(&self, exp: u32, budget: &PolyBudget) -> Result<MultiPoly, PolyError> {
        if exp == 0 {
            return Ok(MultiPoly::one(self.vars.clone()));
        }
        if exp == 1 {
            return Ok(self.clone());
        }
        if self.terms.len() > 1 && exp > budget.max_pow_exp {
            return Err(PolyError::ExponentTooLarge(exp as u64));
        }
        if self.terms.len() == 1 {
            let (c, m) = &self.terms[0];
            let c = num_traits::pow(c.clone(), exp as usize);
            let m = m.iter().map(|&e| e * exp).collect();
            return Ok(MultiPoly {
                vars: self.vars.clone(),
                terms: vec![(c, m)],
            });
        }

        // Binary exponentiation
        let mut result = MultiPoly::one(self.vars.clone());
        let mut base = self.clone();
        let mut e = exp;
        while e > 0 {
            if e & 1 == 1 {
                result = result.mul(&base, budget)?;
            }
            e >>= 1;
            if e > 0 {
                base = base.mul(&base, budget)?;
            }
        }
        Ok(result)
    }

    /// `self` divided by a nonzero rational.
    pub fn div_scalar(&self, k: &BigRational) -> MultiPoly {
        if k.is_one() {
            return self.clone();
        }
        self.mul_scalar(&k.recip())
    }
}

#[inline]
pub(crate) fn add_mono(a: &[u32], b: &[u32]) -> Monomial {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_ast::{Context, ExprId};

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(n.into())
    }

    fn xy() -> Vec<ExprId> {
        let mut ctx = Context::new();
        vec![ctx.var("x"), ctx.var("y")]
    }

    #[test]
    fn product_of_binomials() {
        let v = xy();
        let budget = PolyBudget::default();
        // (x + y)(x - y) = x^2 - y^2
        let a = MultiPoly::from_terms(v.clone(), vec![(q(1), vec![1, 0]), (q(1), vec![0, 1])]);
        let b = MultiPoly::from_terms(v, vec![(q(1), vec![1, 0]), (q(-1), vec![0, 1])]);
        let p = a.mul(&b, &budget).unwrap();
        assert_eq!(p.terms, vec![(q(1), vec![2, 0]), (q(-1), vec![0, 2])]);
    }

    #[test]
    fn pow_matches_repeated_mul() {
        let v = xy();
        let budget = PolyBudget::default();
        let a = MultiPoly::from_terms(v, vec![(q(2), vec![1, 0]), (q(-3), vec![0, 1]), (q(1), vec![0, 0])]);
        let cube = a.pow(3, &budget).unwrap();
        let manual = a.mul(&a, &budget).unwrap().mul(&a, &budget).unwrap();
        assert_eq!(cube, manual);
    }

    #[test]
    fn pow_over_budget_is_rejected() {
        let v = xy();
        let budget = PolyBudget {
            max_terms: 1000,
            max_pow_exp: 4,
        };
        let a = MultiPoly::from_terms(v, vec![(q(1), vec![1, 0]), (q(1), vec![0, 0])]);
        assert_eq!(a.pow(5, &budget), Err(PolyError::ExponentTooLarge(5)));
    }

    #[test]
    fn mismatched_vars_fail() {
        let mut ctx = Context::new();
        let a = MultiPoly::var(0, vec![ctx.var("x")]);
        let b = MultiPoly::var(0, vec![ctx.var("y")]);
        assert!(a.add(&b).is_err());
    }
}
