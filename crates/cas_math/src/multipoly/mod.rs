//! Exact sparse multivariate polynomials over Q.
//!
//! A polynomial is a list of `(coefficient, monomial)` terms over an ordered
//! list of atoms (`vars`). Terms are kept strictly decreasing in
//! lexicographic monomial order with `vars[0]` most significant, so
//! `terms[0]` is the leading term and `vars[0]` acts as the main variable.
//!
//! Every operation between two polynomials requires identical `vars`.

use cas_ast::ExprId;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::numeric::content_gcd;

pub mod arithmetic;
pub mod conversion;
pub mod division;

pub use conversion::{collect_poly_vars, multipoly_from_expr, multipoly_to_expr};

/// Exponent vector, one entry per variable.
pub type Monomial = Vec<u32>;
/// Index into `MultiPoly::vars`.
pub type VarIdx = usize;
pub type Term = (BigRational, Monomial);

pub use crate::error::PolyError;

/// Limits on conversion and expansion.
#[derive(Debug, Clone)]
pub struct PolyBudget {
    /// Max terms in any intermediate polynomial
    pub max_terms: usize,
    /// Max exponent accepted for `(sum)^n`
    pub max_pow_exp: u32,
}

impl Default for PolyBudget {
    fn default() -> Self {
        Self {
            max_terms: 100_000,
            max_pow_exp: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPoly {
    pub vars: Vec<ExprId>,
    pub terms: Vec<Term>,
}

impl MultiPoly {
    pub fn zero(vars: Vec<ExprId>) -> Self {
        MultiPoly {
            vars,
            terms: Vec::new(),
        }
    }

    pub fn one(vars: Vec<ExprId>) -> Self {
        Self::constant(BigRational::one(), vars)
    }

    pub fn constant(c: BigRational, vars: Vec<ExprId>) -> Self {
        let n = vars.len();
        let terms = if c.is_zero() {
            Vec::new()
        } else {
            vec![(c, vec![0; n])]
        };
        MultiPoly { vars, terms }
    }

    /// The polynomial `vars[idx]`.
    pub fn var(idx: VarIdx, vars: Vec<ExprId>) -> Self {
        let mut mono = vec![0; vars.len()];
        mono[idx] = 1;
        MultiPoly {
            vars,
            terms: vec![(BigRational::one(), mono)],
        }
    }

    /// Build from arbitrary terms: combine like monomials, drop zeros, sort.
    pub fn from_terms(vars: Vec<ExprId>, mut terms: Vec<Term>) -> Self {
        terms.sort_by(|a, b| b.1.cmp(&a.1));
        let mut out: Vec<Term> = Vec::with_capacity(terms.len());
        for (c, m) in terms {
            match out.last_mut() {
                Some((acc, last)) if *last == m => *acc += c,
                _ => out.push((c, m)),
            }
        }
        out.retain(|(c, _)| !c.is_zero());
        MultiPoly { vars, terms: out }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.constant_value().is_some_and(|c| c.is_one())
    }

    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
            || (self.terms.len() == 1 && self.terms[0].1.iter().all(|&e| e == 0))
    }

    /// Value of a constant polynomial (0 for the zero polynomial).
    pub fn constant_value(&self) -> Option<BigRational> {
        if self.terms.is_empty() {
            return Some(BigRational::zero());
        }
        if self.is_constant() {
            return Some(self.terms[0].0.clone());
        }
        None
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    pub fn total_degree(&self) -> u32 {
        self.terms
            .iter()
            .map(|(_, m)| m.iter().sum::<u32>())
            .max()
            .unwrap_or(0)
    }

    /// Degree in `var` (0 for the zero polynomial).
    pub fn degree(&self, var: VarIdx) -> u32 {
        self.terms.iter().map(|(_, m)| m[var]).max().unwrap_or(0)
    }

    /// Lowest exponent of `var` over all terms (0 for the zero polynomial).
    pub fn ldegree(&self, var: VarIdx) -> u32 {
        self.terms.iter().map(|(_, m)| m[var]).min().unwrap_or(0)
    }

    /// First variable (by index, starting at `from`) with nonzero degree.
    pub fn first_var_from(&self, from: VarIdx) -> Option<VarIdx> {
        (from..self.vars.len()).find(|&v| self.degree(v) > 0)
    }

    /// Coefficient of the lex-leading term.
    pub fn leading_coeff(&self) -> BigRational {
        self.terms
            .first()
            .map(|(c, _)| c.clone())
            .unwrap_or_else(BigRational::zero)
    }

    /// Sign of the lex-leading coefficient (the unit), `1` for zero.
    pub fn unit(&self) -> BigRational {
        if self.leading_coeff().is_negative() {
            -BigRational::one()
        } else {
            BigRational::one()
        }
    }

    /// Coefficient of `var^k`, as a polynomial over the same vars with the
    /// `var` exponent removed.
    pub fn coeff(&self, var: VarIdx, k: u32) -> MultiPoly {
        let terms = self
            .terms
            .iter()
            .filter(|(_, m)| m[var] == k)
            .map(|(c, m)| {
                let mut m = m.clone();
                m[var] = 0;
                (c.clone(), m)
            })
            .collect();
        MultiPoly::from_terms(self.vars.clone(), terms)
    }

    /// Leading coefficient with respect to `var`.
    pub fn lcoeff(&self, var: VarIdx) -> MultiPoly {
        self.coeff(var, self.degree(var))
    }

    /// All coefficients with respect to `var`, highest degree first.
    pub fn coeffs(&self, var: VarIdx) -> Vec<MultiPoly> {
        let d = self.degree(var);
        (0..=d)
            .rev()
            .map(|k| self.coeff(var, k))
            .filter(|c| !c.is_zero())
            .collect()
    }

    pub fn is_integral(&self) -> bool {
        self.terms.iter().all(|(c, _)| c.is_integer())
    }

    /// Largest absolute value of a coefficient numerator (integer polynomials).
    pub fn max_coeff(&self) -> BigInt {
        self.terms
            .iter()
            .map(|(c, _)| c.numer().abs())
            .max()
            .unwrap_or_else(BigInt::zero)
    }

    /// `gcd(numerators) / lcm(denominators)`, nonnegative.
    pub fn integer_content(&self) -> BigRational {
        self.terms
            .iter()
            .fold(BigRational::zero(), |acc, (c, _)| content_gcd(&acc, c))
    }

    /// Multiply every coefficient by the lcm of the denominators.
    /// Returns the integral polynomial and the multiplier.
    pub fn clear_denominators(&self) -> (MultiPoly, BigInt) {
        use num_integer::Integer;
        let l = self
            .terms
            .iter()
            .fold(BigInt::one(), |acc, (c, _)| acc.lcm(c.denom()));
        let m = BigRational::from_integer(l.clone());
        (self.mul_scalar(&m), l)
    }

    /// Coefficient-wise symmetric remainder (integer polynomials).
    pub fn smod(&self, m: &BigInt) -> MultiPoly {
        let terms = self
            .terms
            .iter()
            .map(|(c, mono)| {
                (
                    BigRational::from_integer(crate::numeric::smod(&c.to_integer(), m)),
                    mono.clone(),
                )
            })
            .collect();
        MultiPoly::from_terms(self.vars.clone(), terms)
    }

    /// Substitute `var = value`, keeping the variable list.
    pub fn eval_var(&self, var: VarIdx, value: &BigRational) -> MultiPoly {
        let d = self.degree(var) as usize;
        let mut powers = Vec::with_capacity(d + 1);
        powers.push(BigRational::one());
        for i in 1..=d {
            let next = &powers[i - 1] * value;
            powers.push(next);
        }
        let terms = self
            .terms
            .iter()
            .map(|(c, m)| {
                let mut m = m.clone();
                let k = m[var] as usize;
                m[var] = 0;
                (c * &powers[k], m)
            })
            .collect();
        MultiPoly::from_terms(self.vars.clone(), terms)
    }

    /// Divide by `var^k` (requires `k <= ldegree(var)`).
    pub fn shift_down(&self, var: VarIdx, k: u32) -> MultiPoly {
        let terms = self
            .terms
            .iter()
            .map(|(c, m)| {
                let mut m = m.clone();
                m[var] = m[var].saturating_sub(k);
                (c.clone(), m)
            })
            .collect();
        MultiPoly::from_terms(self.vars.clone(), terms)
    }

    /// Leading term as a standalone polynomial.
    pub fn leading_term(&self) -> Option<&Term> {
        self.terms.first()
    }
}
