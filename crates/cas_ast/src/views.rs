//! # Expression Views
//!
//! Read-only decompositions of product and sum nodes for pattern matching.
//! A product `3·x²·(x+1)⁻¹·y^(1/2)` is seen as a rational coefficient plus
//! factors with signed integer exponents; factors with non-integer powers are
//! kept whole with exponent 1.
//!
//! Views never build canonical nodes themselves: callers in the engine
//! rebuild through canonical arithmetic.

use crate::{Context, Expr, ExprId};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};

/// A factor `base^exp` with a signed integer exponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Factor {
    pub base: ExprId,
    pub exp: i64,
}

/// Multiplicative parts of an expression.
#[derive(Debug, Clone)]
pub struct MulParts {
    pub coeff: BigRational,
    /// Non-numeric factors in the order they appear
    pub factors: Vec<Factor>,
}

/// Numerator / denominator split of a product, both with positive exponents.
#[derive(Debug, Clone)]
pub struct FractionParts {
    pub coeff: BigRational,
    pub num: Vec<Factor>,
    pub den: Vec<Factor>,
}

/// Extract an integer exponent if `id` is an integer `Number` fitting i64.
pub fn int_exponent(ctx: &Context, id: ExprId) -> Option<i64> {
    match ctx.get(id) {
        Expr::Number(n) if n.is_integer() => n.to_integer().to_i64(),
        _ => None,
    }
}

impl MulParts {
    /// Collect factors from a (possibly single-factor) product.
    ///
    /// Does not look inside nested `Mul`s: canonical products are flat.
    pub fn from(ctx: &Context, id: ExprId) -> Self {
        let mut out = MulParts {
            coeff: BigRational::one(),
            factors: Vec::new(),
        };
        match ctx.get(id) {
            Expr::Mul(items) => {
                for &f in items {
                    out.push(ctx, f);
                }
            }
            _ => out.push(ctx, id),
        }
        out
    }

    fn push(&mut self, ctx: &Context, id: ExprId) {
        match ctx.get(id) {
            Expr::Number(n) => self.coeff *= n,
            Expr::Pow(base, exp) => match int_exponent(ctx, *exp) {
                Some(k) => self.factors.push(Factor { base: *base, exp: k }),
                None => self.factors.push(Factor { base: id, exp: 1 }),
            },
            _ => self.factors.push(Factor { base: id, exp: 1 }),
        }
    }

    pub fn has_denominator(&self) -> bool {
        self.factors.iter().any(|f| f.exp < 0) || !self.coeff.denom().is_one()
    }

    /// Split into numerator (exp > 0) and denominator (exp made positive).
    pub fn split_fraction(self) -> FractionParts {
        let mut num = Vec::new();
        let mut den = Vec::new();
        for f in self.factors {
            if f.exp > 0 {
                num.push(f);
            } else if f.exp < 0 {
                den.push(Factor {
                    base: f.base,
                    exp: -f.exp,
                });
            }
        }
        FractionParts {
            coeff: self.coeff,
            num,
            den,
        }
    }
}

impl FractionParts {
    pub fn from(ctx: &Context, id: ExprId) -> Self {
        MulParts::from(ctx, id).split_fraction()
    }

    pub fn is_fraction(&self) -> bool {
        !self.den.is_empty() || !self.coeff.denom().is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.coeff.is_negative()
    }
}

/// Terms of a sum (a single non-sum expression is one term).
pub fn add_terms(ctx: &Context, id: ExprId) -> Vec<ExprId> {
    match ctx.get(id) {
        Expr::Add(items) => items.clone(),
        _ => vec![id],
    }
}

/// Factors of a product (a single non-product expression is one factor).
pub fn mul_factors(ctx: &Context, id: ExprId) -> Vec<ExprId> {
    match ctx.get(id) {
        Expr::Mul(items) => items.clone(),
        _ => vec![id],
    }
}
