// =============================================================================
// Numerical Helpers over BigInt / BigRational
// =============================================================================

use cas_ast::{Context, Expr, ExprId};
use num_bigint::{BigInt, Sign};
use num_integer::{Integer, Roots};
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Get a reference to the Number without cloning.
#[inline]
pub fn as_number(ctx: &Context, id: ExprId) -> Option<&BigRational> {
    match ctx.get(id) {
        Expr::Number(n) => Some(n),
        _ => None,
    }
}

/// Try to extract an i64 value from a Number expression (without cloning).
/// Returns None if not a Number, not an integer, or doesn't fit in i64.
#[inline]
pub fn as_i64(ctx: &Context, id: ExprId) -> Option<i64> {
    match ctx.get(id) {
        Expr::Number(n) if n.is_integer() => n.to_integer().to_i64(),
        _ => None,
    }
}

/// GCD for rational numbers when both are integers; otherwise returns `1`.
pub fn gcd_rational(a: BigRational, b: BigRational) -> BigRational {
    if a.is_integer() && b.is_integer() {
        let g = a.to_integer().gcd(&b.to_integer());
        return BigRational::from_integer(g);
    }
    BigRational::one()
}

/// Content-style gcd of two rationals: `gcd(numerators) / lcm(denominators)`.
///
/// Always nonnegative; `content_gcd(0, q) == |q|`.
pub fn content_gcd(a: &BigRational, b: &BigRational) -> BigRational {
    if a.is_zero() {
        return b.abs();
    }
    if b.is_zero() {
        return a.abs();
    }
    let num = a.numer().gcd(b.numer());
    let den = a.denom().lcm(b.denom());
    BigRational::new(num, den)
}

/// Number of bits of `|n|` (0 for zero).
#[inline]
pub fn bit_length(n: &BigInt) -> u64 {
    n.bits()
}

/// Symmetric remainder of `a` modulo `m > 0`, in `(-m/2, m/2]`.
pub fn smod(a: &BigInt, m: &BigInt) -> BigInt {
    let r = a.mod_floor(m);
    let half: BigInt = m >> 1usize;
    if r > half {
        r - m
    } else {
        r
    }
}

/// Exact `n`-th root of a rational, if one exists.
///
/// Negative radicands only have a real root for odd `n`.
pub fn exact_root(q: &BigRational, n: u32) -> Option<BigRational> {
    if n == 0 {
        return None;
    }
    if n == 1 || q.is_zero() || q.is_one() {
        return Some(q.clone());
    }
    if q.is_negative() {
        if n % 2 == 0 {
            return None;
        }
        return exact_root(&-q, n).map(|r| -r);
    }
    let num = exact_int_root(q.numer(), n)?;
    let den = exact_int_root(q.denom(), n)?;
    Some(BigRational::new(num, den))
}

fn exact_int_root(n: &BigInt, k: u32) -> Option<BigInt> {
    let r = n.nth_root(k);
    if num_traits::pow(r.clone(), k as usize) == *n {
        Some(r)
    } else {
        None
    }
}

/// Largest `m` such that `q = r^m` for a rational `r > 0` (with `r` returned).
///
/// `q` must be positive and not 1.
fn perfect_power(q: &BigRational) -> (BigRational, u32) {
    let max_m = q.numer().bits().max(q.denom().bits()).min(4096) as u32;
    for m in (2..=max_m).rev() {
        if let Some(r) = exact_root(q, m) {
            return (r, m);
        }
    }
    (q.clone(), 1)
}

/// Exact rational logarithm: `k` with `base^k == value`, if rational.
///
/// Both arguments must be positive and `base != 1`.
pub fn exact_log(base: &BigRational, value: &BigRational) -> Option<BigRational> {
    if !base.is_positive() || !value.is_positive() || base.is_one() {
        return None;
    }
    if value.is_one() {
        return Some(BigRational::zero());
    }
    let (rb, mb) = perfect_power(base);
    let (rv, mv) = perfect_power(value);
    let k = BigRational::new(BigInt::from(mv), BigInt::from(mb));
    if rb == rv {
        Some(k)
    } else if rb == rv.recip() {
        Some(-k)
    } else {
        None
    }
}

/// Raise a rational to a (possibly negative) integer power.
pub fn pow_rational(q: &BigRational, k: i64) -> Option<BigRational> {
    if k < 0 && q.is_zero() {
        return None;
    }
    let e = k.unsigned_abs().to_i32()?;
    let p = num_traits::pow(q.clone(), e as usize);
    Some(if k < 0 { p.recip() } else { p })
}

/// Exact value of `q^e` for rational `e = p/r`, using real roots.
///
/// Returns `None` when the root is irrational or not real.
pub fn pow_rational_exact(q: &BigRational, e: &BigRational) -> Option<BigRational> {
    let r = e.denom().to_u32()?;
    let root = exact_root(q, r)?;
    pow_rational(&root, e.numer().to_i64()?)
}

pub fn rational_to_f64(q: &BigRational) -> f64 {
    q.to_f64().unwrap_or_else(|| {
        // Huge magnitudes: scale through bit lengths
        let shift = q.numer().bits() as i64 - q.denom().bits() as i64;
        if q.numer().sign() == Sign::Minus {
            -(2f64.powi(shift as i32))
        } else {
            2f64.powi(shift as i32)
        }
    })
}

/// Integer square root floor, for nonnegative `n`.
#[inline]
pub fn isqrt(n: &BigInt) -> BigInt {
    if n.is_negative() {
        BigInt::zero()
    } else {
        n.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn gcd_rational_integers() {
        let a = BigRational::from_integer(12.into());
        let b = BigRational::from_integer(18.into());
        let g = gcd_rational(a, b);
        assert_eq!(g, BigRational::from_integer(6.into()));
    }

    #[test]
    fn gcd_rational_non_integer_fallbacks_to_one() {
        let a = BigRational::new(3.into(), 2.into());
        let b = BigRational::from_integer(6.into());
        let g = gcd_rational(a, b);
        assert_eq!(g, BigRational::from_integer(1.into()));
    }

    #[test]
    fn content_gcd_of_fractions() {
        assert_eq!(content_gcd(&q(4, 3), &q(6, 5)), q(2, 15));
        assert_eq!(content_gcd(&q(0, 1), &q(-7, 2)), q(7, 2));
    }

    #[test]
    fn smod_is_symmetric() {
        let m = BigInt::from(10);
        assert_eq!(smod(&BigInt::from(7), &m), BigInt::from(-3));
        assert_eq!(smod(&BigInt::from(5), &m), BigInt::from(5));
        assert_eq!(smod(&BigInt::from(-7), &m), BigInt::from(3));
    }

    #[test]
    fn exact_roots() {
        assert_eq!(exact_root(&q(8, 27), 3), Some(q(2, 3)));
        assert_eq!(exact_root(&q(-8, 1), 3), Some(q(-2, 1)));
        assert_eq!(exact_root(&q(-4, 1), 2), None);
        assert_eq!(exact_root(&q(2, 1), 2), None);
    }

    #[test]
    fn exact_logs() {
        assert_eq!(exact_log(&q(2, 1), &q(8, 1)), Some(q(3, 1)));
        assert_eq!(exact_log(&q(4, 1), &q(2, 1)), Some(q(1, 2)));
        assert_eq!(exact_log(&q(8, 1), &q(4, 1)), Some(q(2, 3)));
        assert_eq!(exact_log(&q(1, 2), &q(8, 1)), Some(q(-3, 1)));
        assert_eq!(exact_log(&q(2, 1), &q(3, 1)), None);
    }

    #[test]
    fn rational_powers() {
        assert_eq!(pow_rational_exact(&q(4, 9), &q(3, 2)), Some(q(8, 27)));
        assert_eq!(pow_rational_exact(&q(-8, 1), &q(-1, 3)), Some(q(-1, 2)));
        assert_eq!(pow_rational(&q(0, 1), -1), None);
    }
}
