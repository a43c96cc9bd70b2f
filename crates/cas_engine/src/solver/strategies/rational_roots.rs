//! Rational Root Theorem over exact coefficients.
//!
//! Pipeline:
//! 1. Normalize to integer coefficients (scale by LCM of denominators)
//! 2. Enumerate candidate rational roots ±p/q
//! 3. Verify each candidate via exact Horner evaluation
//! 4. Deflate by a confirmed root (synthetic division)

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Maximum number of candidate rational roots to try before bailing.
/// Prevents combinatorial blowup on polynomials with large leading/constant coefficients.
const MAX_CANDIDATES: usize = 200;

/// Integers above this are not factored by trial division.
const MAX_TRIAL_VALUE: u64 = 1 << 40;

/// Value of `c[0] + c[1]*r + ... + c[n]*r^n`.
pub fn horner(coeffs: &[BigRational], r: &BigRational) -> BigRational {
    coeffs
        .iter()
        .rev()
        .fold(BigRational::zero(), |acc, c| acc * r + c)
}

/// Quotient of the polynomial by `x - r` (the remainder is dropped).
pub fn deflate(coeffs: &[BigRational], r: &BigRational) -> Vec<BigRational> {
    let n = coeffs.len().saturating_sub(1);
    let mut q = vec![BigRational::zero(); n];
    let mut carry = BigRational::zero();
    for i in (1..=n).rev() {
        carry = &coeffs[i] + &carry * r;
        q[i - 1] = carry.clone();
    }
    q
}

/// Coefficients scaled to coprime integers.
fn integer_coeffs(coeffs: &[BigRational]) -> Vec<BigInt> {
    let l = coeffs
        .iter()
        .fold(BigInt::one(), |acc, c| acc.lcm(c.denom()));
    coeffs
        .iter()
        .map(|c| (c * BigRational::from_integer(l.clone())).to_integer())
        .collect()
}

/// Positive divisors of `n`, `None` when `n` is too large to factor.
fn divisors(n: &BigInt) -> Option<Vec<u64>> {
    let n = n.abs().to_u64().filter(|&n| n > 0 && n <= MAX_TRIAL_VALUE)?;
    let mut small = Vec::new();
    let mut large = Vec::new();
    let mut d = 1u64;
    while d * d <= n {
        if n % d == 0 {
            small.push(d);
            if d != n / d {
                large.push(n / d);
            }
        }
        d += 1;
    }
    small.extend(large.into_iter().rev());
    Some(small)
}

/// A rational root of the polynomial, smallest magnitude first, positive
/// before negative.
pub fn find_rational_root(coeffs: &[BigRational]) -> Option<BigRational> {
    if coeffs.len() < 2 || coeffs.last().is_some_and(|c| c.is_zero()) {
        return None;
    }
    if coeffs[0].is_zero() {
        return Some(BigRational::zero());
    }
    let ints = integer_coeffs(coeffs);
    let ps = divisors(&ints[0])?;
    let qs = divisors(ints.last()?)?;

    let mut candidates: Vec<BigRational> = Vec::new();
    for p in &ps {
        for q in &qs {
            let r = BigRational::new(BigInt::from(*p), BigInt::from(*q));
            if !candidates.contains(&r) {
                candidates.push(r);
                if candidates.len() > MAX_CANDIDATES {
                    return None;
                }
            }
        }
    }
    candidates.sort();
    candidates
        .into_iter()
        .flat_map(|r| [r.clone(), -r])
        .find(|r| horner(coeffs, r).is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rats(v: &[i64]) -> Vec<BigRational> {
        v.iter().map(|&k| BigRational::from_integer(k.into())).collect()
    }

    #[test]
    fn finds_roots_of_a_cubic() {
        // (x - 1)(x + 2)(2x - 3) = 2x^3 - x^2 - 7x + 6
        let c = rats(&[6, -7, -1, 2]);
        let r = find_rational_root(&c).unwrap();
        assert_eq!(r, BigRational::one());
        let q = deflate(&c, &r);
        assert_eq!(q, rats(&[-6, 1, 2]));
        let r2 = find_rational_root(&q).unwrap();
        assert_eq!(r2, BigRational::new(3.into(), 2.into()));
    }

    #[test]
    fn no_rational_root() {
        // x^3 - 2
        assert_eq!(find_rational_root(&rats(&[-2, 0, 0, 1])), None);
    }

    #[test]
    fn zero_root_first() {
        assert_eq!(
            find_rational_root(&rats(&[0, 4, 1])),
            Some(BigRational::zero())
        );
    }

    #[test]
    fn rational_coefficients_are_scaled() {
        // x^2/2 - 1/8  has roots ±1/2
        let c = vec![
            BigRational::new((-1).into(), 8.into()),
            BigRational::zero(),
            BigRational::new(1.into(), 2.into()),
        ];
        assert_eq!(
            find_rational_root(&c),
            Some(BigRational::new(1.into(), 2.into()))
        );
    }
}
