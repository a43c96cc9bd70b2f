//! Structural predicates used to decide divisions, branch splits and
//! substitution shortcuts.
//!
//! All `represents_*` answers are conservative: `false` means "not provable",
//! never "provably not".

use num_integer::Integer;
use num_traits::{One, Signed, Zero};

use cas_ast::{Assumption, BuiltinFn, Constant, Context, Expr, ExprId};

pub use cas_ast::traversal::collect_unknowns;
pub use cas_math::multipoly::conversion::is_rational_polynomial;

/// Possible signs of a real-valued expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignSet {
    pub neg: bool,
    pub zero: bool,
    pub pos: bool,
}

impl SignSet {
    pub const ANY: SignSet = SignSet::new(true, true, true);
    pub const POS: SignSet = SignSet::new(false, false, true);
    pub const NEG: SignSet = SignSet::new(true, false, false);
    pub const ZERO: SignSet = SignSet::new(false, true, false);
    pub const NONNEG: SignSet = SignSet::new(false, true, true);

    pub const fn new(neg: bool, zero: bool, pos: bool) -> Self {
        SignSet { neg, zero, pos }
    }

    fn of_number(n: &num_rational::BigRational) -> Self {
        if n.is_zero() {
            Self::ZERO
        } else if n.is_positive() {
            Self::POS
        } else {
            Self::NEG
        }
    }

    fn without_zero(self) -> Self {
        SignSet { zero: false, ..self }
    }

    fn sum(self, o: SignSet) -> SignSet {
        SignSet {
            neg: self.neg || o.neg,
            pos: self.pos || o.pos,
            zero: (self.zero && o.zero) || (self.neg && o.pos) || (self.pos && o.neg),
        }
    }

    fn product(self, o: SignSet) -> SignSet {
        SignSet {
            neg: (self.neg && o.pos) || (self.pos && o.neg),
            pos: (self.pos && o.pos) || (self.neg && o.neg),
            zero: self.zero || o.zero,
        }
    }

    /// Signs of `s^k` for an even `k`.
    fn even_power(self) -> SignSet {
        SignSet {
            neg: false,
            zero: self.zero,
            pos: self.neg || self.pos,
        }
    }

    fn within(self, o: SignSet) -> bool {
        (!self.neg || o.neg) && (!self.zero || o.zero) && (!self.pos || o.pos)
    }
}

/// Sign information of a real-valued expression; `None` when the expression
/// is not known to be real.
pub fn sign_set(ctx: &Context, e: ExprId) -> Option<SignSet> {
    match ctx.get(e) {
        Expr::Number(n) => Some(SignSet::of_number(n)),
        Expr::Constant(Constant::Pi | Constant::E) => Some(SignSet::POS),
        Expr::Constant(Constant::I) => None,
        Expr::Variable(v) => match ctx.var_info(*v).assumption {
            Assumption::Positive => Some(SignSet::POS),
            Assumption::NonNegative => Some(SignSet::NONNEG),
            Assumption::Real | Assumption::Integer => Some(SignSet::ANY),
            Assumption::None | Assumption::NonZero => None,
        },
        Expr::Add(terms) => {
            let mut acc = SignSet::ZERO;
            for &t in terms {
                acc = acc.sum(sign_set(ctx, t)?);
            }
            Some(acc)
        }
        Expr::Mul(factors) => {
            let mut acc = SignSet::POS;
            for &f in factors {
                acc = acc.product(sign_set(ctx, f)?);
            }
            Some(acc)
        }
        Expr::Pow(b, x) => pow_sign(ctx, *b, *x),
        Expr::Function(f, args) => {
            let f = ctx.builtin_of(*f)?;
            let arg = *args.first()?;
            match f {
                BuiltinFn::Exp | BuiltinFn::Cosh => {
                    sign_set(ctx, arg)?;
                    Some(SignSet::POS)
                }
                BuiltinFn::Abs => {
                    let nonzero = represents_nonzero(ctx, arg);
                    Some(if nonzero { SignSet::POS } else { SignSet::NONNEG })
                }
                BuiltinFn::Sqrt => {
                    let s = sign_set(ctx, arg)?;
                    s.within(SignSet::NONNEG).then_some(s)
                }
                BuiltinFn::Sign | BuiltinFn::Sinh | BuiltinFn::Tanh | BuiltinFn::Asinh
                | BuiltinFn::Atan => sign_set(ctx, arg),
                BuiltinFn::Sin | BuiltinFn::Cos | BuiltinFn::Tan => {
                    sign_set(ctx, arg)?;
                    Some(SignSet::ANY)
                }
                BuiltinFn::Ln => {
                    let s = sign_set(ctx, arg)?;
                    (s == SignSet::POS).then_some(SignSet::ANY)
                }
                BuiltinFn::Re | BuiltinFn::Im => Some(SignSet::ANY),
                _ => None,
            }
        }
        _ => None,
    }
}

fn pow_sign(ctx: &Context, b: ExprId, x: ExprId) -> Option<SignSet> {
    if let Some(e) = ctx.as_number(x) {
        let s = sign_set(ctx, b)?;
        if e.is_integer() {
            let even = e.to_integer().is_even();
            let out = if even { s.even_power() } else { s };
            return Some(if e.is_negative() { out.without_zero() } else { out });
        }
        let odd_den = !e.denom().is_even();
        if odd_den {
            // real root convention
            let out = if e.numer().is_even() { s.even_power() } else { s };
            return Some(if e.is_negative() { out.without_zero() } else { out });
        }
        if s.within(SignSet::NONNEG) {
            let out = SignSet { neg: false, ..s };
            return Some(if e.is_negative() { out.without_zero() } else { out });
        }
        return None;
    }
    let sb = sign_set(ctx, b)?;
    sign_set(ctx, x)?;
    (sb == SignSet::POS).then_some(SignSet::POS)
}

pub fn represents_real(ctx: &Context, e: ExprId) -> bool {
    sign_set(ctx, e).is_some()
}

pub fn represents_positive(ctx: &Context, e: ExprId) -> bool {
    sign_set(ctx, e) == Some(SignSet::POS)
}

pub fn represents_negative(ctx: &Context, e: ExprId) -> bool {
    sign_set(ctx, e) == Some(SignSet::NEG)
}

pub fn represents_nonnegative(ctx: &Context, e: ExprId) -> bool {
    sign_set(ctx, e).is_some_and(|s| s.within(SignSet::NONNEG))
}

pub fn represents_nonpositive(ctx: &Context, e: ExprId) -> bool {
    sign_set(ctx, e).is_some_and(|s| s.within(SignSet::new(true, true, false)))
}

/// Provably nonzero, including complex-valued expressions.
pub fn represents_nonzero(ctx: &Context, e: ExprId) -> bool {
    if let Some(s) = sign_set(ctx, e) {
        if !s.zero {
            return true;
        }
    }
    match ctx.get(e) {
        Expr::Number(n) => !n.is_zero(),
        Expr::Constant(_) => true,
        Expr::Variable(v) => matches!(
            ctx.var_info(*v).assumption,
            Assumption::Positive | Assumption::NonZero
        ),
        Expr::Mul(factors) => factors.iter().all(|&f| represents_nonzero(ctx, f)),
        Expr::Pow(b, x) => {
            ctx.as_number(*x).is_some() && represents_nonzero(ctx, *b)
                || matches!(ctx.get(*b), Expr::Constant(Constant::E))
        }
        Expr::Function(f, _) => ctx.is_builtin(*f, BuiltinFn::Exp),
        _ => false,
    }
}

pub fn represents_integer(ctx: &Context, e: ExprId) -> bool {
    match ctx.get(e) {
        Expr::Number(n) => n.is_integer(),
        Expr::Variable(v) => ctx.var_info(*v).assumption == Assumption::Integer,
        Expr::Add(items) | Expr::Mul(items) => items.iter().all(|&i| represents_integer(ctx, i)),
        Expr::Pow(b, x) => {
            matches!(ctx.as_number(*x), Some(n) if n.is_integer() && !n.is_negative())
                && represents_integer(ctx, *b)
        }
        _ => false,
    }
}

/// Whether `target` occurs in `e`.
#[inline]
pub fn contains(ctx: &Context, e: ExprId, target: ExprId) -> bool {
    cas_ast::contains_subexpr(ctx, e, target)
}

/// Free of unknowns (numbers, constants and functions of them).
pub fn is_constant(ctx: &Context, e: ExprId) -> bool {
    collect_unknowns(ctx, e, false).is_empty()
}

/// Whether `e` is exactly the number `k`.
pub fn is_number(ctx: &Context, e: ExprId, k: i64) -> bool {
    ctx.as_number(e)
        .is_some_and(|n| n.is_integer() && *n.numer() == k.into())
}

pub fn is_minus_one(ctx: &Context, e: ExprId) -> bool {
    ctx.as_number(e).is_some_and(|n| (-n).is_one())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc;

    #[test]
    fn signs_of_sums_and_products() {
        let mut ctx = Context::new();
        let p = ctx.var_with("p", Assumption::Positive);
        let r = ctx.var_with("r", Assumption::Real);
        let one = ctx.num(1);
        let sq = calc::pow_int(&mut ctx, r, 2);
        let s = calc::add(&mut ctx, sq, one);
        assert!(represents_positive(&ctx, s));
        let m = calc::neg(&mut ctx, p);
        assert!(represents_negative(&ctx, m));
        assert!(represents_real(&ctx, r));
        assert!(!represents_positive(&ctx, r));
        let d = calc::sub(&mut ctx, p, one);
        assert!(represents_real(&ctx, d));
        assert!(!represents_nonzero(&ctx, d));
    }

    #[test]
    fn unknown_symbols_are_not_real() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        assert!(!represents_real(&ctx, x));
        assert!(!represents_nonzero(&ctx, x));
        let e = ctx.constant(Constant::E);
        let ex = calc::pow(&mut ctx, e, x);
        assert!(represents_nonzero(&ctx, ex));
        let nz = ctx.var_with("z", Assumption::NonZero);
        let two = ctx.num(2);
        let z2 = calc::mul(&mut ctx, two, nz);
        assert!(represents_nonzero(&ctx, z2));
    }

    #[test]
    fn integer_closure() {
        let mut ctx = Context::new();
        let n = ctx.var_with("n", Assumption::Integer);
        let three = ctx.num(3);
        let t = calc::mul(&mut ctx, three, n);
        let one = ctx.num(1);
        let s = calc::add(&mut ctx, t, one);
        assert!(represents_integer(&ctx, s));
        let half = ctx.rational(1, 2);
        let h = calc::mul(&mut ctx, half, n);
        assert!(!represents_integer(&ctx, h));
    }
}
