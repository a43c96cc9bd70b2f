//! Floating-point evaluation of expressions.
//!
//! Used to order roots, to decide comparisons between closed-form constants
//! and, in approximate mode, to replace unwieldy closed forms. Negative real
//! bases with odd-denominator exponents take the real root, matching the
//! exact arithmetic.

use num_complex::Complex64;
use num_traits::{ToPrimitive, Zero};

use cas_ast::{BuiltinFn, Constant, Context, Expr, ExprId, RelOp};
use cas_math::numeric::rational_to_f64;

use crate::options::AngleUnit;

/// Relative tolerance for deciding equalities numerically.
pub const APPROX_TOLERANCE: f64 = 1e-9;
const LAMBERT_ITERATIONS: usize = 64;

/// Numeric evaluator with bound unknowns.
pub struct Approx<'a> {
    ctx: &'a Context,
    bindings: &'a [(ExprId, Complex64)],
    unit: AngleUnit,
}

impl<'a> Approx<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Approx {
            ctx,
            bindings: &[],
            unit: AngleUnit::Radians,
        }
    }

    pub fn with_bindings(mut self, bindings: &'a [(ExprId, Complex64)]) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_unit(mut self, unit: AngleUnit) -> Self {
        self.unit = unit;
        self
    }

    fn to_radians(&self, z: Complex64) -> Complex64 {
        match self.unit {
            AngleUnit::Radians => z,
            AngleUnit::Degrees => z * (std::f64::consts::PI / 180.0),
            AngleUnit::Gradians => z * (std::f64::consts::PI / 200.0),
        }
    }

    fn from_radians(&self, z: Complex64) -> Complex64 {
        match self.unit {
            AngleUnit::Radians => z,
            AngleUnit::Degrees => z * (180.0 / std::f64::consts::PI),
            AngleUnit::Gradians => z * (200.0 / std::f64::consts::PI),
        }
    }

    /// Value of `e`, or `None` for unbound unknowns and undefined results.
    pub fn eval(&self, e: ExprId) -> Option<Complex64> {
        let ctx = self.ctx;
        let v = match ctx.get(e) {
            Expr::Number(n) => Complex64::new(rational_to_f64(n), 0.0),
            Expr::Constant(Constant::Pi) => Complex64::new(std::f64::consts::PI, 0.0),
            Expr::Constant(Constant::E) => Complex64::new(std::f64::consts::E, 0.0),
            Expr::Constant(Constant::I) => Complex64::i(),
            Expr::Symbol(_) | Expr::Variable(_) | Expr::Unit(_) => {
                self.bindings.iter().find(|(k, _)| *k == e).map(|(_, v)| *v)?
            }
            Expr::Add(terms) => {
                let mut acc = Complex64::zero();
                for &t in terms {
                    acc += self.eval(t)?;
                }
                acc
            }
            Expr::Mul(factors) => {
                let mut acc = Complex64::new(1.0, 0.0);
                for &f in factors {
                    acc *= self.eval(f)?;
                }
                acc
            }
            Expr::Pow(b, x) => self.eval_pow(*b, *x)?,
            Expr::Function(f, args) => {
                let f = ctx.builtin_of(*f)?;
                let vals: Option<Vec<Complex64>> = args.iter().map(|&a| self.eval(a)).collect();
                self.eval_builtin(f, &vals?)?
            }
            _ => return None,
        };
        (v.re.is_finite() && v.im.is_finite()).then_some(v)
    }

    fn eval_pow(&self, b: ExprId, x: ExprId) -> Option<Complex64> {
        let base = self.eval(b)?;
        if let Some(e) = self.ctx.as_number(x) {
            if e.is_integer() {
                let k = e.to_integer().to_i32()?;
                if base.is_zero() && k < 0 {
                    return None;
                }
                return Some(base.powi(k));
            }
            let odd_den = e.denom().to_u64().is_some_and(|d| d % 2 == 1);
            if is_real(base) && base.re < 0.0 && odd_den {
                let mag = (-base.re).powf(rational_to_f64(e));
                let odd_num = e.numer().to_i64().is_some_and(|p| p % 2 != 0);
                return Some(Complex64::new(if odd_num { -mag } else { mag }, 0.0));
            }
        }
        let exp = self.eval(x)?;
        if base.is_zero() {
            return (exp.re > 0.0).then(Complex64::zero);
        }
        if is_real(base) && base.re > 0.0 && is_real(exp) {
            return Some(Complex64::new(base.re.powf(exp.re), 0.0));
        }
        Some(base.powc(exp))
    }

    fn eval_builtin(&self, f: BuiltinFn, a: &[Complex64]) -> Option<Complex64> {
        use BuiltinFn::*;
        let x = *a.first()?;
        let real = |v: f64| Some(Complex64::new(v, 0.0));
        match (f, a.len()) {
            (Sin, 1) => Some(self.to_radians(x).sin()),
            (Cos, 1) => Some(self.to_radians(x).cos()),
            (Tan, 1) => Some(self.to_radians(x).tan()),
            (Asin, 1) => Some(self.from_radians(x.asin())),
            (Acos, 1) => Some(self.from_radians(x.acos())),
            (Atan, 1) => Some(self.from_radians(x.atan())),
            (Sinh, 1) => Some(x.sinh()),
            (Cosh, 1) => Some(x.cosh()),
            (Tanh, 1) => Some(x.tanh()),
            (Asinh, 1) => Some(x.asinh()),
            (Acosh, 1) => Some(x.acosh()),
            (Atanh, 1) => Some(x.atanh()),
            (Ln, 1) => {
                if x.is_zero() {
                    return None;
                }
                if is_real(x) && x.re > 0.0 {
                    return real(x.re.ln());
                }
                Some(x.ln())
            }
            (Log, 2) => {
                let b = a[1];
                if x.is_zero() || b.is_zero() {
                    return None;
                }
                let d = b.ln();
                (!d.is_zero()).then(|| x.ln() / d)
            }
            (Exp, 1) => Some(x.exp()),
            (LambertW, 1) => lambert_w(x, 0),
            (LambertW, 2) => {
                let k = a[1];
                if !is_real(k) || k.re.fract() != 0.0 {
                    return None;
                }
                lambert_w(x, k.re as i32)
            }
            (Sqrt, 1) => Some(x.sqrt()),
            (Root, 2) => {
                let n = a[1];
                if is_real(x) && is_real(n) && n.re.fract() == 0.0 && (n.re as i64) % 2 != 0 {
                    return real(x.re.signum() * x.re.abs().powf(1.0 / n.re));
                }
                Some(x.powc(n.inv()))
            }
            (Abs, 1) => real(x.norm()),
            (Sign, 1) => {
                if x.is_zero() {
                    real(0.0)
                } else {
                    Some(x / x.norm())
                }
            }
            (Re, 1) => real(x.re),
            (Im, 1) => real(x.im),
            _ => None,
        }
    }
}

/// Imaginary part negligible relative to the magnitude.
pub fn is_real(z: Complex64) -> bool {
    z.im.abs() <= APPROX_TOLERANCE * z.re.abs().max(1.0)
}

/// Evaluate a constant expression (no unknowns).
pub fn approximate(ctx: &Context, e: ExprId) -> Option<Complex64> {
    Approx::new(ctx).eval(e)
}

/// Evaluate with unknowns bound to values.
pub fn approximate_with(
    ctx: &Context,
    e: ExprId,
    bindings: &[(ExprId, Complex64)],
) -> Option<Complex64> {
    Approx::new(ctx).with_bindings(bindings).eval(e)
}

/// Real value of a constant expression, if it is real.
pub fn approximate_real(ctx: &Context, e: ExprId) -> Option<f64> {
    approximate(ctx, e).filter(|z| is_real(*z)).map(|z| z.re)
}

/// Sign of a constant real expression, if decidable numerically.
///
/// Values within tolerance of zero are undecided.
pub fn approximate_sign(ctx: &Context, e: ExprId) -> Option<std::cmp::Ordering> {
    let v = approximate_real(ctx, e)?;
    if v.abs() <= APPROX_TOLERANCE {
        None
    } else {
        v.partial_cmp(&0.0)
    }
}

fn holds(op: RelOp, d: Complex64) -> Option<bool> {
    let scale = d.norm().max(1.0);
    let is_zero = d.norm() <= APPROX_TOLERANCE * scale;
    match op {
        RelOp::Eq => Some(is_zero),
        RelOp::Neq => Some(!is_zero),
        _ => {
            if !is_real(d) {
                return None;
            }
            if is_zero {
                return Some(!op.is_strict());
            }
            d.re.partial_cmp(&0.0).map(|o| op.holds(o))
        }
    }
}

/// Numeric truth value of a comparison or logical combination.
pub fn truth_value(ctx: &Context, e: ExprId, bindings: &[(ExprId, Complex64)]) -> Option<bool> {
    let ev = Approx::new(ctx).with_bindings(bindings);
    truth_value_with(&ev, ctx, e)
}

fn truth_value_with(ev: &Approx<'_>, ctx: &Context, e: ExprId) -> Option<bool> {
    match ctx.get(e) {
        Expr::Boolean(b) => Some(*b),
        Expr::Compare(op, l, r) => {
            let d = ev.eval(*l)? - ev.eval(*r)?;
            holds(*op, d)
        }
        Expr::Not(inner) => truth_value_with(ev, ctx, *inner).map(|b| !b),
        Expr::And(items) => {
            let mut all = true;
            for &i in items {
                match truth_value_with(ev, ctx, i) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => all = false,
                }
            }
            all.then_some(true)
        }
        Expr::Or(items) => {
            let mut any_unknown = false;
            for &i in items {
                match truth_value_with(ev, ctx, i) {
                    Some(true) => return Some(true),
                    Some(false) => {}
                    None => any_unknown = true,
                }
            }
            (!any_unknown).then_some(false)
        }
        Expr::Xor(items) => {
            let mut acc = false;
            for &i in items {
                acc ^= truth_value_with(ev, ctx, i)?;
            }
            Some(acc)
        }
        _ => None,
    }
}

/// Lambert W on branch `k` (0 or -1 meaningful for real arguments).
pub fn lambert_w(z: Complex64, k: i32) -> Option<Complex64> {
    if z.is_zero() {
        return (k == 0).then(Complex64::zero);
    }
    let branch_point = -(-1.0f64).exp();
    let mut w = if is_real(z) && z.re >= branch_point && (k == 0 || (k == -1 && z.re < 0.0)) {
        let x = z.re;
        let p = (2.0 * (std::f64::consts::E * x + 1.0)).max(0.0).sqrt();
        let guess = if k == 0 {
            if x < 1.0 {
                -1.0 + p - p * p / 3.0
            } else {
                let l = x.ln();
                l - l.ln().max(0.0)
            }
        } else if x > -0.25 {
            let l = (-x).ln();
            l - (-l).ln()
        } else {
            -1.0 - p - p * p / 3.0
        };
        Complex64::new(guess, 0.0)
    } else {
        let two_pi_k = Complex64::new(0.0, 2.0 * std::f64::consts::PI * f64::from(k));
        let l = z.ln() + two_pi_k;
        l - l.ln()
    };

    for _ in 0..LAMBERT_ITERATIONS {
        let ew = w.exp();
        let f = w * ew - z;
        let wp1 = w + 1.0;
        if wp1.norm() < 1e-14 {
            break;
        }
        let denom = ew * wp1 - (w + 2.0) * f / (wp1 * 2.0);
        if denom.is_zero() {
            break;
        }
        let step = f / denom;
        w -= step;
        if step.norm() <= 1e-15 * w.norm().max(1.0) {
            break;
        }
    }
    (w.re.is_finite() && w.im.is_finite()).then_some(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc;

    #[test]
    fn real_root_of_negative_base() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let third = ctx.rational(1, 3);
        let p = ctx.add(Expr::Pow(x, third));
        let v = approximate_with(&ctx, p, &[(x, Complex64::new(-27.0, 0.0))]).unwrap();
        assert!((v.re + 3.0).abs() < 1e-12 && v.im == 0.0);
    }

    #[test]
    fn lambert_w_branches() {
        let w0 = lambert_w(Complex64::new(1.0, 0.0), 0).unwrap();
        assert!((w0.re - 0.567_143_290_409_783_8).abs() < 1e-12);
        let z = Complex64::new(-0.2, 0.0);
        let wm1 = lambert_w(z, -1).unwrap();
        assert!((wm1 * wm1.exp() - z).norm() < 1e-12);
        assert!(wm1.re < -1.0);
        let w0 = lambert_w(z, 0).unwrap();
        assert!(w0.re > -1.0 && (w0 * w0.exp() - z).norm() < 1e-12);
    }

    #[test]
    fn truth_of_comparisons() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let lt = ctx.compare(RelOp::Lt, x, two);
        assert_eq!(truth_value(&ctx, lt, &[(x, Complex64::new(1.0, 0.0))]), Some(true));
        assert_eq!(truth_value(&ctx, lt, &[(x, Complex64::new(0.0, 1.0))]), None);
        assert_eq!(truth_value(&ctx, lt, &[]), None);

        let sq = calc::sqrt(&mut ctx, two);
        let sq2 = calc::mul(&mut ctx, sq, sq);
        let eq = ctx.compare(RelOp::Eq, sq2, two);
        assert_eq!(truth_value(&ctx, eq, &[]), Some(true));
    }

    #[test]
    fn degrees_convert_trig_arguments() {
        let mut ctx = Context::new();
        let ninety = ctx.num(90);
        let s = ctx.call_builtin(BuiltinFn::Sin, vec![ninety]);
        let v = Approx::new(&ctx).with_unit(AngleUnit::Degrees).eval(s).unwrap();
        assert!((v.re - 1.0).abs() < 1e-12);
    }
}
