//! Builtin function identifiers for O(1) comparison.
//!
//! The `Context` interns the names of all builtins at construction time and
//! caches their `SymbolId`s, so engine code compares function identity with
//! `ctx.builtin_of(fn_id) == Some(BuiltinFn::Ln)` instead of string matching.
//!
//! # Adding new builtins
//!
//! Append the variant to `BuiltinFn`, `ALL_BUILTINS` and `NAMES` at the same
//! position and bump `BuiltinFn::COUNT`. The table test below catches a
//! mismatch.

use crate::symbol::SymbolId;

/// Known built-in functions with cached SymbolIds.
///
/// Variants are grouped:
/// - Trig: sin, cos, tan and their inverses
/// - Hyperbolic: sinh, cosh, tanh and their inverses
/// - Logarithmic: ln, log (two-argument, base last), exp, lambertw
/// - Roots / other: sqrt, root, abs, sign, re, im
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum BuiltinFn {
    // Trigonometric
    Sin = 0,
    Cos,
    Tan,

    // Inverse trigonometric
    Asin,
    Acos,
    Atan,

    // Hyperbolic
    Sinh,
    Cosh,
    Tanh,

    // Inverse hyperbolic
    Asinh,
    Acosh,
    Atanh,

    // Logarithmic / Exponential
    Ln,
    Log, // log(x, base)
    Exp,
    LambertW, // lambertw(x) or lambertw(x, branch)

    // Roots / Powers
    Sqrt,
    Root, // root(x, n) = real nth root

    // Other
    Abs,
    Sign,
    Re,
    Im,
}

/// Every builtin in discriminant order.
pub const ALL_BUILTINS: [BuiltinFn; BuiltinFn::COUNT] = {
    use BuiltinFn::*;
    [
        Sin, Cos, Tan, Asin, Acos, Atan, Sinh, Cosh, Tanh, Asinh, Acosh, Atanh, Ln, Log, Exp,
        LambertW, Sqrt, Root, Abs, Sign, Re, Im,
    ]
};

/// Surface names, indexed by discriminant.
const NAMES: [&str; BuiltinFn::COUNT] = [
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "asinh", "acosh",
    "atanh", "ln", "log", "exp", "lambertw", "sqrt", "root", "abs", "sign", "re", "im",
];

impl BuiltinFn {
    pub const COUNT: usize = 22;

    #[inline]
    pub const fn name(self) -> &'static str {
        NAMES[self as usize]
    }

    /// sin, cos and tan.
    pub fn is_periodic(self) -> bool {
        matches!(self, BuiltinFn::Sin | BuiltinFn::Cos | BuiltinFn::Tan)
    }

    pub fn all() -> impl Iterator<Item = BuiltinFn> {
        ALL_BUILTINS.iter().copied()
    }
}

/// Cache of builtin function SymbolIds, indexed by `BuiltinFn` discriminant.
#[derive(Debug, Clone)]
pub struct BuiltinIds {
    ids: [SymbolId; BuiltinFn::COUNT],
}

impl BuiltinIds {
    pub(crate) fn new(ids: [SymbolId; BuiltinFn::COUNT]) -> Self {
        Self { ids }
    }

    #[inline]
    pub fn get(&self, builtin: BuiltinFn) -> SymbolId {
        self.ids[builtin as usize]
    }

    /// Reverse lookup: which builtin (if any) is interned as `id`.
    pub fn lookup(&self, id: SymbolId) -> Option<BuiltinFn> {
        self.ids
            .iter()
            .position(|&cached| cached == id)
            .map(|idx| ALL_BUILTINS[idx])
    }
}
