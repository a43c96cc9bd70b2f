//! Evaluation options for the polynomial and isolation core.
//!
//! Options are read-only for the duration of a call. Code that needs a local
//! variant (for example to stop the GCD engine from re-entering polynomial
//! division) clones and flips the field on the copy.

pub use cas_math::poly_gcd::{
    HeuristicGcdConfig, HEUR_GCD_GROWTH_DEN, HEUR_GCD_GROWTH_NUM, HEUR_GCD_MAX_ATTEMPTS,
    HEUR_GCD_MAX_BITS_TIMES_DEGREE,
};

/// Default recursion bound of the rational-function simplifier.
pub const DEFAULT_SIMPLIFICATION_DEPTH: usize = 10;
/// Default cap on `numerator terms × denominator terms` when merging fractions.
pub const DEFAULT_MERGE_SIZE_LIMIT: usize = 200;
/// Default largest exponent `(a + b)^n` is expanded for.
pub const DEFAULT_MAX_EXPAND_POWER: u32 = 24;
/// Recursion cap of the isolation engine.
pub const MAX_ISOLATION_DEPTH: usize = 64;

/// How numeric results may be produced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ApproximationMode {
    /// Exact results only; unsolvable-in-closed-form branches stay unsolved
    #[default]
    Exact,
    /// Exact where possible, approximate where a closed form is unwieldy
    TryExact,
    /// Numeric approximation allowed everywhere
    Approximate,
}

impl ApproximationMode {
    pub fn allows_approximation(self) -> bool {
        !matches!(self, ApproximationMode::Exact)
    }
}

/// Unit of trigonometric arguments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
    Gradians,
}

/// Tuning knobs of the rational-function simplifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimplifyParams {
    /// Recursion bound over the expression tree
    pub depth: usize,
    /// Merging is skipped when numerator × denominator term counts exceed this
    pub merge_size_limit: usize,
}

impl Default for SimplifyParams {
    fn default() -> Self {
        Self {
            depth: DEFAULT_SIMPLIFICATION_DEPTH,
            merge_size_limit: DEFAULT_MERGE_SIZE_LIMIT,
        }
    }
}

/// Evaluation options threaded by reference through every entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvaluationOptions {
    /// Expand products and integer powers of sums when normalizing comparisons
    pub expand: bool,
    /// Allow the GCD engine and simplifier to fall back to polynomial division
    pub do_polynomial_division: bool,
    /// Divide by factors not provably nonzero without splitting off a branch
    pub assume_denominators_nonzero: bool,
    /// Report a diagnostic whenever the assumption above is used
    pub warn_about_denominators_assumed_nonzero: bool,
    pub approximation: ApproximationMode,
    pub angle_unit: AngleUnit,
    /// Keep complex solution branches
    pub allow_complex: bool,
    pub max_expand_power: u32,
    pub simplification_depth: usize,
    pub merge_size_limit: usize,
    pub gcd: HeuristicGcdConfig,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            expand: true,
            do_polynomial_division: true,
            assume_denominators_nonzero: false,
            warn_about_denominators_assumed_nonzero: true,
            approximation: ApproximationMode::default(),
            angle_unit: AngleUnit::default(),
            allow_complex: false,
            max_expand_power: DEFAULT_MAX_EXPAND_POWER,
            simplification_depth: DEFAULT_SIMPLIFICATION_DEPTH,
            merge_size_limit: DEFAULT_MERGE_SIZE_LIMIT,
            gcd: HeuristicGcdConfig::default(),
        }
    }
}

impl EvaluationOptions {
    /// Copy used when the GCD engine is entered from the simplifier.
    pub fn without_polynomial_division(&self) -> Self {
        Self {
            do_polynomial_division: false,
            ..self.clone()
        }
    }

    pub fn simplify_params(&self) -> SimplifyParams {
        SimplifyParams {
            depth: self.simplification_depth,
            merge_size_limit: self.merge_size_limit,
        }
    }
}
