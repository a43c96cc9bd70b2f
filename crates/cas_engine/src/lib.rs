//! Symbolic core: expression-level polynomial GCD, rational-function
//! simplification and isolation of an unknown in comparisons.
//!
//! Everything operates on a [`cas_ast::Context`] arena and takes its
//! configuration as an [`EvaluationOptions`] plus a [`CalcEnv`] (abort flag,
//! constant registry, diagnostics sink).

// Clippy allows for patterns that read better expanded
#![allow(clippy::too_many_arguments)] // Isolation helpers thread ctx, state, sides, op and depth
#![allow(clippy::match_like_matches_macro)]

pub mod approx;
pub mod calc;
pub mod env;
pub mod error;
pub mod expand;
pub mod gcd;
pub mod logic;
pub mod options;
pub mod predicates;
pub mod rational;
pub mod solver;
pub mod sym_desc;

pub use env::{AbortHandle, CalcEnv, Diagnostic};
pub use error::CasError;
pub use gcd::{
    gcd, integer_content, lcm, polynomial_content, polynomial_divide, polynomial_long_division,
    polynomial_primpart, polynomial_pseudo_remainder, polynomial_unit, GcdResult,
};
pub use options::{AngleUnit, ApproximationMode, EvaluationOptions};
pub use rational::{do_simplification, numer_denom, together};
pub use solver::isolate_x;
