use thiserror::Error;

/// Failures of polynomial conversion, division and GCD.
///
/// All of them are recoverable: callers try the next strategy or degrade to
/// "could not simplify".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolyError {
    #[error("expression is not a polynomial over the rationals")]
    NotPolynomial,

    #[error("computation interrupted")]
    Interrupted,

    #[error("heuristic gcd failed")]
    HeuristicFailed,

    #[error("iteration bound exhausted")]
    Exhausted,

    #[error("division is not exact")]
    Inexact,

    #[error("exponent {0} exceeds expansion limit")]
    ExponentTooLarge(u64),
}
