use cas_math::PolyError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CasError {
    #[error("Computation aborted")]
    Aborted,
    #[error("Expression is not a polynomial")]
    NotPolynomial,
    #[error("Cannot isolate '{0}': {1}")]
    IsolationError(String, String),
    #[error("Recursion depth {0} exceeded")]
    DepthExceeded(usize),
    #[error("Polynomial error: {0}")]
    Polynomial(#[from] PolyError),
}

impl CasError {
    /// Map an interrupted polynomial computation to `Aborted`.
    pub fn from_poly(e: PolyError) -> Self {
        match e {
            PolyError::Interrupted => CasError::Aborted,
            PolyError::NotPolynomial => CasError::NotPolynomial,
            other => CasError::Polynomial(other),
        }
    }
}
