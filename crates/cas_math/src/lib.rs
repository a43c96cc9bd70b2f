//! Exact polynomial algebra over Q: sparse multivariate polynomials,
//! pseudo-division and GCD (heuristic + subresultant PRS).

pub mod error;
pub mod interrupt;
pub mod multipoly;
pub mod numeric;
pub mod poly_gcd;

pub use error::PolyError;
pub use interrupt::{Interrupt, NoInterrupt};
pub use multipoly::{collect_poly_vars, multipoly_from_expr, multipoly_to_expr, MultiPoly, PolyBudget};
pub use poly_gcd::{HeuristicGcdConfig, PolyGcd};
