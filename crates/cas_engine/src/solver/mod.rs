//! Equation solving.
//!
//! [`isolation::isolate_x`] is the entry point; [`strategies`] holds the
//! equation-level rewrites it falls back on.

pub mod isolation;
pub mod strategies;

pub use isolation::isolate_x;
