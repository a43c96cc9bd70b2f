//! Equation-level strategies tried by the isolation engine when peeling the
//! outermost node is not enough: polynomial recognition, placeholder
//! substitution and Lambert W forms.

pub mod lambert;
pub mod polynomial;
pub mod quadratic;
pub mod rational_roots;
pub mod substitution;
