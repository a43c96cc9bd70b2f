//! Expression tree for the ExpliCAS algebra core.
//!
//! Nodes live in a hash-consing arena ([`Context`]) and are addressed by
//! copyable [`ExprId`] handles.

pub mod builtin;
pub mod display;
pub mod expression;
pub mod ordering;
pub mod symbol;
pub mod traversal;
pub mod views;

pub use builtin::BuiltinFn;
pub use display::DisplayExpr;
pub use expression::{
    Assumption, Constant, Context, ContextStats, Expr, ExprId, RelOp, VarId, VarInfo,
};
pub use ordering::{compare_expr, compare_factors, compare_terms};
pub use symbol::SymbolId;
pub use traversal::{collect_unknowns, contains_subexpr, count_all_nodes, substitute_expr_by_id};
