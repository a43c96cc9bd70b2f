use crate::builtin::{BuiltinFn, BuiltinIds, ALL_BUILTINS};
use crate::symbol::{SymbolId, SymbolTable};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};
use rustc_hash::FxHashMap;
use std::fmt;

/// Handle to a node stored in a [`Context`].
///
/// Copyable and cheap to compare; two ids are equal iff the nodes they point
/// to are structurally identical (the arena hash-conses every node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle to an unknown-variable record (name + assumption).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl VarId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Known named values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    Pi,
    E,
    /// Imaginary unit
    I,
}

impl Constant {
    pub fn name(self) -> &'static str {
        match self {
            Constant::Pi => "pi",
            Constant::E => "e",
            Constant::I => "i",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelOp {
    Eq,  // =
    Neq, // !=
    Lt,  // <
    Leq, // <=
    Gt,  // >
    Geq, // >=
}

impl RelOp {
    /// Operator after swapping both sides (`a < b` ⇔ `b > a`).
    pub fn flip(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Eq,
            RelOp::Neq => RelOp::Neq,
            RelOp::Lt => RelOp::Gt,
            RelOp::Leq => RelOp::Geq,
            RelOp::Gt => RelOp::Lt,
            RelOp::Geq => RelOp::Leq,
        }
    }

    /// Logical negation (`not (a < b)` ⇔ `a >= b`).
    pub fn negate(self) -> RelOp {
        match self {
            RelOp::Eq => RelOp::Neq,
            RelOp::Neq => RelOp::Eq,
            RelOp::Lt => RelOp::Geq,
            RelOp::Leq => RelOp::Gt,
            RelOp::Gt => RelOp::Leq,
            RelOp::Geq => RelOp::Lt,
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, RelOp::Lt | RelOp::Gt)
    }

    pub fn is_inequality(self) -> bool {
        !matches!(self, RelOp::Eq | RelOp::Neq)
    }

    /// Non-strict variant of an ordering operator (`<` → `<=`).
    pub fn non_strict(self) -> RelOp {
        match self {
            RelOp::Lt => RelOp::Leq,
            RelOp::Gt => RelOp::Geq,
            other => other,
        }
    }

    /// Strict variant of an ordering operator (`<=` → `<`).
    pub fn strict(self) -> RelOp {
        match self {
            RelOp::Leq => RelOp::Lt,
            RelOp::Geq => RelOp::Gt,
            other => other,
        }
    }

    /// Decide `ordering(lhs, rhs)` against this operator.
    pub fn holds(self, ord: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            RelOp::Eq => ord == Equal,
            RelOp::Neq => ord != Equal,
            RelOp::Lt => ord == Less,
            RelOp::Leq => ord != Greater,
            RelOp::Gt => ord == Greater,
            RelOp::Geq => ord != Less,
        }
    }
}

impl fmt::Display for RelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelOp::Eq => write!(f, "="),
            RelOp::Neq => write!(f, "!="),
            RelOp::Lt => write!(f, "<"),
            RelOp::Gt => write!(f, ">"),
            RelOp::Leq => write!(f, "<="),
            RelOp::Geq => write!(f, ">="),
        }
    }
}

/// Assumption attached to an unknown variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Assumption {
    /// Complex, unrestricted
    #[default]
    None,
    Real,
    Integer,
    Positive,
    NonNegative,
    NonZero,
}

impl Assumption {
    pub fn is_real(self) -> bool {
        !matches!(self, Assumption::None | Assumption::NonZero)
    }
}

/// Record behind a [`VarId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarInfo {
    pub name: SymbolId,
    pub assumption: Assumption,
    pub placeholder: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Number(BigRational),
    Constant(Constant),
    /// Plain symbolic unknown
    Symbol(SymbolId),
    /// Unknown variable with an assumption
    Variable(VarId),
    Unit(SymbolId),
    Add(Vec<ExprId>),
    Mul(Vec<ExprId>),
    Pow(ExprId, ExprId),
    Function(SymbolId, Vec<ExprId>),
    Compare(RelOp, ExprId, ExprId),
    And(Vec<ExprId>),
    Or(Vec<ExprId>),
    Xor(Vec<ExprId>),
    Not(ExprId),
    Boolean(bool),
    Undefined,
    Aborted,
}

impl Expr {
    /// Child ids in order.
    pub fn children(&self) -> Vec<ExprId> {
        match self {
            Expr::Add(items)
            | Expr::Mul(items)
            | Expr::And(items)
            | Expr::Or(items)
            | Expr::Xor(items)
            | Expr::Function(_, items) => items.clone(),
            Expr::Pow(l, r) | Expr::Compare(_, l, r) => vec![*l, *r],
            Expr::Not(e) => vec![*e],
            Expr::Number(_)
            | Expr::Constant(_)
            | Expr::Symbol(_)
            | Expr::Variable(_)
            | Expr::Unit(_)
            | Expr::Boolean(_)
            | Expr::Undefined
            | Expr::Aborted => Vec::new(),
        }
    }

    /// Symbols, variables and units: the unknowns a polynomial is built over.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Expr::Symbol(_) | Expr::Variable(_) | Expr::Unit(_))
    }
}

/// Counters exposed for budget checks and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Nodes appended to the arena (deduplicated hits are not counted)
    pub nodes_created: u64,
}

/// Expression arena.
///
/// Nodes are immutable once added. `add` canonicalizes trivial n-ary nodes
/// (`Add([])` is 0, `Mul([])` is 1, single-child `Add`/`Mul`/`And`/`Or`
/// collapse to the child); `add_raw` stores the node verbatim. Both dedup.
#[derive(Debug, Clone)]
pub struct Context {
    nodes: Vec<Expr>,
    interned: FxHashMap<Expr, ExprId>,
    symbols: SymbolTable,
    builtins: BuiltinIds,
    vars: Vec<VarInfo>,
    var_lookup: FxHashMap<(SymbolId, Assumption), VarId>,
    live_placeholders: usize,
    placeholder_serial: usize,
    stats: ContextStats,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        let ids = ALL_BUILTINS.map(|b| symbols.intern(b.name()));
        Self {
            nodes: Vec::new(),
            interned: FxHashMap::default(),
            symbols,
            builtins: BuiltinIds::new(ids),
            vars: Vec::new(),
            var_lookup: FxHashMap::default(),
            live_placeholders: 0,
            placeholder_serial: 0,
            stats: ContextStats::default(),
        }
    }

    /// Add a node, collapsing trivial n-ary forms.
    pub fn add(&mut self, expr: Expr) -> ExprId {
        match expr {
            Expr::Add(items) if items.is_empty() => self.num(0),
            Expr::Mul(items) if items.is_empty() => self.num(1),
            Expr::And(items) if items.is_empty() => self.add_raw(Expr::Boolean(true)),
            Expr::Or(items) if items.is_empty() => self.add_raw(Expr::Boolean(false)),
            Expr::Add(items) | Expr::Mul(items) | Expr::And(items) | Expr::Or(items)
                if items.len() == 1 =>
            {
                items[0]
            }
            other => self.add_raw(other),
        }
    }

    /// Add a node verbatim (still hash-consed).
    pub fn add_raw(&mut self, expr: Expr) -> ExprId {
        if let Some(&id) = self.interned.get(&expr) {
            return id;
        }
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr.clone());
        self.interned.insert(expr, id);
        self.stats.nodes_created += 1;
        id
    }

    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn num(&mut self, n: i64) -> ExprId {
        self.add_raw(Expr::Number(BigRational::from_integer(BigInt::from(n))))
    }

    pub fn rational(&mut self, num: i64, den: i64) -> ExprId {
        self.add_raw(Expr::Number(BigRational::new(
            BigInt::from(num),
            BigInt::from(den),
        )))
    }

    pub fn number(&mut self, value: BigRational) -> ExprId {
        self.add_raw(Expr::Number(value))
    }

    pub fn int(&mut self, value: BigInt) -> ExprId {
        self.add_raw(Expr::Number(BigRational::from_integer(value)))
    }

    pub fn constant(&mut self, c: Constant) -> ExprId {
        self.add_raw(Expr::Constant(c))
    }

    pub fn boolean(&mut self, b: bool) -> ExprId {
        self.add_raw(Expr::Boolean(b))
    }

    pub fn undefined(&mut self) -> ExprId {
        self.add_raw(Expr::Undefined)
    }

    /// Plain symbolic unknown.
    pub fn symbol(&mut self, name: &str) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add_raw(Expr::Symbol(sym))
    }

    pub fn unit(&mut self, name: &str) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add_raw(Expr::Unit(sym))
    }

    /// Unknown variable without assumptions.
    pub fn var(&mut self, name: &str) -> ExprId {
        self.var_with(name, Assumption::None)
    }

    /// Unknown variable carrying `assumption`. The same name with a
    /// different assumption is a different variable.
    pub fn var_with(&mut self, name: &str, assumption: Assumption) -> ExprId {
        let sym = self.symbols.intern(name);
        let vid = match self.var_lookup.get(&(sym, assumption)) {
            Some(&vid) => vid,
            None => {
                let vid = VarId(self.vars.len() as u32);
                self.vars.push(VarInfo {
                    name: sym,
                    assumption,
                    placeholder: false,
                });
                self.var_lookup.insert((sym, assumption), vid);
                vid
            }
        };
        self.add_raw(Expr::Variable(vid))
    }

    pub fn var_info(&self, id: VarId) -> &VarInfo {
        &self.vars[id.index()]
    }

    pub fn sym_name(&self, id: SymbolId) -> &str {
        self.symbols.resolve(id)
    }

    pub fn intern_symbol(&mut self, name: &str) -> SymbolId {
        self.symbols.intern(name)
    }

    /// Display name of an unknown node (symbol, variable or unit).
    pub fn unknown_name(&self, id: ExprId) -> Option<&str> {
        match self.get(id) {
            Expr::Symbol(s) | Expr::Unit(s) => Some(self.sym_name(*s)),
            Expr::Variable(v) => Some(self.sym_name(self.var_info(*v).name)),
            _ => None,
        }
    }

    /// Call a function by name. Builtin names resolve to the builtin.
    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add_raw(Expr::Function(sym, args))
    }

    pub fn call_builtin(&mut self, builtin: BuiltinFn, args: Vec<ExprId>) -> ExprId {
        let sym = self.builtins.get(builtin);
        self.add_raw(Expr::Function(sym, args))
    }

    #[inline]
    pub fn builtin_of(&self, fn_id: SymbolId) -> Option<BuiltinFn> {
        self.builtins.lookup(fn_id)
    }

    #[inline]
    pub fn is_builtin(&self, fn_id: SymbolId, builtin: BuiltinFn) -> bool {
        self.builtins.get(builtin) == fn_id
    }

    pub fn compare(&mut self, op: RelOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        self.add_raw(Expr::Compare(op, lhs, rhs))
    }

    pub fn is_zero(&self, id: ExprId) -> bool {
        matches!(self.get(id), Expr::Number(n) if n.is_zero())
    }

    pub fn is_one(&self, id: ExprId) -> bool {
        matches!(self.get(id), Expr::Number(n) if n.is_one())
    }

    pub fn as_number(&self, id: ExprId) -> Option<&BigRational> {
        match self.get(id) {
            Expr::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Run `f` with a fresh placeholder variable in scope.
    ///
    /// The placeholder is released when `f` returns, whatever it returns
    /// (including an `Err` produced by `?` inside the closure). Callers must
    /// substitute it back before leaving the scope.
    ///
    /// Released means out of scope, not reclaimed: every call appends one
    /// entry to the variable table and one interned name, and neither is
    /// reused. A long-lived `Context` grows by one variable per scope, so
    /// drivers that solve many equations should start from a fresh context.
    pub fn with_placeholder<R>(
        &mut self,
        hint: &str,
        assumption: Assumption,
        f: impl FnOnce(&mut Context, ExprId) -> R,
    ) -> R {
        self.placeholder_serial += 1;
        let name = format!("{}'{}", hint, self.placeholder_serial);
        let sym = self.symbols.intern(&name);
        let vid = VarId(self.vars.len() as u32);
        self.vars.push(VarInfo {
            name: sym,
            assumption,
            placeholder: true,
        });
        let id = self.add_raw(Expr::Variable(vid));

        self.live_placeholders += 1;
        let out = f(self, id);
        self.live_placeholders -= 1;
        out
    }

    /// Placeholders currently in scope.
    pub fn live_placeholders(&self) -> usize {
        self.live_placeholders
    }

    pub fn is_placeholder(&self, id: ExprId) -> bool {
        matches!(self.get(id), Expr::Variable(v) if self.var_info(*v).placeholder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_consing_shares_ids() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let a = ctx.add(Expr::Add(vec![x, two]));
        let b = ctx.add(Expr::Add(vec![x, two]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_singleton_collapse() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        assert_eq!(ctx.add(Expr::Add(vec![x])), x);
        assert_eq!(ctx.add(Expr::Mul(vec![x])), x);
        let empty_sum = ctx.add(Expr::Add(vec![]));
        assert!(ctx.is_zero(empty_sum));
        let empty_prod = ctx.add(Expr::Mul(vec![]));
        assert!(ctx.is_one(empty_prod));
    }

    #[test]
    fn test_assumption_distinguishes_variables() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let xr = ctx.var_with("x", Assumption::Real);
        assert_ne!(x, xr);
        assert_eq!(ctx.unknown_name(xr), Some("x"));
    }

    #[test]
    fn test_builtin_roundtrip() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let ln = ctx.call_builtin(BuiltinFn::Ln, vec![x]);
        let by_name = ctx.call("ln", vec![x]);
        assert_eq!(ln, by_name);
        match ctx.get(ln) {
            Expr::Function(f, _) => assert_eq!(ctx.builtin_of(*f), Some(BuiltinFn::Ln)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_released_on_error() {
        let mut ctx = Context::new();
        let r: Result<(), ()> = ctx.with_placeholder("u", Assumption::None, |ctx, u| {
            assert!(ctx.is_placeholder(u));
            assert_eq!(ctx.live_placeholders(), 1);
            Err(())
        });
        assert!(r.is_err());
        assert_eq!(ctx.live_placeholders(), 0);
    }

    #[test]
    fn test_nested_placeholders_are_distinct() {
        let mut ctx = Context::new();
        let (a, b) = ctx.with_placeholder("u", Assumption::None, |ctx, u| {
            ctx.with_placeholder("u", Assumption::None, |ctx, v| {
                assert_eq!(ctx.live_placeholders(), 2);
                (u, v)
            })
        });
        assert_ne!(a, b);
        assert_eq!(ctx.live_placeholders(), 0);
    }

    #[test]
    fn test_relop_negate_and_flip() {
        assert_eq!(RelOp::Lt.negate(), RelOp::Geq);
        assert_eq!(RelOp::Lt.flip(), RelOp::Gt);
        assert_eq!(RelOp::Geq.flip().negate(), RelOp::Gt);
        assert!(RelOp::Leq.holds(std::cmp::Ordering::Equal));
    }
}
