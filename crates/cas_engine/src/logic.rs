//! Builders for logical combinations of comparisons.
//!
//! `and_all` / `or_all` flatten, drop neutral elements, short-circuit on
//! absorbing ones, fold decided comparisons and merge numeric bounds on the
//! same left-hand side (`x > 2 and x > 3` is `x > 3`, `x < 1 and x > 2` is
//! `false`).

use std::cmp::Ordering;

use num_traits::Zero;

use cas_ast::{Context, Expr, ExprId, RelOp};

use crate::approx::{approximate_sign, APPROX_TOLERANCE};
use crate::{approx, calc, predicates};

/// Truth value of `l op r` when it does not depend on any unknown.
pub fn decide(ctx: &mut Context, op: RelOp, l: ExprId, r: ExprId) -> Option<bool> {
    if l == r {
        return Some(!op.is_strict() && op != RelOp::Neq);
    }
    let d = calc::sub(ctx, l, r);
    if let Some(n) = ctx.as_number(d) {
        return Some(op.holds(n.cmp(&num_rational::BigRational::zero())));
    }
    if calc::is_undefined(ctx, d) || !predicates::is_constant(ctx, d) {
        return None;
    }
    match op {
        RelOp::Eq | RelOp::Neq => {
            // only a clear numeric separation decides an equality
            let v = approx::approximate(ctx, d)?;
            (v.norm() > APPROX_TOLERANCE).then_some(op == RelOp::Neq)
        }
        _ => approximate_sign(ctx, d).map(|s| op.holds(s)),
    }
}

/// `l op r`, folded to a boolean when decidable.
pub fn compare(ctx: &mut Context, op: RelOp, l: ExprId, r: ExprId) -> ExprId {
    match decide(ctx, op, l, r) {
        Some(b) => ctx.boolean(b),
        None => ctx.compare(op, l, r),
    }
}

fn as_boolean(ctx: &Context, e: ExprId) -> Option<bool> {
    match ctx.get(e) {
        Expr::Boolean(b) => Some(*b),
        _ => None,
    }
}

/// Fold a node that is a decidable comparison.
fn fold_item(ctx: &mut Context, e: ExprId) -> ExprId {
    if let Expr::Compare(op, l, r) = *ctx.get(e) {
        if let Some(b) = decide(ctx, op, l, r) {
            return ctx.boolean(b);
        }
    }
    e
}

/// Order of two constant bound values.
fn cmp_values(ctx: &mut Context, a: ExprId, b: ExprId) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (ctx.as_number(a), ctx.as_number(b)) {
        return Some(x.cmp(y));
    }
    let d = calc::sub(ctx, a, b);
    if let Some(n) = ctx.as_number(d) {
        return Some(n.cmp(&num_rational::BigRational::zero()));
    }
    approximate_sign(ctx, d)
}

#[derive(Clone, Copy)]
struct Bound {
    value: ExprId,
    strict: bool,
}

/// Numeric constraints collected for one left-hand side.
struct BoundGroup {
    lhs: ExprId,
    lower: Vec<Bound>,
    upper: Vec<Bound>,
    eq: Vec<ExprId>,
    neq: Vec<ExprId>,
    /// Comparisons whose bounds could not be ordered
    unmerged: Vec<ExprId>,
}

impl BoundGroup {
    fn new(lhs: ExprId) -> Self {
        BoundGroup {
            lhs,
            lower: Vec::new(),
            upper: Vec::new(),
            eq: Vec::new(),
            neq: Vec::new(),
            unmerged: Vec::new(),
        }
    }

    fn push(&mut self, op: RelOp, value: ExprId) {
        match op {
            RelOp::Gt | RelOp::Geq => self.lower.push(Bound {
                value,
                strict: op.is_strict(),
            }),
            RelOp::Lt | RelOp::Leq => self.upper.push(Bound {
                value,
                strict: op.is_strict(),
            }),
            RelOp::Eq => self.eq.push(value),
            RelOp::Neq => self.neq.push(value),
        }
    }
}

/// `Some((lhs, op, value))` when `e` compares an expression with a constant.
fn bound_of(ctx: &Context, e: ExprId) -> Option<(ExprId, RelOp, ExprId)> {
    match *ctx.get(e) {
        Expr::Compare(op, l, r) if predicates::is_constant(ctx, r) && !predicates::is_constant(ctx, l) => {
            Some((l, op, r))
        }
        _ => None,
    }
}

enum Slot {
    Item(ExprId),
    Group(usize),
}

/// Pick the tightest (`tighter = Greater` for lower bounds) or loosest bound.
fn select_bound(ctx: &mut Context, bounds: &[Bound], pick: Ordering) -> Option<Option<Bound>> {
    let mut best: Option<Bound> = None;
    for &b in bounds {
        best = Some(match best {
            None => b,
            Some(cur) => match cmp_values(ctx, b.value, cur.value)? {
                Ordering::Equal => Bound {
                    value: cur.value,
                    strict: if pick == Ordering::Greater {
                        cur.strict || b.strict
                    } else {
                        cur.strict && b.strict
                    },
                },
                o if o == pick => b,
                _ => cur,
            },
        });
    }
    Some(best)
}

/// Whether `v` satisfies the bound (`lower` selects direction).
fn satisfies(ctx: &mut Context, v: ExprId, b: Bound, lower: bool) -> Option<bool> {
    let o = cmp_values(ctx, v, b.value)?;
    Some(match (lower, o) {
        (_, Ordering::Equal) => !b.strict,
        (true, o) => o == Ordering::Greater,
        (false, o) => o == Ordering::Less,
    })
}

/// Merged conjunction of one group; `None` means the group is unsatisfiable.
fn merge_and(ctx: &mut Context, g: &BoundGroup) -> Option<Vec<ExprId>> {
    let fallback = |ctx: &mut Context, g: &BoundGroup| -> Vec<ExprId> {
        let mut out = Vec::new();
        for b in &g.lower {
            let op = if b.strict { RelOp::Gt } else { RelOp::Geq };
            out.push(ctx.compare(op, g.lhs, b.value));
        }
        for b in &g.upper {
            let op = if b.strict { RelOp::Lt } else { RelOp::Leq };
            out.push(ctx.compare(op, g.lhs, b.value));
        }
        for &v in &g.eq {
            out.push(ctx.compare(RelOp::Eq, g.lhs, v));
        }
        for &v in &g.neq {
            out.push(ctx.compare(RelOp::Neq, g.lhs, v));
        }
        out.extend_from_slice(&g.unmerged);
        out
    };

    let (Some(lower), Some(upper)) = (
        select_bound(ctx, &g.lower, Ordering::Greater),
        select_bound(ctx, &g.upper, Ordering::Less),
    ) else {
        return Some(fallback(ctx, g));
    };

    if let Some(&v) = g.eq.first() {
        for &w in &g.eq[1..] {
            match cmp_values(ctx, v, w) {
                Some(Ordering::Equal) => {}
                Some(_) => return None,
                None => return Some(fallback(ctx, g)),
            }
        }
        let checks = lower
            .map(|b| satisfies(ctx, v, b, true))
            .into_iter()
            .chain(upper.map(|b| satisfies(ctx, v, b, false)))
            .chain(
                g.neq
                    .iter()
                    .map(|&w| cmp_values(ctx, v, w).map(|o| o != Ordering::Equal))
                    .collect::<Vec<_>>(),
            )
            .collect::<Vec<_>>();
        if checks.iter().any(|c| *c == Some(false)) {
            return None;
        }
        if checks.iter().all(|c| c.is_some()) {
            let mut out = vec![ctx.compare(RelOp::Eq, g.lhs, v)];
            out.extend_from_slice(&g.unmerged);
            return Some(out);
        }
        return Some(fallback(ctx, g));
    }

    let mut out = Vec::new();
    match (lower, upper) {
        (Some(lo), Some(hi)) => match cmp_values(ctx, lo.value, hi.value) {
            Some(Ordering::Greater) => return None,
            Some(Ordering::Equal) => {
                if lo.strict || hi.strict {
                    return None;
                }
                out.push(ctx.compare(RelOp::Eq, g.lhs, lo.value));
            }
            Some(Ordering::Less) => {
                let lop = if lo.strict { RelOp::Gt } else { RelOp::Geq };
                let hop = if hi.strict { RelOp::Lt } else { RelOp::Leq };
                out.push(ctx.compare(lop, g.lhs, lo.value));
                out.push(ctx.compare(hop, g.lhs, hi.value));
            }
            None => return Some(fallback(ctx, g)),
        },
        (Some(lo), None) => {
            let op = if lo.strict { RelOp::Gt } else { RelOp::Geq };
            out.push(ctx.compare(op, g.lhs, lo.value));
        }
        (None, Some(hi)) => {
            let op = if hi.strict { RelOp::Lt } else { RelOp::Leq };
            out.push(ctx.compare(op, g.lhs, hi.value));
        }
        (None, None) => {}
    }
    for &w in &g.neq {
        let inside_lo = match lower {
            Some(b) => satisfies(ctx, w, b, true),
            None => Some(true),
        };
        let inside_hi = match upper {
            Some(b) => satisfies(ctx, w, b, false),
            None => Some(true),
        };
        if inside_lo == Some(false) || inside_hi == Some(false) {
            continue;
        }
        let c = ctx.compare(RelOp::Neq, g.lhs, w);
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out.extend_from_slice(&g.unmerged);
    Some(out)
}

/// Merged disjunction of one group; `None` means the group covers everything.
fn merge_or(ctx: &mut Context, g: &BoundGroup) -> Option<Vec<ExprId>> {
    let (Some(lower), Some(upper)) = (
        select_bound(ctx, &g.lower, Ordering::Less),
        select_bound(ctx, &g.upper, Ordering::Greater),
    ) else {
        let mut out = Vec::new();
        for b in &g.lower {
            let op = if b.strict { RelOp::Gt } else { RelOp::Geq };
            out.push(ctx.compare(op, g.lhs, b.value));
        }
        for b in &g.upper {
            let op = if b.strict { RelOp::Lt } else { RelOp::Leq };
            out.push(ctx.compare(op, g.lhs, b.value));
        }
        for &v in &g.eq {
            out.push(ctx.compare(RelOp::Eq, g.lhs, v));
        }
        for &v in &g.neq {
            out.push(ctx.compare(RelOp::Neq, g.lhs, v));
        }
        out.extend_from_slice(&g.unmerged);
        return Some(out);
    };

    if let (Some(lo), Some(hi)) = (lower, upper) {
        match cmp_values(ctx, hi.value, lo.value) {
            Some(Ordering::Greater) => return None,
            Some(Ordering::Equal) if !(lo.strict && hi.strict) => return None,
            _ => {}
        }
    }

    let mut out = Vec::new();
    if let Some(lo) = lower {
        let op = if lo.strict { RelOp::Gt } else { RelOp::Geq };
        out.push(ctx.compare(op, g.lhs, lo.value));
    }
    if let Some(hi) = upper {
        let op = if hi.strict { RelOp::Lt } else { RelOp::Leq };
        out.push(ctx.compare(op, g.lhs, hi.value));
    }
    let mut seen_eq: Vec<ExprId> = Vec::new();
    for &v in &g.eq {
        let covered = lower.and_then(|b| satisfies(ctx, v, b, true)) == Some(true)
            || upper.and_then(|b| satisfies(ctx, v, b, false)) == Some(true);
        let duplicate = seen_eq
            .iter()
            .any(|&w| cmp_values(ctx, v, w) == Some(Ordering::Equal));
        if !covered && !duplicate {
            seen_eq.push(v);
            out.push(ctx.compare(RelOp::Eq, g.lhs, v));
        }
    }
    for &v in &g.neq {
        out.push(ctx.compare(RelOp::Neq, g.lhs, v));
    }
    out.extend_from_slice(&g.unmerged);
    Some(out)
}

fn collect_flat(ctx: &Context, items: Vec<ExprId>, conj: bool) -> Vec<ExprId> {
    let mut flat = Vec::with_capacity(items.len());
    let mut stack: Vec<ExprId> = items.into_iter().rev().collect();
    while let Some(i) = stack.pop() {
        match ctx.get(i) {
            Expr::And(inner) if conj => stack.extend(inner.iter().rev()),
            Expr::Or(inner) if !conj => stack.extend(inner.iter().rev()),
            _ => flat.push(i),
        }
    }
    flat
}

fn combine(ctx: &mut Context, items: Vec<ExprId>, conj: bool) -> ExprId {
    let absorbing = !conj;
    let mut slots: Vec<Slot> = Vec::new();
    let mut groups: Vec<BoundGroup> = Vec::new();
    let mut seen: Vec<ExprId> = Vec::new();

    for item in collect_flat(ctx, items, conj) {
        let item = fold_item(ctx, item);
        match as_boolean(ctx, item) {
            Some(b) if b == absorbing => return ctx.boolean(absorbing),
            Some(_) => continue,
            None => {}
        }
        if seen.contains(&item) {
            continue;
        }
        seen.push(item);
        match bound_of(ctx, item) {
            Some((lhs, op, value)) => {
                let idx = match groups.iter().position(|g| g.lhs == lhs) {
                    Some(i) => i,
                    None => {
                        groups.push(BoundGroup::new(lhs));
                        slots.push(Slot::Group(groups.len() - 1));
                        groups.len() - 1
                    }
                };
                groups[idx].push(op, value);
            }
            None => slots.push(Slot::Item(item)),
        }
    }

    let mut out: Vec<ExprId> = Vec::new();
    for slot in slots {
        match slot {
            Slot::Item(i) => out.push(i),
            Slot::Group(g) => {
                let merged = if conj {
                    merge_and(ctx, &groups[g])
                } else {
                    merge_or(ctx, &groups[g])
                };
                match merged {
                    Some(items) => {
                        for i in items {
                            if !out.contains(&i) {
                                out.push(i);
                            }
                        }
                    }
                    None => return ctx.boolean(absorbing),
                }
            }
        }
    }
    if conj {
        ctx.add(Expr::And(out))
    } else {
        ctx.add(Expr::Or(out))
    }
}

pub fn and_all<I: IntoIterator<Item = ExprId>>(ctx: &mut Context, items: I) -> ExprId {
    combine(ctx, items.into_iter().collect(), true)
}

pub fn or_all<I: IntoIterator<Item = ExprId>>(ctx: &mut Context, items: I) -> ExprId {
    combine(ctx, items.into_iter().collect(), false)
}

pub fn and(ctx: &mut Context, a: ExprId, b: ExprId) -> ExprId {
    and_all(ctx, [a, b])
}

pub fn or(ctx: &mut Context, a: ExprId, b: ExprId) -> ExprId {
    or_all(ctx, [a, b])
}

/// Logical negation, pushed through comparisons and connectives.
pub fn not(ctx: &mut Context, e: ExprId) -> ExprId {
    match ctx.get(e).clone() {
        Expr::Boolean(b) => ctx.boolean(!b),
        Expr::Compare(op, l, r) => compare(ctx, op.negate(), l, r),
        Expr::Not(inner) => inner,
        Expr::And(items) => {
            let neg: Vec<ExprId> = items.into_iter().map(|i| not(ctx, i)).collect();
            or_all(ctx, neg)
        }
        Expr::Or(items) => {
            let neg: Vec<ExprId> = items.into_iter().map(|i| not(ctx, i)).collect();
            and_all(ctx, neg)
        }
        _ => ctx.add(Expr::Not(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cas_ast::DisplayExpr;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    #[test]
    fn conjunction_keeps_tightest_bounds() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let three = ctx.num(3);
        let five = ctx.num(5);
        let a = ctx.compare(RelOp::Gt, x, two);
        let b = ctx.compare(RelOp::Geq, x, three);
        let c = ctx.compare(RelOp::Lt, x, five);
        let r = and_all(&mut ctx, [a, b, c]);
        assert_eq!(show(&ctx, r), "x >= 3 and x < 5");

        let d = ctx.compare(RelOp::Lt, x, two);
        let r = and_all(&mut ctx, [b, d]);
        assert_eq!(as_boolean(&ctx, r), Some(false));
    }

    #[test]
    fn equality_checked_against_bounds() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let zero = ctx.num(0);
        let eq = ctx.compare(RelOp::Eq, x, two);
        let pos = ctx.compare(RelOp::Gt, x, zero);
        let r = and(&mut ctx, eq, pos);
        assert_eq!(r, eq);
        let neg = ctx.compare(RelOp::Lt, x, zero);
        let r = and(&mut ctx, eq, neg);
        assert_eq!(as_boolean(&ctx, r), Some(false));
    }

    #[test]
    fn disjunction_of_complementary_rays_is_true() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let two = ctx.num(2);
        let a = ctx.compare(RelOp::Lt, x, two);
        let b = ctx.compare(RelOp::Geq, x, two);
        let r = or(&mut ctx, a, b);
        assert_eq!(as_boolean(&ctx, r), Some(true));
        let c = ctx.compare(RelOp::Gt, x, two);
        let r = or(&mut ctx, a, c);
        assert_eq!(show(&ctx, r), "x > 2 or x < 2");
    }

    #[test]
    fn decided_comparisons_fold() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let one = ctx.num(1);
        let two = ctx.num(2);
        let t = ctx.compare(RelOp::Lt, one, two);
        let f = ctx.compare(RelOp::Eq, one, two);
        let xc = ctx.compare(RelOp::Eq, x, one);
        let r = and_all(&mut ctx, [t, xc]);
        assert_eq!(r, xc);
        let r = or_all(&mut ctx, [f, xc]);
        assert_eq!(r, xc);
        let n = not(&mut ctx, xc);
        assert_eq!(show(&ctx, n), "x != 1");
    }
}
