//! Tree walks over the arena.
//!
//! Counting and search use explicit stacks, so deep sums built by the
//! simplifier cannot overflow the call stack. Substitution rebuilds only
//! the spine that changed and returns `root` untouched otherwise.

use crate::expression::{Context, Expr, ExprId};
use rustc_hash::FxHashSet;

/// Size of the tree under `root`; shared subtrees count once per use.
pub fn count_all_nodes(ctx: &Context, root: ExprId) -> usize {
    let mut n = 0;
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        n += 1;
        push_children(ctx.get(id), &mut stack);
    }
    n
}

#[inline]
fn push_children(node: &Expr, stack: &mut Vec<ExprId>) {
    match node {
        Expr::Add(items)
        | Expr::Mul(items)
        | Expr::And(items)
        | Expr::Or(items)
        | Expr::Xor(items)
        | Expr::Function(_, items) => stack.extend(items),
        Expr::Pow(l, r) | Expr::Compare(_, l, r) => {
            stack.push(*l);
            stack.push(*r);
        }
        Expr::Not(e) => stack.push(*e),
        Expr::Number(_)
        | Expr::Constant(_)
        | Expr::Symbol(_)
        | Expr::Variable(_)
        | Expr::Unit(_)
        | Expr::Boolean(_)
        | Expr::Undefined
        | Expr::Aborted => {}
    }
}

/// Whether `target` occurs anywhere in the tree rooted at `root`.
pub fn contains_subexpr(ctx: &Context, root: ExprId, target: ExprId) -> bool {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if id == target {
            return true;
        }
        push_children(ctx.get(id), &mut stack);
    }
    false
}

/// Collect unknowns (symbols, variables, units) in first-discovery order
/// of a left-to-right walk.
///
/// With `skip_functions`, arguments of function calls are not entered:
/// those unknowns are opaque to polynomial arithmetic.
pub fn collect_unknowns(ctx: &Context, root: ExprId, skip_functions: bool) -> Vec<ExprId> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();
    let mut stack = vec![root];
    let mut children = Vec::new();

    while let Some(id) = stack.pop() {
        let node = ctx.get(id);
        if node.is_unknown() {
            if seen.insert(id) {
                out.push(id);
            }
            continue;
        }
        if skip_functions && matches!(node, Expr::Function(_, _)) {
            continue;
        }
        children.clear();
        push_children(node, &mut children);
        // reverse so the leftmost child is visited first
        stack.extend(children.iter().rev());
    }

    out
}

/// Substitute occurrences of `target` with `replacement` anywhere in the tree.
///
/// Returns the original `root` when nothing changed. The rebuilt nodes are
/// stored with `Context::add`, so no canonicalization beyond singleton
/// collapse happens here.
pub fn substitute_expr_by_id(
    ctx: &mut Context,
    root: ExprId,
    target: ExprId,
    replacement: ExprId,
) -> ExprId {
    if root == target {
        return replacement;
    }

    let expr = ctx.get(root).clone();
    let mut sub = |ctx: &mut Context, id: ExprId| substitute_expr_by_id(ctx, id, target, replacement);

    match expr {
        Expr::Add(items) => rebuild_nary(ctx, root, &items, &mut sub, Expr::Add),
        Expr::Mul(items) => rebuild_nary(ctx, root, &items, &mut sub, Expr::Mul),
        Expr::And(items) => rebuild_nary(ctx, root, &items, &mut sub, Expr::And),
        Expr::Or(items) => rebuild_nary(ctx, root, &items, &mut sub, Expr::Or),
        Expr::Xor(items) => rebuild_nary(ctx, root, &items, &mut sub, Expr::Xor),
        Expr::Function(name, args) => {
            rebuild_nary(ctx, root, &args, &mut sub, |a| Expr::Function(name, a))
        }
        Expr::Pow(b, e) => {
            let new_b = sub(ctx, b);
            let new_e = sub(ctx, e);
            if new_b != b || new_e != e {
                ctx.add(Expr::Pow(new_b, new_e))
            } else {
                root
            }
        }
        Expr::Compare(op, l, r) => {
            let new_l = sub(ctx, l);
            let new_r = sub(ctx, r);
            if new_l != l || new_r != r {
                ctx.add(Expr::Compare(op, new_l, new_r))
            } else {
                root
            }
        }
        Expr::Not(inner) => {
            let new_inner = sub(ctx, inner);
            if new_inner != inner {
                ctx.add(Expr::Not(new_inner))
            } else {
                root
            }
        }
        Expr::Number(_)
        | Expr::Constant(_)
        | Expr::Symbol(_)
        | Expr::Variable(_)
        | Expr::Unit(_)
        | Expr::Boolean(_)
        | Expr::Undefined
        | Expr::Aborted => root,
    }
}

fn rebuild_nary<S, B>(
    ctx: &mut Context,
    root: ExprId,
    items: &[ExprId],
    sub: &mut S,
    build: B,
) -> ExprId
where
    S: FnMut(&mut Context, ExprId) -> ExprId,
    B: FnOnce(Vec<ExprId>) -> Expr,
{
    let mut changed = false;
    let mut new_items = Vec::with_capacity(items.len());
    for &item in items {
        let new_item = sub(ctx, item);
        changed |= new_item != item;
        new_items.push(new_item);
    }
    if changed {
        ctx.add(build(new_items))
    } else {
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_subtree_counts_per_use() {
        let mut ctx = Context::new();
        let a = ctx.var("a");
        let b = ctx.var("b");
        // (a + b) * (a + b): the sum is one arena node used twice
        let ab = ctx.add(Expr::Add(vec![a, b]));
        let sq = ctx.add(Expr::Mul(vec![ab, ab]));
        assert_eq!(count_all_nodes(&ctx, sq), 7);
    }

    #[test]
    fn long_sum_chain_is_walked_iteratively() {
        let mut ctx = Context::new();
        let mut chain = ctx.var("t0");
        for i in 1..=10_000 {
            let t = ctx.var(&format!("t{}", i));
            chain = ctx.add(Expr::Add(vec![t, chain]));
        }
        assert_eq!(count_all_nodes(&ctx, chain), 20_001);
        let t0 = ctx.var("t0");
        assert!(contains_subexpr(&ctx, chain, t0));
    }

    #[test]
    fn unknowns_in_reading_order_skipping_calls() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let z = ctx.var("z");
        let sin_z = ctx.call("sin", vec![z]);
        let yx = ctx.add(Expr::Mul(vec![y, x]));
        let root = ctx.add(Expr::Add(vec![yx, sin_z, x]));

        assert_eq!(collect_unknowns(&ctx, root, true), vec![y, x]);
        assert_eq!(collect_unknowns(&ctx, root, false), vec![y, x, z]);
    }

    #[test]
    fn substitution_keeps_untouched_branches() {
        let mut ctx = Context::new();
        let x = ctx.var("x");
        let y = ctx.var("y");
        let one = ctx.num(1);
        let xp1 = ctx.add(Expr::Add(vec![x, one]));
        let root = ctx.add(Expr::Mul(vec![xp1, y]));

        let replaced = substitute_expr_by_id(&mut ctx, root, x, y);
        let expected_inner = ctx.add(Expr::Add(vec![y, one]));
        let expected = ctx.add(Expr::Mul(vec![expected_inner, y]));
        assert_eq!(replaced, expected);

        let seven = ctx.num(7);
        let unchanged = substitute_expr_by_id(&mut ctx, root, seven, y);
        assert_eq!(unchanged, root);
        assert!(contains_subexpr(&ctx, root, x));
        assert!(!contains_subexpr(&ctx, replaced, x));
    }
}
