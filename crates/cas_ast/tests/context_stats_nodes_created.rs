//! Context::stats().nodes_created counts arena growth only.
//!
//! Hash-consed hits, singleton collapse and placeholder scopes that reuse
//! existing nodes must not move the counter.

use cas_ast::{Assumption, Context, Expr};

fn created(ctx: &Context) -> u64 {
    ctx.stats().nodes_created
}

#[test]
fn repeated_unknown_is_shared() {
    let mut ctx = Context::new();
    let start = created(&ctx);
    let a = ctx.var("x");
    let b = ctx.var("x");
    assert_eq!(a, b);
    assert_eq!(created(&ctx), start + 1);
}

#[test]
fn assumption_distinguishes_unknowns() {
    let mut ctx = Context::new();
    let plain = ctx.var("x");
    let start = created(&ctx);
    let pos = ctx.var_with("x", Assumption::Positive);
    assert_ne!(plain, pos);
    assert_eq!(created(&ctx), start + 1);
}

#[test]
fn equal_numbers_hit_the_intern_table() {
    let mut ctx = Context::new();
    let half = ctx.rational(1, 2);
    let start = created(&ctx);
    // 2/4 normalizes to the same rational
    let again = ctx.rational(2, 4);
    assert_eq!(half, again);
    assert_eq!(created(&ctx), start);
}

#[test]
fn compound_node_counts_once() {
    let mut ctx = Context::new();
    let x = ctx.var("x");
    let y = ctx.var("y");
    let start = created(&ctx);
    let s1 = ctx.add(Expr::Add(vec![x, y]));
    let s2 = ctx.add_raw(Expr::Add(vec![x, y]));
    assert_eq!(s1, s2);
    assert_eq!(created(&ctx), start + 1);
}

#[test]
fn singleton_and_empty_forms_collapse() {
    let mut ctx = Context::new();
    let x = ctx.var("x");
    let zero = ctx.num(0);
    let one = ctx.num(1);
    let start = created(&ctx);

    assert_eq!(ctx.add(Expr::Mul(vec![x])), x);
    assert_eq!(ctx.add(Expr::Add(vec![])), zero);
    assert_eq!(ctx.add(Expr::Mul(vec![])), one);
    assert_eq!(created(&ctx), start);
}

#[test]
fn each_placeholder_scope_is_a_fresh_variable() {
    let mut ctx = Context::new();
    let start = created(&ctx);

    let first = ctx.with_placeholder("u", Assumption::NonNegative, |ctx, u| {
        assert!(ctx.is_placeholder(u));
        assert_eq!(ctx.live_placeholders(), 1);
        u
    });
    let second = ctx.with_placeholder("u", Assumption::NonNegative, |_, u| u);

    assert_ne!(first, second);
    assert_eq!(created(&ctx), start + 2);
    assert_eq!(ctx.live_placeholders(), 0);
}

#[test]
fn closed_placeholder_scopes_are_not_reclaimed() {
    let mut ctx = Context::new();
    let start = created(&ctx);
    let ids: Vec<_> = (0..4)
        .map(|_| ctx.with_placeholder("u", Assumption::None, |_, u| u))
        .collect();
    for (i, a) in ids.iter().enumerate() {
        assert!(ids[i + 1..].iter().all(|b| a != b));
    }
    assert_eq!(created(&ctx), start + 4);
}
