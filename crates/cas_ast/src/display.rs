//! Display formatting for expressions
//!
//! `DisplayExpr` renders a node with its `Context` in a compact, unambiguous
//! infix form. It is a diagnostic rendering (tracing fields, test failure
//! messages), not a typesetting layer.

use crate::{Context, Expr, ExprId};
use num_rational::BigRational;
use num_traits::{One, Signed};
use std::fmt;

pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

impl<'a> DisplayExpr<'a> {
    pub fn new(context: &'a Context, id: ExprId) -> Self {
        Self { context, id }
    }

    fn child(&self, id: ExprId) -> DisplayExpr<'a> {
        DisplayExpr {
            context: self.context,
            id,
        }
    }

    fn write_child(&self, f: &mut fmt::Formatter<'_>, id: ExprId, min_prec: u8) -> fmt::Result {
        if precedence(self.context, id) < min_prec {
            write!(f, "({})", self.child(id))
        } else {
            write!(f, "{}", self.child(id))
        }
    }

    fn write_joined(&self, f: &mut fmt::Formatter<'_>, items: &[ExprId], sep: &str) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", sep)?;
            }
            self.write_child(f, *item, PREC_LOGIC_ATOM)?;
        }
        Ok(())
    }

    /// Write a sum term without its leading sign.
    fn write_term_abs(&self, f: &mut fmt::Formatter<'_>, id: ExprId) -> fmt::Result {
        match self.context.get(id) {
            Expr::Number(n) => write!(f, "{}", n.abs()),
            Expr::Mul(items) => match self.context.get(items[0]) {
                Expr::Number(n) if n.is_negative() => {
                    let rest = &items[1..];
                    let abs = n.abs();
                    if !abs.is_one() {
                        write_number_factor(f, &abs)?;
                        write!(f, "*")?;
                    }
                    self.write_factors(f, rest)
                }
                _ => write!(f, "{}", self.child(id)),
            },
            _ => write!(f, "{}", self.child(id)),
        }
    }

    fn write_factors(&self, f: &mut fmt::Formatter<'_>, items: &[ExprId]) -> fmt::Result {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, "*")?;
            }
            match self.context.get(*item) {
                Expr::Number(n) => write_number_factor(f, n)?,
                _ => self.write_child(f, *item, PREC_MUL + 1)?,
            }
        }
        Ok(())
    }
}

const PREC_LOGIC: u8 = 0;
const PREC_LOGIC_ATOM: u8 = 1;
const PREC_CMP: u8 = 2;
const PREC_ADD: u8 = 3;
const PREC_MUL: u8 = 4;
const PREC_POW: u8 = 5;
const PREC_ATOM: u8 = 6;

fn precedence(ctx: &Context, id: ExprId) -> u8 {
    match ctx.get(id) {
        Expr::And(_) | Expr::Or(_) | Expr::Xor(_) => PREC_LOGIC,
        Expr::Compare(..) => PREC_CMP,
        Expr::Add(_) => PREC_ADD,
        Expr::Mul(_) => PREC_MUL,
        Expr::Number(n) if n.is_negative() || !n.is_integer() => PREC_MUL,
        Expr::Pow(_, _) => PREC_POW,
        _ => PREC_ATOM,
    }
}

fn is_negative_term(ctx: &Context, id: ExprId) -> bool {
    match ctx.get(id) {
        Expr::Number(n) => n.is_negative(),
        Expr::Mul(items) => {
            matches!(items.first().map(|&c| ctx.get(c)), Some(Expr::Number(n)) if n.is_negative())
        }
        _ => false,
    }
}

fn write_number_factor(f: &mut fmt::Formatter<'_>, n: &BigRational) -> fmt::Result {
    if n.is_integer() && !n.is_negative() {
        write!(f, "{}", n)
    } else {
        write!(f, "({})", n)
    }
}

impl<'a> fmt::Display for DisplayExpr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.context;
        match ctx.get(self.id) {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Constant(c) => write!(f, "{}", c.name()),
            Expr::Symbol(_) | Expr::Variable(_) | Expr::Unit(_) => {
                write!(f, "{}", ctx.unknown_name(self.id).unwrap_or("?"))
            }
            Expr::Add(terms) => {
                for (i, term) in terms.iter().enumerate() {
                    let neg = is_negative_term(ctx, *term);
                    match (i, neg) {
                        (0, true) => {
                            write!(f, "-")?;
                            self.write_term_abs(f, *term)?;
                        }
                        (0, false) => self.write_child(f, *term, PREC_ADD + 1)?,
                        (_, true) => {
                            write!(f, " - ")?;
                            self.write_term_abs(f, *term)?;
                        }
                        (_, false) => {
                            write!(f, " + ")?;
                            self.write_child(f, *term, PREC_ADD + 1)?;
                        }
                    }
                }
                Ok(())
            }
            Expr::Mul(items) => {
                if is_negative_term(ctx, self.id) {
                    write!(f, "-")?;
                    self.write_term_abs(f, self.id)
                } else {
                    self.write_factors(f, items)
                }
            }
            Expr::Pow(b, e) => {
                self.write_child(f, *b, PREC_ATOM)?;
                write!(f, "^")?;
                self.write_child(f, *e, PREC_ATOM)
            }
            Expr::Function(name, args) => {
                write!(f, "{}(", ctx.sym_name(*name))?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", self.child(*arg))?;
                }
                write!(f, ")")
            }
            Expr::Compare(op, l, r) => {
                self.write_child(f, *l, PREC_ADD)?;
                write!(f, " {} ", op)?;
                self.write_child(f, *r, PREC_ADD)
            }
            Expr::And(items) => self.write_joined(f, items, " and "),
            Expr::Or(items) => self.write_joined(f, items, " or "),
            Expr::Xor(items) => self.write_joined(f, items, " xor "),
            Expr::Not(inner) => {
                write!(f, "not ")?;
                self.write_child(f, *inner, PREC_ATOM)
            }
            Expr::Boolean(b) => write!(f, "{}", b),
            Expr::Undefined => write!(f, "undefined"),
            Expr::Aborted => write!(f, "aborted"),
        }
    }
}
