//! Infix sugar for building constraints.
//!
//! Operators on [`Var`] and [`Expr`] do not touch any session: they build a lazy
//! [`Expr`] tree. [`Session::eval`] then replays the tree bottom-up, left operand
//! before right operand, which is exactly the order in which an eager infix evaluator
//! would have built the sub-expressions. Each replayed node goes through
//! [`Session::apply`], so clause frontiers are rewritten as the expression grows.
//!
//! ```
//! use smtfe_rs::session::Session;
//!
//! let s = Session::default();
//! let a = s.mk_var("a");
//! let b = s.mk_var("b");
//!
//! // a + 2*b == 7
//! s.eval((a + 2 * b).eq(7));
//!
//! assert_eq!(s.clauses(a).len(), 1);
//! assert!(s.clauses(b).is_empty());
//! assert_eq!(s.show(&s.clauses(a)[0]), "((a + (b * 2)) == 7)");
//! ```
//!
//! Comparisons cannot be expressed through `PartialEq`/`PartialOrd` (they must return
//! an expression, not a `bool`), so they are builder methods: [`Expr::eq`], [`Expr::lt`],
//! and so on. Boolean negation is `!`.
//!
//! [`Session::eval`]: crate::session::Session::eval
//! [`Session::apply`]: crate::session::Session::apply
use std::ops::{Add, BitAnd, BitOr, BitXor, Div, Mul, Not, Rem, Shl, Shr, Sub};
use std::rc::Rc;

use crate::constraint::{Constraint, Literal};
use crate::op::Op;
use crate::types::ValueId;

/// Handle of a symbolic value (plain variable or bit-vector).
///
/// A `Var` is only meaningful together with the session that created it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Var(ValueId);

impl Var {
    pub(crate) const fn new(id: ValueId) -> Self {
        Var(id)
    }

    pub const fn id(self) -> ValueId {
        self.0
    }
}

/// A not-yet-evaluated operator application.
#[derive(Debug, Clone)]
pub struct Pending {
    pub(crate) left: Expr,
    pub(crate) op: Op,
    pub(crate) right: Option<Expr>,
}

/// Lazy expression.
#[derive(Debug, Clone)]
pub enum Expr {
    Value(ValueId),
    Literal(Literal),
    Constraint(Rc<Constraint>),
    Pending(Box<Pending>),
}

impl Expr {
    fn binary(left: Expr, op: Op, right: impl Into<Expr>) -> Expr {
        Expr::Pending(Box::new(Pending {
            left,
            op,
            right: Some(right.into()),
        }))
    }

    fn unary(left: Expr, op: Op) -> Expr {
        Expr::Pending(Box::new(Pending {
            left,
            op,
            right: None,
        }))
    }
}

impl From<Var> for Expr {
    fn from(var: Var) -> Self {
        Expr::Value(var.0)
    }
}

impl From<Rc<Constraint>> for Expr {
    fn from(c: Rc<Constraint>) -> Self {
        Expr::Constraint(c)
    }
}

impl From<&Rc<Constraint>> for Expr {
    fn from(c: &Rc<Constraint>) -> Self {
        Expr::Constraint(Rc::clone(c))
    }
}

impl From<Literal> for Expr {
    fn from(lit: Literal) -> Self {
        Expr::Literal(lit)
    }
}

macro_rules! impl_from_native {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Expr {
                fn from(value: $t) -> Self {
                    Expr::Literal(Literal::from(value))
                }
            }
        )*
    };
}

impl_from_native!(bool, i32, i64, u32);

// Builder methods shared by `Var` and `Expr`.
macro_rules! impl_builders {
    ($t:ty) => {
        impl $t {
            pub fn eq(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Eq, rhs)
            }

            pub fn ne(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Ne, rhs)
            }

            pub fn lt(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Lt, rhs)
            }

            pub fn le(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Le, rhs)
            }

            pub fn gt(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Gt, rhs)
            }

            pub fn ge(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::Ge, rhs)
            }

            /// Division rounding toward negative infinity, the integer counterpart of `%`.
            ///
            /// `/` builds true division, which has no integer backend operator: lowering it
            /// on integers fails. On bit-vectors both are unsigned division.
            pub fn floor_div(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::FloorDiv, rhs)
            }

            /// Matrix multiplication. Has no backend counterpart: lowering it fails.
            pub fn mat_mul(self, rhs: impl Into<Expr>) -> Expr {
                Expr::binary(self.into(), Op::MatMul, rhs)
            }
        }

        impl Not for $t {
            type Output = Expr;

            fn not(self) -> Self::Output {
                Expr::unary(self.into(), Op::Not)
            }
        }
    };
}

impl_builders!(Var);
impl_builders!(Expr);

macro_rules! impl_binary_ops {
    ($t:ty; $($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl<R: Into<Expr>> $trait<R> for $t {
                type Output = Expr;

                fn $method(self, rhs: R) -> Self::Output {
                    Expr::binary(self.into(), $op, rhs)
                }
            }
        )*
    };
}

impl_binary_ops!(Var;
    Add::add => Op::Add,
    Sub::sub => Op::Sub,
    Mul::mul => Op::Mul,
    Div::div => Op::TrueDiv,
    Rem::rem => Op::Mod,
    BitAnd::bitand => Op::BitAnd,
    BitOr::bitor => Op::BitOr,
    BitXor::bitxor => Op::BitXor,
    Shl::shl => Op::Shl,
    Shr::shr => Op::Shr,
);

impl_binary_ops!(Expr;
    Add::add => Op::Add,
    Sub::sub => Op::Sub,
    Mul::mul => Op::Mul,
    Div::div => Op::TrueDiv,
    Rem::rem => Op::Mod,
    BitAnd::bitand => Op::BitAnd,
    BitOr::bitor => Op::BitOr,
    BitXor::bitxor => Op::BitXor,
    Shl::shl => Op::Shl,
    Shr::shr => Op::Shr,
);

// Literal on the left (`2 * b`), only for operators where swapping the operands
// keeps the meaning. The session applies them to the symbolic side.
macro_rules! impl_reflected_ops {
    ($lit:ty; $($trait:ident :: $method:ident => $op:expr),* $(,)?) => {
        $(
            impl $trait<Var> for $lit {
                type Output = Expr;

                fn $method(self, rhs: Var) -> Self::Output {
                    Expr::binary(self.into(), $op, rhs)
                }
            }

            impl $trait<Expr> for $lit {
                type Output = Expr;

                fn $method(self, rhs: Expr) -> Self::Output {
                    Expr::binary(self.into(), $op, rhs)
                }
            }
        )*
    };
}

impl_reflected_ops!(i32; Add::add => Op::Add, Mul::mul => Op::Mul);
impl_reflected_ops!(i64; Add::add => Op::Add, Mul::mul => Op::Mul);
impl_reflected_ops!(bool;
    BitAnd::bitand => Op::BitAnd,
    BitOr::bitor => Op::BitOr,
    BitXor::bitxor => Op::BitXor,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(e: &Expr) -> String {
        match e {
            Expr::Value(v) => format!("{}", v),
            Expr::Literal(lit) => format!("{}", lit),
            Expr::Constraint(c) => format!("{}", c),
            Expr::Pending(p) => match &p.right {
                Some(r) => format!("({} {} {})", shape(&p.left), p.op.symbol(), shape(r)),
                None => format!("({}{})", p.op.symbol(), shape(&p.left)),
            },
        }
    }

    #[test]
    fn test_infix_builds_lazy_tree() {
        let a = Var::new(ValueId::new(0));
        let b = Var::new(ValueId::new(1));
        let e = (a + b * 2).eq(7);
        assert_eq!(shape(&e), "((#0 + (#1 * 2)) == 7)");
    }

    #[test]
    fn test_reflected_literal_stays_on_the_left() {
        let b = Var::new(ValueId::new(1));
        let e = 2 * b;
        assert_eq!(shape(&e), "(2 * #1)");
    }

    #[test]
    fn test_not_and_bitwise() {
        let a = Var::new(ValueId::new(0));
        let b = Var::new(ValueId::new(1));
        let e = (a & b).eq(!(!a | !b));
        assert_eq!(shape(&e), "((#0 & #1) == (!((!#0) | (!#1))))");
    }
}
