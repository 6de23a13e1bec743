//! Source-level operators.
use std::fmt;

use crate::types::FunctionId;

/// Operator of a [`Constraint`][crate::constraint::Constraint] node.
///
/// These are the operators a caller writes; the mapping to backend formula kinds
/// depends on the sort of the operands and happens during lowering.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    TrueDiv,
    FloorDiv,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    MatMul,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    /// Boolean (or bitwise) negation; the only unary operator besides [`Op::Apply`].
    Not,

    /// Named-function application marker.
    Apply(FunctionId),
}

impl Op {
    pub fn is_unary(self) -> bool {
        matches!(self, Op::Not | Op::Apply(_))
    }

    pub fn is_comparison(self) -> bool {
        matches!(self, Op::Eq | Op::Ne | Op::Lt | Op::Le | Op::Gt | Op::Ge)
    }

    /// Operators that force a boolean sort when nothing else determines it.
    pub fn is_logical(self) -> bool {
        matches!(self, Op::BitAnd | Op::BitOr | Op::Not)
    }

    /// Whether `a op b` and `b op a` denote the same value.
    pub fn is_commutative(self) -> bool {
        matches!(
            self,
            Op::Add | Op::Mul | Op::BitAnd | Op::BitOr | Op::BitXor | Op::Eq | Op::Ne
        )
    }

    /// The operator with its arguments exchanged: `a op b == b op.mirror() a`.
    pub fn mirror(self) -> Option<Op> {
        match self {
            Op::Lt => Some(Op::Gt),
            Op::Le => Some(Op::Ge),
            Op::Gt => Some(Op::Lt),
            Op::Ge => Some(Op::Le),
            op if op.is_commutative() => Some(op),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::TrueDiv => "/",
            Op::FloorDiv => "//",
            Op::Mod => "%",
            Op::BitAnd => "&",
            Op::BitOr => "|",
            Op::BitXor => "^",
            Op::Shl => "<<",
            Op::Shr => ">>",
            Op::MatMul => "@",
            Op::Eq => "==",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Not => "!",
            Op::Apply(_) => "apply",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Apply(id) => write!(f, "apply[{}]", id),
            op => write!(f, "{}", op.symbol()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity() {
        assert!(Op::Not.is_unary());
        assert!(Op::Apply(FunctionId::new(0)).is_unary());
        assert!(!Op::Add.is_unary());
    }

    #[test]
    fn test_logical() {
        assert!(Op::BitAnd.is_logical());
        assert!(Op::BitOr.is_logical());
        assert!(Op::Not.is_logical());
        assert!(!Op::BitXor.is_logical());
        assert!(!Op::Eq.is_logical());
    }

    #[test]
    fn test_mirror() {
        assert_eq!(Op::Lt.mirror(), Some(Op::Gt));
        assert_eq!(Op::Ge.mirror(), Some(Op::Le));
        assert_eq!(Op::Mul.mirror(), Some(Op::Mul));
        assert_eq!(Op::Sub.mirror(), None);
        assert_eq!(Op::Shl.mirror(), None);
    }
}
