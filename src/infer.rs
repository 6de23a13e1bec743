//! Sort inference over untyped constraint trees.
//!
//! The inferred sort of a subtree is the sort of the symbols and literals it combines,
//! which is what lowering needs to pick symbol and literal constructors:
//!
//! - a literal has its native sort;
//! - a bare value has no sort of its own (it is determined by context);
//! - a constraint takes the sort of its left child, else of its right child, else
//!   `Bool` if its operator is logical (`&`, `|`, `!`, or a named-function application).
//!
//! Bit-vector sorts are never inferred: they come from the declared width of a
//! bit-vector value, which lowering consults directly.
use crate::constraint::{Constraint, Literal, Operand, Subject};
use crate::op::Op;
use crate::types::Sort;

pub fn literal_sort(lit: Literal) -> Sort {
    match lit {
        Literal::Bool(_) => Sort::Bool,
        Literal::Int(_) => Sort::Int,
    }
}

pub fn infer_operand(operand: &Operand) -> Option<Sort> {
    match operand {
        Operand::Literal(lit) => Some(literal_sort(*lit)),
        Operand::Value(_) => None,
        Operand::Constraint(c) => infer(c),
    }
}

pub fn infer(c: &Constraint) -> Option<Sort> {
    let left = match c.left() {
        Subject::Value(_) => None,
        Subject::Constraint(l) => infer(l),
    };
    left.or_else(|| c.right().and_then(infer_operand)).or_else(|| {
        if c.op().is_logical() || matches!(c.op(), Op::Apply(_)) {
            Some(Sort::Bool)
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::session::Session;

    fn top(s: &Session, e: crate::expr::Expr) -> Rc<Constraint> {
        match s.eval(e) {
            Operand::Constraint(c) => c,
            other => panic!("expected a constraint, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_decides() {
        let s = Session::default();
        let a = s.mk_var("a");
        assert_eq!(infer(&top(&s, a.gt(0))), Some(Sort::Int));
        assert_eq!(infer(&top(&s, a.eq(true))), Some(Sort::Bool));
    }

    #[test]
    fn test_nested_literal_decides() {
        let s = Session::default();
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        assert_eq!(infer(&top(&s, (a + b * 2).eq(b))), Some(Sort::Int));
    }

    #[test]
    fn test_logical_operator_defaults_to_bool() {
        let s = Session::default();
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        assert_eq!(infer(&top(&s, a & b)), Some(Sort::Bool));
        assert_eq!(infer(&top(&s, !a)), Some(Sort::Bool));
        assert_eq!(infer(&top(&s, (a & b).eq(!(!a | !b)))), Some(Sort::Bool));
    }

    #[test]
    fn test_undetermined() {
        let s = Session::default();
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        assert_eq!(infer(&top(&s, a.eq(b))), None);
        assert_eq!(infer(&top(&s, a ^ b)), None);
    }

    #[test]
    fn test_values_have_no_sort() {
        let s = Session::default();
        let a = s.mk_var("a");
        assert_eq!(infer_operand(&Operand::Value(a.id())), None);
        assert_eq!(infer_operand(&Operand::Literal(Literal::Int(3))), Some(Sort::Int));
    }
}
