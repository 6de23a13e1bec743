//! Constraint trees.
//!
//! A [`Constraint`] is an immutable node `left <op> right` whose children are
//! symbolic values, other constraints or literals. Children are shared through [`Rc`],
//! so the same sub-expression may be referenced from several clause lists while an
//! expression is being built; equality is always structural, never by address.
//!
//! The left child is a [`Subject`]: a value or a constraint, never a literal.
//! Hence every constraint has a symbolic value at the bottom of its left spine,
//! which is the *owner* of the constraint (see [`Constraint::owner`]).
use std::fmt;
use std::rc::Rc;

use crate::op::Op;
use crate::types::{FunctionId, ValueId};

/// A native literal.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Literal {
    Bool(bool),
    Int(i64),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Int(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Int(value as i64)
    }
}

impl From<u32> for Literal {
    fn from(value: u32) -> Self {
        Literal::Int(value as i64)
    }
}

/// Left child of a constraint.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Subject {
    Value(ValueId),
    Constraint(Rc<Constraint>),
}

/// Any child of a constraint.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Operand {
    Value(ValueId),
    Constraint(Rc<Constraint>),
    Literal(Literal),
}

impl Operand {
    /// Converts into a [`Subject`], unless this is a literal.
    pub fn into_subject(self) -> Result<Subject, Literal> {
        match self {
            Operand::Value(v) => Ok(Subject::Value(v)),
            Operand::Constraint(c) => Ok(Subject::Constraint(c)),
            Operand::Literal(lit) => Err(lit),
        }
    }

    pub fn as_constraint(&self) -> Option<&Rc<Constraint>> {
        match self {
            Operand::Constraint(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Operand::Literal(_))
    }
}

impl From<Subject> for Operand {
    fn from(subject: Subject) -> Self {
        match subject {
            Subject::Value(v) => Operand::Value(v),
            Subject::Constraint(c) => Operand::Constraint(c),
        }
    }
}

impl From<Literal> for Operand {
    fn from(lit: Literal) -> Self {
        Operand::Literal(lit)
    }
}

impl From<Rc<Constraint>> for Operand {
    fn from(c: Rc<Constraint>) -> Self {
        Operand::Constraint(c)
    }
}

/// An expression tree node `left <op> right`.
///
/// `right` is `None` exactly for unary operators ([`Op::Not`], [`Op::Apply`]).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Constraint {
    left: Subject,
    op: Op,
    right: Option<Operand>,
}

impl Constraint {
    pub fn new(left: Subject, op: Op, right: Option<Operand>) -> Self {
        debug_assert_eq!(
            op.is_unary(),
            right.is_none(),
            "operator `{}` has the wrong number of operands",
            op
        );
        Self { left, op, right }
    }

    pub fn left(&self) -> &Subject {
        &self.left
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn right(&self) -> Option<&Operand> {
        self.right.as_ref()
    }

    /// Returns the symbolic value at the bottom of the left spine.
    pub fn owner(&self) -> ValueId {
        let mut current = self;
        loop {
            match &current.left {
                Subject::Value(v) => return *v,
                Subject::Constraint(c) => current = c,
            }
        }
    }

    /// Returns the distinct symbolic values anywhere in this tree, ordered by identity.
    pub fn values(&self) -> Vec<ValueId> {
        let mut values = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match &node.left {
                Subject::Value(v) => values.push(*v),
                Subject::Constraint(c) => stack.push(c),
            }
            match &node.right {
                Some(Operand::Value(v)) => values.push(*v),
                Some(Operand::Constraint(c)) => stack.push(c),
                Some(Operand::Literal(_)) | None => {}
            }
        }
        values.sort();
        values.dedup();
        values
    }

    /// Number of constraint nodes in this tree.
    pub fn size(&self) -> usize {
        let left = match &self.left {
            Subject::Constraint(c) => c.size(),
            Subject::Value(_) => 0,
        };
        let right = match &self.right {
            Some(Operand::Constraint(c)) => c.size(),
            _ => 0,
        };
        1 + left + right
    }
}

/// Renders the tree with raw identifiers, e.g. `((#0 + (#1 * 2)) == 7)`.
///
/// Use [`Session::show`][crate::session::Session::show] to render with names.
impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_constraint(f, self, &|f, leaf| match leaf {
            Leaf::Value(v) => write!(f, "{}", v),
            Leaf::Function(id) => write!(f, "{}", id),
        })
    }
}

/// A named leaf of a rendered constraint.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Leaf {
    Value(ValueId),
    Function(FunctionId),
}

pub(crate) fn write_constraint<W, N>(w: &mut W, c: &Constraint, name: &N) -> fmt::Result
where
    W: fmt::Write,
    N: Fn(&mut W, Leaf) -> fmt::Result,
{
    let write_subject = |w: &mut W, s: &Subject| match s {
        Subject::Value(v) => name(w, Leaf::Value(*v)),
        Subject::Constraint(c) => write_constraint(w, c, name),
    };
    match (c.op, &c.right) {
        (Op::Apply(id), _) => {
            name(w, Leaf::Function(id))?;
            write!(w, "(")?;
            write_subject(w, &c.left)?;
            write!(w, ")")
        }
        (op, None) => {
            write!(w, "({}", op.symbol())?;
            write_subject(w, &c.left)?;
            write!(w, ")")
        }
        (op, Some(right)) => {
            write!(w, "(")?;
            write_subject(w, &c.left)?;
            write!(w, " {} ", op.symbol())?;
            match right {
                Operand::Value(v) => name(w, Leaf::Value(*v))?,
                Operand::Constraint(c) => write_constraint(w, c, name)?,
                Operand::Literal(lit) => write!(w, "{}", lit)?,
            }
            write!(w, ")")
        }
    }
}
