//! The constraint-building session.
//!
//! A [`Session`] is the manager of everything built so far: symbolic values, their
//! live clauses, named functions, cached backend symbols and the solver backend.
//! All operations take `&self`; mutable state lives behind [`RefCell`]s, so a session
//! is confined to a single thread.
//!
//! # Clause frontiers
//!
//! Every symbolic value keeps an ordered list of *live* clauses: the top-level
//! constraints asserted about it that have not been absorbed into a larger expression.
//! [`Session::apply`] maintains this frontier while an expression grows left to right:
//!
//! 1. The owner of the new constraint is the value at the bottom of the left spine.
//! 2. If the left operand is a constraint, it is retracted from the owner's clauses.
//! 3. If the right operand is a constraint, it is retracted from its own owner's clauses.
//! 4. The new constraint is appended to the owner's clauses.
//!
//! Retraction compares constraints structurally, so equal sub-expressions built
//! separately are retracted as well.
use std::cell::RefCell;
use std::fmt::{Debug, Write};
use std::rc::Rc;

use log::debug;

use crate::backend::z3::Z3Solver;
use crate::backend::Solver;
use crate::constraint::{write_constraint, Constraint, Leaf, Operand, Subject};
use crate::expr::{Expr, Pending, Var};
use crate::function::Function;
use crate::op::Op;
use crate::registry::{Registry, ValueKind};
use crate::translate::SymbolTable;

/// Configuration of a [`Session`].
///
/// # Examples
///
/// ```
/// use smtfe_rs::session::{Session, SessionConfig};
///
/// let config = SessionConfig {
///     fresh_prefix: "tmp",
///     ..SessionConfig::default()
/// };
/// let s = Session::new(config);
/// let x = s.mk_fresh_var();
/// assert!(s.name(x).starts_with("tmp"));
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Prefix of auto-generated value names (default: "v!")
    pub fresh_prefix: &'static str,
    /// Minimum number of hex digits of rendered bit-vector values (default: `None`, meaning `ceil(width / 4)`)
    pub hex_digits: Option<usize>,
    /// Timeout of the default solver backend, in milliseconds (default: `None`)
    pub timeout_ms: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fresh_prefix: "v!",
            hex_digits: None,
            timeout_ms: None,
        }
    }
}

pub struct Session {
    pub(crate) registry: RefCell<Registry>,
    pub(crate) symbols: RefCell<SymbolTable>,
    solver: Box<dyn Solver>,
    config: SessionConfig,
}

impl Session {
    /// Creates a session backed by Z3.
    pub fn new(config: SessionConfig) -> Self {
        let solver = Z3Solver::new(config.timeout_ms);
        Self::with_solver(config, solver)
    }

    /// Creates a session backed by a custom solver.
    pub fn with_solver(config: SessionConfig, solver: impl Solver + 'static) -> Self {
        Self {
            registry: RefCell::new(Registry::default()),
            symbols: RefCell::new(SymbolTable::default()),
            solver: Box::new(solver),
            config,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(SessionConfig::default())
    }
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("Session")
            .field("variables", &registry.variables().len())
            .field("bitvecs", &registry.bitvecs().len())
            .field("functions", &registry.functions().len())
            .field("symbols", &self.symbols.borrow().len())
            .finish()
    }
}

impl Session {
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn solver(&self) -> &dyn Solver {
        self.solver.as_ref()
    }

    fn mk_value(&self, name: Option<&str>, kind: ValueKind) -> Var {
        let mut registry = self.registry.borrow_mut();
        let name: Rc<str> = match name {
            Some(name) => name.into(),
            None => format!("{}{}", self.config.fresh_prefix, registry.peek_value_id().id()).into(),
        };
        let id = registry.add_value(Rc::clone(&name), kind);
        debug!("mk_value(name = {}, kind = {:?}) -> {}", name, kind, id);
        Var::new(id)
    }

    /// Creates a plain symbolic value.
    pub fn mk_var(&self, name: &str) -> Var {
        self.mk_value(Some(name), ValueKind::Plain)
    }

    /// Creates a plain symbolic value with an auto-generated unique name.
    pub fn mk_fresh_var(&self) -> Var {
        self.mk_value(None, ValueKind::Plain)
    }

    /// Creates a fixed-width bit-vector value.
    ///
    /// # Panics
    ///
    /// Panics if `width == 0`.
    pub fn mk_bitvec(&self, name: &str, width: u32) -> Var {
        assert_ne!(width, 0, "Bit-vector width must be positive");
        self.mk_value(Some(name), ValueKind::BitVec(width))
    }

    /// Creates a bit-vector value with an auto-generated unique name.
    pub fn mk_fresh_bitvec(&self, width: u32) -> Var {
        assert_ne!(width, 0, "Bit-vector width must be positive");
        self.mk_value(None, ValueKind::BitVec(width))
    }

    pub fn name(&self, var: Var) -> Rc<str> {
        Rc::clone(&self.registry.borrow().value(var.id()).name)
    }

    pub fn kind(&self, var: Var) -> ValueKind {
        self.registry.borrow().value(var.id()).kind
    }

    /// Declared width of a bit-vector value, `None` for plain values.
    pub fn width(&self, var: Var) -> Option<u32> {
        match self.kind(var) {
            ValueKind::BitVec(w) => Some(w),
            ValueKind::Plain => None,
        }
    }

    /// Live clauses of `var`, in creation order.
    pub fn clauses(&self, var: Var) -> Vec<Rc<Constraint>> {
        self.registry.borrow().value(var.id()).clauses.clone()
    }

    /// Plain variables, in creation order.
    pub fn variables(&self) -> Vec<Var> {
        self.registry.borrow().variables().iter().map(|&id| Var::new(id)).collect()
    }

    /// Bit-vector values, in creation order.
    pub fn bitvecs(&self) -> Vec<Var> {
        self.registry.borrow().bitvecs().iter().map(|&id| Var::new(id)).collect()
    }

    /// Named functions, in creation order.
    pub fn functions(&self) -> Vec<Function> {
        self.registry.borrow().functions().iter().map(|&id| Function::new(id)).collect()
    }

    /// Builds `left <op> right` and rewrites the clause frontiers (see the module docs).
    ///
    /// # Panics
    ///
    /// Panics if the number of operands does not match the operator, if `op` is a
    /// named-function application (use [`Session::call`]), or if a referenced value
    /// does not belong to this session.
    pub fn apply(&self, left: Subject, op: Op, right: Option<Operand>) -> Rc<Constraint> {
        assert!(!matches!(op, Op::Apply(_)), "Named functions are applied with `Session::call`");
        assert_eq!(
            op.is_unary(),
            right.is_none(),
            "Operator `{}` has the wrong number of operands",
            op
        );

        let mut registry = self.registry.borrow_mut();

        let owner = match &left {
            Subject::Value(v) => *v,
            Subject::Constraint(c) => c.owner(),
        };

        if let Subject::Constraint(c) = &left {
            let n = registry.retract(owner, c);
            debug!("apply: {} absorbs {} ({} retracted)", owner, c, n);
        }

        match &right {
            Some(Operand::Constraint(other)) => {
                // The owner of `other` is also its direct subject when its left is a value.
                let other_owner = other.owner();
                let n = registry.retract(other_owner, other);
                debug!("apply: {} absorbs {} from {} ({} retracted)", owner, other, other_owner, n);
            }
            Some(Operand::Value(v)) => {
                registry.value(*v);
            }
            Some(Operand::Literal(_)) | None => {}
        }

        let c = Rc::new(Constraint::new(left, op, right));
        debug!("apply: {} += {}", owner, c);
        registry.value_mut(owner).clauses.push(Rc::clone(&c));
        c
    }

    /// Replays a lazy expression through [`Session::apply`], operands first, left to right.
    ///
    /// A literal on the left of a symbolic right operand is moved to the right,
    /// mirroring the operator when needed (`2 * b` becomes `b * 2`, `1 < a` becomes `a > 1`).
    ///
    /// # Panics
    ///
    /// Panics if an operator application has no symbolic operand at all
    /// (`Expr::from(3) + 2`), or if a literal is the left operand of an operator without
    /// a mirrored form: `Expr::from(10) - b` panics with "cannot take a literal on the
    /// left". Write it as `b * -1 + 10` instead.
    pub fn eval(&self, expr: impl Into<Expr>) -> Operand {
        match expr.into() {
            Expr::Value(v) => {
                self.registry.borrow().value(v);
                Operand::Value(v)
            }
            Expr::Literal(lit) => Operand::Literal(lit),
            Expr::Constraint(c) => Operand::Constraint(c),
            Expr::Pending(pending) => {
                let Pending { left, op, right } = *pending;
                let left = self.eval(left);
                let right = right.map(|r| self.eval(r));

                let c = match (left.into_subject(), right) {
                    (Ok(subject), right) => self.apply(subject, op, right),
                    (Err(lit), Some(right)) => {
                        let subject = match right.into_subject() {
                            Ok(subject) => subject,
                            Err(other) => panic!("Expression `{} {} {}` has no symbolic operand", lit, op, other),
                        };
                        let mirrored = match op.mirror() {
                            Some(mirrored) => mirrored,
                            None => panic!("Operator `{}` cannot take a literal on the left", op),
                        };
                        self.apply(subject, mirrored, Some(Operand::Literal(lit)))
                    }
                    (Err(lit), None) => panic!("Expression `{}{}` has no symbolic operand", op, lit),
                };
                Operand::Constraint(c)
            }
        }
    }

    /// Renders a constraint with value and function names.
    pub fn show(&self, c: &Constraint) -> String {
        let registry = self.registry.borrow();
        let mut out = String::new();
        let _ = write_constraint(&mut out, c, &|w: &mut String, leaf| match leaf {
            Leaf::Value(v) => write!(w, "{}", registry.value(v).name),
            Leaf::Function(f) => write!(w, "{}", registry.function(f).name),
        });
        out
    }

    /// Forgets every value, function and cached backend symbol.
    ///
    /// Handles created before the reset must not be used afterwards.
    pub fn reset(&self) {
        debug!("reset");
        self.registry.borrow_mut().clear();
        self.symbols.borrow_mut().clear();
        self.solver.reset();
    }
}
