//! Lowering of constraint trees to backend formulas.
//!
//! [`Session::lower`] dispatches on the shape of a node, i.e. which of its children are
//! bare values, constraints or literals:
//!
//! | left       | right              | result                                   |
//! |------------|--------------------|------------------------------------------|
//! | value      | none (`!`, call)   | `op(x)`                                  |
//! | value      | value              | `op(y, x)`, operands swapped             |
//! | value      | literal/constraint | `op(x, lower(right))`                    |
//! | constraint | value              | `op(y, lower(left))`, right first        |
//! | constraint | constraint         | `op(lower(left), lower(right))`          |
//! | constraint | literal            | `op(lower(left), literal)`               |
//! | constraint | none (`!`)         | `op(lower(left))`                        |
//! | any        | call `f`           | `f(x1, .., xn) <-> lower(body)`          |
//!
//! Each value is lowered to a single backend [`Symbol`], created on first use and cached
//! for the lifetime of the session. Its sort is the declared bit-vector sort if any,
//! else the sort of the sibling operand, else the [inferred][crate::infer] sort.
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;
use num_bigint::BigInt;
use num_traits::Signed;

use crate::constraint::{Constraint, Literal, Operand, Subject};
use crate::error::{Error, Result};
use crate::expr::Var;
use crate::formula::{FuncSymbol, Formula, Kind, Symbol};
use crate::infer::{infer, literal_sort};
use crate::op::Op;
use crate::registry::ValueKind;
use crate::session::Session;
use crate::types::{FunctionId, Sort, SymbolId, ValueId};

/// Backend symbols of values and named functions.
///
/// Symbol ids come from a counter that [`SymbolTable::clear`] does not rewind.
#[derive(Debug, Default)]
pub(crate) struct SymbolTable {
    next: u32,
    values: HashMap<ValueId, Symbol>,
    functions: HashMap<FunctionId, FuncSymbol>,
}

impl SymbolTable {
    pub(crate) fn fresh_id(&mut self) -> SymbolId {
        let id = SymbolId::new(self.next);
        self.next += 1;
        id
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len() + self.functions.len()
    }

    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.functions.clear();
    }
}

/// Backend operator of `op` over arguments of sort `sort`.
fn kind_of(op: Op, sort: Sort) -> Result<Kind> {
    use Sort::*;

    let kind = match (op, sort) {
        (Op::Add, Int) => Kind::Plus,
        (Op::Sub, Int) => Kind::Minus,
        (Op::Mul, Int) => Kind::Times,
        (Op::FloorDiv, Int) => Kind::Div,
        (Op::Mod, Int) => Kind::Mod,
        (Op::Lt, Int) => Kind::Lt,
        (Op::Le, Int) => Kind::Le,
        (Op::Gt, Int) => Kind::Gt,
        (Op::Ge, Int) => Kind::Ge,
        (Op::Eq, Int | BitVec(_)) => Kind::Eq,
        (Op::Eq, Bool) => Kind::Iff,

        (Op::BitAnd, Bool) => Kind::And,
        (Op::BitOr, Bool) => Kind::Or,
        (Op::BitXor, Bool) => Kind::Xor,
        (Op::Not, Bool) => Kind::Not,

        (Op::Add, BitVec(_)) => Kind::BvAdd,
        (Op::Sub, BitVec(_)) => Kind::BvSub,
        (Op::Mul, BitVec(_)) => Kind::BvMul,
        (Op::TrueDiv | Op::FloorDiv, BitVec(_)) => Kind::BvUdiv,
        (Op::Mod, BitVec(_)) => Kind::BvUrem,
        (Op::BitAnd, BitVec(_)) => Kind::BvAnd,
        (Op::BitOr, BitVec(_)) => Kind::BvOr,
        (Op::BitXor, BitVec(_)) => Kind::BvXor,
        (Op::Shl, BitVec(_)) => Kind::BvShl,
        (Op::Shr, BitVec(_)) => Kind::BvLshr,
        (Op::Lt, BitVec(_)) => Kind::BvUlt,
        (Op::Le, BitVec(_)) => Kind::BvUle,
        (Op::Gt, BitVec(_)) => Kind::BvUgt,
        (Op::Ge, BitVec(_)) => Kind::BvUge,
        (Op::Not, BitVec(_)) => Kind::BvNot,

        _ => {
            return Err(Error::UnsupportedOperator {
                op: op.to_string(),
                sort,
            })
        }
    };
    Ok(kind)
}

/// Applies `op` to already lowered arguments; the first argument decides the sort.
fn build(op: Op, args: Vec<Formula>) -> Result<Formula> {
    let sort = args[0].sort();
    match (op, sort) {
        (Op::Ne, _) => Formula::not(build(Op::Eq, args)?),
        (Op::FloorDiv | Op::Mod, Sort::Int) => floor_division(op, args),
        _ => Formula::app(kind_of(op, sort)?, args),
    }
}

/// Integer `//` and `%` rounding toward negative infinity.
///
/// Backend `div`/`mod` are Euclidean and agree with flooring only for positive divisors.
/// For a negative divisor `d`, `n // d == div(-n, -d)` and `n % d == -mod(-n, -d)`.
/// A literal divisor picks the branch statically, anything else gets an `ite`.
fn floor_division(op: Op, args: Vec<Formula>) -> Result<Formula> {
    let kind = kind_of(op, Sort::Int)?;
    let (n, d) = match <[Formula; 2]>::try_from(args) {
        Ok([n, d]) => (n, d),
        Err(args) => return Err(Error::UnsupportedShape(format!("`{}` with {} arguments", op, args.len()))),
    };

    let negative = |n: Formula, neg_d: Formula| -> Result<Formula> {
        let flipped = Formula::app(kind, vec![Formula::app(Kind::Minus, vec![n])?, neg_d])?;
        match kind {
            Kind::Mod => Formula::app(Kind::Minus, vec![flipped]),
            _ => Ok(flipped),
        }
    };

    match &d {
        Formula::Int(v) if v.is_negative() => negative(n, Formula::Int(-v)),
        Formula::Int(_) => Formula::app(kind, vec![n, d]),
        _ => {
            let below_zero = Formula::app(Kind::Lt, vec![d.clone(), Formula::int(0)])?;
            let neg_d = Formula::app(Kind::Minus, vec![d.clone()])?;
            let then = negative(n.clone(), neg_d)?;
            let otherwise = Formula::app(kind, vec![n, d])?;
            Formula::ite(below_zero, then, otherwise)
        }
    }
}

/// Backend constant for a literal at the given sort.
fn lower_literal(lit: Literal, sort: Sort) -> Result<Formula> {
    match (lit, sort) {
        (Literal::Bool(b), Sort::Bool) => Ok(Formula::Bool(b)),
        (Literal::Int(n), Sort::Int) => Ok(Formula::int(n)),
        (Literal::Int(n), Sort::BitVec(w)) => Ok(Formula::bitvec(&BigInt::from(n), w)),
        _ => Err(Error::LiteralSort {
            literal: lit.to_string(),
            sort,
        }),
    }
}

impl Session {
    fn declared_sort(&self, v: ValueId) -> Option<Sort> {
        match self.registry.borrow().value(v).kind {
            ValueKind::BitVec(w) => Some(Sort::BitVec(w)),
            ValueKind::Plain => None,
        }
    }

    /// The inferred sort of `c`, or an error naming the ambiguous subtree.
    fn require_sort(&self, c: &Constraint) -> Result<Sort> {
        infer(c).ok_or_else(|| Error::UndeterminedSort(self.show(c)))
    }

    /// Returns the backend symbol of `var`, creating it at `sort` on first use.
    ///
    /// Requesting a cached symbol at another sort is an error.
    pub fn symbol(&self, var: Var, sort: Sort) -> Result<Symbol> {
        self.value_symbol(var.id(), sort)
    }

    /// Returns the backend symbol of `var`, if it has been lowered already.
    pub fn cached_symbol(&self, var: Var) -> Option<Symbol> {
        self.symbols.borrow().values.get(&var.id()).cloned()
    }

    fn value_symbol(&self, v: ValueId, sort: Sort) -> Result<Symbol> {
        if let Some(symbol) = self.symbols.borrow().values.get(&v) {
            if symbol.sort() != sort {
                return Err(Error::SymbolSortMismatch {
                    name: symbol.name().to_string(),
                    cached: symbol.sort(),
                    requested: sort,
                });
            }
            return Ok(symbol.clone());
        }

        let name = Rc::clone(&self.registry.borrow().value(v).name);
        let mut symbols = self.symbols.borrow_mut();
        let symbol = Symbol::new(symbols.fresh_id(), name, sort);
        debug!("symbol({}) -> {} : {}", v, symbol.name(), sort);
        symbols.values.insert(v, symbol.clone());
        Ok(symbol)
    }

    /// Symbol of `v` at its declared sort, else at `fallback`.
    fn value_formula(&self, v: ValueId, fallback: impl FnOnce() -> Result<Sort>) -> Result<Formula> {
        let sort = match self.declared_sort(v) {
            Some(sort) => sort,
            None => fallback()?,
        };
        Ok(Formula::Symbol(self.value_symbol(v, sort)?))
    }

    /// Translates a constraint tree into a backend formula.
    pub fn lower(&self, c: &Constraint) -> Result<Formula> {
        let op = c.op();
        if let Op::Apply(f) = op {
            return self.lower_call(c.left(), f);
        }
        if matches!(op, Op::MatMul) {
            return Err(Error::UnsupportedOperator {
                op: op.to_string(),
                sort: infer(c).unwrap_or(Sort::Int),
            });
        }

        let formula = match (c.left(), c.right()) {
            (Subject::Value(x), None) => {
                let x = self.value_formula(*x, || self.require_sort(c))?;
                build(op, vec![x])?
            }
            (Subject::Value(x), Some(Operand::Value(y))) => {
                let (x, y) = (*x, *y);
                let shared = match self.declared_sort(x).or_else(|| self.declared_sort(y)) {
                    Some(sort) => sort,
                    None => self.require_sort(c)?,
                };
                let x = self.value_formula(x, || Ok(shared))?;
                let y = self.value_formula(y, || Ok(shared))?;
                build(op, vec![y, x])?
            }
            (Subject::Value(x), Some(Operand::Constraint(right))) => {
                let right = self.lower(right)?;
                let x = self.value_formula(*x, || Ok(right.sort()))?;
                build(op, vec![x, right])?
            }
            (Subject::Value(x), Some(Operand::Literal(lit))) => {
                let x = self.value_formula(*x, || Ok(literal_sort(*lit)))?;
                let lit = lower_literal(*lit, x.sort())?;
                build(op, vec![x, lit])?
            }
            (Subject::Constraint(left), Some(Operand::Value(y))) => {
                let left = self.lower(left)?;
                let y = self.value_formula(*y, || Ok(left.sort()))?;
                build(op, vec![y, left])?
            }
            (Subject::Constraint(left), Some(Operand::Constraint(right))) => {
                let left = self.lower(left)?;
                let right = self.lower(right)?;
                build(op, vec![left, right])?
            }
            (Subject::Constraint(left), Some(Operand::Literal(lit))) => {
                let left = self.lower(left)?;
                let sort = match left.sort() {
                    Sort::BitVec(w) => Sort::BitVec(w),
                    _ => literal_sort(*lit),
                };
                let lit = lower_literal(*lit, sort)?;
                build(op, vec![left, lit])?
            }
            (Subject::Constraint(left), None) => {
                let left = self.lower(left)?;
                build(op, vec![left])?
            }
        };
        debug!("lower({}) -> {}", c, formula);
        Ok(formula)
    }

    /// Lowers `f(body)` to `f(x1, .., xn) <-> body` over the distinct values of `body`.
    fn lower_call(&self, body: &Subject, f: FunctionId) -> Result<Formula> {
        let (lowered, values) = match body {
            Subject::Value(v) => (self.value_formula(*v, || Ok(Sort::Bool))?, vec![*v]),
            Subject::Constraint(c) => (self.lower(c)?, c.values()),
        };

        let mut args = Vec::with_capacity(values.len());
        for v in values {
            let cached = self.symbols.borrow().values.get(&v).cloned();
            let symbol = match cached {
                Some(symbol) => symbol,
                None => self.value_symbol(v, Sort::Bool)?,
            };
            args.push(Formula::Symbol(symbol));
        }

        let func = self.function_symbol(f, &args);
        let formula = Formula::iff(Formula::call(&func, args)?, lowered)?;
        debug!("lower_call({}) -> {}", f, formula);
        Ok(formula)
    }

    fn function_symbol(&self, f: FunctionId, args: &[Formula]) -> FuncSymbol {
        if let Some(func) = self.symbols.borrow().functions.get(&f) {
            return func.clone();
        }
        let name = Rc::clone(&self.registry.borrow().function(f).name);
        let domain = args.iter().map(Formula::sort).collect();
        let mut symbols = self.symbols.borrow_mut();
        let func = FuncSymbol::new(symbols.fresh_id(), name, domain, Sort::Bool);
        symbols.functions.insert(f, func.clone());
        func
    }

    /// Conjoins the lowered constraints as `c1 & (c2 & (.. & cn))`.
    pub fn join(&self, constraints: &[Rc<Constraint>]) -> Result<Formula> {
        match constraints {
            [] => Err(Error::EmptyJoin),
            [single] => self.lower(single),
            [first, rest @ ..] => Formula::and(self.lower(first)?, self.join(rest)?),
        }
    }

    /// Every live constraint of the session, as one formula.
    ///
    /// Collects the clauses of plain variables, then of bit-vectors, then the constraint
    /// contributed by each named function. Unevaluated functions are evaluated first,
    /// so that clauses their bodies create are collected too.
    pub fn collect_all(&self) -> Result<Formula> {
        let applied: Vec<Rc<Constraint>> = self.functions().into_iter().map(|f| self.call(f)).collect();

        let mut all = Vec::new();
        for var in self.variables().into_iter().chain(self.bitvecs()) {
            all.extend(self.clauses(var));
        }
        all.extend(applied);
        debug!("collect_all: {} constraints", all.len());

        match &all[..] {
            [single] => self.lower(single),
            _ => self.join(&all),
        }
    }
}
