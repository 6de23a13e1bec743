//! Backend formulas.
//!
//! A [`Formula`] is the solver-facing representation of a constraint: a sorted term
//! over [`Symbol`]s, constants and backend operators ([`Kind`]). Formulas are built
//! through sort-checked constructors ([`Formula::app`], [`Formula::call`]), so any
//! formula that exists is well-sorted.
//!
//! The [`Display`](fmt::Display) form is a compact infix notation in which the argument
//! order of every node is visible, e.g. `((b & a) <-> (! ((! a) | (! b))))`.
//! See [`smtlib`][crate::smtlib] for the SMT-LIB 2 form.
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use num_bigint::{BigInt, BigUint};

use crate::error::{Error, Result};
use crate::types::{Sort, SymbolId};

/// A backend constant symbol.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Symbol {
    id: SymbolId,
    name: Rc<str>,
    sort: Sort,
}

impl Symbol {
    pub(crate) fn new(id: SymbolId, name: Rc<str>, sort: Sort) -> Self {
        Self { id, name, sort }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sort(&self) -> Sort {
        self.sort
    }
}

/// A backend function symbol (uninterpreted function).
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FuncSymbol {
    id: SymbolId,
    name: Rc<str>,
    domain: Vec<Sort>,
    range: Sort,
}

impl FuncSymbol {
    pub(crate) fn new(id: SymbolId, name: Rc<str>, domain: Vec<Sort>, range: Sort) -> Self {
        Self {
            id,
            name,
            domain,
            range,
        }
    }

    pub fn id(&self) -> SymbolId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &[Sort] {
        &self.domain
    }

    pub fn range(&self) -> Sort {
        self.range
    }
}

/// Backend operator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Kind {
    Not,
    And,
    Or,
    Xor,
    Implies,
    Iff,
    Ite,
    Eq,
    Plus,
    Minus,
    Times,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    BvNot,
    BvAnd,
    BvOr,
    BvXor,
    BvAdd,
    BvSub,
    BvMul,
    BvUdiv,
    BvUrem,
    BvShl,
    BvLshr,
    BvUlt,
    BvUle,
    BvUgt,
    BvUge,
}

impl Kind {
    /// The SMT-LIB 2 name of the operator.
    pub fn smtlib_name(self) -> &'static str {
        match self {
            Kind::Not => "not",
            Kind::And => "and",
            Kind::Or => "or",
            Kind::Xor => "xor",
            Kind::Implies => "=>",
            Kind::Iff | Kind::Eq => "=",
            Kind::Ite => "ite",
            Kind::Plus => "+",
            Kind::Minus => "-",
            Kind::Times => "*",
            Kind::Div => "div",
            Kind::Mod => "mod",
            Kind::Lt => "<",
            Kind::Le => "<=",
            Kind::Gt => ">",
            Kind::Ge => ">=",
            Kind::BvNot => "bvnot",
            Kind::BvAnd => "bvand",
            Kind::BvOr => "bvor",
            Kind::BvXor => "bvxor",
            Kind::BvAdd => "bvadd",
            Kind::BvSub => "bvsub",
            Kind::BvMul => "bvmul",
            Kind::BvUdiv => "bvudiv",
            Kind::BvUrem => "bvurem",
            Kind::BvShl => "bvshl",
            Kind::BvLshr => "bvlshr",
            Kind::BvUlt => "bvult",
            Kind::BvUle => "bvule",
            Kind::BvUgt => "bvugt",
            Kind::BvUge => "bvuge",
        }
    }

    /// Infix token used by [`Formula`]'s `Display`.
    pub fn infix(self) -> &'static str {
        match self {
            Kind::Not => "!",
            Kind::And | Kind::BvAnd => "&",
            Kind::Or | Kind::BvOr => "|",
            Kind::Xor | Kind::BvXor => "^",
            Kind::Implies => "->",
            Kind::Iff => "<->",
            Kind::Ite => "?",
            Kind::Eq => "=",
            Kind::Plus | Kind::BvAdd => "+",
            Kind::Minus | Kind::BvSub => "-",
            Kind::Times | Kind::BvMul => "*",
            Kind::Div => "/",
            Kind::Mod => "%",
            Kind::Lt => "<",
            Kind::Le => "<=",
            Kind::Gt => ">",
            Kind::Ge => ">=",
            Kind::BvNot => "~",
            Kind::BvUdiv => "u/",
            Kind::BvUrem => "u%",
            Kind::BvShl => "<<",
            Kind::BvLshr => ">>",
            Kind::BvUlt => "u<",
            Kind::BvUle => "u<=",
            Kind::BvUgt => "u>",
            Kind::BvUge => "u>=",
        }
    }

    /// Looks up an operator by SMT-LIB name. `=` is ambiguous and maps to [`Kind::Eq`].
    pub fn from_smtlib(name: &str) -> Option<Kind> {
        let kind = match name {
            "not" => Kind::Not,
            "and" => Kind::And,
            "or" => Kind::Or,
            "xor" => Kind::Xor,
            "=>" => Kind::Implies,
            "ite" => Kind::Ite,
            "=" => Kind::Eq,
            "+" => Kind::Plus,
            "-" => Kind::Minus,
            "*" => Kind::Times,
            "div" => Kind::Div,
            "mod" => Kind::Mod,
            "<" => Kind::Lt,
            "<=" => Kind::Le,
            ">" => Kind::Gt,
            ">=" => Kind::Ge,
            "bvnot" => Kind::BvNot,
            "bvand" => Kind::BvAnd,
            "bvor" => Kind::BvOr,
            "bvxor" => Kind::BvXor,
            "bvadd" => Kind::BvAdd,
            "bvsub" => Kind::BvSub,
            "bvmul" => Kind::BvMul,
            "bvudiv" => Kind::BvUdiv,
            "bvurem" => Kind::BvUrem,
            "bvshl" => Kind::BvShl,
            "bvlshr" => Kind::BvLshr,
            "bvult" => Kind::BvUlt,
            "bvule" => Kind::BvUle,
            "bvugt" => Kind::BvUgt,
            "bvuge" => Kind::BvUge,
            _ => return None,
        };
        Some(kind)
    }

    /// Checks the argument sorts and returns the result sort.
    fn check(self, args: &[Formula]) -> Result<Sort> {
        let sorts: Vec<Sort> = args.iter().map(Formula::sort).collect();
        let ill = |detail: String| Error::IllSorted {
            kind: self.smtlib_name().to_string(),
            detail,
        };
        let all = |sort: Sort| sorts.iter().all(|&s| s == sort);
        let same = sorts.windows(2).all(|w| w[0] == w[1]);

        match self {
            Kind::Not => {
                if sorts != [Sort::Bool] {
                    return Err(ill(format!("expected one Bool argument, got {:?}", sorts)));
                }
                Ok(Sort::Bool)
            }
            Kind::And | Kind::Or => {
                if sorts.len() < 2 || !all(Sort::Bool) {
                    return Err(ill(format!("expected at least two Bool arguments, got {:?}", sorts)));
                }
                Ok(Sort::Bool)
            }
            Kind::Xor | Kind::Implies | Kind::Iff => {
                if sorts.len() != 2 || !all(Sort::Bool) {
                    return Err(ill(format!("expected two Bool arguments, got {:?}", sorts)));
                }
                Ok(Sort::Bool)
            }
            Kind::Ite => match sorts[..] {
                [Sort::Bool, t, e] if t == e => Ok(t),
                _ => Err(ill(format!("expected a Bool condition and two branches of the same sort, got {:?}", sorts))),
            },
            Kind::Eq => {
                if sorts.len() != 2 || !same {
                    return Err(ill(format!("expected two arguments of the same sort, got {:?}", sorts)));
                }
                Ok(Sort::Bool)
            }
            Kind::Plus | Kind::Times => {
                if sorts.len() < 2 || !all(Sort::Int) {
                    return Err(ill(format!("expected at least two Int arguments, got {:?}", sorts)));
                }
                Ok(Sort::Int)
            }
            Kind::Minus => {
                if sorts.is_empty() || !all(Sort::Int) {
                    return Err(ill(format!("expected Int arguments, got {:?}", sorts)));
                }
                Ok(Sort::Int)
            }
            Kind::Div | Kind::Mod => {
                if sorts.len() != 2 || !all(Sort::Int) {
                    return Err(ill(format!("expected two Int arguments, got {:?}", sorts)));
                }
                Ok(Sort::Int)
            }
            Kind::Lt | Kind::Le | Kind::Gt | Kind::Ge => {
                if sorts.len() != 2 || !all(Sort::Int) {
                    return Err(ill(format!("expected two Int arguments, got {:?}", sorts)));
                }
                Ok(Sort::Bool)
            }
            Kind::BvNot => match sorts[..] {
                [Sort::BitVec(w)] => Ok(Sort::BitVec(w)),
                _ => Err(ill(format!("expected one bit-vector argument, got {:?}", sorts))),
            },
            Kind::BvAnd
            | Kind::BvOr
            | Kind::BvXor
            | Kind::BvAdd
            | Kind::BvSub
            | Kind::BvMul
            | Kind::BvUdiv
            | Kind::BvUrem
            | Kind::BvShl
            | Kind::BvLshr => match sorts[..] {
                [Sort::BitVec(w), Sort::BitVec(v)] if w == v => Ok(Sort::BitVec(w)),
                _ => Err(ill(format!("expected two bit-vectors of equal width, got {:?}", sorts))),
            },
            Kind::BvUlt | Kind::BvUle | Kind::BvUgt | Kind::BvUge => match sorts[..] {
                [Sort::BitVec(w), Sort::BitVec(v)] if w == v => Ok(Sort::Bool),
                _ => Err(ill(format!("expected two bit-vectors of equal width, got {:?}", sorts))),
            },
        }
    }
}

/// Operator application node.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct App {
    kind: Kind,
    args: Vec<Formula>,
    sort: Sort,
}

impl App {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn args(&self) -> &[Formula] {
        &self.args
    }
}

/// Function application node.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Call {
    func: FuncSymbol,
    args: Vec<Formula>,
}

impl Call {
    pub fn func(&self) -> &FuncSymbol {
        &self.func
    }

    pub fn args(&self) -> &[Formula] {
        &self.args
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Formula {
    Symbol(Symbol),
    Bool(bool),
    Int(BigInt),
    /// Bit-vector constant; `value < 2^width`.
    BitVec { value: BigUint, width: u32 },
    App(Rc<App>),
    Call(Rc<Call>),
}

impl Formula {
    pub fn symbol(symbol: &Symbol) -> Self {
        Formula::Symbol(symbol.clone())
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Formula::Int(value.into())
    }

    /// Bit-vector constant of the given width; `value` wraps modulo `2^width`.
    pub fn bitvec(value: &BigInt, width: u32) -> Self {
        assert_ne!(width, 0, "Bit-vector width must be positive");
        let modulus = BigInt::from(1u8) << width;
        let wrapped = ((value % &modulus) + &modulus) % &modulus;
        let (_, value) = wrapped.into_parts();
        Formula::BitVec { value, width }
    }

    /// Sort-checked operator application.
    pub fn app(kind: Kind, args: Vec<Formula>) -> Result<Self> {
        let sort = kind.check(&args)?;
        Ok(Formula::App(Rc::new(App { kind, args, sort })))
    }

    /// Sort-checked function application.
    pub fn call(func: &FuncSymbol, args: Vec<Formula>) -> Result<Self> {
        let sorts: Vec<Sort> = args.iter().map(Formula::sort).collect();
        if sorts != func.domain {
            return Err(Error::IllSorted {
                kind: func.name().to_string(),
                detail: format!("expected arguments {:?}, got {:?}", func.domain, sorts),
            });
        }
        Ok(Formula::Call(Rc::new(Call {
            func: func.clone(),
            args,
        })))
    }

    pub fn not(f: Formula) -> Result<Self> {
        Formula::app(Kind::Not, vec![f])
    }

    pub fn and(lhs: Formula, rhs: Formula) -> Result<Self> {
        Formula::app(Kind::And, vec![lhs, rhs])
    }

    pub fn iff(lhs: Formula, rhs: Formula) -> Result<Self> {
        Formula::app(Kind::Iff, vec![lhs, rhs])
    }

    pub fn ite(cond: Formula, then: Formula, otherwise: Formula) -> Result<Self> {
        Formula::app(Kind::Ite, vec![cond, then, otherwise])
    }

    /// Equality, or equivalence when both sides are boolean.
    pub fn equals_or_iff(lhs: Formula, rhs: Formula) -> Result<Self> {
        if lhs.sort().is_bool() && rhs.sort().is_bool() {
            Formula::iff(lhs, rhs)
        } else {
            Formula::app(Kind::Eq, vec![lhs, rhs])
        }
    }

    pub fn sort(&self) -> Sort {
        match self {
            Formula::Symbol(s) => s.sort,
            Formula::Bool(_) => Sort::Bool,
            Formula::Int(_) => Sort::Int,
            Formula::BitVec { width, .. } => Sort::BitVec(*width),
            Formula::App(app) => app.sort,
            Formula::Call(call) => call.func.range,
        }
    }

    /// Direct children, in argument order.
    pub fn args(&self) -> &[Formula] {
        match self {
            Formula::App(app) => &app.args,
            Formula::Call(call) => &call.args,
            _ => &[],
        }
    }

    pub fn kind(&self) -> Option<Kind> {
        match self {
            Formula::App(app) => Some(app.kind),
            _ => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Formula::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Distinct free constant symbols, in order of first occurrence.
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        let mut symbols = Vec::new();
        self.visit(&mut |f| {
            if let Formula::Symbol(s) = f {
                if seen.insert(s.id) {
                    symbols.push(s.clone());
                }
            }
        });
        symbols
    }

    /// Distinct function symbols, in order of first occurrence.
    pub fn functions(&self) -> Vec<FuncSymbol> {
        let mut seen = HashSet::new();
        let mut functions = Vec::new();
        self.visit(&mut |f| {
            if let Formula::Call(call) = f {
                if seen.insert(call.func.id) {
                    functions.push(call.func.clone());
                }
            }
        });
        functions
    }

    /// Pre-order traversal.
    fn visit<F: FnMut(&Formula)>(&self, f: &mut F) {
        f(self);
        for arg in self.args() {
            arg.visit(f);
        }
    }
}

impl From<bool> for Formula {
    fn from(value: bool) -> Self {
        Formula::Bool(value)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Symbol(s) => write!(f, "{}", s.name),
            Formula::Bool(b) => write!(f, "{}", b),
            Formula::Int(n) => write!(f, "{}", n),
            Formula::BitVec { value, width } => write!(f, "{}_{}", value, width),
            Formula::App(app) => {
                if let [arg] = &app.args[..] {
                    return write!(f, "({} {})", app.kind.infix(), arg);
                }
                if let (Kind::Ite, [c, t, e]) = (app.kind, &app.args[..]) {
                    return write!(f, "({} ? {} : {})", c, t, e);
                }
                write!(f, "(")?;
                for (i, arg) in app.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", app.kind.infix())?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Formula::Call(call) => {
                write!(f, "{}(", call.func.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32, name: &str, sort: Sort) -> Formula {
        Formula::Symbol(Symbol::new(SymbolId::new(id), name.into(), sort))
    }

    #[test]
    fn test_sorted_construction() {
        let a = sym(0, "a", Sort::Int);
        let f = Formula::app(Kind::Gt, vec![a.clone(), Formula::int(0)]).unwrap();
        assert_eq!(f.sort(), Sort::Bool);
        assert_eq!(f.to_string(), "(a > 0)");
        assert_eq!(f.args()[0], a);
    }

    #[test]
    fn test_ill_sorted() {
        let a = sym(0, "a", Sort::Int);
        let p = sym(1, "p", Sort::Bool);
        assert!(Formula::app(Kind::And, vec![a.clone(), p.clone()]).is_err());
        assert!(Formula::app(Kind::Eq, vec![a.clone(), p]).is_err());
        assert!(Formula::app(Kind::Not, vec![a]).is_err());
    }

    #[test]
    fn test_equals_or_iff() {
        let p = sym(0, "p", Sort::Bool);
        let q = sym(1, "q", Sort::Bool);
        let f = Formula::equals_or_iff(p, q).unwrap();
        assert_eq!(f.kind(), Some(Kind::Iff));
        assert_eq!(f.to_string(), "(p <-> q)");

        let x = sym(2, "x", Sort::Int);
        let f = Formula::equals_or_iff(x, Formula::int(3)).unwrap();
        assert_eq!(f.kind(), Some(Kind::Eq));
        assert_eq!(f.to_string(), "(x = 3)");
    }

    #[test]
    fn test_ite() {
        let p = sym(0, "p", Sort::Bool);
        let x = sym(1, "x", Sort::Int);
        let f = Formula::ite(p.clone(), x.clone(), Formula::int(0)).unwrap();
        assert_eq!(f.sort(), Sort::Int);
        assert_eq!(f.to_string(), "(p ? x : 0)");
        assert!(Formula::ite(x.clone(), p.clone(), p.clone()).is_err());
        assert!(Formula::ite(p.clone(), x, p).is_err());
    }

    #[test]
    fn test_bitvec_wraps() {
        let f = Formula::bitvec(&BigInt::from(-1), 8);
        assert_eq!(f, Formula::BitVec { value: BigUint::from(255u32), width: 8 });
        let f = Formula::bitvec(&BigInt::from(10), 32);
        assert_eq!(f.to_string(), "10_32");
        assert_eq!(f.sort(), Sort::BitVec(32));
    }

    #[test]
    fn test_bitvec_width_mismatch() {
        let x = sym(0, "x", Sort::BitVec(8));
        let y = sym(1, "y", Sort::BitVec(16));
        assert!(Formula::app(Kind::BvAdd, vec![x, y]).is_err());
    }

    #[test]
    fn test_call() {
        let a = sym(0, "a", Sort::Bool);
        let b = sym(1, "b", Sort::Bool);
        let f = FuncSymbol::new(SymbolId::new(2), "f".into(), vec![Sort::Bool, Sort::Bool], Sort::Bool);
        let call = Formula::call(&f, vec![a.clone(), b]).unwrap();
        assert_eq!(call.to_string(), "f(a, b)");
        assert_eq!(call.functions(), vec![f.clone()]);
        assert!(Formula::call(&f, vec![a]).is_err());
    }

    #[test]
    fn test_symbols_first_occurrence() {
        let a = sym(0, "a", Sort::Int);
        let b = sym(1, "b", Sort::Int);
        let sum = Formula::app(Kind::Plus, vec![b.clone(), a.clone(), b]).unwrap();
        let names: Vec<String> = sum.symbols().iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
