//! SMT-LIB 2 interchange.
//!
//! [`emit_script`] serializes a formula as a self-contained script (declarations, one
//! assertion, `check-sat`), and [`Session::parse_script`] reads a script back into a
//! single formula: the conjunction of its assertions.
//!
//! The supported subset covers what [`Formula`] can represent: `Bool`, `Int` and
//! `(_ BitVec w)` constants, uninterpreted functions, and the core, integer and
//! bit-vector operators. `define-fun` with parameters is expanded like a macro.
//! Commands that do not contribute to the formula (`set-logic`, `check-sat`,
//! `get-value`, ...) are skipped with a warning.
//!
//! ```
//! use smtfe_rs::session::Session;
//! use smtfe_rs::smtlib::emit_script;
//!
//! let s = Session::default();
//! let f = s
//!     .parse_script("(declare-const x Int) (assert (> x 2))")
//!     .unwrap();
//! assert_eq!(f.to_string(), "(x > 2)");
//! assert_eq!(
//!     emit_script(&f),
//!     "(declare-fun x () Int)\n(assert (> x 2))\n(check-sat)\n"
//! );
//! ```
use std::collections::HashMap;
use std::fmt::Write;

use log::{debug, warn};
use num_bigint::{BigInt, BigUint};

use crate::error::{Error, Result};
use crate::formula::{FuncSymbol, Formula, Kind, Symbol};
use crate::session::Session;
use crate::types::Sort;

fn is_simple_symbol(name: &str) -> bool {
    const EXTRA: &str = "~!@$%^&*_-+=<>.?/";
    let mut chars = name.chars();
    match chars.next() {
        None => false,
        Some(c) if c.is_ascii_digit() => false,
        Some(c) => std::iter::once(c)
            .chain(chars)
            .all(|c| c.is_ascii_alphanumeric() || EXTRA.contains(c)),
    }
}

fn quote(name: &str) -> String {
    if is_simple_symbol(name) {
        name.to_string()
    } else {
        format!("|{}|", name)
    }
}

/// Renders `formula` as an SMT-LIB 2 term.
pub fn to_smtlib(formula: &Formula) -> String {
    let mut out = String::new();
    write_term(&mut out, formula);
    out
}

fn write_term(out: &mut String, formula: &Formula) {
    match formula {
        Formula::Symbol(s) => out.push_str(&quote(s.name())),
        Formula::Bool(b) => {
            let _ = write!(out, "{}", b);
        }
        Formula::Int(n) if n.sign() == num_bigint::Sign::Minus => {
            let _ = write!(out, "(- {})", n.magnitude());
        }
        Formula::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Formula::BitVec { value, width } => {
            let _ = write!(out, "(_ bv{} {})", value, width);
        }
        Formula::App(app) => {
            out.push('(');
            out.push_str(app.kind().smtlib_name());
            for arg in app.args() {
                out.push(' ');
                write_term(out, arg);
            }
            out.push(')');
        }
        Formula::Call(call) => {
            out.push('(');
            out.push_str(&quote(call.func().name()));
            for arg in call.args() {
                out.push(' ');
                write_term(out, arg);
            }
            out.push(')');
        }
    }
}

/// Renders `formula` as a script declaring its symbols, asserting it and checking it.
///
/// Symbols are identified by name in SMT-LIB, so distinct symbols sharing a name are
/// declared once.
pub fn emit_script(formula: &Formula) -> String {
    let mut out = String::new();
    let mut declared = Vec::new();

    let mut symbols = formula.symbols();
    symbols.sort_by_key(Symbol::id);
    for s in symbols {
        if !declared.contains(&s.name().to_string()) {
            let _ = writeln!(out, "(declare-fun {} () {})", quote(s.name()), s.sort());
            declared.push(s.name().to_string());
        }
    }

    let mut functions = formula.functions();
    functions.sort_by_key(FuncSymbol::id);
    for f in functions {
        if !declared.contains(&f.name().to_string()) {
            let domain: Vec<String> = f.domain().iter().map(Sort::to_string).collect();
            let _ = writeln!(
                out,
                "(declare-fun {} ({}) {})",
                quote(f.name()),
                domain.join(" "),
                f.range()
            );
            declared.push(f.name().to_string());
        }
    }

    let _ = writeln!(out, "(assert {})", to_smtlib(formula));
    out.push_str("(check-sat)\n");
    out
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum SExpr {
    Atom(String),
    /// A `|quoted|` symbol, never a literal.
    Quoted(String),
    List(Vec<SExpr>),
}

impl SExpr {
    fn symbol(&self) -> Option<&str> {
        match self {
            SExpr::Atom(s) | SExpr::Quoted(s) => Some(s),
            SExpr::List(_) => None,
        }
    }
}

fn parse_error(msg: impl Into<String>) -> Error {
    Error::Parse(msg.into())
}

/// Reads all top-level s-expressions of `text`.
fn read_sexprs(text: &str) -> Result<Vec<SExpr>> {
    let mut stack: Vec<Vec<SExpr>> = vec![Vec::new()];
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ';' => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '(' => stack.push(Vec::new()),
            ')' => {
                let list = stack.pop().filter(|_| !stack.is_empty());
                match (list, stack.last_mut()) {
                    (Some(list), Some(parent)) => parent.push(SExpr::List(list)),
                    _ => return Err(parse_error("unbalanced `)`")),
                }
            }
            '|' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('|') => break,
                        Some(c) => name.push(c),
                        None => return Err(parse_error("unterminated quoted symbol")),
                    }
                }
                push_expr(&mut stack, SExpr::Quoted(name));
            }
            '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('"') if chars.peek() == Some(&'"') => {
                            chars.next();
                            literal.push('"');
                        }
                        Some('"') => break,
                        Some(c) => literal.push(c),
                        None => return Err(parse_error("unterminated string literal")),
                    }
                }
                push_expr(&mut stack, SExpr::Atom(format!("\"{}\"", literal)));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut atom = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || matches!(next, '(' | ')' | ';' | '|' | '"') {
                        break;
                    }
                    atom.push(next);
                    chars.next();
                }
                push_expr(&mut stack, SExpr::Atom(atom));
            }
        }
    }

    match stack.pop() {
        Some(top) if stack.is_empty() => Ok(top),
        _ => Err(parse_error("unbalanced `(`")),
    }
}

fn push_expr(stack: &mut [Vec<SExpr>], expr: SExpr) {
    if let Some(top) = stack.last_mut() {
        top.push(expr);
    }
}

fn parse_sort(expr: &SExpr) -> Result<Sort> {
    match expr {
        SExpr::Atom(s) if s == "Bool" => Ok(Sort::Bool),
        SExpr::Atom(s) if s == "Int" => Ok(Sort::Int),
        SExpr::List(items) => match &items[..] {
            [SExpr::Atom(u), SExpr::Atom(b), SExpr::Atom(w)] if u == "_" && b == "BitVec" => {
                match w.parse::<u32>() {
                    Ok(w) if w > 0 => Ok(Sort::BitVec(w)),
                    _ => Err(parse_error(format!("invalid bit-vector width `{}`", w))),
                }
            }
            _ => Err(parse_error(format!("unsupported sort {:?}", expr))),
        },
        _ => Err(parse_error(format!("unsupported sort {:?}", expr))),
    }
}

/// A `define-fun` with parameters, expanded at each use.
struct Macro {
    params: Vec<(String, Sort)>,
    range: Sort,
    body: SExpr,
}

type Scope = HashMap<String, Formula>;

struct ScriptReader<'s> {
    session: &'s Session,
    consts: Scope,
    funcs: HashMap<String, FuncSymbol>,
    macros: HashMap<String, Macro>,
    assertions: Vec<Formula>,
}

impl<'s> ScriptReader<'s> {
    fn new(session: &'s Session) -> Self {
        Self {
            session,
            consts: HashMap::new(),
            funcs: HashMap::new(),
            macros: HashMap::new(),
            assertions: Vec::new(),
        }
    }

    fn command(&mut self, expr: &SExpr) -> Result<()> {
        let items = match expr {
            SExpr::List(items) if !items.is_empty() => items,
            _ => return Err(parse_error(format!("expected a command, got {:?}", expr))),
        };
        let name = items[0]
            .symbol()
            .ok_or_else(|| parse_error("command name must be a symbol"))?;

        match (name, &items[1..]) {
            ("declare-const", [n, sort]) => {
                let sort = parse_sort(sort)?;
                self.declare(n, &[], sort)
            }
            ("declare-fun", [n, SExpr::List(domain), range]) => {
                let domain = domain.iter().map(parse_sort).collect::<Result<Vec<_>>>()?;
                let range = parse_sort(range)?;
                self.declare(n, &domain, range)
            }
            ("define-fun", [n, SExpr::List(params), range, body]) => {
                let name = n.symbol().ok_or_else(|| parse_error("function name must be a symbol"))?;
                let range = parse_sort(range)?;
                let params = params
                    .iter()
                    .map(|p| match p {
                        SExpr::List(pair) => match &pair[..] {
                            [p, sort] => {
                                let p = p.symbol().ok_or_else(|| parse_error("parameter must be a symbol"))?;
                                Ok((p.to_string(), parse_sort(sort)?))
                            }
                            _ => Err(parse_error(format!("malformed parameter {:?}", p))),
                        },
                        _ => Err(parse_error(format!("malformed parameter {:?}", p))),
                    })
                    .collect::<Result<Vec<_>>>()?;

                if params.is_empty() {
                    let term = self.term(body, &Scope::new())?;
                    expect_sort(&term, range, name)?;
                    self.consts.insert(name.to_string(), term);
                } else {
                    let body = body.clone();
                    self.macros.insert(name.to_string(), Macro { params, range, body });
                }
                Ok(())
            }
            ("assert", [t]) => {
                let term = self.term(t, &Scope::new())?;
                expect_sort(&term, Sort::Bool, "assert")?;
                self.assertions.push(term);
                Ok(())
            }
            (
                "set-logic" | "set-option" | "set-info" | "check-sat" | "get-value" | "get-model" | "exit"
                | "push" | "pop",
                _,
            ) => {
                warn!("Ignoring SMT-LIB command `{}`", name);
                Ok(())
            }
            _ => Err(parse_error(format!("unsupported command {:?}", expr))),
        }
    }

    fn declare(&mut self, name: &SExpr, domain: &[Sort], range: Sort) -> Result<()> {
        let name = name.symbol().ok_or_else(|| parse_error("declared name must be a symbol"))?;
        let id = self.session.symbols.borrow_mut().fresh_id();
        debug!("declare {} : {:?} -> {}", name, domain, range);
        if domain.is_empty() {
            let symbol = Symbol::new(id, name.into(), range);
            self.consts.insert(name.to_string(), Formula::Symbol(symbol));
        } else {
            let func = FuncSymbol::new(id, name.into(), domain.to_vec(), range);
            self.funcs.insert(name.to_string(), func);
        }
        Ok(())
    }

    fn lookup(&self, name: &str, scope: &Scope) -> Result<Formula> {
        scope
            .get(name)
            .or_else(|| self.consts.get(name))
            .cloned()
            .ok_or_else(|| parse_error(format!("unknown symbol `{}`", name)))
    }

    fn term(&self, expr: &SExpr, scope: &Scope) -> Result<Formula> {
        match expr {
            SExpr::Quoted(name) => self.lookup(name, scope),
            SExpr::Atom(atom) => self.atom(atom, scope),
            SExpr::List(items) => {
                let head = match items.first() {
                    Some(head) => head,
                    None => return Err(parse_error("empty term")),
                };
                if let [SExpr::Atom(u), SExpr::Atom(bv), SExpr::Atom(w)] = &items[..] {
                    if u == "_" {
                        return bv_literal(bv, w);
                    }
                }
                let name = head.symbol().ok_or_else(|| parse_error(format!("unsupported term {:?}", expr)))?;
                let args = items[1..]
                    .iter()
                    .map(|arg| self.term(arg, scope))
                    .collect::<Result<Vec<_>>>()?;
                self.application(name, args)
            }
        }
    }

    fn atom(&self, atom: &str, scope: &Scope) -> Result<Formula> {
        if atom == "true" || atom == "false" {
            return Ok(Formula::Bool(atom == "true"));
        }
        if atom.chars().all(|c| c.is_ascii_digit()) {
            let n = atom
                .parse::<BigInt>()
                .map_err(|e| parse_error(format!("invalid numeral `{}`: {}", atom, e)))?;
            return Ok(Formula::Int(n));
        }
        if let Some(hex) = atom.strip_prefix("#x") {
            let value = BigUint::parse_bytes(hex.as_bytes(), 16)
                .ok_or_else(|| parse_error(format!("invalid hexadecimal `{}`", atom)))?;
            return Ok(Formula::BitVec {
                value,
                width: 4 * hex.len() as u32,
            });
        }
        if let Some(bin) = atom.strip_prefix("#b") {
            let value = BigUint::parse_bytes(bin.as_bytes(), 2)
                .ok_or_else(|| parse_error(format!("invalid binary `{}`", atom)))?;
            return Ok(Formula::BitVec {
                value,
                width: bin.len() as u32,
            });
        }
        self.lookup(atom, scope)
    }

    fn application(&self, name: &str, args: Vec<Formula>) -> Result<Formula> {
        if let Some(func) = self.funcs.get(name) {
            return Formula::call(func, args);
        }
        if let Some(m) = self.macros.get(name) {
            return self.expand(name, m, args);
        }

        if name == "-" {
            if let [Formula::Int(n)] = &args[..] {
                return Ok(Formula::Int(-n));
            }
        }

        match name {
            "=" => pairwise(args, Formula::equals_or_iff),
            "distinct" => distinct(args),
            "<" | "<=" | ">" | ">=" | "bvult" | "bvule" | "bvugt" | "bvuge" => {
                let kind = Kind::from_smtlib(name).ok_or_else(|| parse_error(name))?;
                pairwise(args, |l, r| Formula::app(kind, vec![l, r]))
            }
            "=>" => {
                let mut args = args.into_iter().rev();
                let last = args.next().ok_or_else(|| parse_error("`=>` without arguments"))?;
                args.try_fold(last, |acc, premise| Formula::app(Kind::Implies, vec![premise, acc]))
            }
            "and" | "or" if args.len() == 1 => Ok(args.into_iter().next().unwrap_or(Formula::Bool(true))),
            "and" | "or" if args.is_empty() => Ok(Formula::Bool(name == "and")),
            "xor" | "bvand" | "bvor" | "bvxor" | "bvadd" | "bvmul" if args.len() > 2 => {
                let kind = Kind::from_smtlib(name).ok_or_else(|| parse_error(name))?;
                let mut args = args.into_iter();
                let first = args.next().ok_or_else(|| parse_error(name))?;
                args.try_fold(first, |acc, x| Formula::app(kind, vec![acc, x]))
            }
            _ => match Kind::from_smtlib(name) {
                Some(kind) => Formula::app(kind, args),
                None => Err(parse_error(format!("unknown function `{}`", name))),
            },
        }
    }

    fn expand(&self, name: &str, m: &Macro, args: Vec<Formula>) -> Result<Formula> {
        if args.len() != m.params.len() {
            return Err(parse_error(format!(
                "`{}` expects {} arguments, got {}",
                name,
                m.params.len(),
                args.len()
            )));
        }
        let mut scope = Scope::new();
        for ((param, sort), arg) in m.params.iter().zip(args) {
            expect_sort(&arg, *sort, name)?;
            scope.insert(param.clone(), arg);
        }
        let term = self.term(&m.body, &scope)?;
        expect_sort(&term, m.range, name)?;
        Ok(term)
    }
}

fn expect_sort(term: &Formula, sort: Sort, context: &str) -> Result<()> {
    if term.sort() != sort {
        return Err(parse_error(format!(
            "`{}` expects {}, got {} of sort {}",
            context,
            sort,
            term,
            term.sort()
        )));
    }
    Ok(())
}

fn bv_literal(bv: &str, width: &str) -> Result<Formula> {
    let value = bv
        .strip_prefix("bv")
        .and_then(|v| v.parse::<BigInt>().ok())
        .ok_or_else(|| parse_error(format!("invalid bit-vector literal `{}`", bv)))?;
    let width = width
        .parse::<u32>()
        .ok()
        .filter(|&w| w > 0)
        .ok_or_else(|| parse_error(format!("invalid bit-vector width `{}`", width)))?;
    Ok(Formula::bitvec(&value, width))
}

/// `(op a b c)` as `(and (op a b) (op b c))`.
fn pairwise<F>(args: Vec<Formula>, op: F) -> Result<Formula>
where
    F: Fn(Formula, Formula) -> Result<Formula>,
{
    if args.len() < 2 {
        return Err(parse_error("expected at least two arguments"));
    }
    let mut pairs = args
        .windows(2)
        .map(|w| op(w[0].clone(), w[1].clone()))
        .collect::<Result<Vec<_>>>()?;
    if pairs.len() == 1 {
        return Ok(pairs.remove(0));
    }
    Formula::app(Kind::And, pairs)
}

/// `(distinct a b c)` as `(and (not (= a b)) (not (= a c)) (not (= b c)))`.
fn distinct(args: Vec<Formula>) -> Result<Formula> {
    if args.len() < 2 {
        return Err(parse_error("expected at least two arguments"));
    }
    let mut pairs = Vec::new();
    for (i, l) in args.iter().enumerate() {
        for r in &args[i + 1..] {
            pairs.push(Formula::not(Formula::equals_or_iff(l.clone(), r.clone())?)?);
        }
    }
    if pairs.len() == 1 {
        return Ok(pairs.remove(0));
    }
    Formula::app(Kind::And, pairs)
}

impl Session {
    /// Parses an SMT-LIB 2 script into the conjunction of its assertions.
    ///
    /// Declared constants get fresh backend symbols; they are not tied to any value of
    /// this session.
    pub fn parse_script(&self, text: &str) -> Result<Formula> {
        let mut reader = ScriptReader::new(self);
        for command in read_sexprs(text)? {
            reader.command(&command)?;
        }

        let mut assertions = reader.assertions;
        match assertions.len() {
            0 => Err(parse_error("script has no assertions")),
            1 => Ok(assertions.remove(0)),
            _ => Formula::app(Kind::And, assertions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    const DEMORGAN: &str = "(declare-const a Bool)
(declare-const b Bool)


(define-fun demorgan ()  Bool
  (= (and a b) (not (or (not a) (not b)))))


(assert demorgan)
(check-sat)
(get-value (a b))";

    #[test]
    fn test_ingest_demorgan() {
        let s = Session::default();
        let f = s.parse_script(DEMORGAN).unwrap();
        assert_eq!(f.to_string(), "((a & b) <-> (! ((! a) | (! b))))");
        assert_eq!(f.symbols().len(), 2);
    }

    #[test]
    fn test_emit_function() {
        let s = Session::default();
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        s.mk_function("demorgan", move || (a & b).eq(!(!a | !b)));
        let applied = s.call(s.functions()[0]);
        let f = s.lower(&applied).unwrap();
        assert_eq!(
            emit_script(&f),
            "(declare-fun a () Bool)\n\
             (declare-fun b () Bool)\n\
             (declare-fun demorgan (Bool Bool) Bool)\n\
             (assert (= (demorgan a b) (= (and b a) (not (or (not a) (not b))))))\n\
             (check-sat)\n"
        );
    }

    #[test]
    fn test_emit_then_parse() {
        let s = Session::default();
        let x = s.mk_bitvec("x", 8);
        let n = s.mk_var("n");
        s.eval((x + 1).eq(300));
        s.eval((n - 5).lt(-3));
        let f = s.collect_all().unwrap();

        let script = emit_script(&f);
        assert!(script.contains("(declare-fun x () (_ BitVec 8))"));
        assert!(script.contains("(_ bv44 8)"));
        assert!(script.contains("(- 3)"));

        let parsed = s.parse_script(&script).unwrap();
        assert_eq!(parsed.to_string(), f.to_string());
    }

    #[test]
    fn test_floor_division_round_trip() {
        let s = Session::default();
        let n = s.mk_var("n");
        let d = s.mk_var("d");
        s.eval(n.floor_div(d * 1).eq(-4));
        let f = s.collect_all().unwrap();

        let script = emit_script(&f);
        assert!(script.contains("(ite (< (* d 1) 0) (div (- n) (- (* d 1))) (div n (* d 1)))"));

        let parsed = s.parse_script(&script).unwrap();
        assert_eq!(parsed.to_string(), f.to_string());
    }

    #[test]
    fn test_define_fun_with_parameters() {
        let s = Session::default();
        let f = s
            .parse_script(
                "; max of two integers
                 (declare-const x Int)
                 (declare-const y Int)
                 (define-fun bigger ((p Int) (q Int)) Bool (> p q))
                 (assert (bigger x y))
                 (assert (bigger y 0))",
            )
            .unwrap();
        assert_eq!(f.to_string(), "((x > y) & (y > 0))");
    }

    #[test]
    fn test_literals_and_quoting() {
        let s = Session::default();
        let f = s
            .parse_script("(declare-fun |odd name| () (_ BitVec 8)) (assert (= |odd name| #x0a (_ bv10 8) #b00001010))")
            .unwrap();
        assert_eq!(f.to_string(), "((odd name = 10_8) & (10_8 = 10_8))");
        assert!(to_smtlib(&f).starts_with("(and (= |odd name| (_ bv10 8))"));
    }

    #[test]
    fn test_declared_function() {
        let s = Session::default();
        let f = s
            .parse_script("(declare-fun f (Int) Bool) (declare-const k Int) (assert (f (+ k 1)))")
            .unwrap();
        assert_eq!(f.to_string(), "f((k + 1))");
        assert_eq!(f.functions()[0].domain(), &[Sort::Int]);
    }

    #[test]
    fn test_parse_errors() {
        let s = Session::default();
        assert!(matches!(s.parse_script("(declare-const a Bool)"), Err(Error::Parse(_))));
        assert!(matches!(s.parse_script("(assert (> y 1))"), Err(Error::Parse(_))));
        assert!(matches!(s.parse_script("(assert true"), Err(Error::Parse(_))));
        assert!(matches!(s.parse_script("(assert true))"), Err(Error::Parse(_))));
        assert!(matches!(s.parse_script("(declare-const a Int) (assert a)"), Err(Error::Parse(_))));
        assert!(matches!(
            s.parse_script("(declare-const a Int) (assert (and a true))"),
            Err(Error::IllSorted { .. })
        ));
    }
}
