//! Z3 backend.
//!
//! Formulas are translated to Z3 terms on a fresh solver for every check. Models are
//! read back for the free symbols of the checked formula, ordered by symbol id.
use std::collections::HashMap;

use ::z3::ast::{Bool, Int, BV};
use ::z3::{FuncDecl, Params, SatResult as Z3SatResult};
use log::debug;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::ToPrimitive;

use super::Solver;
use crate::error::{Error, Result};
use crate::formula::{FuncSymbol, Formula, Kind, Symbol};
use crate::model::{Model, ModelValue};
use crate::types::{Sort, SymbolId};

/// Solver backend using Z3.
///
/// Every check runs on a fresh Z3 solver, so no state survives between checks.
#[derive(Debug, Default, Clone)]
pub struct Z3Solver {
    timeout_ms: Option<u32>,
}

impl Z3Solver {
    pub fn new(timeout_ms: Option<u32>) -> Self {
        Self { timeout_ms }
    }

    pub fn timeout_ms(&self) -> Option<u32> {
        self.timeout_ms
    }

    fn native(&self) -> ::z3::Solver {
        let solver = ::z3::Solver::new();
        if let Some(ms) = self.timeout_ms {
            let mut params = Params::new();
            params.set_u32("timeout", ms);
            solver.set_params(&params);
        }
        solver
    }
}

impl Solver for Z3Solver {
    fn check(&self, formula: &Formula) -> Result<Option<Model>> {
        let mut translator = Translator::default();
        let assertion = translator.translate(formula)?.into_bool()?;

        let solver = self.native();
        solver.assert(&assertion);
        let result = solver.check();
        debug!("z3: check -> {:?}", result);

        match result {
            Z3SatResult::Unsat => Ok(None),
            Z3SatResult::Unknown => Err(Error::SolverUnknown(
                solver.get_reason_unknown().unwrap_or_else(|| "no reason given".to_string()),
            )),
            Z3SatResult::Sat => {
                let z3_model = solver
                    .get_model()
                    .ok_or_else(|| Error::Backend("SAT but no model available".into()))?;

                let mut symbols = formula.symbols();
                symbols.sort_by_key(Symbol::id);

                let mut entries = Vec::with_capacity(symbols.len());
                for symbol in symbols {
                    let term = translator.consts.get(&symbol.id()).ok_or_else(|| {
                        Error::Backend(format!("symbol `{}` was not translated", symbol.name()))
                    })?;
                    let value = match term {
                        Z3Term::Bool(b) => z3_model
                            .eval::<Bool>(b, true)
                            .and_then(|v| v.as_bool())
                            .map(ModelValue::Bool),
                        Z3Term::Int(i) => z3_model.eval::<Int>(i, true).and_then(|v| int_value(&v)),
                        Z3Term::BV(bv) => {
                            let width = symbol.sort().width().unwrap_or(0);
                            z3_model.eval::<BV>(bv, true).and_then(|v| bv_value(&v, width))
                        }
                    };
                    let value = value.ok_or_else(|| {
                        Error::Backend(format!("no model value for `{}`", symbol.name()))
                    })?;
                    entries.push((symbol, value));
                }
                Ok(Some(Model::new(entries)))
            }
        }
    }
}

fn int_value(v: &Int) -> Option<ModelValue> {
    if let Some(n) = v.as_i64() {
        return Some(ModelValue::Int(BigInt::from(n)));
    }
    // Printed as `123` or `(- 123)`.
    let text = v.to_string();
    let n = match text.strip_prefix("(- ").and_then(|t| t.strip_suffix(')')) {
        Some(magnitude) => -magnitude.trim().parse::<BigInt>().ok()?,
        None => text.trim().parse::<BigInt>().ok()?,
    };
    Some(ModelValue::Int(n))
}

fn bv_value(v: &BV, width: u32) -> Option<ModelValue> {
    if width <= 64 {
        if let Some(n) = v.as_u64() {
            return Some(ModelValue::BitVec {
                value: BigUint::from(n),
                width,
            });
        }
    }
    // Printed as `#x..` or `#b..`.
    let text = v.to_string();
    let value = if let Some(hex) = text.strip_prefix("#x") {
        BigUint::parse_bytes(hex.as_bytes(), 16)?
    } else if let Some(bin) = text.strip_prefix("#b") {
        BigUint::parse_bytes(bin.as_bytes(), 2)?
    } else {
        return None;
    };
    Some(ModelValue::BitVec { value, width })
}

#[derive(Clone)]
enum Z3Term {
    Bool(Bool),
    Int(Int),
    BV(BV),
}

impl Z3Term {
    fn into_bool(self) -> Result<Bool> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            _ => Err(Error::Backend("expected a Bool term".into())),
        }
    }

    fn into_int(self) -> Result<Int> {
        match self {
            Z3Term::Int(i) => Ok(i),
            _ => Err(Error::Backend("expected an Int term".into())),
        }
    }

    fn into_bv(self) -> Result<BV> {
        match self {
            Z3Term::BV(bv) => Ok(bv),
            _ => Err(Error::Backend("expected a bit-vector term".into())),
        }
    }

    fn as_ast(&self) -> &dyn ::z3::ast::Ast {
        match self {
            Z3Term::Bool(b) => b,
            Z3Term::Int(i) => i,
            Z3Term::BV(bv) => bv,
        }
    }
}

fn z3_sort(sort: Sort) -> ::z3::Sort {
    match sort {
        Sort::Bool => ::z3::Sort::bool(),
        Sort::Int => ::z3::Sort::int(),
        Sort::BitVec(w) => ::z3::Sort::bitvector(w),
    }
}

fn int_const(n: &BigInt) -> Int {
    if let Some(small) = n.to_i64() {
        return Int::from_i64(small);
    }
    let (sign, digits) = n.to_u32_digits();
    let base = Int::from_u64(1 << 32);
    let mut acc = Int::from_u64(0);
    for digit in digits.iter().rev() {
        acc = &(&acc * &base) + &Int::from_u64(*digit as u64);
    }
    if sign == Sign::Minus {
        acc = &Int::from_i64(0) - &acc;
    }
    acc
}

fn bv_const(value: &BigUint, width: u32) -> BV {
    if width <= 64 {
        return BV::from_u64(value.to_u64().unwrap_or_default(), width);
    }
    // Concatenate 64-bit limbs, most significant first.
    let limbs = value.to_u64_digits();
    let count = (width as usize + 63) / 64;
    let mut acc: Option<BV> = None;
    for i in (0..count).rev() {
        let limb_width = if i == count - 1 { width - 64 * (count as u32 - 1) } else { 64 };
        let limb = BV::from_u64(limbs.get(i).copied().unwrap_or(0), limb_width);
        acc = Some(match acc {
            Some(high) => high.concat(&limb),
            None => limb,
        });
    }
    acc.unwrap_or_else(|| BV::from_u64(0, width))
}

/// Translates formulas into Z3 terms, creating each constant and function once.
#[derive(Default)]
struct Translator {
    consts: HashMap<SymbolId, Z3Term>,
    funcs: HashMap<SymbolId, FuncDecl>,
}

impl Translator {
    fn constant(&mut self, s: &Symbol) -> Z3Term {
        if let Some(term) = self.consts.get(&s.id()) {
            return term.clone();
        }
        // Names may repeat across symbols; ids do not.
        let name = format!("{}!{}", s.name(), s.id().id());
        let term = match s.sort() {
            Sort::Bool => Z3Term::Bool(Bool::new_const(name)),
            Sort::Int => Z3Term::Int(Int::new_const(name)),
            Sort::BitVec(w) => Z3Term::BV(BV::new_const(name, w)),
        };
        self.consts.insert(s.id(), term.clone());
        term
    }

    fn func_decl(&mut self, f: &FuncSymbol) -> &FuncDecl {
        self.funcs.entry(f.id()).or_insert_with(|| {
            let domain: Vec<::z3::Sort> = f.domain().iter().map(|&s| z3_sort(s)).collect();
            let domain: Vec<&::z3::Sort> = domain.iter().collect();
            FuncDecl::new(format!("{}!{}", f.name(), f.id().id()), &domain, &z3_sort(f.range()))
        })
    }

    fn translate(&mut self, formula: &Formula) -> Result<Z3Term> {
        let term = match formula {
            Formula::Symbol(s) => self.constant(s),
            Formula::Bool(b) => Z3Term::Bool(Bool::from_bool(*b)),
            Formula::Int(n) => Z3Term::Int(int_const(n)),
            Formula::BitVec { value, width } => Z3Term::BV(bv_const(value, *width)),
            Formula::Call(call) => {
                let args = call
                    .args()
                    .iter()
                    .map(|arg| self.translate(arg))
                    .collect::<Result<Vec<_>>>()?;
                let refs: Vec<&dyn ::z3::ast::Ast> = args.iter().map(Z3Term::as_ast).collect();
                let applied = self.func_decl(call.func()).apply(&refs);
                match call.func().range() {
                    Sort::Bool => Z3Term::Bool(applied.as_bool().ok_or_else(|| mismatch(call.func()))?),
                    Sort::Int => Z3Term::Int(applied.as_int().ok_or_else(|| mismatch(call.func()))?),
                    Sort::BitVec(_) => Z3Term::BV(applied.as_bv().ok_or_else(|| mismatch(call.func()))?),
                }
            }
            Formula::App(app) => {
                let args = app
                    .args()
                    .iter()
                    .map(|arg| self.translate(arg))
                    .collect::<Result<Vec<_>>>()?;
                translate_app(app.kind(), args)?
            }
        };
        Ok(term)
    }
}

fn mismatch(f: &FuncSymbol) -> Error {
    Error::Backend(format!("application of `{}` has an unexpected sort", f.name()))
}

fn bools(args: Vec<Z3Term>) -> Result<Vec<Bool>> {
    args.into_iter().map(Z3Term::into_bool).collect()
}

fn ints(args: Vec<Z3Term>) -> Result<Vec<Int>> {
    args.into_iter().map(Z3Term::into_int).collect()
}

fn pair<T>(mut args: Vec<T>) -> Result<(T, T)> {
    match (args.pop(), args.pop(), args.is_empty()) {
        (Some(r), Some(l), true) => Ok((l, r)),
        _ => Err(Error::Backend("expected two arguments".into())),
    }
}

fn single<T>(mut args: Vec<T>) -> Result<T> {
    match (args.pop(), args.is_empty()) {
        (Some(x), true) => Ok(x),
        _ => Err(Error::Backend("expected one argument".into())),
    }
}

fn translate_app(kind: Kind, args: Vec<Z3Term>) -> Result<Z3Term> {
    let term = match kind {
        Kind::Not => Z3Term::Bool(single(bools(args)?)?.not()),
        Kind::And => {
            let bools = bools(args)?;
            let refs: Vec<&Bool> = bools.iter().collect();
            Z3Term::Bool(Bool::and(&refs))
        }
        Kind::Or => {
            let bools = bools(args)?;
            let refs: Vec<&Bool> = bools.iter().collect();
            Z3Term::Bool(Bool::or(&refs))
        }
        Kind::Xor => {
            let (l, r) = pair(bools(args)?)?;
            Z3Term::Bool(l.xor(&r))
        }
        Kind::Implies => {
            let (l, r) = pair(bools(args)?)?;
            Z3Term::Bool(l.implies(&r))
        }
        Kind::Iff => {
            let (l, r) = pair(bools(args)?)?;
            Z3Term::Bool(l.iff(&r))
        }
        Kind::Ite => {
            let mut args = args.into_iter();
            let cond = args.next().ok_or_else(|| Error::Backend("`ite` without a condition".into()))?;
            let cond = cond.into_bool()?;
            match pair(args.collect())? {
                (Z3Term::Bool(t), Z3Term::Bool(e)) => Z3Term::Bool(cond.ite(&t, &e)),
                (Z3Term::Int(t), Z3Term::Int(e)) => Z3Term::Int(cond.ite(&t, &e)),
                (Z3Term::BV(t), Z3Term::BV(e)) => Z3Term::BV(cond.ite(&t, &e)),
                _ => return Err(Error::Backend("sort mismatch in `ite`".into())),
            }
        }
        Kind::Eq => match pair(args)? {
            (Z3Term::Bool(l), Z3Term::Bool(r)) => Z3Term::Bool(l.eq(&r)),
            (Z3Term::Int(l), Z3Term::Int(r)) => Z3Term::Bool(l.eq(&r)),
            (Z3Term::BV(l), Z3Term::BV(r)) => Z3Term::Bool(l.eq(&r)),
            _ => return Err(Error::Backend("sort mismatch in `=`".into())),
        },

        Kind::Plus | Kind::Times | Kind::Minus => {
            let mut ints = ints(args)?.into_iter();
            let first = ints
                .next()
                .ok_or_else(|| Error::Backend("arithmetic without arguments".into()))?;
            let rest: Vec<Int> = ints.collect();
            let value = match kind {
                Kind::Minus if rest.is_empty() => &Int::from_i64(0) - &first,
                Kind::Minus => rest.iter().fold(first, |acc, x| &acc - x),
                Kind::Plus => rest.iter().fold(first, |acc, x| &acc + x),
                _ => rest.iter().fold(first, |acc, x| &acc * x),
            };
            Z3Term::Int(value)
        }
        Kind::Div => {
            let (l, r) = pair(ints(args)?)?;
            Z3Term::Int(l.div(&r))
        }
        Kind::Mod => {
            let (l, r) = pair(ints(args)?)?;
            Z3Term::Int(l.modulo(&r))
        }
        Kind::Lt | Kind::Le | Kind::Gt | Kind::Ge => {
            let (l, r) = pair(ints(args)?)?;
            Z3Term::Bool(match kind {
                Kind::Lt => l.lt(&r),
                Kind::Le => l.le(&r),
                Kind::Gt => l.gt(&r),
                _ => l.ge(&r),
            })
        }

        Kind::BvNot => Z3Term::BV(single(args)?.into_bv()?.bvnot()),
        _ => {
            let (l, r) = pair(args)?;
            let (l, r) = (l.into_bv()?, r.into_bv()?);
            match kind {
                Kind::BvAnd => Z3Term::BV(l.bvand(&r)),
                Kind::BvOr => Z3Term::BV(l.bvor(&r)),
                Kind::BvXor => Z3Term::BV(l.bvxor(&r)),
                Kind::BvAdd => Z3Term::BV(l.bvadd(&r)),
                Kind::BvSub => Z3Term::BV(l.bvsub(&r)),
                Kind::BvMul => Z3Term::BV(l.bvmul(&r)),
                Kind::BvUdiv => Z3Term::BV(l.bvudiv(&r)),
                Kind::BvUrem => Z3Term::BV(l.bvurem(&r)),
                Kind::BvShl => Z3Term::BV(l.bvshl(&r)),
                Kind::BvLshr => Z3Term::BV(l.bvlshr(&r)),
                Kind::BvUlt => Z3Term::Bool(l.bvult(&r)),
                Kind::BvUle => Z3Term::Bool(l.bvule(&r)),
                Kind::BvUgt => Z3Term::Bool(l.bvugt(&r)),
                Kind::BvUge => Z3Term::Bool(l.bvuge(&r)),
                _ => return Err(Error::Backend(format!("unexpected operator `{}`", kind.smtlib_name()))),
            }
        }
    };
    Ok(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(id: u32, name: &str, sort: Sort) -> Symbol {
        Symbol::new(SymbolId::new(id), name.into(), sort)
    }

    #[test]
    fn test_sat_with_model() -> Result<()> {
        let a = sym(0, "a", Sort::Int);
        let f = Formula::app(Kind::Gt, vec![Formula::symbol(&a), Formula::int(0)])?;
        let model = Z3Solver::default().check(&f)?.expect("satisfiable");
        assert_eq!(model.len(), 1);
        assert_eq!(model.eval(&f), Some(ModelValue::Bool(true)));
        Ok(())
    }

    #[test]
    fn test_unsat() -> Result<()> {
        let a = sym(0, "a", Sort::Int);
        let twice = Formula::app(Kind::Times, vec![Formula::symbol(&a), Formula::int(2)])?;
        let f = Formula::app(Kind::Eq, vec![twice, Formula::int(7)])?;
        assert!(Z3Solver::new(Some(5000)).check(&f)?.is_none());
        Ok(())
    }

    #[test]
    fn test_wide_constants() -> Result<()> {
        let big: BigInt = BigInt::from(u64::MAX) * 4 + 3;
        let x = sym(0, "x", Sort::Int);
        let f = Formula::app(Kind::Eq, vec![Formula::symbol(&x), Formula::Int(big.clone())])?;
        let model = Z3Solver::default().check(&f)?.expect("satisfiable");
        assert_eq!(model.get(x.id()), Some(&ModelValue::Int(big.clone())));

        let y = sym(1, "y", Sort::BitVec(72));
        let wide = Formula::bitvec(&big, 72);
        let f = Formula::app(Kind::Eq, vec![Formula::symbol(&y), wide.clone()])?;
        let model = Z3Solver::default().check(&f)?.expect("satisfiable");
        assert_eq!(model.eval(&Formula::symbol(&y)), model.eval(&wide));
        Ok(())
    }

    #[test]
    fn test_uninterpreted_function() -> Result<()> {
        let p = sym(0, "p", Sort::Bool);
        let f = FuncSymbol::new(SymbolId::new(1), "f".into(), vec![Sort::Bool], Sort::Bool);
        let call = Formula::call(&f, vec![Formula::symbol(&p)])?;
        let formula = Formula::and(call, Formula::not(Formula::symbol(&p))?)?;
        let model = Z3Solver::default().check(&formula)?.expect("satisfiable");
        assert_eq!(model.get(p.id()), Some(&ModelValue::Bool(false)));
        Ok(())
    }
}
