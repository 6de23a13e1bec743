//! Satisfying assignments.
//!
//! A [`Model`] maps backend symbols to [`ModelValue`]s. Besides printing, a model can
//! [evaluate][Model::eval] any call-free formula, which is how callers check that a
//! model returned by a backend really satisfies the lowered constraints.
use std::cmp::Ordering;
use std::fmt;

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::formula::{Formula, Kind, Symbol};
use crate::types::{Sort, SymbolId};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ModelValue {
    Bool(bool),
    Int(BigInt),
    BitVec { value: BigUint, width: u32 },
}

impl ModelValue {
    pub fn sort(&self) -> Sort {
        match self {
            ModelValue::Bool(_) => Sort::Bool,
            ModelValue::Int(_) => Sort::Int,
            ModelValue::BitVec { width, .. } => Sort::BitVec(*width),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ModelValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            ModelValue::Int(n) => Some(n),
            _ => None,
        }
    }

    /// The value as `i64`, for integers and bit-vectors that fit.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ModelValue::Bool(_) => None,
            ModelValue::Int(n) => n.to_i64(),
            ModelValue::BitVec { value, .. } => value.to_i64(),
        }
    }
}

impl fmt::Display for ModelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelValue::Bool(b) => write!(f, "{}", b),
            ModelValue::Int(n) => write!(f, "{}", n),
            ModelValue::BitVec { value, width } => write!(f, "{}_{}", value, width),
        }
    }
}

/// Formats `value` as `#x` followed by at least `digits` lowercase hex digits.
pub fn format_hex(value: &BigUint, digits: usize) -> String {
    format!("#x{:0digits$x}", value, digits = digits)
}

/// Number of hex digits needed for `width` bits.
pub fn hex_digits(width: u32) -> usize {
    (width as usize + 3) / 4
}

/// A satisfying assignment, ordered by symbol identity.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Model {
    entries: Vec<(Symbol, ModelValue)>,
}

impl Model {
    pub fn new(mut entries: Vec<(Symbol, ModelValue)>) -> Self {
        entries.sort_by_key(|(s, _)| s.id());
        entries.dedup_by_key(|(s, _)| s.id());
        Self { entries }
    }

    pub fn entries(&self) -> &[(Symbol, ModelValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &ModelValue)> {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    pub fn get(&self, id: SymbolId) -> Option<&ModelValue> {
        self.entries
            .binary_search_by_key(&id, |(s, _)| s.id())
            .ok()
            .map(|i| &self.entries[i].1)
    }

    /// Value of the first symbol called `name`.
    pub fn get_by_name(&self, name: &str) -> Option<&ModelValue> {
        self.entries.iter().find(|(s, _)| s.name() == name).map(|(_, v)| v)
    }

    /// Evaluates `formula` under this model.
    ///
    /// Returns `None` if the formula mentions a symbol missing from the model, applies an
    /// uninterpreted function, or divides an integer by zero. Bit-vector division by zero
    /// follows SMT-LIB: `bvudiv` yields all ones, `bvurem` yields the dividend.
    pub fn eval(&self, formula: &Formula) -> Option<ModelValue> {
        match formula {
            Formula::Symbol(s) => self.get(s.id()).cloned(),
            Formula::Bool(b) => Some(ModelValue::Bool(*b)),
            Formula::Int(n) => Some(ModelValue::Int(n.clone())),
            Formula::BitVec { value, width } => Some(ModelValue::BitVec {
                value: value.clone(),
                width: *width,
            }),
            Formula::Call(_) => None,
            Formula::App(app) if app.kind() == Kind::Ite => match app.args() {
                [c, t, e] => match self.eval(c)?.as_bool()? {
                    true => self.eval(t),
                    false => self.eval(e),
                },
                _ => None,
            },
            Formula::App(app) => {
                let args = app
                    .args()
                    .iter()
                    .map(|arg| self.eval(arg))
                    .collect::<Option<Vec<_>>>()?;
                eval_app(app.kind(), &args)
            }
        }
    }
}

fn bools(args: &[ModelValue]) -> Option<Vec<bool>> {
    args.iter().map(ModelValue::as_bool).collect()
}

fn ints(args: &[ModelValue]) -> Option<Vec<&BigInt>> {
    args.iter().map(ModelValue::as_int).collect()
}

fn bitvecs(args: &[ModelValue]) -> Option<(Vec<&BigUint>, u32)> {
    let mut width = None;
    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            ModelValue::BitVec { value, width: w } => {
                width = Some(*w);
                values.push(value);
            }
            _ => return None,
        }
    }
    Some((values, width?))
}

/// Integer division with a non-negative remainder, as in SMT-LIB.
fn euclid(a: &BigInt, b: &BigInt) -> Option<(BigInt, BigInt)> {
    if b.is_zero() {
        return None;
    }
    let mut r = a % b;
    if r.is_negative() {
        r += b.abs();
    }
    let q = (a - &r) / b;
    Some((q, r))
}

fn eval_app(kind: Kind, args: &[ModelValue]) -> Option<ModelValue> {
    let value = match kind {
        Kind::Not | Kind::And | Kind::Or | Kind::Xor | Kind::Implies | Kind::Iff => {
            let b = bools(args)?;
            let result = match kind {
                Kind::Not => !b[0],
                Kind::And => b.iter().all(|&x| x),
                Kind::Or => b.iter().any(|&x| x),
                Kind::Xor => b[0] ^ b[1],
                Kind::Implies => !b[0] || b[1],
                _ => b[0] == b[1],
            };
            ModelValue::Bool(result)
        }

        Kind::Eq => ModelValue::Bool(args[0] == args[1]),

        Kind::Plus | Kind::Minus | Kind::Times | Kind::Div | Kind::Mod => {
            let n = ints(args)?;
            let result = match kind {
                Kind::Plus => n.iter().fold(BigInt::zero(), |acc, &x| acc + x),
                Kind::Times => n.iter().fold(BigInt::one(), |acc, &x| acc * x),
                Kind::Minus if n.len() == 1 => -n[0],
                Kind::Minus => n[1..].iter().fold(n[0].clone(), |acc, &x| acc - x),
                Kind::Div => euclid(n[0], n[1])?.0,
                _ => euclid(n[0], n[1])?.1,
            };
            ModelValue::Int(result)
        }

        Kind::Lt | Kind::Le | Kind::Gt | Kind::Ge => {
            let n = ints(args)?;
            ModelValue::Bool(compare(kind, n[0].cmp(n[1])))
        }

        Kind::BvUlt | Kind::BvUle | Kind::BvUgt | Kind::BvUge => {
            let (v, _) = bitvecs(args)?;
            ModelValue::Bool(compare(kind, v[0].cmp(v[1])))
        }

        _ => {
            let (v, width) = bitvecs(args)?;
            let modulus = BigUint::one() << width;
            let mask = &modulus - BigUint::one();
            let shift = |amount: &BigUint| amount.to_u32().filter(|&n| n < width);
            let value = match kind {
                Kind::BvNot => v[0] ^ &mask,
                Kind::BvAnd => v[0] & v[1],
                Kind::BvOr => v[0] | v[1],
                Kind::BvXor => v[0] ^ v[1],
                Kind::BvAdd => (v[0] + v[1]) % &modulus,
                Kind::BvSub => (v[0] + &modulus - v[1]) % &modulus,
                Kind::BvMul => (v[0] * v[1]) % &modulus,
                Kind::BvUdiv if v[1].is_zero() => mask,
                Kind::BvUdiv => v[0] / v[1],
                Kind::BvUrem if v[1].is_zero() => v[0].clone(),
                Kind::BvUrem => v[0] % v[1],
                Kind::BvShl => match shift(v[1]) {
                    Some(n) => (v[0] << n) % &modulus,
                    None => BigUint::zero(),
                },
                Kind::BvLshr => match shift(v[1]) {
                    Some(n) => v[0] >> n,
                    None => BigUint::zero(),
                },
                _ => return None,
            };
            ModelValue::BitVec { value, width }
        }
    };
    Some(value)
}

fn compare(kind: Kind, ordering: Ordering) -> bool {
    match kind {
        Kind::Lt | Kind::BvUlt => ordering == Ordering::Less,
        Kind::Le | Kind::BvUle => ordering != Ordering::Greater,
        Kind::Gt | Kind::BvUgt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (symbol, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} := {}", symbol.name(), value)?;
        }
        Ok(())
    }
}
