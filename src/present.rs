//! Solving and presenting models.
//!
//! These are thin wrappers over [`Session::collect_all`] and the session's solver.
//! Unsatisfiability is a normal outcome: it shows up as `Ok(None)`, [`SatResult::Unsat`]
//! or an empty rendering, never as an error.
use log::debug;

use crate::backend::SatResult;
use crate::error::{Error, Result};
use crate::expr::Var;
use crate::formula::Formula;
use crate::model::{format_hex, hex_digits, Model, ModelValue};
use crate::session::Session;

impl Session {
    /// Lowers every live constraint and asks the solver for a model.
    pub fn check_sat_model(&self) -> Result<Option<Model>> {
        let formula = self.collect_all()?;
        self.check_formula(&formula)
    }

    /// Asks the solver for a model of an already lowered (or parsed) formula.
    pub fn check_formula(&self, formula: &Formula) -> Result<Option<Model>> {
        debug!("check_formula: {}", formula);
        let model = self.solver().check(formula)?;
        debug!("check_formula: {}", if model.is_some() { "sat" } else { "unsat" });
        Ok(model)
    }

    pub fn check_sat(&self) -> Result<SatResult> {
        let result = match self.check_sat_model()? {
            Some(_) => SatResult::Sat,
            None => SatResult::Unsat,
        };
        Ok(result)
    }

    /// Same as [`Session::check_sat_model`].
    pub fn get_model(&self) -> Result<Option<Model>> {
        self.check_sat_model()
    }

    /// Model value of `var`, if the constraints are satisfiable and `var` was lowered.
    pub fn get_value(&self, var: Var) -> Result<Option<ModelValue>> {
        let model = match self.check_sat_model()? {
            Some(model) => model,
            None => return Ok(None),
        };
        Ok(self.cached_symbol(var).and_then(|s| model.get(s.id()).cloned()))
    }

    /// Renders the model as `((name value) ..)`, or an empty string if there is none.
    ///
    /// Only the entries of `selected` values are rendered, or every entry if `selected`
    /// is empty. Entries are ordered by backend symbol. Bit-vector values are printed as
    /// zero-padded hex, see [`SessionConfig::hex_digits`][crate::session::SessionConfig::hex_digits].
    ///
    /// Selecting a value that occurs in no constraint is an [`Error::Unconstrained`].
    pub fn render_values(&self, selected: &[Var]) -> Result<String> {
        let model = match self.check_sat_model()? {
            Some(model) => model,
            None => return Ok(String::new()),
        };

        let wanted = selected
            .iter()
            .map(|&v| match self.cached_symbol(v) {
                Some(symbol) => Ok(symbol.id()),
                None => Err(Error::Unconstrained(self.name(v).to_string())),
            })
            .collect::<Result<Vec<_>>>()?;

        let entries: Vec<String> = model
            .iter()
            .filter(|(s, _)| selected.is_empty() || wanted.contains(&s.id()))
            .map(|(s, value)| format!("({} {})", s.name(), self.render_value(value)))
            .collect();

        Ok(match &entries[..] {
            [] => String::new(),
            [single] => format!("({})", single),
            _ => format!("({})", entries.join("\n ")),
        })
    }

    fn render_value(&self, value: &ModelValue) -> String {
        match value {
            ModelValue::BitVec { value, width } => {
                let digits = self.config().hex_digits.unwrap_or_else(|| hex_digits(*width));
                format_hex(value, digits)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::backend::Solver;
    use crate::session::SessionConfig;

    use test_log::test;

    /// Answers every check with a fixed model and counts the checks.
    struct Fixed {
        model: Option<Vec<(&'static str, ModelValue)>>,
        checks: Rc<Cell<usize>>,
    }

    impl Solver for Fixed {
        fn check(&self, formula: &Formula) -> Result<Option<Model>> {
            self.checks.set(self.checks.get() + 1);
            let values = match &self.model {
                Some(values) => values,
                None => return Ok(None),
            };
            let entries = formula
                .symbols()
                .into_iter()
                .filter_map(|s| {
                    let value = values.iter().find(|(name, _)| *name == s.name())?.1.clone();
                    Some((s, value))
                })
                .collect();
            Ok(Some(Model::new(entries)))
        }
    }

    fn session(model: Option<Vec<(&'static str, ModelValue)>>, config: SessionConfig) -> (Session, Rc<Cell<usize>>) {
        let checks = Rc::new(Cell::new(0));
        let solver = Fixed {
            model,
            checks: Rc::clone(&checks),
        };
        (Session::with_solver(config, solver), checks)
    }

    fn bv(n: u32, width: u32) -> ModelValue {
        ModelValue::BitVec {
            value: n.into(),
            width,
        }
    }

    #[test]
    fn test_render_single_bitvec() {
        let (s, _) = session(Some(vec![("myu32", bv(10, 32))]), SessionConfig::default());
        let x = s.mk_bitvec("myu32", 32);
        s.eval(x.eq(10));
        assert_eq!(s.render_values(&[]).unwrap(), "((myu32 #x0000000a))");
    }

    #[test]
    fn test_render_pads_to_width() {
        let (s, _) = session(Some(vec![("x", bv(5, 12))]), SessionConfig::default());
        let x = s.mk_bitvec("x", 12);
        s.eval(x.eq(5));
        assert_eq!(s.render_values(&[x]).unwrap(), "((x #x005))");

        let config = SessionConfig {
            hex_digits: Some(8),
            ..SessionConfig::default()
        };
        let (s, _) = session(Some(vec![("x", bv(5, 12))]), config);
        let x = s.mk_bitvec("x", 12);
        s.eval(x.eq(5));
        assert_eq!(s.render_values(&[x]).unwrap(), "((x #x00000005))");
    }

    #[test]
    fn test_render_multiple_and_selection() {
        let model = vec![("a", ModelValue::Int(7.into())), ("b", ModelValue::Int(0.into()))];
        let (s, _) = session(Some(model), SessionConfig::default());
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        s.eval(a.gt(2));
        s.eval((a + 2 * b).eq(7));

        assert_eq!(s.render_values(&[]).unwrap(), "((a 7)\n (b 0))");
        assert_eq!(s.render_values(&[b]).unwrap(), "((b 0))");
    }

    #[test]
    fn test_unsat_renders_nothing() {
        let (s, checks) = session(None, SessionConfig::default());
        let a = s.mk_var("a");
        s.eval((a * 2).eq(7));
        assert_eq!(s.render_values(&[a]).unwrap(), "");
        assert_eq!(s.check_sat().unwrap(), SatResult::Unsat);
        assert!(s.get_model().unwrap().is_none());
        assert_eq!(s.get_value(a).unwrap(), None);
        assert_eq!(checks.get(), 4);
    }

    #[test]
    fn test_get_value() {
        let (s, _) = session(Some(vec![("p", ModelValue::Bool(true))]), SessionConfig::default());
        let p = s.mk_var("p");
        s.eval(p.eq(true));
        assert_eq!(s.check_sat().unwrap(), SatResult::Sat);
        assert_eq!(s.get_value(p).unwrap(), Some(ModelValue::Bool(true)));
        assert_eq!(s.render_values(&[p]).unwrap(), "((p true))");
    }

    #[test]
    fn test_render_unconstrained_selection() {
        let (s, checks) = session(Some(vec![("a", ModelValue::Int(3.into()))]), SessionConfig::default());
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        s.eval(a.eq(3));

        match s.render_values(&[b]) {
            Err(Error::Unconstrained(name)) => assert_eq!(name, "b"),
            other => panic!("expected an unconstrained value, got {:?}", other),
        }
        assert!(s.render_values(&[a, b]).is_err());
        assert_eq!(s.render_values(&[a]).unwrap(), "((a 3))");
        assert_eq!(s.get_value(b).unwrap(), None);
        assert_eq!(checks.get(), 4);
    }

    #[test]
    fn test_errors_propagate() {
        let (s, checks) = session(None, SessionConfig::default());
        assert!(s.check_sat().is_err());
        assert_eq!(checks.get(), 0);
    }
}
