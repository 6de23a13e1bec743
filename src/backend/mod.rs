//! Solver backends.
//!
//! The [`Solver`] trait is the only boundary between the frontend and a concrete SMT
//! solver: given a lowered [`Formula`], decide satisfiability and produce a [`Model`].
//! [`z3::Z3Solver`] is the default implementation.
use std::fmt;

use crate::error::Result;
use crate::formula::Formula;
use crate::model::Model;

pub mod z3;

/// Outcome of a satisfiability check.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SatResult {
    Sat,
    Unsat,
}

impl SatResult {
    pub fn is_sat(self) -> bool {
        self == SatResult::Sat
    }
}

impl fmt::Display for SatResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SatResult::Sat => write!(f, "sat"),
            SatResult::Unsat => write!(f, "unsat"),
        }
    }
}

pub trait Solver {
    /// Checks `formula` for satisfiability.
    ///
    /// Returns a model assigning every free symbol of `formula` if it is satisfiable,
    /// and `Ok(None)` if it is not. A solver that cannot decide returns an error.
    fn check(&self, formula: &Formula) -> Result<Option<Model>>;

    /// Drops any state the solver keeps between checks.
    fn reset(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sat_result_display() {
        assert_eq!(SatResult::Sat.to_string(), "sat");
        assert_eq!(SatResult::Unsat.to_string(), "unsat");
        assert!(SatResult::Sat.is_sat());
        assert!(!SatResult::Unsat.is_sat());
    }
}
