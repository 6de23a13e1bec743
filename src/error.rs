//! Errors of lowering, solving and SMT-LIB parsing.
//!
//! Unsatisfiability is not an error: it is reported as an absent model.
use thiserror::Error;

use crate::types::Sort;

#[derive(Debug, Error)]
pub enum Error {
    /// No sort can be derived for a subtree that needs one.
    #[error("cannot determine the sort of `{0}`")]
    UndeterminedSort(String),

    /// A value's cached backend symbol was requested at another sort.
    #[error("symbol `{name}` was created with sort {cached}, but is now used as {requested}")]
    SymbolSortMismatch { name: String, cached: Sort, requested: Sort },

    /// An operator has no backend counterpart at the given sort.
    #[error("operator `{op}` is not supported for sort {sort}")]
    UnsupportedOperator { op: String, sort: Sort },

    /// A backend formula node received arguments of the wrong sorts or number.
    #[error("ill-sorted `{kind}`: {detail}")]
    IllSorted { kind: String, detail: String },

    /// A literal cannot be represented at the requested sort.
    #[error("literal `{literal}` cannot be used as {sort}")]
    LiteralSort { literal: String, sort: Sort },

    /// A constraint node of a shape that cannot be lowered.
    #[error("unsupported constraint shape: {0}")]
    UnsupportedShape(String),

    /// A conjunction over zero constraints was requested.
    #[error("cannot join an empty sequence of constraints")]
    EmptyJoin,

    /// A value selected for rendering occurs in no lowered constraint, so no model mentions it.
    #[error("value `{0}` does not occur in any constraint")]
    Unconstrained(String),

    /// The backend could not decide satisfiability.
    #[error("solver returned unknown: {0}")]
    SolverUnknown(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),

    /// Malformed SMT-LIB input.
    #[error("parse error: {0}")]
    Parse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let e = Error::SymbolSortMismatch {
            name: "a".to_string(),
            cached: Sort::Int,
            requested: Sort::Bool,
        };
        assert_eq!(
            e.to_string(),
            "symbol `a` was created with sort Int, but is now used as Bool"
        );
        assert_eq!(
            Error::EmptyJoin.to_string(),
            "cannot join an empty sequence of constraints"
        );
    }
}
