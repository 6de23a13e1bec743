//! # smtfe-rs: Infix constraints for SMT solvers
//!
//! **`smtfe-rs`** lets you write constraints over symbolic values with ordinary Rust
//! operators and hands them to an SMT solver.
//! Expressions are recorded as constraint trees, the trees are lowered to sorted solver
//! formulas, and a satisfying model is rendered back in terms of your values.
//!
//! ## How constraints are collected
//!
//! Every symbolic value keeps a list of *live clauses*: the top-level constraints built on
//! it that have not been absorbed into a larger expression yet.
//! Writing `(a + 2 * b).eq(7)` first records `b * 2` on `b`, then absorbs it into
//! `a + (b * 2)` on `a`, and finally into `((a + (b * 2)) == 7)`, again on `a`.
//! At solving time, the live clauses of all values (plus all named functions) are
//! conjoined, so every statement you wrote is asserted exactly once.
//!
//! ## Key Features
//!
//! - **Manager-Centric Architecture**: All state lives in a [`Session`][crate::session::Session]; values are small `Copy` handles ([`Var`][crate::expr::Var]) valid only together with their session.
//! - **Infix Sugar**: `+ - * / % & | ^ << >> !` and `eq/ne/lt/le/gt/ge` build lazy expressions that [`Session::eval`][crate::session::Session::eval] records.
//! - **Sort Inference**: Plain values get the sort of the literals and operators they meet; bit-vector values keep their declared width.
//! - **Named Functions**: Lazily evaluated boolean predicates, lowered as uninterpreted functions equivalent to their bodies.
//! - **SMT-LIB**: Formulas can be emitted as SMT-LIB 2 scripts and scripts can be read back.
//!
//! ## Basic Usage
//!
//! ```rust
//! use smtfe_rs::session::Session;
//!
//! let s = Session::default();
//! let a = s.mk_var("a");
//! let b = s.mk_var("b");
//!
//! s.eval(a.gt(2));
//! s.eval((a + 2 * b).eq(7));
//!
//! let formula = s.collect_all().unwrap();
//! assert_eq!(formula.to_string(), "((a > 2) & ((a + (b * 2)) = 7))");
//!
//! let model = s.get_model().unwrap().expect("satisfiable");
//! assert_eq!(model.eval(&formula).and_then(|v| v.as_bool()), Some(true));
//! ```
//!
//! ## Core Components
//!
//! - **[`session`]**: The [`Session`][crate::session::Session] manager and the clause frontier algorithm.
//! - **[`expr`]**: Operator overloading and lazy expressions.
//! - **[`translate`]**: Lowering of constraint trees to backend [`formula`]s.
//! - **[`backend`]**: The solver seam and the Z3 backend.
//! - **[`present`]**: Satisfiability checks and model rendering.
//! - **[`smtlib`]**: SMT-LIB 2 emission and parsing.

pub mod backend;
pub mod constraint;
pub mod error;
pub mod expr;
pub mod formula;
pub mod function;
pub mod infer;
pub mod model;
pub mod op;
pub mod present;
pub mod registry;
pub mod session;
pub mod smtlib;
pub mod translate;
pub mod types;
