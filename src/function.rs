//! Named boolean functions.
//!
//! A named function captures a boolean-valued expression under a name. Its body is
//! produced lazily by a zero-argument closure, evaluated at most once: either when the
//! function is [called][Session::call] or when the session collects all constraints.
//! Once evaluated, the function contributes the single constraint `name(body)`, which
//! lowers to `name(x1, .., xn) <-> body` over the distinct values of the body.
//!
//! ```
//! use smtfe_rs::session::Session;
//!
//! let s = Session::default();
//! let a = s.mk_var("a");
//! let b = s.mk_var("b");
//!
//! let demorgan = s.mk_function("demorgan", move || (a & b).eq(!(!a | !b)));
//! assert!(!s.is_evaluated(demorgan));
//!
//! let applied = s.call(demorgan);
//! assert_eq!(s.show(&applied), "demorgan(((a & b) == (!((!a) | (!b)))))");
//!
//! // Calling again does not evaluate the body a second time.
//! assert_eq!(s.call(demorgan), applied);
//! assert_eq!(s.clauses(a).len(), 1);
//! ```
use std::rc::Rc;

use log::debug;

use crate::constraint::Constraint;
use crate::expr::Expr;
use crate::op::Op;
use crate::session::Session;
use crate::types::FunctionId;

/// Handle of a named function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Function(FunctionId);

impl Function {
    pub(crate) const fn new(id: FunctionId) -> Self {
        Function(id)
    }

    pub const fn id(self) -> FunctionId {
        self.0
    }
}

pub(crate) type Producer = Box<dyn FnOnce() -> Expr>;

/// Two-state body of a named function.
pub(crate) enum FunctionBody {
    Unevaluated(Producer),
    /// Transient state while the producer runs.
    Evaluating,
    Evaluated(Rc<Constraint>),
}

impl Session {
    /// Defines a named function whose body is built by `producer` on first use.
    pub fn mk_function<F, E>(&self, name: &str, producer: F) -> Function
    where
        F: FnOnce() -> E + 'static,
        E: Into<Expr>,
    {
        let producer: Producer = Box::new(move || producer().into());
        let id = self
            .registry
            .borrow_mut()
            .add_function(name.into(), FunctionBody::Unevaluated(producer));
        debug!("mk_function(name = {}) -> {}", name, id);
        Function(id)
    }

    pub fn function_name(&self, f: Function) -> Rc<str> {
        Rc::clone(&self.registry.borrow().function(f.0).name)
    }

    pub fn is_evaluated(&self, f: Function) -> bool {
        matches!(self.registry.borrow().function(f.0).body, FunctionBody::Evaluated(_))
    }

    /// Evaluates the body of `f` (once) and returns the constraint it contributes.
    ///
    /// # Panics
    ///
    /// Panics if the body is a bare literal, or if the producer calls `f` itself.
    pub fn call(&self, f: Function) -> Rc<Constraint> {
        let producer = {
            let mut registry = self.registry.borrow_mut();
            let entry = registry.function_mut(f.0);
            match std::mem::replace(&mut entry.body, FunctionBody::Evaluating) {
                FunctionBody::Evaluated(applied) => {
                    entry.body = FunctionBody::Evaluated(Rc::clone(&applied));
                    return applied;
                }
                FunctionBody::Evaluating => {
                    panic!("Function `{}` is defined in terms of itself", entry.name)
                }
                FunctionBody::Unevaluated(producer) => producer,
            }
        };

        // The registry must not be borrowed here: the producer builds constraints.
        let body = match self.eval(producer()).into_subject() {
            Ok(body) => body,
            Err(lit) => panic!(
                "Body of function `{}` is the literal {}, not a constraint",
                self.function_name(f),
                lit
            ),
        };

        let applied = Rc::new(Constraint::new(body, Op::Apply(f.0), None));
        debug!("call({}) -> {}", f.0, applied);
        self.registry.borrow_mut().function_mut(f.0).body = FunctionBody::Evaluated(Rc::clone(&applied));
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_lazy_until_called() {
        let s = Session::default();
        let a = s.mk_var("a");
        let f = s.mk_function("positive", move || a.gt(0));
        assert!(!s.is_evaluated(f));
        assert!(s.clauses(a).is_empty());

        s.call(f);
        assert!(s.is_evaluated(f));
        assert_eq!(s.clauses(a).len(), 1);
    }

    #[test]
    fn test_call_is_idempotent() {
        let s = Session::default();
        let a = s.mk_var("a");
        let b = s.mk_var("b");
        let f = s.mk_function("both", move || a & b);

        let first = s.call(f);
        let second = s.call(f);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(s.clauses(a).len(), 1);
        assert_eq!(s.show(&first), "both((a & b))");
    }

    #[test]
    fn test_function_registered() {
        let s = Session::default();
        let a = s.mk_var("a");
        let f = s.mk_function("id", move || !a);
        assert_eq!(s.functions(), vec![f]);
        assert_eq!(&*s.function_name(f), "id");
    }

    #[test]
    #[should_panic(expected = "is the literal")]
    fn test_literal_body_panics() {
        let s = Session::default();
        let f = s.mk_function("konst", || true);
        s.call(f);
    }
}
