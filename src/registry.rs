//! Per-kind instance collections.
//!
//! The registry owns every symbolic value and named function created in a session,
//! together with each value's clause frontier. It replaces implicit, process-wide
//! registration: instances live exactly as long as the session (or until a reset).
//!
//! Identifiers come from monotonic counters that a [`Registry::clear`] does not rewind,
//! so a handle from before a reset can never alias a newer instance.
use std::collections::HashMap;
use std::rc::Rc;

use crate::constraint::Constraint;
use crate::function::FunctionBody;
use crate::types::{FunctionId, ValueId};

/// The kind of a symbolic value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ValueKind {
    Plain,
    BitVec(u32),
}

#[derive(Debug)]
pub(crate) struct ValueEntry {
    pub(crate) name: Rc<str>,
    pub(crate) kind: ValueKind,
    /// Live clauses, in creation order.
    pub(crate) clauses: Vec<Rc<Constraint>>,
}

pub(crate) struct FunctionEntry {
    pub(crate) name: Rc<str>,
    pub(crate) body: FunctionBody,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_value: u32,
    next_function: u32,
    values: HashMap<ValueId, ValueEntry>,
    functions: HashMap<FunctionId, FunctionEntry>,
    variables: Vec<ValueId>,
    bitvecs: Vec<ValueId>,
    function_order: Vec<FunctionId>,
}

impl Registry {
    /// Reserves the next value id (used for fresh names before registration).
    pub(crate) fn peek_value_id(&self) -> ValueId {
        ValueId::new(self.next_value)
    }

    pub(crate) fn add_value(&mut self, name: Rc<str>, kind: ValueKind) -> ValueId {
        let id = ValueId::new(self.next_value);
        self.next_value += 1;
        self.values.insert(
            id,
            ValueEntry {
                name,
                kind,
                clauses: Vec::new(),
            },
        );
        match kind {
            ValueKind::Plain => self.variables.push(id),
            ValueKind::BitVec(_) => self.bitvecs.push(id),
        }
        id
    }

    pub(crate) fn add_function(&mut self, name: Rc<str>, body: FunctionBody) -> FunctionId {
        let id = FunctionId::new(self.next_function);
        self.next_function += 1;
        self.functions.insert(id, FunctionEntry { name, body });
        self.function_order.push(id);
        id
    }

    pub(crate) fn value(&self, id: ValueId) -> &ValueEntry {
        match self.values.get(&id) {
            Some(entry) => entry,
            None => panic!("Value {} does not belong to this session (was it created before a reset?)", id),
        }
    }

    pub(crate) fn value_mut(&mut self, id: ValueId) -> &mut ValueEntry {
        match self.values.get_mut(&id) {
            Some(entry) => entry,
            None => panic!("Value {} does not belong to this session (was it created before a reset?)", id),
        }
    }

    pub(crate) fn function(&self, id: FunctionId) -> &FunctionEntry {
        match self.functions.get(&id) {
            Some(entry) => entry,
            None => panic!("Function {} does not belong to this session (was it created before a reset?)", id),
        }
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut FunctionEntry {
        match self.functions.get_mut(&id) {
            Some(entry) => entry,
            None => panic!("Function {} does not belong to this session (was it created before a reset?)", id),
        }
    }

    /// Plain variables, in creation order.
    pub(crate) fn variables(&self) -> &[ValueId] {
        &self.variables
    }

    /// Bit-vectors, in creation order.
    pub(crate) fn bitvecs(&self) -> &[ValueId] {
        &self.bitvecs
    }

    /// Named functions, in creation order.
    pub(crate) fn functions(&self) -> &[FunctionId] {
        &self.function_order
    }

    /// Removes every structurally equal copy of `target` from the clauses of `owner`.
    ///
    /// Returns the number of removed clauses.
    pub(crate) fn retract(&mut self, owner: ValueId, target: &Constraint) -> usize {
        let clauses = &mut self.value_mut(owner).clauses;
        let before = clauses.len();
        clauses.retain(|c| **c != *target);
        before - clauses.len()
    }

    /// Forgets every instance. Id counters keep running.
    pub(crate) fn clear(&mut self) {
        self.values.clear();
        self.functions.clear();
        self.variables.clear();
        self.bitvecs.clear();
        self.function_order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraint::{Literal, Operand, Subject};
    use crate::op::Op;

    #[test]
    fn test_per_kind_collections() {
        let mut registry = Registry::default();
        let a = registry.add_value("a".into(), ValueKind::Plain);
        let x = registry.add_value("x".into(), ValueKind::BitVec(8));
        let b = registry.add_value("b".into(), ValueKind::Plain);
        assert_eq!(registry.variables(), &[a, b]);
        assert_eq!(registry.bitvecs(), &[x]);
        assert_eq!(registry.value(x).kind, ValueKind::BitVec(8));
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut registry = Registry::default();
        let a = registry.add_value("a".into(), ValueKind::Plain);
        registry.clear();
        assert!(registry.variables().is_empty());
        let b = registry.add_value("b".into(), ValueKind::Plain);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "does not belong to this session")]
    fn test_stale_handle_panics() {
        let mut registry = Registry::default();
        let a = registry.add_value("a".into(), ValueKind::Plain);
        registry.clear();
        registry.value(a);
    }

    #[test]
    fn test_retract_is_structural() {
        let mut registry = Registry::default();
        let a = registry.add_value("a".into(), ValueKind::Plain);
        let c = Constraint::new(Subject::Value(a), Op::Gt, Some(Operand::Literal(Literal::Int(2))));
        registry.value_mut(a).clauses.push(Rc::new(c.clone()));
        registry.value_mut(a).clauses.push(Rc::new(c.clone()));
        assert_eq!(registry.retract(a, &c), 2);
        assert!(registry.value(a).clauses.is_empty());
    }
}
