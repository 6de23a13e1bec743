//! End-to-end tests: building constraints, lowering them and solving with Z3.

use num_bigint::BigInt;
use smtfe_rs::backend::SatResult;
use smtfe_rs::constraint::{Literal, Operand, Subject};
use smtfe_rs::error::Error;
use smtfe_rs::model::ModelValue;
use smtfe_rs::op::Op;
use smtfe_rs::session::{Session, SessionConfig};
use smtfe_rs::types::Sort;

fn int(s: &Session, model: &smtfe_rs::model::Model, var: smtfe_rs::expr::Var) -> BigInt {
    let symbol = s.cached_symbol(var).expect("lowered");
    model.get(symbol.id()).and_then(|v| v.as_int()).cloned().expect("int value")
}

fn boolean(s: &Session, model: &smtfe_rs::model::Model, var: smtfe_rs::expr::Var) -> bool {
    let symbol = s.cached_symbol(var).expect("lowered");
    model.get(symbol.id()).and_then(|v| v.as_bool()).expect("bool value")
}

// ─── Construction ──────────────────────────────────────────────────────────────

#[test]
fn fresh_value_gets_one_clause() {
    let s = Session::default();
    let a = s.mk_fresh_var();
    s.eval(a.le(5));

    let clauses = s.clauses(a);
    assert_eq!(clauses.len(), 1);
    assert_eq!(clauses[0].left(), &Subject::Value(a.id()));
    assert_eq!(clauses[0].op(), Op::Le);
    assert_eq!(clauses[0].right(), Some(&Operand::Literal(Literal::Int(5))));
}

#[test]
fn left_to_right_absorption() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval((a + 3 * b).eq(11));

    assert!(s.clauses(b).is_empty());
    let clauses = s.clauses(a);
    assert_eq!(clauses.len(), 1);
    assert_eq!(s.show(&clauses[0]), "((a + (b * 3)) == 11)");
}

#[test]
fn two_symbols_are_lowered_swapped() {
    let s = Session::default();
    let x = s.mk_var("x");
    let y = s.mk_var("y");
    s.eval(x | y);

    let f = s.lower(&s.clauses(x)[0]).unwrap();
    assert_eq!(f.to_string(), "(y | x)");
    assert_eq!(f.args()[0].as_symbol().unwrap().name(), "y");
}

// ─── Satisfiability ────────────────────────────────────────────────────────────

#[test]
fn single_constraint_is_satisfiable() {
    let s = Session::default();
    let a = s.mk_var("a");
    s.eval(a.gt(0));

    let model = s.check_sat_model().unwrap().expect("satisfiable");
    assert!(int(&s, &model, a) > BigInt::from(0));
    assert_eq!(s.check_sat().unwrap(), SatResult::Sat);
}

#[test]
fn independent_constraints_are_joined() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval(a.gt(2));
    s.eval((a + 2 * b).eq(7));

    let formula = s.collect_all().unwrap();
    let model = s.get_model().unwrap().expect("satisfiable");
    assert_eq!(model.eval(&formula), Some(ModelValue::Bool(true)));

    let (a, b) = (int(&s, &model, a), int(&s, &model, b));
    assert!(a > BigInt::from(2));
    assert_eq!(a + b * 2, BigInt::from(7));
}

#[test]
fn contradiction_has_no_model() {
    let s = Session::default();
    let a = s.mk_var("a");
    s.eval((a * 2).eq(7));

    assert!(s.check_sat_model().unwrap().is_none());
    assert_eq!(s.check_sat().unwrap(), SatResult::Unsat);
    assert_eq!(s.render_values(&[a]).unwrap(), "");
}

#[test]
fn unsatisfiable_clauses_on_several_values() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval(a.lt(b));
    s.eval(b.lt(a));
    s.eval((a + b).eq(0));

    assert_eq!(s.check_sat().unwrap(), SatResult::Unsat);
}

#[test]
fn demorgan_holds_for_equal_values() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval((a & b).eq(!(!a | !b)));

    let model = s.get_model().unwrap().expect("satisfiable");
    assert_eq!(boolean(&s, &model, a), boolean(&s, &model, b));
}

#[test]
fn integer_division_and_remainder() {
    let s = Session::default();
    let n = s.mk_var("n");
    s.eval(n.floor_div(3).eq(4));
    s.eval((n % 3).eq(2));

    let model = s.get_model().unwrap().expect("satisfiable");
    assert_eq!(int(&s, &model, n), BigInt::from(14));
}

#[test]
fn division_rounds_toward_negative_infinity() {
    let s = Session::default();
    let n = s.mk_var("n");
    let d = s.mk_var("d");
    let q = s.mk_var("q");
    let r = s.mk_var("r");
    s.eval(n.eq(7));
    s.eval(d.eq(-2));
    s.eval(q.eq(n.floor_div(d * 1)));
    s.eval(r.eq(n % (d * 1)));

    let model = s.get_model().unwrap().expect("satisfiable");
    assert_eq!(int(&s, &model, q), BigInt::from(-4));
    assert_eq!(int(&s, &model, r), BigInt::from(-1));
}

#[test]
fn division_by_negative_literal() {
    let s = Session::default();
    let n = s.mk_var("n");
    s.eval(n.floor_div(-2).eq(-4));
    s.eval((n % -2).eq(-1));

    assert_eq!(s.get_value(n).unwrap(), Some(ModelValue::Int(BigInt::from(7))));
}

#[test]
fn true_division_of_integers_is_an_error() {
    let s = Session::default();
    let n = s.mk_var("n");
    s.eval((n / 2).eq(3));
    assert!(matches!(s.check_sat(), Err(Error::UnsupportedOperator { .. })));
}

// ─── Bit-vectors ───────────────────────────────────────────────────────────────

#[test]
fn bitvec_renders_as_hex() {
    let s = Session::default();
    let myu32 = s.mk_bitvec("myu32", 32);
    s.eval(myu32.eq(10));

    assert_eq!(s.render_values(&[myu32]).unwrap(), "((myu32 #x0000000a))");
    assert_eq!(s.render_values(&[]).unwrap(), "((myu32 #x0000000a))");
}

#[test]
fn bitvec_arithmetic_wraps() {
    let s = Session::default();
    let x = s.mk_bitvec("x", 8);
    s.eval((x + 10).eq(4));

    let value = s.get_value(x).unwrap().expect("satisfiable");
    assert_eq!(
        value,
        ModelValue::BitVec {
            value: 250u32.into(),
            width: 8
        }
    );
    assert_eq!(s.render_values(&[x]).unwrap(), "((x #xfa))");
}

#[test]
fn bitvec_hex_digits_are_configurable() {
    let config = SessionConfig {
        hex_digits: Some(8),
        ..SessionConfig::default()
    };
    let s = Session::new(config);
    let x = s.mk_bitvec("x", 16);
    s.eval((x & 0xff).eq(0x42));
    s.eval((x >> 8).eq(0));

    assert_eq!(s.render_values(&[x]).unwrap(), "((x #x00000042))");
}

#[test]
fn several_values_are_rendered_in_order() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval(a.eq(3));
    s.eval(b.eq(a + 1));

    assert_eq!(s.render_values(&[]).unwrap(), "((a 3)\n (b 4))");
    assert_eq!(s.render_values(&[b]).unwrap(), "((b 4))");
}

// ─── Named functions ───────────────────────────────────────────────────────────

#[test]
fn function_is_equivalent_to_its_body() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    let demorgan = s.mk_function("demorgan", move || (a & b).eq(!(!a | !b)));

    let formula = s.collect_all().unwrap();
    assert!(s.is_evaluated(demorgan));
    assert_eq!(
        formula.to_string(),
        "(((b & a) <-> (! ((! a) | (! b)))) & (demorgan(a, b) <-> ((b & a) <-> (! ((! a) | (! b))))))"
    );

    let model = s.get_model().unwrap().expect("satisfiable");
    assert_eq!(boolean(&s, &model, a), boolean(&s, &model, b));
    assert_eq!(s.functions(), vec![demorgan]);
}

#[test]
fn called_function_is_collected_once() {
    let s = Session::default();
    let p = s.mk_var("p");
    let q = s.mk_var("q");
    let f = s.mk_function("either", move || p | q);
    s.call(f);
    s.call(f);
    s.eval(!p);

    let formula = s.collect_all().unwrap();
    assert_eq!(formula.functions().len(), 1);
    let model = s.get_model().unwrap().expect("satisfiable");
    assert!(!boolean(&s, &model, p));
    assert!(boolean(&s, &model, q));
}

// ─── Errors and reset ──────────────────────────────────────────────────────────

#[test]
fn ambiguous_sort_is_an_error() {
    let s = Session::default();
    let a = s.mk_var("a");
    let b = s.mk_var("b");
    s.eval(a.eq(b));

    match s.check_sat() {
        Err(Error::UndeterminedSort(subtree)) => assert_eq!(subtree, "(a == b)"),
        other => panic!("expected an undetermined sort, got {:?}", other),
    }
}

#[test]
fn nothing_to_solve_is_an_error() {
    let s = Session::default();
    s.mk_var("a");
    assert!(matches!(s.check_sat(), Err(Error::EmptyJoin)));
}

#[test]
fn reset_clears_everything() {
    let s = Session::default();
    let a = s.mk_fresh_var();
    s.mk_bitvec("x", 8);
    s.eval(a.gt(1));
    s.check_sat().unwrap();
    let old = s.cached_symbol(a).unwrap();

    s.reset();
    assert!(s.variables().is_empty());
    assert!(s.bitvecs().is_empty());
    assert!(s.functions().is_empty());

    let c = s.mk_fresh_var();
    assert_ne!(s.name(c).as_ref(), old.name());
    s.eval(c.eq(true));
    assert_eq!(s.check_sat().unwrap(), SatResult::Sat);
    assert_eq!(s.cached_symbol(c).unwrap().sort(), Sort::Bool);
    assert_ne!(s.cached_symbol(c).unwrap().id(), old.id());
}

#[test]
#[should_panic(expected = "does not belong to this session")]
fn stale_handle_panics_after_reset() {
    let s = Session::default();
    let a = s.mk_var("a");
    s.reset();
    s.eval(a.gt(0));
}
