//! Witness extraction through procedure calls.

mod common;

use common::*;
use m3c_rs::bdd_transformer::BddBackend;
use m3c_rs::error::WitnessError;
use m3c_rs::solver::{Solver, SolverOptions};
use test_log::test;

fn solver(system: &System) -> Solver<'_, Graph, BddBackend> {
    Solver::new(system, BddBackend::default(), SolverOptions::default()).unwrap()
}

#[test]
fn witness_for_anbn_descends_and_returns() {
    let system = anbn(&[]);
    let tree = solver(&system).find_witness(&eventually_bb()).unwrap().unwrap();
    // a (call P) a b (return) b
    assert_eq!(tree.witness(), vec!["a", "a", "b", "b"]);

    let path = tree.path();
    assert_eq!(path.first(), Some(&0));
    assert_eq!(path.last().copied(), tree.finishing_node());
    for &id in &path {
        assert!(tree.node(id).unwrap().is_part_of_result);
    }
    assert_eq!(tree.root().unwrap().procedure, "P");
}

#[test]
fn witness_enters_the_helper() {
    let system = helper_system();
    let tree = solver(&system).find_witness(&eventually("a")).unwrap().unwrap();
    assert_eq!(tree.witness(), vec!["enter", "a"]);

    let last = tree.node(tree.finishing_node().unwrap()).unwrap();
    assert_eq!(last.procedure, "helper");
}

#[test]
fn unsatisfied_formula_has_no_witness() {
    let system = helper_system();
    assert!(solver(&system).find_witness(&eventually("b")).unwrap().is_none());
}

#[test]
fn safety_formula_is_unsupported() {
    let system = anbn(&[]);
    let result = solver(&system).find_witness(&F::not(eventually_bb()));
    assert!(matches!(result, Err(WitnessError::UnsupportedFormula(_))));
}

#[test]
fn witness_limit_is_respected() {
    let system = anbn(&[]);
    let solver = Solver::new(
        &system,
        BddBackend::default(),
        SolverOptions::default().with_witness_limit(3),
    )
    .unwrap();
    assert_eq!(
        solver.find_witness(&eventually_bb()).err(),
        Some(WitnessError::SearchExhausted { states: 3 })
    );
}

#[test]
fn witness_tree_renders_to_dot() {
    let system = helper_system();
    let tree = solver(&system).find_witness(&eventually("a")).unwrap().unwrap();
    let dot = tree.to_dot().unwrap();
    assert!(dot.starts_with("digraph {"));
    assert!(dot.contains("label=\"enter\", color=red"));
    assert!(dot.contains("label=\"a\", color=red"));
}
