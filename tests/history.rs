//! Recorded solver runs.

mod common;

use common::*;
use m3c_rs::bdd_transformer::BddBackend;
use m3c_rs::graph::NodeId;
use m3c_rs::solver::{Solver, SolverOptions};
use test_log::test;

fn solver(system: &System) -> Solver<'_, Graph, BddBackend> {
    Solver::new(system, BddBackend::default(), SolverOptions::default()).unwrap()
}

#[test]
fn history_agrees_with_solve() {
    for (system, formula) in [
        (helper_system(), eventually("a")),
        (helper_system(), eventually("b")),
        (anbn(&[]), eventually_bb()),
        (anbn(&[]), F::not(eventually_bb())),
    ] {
        let solver = solver(&system);
        let (sat, history) = solver.solve_and_record_history(&formula).unwrap();
        assert_eq!(sat, solver.solve(&formula).unwrap(), "{}", formula);
        assert_eq!(sat, history.is_sat());
    }
}

#[test]
fn history_ends_with_empty_work_sets() {
    let system = anbn(&[]);
    let (_, history) = solver(&system).solve_and_record_history(&eventually_bb()).unwrap();
    assert!(!history.states().is_empty());
    assert!(history.last_state().unwrap().work_sets_empty());
    // Every state but the last leaves work behind.
    for state in &history.states()[..history.states().len() - 1] {
        assert!(!state.work_sets_empty());
    }
    assert!(history.num_changes() > 0);
    assert!(history.num_changes() <= history.states().len());
}

#[test]
fn history_snapshots_every_procedure() {
    let system = helper_system();
    let (_, history) = solver(&system).solve_and_record_history(&eventually("a")).unwrap();

    assert_eq!(history.procedures().keys().copied().collect::<Vec<_>>(), vec!["main", "helper"]);
    let main = history.procedure(&"main").unwrap();
    assert_eq!(main.nodes, vec![NodeId(0), NodeId(1), NodeId(2)]);
    assert_eq!(main.initial_transformers.len(), 3);
    assert_eq!(main.initial_satisfied.len(), 3);
    assert!(history.procedure(&"other").is_none());

    // One edge transformer per must label.
    assert!(history.must_transformers().contains_key(&"enter"));
    assert!(history.must_transformers().contains_key(&"a"));
    assert!(history.may_transformers().is_empty());
}

#[test]
fn history_states_replay_into_a_session() {
    let system = anbn(&[]);
    let solver = solver(&system);
    let (_, history) = solver.solve_and_record_history(&eventually_bb()).unwrap();

    let mut session = solver.session(&eventually_bb()).unwrap();
    session.run().unwrap();
    assert_eq!(history.states().len(), session.num_updates());

    // The last state of each node holds its converged transformer.
    let last = history.last_state().unwrap();
    let replayed = session.deserialize(&last.updated_transformer).unwrap();
    assert_eq!(&replayed, session.transformer(&last.procedure, last.node).unwrap());
}

#[test]
fn recording_a_session_by_hand() {
    let system = helper_system();
    let solver = solver(&system);
    let mut session = solver.session(&eventually("a")).unwrap();
    session.record_history();
    session.run().unwrap();
    let updates = session.num_updates();

    let history = session.into_history();
    assert_eq!(history.states().len(), updates);
    assert!(history.is_sat());
    for state in history.states() {
        assert_eq!(state.work_sets.len(), 2);
    }
}

#[test]
fn unrecorded_session_has_empty_history() {
    let system = helper_system();
    let solver = solver(&system);
    let mut session = solver.session(&eventually("a")).unwrap();
    session.run().unwrap();
    let history = session.into_history();
    assert!(history.states().is_empty());
    assert!(history.procedures().is_empty());
    assert!(history.is_sat());
}
