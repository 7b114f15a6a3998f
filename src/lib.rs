//! # m3c-rs: model checking of context-free modal process systems
//!
//! **`m3c-rs`** decides whether a modal mu-calculus (or CTL) formula holds for a
//! **context-free modal process system**: a set of named procedures, each a control-flow graph
//! with may/must edges, some of which call other procedures (recursively, if they like).
//!
//! ## How it works
//!
//! 1. The formula is rewritten into the plain mu-calculus ([`ctl`]), put into negation normal
//!    form ([`nnf`]) and flattened into a system of boolean equations grouped into equational
//!    blocks ([`dependency`]).
//! 2. Every process-graph node gets a **property transformer** ([`transformer`]): a monotone
//!    function mapping what holds after the node's procedure returns to what holds at the node.
//!    The concrete transformers are vectors of BDDs ([`bdd_transformer`]) built on a small
//!    manager-centric BDD kernel ([`bdd`]).
//! 3. A work-set loop ([`solver`]) refines the transformers block by block until they are stable.
//!    Procedure calls use the callee's current summary, so recursion needs no special treatment.
//! 4. The formula holds iff the main procedure's initial transformer, evaluated on what holds at
//!    a deadlock, contains the root subformula.
//!
//! Runs can be recorded ([`history`]), and witnesses for reachability-shaped properties can be
//! extracted ([`witness`]) and exported to Graphviz ([`dot`]).
//!
//! ## Basic Usage
//!
//! ```rust
//! use m3c_rs::bdd_transformer::BddBackend;
//! use m3c_rs::formula::Formula;
//! use m3c_rs::graph::{ContextFreeModalProcessSystem, EdgeProperty, ProcessGraph};
//! use m3c_rs::solver::{Solver, SolverOptions};
//!
//! // main: s0 -enter-> s1 -helper-> s2
//! let mut main: ProcessGraph<&str, &str> = ProcessGraph::new();
//! let (m0, m1, m2) = (main.add_node(), main.add_node(), main.add_node());
//! main.add_edge(m0, m1, "enter", EdgeProperty::must());
//! main.add_edge(m1, m2, "helper", EdgeProperty::call());
//! main.set_initial(m0);
//! main.set_final(m2);
//!
//! // helper: s0 -a-> s1
//! let mut helper = ProcessGraph::new();
//! let (h0, h1) = (helper.add_node(), helper.add_node());
//! helper.add_edge(h0, h1, "a", EdgeProperty::must());
//! helper.set_initial(h0);
//! helper.set_final(h1);
//!
//! let mut system = ContextFreeModalProcessSystem::new("main");
//! system.add_procedure("main", main);
//! system.add_procedure("helper", helper);
//!
//! let solver = Solver::new(&system, BddBackend::default(), SolverOptions::default()).unwrap();
//!
//! // "eventually an `a` step is possible": EF <a>true
//! let f = Formula::ef(Formula::diamond(Some("a"), Formula::True));
//! assert!(solver.solve(&f).unwrap());
//!
//! let tree = solver.find_witness(&f).unwrap().unwrap();
//! assert_eq!(tree.witness(), vec!["enter", "a"]);
//! ```
//!
//! ## Core Components
//!
//! - **[`solver`]**: [`Solver`][crate::solver::Solver] validates a system and runs
//!   [`Session`][crate::solver::Session]s, one per formula.
//! - **[`graph`]**: the graph-access trait and the arena-backed [`ProcessGraph`][crate::graph::ProcessGraph].
//! - **[`formula`]**: the input AST with CTL sugar.
//! - **[`bdd`]**: the decision-diagram kernel behind the default backend.

pub mod bdd;
pub mod bdd_transformer;
pub mod cache;
pub mod ctl;
pub mod dependency;
pub mod dot;
pub mod error;
pub mod formula;
pub mod graph;
pub mod history;
pub mod nnf;
pub mod reference;
pub mod solver;
pub mod table;
pub mod transformer;
pub mod utils;
pub mod varset;
pub mod witness;
pub mod work_unit;
