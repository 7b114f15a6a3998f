//! # Fixpoint solver
//!
//! The [`Solver`] decides whether a formula holds for the main procedure of a
//! [`ContextFreeModalProcessSystem`]. It keeps one property transformer per process-graph node
//! and refines them with a work-set loop until nothing changes.
//!
//! ## Algorithm
//!
//! A solve runs in a [`Session`], which owns every piece of per-formula state: the dependency
//! graph, the transformer manager, one [`WorkUnit`] per procedure and the must/may edge
//! transformer caches. Sessions never share state, so several can run over the same solver.
//!
//! 1. **Initialisation.** Final nodes get the end transformer (the identity), every other node
//!    the fresh transformer. All non-final nodes are dirty, and the current block is the
//!    innermost one (the last block of the dependency graph).
//! 2. **Iteration.** A dirty node is picked and its transformer recomputed from one composition
//!    per outgoing edge: the edge transformer composed with the transformer of the edge's
//!    target. For a call edge the edge transformer is the current transformer of the callee's
//!    initial node. If the result differs, the node's predecessors become dirty; if the node is
//!    the initial node of its procedure, every call site of that procedure becomes dirty too.
//! 3. **Block advancing.** Once no node is dirty, the current block index is decremented and all
//!    non-final nodes are dirty again. Blocks are never revisited.
//! 4. **Convergence.** At block `0` with no dirty node the transformers are final. The formula
//!    holds iff the transformer of the main procedure's initial node, evaluated on the deadlock
//!    vector, contains variable `0`.
//!
//! Termination follows from the monotonicity of the transformers over a finite lattice. An
//! optional update budget ([`SolverOptions::update_budget`]) turns a broken backend into an
//! error instead of a hang.
//!
//! ## Example
//!
//! ```
//! use m3c_rs::bdd_transformer::BddBackend;
//! use m3c_rs::formula::Formula;
//! use m3c_rs::graph::{ContextFreeModalProcessSystem, EdgeProperty, ProcessGraph};
//! use m3c_rs::solver::{Solver, SolverOptions};
//!
//! let mut main: ProcessGraph<&str, &str> = ProcessGraph::new();
//! let s0 = main.add_node();
//! let s1 = main.add_node_with_props(["done"]);
//! main.add_edge(s0, s1, "a", EdgeProperty::must());
//! main.set_initial(s0);
//! main.set_final(s1);
//!
//! let mut system = ContextFreeModalProcessSystem::new("main");
//! system.add_procedure("main", main);
//!
//! let solver = Solver::new(&system, BddBackend::default(), SolverOptions::default()).unwrap();
//! // <a>"done"
//! let f = Formula::diamond(Some("a"), Formula::atomic("done"));
//! assert!(solver.solve(&f).unwrap());
//! ```

use std::collections::HashMap;

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::dependency::DependencyGraph;
use crate::error::{DeserializeError, SolveError, ValidationError};
use crate::formula::Formula;
use crate::graph::{ContextFreeModalProcessSystem, EdgeProperty, ModalProcessGraph};
use crate::history::{HistoryRecorder, ProcedureData, SolverHistory, SolverState};
use crate::transformer::{PropertyTransformer, TransformerBackend, TransformerManager, TransformerOf};
use crate::varset::VarSet;
use crate::work_unit::{predecessors, PickOrder, WorkSet, WorkUnit};

/// Tuning knobs of a [`Solver`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SolverOptions {
    /// Order in which dirty nodes are picked. Does not affect the result.
    pub pick_order: PickOrder,
    /// Abort a solve after this many node updates.
    pub update_budget: Option<usize>,
    /// Maximal number of search states explored by witness extraction.
    pub witness_limit: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            pick_order: PickOrder::Fifo,
            update_budget: None,
            witness_limit: 100_000,
        }
    }
}

impl SolverOptions {
    pub fn with_pick_order(mut self, pick_order: PickOrder) -> Self {
        self.pick_order = pick_order;
        self
    }

    pub fn with_update_budget(mut self, budget: usize) -> Self {
        self.update_budget = Some(budget);
        self
    }

    pub fn with_witness_limit(mut self, limit: usize) -> Self {
        self.witness_limit = limit;
        self
    }
}

pub(crate) type Transformer<G, B> =
    TransformerOf<B, <G as ModalProcessGraph>::Label, <G as ModalProcessGraph>::Prop>;

/// Call sites of each procedure: `(caller unit, node with the call edge)`.
type CallSites<G> = HashMap<<G as ModalProcessGraph>::Label, Vec<(usize, <G as ModalProcessGraph>::Node)>>;

/// Model checker for one validated system.
///
/// Construction checks the system once; every [`solve`][Self::solve] then starts from fresh
/// per-formula state.
pub struct Solver<'a, G: ModalProcessGraph, B> {
    system: &'a ContextFreeModalProcessSystem<G>,
    backend: B,
    options: SolverOptions,
    main: usize,
    /// `(initial, final)` node of each procedure.
    endpoints: Vec<(G::Node, G::Node)>,
    predecessors: Vec<HashMap<G::Node, Vec<G::Node>>>,
    call_sites: CallSites<G>,
}

impl<'a, G, B> Solver<'a, G, B>
where
    G: ModalProcessGraph,
    B: TransformerBackend<G::Label, G::Prop>,
{
    /// Validate `system` and precompute its static structure.
    ///
    /// Rejects a missing main procedure, procedures without initial or final node, final nodes
    /// with outgoing edges, unguarded procedures (a call edge leaving the initial node) and calls
    /// of undefined procedures.
    pub fn new(
        system: &'a ContextFreeModalProcessSystem<G>,
        backend: B,
        options: SolverOptions,
    ) -> Result<Self, ValidationError> {
        let procedures = system.procedures();
        let main = procedures
            .get_index_of(system.main())
            .ok_or_else(|| ValidationError::UndefinedMainProcess(system.main().to_string()))?;

        let mut endpoints = Vec::with_capacity(procedures.len());
        let mut preds = Vec::with_capacity(procedures.len());
        let mut call_sites: CallSites<G> = HashMap::new();

        for (index, (label, graph)) in procedures.iter().enumerate() {
            let initial = graph
                .initial_node()
                .ok_or_else(|| ValidationError::MissingInitialNode(label.to_string()))?;
            let final_node = graph
                .final_node()
                .ok_or_else(|| ValidationError::MissingFinalNode(label.to_string()))?;

            if graph.outgoing_edges(final_node).next().is_some() {
                return Err(ValidationError::FinalNodeHasSuccessors(label.to_string()));
            }
            if graph
                .outgoing_edges(initial)
                .any(|e| graph.edge_property(e).is_process())
            {
                return Err(ValidationError::UnguardedProcess(label.to_string()));
            }

            for node in graph.nodes() {
                for edge in graph.outgoing_edges(node) {
                    if !graph.edge_property(edge).is_process() {
                        continue;
                    }
                    let callee = graph.edge_label(edge);
                    if !procedures.contains_key(callee) {
                        return Err(ValidationError::UndefinedCallee {
                            caller: label.to_string(),
                            callee: callee.to_string(),
                        });
                    }
                    let sites = call_sites.entry(callee.clone()).or_default();
                    if !sites.contains(&(index, node)) {
                        sites.push((index, node));
                    }
                }
            }

            endpoints.push((initial, final_node));
            preds.push(predecessors(graph));
        }

        debug!(
            "Validated system with {} procedures, main '{}', {} called procedures",
            procedures.len(),
            system.main(),
            call_sites.len()
        );

        Ok(Self {
            system,
            backend,
            options,
            main,
            endpoints,
            predecessors: preds,
            call_sites,
        })
    }

    pub fn system(&self) -> &'a ContextFreeModalProcessSystem<G> {
        self.system
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Fresh per-formula state, ready to [`run`][Session::run].
    pub fn session(&self, formula: &Formula<G::Label, G::Prop>) -> Result<Session<'_, G, B>, SolveError> {
        let dependency_graph = DependencyGraph::new(formula)?;
        let manager = self.backend.create_manager(&dependency_graph);

        let units: Vec<_> = self
            .system
            .procedures()
            .iter()
            .enumerate()
            .map(|(index, (label, graph))| {
                let (initial_node, final_node) = self.endpoints[index];
                let transformers = graph
                    .nodes()
                    .map(|node| {
                        let transformer = if node == final_node {
                            manager.end_transformer()
                        } else {
                            manager.node_transformer()
                        };
                        (node, transformer)
                    })
                    .collect();
                let mut unit = WorkUnit {
                    label,
                    graph,
                    initial_node,
                    final_node,
                    predecessors: &self.predecessors[index],
                    transformers,
                    work_set: WorkSet::new(self.options.pick_order),
                };
                unit.fill_work_set();
                unit
            })
            .collect();
        manager.check()?;

        let main = &units[self.main];
        let final_props = main.graph.atomic_propositions(main.final_node);
        let deadlock = dependency_graph
            .deadlock_satisfaction(|p| final_props.contains(p))
            .to_bools(dependency_graph.num_vars());
        let current_block = dependency_graph.blocks().len().saturating_sub(1);

        info!("Starting session for {} at block {}", formula, current_block);

        Ok(Session {
            system: self.system,
            call_sites: &self.call_sites,
            options: self.options,
            main: self.main,
            dependency_graph,
            units,
            must: IndexMap::new(),
            may: IndexMap::new(),
            current_block,
            updates: 0,
            deadlock,
            history: None,
            manager,
        })
    }

    /// Whether `formula` holds for the main procedure.
    pub fn solve(&self, formula: &Formula<G::Label, G::Prop>) -> Result<bool, SolveError> {
        let mut session = self.session(formula)?;
        session.run()?;
        let sat = session.is_sat();
        info!("{} is {}", formula, if sat { "satisfied" } else { "not satisfied" });
        Ok(sat)
    }

    /// Like [`solve`][Self::solve], additionally recording every node update.
    pub fn solve_and_record_history(
        &self,
        formula: &Formula<G::Label, G::Prop>,
    ) -> Result<(bool, SolverHistory<G::Label, G::Node>), SolveError> {
        let mut session = self.session(formula)?;
        session.record_history();
        session.run()?;
        let history = session.into_history();
        Ok((history.is_sat(), history))
    }
}

/// Per-formula state of one solve.
pub struct Session<'s, G, B>
where
    G: ModalProcessGraph,
    B: TransformerBackend<G::Label, G::Prop>,
{
    system: &'s ContextFreeModalProcessSystem<G>,
    call_sites: &'s CallSites<G>,
    pub(crate) options: SolverOptions,
    main: usize,
    dependency_graph: DependencyGraph<G::Label, G::Prop>,
    units: Vec<WorkUnit<'s, G, Transformer<G, B>>>,
    must: IndexMap<G::Label, Transformer<G, B>>,
    may: IndexMap<G::Label, Transformer<G, B>>,
    current_block: usize,
    updates: usize,
    deadlock: Vec<bool>,
    history: Option<HistoryRecorder<G::Label, G::Node>>,
    manager: B::Manager,
}

impl<'s, G, B> Session<'s, G, B>
where
    G: ModalProcessGraph,
    B: TransformerBackend<G::Label, G::Prop>,
{
    pub fn dependency_graph(&self) -> &DependencyGraph<G::Label, G::Prop> {
        &self.dependency_graph
    }

    pub fn manager(&self) -> &B::Manager {
        &self.manager
    }

    pub fn current_block_index(&self) -> usize {
        self.current_block
    }

    /// Number of node updates performed so far, changing or not.
    pub fn num_updates(&self) -> usize {
        self.updates
    }

    pub fn is_converged(&self) -> bool {
        self.current_block == 0 && self.units.iter().all(|u| u.work_set.is_empty())
    }

    /// Iterate until convergence.
    pub fn run(&mut self) -> Result<(), SolveError> {
        while self.step()? {}
        info!("Converged after {} updates", self.updates);
        Ok(())
    }

    /// Perform one node update or block switch. Returns `false` once converged.
    pub fn step(&mut self) -> Result<bool, SolveError> {
        let picked = self
            .units
            .iter_mut()
            .enumerate()
            .find_map(|(index, unit)| unit.work_set.pop().map(|node| (index, node)));

        let Some((unit, node)) = picked else {
            if self.current_block == 0 {
                return Ok(false);
            }
            self.advance_block();
            return Ok(true);
        };

        if let Some(budget) = self.options.update_budget {
            if self.updates >= budget {
                warn!("Update budget of {} exhausted at block {}", budget, self.current_block);
                self.units[unit].work_set.insert(node);
                return Err(SolveError::UpdateBudgetExhausted { updates: self.updates });
            }
        }

        self.update(unit, node);
        self.manager.check()?;
        Ok(true)
    }

    fn advance_block(&mut self) {
        self.current_block -= 1;
        info!("Advancing to block {} after {} updates", self.current_block, self.updates);
        for unit in &mut self.units {
            unit.fill_work_set();
        }
    }

    pub(crate) fn unit_index(&self, procedure: &G::Label) -> usize {
        self.system
            .procedures()
            .get_index_of(procedure)
            .unwrap_or_else(|| panic!("call of undefined procedure '{}'", procedure))
    }

    fn ensure_edge_transformer(&mut self, label: &G::Label, property: EdgeProperty) {
        let cache = if property.is_must() { &mut self.must } else { &mut self.may };
        if !cache.contains_key(label) {
            debug!("Creating {:?} transformer for '{}'", property.modality, label);
            cache.insert(label.clone(), self.manager.edge_transformer(label, property));
        }
    }

    /// One composition per outgoing edge of `node`.
    fn compositions(&mut self, unit: usize, node: G::Node) -> Vec<Transformer<G, B>> {
        let graph = self.units[unit].graph;
        let mut compositions = Vec::new();
        for edge in graph.outgoing_edges(node) {
            let label = graph.edge_label(edge);
            let property = graph.edge_property(edge);

            let edge_transformer = if property.is_process() {
                let callee = &self.units[self.unit_index(label)];
                callee.transformer(callee.initial_node)
            } else {
                self.ensure_edge_transformer(label, property);
                let cache = if property.is_must() { &self.must } else { &self.may };
                &cache[label]
            };
            let target = self.units[unit].transformer(graph.target(edge));
            compositions.push(edge_transformer.compose(target));
        }
        compositions
    }

    /// Compositions and candidate transformer of `node` for the current block.
    fn candidate(&mut self, unit: usize, node: G::Node) -> (Vec<Transformer<G, B>>, Transformer<G, B>) {
        let compositions = self.compositions(unit, node);
        let work_unit = &self.units[unit];
        let updated = work_unit.transformer(node).create_update(
            work_unit.graph.atomic_propositions(node),
            &compositions,
            self.dependency_graph.block(self.current_block),
        );
        (compositions, updated)
    }

    fn update(&mut self, unit: usize, node: G::Node) {
        assert_ne!(node, self.units[unit].final_node, "final node must not be updated");

        let block_index = self.current_block;
        let (compositions, updated) = self.candidate(unit, node);
        self.updates += 1;

        let changed = updated != *self.units[unit].transformer(node);
        debug!(
            "Update #{} of {:?} in '{}' at block {}: {}",
            self.updates,
            node,
            self.units[unit].label,
            block_index,
            if changed { "changed" } else { "stable" }
        );

        let previous = if changed {
            let previous = self.units[unit].transformers.insert(node, updated);
            self.mark_dirty(unit, node);
            previous
        } else {
            None
        };

        if self.current_block > 0 && self.units.iter().all(|u| u.work_set.is_empty()) {
            self.advance_block();
        }

        if self.history.is_some() {
            let work_unit = &self.units[unit];
            let updated = work_unit.transformer(node);
            let state = SolverState {
                transformer: previous.as_ref().unwrap_or(updated).serialize(),
                updated_transformer: updated.serialize(),
                compositions: compositions.iter().map(|c| c.serialize()).collect(),
                node,
                procedure: work_unit.label.clone(),
                work_sets: self.work_sets(),
                satisfied: self.satisfied_at(work_unit, node),
                block_index,
            };
            if let Some(history) = self.history.as_mut() {
                history.states.push(state);
            }
        }
    }

    fn mark_dirty(&mut self, unit: usize, node: G::Node) {
        let work_unit = &mut self.units[unit];
        let preds = work_unit.predecessors_of(node);
        work_unit.work_set.extend(preds.iter().copied());

        if node == work_unit.initial_node {
            let label = work_unit.label;
            if let Some(sites) = self.call_sites.get(label) {
                for &(caller, site) in sites {
                    self.units[caller].work_set.insert(site);
                }
            }
        }
    }

    /// Candidate transformer of `node` for the current block, without storing it.
    ///
    /// Once the session has converged this equals the stored transformer.
    pub fn recompute(&mut self, procedure: &G::Label, node: G::Node) -> Option<Transformer<G, B>> {
        let unit = self.system.procedures().get_index_of(procedure)?;
        if node == self.units[unit].final_node || !self.units[unit].transformers.contains_key(&node) {
            return None;
        }
        Some(self.candidate(unit, node).1)
    }

    /// Truth of every variable at the final node of the main procedure.
    pub fn deadlock_satisfaction(&self) -> VarSet {
        VarSet::from_bools(&self.deadlock)
    }

    pub(crate) fn deadlock_vector(&self) -> &[bool] {
        &self.deadlock
    }

    pub fn is_sat(&self) -> bool {
        let main = &self.units[self.main];
        main.transformer(main.initial_node)
            .evaluate(&self.deadlock)
            .contains(0)
    }

    pub fn transformer(&self, procedure: &G::Label, node: G::Node) -> Option<&Transformer<G, B>> {
        let unit = self.system.procedures().get_index_of(procedure)?;
        self.units[unit].transformers.get(&node)
    }

    /// Subformulas holding at `node` under the current transformers.
    pub fn satisfied_subformulas(&self, procedure: &G::Label, node: G::Node) -> Option<Vec<String>> {
        let unit = self.system.procedures().get_index_of(procedure)?;
        let work_unit = &self.units[unit];
        work_unit
            .transformers
            .contains_key(&node)
            .then(|| self.satisfied_at(work_unit, node))
    }

    fn satisfied_at(&self, unit: &WorkUnit<'s, G, Transformer<G, B>>, node: G::Node) -> Vec<String> {
        self.dependency_graph
            .labels(&unit.transformer(node).evaluate(&self.deadlock))
    }

    /// Dirty nodes of every procedure, in pick order.
    pub fn work_sets(&self) -> IndexMap<G::Label, Vec<G::Node>> {
        self.units
            .iter()
            .map(|u| (u.label.clone(), u.work_set.snapshot()))
            .collect()
    }

    pub(crate) fn units(&self) -> &[WorkUnit<'s, G, Transformer<G, B>>] {
        &self.units
    }

    pub(crate) fn main_index(&self) -> usize {
        self.main
    }

    /// Rebuild a serialized transformer inside this session's manager.
    pub fn deserialize(&self, data: &[String]) -> Result<Transformer<G, B>, DeserializeError> {
        self.manager.deserialize(data)
    }

    /// Start recording a history. Must be called before the first update.
    pub fn record_history(&mut self) {
        assert_eq!(self.updates, 0, "history must start before the first update");
        let procedures = self
            .units
            .iter()
            .map(|unit| {
                let nodes: Vec<G::Node> = unit.graph.nodes().collect();
                let initial_transformers = nodes
                    .iter()
                    .map(|&n| (n, unit.transformer(n).serialize()))
                    .collect();
                let initial_satisfied = nodes
                    .iter()
                    .map(|&n| (n, self.satisfied_at(unit, n)))
                    .collect();
                let data = ProcedureData {
                    nodes,
                    initial_transformers,
                    initial_satisfied,
                };
                (unit.label.clone(), data)
            })
            .collect();
        self.history = Some(HistoryRecorder {
            procedures,
            states: Vec::new(),
        });
    }

    /// Finish the session, returning what was recorded (empty if recording was never started).
    pub fn into_history(mut self) -> SolverHistory<G::Label, G::Node> {
        let recorder = self.history.take().unwrap_or_default();
        let must = self
            .must
            .iter()
            .map(|(label, t)| (label.clone(), t.serialize()))
            .collect();
        let may = self
            .may
            .iter()
            .map(|(label, t)| (label.clone(), t.serialize()))
            .collect();
        SolverHistory::new(recorder.procedures, must, may, recorder.states, self.is_sat())
    }
}
