//! # Witnesses
//!
//! A [`WitnessTree`] records a derivation: each node is a position `(procedure, process-graph
//! node, subformula)` together with the edge label taken to reach it from its parent. Once a
//! finishing node is known, [`WitnessTree::compute_path`] marks the path back to the root and
//! [`WitnessTree::witness`] reads the input word along it.
//!
//! [`Session::find_witness`] builds such a tree for a satisfied formula by a breadth-first search
//! over positions, guided by the converged transformers: a position is only explored if its
//! subformula holds there. Steps into a callee push the return node on a call stack, and a callee's
//! final node returns to it, so witnesses may pass through any number of procedure calls.
//!
//! The search follows `||`, `<>` and least-fixpoint unfoldings and stops at `true`, atomic
//! propositions and their negations. This covers reachability-shaped properties (the negations of
//! safety properties); formulas using `[]`, `&&`, greatest fixpoints or negations of compound
//! subformulas are rejected with [`WitnessError::UnsupportedFormula`].

use std::collections::{HashSet, VecDeque};

use log::{debug, info};

use crate::dependency::NodeKind;
use crate::error::WitnessError;
use crate::formula::Formula;
use crate::graph::ModalProcessGraph;
use crate::solver::{Session, Solver};
use crate::transformer::{PropertyTransformer, TransformerBackend};

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct WitnessNode<L, N> {
    pub id: usize,
    pub parent: Option<usize>,
    pub procedure: L,
    /// Process-graph node of the position.
    pub state: N,
    /// Subformula variable of the position.
    pub var: usize,
    /// Rendering of the subformula.
    pub label: String,
    /// Action taken from the parent, if the step consumed one.
    pub edge_label: Option<L>,
    pub is_part_of_result: bool,
}

#[derive(Debug, Clone)]
pub struct WitnessTree<L, N> {
    nodes: Vec<WitnessNode<L, N>>,
    finishing: Option<usize>,
}

impl<L, N> Default for WitnessTree<L, N> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            finishing: None,
        }
    }
}

impl<L: Clone, N> WitnessTree<L, N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node below `parent` (or a root if `None`) and return its id.
    pub fn add_node(
        &mut self,
        parent: Option<usize>,
        procedure: L,
        state: N,
        var: usize,
        label: impl Into<String>,
        edge_label: Option<L>,
    ) -> usize {
        if let Some(p) = parent {
            assert!(p < self.nodes.len(), "unknown parent {}", p);
        }
        let id = self.nodes.len();
        self.nodes.push(WitnessNode {
            id,
            parent,
            procedure,
            state,
            var,
            label: label.into(),
            edge_label,
            is_part_of_result: false,
        });
        id
    }

    pub fn node(&self, id: usize) -> Option<&WitnessNode<L, N>> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> &[WitnessNode<L, N>] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&WitnessNode<L, N>> {
        self.nodes.first()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finishing_node(&self) -> Option<usize> {
        self.finishing
    }

    /// Mark the path from `finishing` to its root as the result.
    pub fn compute_path(&mut self, finishing: usize) {
        for node in &mut self.nodes {
            node.is_part_of_result = false;
        }
        let mut current = Some(finishing);
        while let Some(id) = current {
            let node = &mut self.nodes[id];
            node.is_part_of_result = true;
            current = node.parent;
        }
        self.finishing = Some(finishing);
    }

    /// Ids of the result path, root first.
    pub fn path(&self) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = self.finishing;
        while let Some(id) = current {
            path.push(id);
            current = self.nodes[id].parent;
        }
        path.reverse();
        path
    }

    /// Input word along the result path. Empty if no path was computed.
    pub fn witness(&self) -> Vec<L> {
        self.path()
            .into_iter()
            .filter_map(|id| self.nodes[id].edge_label.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Frame<N> {
    unit: usize,
    return_node: N,
    context: Vec<bool>,
}

/// Search position. `context` is what holds after the current procedure returns.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct Position<N> {
    stack: Vec<Frame<N>>,
    unit: usize,
    node: N,
    var: usize,
    context: Vec<bool>,
}

impl<'s, G, B> Session<'s, G, B>
where
    G: ModalProcessGraph,
    B: TransformerBackend<G::Label, G::Prop>,
{
    fn check_witness_support(&self) -> Result<(), WitnessError> {
        let graph = self.dependency_graph();
        if let Some(fixpoint) = graph.fixpoints().iter().find(|f| f.is_max) {
            return Err(WitnessError::UnsupportedFormula(format!("nu {}", fixpoint.name)));
        }
        for node in graph.nodes() {
            let supported = match &node.kind {
                NodeKind::Box { .. } | NodeKind::And(..) => false,
                NodeKind::Not(child) => matches!(graph.node(*child).kind, NodeKind::Atomic(_)),
                _ => true,
            };
            if !supported {
                return Err(WitnessError::UnsupportedFormula(node.label.clone()));
            }
        }
        Ok(())
    }

    fn holds(&self, position: &Position<G::Node>) -> bool {
        self.units()[position.unit]
            .transformer(position.node)
            .evaluate(&position.context)
            .contains(position.var)
    }

    /// Satisfied successor positions, with the action consumed by each step.
    fn successors(&self, position: &Position<G::Node>) -> Vec<(Position<G::Node>, Option<G::Label>)> {
        let units = self.units();
        let unit = &units[position.unit];
        let mut result = Vec::new();

        match &self.dependency_graph().node(position.var).kind {
            NodeKind::Or(left, right) => {
                for &var in [left, right] {
                    let next = Position {
                        var,
                        ..position.clone()
                    };
                    if self.holds(&next) {
                        result.push((next, None));
                    }
                }
            }

            NodeKind::Diamond { .. } if position.node == unit.final_node => {
                if let Some((frame, rest)) = position.stack.split_last() {
                    let next = Position {
                        stack: rest.to_vec(),
                        unit: frame.unit,
                        node: frame.return_node,
                        var: position.var,
                        context: frame.context.clone(),
                    };
                    if self.holds(&next) {
                        result.push((next, None));
                    }
                }
            }

            NodeKind::Diamond { action, child } => {
                let graph = unit.graph;
                let num_vars = self.dependency_graph().num_vars();
                for edge in graph.outgoing_edges(position.node) {
                    let label = graph.edge_label(edge);
                    let property = graph.edge_property(edge);
                    let target = graph.target(edge);

                    let next = if property.is_process() {
                        let callee = self.unit_index(label);
                        let mut stack = position.stack.clone();
                        stack.push(Frame {
                            unit: position.unit,
                            return_node: target,
                            context: position.context.clone(),
                        });
                        let context = unit
                            .transformer(target)
                            .evaluate(&position.context)
                            .to_bools(num_vars);
                        let step = Position {
                            stack,
                            unit: callee,
                            node: units[callee].initial_node,
                            var: position.var,
                            context,
                        };
                        (step, None)
                    } else if property.is_must() && action.as_ref().map_or(true, |a| a == label) {
                        let step = Position {
                            node: target,
                            var: *child,
                            ..position.clone()
                        };
                        (step, Some(label.clone()))
                    } else {
                        continue;
                    };

                    if self.holds(&next.0) {
                        result.push(next);
                    }
                }
            }

            _ => {}
        }

        result
    }

    fn is_leaf(&self, var: usize) -> bool {
        matches!(
            self.dependency_graph().node(var).kind,
            NodeKind::True | NodeKind::Atomic(_) | NodeKind::Not(_)
        )
    }

    /// Derivation of the formula at the main procedure's initial node.
    ///
    /// Returns `Ok(None)` if the formula does not hold. The session must have converged.
    pub fn find_witness(&self) -> Result<Option<WitnessTree<G::Label, G::Node>>, WitnessError> {
        self.check_witness_support()?;
        assert!(self.is_converged(), "witness extraction needs a converged session");
        if !self.is_sat() {
            return Ok(None);
        }

        let units = self.units();
        let main = &units[self.main_index()];
        let root = Position {
            stack: Vec::new(),
            unit: self.main_index(),
            node: main.initial_node,
            var: 0,
            context: self.deadlock_vector().to_vec(),
        };

        let mut tree = WitnessTree::new();
        let root_id = tree.add_node(
            None,
            main.label.clone(),
            root.node,
            0,
            self.dependency_graph().node(0).label.clone(),
            None,
        );
        let mut visited = HashSet::from([root.clone()]);
        let mut queue = VecDeque::from([(root, root_id)]);

        while let Some((position, id)) = queue.pop_front() {
            if self.is_leaf(position.var) {
                tree.compute_path(id);
                info!("Found witness of length {} after {} search states", tree.path().len(), tree.len());
                return Ok(Some(tree));
            }

            for (next, edge_label) in self.successors(&position) {
                if !visited.insert(next.clone()) {
                    continue;
                }
                if tree.len() >= self.options.witness_limit {
                    return Err(WitnessError::SearchExhausted { states: tree.len() });
                }
                let child = tree.add_node(
                    Some(id),
                    units[next.unit].label.clone(),
                    next.node,
                    next.var,
                    self.dependency_graph().node(next.var).label.clone(),
                    edge_label,
                );
                debug!("Witness state {} <- {}: {:?} var {}", child, id, next.node, next.var);
                queue.push_back((next, child));
            }
        }

        Err(WitnessError::SearchExhausted { states: tree.len() })
    }
}

impl<'a, G, B> Solver<'a, G, B>
where
    G: ModalProcessGraph,
    B: TransformerBackend<G::Label, G::Prop>,
{
    /// Solve `formula` and extract a witness if it holds.
    pub fn find_witness(
        &self,
        formula: &Formula<G::Label, G::Prop>,
    ) -> Result<Option<WitnessTree<G::Label, G::Node>>, WitnessError> {
        let mut session = self.session(formula)?;
        session.run()?;
        session.find_witness()
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::bdd_transformer::BddBackend;
    use crate::graph::{ContextFreeModalProcessSystem, EdgeProperty, NodeId, ProcessGraph};
    use crate::solver::SolverOptions;

    type Graph = ProcessGraph<&'static str, &'static str>;
    type System = ContextFreeModalProcessSystem<Graph>;
    type F = Formula<&'static str, &'static str>;

    #[test]
    fn test_tree_path() {
        let mut tree: WitnessTree<&str, usize> = WitnessTree::new();
        let root = tree.add_node(None, "main", 0, 0, "root", None);
        let a = tree.add_node(Some(root), "main", 1, 1, "x", Some("a"));
        let _dead = tree.add_node(Some(root), "main", 2, 1, "x", Some("c"));
        let b = tree.add_node(Some(a), "main", 3, 2, "y", None);
        let c = tree.add_node(Some(b), "main", 4, 2, "y", Some("b"));

        assert!(tree.witness().is_empty());
        tree.compute_path(c);
        assert_eq!(tree.finishing_node(), Some(c));
        assert_eq!(tree.path(), vec![root, a, b, c]);
        assert_eq!(tree.witness(), vec!["a", "b"]);
        assert!(tree.node(a).unwrap().is_part_of_result);
        assert!(!tree.node(2).unwrap().is_part_of_result);
        assert_eq!(tree.root().unwrap().id, root);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    #[should_panic(expected = "unknown parent")]
    fn test_unknown_parent() {
        let mut tree: WitnessTree<&str, usize> = WitnessTree::new();
        tree.add_node(Some(3), "main", 0, 0, "root", None);
    }

    /// `main: s0 -enter-> s1 -helper-> s2`, `helper: s0 -a-> s1`.
    fn helper_system() -> System {
        let mut main = Graph::new();
        let m0 = main.add_node();
        let m1 = main.add_node();
        let m2 = main.add_node();
        main.add_edge(m0, m1, "enter", EdgeProperty::must());
        main.add_edge(m1, m2, "helper", EdgeProperty::call());
        main.set_initial(m0);
        main.set_final(m2);

        let mut helper = Graph::new();
        let h0 = helper.add_node();
        let h1 = helper.add_node();
        helper.add_edge(h0, h1, "a", EdgeProperty::must());
        helper.set_initial(h0);
        helper.set_final(h1);

        let mut system = System::new("main");
        system.add_procedure("main", main);
        system.add_procedure("helper", helper);
        system
    }

    fn eventually(action: &'static str) -> F {
        F::mu("X", F::or(F::diamond(Some(action), F::True), F::diamond(None, F::var("X"))))
    }

    #[test]
    fn test_witness_through_call() {
        let system = helper_system();
        let solver = Solver::new(&system, BddBackend::default(), SolverOptions::default()).unwrap();
        let tree = solver.find_witness(&eventually("a")).unwrap().unwrap();
        assert_eq!(tree.witness(), vec!["enter", "a"]);

        let last = tree.node(tree.finishing_node().unwrap()).unwrap();
        assert_eq!(last.procedure, "helper");
        assert_eq!(last.state, NodeId(1));
        assert_eq!(last.label, "true");
    }

    #[test]
    fn test_no_witness_for_unsatisfied_formula() {
        let system = helper_system();
        let solver = Solver::new(&system, BddBackend::default(), SolverOptions::default()).unwrap();
        assert!(solver.find_witness(&eventually("b")).unwrap().is_none());
    }

    #[test]
    fn test_unsupported_formulas() {
        let system = helper_system();
        let solver = Solver::new(&system, BddBackend::default(), SolverOptions::default()).unwrap();

        let f = F::ag(F::True);
        assert!(matches!(
            solver.find_witness(&f),
            Err(WitnessError::UnsupportedFormula(_))
        ));

        let f = F::and(F::True, F::diamond(None, F::True));
        assert!(matches!(
            solver.find_witness(&f),
            Err(WitnessError::UnsupportedFormula(_))
        ));
    }

    #[test]
    fn test_search_limit() {
        let system = helper_system();
        let options = SolverOptions::default().with_witness_limit(2);
        let solver = Solver::new(&system, BddBackend::default(), options).unwrap();
        assert!(matches!(
            solver.find_witness(&eventually("a")),
            Err(WitnessError::SearchExhausted { states: 2 })
        ));
    }
}
