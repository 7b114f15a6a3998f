//! Procedural modal process graphs and context-free systems of them.
//!
//! A process graph is a control-flow graph with a distinguished initial and final node.
//! Its edges carry an action label, a [`Modality`] and an [`EdgeKind`]: an internal step,
//! or a call of the procedure named by the label.
//!
//! The solver only talks to graphs through [`ModalProcessGraph`]; [`ProcessGraph`] is the
//! arena-backed implementation used throughout the crate.
//!
//! ```
//! use m3c_rs::graph::{EdgeProperty, ProcessGraph};
//!
//! let mut g: ProcessGraph<&str, &str> = ProcessGraph::new();
//! let s = g.add_node();
//! let t = g.add_node_with_props(["done"]);
//! g.add_edge(s, t, "a", EdgeProperty::must());
//! g.set_initial(s);
//! g.set_final(t);
//! ```

use std::fmt::{Debug, Display};
use std::hash::Hash;

use indexmap::IndexMap;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Modality {
    Must,
    May,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum EdgeKind {
    Internal,
    /// Call of the procedure whose name is the edge label.
    Process,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EdgeProperty {
    pub modality: Modality,
    pub kind: EdgeKind,
}

impl EdgeProperty {
    pub const fn new(modality: Modality, kind: EdgeKind) -> Self {
        Self { modality, kind }
    }
    /// Internal must-step.
    pub const fn must() -> Self {
        Self::new(Modality::Must, EdgeKind::Internal)
    }
    /// Internal may-step.
    pub const fn may() -> Self {
        Self::new(Modality::May, EdgeKind::Internal)
    }
    /// Must-call of a procedure.
    pub const fn call() -> Self {
        Self::new(Modality::Must, EdgeKind::Process)
    }

    pub fn is_must(&self) -> bool {
        self.modality == Modality::Must
    }
    pub fn is_process(&self) -> bool {
        self.kind == EdgeKind::Process
    }
}

/// Read-only access to a procedural process graph.
pub trait ModalProcessGraph {
    type Node: Copy + Eq + Hash + Debug;
    type Edge: Copy + Eq + Debug;
    /// Action labels; call edges are labelled with the callee's name.
    type Label: Clone + Eq + Hash + Debug + Display;
    type Prop: Clone + Eq + Hash + Debug + Display;

    fn nodes(&self) -> impl Iterator<Item = Self::Node> + '_;
    fn initial_node(&self) -> Option<Self::Node>;
    fn final_node(&self) -> Option<Self::Node>;
    fn outgoing_edges(&self, node: Self::Node) -> impl Iterator<Item = Self::Edge> + '_;
    fn target(&self, edge: Self::Edge) -> Self::Node;
    fn edge_label(&self, edge: Self::Edge) -> &Self::Label;
    fn edge_property(&self, edge: Self::Edge) -> EdgeProperty;
    fn atomic_propositions(&self, node: Self::Node) -> &[Self::Prop];
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct NodeId(pub usize);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct EdgeId(pub usize);

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct NodeData<AP> {
    props: Vec<AP>,
    outgoing: Vec<EdgeId>,
}

#[derive(Debug, Clone)]
struct EdgeData<L> {
    target: NodeId,
    label: L,
    property: EdgeProperty,
}

/// Arena-backed process graph.
#[derive(Debug, Clone)]
pub struct ProcessGraph<L, AP> {
    nodes: Vec<NodeData<AP>>,
    edges: Vec<EdgeData<L>>,
    initial: Option<NodeId>,
    final_: Option<NodeId>,
}

impl<L, AP> Default for ProcessGraph<L, AP> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            initial: None,
            final_: None,
        }
    }
}

impl<L, AP> ProcessGraph<L, AP> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self) -> NodeId {
        self.add_node_with_props(std::iter::empty())
    }

    pub fn add_node_with_props(&mut self, props: impl IntoIterator<Item = AP>) -> NodeId {
        self.nodes.push(NodeData {
            props: props.into_iter().collect(),
            outgoing: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn add_prop(&mut self, node: NodeId, prop: AP) {
        self.nodes[node.0].props.push(prop);
    }

    pub fn add_edge(&mut self, source: NodeId, target: NodeId, label: L, property: EdgeProperty) -> EdgeId {
        assert!(target.0 < self.nodes.len(), "unknown target node {:?}", target);
        let id = EdgeId(self.edges.len());
        self.edges.push(EdgeData { target, label, property });
        self.nodes[source.0].outgoing.push(id);
        id
    }

    pub fn set_initial(&mut self, node: NodeId) {
        self.initial = Some(node);
    }

    pub fn set_final(&mut self, node: NodeId) {
        self.final_ = Some(node);
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }
}

impl<L, AP> ModalProcessGraph for ProcessGraph<L, AP>
where
    L: Clone + Eq + Hash + Debug + Display,
    AP: Clone + Eq + Hash + Debug + Display,
{
    type Node = NodeId;
    type Edge = EdgeId;
    type Label = L;
    type Prop = AP;

    fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    fn initial_node(&self) -> Option<NodeId> {
        self.initial
    }

    fn final_node(&self) -> Option<NodeId> {
        self.final_
    }

    fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = EdgeId> + '_ {
        self.nodes[node.0].outgoing.iter().copied()
    }

    fn target(&self, edge: EdgeId) -> NodeId {
        self.edges[edge.0].target
    }

    fn edge_label(&self, edge: EdgeId) -> &L {
        &self.edges[edge.0].label
    }

    fn edge_property(&self, edge: EdgeId) -> EdgeProperty {
        self.edges[edge.0].property
    }

    fn atomic_propositions(&self, node: NodeId) -> &[AP] {
        &self.nodes[node.0].props
    }
}

/// Named procedures, one of which is the entry point.
#[derive(Debug, Clone)]
pub struct ContextFreeModalProcessSystem<G: ModalProcessGraph> {
    procedures: IndexMap<G::Label, G>,
    main: G::Label,
}

impl<G: ModalProcessGraph> ContextFreeModalProcessSystem<G> {
    pub fn new(main: G::Label) -> Self {
        Self {
            procedures: IndexMap::new(),
            main,
        }
    }

    pub fn with_procedures(procedures: IndexMap<G::Label, G>, main: G::Label) -> Self {
        Self { procedures, main }
    }

    /// Add (or replace) a procedure.
    pub fn add_procedure(&mut self, label: G::Label, graph: G) {
        self.procedures.insert(label, graph);
    }

    pub fn procedures(&self) -> &IndexMap<G::Label, G> {
        &self.procedures
    }

    pub fn procedure(&self, label: &G::Label) -> Option<&G> {
        self.procedures.get(label)
    }

    pub fn main(&self) -> &G::Label {
        &self.main
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_graph() {
        let mut g: ProcessGraph<&str, &str> = ProcessGraph::new();
        let s0 = g.add_node();
        let s1 = g.add_node_with_props(["p", "q"]);
        let e = g.add_edge(s0, s1, "a", EdgeProperty::may());
        g.add_edge(s0, s0, "P", EdgeProperty::call());
        g.set_initial(s0);
        g.set_final(s1);

        assert_eq!(g.nodes().collect::<Vec<_>>(), vec![s0, s1]);
        assert_eq!(g.initial_node(), Some(s0));
        assert_eq!(g.final_node(), Some(s1));
        assert_eq!(g.outgoing_edges(s0).count(), 2);
        assert_eq!(g.outgoing_edges(s1).count(), 0);
        assert_eq!(g.target(e), s1);
        assert_eq!(*g.edge_label(e), "a");
        assert!(!g.edge_property(e).is_must());
        assert_eq!(g.atomic_propositions(s1), &["p", "q"]);
        assert_eq!(g.atomic_propositions(s0), &[] as &[&str]);
    }

    #[test]
    fn test_edge_properties() {
        assert!(EdgeProperty::must().is_must());
        assert!(!EdgeProperty::must().is_process());
        assert!(EdgeProperty::call().is_process());
        assert_eq!(EdgeProperty::new(Modality::May, EdgeKind::Process).modality, Modality::May);
    }

    #[test]
    fn test_system_keeps_insertion_order() {
        let mut system: ContextFreeModalProcessSystem<ProcessGraph<&str, &str>> = ContextFreeModalProcessSystem::new("main");
        system.add_procedure("main", ProcessGraph::new());
        system.add_procedure("helper", ProcessGraph::new());
        assert_eq!(system.procedures().keys().copied().collect::<Vec<_>>(), vec!["main", "helper"]);
        assert!(system.procedure(&"helper").is_some());
        assert!(system.procedure(&"other").is_none());
        assert_eq!(*system.main(), "main");
    }
}
