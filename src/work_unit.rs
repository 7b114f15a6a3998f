//! Per-procedure solver state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::graph::ModalProcessGraph;

/// Which dirty node a [`WorkSet`] hands out next.
///
/// The fixpoint does not depend on the order; only the number of updates and the
/// recorded history do.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum PickOrder {
    /// Oldest dirty node first.
    #[default]
    Fifo,
    /// Most recently dirtied node first.
    Lifo,
}

/// Set of dirty nodes with a deterministic pick order.
#[derive(Debug, Clone)]
pub struct WorkSet<N> {
    queue: VecDeque<N>,
    members: HashSet<N>,
    order: PickOrder,
}

impl<N: Copy + Eq + Hash> WorkSet<N> {
    pub fn new(order: PickOrder) -> Self {
        Self {
            queue: VecDeque::new(),
            members: HashSet::new(),
            order,
        }
    }

    /// Returns true if `node` was not already dirty.
    pub fn insert(&mut self, node: N) -> bool {
        let fresh = self.members.insert(node);
        if fresh {
            self.queue.push_back(node);
        }
        fresh
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = N>) {
        for node in nodes {
            self.insert(node);
        }
    }

    pub fn pop(&mut self) -> Option<N> {
        let node = match self.order {
            PickOrder::Fifo => self.queue.pop_front(),
            PickOrder::Lifo => self.queue.pop_back(),
        }?;
        self.members.remove(&node);
        Some(node)
    }

    pub fn contains(&self, node: &N) -> bool {
        self.members.contains(node)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Dirty nodes in pick order.
    pub fn snapshot(&self) -> Vec<N> {
        match self.order {
            PickOrder::Fifo => self.queue.iter().copied().collect(),
            PickOrder::Lifo => self.queue.iter().rev().copied().collect(),
        }
    }
}

/// Reverse edges of a procedure, computed once per solver.
pub fn predecessors<G: ModalProcessGraph>(graph: &G) -> HashMap<G::Node, Vec<G::Node>> {
    let mut preds: HashMap<G::Node, Vec<G::Node>> = HashMap::new();
    for node in graph.nodes() {
        for edge in graph.outgoing_edges(node) {
            let list = preds.entry(graph.target(edge)).or_default();
            if !list.contains(&node) {
                list.push(node);
            }
        }
    }
    preds
}

/// One procedure as seen by a solve: its graph, static predecessor relation,
/// current transformer per node and dirty nodes.
pub struct WorkUnit<'a, G: ModalProcessGraph, T> {
    pub label: &'a G::Label,
    pub graph: &'a G,
    pub initial_node: G::Node,
    pub final_node: G::Node,
    pub predecessors: &'a HashMap<G::Node, Vec<G::Node>>,
    pub transformers: HashMap<G::Node, T>,
    pub work_set: WorkSet<G::Node>,
}

impl<'a, G: ModalProcessGraph, T> WorkUnit<'a, G, T> {
    pub fn predecessors_of(&self, node: G::Node) -> &'a [G::Node] {
        let predecessors: &'a HashMap<G::Node, Vec<G::Node>> = self.predecessors;
        predecessors.get(&node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Mark every non-final node dirty.
    pub fn fill_work_set(&mut self) {
        let (graph, final_node) = (self.graph, self.final_node);
        self.work_set.extend(graph.nodes().filter(|&n| n != final_node));
    }

    pub fn transformer(&self, node: G::Node) -> &T {
        &self.transformers[&node]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeProperty, ProcessGraph};

    #[test]
    fn test_fifo() {
        let mut ws = WorkSet::new(PickOrder::Fifo);
        ws.extend([3, 1, 2]);
        assert!(!ws.insert(1));
        assert_eq!(ws.len(), 3);
        assert_eq!(ws.snapshot(), vec![3, 1, 2]);
        assert_eq!(ws.pop(), Some(3));
        assert!(!ws.contains(&3));
        assert!(ws.insert(3));
        assert_eq!(ws.snapshot(), vec![1, 2, 3]);
    }

    #[test]
    fn test_lifo() {
        let mut ws = WorkSet::new(PickOrder::Lifo);
        ws.extend([3, 1, 2]);
        assert_eq!(ws.snapshot(), vec![2, 1, 3]);
        assert_eq!(ws.pop(), Some(2));
        assert_eq!(ws.pop(), Some(1));
        assert_eq!(ws.pop(), Some(3));
        assert_eq!(ws.pop(), None);
        assert!(ws.is_empty());
    }

    #[test]
    fn test_predecessors() {
        let mut g: ProcessGraph<&str, &str> = ProcessGraph::new();
        let s0 = g.add_node();
        let s1 = g.add_node();
        let s2 = g.add_node();
        g.add_edge(s0, s1, "a", EdgeProperty::must());
        g.add_edge(s0, s1, "b", EdgeProperty::may());
        g.add_edge(s1, s2, "c", EdgeProperty::must());
        g.add_edge(s2, s1, "P", EdgeProperty::call());

        let preds = predecessors(&g);
        assert_eq!(preds[&s1], vec![s0, s2]);
        assert_eq!(preds[&s2], vec![s1]);
        assert!(!preds.contains_key(&s0));
    }
}
