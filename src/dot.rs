//! DOT (Graphviz) export of transformers and witness trees.
//!
//! # DOT Format
//!
//! For decision diagrams ([`Bdd::to_dot`], [`BddTransformer::to_dot`]):
//! - **Terminal node** `1` is rendered as a square at the bottom (sink rank); `0` is its
//!   complement and appears only as the target of negated edges
//! - **Variable nodes** are circles labelled with the input they test, grouped by level
//! - **Edges**:
//!   - Solid lines represent high (then) edges
//!   - Dashed lines represent low (else) edges
//!   - Dotted lines with hollow circles represent negated edges
//! - **Root nodes** are rectangles at the top (source rank); for a transformer there is one root
//!   per subformula, labelled with it
//!
//! For witness trees ([`WitnessTree::to_dot`]) every search state is a box labelled with its
//! procedure, process-graph node and subformula; the result path is highlighted and edges carry
//! the action taken.
//!
//! ```
//! use m3c_rs::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let f = bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));
//! let dot = bdd.to_dot(&[f]).unwrap();
//! assert!(dot.starts_with("graph {"));
//! // Render with: dot -Tpng output.dot -o output.png
//! ```

use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Write as _};

use crate::bdd::Bdd;
use crate::bdd_transformer::BddTransformer;
use crate::reference::Ref;
use crate::witness::WitnessTree;

/// Configuration options for DOT output generation.
///
/// ```
/// use m3c_rs::bdd::Bdd;
/// use m3c_rs::dot::DotConfig;
///
/// let bdd = Bdd::default();
/// let config = DotConfig {
///     node_shape: "ellipse",
///     ..DotConfig::default()
/// };
/// let dot = bdd.to_dot_with_config(&[bdd.mk_var(1)], &config).unwrap();
/// assert!(dot.contains("shape=ellipse"));
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for variable nodes (default: "circle")
    pub node_shape: &'static str,
    /// Shape for terminal nodes (default: "square")
    pub terminal_shape: &'static str,
    /// Shape for root nodes (default: "rect")
    pub root_shape: &'static str,
    /// Style for high (then) edges (default: "solid")
    pub high_edge_style: &'static str,
    /// Style for low (else) edges (default: "dashed")
    pub low_edge_style: &'static str,
    /// Style for negated edges (default: "dotted")
    pub negated_edge_style: &'static str,
    /// Whether to use HTML labels for subscripts (default: true)
    pub use_html_labels: bool,
    /// Colour of the result path in witness trees (default: "red")
    pub result_color: &'static str,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            node_shape: "circle",
            terminal_shape: "square",
            root_shape: "rect",
            high_edge_style: "solid",
            low_edge_style: "dashed",
            negated_edge_style: "dotted",
            use_html_labels: true,
            result_color: "red",
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Bdd {
    /// DOT representation of the diagrams rooted at `roots`, with default settings.
    pub fn to_dot(&self, roots: &[Ref]) -> Result<String, std::fmt::Error> {
        let labels: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        self.to_dot_labelled(roots, &labels, &DotConfig::default())
    }

    pub fn to_dot_with_config(&self, roots: &[Ref], config: &DotConfig) -> Result<String, std::fmt::Error> {
        let labels: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        self.to_dot_labelled(roots, &labels, config)
    }

    fn to_dot_labelled(&self, roots: &[Ref], labels: &[String], config: &DotConfig) -> Result<String, std::fmt::Error> {
        assert_eq!(roots.len(), labels.len());

        let mut dot = String::new();
        writeln!(dot, "graph {{")?;
        writeln!(dot, "node [shape={}, fixedsize=true];", config.node_shape)?;

        writeln!(dot, "{{ rank=sink")?;
        writeln!(dot, "0 [shape={}, label=\"0\"];", config.terminal_shape)?;
        writeln!(dot, "1 [shape={}, label=\"1\"];", config.terminal_shape)?;
        writeln!(dot, "}}")?;

        let all_nodes = self.descendants(roots.iter().copied());

        // Same variable, same rank.
        let mut levels = BTreeMap::<u32, Vec<u32>>::new();
        for &id in all_nodes.iter() {
            if id == 1 {
                continue;
            }
            levels.entry(self.variable(id)).or_default().push(id);
        }
        for level in levels.values_mut() {
            level.sort_unstable();
        }

        for level in levels.values() {
            writeln!(dot, "{{ rank=same")?;
            for &id in level.iter() {
                // BDD variable `v` tests input `x{v-1}`.
                let input = self.variable(id) - 1;
                let label = if config.use_html_labels {
                    format!("<x<SUB>{}</SUB>>", input)
                } else {
                    format!("\"x{}\"", input)
                };
                writeln!(dot, "{} [label={}];", id, label)?;
            }
            writeln!(dot, "}}")?;
        }

        for level in levels.values() {
            for &id in level.iter() {
                let high = self.high(id);
                assert!(!high.is_negated(), "high edges are never negated");
                writeln!(dot, "{} -- {} [style={}];", id, high.index(), config.high_edge_style)?;

                let low = self.low(id);
                if low.is_negated() {
                    if low.index() == 1 {
                        writeln!(dot, "{} -- 0 [style={}];", id, config.low_edge_style)?;
                    } else {
                        writeln!(
                            dot,
                            "{} -- {} [style={}, dir=forward, arrowhead=odot];",
                            id,
                            low.index(),
                            config.negated_edge_style
                        )?;
                    }
                } else {
                    writeln!(dot, "{} -- {} [style={}];", id, low.index(), config.low_edge_style)?;
                }
            }
        }

        writeln!(dot, "{{ rank=source")?;
        for (i, label) in labels.iter().enumerate() {
            writeln!(dot, "r{} [shape={}, label=\"{}\"];", i, config.root_shape, escape(label))?;
        }
        writeln!(dot, "}}")?;

        for (i, &root) in roots.iter().enumerate() {
            if root.is_negated() {
                if root.index() == 1 {
                    writeln!(dot, "r{} -- 0;", i)?;
                } else {
                    writeln!(dot, "r{} -- {} [dir=forward, arrowhead=odot];", i, root.index())?;
                }
            } else {
                writeln!(dot, "r{} -- {};", i, root.index())?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl<L, AP> BddTransformer<L, AP> {
    /// DOT representation of every entry, one root per subformula.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let labels: Vec<String> = (0..self.bdds().len())
            .map(|var| format!("{}: {}", var, self.label(var)))
            .collect();
        self.bdd().to_dot_labelled(self.bdds(), &labels, config)
    }
}

impl<L: Clone + Display, N: Debug> WitnessTree<L, N> {
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.root_shape)?;

        for node in self.nodes() {
            let label = format!("{} {:?}\\n{}", node.procedure, node.state, escape(&node.label));
            if node.is_part_of_result {
                writeln!(dot, "{} [label=\"{}\", color={}];", node.id, label, config.result_color)?;
            } else {
                writeln!(dot, "{} [label=\"{}\"];", node.id, label)?;
            }
        }

        for node in self.nodes() {
            let Some(parent) = node.parent else { continue };
            let mut attrs = Vec::new();
            if let Some(action) = &node.edge_label {
                attrs.push(format!("label=\"{}\"", escape(&action.to_string())));
            }
            if node.is_part_of_result {
                attrs.push(format!("color={}", config.result_color));
            }
            if attrs.is_empty() {
                writeln!(dot, "{} -> {};", parent, node.id)?;
            } else {
                writeln!(dot, "{} -> {} [{}];", parent, node.id, attrs.join(", "))?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
