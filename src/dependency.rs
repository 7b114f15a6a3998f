//! # Dependency graph
//!
//! A formula is flattened into a system of boolean equations, one per subformula.
//! Each subformula gets a dense *variable number*; children are referred to by number,
//! never by pointer, so transformers can index them directly.
//!
//! ## Numbering
//!
//! Numbers are assigned in pre-order, starting with `0` for the root. Fixpoint binders and
//! variable references are not equations of their own: `mu X.φ` shares the number of `φ`,
//! and a reference `X` resolves to the number of its binder. A formula like
//! `mu X.(<b>true || <>X)` therefore has four variables:
//!
//! ```text
//! 0: (<b>true || <>X)      Or(1, 3)
//! 1: <b>true               Diamond(b, 2)
//! 2: true                  True
//! 3: <>X                   Diamond(any, 0)
//! ```
//!
//! ## Equational blocks
//!
//! Variables are grouped into [`EquationalBlock`]s solved together as one least or one
//! greatest fixpoint. Block `0` is a greatest block unless the root is a least fixpoint.
//! Walking down the formula, a `nu` below a least block (or a `mu` below a greatest block)
//! opens a new block appended at the end, so higher indices are more deeply nested and are
//! solved first. Inside a block, variables are listed children-first.
//!
//! The builder works on the negation normal form of its input, and targets
//! alternation-free formulas: an inner block must not refer to a variable bound in an
//! enclosing block of the opposite kind.

use std::fmt::Display;

use log::{debug, info};

use crate::error::FormulaError;
use crate::formula::Formula;
use crate::varset::VarSet;

/// One equation of the system; children are variable numbers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NodeKind<L, AP> {
    True,
    False,
    Atomic(AP),
    Not(usize),
    And(usize, usize),
    Or(usize, usize),
    Box { action: Option<L>, child: usize },
    Diamond { action: Option<L>, child: usize },
}

#[derive(Debug, Clone)]
pub struct FormulaNode<L, AP> {
    pub var: usize,
    pub kind: NodeKind<L, AP>,
    /// Rendering of the subformula, for logs, histories and witnesses.
    pub label: String,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EquationalBlock {
    pub is_max: bool,
    /// Variables of the block, children before parents.
    pub vars: Vec<usize>,
}

impl EquationalBlock {
    fn new(is_max: bool) -> Self {
        Self { is_max, vars: Vec::new() }
    }
}

/// A fixpoint binder of the formula.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Fixpoint {
    pub name: String,
    pub var: usize,
    pub is_max: bool,
}

#[derive(Debug, Clone)]
pub struct DependencyGraph<L, AP> {
    nodes: Vec<FormulaNode<L, AP>>,
    blocks: Vec<EquationalBlock>,
    block_of: Vec<usize>,
    fixpoints: Vec<Fixpoint>,
}

struct Builder<L, AP> {
    nodes: Vec<Option<FormulaNode<L, AP>>>,
    blocks: Vec<EquationalBlock>,
    fixpoints: Vec<Fixpoint>,
    scope: Vec<(String, usize)>,
}

impl<L, AP> Builder<L, AP>
where
    L: Clone + Display,
    AP: Clone + Display,
{
    fn next_var(&self) -> usize {
        self.nodes.len()
    }

    /// Number `f` and its subformulas, adding equations to `block`. Returns the number of `f`.
    fn visit(&mut self, f: &Formula<L, AP>, block: usize) -> Result<usize, FormulaError> {
        use Formula as F;

        match f {
            F::Var(x) => self
                .scope
                .iter()
                .rev()
                .find(|(name, _)| name == x)
                .map(|&(_, var)| var)
                .ok_or_else(|| FormulaError::UnboundVariable(x.clone())),

            F::Mu(x, body) | F::Nu(x, body) => {
                if let F::Var(_) = body.as_ref() {
                    return Err(FormulaError::BareFixpointVariable(x.clone()));
                }
                let is_max = matches!(f, F::Nu(..));
                let block = if self.blocks[block].is_max == is_max {
                    block
                } else {
                    self.blocks.push(EquationalBlock::new(is_max));
                    self.blocks.len() - 1
                };

                let var = self.next_var();
                self.fixpoints.push(Fixpoint {
                    name: x.clone(),
                    var,
                    is_max,
                });
                self.scope.push((x.clone(), var));
                let body_var = self.visit(body, block)?;
                self.scope.pop();
                assert_eq!(body_var, var, "fixpoint must share the number of its body");
                Ok(var)
            }

            _ => {
                let var = self.next_var();
                self.nodes.push(None);
                self.blocks[block].vars.push(var);

                let kind = match f {
                    F::True => NodeKind::True,
                    F::False => NodeKind::False,
                    F::Atomic(p) => NodeKind::Atomic(p.clone()),
                    F::Not(g) => {
                        if let F::Var(x) = g.as_ref() {
                            if self.scope.iter().any(|(name, _)| name == x) {
                                return Err(FormulaError::NegativeFixpointVariable(x.clone()));
                            }
                        }
                        NodeKind::Not(self.visit(g, block)?)
                    }
                    F::And(g, h) => {
                        let g = self.visit(g, block)?;
                        NodeKind::And(g, self.visit(h, block)?)
                    }
                    F::Or(g, h) => {
                        let g = self.visit(g, block)?;
                        NodeKind::Or(g, self.visit(h, block)?)
                    }
                    F::Box(action, g) => NodeKind::Box {
                        action: action.clone(),
                        child: self.visit(g, block)?,
                    },
                    F::Diamond(action, g) => NodeKind::Diamond {
                        action: action.clone(),
                        child: self.visit(g, block)?,
                    },
                    _ => unreachable!("CTL operators are rewritten before numbering"),
                };

                debug!("var {} = {}: {}", var, kind_name(&kind), f);
                self.nodes[var] = Some(FormulaNode {
                    var,
                    kind,
                    label: f.to_string(),
                });
                Ok(var)
            }
        }
    }
}

fn kind_name<L, AP>(kind: &NodeKind<L, AP>) -> &'static str {
    match kind {
        NodeKind::True => "True",
        NodeKind::False => "False",
        NodeKind::Atomic(_) => "Atomic",
        NodeKind::Not(_) => "Not",
        NodeKind::And(..) => "And",
        NodeKind::Or(..) => "Or",
        NodeKind::Box { .. } => "Box",
        NodeKind::Diamond { .. } => "Diamond",
    }
}

impl<L, AP> DependencyGraph<L, AP>
where
    L: Clone + Display,
    AP: Clone + Display,
{
    /// Flatten `formula` (after CTL rewriting and NNF conversion) into equations.
    ///
    /// Fails on unbound variables, on fixpoints whose body is a bare variable, and on bound
    /// variables left under a negation by the NNF conversion.
    ///
    /// Alternation is not checked. A formula such as `nu Y.mu X.(<a>Y || <>X)`, whose inner
    /// `mu` block refers to the enclosing `nu` variable, is accepted. The solver solves each
    /// block once, innermost first, so its answer for such a formula may be wrong.
    pub fn new(formula: &Formula<L, AP>) -> Result<Self, FormulaError> {
        let formula = formula.to_nnf();

        let root_is_min = matches!(formula, Formula::Mu(..));
        let mut builder = Builder {
            nodes: Vec::new(),
            blocks: vec![EquationalBlock::new(!root_is_min)],
            fixpoints: Vec::new(),
            scope: Vec::new(),
        };
        let root = builder.visit(&formula, 0)?;
        assert_eq!(root, 0, "root must be variable 0");

        let num_vars = builder.nodes.len();
        let nodes: Vec<FormulaNode<L, AP>> = builder.nodes.into_iter().flatten().collect();
        assert_eq!(nodes.len(), num_vars, "every number must be assigned a node");

        let mut blocks = builder.blocks;
        for block in blocks.iter_mut() {
            block.vars.reverse();
        }
        // Directly nested fixpoints of opposite kinds leave the outer block empty.
        blocks.retain(|b| !b.vars.is_empty());

        let mut block_of = vec![0; nodes.len()];
        for (i, block) in blocks.iter().enumerate() {
            for &v in &block.vars {
                block_of[v] = i;
            }
        }

        info!(
            "Built dependency graph for {}: {} variables in {} blocks",
            formula,
            nodes.len(),
            blocks.len()
        );
        Ok(Self {
            nodes,
            blocks,
            block_of,
            fixpoints: builder.fixpoints,
        })
    }
}

impl<L, AP> DependencyGraph<L, AP> {
    pub fn num_vars(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[FormulaNode<L, AP>] {
        &self.nodes
    }

    pub fn node(&self, var: usize) -> &FormulaNode<L, AP> {
        &self.nodes[var]
    }

    pub fn blocks(&self) -> &[EquationalBlock] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> &EquationalBlock {
        &self.blocks[index]
    }

    /// Index of the block containing `var`.
    pub fn block_of(&self, var: usize) -> usize {
        self.block_of[var]
    }

    /// Whether `var` belongs to a greatest-fixpoint block.
    pub fn is_max(&self, var: usize) -> bool {
        self.blocks[self.block_of[var]].is_max
    }

    pub fn fixpoints(&self) -> &[Fixpoint] {
        &self.fixpoints
    }

    /// Truth of every variable at a deadlocked state, i.e. a final node without
    /// any further unfolding: `[]φ` holds vacuously, `<>φ` fails, atomic propositions
    /// are looked up with `has_prop`.
    ///
    /// Blocks are evaluated innermost first, each in children-first order.
    pub fn deadlock_satisfaction(&self, has_prop: impl Fn(&AP) -> bool) -> VarSet {
        let mut values = vec![false; self.num_vars()];
        for block in self.blocks.iter().rev() {
            for &var in &block.vars {
                values[var] = match &self.nodes[var].kind {
                    NodeKind::True => true,
                    NodeKind::False => false,
                    NodeKind::Atomic(p) => has_prop(p),
                    NodeKind::Not(c) => !values[*c],
                    NodeKind::And(l, r) => values[*l] && values[*r],
                    NodeKind::Or(l, r) => values[*l] || values[*r],
                    NodeKind::Box { .. } => true,
                    NodeKind::Diamond { .. } => false,
                };
            }
        }
        VarSet::from_bools(&values)
    }

    /// Labels of the subformulas in `vars`, in variable order.
    pub fn labels(&self, vars: &VarSet) -> Vec<String> {
        vars.iter().map(|v| self.nodes[v].label.clone()).collect()
    }
}
