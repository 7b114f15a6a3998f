//! BDD-backed property transformers.
//!
//! A [`BddTransformer`] over `n` formula variables is a vector of `n` BDDs over the input
//! variables `x0..x{n-1}` (BDD variable `i + 1` stands for `xi`). Entry `i` is the condition,
//! on what holds afterwards, under which subformula `i` holds before.
//!
//! All transformers of one solve share a [`BddManager`], which owns the [`Bdd`] and a copy of
//! the equations. Equality of transformers is then plain equality of `Ref` vectors.

use std::fmt::{Debug, Formatter};
use std::rc::Rc;

use log::debug;

use crate::bdd::Bdd;
use crate::dependency::{DependencyGraph, EquationalBlock, NodeKind};
use crate::error::{BackendError, DeserializeError};
use crate::graph::EdgeProperty;
use crate::reference::Ref;
use crate::transformer::{PropertyTransformer, TransformerBackend, TransformerManager};
use crate::varset::VarSet;

/// Creates one [`BddManager`] per solve.
#[derive(Debug, Clone, Copy)]
pub struct BddBackend {
    storage_bits: usize,
}

impl BddBackend {
    /// The unique table of each manager holds up to `2^storage_bits` nodes.
    pub fn new(storage_bits: usize) -> Result<Self, BackendError> {
        if !(1..=31).contains(&storage_bits) {
            return Err(BackendError::InvalidStorageBits(storage_bits));
        }
        Ok(Self { storage_bits })
    }

    pub fn storage_bits(&self) -> usize {
        self.storage_bits
    }
}

impl Default for BddBackend {
    fn default() -> Self {
        Self { storage_bits: 20 }
    }
}

struct Context<L, AP> {
    bdd: Bdd,
    kinds: Vec<NodeKind<L, AP>>,
    is_max: Vec<bool>,
    labels: Vec<String>,
}

impl<L, AP> Context<L, AP> {
    fn num_vars(&self) -> usize {
        self.kinds.len()
    }

    fn input(&self, var: usize) -> Ref {
        self.bdd.mk_var(var as u32 + 1)
    }
}

pub struct BddManager<L, AP> {
    ctx: Rc<Context<L, AP>>,
}

impl<L, AP> BddManager<L, AP> {
    pub fn bdd(&self) -> &Bdd {
        &self.ctx.bdd
    }

    fn transformer(&self, bdds: Vec<Ref>) -> BddTransformer<L, AP> {
        assert_eq!(bdds.len(), self.ctx.num_vars());
        BddTransformer {
            ctx: Rc::clone(&self.ctx),
            bdds,
        }
    }
}

impl<L, AP> Drop for BddManager<L, AP> {
    fn drop(&mut self) {
        debug!("Releasing BDD manager: {:?}", self.ctx.bdd);
    }
}

impl<L, AP> TransformerBackend<L, AP> for BddBackend
where
    L: Clone + PartialEq,
    AP: Clone + PartialEq,
{
    type Manager = BddManager<L, AP>;

    fn create_manager(&self, graph: &DependencyGraph<L, AP>) -> BddManager<L, AP> {
        let ctx = Context {
            bdd: Bdd::new(self.storage_bits),
            kinds: graph.nodes().iter().map(|n| n.kind.clone()).collect(),
            is_max: (0..graph.num_vars()).map(|v| graph.is_max(v)).collect(),
            labels: graph.nodes().iter().map(|n| n.label.clone()).collect(),
        };
        BddManager { ctx: Rc::new(ctx) }
    }
}

impl<L, AP> TransformerManager<L, AP> for BddManager<L, AP>
where
    L: PartialEq,
    AP: PartialEq,
{
    type Transformer = BddTransformer<L, AP>;

    fn node_transformer(&self) -> BddTransformer<L, AP> {
        let bdd = &self.ctx.bdd;
        self.transformer(self.ctx.is_max.iter().map(|&m| bdd.constant(m)).collect())
    }

    fn end_transformer(&self) -> BddTransformer<L, AP> {
        self.transformer((0..self.ctx.num_vars()).map(|v| self.ctx.input(v)).collect())
    }

    fn edge_transformer(&self, label: &L, property: EdgeProperty) -> BddTransformer<L, AP> {
        let bdd = &self.ctx.bdd;
        let matches = |action: &Option<L>| action.as_ref().map_or(true, |a| a == label);

        let bdds = self
            .ctx
            .kinds
            .iter()
            .map(|kind| match kind {
                NodeKind::Box { action, child } if matches(action) => self.ctx.input(*child),
                NodeKind::Box { .. } => bdd.one,
                NodeKind::Diamond { action, child } if matches(action) && property.is_must() => {
                    self.ctx.input(*child)
                }
                _ => bdd.zero,
            })
            .collect();
        self.transformer(bdds)
    }

    fn deserialize(&self, data: &[String]) -> Result<BddTransformer<L, AP>, DeserializeError> {
        if data.len() != self.ctx.num_vars() {
            return Err(DeserializeError::WrongArity {
                expected: self.ctx.num_vars(),
                found: data.len(),
            });
        }
        let bdds = data
            .iter()
            .map(|s| self.ctx.bdd.deserialize(s))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.transformer(bdds))
    }

    fn check(&self) -> Result<(), BackendError> {
        let bdd = &self.ctx.bdd;
        if bdd.is_full() {
            return Err(BackendError::StorageFull {
                capacity: bdd.capacity(),
            });
        }
        Ok(())
    }
}

pub struct BddTransformer<L, AP> {
    ctx: Rc<Context<L, AP>>,
    bdds: Vec<Ref>,
}

impl<L, AP> BddTransformer<L, AP> {
    pub fn bdd(&self) -> &Bdd {
        &self.ctx.bdd
    }

    /// Entry `var` of the transformer.
    pub fn get(&self, var: usize) -> Ref {
        self.bdds[var]
    }

    pub fn bdds(&self) -> &[Ref] {
        &self.bdds
    }

    /// Subformula rendering of `var`.
    pub fn label(&self, var: usize) -> &str {
        &self.ctx.labels[var]
    }

    fn assert_same_manager(&self, other: &Self) {
        assert!(
            Rc::ptr_eq(&self.ctx, &other.ctx),
            "transformers belong to different managers"
        );
    }

    fn with_bdds(&self, bdds: Vec<Ref>) -> Self {
        Self {
            ctx: Rc::clone(&self.ctx),
            bdds,
        }
    }
}

impl<L, AP> Clone for BddTransformer<L, AP> {
    fn clone(&self) -> Self {
        self.with_bdds(self.bdds.clone())
    }
}

impl<L, AP> PartialEq for BddTransformer<L, AP> {
    fn eq(&self, other: &Self) -> bool {
        self.assert_same_manager(other);
        self.bdds == other.bdds
    }
}

impl<L, AP> Debug for BddTransformer<L, AP> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.bdds.iter().map(|&r| self.ctx.bdd.to_bracket_string(r)))
            .finish()
    }
}

impl<L, AP> PropertyTransformer<AP> for BddTransformer<L, AP>
where
    AP: PartialEq,
{
    fn compose(&self, other: &Self) -> Self {
        self.assert_same_manager(other);
        let bdd = &self.ctx.bdd;
        self.with_bdds(
            self.bdds
                .iter()
                .map(|&f| bdd.vector_compose(f, &other.bdds))
                .collect(),
        )
    }

    fn create_update(&self, atomic_propositions: &[AP], compositions: &[Self], block: &EquationalBlock) -> Self {
        let bdd = &self.ctx.bdd;
        let mut bdds = self.bdds.clone();

        for &var in &block.vars {
            bdds[var] = match &self.ctx.kinds[var] {
                NodeKind::True => bdd.one,
                NodeKind::False => bdd.zero,
                NodeKind::Atomic(p) => bdd.constant(atomic_propositions.contains(p)),
                NodeKind::Not(c) => bdd.apply_not(bdds[*c]),
                NodeKind::And(l, r) => bdd.apply_and(bdds[*l], bdds[*r]),
                NodeKind::Or(l, r) => bdd.apply_or(bdds[*l], bdds[*r]),
                NodeKind::Box { .. } => bdd.apply_and_many(compositions.iter().map(|c| c.get(var))),
                NodeKind::Diamond { .. } => bdd.apply_or_many(compositions.iter().map(|c| c.get(var))),
            };
        }

        self.with_bdds(bdds)
    }

    fn evaluate(&self, input: &[bool]) -> VarSet {
        let bdd = &self.ctx.bdd;
        let mut set = VarSet::with_capacity(self.bdds.len());
        set.extend((0..self.bdds.len()).filter(|&v| bdd.eval(self.bdds[v], input)));
        set
    }

    fn serialize(&self) -> Vec<String> {
        self.bdds.iter().map(|&r| self.ctx.bdd.serialize(r)).collect()
    }
}
