//! Property transformers: the solver's view of a decision-diagram backend.
//!
//! A property transformer over `n` formula variables is a monotone function
//! `2^{0..n} -> 2^{0..n}`: given the set of subformulas that hold *after* some path,
//! it yields the set of subformulas that hold *before* it. The solver keeps one
//! transformer per process-graph node and refines them until nothing changes.
//!
//! The solver is generic over this interface and never looks inside a transformer.
//! [`bdd_transformer`][crate::bdd_transformer] provides the BDD-backed implementation.

use std::fmt::Debug;

use crate::dependency::{DependencyGraph, EquationalBlock};
use crate::error::{BackendError, DeserializeError};
use crate::graph::EdgeProperty;
use crate::varset::VarSet;

/// A monotone function over sets of formula variables.
///
/// # Contract
///
/// - Equality is extensional equality of the represented functions; the solver uses it
///   to detect that a node has stabilised.
/// - For a fixed block, [`create_update`][Self::create_update] is monotone in the
///   compositions. Together with finiteness of the lattice this bounds the number of
///   distinct values a node can take, and so the number of solver iterations.
/// - Transformers from different managers must not be mixed.
pub trait PropertyTransformer<AP>: Clone + PartialEq + Debug {
    /// Sequential composition: first take the step described by `self`, then continue
    /// with `other`. Evaluating the result on `v` equals `self.evaluate(other.evaluate(v))`.
    fn compose(&self, other: &Self) -> Self;

    /// Next approximation of a node's transformer.
    ///
    /// `atomic_propositions` hold at the node and `compositions` has one entry per outgoing
    /// edge (edge transformer composed with the target's transformer). Only the variables
    /// of `block` are recomputed; every other variable keeps its value from `self`.
    fn create_update(&self, atomic_propositions: &[AP], compositions: &[Self], block: &EquationalBlock) -> Self;

    /// Apply the transformer to a concrete truth vector.
    fn evaluate(&self, input: &[bool]) -> VarSet;

    /// Manager-independent text form, one string per variable.
    fn serialize(&self) -> Vec<String>;
}

/// Per-solve context that creates transformers; dropping it releases the backend.
pub trait TransformerManager<L, AP> {
    type Transformer: PropertyTransformer<AP>;

    /// Initial approximation for a non-final node: `true` for variables of greatest
    /// blocks, `false` for least ones.
    fn node_transformer(&self) -> Self::Transformer;

    /// Transformer of a final node: the identity.
    fn end_transformer(&self) -> Self::Transformer;

    /// Effect of taking one internal edge labelled `label`.
    fn edge_transformer(&self, label: &L, property: EdgeProperty) -> Self::Transformer;

    fn deserialize(&self, data: &[String]) -> Result<Self::Transformer, DeserializeError>;

    /// Fails once the backend has run out of resources. Transformers created after that
    /// point are meaningless.
    fn check(&self) -> Result<(), BackendError>;
}

/// Factory for transformer managers.
pub trait TransformerBackend<L, AP> {
    type Manager: TransformerManager<L, AP>;

    fn create_manager(&self, graph: &DependencyGraph<L, AP>) -> Self::Manager;
}

/// Transformer type produced by a backend.
pub type TransformerOf<B, L, AP> = <<B as TransformerBackend<L, AP>>::Manager as TransformerManager<L, AP>>::Transformer;
