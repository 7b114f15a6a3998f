//! Recorded solver runs.
//!
//! [`Solver::solve_and_record_history`][crate::solver::Solver::solve_and_record_history] keeps
//! one [`SolverState`] per node update. Transformers are stored in their serialized,
//! manager-independent form, so a history outlives the session that produced it and can be
//! replayed through any session solving the same formula (see
//! [`Session::deserialize`][crate::solver::Session::deserialize]).

use std::collections::HashMap;
use std::hash::Hash;

use indexmap::IndexMap;

/// Snapshot of one procedure taken before the first update.
#[derive(Debug, Clone)]
pub struct ProcedureData<N> {
    /// Nodes of the procedure, in graph order.
    pub nodes: Vec<N>,
    /// Serialized transformer of each node: the fresh or end transformer.
    pub initial_transformers: HashMap<N, Vec<String>>,
    /// Subformulas satisfied at each node under the initial transformers.
    pub initial_satisfied: HashMap<N, Vec<String>>,
}

/// One node update of the work-set loop.
#[derive(Debug, Clone)]
pub struct SolverState<L, N> {
    /// Transformer of the node before the update.
    pub transformer: Vec<String>,
    /// Transformer of the node after the update (equal to `transformer` if nothing changed).
    pub updated_transformer: Vec<String>,
    /// One composition per outgoing edge, in edge order.
    pub compositions: Vec<Vec<String>>,
    pub node: N,
    pub procedure: L,
    /// Dirty nodes of every procedure once the update (and any block switch) is done.
    pub work_sets: IndexMap<L, Vec<N>>,
    /// Subformulas satisfied at the node after the update.
    pub satisfied: Vec<String>,
    /// Block the update was computed for.
    pub block_index: usize,
}

impl<L, N> SolverState<L, N> {
    pub fn changed(&self) -> bool {
        self.transformer != self.updated_transformer
    }

    pub fn work_sets_empty(&self) -> bool {
        self.work_sets.values().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone)]
pub struct SolverHistory<L, N> {
    procedures: IndexMap<L, ProcedureData<N>>,
    must_transformers: IndexMap<L, Vec<String>>,
    may_transformers: IndexMap<L, Vec<String>>,
    states: Vec<SolverState<L, N>>,
    is_sat: bool,
}

impl<L, N> SolverHistory<L, N>
where
    L: Eq + Hash,
{
    pub(crate) fn new(
        procedures: IndexMap<L, ProcedureData<N>>,
        must_transformers: IndexMap<L, Vec<String>>,
        may_transformers: IndexMap<L, Vec<String>>,
        states: Vec<SolverState<L, N>>,
        is_sat: bool,
    ) -> Self {
        Self {
            procedures,
            must_transformers,
            may_transformers,
            states,
            is_sat,
        }
    }

    pub fn is_sat(&self) -> bool {
        self.is_sat
    }

    pub fn procedures(&self) -> &IndexMap<L, ProcedureData<N>> {
        &self.procedures
    }

    pub fn procedure(&self, label: &L) -> Option<&ProcedureData<N>> {
        self.procedures.get(label)
    }

    /// Serialized must-edge transformers, keyed by action, in creation order.
    pub fn must_transformers(&self) -> &IndexMap<L, Vec<String>> {
        &self.must_transformers
    }

    pub fn may_transformers(&self) -> &IndexMap<L, Vec<String>> {
        &self.may_transformers
    }

    pub fn states(&self) -> &[SolverState<L, N>] {
        &self.states
    }

    pub fn last_state(&self) -> Option<&SolverState<L, N>> {
        self.states.last()
    }

    /// Number of updates that actually changed a transformer.
    pub fn num_changes(&self) -> usize {
        self.states.iter().filter(|s| s.changed()).count()
    }
}

/// Accumulates a history while a session runs.
#[derive(Debug)]
pub(crate) struct HistoryRecorder<L, N> {
    pub procedures: IndexMap<L, ProcedureData<N>>,
    pub states: Vec<SolverState<L, N>>,
}

impl<L, N> Default for HistoryRecorder<L, N> {
    fn default() -> Self {
        Self {
            procedures: IndexMap::new(),
            states: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn state(before: &str, after: &str, dirty: &[usize]) -> SolverState<&'static str, usize> {
        SolverState {
            transformer: vec![before.to_string()],
            updated_transformer: vec![after.to_string()],
            compositions: Vec::new(),
            node: 0,
            procedure: "main",
            work_sets: IndexMap::from([("main", dirty.to_vec())]),
            satisfied: Vec::new(),
            block_index: 0,
        }
    }

    #[test]
    fn test_state_flags() {
        let s = state("|-1", "|1", &[]);
        assert!(s.changed());
        assert!(s.work_sets_empty());

        let s = state("|1", "|1", &[2]);
        assert!(!s.changed());
        assert!(!s.work_sets_empty());
    }

    #[test]
    fn test_history_accessors() {
        let history = SolverHistory::new(
            IndexMap::new(),
            IndexMap::from([("a", vec!["|1".to_string()])]),
            IndexMap::new(),
            vec![state("|-1", "|1", &[1]), state("|1", "|1", &[])],
            true,
        );
        assert!(history.is_sat());
        assert_eq!(history.states().len(), 2);
        assert_eq!(history.num_changes(), 1);
        assert!(history.last_state().unwrap().work_sets_empty());
        assert_eq!(history.must_transformers()[&"a"], vec!["|1".to_string()]);
        assert!(history.may_transformers().is_empty());
        assert!(history.procedure(&"main").is_none());
    }
}
