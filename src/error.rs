use thiserror::Error;

/// Rejection of a modal process system, raised by [`Solver::new`][crate::solver::Solver::new]
/// before any fixpoint iteration begins.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("main process '{0}' is not defined")]
    UndefinedMainProcess(String),

    #[error("procedure '{0}' has no initial node")]
    MissingInitialNode(String),

    #[error("procedure '{0}' has no final node")]
    MissingFinalNode(String),

    #[error("final node of procedure '{0}' has outgoing edges")]
    FinalNodeHasSuccessors(String),

    #[error("initial node of procedure '{0}' is not guarded: it has an outgoing call edge")]
    UnguardedProcess(String),

    #[error("procedure '{caller}' calls undefined procedure '{callee}'")]
    UndefinedCallee { caller: String, callee: String },
}

/// Malformed formula, detected while flattening it into a dependency graph.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum FormulaError {
    #[error("variable '{0}' is not bound by any enclosing fixpoint")]
    UnboundVariable(String),

    #[error("fixpoint '{0}' has a bare variable as its body")]
    BareFixpointVariable(String),

    #[error("variable '{0}' occurs under a negation, so its fixpoint is not monotone")]
    NegativeFixpointVariable(String),
}

/// Failure of a transformer backend.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum BackendError {
    #[error("storage bits should be in the range 1..=31, got {0}")]
    InvalidStorageBits(usize),

    #[error("unique table is full ({capacity} nodes)")]
    StorageFull { capacity: usize },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum DeserializeError {
    #[error("malformed serialized diagram '{input}': {reason}")]
    Malformed { input: String, reason: String },

    #[error("expected {expected} serialized diagrams, found {found}")]
    WrongArity { expected: usize, found: usize },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum SolveError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("update budget exhausted after {updates} node updates")]
    UpdateBudgetExhausted { updates: usize },
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum WitnessError {
    #[error(transparent)]
    Solve(#[from] SolveError),

    #[error("witness extraction does not support '{0}'")]
    UnsupportedFormula(String),

    #[error("no witness found within {states} search states")]
    SearchExhausted { states: usize },
}
