use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("no hook produces required facet kind `{0}`")]
    MissingDependency(String),

    #[error("cyclic dependency among facet kinds: {}", .0.join(", "))]
    CyclicDependency(Vec<String>),

    #[error("facet `{0}` violates contract `{1}`: {2}")]
    ContractViolation(String, String, String),

    #[error("hook for facet `{0}` failed: {1}")]
    HookFailure(String, String),
}
