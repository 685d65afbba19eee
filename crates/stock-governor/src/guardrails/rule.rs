use super::context::DecisionContext;
use super::result::{RailOutcome, RailResultError};

/// Failure raised by a rail while evaluating. The chain treats any of these
/// as fatal for the evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RailError {
    #[error("signal '{key}' is not a {expected}")]
    InvalidSignal { key: String, expected: &'static str },
    #[error(transparent)]
    Outcome(#[from] RailResultError),
    #[error("{0}")]
    Failed(String),
}

/// One independent safety check on a proposed action.
pub trait Guardrail: Send + Sync {
    /// Stable identifier; also the execution order key within a chain.
    fn code(&self) -> &str;

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError>;
}

/// Adapter turning a closure into a rail, mostly for callers composing ad-hoc
/// checks next to the built-in ones.
pub struct FnRail<F> {
    code: String,
    check: F,
}

impl<F> FnRail<F>
where
    F: Fn(&DecisionContext) -> Result<RailOutcome, RailError> + Send + Sync,
{
    pub fn new(code: impl Into<String>, check: F) -> Self {
        Self {
            code: code.into(),
            check,
        }
    }
}

impl<F> Guardrail for FnRail<F>
where
    F: Fn(&DecisionContext) -> Result<RailOutcome, RailError> + Send + Sync,
{
    fn code(&self) -> &str {
        &self.code
    }

    fn evaluate(&self, context: &DecisionContext) -> Result<RailOutcome, RailError> {
        (self.check)(context)
    }
}
