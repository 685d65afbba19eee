//! Guardrail evaluation chain gating every autonomous transfer or price change.

mod chain;
mod context;
pub mod rails;
mod result;
mod rule;
mod severity;

#[cfg(test)]
mod tests;

pub use chain::{ChainError, ChainResult, GuardrailChain};
pub use context::DecisionContext;
pub use rails::standard_chain;
pub use result::{RailOutcome, RailResult, RailResultError};
pub use rule::{FnRail, Guardrail, RailError};
pub use severity::{RailStatus, Severity};
