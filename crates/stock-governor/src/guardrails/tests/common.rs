use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::GuardrailConfig;
use crate::guardrails::{
    DecisionContext, Guardrail, GuardrailChain, RailError, RailOutcome, RailStatus,
};

/// Rail returning a canned status and counting how often it ran.
pub(super) struct FixedRail {
    code: String,
    status: RailStatus,
    calls: Arc<AtomicUsize>,
}

impl FixedRail {
    pub(super) fn new(code: &str, status: RailStatus) -> Self {
        Self {
            code: code.to_string(),
            status,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(super) fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Guardrail for FixedRail {
    fn code(&self) -> &str {
        &self.code
    }

    fn evaluate(&self, _context: &DecisionContext) -> Result<RailOutcome, RailError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RailOutcome::new(
            self.status,
            format!("{} returned {}", self.code, self.status),
        ))
    }
}

pub(super) struct BrokenRail(pub(super) &'static str);

impl Guardrail for BrokenRail {
    fn code(&self) -> &str {
        self.0
    }

    fn evaluate(&self, _context: &DecisionContext) -> Result<RailOutcome, RailError> {
        Err(RailError::Failed("upstream signal store unavailable".to_string()))
    }
}

pub(super) fn chain_of(rails: Vec<FixedRail>) -> GuardrailChain {
    let mut chain = GuardrailChain::new();
    for rail in rails {
        chain.register(rail).expect("unique codes");
    }
    chain
}

pub(super) fn statuses(count: usize, status: RailStatus, prefix: &str) -> Vec<FixedRail> {
    (0..count)
        .map(|index| FixedRail::new(&format!("{prefix}_{index:02}"), status))
        .collect()
}

pub(super) fn guardrail_config() -> GuardrailConfig {
    GuardrailConfig::default()
}

pub(super) fn price_context(cost: f64, current: f64, candidate: f64) -> DecisionContext {
    DecisionContext::new()
        .with("cost", cost)
        .with("current_price", current)
        .with("candidate_price", candidate)
}
