use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, warn};

use super::context::DecisionContext;
use super::result::{RailResult, RailResultError};
use super::rule::{Guardrail, RailError};
use super::severity::RailStatus;

const WARN_PENALTY: f64 = 0.3;

/// Errors surfaced by chain registration and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rail code must not be empty")]
    EmptyCode,
    #[error("rail '{0}' is already registered")]
    DuplicateCode(String),
    #[error("rail '{code}' failed: {source}")]
    Rail {
        code: String,
        #[source]
        source: RailError,
    },
    #[error("rail '{code}' produced an invalid result: {source}")]
    InvalidResult {
        code: String,
        #[source]
        source: RailResultError,
    },
}

/// Ordered set of rails owned by one decision context. Rails always run in
/// ascending code order, whatever order they were registered in.
#[derive(Default)]
pub struct GuardrailChain {
    rails: Vec<Box<dyn Guardrail>>,
}

impl GuardrailChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<G>(&mut self, rail: G) -> Result<(), ChainError>
    where
        G: Guardrail + 'static,
    {
        let code = rail.code().to_string();
        if code.trim().is_empty() {
            return Err(ChainError::EmptyCode);
        }

        match self
            .rails
            .binary_search_by(|existing| existing.code().cmp(code.as_str()))
        {
            Ok(_) => Err(ChainError::DuplicateCode(code)),
            Err(position) => {
                self.rails.insert(position, Box::new(rail));
                Ok(())
            }
        }
    }

    pub fn with<G>(mut self, rail: G) -> Result<Self, ChainError>
    where
        G: Guardrail + 'static,
    {
        self.register(rail)?;
        Ok(self)
    }

    /// Codes in execution order.
    pub fn codes(&self) -> Vec<&str> {
        self.rails.iter().map(|rail| rail.code()).collect()
    }

    pub fn len(&self) -> usize {
        self.rails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rails.is_empty()
    }

    /// Runs every rail in order, stopping at the first `BLOCK`. A rail that
    /// errors aborts the evaluation; nothing is treated as an implicit pass.
    pub fn evaluate(&self, context: &DecisionContext) -> Result<ChainResult, ChainError> {
        let mut results = Vec::with_capacity(self.rails.len());
        let mut blocked_by = None;

        for rail in &self.rails {
            let code = rail.code();
            let started = Instant::now();
            let outcome = rail.evaluate(context).map_err(|source| {
                error!(
                    event = "guardrail.chain.rail_failed",
                    code,
                    error = %source,
                    "guardrail evaluation aborted"
                );
                ChainError::Rail {
                    code: code.to_string(),
                    source,
                }
            })?;
            let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

            let result = RailResult::new(code, outcome, duration_ms).map_err(|source| {
                ChainError::InvalidResult {
                    code: code.to_string(),
                    source,
                }
            })?;

            let blocking = result.is_blocking();
            if blocking {
                warn!(
                    event = "guardrail.chain.blocked",
                    code = result.code(),
                    reason = result.reason(),
                    message = result.message(),
                    "guardrail blocked candidate action"
                );
                blocked_by = Some(result.code().to_string());
            }
            results.push(result);

            if blocking {
                break;
            }
        }

        let verdict = ChainResult::from_results(results, blocked_by);

        info!(
            event = "guardrail.chain.result",
            final_status = %verdict.final_status,
            blocked_by = verdict.blocked_by.as_deref().unwrap_or("none"),
            total_rails = self.rails.len(),
            executed_rails = verdict.results.len(),
            score_hint = verdict.score_hint,
            "guardrail chain evaluated"
        );

        Ok(verdict)
    }
}

/// Aggregate verdict for one chain evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChainResult {
    results: Vec<RailResult>,
    final_status: RailStatus,
    blocked_by: Option<String>,
    #[serde(rename = "total_duration")]
    total_duration_ms: f64,
    score_hint: f64,
}

impl ChainResult {
    pub(crate) fn from_results(results: Vec<RailResult>, blocked_by: Option<String>) -> Self {
        let final_status = results
            .iter()
            .map(RailResult::status)
            .fold(RailStatus::Pass, RailStatus::worst);
        let total_duration_ms = results.iter().map(RailResult::duration_ms).sum();
        let warn_count = results
            .iter()
            .filter(|result| result.status() == RailStatus::Warn)
            .count();

        Self {
            score_hint: score_hint(final_status, warn_count),
            results,
            final_status,
            blocked_by,
            total_duration_ms,
        }
    }

    pub fn results(&self) -> &[RailResult] {
        &self.results
    }

    pub fn final_status(&self) -> RailStatus {
        self.final_status
    }

    pub fn blocked_by(&self) -> Option<&str> {
        self.blocked_by.as_deref()
    }

    pub fn total_duration_ms(&self) -> f64 {
        self.total_duration_ms
    }

    pub fn score_hint(&self) -> f64 {
        self.score_hint
    }

    pub fn is_blocked(&self) -> bool {
        self.final_status == RailStatus::Block
    }

    pub fn executed_codes(&self) -> Vec<&str> {
        self.results.iter().map(RailResult::code).collect()
    }
}

/// Continuous confidence: zero on any block, otherwise each warning costs a
/// fixed step down from 1.0.
pub(crate) fn score_hint(final_status: RailStatus, warn_count: usize) -> f64 {
    if final_status == RailStatus::Block {
        return 0.0;
    }
    (1.0 - WARN_PENALTY * warn_count as f64).max(0.0)
}
