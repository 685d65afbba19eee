use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::allocation::{
    review_plan, AutoTuneReport, AutoTuner, Allocator, AxisValues, BestSpreadReport,
    BestSpreadSelector, ConfigGrid, Dataset, FixedKnobs, GridError, PlanReview, SpreadWeights,
    SpreadWeightsError, SweepEngine,
};
use crate::config::{GuardrailConfig, SweepSettings};
use crate::guardrails::{
    standard_chain, ChainError, ChainResult, DecisionContext, GuardrailChain, RailError,
};

/// Inputs shared by every sweep request. Missing axes and knobs fall back to
/// the service defaults. `max_runs` can only lower the configured cap; a
/// missing or zero value uses the cap itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SweepRequest {
    pub dataset: Dataset,
    #[serde(default)]
    pub axes: Option<AxisValues>,
    #[serde(default)]
    pub fixed: Option<FixedKnobs>,
    #[serde(default)]
    pub max_runs: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BestSpreadRequest {
    #[serde(flatten)]
    pub sweep: SweepRequest,
    #[serde(default)]
    pub weights: Option<SpreadWeights>,
    /// Run the recommended plan through the guardrail chain.
    #[serde(default)]
    pub review_plan: bool,
}

pub type AutoTuneRequest = SweepRequest;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSpreadResponse {
    #[serde(flatten)]
    pub report: BestSpreadReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<PlanReview>,
}

/// Service composing the guardrail chain, sweep defaults and the allocator.
pub struct GovernanceService<A: ?Sized> {
    chain: GuardrailChain,
    sweep: SweepSettings,
    allocator: Arc<A>,
}

impl<A> GovernanceService<A>
where
    A: Allocator + ?Sized + 'static,
{
    pub fn new(
        allocator: Arc<A>,
        guardrails: &GuardrailConfig,
        sweep: SweepSettings,
    ) -> Result<Self, ServiceError> {
        let chain = standard_chain(guardrails)?;
        Ok(Self::with_chain(chain, allocator, sweep))
    }

    /// Service around a caller-assembled chain.
    pub fn with_chain(chain: GuardrailChain, allocator: Arc<A>, sweep: SweepSettings) -> Self {
        Self {
            chain,
            sweep,
            allocator,
        }
    }

    pub fn chain(&self) -> &GuardrailChain {
        &self.chain
    }

    pub fn sweep_settings(&self) -> &SweepSettings {
        &self.sweep
    }

    pub fn evaluate_guardrails(
        &self,
        context: &DecisionContext,
    ) -> Result<ChainResult, ServiceError> {
        Ok(self.chain.evaluate(context)?)
    }

    /// Sweeps the grid, recommends the best-spread configuration and
    /// optionally reviews the recommended plan.
    pub fn best_spread(
        &self,
        request: BestSpreadRequest,
    ) -> Result<BestSpreadResponse, ServiceError> {
        let weights = request.weights.unwrap_or(self.sweep.weights);
        let (grid, engine) = self.prepare(&request.sweep)?;
        let selector = BestSpreadSelector::new(engine, weights)?;
        let report = selector.select(&request.sweep.dataset, &grid, self.allocator.as_ref());

        let review = match (&report.best, request.review_plan) {
            (Some(best), true) => best
                .allocation
                .as_ref()
                .map(|allocation| review_plan(&request.sweep.dataset, allocation, &self.chain))
                .transpose()?,
            _ => None,
        };

        Ok(BestSpreadResponse { report, review })
    }

    pub fn autotune(&self, request: AutoTuneRequest) -> Result<AutoTuneReport, ServiceError> {
        let (grid, engine) = self.prepare(&request)?;
        Ok(AutoTuner::new(engine).tune(&request.dataset, &grid, self.allocator.as_ref()))
    }

    fn prepare(&self, request: &SweepRequest) -> Result<(ConfigGrid, SweepEngine), ServiceError> {
        let grid = ConfigGrid::new(
            request.axes.clone().unwrap_or_default(),
            request.fixed.clone().unwrap_or_default(),
        )?;
        Ok((grid, SweepEngine::new(self.run_cap(request.max_runs))))
    }

    /// Requests only narrow the configured cap. A configured zero is unbounded.
    fn run_cap(&self, requested: Option<usize>) -> usize {
        let ceiling = self.sweep.max_runs;
        match requested {
            Some(runs) if runs > 0 && ceiling == 0 => runs,
            Some(runs) if runs > 0 => runs.min(ceiling),
            _ => ceiling,
        }
    }
}

/// Error raised by the governance service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Weights(#[from] SpreadWeightsError),
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl ServiceError {
    /// True when the request itself was at fault rather than the service.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServiceError::Grid(_) | ServiceError::Weights(_) => true,
            ServiceError::Chain(ChainError::Rail {
                source: RailError::InvalidSignal { .. },
                ..
            }) => true,
            ServiceError::Chain(_) => false,
        }
    }
}
