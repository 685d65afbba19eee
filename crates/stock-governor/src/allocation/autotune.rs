use chrono::{DateTime, Utc};
use serde::Serialize;

use super::allocator::{AllocationConfig, Allocator};
use super::dataset::Dataset;
use super::fairness::round6;
use super::grid::ConfigGrid;
use super::metrics::RunMetrics;
use super::sweep::{Objective, SweepEngine};

const OUTLET_SHARE: f64 = 0.5;
const PRODUCT_SHARE: f64 = 0.3;
const COVERAGE_SHARE: f64 = 0.2;

/// Single-objective heuristic: mostly evenness, with a nudge towards plans
/// that reach more of the outlet network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicObjective {
    outlets_in_dataset: usize,
}

impl HeuristicObjective {
    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self {
            outlets_in_dataset: dataset.outlets().len(),
        }
    }

    fn coverage(&self, metrics: &RunMetrics) -> f64 {
        if self.outlets_in_dataset == 0 {
            0.0
        } else {
            (metrics.outlets_affected as f64 / self.outlets_in_dataset as f64).min(1.0)
        }
    }
}

impl Objective for HeuristicObjective {
    fn score(&self, metrics: &RunMetrics) -> f64 {
        round6(
            OUTLET_SHARE * metrics.fairness_outlet
                + PRODUCT_SHARE * metrics.fairness_product_avg
                + COVERAGE_SHARE * self.coverage(metrics),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoTuneEntry {
    pub config: AllocationConfig,
    pub metrics: RunMetrics,
    pub score: f64,
    pub fairness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoTuneReport {
    pub best: Option<AutoTuneEntry>,
    pub results: Vec<AutoTuneEntry>,
    pub failed_runs: usize,
    pub generated_at: DateTime<Utc>,
}

/// Simpler tuning variant ranking grid points by [`HeuristicObjective`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoTuner {
    engine: SweepEngine,
}

impl AutoTuner {
    pub fn new(engine: SweepEngine) -> Self {
        Self { engine }
    }

    pub fn tune<A>(&self, dataset: &Dataset, grid: &ConfigGrid, allocator: &A) -> AutoTuneReport
    where
        A: Allocator + ?Sized,
    {
        let objective = HeuristicObjective::for_dataset(dataset);
        let report = self.engine.sweep(dataset, grid, &objective, allocator);

        let mut results: Vec<AutoTuneEntry> = report
            .runs
            .into_iter()
            .filter(|run| run.is_ok())
            .map(|run| AutoTuneEntry {
                fairness: run.metrics.fairness_outlet,
                config: run.params,
                metrics: run.metrics,
                score: run.score,
            })
            .collect();
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        AutoTuneReport {
            best: results.first().cloned(),
            results,
            failed_runs: report.summary.failed_runs,
            generated_at: report.generated_at,
        }
    }
}
