use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::allocator::Allocator;
use super::dataset::Dataset;
use super::grid::ConfigGrid;
use super::metrics::RunMetrics;
use super::sweep::{RunRecord, SweepEngine};

pub const TOP_ALTERNATIVES: usize = 5;

/// Raw objective weights for the best-spread search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpreadWeights {
    pub outlet: f64,
    pub product: f64,
    pub units: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpreadWeightsError {
    #[error("{weight} weight must be a finite, non-negative number (got {value})")]
    Invalid { weight: &'static str, value: f64 },
}

impl SpreadWeights {
    /// Divides by `max(1, sum)`: weights summing above one are scaled down to
    /// one, weights summing below one are left damped.
    pub fn normalized(&self) -> Result<Self, SpreadWeightsError> {
        for (weight, value) in [
            ("outlet", self.outlet),
            ("product", self.product),
            ("units", self.units),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SpreadWeightsError::Invalid { weight, value });
            }
        }

        let divisor = (self.outlet + self.product + self.units).max(1.0);
        Ok(Self {
            outlet: self.outlet / divisor,
            product: self.product / divisor,
            units: self.units / divisor,
        })
    }

    fn combined_fairness(&self, metrics: &RunMetrics) -> f64 {
        self.outlet * metrics.fairness_outlet + self.product * metrics.fairness_product_avg
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpreadSummary {
    pub runs: usize,
    pub failed_runs: usize,
    pub avg_fairness_outlet: f64,
    pub avg_fairness_product: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BestSpreadReport {
    /// Recommended run, allocation payload included.
    pub best: Option<RunRecord>,
    /// Up to five leading runs with the allocation stripped.
    pub top: Vec<RunRecord>,
    pub summary: SpreadSummary,
    pub weights: SpreadWeights,
    pub generated_at: DateTime<Utc>,
}

/// Sweep specialisation balancing per-outlet fairness, per-product fairness
/// and the volume moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BestSpreadSelector {
    engine: SweepEngine,
    weights: SpreadWeights,
}

impl BestSpreadSelector {
    pub fn new(engine: SweepEngine, weights: SpreadWeights) -> Result<Self, SpreadWeightsError> {
        Ok(Self {
            engine,
            weights: weights.normalized()?,
        })
    }

    pub fn weights(&self) -> SpreadWeights {
        self.weights
    }

    pub fn select<A>(&self, dataset: &Dataset, grid: &ConfigGrid, allocator: &A) -> BestSpreadReport
    where
        A: Allocator + ?Sized,
    {
        let weights = self.weights;
        let objective = move |metrics: &RunMetrics| weights.combined_fairness(metrics);
        let report = self.engine.sweep(dataset, grid, &objective, allocator);

        let max_units = report
            .runs
            .iter()
            .filter(|run| run.is_ok())
            .map(|run| run.metrics.units)
            .max()
            .unwrap_or(0);

        let mut ranked: Vec<RunRecord> = report
            .runs
            .iter()
            .filter(|run| run.is_ok())
            .map(|run| {
                let normalized_units = if max_units == 0 {
                    0.0
                } else {
                    run.metrics.units as f64 / max_units as f64
                };
                RunRecord {
                    score: weights.combined_fairness(&run.metrics)
                        + weights.units * normalized_units,
                    ..run.clone()
                }
            })
            .collect();
        ranked.sort_by(compare_runs);

        let top = ranked
            .iter()
            .take(TOP_ALTERNATIVES)
            .map(RunRecord::without_allocation)
            .collect();

        BestSpreadReport {
            best: ranked.into_iter().next(),
            top,
            summary: SpreadSummary {
                runs: report.summary.runs,
                failed_runs: report.summary.failed_runs,
                avg_fairness_outlet: report.summary.avg_fairness_outlet,
                avg_fairness_product: report.summary.avg_fairness_product,
            },
            weights,
            generated_at: report.generated_at,
        }
    }
}

/// Descending by score, then outlet fairness, units and units per line.
/// Equal runs keep canonical order since the sort is stable.
fn compare_runs(a: &RunRecord, b: &RunRecord) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| {
            b.metrics
                .fairness_outlet
                .total_cmp(&a.metrics.fairness_outlet)
        })
        .then_with(|| b.metrics.units.cmp(&a.metrics.units))
        .then_with(|| {
            b.metrics
                .units_per_line
                .total_cmp(&a.metrics.units_per_line)
        })
}
