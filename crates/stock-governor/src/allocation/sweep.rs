use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::allocator::{AllocationConfig, AllocationResult, Allocator};
use super::dataset::Dataset;
use super::fairness::round6;
use super::grid::ConfigGrid;
use super::metrics::RunMetrics;

/// Scores the metrics of a single run. Higher is better.
pub trait Objective {
    fn score(&self, metrics: &RunMetrics) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&RunMetrics) -> f64,
{
    fn score(&self, metrics: &RunMetrics) -> f64 {
        self(metrics)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

/// Outcome of one grid point. Failed runs keep their canonical position,
/// carry the allocator error and zeroed metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub index: usize,
    pub params: AllocationConfig,
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metrics: RunMetrics,
    pub score: f64,
    pub duration_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocation: Option<AllocationResult>,
}

impl RunRecord {
    pub fn is_ok(&self) -> bool {
        self.status == RunStatus::Ok
    }

    /// Copy without the allocation payload, for listings.
    pub fn without_allocation(&self) -> Self {
        Self {
            allocation: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FairnessMark {
    pub index: usize,
    pub fairness_outlet: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSummary {
    pub runs: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub avg_fairness_outlet: f64,
    pub avg_fairness_product: f64,
    pub max_fairness: Option<FairnessMark>,
    pub min_fairness: Option<FairnessMark>,
}

impl SweepSummary {
    pub(crate) fn from_runs(runs: &[RunRecord]) -> Self {
        let completed: Vec<&RunRecord> = runs.iter().filter(|run| run.is_ok()).collect();
        let average = |pick: fn(&RunMetrics) -> f64| {
            if completed.is_empty() {
                0.0
            } else {
                round6(
                    completed.iter().map(|run| pick(&run.metrics)).sum::<f64>()
                        / completed.len() as f64,
                )
            }
        };

        let mut max_fairness: Option<FairnessMark> = None;
        let mut min_fairness: Option<FairnessMark> = None;
        for run in &completed {
            let mark = FairnessMark {
                index: run.index,
                fairness_outlet: run.metrics.fairness_outlet,
            };
            if max_fairness.map_or(true, |best| mark.fairness_outlet > best.fairness_outlet) {
                max_fairness = Some(mark);
            }
            if min_fairness.map_or(true, |worst| mark.fairness_outlet < worst.fairness_outlet) {
                min_fairness = Some(mark);
            }
        }

        Self {
            runs: runs.len(),
            completed_runs: completed.len(),
            failed_runs: runs.len() - completed.len(),
            avg_fairness_outlet: average(|metrics| metrics.fairness_outlet),
            avg_fairness_product: average(|metrics| metrics.fairness_product_avg),
            max_fairness,
            min_fairness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub runs: Vec<RunRecord>,
    pub summary: SweepSummary,
    pub generated_at: DateTime<Utc>,
}

/// Runs the allocator once per grid point, in canonical order, up to a cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepEngine {
    max_runs: usize,
}

impl SweepEngine {
    /// `max_runs == 0` evaluates the whole grid.
    pub fn new(max_runs: usize) -> Self {
        Self { max_runs }
    }

    pub fn max_runs(&self) -> usize {
        self.max_runs
    }

    pub fn planned_runs(&self, grid: &ConfigGrid) -> usize {
        if self.max_runs == 0 {
            grid.len()
        } else {
            grid.len().min(self.max_runs)
        }
    }

    pub fn sweep<A, O>(
        &self,
        dataset: &Dataset,
        grid: &ConfigGrid,
        objective: &O,
        allocator: &A,
    ) -> SweepReport
    where
        A: Allocator + ?Sized,
        O: Objective + ?Sized,
    {
        let planned = self.planned_runs(grid);
        let runs: Vec<RunRecord> = grid
            .iter()
            .take(planned)
            .enumerate()
            .map(|(index, params)| run_point(index, params, dataset, objective, allocator))
            .collect();

        let summary = SweepSummary::from_runs(&runs);
        info!(
            event = "allocation.sweep.summary",
            runs = summary.runs,
            failed_runs = summary.failed_runs,
            grid_points = grid.len(),
            avg_fairness_outlet = summary.avg_fairness_outlet,
            avg_fairness_product = summary.avg_fairness_product,
            "allocation sweep finished"
        );

        SweepReport {
            runs,
            summary,
            generated_at: Utc::now(),
        }
    }
}

fn run_point<A, O>(
    index: usize,
    params: AllocationConfig,
    dataset: &Dataset,
    objective: &O,
    allocator: &A,
) -> RunRecord
where
    A: Allocator + ?Sized,
    O: Objective + ?Sized,
{
    let started = Instant::now();
    let outcome = allocator.allocate(&params, dataset.products.clone());
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    match outcome {
        Ok(allocation) => {
            let metrics = RunMetrics::from_result(&allocation);
            let score = objective.score(&metrics);
            let score = if score.is_finite() { score } else { 0.0 };
            debug!(
                index,
                lines = metrics.lines,
                units = metrics.units,
                fairness_outlet = metrics.fairness_outlet,
                score,
                "sweep run completed"
            );
            RunRecord {
                index,
                params,
                status: RunStatus::Ok,
                error: None,
                metrics,
                score,
                duration_ms,
                allocation: Some(allocation),
            }
        }
        Err(err) => {
            warn!(
                event = "allocation.sweep.run_failed",
                index,
                error = %err,
                "allocator failed for grid point"
            );
            RunRecord {
                index,
                params,
                status: RunStatus::Failed,
                error: Some(err.to_string()),
                metrics: RunMetrics::default(),
                score: 0.0,
                duration_ms,
                allocation: None,
            }
        }
    }
}
