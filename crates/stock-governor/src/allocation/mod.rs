//! Fairness-optimising configuration search over a black-box allocator.

mod allocator;
mod autotune;
mod dataset;
pub mod fairness;
mod grid;
mod metrics;
mod review;
mod spread;
mod sweep;

#[cfg(test)]
mod tests;

pub use allocator::{
    AllocationConfig, AllocationError, AllocationLine, AllocationResult, Allocator, ProductTrace,
    TraceRow, WeightMethod,
};
pub use autotune::{AutoTuneEntry, AutoTuneReport, AutoTuner, HeuristicObjective};
pub use dataset::{Dataset, DatasetError, Product};
pub use fairness::{fairness_of_quantities, fairness_one_minus_gini};
pub use grid::{AxisValues, ConfigGrid, FixedKnobs, GridError};
pub use metrics::RunMetrics;
pub use review::{review_plan, PlanReview, TransferReview};
pub use spread::{
    BestSpreadReport, BestSpreadSelector, SpreadSummary, SpreadWeights, SpreadWeightsError,
    TOP_ALTERNATIVES,
};
pub use sweep::{
    FairnessMark, Objective, RunRecord, RunStatus, SweepEngine, SweepReport, SweepSummary,
};
