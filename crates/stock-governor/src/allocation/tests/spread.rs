use super::common::{failing_at, grid, network, split_allocator};
use crate::allocation::{
    AxisValues, BestSpreadSelector, ConfigGrid, FixedKnobs, SpreadWeights, SweepEngine,
    TOP_ALTERNATIVES,
};

fn default_weights() -> SpreadWeights {
    SpreadWeights {
        outlet: 0.5,
        product: 0.3,
        units: 0.2,
    }
}

fn selector(weights: SpreadWeights) -> BestSpreadSelector {
    BestSpreadSelector::new(SweepEngine::new(0), weights).expect("weights are valid")
}

#[test]
fn even_spread_beats_concentrated_plan() {
    let report = selector(default_weights()).select(
        &network(),
        &grid(&[0.0], &[1, 0]),
        &split_allocator,
    );

    let best = report.best.expect("a run completed");
    assert_eq!(best.index, 1);
    assert_eq!(best.params.dynamic_top_k, 0);
    assert_eq!(best.metrics.fairness_outlet, 1.0);
    assert!((best.score - 1.0).abs() < 1e-9);
    assert!(report.top[1].score < best.score);
}

#[test]
fn equal_scores_prefer_more_units() {
    let weights = SpreadWeights {
        outlet: 0.5,
        product: 0.5,
        units: 0.0,
    };
    let report = selector(weights).select(&network(), &grid(&[0.5, 0.0], &[0]), &split_allocator);

    let best = report.best.expect("a run completed");
    assert_eq!(best.index, 1);
    assert_eq!(best.metrics.units, 150);
    assert_eq!(report.top[1].metrics.units, 75);
    assert_eq!(report.top[0].score, report.top[1].score);
}

#[test]
fn top_alternatives_drop_the_allocation_payload() {
    let grid = ConfigGrid::new(AxisValues::default(), FixedKnobs::default()).expect("valid");
    let report = selector(default_weights()).select(&network(), &grid, &split_allocator);

    assert_eq!(report.summary.runs, 72);
    assert_eq!(report.top.len(), TOP_ALTERNATIVES);
    assert!(report.top.iter().all(|run| run.allocation.is_none()));

    let best = report.best.expect("a run completed");
    assert!(best.allocation.is_some());
    assert_eq!(report.top[0].index, best.index);
    assert!(report
        .top
        .windows(2)
        .all(|pair| pair[0].score >= pair[1].score));
}

#[test]
fn scaling_weights_does_not_change_the_ranking() {
    let grid = ConfigGrid::new(AxisValues::default(), FixedKnobs::default()).expect("valid");
    let indices = |report: &crate::allocation::BestSpreadReport| {
        report.top.iter().map(|run| run.index).collect::<Vec<_>>()
    };
    let base = default_weights();
    let expected = indices(&selector(base).select(&network(), &grid, &split_allocator));

    for factor in [2.0, 3.0, 7.0, 1.3] {
        let scaled = selector(SpreadWeights {
            outlet: base.outlet * factor,
            product: base.product * factor,
            units: base.units * factor,
        })
        .select(&network(), &grid, &split_allocator);

        assert!((scaled.weights.outlet - base.outlet).abs() < 1e-12);
        assert!((scaled.weights.product - base.product).abs() < 1e-12);
        assert!((scaled.weights.units - base.units).abs() < 1e-12);
        assert_eq!(indices(&scaled), expected, "factor {factor}");
    }
}

#[test]
fn failed_runs_are_never_recommended() {
    let allocator = failing_at(0.0);
    let report = selector(default_weights()).select(
        &network(),
        &grid(&[0.0, 0.5], &[0]),
        &allocator,
    );

    assert_eq!(report.summary.runs, 2);
    assert_eq!(report.summary.failed_runs, 1);
    assert_eq!(report.top.len(), 1);
    assert_eq!(report.best.map(|run| run.index), Some(1));
}

#[test]
fn no_recommendation_when_every_run_fails() {
    let allocator = failing_at(0.0);
    let report = selector(default_weights()).select(&network(), &grid(&[0.0], &[0]), &allocator);

    assert!(report.best.is_none());
    assert!(report.top.is_empty());
    assert_eq!(report.summary.avg_fairness_outlet, 0.0);
}
