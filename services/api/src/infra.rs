use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use stock_governor::allocation::{
    AllocationConfig, AllocationError, AllocationLine, AllocationResult, Allocator, Product,
    WeightMethod,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reference allocator shipped with the binary. Releases warehouse stock
/// above the reserve and splits it across outlets by sales velocity. Every
/// outlet with demand gets a line, zero when it was left out.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct VelocityWeightedAllocator;

impl Allocator for VelocityWeightedAllocator {
    fn allocate(
        &self,
        config: &AllocationConfig,
        products: Vec<Product>,
    ) -> Result<AllocationResult, AllocationError> {
        if !config.reserve_percent.is_finite() || !(0.0..1.0).contains(&config.reserve_percent) {
            return Err(AllocationError::Failed(format!(
                "reserve_percent {} outside [0, 1)",
                config.reserve_percent
            )));
        }

        let mut allocations = BTreeMap::new();
        for product in &products {
            let lines = allocate_product(config, product);
            if !lines.is_empty() {
                allocations.insert(product.product_id.clone(), lines);
            }
        }
        Ok(AllocationResult::from_allocations(allocations))
    }
}

fn releasable_units(config: &AllocationConfig, product: &Product) -> u64 {
    let stock = u64::from(product.warehouse_stock);
    let reserve = ((stock as f64) * config.reserve_percent).ceil() as u64;
    let reserve = reserve.max(u64::from(config.reserve_min_units)).min(stock);
    let release = stock - reserve;
    if config.max_per_product == 0 {
        release
    } else {
        release.min(u64::from(config.max_per_product))
    }
}

fn outlet_weights(config: &AllocationConfig, product: &Product) -> Vec<(String, f64)> {
    let demand: Vec<(&String, f64)> = product
        .sales_velocity
        .iter()
        .filter(|(_, velocity)| velocity.is_finite() && **velocity > 0.0)
        .map(|(outlet, velocity)| (outlet, *velocity))
        .collect();
    let peak = demand.iter().map(|(_, v)| *v).fold(0.0_f64, f64::max);
    if peak <= 0.0 {
        return Vec::new();
    }

    let raw: Vec<(String, f64)> = demand
        .into_iter()
        .map(|(outlet, velocity)| {
            let weight = match config.weight_method {
                WeightMethod::Power => velocity.powf(config.weight_gamma),
                WeightMethod::Softmax => {
                    (config.weight_gamma * (velocity / peak - 1.0) / config.softmax_tau).exp()
                }
            };
            (outlet.clone(), weight)
        })
        .filter(|(_, weight)| weight.is_finite() && *weight > 0.0)
        .collect();

    let total: f64 = raw.iter().map(|(_, weight)| weight).sum();
    if total <= 0.0 {
        return Vec::new();
    }
    let mut shares: Vec<(String, f64)> = raw
        .into_iter()
        .map(|(outlet, weight)| (outlet, weight / total))
        .collect();

    if config.dynamic_top_k == 1 {
        shares = keep_above_mean(shares, config.min_lines as usize);
    }
    shares
}

/// Keeps outlets with at least the mean share, never fewer than `min_lines`.
fn keep_above_mean(mut shares: Vec<(String, f64)>, min_lines: usize) -> Vec<(String, f64)> {
    if shares.is_empty() {
        return shares;
    }
    let mean = 1.0 / shares.len() as f64;
    shares.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let above = shares.iter().filter(|(_, share)| *share >= mean).count();
    shares.truncate(above.max(min_lines).max(1));

    let total: f64 = shares.iter().map(|(_, share)| share).sum();
    shares
        .into_iter()
        .map(|(outlet, share)| (outlet, share / total))
        .collect()
}

fn allocate_product(config: &AllocationConfig, product: &Product) -> Vec<AllocationLine> {
    let release = releasable_units(config, product);
    let shares = outlet_weights(config, product);
    if release == 0 || shares.is_empty() {
        return Vec::new();
    }

    let mut quantities: Vec<(String, u64, f64)> = shares
        .into_iter()
        .map(|(outlet, share)| {
            let exact = release as f64 * share;
            (outlet, exact.floor() as u64, exact - exact.floor())
        })
        .collect();

    // Largest remainder keeps the release fully allocated.
    let assigned: u64 = quantities.iter().map(|(_, quantity, _)| quantity).sum();
    let mut leftover = release.saturating_sub(assigned);
    let mut order: Vec<usize> = (0..quantities.len()).collect();
    order.sort_by(|a, b| {
        quantities[*b]
            .2
            .total_cmp(&quantities[*a].2)
            .then_with(|| quantities[*a].0.cmp(&quantities[*b].0))
    });
    for index in order {
        if leftover == 0 {
            break;
        }
        quantities[index].1 += 1;
        leftover -= 1;
    }

    let mut lines: Vec<AllocationLine> = quantities
        .into_iter()
        .map(|(outlet_id, quantity, _)| AllocationLine {
            outlet_id,
            quantity: i64::try_from(quantity).unwrap_or(i64::MAX),
        })
        .collect();

    // Outlets with demand that were passed over still count towards fairness.
    for (outlet_id, velocity) in &product.sales_velocity {
        let has_demand = velocity.is_finite() && *velocity > 0.0;
        if has_demand && !lines.iter().any(|line| &line.outlet_id == outlet_id) {
            lines.push(AllocationLine {
                outlet_id: outlet_id.clone(),
                quantity: 0,
            });
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use stock_governor::allocation::{
        AxisValues, BestSpreadSelector, ConfigGrid, Dataset, FixedKnobs, SpreadWeights,
        SweepEngine,
    };

    fn config() -> AllocationConfig {
        AllocationConfig {
            reserve_percent: 0.0,
            max_per_product: 0,
            weight_method: WeightMethod::Power,
            weight_gamma: 1.0,
            dynamic_top_k: 0,
            min_lines: 1,
            reserve_min_units: 0,
            softmax_tau: 1.0,
        }
    }

    fn product() -> Product {
        Product::new("SKU-1", 100)
            .with_outlet("OUT-A", 0, 3.0)
            .with_outlet("OUT-B", 0, 1.0)
            .with_outlet("OUT-C", 0, 0.0)
    }

    fn quantities(result: &AllocationResult) -> Vec<(String, i64)> {
        result
            .rows()
            .into_iter()
            .map(|(_, outlet, quantity)| (outlet.to_string(), quantity))
            .collect()
    }

    #[test]
    fn splits_release_by_velocity() {
        let result = VelocityWeightedAllocator
            .allocate(&config(), vec![product()])
            .expect("allocates");
        assert_eq!(
            quantities(&result),
            vec![("OUT-A".to_string(), 75), ("OUT-B".to_string(), 25)]
        );
    }

    #[test]
    fn reserve_and_cap_limit_release() {
        let mut config = config();
        config.reserve_percent = 0.2;
        config.reserve_min_units = 30;
        let result = VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .expect("allocates");
        let units: i64 = quantities(&result).iter().map(|(_, q)| q).sum();
        assert_eq!(units, 70);

        config.max_per_product = 10;
        let result = VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .expect("allocates");
        let units: i64 = quantities(&result).iter().map(|(_, q)| q).sum();
        assert_eq!(units, 10);
    }

    #[test]
    fn dynamic_top_k_drops_slow_outlets() {
        let mut config = config();
        config.dynamic_top_k = 1;
        let result = VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .expect("allocates");
        assert_eq!(
            quantities(&result),
            vec![("OUT-A".to_string(), 100), ("OUT-B".to_string(), 0)]
        );

        config.min_lines = 2;
        let result = VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .expect("allocates");
        assert_eq!(quantities(&result).len(), 2);
    }

    #[test]
    fn softmax_flattens_weights() {
        let mut config = config();
        config.weight_method = WeightMethod::Softmax;
        let result = VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .expect("allocates");
        let rows = quantities(&result);
        assert_eq!(rows.iter().map(|(_, q)| q).sum::<i64>(), 100);
        assert!(rows[0].1 < 75);
        assert!(rows[1].1 > 25);
    }

    #[test]
    fn concentrated_plan_scores_below_spread_plan() {
        let dataset = Dataset::new(vec![Product::new("SKU-1", 100)
            .with_outlet("OUT-A", 0, 3.0)
            .with_outlet("OUT-B", 0, 1.0)
            .with_outlet("OUT-C", 0, 0.9)
            .with_outlet("OUT-D", 0, 0.8)]);
        let grid = ConfigGrid::new(
            AxisValues {
                reserve_percent: vec![0.0],
                max_per_product: vec![0],
                weight_method: vec![WeightMethod::Power],
                weight_gamma: vec![1.0],
                dynamic_top_k: vec![0, 1],
            },
            FixedKnobs::default(),
        )
        .expect("valid grid");
        let weights = SpreadWeights {
            outlet: 0.5,
            product: 0.3,
            units: 0.2,
        };

        let report = BestSpreadSelector::new(SweepEngine::new(0), weights)
            .expect("valid weights")
            .select(&dataset, &grid, &VelocityWeightedAllocator);

        let metrics_at = |index: usize| {
            report
                .top
                .iter()
                .find(|run| run.index == index)
                .map(|run| run.metrics.clone())
                .expect("run ranked")
        };
        let spread = metrics_at(0);
        let concentrated = metrics_at(1);
        assert_eq!(concentrated.outlets_affected, 1);
        assert!(concentrated.fairness_outlet < spread.fairness_outlet);
        assert_eq!(report.best.map(|run| run.index), Some(0));
    }

    #[test]
    fn rejects_reserve_outside_range() {
        let mut config = config();
        config.reserve_percent = 1.0;
        assert!(VelocityWeightedAllocator
            .allocate(&config, vec![product()])
            .is_err());
    }
}
