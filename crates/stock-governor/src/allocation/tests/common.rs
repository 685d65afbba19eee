use std::collections::BTreeMap;

use crate::allocation::{
    AllocationConfig, AllocationError, AllocationLine, AllocationResult, AxisValues, ConfigGrid,
    Dataset, FixedKnobs, Product, WeightMethod,
};

/// Three outlets sharing two products. An even split gives every outlet 50
/// units; concentrating on the fastest outlet sends everything to OUT-A.
pub(super) fn network() -> Dataset {
    Dataset::new(vec![
        Product::new("SKU-1", 90)
            .with_outlet("OUT-A", 0, 3.0)
            .with_outlet("OUT-B", 0, 2.0)
            .with_outlet("OUT-C", 0, 1.0),
        Product::new("SKU-2", 60)
            .with_outlet("OUT-A", 0, 1.0)
            .with_outlet("OUT-B", 0, 1.0)
            .with_outlet("OUT-C", 0, 1.0),
    ])
}

pub(super) fn axes(reserve_percent: &[f64], dynamic_top_k: &[u8]) -> AxisValues {
    AxisValues {
        reserve_percent: reserve_percent.to_vec(),
        max_per_product: vec![0],
        weight_method: vec![WeightMethod::Power],
        weight_gamma: vec![1.0],
        dynamic_top_k: dynamic_top_k.to_vec(),
    }
}

pub(super) fn grid(reserve_percent: &[f64], dynamic_top_k: &[u8]) -> ConfigGrid {
    ConfigGrid::new(axes(reserve_percent, dynamic_top_k), FixedKnobs::default())
        .expect("test grid is valid")
}

/// Splits the non-reserved warehouse stock evenly across outlets, or hands
/// all of it to the fastest outlet when `dynamic_top_k` is set. Outlets left
/// out still get a zero line.
pub(super) fn split_allocator(
    config: &AllocationConfig,
    products: Vec<Product>,
) -> Result<AllocationResult, AllocationError> {
    let mut allocations = BTreeMap::new();
    for product in products {
        let mut budget = (f64::from(product.warehouse_stock) * (1.0 - config.reserve_percent))
            .floor() as i64;
        if config.max_per_product > 0 {
            budget = budget.min(i64::from(config.max_per_product));
        }

        let outlets: Vec<&String> = product.sales_velocity.keys().collect();
        if outlets.is_empty() {
            continue;
        }

        let fastest = product
            .sales_velocity
            .iter()
            .fold(None::<(&String, f64)>, |best, (outlet, velocity)| match best {
                Some((_, top)) if top >= *velocity => best,
                _ => Some((outlet, *velocity)),
            })
            .map(|(outlet, _)| outlet.clone());

        let share = budget / outlets.len() as i64;
        let lines = outlets
            .iter()
            .map(|outlet| {
                let quantity = if config.dynamic_top_k == 1 {
                    if Some(*outlet) == fastest.as_ref() {
                        budget
                    } else {
                        0
                    }
                } else {
                    share
                };
                AllocationLine {
                    outlet_id: outlet.to_string(),
                    quantity,
                }
            })
            .collect();
        allocations.insert(product.product_id.clone(), lines);
    }
    Ok(AllocationResult::from_allocations(allocations))
}

/// Fails every grid point whose reserve matches `reserve_percent`.
pub(super) fn failing_at(
    reserve_percent: f64,
) -> impl Fn(&AllocationConfig, Vec<Product>) -> Result<AllocationResult, AllocationError> + Send + Sync
{
    move |config: &AllocationConfig, products: Vec<Product>| {
        if config.reserve_percent == reserve_percent {
            Err(AllocationError::Failed("upstream rejected the request".to_string()))
        } else {
            split_allocator(config, products)
        }
    }
}
