use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::allocator::AllocationResult;
use super::fairness::{fairness_one_minus_gini, round6};

/// Shape and evenness of one allocation plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    pub lines: usize,
    pub units: u64,
    pub outlets_affected: usize,
    pub fairness_outlet: f64,
    pub fairness_product_avg: f64,
    pub units_per_line: f64,
}

impl RunMetrics {
    pub fn from_result(result: &AllocationResult) -> Self {
        let mut lines = 0usize;
        let mut units = 0u64;
        let mut per_outlet: BTreeMap<&str, u64> = BTreeMap::new();
        let mut per_product: BTreeMap<&str, BTreeMap<&str, u64>> = BTreeMap::new();

        for (product_id, outlet_id, quantity) in result.rows() {
            let quantity = u64::try_from(quantity).unwrap_or(0);
            *per_outlet.entry(outlet_id).or_default() += quantity;
            *per_product
                .entry(product_id)
                .or_default()
                .entry(outlet_id)
                .or_default() += quantity;

            if quantity > 0 {
                lines += 1;
                units += quantity;
            }
        }

        let outlets_affected = per_outlet.values().filter(|total| **total > 0).count();
        let fairness_outlet = fairness_one_minus_gini(&as_floats(per_outlet.values()));

        let product_scores: Vec<f64> = per_product
            .values()
            .filter(|outlets| outlets.values().any(|quantity| *quantity > 0))
            .map(|outlets| fairness_one_minus_gini(&as_floats(outlets.values())))
            .collect();
        let fairness_product_avg = if product_scores.is_empty() {
            0.0
        } else {
            round6(product_scores.iter().sum::<f64>() / product_scores.len() as f64)
        };

        let units_per_line = if lines == 0 {
            0.0
        } else {
            units as f64 / lines as f64
        };

        Self {
            lines,
            units,
            outlets_affected,
            fairness_outlet,
            fairness_product_avg,
            units_per_line,
        }
    }
}

fn as_floats<'a>(values: impl Iterator<Item = &'a u64>) -> Vec<f64> {
    values.map(|value| *value as f64).collect()
}
