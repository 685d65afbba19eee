use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::dataset::Product;

/// How outlet demand is turned into allocation weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightMethod {
    Power,
    Softmax,
}

impl WeightMethod {
    pub fn label(&self) -> &'static str {
        match self {
            WeightMethod::Power => "power",
            WeightMethod::Softmax => "softmax",
        }
    }
}

impl fmt::Display for WeightMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One grid point handed to the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub reserve_percent: f64,
    /// `0` means unbounded.
    pub max_per_product: u32,
    pub weight_method: WeightMethod,
    pub weight_gamma: f64,
    pub dynamic_top_k: u8,
    pub min_lines: u32,
    pub reserve_min_units: u32,
    pub softmax_tau: f64,
}

/// One allocated row in the flat response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationLine {
    pub outlet_id: String,
    pub quantity: i64,
}

/// One outlet entry of a decision trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub outlet_id: String,
    pub reason: String,
    #[serde(default)]
    pub allocated_qty: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductTrace {
    #[serde(default)]
    pub outlets: Vec<TraceRow>,
}

/// Allocator response. Allocators answer either with flat `allocations` or,
/// as a fallback, with a `decision_trace` whose `allocated` rows carry the
/// quantities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocations: Option<BTreeMap<String, Vec<AllocationLine>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_trace: Option<BTreeMap<String, ProductTrace>>,
}

pub(crate) const ALLOCATED_REASON: &str = "allocated";

impl AllocationResult {
    pub fn from_allocations(allocations: BTreeMap<String, Vec<AllocationLine>>) -> Self {
        Self {
            allocations: Some(allocations),
            decision_trace: None,
        }
    }

    pub fn from_trace(decision_trace: BTreeMap<String, ProductTrace>) -> Self {
        Self {
            allocations: None,
            decision_trace: Some(decision_trace),
        }
    }

    /// Flattens either shape into `(product_id, outlet_id, quantity)` rows.
    /// Flat allocations win when both are present and non-empty.
    pub fn rows(&self) -> Vec<(&str, &str, i64)> {
        if let Some(allocations) = self.allocations.as_ref().filter(|map| !map.is_empty()) {
            return allocations
                .iter()
                .flat_map(|(product_id, lines)| {
                    lines.iter().map(move |line| {
                        (product_id.as_str(), line.outlet_id.as_str(), line.quantity)
                    })
                })
                .collect();
        }

        self.decision_trace
            .iter()
            .flatten()
            .flat_map(|(product_id, trace)| {
                trace
                    .outlets
                    .iter()
                    .filter(|row| row.reason == ALLOCATED_REASON)
                    .map(move |row| {
                        (product_id.as_str(), row.outlet_id.as_str(), row.allocated_qty)
                    })
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AllocationError {
    #[error("allocator timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("allocator returned an unusable response: {0}")]
    InvalidOutput(String),
    #[error("allocator failed: {0}")]
    Failed(String),
}

/// Port to the external stock-allocation function. The sweep hands every
/// call its own copy of the products.
pub trait Allocator: Send + Sync {
    fn allocate(
        &self,
        config: &AllocationConfig,
        products: Vec<Product>,
    ) -> Result<AllocationResult, AllocationError>;
}

impl<F> Allocator for F
where
    F: Fn(&AllocationConfig, Vec<Product>) -> Result<AllocationResult, AllocationError>
        + Send
        + Sync,
{
    fn allocate(
        &self,
        config: &AllocationConfig,
        products: Vec<Product>,
    ) -> Result<AllocationResult, AllocationError> {
        self(config, products)
    }
}
