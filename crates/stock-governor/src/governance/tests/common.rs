use axum::response::Response;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::allocation::{
    AllocationConfig, AllocationError, AllocationLine, AllocationResult, Allocator, AxisValues,
    Dataset, Product, WeightMethod,
};
use crate::config::{GuardrailConfig, SweepSettings};
use crate::governance::{governance_router, GovernanceService};

/// Splits the non-reserved warehouse stock evenly across outlets with demand.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct EvenAllocator;

impl Allocator for EvenAllocator {
    fn allocate(
        &self,
        config: &AllocationConfig,
        products: Vec<Product>,
    ) -> Result<AllocationResult, AllocationError> {
        let mut allocations = BTreeMap::new();
        for product in products {
            let outlets: Vec<&String> = product
                .sales_velocity
                .iter()
                .filter(|(_, velocity)| **velocity > 0.0)
                .map(|(outlet, _)| outlet)
                .collect();
            if outlets.is_empty() {
                continue;
            }
            let budget = (f64::from(product.warehouse_stock) * (1.0 - config.reserve_percent))
                .floor() as i64;
            let share = budget / outlets.len() as i64;
            let lines = outlets
                .into_iter()
                .map(|outlet| AllocationLine {
                    outlet_id: outlet.clone(),
                    quantity: share,
                })
                .collect();
            allocations.insert(product.product_id.clone(), lines);
        }
        Ok(AllocationResult::from_allocations(allocations))
    }
}

/// Allocator that refuses every request.
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct OfflineAllocator;

impl Allocator for OfflineAllocator {
    fn allocate(
        &self,
        _config: &AllocationConfig,
        _products: Vec<Product>,
    ) -> Result<AllocationResult, AllocationError> {
        Err(AllocationError::Timeout { after_ms: 30_000 })
    }
}

pub(super) fn dataset() -> Dataset {
    Dataset::new(vec![
        Product::new("SKU-1", 400)
            .with_outlet("OUT-A", 2, 2.0)
            .with_outlet("OUT-B", 0, 2.0),
        Product::new("SKU-2", 300)
            .with_outlet("OUT-A", 5, 1.0)
            .with_outlet("OUT-B", 5, 1.0),
    ])
}

pub(super) fn small_axes() -> AxisValues {
    AxisValues {
        reserve_percent: vec![0.0, 0.2],
        max_per_product: vec![0],
        weight_method: vec![WeightMethod::Power],
        weight_gamma: vec![1.0],
        dynamic_top_k: vec![0],
    }
}

pub(super) fn build_service() -> GovernanceService<EvenAllocator> {
    GovernanceService::new(
        Arc::new(EvenAllocator),
        &GuardrailConfig::default(),
        SweepSettings::default(),
    )
    .expect("standard chain builds")
}

/// Service whose configured sweep cap is `max_runs`.
pub(super) fn capped_service(max_runs: usize) -> GovernanceService<EvenAllocator> {
    GovernanceService::new(
        Arc::new(EvenAllocator),
        &GuardrailConfig::default(),
        SweepSettings {
            max_runs,
            ..SweepSettings::default()
        },
    )
    .expect("standard chain builds")
}

pub(super) fn offline_service() -> GovernanceService<OfflineAllocator> {
    GovernanceService::new(
        Arc::new(OfflineAllocator),
        &GuardrailConfig::default(),
        SweepSettings::default(),
    )
    .expect("standard chain builds")
}

pub(super) fn router() -> axum::Router {
    governance_router(Arc::new(build_service()))
}

pub(super) fn best_spread_body(review_plan: bool) -> Value {
    json!({
        "dataset": dataset(),
        "axes": small_axes(),
        "review_plan": review_plan,
    })
}

pub(super) fn post_json(uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("serialize body"),
        ))
        .expect("build request")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
