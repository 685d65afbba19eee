use serde::Serialize;
use std::collections::BTreeMap;

use super::allocator::AllocationResult;
use super::dataset::Dataset;
use crate::guardrails::{ChainError, ChainResult, DecisionContext, GuardrailChain};

/// Guardrail verdict for one proposed warehouse-to-outlet transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferReview {
    pub product_id: String,
    pub outlet_id: String,
    pub quantity: u64,
    pub executable: bool,
    pub verdict: ChainResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanReview {
    pub transfers: Vec<TransferReview>,
    pub executable: usize,
    pub blocked: usize,
}

/// Runs every positive line of an allocation plan through `chain`. A
/// transfer is executable unless its verdict is `BLOCK`.
pub fn review_plan(
    dataset: &Dataset,
    allocation: &AllocationResult,
    chain: &GuardrailChain,
) -> Result<PlanReview, ChainError> {
    let rows: Vec<(&str, &str, u64)> = allocation
        .rows()
        .into_iter()
        .filter_map(|(product_id, outlet_id, quantity)| {
            u64::try_from(quantity)
                .ok()
                .filter(|quantity| *quantity > 0)
                .map(|quantity| (product_id, outlet_id, quantity))
        })
        .collect();

    let mut allocated_per_product: BTreeMap<&str, u64> = BTreeMap::new();
    for (product_id, _, quantity) in &rows {
        *allocated_per_product.entry(*product_id).or_default() += quantity;
    }

    let mut transfers = Vec::with_capacity(rows.len());
    for (product_id, outlet_id, quantity) in rows {
        let context = transfer_context(
            dataset,
            product_id,
            outlet_id,
            quantity,
            allocated_per_product.get(product_id).copied().unwrap_or(0),
        );
        let verdict = chain.evaluate(&context)?;
        transfers.push(TransferReview {
            product_id: product_id.to_string(),
            outlet_id: outlet_id.to_string(),
            quantity,
            executable: !verdict.is_blocked(),
            verdict,
        });
    }

    let executable = transfers.iter().filter(|review| review.executable).count();
    Ok(PlanReview {
        blocked: transfers.len() - executable,
        executable,
        transfers,
    })
}

fn transfer_context(
    dataset: &Dataset,
    product_id: &str,
    outlet_id: &str,
    quantity: u64,
    product_total: u64,
) -> DecisionContext {
    let mut context = DecisionContext::new()
        .with("product_id", product_id)
        .with("outlet_id", outlet_id)
        .with("quantity", quantity);

    let Some(product) = dataset.product(product_id) else {
        return context;
    };

    let total_velocity = product.total_velocity();
    if total_velocity > 0.0 {
        let remaining = u64::from(product.warehouse_stock).saturating_sub(product_total);
        context.insert("donor_dsr_post", remaining as f64 / total_velocity);
    }

    let velocity = product.velocity(outlet_id);
    if velocity > 0.0 {
        let post = u64::from(product.outlet_stock(outlet_id)) + quantity;
        context.insert("receiver_dsr_post", post as f64 / velocity);
    }

    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::allocator::AllocationLine;
    use crate::allocation::dataset::Product;
    use crate::config::GuardrailConfig;
    use crate::guardrails::rails::{DONOR_DSR, RECEIVER_DSR};
    use crate::guardrails::standard_chain;

    fn plan(lines: &[(&str, &str, i64)]) -> AllocationResult {
        let mut allocations: BTreeMap<String, Vec<AllocationLine>> = BTreeMap::new();
        for (product_id, outlet_id, quantity) in lines {
            allocations
                .entry(product_id.to_string())
                .or_default()
                .push(AllocationLine {
                    outlet_id: outlet_id.to_string(),
                    quantity: *quantity,
                });
        }
        AllocationResult::from_allocations(allocations)
    }

    #[test]
    fn blocks_transfers_that_drain_the_warehouse() {
        let dataset = Dataset::new(vec![Product::new("SKU-1", 100)
            .with_outlet("OUT-A", 0, 5.0)
            .with_outlet("OUT-B", 0, 5.0)]);
        let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");

        let review = review_plan(
            &dataset,
            &plan(&[("SKU-1", "OUT-A", 45), ("SKU-1", "OUT-B", 45)]),
            &chain,
        )
        .expect("reviews");

        assert_eq!(review.transfers.len(), 2);
        assert_eq!(review.blocked, 2);
        assert!(review
            .transfers
            .iter()
            .all(|t| t.verdict.blocked_by() == Some(DONOR_DSR)));
    }

    #[test]
    fn healthy_transfers_are_executable() {
        let dataset = Dataset::new(vec![Product::new("SKU-1", 400)
            .with_outlet("OUT-A", 2, 2.0)
            .with_outlet("OUT-B", 0, 1.0)]);
        let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");

        let review = review_plan(
            &dataset,
            &plan(&[("SKU-1", "OUT-A", 20), ("SKU-1", "OUT-B", 0)]),
            &chain,
        )
        .expect("reviews");

        assert_eq!(review.transfers.len(), 1);
        assert_eq!(review.executable, 1);
        let verdict = &review.transfers[0].verdict;
        let receiver = verdict
            .results()
            .iter()
            .find(|result| result.code() == RECEIVER_DSR)
            .expect("receiver rail ran");
        assert_eq!(receiver.meta()["receiver_dsr_post"], serde_json::json!(11.0));
    }
}
