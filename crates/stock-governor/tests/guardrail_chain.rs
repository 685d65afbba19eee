//! End-to-end checks of the standard guardrail chain through the public API.

use stock_governor::config::GuardrailConfig;
use stock_governor::guardrails::rails::{MARGIN_FLOOR, PRICE_STEP, RECEIVER_DSR, ROI_FLOOR};
use stock_governor::guardrails::{
    standard_chain, DecisionContext, FnRail, RailOutcome, RailStatus, Severity,
};

fn context(raw: &str) -> DecisionContext {
    serde_json::from_str(raw).expect("context parses")
}

#[test]
fn oversized_price_step_blocks_after_margin_passes() {
    let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");

    let verdict = chain
        .evaluate(&context(
            r#"{"cost": 5.0, "current_price": 10.0, "candidate_price": 12.0}"#,
        ))
        .expect("evaluates");

    assert_eq!(verdict.final_status(), RailStatus::Block);
    assert_eq!(verdict.blocked_by(), Some(PRICE_STEP));
    assert_eq!(verdict.results().len(), 3);
    let margin = &verdict.results()[1];
    assert_eq!(margin.code(), MARGIN_FLOOR);
    assert_eq!(margin.status(), RailStatus::Pass);
    assert_eq!(verdict.score_hint(), 0.0);
}

#[test]
fn warnings_accumulate_into_the_score_hint() {
    let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");

    let verdict = chain
        .evaluate(&context(
            r#"{"projected_roi": 0.03, "receiver_dsr_post": 70}"#,
        ))
        .expect("evaluates");

    assert_eq!(verdict.final_status(), RailStatus::Warn);
    assert!(verdict.blocked_by().is_none());
    assert_eq!(verdict.results().len(), 5);
    let warned: Vec<&str> = verdict
        .results()
        .iter()
        .filter(|result| result.status() == RailStatus::Warn)
        .map(|result| result.code())
        .collect();
    assert_eq!(warned, vec![RECEIVER_DSR, ROI_FLOOR]);
    assert!((verdict.score_hint() - 0.4).abs() < 1e-9);
}

#[test]
fn context_thresholds_override_configured_defaults() {
    let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");

    let verdict = chain
        .evaluate(&context(r#"{"projected_roi": 0.03, "min_roi": "0.01"}"#))
        .expect("evaluates");

    assert_eq!(verdict.final_status(), RailStatus::Pass);
    assert_eq!(verdict.score_hint(), 1.0);
}

#[test]
fn custom_rails_run_in_code_order_with_the_standard_set() {
    let chain = standard_chain(&GuardrailConfig::default())
        .and_then(|chain| {
            chain.with(FnRail::new("GR_CATEGORY_LOCK", |context: &DecisionContext| {
                Ok(match context.text("category") {
                    Some("tobacco") => RailOutcome::block("category is locked for repricing")
                        .with_severity(Severity::Block),
                    _ => RailOutcome::pass("category open"),
                })
            }))
        })
        .expect("chain builds");

    assert_eq!(chain.len(), 6);
    assert_eq!(chain.codes()[0], "GR_CATEGORY_LOCK");

    let verdict = chain
        .evaluate(&context(
            r#"{"category": "tobacco", "cost": 5.0, "candidate_price": 10.0}"#,
        ))
        .expect("evaluates");

    assert_eq!(verdict.blocked_by(), Some("GR_CATEGORY_LOCK"));
    assert_eq!(verdict.executed_codes(), vec!["GR_CATEGORY_LOCK"]);
    assert_eq!(
        verdict.results()[0].reason(),
        "category_is_locked_for_repricing"
    );
}

#[test]
fn verdict_serializes_for_audit_logs() {
    let chain = standard_chain(&GuardrailConfig::default()).expect("chain builds");
    let verdict = chain
        .evaluate(&context(r#"{"donor_dsr_post": 3.5}"#))
        .expect("evaluates");

    let payload = serde_json::to_value(&verdict).expect("serializes");

    assert_eq!(payload["final_status"], "BLOCK");
    assert_eq!(payload["blocked_by"], "GR_DONOR_DSR");
    assert_eq!(payload["results"][0]["severity"], "BLOCK");
    assert_eq!(payload["results"][0]["meta"]["donor_dsr_post"], 3.5);
}
