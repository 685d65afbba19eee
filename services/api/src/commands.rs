use crate::infra::VelocityWeightedAllocator;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use stock_governor::allocation::{
    AutoTuneReport, Dataset, PlanReview, RunRecord, SpreadWeights,
};
use stock_governor::config::AppConfig;
use stock_governor::error::AppError;
use stock_governor::governance::{
    AutoTuneRequest, BestSpreadRequest, BestSpreadResponse, GovernanceService, SweepRequest,
};
use stock_governor::guardrails::{ChainResult, DecisionContext};

#[derive(Args, Debug)]
pub(crate) struct GuardrailCheckArgs {
    /// Decision context as an inline JSON object
    #[arg(long, conflicts_with = "context_file")]
    pub(crate) context: Option<String>,
    /// Path to a JSON file holding the decision context
    #[arg(long)]
    pub(crate) context_file: Option<PathBuf>,
    /// Print the raw verdict as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct SweepArgs {
    /// Stock snapshot CSV (product_id,outlet_id,warehouse_stock,outlet_stock,sales_velocity)
    #[arg(long)]
    pub(crate) dataset: PathBuf,
    /// Cap on evaluated grid points, at most SWEEP_MAX_RUNS (0 uses that cap)
    #[arg(long)]
    pub(crate) max_runs: Option<usize>,
    /// Print the raw report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct BestSpreadArgs {
    #[command(flatten)]
    pub(crate) sweep: SweepArgs,
    /// Weight of per-outlet fairness
    #[arg(long)]
    pub(crate) outlet_weight: Option<f64>,
    /// Weight of average per-product fairness
    #[arg(long)]
    pub(crate) product_weight: Option<f64>,
    /// Weight of units moved, relative to the largest run
    #[arg(long)]
    pub(crate) units_weight: Option<f64>,
    /// Run the recommended plan through the guardrail chain
    #[arg(long)]
    pub(crate) review_plan: bool,
}

pub(crate) fn governance_service(
    config: &AppConfig,
) -> Result<GovernanceService<VelocityWeightedAllocator>, AppError> {
    Ok(GovernanceService::new(
        Arc::new(VelocityWeightedAllocator),
        &config.guardrails,
        config.sweep.clone(),
    )?)
}

pub(crate) fn run_guardrail_check(args: GuardrailCheckArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let raw = match (args.context, args.context_file) {
        (Some(inline), _) => inline,
        (None, Some(path)) => std::fs::read_to_string(path)?,
        (None, None) => "{}".to_string(),
    };
    let context: DecisionContext = serde_json::from_str(&raw)?;

    let verdict = governance_service(&config)?.evaluate_guardrails(&context)?;
    if args.json {
        print_json(&verdict)?;
    } else {
        render_verdict(&verdict);
    }
    Ok(())
}

pub(crate) fn run_best_spread(args: BestSpreadArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let defaults = config.sweep.weights;
    let weights = SpreadWeights {
        outlet: args.outlet_weight.unwrap_or(defaults.outlet),
        product: args.product_weight.unwrap_or(defaults.product),
        units: args.units_weight.unwrap_or(defaults.units),
    };
    let json = args.sweep.json;

    let response = governance_service(&config)?.best_spread(BestSpreadRequest {
        sweep: sweep_request(&args.sweep)?,
        weights: Some(weights),
        review_plan: args.review_plan,
    })?;

    if json {
        print_json(&response)?;
    } else {
        render_best_spread(&response);
    }
    Ok(())
}

pub(crate) fn run_autotune(args: SweepArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let request: AutoTuneRequest = sweep_request(&args)?;
    let report = governance_service(&config)?.autotune(request)?;

    if args.json {
        print_json(&report)?;
    } else {
        render_autotune(&report);
    }
    Ok(())
}

fn sweep_request(args: &SweepArgs) -> Result<SweepRequest, AppError> {
    Ok(SweepRequest {
        dataset: Dataset::from_path(&args.dataset)?,
        axes: None,
        fixed: None,
        max_runs: args.max_runs,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn render_verdict(verdict: &ChainResult) {
    println!(
        "Guardrail verdict: {} (score hint {:.2}, {:.3} ms)",
        verdict.final_status(),
        verdict.score_hint(),
        verdict.total_duration_ms()
    );
    for result in verdict.results() {
        println!(
            "  - {:<16} {:<5} {:<5} {} [{}]",
            result.code(),
            result.status(),
            result.severity(),
            result.message(),
            result.reason()
        );
    }
    if let Some(code) = verdict.blocked_by() {
        println!("Blocked by {code}; later rails were not evaluated.");
    }
}

fn render_run(label: &str, run: &RunRecord) {
    let params = &run.params;
    println!(
        "{label} #{:<3} score {:.4} | fairness outlet {:.3} product {:.3} | {} units over {} lines",
        run.index,
        run.score,
        run.metrics.fairness_outlet,
        run.metrics.fairness_product_avg,
        run.metrics.units,
        run.metrics.lines
    );
    println!(
        "      reserve {:.0}% | cap {} | {} gamma {:.1} | top-k {}",
        params.reserve_percent * 100.0,
        if params.max_per_product == 0 {
            "none".to_string()
        } else {
            params.max_per_product.to_string()
        },
        params.weight_method,
        params.weight_gamma,
        params.dynamic_top_k
    );
}

pub(crate) fn render_best_spread(response: &BestSpreadResponse) {
    let report = &response.report;
    println!(
        "Best-spread search at {}: {} runs ({} failed) | avg fairness outlet {:.3} product {:.3}",
        report
            .generated_at
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        report.summary.runs,
        report.summary.failed_runs,
        report.summary.avg_fairness_outlet,
        report.summary.avg_fairness_product
    );
    println!(
        "Weights: outlet {:.2} product {:.2} units {:.2}",
        report.weights.outlet, report.weights.product, report.weights.units
    );

    match &report.best {
        Some(best) => render_run("Best", best),
        None => println!("No configuration completed; nothing to recommend."),
    }
    if report.top.len() > 1 {
        println!("Alternatives:");
        for run in report.top.iter().skip(1) {
            render_run("  alt", run);
        }
    }
    if let Some(review) = &response.review {
        render_review(review);
    }
}

fn render_review(review: &PlanReview) {
    println!(
        "Plan review: {} transfers executable, {} blocked",
        review.executable, review.blocked
    );
    for transfer in review.transfers.iter().filter(|t| !t.executable) {
        println!(
            "  - {} -> {} x{} blocked by {}",
            transfer.product_id,
            transfer.outlet_id,
            transfer.quantity,
            transfer.verdict.blocked_by().unwrap_or("unknown")
        );
    }
}

pub(crate) fn render_autotune(report: &AutoTuneReport) {
    println!(
        "Auto-tune: {} completed runs ({} failed)",
        report.results.len(),
        report.failed_runs
    );
    for (rank, entry) in report.results.iter().take(5).enumerate() {
        println!(
            "  {}. score {:.4} | fairness {:.3} | {} outlets | reserve {:.0}% {} gamma {:.1} top-k {}",
            rank + 1,
            entry.score,
            entry.fairness,
            entry.metrics.outlets_affected,
            entry.config.reserve_percent * 100.0,
            entry.config.weight_method,
            entry.config.weight_gamma,
            entry.config.dynamic_top_k
        );
    }
}
