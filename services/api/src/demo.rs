use crate::commands::{governance_service, render_autotune, render_best_spread, render_verdict};
use clap::Args;
use stock_governor::allocation::{Dataset, Product};
use stock_governor::config::AppConfig;
use stock_governor::error::AppError;
use stock_governor::governance::{BestSpreadRequest, SweepRequest};
use stock_governor::guardrails::DecisionContext;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Cap on evaluated grid points (defaults to SWEEP_MAX_RUNS)
    #[arg(long)]
    pub(crate) max_runs: Option<usize>,
    /// Only run the guardrail scenarios
    #[arg(long)]
    pub(crate) skip_sweep: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = governance_service(&config)?;

    println!("Stock governance demo");
    println!("Rails: {}", service.chain().codes().join(", "));

    for (label, context) in guardrail_scenarios() {
        println!("\nScenario: {label}");
        render_verdict(&service.evaluate_guardrails(&context)?);
    }

    if args.skip_sweep {
        return Ok(());
    }

    let dataset = demo_dataset();
    println!(
        "\nSweeping {} products across {} outlets",
        dataset.products.len(),
        dataset.outlets().len()
    );
    let sweep = SweepRequest {
        dataset,
        axes: None,
        fixed: None,
        max_runs: args.max_runs,
    };

    let response = service.best_spread(BestSpreadRequest {
        sweep: sweep.clone(),
        weights: None,
        review_plan: true,
    })?;
    println!();
    render_best_spread(&response);

    println!();
    render_autotune(&service.autotune(sweep)?);
    Ok(())
}

fn guardrail_scenarios() -> Vec<(&'static str, DecisionContext)> {
    vec![
        (
            "modest price increase",
            DecisionContext::new()
                .with("cost", 6.2)
                .with("current_price", 9.5)
                .with("candidate_price", 9.9)
                .with("projected_roi", 0.11),
        ),
        (
            "aggressive markdown",
            DecisionContext::new()
                .with("cost", 6.2)
                .with("current_price", 9.5)
                .with("candidate_price", 6.9),
        ),
        (
            "transfer into a slow outlet",
            DecisionContext::new()
                .with("donor_dsr_post", 21.0)
                .with("receiver_dsr_post", 75.0)
                .with("projected_roi", 0.02),
        ),
    ]
}

fn demo_dataset() -> Dataset {
    Dataset::new(vec![
        Product::new("SKU-RICE-5KG", 480)
            .with_outlet("OUT-CENTRAL", 12, 9.0)
            .with_outlet("OUT-HARBOUR", 4, 6.5)
            .with_outlet("OUT-MARKET", 20, 3.0)
            .with_outlet("OUT-RIDGE", 0, 1.5),
        Product::new("SKU-OIL-1L", 260)
            .with_outlet("OUT-CENTRAL", 30, 4.0)
            .with_outlet("OUT-HARBOUR", 8, 4.0)
            .with_outlet("OUT-MARKET", 6, 2.5),
        Product::new("SKU-TEA-100", 150)
            .with_outlet("OUT-HARBOUR", 2, 1.2)
            .with_outlet("OUT-RIDGE", 1, 2.4),
        Product::new("SKU-SOAP-3PK", 90)
            .with_outlet("OUT-CENTRAL", 15, 0.8)
            .with_outlet("OUT-MARKET", 0, 1.1)
            .with_outlet("OUT-RIDGE", 3, 0.6),
    ])
}
