use crate::commands::{
    run_autotune, run_best_spread, run_guardrail_check, BestSpreadArgs, GuardrailCheckArgs,
    SweepArgs,
};
use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use stock_governor::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Stock Governor",
    about = "Gate retail transfers and price changes, and search allocator settings for the fairest spread",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Evaluate decision contexts against the guardrail chain
    Guardrails {
        #[command(subcommand)]
        command: GuardrailCommand,
    },
    /// Search allocator configurations over a stock snapshot
    Allocation {
        #[command(subcommand)]
        command: AllocationCommand,
    },
    /// Walk through guardrail scenarios and a sweep on a built-in dataset
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum GuardrailCommand {
    /// Run every rail against one decision context
    Check(GuardrailCheckArgs),
}

#[derive(Subcommand, Debug)]
enum AllocationCommand {
    /// Recommend the configuration with the best weighted spread
    BestSpread(BestSpreadArgs),
    /// Rank configurations by the fairness and coverage heuristic
    Autotune(SweepArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Guardrails {
            command: GuardrailCommand::Check(args),
        } => run_guardrail_check(args),
        Command::Allocation { command } => match command {
            AllocationCommand::BestSpread(args) => run_best_spread(args),
            AllocationCommand::Autotune(args) => run_autotune(args),
        },
        Command::Demo(args) => run_demo(args),
    }
}
