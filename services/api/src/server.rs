use crate::cli::ServeArgs;
use crate::infra::{AppState, VelocityWeightedAllocator};
use crate::routes::with_governance_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use stock_governor::config::AppConfig;
use stock_governor::error::AppError;
use stock_governor::governance::GovernanceService;
use stock_governor::telemetry;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let governance = Arc::new(GovernanceService::new(
        Arc::new(VelocityWeightedAllocator),
        &config.guardrails,
        config.sweep.clone(),
    )?);
    info!(
        rails = ?governance.chain().codes(),
        max_runs = config.sweep.max_runs,
        "guardrail chain assembled"
    );

    let app = with_governance_routes(governance)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "stock governor ready");

    axum::serve(listener, app).await?;
    Ok(())
}
