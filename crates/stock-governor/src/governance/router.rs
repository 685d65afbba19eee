use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use super::service::{AutoTuneRequest, BestSpreadRequest, GovernanceService, ServiceError};
use crate::allocation::Allocator;
use crate::guardrails::DecisionContext;

/// Router builder exposing guardrail evaluation and configuration sweeps.
pub fn governance_router<A>(service: Arc<GovernanceService<A>>) -> Router
where
    A: Allocator + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/guardrails/evaluate", post(evaluate_handler::<A>))
        .route("/api/v1/allocation/best-spread", post(best_spread_handler::<A>))
        .route("/api/v1/allocation/autotune", post(autotune_handler::<A>))
        .with_state(service)
}

pub(crate) async fn evaluate_handler<A>(
    State(service): State<Arc<GovernanceService<A>>>,
    axum::Json(context): axum::Json<DecisionContext>,
) -> Response
where
    A: Allocator + ?Sized + 'static,
{
    respond(service.evaluate_guardrails(&context))
}

pub(crate) async fn best_spread_handler<A>(
    State(service): State<Arc<GovernanceService<A>>>,
    axum::Json(request): axum::Json<BestSpreadRequest>,
) -> Response
where
    A: Allocator + ?Sized + 'static,
{
    match tokio::task::spawn_blocking(move || service.best_spread(request)).await {
        Ok(outcome) => respond(outcome),
        Err(join_error) => sweep_aborted(join_error),
    }
}

pub(crate) async fn autotune_handler<A>(
    State(service): State<Arc<GovernanceService<A>>>,
    axum::Json(request): axum::Json<AutoTuneRequest>,
) -> Response
where
    A: Allocator + ?Sized + 'static,
{
    match tokio::task::spawn_blocking(move || service.autotune(request)).await {
        Ok(outcome) => respond(outcome),
        Err(join_error) => sweep_aborted(join_error),
    }
}

fn respond<T: Serialize>(outcome: Result<T, ServiceError>) -> Response {
    match outcome {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(err) if err.is_client_error() => {
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "governance request failed");
            let payload = json!({
                "error": err.to_string(),
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn sweep_aborted(join_error: tokio::task::JoinError) -> Response {
    error!(error = %join_error, "sweep task aborted");
    let payload = json!({
        "error": "sweep aborted",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
