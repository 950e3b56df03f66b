use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use lewis_fees::catalog::FeeCatalog;
use lewis_fees::fees::{fee_router, FeeCalculatorService};
use lewis_fees::ranking::{ranking_router, RankingService};
use serde_json::json;
use std::sync::Arc;

/// Fee and ranking APIs plus the operational endpoints.
pub(crate) fn with_fee_routes<C>(
    fees: Arc<FeeCalculatorService<C>>,
    ranking: Arc<RankingService<C>>,
) -> axum::Router
where
    C: FeeCatalog + 'static,
{
    fee_router(fees)
        .merge(ranking_router(ranking))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
