use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::breakdown::FeeBreakdown;
use super::domain::ProjectInputs;
use super::service::{FeeCalculatorService, FeeServiceError, SqlEquivalentRequest};
use crate::catalog::FeeCatalog;

/// Router builder exposing single-jurisdiction fee endpoints.
pub fn fee_router<C>(service: Arc<FeeCalculatorService<C>>) -> Router
where
    C: FeeCatalog + 'static,
{
    Router::new()
        .route("/api/v1/jurisdictions", get(jurisdictions_handler::<C>))
        .route("/api/v1/fees/calculate", post(calculate_handler::<C>))
        .route("/api/v1/fees/report", post(report_handler::<C>))
        .route("/api/v1/fees/sql-equivalent", post(sql_equivalent_handler::<C>))
        .with_state(service)
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: String,
    pub breakdown: FeeBreakdown,
}

fn error_response(error: FeeServiceError) -> Response {
    let status = match &error {
        FeeServiceError::JurisdictionNotFound { .. } => StatusCode::NOT_FOUND,
        FeeServiceError::Catalog(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) async fn jurisdictions_handler<C>(
    State(service): State<Arc<FeeCalculatorService<C>>>,
) -> Response
where
    C: FeeCatalog + 'static,
{
    match service.jurisdictions() {
        Ok(jurisdictions) => (StatusCode::OK, axum::Json(jurisdictions)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn calculate_handler<C>(
    State(service): State<Arc<FeeCalculatorService<C>>>,
    axum::Json(inputs): axum::Json<ProjectInputs>,
) -> Response
where
    C: FeeCatalog + 'static,
{
    match service.calculate(inputs) {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<C>(
    State(service): State<Arc<FeeCalculatorService<C>>>,
    axum::Json(inputs): axum::Json<ProjectInputs>,
) -> Response
where
    C: FeeCatalog + 'static,
{
    match service.report(inputs) {
        Ok((report, breakdown)) => {
            (StatusCode::OK, axum::Json(ReportResponse { report, breakdown })).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sql_equivalent_handler<C>(
    State(service): State<Arc<FeeCalculatorService<C>>>,
    axum::Json(request): axum::Json<SqlEquivalentRequest>,
) -> Response
where
    C: FeeCatalog + 'static,
{
    match service.sql_equivalent(request) {
        Ok(result) => (StatusCode::OK, axum::Json(result)).into_response(),
        Err(error) => error_response(error),
    }
}
