use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::fees::{FeeCalculatorService, ProjectInputs, ProjectionPolicy};

fn post_json(uri: &str, payload: serde_json::Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::post(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap()
}

fn austin_payload() -> serde_json::Value {
    json!({
        "jurisdictionName": "Austin",
        "stateCode": "TX",
        "projectType": "Residential",
        "useSubtype": "Multifamily",
        "numUnits": 50,
        "squareFeet": 45000,
        "projectValue": 15000000,
        "meterSize": "2\""
    })
}

#[tokio::test]
async fn calculate_handler_returns_breakdown() {
    let response = crate::fees::router::calculate_handler::<crate::catalog::InMemoryFeeCatalog>(
        State(service()),
        axum::Json(austin_inputs()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["jurisdictionId"], "austin");
    assert_eq!(payload["firstYearTotal"], 102_390.0);
    assert_eq!(payload["dataStatus"]["status"], "available");
}

#[tokio::test]
async fn calculate_handler_returns_not_found_for_unknown_jurisdiction() {
    let response = crate::fees::router::calculate_handler::<crate::catalog::InMemoryFeeCatalog>(
        State(service()),
        axum::Json(ProjectInputs::new("Atlantis", multifamily_details())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "jurisdiction not found: Atlantis");
}

#[tokio::test]
async fn calculate_handler_flags_unavailable_data() {
    let service = Arc::new(FeeCalculatorService::new(
        Arc::new(RowsUnavailable),
        ProjectionPolicy::default(),
    ));
    let response = crate::fees::router::calculate_handler::<RowsUnavailable>(
        State(service),
        axum::Json(austin_inputs()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["dataStatus"]["status"], "unavailable");
    assert_eq!(payload["fees"], json!([]));
}

#[tokio::test]
async fn calculate_route_accepts_camel_case_payloads() {
    let router = router_with(catalog());

    let response = router
        .oneshot(post_json("/api/v1/fees/calculate", austin_payload()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["oneTimeFees"], 101_850.0);
    assert_eq!(payload["needsRules"].as_array().map(Vec::len), Some(1));
    assert_eq!(payload["byAgency"]["Austin Water"], 15_045.0);
}

#[tokio::test]
async fn report_route_returns_text_and_breakdown() {
    let router = router_with(catalog());

    let response = router
        .oneshot(post_json("/api/v1/fees/report", austin_payload()))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let report = payload["report"].as_str().expect("report text");
    assert!(report.contains("PROJECT SPECIFICATIONS"));
    assert_eq!(payload["breakdown"]["jurisdictionName"], "Austin");
}

#[tokio::test]
async fn sql_equivalent_route_uses_snake_case_parameters() {
    let router = router_with(catalog());

    let response = router
        .oneshot(post_json(
            "/api/v1/fees/sql-equivalent",
            json!({
                "city": "Austin",
                "use_type": "Residential",
                "use_subtype": "Multifamily",
                "dwellings": 50,
                "res_sqft": 45000.0
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload["grand_total"].as_f64().is_some_and(|total| total > 0.0));
    assert!(payload["line_items"].is_array());
}

#[tokio::test]
async fn jurisdictions_route_lists_active_jurisdictions() {
    let router = router_with(catalog());

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/jurisdictions")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload[0]["name"], "Austin");
    assert_eq!(payload[1]["stateCode"], "CO");
}

#[tokio::test]
async fn jurisdictions_route_reports_catalog_outage() {
    let router = router_with(CatalogOffline);

    let response = router
        .oneshot(
            axum::http::Request::get("/api/v1/jurisdictions")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
