use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Deserialize;

use super::service::RankingService;
use super::views::RankingResponse;
use crate::catalog::FeeCatalog;
use crate::fees::ProjectDetails;

#[derive(Debug, Clone, Deserialize)]
pub struct RankRequest {
    pub project: ProjectDetails,
    #[serde(default)]
    pub limit: Option<usize>,
}

pub fn ranking_router<C>(service: Arc<RankingService<C>>) -> Router
where
    C: FeeCatalog + 'static,
{
    Router::new()
        .route("/api/v1/jurisdictions/rank", post(rank_handler::<C>))
        .with_state(service)
}

pub(crate) async fn rank_handler<C>(
    State(service): State<Arc<RankingService<C>>>,
    axum::Json(request): axum::Json<RankRequest>,
) -> Response
where
    C: FeeCatalog + 'static,
{
    let result = match request.limit {
        Some(limit) => service.top_jurisdictions(&request.project, limit).await,
        None => service.rank_jurisdictions(&request.project).await,
    };

    match result {
        Ok(outcome) => (
            StatusCode::OK,
            axum::Json(RankingResponse::from_outcome(outcome)),
        )
            .into_response(),
        Err(error) => (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(RankingResponse::failure(error.to_string())),
        )
            .into_response(),
    }
}
