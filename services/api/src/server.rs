use crate::cli::ServeArgs;
use crate::infra::{load_catalog, merge_catalog_paths, AppState};
use crate::routes::with_fee_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use lewis_fees::config::AppConfig;
use lewis_fees::error::AppError;
use lewis_fees::fees::FeeCalculatorService;
use lewis_fees::ranking::RankingService;
use lewis_fees::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    config.catalog = merge_catalog_paths(
        config.catalog,
        args.catalog.fees_csv.take(),
        args.catalog.jurisdictions_csv.take(),
    );

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(load_catalog(&config.catalog)?);
    let fee_service = Arc::new(FeeCalculatorService::new(
        catalog.clone(),
        config.engine.projection.clone(),
    ));
    let ranking_service = Arc::new(RankingService::new(catalog, &config.engine));

    let app = with_fee_routes(fee_service, ranking_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        concurrency = config.engine.ranking_concurrency,
        "fee calculation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
