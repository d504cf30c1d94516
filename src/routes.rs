use crate::config::Config;
use crate::handlers::{self, AppState};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

/// Assembles the application router.
///
/// `/health` bypasses the body limit and the rate limiter; every `/api/v1`
/// route goes through both. The limiter keys on client IP, so the server has
/// to be started with connect info (see `main`).
pub fn build_router(state: Arc<AppState>, config: &Config) -> anyhow::Result<Router> {
    let mut api_routes = Router::new()
        .route("/api/v1/tax-id/validate", get(handlers::validate_tax_id_handler))
        .route("/api/v1/sessions", post(handlers::create_session))
        .route("/api/v1/sessions/:id", delete(handlers::end_session))
        .route("/api/v1/sessions/:id/upload", post(handlers::upload_table))
        .route("/api/v1/sessions/:id/demo", post(handlers::load_demo))
        .route(
            "/api/v1/sessions/:id/debtors",
            get(handlers::list_debtors).post(handlers::append_debtor),
        )
        .route("/api/v1/sessions/:id/metrics", get(handlers::get_metrics))
        .route("/api/v1/sessions/:id/charts", get(handlers::get_charts))
        .route(
            "/api/v1/sessions/:id/export/spreadsheet",
            get(handlers::export_spreadsheet),
        )
        .route(
            "/api/v1/sessions/:id/export/report",
            get(handlers::export_report),
        )
        // Upload size is governed by MAX_UPLOAD_BYTES, not axum's 2MB default
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_upload_bytes));

    if config.rate_limiting_enabled() {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(config.rate_limit_per_second)
                .burst_size(config.rate_limit_burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
        );
        api_routes = api_routes.layer(GovernorLayer {
            config: governor_conf,
        });
        tracing::info!(
            "Rate limiting: {} req/s per IP, burst of {}",
            config.rate_limit_per_second,
            config.rate_limit_burst
        );
    }

    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    Ok(app)
}
