use crate::charts::{ChartData, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP_EXPOSURES};
use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::export::{
    content_digest, render_report, to_spreadsheet, REPORT_FILE_NAME, SPREADSHEET_FILE_NAME,
};
use crate::fixtures::{DemoPortfolio, DEFAULT_DEMO_ROWS, DEFAULT_DEMO_SEED};
use crate::ingest::DebtorSpreadsheetParser;
use crate::metrics::compute_metrics;
use crate::models::*;
use crate::session::{SessionHandle, SessionStore, TableSource};
use crate::tax_id::{format_tax_id, normalize_tax_id, validate_tax_id};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bigdecimal::{BigDecimal, Zero};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const CONTENT_SHA256_HEADER: &str = "x-content-sha256";

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Live sessions and their debtor tables.
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let sessions = SessionStore::new(config.session_ttl(), config.session_max_capacity);
        Self { config, sessions }
    }
}

/// Resolves a session or fails with 404.
async fn session(state: &AppState, id: &Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found or expired", id)))
}

const LOG_PREVIEW_CHARS: usize = 32;

/// Caps user-supplied text before it reaches the logs.
fn log_preview(raw: &str) -> String {
    match raw.char_indices().nth(LOG_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}... ({} bytes)", &raw[..cut], raw.len()),
        None => raw.to_string(),
    }
}

/// Health check endpoint.
///
/// Returns the service status and version.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "rust-credit-monitor",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// GET /api/v1/tax-id/validate?value=
///
/// Stateless CNPJ check. Always 200; `valid` carries the verdict.
pub async fn validate_tax_id_handler(
    Query(params): Query<TaxIdQueryParams>,
) -> Json<TaxIdValidationResponse> {
    let valid = validate_tax_id(&params.value);
    tracing::debug!("CNPJ check '{}' -> {}", log_preview(&params.value), valid);

    Json(TaxIdValidationResponse {
        valid,
        normalized: normalize_tax_id(&params.value),
        formatted: if valid {
            format_tax_id(&params.value)
        } else {
            None
        },
    })
}

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionCreatedResponse>) {
    let session_id = state.sessions.create().await;
    tracing::info!("✓ Session {} opened", session_id);

    (
        StatusCode::CREATED,
        Json(SessionCreatedResponse {
            session_id,
            expires_in_secs: state.sessions.ttl().as_secs(),
        }),
    )
}

/// DELETE /api/v1/sessions/:id
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.end(&id).await {
        return Err(AppError::NotFound(format!(
            "Session {} not found or expired",
            id
        )));
    }
    tracing::info!("Session {} closed", id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/upload
///
/// The body is the raw spreadsheet (`;`-delimited CSV). On success the
/// session's table is replaced; on any parse error it is left as it was.
pub async fn upload_table(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<TableLoadedResponse>, AppError> {
    let handle = session(&state, &id).await?;

    if body.is_empty() {
        return Err(AppError::BadRequest("Uploaded spreadsheet is empty".to_string()));
    }

    let rows = DebtorSpreadsheetParser::parse(&body).map_err(|e| {
        tracing::warn!("❌ Upload rejected for session {}: {:#}", id, e);
        AppError::BadRequest(format!("{:#}", e))
    })?;

    let rows_loaded = rows.len();
    let mut table = handle.write().await;
    table.replace(rows, TableSource::Upload);
    tracing::info!("✓ Session {}: {} debtors loaded from upload", id, rows_loaded);

    Ok(Json(TableLoadedResponse {
        session_id: id,
        source: table.source().describe(),
        rows_loaded,
    }))
}

/// POST /api/v1/sessions/:id/demo
///
/// Replaces the table with a seeded synthetic portfolio. An absent body uses
/// the default seed and row count.
pub async fn load_demo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: Option<Json<DemoRequest>>,
) -> Result<Json<TableLoadedResponse>, AppError> {
    let handle = session(&state, &id).await?;

    let request = body.map(|Json(r)| r).unwrap_or_default();
    let seed = request.seed.unwrap_or(DEFAULT_DEMO_SEED);
    let rows = request.rows.unwrap_or(DEFAULT_DEMO_ROWS);

    if rows > state.config.demo_max_rows {
        return Err(AppError::BadRequest(format!(
            "rows must be at most {}",
            state.config.demo_max_rows
        )));
    }

    let generated = DemoPortfolio::generate(seed, rows);
    let mut table = handle.write().await;
    table.replace(generated, TableSource::Demo { seed });
    tracing::info!("✓ Session {}: {} demo debtors (seed={})", id, rows, seed);

    Ok(Json(TableLoadedResponse {
        session_id: id,
        source: table.source().describe(),
        rows_loaded: table.len(),
    }))
}

/// GET /api/v1/sessions/:id/debtors
pub async fn list_debtors(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DebtorListResponse>, AppError> {
    let handle = session(&state, &id).await?;
    let table = handle.read().await;

    Ok(Json(DebtorListResponse {
        session_id: id,
        count: table.len(),
        debtors: table.rows().to_vec(),
    }))
}

/// Field checks that do not depend on the CNPJ.
fn check_new_debtor(request: &NewDebtorRequest) -> Result<(), AppError> {
    if request.legal_name.trim().is_empty() {
        return Err(AppError::BadRequest("legal_name cannot be empty".to_string()));
    }
    if request.credit_limit < BigDecimal::zero() {
        return Err(AppError::BadRequest(
            "credit_limit cannot be negative".to_string(),
        ));
    }
    if request.current_exposure < BigDecimal::zero() {
        return Err(AppError::BadRequest(
            "current_exposure cannot be negative".to_string(),
        ));
    }
    if request.credit_score > 1000 {
        return Err(AppError::BadRequest(
            "credit_score must be between 0 and 1000".to_string(),
        ));
    }
    for (name, flag) in [
        ("has_protests", request.has_protests),
        ("has_lawsuits", request.has_lawsuits),
        ("has_bureau_restriction", request.has_bureau_restriction),
    ] {
        if flag > 1 {
            return Err(AppError::BadRequest(format!("{} must be 0 or 1", name)));
        }
    }
    Ok(())
}

/// POST /api/v1/sessions/:id/debtors
///
/// Appends one debtor after the CNPJ check. A rejected CNPJ answers 422 and
/// leaves the table unchanged.
pub async fn append_debtor(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<NewDebtorRequest>,
) -> Result<(StatusCode, Json<DebtorAppendedResponse>), AppError> {
    let handle = session(&state, &id).await?;
    check_new_debtor(&request)?;

    let raw_tax_id = request.tax_id.clone();
    let mut table = handle.write().await;
    if !table.insert_validated(request.into_record()) {
        tracing::warn!("❌ Session {}: CNPJ '{}' rejected", id, raw_tax_id);
        return Err(AppError::UnprocessableEntity(format!(
            "CNPJ inválido: '{}'. Verifique os dígitos verificadores.",
            raw_tax_id
        )));
    }

    let row_index = table.len() - 1;
    let debtor = table.rows()[row_index].clone();
    tracing::info!("✓ Session {}: debtor {} appended", id, debtor.tax_id);

    Ok((
        StatusCode::CREATED,
        Json(DebtorAppendedResponse {
            session_id: id,
            row_index,
            count: table.len(),
            debtor,
        }),
    ))
}

/// GET /api/v1/sessions/:id/metrics
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<MetricsResponse>, AppError> {
    let handle = session(&state, &id).await?;
    let table = handle.read().await;

    let metrics = compute_metrics(table.rows());
    let formatted = metrics.formatted();

    Ok(Json(MetricsResponse {
        session_id: id,
        debtors: table.len(),
        total_volume: metrics.total_volume,
        delinquency_pct: metrics.delinquency_pct,
        concentration_pct: metrics.concentration_pct,
        formatted,
    }))
}

/// GET /api/v1/sessions/:id/charts?bins=&top=
pub async fn get_charts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Query(params): Query<ChartQueryParams>,
) -> Result<Json<ChartsResponse>, AppError> {
    let handle = session(&state, &id).await?;

    let bins = params.bins.unwrap_or(DEFAULT_HISTOGRAM_BINS);
    if bins > state.config.max_histogram_bins {
        return Err(AppError::BadRequest(format!(
            "bins must be at most {}",
            state.config.max_histogram_bins
        )));
    }

    let table = handle.read().await;
    let charts = ChartData::build(
        table.rows(),
        bins,
        params.top.unwrap_or(DEFAULT_TOP_EXPOSURES),
    );

    Ok(Json(ChartsResponse {
        session_id: id,
        debtors: table.len(),
        charts,
    }))
}

/// Builds a download response with its SHA-256 header.
fn attachment(content_type: &str, file_name: &str, body: Vec<u8>) -> Response {
    let digest = content_digest(&body);
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
            (HeaderName::from_static(CONTENT_SHA256_HEADER), digest),
        ],
        body,
    )
        .into_response()
}

/// GET /api/v1/sessions/:id/export/spreadsheet
pub async fn export_spreadsheet(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = session(&state, &id).await?;
    let table = handle.read().await;

    let bytes = to_spreadsheet(table.rows()).context("Failed to build spreadsheet export")?;
    tracing::info!(
        "Session {}: spreadsheet exported ({} rows, {} bytes)",
        id,
        table.len(),
        bytes.len()
    );

    Ok(attachment(
        "text/csv; charset=utf-8",
        SPREADSHEET_FILE_NAME,
        bytes,
    ))
}

/// GET /api/v1/sessions/:id/export/report
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = session(&state, &id).await?;
    let table = handle.read().await;

    let metrics = compute_metrics(table.rows());
    let report = render_report(
        table.rows(),
        &metrics,
        chrono::Utc::now(),
        state.config.report_lines_per_page,
    );
    tracing::info!("Session {}: report exported ({} rows)", id, table.len());

    Ok(attachment(
        "text/plain; charset=utf-8",
        REPORT_FILE_NAME,
        report.into_bytes(),
    ))
}
