use std::{net::SocketAddr, sync::Arc};

use anyhow::anyhow;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use charge_client::{
    domain::{ChargeSession, SessionTable},
    queries::{filter_by_start_date, summarize_by_location, summarize_by_month, summarize_by_weekday},
};
use serde::{Deserialize, Serialize};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

use crate::{
    config::AnalysisConfig,
    pipeline::{build_dashboard, DashboardState},
    sinks::{
        expected_format, sample_csv_bytes, sessions_csv_bytes, summary_csv_bytes, DashboardDocument, ExportError,
        SAMPLE_FILE_NAME,
    },
};

const QUERY_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

struct ServerState {
    dashboard: DashboardState,
    analysis: AnalysisConfig,
}

#[derive(Clone)]
pub struct SharedState {
    inner: Arc<ServerState>,
}

impl SharedState {
    pub fn new(dashboard: DashboardState, analysis: AnalysisConfig) -> Self {
        Self {
            inner: Arc::new(ServerState { dashboard, analysis }),
        }
    }

    fn table(&self) -> Result<&SessionTable, ApiError> {
        match &self.inner.dashboard {
            DashboardState::Loaded { table, .. } => Ok(table),
            DashboardState::NoData { error } => Err(ApiError::NoData(error.clone())),
        }
    }
}

#[derive(Debug)]
enum ApiError {
    NoData(String),
    /// Data is loaded but lacks a column the view needs.
    Unavailable(String),
    BadRequest(String),
    Export(ExportError),
}

impl From<ExportError> for ApiError {
    fn from(e: ExportError) -> Self {
        ApiError::Export(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NoData(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Unavailable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Export(e) => {
                tracing::error!(error = %e, "CSV export failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct DateRangeQuery {
    from: Option<String>,
    to: Option<String>,
}

fn parse_query_date(name: &str, raw: &str) -> Result<Date, ApiError> {
    Date::parse(raw.trim(), QUERY_DATE_FORMAT)
        .map_err(|e| ApiError::BadRequest(format!("invalid '{name}' date '{raw}': {e}")))
}

/// Apply the requested date range; missing bounds default to the table's own range.
fn filtered_table(table: &SessionTable, query: &DateRangeQuery) -> Result<(SessionTable, Option<(Date, Date)>), ApiError> {
    let from = query.from.as_deref().map(|raw| parse_query_date("from", raw)).transpose()?;
    let to = query.to.as_deref().map(|raw| parse_query_date("to", raw)).transpose()?;
    let default = table.start_date_range();

    let range = match (from.or(default.map(|r| r.0)), to.or(default.map(|r| r.1))) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    };
    let filtered = match range {
        Some((start, end)) => filter_by_start_date(table, start, end),
        None => table.with_sessions(Vec::new()),
    };
    Ok((filtered, range))
}

fn csv_download(filename: &str, body: Vec<u8>) -> Response {
    metrics::counter!("dashboard_requests_total", "route" => "export").increment(1);
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        body,
    )
        .into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn get_dashboard(State(state): State<SharedState>) -> Response {
    metrics::counter!("dashboard_requests_total", "route" => "dashboard").increment(1);

    match &state.inner.dashboard {
        DashboardState::Loaded { table, coercion } => {
            let bundle = build_dashboard(table, &state.inner.analysis);
            Json(DashboardDocument::Ready {
                bundle: &bundle,
                coercion_failures: coercion,
            })
            .into_response()
        }
        DashboardState::NoData { error } => Json(DashboardDocument::no_data(error)).into_response(),
    }
}

#[derive(Serialize)]
struct SessionsResponse<'a> {
    from: Option<Date>,
    to: Option<Date>,
    count: usize,
    sessions: &'a [ChargeSession],
}

async fn get_sessions(
    State(state): State<SharedState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, ApiError> {
    metrics::counter!("dashboard_requests_total", "route" => "sessions").increment(1);

    let (filtered, range) = filtered_table(state.table()?, &query)?;
    let ordered = filtered.newest_first();
    Ok(Json(SessionsResponse {
        from: range.map(|r| r.0),
        to: range.map(|r| r.1),
        count: ordered.len(),
        sessions: ordered.sessions(),
    })
    .into_response())
}

async fn export_monthly(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let rows = summarize_by_month(state.table()?);
    Ok(csv_download("monthly_charging_data.csv", summary_csv_bytes(&rows)?))
}

async fn export_locations(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let rows = summarize_by_location(state.table()?).map_err(|e| ApiError::Unavailable(e.to_string()))?;
    Ok(csv_download("location_charging_data.csv", summary_csv_bytes(&rows)?))
}

async fn export_weekdays(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let rows = summarize_by_weekday(state.table()?);
    Ok(csv_download("weekday_charging_data.csv", summary_csv_bytes(&rows)?))
}

async fn export_sessions(
    State(state): State<SharedState>,
    Query(query): Query<DateRangeQuery>,
) -> Result<Response, ApiError> {
    let (filtered, _) = filtered_table(state.table()?, &query)?;
    Ok(csv_download("filtered_charging_data.csv", sessions_csv_bytes(&filtered)?))
}

async fn get_format() -> Response {
    Json(expected_format()).into_response()
}

async fn export_sample() -> Result<Response, ApiError> {
    Ok(csv_download(SAMPLE_FILE_NAME, sample_csv_bytes()?))
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/sessions", get(get_sessions))
        .route("/api/format", get(get_format))
        .route("/export/sample.csv", get(export_sample))
        .route("/export/monthly.csv", get(export_monthly))
        .route("/export/locations.csv", get(export_locations))
        .route("/export/weekdays.csv", get(export_weekdays))
        .route("/export/sessions.csv", get(export_sessions))
        .with_state(state)
}

pub async fn serve(bind_addr: &str, state: SharedState) -> anyhow::Result<()> {
    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| anyhow!("invalid server.bind_addr: {e}"))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(%addr, "dashboard server listening");
    axum::serve(listener, router(state).into_make_service()).await?;
    Ok(())
}
