//! Inbound HTTP Server - OAuth Flow, Read Endpoints and Probes
//!
//! One axum 0.7 router serves the OAuth consent flow, the read-only
//! data endpoints, liveness/readiness probes and Prometheus metrics.
//!
//! Routes:
//! - `GET /login`: redirect to the Google consent page
//! - `GET /oauth2callback?code=`: exchange the code for a credential
//! - `GET /tariffs?date=`: persisted rows of a day (default today)
//! - `GET /list_sheets?range=`: raw range read from the first destination
//! - `GET /live`, `GET /ready`, `GET /metrics`

pub mod error;

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

pub use error::ApiError;

use crate::adapters::metrics::{HealthState, MetricsRegistry};
use crate::domain::tariff::StoredTariff;
use crate::ports::credentials::CredentialProvider;
use crate::ports::spreadsheet::SpreadsheetService;
use crate::ports::tariff_store::TariffStore;
use crate::usecases::orchestrator::today;

/// Text shown in the browser once consent is complete.
pub const AUTH_SUCCESS_TEXT: &str = "Authentication successful! Please return to the console.";

/// Shared state of all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TariffStore>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub sheets: Arc<dyn SpreadsheetService>,
    pub metrics: Arc<MetricsRegistry>,
    pub health: HealthState,
    /// Spreadsheet read by `/list_sheets`.
    pub first_destination: Option<String>,
    /// Range read by `/list_sheets` when none is given.
    pub default_range: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TariffsQuery {
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    range: Option<String>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/login", get(login))
        .route("/oauth2callback", get(oauth_callback))
        .route("/tariffs", get(tariffs))
        .route("/list_sheets", get(list_sheets))
        .route("/live", get(liveness))
        .route("/ready", get(readiness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve `router` on `port` until `shutdown_rx` fires.
#[instrument(skip(router, shutdown_rx))]
pub async fn serve(
    router: Router,
    port: u16,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(address = %addr, "HTTP server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}

async fn login(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.credentials.authorize_url())],
    )
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<&'static str, ApiError> {
    if let Some(error) = query.error {
        warn!(error = %error, "Consent was not granted");
        return Err(ApiError::AuthorizationFailed(error));
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing code parameter".to_string()))?;

    state.credentials.authorize(&code).await?;
    Ok(AUTH_SUCCESS_TEXT)
}

async fn tariffs(
    State(state): State<AppState>,
    Query(query): Query<TariffsQuery>,
) -> Result<Json<Vec<StoredTariff>>, ApiError> {
    let date = match query.date.as_deref() {
        None | Some("") => today(),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| ApiError::BadRequest(format!("invalid date {raw:?}, expected YYYY-MM-DD")))?,
    };

    let rows = state.store.load_snapshot(date).await?;
    Ok(Json(rows))
}

async fn list_sheets(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Vec<String>>>, ApiError> {
    let spreadsheet_id = state
        .first_destination
        .as_deref()
        .ok_or(ApiError::NotConfigured("no spreadsheet destination"))?;

    if !state.credentials.is_authorized().await {
        return Err(ApiError::Unauthorized(format!(
            "Authorize first, visit {}",
            state.credentials.login_url()
        )));
    }

    let range = query
        .range
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| state.default_range.clone());
    let values = state.sheets.read_range(spreadsheet_id, &range).await?;
    Ok(Json(values))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Readiness probe: 200 only while the store answers and no shutdown
/// is in progress.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if state.health.is_ready().await {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .render()
        .map_err(|e| ApiError::Internal(e.to_string()))
}
