//! HTTP Endpoint Tests
//!
//! Exercises the axum router in-process with `tower::ServiceExt::oneshot`
//! over the in-memory store and mockall credential/sheets mocks.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::NaiveDate;
use mockall::mock;
use tower::ServiceExt;

use tariff_sync::adapters::http::{router, AppState, AUTH_SUCCESS_TEXT};
use tariff_sync::adapters::metrics::{HealthState, MetricsRegistry};
use tariff_sync::adapters::persistence::InMemoryTariffStore;
use tariff_sync::domain::export::ExportGrid;
use tariff_sync::domain::tariff::{NewTariffRow, TariffFields};
use tariff_sync::error::{SyncError, SyncResult};
use tariff_sync::ports::tariff_store::TariffStore;

mock! {
    pub Sheets {}

    #[async_trait::async_trait]
    impl tariff_sync::ports::spreadsheet::SpreadsheetService for Sheets {
        async fn ensure_sheet(&self, spreadsheet_id: &str, title: &str) -> SyncResult<()>;
        async fn write_range(
            &self,
            spreadsheet_id: &str,
            range: &str,
            grid: &ExportGrid,
        ) -> SyncResult<()>;
        async fn read_range(&self, spreadsheet_id: &str, range: &str)
            -> SyncResult<Vec<Vec<String>>>;
    }
}

mock! {
    pub Creds {}

    #[async_trait::async_trait]
    impl tariff_sync::ports::credentials::CredentialProvider for Creds {
        fn authorize_url(&self) -> String;
        fn login_url(&self) -> String;
        async fn authorize(&self, code: &str) -> SyncResult<()>;
        async fn is_authorized(&self) -> bool;
        async fn access_token(&self) -> SyncResult<String>;
    }
}

const CONSENT_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth?client_id=test";
const LOGIN_URL: &str = "http://localhost:5000/login";
const DEFAULT_RANGE: &str = "stocks_coefs!A1:Z15000";

fn creds(authorized: bool) -> MockCreds {
    let mut creds = MockCreds::new();
    creds
        .expect_authorize_url()
        .returning(|| CONSENT_URL.to_string());
    creds.expect_login_url().returning(|| LOGIN_URL.to_string());
    creds.expect_is_authorized().returning(move || authorized);
    creds
}

fn app_with(
    store: Arc<InMemoryTariffStore>,
    creds: MockCreds,
    sheets: MockSheets,
) -> (Router, HealthState) {
    let health = HealthState::new(store.clone());
    let state = AppState {
        store,
        credentials: Arc::new(creds),
        sheets: Arc::new(sheets),
        metrics: Arc::new(MetricsRegistry::new().unwrap()),
        health: health.clone(),
        first_destination: Some("sheet-a".to_string()),
        default_range: DEFAULT_RANGE.to_string(),
    };
    (router(state), health)
}

fn app(creds: MockCreds) -> Router {
    app_with(Arc::new(InMemoryTariffStore::new()), creds, MockSheets::new()).0
}

async fn get(app: Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

// ---- OAuth flow ----

#[tokio::test]
async fn test_login_redirects_to_consent_page() {
    let (status, headers, _) = get(app(creds(false)), "/login").await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], CONSENT_URL);
}

#[tokio::test]
async fn test_callback_exchanges_code() {
    let mut creds = creds(false);
    creds
        .expect_authorize()
        .withf(|code| code == "4/0AbCd")
        .times(1)
        .returning(|_| Ok(()));

    let (status, _, body) = get(app(creds), "/oauth2callback?code=4/0AbCd&scope=x").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, AUTH_SUCCESS_TEXT);
}

#[tokio::test]
async fn test_callback_with_rejected_code() {
    let mut creds = creds(false);
    creds
        .expect_authorize()
        .returning(|_| Err(SyncError::Authorization("invalid_grant: Bad Request".to_string())));

    let (status, _, body) = get(app(creds), "/oauth2callback?code=stale").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("invalid_grant"));
}

#[tokio::test]
async fn test_callback_with_denied_consent() {
    let mut creds = creds(false);
    creds.expect_authorize().times(0);

    let (status, _, _) = get(app(creds), "/oauth2callback?error=access_denied").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_callback_without_code_is_bad_request() {
    let (status, _, _) = get(app(creds(false)), "/oauth2callback").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ---- Read endpoints ----

#[tokio::test]
async fn test_tariffs_returns_day_records() {
    let store = Arc::new(InMemoryTariffStore::new());
    let ids = store
        .reconcile_warehouses(&["Коледино".to_string()])
        .await
        .unwrap();
    let date = NaiveDate::from_ymd_opt(2026, 2, 25).unwrap();
    store
        .replace_snapshot(
            date,
            &[NewTariffRow {
                warehouse_id: ids["Коледино"],
                fields: TariffFields {
                    box_delivery_coef_expr: Some("160".to_string()),
                    ..TariffFields::default()
                },
            }],
        )
        .await
        .unwrap();
    let (app, _) = app_with(store, creds(false), MockSheets::new());

    let (status, _, body) = get(app, "/tariffs?date=2026-02-25").await;
    assert_eq!(status, StatusCode::OK);

    let records: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(records[0]["warehouseName"], "Коледино");
    assert_eq!(records[0]["getDate"], "2026-02-25");
    assert_eq!(records[0]["boxDeliveryCoefExpr"], "160");
    assert!(records[0]["boxStorageBase"].is_null());
}

#[tokio::test]
async fn test_tariffs_for_empty_day() {
    let (status, _, body) = get(app(creds(false)), "/tariffs?date=2020-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "[]");
}

#[tokio::test]
async fn test_tariffs_rejects_bad_date() {
    let (status, _, _) = get(app(creds(false)), "/tariffs?date=25.02.2026").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_sheets_requires_authorization() {
    let mut sheets = MockSheets::new();
    sheets.expect_read_range().times(0);
    let (app, _) = app_with(Arc::new(InMemoryTariffStore::new()), creds(false), sheets);

    let (status, _, body) = get(app, "/list_sheets").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains(LOGIN_URL));
}

#[tokio::test]
async fn test_list_sheets_reads_first_destination() {
    let mut sheets = MockSheets::new();
    sheets
        .expect_read_range()
        .withf(|id, range| id == "sheet-a" && range == DEFAULT_RANGE)
        .times(1)
        .returning(|_, _| {
            Ok(vec![
                vec!["warehouseName".to_string(), "boxDeliveryCoefExpr".to_string()],
                vec!["Тула".to_string(), "120".to_string()],
            ])
        });
    let (app, _) = app_with(Arc::new(InMemoryTariffStore::new()), creds(true), sheets);

    let (status, _, body) = get(app, "/list_sheets").await;
    assert_eq!(status, StatusCode::OK);
    let values: Vec<Vec<String>> = serde_json::from_str(&body).unwrap();
    assert_eq!(values[1][0], "Тула");
}

#[tokio::test]
async fn test_list_sheets_custom_range_and_upstream_failure() {
    let mut sheets = MockSheets::new();
    sheets
        .expect_read_range()
        .withf(|_, range| range == "stocks_coefs!A1:B2")
        .returning(|id, _| {
            Err(SyncError::Destination {
                destination: id.to_string(),
                message: "HTTP 404 Not Found: Requested entity was not found.".to_string(),
            })
        });
    let (app, _) = app_with(Arc::new(InMemoryTariffStore::new()), creds(true), sheets);

    let (status, _, _) = get(app, "/list_sheets?range=stocks_coefs!A1:B2").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

// ---- Probes ----

#[tokio::test]
async fn test_live_and_ready() {
    let (app, health) = app_with(
        Arc::new(InMemoryTariffStore::new()),
        creds(false),
        MockSheets::new(),
    );

    let (status, _, _) = get(app.clone(), "/live").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = get(app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::OK);

    health.begin_shutdown();
    let (status, _, _) = get(app.clone(), "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, _, _) = get(app, "/live").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_exposition() {
    let (status, _, body) = get(app(creds(false)), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("tariff_sync_snapshot_rows"));
}
