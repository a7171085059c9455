//! Tariff Sync — Entry Point
//!
//! Initializes configuration, logging, the Postgres store and the
//! Google adapters, then runs the two cron triggers and the HTTP
//! server until SIGINT.
//!
//! Wiring sequence:
//! 1. Load configuration from the environment (+ optional .env)
//! 2. Init tracing (JSON structured logging)
//! 3. Connect to Postgres and apply migrations
//! 4. Create the tariff API client (TariffProvider port)
//! 5. Create the OAuth credential and Sheets client
//! 6. Wire the use cases into the orchestrator
//! 7. Spawn the full-cycle and export-only triggers
//! 8. Spawn the HTTP server (OAuth flow, reads, probes, metrics)
//! 9. Wait for SIGINT → graceful shutdown (stop triggers→drain→close)

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use tariff_sync::adapters::http::{self, AppState};
use tariff_sync::adapters::metrics::{HealthState, MetricsRegistry};
use tariff_sync::adapters::persistence::PgTariffStore;
use tariff_sync::adapters::provider::TariffApiClient;
use tariff_sync::adapters::sheets::{GoogleOAuth, GoogleSheetsClient};
use tariff_sync::config;
use tariff_sync::ports::credentials::CredentialProvider;
use tariff_sync::ports::spreadsheet::SpreadsheetService;
use tariff_sync::ports::tariff_store::TariffStore;
use tariff_sync::usecases::{
    CronTrigger, CycleKind, ExportProjector, Orchestrator, PublishTarget, Publisher, SnapshotSync,
};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration from the environment ──────────
    let config = config::loader::load_config().context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        destinations = config.sheets.spreadsheet_ids.len(),
        full_cycle = %config.schedule.full_cycle,
        export_cycle = %config.schedule.export_cycle,
        "Starting tariff sync"
    );

    // ── 3. Connect to Postgres and apply migrations ─────────
    let pg = Arc::new(
        PgTariffStore::connect(&config.database)
            .await
            .context("Failed to connect to Postgres")?,
    );
    pg.migrate().await.context("Failed to apply migrations")?;
    let store: Arc<dyn TariffStore> = pg.clone();

    // ── 4. Create tariff API client (TariffProvider port) ───
    let provider = Arc::new(
        TariffApiClient::new(&config.provider).context("Failed to create tariff API client")?,
    );

    // ── 5. Create OAuth credential + Sheets client ──────────
    let credentials: Arc<dyn CredentialProvider> = Arc::new(
        GoogleOAuth::new(&config.oauth, config.http.login_url())
            .context("Failed to create OAuth client")?,
    );
    let sheets: Arc<dyn SpreadsheetService> = Arc::new(
        GoogleSheetsClient::new(Arc::clone(&credentials))
            .context("Failed to create Sheets client")?,
    );

    // ── 6. Wire use cases into the orchestrator ─────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let target = PublishTarget {
        spreadsheet_ids: config.sheets.spreadsheet_ids.clone(),
        sheet_title: config.sheets.sheet_title.clone(),
        range: config.sheets.target_range(),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        SnapshotSync::new(provider, Arc::clone(&store)),
        ExportProjector::new(Arc::clone(&store), config.sheets.columns.clone()),
        Publisher::new(Arc::clone(&sheets), Arc::clone(&credentials), target)
            .with_metrics(Arc::clone(&metrics)),
        Arc::clone(&metrics),
    ));

    // ── 7. Spawn the two cron triggers ──────────────────────
    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    let full_handle = CronTrigger::new(
        CycleKind::Full,
        config.schedule.full_cycle.clone(),
        Arc::clone(&orchestrator),
    )
    .spawn(shutdown_tx.subscribe());
    let export_handle = CronTrigger::new(
        CycleKind::ExportOnly,
        config.schedule.export_cycle.clone(),
        Arc::clone(&orchestrator),
    )
    .spawn(shutdown_tx.subscribe());

    // ── 8. Spawn HTTP server ────────────────────────────────
    let health = HealthState::new(Arc::clone(&store));
    let app = http::router(AppState {
        store,
        credentials: Arc::clone(&credentials),
        sheets,
        metrics,
        health: health.clone(),
        first_destination: config.sheets.spreadsheet_ids.first().cloned(),
        default_range: config.sheets.target_range(),
    });
    let http_shutdown = shutdown_tx.subscribe();
    let port = config.http.port;
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http::serve(app, port, http_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    if !credentials.is_authorized().await {
        info!(
            login_url = %credentials.login_url(),
            "Spreadsheet access not authorized yet; exports fail until consent is given"
        );
    }
    info!("All tasks spawned, service is running");

    // ── 9. Wait for SIGINT ──────────────────────────────────
    signal::ctrl_c().await.context("Failed to listen for SIGINT")?;
    info!("SIGINT received, initiating graceful shutdown");

    // ── Graceful shutdown ──

    // 1. Readiness probe → 503
    health.begin_shutdown();

    // 2. Stop triggers and the HTTP server
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast to all tasks");

    // 3. Wait for triggers, their in-flight cycles and requests (up to 30s)
    let _ = tokio::time::timeout(Duration::from_secs(30), async {
        let _ = tokio::join!(full_handle, export_handle, http_handle);
    })
    .await;

    // 4. Close the pool
    pg.close().await;

    info!("Shutdown complete");
    Ok(())
}
