//! Configuration Module - Environment-based Service Configuration
//!
//! Loaded once at startup from the process environment (with an
//! optional `.env` file underneath) into an explicit `AppConfig` value
//! that is passed to each component. Nothing reads the environment
//! after startup.

pub mod loader;

use std::fmt;
use std::time::Duration;

use cron::Schedule;

use crate::domain::export::ColumnContract;

/// Top-level service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
  /// Postgres connection parameters.
  pub database: DatabaseConfig,
  /// Marketplace tariff API.
  pub provider: ProviderConfig,
  /// Cron schedules of the two cycles.
  pub schedule: ScheduleConfig,
  /// Google OAuth client.
  pub oauth: OAuthConfig,
  /// Spreadsheet destinations and export layout.
  pub sheets: SheetsConfig,
  /// Inbound HTTP server.
  pub http: HttpConfig,
  /// Default tracing filter (overridden by `RUST_LOG`).
  pub log_level: String,
}

/// A value that must never appear in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Self(value.into())
  }

  /// The secret value, for headers and request bodies only.
  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Secret(***)")
  }
}

/// Postgres connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
  pub host: String,
  pub port: u16,
  pub database: String,
  pub user: String,
  pub password: Secret,
  /// Pool size.
  pub max_connections: u32,
}

/// Tariff API configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
  /// Box tariff endpoint.
  pub url: String,
  /// Value of the `Authorization` header.
  pub api_key: Secret,
  /// Request timeout.
  pub timeout: Duration,
}

/// Schedules of the full and export-only cycles.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
  /// Fetch → reconcile → replace → export.
  pub full_cycle: Schedule,
  /// Export only, from what is persisted for today.
  pub export_cycle: Schedule,
}

/// Google OAuth client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
  pub client_id: String,
  pub client_secret: Secret,
  /// Must match the `/oauth2callback` URL registered with Google.
  pub redirect_url: String,
}

/// Spreadsheet export configuration.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
  /// Destination spreadsheet ids, deduplicated, in configuration order.
  pub spreadsheet_ids: Vec<String>,
  /// Dedicated tab receiving the export.
  pub sheet_title: String,
  /// Cell range inside the tab.
  pub cell_range: String,
  /// Export column order and headers.
  pub columns: ColumnContract,
}

impl SheetsConfig {
  /// Fully qualified A1 range, e.g. `stocks_coefs!A1:Z15000`.
  pub fn target_range(&self) -> String {
    format!("{}!{}", self.sheet_title, self.cell_range)
  }
}

/// Inbound HTTP configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
  /// Listen port.
  pub port: u16,
  /// Externally reachable base URL, used in authorization hints.
  pub public_base_url: String,
}

impl HttpConfig {
  /// The `/login` endpoint users are pointed at when unauthorized.
  pub fn login_url(&self) -> String {
    format!("{}/login", self.public_base_url.trim_end_matches('/'))
  }
}

// Defaults

pub(crate) const DEFAULT_POSTGRES_HOST: &str = "localhost";
pub(crate) const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub(crate) const DEFAULT_APP_PORT: u16 = 5000;
pub(crate) const DEFAULT_TARIFFS_URL: &str = "https://common-api.wildberries.ru/api/v1/tariffs/box";
pub(crate) const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub(crate) const DEFAULT_SHEET_TITLE: &str = "stocks_coefs";
pub(crate) const DEFAULT_CELL_RANGE: &str = "A1:Z15000";
pub(crate) const DEFAULT_LOG_LEVEL: &str = "info";
