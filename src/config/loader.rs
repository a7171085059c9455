//! Configuration Loader - Environment Loading and Validation
//!
//! Reads `.env` (if present) underneath the process environment,
//! validates every key and fails fast with a message naming the
//! offending variable.

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use cron::Schedule;
use tracing::{debug, info};

use super::{
  AppConfig, DatabaseConfig, HttpConfig, OAuthConfig, ProviderConfig, ScheduleConfig, Secret,
  SheetsConfig, DEFAULT_APP_PORT, DEFAULT_CELL_RANGE, DEFAULT_LOG_LEVEL,
  DEFAULT_MAX_CONNECTIONS, DEFAULT_POSTGRES_HOST, DEFAULT_PROVIDER_TIMEOUT_SECS,
  DEFAULT_SHEET_TITLE, DEFAULT_TARIFFS_URL,
};
use crate::domain::export::ColumnContract;

/// Load and validate configuration from the environment.
///
/// Variables already set in the process environment win over the
/// `.env` file.
///
/// # Errors
/// Returns a detailed error if a required variable is missing or any
/// value fails validation.
pub fn load_config() -> Result<AppConfig> {
  match dotenvy::dotenv() {
    Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
    Err(e) if e.not_found() => debug!("No .env file, using process environment only"),
    Err(e) => return Err(e).context("Failed to read .env file"),
  }

  let config = from_lookup(|key| std::env::var(key).ok())?;

  info!(
    destinations = config.sheets.spreadsheet_ids.len(),
    columns = config.sheets.columns.columns().len(),
    port = config.http.port,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Build the configuration from an arbitrary key lookup.
///
/// Empty values are treated as unset.
pub fn from_lookup<F>(lookup: F) -> Result<AppConfig>
where
  F: Fn(&str) -> Option<String>,
{
  let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
  let required = |key: &str| get(key).with_context(|| format!("{key} is not set"));

  let database = DatabaseConfig {
    host: get("POSTGRES_HOST").unwrap_or_else(|| DEFAULT_POSTGRES_HOST.to_string()),
    port: parse_number(&required("POSTGRES_PORT")?, "POSTGRES_PORT")?,
    database: required("POSTGRES_DB")?,
    user: required("POSTGRES_USER")?,
    password: Secret::new(required("POSTGRES_PASSWORD")?),
    max_connections: get("POSTGRES_MAX_CONNECTIONS")
      .map(|v| parse_number(&v, "POSTGRES_MAX_CONNECTIONS"))
      .transpose()?
      .unwrap_or(DEFAULT_MAX_CONNECTIONS),
  };

  let port = get("APP_PORT")
    .map(|v| parse_number(&v, "APP_PORT"))
    .transpose()?
    .unwrap_or(DEFAULT_APP_PORT);
  let http = HttpConfig {
    port,
    public_base_url: get("PUBLIC_BASE_URL")
      .unwrap_or_else(|| format!("http://localhost:{port}")),
  };

  let provider = ProviderConfig {
    url: get("WB_TARIFFS_URL").unwrap_or_else(|| DEFAULT_TARIFFS_URL.to_string()),
    api_key: Secret::new(required("WB_HEADER_API_KEY")?),
    timeout: Duration::from_secs(
      get("PROVIDER_TIMEOUT_SECS")
        .map(|v| parse_number(&v, "PROVIDER_TIMEOUT_SECS"))
        .transpose()?
        .unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
    ),
  };

  let schedule = ScheduleConfig {
    full_cycle: parse_schedule(&required("UPDATE_DB_MASK")?, "UPDATE_DB_MASK")?,
    export_cycle: parse_schedule(&required("UPDATE_TABLES_MASK")?, "UPDATE_TABLES_MASK")?,
  };

  let oauth = OAuthConfig {
    client_id: required("GOOGLE_CLIENT_ID")?,
    client_secret: Secret::new(required("GOOGLE_CLIENT_SECRET")?),
    redirect_url: required("GOOGLE_REDIRECT_URL")?,
  };

  let columns = match get("EXPORT_COLUMNS_FILE") {
    Some(path) => {
      let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read EXPORT_COLUMNS_FILE {path}"))?;
      ColumnContract::from_toml_str(&content)
        .with_context(|| format!("Invalid column contract in {path}"))?
    }
    None => ColumnContract::default(),
  };

  let sheets = SheetsConfig {
    spreadsheet_ids: parse_spreadsheet_ids(&required("SHEETS")?),
    sheet_title: get("SHEET_TITLE").unwrap_or_else(|| DEFAULT_SHEET_TITLE.to_string()),
    cell_range: get("SHEET_RANGE").unwrap_or_else(|| DEFAULT_CELL_RANGE.to_string()),
    columns,
  };

  let config = AppConfig {
    database,
    provider,
    schedule,
    oauth,
    sheets,
    http,
    log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
  };

  validate_config(&config)?;
  Ok(config)
}

/// Split a destination list on whitespace, commas and semicolons.
///
/// Duplicates are dropped; first-occurrence order is kept.
pub fn parse_spreadsheet_ids(raw: &str) -> Vec<String> {
  let mut seen = HashSet::new();
  raw
    .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
    .filter(|id| !id.is_empty())
    .filter(|id| seen.insert(*id))
    .map(str::to_string)
    .collect()
}

/// Parse a cron mask.
///
/// Classic 5-field masks (minute first) get a leading seconds field so
/// `0 * * * *` means "every hour on the hour" as it does in crontab.
pub fn parse_schedule(mask: &str, key: &str) -> Result<Schedule> {
  let mask = mask.trim();
  let normalized = if mask.split_whitespace().count() == 5 {
    format!("0 {mask}")
  } else {
    mask.to_string()
  };
  Schedule::from_str(&normalized).with_context(|| format!("{key} is not a valid cron mask: {mask}"))
}

fn parse_number<T: FromStr>(value: &str, key: &str) -> Result<T> {
  value
    .trim()
    .parse()
    .map_err(|_| anyhow::anyhow!("{key} must be a non-negative integer, got {value:?}"))
}

/// Validate cross-field rules.
fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(
    !config.sheets.spreadsheet_ids.is_empty(),
    "SHEETS must list at least one spreadsheet id"
  );
  anyhow::ensure!(config.database.port > 0, "POSTGRES_PORT must be positive");
  anyhow::ensure!(
    config.database.max_connections > 0,
    "POSTGRES_MAX_CONNECTIONS must be positive"
  );
  anyhow::ensure!(
    !config.provider.timeout.is_zero(),
    "PROVIDER_TIMEOUT_SECS must be positive"
  );
  anyhow::ensure!(
    config.provider.url.starts_with("http://") || config.provider.url.starts_with("https://"),
    "WB_TARIFFS_URL must be an http(s) URL, got {}",
    config.provider.url
  );
  anyhow::ensure!(
    !config.sheets.sheet_title.contains('!'),
    "SHEET_TITLE must not contain '!'"
  );

  Ok(())
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;

  use super::*;

  fn base_env() -> HashMap<&'static str, String> {
    [
      ("POSTGRES_PORT", "5432"),
      ("POSTGRES_DB", "postgres"),
      ("POSTGRES_USER", "postgres"),
      ("POSTGRES_PASSWORD", "postgres"),
      ("WB_HEADER_API_KEY", "key"),
      ("UPDATE_DB_MASK", "0 * * * *"),
      ("UPDATE_TABLES_MASK", "*/30 * * * *"),
      ("GOOGLE_CLIENT_ID", "client"),
      ("GOOGLE_CLIENT_SECRET", "secret"),
      ("GOOGLE_REDIRECT_URL", "http://localhost:5000/oauth2callback"),
      ("SHEETS", "sheet-a sheet-b"),
    ]
    .into_iter()
    .map(|(k, v)| (k, v.to_string()))
    .collect()
  }

  fn load(env: &HashMap<&'static str, String>) -> Result<AppConfig> {
    from_lookup(|key| env.get(key).cloned())
  }

  #[test]
  fn test_minimal_environment_uses_defaults() {
    let config = load(&base_env()).unwrap();
    assert_eq!(config.database.host, "localhost");
    assert_eq!(config.http.port, 5000);
    assert_eq!(config.http.login_url(), "http://localhost:5000/login");
    assert_eq!(config.sheets.target_range(), "stocks_coefs!A1:Z15000");
    assert_eq!(config.sheets.spreadsheet_ids, vec!["sheet-a", "sheet-b"]);
    assert_eq!(config.sheets.columns, ColumnContract::default());
    assert_eq!(config.log_level, "info");
  }

  #[test]
  fn test_missing_required_key_is_named() {
    let mut env = base_env();
    env.remove("WB_HEADER_API_KEY");
    let err = load(&env).unwrap_err();
    assert!(err.to_string().contains("WB_HEADER_API_KEY"));
  }

  #[test]
  fn test_non_numeric_port_rejected() {
    let mut env = base_env();
    env.insert("POSTGRES_PORT", "54x2".to_string());
    let err = load(&env).unwrap_err();
    assert!(err.to_string().contains("POSTGRES_PORT"));
  }

  #[test]
  fn test_invalid_cron_rejected() {
    let mut env = base_env();
    env.insert("UPDATE_TABLES_MASK", "every hour".to_string());
    let err = load(&env).unwrap_err();
    assert!(err.to_string().contains("UPDATE_TABLES_MASK"));
  }

  #[test]
  fn test_blank_sheets_rejected() {
    let mut env = base_env();
    env.insert("SHEETS", " , ; ".to_string());
    assert!(load(&env).is_err());
  }

  #[test]
  fn test_spreadsheet_ids_split_and_deduplicated() {
    let ids = parse_spreadsheet_ids("1AbC-x_9, 2DeF\n1AbC-x_9;3GhI");
    assert_eq!(ids, vec!["1AbC-x_9", "2DeF", "3GhI"]);
  }

  #[test]
  fn test_five_and_six_field_masks_accepted() {
    assert!(parse_schedule("*/5 * * * *", "MASK").is_ok());
    assert!(parse_schedule("0 0 * * * *", "MASK").is_ok());
  }

  #[test]
  fn test_secrets_redacted_in_debug() {
    let config = load(&base_env()).unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("\"secret\""));
    assert!(debug.contains("Secret(***)"));
  }
}
